//! NMRPipe data writer: header followed by time-domain vectors.
//!
//! A complex vector of N points is stored as N reals followed by N
//! imaginaries.

use nmrpipe_core::fdata::*;
use num_complex::Complex32;
use byteorder::{ByteOrder, NativeEndian};
use std::io::{self, Write};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("header must be written before data")]
    NoHeader,
}

/// Write an NMRPipe FDATA header to a writer.
pub fn write_fdata_header<W: Write>(writer: &mut W, fdata: &Fdata) -> Result<(), WriteError> {
    writer.write_all(&fdata.to_bytes())?;
    Ok(())
}

/// Write f32 values (native endian).
pub fn write_float_data<W: Write>(writer: &mut W, data: &[f32]) -> Result<(), WriteError> {
    let mut buf = vec![0u8; data.len() * 4];
    NativeEndian::write_f32_into(data, &mut buf);
    writer.write_all(&buf)?;
    Ok(())
}

/// Write one complex vector as its real block then its imaginary block.
pub fn write_complex_row<W: Write>(writer: &mut W, row: &[Complex32]) -> Result<(), WriteError> {
    let mut block: Vec<f32> = Vec::with_capacity(row.len() * 2);
    block.extend(row.iter().map(|z| z.re));
    block.extend(row.iter().map(|z| z.im));
    write_float_data(writer, &block)
}

/// Streams a header and then rows of one fixed length.
pub struct PipeWriter<W: Write> {
    writer: W,
    header_written: bool,
    rows: usize,
}

impl<W: Write> PipeWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header_written: false,
            rows: 0,
        }
    }

    /// Write the header (must be called first).
    pub fn write_header(&mut self, fdata: &Fdata) -> Result<(), WriteError> {
        write_fdata_header(&mut self.writer, fdata)?;
        self.header_written = true;
        Ok(())
    }

    pub fn write_row(&mut self, row: &[Complex32]) -> Result<(), WriteError> {
        if !self.header_written {
            return Err(WriteError::NoHeader);
        }
        write_complex_row(&mut self.writer, row)?;
        self.rows += 1;
        Ok(())
    }

    /// Write every `row_len`-point vector of `data`.
    pub fn write_rows(&mut self, data: &[Complex32], row_len: usize) -> Result<(), WriteError> {
        if row_len == 0 {
            return Ok(());
        }
        for row in data.chunks(row_len) {
            self.write_row(row)?;
        }
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }

    pub fn flush(&mut self) -> Result<(), WriteError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Consume and return the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
