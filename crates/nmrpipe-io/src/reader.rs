//! NMRPipe data reader, used to verify written files.

use byteorder::{BigEndian, ByteOrder, LittleEndian, NativeEndian};
use nmrpipe_core::enums::{DimCode, HdrStatus};
use nmrpipe_core::fdata::*;
use std::io::{self, Read};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid header: {0}")]
    InvalidHeader(#[from] FdataError),
}

/// Read an NMRPipe FDATA header from a reader.
pub fn read_fdata_header<R: Read>(reader: &mut R) -> Result<(Fdata, HdrStatus), ReadError> {
    let mut buf = vec![0u8; FDATA_BYTES];
    reader.read_exact(&mut buf)?;
    Ok(Fdata::from_bytes(&buf)?)
}

/// Read `count` f32 values, byte-swapping when the header was swapped.
pub fn read_float_data<R: Read>(
    reader: &mut R,
    count: usize,
    status: HdrStatus,
) -> Result<Vec<f32>, ReadError> {
    let mut buf = vec![0u8; count * 4];
    reader.read_exact(&mut buf)?;
    let mut data = vec![0f32; count];
    match status {
        HdrStatus::Ok => NativeEndian::read_f32_into(&buf, &mut data),
        HdrStatus::Swapped if cfg!(target_endian = "little") => {
            BigEndian::read_f32_into(&buf, &mut data)
        }
        HdrStatus::Swapped => LittleEndian::read_f32_into(&buf, &mut data),
    }
    Ok(data)
}

/// Number of floats following the header of a time-domain file.
pub fn data_len(fdata: &Fdata) -> usize {
    let x = fdata.get_size(DimCode::X);
    let per_row = if fdata.is_complex(DimCode::X) { 2 * x } else { x };
    let mut rows = 1;
    for dim in [DimCode::Y, DimCode::Z, DimCode::A] {
        if fdata.dim_count() > dim.index() {
            rows *= fdata.get_size(dim).max(1);
        }
    }
    per_row * rows
}

/// Read a complete NMRPipe file: header + all data.
pub fn read_nmrpipe_file<R: Read>(reader: &mut R) -> Result<(Fdata, Vec<f32>), ReadError> {
    let (fdata, status) = read_fdata_header(reader)?;
    let data = read_float_data(reader, data_len(&fdata), status)?;
    Ok((fdata, data))
}
