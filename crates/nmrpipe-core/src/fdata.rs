//! NMRPipe FDATA header: 512-float array describing a time-domain data set.
//!
//! The header is 2048 bytes (512 × 4-byte floats). Per-axis values are
//! reached through [`NdParm`], which maps the current axis (X, Y, Z, A)
//! onto the physical F2/F1/F3/F4 slots via the dimension order.

use crate::enums::*;
use byteorder::{BigEndian, ByteOrder, LittleEndian, NativeEndian};
use std::fmt;
use thiserror::Error;

// ─── Constants ──────────────────────────────────────────────────────────────

/// Number of 4-byte float values in the FDATA header.
pub const FDATA_SIZE: usize = 512;
/// Header size in bytes.
pub const FDATA_BYTES: usize = FDATA_SIZE * 4;
/// IEEE floating-point format constant.
pub const FD_IEEE_CONS: u32 = 0xEEEEEEEE;
/// Byte-order test constant.
pub const FD_ORDER_CONS: f32 = 2.345;

// ─── General parameter locations ────────────────────────────────────────────

pub const FDFLTFORMAT: usize = 1;
pub const FDFLTORDER: usize = 2;

pub const FDSIZE: usize = 99;
pub const FDSPECNUM: usize = 219;
pub const FD2DPHASE: usize = 256;

pub const FDDIMCOUNT: usize = 9;
pub const FDDIMORDER1: usize = 24;
pub const FDDIMORDER2: usize = 25;
pub const FDDIMORDER3: usize = 26;
pub const FDDIMORDER4: usize = 27;

pub const FDPIPEFLAG: usize = 57;
pub const FDFILECOUNT: usize = 442;
pub const FD2DVIRGIN: usize = 399;

pub const FDMAX: usize = 247;
pub const FDMIN: usize = 248;

pub const FDTEMPERATURE: usize = 157;
pub const FDSCANS: usize = 371;
pub const FDSRCNAME: usize = 286;

pub const FDDMXVAL: usize = 40;
pub const FDDMXFLAG: usize = 41;

// ─── Per-axis locations (F2, F1, F3, F4) ───────────────────────────────────

pub const FDF2LABEL: usize = 16;
pub const FDF1LABEL: usize = 18;
pub const FDF3LABEL: usize = 20;
pub const FDF4LABEL: usize = 22;

pub const FDF2APOD: usize = 95;
pub const FDF1APOD: usize = 428;
pub const FDF3APOD: usize = 50;
pub const FDF4APOD: usize = 53;

pub const FDF2SW: usize = 100;
pub const FDF1SW: usize = 229;
pub const FDF3SW: usize = 11;
pub const FDF4SW: usize = 29;

pub const FDF2OBS: usize = 119;
pub const FDF1OBS: usize = 218;
pub const FDF3OBS: usize = 10;
pub const FDF4OBS: usize = 28;

pub const FDF2ORIG: usize = 101;
pub const FDF1ORIG: usize = 249;
pub const FDF3ORIG: usize = 12;
pub const FDF4ORIG: usize = 30;

pub const FDF2QUADFLAG: usize = 56;
pub const FDF1QUADFLAG: usize = 55;
pub const FDF3QUADFLAG: usize = 51;
pub const FDF4QUADFLAG: usize = 54;

pub const FDF2FTFLAG: usize = 220;
pub const FDF1FTFLAG: usize = 222;
pub const FDF3FTFLAG: usize = 13;
pub const FDF4FTFLAG: usize = 31;

pub const FDF2CAR: usize = 66;
pub const FDF1CAR: usize = 67;
pub const FDF3CAR: usize = 68;
pub const FDF4CAR: usize = 69;

pub const FDF2CENTER: usize = 79;
pub const FDF1CENTER: usize = 80;
pub const FDF3CENTER: usize = 81;
pub const FDF4CENTER: usize = 82;

pub const FDF2FTSIZE: usize = 96;
pub const FDF1FTSIZE: usize = 98;
pub const FDF3FTSIZE: usize = 200;
pub const FDF4FTSIZE: usize = 201;

pub const FDF2TDSIZE: usize = 386;
pub const FDF1TDSIZE: usize = 387;
pub const FDF3TDSIZE: usize = 388;
pub const FDF4TDSIZE: usize = 389;

pub const FDF2AQSIGN: usize = 64;
pub const FDF1AQSIGN: usize = 475;
pub const FDF3AQSIGN: usize = 476;
pub const FDF4AQSIGN: usize = 477;

pub const FDF3SIZE: usize = 15;
pub const FDF4SIZE: usize = 32;

/// Bytes reserved for an axis label.
pub const SIZE_NDLABEL: usize = 8;
/// Bytes reserved for the source name.
pub const SIZE_SRCNAME: usize = 16;

// ─── Generalized ND parameters ─────────────────────────────────────────────

/// Per-axis header parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NdParm {
    Size,
    Apod,
    Sw,
    Orig,
    Obs,
    FtFlag,
    QuadFlag,
    Label,
    Car,
    Center,
    AqSign,
    FtSize,
    TdSize,
}

impl NdParm {
    /// Header slots for this parameter, indexed F2, F1, F3, F4.
    fn locations(self) -> [usize; 4] {
        match self {
            Self::Size => [FDSIZE, FDSPECNUM, FDF3SIZE, FDF4SIZE],
            Self::Apod => [FDF2APOD, FDF1APOD, FDF3APOD, FDF4APOD],
            Self::Sw => [FDF2SW, FDF1SW, FDF3SW, FDF4SW],
            Self::Orig => [FDF2ORIG, FDF1ORIG, FDF3ORIG, FDF4ORIG],
            Self::Obs => [FDF2OBS, FDF1OBS, FDF3OBS, FDF4OBS],
            Self::FtFlag => [FDF2FTFLAG, FDF1FTFLAG, FDF3FTFLAG, FDF4FTFLAG],
            Self::QuadFlag => [FDF2QUADFLAG, FDF1QUADFLAG, FDF3QUADFLAG, FDF4QUADFLAG],
            Self::Label => [FDF2LABEL, FDF1LABEL, FDF3LABEL, FDF4LABEL],
            Self::Car => [FDF2CAR, FDF1CAR, FDF3CAR, FDF4CAR],
            Self::Center => [FDF2CENTER, FDF1CENTER, FDF3CENTER, FDF4CENTER],
            Self::AqSign => [FDF2AQSIGN, FDF1AQSIGN, FDF3AQSIGN, FDF4AQSIGN],
            Self::FtSize => [FDF2FTSIZE, FDF1FTSIZE, FDF3FTSIZE, FDF4FTSIZE],
            Self::TdSize => [FDF2TDSIZE, FDF1TDSIZE, FDF3TDSIZE, FDF4TDSIZE],
        }
    }
}

#[derive(Error, Debug)]
pub enum FdataError {
    #[error("buffer too small for FDATA header: {0} bytes")]
    TooShort(usize),
    #[error("invalid FDATA header: byte order check failed")]
    BadOrder,
}

// ─── FDATA structure ────────────────────────────────────────────────────────

/// The NMRPipe 512-float header array.
#[derive(Clone, PartialEq)]
pub struct Fdata {
    pub data: [f32; FDATA_SIZE],
}

impl Default for Fdata {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Fdata {
    /// A zeroed header.
    pub fn new() -> Self {
        Self {
            data: [0.0f32; FDATA_SIZE],
        }
    }

    /// A header with float format, byte order and dimension order 2 1 3 4.
    pub fn with_defaults() -> Self {
        let mut fd = Self::new();
        fd.data[FDFLTFORMAT] = FD_IEEE_CONS as f32;
        fd.data[FDFLTORDER] = FD_ORDER_CONS;
        fd.data[FDDIMORDER1] = 2.0;
        fd.data[FDDIMORDER2] = 1.0;
        fd.data[FDDIMORDER3] = 3.0;
        fd.data[FDDIMORDER4] = 4.0;
        fd.data[FD2DVIRGIN] = 1.0;
        fd.data[FDFILECOUNT] = 1.0;
        fd.data[FDDIMCOUNT] = 1.0;
        fd
    }

    /// Header slot holding `parm` for the given axis.
    fn loc(&self, parm: NdParm, dim: DimCode) -> Option<usize> {
        let phys = self.data[FDDIMORDER1 + dim.index()] as i32;
        let slot = match phys {
            2 => 0,
            1 => 1,
            3 => 2,
            4 => 3,
            _ => return None,
        };
        Some(parm.locations()[slot])
    }

    pub fn get_parm(&self, parm: NdParm, dim: DimCode) -> f32 {
        self.loc(parm, dim).map(|l| self.data[l]).unwrap_or(0.0)
    }

    pub fn set_parm(&mut self, parm: NdParm, val: f32, dim: DimCode) {
        if let Some(l) = self.loc(parm, dim) {
            self.data[l] = val;
        }
    }

    pub fn dim_count(&self) -> usize {
        self.data[FDDIMCOUNT] as usize
    }

    pub fn set_dim_count(&mut self, n: usize) {
        self.data[FDDIMCOUNT] = n as f32;
    }

    // ─── Text packing ───────────────────────────────────────────────────

    /// Pack `text` into consecutive float slots starting at `loc`.
    pub fn put_text(&mut self, loc: usize, text: &str, max_bytes: usize) {
        let slots = (max_bytes + 3) / 4;
        let end = (loc + slots).min(FDATA_SIZE);
        let mut bytes = vec![0u8; slots * 4];
        let n = text.len().min(max_bytes);
        bytes[..n].copy_from_slice(&text.as_bytes()[..n]);
        for (i, slot) in (loc..end).enumerate() {
            self.data[slot] = NativeEndian::read_f32(&bytes[i * 4..i * 4 + 4]);
        }
    }

    /// Read text packed by [`Fdata::put_text`].
    pub fn get_text(&self, loc: usize, max_bytes: usize) -> String {
        let end = (loc + (max_bytes + 3) / 4).min(FDATA_SIZE);
        let mut bytes = Vec::with_capacity(max_bytes);
        for &v in &self.data[loc..end] {
            bytes.extend_from_slice(&v.to_ne_bytes());
        }
        bytes.truncate(max_bytes);
        let text: Vec<u8> = bytes.into_iter().take_while(|&b| b != 0).collect();
        String::from_utf8_lossy(&text).into_owned()
    }

    pub fn set_label(&mut self, dim: DimCode, label: &str) {
        if let Some(l) = self.loc(NdParm::Label, dim) {
            self.put_text(l, label, SIZE_NDLABEL);
        }
    }

    pub fn get_label(&self, dim: DimCode) -> String {
        self.loc(NdParm::Label, dim)
            .map(|l| self.get_text(l, SIZE_NDLABEL))
            .unwrap_or_default()
    }

    // ─── Header I/O ─────────────────────────────────────────────────────

    /// Serialize to bytes (native endian).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; FDATA_BYTES];
        NativeEndian::write_f32_into(&self.data, &mut buf);
        buf
    }

    /// Deserialize from bytes, detecting the byte order from FDFLTORDER.
    pub fn from_bytes(buf: &[u8]) -> Result<(Self, HdrStatus), FdataError> {
        if buf.len() < FDATA_BYTES {
            return Err(FdataError::TooShort(buf.len()));
        }
        let buf = &buf[..FDATA_BYTES];

        let mut native = Self::new();
        NativeEndian::read_f32_into(buf, &mut native.data);
        if native.order_ok() {
            return Ok((native, HdrStatus::Ok));
        }

        let mut swapped = Self::new();
        if cfg!(target_endian = "little") {
            BigEndian::read_f32_into(buf, &mut swapped.data);
        } else {
            LittleEndian::read_f32_into(buf, &mut swapped.data);
        }
        if swapped.order_ok() {
            return Ok((swapped, HdrStatus::Swapped));
        }
        Err(FdataError::BadOrder)
    }

    fn order_ok(&self) -> bool {
        (self.data[FDFLTORDER] - FD_ORDER_CONS).abs() < 0.001
    }
}

impl fmt::Debug for Fdata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fdata")
            .field("dim_count", &self.dim_count())
            .field("x_size", &self.get_parm(NdParm::Size, DimCode::X))
            .field("y_size", &self.get_parm(NdParm::Size, DimCode::Y))
            .field("z_size", &self.get_parm(NdParm::Size, DimCode::Z))
            .field("x_label", &self.get_label(DimCode::X))
            .finish()
    }
}
