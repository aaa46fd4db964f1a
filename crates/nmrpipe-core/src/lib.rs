//! NMRPipe header model: the 512-float FDATA array, its per-axis
//! parameter table and the enumerations stored in it.

pub mod enums;
pub mod fdata;
pub mod params;

pub use enums::*;
pub use fdata::*;
pub use params::*;
