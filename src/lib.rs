//! Bruker and Varian/Agilent time-domain NMR data to NMRPipe.
//!
//! The scanners in [`vendor`] turn a data directory into a
//! [`DescriptorSet`]; [`strategy::convert`] then writes the NMRPipe file,
//! either directly or through a generated `fid.com` script.

pub mod constants;
pub mod descriptor;
pub mod error;
pub mod referencing;
pub mod session;
pub mod strategy;
pub mod transform;
pub mod vendor;

pub use descriptor::{
    AcquisitionMode, CarrierCandidate, DescriptorSet, DimensionDescriptor, PlaneMode, Spectrometer,
};
pub use error::{ConvertError, Result};
pub use session::SessionRecord;
pub use strategy::{convert, CancelToken, ConversionOptions, ConversionReport, Strategy};
pub use vendor::{detect, scan};
