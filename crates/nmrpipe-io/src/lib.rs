//! NMRPipe I/O: header and vector writing, read-back, and Bruker
//! digital-filter (group-delay) correction.

pub mod dfcorrect;
pub mod reader;
pub mod writer;

pub use dfcorrect::*;
pub use reader::*;
pub use writer::*;
