/// Bruker digital-filter handling for the direct strategy.

use super::FidArray;
use crate::descriptor::DigitalFilter;
use nmrpipe_core::fdata::Fdata;
use nmrpipe_io::dfcorrect::{grpdly_from_firmware, GroupDelayCorrector};
use serde::{Deserialize, Serialize};

/// When the group delay is dealt with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FilterMode {
    /// Shift the FID before writing.
    #[default]
    BeforeFt,
    /// Leave the FID alone and record the delay in the header for the
    /// Fourier transform to remove.
    AfterFt,
}

/// Effective group delay in sample periods, or `None` if unknown.
pub fn effective_grpdly(filter: &DigitalFilter) -> Option<f64> {
    match *filter {
        DigitalFilter::Unavailable => None,
        DigitalFilter::Available { grpdly, .. } if grpdly > 0.0 => Some(grpdly),
        DigitalFilter::Available { decim, dspfvs, .. } => grpdly_from_firmware(decim, dspfvs),
    }
}

/// Remove the group delay from every direct-dimension row. Returns the
/// delay applied.
pub fn remove_digital_filter(array: &mut FidArray, filter: &DigitalFilter) -> Option<f64> {
    let grpdly = effective_grpdly(filter)?;
    let corrector = GroupDelayCorrector::new(array.row_len(), grpdly);
    corrector.correct_rows(&mut array.data);
    log::info!(
        "Removed digital filter: grpdly={:.4} over {} rows",
        grpdly,
        array.len() / array.row_len().max(1)
    );
    Some(grpdly)
}

/// Record an uncorrected delay in the header (`FDDMXVAL`, `FDDMXFLAG`).
pub fn mark_filter_in_header(fdata: &mut Fdata, filter: &DigitalFilter) -> Option<f64> {
    let grpdly = effective_grpdly(filter)?;
    fdata.set_dmx(grpdly as f32, 1.0);
    Some(grpdly)
}
