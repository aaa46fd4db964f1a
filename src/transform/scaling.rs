/// Intensity scaling: `1/NS`, `2^NC` (Bruker) and a flat `1000×`.

use crate::descriptor::{DescriptorSet, Spectrometer};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingOptions {
    pub divide_by_ns: bool,
    pub multiply_by_2_nc: bool,
    pub multiply_by_1000: bool,
}

impl Default for ScalingOptions {
    fn default() -> Self {
        Self {
            divide_by_ns: true,
            multiply_by_2_nc: true,
            multiply_by_1000: true,
        }
    }
}

/// Terms are only applied when the metadata supports them: NS must be
/// positive and NC non-zero on a Bruker set.
pub fn scaling_factor(set: &DescriptorSet, opts: &ScalingOptions) -> f64 {
    let mut factor = 1.0;
    if opts.divide_by_ns {
        if let Some(ns) = set.scans.filter(|&ns| ns > 0) {
            factor /= ns as f64;
        }
    }
    if opts.multiply_by_2_nc && set.spectrometer == Spectrometer::Bruker {
        if let Some(nc) = set.nc.filter(|&nc| nc != 0) {
            factor *= 2f64.powi(nc);
        }
    }
    if opts.multiply_by_1000 {
        factor *= 1000.0;
    }
    factor
}
