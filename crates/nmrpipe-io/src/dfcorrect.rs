//! Bruker digital-filter (group-delay) removal.
//!
//! Oversampled Bruker FIDs start with a filter transient of `grpdly`
//! sample periods. The correction is a circular time shift applied in
//! the frequency domain, so fractional delays are handled exactly:
//!
//! ```text
//!   1. Forward FFT of the complex FID (length N, no padding)
//!   2. Multiply bin k by exp(+j·2π·k'·grpdly/N), k' the signed bin index
//!   3. Inverse FFT and divide by N
//! ```
//!
//! The output has the same length as the input, and `grpdly = 0` is the
//! identity.

use num_complex::Complex32;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;

/// Re-usable group-delay corrector for vectors of one length.
pub struct GroupDelayCorrector {
    size: usize,
    grpdly: f64,
    /// Per-bin phase ramp, precomputed.
    ramp: Vec<Complex32>,
    fwd: Arc<dyn Fft<f32>>,
    inv: Arc<dyn Fft<f32>>,
}

impl GroupDelayCorrector {
    /// `size`: complex points per vector. `grpdly`: delay in sample periods.
    pub fn new(size: usize, grpdly: f64) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fwd = planner.plan_fft_forward(size);
        let inv = planner.plan_fft_inverse(size);

        let ramp = (0..size)
            .map(|k| {
                let signed = if k <= size / 2 {
                    k as f64
                } else {
                    k as f64 - size as f64
                };
                let angle = 2.0 * PI * signed * grpdly / size as f64;
                Complex32::new(angle.cos() as f32, angle.sin() as f32)
            })
            .collect();

        Self {
            size,
            grpdly,
            ramp,
            fwd,
            inv,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn grpdly(&self) -> f64 {
        self.grpdly
    }

    /// Shift one vector in place. Vectors of another length are left alone.
    pub fn correct(&self, row: &mut [Complex32]) {
        if row.len() != self.size || self.size == 0 || self.grpdly == 0.0 {
            return;
        }
        let mut scratch = vec![Complex32::zero(); self.fwd.get_inplace_scratch_len()];
        self.fwd.process_with_scratch(row, &mut scratch);

        for (z, r) in row.iter_mut().zip(&self.ramp) {
            *z *= *r;
        }

        scratch.resize(self.inv.get_inplace_scratch_len(), Complex32::zero());
        self.inv.process_with_scratch(row, &mut scratch);

        let inv_n = 1.0 / self.size as f32;
        for z in row.iter_mut() {
            *z *= inv_n;
        }
    }

    /// Shift every consecutive `size`-point vector of `data`.
    pub fn correct_rows(&self, data: &mut [Complex32]) {
        if self.size == 0 {
            return;
        }
        for row in data.chunks_exact_mut(self.size) {
            self.correct(row);
        }
    }
}

/// Group delay for firmware versions that do not store `GRPDLY`,
/// keyed by `DSPFVS` and `DECIM`. Unknown combinations give `None`.
pub fn grpdly_from_firmware(decim: f64, dspfvs: i32) -> Option<f64> {
    if decim <= 1.0 {
        return Some(0.0);
    }
    let d = decim.round() as i32;
    let value = match dspfvs {
        10 => match d {
            2 => 44.75,
            3 => 33.5,
            4 => 66.625,
            6 => 59.0833,
            8 => 68.5625,
            12 => 60.375,
            16 => 69.5313,
            24 => 61.0208,
            32 => 70.0156,
            48 => 61.3438,
            64 => 70.2578,
            96 => 61.5052,
            128 => 70.3789,
            192 => 61.5859,
            256 => 70.4395,
            384 => 61.6263,
            512 => 70.4697,
            768 => 61.6465,
            1024 => 70.4849,
            1536 => 61.6566,
            2048 => 70.4924,
            _ => return None,
        },
        11 => match d {
            2 => 46.0,
            3 => 36.5,
            4 => 48.0,
            6 => 50.1667,
            8 => 53.25,
            12 => 69.5,
            16 => 72.25,
            24 => 70.1667,
            32 => 72.75,
            48 => 70.5,
            64 => 73.0,
            96 => 70.6667,
            128 => 72.5,
            192 => 71.3333,
            256 => 72.25,
            384 => 71.6667,
            512 => 72.125,
            768 => 71.8333,
            1024 => 72.0625,
            1536 => 71.9167,
            2048 => 72.0313,
            _ => return None,
        },
        12 => match d {
            2 => 46.311,
            3 => 36.530,
            4 => 47.870,
            6 => 50.229,
            8 => 53.289,
            12 => 69.551,
            16 => 71.600,
            24 => 70.184,
            32 => 72.138,
            48 => 70.528,
            64 => 72.348,
            96 => 70.700,
            128 => 72.524,
            _ => return None,
        },
        _ => return None,
    };
    Some(value)
}

// ─── Tests ──────────────────────────────────────────────────────────────────
