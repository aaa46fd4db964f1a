/// Carrier referencing: water-referenced proton shift and the heteronuclear
/// frequencies derived from it.
///
/// Every function here only proposes candidates; choosing one is left to
/// the caller (the builder applies a default that can be overridden).

use crate::constants::{is_proton, water_ppm, ReferencedNucleus};
use crate::descriptor::{CarrierCandidate, PSEUDO_LABEL};

pub const WATER_LABEL: &str = "H2O";
pub const MANUAL_LABEL: &str = "Manual";

/// Relative tolerance (percent) when matching a measured frequency to a
/// referenced zero-ppm frequency.
const MATCH_TOLERANCE_PERCENT: f64 = 1.0;

/// Zero-ppm proton frequency derived from the direct observe frequency,
/// assuming the direct carrier sits on water.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterReference {
    pub water_ppm: f64,
    /// MHz.
    pub sfrq0: f64,
}

impl WaterReference {
    pub fn new(direct_frequency_mhz: f64, temperature_k: f64) -> Self {
        let water = water_ppm(temperature_k);
        Self {
            water_ppm: water,
            sfrq0: direct_frequency_mhz / (1.0 + water * 1e-6),
        }
    }

    pub fn zero_ppm_frequency(&self, nucleus: ReferencedNucleus, varian: bool) -> f64 {
        self.sfrq0 * nucleus.ratio(varian)
    }

    pub fn referenced_ppm(&self, nucleus: ReferencedNucleus, freq_mhz: f64, varian: bool) -> f64 {
        let f0 = self.zero_ppm_frequency(nucleus, varian);
        (freq_mhz - f0) / f0 * 1e6
    }

    /// Match a measured frequency to a referenced nucleus (or to proton)
    /// within 1 %, returning the candidate it yields.
    pub fn match_frequency(&self, freq_mhz: f64, varian: bool) -> Option<CarrierCandidate> {
        let within = |f0: f64| f0 != 0.0 && ((freq_mhz - f0).abs() / f0 * 100.0) < MATCH_TOLERANCE_PERCENT;
        for nucleus in ReferencedNucleus::ALL {
            let f0 = self.zero_ppm_frequency(nucleus, varian);
            if within(f0) {
                return Some(CarrierCandidate::new(
                    referenced_label(nucleus, varian),
                    self.referenced_ppm(nucleus, freq_mhz, varian),
                ));
            }
        }
        if within(self.sfrq0) {
            return Some(CarrierCandidate::new(WATER_LABEL, self.water_ppm));
        }
        None
    }
}

pub fn referenced_label(nucleus: ReferencedNucleus, varian: bool) -> String {
    format!("{} (Referenced to H2O)", nucleus.label(varian))
}

/// `O/BF` carrier in ppm; a zero base frequency yields 0.
pub fn offset_ratio(offset_hz: f64, base_mhz: f64) -> f64 {
    if base_mhz == 0.0 {
        0.0
    } else {
        offset_hz / base_mhz
    }
}

/// Transmitter offsets `O1..O3` (Hz) and base frequencies `BF1..BF3` (MHz).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BrukerOffsets {
    pub o: [f64; 3],
    pub bf: [f64; 3],
}

impl BrukerOffsets {
    fn candidates(&self, count: usize) -> Vec<CarrierCandidate> {
        (0..count)
            .map(|i| {
                CarrierCandidate::new(
                    format!("O{}/BF{}", i + 1, i + 1),
                    offset_ratio(self.o[i], self.bf[i]),
                )
            })
            .collect()
    }
}

/// Carrier candidates and default selection for one dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionCarriers {
    pub candidates: Vec<CarrierCandidate>,
    pub default: Option<usize>,
}

/// Bruker candidates for every dimension.
///
/// `labels` and `frequencies` are per dimension (direct first). Pseudo
/// dimensions get no candidates.
pub fn bruker_carriers(
    labels: &[String],
    frequencies: &[f64],
    temperature_k: f64,
    offsets: &BrukerOffsets,
) -> Vec<DimensionCarriers> {
    let Some(direct_label) = labels.first() else {
        return Vec::new();
    };
    let proton = is_proton(direct_label);
    let water = WaterReference::new(frequencies.first().copied().unwrap_or(0.0), temperature_k);
    let one_d = labels.len() == 1;

    let mut direct = Vec::new();
    if proton {
        direct.push(CarrierCandidate::new(WATER_LABEL, water.water_ppm));
    }
    direct.extend(offsets.candidates(if one_d { 1 } else { 3 }));
    let mut out = vec![DimensionCarriers {
        candidates: direct,
        default: Some(0),
    }];
    if one_d {
        return out;
    }

    // Shared list offered to every indirect dimension.
    let mut other = Vec::new();
    if proton {
        for (label, &freq) in labels.iter().zip(frequencies) {
            if let Some(nucleus) = ReferencedNucleus::from_label(label) {
                other.push((
                    Some(nucleus),
                    CarrierCandidate::new(
                        referenced_label(nucleus, false),
                        water.referenced_ppm(nucleus, freq, false),
                    ),
                ));
            }
        }
    }
    let referenced = other.len();
    other.extend(offsets.candidates(3).into_iter().map(|c| (None, c)));

    for label in &labels[1..] {
        if label == PSEUDO_LABEL || label.starts_with("ID_") {
            out.push(DimensionCarriers {
                candidates: Vec::new(),
                default: None,
            });
            continue;
        }
        let nucleus = ReferencedNucleus::from_label(label);
        let default = other
            .iter()
            .position(|(n, _)| n.is_some() && *n == nucleus)
            .unwrap_or(referenced);
        out.push(DimensionCarriers {
            candidates: other.iter().map(|(_, c)| c.clone()).collect(),
            default: Some(default),
        });
    }
    out
}

/// Varian candidates: water plus manual for a proton direct dimension;
/// indirect frequencies within 1 % of a referenced nucleus add a
/// referenced candidate ahead of `Manual`.
pub fn varian_carriers(
    direct_label: &str,
    direct_frequency_mhz: f64,
    indirect_frequencies: &[f64],
    temperature_k: f64,
) -> Vec<DimensionCarriers> {
    let manual = || CarrierCandidate::new(MANUAL_LABEL, 0.0);
    let mut out = Vec::with_capacity(indirect_frequencies.len() + 1);
    if !is_proton(direct_label) {
        out.push(DimensionCarriers {
            candidates: vec![manual()],
            default: Some(0),
        });
        out.extend(indirect_frequencies.iter().map(|_| DimensionCarriers {
            candidates: vec![manual()],
            default: Some(0),
        }));
        return out;
    }

    let water = WaterReference::new(direct_frequency_mhz, temperature_k);
    out.push(DimensionCarriers {
        candidates: vec![CarrierCandidate::new(WATER_LABEL, water.water_ppm), manual()],
        default: Some(0),
    });
    for &freq in indirect_frequencies {
        let mut candidates = Vec::new();
        if let Some(c) = water.match_frequency(freq, true) {
            candidates.push(c);
        }
        candidates.push(manual());
        out.push(DimensionCarriers {
            candidates,
            default: Some(0),
        });
    }
    out
}
