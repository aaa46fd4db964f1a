/// Canonical per-dimension description of an acquisition.
///
/// Dimension 0 is the direct (innermost) dimension; higher indices are
/// the indirect dimensions in spectrometer order (F1, F2, ...).

use crate::error::{ConvertError, Result};
use crate::transform::nus::NusSettings;
use nmrpipe_core::enums::Phase2D;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Sentinel label for a non-frequency (pseudo) axis.
pub const PSEUDO_LABEL: &str = "ID";

// ─── Enums ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Spectrometer {
    Bruker,
    Varian,
}

impl fmt::Display for Spectrometer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Bruker => write!(f, "Bruker"),
            Self::Varian => write!(f, "Varian"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    Direct,
    Real,
    Complex,
    States,
    Tppi,
    StatesTppi,
    RanceKay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Time,
    Frequency,
}

/// Quadrature scheme as named by the external converters' `-xMODE` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcquisitionMode {
    Dqd,
    Complex,
    Sequential,
    Real,
    States,
    StatesTppi,
    EchoAntiEcho,
    Tppi,
    RanceKay,
}

impl AcquisitionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dqd => "DQD",
            Self::Complex => "Complex",
            Self::Sequential => "Sequential",
            Self::Real => "Real",
            Self::States => "States",
            Self::StatesTppi => "States-TPPI",
            Self::EchoAntiEcho => "Echo-AntiEcho",
            Self::Tppi => "TPPI",
            Self::RanceKay => "Rance-Kay",
        }
    }

    /// Map a mode word found in a pulse program or acquNs file.
    /// `QF` marks a pseudo axis; anything unrecognised is complex.
    pub fn from_detected(word: &str) -> Self {
        match word.to_ascii_uppercase().as_str() {
            "QF" | "REAL" => Self::Real,
            "ECHO-ANTIECHO" => Self::EchoAntiEcho,
            "STATES-TPPI" => Self::StatesTppi,
            "STATES" => Self::States,
            "TPPI" => Self::Tppi,
            _ => Self::Complex,
        }
    }

    pub fn encoding(self, direct: bool) -> Encoding {
        if direct {
            return Encoding::Direct;
        }
        match self {
            Self::Real => Encoding::Real,
            Self::States => Encoding::States,
            Self::Tppi => Encoding::Tppi,
            Self::StatesTppi => Encoding::StatesTppi,
            Self::EchoAntiEcho | Self::RanceKay => Encoding::RanceKay,
            Self::Complex | Self::Dqd | Self::Sequential => Encoding::Complex,
        }
    }

    pub fn is_rance_kay(self) -> bool {
        matches!(self, Self::EchoAntiEcho | Self::RanceKay)
    }

    pub fn direct_choices(spectrometer: Spectrometer) -> &'static [AcquisitionMode] {
        match spectrometer {
            Spectrometer::Bruker => &[Self::Dqd, Self::Complex, Self::Sequential, Self::Real],
            Spectrometer::Varian => &[Self::Complex, Self::Sequential, Self::Real, Self::Dqd],
        }
    }

    pub fn indirect_choices(spectrometer: Spectrometer) -> &'static [AcquisitionMode] {
        match spectrometer {
            Spectrometer::Bruker => &[
                Self::Complex,
                Self::StatesTppi,
                Self::EchoAntiEcho,
                Self::Tppi,
                Self::States,
                Self::Real,
            ],
            Spectrometer::Varian => &[
                Self::Complex,
                Self::StatesTppi,
                Self::RanceKay,
                Self::EchoAntiEcho,
                Self::Tppi,
                Self::States,
                Self::Real,
            ],
        }
    }
}

impl fmt::Display for AcquisitionMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AcquisitionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let all = [
            Self::Dqd,
            Self::Complex,
            Self::Sequential,
            Self::Real,
            Self::States,
            Self::StatesTppi,
            Self::EchoAntiEcho,
            Self::Tppi,
            Self::RanceKay,
        ];
        all.into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown acquisition mode '{}'", s))
    }
}

/// Mode of the first indirect plane (`-aq2D`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaneMode {
    States,
    Tppi,
    Magnitude,
    Real,
    Complex,
    Image,
}

impl PlaneMode {
    pub const CHOICES: [PlaneMode; 6] = [
        Self::States,
        Self::Tppi,
        Self::Magnitude,
        Self::Real,
        Self::Complex,
        Self::Image,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::States => "States",
            Self::Tppi => "TPPI",
            Self::Magnitude => "Magnitude",
            Self::Real => "Real",
            Self::Complex => "Complex",
            Self::Image => "Image",
        }
    }

    /// Header `FD2DPHASE` value.
    pub fn phase2d(self) -> Phase2D {
        match self {
            Self::States | Self::Complex => Phase2D::States,
            Self::Tppi => Phase2D::Tppi,
            Self::Magnitude | Self::Real => Phase2D::Magnitude,
            Self::Image => Phase2D::Image,
        }
    }
}

impl FromStr for PlaneMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::CHOICES
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown plane mode '{}'", s))
    }
}

// ─── Auxiliary records ──────────────────────────────────────────────────

/// One offered carrier reference, e.g. `H2O` or `O1/BF1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarrierCandidate {
    pub label: String,
    pub ppm: f64,
}

impl CarrierCandidate {
    pub fn new(label: impl Into<String>, ppm: f64) -> Self {
        Self {
            label: label.into(),
            ppm,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum DigitalFilter {
    Unavailable,
    Available { decim: f64, dspfvs: i32, grpdly: f64 },
}

impl DigitalFilter {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }
}

/// Where the raw FID lives and how its words are encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "vendor", rename_all = "lowercase")]
pub enum RawLayout {
    Bruker {
        file: PathBuf,
        big_endian: bool,
        float64: bool,
    },
    Varian {
        file: PathBuf,
    },
}

impl RawLayout {
    pub fn file(&self) -> &Path {
        match self {
            Self::Bruker { file, .. } | Self::Varian { file } => file,
        }
    }
}

// ─── DimensionDescriptor ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionDescriptor {
    /// Time-domain point count (`-xN`): values per FID for the direct
    /// dimension, FIDs for an indirect one.
    pub size: usize,
    /// Points after quadrature pairing (`-xT`).
    pub real_size: usize,
    pub is_complex: bool,
    /// Hz.
    pub sweep_width: f64,
    /// MHz.
    pub observe_frequency: f64,
    /// Hz.
    pub carrier: f64,
    pub label: String,
    pub encoding: Encoding,
    pub domain: Domain,
    pub mode: AcquisitionMode,
    pub carrier_candidates: Vec<CarrierCandidate>,
    /// Index into `carrier_candidates`; `None` once the carrier is set by hand.
    pub carrier_selection: Option<usize>,
}

impl DimensionDescriptor {
    /// A complex dimension of `size` time-domain points.
    pub fn new(size: usize, label: &str, direct: bool) -> Self {
        let mode = if direct {
            AcquisitionMode::Dqd
        } else {
            AcquisitionMode::Complex
        };
        Self {
            size,
            real_size: size / 2,
            is_complex: true,
            sweep_width: 0.0,
            observe_frequency: 0.0,
            carrier: 0.0,
            label: label.to_string(),
            encoding: mode.encoding(direct),
            domain: Domain::Time,
            mode,
            carrier_candidates: Vec::new(),
            carrier_selection: None,
        }
    }

    pub fn carrier_ppm(&self) -> f64 {
        if self.observe_frequency == 0.0 {
            0.0
        } else {
            self.carrier / self.observe_frequency
        }
    }

    pub fn set_carrier_ppm(&mut self, ppm: f64) {
        self.carrier = ppm * self.observe_frequency;
        self.carrier_selection = None;
    }

    /// Apply candidate `index`; out-of-range indices are ignored.
    pub fn select_carrier(&mut self, index: usize) -> bool {
        match self.carrier_candidates.get(index) {
            Some(c) => {
                self.carrier = c.ppm * self.observe_frequency;
                self.carrier_selection = Some(index);
                true
            }
            None => false,
        }
    }

    /// Change the quadrature mode and keep the point counts consistent.
    pub fn set_mode(&mut self, mode: AcquisitionMode, direct: bool) {
        self.mode = mode;
        self.encoding = mode.encoding(direct);
        self.is_complex = mode != AcquisitionMode::Real;
        self.real_size = if self.is_complex {
            self.size / 2
        } else {
            self.size
        };
    }

    /// Retag as a non-frequency axis.
    pub fn make_pseudo(&mut self, label: &str) {
        self.set_mode(AcquisitionMode::Real, false);
        self.sweep_width = 0.0;
        self.observe_frequency = 1.0;
        self.carrier = 0.0;
        self.label = label.to_string();
        self.carrier_candidates.clear();
        self.carrier_selection = None;
    }

    pub fn is_pseudo(&self) -> bool {
        self.encoding == Encoding::Real
    }
}

// ─── DescriptorSet ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptorSet {
    pub spectrometer: Spectrometer,
    pub dims: Vec<DimensionDescriptor>,
    pub requires_rancekay_shuffle: bool,
    pub plane_mode: PlaneMode,
    /// Kelvin.
    pub temperature: f64,
    pub scans: Option<u32>,
    pub nc: Option<i32>,
    pub digital_filter: DigitalFilter,
    pub raw: RawLayout,
    pub pseudo_count: usize,
    pub pseudo_detector: Option<String>,
    pub reverse_acquisition_order: bool,
    pub arrayed_parameter: Option<String>,
    pub nus: Option<NusSettings>,
}

impl DescriptorSet {
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    pub fn direct(&self) -> Option<&DimensionDescriptor> {
        self.dims.first()
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=3).contains(&self.ndim()) {
            return Err(ConvertError::UnsupportedDimensions(self.ndim()));
        }
        Ok(())
    }

    /// Labels used by more than one dimension, in first-seen order.
    pub fn duplicate_labels(&self) -> Vec<String> {
        let mut dups: Vec<String> = Vec::new();
        for (i, d) in self.dims.iter().enumerate() {
            let repeated = self.dims[..i].iter().any(|o| o.label == d.label);
            if repeated && !dups.contains(&d.label) {
                dups.push(d.label.clone());
            }
        }
        dups
    }

    pub fn set_mode(&mut self, dim: usize, mode: AcquisitionMode) -> Result<()> {
        let d = self
            .dims
            .get_mut(dim)
            .ok_or(ConvertError::UnsupportedDimensions(dim + 1))?;
        d.set_mode(mode, dim == 0);
        self.refresh();
        Ok(())
    }

    pub fn set_label(&mut self, dim: usize, label: &str) -> Result<()> {
        let d = self
            .dims
            .get_mut(dim)
            .ok_or(ConvertError::UnsupportedDimensions(dim + 1))?;
        d.label = label.to_string();
        Ok(())
    }

    /// Indirect dimensions that need the Rance-Kay reshuffle.
    pub fn rancekay_dims(&self) -> Vec<usize> {
        self.dims
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, d)| d.encoding == Encoding::RanceKay)
            .map(|(i, _)| i)
            .collect()
    }

    /// A 2-D set whose indirect axis is not frequency encoded.
    pub fn is_pseudo_2d(&self) -> bool {
        self.ndim() == 2 && self.dims[1].is_pseudo()
    }

    pub fn default_plane_mode(&self) -> PlaneMode {
        if self.is_pseudo_2d() {
            PlaneMode::Real
        } else {
            PlaneMode::States
        }
    }

    /// Recompute the derived flags after dimensions change.
    pub fn refresh(&mut self) {
        self.requires_rancekay_shuffle = !self.rancekay_dims().is_empty();
        self.pseudo_count = self.dims.iter().skip(1).filter(|d| d.is_pseudo()).count();
    }

    /// Number of FIDs the raw file holds for this geometry.
    pub fn fid_count(&self) -> usize {
        self.dims.iter().skip(1).map(|d| d.size.max(1)).product()
    }
}
