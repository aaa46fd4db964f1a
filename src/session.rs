/// Saved conversion sessions (`parameters.json`).
///
/// A session captures every value a user can adjust before converting so
/// the same conversion can be repeated on the directory later. Loading
/// checks that the saved spectrometer matches the data before applying.

use crate::descriptor::{AcquisitionMode, DescriptorSet, DigitalFilter, PlaneMode, Spectrometer};
use crate::error::{ConvertError, Result};
use crate::strategy::ConversionOptions;
use crate::transform::filter::FilterMode;
use crate::transform::nus::NusSettings;
use crate::transform::scaling::{scaling_factor, ScalingOptions};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const SESSION_FILE: &str = "parameters.json";

// ─── Record blocks ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralBlock {
    pub spectrometer: Spectrometer,
    pub temperature: f64,
    pub scans: Option<u32>,
    pub plane_mode: PlaneMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionRecord {
    pub size: usize,
    pub real_size: usize,
    pub mode: AcquisitionMode,
    /// Position of `mode` in the spectrometer's mode choices.
    pub mode_index: Option<usize>,
    pub sweep_width: f64,
    pub observe_frequency: f64,
    pub label: String,
    /// ppm.
    pub carrier: f64,
    pub carrier_label: Option<String>,
    pub carrier_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingBlock {
    #[serde(flatten)]
    pub options: ScalingOptions,
    pub factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitalFilterBlock {
    pub enabled: bool,
    pub mode: FilterMode,
    pub decim: Option<f64>,
    pub dspfvs: Option<i32>,
    pub grpdly: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherBlock {
    pub remove_acquisition_padding: bool,
    pub bad_point_threshold: f64,
}

/// `None` is stored as the string `"N/A"`.
mod nus_or_na {
    use super::NusSettings;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    const NOT_APPLICABLE: &str = "N/A";

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Stored {
        Settings(NusSettings),
        Sentinel(String),
    }

    pub fn serialize<S: Serializer>(v: &Option<NusSettings>, s: S) -> Result<S::Ok, S::Error> {
        match v {
            Some(nus) => nus.serialize(s),
            None => s.serialize_str(NOT_APPLICABLE),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NusSettings>, D::Error> {
        match Stored::deserialize(d)? {
            Stored::Settings(nus) => Ok(Some(nus)),
            Stored::Sentinel(_) => Ok(None),
        }
    }
}

// ─── SessionRecord ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub saved_at: DateTime<Local>,
    pub version: String,
    pub general: GeneralBlock,
    pub spectral_parameters: Vec<DimensionRecord>,
    pub intensity_scaling: ScalingBlock,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digital_filter: Option<DigitalFilterBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other: Option<OtherBlock>,
    #[serde(with = "nus_or_na")]
    pub nus: Option<NusSettings>,
}

impl SessionRecord {
    /// Snapshot of the current descriptors and options.
    pub fn from_descriptors(set: &DescriptorSet, opts: &ConversionOptions) -> Self {
        let spectral_parameters = set
            .dims
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let choices = if i == 0 {
                    AcquisitionMode::direct_choices(set.spectrometer)
                } else {
                    AcquisitionMode::indirect_choices(set.spectrometer)
                };
                let candidate = d
                    .carrier_selection
                    .and_then(|idx| d.carrier_candidates.get(idx));
                DimensionRecord {
                    size: d.size,
                    real_size: d.real_size,
                    mode: d.mode,
                    mode_index: choices.iter().position(|&m| m == d.mode),
                    sweep_width: d.sweep_width,
                    observe_frequency: d.observe_frequency,
                    label: d.label.clone(),
                    carrier: d.carrier_ppm(),
                    carrier_label: candidate.map(|c| c.label.clone()),
                    carrier_index: candidate.and(d.carrier_selection),
                }
            })
            .collect();

        let bruker = set.spectrometer == Spectrometer::Bruker;
        let digital_filter = bruker.then(|| {
            let (decim, dspfvs, grpdly) = match set.digital_filter {
                DigitalFilter::Available {
                    decim,
                    dspfvs,
                    grpdly,
                } => (Some(decim), Some(dspfvs), Some(grpdly)),
                DigitalFilter::Unavailable => (None, None, None),
            };
            DigitalFilterBlock {
                enabled: opts.use_digital_filter,
                mode: opts.filter_mode,
                decim,
                dspfvs,
                grpdly,
            }
        });
        let other = bruker.then(|| OtherBlock {
            remove_acquisition_padding: true,
            bad_point_threshold: opts.bad_point_threshold,
        });

        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            saved_at: Local::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            general: GeneralBlock {
                spectrometer: set.spectrometer,
                temperature: set.temperature,
                scans: set.scans,
                plane_mode: set.plane_mode,
            },
            spectral_parameters,
            intensity_scaling: ScalingBlock {
                options: opts.scaling,
                factor: scaling_factor(set, &opts.scaling),
            },
            digital_filter,
            other,
            nus: opts.effective_nus(set),
        }
    }

    pub fn path(dir: &Path) -> PathBuf {
        dir.join(SESSION_FILE)
    }

    /// Write `parameters.json` into `dir`.
    pub fn save(&self, dir: &Path, overwrite: bool) -> Result<PathBuf> {
        let path = Self::path(dir);
        if path.exists() && !overwrite {
            return Err(ConvertError::OutputExists(path));
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json).map_err(|e| ConvertError::io(&path, e))?;
        log::info!("Saved session {} to {}", self.session_id, path.display());
        Ok(path)
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let path = Self::path(dir);
        let text = std::fs::read_to_string(&path).map_err(|e| ConvertError::io(&path, e))?;
        let record: Self = serde_json::from_str(&text)?;
        log::info!(
            "Loaded session {} saved {} by version {}",
            record.session_id,
            record.saved_at.format("%Y-%m-%d %H:%M:%S"),
            record.version
        );
        Ok(record)
    }

    /// Refuse a session saved for the other vendor.
    pub fn check_mismatch(&self, current: Spectrometer) -> Result<()> {
        if self.general.spectrometer != current {
            return Err(ConvertError::SessionMismatch {
                saved: self.general.spectrometer.to_string(),
                current: current.to_string(),
            });
        }
        Ok(())
    }

    /// Overwrite the adjustable descriptor values with the saved ones.
    pub fn apply_to(&self, set: &mut DescriptorSet) -> Result<()> {
        self.check_mismatch(set.spectrometer)?;
        if self.spectral_parameters.len() != set.ndim() {
            log::warn!(
                "Session has {} dimensions, data has {}; applying the common ones",
                self.spectral_parameters.len(),
                set.ndim()
            );
        }

        for (i, (rec, d)) in self.spectral_parameters.iter().zip(set.dims.iter_mut()).enumerate() {
            d.size = rec.size;
            d.set_mode(rec.mode, i == 0);
            d.real_size = rec.real_size;
            d.sweep_width = rec.sweep_width;
            d.observe_frequency = rec.observe_frequency;
            d.label = rec.label.clone();

            let same_candidate = match (rec.carrier_index, &rec.carrier_label) {
                (Some(idx), Some(label)) => d
                    .carrier_candidates
                    .get(idx)
                    .is_some_and(|c| &c.label == label),
                _ => false,
            };
            match rec.carrier_index {
                Some(idx) if same_candidate => {
                    d.select_carrier(idx);
                }
                _ => d.set_carrier_ppm(rec.carrier),
            }
            log::debug!("dim {}: restored {} {} {}", i, d.label, d.mode, d.carrier_ppm());
        }

        set.temperature = self.general.temperature;
        set.scans = self.general.scans;
        set.plane_mode = self.general.plane_mode;
        set.refresh();
        Ok(())
    }

    /// Restore the saved conversion options.
    pub fn apply_options(&self, opts: &mut ConversionOptions) {
        opts.scaling = self.intensity_scaling.options;
        if let Some(df) = &self.digital_filter {
            opts.use_digital_filter = df.enabled;
            opts.filter_mode = df.mode;
        }
        if let Some(other) = &self.other {
            opts.bad_point_threshold = other.bad_point_threshold;
        }
        if let Some(nus) = &self.nus {
            opts.nus_reverse = nus.reverse;
            opts.nus = Some(nus.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::tests::sample_set;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip() {
        let tmp = TempDir::new().unwrap();
        let mut set = sample_set();
        set.set_label(1, "13C").unwrap();
        set.dims[1].set_carrier_ppm(42.5);
        let opts = ConversionOptions::default();
        let rec = SessionRecord::from_descriptors(&set, &opts);
        rec.save(tmp.path(), false).unwrap();

        let loaded = SessionRecord::load(tmp.path()).unwrap();
        assert_eq!(loaded.session_id, rec.session_id);
        assert_eq!(loaded.general.spectrometer, Spectrometer::Bruker);
        assert_eq!(loaded.spectral_parameters[0].carrier_label.as_deref(), Some("H2O"));
        assert!(loaded.nus.is_none());

        let mut fresh = sample_set();
        loaded.apply_to(&mut fresh).unwrap();
        assert_eq!(fresh.dims[1].label, "13C");
        assert!((fresh.dims[1].carrier_ppm() - 42.5).abs() < 1e-9);
        assert_eq!(fresh.dims[0].carrier_selection, Some(0));
    }

    #[test]
    fn test_nus_sentinel() {
        let set = sample_set();
        let rec = SessionRecord::from_descriptors(&set, &ConversionOptions::default());
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["nus"], "N/A");
        assert!(json["digital_filter"]["enabled"].as_bool().unwrap());
        assert_eq!(json["intensity_scaling"]["factor"], 125.0);
    }

    #[test]
    fn test_save_requires_overwrite() {
        let tmp = TempDir::new().unwrap();
        let rec = SessionRecord::from_descriptors(&sample_set(), &ConversionOptions::default());
        rec.save(tmp.path(), false).unwrap();
        let err = rec.save(tmp.path(), false).unwrap_err();
        assert!(err.requires_confirmation());
        assert!(rec.save(tmp.path(), true).is_ok());
    }

    #[test]
    fn test_mismatch() {
        let mut set = sample_set();
        set.spectrometer = Spectrometer::Varian;
        let rec = SessionRecord::from_descriptors(&set, &ConversionOptions::default());
        assert!(rec.digital_filter.is_none());
        let mut bruker = sample_set();
        let err = rec.apply_to(&mut bruker).unwrap_err();
        assert!(matches!(err, ConvertError::SessionMismatch { .. }));
    }
}
