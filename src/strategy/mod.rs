/// Conversion strategies.
///
/// Both consume the same [`DescriptorSet`]: `direct` runs the transforms
/// and writes the NMRPipe file itself, `script` writes `fid.com` for the
/// NMRPipe converters and runs it.

pub mod command;
pub mod direct;
pub mod script;

use crate::descriptor::DescriptorSet;
use crate::error::{ConvertError, Result};
use crate::transform::filter::FilterMode;
use crate::transform::nus::NusSettings;
use crate::transform::scaling::{scaling_factor, ScalingOptions};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const DEFAULT_OUTPUT: &str = "test.fid";
pub const SCRIPT_NAME: &str = "fid.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Direct,
    Script,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Script => write!(f, "script"),
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "script" => Ok(Self::Script),
            other => Err(format!("unknown strategy '{}' (expected direct or script)", other)),
        }
    }
}

/// Options shared by both strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOptions {
    pub strategy: Strategy,
    /// Confirms overwriting existing outputs and converting with
    /// duplicate labels.
    pub overwrite: bool,
    /// Bound on the external tool run.
    pub timeout_secs: u64,
    pub use_digital_filter: bool,
    pub filter_mode: FilterMode,
    /// Replaces the schedule found by the scanner.
    pub nus: Option<NusSettings>,
    pub nus_reverse: bool,
    pub scaling: ScalingOptions,
    /// `bruk2pipe -bad` threshold.
    pub bad_point_threshold: f64,
    /// Fold the 90° correction into the Rance-Kay shuffle.
    pub rotate_phase: bool,
    pub output: String,
    pub write_script_only: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            strategy: Strategy::Direct,
            overwrite: false,
            timeout_secs: 600,
            use_digital_filter: true,
            filter_mode: FilterMode::BeforeFt,
            nus: None,
            nus_reverse: false,
            scaling: ScalingOptions::default(),
            bad_point_threshold: 0.0,
            rotate_phase: true,
            output: DEFAULT_OUTPUT.to_string(),
            write_script_only: false,
        }
    }
}

impl ConversionOptions {
    /// NUS settings in effect for `set`, if any.
    pub fn effective_nus(&self, set: &DescriptorSet) -> Option<NusSettings> {
        if set.ndim() < 2 {
            return None;
        }
        let mut nus = self.nus.clone().or_else(|| set.nus.clone())?;
        nus.reverse |= self.nus_reverse;
        Some(nus)
    }
}

/// Cooperative cancellation flag, polled while a child process runs.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a conversion produced.
#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub strategy: Strategy,
    /// `None` when only the script was written.
    pub output: Option<PathBuf>,
    pub script: Option<PathBuf>,
    pub scaling_factor: f64,
    pub command: Option<command::CommandResult>,
}

/// Refuse to run on duplicate labels or over an existing output unless
/// the caller confirmed with `overwrite`.
pub(crate) fn check_guards(set: &DescriptorSet, paths: &[PathBuf], opts: &ConversionOptions) -> Result<()> {
    if opts.overwrite {
        return Ok(());
    }
    let dups = set.duplicate_labels();
    if !dups.is_empty() {
        return Err(ConvertError::DuplicateLabels(dups));
    }
    if let Some(existing) = paths.iter().find(|p| p.exists()) {
        return Err(ConvertError::OutputExists(existing.clone()));
    }
    Ok(())
}

/// Convert the data in `dir` described by `set`.
pub fn convert(
    dir: &Path,
    set: &DescriptorSet,
    opts: &ConversionOptions,
    cancel: &CancelToken,
) -> Result<ConversionReport> {
    set.validate()?;
    let factor = scaling_factor(set, &opts.scaling);
    log::info!(
        "Converting {}-D {} data with the {} strategy (scale {})",
        set.ndim(),
        set.spectrometer,
        opts.strategy,
        factor
    );
    match opts.strategy {
        Strategy::Direct => {
            let output = direct::convert_direct(dir, set, opts)?;
            Ok(ConversionReport {
                strategy: Strategy::Direct,
                output: Some(output),
                script: None,
                scaling_factor: factor,
                command: None,
            })
        }
        Strategy::Script => script::convert_script(dir, set, opts, cancel),
    }
}
