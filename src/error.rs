/// Error type shared by the scanners, transforms and strategies.
///
/// Fatal extraction errors abort a session; the three
/// confirmation variants tell the caller to ask before retrying with
/// `overwrite` set.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{key} not found in {file}")]
    MissingParameter { file: String, key: String },

    #[error("invalid value for {key} in {file}: {value:?}")]
    InvalidValue {
        file: String,
        key: String,
        value: String,
    },

    #[error("only up to 4 indirect dimensions can be converted, found {0}")]
    TooManyIndirect(usize),

    #[error("unsupported number of dimensions: {0} (expected 1 to 3)")]
    UnsupportedDimensions(usize),

    #[error("no acqus or procpar file found in {0}")]
    UnknownFormat(PathBuf),

    #[error("duplicate dimension labels: {}", .0.join(", "))]
    DuplicateLabels(Vec<String>),

    #[error("{0} already exists")]
    OutputExists(PathBuf),

    #[error("saved parameters are for {saved} data but the directory holds {current} data")]
    SessionMismatch { saved: String, current: String },

    #[error("raw data holds {actual} points but the dimensions require {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("cannot use NUS schedule {path}: {reason}")]
    NusSchedule { path: PathBuf, reason: String },

    #[error("{0} not found. Ensure NMRPipe is installed and in PATH")]
    ToolNotInstalled(String),

    #[error("command failed (exit {code:?}): {command}\n{stderr}")]
    ToolFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("command timed out after {seconds}s: {command}")]
    Timeout { command: String, seconds: u64 },

    #[error("conversion cancelled")]
    Cancelled,

    #[error(transparent)]
    Write(#[from] nmrpipe_io::WriteError),

    #[error("session file error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConvertError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn missing(file: &str, key: &str) -> Self {
        Self::MissingParameter {
            file: file.to_string(),
            key: key.to_string(),
        }
    }

    pub fn invalid(file: &str, key: &str, value: &str) -> Self {
        Self::InvalidValue {
            file: file.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    /// True for conditions the caller may override after asking the user.
    pub fn requires_confirmation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateLabels(_) | Self::OutputExists(_) | Self::SessionMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
