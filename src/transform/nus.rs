/// Non-uniform sampling: schedule parsing and zero-filled expansion.
///
/// A schedule lists, one per line, the increment (or tuple of increments
/// for 3-D data) actually acquired. The first token decides whether the
/// indices are 0- or 1-based.

use super::FidArray;
use crate::error::{ConvertError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name searched for next to the raw data.
pub const DEFAULT_SCHEDULE: &str = "nuslist";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NusSettings {
    pub schedule: PathBuf,
    pub sample_count: usize,
    /// 0 for 0-based schedules, 1 for 1-based.
    pub offset: usize,
    pub reverse: bool,
}

impl NusSettings {
    /// Read `path` and derive the sample count and index offset.
    pub fn from_schedule(path: &Path) -> Result<Self> {
        let schedule = NusSchedule::read(path)?;
        Ok(Self {
            schedule: path.to_path_buf(),
            sample_count: schedule.len(),
            offset: schedule.offset,
            reverse: false,
        })
    }

    /// Load the schedule this record points at, normalised to 0-based.
    pub fn load(&self) -> Result<NusSchedule> {
        let mut schedule = NusSchedule::read(&self.schedule)?;
        if self.reverse {
            schedule.reverse_columns();
        }
        Ok(schedule)
    }
}

/// Parsed schedule with 0-based indices.
#[derive(Debug, Clone, PartialEq)]
pub struct NusSchedule {
    pub samples: Vec<Vec<usize>>,
    pub offset: usize,
}

impl NusSchedule {
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        Self::parse(&text).map_err(|reason| ConvertError::NusSchedule {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn parse(text: &str) -> std::result::Result<Self, String> {
        let rows: Vec<Vec<&str>> = text
            .lines()
            .map(|l| l.split_whitespace().collect::<Vec<_>>())
            .filter(|t| !t.is_empty())
            .collect();
        let first = rows
            .first()
            .and_then(|r| r.first())
            .ok_or_else(|| "schedule is empty".to_string())?;
        let offset = if *first == "0" { 0 } else { 1 };

        let mut samples = Vec::with_capacity(rows.len());
        for (line, row) in rows.iter().enumerate() {
            let mut tuple = Vec::with_capacity(row.len());
            for tok in row {
                let v: usize = tok
                    .parse()
                    .map_err(|_| format!("line {}: '{}' is not an index", line + 1, tok))?;
                let v = v
                    .checked_sub(offset)
                    .ok_or_else(|| format!("line {}: index {} below offset", line + 1, v))?;
                tuple.push(v);
            }
            samples.push(tuple);
        }
        if samples.iter().any(|s| s.len() != samples[0].len()) {
            return Err("rows have differing numbers of columns".to_string());
        }
        Ok(Self { samples, offset })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn columns(&self) -> usize {
        self.samples.first().map_or(0, Vec::len)
    }

    pub fn reverse_columns(&mut self) {
        for s in self.samples.iter_mut() {
            s.reverse();
        }
    }
}

/// How an indirect axis was acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NusAxis {
    /// Listed in the schedule; complex axes hold quadrature pairs.
    Sampled { complex: bool },
    /// Fully acquired and absent from the schedule.
    Pseudo,
}

/// Scatter acquired planes into a zero-filled array of `full_shape`.
///
/// `full_shape` is outer-first with the direct real size last
/// (`[..., N_z, N_y, T_x]`). `axes[k]` describes indirect dimension `k`
/// (k = 0 for the first indirect dimension); schedule columns map to the
/// sampled axes in order. A complex increment `i` occupies rows `2i` and
/// `2i+1`. Per schedule entry the stream holds every quadrature
/// combination with the first indirect dimension varying fastest, and the
/// whole schedule repeats once per pseudo plane.
pub fn expand_nus(
    data: &FidArray,
    full_shape: &[usize],
    schedule: &NusSchedule,
    axes: &[NusAxis],
) -> Result<FidArray> {
    let n_ind = full_shape.len().saturating_sub(1);
    if axes.len() != n_ind {
        return Err(ConvertError::ShapeMismatch {
            expected: n_ind,
            actual: axes.len(),
        });
    }
    let sampled: Vec<usize> = (0..n_ind)
        .filter(|&k| matches!(axes[k], NusAxis::Sampled { .. }))
        .collect();
    if schedule.columns() != sampled.len() {
        return Err(ConvertError::ShapeMismatch {
            expected: sampled.len(),
            actual: schedule.columns(),
        });
    }
    let pseudo: Vec<usize> = (0..n_ind).filter(|&k| axes[k] == NusAxis::Pseudo).collect();
    let axis_of = |k: usize| n_ind - 1 - k;
    let pseudo_planes: usize = pseudo.iter().map(|&k| full_shape[axis_of(k)]).product();

    let row_len = full_shape.last().copied().unwrap_or(0);
    let quad_axes: Vec<usize> = sampled
        .iter()
        .copied()
        .filter(|&k| axes[k] == NusAxis::Sampled { complex: true })
        .collect();
    let per_sample = 1usize << quad_axes.len();
    let needed = pseudo_planes * schedule.len() * per_sample * row_len;
    if data.len() < needed {
        return Err(ConvertError::ShapeMismatch {
            expected: needed,
            actual: data.len(),
        });
    }

    let mut out = FidArray::zeros(full_shape.to_vec());
    let strides = out.strides();
    let mut src_row = 0;
    for plane in 0..pseudo_planes {
        let mut pseudo_offset = 0;
        let mut rest = plane;
        for &k in &pseudo {
            let axis = axis_of(k);
            pseudo_offset += (rest % full_shape[axis]) * strides[axis];
            rest /= full_shape[axis];
        }
        for sample in &schedule.samples {
            for q in 0..per_sample {
                let mut offset = pseudo_offset;
                for (col, &k) in sampled.iter().enumerate() {
                    let axis = axis_of(k);
                    let index = match quad_axes.iter().position(|&a| a == k) {
                        Some(b) => 2 * sample[col] + ((q >> b) & 1),
                        None => sample[col],
                    };
                    if index >= full_shape[axis] {
                        return Err(ConvertError::ShapeMismatch {
                            expected: full_shape[axis],
                            actual: index + 1,
                        });
                    }
                    offset += index * strides[axis];
                }
                let src = src_row * row_len;
                out.data[offset..offset + row_len].copy_from_slice(&data.data[src..src + row_len]);
                src_row += 1;
            }
        }
    }
    Ok(out)
}
