/// In-memory FID arrays and the transforms applied before writing.

pub mod filter;
pub mod nus;
pub mod rancekay;
pub mod scaling;

use crate::error::{ConvertError, Result};
use num_complex::Complex32;

/// Row-major complex array; the last axis is the direct dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct FidArray {
    pub shape: Vec<usize>,
    pub data: Vec<Complex32>,
}

impl FidArray {
    pub fn new(shape: Vec<usize>, data: Vec<Complex32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(ConvertError::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            shape,
            data: vec![Complex32::new(0.0, 0.0); len],
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Length of the direct (last) axis.
    pub fn row_len(&self) -> usize {
        self.shape.last().copied().unwrap_or(0)
    }

    /// Reinterpret the same samples with a new shape.
    pub fn reshape(mut self, shape: Vec<usize>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != self.data.len() {
            return Err(ConvertError::ShapeMismatch {
                expected,
                actual: self.data.len(),
            });
        }
        self.shape = shape;
        Ok(self)
    }

    /// Split a flat stream into `outer` equal rows.
    pub fn split_outer(self, outer: usize) -> Result<Self> {
        if outer == 0 || self.data.len() % outer != 0 {
            return Err(ConvertError::ShapeMismatch {
                expected: outer,
                actual: self.data.len(),
            });
        }
        let inner = self.data.len() / outer;
        self.reshape(vec![outer, inner])
    }

    /// Row-major strides, in elements.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1; self.shape.len()];
        for i in (0..self.shape.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.shape[i + 1];
        }
        strides
    }

    /// Swap the two outermost axes of a 3-D array.
    pub fn swap_outer_axes(&mut self) {
        if self.shape.len() != 3 {
            return;
        }
        let (a, b, n) = (self.shape[0], self.shape[1], self.shape[2]);
        let mut out = Vec::with_capacity(self.data.len());
        for j in 0..b {
            for i in 0..a {
                let start = (i * b + j) * n;
                out.extend_from_slice(&self.data[start..start + n]);
            }
        }
        self.data = out;
        self.shape = vec![b, a, n];
    }

    pub fn scale(&mut self, factor: f32) {
        for z in self.data.iter_mut() {
            *z *= factor;
        }
    }

    /// Smallest and largest real or imaginary value.
    pub fn min_max(&self) -> (f32, f32) {
        self.data.iter().fold((f32::MAX, f32::MIN), |(lo, hi), z| {
            (lo.min(z.re).min(z.im), hi.max(z.re).max(z.im))
        })
    }
}
