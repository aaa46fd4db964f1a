//! Enumerations for header codes: plane phase mode, quadrature flag,
//! axis identifiers and header validation status.

use std::fmt;

// ─── 2D Plane Type (FD2DPHASE) ─────────────────────────────────────────────

/// How the first indirect dimension was acquired, as recorded in FD2DPHASE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Phase2D {
    Magnitude = 0,
    Tppi = 1,
    States = 2,
    Image = 3,
    Array = 4,
}

impl Phase2D {
    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::Magnitude),
            1 => Some(Self::Tppi),
            2 => Some(Self::States),
            3 => Some(Self::Image),
            4 => Some(Self::Array),
            _ => None,
        }
    }
}

impl fmt::Display for Phase2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Magnitude => write!(f, "Magnitude"),
            Self::Tppi => write!(f, "TPPI"),
            Self::States => write!(f, "States"),
            Self::Image => write!(f, "Image"),
            Self::Array => write!(f, "Array"),
        }
    }
}

// ─── Quad Flag (NDQUADFLAG) ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum QuadFlag {
    /// Complex (quadrature detected).
    Complex = 0,
    /// Real (singlature), also used for pseudo axes.
    Real = 1,
}

impl QuadFlag {
    pub fn from_complex(is_complex: bool) -> Self {
        if is_complex {
            Self::Complex
        } else {
            Self::Real
        }
    }

    pub fn from_i32(v: i32) -> Option<Self> {
        match v {
            0 => Some(Self::Complex),
            1 => Some(Self::Real),
            _ => None,
        }
    }
}

// ─── Axis codes ─────────────────────────────────────────────────────────────

/// Current-axis identifiers used for ND parameter access and for the
/// axis letter of converter flags (`-xN`, `-yN`, ...).
///
/// Axis X holds the directly detected dimension; Y, Z and A hold the
/// first, second and third indirect dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DimCode {
    X = 1,
    Y = 2,
    Z = 3,
    A = 4,
}

impl DimCode {
    /// Axis for a 0-based dimension index where index 0 is the direct dimension.
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::X),
            1 => Some(Self::Y),
            2 => Some(Self::Z),
            3 => Some(Self::A),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self as usize - 1
    }

    pub fn axis_char_lower(self) -> char {
        match self {
            Self::X => 'x',
            Self::Y => 'y',
            Self::Z => 'z',
            Self::A => 'a',
        }
    }
}

// ─── Header validation ─────────────────────────────────────────────────────

/// Byte order status of a header read back from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HdrStatus {
    Ok,
    Swapped,
}
