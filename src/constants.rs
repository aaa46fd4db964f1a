/// Physical constants: gyromagnetic ratios and the frequency ratios used
/// to reference heteronuclei against water.

/// Gyromagnetic ratios (rad s⁻¹ T⁻¹), in lookup order.
///
/// Order matters: label disambiguation takes the first nucleus whose
/// expected frequency matches.
pub const GYROMAGNETIC_RATIOS: &[(&str, f64)] = &[
    ("1H", 267.5153151e6),
    ("19F", 251.6628277e6),
    ("13C", 67.262e6),
    ("14N", 1.93297e7),
    ("15N", -27.116e6),
    ("31P", 108.282e6),
    ("23Na", 70.882e6),
    ("25Mg", -1.639e7),
    ("39K", 1.2498e7),
    ("41K", 0.686e7),
    ("43Ca", -1.8025e7),
    ("2H", 41.065e6),
    ("7Li", 103.962e6),
    ("17O", -36.264e6),
    ("10B", 2.87471e7),
    ("11B", 8.58406e7),
    ("27Al", 6.97594e7),
    ("29Si", -5.3146e7),
    ("35Cl", 2.62401e7),
    ("37Cl", 2.18428e7),
    ("50V", 2.67164e7),
    ("51V", 7.04578e7),
    ("55Mn", 6.59777e7),
    ("57Fe", 0.86399e7),
    ("59Co", 6.3472e7),
    ("63Cu", 7.0965e7),
    ("65Cu", 7.6018e7),
    ("67Zn", 16.767e6),
    ("69Ga", 6.43685e7),
    ("71Ga", 8.180163e7),
    ("77Se", 5.115e7),
    ("79Br", 6.70186e7),
    ("81Br", 7.22421e7),
    ("103Rh", -0.84579e7),
    ("107Ag", -1.08718e7),
    ("109Ag", -1.25001e7),
    ("111Cd", -5.69259e7),
    ("113Cd", -5.95504e7),
    ("117Sn", -9.57865e7),
    ("119Sn", -10.0317e7),
    ("123Te", -7.04893e7),
    ("125Te", -8.49722e7),
    ("127I", 5.37937e7),
    ("129Xe", -7.44069e7),
    ("131Xe", 2.20564e7),
    ("183W", 1.12070e7),
    ("195Pt", 5.80466e7),
    ("197Au", 0.4692e7),
    ("199Hg", 4.81519e6),
    ("201Hg", -1.77748e7),
    ("203Tl", 15.43599e7),
    ("205Tl", 15.58829e7),
    ("207Pb", 5.64661e7),
];

/// Gyromagnetic ratio for a nucleus label, accepting `H1`-style aliases.
pub fn gamma(label: &str) -> Option<f64> {
    let key = canonical_nucleus(label);
    GYROMAGNETIC_RATIOS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, g)| *g)
}

/// Normalise `H1`, `C13`, `H` style labels to mass-number-first form.
pub fn canonical_nucleus(label: &str) -> String {
    let label = label.trim();
    if label.eq_ignore_ascii_case("H") {
        return "1H".to_string();
    }
    let letters: String = label.chars().filter(|c| c.is_ascii_alphabetic()).collect();
    let digits: String = label.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits_first = label.chars().next().map_or(false, |c| c.is_ascii_digit());
    if digits.is_empty() || letters.is_empty() || digits_first {
        return label.to_string();
    }
    // Only a plain letters+digits form such as "C13" is rewritten.
    if label == format!("{}{}", letters, digits) {
        format!("{}{}", digits, letters)
    } else {
        label.to_string()
    }
}

pub fn is_proton(label: &str) -> bool {
    canonical_nucleus(label) == "1H"
}

/// Water chemical shift (ppm) at `temperature_k`, valid 0–100 °C.
pub fn water_ppm(temperature_k: f64) -> f64 {
    7.83 - temperature_k / 96.9
}

/// Heteronuclei that can be referenced against water.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferencedNucleus {
    C13,
    N15,
    P31,
    F19,
}

impl ReferencedNucleus {
    pub const ALL: [ReferencedNucleus; 4] = [Self::C13, Self::N15, Self::P31, Self::F19];

    pub fn from_label(label: &str) -> Option<Self> {
        match canonical_nucleus(label).as_str() {
            "13C" => Some(Self::C13),
            "15N" => Some(Self::N15),
            "31P" => Some(Self::P31),
            "19F" => Some(Self::F19),
            _ => None,
        }
    }

    /// Label as written by each vendor's parameter files.
    pub fn label(self, varian: bool) -> &'static str {
        match (self, varian) {
            (Self::C13, false) => "13C",
            (Self::N15, false) => "15N",
            (Self::P31, false) => "31P",
            (Self::F19, false) => "19F",
            (Self::C13, true) => "C13",
            (Self::N15, true) => "N15",
            (Self::P31, true) => "P31",
            (Self::F19, true) => "F19",
        }
    }

    /// Zero-ppm frequency ratio relative to the proton zero-ppm frequency.
    pub fn ratio(self, varian: bool) -> f64 {
        match self {
            Self::C13 => 0.251449530,
            Self::N15 => 0.101329118,
            Self::P31 => 0.4048064954,
            Self::F19 if varian => 0.941,
            Self::F19 => 0.9412866605363297,
        }
    }
}
