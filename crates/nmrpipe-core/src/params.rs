//! Compound header setters used when building a time-domain header.
//!
//! These wrap [`Fdata::set_parm`] so that one call fills all the
//! spectral slots of an axis.

use crate::enums::*;
use crate::fdata::*;

/// Spectral values for one axis of a freshly converted time-domain file.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisHeader {
    /// Total point count along the axis (for Y and beyond, rows).
    pub size: usize,
    /// Complex points acquired (TD size).
    pub td_size: usize,
    /// Sweep width in Hz.
    pub sw: f64,
    /// Observe frequency in MHz.
    pub obs: f64,
    /// Carrier position in ppm.
    pub car_ppm: f64,
    pub label: String,
    pub complex: bool,
}

impl Fdata {
    // ─── Convenience getters ────────────────────────────────────────────

    pub fn get_size(&self, dim: DimCode) -> usize {
        self.get_parm(NdParm::Size, dim) as usize
    }

    pub fn get_sw(&self, dim: DimCode) -> f64 {
        self.get_parm(NdParm::Sw, dim) as f64
    }

    pub fn get_obs(&self, dim: DimCode) -> f64 {
        self.get_parm(NdParm::Obs, dim) as f64
    }

    pub fn get_car(&self, dim: DimCode) -> f64 {
        self.get_parm(NdParm::Car, dim) as f64
    }

    pub fn get_orig(&self, dim: DimCode) -> f64 {
        self.get_parm(NdParm::Orig, dim) as f64
    }

    pub fn is_complex(&self, dim: DimCode) -> bool {
        self.get_parm(NdParm::QuadFlag, dim) as i32 == QuadFlag::Complex as i32
    }

    // ─── Axis setup ─────────────────────────────────────────────────────

    /// Fill every spectral slot of `dim` and compute its origin.
    ///
    /// The X axis stores the complex point count as its size; the other
    /// axes store their row count.
    pub fn set_dim_spectral(&mut self, dim: DimCode, axis: &AxisHeader) {
        let size = if dim == DimCode::X {
            axis.td_size
        } else {
            axis.size
        };
        self.set_parm(NdParm::Size, size as f32, dim);
        self.set_parm(NdParm::TdSize, axis.td_size as f32, dim);
        self.set_parm(NdParm::Apod, axis.td_size as f32, dim);
        self.set_parm(NdParm::Sw, axis.sw as f32, dim);
        self.set_parm(NdParm::Obs, axis.obs as f32, dim);
        self.set_parm(NdParm::Car, axis.car_ppm as f32, dim);
        self.set_parm(
            NdParm::QuadFlag,
            QuadFlag::from_complex(axis.complex) as i32 as f32,
            dim,
        );
        self.set_parm(NdParm::FtFlag, 0.0, dim);
        self.set_label(dim, &axis.label);
        self.set_parm(NdParm::Center, (axis.td_size / 2 + 1) as f32, dim);
        self.compute_orig(dim, axis.td_size);
    }

    /// Origin from carrier, sweep width and center:
    /// `orig = car·obs − sw·(center − 1)/size`.
    pub fn compute_orig(&mut self, dim: DimCode, size: usize) {
        let sw = self.get_sw(dim);
        let obs = self.get_obs(dim);
        let car = self.get_car(dim);
        let center = self.get_parm(NdParm::Center, dim) as f64;
        if size == 0 {
            return;
        }
        let orig = car * obs - sw * (center - 1.0) / size as f64;
        self.set_parm(NdParm::Orig, orig as f32, dim);
    }

    pub fn set_phase2d(&mut self, phase: Phase2D) {
        self.data[FD2DPHASE] = phase as i32 as f32;
    }

    pub fn get_phase2d(&self) -> Phase2D {
        Phase2D::from_i32(self.data[FD2DPHASE] as i32).unwrap_or(Phase2D::Magnitude)
    }

    pub fn set_pipe_flag(&mut self, is_pipe: bool) {
        self.data[FDPIPEFLAG] = if is_pipe { 1.0 } else { 0.0 };
    }

    pub fn set_temperature(&mut self, kelvin: f64) {
        self.data[FDTEMPERATURE] = kelvin as f32;
    }

    pub fn set_scans(&mut self, scans: u32) {
        self.data[FDSCANS] = scans as f32;
    }

    pub fn set_srcname(&mut self, name: &str) {
        self.put_text(FDSRCNAME, name, SIZE_SRCNAME);
    }

    pub fn get_srcname(&self) -> String {
        self.get_text(FDSRCNAME, SIZE_SRCNAME)
    }

    // ─── DMX / digital filter ───────────────────────────────────────────

    /// Record a group delay still present in the data (`flag` 1) so it is
    /// removed during the Fourier transform.
    pub fn set_dmx(&mut self, dmx_val: f32, dmx_flag: f32) {
        self.data[FDDMXVAL] = dmx_val;
        self.data[FDDMXFLAG] = dmx_flag;
    }

    pub fn get_dmx_val(&self) -> f32 {
        self.data[FDDMXVAL]
    }

    pub fn get_dmx_flag(&self) -> f32 {
        self.data[FDDMXFLAG]
    }

    // ─── Min / Max ──────────────────────────────────────────────────────

    pub fn set_min_max(&mut self, min: f32, max: f32) {
        self.data[FDMIN] = min;
        self.data[FDMAX] = max;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(size: usize, td: usize, sw: f64, obs: f64, car: f64, label: &str) -> AxisHeader {
        AxisHeader {
            size,
            td_size: td,
            sw,
            obs,
            car_ppm: car,
            label: label.to_string(),
            complex: true,
        }
    }

    #[test]
    fn test_dim_spectral() {
        let mut fd = Fdata::with_defaults();
        fd.set_dim_count(2);
        fd.set_dim_spectral(DimCode::X, &axis(2048, 1024, 12000.0, 600.13, 4.7, "1H"));
        fd.set_dim_spectral(DimCode::Y, &axis(256, 128, 3000.0, 60.81, 120.0, "15N"));

        assert_eq!(fd.get_size(DimCode::X), 1024);
        assert_eq!(fd.get_size(DimCode::Y), 256);
        assert_eq!(fd.data[FDF1TDSIZE], 128.0);
        assert!((fd.get_sw(DimCode::X) - 12000.0).abs() < 0.01);
        assert!((fd.get_obs(DimCode::Y) - 60.81).abs() < 0.01);
        assert!(fd.is_complex(DimCode::Y));
        assert_eq!(fd.get_label(DimCode::Y), "15N");
    }

    #[test]
    fn test_orig() {
        let mut fd = Fdata::with_defaults();
        fd.set_dim_spectral(DimCode::X, &axis(1024, 512, 1000.0, 500.0, 4.0, "1H"));
        // center = 257, orig = 4*500 - 1000*256/512
        assert!((fd.get_orig(DimCode::X) - 1500.0).abs() < 1e-3);
    }

    #[test]
    fn test_srcname_and_dmx() {
        let mut fd = Fdata::with_defaults();
        fd.set_srcname("ser");
        fd.set_dmx(67.98, 1.0);
        assert_eq!(fd.get_srcname(), "ser");
        assert!((fd.get_dmx_val() - 67.98).abs() < 1e-4);
        assert_eq!(fd.get_dmx_flag(), 1.0);
    }
}
