/// Direct strategy: transform the raw FID in memory and write the NMRPipe
/// file without any external tool.

use super::{check_guards, ConversionOptions};
use crate::descriptor::{DescriptorSet, PlaneMode, RawLayout, Spectrometer};
use crate::error::{ConvertError, Result};
use crate::transform::filter::{mark_filter_in_header, remove_digital_filter, FilterMode};
use crate::transform::nus::{expand_nus, NusAxis, NusSettings};
use crate::transform::rancekay::{axis_for_dim, rancekay_shuffle};
use crate::transform::scaling::scaling_factor;
use crate::transform::FidArray;
use crate::vendor::raw::read_raw;
use nmrpipe_core::{AxisHeader, DimCode, Fdata, NdParm};
use nmrpipe_io::{write_fdata_header, write_float_data, PipeWriter};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

// ─── Header ─────────────────────────────────────────────────────────────

/// Axis values for dimension `i` as both strategies record them. The
/// indirect axis of a pseudo-2D set carries unit sweep and observe values
/// and no quadrature.
pub fn axis_header(set: &DescriptorSet, i: usize) -> AxisHeader {
    let d = &set.dims[i];
    let mut axis = AxisHeader {
        size: d.size,
        td_size: d.real_size,
        sw: d.sweep_width,
        obs: d.observe_frequency,
        car_ppm: d.carrier_ppm(),
        label: d.label.clone(),
        complex: d.is_complex,
    };
    if i == 1 && set.is_pseudo_2d() {
        axis.td_size = d.size;
        axis.sw = 1.0;
        axis.obs = 1.0;
        axis.complex = false;
    }
    axis
}

/// Plane mode written for the first indirect dimension.
pub fn header_plane_mode(set: &DescriptorSet) -> PlaneMode {
    if set.is_pseudo_2d() {
        PlaneMode::Real
    } else {
        set.plane_mode
    }
}

/// NMRPipe header for the time-domain data described by `set`.
pub fn build_header(set: &DescriptorSet) -> Fdata {
    let mut fd = Fdata::with_defaults();
    fd.set_pipe_flag(true);
    fd.set_dim_count(set.ndim());

    for i in 0..set.ndim() {
        let Some(code) = DimCode::from_index(i) else {
            continue;
        };
        fd.set_dim_spectral(code, &axis_header(set, i));
    }

    if set.ndim() >= 2 {
        fd.set_phase2d(header_plane_mode(set).phase2d());
    }

    if set.is_pseudo_2d() {
        fd.set_parm(NdParm::FtSize, set.dims[1].size as f32, DimCode::Y);
        fd.set_parm(NdParm::Orig, 1.0, DimCode::Y);
    }

    fd.set_temperature(set.temperature);
    if let Some(scans) = set.scans {
        fd.set_scans(scans);
    }
    if let Some(name) = set.raw.file().file_name() {
        fd.set_srcname(&name.to_string_lossy());
    }
    fd
}

// ─── Array assembly ─────────────────────────────────────────────────────

/// Complex points per raw FID.
fn raw_row_len(set: &DescriptorSet) -> usize {
    set.dims[0].size / 2
}

/// Outer-first shape of the full data: `[N_z, N_y, points]`.
fn full_shape(set: &DescriptorSet) -> Vec<usize> {
    let mut shape: Vec<usize> = set.dims[1..].iter().rev().map(|d| d.size).collect();
    shape.push(raw_row_len(set));
    shape
}

fn resolve_schedule(dir: &Path, nus: &NusSettings) -> NusSettings {
    let mut nus = nus.clone();
    if nus.schedule.is_relative() {
        nus.schedule = dir.join(&nus.schedule);
    }
    nus
}

/// Read the raw file and bring it into full `[N_z, N_y, points]` order,
/// expanding NUS data and undoing a reversed Varian loop order.
pub fn assemble(dir: &Path, set: &DescriptorSet, opts: &ConversionOptions) -> Result<FidArray> {
    let row = raw_row_len(set);
    let mut flat = read_raw(dir, &set.raw, set.dims[0].size)?;
    let shape = full_shape(set);
    let nus = opts.effective_nus(set);

    let rows = match &nus {
        Some(n) => {
            let quad = set.dims[1..]
                .iter()
                .filter(|d| d.is_complex && !d.is_pseudo())
                .count();
            let pseudo_planes: usize = set.dims[1..]
                .iter()
                .filter(|d| d.is_pseudo())
                .map(|d| d.size.max(1))
                .product();
            pseudo_planes * n.sample_count * (1 << quad)
        }
        None => set.fid_count(),
    };
    let needed = rows * row;
    if flat.len() < needed {
        return Err(ConvertError::ShapeMismatch {
            expected: needed,
            actual: flat.len(),
        });
    }
    if flat.len() > needed {
        log::warn!(
            "Raw data holds {} points, using the first {}",
            flat.len(),
            needed
        );
        flat.data.truncate(needed);
        flat.shape = vec![needed];
    }
    let acquired = flat.split_outer(rows)?;

    let mut array = match &nus {
        Some(n) => {
            let schedule = resolve_schedule(dir, n).load()?;
            let axes: Vec<NusAxis> = set.dims[1..]
                .iter()
                .map(|d| {
                    if d.is_pseudo() {
                        NusAxis::Pseudo
                    } else {
                        NusAxis::Sampled {
                            complex: d.is_complex,
                        }
                    }
                })
                .collect();
            log::info!(
                "Expanding {} NUS samples to {:?}",
                schedule.len(),
                &shape[..shape.len() - 1]
            );
            expand_nus(&acquired, &shape, &schedule, &axes)?
        }
        None => acquired.reshape(shape.clone())?,
    };

    if set.spectrometer == Spectrometer::Varian && set.reverse_acquisition_order && set.ndim() == 3 {
        // Stored with the second indirect dimension varying fastest.
        let swapped = vec![shape[1], shape[0], shape[2]];
        array = array.reshape(swapped)?;
        array.swap_outer_axes();
    }
    Ok(array)
}

// ─── Conversion ─────────────────────────────────────────────────────────

fn write_output(path: &Path, dir: &Path, fd: &Fdata, array: &FidArray, complex: bool) -> Result<()> {
    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ConvertError::io(dir, e))?;
    if complex {
        let mut w = PipeWriter::new(BufWriter::new(tmp.as_file()));
        w.write_header(fd)?;
        w.write_rows(&array.data, array.row_len())?;
        w.flush()?;
        log::debug!("{} rows written", w.rows_written());
    } else {
        // Real direct data: the interleaved values as one real vector per row.
        let mut w = BufWriter::new(tmp.as_file());
        write_fdata_header(&mut w, fd)?;
        for row in array.data.chunks(array.row_len().max(1)) {
            let values: Vec<f32> = row.iter().flat_map(|z| [z.re, z.im]).collect();
            write_float_data(&mut w, &values)?;
        }
        w.flush().map_err(|e| ConvertError::io(path, e))?;
    }
    tmp.persist(path).map_err(|e| ConvertError::io(path, e.error))?;
    Ok(())
}

/// Run the transforms and write `opts.output` inside `dir`.
pub fn convert_direct(dir: &Path, set: &DescriptorSet, opts: &ConversionOptions) -> Result<PathBuf> {
    let output = dir.join(&opts.output);
    check_guards(set, &[output.clone()], opts)?;

    let mut array = assemble(dir, set, opts)?;

    for dim in set.rancekay_dims() {
        if let Some(axis) = axis_for_dim(array.ndim(), dim) {
            log::info!("Rance-Kay shuffle on dimension {} (axis {})", dim, axis);
            rancekay_shuffle(&mut array, axis, opts.rotate_phase);
        }
    }

    let mut fd = build_header(set);

    let bruker = matches!(set.raw, RawLayout::Bruker { .. });
    if bruker && opts.use_digital_filter {
        match opts.filter_mode {
            FilterMode::BeforeFt => {
                remove_digital_filter(&mut array, &set.digital_filter);
            }
            FilterMode::AfterFt => {
                if let Some(grpdly) = mark_filter_in_header(&mut fd, &set.digital_filter) {
                    log::info!("Digital filter left for the FT: grpdly={:.4}", grpdly);
                }
            }
        }
    }

    let factor = scaling_factor(set, &opts.scaling);
    if factor != 1.0 {
        array.scale(factor as f32);
    }
    let (min, max) = array.min_max();
    fd.set_min_max(min, max);

    write_output(&output, dir, &fd, &array, set.dims[0].is_complex)?;
    log::info!("Wrote {}", output.display());
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::tests::sample_set;
    use crate::descriptor::AcquisitionMode;
    use nmrpipe_core::Phase2D;

    #[test]
    fn test_header_sizes() {
        let set = sample_set();
        let fd = build_header(&set);
        assert_eq!(fd.dim_count(), 2);
        assert_eq!(fd.get_size(DimCode::X), 1024);
        assert_eq!(fd.get_size(DimCode::Y), 256);
        assert_eq!(fd.get_parm(NdParm::TdSize, DimCode::Y), 128.0);
        assert!(fd.is_complex(DimCode::X));
        assert_eq!(fd.get_label(DimCode::Y), "15N");
        assert!((fd.get_car(DimCode::X) - 4.773).abs() < 1e-4);
        assert_eq!(fd.get_phase2d(), Phase2D::States);
    }

    #[test]
    fn test_origin() {
        let set = sample_set();
        let fd = build_header(&set);
        let x = &set.dims[0];
        let center = (x.real_size / 2 + 1) as f64;
        let expect = x.carrier - x.sweep_width * (center - 1.0) / x.real_size as f64;
        assert!((fd.get_orig(DimCode::X) - expect).abs() < 1e-2);
    }

    #[test]
    fn test_pseudo_2d_overrides() {
        let mut set = sample_set();
        set.dims[1].make_pseudo("ID");
        set.refresh();
        set.plane_mode = PlaneMode::States;
        let fd = build_header(&set);
        assert_eq!(fd.get_parm(NdParm::TdSize, DimCode::Y), 256.0);
        assert_eq!(fd.get_parm(NdParm::FtSize, DimCode::Y), 256.0);
        assert_eq!(fd.get_parm(NdParm::Apod, DimCode::Y), 256.0);
        assert!(!fd.is_complex(DimCode::Y));
        assert_eq!(fd.get_obs(DimCode::Y), 1.0);
        assert_eq!(fd.get_sw(DimCode::Y), 1.0);
        assert_eq!(fd.get_orig(DimCode::Y), 1.0);
        assert_eq!(fd.get_phase2d(), Phase2D::Magnitude);
    }

    fn tiny_bruker(dir: &Path) -> DescriptorSet {
        let mut set = sample_set();
        set.dims[0].size = 8;
        set.dims[0].real_size = 4;
        set.dims[1].size = 4;
        set.dims[1].real_size = 2;
        let fids: Vec<Vec<i32>> = (0..4)
            .map(|k| (1..=8).map(|v| k * 100 + v).collect())
            .collect();
        std::fs::write(dir.join("ser"), crate::vendor::raw::tests::bruker_bytes(&fids)).unwrap();
        set
    }

    fn unscaled() -> ConversionOptions {
        ConversionOptions {
            scaling: crate::transform::scaling::ScalingOptions {
                divide_by_ns: false,
                multiply_by_2_nc: false,
                multiply_by_1000: false,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_convert_writes_rows() {
        let tmp = tempfile::TempDir::new().unwrap();
        let set = tiny_bruker(tmp.path());
        let out = convert_direct(tmp.path(), &set, &unscaled()).unwrap();
        assert_eq!(out, tmp.path().join("test.fid"));

        let mut f = std::fs::File::open(&out).unwrap();
        let (fd, data) = nmrpipe_io::read_nmrpipe_file(&mut f).unwrap();
        assert_eq!(fd.get_size(DimCode::X), 4);
        assert_eq!(fd.get_size(DimCode::Y), 4);
        assert_eq!(data.len(), 32);
        assert_eq!(&data[..8], &[1.0, 3.0, 5.0, 7.0, 2.0, 4.0, 6.0, 8.0]);
        assert_eq!(data[8], 101.0);
        assert_eq!(fd.data[nmrpipe_core::FDMAX], 308.0);
    }

    #[test]
    fn test_convert_refuses_existing_output() {
        let tmp = tempfile::TempDir::new().unwrap();
        let set = tiny_bruker(tmp.path());
        convert_direct(tmp.path(), &set, &unscaled()).unwrap();
        let err = convert_direct(tmp.path(), &set, &unscaled()).unwrap_err();
        assert!(matches!(err, ConvertError::OutputExists(_)));

        let opts = ConversionOptions {
            overwrite: true,
            ..unscaled()
        };
        assert!(convert_direct(tmp.path(), &set, &opts).is_ok());
    }

    #[test]
    fn test_short_raw_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut set = tiny_bruker(tmp.path());
        set.dims[1].size = 8;
        let err = assemble(tmp.path(), &set, &unscaled()).unwrap_err();
        assert!(matches!(err, ConvertError::ShapeMismatch { expected: 32, actual: 16 }));
    }

    #[test]
    fn test_full_shape() {
        let mut set = sample_set();
        assert_eq!(full_shape(&set), vec![256, 1024]);
        set.set_mode(1, AcquisitionMode::Real).unwrap();
        assert_eq!(full_shape(&set), vec![256, 1024]);
    }
}
