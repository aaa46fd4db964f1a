//! End-to-end conversions on synthetic Bruker and Varian directories.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use nmrpipe_core::{DimCode, Phase2D};
use spin_converter::strategy::direct::build_header;
use spin_converter::strategy::script::build_script;
use spin_converter::strategy::{ConversionOptions, Strategy};
use spin_converter::transform::scaling::{scaling_factor, ScalingOptions};
use spin_converter::{
    AcquisitionMode, CancelToken, ConvertError, DescriptorSet, PlaneMode, SessionRecord, Spectrometer,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const H1_MHZ: f64 = 600.13;
const GAMMA_1H: f64 = 267.5153151e6;
const GAMMA_15N: f64 = -27.116e6;

fn n15_mhz() -> f64 {
    (H1_MHZ / GAMMA_1H * GAMMA_15N).abs()
}

// ─── Fixtures ───────────────────────────────────────────────────────────

/// 2-D Bruker directory: 8 complex points by 4 FIDs, no digital filter.
fn bruker_2d(dir: &Path) {
    let acqus = format!(
        "##TITLE= Parameter file\n\
##$BF1= 600.13\n##$BF2= 60.81\n\
##$BYTORDA= 0\n##$DTYPA= 0\n\
##$NC= 0\n##$NS= 4\n\
##$NUC1= <1H>\n##$NUC2= <15N>\n\
##$O1= 2820\n##$O2= 0\n\
##$SFO1= {}\n##$SW_h= 8000\n##$TD= 16\n\
##$TD_INDIRECT= (0..7)\n0 4 0 0 0 0 0 0\n##$TE= 298.15\n##END=\n",
        H1_MHZ
    );
    let acqu2s = format!(
        "##$NUC1= <15N>\n##$SFO1= {}\n##$SW_h= 2000\n##$TD= 4\n##END=\n",
        n15_mhz()
    );
    fs::write(dir.join("acqus"), acqus).unwrap();
    fs::write(dir.join("acqu2s"), acqu2s).unwrap();
    fs::write(dir.join("pulseprogram"), ";FnMODE: tppi\n").unwrap();

    let mut ser = Vec::new();
    for k in 0..4i32 {
        let values: Vec<i32> = (1..=16).map(|v| k * 100 + v).collect();
        let mut block = vec![0u8; 1024];
        LittleEndian::write_i32_into(&values, &mut block[..64]);
        ser.extend(block);
    }
    fs::write(dir.join("ser"), ser).unwrap();
}

fn procpar_entry(key: &str, value: &str) -> String {
    format!("{} 1 1 0 0 0 2 1 0 1 64\n1 {}\n0\n", key, value)
}

/// 2-D Varian directory: np 8, ni 2, one FID per block.
fn varian_2d(dir: &Path) {
    let mut procpar = String::new();
    for (k, v) in [
        ("np", "8"),
        ("ni", "2"),
        ("ni2", "0"),
        ("sw", "8000"),
        ("sw1", "2000"),
        ("sfrq", "599.89"),
        ("dfrq", "150.86"),
        ("dfrq2", "60.79"),
        ("tn", "\"H1\""),
        ("dn", "\"N15\""),
        ("dn2", "\"C13\""),
        ("temp", "25"),
        ("nt", "16"),
        ("array", "\"phase\""),
    ] {
        procpar += &procpar_entry(k, v);
    }
    fs::write(dir.join("procpar"), procpar).unwrap();

    let blocks = 4;
    let np = 8;
    let mut fid = vec![0u8; 32];
    BigEndian::write_i32(&mut fid[0..4], blocks);
    BigEndian::write_i32(&mut fid[4..8], 1);
    BigEndian::write_i32(&mut fid[8..12], np);
    BigEndian::write_i32(&mut fid[12..16], 4);
    BigEndian::write_i32(&mut fid[16..20], np * 4);
    BigEndian::write_i32(&mut fid[20..24], np * 4 + 28);
    BigEndian::write_i16(&mut fid[24..26], 0);
    BigEndian::write_i16(&mut fid[26..28], 0x1 | 0x8 | 0x10);
    BigEndian::write_i32(&mut fid[28..32], 1);
    for b in 0..blocks {
        fid.extend(vec![0u8; 28]);
        let values: Vec<f32> = (0..np).map(|i| (b * 10 + i) as f32).collect();
        let mut buf = vec![0u8; values.len() * 4];
        BigEndian::write_f32_into(&values, &mut buf);
        fid.extend(buf);
    }
    fs::write(dir.join("fid"), fid).unwrap();
}

fn unscaled() -> ConversionOptions {
    ConversionOptions {
        scaling: ScalingOptions {
            divide_by_ns: false,
            multiply_by_2_nc: false,
            multiply_by_1000: false,
        },
        ..Default::default()
    }
}

fn read_back(path: &Path) -> (nmrpipe_core::Fdata, Vec<f32>) {
    let mut f = fs::File::open(path).unwrap();
    nmrpipe_io::read_nmrpipe_file(&mut f).unwrap()
}

/// Value following `flag` in the script's parameter table.
fn script_value<'a>(script: &'a str, flag: &str) -> &'a str {
    let mut tokens = script.split_whitespace();
    tokens.find(|t| *t == flag).unwrap();
    tokens.next().unwrap()
}

// ─── Bruker ─────────────────────────────────────────────────────────────

#[test]
fn test_bruker_scan() {
    let tmp = TempDir::new().unwrap();
    bruker_2d(tmp.path());
    let set = spin_converter::scan(tmp.path()).unwrap();
    assert_eq!(set.spectrometer, Spectrometer::Bruker);
    assert_eq!(set.ndim(), 2);
    assert_eq!(set.dims[0].size, 16);
    assert_eq!(set.dims[1].size, 4);
    assert_eq!(set.dims[1].label, "15N");
    assert_eq!(set.dims[1].mode, AcquisitionMode::Tppi);
    assert!(!set.requires_rancekay_shuffle);
    assert_eq!(set.scans, Some(4));
}

#[test]
fn test_bruker_direct_conversion() {
    let tmp = TempDir::new().unwrap();
    bruker_2d(tmp.path());
    let set = spin_converter::scan(tmp.path()).unwrap();
    let report = spin_converter::convert(tmp.path(), &set, &unscaled(), &CancelToken::new()).unwrap();
    assert_eq!(report.strategy, Strategy::Direct);
    assert_eq!(report.scaling_factor, 1.0);

    let (fd, data) = read_back(&report.output.unwrap());
    assert_eq!(fd.get_size(DimCode::X), 8);
    assert_eq!(fd.get_size(DimCode::Y), 4);
    assert_eq!(fd.get_label(DimCode::Y), "15N");
    assert_eq!(fd.get_phase2d(), Phase2D::States);
    assert_eq!(data.len(), 4 * 16);
    // Real block then imaginary block of the first FID.
    assert_eq!(data[0], 1.0);
    assert_eq!(data[7], 15.0);
    assert_eq!(data[8], 2.0);
    assert_eq!(data[16], 101.0);
}

#[test]
fn test_default_scaling_applied() {
    let tmp = TempDir::new().unwrap();
    bruker_2d(tmp.path());
    let set = spin_converter::scan(tmp.path()).unwrap();
    let opts = ConversionOptions::default();
    let report = spin_converter::convert(tmp.path(), &set, &opts, &CancelToken::new()).unwrap();
    // 1000 / NS(4)
    assert_eq!(report.scaling_factor, 250.0);
    let (_, data) = read_back(&report.output.unwrap());
    assert_eq!(data[0], 250.0);
}

#[test]
fn test_direct_refuses_existing_output() {
    let tmp = TempDir::new().unwrap();
    bruker_2d(tmp.path());
    let set = spin_converter::scan(tmp.path()).unwrap();
    spin_converter::convert(tmp.path(), &set, &unscaled(), &CancelToken::new()).unwrap();

    let err = spin_converter::convert(tmp.path(), &set, &unscaled(), &CancelToken::new()).unwrap_err();
    assert!(err.requires_confirmation());
    assert!(matches!(err, ConvertError::OutputExists(_)));
}

#[test]
fn test_duplicate_labels_need_confirmation() {
    let tmp = TempDir::new().unwrap();
    bruker_2d(tmp.path());
    let mut set = spin_converter::scan(tmp.path()).unwrap();
    set.set_label(1, "1H").unwrap();
    let err = spin_converter::convert(tmp.path(), &set, &unscaled(), &CancelToken::new()).unwrap_err();
    assert!(matches!(err, ConvertError::DuplicateLabels(_)));

    let opts = ConversionOptions {
        overwrite: true,
        ..unscaled()
    };
    assert!(spin_converter::convert(tmp.path(), &set, &opts, &CancelToken::new()).is_ok());
}

fn assert_script_matches_header(dir: &Path, set: &DescriptorSet) {
    let opts = ConversionOptions::default();
    let script = build_script(dir, set, &opts, scaling_factor(set, &opts.scaling));
    let fd = build_header(set);
    assert_eq!(script_value(&script, "-ndim"), set.ndim().to_string());

    for (i, (axis, code)) in [('x', DimCode::X), ('y', DimCode::Y)]
        .into_iter()
        .take(set.ndim())
        .enumerate()
    {
        let flag = |name: &str| format!("-{}{}", axis, name);
        let n: usize = script_value(&script, &flag("N")).parse().unwrap();
        let t: usize = script_value(&script, &flag("T")).parse().unwrap();
        let sw: f64 = script_value(&script, &flag("SW")).parse().unwrap();
        let obs: f64 = script_value(&script, &flag("OBS")).parse().unwrap();
        let car: f64 = script_value(&script, &flag("CAR")).parse().unwrap();
        let lab = script_value(&script, &flag("LAB"));
        let mode: AcquisitionMode = script_value(&script, &flag("MODE")).parse().unwrap();

        assert_eq!(n, set.dims[i].size);
        if code == DimCode::X {
            assert_eq!(fd.get_size(code), t);
        } else {
            assert_eq!(fd.get_size(code), n);
            assert_eq!(fd.get_parm(nmrpipe_core::NdParm::TdSize, code) as usize, t);
        }
        assert!((fd.get_sw(code) - sw).abs() < 1e-2);
        assert!((fd.get_obs(code) - obs).abs() < 1e-3);
        assert!((fd.get_car(code) - car).abs() < 1e-3);
        assert_eq!(fd.get_label(code), lab);
        if code != DimCode::X {
            assert_eq!(fd.is_complex(code), mode != AcquisitionMode::Real);
        }
    }
    if set.ndim() > 1 {
        let aq2d: PlaneMode = script_value(&script, "-aq2D").parse().unwrap();
        assert_eq!(fd.get_phase2d(), aq2d.phase2d());
    }
}

#[test]
fn test_script_header_equivalence_bruker() {
    let tmp = TempDir::new().unwrap();
    bruker_2d(tmp.path());
    let set = spin_converter::scan(tmp.path()).unwrap();
    assert_script_matches_header(tmp.path(), &set);
}

#[test]
fn test_script_header_equivalence_pseudo_2d() {
    let tmp = TempDir::new().unwrap();
    bruker_2d(tmp.path());
    fs::write(tmp.path().join("pulseprogram"), ";AQ_mode (F1) QF\n").unwrap();
    let mut set = spin_converter::scan(tmp.path()).unwrap();
    assert!(set.is_pseudo_2d());
    assert_script_matches_header(tmp.path(), &set);

    // A plane mode picked for a spectral axis does not leak into either output.
    set.plane_mode = PlaneMode::States;
    assert_script_matches_header(tmp.path(), &set);
    let fd = build_header(&set);
    assert_eq!(fd.get_sw(DimCode::Y), 1.0);
    assert_eq!(fd.get_obs(DimCode::Y), 1.0);
    assert_eq!(fd.get_phase2d(), Phase2D::Magnitude);
}

#[test]
fn test_write_script_only() {
    let tmp = TempDir::new().unwrap();
    bruker_2d(tmp.path());
    let set = spin_converter::scan(tmp.path()).unwrap();
    let opts = ConversionOptions {
        strategy: Strategy::Script,
        write_script_only: true,
        ..Default::default()
    };
    let report = spin_converter::convert(tmp.path(), &set, &opts, &CancelToken::new()).unwrap();
    let text = fs::read_to_string(report.script.unwrap()).unwrap();
    assert!(text.contains("bruk2pipe -verb -in ser"));
    assert_eq!(script_value(&text, "-ndim"), "2");
    assert_eq!(script_value(&text, "-aq2D"), "States");
    assert!(text.contains("| nmrPipe -fn MULT -c 250.0"));
    assert!(report.output.is_none());
}

// ─── Varian ─────────────────────────────────────────────────────────────

#[test]
fn test_varian_direct_conversion() {
    let tmp = TempDir::new().unwrap();
    varian_2d(tmp.path());
    let set = spin_converter::scan(tmp.path()).unwrap();
    assert_eq!(set.spectrometer, Spectrometer::Varian);
    assert_eq!(set.ndim(), 2);
    assert_eq!(set.dims[1].size, 4);

    let report = spin_converter::convert(tmp.path(), &set, &unscaled(), &CancelToken::new()).unwrap();
    let (fd, data) = read_back(&report.output.unwrap());
    assert_eq!(fd.get_size(DimCode::X), 4);
    assert_eq!(fd.get_size(DimCode::Y), 4);
    assert_eq!(data.len(), 4 * 8);
    assert_eq!(&data[..8], &[0.0, 2.0, 4.0, 6.0, 1.0, 3.0, 5.0, 7.0]);
    assert_eq!(data[8], 10.0);
}

#[test]
fn test_script_header_equivalence_varian() {
    let tmp = TempDir::new().unwrap();
    varian_2d(tmp.path());
    let set = spin_converter::scan(tmp.path()).unwrap();
    assert_script_matches_header(tmp.path(), &set);
}

// ─── Sessions ───────────────────────────────────────────────────────────

#[test]
fn test_session_round_trip() {
    let tmp = TempDir::new().unwrap();
    bruker_2d(tmp.path());
    let mut set = spin_converter::scan(tmp.path()).unwrap();
    set.set_label(1, "N15_amide").unwrap();
    set.dims[1].set_carrier_ppm(117.5);
    let opts = ConversionOptions {
        bad_point_threshold: 5.0,
        ..Default::default()
    };
    SessionRecord::from_descriptors(&set, &opts)
        .save(tmp.path(), false)
        .unwrap();

    let record = SessionRecord::load(tmp.path()).unwrap();
    let mut fresh = spin_converter::scan(tmp.path()).unwrap();
    let mut fresh_opts = ConversionOptions::default();
    record.apply_to(&mut fresh).unwrap();
    record.apply_options(&mut fresh_opts);
    assert_eq!(fresh.dims[1].label, "N15_amide");
    assert!((fresh.dims[1].carrier_ppm() - 117.5).abs() < 1e-9);
    assert_eq!(fresh.dims[0].carrier_selection, set.dims[0].carrier_selection);
    assert_eq!(fresh_opts.bad_point_threshold, 5.0);
}

#[test]
fn test_session_mismatch() {
    let varian = TempDir::new().unwrap();
    varian_2d(varian.path());
    let set = spin_converter::scan(varian.path()).unwrap();
    SessionRecord::from_descriptors(&set, &ConversionOptions::default())
        .save(varian.path(), false)
        .unwrap();
    let record = SessionRecord::load(varian.path()).unwrap();

    let bruker = TempDir::new().unwrap();
    bruker_2d(bruker.path());
    let mut bruker_set = spin_converter::scan(bruker.path()).unwrap();
    let err = record.apply_to(&mut bruker_set).unwrap_err();
    assert!(matches!(err, ConvertError::SessionMismatch { .. }));
    assert!(err.requires_confirmation());
}
