//! spin-converter: convert a Bruker or Varian data directory to NMRPipe.

use clap::Parser;
use spin_converter::strategy::{ConversionOptions, Strategy};
use spin_converter::transform::filter::FilterMode;
use spin_converter::transform::nus::NusSettings;
use spin_converter::{AcquisitionMode, CancelToken, ConvertError, DescriptorSet, PlaneMode, SessionRecord};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "spin-converter",
    version,
    about = "Convert Bruker and Varian/Agilent time-domain NMR data to NMRPipe format"
)]
struct Cli {
    /// Directory holding acqus/ser or procpar/fid
    dir: PathBuf,

    /// Conversion strategy: direct or script
    #[arg(short, long, default_value = "direct")]
    strategy: Strategy,

    /// Replace existing outputs and accept duplicate labels
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Seconds to wait for the external converter
    #[arg(long)]
    timeout: Option<u64>,

    /// Output file name inside DIR
    #[arg(short, long)]
    output: Option<String>,

    /// Print the detected parameters and candidates, then stop
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Write fid.com without running it
    #[arg(long, default_value_t = false)]
    write_script_only: bool,

    /// Leave the Bruker digital filter alone
    #[arg(long, default_value_t = false)]
    no_digital_filter: bool,

    /// Remove the digital filter during the Fourier transform instead of now
    #[arg(long, default_value_t = false)]
    filter_after_ft: bool,

    /// NUS sampling schedule
    #[arg(long)]
    nus: Option<PathBuf>,

    /// Reverse the order of the schedule columns
    #[arg(long, default_value_t = false)]
    nus_reverse: bool,

    /// Do not divide by the number of scans
    #[arg(long, default_value_t = false)]
    no_scale_ns: bool,

    /// Do not multiply by 2^NC
    #[arg(long, default_value_t = false)]
    no_scale_nc: bool,

    /// Do not multiply by 1000
    #[arg(long, default_value_t = false)]
    no_scale_1000: bool,

    /// bruk2pipe bad point threshold
    #[arg(long)]
    bad: Option<f64>,

    /// Skip the 90° phase correction folded into the Rance-Kay shuffle
    #[arg(long, default_value_t = false)]
    no_rotate_phase: bool,

    /// Mode of the first indirect plane (-aq2D)
    #[arg(long)]
    plane_mode: Option<PlaneMode>,

    /// Save the final parameters to parameters.json
    #[arg(long, default_value_t = false)]
    save_session: bool,

    /// Start from the parameters saved in parameters.json
    #[arg(long, default_value_t = false)]
    load_session: bool,

    /// Dimension label, e.g. 1=15N
    #[arg(long, value_parser = parse_override)]
    label: Vec<(usize, String)>,

    /// Carrier in ppm or a candidate name, e.g. 0=4.77 or 1=H2O
    #[arg(long, value_parser = parse_override)]
    carrier: Vec<(usize, String)>,

    /// Acquisition mode, e.g. 1=States-TPPI
    #[arg(long, value_parser = parse_override)]
    mode: Vec<(usize, String)>,
}

fn parse_override(s: &str) -> Result<(usize, String), String> {
    let (dim, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected DIM=VALUE, got '{}'", s))?;
    let dim = dim
        .trim()
        .parse()
        .map_err(|_| format!("invalid dimension index '{}'", dim))?;
    Ok((dim, value.trim().to_string()))
}

fn apply_overrides(cli: &Cli, set: &mut DescriptorSet) -> spin_converter::Result<()> {
    for (dim, label) in &cli.label {
        set.set_label(*dim, label)?;
    }
    for (dim, value) in &cli.mode {
        let mode: AcquisitionMode = value
            .parse()
            .map_err(|_| ConvertError::invalid("--mode", &dim.to_string(), value))?;
        set.set_mode(*dim, mode)?;
    }
    for (dim, value) in &cli.carrier {
        let d = set
            .dims
            .get_mut(*dim)
            .ok_or(ConvertError::UnsupportedDimensions(dim + 1))?;
        if let Some(idx) = d.carrier_candidates.iter().position(|c| c.label.eq_ignore_ascii_case(value)) {
            d.select_carrier(idx);
        } else {
            let ppm: f64 = value
                .parse()
                .map_err(|_| ConvertError::invalid("--carrier", &dim.to_string(), value))?;
            d.set_carrier_ppm(ppm);
        }
    }
    if let Some(mode) = cli.plane_mode {
        set.plane_mode = mode;
    }
    Ok(())
}

fn apply_flags(cli: &Cli, dir: &Path, opts: &mut ConversionOptions) -> spin_converter::Result<()> {
    opts.strategy = cli.strategy;
    opts.overwrite = cli.overwrite;
    opts.write_script_only = cli.write_script_only;
    if let Some(t) = cli.timeout {
        opts.timeout_secs = t;
    }
    if let Some(out) = &cli.output {
        opts.output = out.clone();
    }
    if cli.no_digital_filter {
        opts.use_digital_filter = false;
    }
    if cli.filter_after_ft {
        opts.filter_mode = FilterMode::AfterFt;
    }
    if cli.no_scale_ns {
        opts.scaling.divide_by_ns = false;
    }
    if cli.no_scale_nc {
        opts.scaling.multiply_by_2_nc = false;
    }
    if cli.no_scale_1000 {
        opts.scaling.multiply_by_1000 = false;
    }
    if let Some(bad) = cli.bad {
        opts.bad_point_threshold = bad;
    }
    if cli.no_rotate_phase {
        opts.rotate_phase = false;
    }
    if cli.nus_reverse {
        opts.nus_reverse = true;
    }
    if let Some(schedule) = &cli.nus {
        let path = if schedule.is_relative() && !schedule.exists() {
            dir.join(schedule)
        } else {
            schedule.clone()
        };
        opts.nus = Some(NusSettings::from_schedule(&path)?);
    }
    Ok(())
}

fn print_descriptors(set: &DescriptorSet) {
    println!(
        "{} data, {} dimension(s), {:.2} K, plane mode {}",
        set.spectrometer,
        set.ndim(),
        set.temperature,
        set.plane_mode.as_str()
    );
    for (i, d) in set.dims.iter().enumerate() {
        println!(
            "  [{}] {:<6} N={:<6} T={:<6} {:<14} SW={:.3} Hz  OBS={:.4} MHz  CAR={:.4} ppm",
            i,
            d.label,
            d.size,
            d.real_size,
            d.mode.as_str(),
            d.sweep_width,
            d.observe_frequency,
            d.carrier_ppm()
        );
        for (k, c) in d.carrier_candidates.iter().enumerate() {
            let mark = if d.carrier_selection == Some(k) { "*" } else { " " };
            println!("        {} {:<10} {:.4} ppm", mark, c.label, c.ppm);
        }
    }
    if let Some(detector) = &set.pseudo_detector {
        println!("  pseudo axes: {} (from {})", set.pseudo_count, detector);
    }
    if let Some(nus) = &set.nus {
        println!(
            "  NUS: {} samples from {}",
            nus.sample_count,
            nus.schedule.display()
        );
    }
}

fn run(cli: &Cli) -> spin_converter::Result<()> {
    let dir = cli.dir.as_path();
    let mut set = spin_converter::scan(dir)?;
    let mut opts = ConversionOptions::default();

    if cli.load_session {
        let record = SessionRecord::load(dir)?;
        record.apply_to(&mut set)?;
        record.apply_options(&mut opts);
    }
    apply_overrides(cli, &mut set)?;
    apply_flags(cli, dir, &mut opts)?;
    set.validate()?;

    if cli.dry_run {
        print_descriptors(&set);
        return Ok(());
    }

    if cli.save_session {
        SessionRecord::from_descriptors(&set, &opts).save(dir, opts.overwrite)?;
    }

    let report = spin_converter::convert(dir, &set, &opts, &CancelToken::new())?;
    if let Some(script) = &report.script {
        println!("script: {}", script.display());
    }
    if let Some(output) = &report.output {
        println!("output: {}", output.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    log::info!("Starting spin-converter v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            if e.requires_confirmation() {
                eprintln!("hint: rerun with --overwrite to proceed anyway");
            }
            ExitCode::FAILURE
        }
    }
}
