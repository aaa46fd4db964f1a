/// Script strategy: write `fid.com` for the NMRPipe converters and run it
/// with `csh`.

use super::command::{find_tool, ToolCommand};
use super::direct::{axis_header, header_plane_mode};
use super::{check_guards, CancelToken, ConversionOptions, ConversionReport, Strategy, SCRIPT_NAME};
use crate::descriptor::{DescriptorSet, DigitalFilter, DimensionDescriptor, RawLayout, Spectrometer};
use crate::error::{ConvertError, Result};
use crate::transform::filter::FilterMode;
use crate::transform::scaling::scaling_factor;
use nmrpipe_core::AxisHeader;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

const AXES: [char; 3] = ['x', 'y', 'z'];

/// Numbers as the converters expect them: at most six decimals, always
/// with a fractional part.
fn num(v: f64) -> String {
    format!("{:?}", (v * 1e6).round() / 1e6)
}

/// Schedule path as written in the script: relative to `dir` if it lives there.
fn schedule_arg(dir: &Path, schedule: &Path) -> String {
    let rel = if schedule.is_absolute() {
        schedule.strip_prefix(dir).unwrap_or(schedule)
    } else {
        schedule
    };
    rel.display().to_string()
}

// ─── Script text ────────────────────────────────────────────────────────

fn nus_line(out: &mut String, dir: &Path, set: &DescriptorSet, opts: &ConversionOptions) -> Option<String> {
    let nus = opts.effective_nus(set)?;
    let raw = set.raw.file().display().to_string();
    let (mode, expanded) = match set.spectrometer {
        Spectrometer::Bruker => ("bruker", "./ser_full"),
        Spectrometer::Varian => ("varian", "./fid_full"),
    };
    out.push_str(&format!(
        "nusExpand.tcl -mode {} -sampleCount {} -off {} \\\n -in ./{} -out {} -sample {}",
        mode,
        nus.sample_count,
        nus.offset,
        raw,
        expanded,
        schedule_arg(dir, &nus.schedule)
    ));
    if nus.reverse {
        out.push_str(" -rev");
    }
    out.push_str("\n\n");
    Some(expanded.to_string())
}

fn bruker_line(out: &mut String, input: &str, set: &DescriptorSet, opts: &ConversionOptions) {
    let (big_endian, float64) = match set.raw {
        RawLayout::Bruker {
            big_endian,
            float64,
            ..
        } => (big_endian, float64),
        RawLayout::Varian { .. } => (false, false),
    };
    let order = if big_endian { "-noaswap" } else { "-aswap" };
    let word = if float64 { " -ws 8 -noi2f " } else { "" };
    let bad = num(opts.bad_point_threshold);

    match set.digital_filter {
        DigitalFilter::Available {
            decim,
            dspfvs,
            grpdly,
        } if opts.use_digital_filter => {
            let flag = match opts.filter_mode {
                FilterMode::BeforeFt => "-DMX",
                FilterMode::AfterFt => "-AMX",
            };
            out.push_str(&format!(
                "bruk2pipe -verb -in {} \\\n   -bad {} -ext {} {} -decim {} -dspfvs {} -grpdly {}{}\\\n",
                input,
                bad,
                order,
                flag,
                num(decim),
                dspfvs,
                num(grpdly),
                word
            ));
        }
        _ => {
            out.push_str(&format!(
                "bruk2pipe -verb -in {} \\\n   -bad {} -ext {}{}     \\\n",
                input, bad, order, word
            ));
        }
    }
}

fn varian_line(out: &mut String, input: &str, set: &DescriptorSet) {
    let aq_ord = if set.reverse_acquisition_order {
        " -aqORD 1"
    } else {
        ""
    };
    out.push_str(&format!("var2pipe -verb -in {} \\\n-noaswap{}\\\n", input, aq_ord));
}

fn table_row(out: &mut String, cells: &[(String, String)]) {
    for (flag, value) in cells {
        out.push_str(&format!("{:>10} {:>20} ", flag, value));
    }
    out.push_str(&format!("{:>5}", "\\\n"));
}

fn cell(d: &DimensionDescriptor, axis: &AxisHeader, flag: &str) -> String {
    match flag {
        "N" => axis.size.to_string(),
        "T" => axis.td_size.to_string(),
        "MODE" => d.mode.as_str().to_string(),
        "SW" => num(axis.sw),
        "OBS" => num(axis.obs),
        "CAR" => num(axis.car_ppm),
        _ => axis.label.clone(),
    }
}

fn parameter_table(out: &mut String, set: &DescriptorSet) {
    let n = set.ndim().min(AXES.len());
    let headers: Vec<AxisHeader> = (0..n).map(|i| axis_header(set, i)).collect();
    for flag in ["N", "T", "MODE", "SW", "OBS", "CAR", "LAB"] {
        let cells: Vec<(String, String)> = set.dims[..n]
            .iter()
            .zip(&headers)
            .zip(AXES)
            .map(|((d, h), axis)| (format!("-{}{}", axis, flag), cell(d, h, flag)))
            .collect();
        table_row(out, &cells);
    }

    let mut last = vec![("-ndim".to_string(), n.to_string())];
    if n >= 2 {
        last.push(("-aq2D".to_string(), header_plane_mode(set).as_str().to_string()));
    }
    while last.len() < n {
        last.push((String::new(), String::new()));
    }
    table_row(out, &last);
}

/// Full text of `fid.com`.
pub fn build_script(dir: &Path, set: &DescriptorSet, opts: &ConversionOptions, factor: f64) -> String {
    let mut out = String::from("#!/bin/csh\n\n");

    let input = nus_line(&mut out, dir, set, opts).unwrap_or_else(|| set.raw.file().display().to_string());
    match set.spectrometer {
        Spectrometer::Bruker => bruker_line(&mut out, &input, set, opts),
        Spectrometer::Varian => varian_line(&mut out, &input, set),
    }

    parameter_table(&mut out, set);

    if factor != 1.0 {
        out.push_str(&format!("| nmrPipe -fn MULT -c {} \\\n", num(factor)));
    }
    out.push_str(&format!(" -ov -out ./{}\n", opts.output));
    out
}

// ─── Running ────────────────────────────────────────────────────────────

fn write_script(dir: &Path, path: &Path, text: &str) -> Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ConvertError::io(dir, e))?;
    tmp.write_all(text.as_bytes())
        .map_err(|e| ConvertError::io(path, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o755))
            .map_err(|e| ConvertError::io(path, e))?;
    }
    tmp.persist(path).map_err(|e| ConvertError::io(path, e.error))?;
    Ok(())
}

/// Programs `fid.com` calls, in order of use.
fn required_tools(set: &DescriptorSet, opts: &ConversionOptions, factor: f64) -> Vec<&'static str> {
    let mut tools = vec!["csh"];
    if opts.effective_nus(set).is_some() {
        tools.push("nusExpand.tcl");
    }
    tools.push(match set.spectrometer {
        Spectrometer::Bruker => "bruk2pipe",
        Spectrometer::Varian => "var2pipe",
    });
    if factor != 1.0 {
        tools.push("nmrPipe");
    }
    tools
}

/// Write `fid.com` into `dir` and, unless `write_script_only`, run it.
pub fn convert_script(
    dir: &Path,
    set: &DescriptorSet,
    opts: &ConversionOptions,
    cancel: &CancelToken,
) -> Result<ConversionReport> {
    let script = dir.join(SCRIPT_NAME);
    let output = dir.join(&opts.output);
    let mut guarded: Vec<PathBuf> = vec![script.clone()];
    if !opts.write_script_only {
        guarded.push(output.clone());
    }
    check_guards(set, &guarded, opts)?;

    let factor = scaling_factor(set, &opts.scaling);
    let text = build_script(dir, set, opts, factor);
    write_script(dir, &script, &text)?;
    log::info!("Wrote {}", script.display());

    let mut report = ConversionReport {
        strategy: Strategy::Script,
        output: None,
        script: Some(script),
        scaling_factor: factor,
        command: None,
    };
    if opts.write_script_only {
        return Ok(report);
    }

    for tool in required_tools(set, opts, factor) {
        if find_tool(tool).is_none() {
            return Err(ConvertError::ToolNotInstalled(tool.to_string()));
        }
    }

    let result = ToolCommand::new("csh")
        .arg(SCRIPT_NAME)
        .working_dir(dir)
        .describe("NMRPipe conversion script")
        .execute(Duration::from_secs(opts.timeout_secs), cancel)?;

    if !result.success {
        return Err(ConvertError::ToolFailed {
            command: result.command_string,
            code: result.exit_code,
            stderr: result.stderr,
        });
    }
    if !output.is_file() {
        return Err(ConvertError::ToolFailed {
            command: result.command_string,
            code: result.exit_code,
            stderr: format!("{} was not created\n{}", output.display(), result.stderr),
        });
    }

    log::info!("Wrote {}", output.display());
    report.output = Some(output);
    report.command = Some(result);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::tests::sample_set;
    use crate::transform::nus::NusSettings;
    use tempfile::TempDir;

    fn script_for(set: &DescriptorSet, opts: &ConversionOptions) -> String {
        build_script(Path::new("/data/exp"), set, opts, scaling_factor(set, &opts.scaling))
    }

    #[test]
    fn test_bruker_2d_script() {
        let set = sample_set();
        let text = script_for(&set, &ConversionOptions::default());
        assert!(text.starts_with("#!/bin/csh\n\nbruk2pipe -verb -in ser \\\n"));
        assert!(text.contains("-bad 0.0 -ext -aswap"));
        assert!(text.contains(&format!("{:>10} {:>20} ", "-xN", "2048")));
        assert!(text.contains(&format!("{:>10} {:>20} ", "-yT", "128")));
        assert!(text.contains(&format!("{:>10} {:>20} ", "-yLAB", "15N")));
        assert!(text.contains(&format!("{:>10} {:>20} ", "-aq2D", "States")));
        assert!(text.contains("-ndim"));
        // 1000 / 8 scans
        assert!(text.contains("| nmrPipe -fn MULT -c 125.0 \\\n"));
        assert!(text.ends_with(" -ov -out ./test.fid\n"));
    }

    #[test]
    fn test_digital_filter_flags() {
        let mut set = sample_set();
        set.digital_filter = DigitalFilter::Available {
            decim: 16.0,
            dspfvs: 20,
            grpdly: 67.98,
        };
        let text = script_for(&set, &ConversionOptions::default());
        assert!(text.contains("-ext -aswap -DMX -decim 16.0 -dspfvs 20 -grpdly 67.98\\\n"));

        let after = ConversionOptions {
            filter_mode: FilterMode::AfterFt,
            ..Default::default()
        };
        assert!(script_for(&set, &after).contains(" -AMX "));

        let off = ConversionOptions {
            use_digital_filter: false,
            ..Default::default()
        };
        assert!(!script_for(&set, &off).contains("-decim"));
    }

    #[test]
    fn test_nus_and_varian_lines() {
        let mut set = sample_set();
        set.spectrometer = Spectrometer::Varian;
        set.raw = RawLayout::Varian {
            file: PathBuf::from("fid"),
        };
        set.reverse_acquisition_order = true;
        set.nus = Some(NusSettings {
            schedule: PathBuf::from("/data/exp/nuslist"),
            sample_count: 40,
            offset: 0,
            reverse: false,
        });
        let opts = ConversionOptions {
            nus_reverse: true,
            ..Default::default()
        };
        let text = script_for(&set, &opts);
        assert!(text.contains(
            "nusExpand.tcl -mode varian -sampleCount 40 -off 0 \\\n -in ./fid -out ./fid_full -sample nuslist -rev\n\n"
        ));
        assert!(text.contains("var2pipe -verb -in ./fid_full \\\n-noaswap -aqORD 1\\\n"));
    }

    #[test]
    fn test_pseudo_2d_table() {
        let mut set = sample_set();
        set.dims[1].make_pseudo("ID");
        set.refresh();
        set.plane_mode = crate::descriptor::PlaneMode::States;
        let text = script_for(&set, &ConversionOptions::default());
        assert!(text.contains(&format!("{:>10} {:>20} ", "-yT", "256")));
        assert!(text.contains(&format!("{:>10} {:>20} ", "-yMODE", "Real")));
        assert!(text.contains(&format!("{:>10} {:>20} ", "-ySW", "1.0")));
        assert!(text.contains(&format!("{:>10} {:>20} ", "-yOBS", "1.0")));
        assert!(text.contains(&format!("{:>10} {:>20} ", "-aq2D", "Real")));
    }

    #[test]
    fn test_unscaled_1d_has_no_mult() {
        let mut set = sample_set();
        set.dims.truncate(1);
        set.refresh();
        let opts = ConversionOptions {
            scaling: crate::transform::scaling::ScalingOptions {
                divide_by_ns: false,
                multiply_by_2_nc: false,
                multiply_by_1000: false,
            },
            ..Default::default()
        };
        let text = script_for(&set, &opts);
        assert!(!text.contains("MULT"));
        assert!(!text.contains("-aq2D"));
        assert!(!text.contains("-yN"));
        assert!(text.contains(&format!("{:>10} {:>20} ", "-ndim", "1")));
    }

    #[test]
    fn test_write_script_only() {
        let tmp = TempDir::new().unwrap();
        let set = sample_set();
        let opts = ConversionOptions {
            strategy: Strategy::Script,
            write_script_only: true,
            ..Default::default()
        };
        let report = convert_script(tmp.path(), &set, &opts, &CancelToken::new()).unwrap();
        assert!(report.output.is_none());
        let script = report.script.unwrap();
        assert!(std::fs::read_to_string(&script).unwrap().starts_with("#!/bin/csh"));

        let err = convert_script(tmp.path(), &set, &opts, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ConvertError::OutputExists(ref p) if p == &script));
    }
}
