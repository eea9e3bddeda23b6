//! PlanScale CLI
//!
//! Drives the measurement engine end to end from the command line: load a
//! drawing, calibrate it from an instruction or an explicit factor, take
//! two-point measurements, and print the JSON report.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use planscale_core::{export_report, DisplayGeometry, MeasurementSession, ScaleInfo, ScreenPoint};
use planscale_detect::{DetectionRequest, InstructionDetector, ScaleDetector};
use planscale_raster::{Rasterizer, SourceKind};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "planscale")]
#[command(about = "Drawing scale calibration and measurement")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable drawing metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Run offline scale detection against an instruction hint.
    Detect {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Free-text hint, e.g. "scale 1:50 on the title block".
        #[arg(long)]
        instruction: Option<String>,
    },
    /// Take measurements on a drawing and export the report.
    Measure {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Scale instruction, e.g. "1:100".
        #[arg(long, conflicts_with = "scale_factor")]
        scale: Option<String>,
        /// Millimetres per surface pixel.
        #[arg(long)]
        scale_factor: Option<f32>,
        /// Measurement segment "x1,y1,x2,y2"; repeatable.
        #[arg(long = "segment", value_name = "X1,Y1,X2,Y2")]
        segments: Vec<String>,
        /// Interpret segment coordinates as screen pixels inside a WxH
        /// viewport instead of surface pixels.
        #[arg(long, value_name = "WxH")]
        viewport: Option<String>,
        /// Write the JSON report here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InfoOutput {
    file_name: String,
    width_px: u32,
    height_px: u32,
    source_kind: SourceKind,
    render_scale: f32,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Detect { file, instruction } => run_detect(&file, instruction.as_deref()),
        Commands::Measure { file, scale, scale_factor, segments, viewport, output } => {
            run_measure(
                &file,
                scale.as_deref(),
                scale_factor,
                &segments,
                viewport.as_deref(),
                output.as_deref(),
            )
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_session(file: &Path) -> Result<MeasurementSession> {
    let surface = Rasterizer::new()
        .load(file)
        .with_context(|| format!("failed to load {}", file.display()))?;

    let mut session = MeasurementSession::new();
    session.load_surface(surface);
    Ok(session)
}

fn run_info(file: &Path) -> Result<()> {
    let surface = Rasterizer::new()
        .load(file)
        .with_context(|| format!("failed to load {}", file.display()))?;

    let payload = InfoOutput {
        file_name: surface.file_name().to_owned(),
        width_px: surface.width_px(),
        height_px: surface.height_px(),
        source_kind: surface.source_kind(),
        render_scale: surface.render_scale(),
    };

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn run_detect(file: &Path, instruction: Option<&str>) -> Result<()> {
    let mut session = load_session(file)?;
    let surface = session.surface().context("no drawing loaded")?;

    let detector = InstructionDetector::for_surface(surface);
    let request = DetectionRequest::for_surface(surface, instruction)
        .context("failed to build detection request")?;

    let ticket = session.begin_detection()?;
    let response = match detector.analyze(&request) {
        Ok(info) => Some(info),
        Err(error) => {
            log::warn!("detection failed, treating as not detected: {error}");
            None
        }
    };

    session.apply_detection(&ticket, response)?;

    let scale_info = session
        .calibration()
        .current_scale()
        .cloned()
        .unwrap_or_else(ScaleInfo::not_detected);

    println!("{}", serde_json::to_string_pretty(&scale_info)?);
    Ok(())
}

fn run_measure(
    file: &Path,
    scale: Option<&str>,
    scale_factor: Option<f32>,
    segments: &[String],
    viewport: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let mut session = load_session(file)?;

    match (scale, scale_factor) {
        (Some(text), None) => session
            .calibrate_from_instruction(text)
            .with_context(|| format!("could not calibrate from \"{text}\""))?,
        (None, Some(factor)) => {
            session.set_manual_scale(factor, &format!("{factor} mm/px"))?
        }
        _ => anyhow::bail!("provide exactly one of --scale or --scale-factor"),
    }

    let display = match viewport {
        Some(spec) => {
            let (width, height) = parse_viewport(spec)?;
            session.display_geometry(width, height)?
        }
        None => {
            let surface = session.surface().context("no drawing loaded")?;
            DisplayGeometry::one_to_one(surface.width_px(), surface.height_px())
        }
    };

    for segment in segments {
        let (start, end) = parse_segment(segment)?;
        session.start_measuring()?;
        session.pointer_down(start, &display)?;
        session.pointer_down(end, &display)?;
    }

    let report = export_report(&session)?;
    let json = serde_json::to_string_pretty(&report)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, &json)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            println!("{}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

fn parse_segment(spec: &str) -> Result<(ScreenPoint, ScreenPoint)> {
    let coords = spec
        .split(',')
        .map(|part| part.trim().parse::<f32>())
        .collect::<Result<Vec<f32>, _>>()
        .with_context(|| format!("invalid segment \"{spec}\""))?;

    if coords.len() != 4 {
        anyhow::bail!("segment \"{spec}\" must be four comma-separated numbers");
    }

    Ok((
        ScreenPoint::new(coords[0], coords[1]),
        ScreenPoint::new(coords[2], coords[3]),
    ))
}

fn parse_viewport(spec: &str) -> Result<(f32, f32)> {
    let (width, height) = spec
        .split_once(['x', 'X'])
        .with_context(|| format!("invalid viewport \"{spec}\", expected WxH"))?;

    let width = width.trim().parse::<f32>()?;
    let height = height.trim().parse::<f32>()?;
    if width <= 0.0 || height <= 0.0 {
        anyhow::bail!("viewport dimensions must be positive");
    }

    Ok((width, height))
}
