use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use hand_rom::{
    AnalysisConfig, AnalysisMode, AnalysisOutcome, AnalysisRun, Analyzer,
    chain::ExtensionConvention,
    model_download::ensure_handpose_model_ready,
    pipeline::{
        ImageSequenceSource, JointReading, OrtHandDetector, RomReport, TimedDetector, TimedSource,
    },
};

#[derive(Parser, Debug)]
#[command(
    name = "hand-rom",
    version,
    about = "Estimate finger joint range of motion from hand video frames"
)]
struct Cli {
    /// Directory of frames exported from the video, played back in file name order
    #[arg(long)]
    frames: Option<PathBuf>,

    /// Frame rate the frames were exported at
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    /// Joint chain to analyze: thumb-mp-ip, thumb, index, middle, ring, pinky, opposition
    #[arg(long, default_value = "thumb")]
    mode: AnalysisMode,

    /// Seconds between sampled frames (overrides the config file)
    #[arg(long)]
    step: Option<f64>,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Hand-pose ONNX model, downloaded when missing (overrides the config file)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,

    /// Write the run's diagnostics log to this file
    #[arg(long)]
    log_out: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(step) = cli.step {
        config.step_seconds = step;
    }
    if let Some(model) = cli.model.clone() {
        config.model_path = Some(model);
    }
    config.validate()?;

    let analyzer = Analyzer::new(cli.mode.chain(), config.step_seconds)?;
    let run = match open_source(&cli) {
        Ok(source) => {
            let model_path = config.model_path();
            ensure_handpose_model_ready(
                &model_path,
                config.detector.model_complexity,
                |event| log::debug!("model download: {event:?}"),
            )?;
            let detector = OrtHandDetector::new(&model_path, config.detector.clone())?;
            analyzer.run(
                Ok(TimedSource::spawn(source, config.seek_timeout())),
                TimedDetector::spawn(detector, config.detect_timeout()),
            )
        }
        Err(err) => analyzer.reject_missing_input(err),
    };

    if let Some(path) = &cli.log_out {
        run.diagnostics.export(path)?;
    }

    if cli.json {
        let json =
            serde_json::to_string_pretty(&run.outcome).context("failed to serialize outcome")?;
        println!("{json}");
    } else {
        print_outcome(&run);
    }

    Ok(match run.outcome {
        AnalysisOutcome::Done(_) => ExitCode::SUCCESS,
        AnalysisOutcome::Rejected(_) => ExitCode::from(2),
    })
}

fn open_source(cli: &Cli) -> Result<ImageSequenceSource> {
    let dir = cli
        .frames
        .as_deref()
        .ok_or_else(|| anyhow!("no frame directory given"))?;
    ImageSequenceSource::open(dir, cli.fps)
}

fn print_outcome(run: &AnalysisRun) {
    match &run.outcome {
        AnalysisOutcome::Done(report) => print_report(report),
        AnalysisOutcome::Rejected(rejection) => {
            println!(
                "rejected: {} ({}/{} frames with a hand)",
                rejection.reason, rejection.detected_frames, rejection.total_frames
            );
            if let Some(detail) = &rejection.detail {
                println!("  {detail}");
            }
        }
    }
}

fn print_report(report: &RomReport) {
    let convention = match report.result.extension_convention {
        ExtensionConvention::Residual => "180 - max",
        ExtensionConvention::Signed => "max - 180",
    };
    println!(
        "{} ({}/{} frames with a hand, extension = {convention})",
        report.result.chain, report.quality.detected_frames, report.quality.total_frames
    );
    for joint in &report.result.joints {
        match &joint.reading {
            JointReading::Range(range) => println!(
                "  {:<10} flexion {:>6.1}°  extension {:>6.1}°",
                joint.joint, range.flexion, range.extension
            ),
            JointReading::Distance { minimum } => {
                println!("  {:<10} closest {minimum:.3}", joint.joint)
            }
            JointReading::InsufficientVisibility => {
                println!("  {:<10} insufficient visibility", joint.joint)
            }
        }
    }
}
