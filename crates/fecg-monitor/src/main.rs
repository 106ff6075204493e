//! FECG Monitor - fetal and maternal heart rate playback and live monitoring

mod loader;
mod monitor;

use anyhow::{Context, Result};
use clap::Parser;
use fecg_processing::{LiveMonitor, MonitorConfig, MonitorPipeline, MonitorProfile};
use fecg_simulation::{BaseUnitConfig, SimulatedBaseUnit};
use monitor::{spawn_console_control, FetalMonitor, FrameSink, JsonLinesSink, LogSink, MonitorStats};
use std::path::PathBuf;
use tokio::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Command line options
#[derive(Parser, Debug, Default, PartialEq)]
#[command(name = "fecg-monitor", version, about = "Fetal and maternal heart rate monitor")]
struct MonitorArgs {
    /// JSON configuration; a preset is used when absent
    config: Option<PathBuf>,

    /// Use the simulated preset instead of bench playback
    #[arg(long, conflicts_with = "live")]
    simulate: bool,

    /// Live base-unit mode, fed by the simulated base unit
    #[arg(long)]
    live: bool,

    /// Stop after this many frames
    #[arg(long = "frames", value_name = "N")]
    max_frames: Option<u64>,

    /// Write frames as JSON lines instead of logging them
    #[arg(long, value_name = "PATH")]
    frames_out: Option<PathBuf>,

    /// Export the combined ECG channel as waveform generator points
    #[arg(long, value_name = "PATH")]
    export_arb: Option<PathBuf>,

    /// Write a standalone fetal recording synthesized from the maternal one
    #[arg(long, value_name = "PATH")]
    export_fetal: Option<PathBuf>,
}

fn load_config(args: &MonitorArgs) -> Result<MonitorConfig> {
    let config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read configuration {}", path.display()))?;
            MonitorConfig::from_json(&json)?
        }
        None if args.live => MonitorConfig::live_base_unit(),
        None if args.simulate => MonitorConfig::simulated(),
        None => MonitorConfig::bench_playback(),
    };
    config.validate()?;
    Ok(config)
}

fn frame_sink(args: &MonitorArgs) -> Result<Box<dyn FrameSink>> {
    Ok(match &args.frames_out {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Box::new(JsonLinesSink::new(std::io::BufWriter::new(file)))
        }
        None => Box::new(LogSink),
    })
}

async fn run_playback(
    config: &MonitorConfig,
    args: &MonitorArgs,
    monitor: &mut FetalMonitor,
    sink: &mut dyn FrameSink,
) -> Result<MonitorStats> {
    let recordings = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || loader::acquire(&config))
            .await
            .context("Recording loader panicked")??
    };

    if let Some(path) = &args.export_arb {
        fecg_simulation::export_arb_csv(path, &recordings.combined, config.recording.ecg_channel)?;
    }
    if let Some(path) = &args.export_fetal {
        loader::export_fetal_recording(path, &recordings.maternal, config.recording.ecg_channel)?;
    }

    let mut pipeline = MonitorPipeline::from_config(config)?;
    let prepared = pipeline.prepare(&recordings.combined, recordings.maternal)?;
    info!(
        "Maternal HR: {} BPM / Fetal HR: {} BPM",
        prepared.rates.maternal.bpm, prepared.rates.fetal.bpm
    );
    for metrics in pipeline.stage_metrics() {
        info!(stage = ?metrics.stage, elapsed_us = metrics.processing_time_us, "stage timing");
    }

    monitor.run(&pipeline, &prepared, sink).await
}

async fn run_live(config: &MonitorConfig, monitor: &mut FetalMonitor, sink: &mut dyn FrameSink) -> Result<MonitorStats> {
    let mut base_unit = SimulatedBaseUnit::new(BaseUnitConfig {
        sample_rate: config.live.sample_rate(),
        ..BaseUnitConfig::default()
    })?;
    let live = LiveMonitor::new(&config.live, &config.display);
    monitor.run_live(live, &mut base_unit, sink).await
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = MonitorArgs::parse();
    let config = load_config(&args)?;
    info!(name = %config.name, profile = ?config.profile, "starting fetal monitor");

    let mut sink = frame_sink(&args)?;
    let mut monitor = FetalMonitor::new(Duration::from_millis(config.refresh_interval_ms()))
        .with_max_frames(args.max_frames);
    spawn_console_control(std::io::BufReader::new(std::io::stdin()), monitor.control_handle());
    info!("type pause, resume, reset or stop to control the display");

    let stats = match config.profile {
        MonitorProfile::Live => run_live(&config, &mut monitor, sink.as_mut()).await?,
        _ => run_playback(&config, &args, &mut monitor, sink.as_mut()).await?,
    };
    info!(frames = stats.frames_presented, "fetal monitor finished");

    Ok(())
}
