//! Display refresh loop
//!
//! Playback walks sliding windows through prepared recordings; live mode
//! pulls one base-unit reading per tick into rolling tracks. Both feed the
//! same loop and the same frame sinks.

use anyhow::{bail, Context, Result};
use fecg_processing::{
    DisplayController, DisplayFrame, HeartRates, LiveMonitor, MonitorPipeline, PreparedSignals, SampleSource,
};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::str::FromStr;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Commands for controlling the refresh loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorCommand {
    Pause,
    Resume,
    /// Rewind every track to its start
    Reset,
    Stop,
}

impl FromStr for MonitorCommand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pause" | "p" => Ok(MonitorCommand::Pause),
            "resume" | "r" => Ok(MonitorCommand::Resume),
            "reset" => Ok(MonitorCommand::Reset),
            "stop" | "quit" | "q" => Ok(MonitorCommand::Stop),
            other => bail!("Unknown command {:?} (pause, resume, reset, stop)", other),
        }
    }
}

/// Forward commands typed on `input`, one per line, until input ends or the monitor goes away
///
/// Runs on a plain thread so a blocked read never holds up runtime shutdown.
pub fn spawn_console_control<R>(input: R, control: mpsc::Sender<MonitorCommand>) -> std::thread::JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    std::thread::spawn(move || forward_commands(input, &control))
}

fn forward_commands<R: BufRead>(input: R, control: &mpsc::Sender<MonitorCommand>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "console input closed");
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<MonitorCommand>() {
            Ok(command) => {
                if control.blocking_send(command).is_err() {
                    return;
                }
            }
            Err(e) => warn!("{}", e),
        }
    }
}

/// One frame handed to a sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorFrame {
    #[serde(flatten)]
    pub frame: DisplayFrame,
    /// Rates measured on the prepared recordings, in playback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rates: Option<HeartRates>,
    /// Skin temperature of the latest reading, in live mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

/// Source of the frames shown by the refresh loop
pub trait FrameProducer {
    /// Next frame, or `None` when there is nothing more to show
    fn next_frame(&mut self) -> Result<Option<MonitorFrame>>;

    fn reset(&mut self);
}

/// Sliding windows over prepared recordings
pub struct Playback<'a> {
    controller: DisplayController<'a>,
    rates: HeartRates,
}

impl<'a> Playback<'a> {
    pub fn new(pipeline: &MonitorPipeline, prepared: &'a PreparedSignals) -> Result<Self> {
        Ok(Playback {
            controller: pipeline.display_controller(prepared)?,
            rates: prepared.rates,
        })
    }
}

impl FrameProducer for Playback<'_> {
    fn next_frame(&mut self) -> Result<Option<MonitorFrame>> {
        Ok(Some(MonitorFrame {
            frame: self.controller.tick(),
            rates: Some(self.rates),
            temperature: None,
        }))
    }

    fn reset(&mut self) {
        self.controller.reset();
    }
}

/// Rolling tracks fed one reading per frame
pub struct LiveFeed<'s> {
    monitor: LiveMonitor,
    source: &'s mut dyn SampleSource,
}

impl<'s> LiveFeed<'s> {
    pub fn new(monitor: LiveMonitor, source: &'s mut dyn SampleSource) -> Self {
        LiveFeed { monitor, source }
    }
}

impl FrameProducer for LiveFeed<'_> {
    fn next_frame(&mut self) -> Result<Option<MonitorFrame>> {
        let Some(sample) = self.source.next_sample().context("Base unit read failed")? else {
            return Ok(None);
        };
        self.monitor.ingest(sample);
        let live = self.monitor.frame();

        Ok(Some(MonitorFrame {
            frame: live.frame,
            rates: None,
            temperature: live.temperature,
        }))
    }

    fn reset(&mut self) {
        self.monitor.reset();
    }
}

/// Receives every frame the monitor produces
pub trait FrameSink: Send {
    fn present(&mut self, frame: &MonitorFrame) -> Result<()>;

    /// Called once after the last frame
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Logs a one-line summary per window
#[derive(Debug, Default)]
pub struct LogSink;

impl FrameSink for LogSink {
    fn present(&mut self, frame: &MonitorFrame) -> Result<()> {
        for window in &frame.frame.windows {
            info!(
                tick = frame.frame.tick,
                track = %window.track,
                offset = window.offset,
                min = window.min,
                max = window.max,
                points = window.len(),
                maternal_bpm = frame.rates.as_ref().map(|r| r.maternal.bpm),
                fetal_bpm = frame.rates.as_ref().map(|r| r.fetal.bpm),
                temperature_c = frame.temperature,
                "window"
            );
        }
        Ok(())
    }
}

/// Writes each frame as one JSON line
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        JsonLinesSink { writer }
    }
}

impl<W: Write + Send> FrameSink for JsonLinesSink<W> {
    fn present(&mut self, frame: &MonitorFrame) -> Result<()> {
        serde_json::to_writer(&mut self.writer, frame).context("Failed to serialize frame")?;
        self.writer.write_all(b"\n").context("Failed to write frame")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush frames")
    }
}

/// Counters of one monitor run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStats {
    pub frames_presented: u64,
    pub skipped_ticks: u64,
    pub resets: u64,
    /// The producer ran out of frames before the loop was stopped
    pub exhausted: bool,
}

/// Drives a frame producer at a fixed refresh interval
pub struct FetalMonitor {
    tick_interval: Duration,
    max_frames: Option<u64>,
    command_sender: mpsc::Sender<MonitorCommand>,
    command_receiver: mpsc::Receiver<MonitorCommand>,
}

impl FetalMonitor {
    pub fn new(tick_interval: Duration) -> Self {
        let (command_sender, command_receiver) = mpsc::channel(32);
        FetalMonitor {
            tick_interval,
            max_frames: None,
            command_sender,
            command_receiver,
        }
    }

    /// Stop after `frames` frames instead of running until interrupted
    pub fn with_max_frames(mut self, frames: Option<u64>) -> Self {
        self.max_frames = frames;
        self
    }

    /// Get control sender for sending commands
    pub fn control_handle(&self) -> mpsc::Sender<MonitorCommand> {
        self.command_sender.clone()
    }

    /// Play back prepared recordings
    pub async fn run(
        &mut self,
        pipeline: &MonitorPipeline,
        prepared: &PreparedSignals,
        sink: &mut dyn FrameSink,
    ) -> Result<MonitorStats> {
        info!(pipeline = pipeline.name(), "playback started");
        let mut playback = Playback::new(pipeline, prepared)?;
        self.drive(&mut playback, sink).await
    }

    /// Show base-unit readings as they arrive
    pub async fn run_live(
        &mut self,
        monitor: LiveMonitor,
        source: &mut dyn SampleSource,
        sink: &mut dyn FrameSink,
    ) -> Result<MonitorStats> {
        info!("live monitoring started");
        let mut feed = LiveFeed::new(monitor, source);
        self.drive(&mut feed, sink).await
    }

    /// Tick until stopped, interrupted, exhausted or the frame limit is reached
    pub async fn drive(&mut self, producer: &mut dyn FrameProducer, sink: &mut dyn FrameSink) -> Result<MonitorStats> {
        let mut timer = interval(self.tick_interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        let mut stats = MonitorStats::default();
        let mut paused = false;

        info!(interval_ms = self.tick_interval.as_millis() as u64, "display loop started");

        loop {
            if self.max_frames.is_some_and(|max| stats.frames_presented >= max) {
                break;
            }

            tokio::select! {
                _ = timer.tick() => {
                    if paused {
                        stats.skipped_ticks += 1;
                        continue;
                    }
                    let Some(frame) = producer.next_frame()? else {
                        info!("frame source exhausted");
                        stats.exhausted = true;
                        break;
                    };
                    sink.present(&frame)
                        .with_context(|| format!("Frame sink failed at tick {}", frame.frame.tick))?;
                    stats.frames_presented += 1;
                }

                command = self.command_receiver.recv() => {
                    match command {
                        Some(MonitorCommand::Pause) => paused = true,
                        Some(MonitorCommand::Resume) => paused = false,
                        Some(MonitorCommand::Reset) => {
                            producer.reset();
                            stats.resets += 1;
                        }
                        Some(MonitorCommand::Stop) | None => break,
                    }
                    debug!(?command, paused, "monitor command");
                }

                result = &mut shutdown => {
                    result.context("Failed to listen for Ctrl-C")?;
                    info!("interrupt received");
                    break;
                }
            }
        }

        sink.finish()?;

        info!(
            frames = stats.frames_presented,
            skipped = stats.skipped_ticks,
            "display loop stopped"
        );
        Ok(stats)
    }
}
