//! Acquisition of the combined and maternal recordings

use anyhow::{bail, Context, Result};
use fecg_core::format::{decode_recording, encode_recording};
use fecg_core::{MultiChannelBuffer, RecordingMetadata, SignalSource};
use fecg_processing::{MonitorConfig, MonitorProfile};
use fecg_simulation::{EcgConfig, EcgSimulator, RecordingSynthesizer, SynthesisConfig};
use std::path::Path;
use tracing::{debug, info};

/// Both inputs of the separator
#[derive(Debug, Clone)]
pub struct Recordings {
    pub combined: MultiChannelBuffer,
    pub maternal: MultiChannelBuffer,
}

/// Load or synthesize the recordings the profile asks for
pub fn acquire(config: &MonitorConfig) -> Result<Recordings> {
    match config.profile {
        MonitorProfile::BenchPlayback | MonitorProfile::Custom => load_bench(config),
        MonitorProfile::Simulated => simulate(config),
        MonitorProfile::Live => bail!("The live profile reads a base unit, not recordings"),
    }
}

/// Read both `.dat` recordings named in the configuration
pub fn load_bench(config: &MonitorConfig) -> Result<Recordings> {
    let combined = load_recording(
        &config.sources.combined,
        config.recording.metadata(SignalSource::Combined)?,
    )?;
    let maternal = load_recording(
        &config.sources.maternal,
        config.recording.metadata(SignalSource::Maternal)?,
    )?;

    info!(
        combined = %config.sources.combined.display(),
        maternal = %config.sources.maternal.display(),
        samples = combined.samples_per_channel(),
        "recordings loaded"
    );
    Ok(Recordings { combined, maternal })
}

/// Read one recording, keeping only the declared number of samples
pub fn load_recording(path: &Path, metadata: RecordingMetadata) -> Result<MultiChannelBuffer> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read recording {}", path.display()))?;
    let buffer = decode_recording(&bytes, metadata)
        .with_context(|| format!("Failed to decode recording {}", path.display()))?;

    debug!(
        path = %path.display(),
        bytes = bytes.len(),
        channels = buffer.channel_count(),
        source = %buffer.source(),
        "recording decoded"
    );
    Ok(buffer)
}

/// Simulated maternal recording plus the combined recording synthesized from it
pub fn simulate(config: &MonitorConfig) -> Result<Recordings> {
    let layout = &config.recording;
    let mut simulator = EcgSimulator::new(EcgConfig {
        source: SignalSource::Maternal,
        scan_rate: layout.scan_rate,
        channel_count: layout.channel_count,
        ecg_channel: layout.ecg_channel,
        ..EcgConfig::default()
    })?;
    let maternal = simulator
        .generate(layout.duration_seconds)
        .context("Failed to simulate maternal recording")?;

    let mut synthesizer = RecordingSynthesizer::new(SynthesisConfig {
        ecg_channel: layout.ecg_channel,
        ..SynthesisConfig::default()
    })?;
    let synthesized = synthesizer
        .combine(&maternal)
        .context("Failed to synthesize combined recording")?;

    Ok(Recordings {
        combined: synthesized.combined,
        maternal,
    })
}

/// Synthesize a standalone fetal recording from `maternal` and write it as `.dat`
pub fn export_fetal_recording(path: &Path, maternal: &MultiChannelBuffer, ecg_channel: usize) -> Result<MultiChannelBuffer> {
    let mut synthesizer = RecordingSynthesizer::new(SynthesisConfig {
        ecg_channel,
        ..SynthesisConfig::default()
    })?;
    let fetal = synthesizer
        .fetal_recording(maternal)
        .context("Failed to synthesize fetal recording")?;

    std::fs::write(path, encode_recording(&fetal))
        .with_context(|| format!("Failed to write fetal recording {}", path.display()))?;
    info!(
        path = %path.display(),
        samples = fetal.samples_per_channel(),
        duration_s = fetal.duration(),
        "exported fetal recording"
    );
    Ok(fetal)
}
