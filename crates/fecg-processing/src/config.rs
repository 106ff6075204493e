//! Configuration management for the fetal monitor

use crate::display::{ScanCursor, WindowNormalizer, DEFAULT_EPSILON};
use fecg_core::{FecgError, FecgResult, RecordingMetadata, SignalSource};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Configuration name/profile
    pub name: String,
    /// Where the recordings come from
    pub profile: MonitorProfile,
    /// Layout of both input recordings
    pub recording: RecordingLayout,
    /// Source files for bench playback
    pub sources: SourcePaths,
    /// Per-signal detection thresholds
    pub calibration: Calibration,
    /// Sliding window display parameters
    pub display: DisplaySettings,
    /// Estimate maternal and fetal rates on separate threads
    pub parallel_estimation: bool,
    /// Live base-unit streaming
    #[serde(default)]
    pub live: LiveSettings,
}

/// Monitor profiles for different use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorProfile {
    /// Replay of recorded `.dat` files
    BenchPlayback,
    /// Recordings synthesized in-process
    Simulated,
    /// Sample-by-sample readings from a base unit
    Live,
    /// Custom profile
    Custom,
}

/// Layout shared by the combined and maternal recordings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingLayout {
    /// Samples per second per channel
    pub scan_rate: u32,
    /// Interleaved channels per sample
    pub channel_count: usize,
    /// Seconds of data to read from each file
    pub duration_seconds: f64,
    /// Channel holding the ECG
    pub ecg_channel: usize,
}

/// Recording file locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcePaths {
    /// Combined (maternal + fetal) recording
    pub combined: PathBuf,
    /// Maternal reference recording
    pub maternal: PathBuf,
}

/// Detection thresholds, tuned per recording and per signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Threshold for the maternal ECG channel
    pub maternal_threshold: f64,
    /// Threshold for the fetal estimate (after subtraction)
    pub fetal_threshold: f64,
}

/// Sliding window display parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySettings {
    /// Seconds of data visible per window
    pub window_seconds: f64,
    /// Refresh tick period in milliseconds
    pub tick_interval_ms: u64,
    /// Horizontal extent of one window in host units
    pub width: f64,
    /// Vertical extent of one window in host units
    pub scale: f64,
    /// Guard against flat windows
    pub epsilon: f64,
}

/// Live base-unit parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSettings {
    /// Samples kept per rolling track
    pub buffer_size: usize,
    /// Period between base-unit readings in milliseconds
    pub sample_interval_ms: u64,
    /// Headroom around the window extremes, in signal units
    pub margin: f64,
}

impl Default for LiveSettings {
    fn default() -> Self {
        LiveSettings {
            buffer_size: 200,
            sample_interval_ms: 50,
            margin: 0.05,
        }
    }
}

impl LiveSettings {
    /// Readings per second
    pub fn sample_rate(&self) -> f64 {
        1000.0 / self.sample_interval_ms as f64
    }
}

impl RecordingLayout {
    /// Metadata for one of the two input recordings
    pub fn metadata(&self, source: SignalSource) -> FecgResult<RecordingMetadata> {
        RecordingMetadata::new(source, self.scan_rate, self.channel_count, self.duration_seconds)
    }

    /// Samples per channel in each recording
    pub fn samples_per_channel(&self) -> usize {
        (self.scan_rate as f64 * self.duration_seconds).round() as usize
    }
}

impl DisplaySettings {
    /// Samples visible in one window at `scan_rate`
    pub fn window_length(&self, scan_rate: u32) -> usize {
        ScanCursor::for_display(scan_rate, self.window_seconds, 1).window_length()
    }

    pub fn normalizer(&self) -> WindowNormalizer {
        WindowNormalizer::new(self.width, self.scale, self.epsilon)
    }
}

/// Preset configurations for common scenarios
impl MonitorConfig {
    /// Bench playback of the 550 s five-channel recordings
    pub fn bench_playback() -> Self {
        MonitorConfig {
            name: "Bench playback".to_string(),
            profile: MonitorProfile::BenchPlayback,
            recording: RecordingLayout {
                scan_rate: 1000,
                channel_count: 5,
                duration_seconds: 550.0,
                ecg_channel: 1,
            },
            sources: SourcePaths {
                combined: PathBuf::from("ECGSignals/SumECGRacapMomPlusBaby.dat"),
                maternal: PathBuf::from("ECGSignals/OriginalECGRacapMom.dat"),
            },
            calibration: Calibration {
                maternal_threshold: 4.5,
                fetal_threshold: 0.095,
            },
            display: DisplaySettings {
                window_seconds: 10.0,
                tick_interval_ms: 1000,
                width: 1280.0,
                scale: 120.0,
                epsilon: DEFAULT_EPSILON,
            },
            parallel_estimation: true,
            live: LiveSettings::default(),
        }
    }

    /// Short synthesized recordings, no files needed
    pub fn simulated() -> Self {
        MonitorConfig {
            name: "Simulated".to_string(),
            profile: MonitorProfile::Simulated,
            recording: RecordingLayout {
                scan_rate: 1000,
                channel_count: 5,
                duration_seconds: 60.0,
                ecg_channel: 1,
            },
            calibration: Calibration {
                maternal_threshold: 0.6,
                fetal_threshold: 0.06,
            },
            display: DisplaySettings {
                window_seconds: 5.0,
                ..Self::bench_playback().display
            },
            ..Self::bench_playback()
        }
    }

    /// Live readings from a base unit, drawn into rolling tracks
    pub fn live_base_unit() -> Self {
        MonitorConfig {
            name: "Live base unit".to_string(),
            profile: MonitorProfile::Live,
            ..Self::bench_playback()
        }
    }

    /// Period of the refresh loop for this profile
    pub fn refresh_interval_ms(&self) -> u64 {
        match self.profile {
            MonitorProfile::Live => self.live.sample_interval_ms,
            _ => self.display.tick_interval_ms,
        }
    }

    /// Create configuration suitable for given profile
    pub fn for_profile(profile: MonitorProfile) -> Self {
        match profile {
            MonitorProfile::BenchPlayback => Self::bench_playback(),
            MonitorProfile::Simulated => Self::simulated(),
            MonitorProfile::Live => Self::live_base_unit(),
            MonitorProfile::Custom => Self::bench_playback(), // Default to bench playback
        }
    }

    /// Validate entire configuration
    pub fn validate(&self) -> FecgResult<()> {
        self.recording
            .metadata(SignalSource::Combined)
            .map_err(|e| FecgError::ConfigurationError {
                message: format!("Recording layout invalid: {}", e),
            })?;

        if self.recording.ecg_channel >= self.recording.channel_count {
            return Err(FecgError::ConfigurationError {
                message: format!(
                    "ECG channel {} out of range for {} channels",
                    self.recording.ecg_channel, self.recording.channel_count
                ),
            });
        }

        for (name, threshold) in [
            ("maternal", self.calibration.maternal_threshold),
            ("fetal", self.calibration.fetal_threshold),
        ] {
            if !threshold.is_finite() {
                return Err(FecgError::ConfigurationError {
                    message: format!("{} threshold must be finite", name),
                });
            }
        }

        if !(self.display.window_seconds > 0.0) {
            return Err(FecgError::ConfigurationError {
                message: "Display window must be positive".to_string(),
            });
        }

        if self.display.window_length(self.recording.scan_rate) == 0 {
            return Err(FecgError::ConfigurationError {
                message: "Display window shorter than one sample".to_string(),
            });
        }

        if self.display.tick_interval_ms == 0 {
            return Err(FecgError::ConfigurationError {
                message: "Tick interval must be greater than 0".to_string(),
            });
        }

        if !(self.display.epsilon > 0.0) {
            return Err(FecgError::ConfigurationError {
                message: "Display epsilon must be positive".to_string(),
            });
        }

        if self.live.buffer_size == 0 || self.live.sample_interval_ms == 0 {
            return Err(FecgError::ConfigurationError {
                message: "Live buffer size and sample interval must be greater than 0".to_string(),
            });
        }

        if !(self.live.margin >= 0.0) {
            return Err(FecgError::ConfigurationError {
                message: "Live margin must be non-negative".to_string(),
            });
        }

        Ok(())
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> FecgResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| FecgError::ConfigurationError {
            message: format!("Failed to serialize configuration: {}", e),
        })
    }

    /// Import configuration from JSON
    pub fn from_json(json: &str) -> FecgResult<Self> {
        serde_json::from_str(json).map_err(|e| FecgError::ConfigurationError {
            message: format!("Failed to deserialize configuration: {}", e),
        })
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::bench_playback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bench_config() {
        let config = MonitorConfig::bench_playback();
        assert_eq!(config.profile, MonitorProfile::BenchPlayback);
        assert_eq!(config.recording.samples_per_channel(), 550_000);
        assert_eq!(config.display.window_length(config.recording.scan_rate), 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_thresholds_are_separate() {
        let config = MonitorConfig::bench_playback();
        assert!(config.calibration.maternal_threshold > config.calibration.fetal_threshold);
    }

    #[test]
    fn test_config_validation() {
        let mut config = MonitorConfig::bench_playback();

        config.recording.ecg_channel = 5;
        assert!(config.validate().is_err());

        config.recording.ecg_channel = 1;
        config.display.window_seconds = 0.0;
        assert!(config.validate().is_err());

        config.display.window_seconds = 10.0;
        config.display.tick_interval_ms = 0;
        assert!(config.validate().is_err());

        config.display.tick_interval_ms = 1000;
        config.calibration.fetal_threshold = f64::NAN;
        assert!(config.validate().is_err());

        config.calibration.fetal_threshold = 0.095;
        config.recording.scan_rate = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_serialization() {
        let config = MonitorConfig::simulated();

        let json = config.to_json().unwrap();
        assert!(json.contains("fetal_threshold"));

        let deserialized = MonitorConfig::from_json(&json).unwrap();
        assert_eq!(config, deserialized);
        assert!(MonitorConfig::from_json("{ \"name\": 1 }").is_err());
    }

    #[test]
    fn test_profile_creation() {
        assert_eq!(MonitorConfig::for_profile(MonitorProfile::Simulated).profile, MonitorProfile::Simulated);
        assert_eq!(MonitorConfig::for_profile(MonitorProfile::BenchPlayback).profile, MonitorProfile::BenchPlayback);
        assert!(MonitorConfig::simulated().validate().is_ok());
    }

    #[test]
    fn test_window_length_matches_display_cursor() {
        let display = MonitorConfig::simulated().display;
        let mut controller = crate::DisplayController::new(display.normalizer());
        let data = vec![0.0; 20_000];
        controller.add_timed_track("m", fecg_core::ChannelView::single(&data), 1000, display.window_seconds);

        let cursor = controller.track("m").unwrap().cursor();
        assert_eq!(display.window_length(1000), cursor.window_length());
        assert_eq!(display.window_length(1000), 5000);
        assert_eq!(DisplaySettings { window_seconds: 2.5, ..display }.window_length(1000), 2500);
    }

    #[test]
    fn test_live_config() {
        let config = MonitorConfig::live_base_unit();
        assert_eq!(config.profile, MonitorProfile::Live);
        assert_eq!(config.live.buffer_size, 200);
        assert_eq!(config.live.sample_rate(), 20.0);
        assert_eq!(config.refresh_interval_ms(), 50);
        assert_eq!(MonitorConfig::bench_playback().refresh_interval_ms(), 1000);
        assert!(config.validate().is_ok());

        let mut invalid = config.clone();
        invalid.live.buffer_size = 0;
        assert!(invalid.validate().is_err());
        invalid.live.buffer_size = 200;
        invalid.live.margin = -0.1;
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_live_section_is_optional_in_json() {
        let json = MonitorConfig::simulated().to_json().unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value.as_object_mut().unwrap().remove("live");

        let config = MonitorConfig::from_json(&value.to_string()).unwrap();
        assert_eq!(config.live, LiveSettings::default());
    }
}
