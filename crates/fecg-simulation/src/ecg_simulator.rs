//! Multi-channel ECG recording simulator

use crate::waveforms::CardiacWaveform;
use fecg_core::{FecgError, FecgResult, MultiChannelBuffer, RecordingMetadata, SignalSource};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Configuration for ECG simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcgConfig {
    /// Source tag of the generated recording
    pub source: SignalSource,
    /// Samples per second per channel
    pub scan_rate: u32,
    /// Number of interleaved channels
    pub channel_count: usize,
    /// Channel carrying the cardiac waveform; the rest carry noise only
    pub ecg_channel: usize,
    /// Cardiac waveform on the ECG channel
    pub waveform: CardiacWaveform,
    /// Noise configuration
    pub noise: NoiseConfig,
    /// Power line interference (50/60Hz)
    pub powerline_freq: Option<f64>,
    /// Power line interference amplitude
    pub powerline_amplitude: f64,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

/// Noise added to every channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Gaussian noise standard deviation (0.0 = no noise)
    pub gaussian_std: f64,
    /// Baseline wander amplitude (respiration, ~0.25 Hz)
    pub baseline_wander: f64,
}

impl NoiseConfig {
    /// No noise at all
    pub fn none() -> Self {
        NoiseConfig {
            gaussian_std: 0.0,
            baseline_wander: 0.0,
        }
    }
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            gaussian_std: 0.01,
            baseline_wander: 0.02,
        }
    }
}

impl Default for EcgConfig {
    fn default() -> Self {
        Self {
            source: SignalSource::Maternal,
            scan_rate: 1000,
            channel_count: 5,
            ecg_channel: 1,
            waveform: CardiacWaveform::Pqrst {
                heart_rate_bpm: 75.0,
                amplitude: 1.0,
            },
            noise: NoiseConfig::default(),
            powerline_freq: Some(50.0),
            powerline_amplitude: 0.005,
            seed: None,
        }
    }
}

const BASELINE_WANDER_HZ: f64 = 0.25;

/// ECG recording simulator
pub struct EcgSimulator {
    config: EcgConfig,
    rng: StdRng,
    normal_dist: Option<Normal<f64>>,
    time_offset: f64,
}

impl EcgSimulator {
    /// Create new ECG simulator with configuration
    pub fn new(config: EcgConfig) -> FecgResult<Self> {
        Self::validate(&config)?;

        let seed = config.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default()
        });

        Ok(EcgSimulator {
            normal_dist: Self::noise_distribution(&config.noise)?,
            rng: StdRng::seed_from_u64(seed),
            config,
            time_offset: 0.0,
        })
    }

    fn validate(config: &EcgConfig) -> FecgResult<()> {
        RecordingMetadata::validate_scan_rate(config.scan_rate)?;
        RecordingMetadata::validate_channel_count(config.channel_count)?;
        if config.ecg_channel >= config.channel_count {
            return Err(FecgError::ChannelOutOfRange {
                channel: config.ecg_channel,
                channel_count: config.channel_count,
            });
        }
        Ok(())
    }

    fn noise_distribution(noise: &NoiseConfig) -> FecgResult<Option<Normal<f64>>> {
        if noise.gaussian_std == 0.0 {
            return Ok(None);
        }
        Normal::new(0.0, noise.gaussian_std)
            .map(Some)
            .map_err(|e| FecgError::SynthesisError {
                message: format!("Failed to create normal distribution: {}", e),
            })
    }

    pub fn config(&self) -> &EcgConfig {
        &self.config
    }

    /// Generate `duration` seconds of interleaved data continuing from the last call
    pub fn generate(&mut self, duration: f64) -> FecgResult<MultiChannelBuffer> {
        if !(duration > 0.0) {
            return Err(FecgError::SynthesisError {
                message: format!("Duration must be positive, got {}", duration),
            });
        }

        let rate = self.config.scan_rate as f64;
        let samples = (rate * duration).round() as usize;
        let channels = self.config.channel_count;
        let mut data = Vec::with_capacity(samples * channels);

        for i in 0..samples {
            let t = self.time_offset + i as f64 / rate;
            let shared = self.interference(t);
            for ch in 0..channels {
                let mut value = shared + self.sample_noise();
                if ch == self.config.ecg_channel {
                    value += self.config.waveform.value_at_time(t);
                }
                data.push(value);
            }
        }

        self.time_offset += samples as f64 / rate;

        debug!(
            source = %self.config.source,
            samples,
            channels,
            waveform = self.config.waveform.description(),
            "generated simulated recording"
        );

        MultiChannelBuffer::from_interleaved(data, self.config.source, self.config.scan_rate, channels)
    }

    /// Baseline wander and power line hum common to all leads
    fn interference(&self, t: f64) -> f64 {
        let wander = self.config.noise.baseline_wander * (2.0 * PI * BASELINE_WANDER_HZ * t).sin();
        let hum = self
            .config
            .powerline_freq
            .map(|freq| self.config.powerline_amplitude * (2.0 * PI * freq * t).sin())
            .unwrap_or(0.0);
        wander + hum
    }

    fn sample_noise(&mut self) -> f64 {
        match &self.normal_dist {
            Some(dist) => dist.sample(&mut self.rng),
            None => 0.0,
        }
    }

    /// Update simulator configuration
    pub fn update_config(&mut self, config: EcgConfig) -> FecgResult<()> {
        Self::validate(&config)?;
        self.normal_dist = Self::noise_distribution(&config.noise)?;
        self.config = config;
        Ok(())
    }

    /// Reset time offset
    pub fn reset_time(&mut self) {
        self.time_offset = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fecg_processing::HeartRateEstimator;

    fn quiet_config() -> EcgConfig {
        EcgConfig {
            noise: NoiseConfig::none(),
            powerline_freq: None,
            seed: Some(42),
            ..EcgConfig::default()
        }
    }

    #[test]
    fn test_generate_layout() {
        let mut simulator = EcgSimulator::new(EcgConfig { seed: Some(1), ..EcgConfig::default() }).unwrap();
        let buffer = simulator.generate(2.0).unwrap();

        assert_eq!(buffer.channel_count(), 5);
        assert_eq!(buffer.samples_per_channel(), 2000);
        assert_eq!(buffer.scan_rate(), 1000);
        assert_eq!(buffer.source(), SignalSource::Maternal);
    }

    #[test]
    fn test_waveform_only_on_ecg_channel() {
        let mut simulator = EcgSimulator::new(quiet_config()).unwrap();
        let buffer = simulator.generate(2.0).unwrap();

        assert!(buffer.channel_stats(1).unwrap().max > 0.9);
        for ch in [0, 2, 3, 4] {
            assert_eq!(buffer.channel_stats(ch).unwrap().peak_to_peak, 0.0);
        }
    }

    #[test]
    fn test_simulated_rate_is_detected() {
        let mut simulator = EcgSimulator::new(quiet_config()).unwrap();
        let buffer = simulator.generate(20.0).unwrap();

        let estimate = HeartRateEstimator::new(1000, 0.6).estimate(&buffer.channel(1).unwrap());
        assert_eq!(estimate.bpm, 75);
        assert_eq!(estimate.peak_count, 25);
    }

    #[test]
    fn test_reproducible_with_seed() {
        let config = EcgConfig { seed: Some(7), ..EcgConfig::default() };
        let a = EcgSimulator::new(config.clone()).unwrap().generate(1.0).unwrap();
        let b = EcgSimulator::new(config).unwrap().generate(1.0).unwrap();
        assert_eq!(a.data(), b.data());
    }

    #[test]
    fn test_generation_continues_in_time() {
        let mut simulator = EcgSimulator::new(quiet_config()).unwrap();
        let first = simulator.generate(0.4).unwrap();
        let second = simulator.generate(0.4).unwrap();

        // First R-wave lands at 0.4 s, the start of the second chunk
        let r = second.channel(1).unwrap().sample(0);
        assert!(r > 0.99);
        assert!(first.channel_stats(1).unwrap().max < r);

        simulator.reset_time();
        let again = simulator.generate(0.4).unwrap();
        assert_eq!(first.data(), again.data());
    }

    #[test]
    fn test_invalid_configs() {
        let bad_channel = EcgConfig { ecg_channel: 5, ..EcgConfig::default() };
        assert!(matches!(
            EcgSimulator::new(bad_channel),
            Err(FecgError::ChannelOutOfRange { channel: 5, channel_count: 5 })
        ));

        let bad_noise = EcgConfig {
            noise: NoiseConfig { gaussian_std: -1.0, baseline_wander: 0.0 },
            ..EcgConfig::default()
        };
        assert!(matches!(EcgSimulator::new(bad_noise), Err(FecgError::SynthesisError { .. })));

        let mut simulator = EcgSimulator::new(quiet_config()).unwrap();
        assert!(simulator.generate(0.0).is_err());
        assert!(simulator
            .update_config(EcgConfig { scan_rate: 10, ..quiet_config() })
            .is_err());
    }
}
