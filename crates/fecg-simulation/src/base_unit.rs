//! Simulated base unit for live monitoring
//!
//! Stands in for the wireless base unit: one reading per call with a chest
//! lead, an abdominal lead and the skin temperature.

use crate::waveforms::CardiacWaveform;
use fecg_core::{FecgError, FecgResult};
use fecg_processing::{LiveSample, SampleSource};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Period of the skin temperature drift in seconds
const TEMPERATURE_DRIFT_PERIOD: f64 = 300.0;

/// Configuration of the simulated base unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseUnitConfig {
    /// Readings per second
    pub sample_rate: f64,
    /// Activity seen by the chest lead
    pub maternal: CardiacWaveform,
    /// Fetal activity added on the abdominal lead
    pub fetal: CardiacWaveform,
    /// Gaussian noise standard deviation per lead (0.0 = no noise)
    pub noise_std: f64,
    /// Mean skin temperature in degrees Celsius
    pub skin_temperature: f64,
    /// Peak deviation of the slow temperature drift
    pub temperature_drift: f64,
    /// Stop after this many readings
    pub max_samples: Option<u64>,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for BaseUnitConfig {
    fn default() -> Self {
        Self {
            sample_rate: 20.0,
            maternal: CardiacWaveform::Sinusoidal { frequency: 1.0, amplitude: 0.5 },
            fetal: CardiacWaveform::Sinusoidal { frequency: 1.7, amplitude: 0.115 },
            noise_std: 0.005,
            skin_temperature: 36.8,
            temperature_drift: 0.2,
            max_samples: None,
            seed: None,
        }
    }
}

/// Base unit simulator producing one reading per call
pub struct SimulatedBaseUnit {
    config: BaseUnitConfig,
    rng: StdRng,
    normal_dist: Option<Normal<f64>>,
    index: u64,
}

impl SimulatedBaseUnit {
    pub fn new(config: BaseUnitConfig) -> FecgResult<Self> {
        if !(config.sample_rate > 0.0) {
            return Err(FecgError::SynthesisError {
                message: format!("Base unit sample rate must be positive, got {}", config.sample_rate),
            });
        }
        if !(config.noise_std >= 0.0 && config.noise_std.is_finite()) {
            return Err(FecgError::SynthesisError {
                message: format!("Noise level must be finite and non-negative, got {}", config.noise_std),
            });
        }

        let normal_dist = if config.noise_std == 0.0 {
            None
        } else {
            Some(Normal::new(0.0, config.noise_std).map_err(|e| FecgError::SynthesisError {
                message: format!("Failed to create normal distribution: {}", e),
            })?)
        };

        let seed = config.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default()
        });

        debug!(
            rate = config.sample_rate,
            maternal = config.maternal.description(),
            fetal = config.fetal.description(),
            "base unit simulator ready"
        );

        Ok(SimulatedBaseUnit {
            config,
            rng: StdRng::seed_from_u64(seed),
            normal_dist,
            index: 0,
        })
    }

    pub fn config(&self) -> &BaseUnitConfig {
        &self.config
    }

    /// Readings produced so far
    pub fn samples_sent(&self) -> u64 {
        self.index
    }

    fn sample_noise(&mut self) -> f64 {
        match &self.normal_dist {
            Some(dist) => dist.sample(&mut self.rng),
            None => 0.0,
        }
    }
}

impl SampleSource for SimulatedBaseUnit {
    fn next_sample(&mut self) -> FecgResult<Option<LiveSample>> {
        if self.config.max_samples.is_some_and(|max| self.index >= max) {
            return Ok(None);
        }

        let t = self.index as f64 / self.config.sample_rate;
        let maternal_activity = self.config.maternal.value_at_time(t);
        let maternal = maternal_activity + self.sample_noise();
        let combined = maternal_activity + self.config.fetal.value_at_time(t) + self.sample_noise();
        let temperature = self.config.skin_temperature
            + self.config.temperature_drift * (2.0 * PI * t / TEMPERATURE_DRIFT_PERIOD).sin();

        self.index += 1;
        Ok(Some(LiveSample {
            maternal,
            combined,
            temperature,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> BaseUnitConfig {
        BaseUnitConfig {
            noise_std: 0.0,
            max_samples: Some(40),
            seed: Some(7),
            ..BaseUnitConfig::default()
        }
    }

    #[test]
    fn test_combined_lead_carries_fetal_activity() {
        let config = quiet();
        let fetal = config.fetal;
        let mut unit = SimulatedBaseUnit::new(config).unwrap();

        for i in 0..40 {
            let sample = unit.next_sample().unwrap().unwrap();
            let expected = fetal.value_at_time(i as f64 / 20.0);
            assert!((sample.combined - sample.maternal - expected).abs() < 1e-12);
            assert!((sample.temperature - 36.8).abs() <= 0.2);
        }
        assert_eq!(unit.samples_sent(), 40);
        assert!(unit.next_sample().unwrap().is_none());
    }

    #[test]
    fn test_seeded_noise_is_reproducible() {
        let config = BaseUnitConfig {
            seed: Some(42),
            ..BaseUnitConfig::default()
        };
        let mut a = SimulatedBaseUnit::new(config.clone()).unwrap();
        let mut b = SimulatedBaseUnit::new(config).unwrap();

        for _ in 0..10 {
            assert_eq!(a.next_sample().unwrap(), b.next_sample().unwrap());
        }
    }

    #[test]
    fn test_invalid_config() {
        assert!(SimulatedBaseUnit::new(BaseUnitConfig { sample_rate: 0.0, ..quiet() }).is_err());
        assert!(SimulatedBaseUnit::new(BaseUnitConfig { noise_std: -1.0, ..quiet() }).is_err());
    }
}
