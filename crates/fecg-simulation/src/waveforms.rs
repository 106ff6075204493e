//! Pre-defined cardiac waveforms for synthetic recordings

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// One Gaussian component of a heartbeat, positioned relative to the R-wave
#[derive(Debug, Clone, Copy)]
struct BeatComponent {
    /// Peak amplitude relative to the R-wave
    amplitude: f64,
    /// Center as a fraction of the beat period (R-wave at 0)
    center: f64,
    /// Width in seconds
    width: f64,
}

/// P, Q, R, S and T waves of a beat at rest (75 BPM proportions)
const PQRST: [BeatComponent; 5] = [
    BeatComponent { amplitude: 0.15, center: -0.25, width: 0.025 },
    BeatComponent { amplitude: -0.10, center: -0.0375, width: 0.010 },
    BeatComponent { amplitude: 1.00, center: 0.0, width: 0.012 },
    BeatComponent { amplitude: -0.20, center: 0.0375, width: 0.010 },
    BeatComponent { amplitude: 0.30, center: 0.3125, width: 0.040 },
];

/// Cardiac waveform shapes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CardiacWaveform {
    /// Flat line (lead off, silent channel)
    Flat { level: f64 },
    /// Pure sinusoid, one crest per beat
    Sinusoidal {
        frequency: f64,
        amplitude: f64,
    },
    /// PQRST complex repeated at a fixed heart rate; R-wave height is `amplitude`
    Pqrst {
        heart_rate_bpm: f64,
        amplitude: f64,
    },
}

impl CardiacWaveform {
    /// Waveform value at `time` seconds
    pub fn value_at_time(&self, time: f64) -> f64 {
        match self {
            CardiacWaveform::Flat { level } => *level,

            CardiacWaveform::Sinusoidal { frequency, amplitude } => {
                amplitude * (2.0 * PI * frequency * time).sin()
            }

            CardiacWaveform::Pqrst { heart_rate_bpm, amplitude } => {
                if *heart_rate_bpm <= 0.0 {
                    return 0.0;
                }
                let period = 60.0 / heart_rate_bpm;
                // R-waves sit mid-period: period/2, 3·period/2, ...
                let from_r = time.rem_euclid(period) - period / 2.0;

                amplitude * PQRST.iter()
                    .map(|c| {
                        let d = from_r - c.center * period;
                        c.amplitude * (-(d * d) / (2.0 * c.width * c.width)).exp()
                    })
                    .sum::<f64>()
            }
        }
    }

    /// Beats per minute this waveform represents, if periodic
    pub fn heart_rate_bpm(&self) -> Option<f64> {
        match self {
            CardiacWaveform::Flat { .. } => None,
            CardiacWaveform::Sinusoidal { frequency, .. } => Some(frequency * 60.0),
            CardiacWaveform::Pqrst { heart_rate_bpm, .. } => Some(*heart_rate_bpm),
        }
    }

    /// Get waveform description
    pub fn description(&self) -> &'static str {
        match self {
            CardiacWaveform::Flat { .. } => "Flat line",
            CardiacWaveform::Sinusoidal { .. } => "Sinusoidal placeholder",
            CardiacWaveform::Pqrst { .. } => "PQRST complex",
        }
    }

    /// Create common preset waveforms
    pub fn presets() -> Vec<(&'static str, CardiacWaveform)> {
        vec![
            ("Maternal Rest", CardiacWaveform::Pqrst { heart_rate_bpm: 75.0, amplitude: 1.0 }),
            ("Maternal Elevated", CardiacWaveform::Pqrst { heart_rate_bpm: 110.0, amplitude: 1.0 }),
            ("Fetal Normal", CardiacWaveform::Pqrst { heart_rate_bpm: 140.0, amplitude: 0.1 }),
            ("Maternal Placeholder", CardiacWaveform::Sinusoidal { frequency: 1.0, amplitude: 0.5 }),
            ("Fetal Placeholder", CardiacWaveform::Sinusoidal { frequency: 1.7, amplitude: 0.115 }),
            ("Lead Off", CardiacWaveform::Flat { level: 0.0 }),
        ]
    }
}
