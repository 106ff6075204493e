//! Live base-unit monitoring
//!
//! Readings arrive one at a time. Each one is separated on the spot and
//! appended to a rolling maternal track and a rolling fetal track; a frame
//! rescales both histories with a little headroom around their extremes.

use crate::config::{DisplaySettings, LiveSettings};
use crate::display::{DisplayFrame, RollingTrack, WindowNormalizer};
use crate::pipeline::{FETAL_TRACK, MATERNAL_TRACK};
use crate::separator::{LiveSample, StreamingSeparator};
use fecg_core::FecgResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Producer of base-unit readings
pub trait SampleSource: Send {
    /// Next reading, or `None` once the source is exhausted
    fn next_sample(&mut self) -> FecgResult<Option<LiveSample>>;
}

/// Display state after the latest reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveFrame {
    pub frame: DisplayFrame,
    /// Skin temperature of the latest reading
    pub temperature: Option<f64>,
    /// Readings ingested so far
    pub samples: u64,
}

/// Rolling maternal and fetal tracks fed by a [`StreamingSeparator`]
#[derive(Debug, Clone)]
pub struct LiveMonitor {
    separator: StreamingSeparator,
    maternal: RollingTrack,
    fetal: RollingTrack,
    normalizer: WindowNormalizer,
    temperature: Option<f64>,
    frames: u64,
}

impl LiveMonitor {
    pub fn new(live: &LiveSettings, display: &DisplaySettings) -> Self {
        LiveMonitor {
            separator: StreamingSeparator::new(),
            maternal: RollingTrack::new(MATERNAL_TRACK, live.buffer_size),
            fetal: RollingTrack::new(FETAL_TRACK, live.buffer_size),
            normalizer: display.normalizer().with_margin(live.margin),
            temperature: None,
            frames: 0,
        }
    }

    /// Separate one reading and append it to both tracks; returns the fetal value
    pub fn ingest(&mut self, sample: LiveSample) -> f64 {
        let fetal = self.separator.separate(&sample);
        self.maternal.push(sample.maternal);
        self.fetal.push(fetal);
        self.temperature = Some(sample.temperature);

        trace!(maternal = sample.maternal, fetal, temperature = sample.temperature, "live sample");
        fetal
    }

    /// Both rolling windows at their current contents
    pub fn frame(&mut self) -> LiveFrame {
        let frame = DisplayFrame {
            tick: self.frames,
            windows: vec![self.maternal.window(&self.normalizer), self.fetal.window(&self.normalizer)],
        };
        self.frames += 1;

        LiveFrame {
            frame,
            temperature: self.temperature,
            samples: self.separator.samples(),
        }
    }

    pub fn maternal(&self) -> &RollingTrack {
        &self.maternal
    }

    pub fn fetal(&self) -> &RollingTrack {
        &self.fetal
    }

    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    /// Clear both histories
    pub fn reset(&mut self) {
        self.separator.reset();
        self.maternal.reset();
        self.fetal.reset();
        self.temperature = None;
        self.frames = 0;
        debug!("live tracks cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;

    fn sample(maternal: f64, combined: f64) -> LiveSample {
        LiveSample {
            maternal,
            combined,
            temperature: 36.6,
        }
    }

    fn live_monitor(buffer_size: usize) -> LiveMonitor {
        let config = MonitorConfig::live_base_unit();
        let live = LiveSettings {
            buffer_size,
            ..config.live
        };
        LiveMonitor::new(&live, &config.display)
    }

    #[test]
    fn test_incremental_subtraction() {
        let mut monitor = live_monitor(3);
        assert_eq!(monitor.ingest(sample(1.0, 1.25)), 0.25);
        assert_eq!(monitor.ingest(sample(-0.5, -0.25)), 0.25);
        assert_eq!(monitor.ingest(sample(2.0, 1.0)), -1.0);
        monitor.ingest(sample(3.0, 3.5));

        assert_eq!(monitor.maternal().samples().collect::<Vec<_>>(), vec![-0.5, 2.0, 3.0]);
        assert_eq!(monitor.fetal().samples().collect::<Vec<_>>(), vec![0.25, -1.0, 0.5]);
        assert_eq!(monitor.temperature(), Some(36.6));
    }

    #[test]
    fn test_frames_carry_both_tracks() {
        let mut monitor = live_monitor(200);
        for i in 0..250 {
            let t = i as f64 * 0.05;
            monitor.ingest(sample(t.sin(), t.sin() + 0.1 * (2.0 * t).cos()));
        }

        let first = monitor.frame();
        assert_eq!(first.frame.tick, 0);
        assert_eq!(first.samples, 250);
        assert_eq!(first.temperature, Some(36.6));

        let fetal = first.frame.window(FETAL_TRACK).unwrap();
        assert_eq!(fetal.len(), 200);
        assert_eq!(fetal.offset, 50);
        // Headroom keeps every point strictly inside the window
        assert!(fetal.points.iter().all(|p| p[1] > 0.0 && p[1] < 120.0));
        assert!(first.frame.window(MATERNAL_TRACK).is_some());

        assert_eq!(monitor.frame().frame.tick, 1);
        monitor.reset();
        let cleared = monitor.frame();
        assert_eq!(cleared.frame.tick, 0);
        assert_eq!(cleared.samples, 0);
        assert_eq!(cleared.temperature, None);
        assert!(cleared.frame.window(FETAL_TRACK).unwrap().is_degenerate());
    }
}
