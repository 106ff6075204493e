//! Sliding window display controller
//!
//! Each tracked signal owns a [`ScanCursor`] that walks a fixed-length window
//! through the recording, one second per refresh tick, and loops back to the
//! start before the window would run past the end. Every tick the visible
//! window is rescaled to its own min/max so the host renderer can draw it as
//! connected line segments.

use fecg_core::ChannelView;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::ops::Range;
use tracing::trace;

/// Guard added to the window span so flat windows do not divide by zero
pub const DEFAULT_EPSILON: f64 = 1e-6;

/// Scan position of one tracked buffer
///
/// The cursor carries the stride of the buffer it walks, so buffers with
/// different channel layouts never share offset arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanCursor {
    offset: usize,
    window_length: usize,
    advance: usize,
    channel_count: usize,
}

impl ScanCursor {
    pub fn new(window_length: usize, advance: usize, channel_count: usize) -> Self {
        ScanCursor {
            offset: 0,
            window_length,
            advance,
            channel_count: channel_count.max(1),
        }
    }

    /// Cursor showing `window_seconds` of data and advancing one second per tick
    pub fn for_display(scan_rate: u32, window_seconds: f64, channel_count: usize) -> Self {
        let window_length = (window_seconds * scan_rate as f64).round() as usize;
        Self::new(window_length, scan_rate as usize, channel_count)
    }

    /// First sample of the current window
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    /// Samples moved per tick
    pub fn advance_by(&self) -> usize {
        self.advance
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Sample range of the current window, clipped to `buffer_len`
    pub fn window_range(&self, buffer_len: usize) -> Range<usize> {
        let start = self.offset.min(buffer_len);
        let end = (self.offset + self.window_length).min(buffer_len);
        start..end
    }

    /// Move forward one tick, looping to the start when the next window would
    /// reach the end of the buffer
    pub fn advance(&mut self, buffer_len: usize) {
        self.offset += self.advance;
        if self.offset + self.window_length >= buffer_len {
            self.offset = 0;
        }
    }

    pub fn reset(&mut self) {
        self.offset = 0;
    }
}

/// Normalized window over one tracked signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowView {
    /// Track label
    pub track: String,
    /// First sample of the window within the channel
    pub offset: usize,
    /// Smallest sample in the window
    pub min: f64,
    /// Largest sample in the window
    pub max: f64,
    /// `[x_position, normalized_y]` per sample
    pub points: Vec<[f64; 2]>,
}

impl WindowView {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Flat window (silent or clipped signal); drawn on the baseline
    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    /// Consecutive point pairs to draw as line segments
    pub fn segments(&self) -> impl Iterator<Item = ([f64; 2], [f64; 2])> + '_ {
        self.points.windows(2).map(|pair| (pair[0], pair[1]))
    }
}

/// Maps window samples onto `[0, width) × [0, scale]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowNormalizer {
    /// Horizontal extent spanned by one window
    pub width: f64,
    /// Vertical extent of the max sample
    pub scale: f64,
    /// Guard added to the min/max span
    pub epsilon: f64,
    /// Headroom kept below the min and above the max
    #[serde(default)]
    pub margin: f64,
}

impl WindowNormalizer {
    pub fn new(width: f64, scale: f64, epsilon: f64) -> Self {
        WindowNormalizer { width, scale, epsilon, margin: 0.0 }
    }

    /// Keep `margin` of headroom around the window extremes
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// Rescale `view[range]` against its own min and max
    pub fn normalize(&self, track: &str, view: &ChannelView<'_>, range: Range<usize>) -> WindowView {
        let offset = range.start;
        let samples: Vec<f64> = view.range(range.start, range.end).collect();
        self.normalize_samples(track, offset, &samples)
    }

    /// Rescale a window that starts at sample `offset` of its track
    pub fn normalize_samples(&self, track: &str, offset: usize, samples: &[f64]) -> WindowView {
        if samples.is_empty() {
            return WindowView {
                track: track.to_string(),
                offset,
                min: 0.0,
                max: 0.0,
                points: Vec::new(),
            };
        }

        let (min, max) = samples
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if min == max {
            trace!(track = %track, offset, value = min, "flat display window");
        }

        let low = min - self.margin;
        let span = max - min + 2.0 * self.margin + self.epsilon;
        let points = samples
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let x = i as f64 * self.width / samples.len() as f64;
                let y = (value - low) / span * self.scale;
                [x, y]
            })
            .collect();

        WindowView {
            track: track.to_string(),
            offset,
            min,
            max,
            points,
        }
    }
}

impl Default for WindowNormalizer {
    fn default() -> Self {
        WindowNormalizer::new(1.0, 1.0, DEFAULT_EPSILON)
    }
}

/// Fixed-size history of the most recent samples of a live signal
///
/// Starts zero-filled; every push drops the oldest sample, so the newest
/// sample is always last.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingTrack {
    label: String,
    samples: VecDeque<f64>,
    capacity: usize,
    pushed: u64,
}

impl RollingTrack {
    pub fn new(label: &str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        RollingTrack {
            label: label.to_string(),
            samples: std::iter::repeat(0.0).take(capacity).collect(),
            capacity,
            pushed: 0,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples pushed since creation or the last reset
    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    /// Append the newest sample, dropping the oldest
    pub fn push(&mut self, value: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
        self.pushed += 1;
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    /// Oldest to newest
    pub fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    /// Normalized window over the whole history; `offset` is the stream
    /// index of its oldest sample
    pub fn window(&self, normalizer: &WindowNormalizer) -> WindowView {
        let samples: Vec<f64> = self.samples().collect();
        let offset = self.pushed.saturating_sub(self.capacity as u64) as usize;
        normalizer.normalize_samples(&self.label, offset, &samples)
    }

    /// Back to a zero-filled history
    pub fn reset(&mut self) {
        self.samples.clear();
        self.samples.extend(std::iter::repeat(0.0).take(self.capacity));
        self.pushed = 0;
    }
}

/// One tracked signal: its channel view and its own scan cursor
#[derive(Debug, Clone)]
pub struct DisplayTrack<'a> {
    label: String,
    view: ChannelView<'a>,
    cursor: ScanCursor,
}

impl<'a> DisplayTrack<'a> {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn cursor(&self) -> &ScanCursor {
        &self.cursor
    }

    pub fn view(&self) -> &ChannelView<'a> {
        &self.view
    }
}

/// All windows produced by one refresh tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayFrame {
    /// Tick counter, starting at 0
    pub tick: u64,
    pub windows: Vec<WindowView>,
}

impl DisplayFrame {
    /// Window of the track with `label`
    pub fn window(&self, label: &str) -> Option<&WindowView> {
        self.windows.iter().find(|w| w.track == label)
    }
}

/// Sliding window controller over one or more signals
///
/// Ticking needs `&mut self`: the read-advance-wrap sequence must have a
/// single writer. Hosts driving it from several threads wrap it in a mutex
/// owned by one tick driver.
#[derive(Debug, Clone)]
pub struct DisplayController<'a> {
    tracks: Vec<DisplayTrack<'a>>,
    normalizer: WindowNormalizer,
    ticks: u64,
}

impl<'a> DisplayController<'a> {
    pub fn new(normalizer: WindowNormalizer) -> Self {
        DisplayController {
            tracks: Vec::new(),
            normalizer,
            ticks: 0,
        }
    }

    /// Track a signal with a cursor sized for its own buffer
    pub fn add_track(&mut self, label: &str, view: ChannelView<'a>, window_length: usize, advance: usize) -> &mut Self {
        let cursor = ScanCursor::new(window_length, advance, view.channel_count());
        self.tracks.push(DisplayTrack {
            label: label.to_string(),
            view,
            cursor,
        });
        self
    }

    /// Track a signal showing `window_seconds` and advancing one second per tick
    pub fn add_timed_track(&mut self, label: &str, view: ChannelView<'a>, scan_rate: u32, window_seconds: f64) -> &mut Self {
        let cursor = ScanCursor::for_display(scan_rate, window_seconds, view.channel_count());
        self.add_track(label, view, cursor.window_length(), cursor.advance_by())
    }

    pub fn tracks(&self) -> &[DisplayTrack<'a>] {
        &self.tracks
    }

    pub fn track(&self, label: &str) -> Option<&DisplayTrack<'a>> {
        self.tracks.iter().find(|t| t.label == label)
    }

    /// Ticks performed so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn normalizer(&self) -> &WindowNormalizer {
        &self.normalizer
    }

    /// Windows at the current cursor positions, without advancing
    pub fn current_frame(&self) -> DisplayFrame {
        let windows = self.tracks
            .iter()
            .map(|track| {
                let range = track.cursor.window_range(track.view.len());
                self.normalizer.normalize(&track.label, &track.view, range)
            })
            .collect();

        DisplayFrame {
            tick: self.ticks,
            windows,
        }
    }

    /// Produce this tick's windows, then advance every cursor
    pub fn tick(&mut self) -> DisplayFrame {
        let frame = self.current_frame();

        for track in &mut self.tracks {
            track.cursor.advance(track.view.len());
        }
        self.ticks += 1;

        trace!(tick = frame.tick, tracks = frame.windows.len(), "display tick");
        frame
    }

    /// Rewind every track to the start of its buffer
    pub fn reset(&mut self) {
        for track in &mut self.tracks {
            track.cursor.reset();
        }
        self.ticks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_wraps_to_zero() {
        let len = 10_000;
        let mut cursor = ScanCursor::new(3000, 1000, 1);

        let mut offsets = vec![cursor.offset()];
        for _ in 0..8 {
            cursor.advance(len);
            offsets.push(cursor.offset());
        }

        assert_eq!(offsets, vec![0, 1000, 2000, 3000, 4000, 5000, 6000, 0, 1000]);
    }

    #[test]
    fn test_wrap_never_reaches_buffer_length() {
        let len = 5_500;
        let mut cursor = ScanCursor::for_display(1000, 2.0, 5);
        for _ in 0..50 {
            cursor.advance(len);
            assert!(cursor.offset() + cursor.window_length() < len);
        }
    }

    #[test]
    fn test_window_clipped_when_buffer_shorter_than_window() {
        let data: Vec<f64> = (0..500).map(|i| i as f64).collect();
        let mut controller = DisplayController::new(WindowNormalizer::default());
        controller.add_track("short", ChannelView::single(&data), 1000, 100);

        let frame = controller.tick();
        let window = frame.window("short").unwrap();
        assert_eq!(window.offset, 0);
        assert_eq!(window.len(), 500);
        assert_eq!(controller.track("short").unwrap().cursor().offset(), 0);
    }

    #[test]
    fn test_flat_window_is_on_baseline() {
        let data = vec![0.42; 2000];
        let mut controller = DisplayController::new(WindowNormalizer::new(1280.0, 120.0, DEFAULT_EPSILON));
        controller.add_timed_track("flat", ChannelView::single(&data), 100, 5.0);

        let frame = controller.tick();
        let window = frame.window("flat").unwrap();
        assert!(window.is_degenerate());
        assert_eq!(window.len(), 500);
        assert!(window.points.iter().all(|p| p[1] == 0.0 && p[1].is_finite()));
    }

    #[test]
    fn test_window_normalization() {
        let data = [2.0, 4.0, 6.0, 4.0];
        let normalizer = WindowNormalizer::new(4.0, 10.0, 0.0);
        let window = normalizer.normalize("m", &ChannelView::single(&data), 0..4);

        assert_eq!(window.min, 2.0);
        assert_eq!(window.max, 6.0);
        assert_eq!(window.points, vec![[0.0, 0.0], [1.0, 5.0], [2.0, 10.0], [3.0, 5.0]]);
        assert_eq!(window.segments().count(), 3);
    }

    #[test]
    fn test_window_extremes_are_local() {
        let mut data: Vec<f64> = vec![0.0; 3000];
        data[100] = 50.0; // outside the second window
        data[1500] = 2.0;
        data[1600] = -1.0;

        let mut controller = DisplayController::new(WindowNormalizer::default());
        controller.add_track("m", ChannelView::single(&data), 1000, 1000);

        let first = controller.tick();
        assert_eq!(first.window("m").unwrap().max, 50.0);

        let second = controller.tick();
        let window = second.window("m").unwrap();
        assert_eq!(window.offset, 1000);
        assert_eq!(window.max, 2.0);
        assert_eq!(window.min, -1.0);
    }

    #[test]
    fn test_tracks_keep_their_own_stride() {
        // maternal recording with 5 interleaved channels, fetal estimate with 1
        let samples = 4000;
        let mut maternal = Vec::with_capacity(samples * 5);
        for i in 0..samples {
            maternal.extend_from_slice(&[-9.0, i as f64, -9.0, -9.0, -9.0]);
        }
        let fetal: Vec<f64> = (0..samples).map(|i| -(i as f64)).collect();

        let mut controller = DisplayController::new(WindowNormalizer::default());
        controller
            .add_timed_track("maternal", ChannelView::new(&maternal, 5, 1).unwrap(), 1000, 2.0)
            .add_timed_track("fetal", ChannelView::single(&fetal), 1000, 2.0);

        controller.tick();
        let frame = controller.tick();

        let maternal_window = frame.window("maternal").unwrap();
        let fetal_window = frame.window("fetal").unwrap();
        assert_eq!(maternal_window.offset, 1000);
        assert_eq!(maternal_window.min, 1000.0);
        assert_eq!(maternal_window.max, 2999.0);
        assert_eq!(fetal_window.min, -2999.0);
        assert_eq!(fetal_window.max, -1000.0);

        let maternal_cursor = controller.track("maternal").unwrap().cursor();
        assert_eq!(maternal_cursor.channel_count(), 5);
        assert_eq!(controller.track("fetal").unwrap().cursor().channel_count(), 1);
    }

    #[test]
    fn test_reset_rewinds_tracks() {
        let data = vec![0.0; 10_000];
        let mut controller = DisplayController::new(WindowNormalizer::default());
        controller.add_track("m", ChannelView::single(&data), 2000, 1000);

        controller.tick();
        controller.tick();
        assert_eq!(controller.ticks(), 2);
        assert_eq!(controller.current_frame().windows[0].offset, 2000);

        controller.reset();
        assert_eq!(controller.ticks(), 0);
        assert_eq!(controller.current_frame().windows[0].offset, 0);
    }

    #[test]
    fn test_rolling_track_keeps_newest_last() {
        let mut track = RollingTrack::new("fetal", 4);
        assert_eq!(track.samples().collect::<Vec<_>>(), vec![0.0; 4]);

        for value in 1..=6 {
            track.push(value as f64);
        }
        assert_eq!(track.samples().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0, 6.0]);
        assert_eq!(track.latest(), Some(6.0));
        assert_eq!(track.pushed(), 6);

        let window = track.window(&WindowNormalizer::new(4.0, 1.0, 0.0));
        assert_eq!(window.offset, 2);
        assert_eq!(window.len(), 4);
        assert_eq!(window.points[3], [3.0, 1.0]);

        track.reset();
        assert_eq!(track.samples().collect::<Vec<_>>(), vec![0.0; 4]);
        assert_eq!(track.pushed(), 0);
    }

    #[test]
    fn test_partially_filled_track_shows_zero_history() {
        let mut track = RollingTrack::new("maternal", 3);
        track.push(2.0);

        let window = track.window(&WindowNormalizer::new(3.0, 1.0, 0.0));
        assert_eq!(window.offset, 0);
        assert_eq!(window.min, 0.0);
        assert_eq!(window.max, 2.0);
        assert_eq!(window.points, vec![[0.0, 0.0], [1.0, 0.0], [2.0, 1.0]]);
    }

    #[test]
    fn test_margin_adds_headroom() {
        let normalizer = WindowNormalizer::new(2.0, 1.0, 0.0).with_margin(0.05);
        let window = normalizer.normalize_samples("fetal", 7, &[0.0, 0.9]);

        assert_eq!(window.offset, 7);
        assert_eq!(window.min, 0.0);
        assert_eq!(window.max, 0.9);
        assert!((window.points[0][1] - 0.05).abs() < 1e-12);
        assert!((window.points[1][1] - 0.95).abs() < 1e-12);
    }
}
