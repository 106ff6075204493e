//! Sample containers: interleaved recordings, strided channel views and the
//! single-channel fetal estimate

use crate::error::{FecgError, FecgResult};
use crate::recording::{RecordingMetadata, SignalSource};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Multi-channel recording stored interleaved (channel varies fastest)
///
/// Buffers are loaded once and never mutated afterwards; derived recordings
/// are built as new buffers.
#[derive(Debug, Clone)]
pub struct MultiChannelBuffer {
    id: Uuid,
    data: Vec<f64>,
    metadata: RecordingMetadata,
}

impl MultiChannelBuffer {
    /// Create new buffer from interleaved data and its declared metadata
    pub fn new(data: Vec<f64>, metadata: RecordingMetadata) -> FecgResult<Self> {
        let expected_samples = metadata.expected_samples();
        if data.len() != expected_samples {
            return Err(FecgError::InvalidRecordingConfig {
                reason: format!(
                    "Data length {} doesn't match expected {} samples",
                    data.len(),
                    expected_samples
                ),
            });
        }

        Ok(MultiChannelBuffer {
            id: Uuid::new_v4(),
            data,
            metadata,
        })
    }

    /// Create buffer from interleaved data, deriving the duration from its length
    pub fn from_interleaved(
        data: Vec<f64>,
        source: SignalSource,
        scan_rate: u32,
        channel_count: usize,
    ) -> FecgResult<Self> {
        RecordingMetadata::validate_channel_count(channel_count)?;
        if data.len() % channel_count != 0 {
            return Err(FecgError::InvalidRecordingConfig {
                reason: format!(
                    "Data length {} is not a multiple of {} channels",
                    data.len(),
                    channel_count
                ),
            });
        }

        let samples = data.len() / channel_count;
        let metadata = RecordingMetadata::new(
            source,
            scan_rate,
            channel_count,
            samples as f64 / scan_rate as f64,
        )?;

        Self::new(data, metadata)
    }

    /// Unique identifier of this recording
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Raw interleaved samples
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Recording metadata
    pub fn metadata(&self) -> &RecordingMetadata {
        &self.metadata
    }

    /// Get total number of values across all channels
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get number of samples per channel
    pub fn samples_per_channel(&self) -> usize {
        self.data.len() / self.metadata.channel_count
    }

    /// Get channel count
    pub fn channel_count(&self) -> usize {
        self.metadata.channel_count
    }

    /// Get scan rate
    pub fn scan_rate(&self) -> u32 {
        self.metadata.scan_rate
    }

    /// Get recording source
    pub fn source(&self) -> SignalSource {
        self.metadata.source
    }

    /// Get recording duration in seconds
    pub fn duration(&self) -> f64 {
        self.metadata.duration_seconds
    }

    /// Strided read-only view of one channel
    pub fn channel(&self, channel_offset: usize) -> FecgResult<ChannelView<'_>> {
        ChannelView::new(&self.data, self.metadata.channel_count, channel_offset)
    }

    /// Copy one channel out into its own vector
    pub fn channel_data(&self, channel_offset: usize) -> FecgResult<Vec<f64>> {
        Ok(self.channel(channel_offset)?.to_vec())
    }

    /// Calculate basic statistics for a channel
    pub fn channel_stats(&self, channel_offset: usize) -> FecgResult<ChannelStats> {
        Ok(ChannelStats::from_view(&self.channel(channel_offset)?))
    }

    /// New buffer with one channel replaced, all other channels copied as-is
    pub fn with_channel(
        &self,
        channel_offset: usize,
        values: &[f64],
        source: SignalSource,
    ) -> FecgResult<MultiChannelBuffer> {
        let channel_count = self.metadata.channel_count;
        if channel_offset >= channel_count {
            return Err(FecgError::ChannelOutOfRange {
                channel: channel_offset,
                channel_count,
            });
        }

        let samples = self.samples_per_channel();
        if values.len() != samples {
            return Err(FecgError::InvalidRecordingConfig {
                reason: format!(
                    "Replacement channel has {} samples, recording has {}",
                    values.len(),
                    samples
                ),
            });
        }

        let mut data = self.data.clone();
        for (frame, &value) in data.chunks_exact_mut(channel_count).zip(values) {
            frame[channel_offset] = value;
        }

        MultiChannelBuffer::new(data, self.metadata.with_source(source))
    }
}

/// Read-only strided projection of one channel out of an interleaved buffer
///
/// Sample `i` is read from `i * channel_count + channel_offset`. Every view
/// carries the stride of the buffer it was taken from.
#[derive(Debug, Clone, Copy)]
pub struct ChannelView<'a> {
    data: &'a [f64],
    channel_count: usize,
    channel_offset: usize,
    len: usize,
}

impl<'a> ChannelView<'a> {
    /// Create a strided view; `channel_offset` must address an existing channel
    pub fn new(data: &'a [f64], channel_count: usize, channel_offset: usize) -> FecgResult<Self> {
        if channel_offset >= channel_count {
            return Err(FecgError::ChannelOutOfRange {
                channel: channel_offset,
                channel_count,
            });
        }

        Ok(ChannelView {
            data,
            channel_count,
            channel_offset,
            len: data.len() / channel_count,
        })
    }

    /// View over an already single-channel slice
    pub fn single(data: &'a [f64]) -> Self {
        ChannelView {
            data,
            channel_count: 1,
            channel_offset: 0,
            len: data.len(),
        }
    }

    /// Number of samples in this channel
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stride of the underlying buffer
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn channel_offset(&self) -> usize {
        self.channel_offset
    }

    /// Sample at `index`, if within the channel
    pub fn get(&self, index: usize) -> Option<f64> {
        if index < self.len {
            Some(self.data[index * self.channel_count + self.channel_offset])
        } else {
            None
        }
    }

    /// Sample at `index`
    ///
    /// Panics when `index >= len()`, like slice indexing.
    #[inline]
    pub fn sample(&self, index: usize) -> f64 {
        assert!(index < self.len, "sample index {} out of range for channel of {}", index, self.len);
        self.data[index * self.channel_count + self.channel_offset]
    }

    /// Iterate samples of this channel in order
    pub fn iter(&self) -> impl Iterator<Item = f64> + 'a {
        self.data
            .iter()
            .skip(self.channel_offset)
            .step_by(self.channel_count)
            .take(self.len)
            .copied()
    }

    /// Iterate samples in `[start, end)`, clipped to the channel length
    pub fn range(&self, start: usize, end: usize) -> impl Iterator<Item = f64> + 'a {
        let end = end.min(self.len);
        let start = start.min(end);
        self.iter().skip(start).take(end - start)
    }

    /// Copy samples into a vector
    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }
}

/// Single-channel fetal estimate
///
/// Produced once by the separator and immutable thereafter.
#[derive(Debug, Clone)]
pub struct DerivedSignal {
    samples: Vec<f64>,
    metadata: RecordingMetadata,
}

impl DerivedSignal {
    /// Wrap a completed fetal estimate
    pub fn from_samples(samples: Vec<f64>, scan_rate: u32) -> Self {
        let duration_seconds = if scan_rate == 0 {
            0.0
        } else {
            samples.len() as f64 / scan_rate as f64
        };

        DerivedSignal {
            samples,
            metadata: RecordingMetadata {
                source: SignalSource::Fetal,
                scan_rate,
                channel_count: 1,
                duration_seconds,
            },
        }
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn scan_rate(&self) -> u32 {
        self.metadata.scan_rate
    }

    pub fn metadata(&self) -> &RecordingMetadata {
        &self.metadata
    }

    /// Stride-1 view for the estimator and display controller
    pub fn view(&self) -> ChannelView<'_> {
        ChannelView::single(&self.samples)
    }

    /// Basic statistics of the estimate
    pub fn stats(&self) -> ChannelStats {
        ChannelStats::calculate(&self.samples)
    }
}

/// Basic statistics for a signal channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub mean: f64,
    pub rms: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub peak_to_peak: f64,
}

impl ChannelStats {
    pub fn calculate(data: &[f64]) -> Self {
        Self::from_view(&ChannelView::single(data))
    }

    pub fn from_view(view: &ChannelView<'_>) -> Self {
        if view.is_empty() {
            return Self {
                mean: 0.0,
                rms: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
                peak_to_peak: 0.0,
            };
        }

        let n = view.len() as f64;
        let mean = view.iter().sum::<f64>() / n;
        let rms = (view.iter().map(|x| x * x).sum::<f64>() / n).sqrt();

        let variance = view.iter()
            .map(|x| (x - mean).powi(2))
            .sum::<f64>() / n;
        let std_dev = variance.sqrt();

        let min = view.iter().fold(f64::INFINITY, f64::min);
        let max = view.iter().fold(f64::NEG_INFINITY, f64::max);

        Self {
            mean,
            rms,
            std_dev,
            min,
            max,
            peak_to_peak: max - min,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interleaved(samples: usize, channels: usize) -> Vec<f64> {
        (0..samples * channels).map(|i| i as f64).collect()
    }

    #[test]
    fn test_buffer_creation() {
        let metadata = RecordingMetadata::new(SignalSource::Maternal, 1000, 1, 1.0).unwrap();
        let buffer = MultiChannelBuffer::new(vec![0.0; 1000], metadata).unwrap();

        assert_eq!(buffer.len(), 1000);
        assert_eq!(buffer.samples_per_channel(), 1000);
        assert_eq!(buffer.channel_count(), 1);
        assert_eq!(buffer.source(), SignalSource::Maternal);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let metadata = RecordingMetadata::new(SignalSource::Maternal, 1000, 2, 1.0).unwrap();
        assert!(MultiChannelBuffer::new(vec![0.0; 1999], metadata).is_err());
    }

    #[test]
    fn test_multichannel_view() {
        // Interleaved: [ch0_s0, ch1_s0, ch2_s0, ch0_s1, ...]
        let buffer = MultiChannelBuffer::from_interleaved(
            interleaved(1000, 3),
            SignalSource::Combined,
            1000,
            3,
        )
        .unwrap();

        assert_eq!(buffer.samples_per_channel(), 1000);
        assert_eq!(buffer.duration(), 1.0);

        let ch1 = buffer.channel(1).unwrap();
        assert_eq!(ch1.len(), 1000);
        assert_eq!(ch1.channel_count(), 3);
        assert_eq!(ch1.sample(0), 1.0);
        assert_eq!(ch1.sample(1), 4.0);
        assert_eq!(ch1.get(999), Some(2998.0));
        assert_eq!(ch1.get(1000), None);

        let collected: Vec<f64> = ch1.range(2, 4).collect();
        assert_eq!(collected, vec![7.0, 10.0]);
    }

    #[test]
    fn test_channel_offset_must_be_in_range() {
        let buffer = MultiChannelBuffer::from_interleaved(
            interleaved(200, 2),
            SignalSource::Combined,
            200,
            2,
        )
        .unwrap();

        assert_eq!(
            buffer.channel(2).unwrap_err(),
            FecgError::ChannelOutOfRange { channel: 2, channel_count: 2 }
        );
    }

    #[test]
    fn test_range_is_clipped() {
        let data = [1.0, 2.0, 3.0];
        let view = ChannelView::single(&data);
        assert_eq!(view.range(1, 10).collect::<Vec<_>>(), vec![2.0, 3.0]);
        assert_eq!(view.range(5, 10).count(), 0);
    }

    #[test]
    fn test_with_channel_replaces_only_target() {
        let buffer = MultiChannelBuffer::from_interleaved(
            interleaved(100, 2),
            SignalSource::Maternal,
            100,
            2,
        )
        .unwrap();

        let replacement = vec![-1.0; 100];
        let combined = buffer.with_channel(1, &replacement, SignalSource::Combined).unwrap();

        assert_eq!(combined.source(), SignalSource::Combined);
        assert_eq!(combined.channel_data(1).unwrap(), replacement);
        assert_eq!(combined.channel_data(0).unwrap(), buffer.channel_data(0).unwrap());
        assert_ne!(combined.id(), buffer.id());

        assert!(buffer.with_channel(1, &[0.0; 3], SignalSource::Combined).is_err());
    }

    #[test]
    fn test_derived_signal() {
        let derived = DerivedSignal::from_samples(vec![0.5; 2000], 1000);
        assert_eq!(derived.metadata().source, SignalSource::Fetal);
        assert_eq!(derived.metadata().duration_seconds, 2.0);
        assert_eq!(derived.view().len(), 2000);
        assert_eq!(derived.view().channel_count(), 1);
    }

    #[test]
    fn test_channel_stats() {
        let stats = ChannelStats::calculate(&[1.0, -1.0, 1.0, -1.0]);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.rms, 1.0);
        assert_eq!(stats.min, -1.0);
        assert_eq!(stats.max, 1.0);
        assert_eq!(stats.peak_to_peak, 2.0);

        let empty = ChannelStats::calculate(&[]);
        assert_eq!(empty.max, 0.0);
    }
}
