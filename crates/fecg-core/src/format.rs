//! Raw `.dat` recording format
//!
//! Recordings are flat sequences of little-endian `f64`, sample-major and
//! channel-minor. The files carry no header: channel count and duration come
//! from the acquisition setup and are supplied by the caller.

use crate::buffer::MultiChannelBuffer;
use crate::error::FecgResult;
use crate::format_error;
use crate::recording::RecordingMetadata;

/// Bytes per stored value
pub const BYTES_PER_VALUE: usize = std::mem::size_of::<f64>();

/// Decode exactly `metadata.expected_samples()` values from the front of `bytes`
///
/// Trailing bytes beyond the declared length are ignored, the same way the
/// acquisition tools read a fixed duration out of longer captures. A source
/// shorter than declared is reported as a format error.
pub fn decode_recording(bytes: &[u8], metadata: RecordingMetadata) -> FecgResult<MultiChannelBuffer> {
    let expected = metadata.expected_samples();
    let required_bytes = expected * BYTES_PER_VALUE;

    if bytes.len() < required_bytes {
        return Err(format_error!(
            "recording truncated: need {} bytes for {} samples x {} channels, found {}",
            required_bytes,
            metadata.samples_per_channel(),
            metadata.channel_count,
            bytes.len()
        ));
    }

    let data = decode_values(&bytes[..required_bytes]);
    MultiChannelBuffer::new(data, metadata)
}

/// Decode every complete little-endian `f64` in `bytes`
pub fn decode_values(bytes: &[u8]) -> Vec<f64> {
    bytes
        .chunks_exact(BYTES_PER_VALUE)
        .map(|chunk| {
            let mut raw = [0u8; BYTES_PER_VALUE];
            raw.copy_from_slice(chunk);
            f64::from_le_bytes(raw)
        })
        .collect()
}

/// Encode a recording back into the `.dat` layout
pub fn encode_recording(buffer: &MultiChannelBuffer) -> Vec<u8> {
    encode_values(buffer.data())
}

/// Encode values as consecutive little-endian `f64`
pub fn encode_values(values: &[f64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * BYTES_PER_VALUE);
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}
