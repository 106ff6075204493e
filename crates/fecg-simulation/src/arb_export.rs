//! CSV export for arbitrary waveform generators
//!
//! One row per sample: `point_number,value`, numbered from 1, no header.

use fecg_core::{ChannelView, FecgError, FecgResult, MultiChannelBuffer};
use std::io;
use std::path::Path;
use tracing::info;

fn csv_error(e: csv::Error) -> FecgError {
    FecgError::FormatError {
        reason: format!("CSV export failed: {}", e),
    }
}

/// Write a channel as waveform generator points
pub fn write_arb_csv<W: io::Write>(writer: W, channel: &ChannelView<'_>) -> FecgResult<usize> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);

    let mut points = 0;
    for (index, value) in channel.iter().enumerate() {
        wtr.serialize((index + 1, value)).map_err(csv_error)?;
        points += 1;
    }
    wtr.flush().map_err(|e| FecgError::FormatError {
        reason: format!("CSV export failed: {}", e),
    })?;

    Ok(points)
}

/// Export one channel of a recording to a CSV file
pub fn export_arb_csv(path: &Path, buffer: &MultiChannelBuffer, channel: usize) -> FecgResult<usize> {
    let view = buffer.channel(channel)?;
    let file = std::fs::File::create(path).map_err(|e| FecgError::FormatError {
        reason: format!("Cannot create {}: {}", path.display(), e),
    })?;

    let points = write_arb_csv(io::BufWriter::new(file), &view)?;
    info!(path = %path.display(), channel, points, source = %buffer.source(), "exported waveform points");
    Ok(points)
}
