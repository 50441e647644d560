//! Track assembly from decoded GPS samples
//!
//! Sanitizes coordinates, converts samples to track points, and applies
//! the generation precedence rule: GPS9 supersedes GPS5 for the whole
//! buffer, never mixed.

use log::debug;

use crate::error::{GpmfError, Result};
use crate::parser::block::StreamBlock;
use crate::parser::gps::{classify, decode_gps5, decode_gps9, StreamKind};
use crate::types::{GpsSample, Track, TrackPoint, TrackSegment};

/// Convert one sample into a track point, zeroing out-of-range coordinates
///
/// Out-of-range latitude/longitude is a recovered condition: the value is
/// replaced with 0.0 and a diagnostic recorded, but the sample is kept so
/// sample-index continuity survives for downstream consumers.
pub fn point_from_sample(
    sample: &GpsSample,
    index: usize,
    warnings: &mut Vec<String>,
) -> TrackPoint {
    let mut latitude = sample.latitude;
    if !(-90.0..=90.0).contains(&latitude) {
        let msg = format!(
            "invalid latitude {} at sample {} in stream {}, resetting to 0.0",
            latitude, index, sample.stream_name
        );
        debug!("{}", msg);
        warnings.push(msg);
        latitude = 0.0;
    }

    let mut longitude = sample.longitude;
    if !(-180.0..=180.0).contains(&longitude) {
        let msg = format!(
            "invalid longitude {} at sample {} in stream {}, resetting to 0.0",
            longitude, index, sample.stream_name
        );
        debug!("{}", msg);
        warnings.push(msg);
        longitude = 0.0;
    }

    TrackPoint {
        time: Some(sample.time),
        latitude,
        longitude,
        elevation: sample.elevation,
        dop: sample.dop,
        fix: sample.fix,
        speed_2d: sample.speed_2d,
        speed_3d: sample.speed_3d,
        name: sample.stream_name.clone(),
        unit: sample.unit.clone(),
        accuracy: sample.accuracy.clone(),
    }
}

/// Build a segment from one block's samples
pub fn build_segment(samples: &[GpsSample], warnings: &mut Vec<String>) -> TrackSegment {
    let mut segment = TrackSegment::default();
    for (index, sample) in samples.iter().enumerate() {
        segment.points.push(point_from_sample(sample, index, warnings));
    }
    segment
}

/// Assemble the logical track from all stream blocks of one buffer
///
/// Per-block point sequences concatenate into a single merged segment in
/// input order. Fails with `NoPositionalStreamFound` when no block carries
/// either GPS generation.
pub fn build_track(blocks: &[StreamBlock], warnings: &mut Vec<String>) -> Result<Track> {
    let kinds: Vec<StreamKind> = blocks.iter().map(classify).collect();
    let has_gps9 = kinds.iter().any(|k| *k == StreamKind::Gps9);
    let has_gps5 = kinds.iter().any(|k| *k == StreamKind::Gps5);
    if !has_gps9 && !has_gps5 {
        return Err(GpmfError::NoPositionalStreamFound);
    }

    let mut merged = TrackSegment::default();
    for (block, kind) in blocks.iter().zip(&kinds) {
        let samples = match kind {
            StreamKind::Gps9 => decode_gps9(block)?,
            StreamKind::Gps5 if !has_gps9 => decode_gps5(block)?,
            StreamKind::Gps5 => {
                let msg = format!(
                    "ignoring GPS5 stream {}: GPS9 data supersedes it",
                    block.path
                );
                debug!("{}", msg);
                warnings.push(msg);
                continue;
            }
            StreamKind::Unknown => {
                let msg = format!(
                    "skipping non-positional stream {} (keys: {})",
                    block.path,
                    block.key_names().join(", ")
                );
                debug!("{}", msg);
                warnings.push(msg);
                continue;
            }
        };
        merged.extend(build_segment(&samples, warnings));
    }

    let mut track = Track::default();
    track.push_segment(merged);
    Ok(track)
}
