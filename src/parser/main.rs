//! Top-level GPMF decode entry points

use std::path::Path;

use log::debug;

use crate::error::Result;
use crate::parser::block::{assemble_blocks, StreamBlock};
use crate::parser::stream::KlvTokenizer;
use crate::parser::track::build_track;
use crate::types::{DeviceInfo, FourCC, Track};

/// Outcome of one decode pass over a raw GPMF buffer
///
/// Decode diagnostics are returned alongside the track rather than being
/// pushed into ambient logging; callers decide how to surface them.
#[derive(Debug)]
pub struct GpmfDecode {
    pub track: Track,
    pub device: DeviceInfo,
    pub warnings: Vec<String>,
}

/// Decode a raw GPMF elementary stream into a geolocated track
///
/// Pure and synchronous: one buffer in, one result out, no shared state.
pub fn decode_gpmf(data: &[u8]) -> Result<GpmfDecode> {
    debug!("decoding GPMF buffer of {} bytes", data.len());

    let blocks = assemble_blocks(KlvTokenizer::with_default_unfold(data))?;
    debug!("assembled {} stream blocks", blocks.len());

    let device = device_info(&blocks);
    let mut warnings = Vec::new();
    let track = build_track(&blocks, &mut warnings)?;

    debug!(
        "decoded {} track points ({} diagnostics)",
        track.point_count(),
        warnings.len()
    );
    Ok(GpmfDecode {
        track,
        device,
        warnings,
    })
}

/// Read a file containing a raw GPMF stream and decode it
pub fn decode_gpmf_file(path: &Path) -> Result<GpmfDecode> {
    let data = std::fs::read(path)?;
    decode_gpmf(&data)
}

/// Recording-device identity from the first block carrying a DVNM key
pub fn device_info(blocks: &[StreamBlock]) -> DeviceInfo {
    for block in blocks {
        if let Some(dvnm) = block.get(FourCC::DVNM) {
            let id = block.get(FourCC::DVID).map(|item| {
                item.logical()
                    .iter()
                    .fold(0u64, |acc, &b| (acc << 8) | b as u64)
            });
            return DeviceInfo {
                id,
                name: Some(dvnm.ascii_full()),
            };
        }
    }
    DeviceInfo::default()
}
