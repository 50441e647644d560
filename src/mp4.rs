//! GPMF stream extraction from MP4/MOV containers
//!
//! Demuxing is delegated to external `ffprobe`/`ffmpeg` processes: the
//! probe locates the data track whose codec tag marks it as GPMF, and the
//! extractor copies that track's payload bytes verbatim.

use std::path::Path;
use std::process::Command;

use log::debug;
use serde::Deserialize;

use crate::error::{GpmfError, Result};

/// Codec tag identifying a GPMF metadata track
const GPMF_CODEC_TAG: &str = "gpmd";

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    index: usize,
    #[serde(default)]
    codec_tag_string: String,
}

/// Locate the GPMF metadata track in a video file
///
/// Returns the stream index, or `None` when the file carries no GPMF track.
pub fn find_gpmf_stream(video: &Path) -> Result<Option<usize>> {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_streams"])
        .arg(video)
        .output()?;
    if !output.status.success() {
        return Err(GpmfError::Extract(format!(
            "ffprobe failed for {}: {}",
            video.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let probe: ProbeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| GpmfError::Extract(format!("unreadable ffprobe output: {}", e)))?;

    let index = probe
        .streams
        .iter()
        .find(|s| s.codec_tag_string == GPMF_CODEC_TAG)
        .map(|s| s.index);
    debug!(
        "{}: GPMF stream index {:?} among {} streams",
        video.display(),
        index,
        probe.streams.len()
    );
    Ok(index)
}

/// Copy the raw bytes of one stream out of a video file
pub fn extract_gpmf_stream(video: &Path, stream_index: usize) -> Result<Vec<u8>> {
    debug!(
        "extracting stream {} from {}",
        stream_index,
        video.display()
    );
    let output = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(video)
        .args([
            "-map",
            &format!("0:{}", stream_index),
            "-c",
            "copy",
            "-f",
            "rawvideo",
            "pipe:1",
        ])
        .output()?;
    if !output.status.success() {
        return Err(GpmfError::Extract(format!(
            "ffmpeg failed for {}: {}",
            video.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_output_parsing() {
        let json = r#"{
            "streams": [
                {"index": 0, "codec_tag_string": "avc1"},
                {"index": 1, "codec_tag_string": "mp4a"},
                {"index": 3, "codec_tag_string": "gpmd"}
            ]
        }"#;
        let probe: ProbeOutput = serde_json::from_str(json).unwrap();
        let index = probe
            .streams
            .iter()
            .find(|s| s.codec_tag_string == GPMF_CODEC_TAG)
            .map(|s| s.index);
        assert_eq!(index, Some(3));
    }

    #[test]
    fn test_probe_output_without_streams() {
        let probe: ProbeOutput = serde_json::from_str("{}").unwrap();
        assert!(probe.streams.is_empty());
    }
}
