//! GPX serialization and directory merge
//!
//! Writes decoded tracks as GPX 1.1 XML and merges previously written GPX
//! files from a directory into one multi-segment track, optionally
//! stripped down to bare coordinates.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::{debug, info};
use regex::Regex;

use crate::error::{GpmfError, Result};
use crate::types::{Track, TrackPoint, TrackSegment};

const GPX_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// How much per-point detail a GPX writer emits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GpxDetail {
    /// Everything: elevation, time, name, comment, pdop, fix, speeds
    Full,
    /// Elevation and time only (merged output)
    Basic,
    /// Bare lat/lon polyline ("optimize" mode)
    PositionOnly,
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Write a decoded track as a GPX 1.1 file, creating parent directories
pub fn write_gpx(track: &Track, output_path: &Path) -> Result<()> {
    write_gpx_with_detail(track, output_path, GpxDetail::Full)
}

fn write_gpx_with_detail(track: &Track, output_path: &Path, detail: GpxDetail) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut out = File::create(output_path)?;
    writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        out,
        r#"<gpx creator="gpmf_parser" version="1.1" xmlns="http://www.topografix.com/GPX/1/1" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://www.topografix.com/GPX/1/1 http://www.topografix.com/GPX/1/1/gpx.xsd">"#
    )?;
    writeln!(out, "<trk><name>GoPro GPMF telemetry</name>")?;

    for segment in &track.segments {
        writeln!(out, "<trkseg>")?;
        for point in &segment.points {
            write_trkpt(&mut out, point, detail)?;
        }
        writeln!(out, "</trkseg>")?;
    }

    writeln!(out, "</trk>")?;
    writeln!(out, "</gpx>")?;

    debug!(
        "wrote {} points to {}",
        track.point_count(),
        output_path.display()
    );
    Ok(())
}

fn write_trkpt(out: &mut File, point: &TrackPoint, detail: GpxDetail) -> Result<()> {
    if detail == GpxDetail::PositionOnly {
        writeln!(
            out,
            r#"  <trkpt lat="{:.7}" lon="{:.7}"/>"#,
            point.latitude, point.longitude
        )?;
        return Ok(());
    }

    write!(
        out,
        r#"  <trkpt lat="{:.7}" lon="{:.7}"><ele>{:.3}</ele>"#,
        point.latitude, point.longitude, point.elevation
    )?;
    if let Some(time) = point.time {
        write!(out, "<time>{}</time>", time.format(GPX_TIME_FORMAT))?;
    }
    if detail == GpxDetail::Full {
        if !point.name.is_empty() {
            write!(out, "<name>{}</name>", xml_escape(&point.name))?;
        }
        write!(
            out,
            "<cmt>unit&lt;{}&gt; gpsa&lt;{}&gt;</cmt>",
            xml_escape(&point.unit),
            xml_escape(&point.accuracy)
        )?;
        write!(out, "<pdop>{:.2}</pdop>", point.dop)?;
        write!(out, "<fix>{}</fix>", point.fix.as_gpx_str())?;
        write!(
            out,
            "<extensions><speed_2d><value>{:.3}</value><unit>m/s</unit></speed_2d><speed_3d><value>{:.3}</value><unit>m/s</unit></speed_3d></extensions>",
            point.speed_2d, point.speed_3d
        )?;
    }
    writeln!(out, "</trkpt>")?;
    Ok(())
}

fn regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| GpmfError::Export(format!("bad pattern: {}", e)))
}

/// Read the track segments of a GPX file, keeping lat/lon/ele/time
///
/// This is a deliberately small reader for merge purposes, not a general
/// GPX parser; attributes it does not know about are dropped.
pub fn read_gpx_points(path: &Path) -> Result<Vec<TrackSegment>> {
    let text = std::fs::read_to_string(path)?;

    let seg_re = regex(r"(?s)<trkseg>(.*?)</trkseg>")?;
    let pt_re = regex(r"(?s)<trkpt([^>]*?)(?:/>|>(.*?)</trkpt>)")?;
    let lat_re = regex(r#"lat="([^"]+)""#)?;
    let lon_re = regex(r#"lon="([^"]+)""#)?;
    let ele_re = regex(r"<ele>([^<]+)</ele>")?;
    let time_re = regex(r"<time>([^<]+)</time>")?;

    let parse_coord = |s: &str| -> Result<f64> {
        s.parse::<f64>()
            .map_err(|_| GpmfError::Export(format!("bad coordinate '{}' in {}", s, path.display())))
    };

    let mut segments = Vec::new();
    for seg_match in seg_re.captures_iter(&text) {
        let body = &seg_match[1];
        let mut segment = TrackSegment::default();
        for pt in pt_re.captures_iter(body) {
            let attrs = &pt[1];
            let lat = match lat_re.captures(attrs) {
                Some(c) => parse_coord(&c[1])?,
                None => continue,
            };
            let lon = match lon_re.captures(attrs) {
                Some(c) => parse_coord(&c[1])?,
                None => continue,
            };
            let mut point = TrackPoint::at(lat, lon);
            if let Some(children) = pt.get(2) {
                let children = children.as_str();
                if let Some(c) = ele_re.captures(children) {
                    point.elevation = parse_coord(&c[1])?;
                }
                if let Some(c) = time_re.captures(children) {
                    point.time =
                        NaiveDateTime::parse_from_str(&c[1], GPX_TIME_FORMAT).ok();
                }
            }
            segment.points.push(point);
        }
        if !segment.is_empty() {
            segments.push(segment);
        }
    }
    Ok(segments)
}

/// Merge every GPX file in a directory into one multi-segment track file
///
/// Files are taken in name order; each input segment becomes one output
/// segment, internal point order preserved. `optimize` strips points down
/// to bare coordinates. Returns the written path.
pub fn merge_gpx_dir(dir: &Path, optimize: bool) -> Result<PathBuf> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case("gpx"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(GpmfError::Export(format!(
            "no GPX files found in '{}'",
            dir.display()
        )));
    }

    let mut track = Track::default();
    for file in &files {
        debug!("merging {}", file.display());
        for segment in read_gpx_points(file)? {
            track.push_segment(segment);
        }
    }

    let dirname = dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("merged");
    let output_name = if optimize {
        format!("{}_optimized.gpx", dirname)
    } else {
        format!("{}.gpx", dirname)
    };
    let output_path = dir.join(output_name);

    let detail = if optimize {
        GpxDetail::PositionOnly
    } else {
        GpxDetail::Basic
    };
    write_gpx_with_detail(&track, &output_path, detail)?;

    info!(
        "merged {} files ({} points) into {}",
        files.len(),
        track.point_count(),
        output_path.display()
    );
    Ok(output_path)
}
