//! GPMF Parser Library
//!
//! A Rust library for decoding GoPro GPMF telemetry (the nested KLV
//! metadata track embedded in GoPro MP4 recordings) into geolocated GPS
//! tracks, with GPX export and merge tooling.
//!
//! # Features
//!
//! - **`cli`** (default): Build the `gpmf2gpx` command-line binary
//!
//! # Quick Start
//!
//! Decode a raw GPMF buffer and inspect the track:
//! ```rust,no_run
//! use gpmf_parser::decode_gpmf;
//!
//! let data = std::fs::read("telemetry.gpmf").unwrap();
//! let decoded = decode_gpmf(&data).unwrap();
//! println!("Decoded {} track points", decoded.track.point_count());
//! for warning in &decoded.warnings {
//!     eprintln!("warning: {warning}");
//! }
//! ```
//!
//! Extract telemetry from a GoPro video and write a GPX file:
//! ```rust,no_run
//! use gpmf_parser::{decode_gpmf, export, mp4};
//! use std::path::Path;
//!
//! let video = Path::new("GX010042.MP4");
//! let index = mp4::find_gpmf_stream(video).unwrap().expect("no GPMF track");
//! let data = mp4::extract_gpmf_stream(video, index).unwrap();
//! let decoded = decode_gpmf(&data).unwrap();
//! export::write_gpx(&decoded.track, Path::new("GX010042.gpx")).unwrap();
//! ```
//!
//! # Public API
//!
//! ## Decoding
//! - [`decode_gpmf`] - Decode a raw GPMF buffer into a [`GpmfDecode`]
//! - [`decode_gpmf_file`] - Convenience wrapper reading from a path
//! - [`KlvTokenizer`] - Low-level KLV item iterator
//! - [`decode_value`] - Typed value decoding for one KLV item
//! - [`assemble_blocks`] - Regroup tokenized items into stream blocks
//!
//! ## Data Types
//! - [`Track`], [`TrackSegment`], [`TrackPoint`] - Decoded track data
//! - [`GpsSample`], [`GpsFix`] - Per-sample GPS values
//! - [`KlvItem`], [`KlvLength`], [`FourCC`] - Wire-level records
//! - [`DeviceInfo`] - Recording-device identity
//!
//! ## Export
//! - [`export::write_gpx`] - Serialize a track to GPX 1.1
//! - [`export::merge_gpx_dir`] - Merge a directory of GPX files
//!
//! ## MP4 Extraction
//! - [`mp4::find_gpmf_stream`] / [`mp4::extract_gpmf_stream`] - Pull the
//!   raw GPMF bytes out of a GoPro recording via ffprobe/ffmpeg

pub mod error;
pub mod export;
pub mod mp4;
pub mod parser;
pub mod types;

pub use error::{GpmfError, Result};
#[allow(ambiguous_glob_reexports)]
pub use parser::*;
#[allow(ambiguous_glob_reexports)]
pub use types::*;
