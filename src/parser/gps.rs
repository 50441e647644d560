//! GPS stream block decoding
//!
//! Classifies each assembled block as GPS9, GPS5, or non-positional, and
//! turns the raw scaled integer columns into time-stamped geodetic samples.
//!
//! GPS9 carries a per-sample timestamp (days since 2000-01-01 plus seconds
//! of day). GPS5 carries a single GPSU start time and samples at a fixed
//! 18 Hz, so per-sample times are extrapolated from the index.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use log::debug;

use crate::error::{GpmfError, Result};
use crate::parser::block::StreamBlock;
use crate::parser::value::decode_value;
use crate::types::{FourCC, GpsFix, GpsSample};

/// GPS5 streams sample at a fixed rate with no per-sample timestamp field
pub const GPS5_RATE_HZ: i64 = 18;

/// Stream generation, decided once per block by key presence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Gps9,
    Gps5,
    Unknown,
}

/// Classify a block; GPS9 takes priority when both keys are present
pub fn classify(block: &StreamBlock) -> StreamKind {
    if block.contains(FourCC::GPS9) {
        StreamKind::Gps9
    } else if block.contains(FourCC::GPS5) {
        StreamKind::Gps5
    } else {
        StreamKind::Unknown
    }
}

/// Decode one block into samples; `Ok(None)` means a skipped
/// non-positional stream, recorded as a diagnostic
pub fn decode_block(
    block: &StreamBlock,
    warnings: &mut Vec<String>,
) -> Result<Option<Vec<GpsSample>>> {
    match classify(block) {
        StreamKind::Gps9 => decode_gps9(block).map(Some),
        StreamKind::Gps5 => decode_gps5(block).map(Some),
        StreamKind::Unknown => {
            let msg = format!(
                "skipping non-positional stream {} (keys: {})",
                block.path,
                block.key_names().join(", ")
            );
            debug!("{}", msg);
            warnings.push(msg);
            Ok(None)
        }
    }
}

/// Keys required by both positional generations
struct StreamHeader {
    name: String,
    unit: String,
    accuracy: String,
    scale: Vec<f64>,
}

fn read_header(block: &StreamBlock) -> Result<StreamHeader> {
    let name = block.require(FourCC::STNM)?.ascii_trunc();
    let unit = block.require(FourCC::UNIT)?.ascii_trunc();

    let gpsa = block.require(FourCC::GPSA)?;
    let raw = gpsa.logical();
    if raw.len() < 4 {
        return Err(GpmfError::Parse(format!(
            "GPSA in block {} is {} bytes, expected 4",
            block.path,
            raw.len()
        )));
    }
    let accuracy: String = raw[..4].iter().map(|&b| b as char).collect();

    let scale = decode_value(block.require(FourCC::SCAL)?)?.to_f64s();
    if scale.is_empty() {
        return Err(GpmfError::Parse(format!(
            "SCAL in block {} holds no divisors",
            block.path
        )));
    }

    Ok(StreamHeader {
        name,
        unit,
        accuracy,
        scale,
    })
}

fn gps9_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("2000-01-01 is a valid date")
}

/// Absolute sample time from scaled day and second-of-day columns
fn gps9_time(epoch: NaiveDateTime, days: f64, seconds: f64) -> NaiveDateTime {
    let whole_days = days.trunc() as i64;
    let frac_seconds = days.fract() * 86_400.0 + seconds;
    epoch + Duration::days(whole_days) + Duration::nanoseconds((frac_seconds * 1e9).round() as i64)
}

fn column_width(code: char) -> Result<usize> {
    match code {
        'b' | 'B' => Ok(1),
        's' | 'S' | 'H' => Ok(2),
        'l' | 'L' | 'I' | 'f' => Ok(4),
        'j' | 'J' | 'd' => Ok(8),
        other => Err(GpmfError::UnsupportedType(other)),
    }
}

fn read_column(code: char, bytes: &[u8]) -> Result<f64> {
    let value = match code {
        'b' => bytes[0] as i8 as f64,
        'B' => bytes[0] as f64,
        's' => i16::from_be_bytes([bytes[0], bytes[1]]) as f64,
        'S' | 'H' => u16::from_be_bytes([bytes[0], bytes[1]]) as f64,
        'l' => i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        'L' | 'I' => u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        'f' => f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        'j' => i64::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]) as f64,
        'J' => u64::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]) as f64,
        'd' => f64::from_be_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]),
        other => return Err(GpmfError::UnsupportedType(other)),
    };
    Ok(value)
}

/// Unpack one packed sample row according to a column type string
fn unpack_row(codes: &str, row: &[u8]) -> Result<Vec<f64>> {
    let mut columns = Vec::with_capacity(codes.len());
    let mut at = 0;
    for code in codes.chars() {
        let width = column_width(code)?;
        if at + width > row.len() {
            return Err(GpmfError::Parse(format!(
                "sample row of {} bytes too short for column layout '{}'",
                row.len(),
                codes
            )));
        }
        columns.push(read_column(code, &row[at..at + width])?);
        at += width;
    }
    Ok(columns)
}

/// Decode a GPS9 block: TYPE-driven mixed-width rows with per-sample time
pub fn decode_gps9(block: &StreamBlock) -> Result<Vec<GpsSample>> {
    let header = read_header(block)?;

    // The block's private column typing uses 'l' for unsigned 32-bit and
    // 'S' for unsigned 16-bit; both substitutions are applied literally.
    let codes: String = block
        .require(FourCC::TYPE)?
        .ascii_trunc()
        .chars()
        .map(|c| match c {
            'l' => 'I',
            'S' => 'H',
            c => c,
        })
        .collect();

    let gps9 = block.require(FourCC::GPS9)?;
    let rows = gps9.length.repeat;
    let row_size = gps9.length.size;
    let data = gps9.logical();
    if data.len() < rows * row_size {
        return Err(GpmfError::Parse(format!(
            "GPS9 in block {} holds {} bytes for {} rows of {}",
            block.path,
            data.len(),
            rows,
            row_size
        )));
    }

    let epoch = gps9_epoch();
    let mut samples = Vec::with_capacity(rows);
    for r in 0..rows {
        let mut columns = unpack_row(&codes, &data[r * row_size..(r + 1) * row_size])?;
        if columns.len() < 9 {
            return Err(GpmfError::Parse(format!(
                "GPS9 row in block {} has {} columns, expected at least 9",
                block.path,
                columns.len()
            )));
        }
        if header.scale.len() != columns.len() {
            return Err(GpmfError::Parse(format!(
                "SCAL in block {} has {} divisors for {} columns",
                block.path,
                header.scale.len(),
                columns.len()
            )));
        }
        for (value, divisor) in columns.iter_mut().zip(&header.scale) {
            *value /= divisor;
        }

        let fix = GpsFix::from_code(columns[8] as i64)?;
        samples.push(GpsSample {
            time: gps9_time(epoch, columns[5], columns[6]),
            latitude: columns[0],
            longitude: columns[1],
            elevation: columns[2],
            speed_2d: columns[3],
            speed_3d: columns[4],
            dop: columns[7],
            fix,
            stream_name: header.name.clone(),
            unit: header.unit.clone(),
            accuracy: header.accuracy.clone(),
        });
    }
    Ok(samples)
}

/// Decode a GPS5 block: fixed 5-column rows at 18 Hz from a GPSU start time
pub fn decode_gps5(block: &StreamBlock) -> Result<Vec<GpsSample>> {
    // "No fix yet" placeholder block
    if block.contains(FourCC::EMPT) {
        return Ok(Vec::new());
    }

    let header = read_header(block)?;

    let gpsu = decode_value(block.require(FourCC::GPSU)?)?;
    let stamp = gpsu.as_str().ok_or_else(|| {
        GpmfError::Timestamp(format!("GPSU in block {} is not a string", block.path))
    })?;
    let stamp = stamp.trim_end_matches('\0');
    // Two-digit year on the wire, century is fixed
    let start = NaiveDateTime::parse_from_str(&format!("20{}", stamp), "%Y%m%d%H%M%S%.f")
        .map_err(|e| GpmfError::Timestamp(format!("bad GPSU '{}': {}", stamp, e)))?;

    let dop = decode_value(block.require(FourCC::GPSP)?)?
        .to_f64s()
        .first()
        .copied()
        .ok_or_else(|| GpmfError::Parse(format!("empty GPSP in block {}", block.path)))?
        / 100.0; // centimeters on the wire

    let fix_code = decode_value(block.require(FourCC::GPSF)?)?
        .scalar_i64()
        .ok_or_else(|| GpmfError::Parse(format!("GPSF in block {} is not a scalar", block.path)))?;
    let fix = GpsFix::from_code(fix_code)?;

    let gps5 = block.require(FourCC::GPS5)?;
    let columns_per_row = gps5.length.size / 4;
    if columns_per_row != 5 {
        return Err(GpmfError::Parse(format!(
            "GPS5 in block {} has {} columns per row, expected 5",
            block.path, columns_per_row
        )));
    }
    if header.scale.len() != columns_per_row {
        return Err(GpmfError::Parse(format!(
            "SCAL in block {} has {} divisors for {} columns",
            block.path,
            header.scale.len(),
            columns_per_row
        )));
    }

    let raw: Vec<i32> = gps5
        .logical()
        .chunks_exact(4)
        .map(|c| i32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    let rows = gps5.length.repeat;
    if raw.len() < rows * columns_per_row {
        return Err(GpmfError::Parse(format!(
            "GPS5 in block {} holds {} values for {} rows",
            block.path,
            raw.len(),
            rows
        )));
    }

    let mut samples = Vec::with_capacity(rows);
    for r in 0..rows {
        let row = &raw[r * columns_per_row..(r + 1) * columns_per_row];
        let scaled: Vec<f64> = row
            .iter()
            .zip(&header.scale)
            .map(|(&v, s)| v as f64 / s)
            .collect();

        // Fixed-rate extrapolation; integer nanos keep index 18 exactly +1s
        let offset = Duration::nanoseconds(r as i64 * 1_000_000_000 / GPS5_RATE_HZ);
        samples.push(GpsSample {
            time: start + offset,
            latitude: scaled[0],
            longitude: scaled[1],
            elevation: scaled[2],
            speed_2d: scaled[3],
            speed_3d: scaled[4],
            dop,
            fix,
            stream_name: header.name.clone(),
            unit: header.unit.clone(),
            accuracy: header.accuracy.clone(),
        });
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KlvItem, KlvLength};

    fn item(key: &[u8; 4], type_code: char, size: usize, repeat: usize, payload: Vec<u8>) -> KlvItem {
        KlvItem {
            key: FourCC(*key),
            length: KlvLength {
                type_code,
                size,
                repeat,
            },
            payload,
        }
    }

    fn scal(divisors: &[i32]) -> KlvItem {
        let mut payload = Vec::new();
        for d in divisors {
            payload.extend_from_slice(&d.to_be_bytes());
        }
        item(b"SCAL", 'l', 4, divisors.len(), payload)
    }

    fn header_block(path: &str, divisors: &[i32]) -> StreamBlock {
        let mut block = StreamBlock::new(path.to_string());
        block.insert(item(b"STNM", 'c', 9, 1, b"GPS data\0\0\0\0".to_vec()));
        block.insert(item(b"UNIT", 'c', 3, 1, b"deg\0".to_vec()));
        block.insert(item(b"GPSA", 'F', 4, 1, b"MSAV".to_vec()));
        block.insert(scal(divisors));
        block
    }

    /// 9-column row packed as seven u32 and two u16 ("lllllllSS")
    fn gps9_row(values: [u32; 7], dop: u16, fix: u16) -> Vec<u8> {
        let mut row = Vec::new();
        for v in values {
            row.extend_from_slice(&v.to_be_bytes());
        }
        row.extend_from_slice(&dop.to_be_bytes());
        row.extend_from_slice(&fix.to_be_bytes());
        row
    }

    fn gps9_block(rows: Vec<Vec<u8>>, divisors: &[i32]) -> StreamBlock {
        let mut block = header_block("gpmf-1-1", divisors);
        block.insert(item(b"TYPE", 'c', 9, 1, b"lllllllSS\0\0\0".to_vec()));
        let repeat = rows.len();
        let payload: Vec<u8> = rows.concat();
        block.insert(item(b"GPS9", '?', 32, repeat, payload));
        block
    }

    fn gps5_block(rows: Vec<[i32; 5]>, divisors: &[i32], gpsu: &str) -> StreamBlock {
        let mut block = header_block("gpmf-1-2", divisors);
        block.insert(item(
            b"GPSU",
            'U',
            gpsu.len(),
            1,
            gpsu.as_bytes().to_vec(),
        ));
        block.insert(item(b"GPSP", 'S', 2, 1, 342u16.to_be_bytes().to_vec()));
        block.insert(item(b"GPSF", 'L', 4, 1, 3u32.to_be_bytes().to_vec()));
        let repeat = rows.len();
        let mut payload = Vec::new();
        for row in rows {
            for v in row {
                payload.extend_from_slice(&v.to_be_bytes());
            }
        }
        block.insert(item(b"GPS5", 'l', 20, repeat, payload));
        block
    }

    fn date(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_classify_priority() {
        let ones = [1i32; 9];
        let mut block = gps9_block(vec![], &ones);
        assert_eq!(classify(&block), StreamKind::Gps9);
        // GPS9 wins even when GPS5 is also present
        block.insert(item(b"GPS5", 'l', 20, 0, vec![]));
        assert_eq!(classify(&block), StreamKind::Gps9);

        let block = gps5_block(vec![], &[1; 5], "230101000000.000000");
        assert_eq!(classify(&block), StreamKind::Gps5);

        let block = header_block("gpmf-1-3", &[1]);
        assert_eq!(classify(&block), StreamKind::Unknown);
    }

    #[test]
    fn test_gps9_epoch_reconstruction() {
        let divisors = [1, 1, 1, 1, 1, 1, 1, 100, 1];
        let rows = vec![
            gps9_row([45, 90, 100, 5, 0, 0, 0], 150, 3),
            gps9_row([46, 91, 101, 6, 0, 1, 0], 150, 3),
            gps9_row([47, 92, 102, 7, 0, 1, 3600], 150, 2),
        ];
        let samples = decode_gps9(&gps9_block(rows, &divisors)).unwrap();
        assert_eq!(samples.len(), 3);

        assert_eq!(samples[0].time, date(2000, 1, 1, 0, 0, 0));
        assert_eq!(samples[1].time, date(2000, 1, 2, 0, 0, 0));
        assert_eq!(samples[2].time, date(2000, 1, 2, 1, 0, 0));

        assert_eq!(samples[0].latitude, 45.0);
        assert_eq!(samples[0].longitude, 90.0);
        assert_eq!(samples[0].elevation, 100.0);
        assert_eq!(samples[0].speed_2d, 5.0);
        assert_eq!(samples[0].speed_3d, 0.0);
        assert_eq!(samples[0].dop, 1.5);
        assert_eq!(samples[0].fix, GpsFix::Fix3d);
        assert_eq!(samples[2].fix, GpsFix::Fix2d);
        assert_eq!(samples[0].stream_name, "GPS data");
        assert_eq!(samples[0].unit, "deg");
        assert_eq!(samples[0].accuracy, "MSAV");
    }

    #[test]
    fn test_gps9_scale_division() {
        let divisors = [10_000_000, 10_000_000, 1000, 1000, 1000, 1, 1000, 100, 1];
        let rows = vec![gps9_row(
            [451234567, 901234567, 123456, 5500, 0, 8400, 43_200_500],
            250,
            3,
        )];
        let samples = decode_gps9(&gps9_block(rows, &divisors)).unwrap();
        let s = &samples[0];
        assert!((s.latitude - 45.1234567).abs() < 1e-9);
        assert!((s.longitude - 90.1234567).abs() < 1e-9);
        assert!((s.elevation - 123.456).abs() < 1e-9);
        assert!((s.speed_2d - 5.5).abs() < 1e-9);
        assert_eq!(s.dop, 2.5);
        // 8400 days, 43200.5 seconds of day
        assert_eq!(
            s.time,
            date(2022, 12, 31, 12, 0, 0) + Duration::milliseconds(500)
        );
    }

    #[test]
    fn test_gps9_unknown_fix_code_fails() {
        let divisors = [1i32; 9];
        let rows = vec![gps9_row([0, 0, 0, 0, 0, 0, 0], 0, 5)];
        let result = decode_gps9(&gps9_block(rows, &divisors));
        assert!(matches!(result, Err(GpmfError::UnknownFixCode(5))));
    }

    #[test]
    fn test_gps9_missing_type_fails() {
        let mut block = header_block("gpmf-1-1", &[1; 9]);
        block.insert(item(b"GPS9", '?', 32, 0, vec![]));
        let result = decode_gps9(&block);
        assert!(matches!(
            result,
            Err(GpmfError::MissingRequiredField { key, .. }) if key == "TYPE"
        ));
    }

    #[test]
    fn test_gps5_fixed_rate_timestamps() {
        let rows: Vec<[i32; 5]> = (0..19).map(|i| [i, i, 0, 0, 0]).collect();
        let samples = decode_gps5(&gps5_block(rows, &[1; 5], "230101000000.000000")).unwrap();
        assert_eq!(samples.len(), 19);
        assert_eq!(samples[0].time, date(2023, 1, 1, 0, 0, 0));
        // 18 Hz: sample index 18 lands exactly one second in
        assert_eq!(samples[18].time, date(2023, 1, 1, 0, 0, 1));
        assert_eq!(samples[0].dop, 3.42);
        assert_eq!(samples[0].fix, GpsFix::Fix3d);
    }

    #[test]
    fn test_gps5_scaled_columns() {
        let rows = vec![[451234567, -900000000, 12345, 2500, 2600]];
        let divisors = [10_000_000, 10_000_000, 1000, 1000, 1000];
        let samples = decode_gps5(&gps5_block(rows, &divisors, "230615120000.500000")).unwrap();
        let s = &samples[0];
        assert!((s.latitude - 45.1234567).abs() < 1e-9);
        assert!((s.longitude + 90.0).abs() < 1e-9);
        assert!((s.elevation - 12.345).abs() < 1e-9);
        assert!((s.speed_2d - 2.5).abs() < 1e-9);
        assert!((s.speed_3d - 2.6).abs() < 1e-9);
        assert_eq!(
            s.time,
            date(2023, 6, 15, 12, 0, 0) + Duration::microseconds(500_000)
        );
    }

    #[test]
    fn test_gps5_empt_placeholder_decodes_empty() {
        let mut block = StreamBlock::new("gpmf-1-2".to_string());
        block.insert(item(b"GPS5", 'l', 20, 0, vec![]));
        block.insert(item(b"EMPT", 'B', 1, 0, vec![]));
        let samples = decode_gps5(&block).unwrap();
        assert!(samples.is_empty());
    }

    #[test]
    fn test_gps5_missing_required_field() {
        let block = gps5_block(vec![[0; 5]], &[1; 5], "230101000000.000000");
        let mut stripped = StreamBlock::new(block.path.clone());
        for key in [b"STNM", b"UNIT", b"GPSA", b"SCAL", b"GPSP", b"GPSF", b"GPS5"] {
            if let Some(it) = block.get(FourCC(*key)) {
                stripped.insert(it.clone());
            }
        }
        // GPSU withheld
        let result = decode_gps5(&stripped);
        assert!(matches!(
            result,
            Err(GpmfError::MissingRequiredField { key, .. }) if key == "GPSU"
        ));
    }

    #[test]
    fn test_decode_block_skips_unknown_with_diagnostic() {
        let mut block = StreamBlock::new("gpmf-1-4".to_string());
        block.insert(item(b"ACCL", 's', 6, 2, vec![0; 24]));
        let mut warnings = Vec::new();
        let decoded = decode_block(&block, &mut warnings).unwrap();
        assert!(decoded.is_none());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("gpmf-1-4"));
        assert!(warnings[0].contains("ACCL"));
    }
}
