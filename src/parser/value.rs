//! Typed value conversion for KLV payloads
//!
//! A single-character wire type code selects one of ten big-endian numeric
//! interpretations, or a raw Latin-1 string for the 'c'/'U' codes.

use crate::error::{GpmfError, Result};
use crate::types::KlvItem;

/// Decoded logical value of one KLV item
#[derive(Debug, Clone, PartialEq)]
pub enum KlvValue {
    Str(String),
    Int8(Vec<i8>),
    Uint8(Vec<u8>),
    Int16(Vec<i16>),
    Uint16(Vec<u16>),
    Int32(Vec<i32>),
    Uint32(Vec<u32>),
    Int64(Vec<i64>),
    Uint64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

/// Element width in bytes for a numeric type code, `None` outside the alphabet
pub fn element_width(type_code: char) -> Option<usize> {
    match type_code {
        'b' | 'B' => Some(1),
        's' | 'S' => Some(2),
        'l' | 'L' | 'f' => Some(4),
        'j' | 'J' | 'd' => Some(8),
        _ => None,
    }
}

fn be_chunks<const W: usize, T>(data: &[u8], convert: impl Fn([u8; W]) -> T) -> Vec<T> {
    data.chunks_exact(W)
        .map(|chunk| {
            let mut buf = [0u8; W];
            buf.copy_from_slice(chunk);
            convert(buf)
        })
        .collect()
}

/// Decode a KLV item's logical payload according to its type code
pub fn decode_value(item: &KlvItem) -> Result<KlvValue> {
    let data = item.logical();
    match item.length.type_code {
        'c' | 'U' => Ok(KlvValue::Str(data.iter().map(|&b| b as char).collect())),
        'b' => Ok(KlvValue::Int8(be_chunks(data, |b: [u8; 1]| b[0] as i8))),
        'B' => Ok(KlvValue::Uint8(data.to_vec())),
        's' => Ok(KlvValue::Int16(be_chunks(data, i16::from_be_bytes))),
        'S' => Ok(KlvValue::Uint16(be_chunks(data, u16::from_be_bytes))),
        'l' => Ok(KlvValue::Int32(be_chunks(data, i32::from_be_bytes))),
        'L' => Ok(KlvValue::Uint32(be_chunks(data, u32::from_be_bytes))),
        'j' => Ok(KlvValue::Int64(be_chunks(data, i64::from_be_bytes))),
        'J' => Ok(KlvValue::Uint64(be_chunks(data, u64::from_be_bytes))),
        'f' => Ok(KlvValue::Float32(be_chunks(data, f32::from_be_bytes))),
        'd' => Ok(KlvValue::Float64(be_chunks(data, f64::from_be_bytes))),
        other => Err(GpmfError::UnsupportedType(other)),
    }
}

impl KlvValue {
    /// Number of decoded elements (characters for strings)
    pub fn len(&self) -> usize {
        match self {
            KlvValue::Str(s) => s.len(),
            KlvValue::Int8(v) => v.len(),
            KlvValue::Uint8(v) => v.len(),
            KlvValue::Int16(v) => v.len(),
            KlvValue::Uint16(v) => v.len(),
            KlvValue::Int32(v) => v.len(),
            KlvValue::Uint32(v) => v.len(),
            KlvValue::Int64(v) => v.len(),
            KlvValue::Uint64(v) => v.len(),
            KlvValue::Float32(v) => v.len(),
            KlvValue::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All numeric elements widened to f64; empty for strings
    pub fn to_f64s(&self) -> Vec<f64> {
        match self {
            KlvValue::Str(_) => Vec::new(),
            KlvValue::Int8(v) => v.iter().map(|&x| x as f64).collect(),
            KlvValue::Uint8(v) => v.iter().map(|&x| x as f64).collect(),
            KlvValue::Int16(v) => v.iter().map(|&x| x as f64).collect(),
            KlvValue::Uint16(v) => v.iter().map(|&x| x as f64).collect(),
            KlvValue::Int32(v) => v.iter().map(|&x| x as f64).collect(),
            KlvValue::Uint32(v) => v.iter().map(|&x| x as f64).collect(),
            KlvValue::Int64(v) => v.iter().map(|&x| x as f64).collect(),
            KlvValue::Uint64(v) => v.iter().map(|&x| x as f64).collect(),
            KlvValue::Float32(v) => v.iter().map(|&x| x as f64).collect(),
            KlvValue::Float64(v) => v.clone(),
        }
    }

    /// Single-element convenience accessor
    pub fn scalar_f64(&self) -> Option<f64> {
        let values = self.to_f64s();
        if values.len() == 1 {
            Some(values[0])
        } else {
            None
        }
    }

    /// Single-element convenience accessor for integral values
    pub fn scalar_i64(&self) -> Option<i64> {
        match self {
            KlvValue::Int8(v) if v.len() == 1 => Some(v[0] as i64),
            KlvValue::Uint8(v) if v.len() == 1 => Some(v[0] as i64),
            KlvValue::Int16(v) if v.len() == 1 => Some(v[0] as i64),
            KlvValue::Uint16(v) if v.len() == 1 => Some(v[0] as i64),
            KlvValue::Int32(v) if v.len() == 1 => Some(v[0] as i64),
            KlvValue::Uint32(v) if v.len() == 1 => Some(v[0] as i64),
            KlvValue::Int64(v) if v.len() == 1 => Some(v[0]),
            KlvValue::Uint64(v) if v.len() == 1 => Some(v[0] as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            KlvValue::Str(s) => Some(s),
            _ => None,
        }
    }
}
