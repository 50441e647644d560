//! KLV tokenizer for raw GPMF byte buffers
//!
//! Splits a flat buffer into `(path id, KlvItem)` pairs, unfolding the
//! container keys (DEVC/STRM) with an explicit frame stack instead of
//! call-stack recursion.

use crate::error::{GpmfError, Result};
use crate::types::{FourCC, KlvItem, KlvLength};

/// Hard cap on container nesting; real GPMF uses two levels (DEVC/STRM)
pub const MAX_NESTING_DEPTH: usize = 16;

/// Container keys unfolded by default
pub const DEFAULT_UNFOLD_KEYS: [FourCC; 2] = [FourCC::DEVC, FourCC::STRM];

/// Round up to the next multiple of 4
pub fn ceil4(n: usize) -> usize {
    (n + 3) & !3
}

/// One cursor into a (possibly nested) byte region being tokenized
struct Frame<'a> {
    data: &'a [u8],
    pos: usize,
    /// Absolute offset of this region in the original buffer, for diagnostics
    base: usize,
    path: String,
    /// 1-based occurrence counter feeding derived path ids
    count: usize,
}

/// Lazy, finite, non-restartable KLV item iterator
///
/// Yields `(path_id, item)` pairs; path ids distinguish distinct container
/// occurrences and carry no other semantics. The iterator fuses after the
/// first error.
pub struct KlvTokenizer<'a> {
    stack: Vec<Frame<'a>>,
    unfold: Vec<FourCC>,
    failed: bool,
}

impl<'a> KlvTokenizer<'a> {
    pub fn new(data: &'a [u8], unfold_keys: &[FourCC]) -> Self {
        Self {
            stack: vec![Frame {
                data,
                pos: 0,
                base: 0,
                path: "gpmf".to_string(),
                count: 0,
            }],
            unfold: unfold_keys.to_vec(),
            failed: false,
        }
    }

    /// Tokenizer with the standard DEVC/STRM unfold set
    pub fn with_default_unfold(data: &'a [u8]) -> Self {
        Self::new(data, &DEFAULT_UNFOLD_KEYS)
    }
}

impl<'a> Iterator for KlvTokenizer<'a> {
    type Item = Result<(String, KlvItem)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let depth = self.stack.len();
            let frame = self.stack.last_mut()?;
            let remaining = frame.data.len() - frame.pos;
            if remaining < 8 {
                // Trailing padding or the end of a nested region
                self.stack.pop();
                continue;
            }

            let at = frame.pos;
            let header = &frame.data[at..at + 8];
            let key = FourCC([header[0], header[1], header[2], header[3]]);
            let length = KlvLength {
                type_code: header[4] as char,
                size: header[5] as usize,
                repeat: u16::from_be_bytes([header[6], header[7]]) as usize,
            };
            let logical = length.logical_len();
            let physical = ceil4(logical);

            if remaining - 8 < physical {
                self.failed = true;
                return Some(Err(GpmfError::TruncatedStream {
                    offset: frame.base + at,
                    needed: physical,
                    available: remaining - 8,
                }));
            }

            frame.count += 1;
            let body_at = at + 8;
            frame.pos = body_at + physical;

            if self.unfold.contains(&key) {
                if depth >= MAX_NESTING_DEPTH {
                    self.failed = true;
                    return Some(Err(GpmfError::ExcessiveNesting(depth)));
                }
                let child = Frame {
                    data: &frame.data[body_at..body_at + logical],
                    pos: 0,
                    base: frame.base + body_at,
                    path: format!("{}-{}", frame.path, frame.count),
                    count: 0,
                };
                self.stack.push(child);
                continue;
            }

            let path = frame.path.clone();
            let payload = frame.data[body_at..body_at + physical].to_vec();
            return Some(Ok((path, KlvItem { key, length, payload })));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encode one KLV record with correct 4-byte padding
    fn klv(key: &[u8; 4], type_code: u8, size: u8, repeat: u16, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(key);
        out.push(type_code);
        out.push(size);
        out.extend_from_slice(&repeat.to_be_bytes());
        out.extend_from_slice(payload);
        while out.len() % 4 != 0 {
            out.push(0);
        }
        out
    }

    fn collect(data: &[u8], unfold: &[FourCC]) -> Vec<(String, KlvItem)> {
        KlvTokenizer::new(data, unfold)
            .collect::<Result<Vec<_>>>()
            .expect("tokenize")
    }

    #[test]
    fn test_ceil4_invariant() {
        for n in 0..256usize {
            let p = ceil4(n);
            assert!(p >= n);
            assert_eq!(p % 4, 0);
            assert!(p - n < 4);
        }
    }

    #[test]
    fn test_roundtrip_flat_items() {
        let mut buf = klv(b"ACCL", b's', 2, 3, &[0, 1, 0, 2, 0, 3]);
        buf.extend(klv(b"TMPC", b'f', 4, 1, &1.5f32.to_be_bytes()));

        let items = collect(&buf, &[]);
        assert_eq!(items.len(), 2);

        let (path, item) = &items[0];
        assert_eq!(path, "gpmf");
        assert_eq!(item.key, FourCC(*b"ACCL"));
        assert_eq!(item.length.type_code, 's');
        assert_eq!(item.length.size, 2);
        assert_eq!(item.length.repeat, 3);
        assert_eq!(item.logical(), &[0, 1, 0, 2, 0, 3]);
        // physical payload padded to 8
        assert_eq!(item.payload.len(), 8);

        assert_eq!(items[1].1.key, FourCC(*b"TMPC"));
        assert_eq!(items[1].1.logical(), &1.5f32.to_be_bytes());
    }

    #[test]
    fn test_zero_repeat_yields_empty_item() {
        let buf = klv(b"EMPT", b'B', 1, 0, &[]);
        let items = collect(&buf, &[]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].1.length.repeat, 0);
        assert!(items[0].1.logical().is_empty());
    }

    #[test]
    fn test_trailing_bytes_terminate_cleanly() {
        let mut buf = klv(b"TMPC", b'f', 4, 1, &0.0f32.to_be_bytes());
        buf.extend_from_slice(&[0, 0, 0]); // fewer than 8 bytes remain
        let items = collect(&buf, &[]);
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_nested_unfold_and_path_ids() {
        let inner = klv(b"GPSF", b'L', 4, 1, &3u32.to_be_bytes());
        let strm = klv(b"STRM", 0, 1, inner.len() as u16, &inner);
        let mut devc_body = klv(b"DVID", b'L', 4, 1, &1u32.to_be_bytes());
        devc_body.extend(strm);
        let buf = klv(b"DEVC", 0, 1, devc_body.len() as u16, &devc_body);

        let items = collect(&buf, &DEFAULT_UNFOLD_KEYS);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].0, "gpmf-1");
        assert_eq!(items[0].1.key, FourCC::DVID);
        assert_eq!(items[1].0, "gpmf-1-2");
        assert_eq!(items[1].1.key, FourCC::GPSF);
    }

    #[test]
    fn test_unfold_idempotence_for_absent_key() {
        let mut buf = klv(b"ACCL", b's', 2, 1, &[0, 7]);
        buf.extend(klv(b"GYRO", b's', 2, 1, &[0, 9]));

        let plain = collect(&buf, &[]);
        let unfolded = collect(&buf, &[FourCC(*b"MAGN")]);
        assert_eq!(plain.len(), unfolded.len());
        for (a, b) in plain.iter().zip(&unfolded) {
            assert_eq!(a.0, b.0);
            assert_eq!(a.1.key, b.1.key);
            assert_eq!(a.1.payload, b.1.payload);
        }
    }

    #[test]
    fn test_truncated_payload_errors() {
        let mut buf = klv(b"GPS5", b'l', 20, 4, &[0u8; 80]);
        buf.truncate(30); // header promises 80 bytes
        let result: Result<Vec<_>> = KlvTokenizer::new(&buf, &[]).collect();
        assert!(matches!(
            result,
            Err(GpmfError::TruncatedStream {
                offset: 0,
                needed: 80,
                ..
            })
        ));
    }

    #[test]
    fn test_error_fuses_iterator() {
        let buf = klv(b"GPS5", b'l', 20, 4, &[0u8; 10]);
        let mut tok = KlvTokenizer::new(&buf[..20], &[]);
        assert!(tok.next().unwrap().is_err());
        assert!(tok.next().is_none());
    }

    #[test]
    fn test_excessive_nesting_capped() {
        // A DEVC whose payload is itself, MAX_NESTING_DEPTH + 1 deep
        let mut buf = klv(b"DEVC", 0, 0, 0, &[]);
        for _ in 0..MAX_NESTING_DEPTH + 1 {
            buf = klv(b"DEVC", 0, 1, buf.len() as u16, &buf);
        }
        let result: Result<Vec<_>> = KlvTokenizer::new(&buf, &DEFAULT_UNFOLD_KEYS).collect();
        assert!(matches!(result, Err(GpmfError::ExcessiveNesting(_))));
    }
}
