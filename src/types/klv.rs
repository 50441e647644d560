use std::fmt;

/// 4-byte ASCII identifier used as a KLV key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    pub const DEVC: FourCC = FourCC(*b"DEVC");
    pub const STRM: FourCC = FourCC(*b"STRM");
    pub const DVID: FourCC = FourCC(*b"DVID");
    pub const DVNM: FourCC = FourCC(*b"DVNM");
    pub const STNM: FourCC = FourCC(*b"STNM");
    pub const UNIT: FourCC = FourCC(*b"UNIT");
    pub const SCAL: FourCC = FourCC(*b"SCAL");
    pub const TYPE: FourCC = FourCC(*b"TYPE");
    pub const GPSA: FourCC = FourCC(*b"GPSA");
    pub const GPSU: FourCC = FourCC(*b"GPSU");
    pub const GPSP: FourCC = FourCC(*b"GPSP");
    pub const GPSF: FourCC = FourCC(*b"GPSF");
    pub const GPS5: FourCC = FourCC(*b"GPS5");
    pub const GPS9: FourCC = FourCC(*b"GPS9");
    pub const EMPT: FourCC = FourCC(*b"EMPT");
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            let c = if b.is_ascii_graphic() { b as char } else { '.' };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// Type/size/repeat header of a KLV item
///
/// The wire type code is kept verbatim; a zero byte marks a nested
/// container and is rendered as the `NST` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KlvLength {
    pub type_code: char,
    pub size: usize,
    pub repeat: usize,
}

impl KlvLength {
    /// Logical payload length in bytes (before 4-byte padding)
    pub fn logical_len(&self) -> usize {
        self.size * self.repeat
    }

    /// True for container markers whose payload is itself a KLV sequence
    pub fn is_nested(&self) -> bool {
        self.type_code == '\0'
    }
}

impl fmt::Display for KlvLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nested() {
            write!(f, "NST size={} repeat={}", self.size, self.repeat)
        } else {
            write!(
                f,
                "{} size={} repeat={}",
                self.type_code, self.size, self.repeat
            )
        }
    }
}

/// One KLV record: fourcc key, length header, and owned payload bytes
///
/// The payload holds the padded physical bytes; logical content is the
/// first `size * repeat` bytes.
#[derive(Debug, Clone)]
pub struct KlvItem {
    pub key: FourCC,
    pub length: KlvLength,
    pub payload: Vec<u8>,
}

impl KlvItem {
    /// Logical (unpadded) payload view
    pub fn logical(&self) -> &[u8] {
        let n = self.length.logical_len().min(self.payload.len());
        &self.payload[..n]
    }

    /// Payload as Latin-1 text truncated to the declared element size,
    /// the way GPMF encodes fixed-length strings such as STNM and UNIT
    pub fn ascii_trunc(&self) -> String {
        self.payload
            .iter()
            .take(self.length.size)
            .map(|&b| b as char)
            .collect()
    }

    /// Full logical payload as Latin-1 text
    pub fn ascii_full(&self) -> String {
        self.logical().iter().map(|&b| b as char).collect()
    }
}
