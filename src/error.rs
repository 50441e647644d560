use std::fmt;

/// Custom error types for GPMF decoding
#[derive(Debug)]
pub enum GpmfError {
    /// I/O errors
    Io(std::io::Error),
    /// A KLV header or payload promises more bytes than remain in the buffer
    TruncatedStream {
        offset: usize,
        needed: usize,
        available: usize,
    },
    /// Container nesting exceeds the tokenizer's depth cap
    ExcessiveNesting(usize),
    /// Type code outside the known GPMF alphabet
    UnsupportedType(char),
    /// A positional stream block lacks a key its variant requires
    MissingRequiredField { block: String, key: String },
    /// GPS fix-quality code outside {0, 2, 3}
    UnknownFixCode(i64),
    /// Neither a GPS9 nor a GPS5 stream anywhere in the buffer
    NoPositionalStreamFound,
    /// Malformed date-time field
    Timestamp(String),
    /// Structural mismatch inside an otherwise well-formed block
    Parse(String),
    /// External ffprobe/ffmpeg invocation failure
    Extract(String),
    /// GPX serialization or merge error
    Export(String),
}

impl fmt::Display for GpmfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpmfError::Io(err) => write!(f, "I/O error: {}", err),
            GpmfError::TruncatedStream {
                offset,
                needed,
                available,
            } => write!(
                f,
                "truncated stream at offset {}: payload needs {} bytes, {} remain",
                offset, needed, available
            ),
            GpmfError::ExcessiveNesting(depth) => {
                write!(f, "container nesting exceeds {} levels", depth)
            }
            GpmfError::UnsupportedType(code) => {
                write!(f, "unsupported KLV type code '{}'", code.escape_default())
            }
            GpmfError::MissingRequiredField { block, key } => {
                write!(f, "stream block {} is missing required key {}", block, key)
            }
            GpmfError::UnknownFixCode(code) => {
                write!(f, "unknown GPS fix-quality code {}", code)
            }
            GpmfError::NoPositionalStreamFound => {
                write!(f, "no GPS9 or GPS5 stream found in GPMF data")
            }
            GpmfError::Timestamp(msg) => write!(f, "timestamp error: {}", msg),
            GpmfError::Parse(msg) => write!(f, "parse error: {}", msg),
            GpmfError::Extract(msg) => write!(f, "extraction error: {}", msg),
            GpmfError::Export(msg) => write!(f, "export error: {}", msg),
        }
    }
}

impl std::error::Error for GpmfError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpmfError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for GpmfError {
    fn from(err: std::io::Error) -> Self {
        GpmfError::Io(err)
    }
}

impl From<anyhow::Error> for GpmfError {
    fn from(err: anyhow::Error) -> Self {
        GpmfError::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GpmfError>;
