use chrono::NaiveDateTime;

use crate::error::{GpmfError, Result};

/// Categorical GPS fix state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpsFix {
    None,
    Fix2d,
    Fix3d,
}

impl GpsFix {
    /// Map the wire fix-quality code to its symbolic state
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(GpsFix::None),
            2 => Ok(GpsFix::Fix2d),
            3 => Ok(GpsFix::Fix3d),
            other => Err(GpmfError::UnknownFixCode(other)),
        }
    }

    /// GPX `<fix>` element value
    pub fn as_gpx_str(&self) -> &'static str {
        match self {
            GpsFix::None => "none",
            GpsFix::Fix2d => "2d",
            GpsFix::Fix3d => "3d",
        }
    }
}

/// One scaled, time-stamped geodetic sample decoded from a GPS stream block
///
/// Times are naive UTC; GPMF carries no zone offset.
#[derive(Debug, Clone)]
pub struct GpsSample {
    pub time: NaiveDateTime,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub speed_2d: f64,
    pub speed_3d: f64,
    pub dop: f64,
    pub fix: GpsFix,
    pub stream_name: String,
    pub unit: String,
    pub accuracy: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_from_code() {
        assert_eq!(GpsFix::from_code(0).unwrap(), GpsFix::None);
        assert_eq!(GpsFix::from_code(2).unwrap(), GpsFix::Fix2d);
        assert_eq!(GpsFix::from_code(3).unwrap(), GpsFix::Fix3d);
        assert!(matches!(
            GpsFix::from_code(1),
            Err(GpmfError::UnknownFixCode(1))
        ));
        assert!(matches!(
            GpsFix::from_code(-7),
            Err(GpmfError::UnknownFixCode(-7))
        ));
    }

    #[test]
    fn test_fix_gpx_strings() {
        assert_eq!(GpsFix::None.as_gpx_str(), "none");
        assert_eq!(GpsFix::Fix2d.as_gpx_str(), "2d");
        assert_eq!(GpsFix::Fix3d.as_gpx_str(), "3d");
    }
}
