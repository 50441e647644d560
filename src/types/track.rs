use chrono::NaiveDateTime;

use crate::types::GpsFix;

/// One geolocated track point with auxiliary GPMF attributes
///
/// Points read back from foreign GPX files during a merge may lack a
/// timestamp, hence the `Option`.
#[derive(Debug, Clone)]
pub struct TrackPoint {
    pub time: Option<NaiveDateTime>,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    pub dop: f64,
    pub fix: GpsFix,
    pub speed_2d: f64,
    pub speed_3d: f64,
    pub name: String,
    pub unit: String,
    pub accuracy: String,
}

impl TrackPoint {
    /// A bare coordinate with every auxiliary attribute defaulted
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            time: None,
            latitude,
            longitude,
            elevation: 0.0,
            dop: 0.0,
            fix: GpsFix::None,
            speed_2d: 0.0,
            speed_3d: 0.0,
            name: String::new(),
            unit: String::new(),
            accuracy: String::new(),
        }
    }
}

/// Ordered sequence of track points; never reordered after creation
#[derive(Debug, Clone, Default)]
pub struct TrackSegment {
    pub points: Vec<TrackPoint>,
}

impl TrackSegment {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Append another segment's points, preserving both internal orders
    pub fn extend(&mut self, other: TrackSegment) {
        self.points.extend(other.points);
    }
}

/// Ordered segments making up one logical track
#[derive(Debug, Clone, Default)]
pub struct Track {
    pub segments: Vec<TrackSegment>,
}

impl Track {
    pub fn push_segment(&mut self, segment: TrackSegment) {
        self.segments.push(segment);
    }

    /// Total point count across all segments
    pub fn point_count(&self) -> usize {
        self.segments.iter().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.point_count() == 0
    }
}
