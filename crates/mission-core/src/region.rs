//! Initial map framing for a mission.

use crate::models::{Coordinate, MissionPoint};
use serde::{Deserialize, Serialize};

/// Padding applied to each axis of the points' bounding box.
pub const SPAN_PADDING_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CoordinateSpan {
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

/// Visible map area: a center and the extent around it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MapRegion {
    pub center: Coordinate,
    pub span: CoordinateSpan,
}

impl MapRegion {
    pub fn new(center: Coordinate, span: CoordinateSpan) -> Self {
        Self { center, span }
    }
}

/// Smallest region containing every point, padded by [`SPAN_PADDING_FACTOR`].
///
/// Returns `None` for an empty set so the caller's default region applies.
pub fn bounding_region(points: &[MissionPoint]) -> Option<MapRegion> {
    bounding_region_with_padding(points, SPAN_PADDING_FACTOR)
}

/// Like [`bounding_region`] with an explicit per-axis padding factor.
pub fn bounding_region_with_padding(points: &[MissionPoint], padding: f64) -> Option<MapRegion> {
    let first = points.first()?.coordinate;

    let (min, max) = points.iter().map(|p| p.coordinate).fold(
        (first, first),
        |(min, max), c| {
            (
                Coordinate::new(min.latitude.min(c.latitude), min.longitude.min(c.longitude)),
                Coordinate::new(max.latitude.max(c.latitude), max.longitude.max(c.longitude)),
            )
        },
    );

    let center = Coordinate::new(
        (max.latitude + min.latitude) / 2.0,
        (max.longitude + min.longitude) / 2.0,
    );
    let span = CoordinateSpan {
        latitude_delta: (max.latitude - min.latitude) * padding,
        longitude_delta: (max.longitude - min.longitude) * padding,
    };

    Some(MapRegion { center, span })
}
