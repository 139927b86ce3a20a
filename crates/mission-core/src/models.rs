//! Core data models for missions and their waypoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stable identity of a mission point.
///
/// Points are matched by id, never by coordinate, so two points at the same
/// location (a closed loop) stay distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointId(Uuid);

impl PointId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PointId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PointId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissionId(Uuid);

impl MissionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for MissionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

impl FromStr for Coordinate {
    type Err = String;

    /// Parses `"lat,lon"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| format!("expected \"lat,lon\", got {:?}", s))?;
        let latitude: f64 = lat
            .trim()
            .parse()
            .map_err(|e| format!("invalid latitude {:?}: {}", lat, e))?;
        let longitude: f64 = lon
            .trim()
            .parse()
            .map_err(|e| format!("invalid longitude {:?}: {}", lon, e))?;
        Ok(Self { latitude, longitude })
    }
}

/// A single waypoint of a mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionPoint {
    pub id: PointId,
    pub coordinate: Coordinate,
}

impl MissionPoint {
    /// Create a point with a fresh identity.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self::at(Coordinate::new(latitude, longitude))
    }

    pub fn at(coordinate: Coordinate) -> Self {
        Self {
            id: PointId::new(),
            coordinate,
        }
    }
}

/// An ordered flight plan. Point order is flight order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,
    #[serde(default)]
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub points: Vec<MissionPoint>,
}

impl Mission {
    /// Create an empty mission timestamped now.
    pub fn new() -> Self {
        Self {
            id: MissionId::new(),
            name: None,
            created_at: Utc::now(),
            points: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_points(mut self, points: Vec<MissionPoint>) -> Self {
        self.points = points;
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn append(&mut self, point: MissionPoint) {
        self.points.push(point);
    }

    /// Insert at `index`, clamped to the end of the sequence.
    pub fn insert_at(&mut self, index: usize, point: MissionPoint) {
        let index = index.min(self.points.len());
        self.points.insert(index, point);
    }

    pub fn remove(&mut self, id: PointId) -> Option<MissionPoint> {
        let index = self.index_of(id)?;
        Some(self.points.remove(index))
    }

    pub fn index_of(&self, id: PointId) -> Option<usize> {
        self.points.iter().position(|p| p.id == id)
    }

    pub fn contains(&self, id: PointId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn point(&self, id: PointId) -> Option<&MissionPoint> {
        self.points.iter().find(|p| p.id == id)
    }

    pub fn point_mut(&mut self, id: PointId) -> Option<&mut MissionPoint> {
        self.points.iter_mut().find(|p| p.id == id)
    }

    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.points.iter().map(|p| p.coordinate).collect()
    }

    /// Label shown in mission lists: the name, or the creation timestamp.
    pub fn title(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl Default for Mission {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_points() -> Mission {
        Mission::new().with_points(vec![
            MissionPoint::new(1.0, 1.0),
            MissionPoint::new(2.0, 2.0),
            MissionPoint::new(3.0, 3.0),
        ])
    }

    #[test]
    fn insert_at_clamps_out_of_range_index() {
        let mut mission = three_points();
        let point = MissionPoint::new(9.0, 9.0);
        let id = point.id;

        mission.insert_at(42, point);

        assert_eq!(mission.len(), 4);
        assert_eq!(mission.index_of(id), Some(3));
    }

    #[test]
    fn remove_by_identity_keeps_coincident_points() {
        let a = MissionPoint::new(40.691265, -74.047328);
        let b = MissionPoint::new(40.691265, -74.047328);
        let b_id = b.id;
        let mut mission = Mission::new().with_points(vec![a.clone(), b]);

        let removed = mission.remove(a.id).expect("point removed");

        assert_eq!(removed.id, a.id);
        assert_eq!(mission.len(), 1);
        assert!(mission.contains(b_id));
    }

    #[test]
    fn coordinate_parses_lat_lon_pair() {
        let coord: Coordinate = "40.69, -74.04".parse().unwrap();
        assert_eq!(coord, Coordinate::new(40.69, -74.04));
        assert!("40.69".parse::<Coordinate>().is_err());
    }

    #[test]
    fn mission_serializes_points_in_order() {
        let mission = three_points();
        let json = serde_json::to_string(&mission).unwrap();
        let back: Mission = serde_json::from_str(&json).unwrap();
        assert_eq!(back.coordinates(), mission.coordinates());
    }
}
