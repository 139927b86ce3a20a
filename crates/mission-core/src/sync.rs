//! Keeps a rendered map in step with a mission's point sequence.
//!
//! The map is reached through [`MapSurface`]; updates are incremental so a
//! single point change never redraws every marker or the whole path.

use crate::models::{Coordinate, Mission, MissionPoint, PointId};
use crate::region::{bounding_region, MapRegion};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Decimal places used when comparing rendered and model coordinates (~0.11 m).
pub const PATH_PRECISION_DECIMALS: i32 = 6;

/// A point marker as displayed on the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub id: PointId,
    pub coordinate: Coordinate,
}

impl From<&MissionPoint> for Marker {
    fn from(point: &MissionPoint) -> Self {
        Self {
            id: point.id,
            coordinate: point.coordinate,
        }
    }
}

/// Observations reported by the map. The map owns none of this state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapEvent {
    /// The user panned or zoomed.
    RegionChanged(MapRegion),
    MarkerSelected(PointId),
    MarkerDeselected,
}

/// A map capable of showing point markers and one connecting path.
pub trait MapSurface {
    fn set_region(&mut self, region: MapRegion);

    fn markers(&self) -> Vec<Marker>;
    fn add_markers(&mut self, markers: &[Marker]);
    fn remove_markers(&mut self, ids: &[PointId]);
    fn move_marker(&mut self, id: PointId, coordinate: Coordinate);

    /// Vertices of the displayed path overlay, if one is shown.
    fn path(&self) -> Option<Vec<Coordinate>>;
    fn add_path(&mut self, path: Vec<Coordinate>);
    fn remove_path(&mut self);

    fn select_marker(&mut self, id: PointId);
    fn deselect_marker(&mut self, id: PointId);
    fn selected_markers(&self) -> Vec<PointId>;
}

/// What an update changed on the surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub markers_added: usize,
    pub markers_removed: usize,
    pub markers_moved: usize,
    pub path_rebuilt: bool,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        *self == SyncReport::default()
    }
}

fn rounded(value: f64) -> i64 {
    (value * 10f64.powi(PATH_PRECISION_DECIMALS)).round() as i64
}

fn same_position(a: Coordinate, b: Coordinate) -> bool {
    rounded(a.latitude) == rounded(b.latitude) && rounded(a.longitude) == rounded(b.longitude)
}

/// Whether `path` already traces `points`, at 6-decimal precision.
pub fn path_matches(path: &[Coordinate], points: &[MissionPoint]) -> bool {
    path.len() == points.len()
        && path
            .iter()
            .zip(points)
            .all(|(vertex, point)| same_position(*vertex, point.coordinate))
}

#[derive(Debug, Default)]
pub struct MapSync {
    framed: bool,
}

impl MapSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the initial region has been applied.
    pub fn is_framed(&self) -> bool {
        self.framed
    }

    /// Frame the mission and draw everything. An empty mission keeps the
    /// surface's default region.
    pub fn first_render<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        mission: &Mission,
    ) -> SyncReport {
        if let Some(region) = bounding_region(&mission.points) {
            debug!(
                lat = region.center.latitude,
                lon = region.center.longitude,
                "framing mission"
            );
            surface.set_region(region);
        }
        self.framed = true;
        self.update(surface, mission, None)
    }

    /// Reconcile the surface with the mission after a model change.
    pub fn update<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        mission: &Mission,
        selected: Option<PointId>,
    ) -> SyncReport {
        let mut report = sync_markers(surface, &mission.points);
        report.path_rebuilt = sync_path(surface, &mission.points);
        // Markers first: a bulk redraw drops the surface's selection.
        sync_selection(surface, selected);
        trace!(?report, "map synchronized");
        report
    }
}

fn sync_selection<S: MapSurface + ?Sized>(surface: &mut S, selected: Option<PointId>) {
    let current = surface.selected_markers();
    for id in current.iter().filter(|id| Some(**id) != selected) {
        surface.deselect_marker(*id);
    }
    if let Some(id) = selected {
        if !current.contains(&id) {
            surface.select_marker(id);
        }
    }
}

fn sync_markers<S: MapSurface + ?Sized>(surface: &mut S, points: &[MissionPoint]) -> SyncReport {
    let displayed = surface.markers();
    let mut report = SyncReport::default();

    // Bulk change: cheaper to redraw than to diff.
    if displayed.len().abs_diff(points.len()) > 1 {
        let stale: Vec<PointId> = displayed.iter().map(|m| m.id).collect();
        let fresh: Vec<Marker> = points.iter().map(Marker::from).collect();
        if !stale.is_empty() {
            surface.remove_markers(&stale);
        }
        surface.add_markers(&fresh);
        report.markers_removed = stale.len();
        report.markers_added = fresh.len();
        return report;
    }

    let model_ids: HashSet<PointId> = points.iter().map(|p| p.id).collect();
    let shown: HashMap<PointId, Coordinate> =
        displayed.iter().map(|m| (m.id, m.coordinate)).collect();

    let stale: Vec<PointId> = displayed
        .iter()
        .map(|m| m.id)
        .filter(|id| !model_ids.contains(id))
        .collect();
    if !stale.is_empty() {
        surface.remove_markers(&stale);
    }

    let fresh: Vec<Marker> = points
        .iter()
        .filter(|p| !shown.contains_key(&p.id))
        .map(Marker::from)
        .collect();
    if !fresh.is_empty() {
        surface.add_markers(&fresh);
    }

    for point in points {
        if let Some(coordinate) = shown.get(&point.id) {
            if !same_position(*coordinate, point.coordinate) {
                surface.move_marker(point.id, point.coordinate);
                report.markers_moved += 1;
            }
        }
    }

    report.markers_removed = stale.len();
    report.markers_added = fresh.len();
    report
}

fn sync_path<S: MapSurface + ?Sized>(surface: &mut S, points: &[MissionPoint]) -> bool {
    match surface.path() {
        Some(path) if !points.is_empty() && path_matches(&path, points) => false,
        Some(_) => {
            surface.remove_path();
            if !points.is_empty() {
                surface.add_path(points.iter().map(|p| p.coordinate).collect());
            }
            true
        }
        None if points.is_empty() => false,
        None => {
            surface.add_path(points.iter().map(|p| p.coordinate).collect());
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingMap {
        region: Option<MapRegion>,
        markers: Vec<Marker>,
        path: Option<Vec<Coordinate>>,
        selected: Vec<PointId>,
        paths_added: usize,
    }

    impl MapSurface for RecordingMap {
        fn set_region(&mut self, region: MapRegion) {
            self.region = Some(region);
        }

        fn markers(&self) -> Vec<Marker> {
            self.markers.clone()
        }

        fn add_markers(&mut self, markers: &[Marker]) {
            self.markers.extend_from_slice(markers);
        }

        fn remove_markers(&mut self, ids: &[PointId]) {
            self.markers.retain(|m| !ids.contains(&m.id));
            self.selected.retain(|id| !ids.contains(id));
        }

        fn move_marker(&mut self, id: PointId, coordinate: Coordinate) {
            if let Some(marker) = self.markers.iter_mut().find(|m| m.id == id) {
                marker.coordinate = coordinate;
            }
        }

        fn path(&self) -> Option<Vec<Coordinate>> {
            self.path.clone()
        }

        fn add_path(&mut self, path: Vec<Coordinate>) {
            self.paths_added += 1;
            self.path = Some(path);
        }

        fn remove_path(&mut self) {
            self.path = None;
        }

        fn select_marker(&mut self, id: PointId) {
            self.selected = vec![id];
        }

        fn deselect_marker(&mut self, id: PointId) {
            self.selected.retain(|s| *s != id);
        }

        fn selected_markers(&self) -> Vec<PointId> {
            self.selected.clone()
        }
    }

    fn liberty_island() -> Mission {
        Mission::new().with_points(vec![
            MissionPoint::new(40.691265, -74.047328),
            MissionPoint::new(40.690484, -74.043004),
            MissionPoint::new(40.688296, -74.045483),
            MissionPoint::new(40.691265, -74.047328),
        ])
    }

    fn rendered(mission: &Mission) -> (MapSync, RecordingMap) {
        let mut sync = MapSync::new();
        let mut map = RecordingMap::default();
        sync.first_render(&mut map, mission);
        (sync, map)
    }

    #[test]
    fn test_first_render_frames_and_draws() {
        let mission = liberty_island();
        let (sync, map) = rendered(&mission);

        assert!(sync.is_framed());
        assert_eq!(map.region, bounding_region(&mission.points));
        assert_eq!(map.markers.len(), 4);
        assert_eq!(map.path.as_deref(), Some(mission.coordinates().as_slice()));
    }

    #[test]
    fn test_first_render_of_empty_mission_sets_no_region() {
        let (_, map) = rendered(&Mission::new());
        assert!(map.region.is_none());
        assert!(map.markers.is_empty());
        assert!(map.path.is_none());
    }

    #[test]
    fn test_repeated_update_is_idempotent() {
        let mission = liberty_island();
        let (mut sync, mut map) = rendered(&mission);

        let first = sync.update(&mut map, &mission, None);
        let second = sync.update(&mut map, &mission, None);

        assert!(first.is_noop());
        assert!(second.is_noop());
        assert_eq!(map.paths_added, 1);
    }

    #[test]
    fn test_float_noise_does_not_rebuild_path() {
        let mut mission = liberty_island();
        let (mut sync, mut map) = rendered(&mission);

        mission.points[1].coordinate.latitude += 1e-9;
        let report = sync.update(&mut map, &mission, None);

        assert!(!report.path_rebuilt);
        assert_eq!(report.markers_moved, 0);
    }

    #[test]
    fn test_adding_one_point_adds_one_marker() {
        let mut mission = liberty_island();
        let (mut sync, mut map) = rendered(&mission);

        mission.insert_at(2, MissionPoint::new(40.6895, -74.0445));
        let report = sync.update(&mut map, &mission, None);

        assert_eq!(report.markers_added, 1);
        assert_eq!(report.markers_removed, 0);
        assert!(report.path_rebuilt);
        assert_eq!(map.path.as_deref(), Some(mission.coordinates().as_slice()));
    }

    #[test]
    fn test_deleting_one_point_removes_one_marker() {
        let mut mission = liberty_island();
        let (mut sync, mut map) = rendered(&mission);

        let gone = mission.points[0].id;
        mission.remove(gone);
        let report = sync.update(&mut map, &mission, None);

        assert_eq!(report.markers_added, 0);
        assert_eq!(report.markers_removed, 1);
        assert!(map.markers.iter().all(|m| m.id != gone));
        assert!(report.path_rebuilt);
    }

    #[test]
    fn test_bulk_change_redraws_all_markers() {
        let mission = liberty_island();
        let mut sync = MapSync::new();
        let mut map = RecordingMap::default();
        map.add_markers(&[Marker::from(&MissionPoint::new(0.0, 0.0))]);

        let report = sync.update(&mut map, &mission, None);

        assert_eq!(report.markers_removed, 1);
        assert_eq!(report.markers_added, 4);
        assert_eq!(map.markers.len(), 4);
    }

    #[test]
    fn test_bulk_redraw_keeps_selection() {
        let mission = liberty_island();
        let mut sync = MapSync::new();
        let mut map = RecordingMap::default();
        map.add_markers(&[Marker::from(&MissionPoint::new(0.0, 0.0))]);
        let id = mission.points[0].id;

        sync.update(&mut map, &mission, Some(id));

        assert_eq!(map.markers.len(), 4);
        assert_eq!(map.selected_markers(), vec![id]);
    }

    #[test]
    fn test_moved_point_moves_marker_in_place() {
        let mut mission = liberty_island();
        let (mut sync, mut map) = rendered(&mission);

        let id = mission.points[2].id;
        mission.points[2].coordinate = Coordinate::new(40.7, -74.05);
        let report = sync.update(&mut map, &mission, None);

        assert_eq!(report.markers_moved, 1);
        assert_eq!(report.markers_added, 0);
        assert!(report.path_rebuilt);
        let marker = map.markers.iter().find(|m| m.id == id).unwrap();
        assert_eq!(marker.coordinate, Coordinate::new(40.7, -74.05));
    }

    #[test]
    fn test_emptied_mission_removes_path() {
        let mut mission = Mission::new().with_points(vec![MissionPoint::new(1.0, 1.0)]);
        let (mut sync, mut map) = rendered(&mission);

        mission.points.clear();
        let report = sync.update(&mut map, &mission, None);

        assert!(report.path_rebuilt);
        assert!(map.path.is_none());
        assert!(map.markers.is_empty());
    }

    #[test]
    fn test_selection_follows_model() {
        let mission = liberty_island();
        let (mut sync, mut map) = rendered(&mission);
        let id = mission.points[1].id;

        sync.update(&mut map, &mission, Some(id));
        assert_eq!(map.selected_markers(), vec![id]);

        sync.update(&mut map, &mission, None);
        assert!(map.selected_markers().is_empty());
    }

    #[test]
    fn test_path_matches_rounds_to_six_decimals() {
        let points = vec![MissionPoint::new(1.0000001, 2.0)];
        assert!(path_matches(&[Coordinate::new(1.0, 2.0)], &points));
        assert!(!path_matches(&[Coordinate::new(1.00001, 2.0)], &points));
        assert!(!path_matches(&[], &points));
    }
}
