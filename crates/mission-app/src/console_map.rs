//! Text-mode map surface for the CLI.

use mission_core::{Coordinate, MapRegion, MapSurface, Marker, Mission, MissionEditor, PointId};
use std::fmt::Write;

/// A [`MapSurface`] that keeps its overlays in memory and renders them as text.
#[derive(Debug, Clone, Default)]
pub struct ConsoleMap {
    region: Option<MapRegion>,
    markers: Vec<Marker>,
    path: Option<Vec<Coordinate>>,
    selected: Vec<PointId>,
}

impl ConsoleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn region(&self) -> Option<MapRegion> {
        self.region
    }

    /// Render the mission as drawn on this surface.
    pub fn render(&self, mission: &Mission, editor: &MissionEditor) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} ({} points)", mission.title(), mission.len());

        match self.region {
            Some(region) => {
                let _ = writeln!(
                    out,
                    "region: {} span {:.6} x {:.6}",
                    region.center, region.span.latitude_delta, region.span.longitude_delta
                );
            }
            None => {
                let _ = writeln!(out, "region: default");
            }
        }
        let _ = writeln!(out, "mode: {}", editor.mode());

        for (index, point) in mission.points.iter().enumerate() {
            let shown = self.markers.iter().any(|m| m.id == point.id);
            let flag = match (self.selected.contains(&point.id), shown) {
                (true, _) => "*",
                (false, true) => " ",
                (false, false) => "?",
            };
            let _ = writeln!(out, "{} {:>2}. {}", flag, index, point.coordinate);
        }

        if let Some(path) = &self.path {
            let _ = writeln!(out, "path: {} vertices", path.len());
        }
        if editor.crosshair_visible() {
            let _ = writeln!(out, "crosshair: {}", editor.center());
        }
        if editor.selection_controls_visible() {
            let actions: Vec<String> = editor
                .available_actions()
                .iter()
                .map(|a| format!("{:?}", a))
                .collect();
            let _ = writeln!(out, "actions: {}", actions.join(", "));
        }
        out
    }
}

impl MapSurface for ConsoleMap {
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
        self.path = Some(path);
    }

    fn remove_path(&mut self) {
        self.path = None;
    }

    fn select_marker(&mut self, id: PointId) {
        if !self.selected.contains(&id) {
            self.selected.push(id);
        }
    }

    fn deselect_marker(&mut self, id: PointId) {
        self.selected.retain(|s| *s != id);
    }

    fn selected_markers(&self) -> Vec<PointId> {
        self.selected.clone()
    }
}
