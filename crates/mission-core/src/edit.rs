//! Edit-mode state machine for the mission editor.
//!
//! The editor decides which controls are visible and which map interactions
//! are allowed. It mutates a [`Mission`] only on `confirm` and
//! `delete_selected`; every other transition is view-local.

use crate::models::{Coordinate, Mission, MissionPoint, PointId};
use crate::region::bounding_region;
use crate::sync::MapEvent;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

/// Which point-editing interaction is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "point", rename_all = "snake_case")]
pub enum EditMode {
    Viewing,
    InsertingFirstPoint,
    InsertingBefore(PointId),
    InsertingAfter(PointId),
    MovingPoint(PointId),
}

impl EditMode {
    pub fn is_editing(&self) -> bool {
        !matches!(self, EditMode::Viewing)
    }

    /// The point the current edit is anchored on, if any.
    pub fn anchor(&self) -> Option<PointId> {
        match self {
            EditMode::InsertingBefore(id)
            | EditMode::InsertingAfter(id)
            | EditMode::MovingPoint(id) => Some(*id),
            EditMode::Viewing | EditMode::InsertingFirstPoint => None,
        }
    }
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditMode::Viewing => write!(f, "viewing"),
            EditMode::InsertingFirstPoint => write!(f, "inserting first point"),
            EditMode::InsertingBefore(id) => write!(f, "inserting before {}", id),
            EditMode::InsertingAfter(id) => write!(f, "inserting after {}", id),
            EditMode::MovingPoint(id) => write!(f, "moving {}", id),
        }
    }
}

/// What happens after a confirmed insert before/after a point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsertChaining {
    /// Stay in the same mode, anchored on the point just created.
    #[default]
    Chained,
    /// Go back to viewing after one insert.
    Single,
}

impl FromStr for InsertChaining {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chained" => Ok(InsertChaining::Chained),
            "single" => Ok(InsertChaining::Single),
            other => Err(format!("unknown insert chaining {:?}", other)),
        }
    }
}

/// Contextual actions offered for a selected point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextAction {
    InsertBefore,
    InsertAfter,
    Move,
    Delete,
}

/// Effect of an edit on the mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Unchanged,
    Inserted(PointId),
    Moved(PointId),
    Deleted(PointId),
}

impl EditOutcome {
    /// Whether the mission changed and needs saving.
    pub fn mutated(&self) -> bool {
        !matches!(self, EditOutcome::Unchanged)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error("no point is selected")]
    NoSelection,
    #[error("action is only available while viewing (currently {0})")]
    NotViewing(EditMode),
    #[error("nothing to confirm while viewing")]
    NothingToConfirm,
    #[error("point {0} is not part of the mission")]
    UnknownPoint(PointId),
    #[error("mission has no point at index {0}")]
    NoPointAtIndex(usize),
    #[error("mission already has points")]
    MissionNotEmpty,
    #[error("invalid edit action {0:?}")]
    InvalidAction(String),
}

/// Reference to a point either by identity or by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointRef {
    Id(PointId),
    Index(usize),
}

impl PointRef {
    fn resolve(&self, mission: &Mission) -> Result<PointId, EditError> {
        match *self {
            PointRef::Id(id) => Ok(id),
            PointRef::Index(index) => mission
                .points
                .get(index)
                .map(|p| p.id)
                .ok_or(EditError::NoPointAtIndex(index)),
        }
    }
}

/// A single user gesture, as produced by the UI or a script.
///
/// Text form is `verb[:argument]`, e.g. `pan:40.69,-74.04`, `select:0`,
/// `insert-after`, `confirm`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditAction {
    Pan(Coordinate),
    Select(PointRef),
    Deselect,
    BeginFirstPoint,
    InsertBefore,
    InsertAfter,
    Move,
    Delete,
    Confirm,
    Cancel,
}

impl FromStr for EditAction {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (verb, arg) = match s.split_once(':') {
            Some((verb, arg)) => (verb, Some(arg.trim())),
            None => (s, None),
        };
        let invalid = || EditError::InvalidAction(s.to_string());

        let action = match (verb.to_ascii_lowercase().as_str(), arg) {
            ("pan", Some(arg)) => EditAction::Pan(arg.parse().map_err(|_| invalid())?),
            ("select", Some(arg)) => {
                let target = match arg.parse::<usize>() {
                    Ok(index) => PointRef::Index(index),
                    Err(_) => PointRef::Id(arg.parse().map_err(|_| invalid())?),
                };
                EditAction::Select(target)
            }
            ("deselect", None) => EditAction::Deselect,
            ("first-point", None) => EditAction::BeginFirstPoint,
            ("insert-before", None) => EditAction::InsertBefore,
            ("insert-after", None) => EditAction::InsertAfter,
            ("move", None) => EditAction::Move,
            ("delete", None) => EditAction::Delete,
            ("confirm", None) => EditAction::Confirm,
            ("cancel", None) | ("done", None) => EditAction::Cancel,
            _ => return Err(invalid()),
        };
        Ok(action)
    }
}

/// View-local editing state for one mission.
#[derive(Debug, Clone)]
pub struct MissionEditor {
    mode: EditMode,
    selected: Option<PointId>,
    center: Coordinate,
    chaining: InsertChaining,
}

impl MissionEditor {
    /// Start viewing when the mission has points, otherwise ask for the first one.
    pub fn new(mission: &Mission) -> Self {
        let mode = if mission.is_empty() {
            EditMode::InsertingFirstPoint
        } else {
            EditMode::Viewing
        };
        let center = bounding_region(&mission.points)
            .map(|region| region.center)
            .unwrap_or_default();
        debug!(mission_id = %mission.id, %mode, "editor opened");

        Self {
            mode,
            selected: None,
            center,
            chaining: InsertChaining::default(),
        }
    }

    pub fn with_chaining(mut self, chaining: InsertChaining) -> Self {
        self.chaining = chaining;
        self
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn selected(&self) -> Option<PointId> {
        self.selected
    }

    pub fn center(&self) -> Coordinate {
        self.center
    }

    pub fn chaining(&self) -> InsertChaining {
        self.chaining
    }

    /// The target indicator is shown exactly while an edit is in progress.
    pub fn crosshair_visible(&self) -> bool {
        self.mode.is_editing()
    }

    pub fn selection_controls_visible(&self) -> bool {
        !self.mode.is_editing() && self.selected.is_some()
    }

    pub fn available_actions(&self) -> Vec<ContextAction> {
        if self.selection_controls_visible() {
            vec![
                ContextAction::InsertBefore,
                ContextAction::InsertAfter,
                ContextAction::Move,
                ContextAction::Delete,
            ]
        } else {
            Vec::new()
        }
    }

    pub fn set_center(&mut self, center: Coordinate) {
        self.center = center;
    }

    /// Select a point. Ignored while an edit is in progress.
    pub fn select(&mut self, mission: &Mission, id: PointId) -> Result<EditOutcome, EditError> {
        if self.mode.is_editing() {
            debug!(point_id = %id, mode = %self.mode, "selection ignored while editing");
            return Ok(EditOutcome::Unchanged);
        }
        if !mission.contains(id) {
            return Err(EditError::UnknownPoint(id));
        }
        self.selected = Some(id);
        Ok(EditOutcome::Unchanged)
    }

    pub fn deselect(&mut self) -> Result<EditOutcome, EditError> {
        if !self.mode.is_editing() {
            self.selected = None;
        }
        Ok(EditOutcome::Unchanged)
    }

    pub fn begin_first_point(&mut self, mission: &Mission) -> Result<EditOutcome, EditError> {
        if self.mode.is_editing() {
            return Err(EditError::NotViewing(self.mode));
        }
        if !mission.is_empty() {
            return Err(EditError::MissionNotEmpty);
        }
        self.selected = None;
        self.mode = EditMode::InsertingFirstPoint;
        Ok(EditOutcome::Unchanged)
    }

    pub fn begin_insert_before(&mut self) -> Result<EditOutcome, EditError> {
        let anchor = self.take_selection()?;
        self.mode = EditMode::InsertingBefore(anchor);
        Ok(EditOutcome::Unchanged)
    }

    pub fn begin_insert_after(&mut self) -> Result<EditOutcome, EditError> {
        let anchor = self.take_selection()?;
        self.mode = EditMode::InsertingAfter(anchor);
        Ok(EditOutcome::Unchanged)
    }

    pub fn begin_move(&mut self) -> Result<EditOutcome, EditError> {
        let anchor = self.take_selection()?;
        self.mode = EditMode::MovingPoint(anchor);
        Ok(EditOutcome::Unchanged)
    }

    /// Remove the selected point from the mission.
    pub fn delete_selected(&mut self, mission: &mut Mission) -> Result<EditOutcome, EditError> {
        let id = self.take_selection()?;
        match mission.remove(id) {
            Some(_) => Ok(EditOutcome::Deleted(id)),
            None => {
                warn!(point_id = %id, "selected point vanished before delete");
                Ok(EditOutcome::Unchanged)
            }
        }
    }

    /// Apply the pending edit at the current map center.
    pub fn confirm(&mut self, mission: &mut Mission) -> Result<EditOutcome, EditError> {
        match self.mode {
            EditMode::Viewing => Err(EditError::NothingToConfirm),
            EditMode::InsertingFirstPoint => {
                let point = MissionPoint::at(self.center);
                let id = point.id;
                mission.append(point);
                self.mode = EditMode::InsertingAfter(id);
                Ok(EditOutcome::Inserted(id))
            }
            EditMode::InsertingBefore(anchor) => {
                let id = self.insert_relative(mission, anchor, 0);
                self.mode = match self.chaining {
                    InsertChaining::Chained => EditMode::InsertingBefore(id),
                    InsertChaining::Single => EditMode::Viewing,
                };
                Ok(EditOutcome::Inserted(id))
            }
            EditMode::InsertingAfter(anchor) => {
                let id = self.insert_relative(mission, anchor, 1);
                self.mode = match self.chaining {
                    InsertChaining::Chained => EditMode::InsertingAfter(id),
                    InsertChaining::Single => EditMode::Viewing,
                };
                Ok(EditOutcome::Inserted(id))
            }
            EditMode::MovingPoint(id) => {
                self.mode = EditMode::Viewing;
                match mission.point_mut(id) {
                    Some(point) => {
                        point.coordinate = self.center;
                        Ok(EditOutcome::Moved(id))
                    }
                    None => {
                        warn!(point_id = %id, "point vanished before move was confirmed");
                        Ok(EditOutcome::Unchanged)
                    }
                }
            }
        }
    }

    /// Abandon the pending edit. The mission is untouched.
    pub fn cancel(&mut self) -> Result<EditOutcome, EditError> {
        self.mode = EditMode::Viewing;
        Ok(EditOutcome::Unchanged)
    }

    /// Feed back a map interaction.
    pub fn handle_map_event(
        &mut self,
        mission: &Mission,
        event: MapEvent,
    ) -> Result<EditOutcome, EditError> {
        match event {
            MapEvent::RegionChanged(region) => {
                self.set_center(region.center);
                Ok(EditOutcome::Unchanged)
            }
            MapEvent::MarkerSelected(id) => self.select(mission, id),
            MapEvent::MarkerDeselected => self.deselect(),
        }
    }

    pub fn apply(
        &mut self,
        mission: &mut Mission,
        action: EditAction,
    ) -> Result<EditOutcome, EditError> {
        match action {
            EditAction::Pan(center) => {
                self.set_center(center);
                Ok(EditOutcome::Unchanged)
            }
            EditAction::Select(target) => {
                let id = target.resolve(mission)?;
                self.select(mission, id)
            }
            EditAction::Deselect => self.deselect(),
            EditAction::BeginFirstPoint => self.begin_first_point(mission),
            EditAction::InsertBefore => self.begin_insert_before(),
            EditAction::InsertAfter => self.begin_insert_after(),
            EditAction::Move => self.begin_move(),
            EditAction::Delete => self.delete_selected(mission),
            EditAction::Confirm => self.confirm(mission),
            EditAction::Cancel => self.cancel(),
        }
    }

    fn take_selection(&mut self) -> Result<PointId, EditError> {
        if self.mode.is_editing() {
            return Err(EditError::NotViewing(self.mode));
        }
        self.selected.take().ok_or(EditError::NoSelection)
    }

    fn insert_relative(&self, mission: &mut Mission, anchor: PointId, offset: usize) -> PointId {
        let point = MissionPoint::at(self.center);
        let id = point.id;
        match mission.index_of(anchor) {
            Some(index) => mission.insert_at(index + offset, point),
            None => {
                warn!(anchor = %anchor, "anchor point missing, appending new point instead");
                mission.append(point);
            }
        }
        id
    }
}
