//! One mission open for editing on one map surface.

use mission_core::{
    EditAction, EditError, EditOutcome, InsertChaining, MapEvent, MapSurface, MapSync, Mission,
    MissionEditor,
};
use tracing::debug;

/// Binds a mission to its editor and keeps `surface` in step after every change.
pub struct EditSession<M: MapSurface> {
    mission: Mission,
    editor: MissionEditor,
    sync: MapSync,
    surface: M,
}

impl<M: MapSurface> EditSession<M> {
    /// Open `mission` and draw it on `surface`.
    pub fn open(mission: Mission, mut surface: M, chaining: InsertChaining) -> Self {
        let editor = MissionEditor::new(&mission).with_chaining(chaining);
        let mut sync = MapSync::new();
        let report = sync.first_render(&mut surface, &mission);
        debug!(mission_id = %mission.id, ?report, mode = %editor.mode(), "edit session opened");

        Self {
            mission,
            editor,
            sync,
            surface,
        }
    }

    /// Run one gesture and resync the surface.
    pub fn apply(&mut self, action: EditAction) -> Result<EditOutcome, EditError> {
        let outcome = self.editor.apply(&mut self.mission, action)?;
        self.resync();
        Ok(outcome)
    }

    /// Feed back an interaction observed on the surface.
    pub fn handle_map_event(&mut self, event: MapEvent) -> Result<EditOutcome, EditError> {
        let outcome = self.editor.handle_map_event(&self.mission, event)?;
        self.resync();
        Ok(outcome)
    }

    pub fn mission(&self) -> &Mission {
        &self.mission
    }

    pub fn editor(&self) -> &MissionEditor {
        &self.editor
    }

    pub fn surface(&self) -> &M {
        &self.surface
    }

    pub fn into_mission(self) -> Mission {
        self.mission
    }

    fn resync(&mut self) {
        let report = self
            .sync
            .update(&mut self.surface, &self.mission, self.editor.selected());
        if !report.is_noop() {
            debug!(?report, "map updated");
        }
    }
}
