//! Mission store: DashMap cache written through to SQLite.

use crate::persistence::{missions, Database};
use anyhow::{bail, Result};
use dashmap::DashMap;
use mission_core::{Mission, MissionId};
use tracing::{debug, info, warn};

/// Application state - thread-safe store for missions.
pub struct AppState {
    missions: DashMap<MissionId, Mission>,
    db: Option<Database>,
}

impl AppState {
    /// Memory-only store.
    pub fn new() -> Self {
        Self {
            missions: DashMap::new(),
            db: None,
        }
    }

    /// Store backed by `db`, preloaded with everything it holds.
    pub async fn with_database(db: Database) -> Result<Self> {
        let loaded = missions::load_missions(db.pool()).await?;
        info!(count = loaded.len(), "loaded missions");

        let state = Self {
            missions: DashMap::new(),
            db: Some(db),
        };
        for mission in loaded {
            state.missions.insert(mission.id, mission);
        }
        Ok(state)
    }

    /// Create an empty mission timestamped now.
    pub async fn create_mission(&self, name: Option<String>) -> Mission {
        let mut mission = Mission::new();
        mission.name = name;
        info!(mission_id = %mission.id, "created mission");
        self.persist_mission(&mission).await;
        mission
    }

    /// All missions, oldest first.
    pub fn list_missions(&self) -> Vec<Mission> {
        let mut all: Vec<Mission> = self.missions.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        all
    }

    pub fn get_mission(&self, id: MissionId) -> Option<Mission> {
        self.missions.get(&id).map(|r| r.value().clone())
    }

    /// Look a mission up by full ID or an unambiguous ID prefix.
    pub fn find_mission(&self, key: &str) -> Result<Mission> {
        if let Ok(id) = key.parse::<MissionId>() {
            if let Some(mission) = self.get_mission(id) {
                return Ok(mission);
            }
        }

        let key = key.to_ascii_lowercase();
        let mut matches: Vec<Mission> = self
            .missions
            .iter()
            .filter(|r| r.key().to_string().starts_with(&key))
            .map(|r| r.value().clone())
            .collect();

        match matches.len() {
            0 => bail!("no mission matches {:?}", key),
            1 => Ok(matches.remove(0)),
            n => bail!("{} missions match {:?}, use a longer prefix", n, key),
        }
    }

    /// Cache `mission` and write it through. Storage failures are logged only.
    pub async fn persist_mission(&self, mission: &Mission) {
        self.missions.insert(mission.id, mission.clone());

        let Some(db) = &self.db else {
            return;
        };
        match missions::save_mission(db.pool(), mission).await {
            Ok(()) => debug!(mission_id = %mission.id, points = mission.len(), "mission saved"),
            Err(e) => warn!(mission_id = %mission.id, "Failed to persist mission: {}", e),
        }
    }

    /// Remove a mission with all its points.
    pub async fn delete_mission(&self, id: MissionId) -> Result<bool> {
        let cached = self.missions.remove(&id).is_some();
        let stored = match &self.db {
            Some(db) => missions::delete_mission(db.pool(), id).await?,
            None => false,
        };
        if cached || stored {
            info!(mission_id = %id, "deleted mission");
        }
        Ok(cached || stored)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
