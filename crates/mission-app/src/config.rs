//! Application configuration from environment.

use mission_core::InsertChaining;
use mission_sdk::{LinkConfig, WaypointDefaults};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub db_max_connections: u32,
    /// Vendor SDK app key. Registration is refused without one.
    pub app_key: Option<String>,
    pub bridge_ip: Option<String>,
    /// `0` disables the aircraft connection timeout.
    pub aircraft_timeout_secs: u64,
    pub default_altitude_m: f64,
    pub insert_chaining: InsertChaining,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            db_path: env::var("MISSIONS_DB_PATH")
                .unwrap_or_else(|_| "data/missions.db".to_string()),
            db_max_connections: env::var("MISSIONS_DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            app_key: env::var("DJI_APP_KEY").ok().filter(|s| !s.trim().is_empty()),
            bridge_ip: env::var("MISSIONS_BRIDGE_IP")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            aircraft_timeout_secs: env::var("MISSIONS_AIRCRAFT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            default_altitude_m: env::var("MISSIONS_DEFAULT_ALTITUDE_M")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30.0),
            insert_chaining: env::var("MISSIONS_INSERT_CHAINING")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }

    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            app_key: self.app_key.clone(),
            aircraft_timeout: match self.aircraft_timeout_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        }
    }

    pub fn waypoint_defaults(&self) -> WaypointDefaults {
        WaypointDefaults {
            altitude_m: self.default_altitude_m,
            ..WaypointDefaults::default()
        }
    }
}
