//! Connection status and component availability reported by the drone link.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Lifecycle of SDK registration and aircraft connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum InitializationStatus {
    #[default]
    Disconnected,
    Registering,
    WaitingForAircraft,
    ConnectedToAircraft,
    RegistrationFailed(String),
    AircraftConnectionTimeout,
}

impl InitializationStatus {
    pub fn is_disconnected(&self) -> bool {
        matches!(self, InitializationStatus::Disconnected)
    }

    /// Registration started and has not settled into a final state yet.
    pub fn registration_underway(&self) -> bool {
        matches!(
            self,
            InitializationStatus::Registering | InitializationStatus::WaitingForAircraft
        )
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, InitializationStatus::ConnectedToAircraft)
    }

    pub fn is_error_state(&self) -> bool {
        matches!(
            self,
            InitializationStatus::RegistrationFailed(_)
                | InitializationStatus::AircraftConnectionTimeout
        )
    }
}

impl fmt::Display for InitializationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitializationStatus::Disconnected => write!(f, "Not started"),
            InitializationStatus::Registering => write!(f, "Registering"),
            InitializationStatus::WaitingForAircraft => write!(f, "Connecting to aircraft"),
            InitializationStatus::ConnectedToAircraft => write!(f, "Connected to aircraft"),
            InitializationStatus::RegistrationFailed(_) => write!(f, "Registration failed"),
            InitializationStatus::AircraftConnectionTimeout => write!(
                f,
                "Failed to connect; ensure the controller is paired with the aircraft"
            ),
        }
    }
}

/// Aircraft components the vendor reports connection changes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentKind {
    AccessoryAggregation,
    Lidar,
    RtkBaseStation,
    AirLink,
    Battery,
    Camera,
    FlightController,
    Gimbal,
    Payload,
    Radar,
    RemoteController,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 11] = [
        ComponentKind::AccessoryAggregation,
        ComponentKind::Lidar,
        ComponentKind::RtkBaseStation,
        ComponentKind::AirLink,
        ComponentKind::Battery,
        ComponentKind::Camera,
        ComponentKind::FlightController,
        ComponentKind::Gimbal,
        ComponentKind::Payload,
        ComponentKind::Radar,
        ComponentKind::RemoteController,
    ];

    /// The key the vendor uses in its component callbacks.
    pub fn vendor_key(&self) -> &'static str {
        match self {
            ComponentKind::AccessoryAggregation => "AccessoryAggregation",
            ComponentKind::Lidar => "Lidar",
            ComponentKind::RtkBaseStation => "RTKBaseStation",
            ComponentKind::AirLink => "airLink",
            ComponentKind::Battery => "battery",
            ComponentKind::Camera => "camera",
            ComponentKind::FlightController => "flightController",
            ComponentKind::Gimbal => "gimbal",
            ComponentKind::Payload => "payload",
            ComponentKind::Radar => "radar",
            ComponentKind::RemoteController => "remoteController",
        }
    }
}

impl FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComponentKind::ALL
            .into_iter()
            .find(|kind| kind.vendor_key() == s)
            .ok_or_else(|| format!("unknown drone component {:?}", s))
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.vendor_key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Available,
    Unavailable,
}

impl From<bool> for Availability {
    fn from(connected: bool) -> Self {
        if connected {
            Availability::Available
        } else {
            Availability::Unavailable
        }
    }
}

/// Availability of every reported component, keyed by component and index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentState {
    components: BTreeMap<ComponentKind, BTreeMap<u32, Availability>>,
}

impl ComponentState {
    /// Record a vendor component update. Unknown keys are logged and dropped.
    pub fn record(&mut self, vendor_key: &str, index: u32, connected: bool) -> bool {
        match vendor_key.parse::<ComponentKind>() {
            Ok(kind) => {
                self.set(kind, index, connected.into());
                true
            }
            Err(err) => {
                warn!(%err, index, connected, "ignoring component update");
                false
            }
        }
    }

    pub fn set(&mut self, kind: ComponentKind, index: u32, availability: Availability) {
        self.components
            .entry(kind)
            .or_default()
            .insert(index, availability);
    }

    pub fn get(&self, kind: ComponentKind, index: u32) -> Option<Availability> {
        self.components.get(&kind)?.get(&index).copied()
    }

    pub fn is_available(&self, kind: ComponentKind) -> bool {
        self.components
            .get(&kind)
            .map(|states| states.values().any(|a| *a == Availability::Available))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ComponentKind, u32, Availability)> + '_ {
        self.components
            .iter()
            .flat_map(|(kind, states)| states.iter().map(move |(i, a)| (*kind, *i, *a)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_predicates() {
        assert!(InitializationStatus::Disconnected.is_disconnected());
        assert!(InitializationStatus::Registering.registration_underway());
        assert!(InitializationStatus::WaitingForAircraft.registration_underway());
        assert!(!InitializationStatus::ConnectedToAircraft.registration_underway());
        assert!(InitializationStatus::ConnectedToAircraft.is_ready());
        assert!(InitializationStatus::RegistrationFailed("bad key".into()).is_error_state());
        assert!(InitializationStatus::AircraftConnectionTimeout.is_error_state());
        assert!(!InitializationStatus::Registering.is_error_state());
    }

    #[test]
    fn test_status_descriptions() {
        assert_eq!(InitializationStatus::Disconnected.to_string(), "Not started");
        assert_eq!(
            InitializationStatus::WaitingForAircraft.to_string(),
            "Connecting to aircraft"
        );
    }

    #[test]
    fn test_component_keys_round_trip_vendor_names() {
        for kind in ComponentKind::ALL {
            assert_eq!(kind.vendor_key().parse::<ComponentKind>(), Ok(kind));
        }
        assert!("warpDrive".parse::<ComponentKind>().is_err());
    }

    #[test]
    fn test_record_component_updates() {
        let mut state = ComponentState::default();

        assert!(state.record("battery", 0, true));
        assert!(state.record("camera", 1, false));
        assert!(!state.record("warpDrive", 0, true));

        assert_eq!(state.get(ComponentKind::Battery, 0), Some(Availability::Available));
        assert!(state.is_available(ComponentKind::Battery));
        assert!(!state.is_available(ComponentKind::Camera));
        assert_eq!(state.iter().count(), 2);
    }
}
