//! Conversion of missions into vendor waypoint missions, and upload.

use mission_core::{Mission, MissionId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use thiserror::Error;
use tracing::info;

pub const MIN_WAYPOINTS: usize = 2;
pub const MAX_WAYPOINTS: usize = 99;
/// Vendor ceiling for `max_flight_speed_mps`.
pub const FLIGHT_SPEED_LIMIT_MPS: f64 = 15.0;
pub const MIN_ALTITUDE_M: f64 = -200.0;
pub const MAX_ALTITUDE_M: f64 = 500.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishedAction {
    NoAction,
    #[default]
    GoHome,
    AutoLand,
    GoFirstWaypoint,
}

/// Values missions don't carry per point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaypointDefaults {
    pub altitude_m: f64,
    pub auto_flight_speed_mps: f64,
    pub max_flight_speed_mps: f64,
    #[serde(default)]
    pub finished_action: FinishedAction,
}

impl Default for WaypointDefaults {
    fn default() -> Self {
        Self {
            altitude_m: 30.0,
            auto_flight_speed_mps: 5.0,
            max_flight_speed_mps: 10.0,
            finished_action: FinishedAction::GoHome,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointMission {
    pub mission_id: MissionId,
    pub waypoints: Vec<Waypoint>,
    pub auto_flight_speed_mps: f64,
    pub max_flight_speed_mps: f64,
    pub finished_action: FinishedAction,
}

#[derive(Debug, Error, PartialEq)]
pub enum MissionUploadError {
    #[error("mission needs at least 2 waypoints, has {0}")]
    TooFewWaypoints(usize),
    #[error("mission allows at most 99 waypoints, has {0}")]
    TooManyWaypoints(usize),
    #[error("waypoint {index} has an invalid coordinate")]
    InvalidCoordinate { index: usize },
    #[error("waypoint {index} altitude {altitude_m}m is out of range")]
    AltitudeOutOfRange { index: usize, altitude_m: f64 },
    #[error("invalid flight speed: {0}")]
    InvalidSpeed(String),
    #[error("mission load failed: {0}")]
    Load(String),
    #[error("mission upload failed: {0}")]
    Upload(String),
    #[error("operator in state {actual}, expected {expected}")]
    UnexpectedState {
        expected: OperatorState,
        actual: OperatorState,
    },
}

impl WaypointMission {
    pub fn from_mission(mission: &Mission, defaults: &WaypointDefaults) -> Self {
        let waypoints = mission
            .points
            .iter()
            .map(|point| Waypoint {
                latitude: point.coordinate.latitude,
                longitude: point.coordinate.longitude,
                altitude_m: defaults.altitude_m,
            })
            .collect();

        Self {
            mission_id: mission.id,
            waypoints,
            auto_flight_speed_mps: defaults.auto_flight_speed_mps,
            max_flight_speed_mps: defaults.max_flight_speed_mps,
            finished_action: defaults.finished_action,
        }
    }

    /// Validate against the vendor's waypoint mission limits.
    pub fn check_parameters(&self) -> Result<(), MissionUploadError> {
        let count = self.waypoints.len();
        if count < MIN_WAYPOINTS {
            return Err(MissionUploadError::TooFewWaypoints(count));
        }
        if count > MAX_WAYPOINTS {
            return Err(MissionUploadError::TooManyWaypoints(count));
        }

        for (index, wp) in self.waypoints.iter().enumerate() {
            let valid = wp.latitude.is_finite()
                && wp.longitude.is_finite()
                && (-90.0..=90.0).contains(&wp.latitude)
                && (-180.0..=180.0).contains(&wp.longitude);
            if !valid {
                return Err(MissionUploadError::InvalidCoordinate { index });
            }
            if !(MIN_ALTITUDE_M..=MAX_ALTITUDE_M).contains(&wp.altitude_m) {
                return Err(MissionUploadError::AltitudeOutOfRange {
                    index,
                    altitude_m: wp.altitude_m,
                });
            }
        }

        if !(2.0..=FLIGHT_SPEED_LIMIT_MPS).contains(&self.max_flight_speed_mps) {
            return Err(MissionUploadError::InvalidSpeed(format!(
                "max flight speed {} m/s outside 2..={} m/s",
                self.max_flight_speed_mps, FLIGHT_SPEED_LIMIT_MPS
            )));
        }
        if self.auto_flight_speed_mps.abs() > self.max_flight_speed_mps {
            return Err(MissionUploadError::InvalidSpeed(format!(
                "auto flight speed {} m/s exceeds max {} m/s",
                self.auto_flight_speed_mps, self.max_flight_speed_mps
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorState {
    Disconnected,
    NotReady,
    ReadyToUpload,
    Uploading,
    ReadyToExecute,
    Executing,
}

impl fmt::Display for OperatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OperatorState::Disconnected => "disconnected",
            OperatorState::NotReady => "not ready",
            OperatorState::ReadyToUpload => "ready to upload",
            OperatorState::Uploading => "uploading",
            OperatorState::ReadyToExecute => "ready to execute",
            OperatorState::Executing => "executing",
        };
        f.write_str(label)
    }
}

/// Vendor waypoint mission operator.
pub trait MissionOperator {
    fn state(&self) -> OperatorState;
    fn load(&mut self, mission: &WaypointMission) -> Result<(), String>;
    fn upload(&mut self) -> impl Future<Output = Result<(), String>> + Send;
}

/// Validate, load and upload `mission`. Execution is left to the operator's owner.
pub async fn upload_mission<O: MissionOperator>(
    operator: &mut O,
    mission: &WaypointMission,
) -> Result<(), MissionUploadError> {
    mission.check_parameters()?;

    operator.load(mission).map_err(MissionUploadError::Load)?;
    expect_state(operator, OperatorState::ReadyToUpload)?;

    info!(
        mission_id = %mission.mission_id,
        waypoints = mission.waypoints.len(),
        "uploading waypoint mission"
    );
    operator.upload().await.map_err(MissionUploadError::Upload)?;
    expect_state(operator, OperatorState::ReadyToExecute)?;

    info!(mission_id = %mission.mission_id, "waypoint mission ready to execute");
    Ok(())
}

fn expect_state<O: MissionOperator>(
    operator: &O,
    expected: OperatorState,
) -> Result<(), MissionUploadError> {
    let actual = operator.state();
    if actual != expected {
        return Err(MissionUploadError::UnexpectedState { expected, actual });
    }
    Ok(())
}
