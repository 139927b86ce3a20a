//! Mission SDK - drone integration library
//!
//! Wraps a callback-driven vendor SDK behind an observable status channel and
//! converts missions into uploadable waypoint missions.

pub mod link;
pub mod sim;
pub mod status;
pub mod waypoint;

pub use link::{DroneError, DroneLink, LinkConfig, VendorEvent, VendorEvents, VendorSdk};
pub use sim::{SimulatedOperator, SimulatedSdk};
pub use status::{Availability, ComponentKind, ComponentState, InitializationStatus};
pub use waypoint::{
    upload_mission, MissionOperator, MissionUploadError, OperatorState, WaypointDefaults,
    WaypointMission,
};
