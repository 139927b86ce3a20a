//! Simulated vendor SDK and mission operator.
//!
//! Events are delivered from a background thread, the same way a vendor SDK
//! calls back from its own threads.

use crate::link::{VendorEvent, VendorEvents, VendorSdk};
use crate::status::ComponentKind;
use crate::waypoint::{MissionOperator, OperatorState, WaypointMission};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SimulatedSdk {
    /// Delay before the registration callback fires.
    pub registration_delay: Duration,
    /// Delay before the aircraft shows up; `None` means it never does.
    pub aircraft_delay: Option<Duration>,
    pub aircraft_model: String,
    /// When set, registration fails with this reason.
    pub registration_error: Option<String>,
    listening: Arc<AtomicBool>,
    bridge_ip: Option<String>,
}

impl Default for SimulatedSdk {
    fn default() -> Self {
        Self {
            registration_delay: Duration::from_millis(200),
            aircraft_delay: Some(Duration::from_secs(1)),
            aircraft_model: "Mavic 2 Pro".to_string(),
            registration_error: None,
            listening: Arc::new(AtomicBool::new(false)),
            bridge_ip: None,
        }
    }
}

impl SimulatedSdk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bridge_ip(&self) -> Option<&str> {
        self.bridge_ip.as_deref()
    }
}

impl VendorSdk for SimulatedSdk {
    fn register_app(&mut self, app_key: &str, events: VendorEvents) {
        debug!(app_key_len = app_key.len(), "simulated registration started");
        let delay = self.registration_delay;
        let result = match &self.registration_error {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        };
        thread::spawn(move || {
            thread::sleep(delay);
            events.emit(VendorEvent::Registered(result));
        });
    }

    fn enable_bridge_mode(&mut self, bridge_ip: &str) {
        self.bridge_ip = Some(bridge_ip.to_string());
    }

    fn disable_bridge_mode(&mut self) {
        self.bridge_ip = None;
    }

    fn start_listening(&mut self, events: VendorEvents) {
        self.listening.store(true, Ordering::SeqCst);
        let listening = self.listening.clone();
        let delay = self.aircraft_delay;
        let model = self.aircraft_model.clone();

        thread::spawn(move || {
            events.emit(VendorEvent::ComponentChanged {
                key: ComponentKind::RemoteController.vendor_key().to_string(),
                index: 0,
                connected: true,
            });

            let Some(delay) = delay else {
                return;
            };
            thread::sleep(delay);
            if !listening.load(Ordering::SeqCst) {
                return;
            }

            events.emit(VendorEvent::ProductChanged(Some(model)));
            for kind in [
                ComponentKind::FlightController,
                ComponentKind::Battery,
                ComponentKind::Camera,
                ComponentKind::Gimbal,
            ] {
                events.emit(VendorEvent::ComponentChanged {
                    key: kind.vendor_key().to_string(),
                    index: 0,
                    connected: true,
                });
            }
        });
    }

    fn stop_listening(&mut self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn stop_connection_to_product(&mut self) {}
}

/// In-memory waypoint mission operator.
#[derive(Debug, Clone)]
pub struct SimulatedOperator {
    state: OperatorState,
    loaded: Option<WaypointMission>,
}

impl SimulatedOperator {
    pub fn new() -> Self {
        Self {
            state: OperatorState::NotReady,
            loaded: None,
        }
    }

    /// Operator with no aircraft attached; every load fails.
    pub fn disconnected() -> Self {
        Self {
            state: OperatorState::Disconnected,
            loaded: None,
        }
    }

    pub fn loaded(&self) -> Option<&WaypointMission> {
        self.loaded.as_ref()
    }
}

impl Default for SimulatedOperator {
    fn default() -> Self {
        Self::new()
    }
}

impl MissionOperator for SimulatedOperator {
    fn state(&self) -> OperatorState {
        self.state
    }

    fn load(&mut self, mission: &WaypointMission) -> Result<(), String> {
        match self.state {
            OperatorState::Disconnected => Err("no aircraft connected".to_string()),
            OperatorState::Uploading | OperatorState::Executing => {
                Err(format!("cannot load while {}", self.state))
            }
            _ => {
                self.loaded = Some(mission.clone());
                self.state = OperatorState::ReadyToUpload;
                Ok(())
            }
        }
    }

    async fn upload(&mut self) -> Result<(), String> {
        if self.state != OperatorState::ReadyToUpload {
            return Err(format!("cannot upload while {}", self.state));
        }
        self.state = OperatorState::Uploading;
        tokio::task::yield_now().await;
        self.state = OperatorState::ReadyToExecute;
        Ok(())
    }
}
