//! Drone link: vendor SDK registration and aircraft connection lifecycle.
//!
//! Vendor SDKs report progress through callbacks on their own threads. Those
//! callbacks are handed to [`VendorEvents`], which forwards them over a
//! channel to a single worker task. The worker is the only writer of the
//! status and component channels; consumers observe them through
//! `tokio::sync::watch` receivers.

use crate::status::{ComponentState, InitializationStatus};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Product model reported when only the remote controller is attached.
const REMOTE_CONTROLLER_ONLY: &str = "Only RemoteController";

const DEFAULT_AIRCRAFT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DroneError {
    #[error("Registration is already underway.")]
    AlreadyUnderway,
    #[error("no SDK app key configured")]
    MissingAppKey,
    #[error("SDK registration error: {0}")]
    Registration(String),
    #[error("registration cancelled by disconnect")]
    Cancelled,
    #[error("drone link is shut down")]
    LinkClosed,
}

/// Callback payloads delivered by the vendor SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VendorEvent {
    /// Outcome of app registration.
    Registered(Result<(), String>),
    /// Connected product changed; `None` when nothing is connected.
    ProductChanged(Option<String>),
    ComponentChanged {
        key: String,
        index: u32,
        connected: bool,
    },
}

enum LinkMessage {
    Vendor(VendorEvent),
    Begin {
        bridge_ip: Option<String>,
        reply: oneshot::Sender<Result<(), DroneError>>,
    },
    Disconnect {
        reply: oneshot::Sender<()>,
    },
}

/// Thread-safe sink for vendor callbacks.
#[derive(Clone)]
pub struct VendorEvents {
    tx: mpsc::UnboundedSender<LinkMessage>,
}

impl VendorEvents {
    /// Hand an event to the link worker. Safe to call from any thread.
    pub fn emit(&self, event: VendorEvent) {
        if self.tx.send(LinkMessage::Vendor(event)).is_err() {
            debug!("drone link closed, dropping vendor event");
        }
    }
}

/// A callback-driven vendor SDK.
///
/// Methods return immediately; results arrive later through [`VendorEvents`].
pub trait VendorSdk: Send + 'static {
    fn register_app(&mut self, app_key: &str, events: VendorEvents);
    fn enable_bridge_mode(&mut self, bridge_ip: &str);
    fn disable_bridge_mode(&mut self);
    fn start_listening(&mut self, events: VendorEvents);
    fn stop_listening(&mut self);
    fn stop_connection_to_product(&mut self);
}

#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub app_key: Option<String>,
    /// How long to wait for an aircraft after registration. `None` waits forever.
    pub aircraft_timeout: Option<Duration>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            app_key: None,
            aircraft_timeout: Some(Duration::from_secs(DEFAULT_AIRCRAFT_TIMEOUT_SECS)),
        }
    }
}

/// Handle to a running drone link.
pub struct DroneLink {
    tx: mpsc::UnboundedSender<LinkMessage>,
    status: watch::Receiver<InitializationStatus>,
    components: watch::Receiver<ComponentState>,
    worker: JoinHandle<()>,
}

impl DroneLink {
    /// Start the link worker. Must be called inside a Tokio runtime.
    pub fn spawn<V: VendorSdk>(vendor: V, config: LinkConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(InitializationStatus::Disconnected);
        let (components_tx, components) = watch::channel(ComponentState::default());

        let worker = LinkWorker {
            vendor,
            config,
            events: VendorEvents { tx: tx.clone() },
            status: status_tx,
            components: components_tx,
            pending: None,
            bridge_ip: None,
            deadline: None,
        };
        let worker = tokio::spawn(worker.run(rx));

        Self {
            tx,
            status,
            components,
            worker,
        }
    }

    /// Register with the vendor and start waiting for an aircraft.
    ///
    /// Resolves once registration succeeded or failed; aircraft connection
    /// is reported on the status channel afterwards.
    pub async fn init_sdk(&self, bridge_ip: Option<String>) -> Result<(), DroneError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(LinkMessage::Begin { bridge_ip, reply })
            .map_err(|_| DroneError::LinkClosed)?;
        rx.await.map_err(|_| DroneError::LinkClosed)?
    }

    pub async fn disconnect(&self) -> Result<(), DroneError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(LinkMessage::Disconnect { reply })
            .map_err(|_| DroneError::LinkClosed)?;
        rx.await.map_err(|_| DroneError::LinkClosed)
    }

    pub fn status(&self) -> InitializationStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<InitializationStatus> {
        self.status.clone()
    }

    pub fn components(&self) -> ComponentState {
        self.components.borrow().clone()
    }

    pub fn subscribe_components(&self) -> watch::Receiver<ComponentState> {
        self.components.clone()
    }

    /// Wait until the status satisfies `predicate`.
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<InitializationStatus, DroneError>
    where
        F: FnMut(&InitializationStatus) -> bool,
    {
        let mut rx = self.status.clone();
        let status = rx
            .wait_for(|status| predicate(status))
            .await
            .map_err(|_| DroneError::LinkClosed)?;
        Ok(status.clone())
    }
}

impl Drop for DroneLink {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

struct LinkWorker<V> {
    vendor: V,
    config: LinkConfig,
    events: VendorEvents,
    status: watch::Sender<InitializationStatus>,
    components: watch::Sender<ComponentState>,
    pending: Option<oneshot::Sender<Result<(), DroneError>>>,
    bridge_ip: Option<String>,
    deadline: Option<Instant>,
}

impl<V: VendorSdk> LinkWorker<V> {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<LinkMessage>) {
        loop {
            let deadline = self.deadline;
            let timeout = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                message = rx.recv() => match message {
                    Some(message) => self.handle(message),
                    None => break,
                },
                _ = timeout => self.on_aircraft_timeout(),
            }
        }
        debug!("drone link worker stopped");
    }

    fn handle(&mut self, message: LinkMessage) {
        match message {
            LinkMessage::Begin { bridge_ip, reply } => self.begin(bridge_ip, reply),
            LinkMessage::Disconnect { reply } => {
                self.disconnect();
                let _ = reply.send(());
            }
            LinkMessage::Vendor(VendorEvent::Registered(result)) => self.on_registered(result),
            LinkMessage::Vendor(VendorEvent::ProductChanged(model)) => {
                self.on_product_changed(model)
            }
            LinkMessage::Vendor(VendorEvent::ComponentChanged {
                key,
                index,
                connected,
            }) => {
                debug!(component = %key, index, connected, "component connection changed");
                self.components.send_modify(|state| {
                    state.record(&key, index, connected);
                });
            }
        }
    }

    fn begin(&mut self, bridge_ip: Option<String>, reply: oneshot::Sender<Result<(), DroneError>>) {
        if self.status.borrow().registration_underway() {
            let _ = reply.send(Err(DroneError::AlreadyUnderway));
            return;
        }

        let app_key = match self.config.app_key.as_deref() {
            Some(key) if !key.trim().is_empty() => key.to_string(),
            _ => {
                warn!("no SDK app key configured, registration not started");
                let _ = reply.send(Err(DroneError::MissingAppKey));
                return;
            }
        };

        self.pending = Some(reply);
        self.bridge_ip = bridge_ip;
        self.set_status(InitializationStatus::Registering);
        self.vendor.register_app(&app_key, self.events.clone());
    }

    fn on_registered(&mut self, result: Result<(), String>) {
        if *self.status.borrow() != InitializationStatus::Registering {
            debug!("registration result arrived after the attempt ended, ignoring");
            return;
        }

        if let Err(reason) = result {
            warn!(%reason, "SDK registration failed");
            self.set_status(InitializationStatus::RegistrationFailed(reason.clone()));
            self.reply(Err(DroneError::Registration(reason)));
            return;
        }

        match self.bridge_ip.as_deref() {
            Some(ip) => {
                info!(bridge_ip = %ip, "enabling bridge mode");
                self.vendor.enable_bridge_mode(ip);
            }
            None => info!("using direct aircraft connection"),
        }
        self.set_status(InitializationStatus::WaitingForAircraft);
        self.arm_timeout();
        self.vendor.start_listening(self.events.clone());
        self.reply(Ok(()));
    }

    fn on_product_changed(&mut self, model: Option<String>) {
        let listening = matches!(
            *self.status.borrow(),
            InitializationStatus::WaitingForAircraft
                | InitializationStatus::ConnectedToAircraft
                | InitializationStatus::AircraftConnectionTimeout
        );
        if !listening {
            return;
        }

        match model {
            Some(model) if model != REMOTE_CONTROLLER_ONLY => {
                info!(%model, "aircraft connected");
                self.deadline = None;
                self.set_status(InitializationStatus::ConnectedToAircraft);
            }
            _ => {
                // Aircraft dropped out while connected, not a user disconnect.
                if self.status.borrow().is_ready() {
                    warn!("aircraft connection lost");
                    self.set_status(InitializationStatus::WaitingForAircraft);
                    self.arm_timeout();
                }
            }
        }
    }

    fn on_aircraft_timeout(&mut self) {
        self.deadline = None;
        if *self.status.borrow() == InitializationStatus::WaitingForAircraft {
            warn!("timed out waiting for aircraft");
            self.set_status(InitializationStatus::AircraftConnectionTimeout);
        }
    }

    fn disconnect(&mut self) {
        self.vendor.stop_connection_to_product();
        self.vendor.stop_listening();
        self.vendor.disable_bridge_mode();
        self.deadline = None;
        self.bridge_ip = None;
        self.reply(Err(DroneError::Cancelled));
        self.components.send_replace(ComponentState::default());
        self.set_status(InitializationStatus::Disconnected);
    }

    fn arm_timeout(&mut self) {
        self.deadline = self
            .config
            .aircraft_timeout
            .map(|timeout| Instant::now() + timeout);
    }

    fn reply(&mut self, result: Result<(), DroneError>) {
        if let Some(pending) = self.pending.take() {
            let _ = pending.send(result);
        }
    }

    fn set_status(&self, status: InitializationStatus) {
        info!(status = %status, "drone link status");
        self.status.send_replace(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Calls {
        events: Option<VendorEvents>,
        bridge_ip: Option<String>,
        listening: bool,
    }

    /// Vendor that does nothing on its own; tests drive the callbacks.
    #[derive(Clone, Default)]
    struct ManualVendor {
        calls: Arc<Mutex<Calls>>,
    }

    impl ManualVendor {
        fn emit(&self, event: VendorEvent) {
            let calls = self.calls.lock().unwrap();
            calls.events.as_ref().expect("registration started").emit(event);
        }
    }

    impl VendorSdk for ManualVendor {
        fn register_app(&mut self, _app_key: &str, events: VendorEvents) {
            self.calls.lock().unwrap().events = Some(events);
        }

        fn enable_bridge_mode(&mut self, bridge_ip: &str) {
            self.calls.lock().unwrap().bridge_ip = Some(bridge_ip.to_string());
        }

        fn disable_bridge_mode(&mut self) {
            self.calls.lock().unwrap().bridge_ip = None;
        }

        fn start_listening(&mut self, _events: VendorEvents) {
            self.calls.lock().unwrap().listening = true;
        }

        fn stop_listening(&mut self) {
            self.calls.lock().unwrap().listening = false;
        }

        fn stop_connection_to_product(&mut self) {}
    }

    fn config(timeout: Option<Duration>) -> LinkConfig {
        LinkConfig {
            app_key: Some("test-app-key".to_string()),
            aircraft_timeout: timeout,
        }
    }

    #[tokio::test]
    async fn test_registration_walks_to_connected() {
        let vendor = ManualVendor::default();
        let link = Arc::new(DroneLink::spawn(vendor.clone(), config(None)));

        let registering = link.clone();
        let init = tokio::spawn(async move {
            registering
                .init_sdk(Some("192.168.1.20".to_string()))
                .await
        });
        link.wait_for(|s| *s == InitializationStatus::Registering)
            .await
            .unwrap();

        assert_eq!(link.init_sdk(None).await, Err(DroneError::AlreadyUnderway));

        vendor.emit(VendorEvent::Registered(Ok(())));
        init.await.unwrap().unwrap();
        assert_eq!(link.status(), InitializationStatus::WaitingForAircraft);
        {
            let calls = vendor.calls.lock().unwrap();
            assert_eq!(calls.bridge_ip.as_deref(), Some("192.168.1.20"));
            assert!(calls.listening);
        }

        vendor.emit(VendorEvent::ProductChanged(Some(REMOTE_CONTROLLER_ONLY.to_string())));
        vendor.emit(VendorEvent::ProductChanged(Some("Mavic 2 Pro".to_string())));
        let status = link
            .wait_for(|s| s.is_ready())
            .await
            .unwrap();
        assert_eq!(status, InitializationStatus::ConnectedToAircraft);

        vendor.emit(VendorEvent::ProductChanged(None));
        link.wait_for(|s| *s == InitializationStatus::WaitingForAircraft)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_registration_failure_is_reported() {
        let vendor = ManualVendor::default();
        let link = Arc::new(DroneLink::spawn(vendor.clone(), config(None)));

        let registering = link.clone();
        let init = tokio::spawn(async move { registering.init_sdk(None).await });
        link.wait_for(|s| *s == InitializationStatus::Registering)
            .await
            .unwrap();

        vendor.emit(VendorEvent::Registered(Err("invalid app key".to_string())));

        assert_eq!(
            init.await.unwrap(),
            Err(DroneError::Registration("invalid app key".to_string()))
        );
        assert!(link.status().is_error_state());
    }

    #[tokio::test]
    async fn test_missing_app_key_does_not_register() {
        let link = DroneLink::spawn(ManualVendor::default(), LinkConfig::default());

        assert_eq!(link.init_sdk(None).await, Err(DroneError::MissingAppKey));
        assert!(link.status().is_disconnected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_aircraft_timeout() {
        let vendor = ManualVendor::default();
        let link = Arc::new(DroneLink::spawn(
            vendor.clone(),
            config(Some(Duration::from_secs(30))),
        ));

        let registering = link.clone();
        let init = tokio::spawn(async move { registering.init_sdk(None).await });
        link.wait_for(|s| *s == InitializationStatus::Registering)
            .await
            .unwrap();
        vendor.emit(VendorEvent::Registered(Ok(())));
        init.await.unwrap().unwrap();

        let status = link
            .wait_for(|s| s.is_error_state())
            .await
            .unwrap();
        assert_eq!(status, InitializationStatus::AircraftConnectionTimeout);
    }

    #[tokio::test]
    async fn test_disconnect_resets_status_and_components() {
        let vendor = ManualVendor::default();
        let link = Arc::new(DroneLink::spawn(vendor.clone(), config(None)));

        let registering = link.clone();
        let init = tokio::spawn(async move { registering.init_sdk(None).await });
        link.wait_for(|s| *s == InitializationStatus::Registering)
            .await
            .unwrap();
        vendor.emit(VendorEvent::Registered(Ok(())));
        init.await.unwrap().unwrap();

        vendor.emit(VendorEvent::ComponentChanged {
            key: "battery".to_string(),
            index: 0,
            connected: true,
        });
        let mut components = link.subscribe_components();
        components
            .wait_for(|c| c.is_available(crate::status::ComponentKind::Battery))
            .await
            .unwrap();

        link.disconnect().await.unwrap();
        assert!(link.status().is_disconnected());
        assert_eq!(link.components(), ComponentState::default());
        assert!(!vendor.calls.lock().unwrap().listening);
    }
}
