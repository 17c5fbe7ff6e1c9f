//! Application state shared across handlers.
//!
//! # Broadcast Channel Behavior
//!
//! The `events_tx` broadcast channel carries every [`HubEvent`] to WebSocket
//! clients (and any other subscriber). Key characteristics:
//!
//! - **Buffer size**: configurable via `server.broadcast_buffer` (default: 100)
//! - **Message loss**: a subscriber that falls behind loses the oldest events
//! - **No blocking**: senders never block; they succeed or drop for slow receivers
//!
//! # Lock Ordering
//!
//! When multiple locks are needed, acquire in this order to prevent
//! deadlocks: `config`, then `store`, then `link.machine`, then
//! `link.client`. Every `update()` runs entirely within one `store` lock
//! hold, so readers never observe a half-applied merge.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rumqttc::AsyncClient;
use tokio::sync::{Mutex, RwLock, watch};

use enviro_core::{HubEvent, LinkStateMachine, ValidationError, validate};
use enviro_store::SensorStore;
use enviro_types::{Reading, ReadingPatch};

use crate::config::Config;

/// Shared application state.
pub struct AppState {
    /// The time-series store (Mutex: updates must be atomic w.r.t. reads).
    pub store: Mutex<SensorStore>,
    /// Configuration (RwLock for runtime reads from multiple tasks).
    pub config: RwLock<Config>,
    /// Broadcast channel for observer fan-out.
    pub events_tx: enviro_core::EventSender,
    /// Device-link runtime (state machine + transport handle).
    pub link: LinkRuntime,
    /// Simulator control state.
    pub simulator: SimulatorState,
}

impl AppState {
    /// Create new application state.
    ///
    /// The broadcast buffer size comes from `config.server.broadcast_buffer`;
    /// the link attempt ceiling from `config.link.max_reconnect_attempts`.
    pub fn new(store: SensorStore, config: Config) -> Arc<Self> {
        let (events_tx, _) = enviro_core::event_channel(config.server.broadcast_buffer);
        let machine = LinkStateMachine::new(config.link.max_reconnect_attempts);
        Arc::new(Self {
            store: Mutex::new(store),
            config: RwLock::new(config),
            events_tx,
            link: LinkRuntime::new(machine),
            simulator: SimulatorState::new(),
        })
    }

    /// The single write path shared by every writer (REST, WebSocket, device
    /// link, simulator): validate, merge into the store, broadcast.
    ///
    /// Returns the full list of violated fields on failure; the store is not
    /// touched in that case.
    pub async fn apply_update(&self, patch: &ReadingPatch) -> Result<Reading, Vec<ValidationError>> {
        let errors = validate(patch);
        if !errors.is_empty() {
            return Err(errors);
        }

        let reading = {
            let mut store = self.store.lock().await;
            store.update(patch)
        };

        let _ = self.events_tx.send(HubEvent::ReadingChanged { reading });
        Ok(reading)
    }
}

/// Device-link runtime: the state machine plus the live transport handle.
///
/// The machine is the single owner of the lifecycle state; the client slot
/// holds the MQTT handle only while a transport task is running.
pub struct LinkRuntime {
    /// The connection state machine.
    pub machine: Mutex<LinkStateMachine>,
    /// Handle to the running MQTT client, if any.
    pub client: Mutex<Option<AsyncClient>>,
}

impl LinkRuntime {
    /// Wrap a state machine with an empty transport slot.
    pub fn new(machine: LinkStateMachine) -> Self {
        Self {
            machine: Mutex::new(machine),
            client: Mutex::new(None),
        }
    }
}

/// State for tracking and controlling the synthetic-data simulator.
pub struct SimulatorState {
    /// Whether the simulator task is currently running.
    running: AtomicBool,
    /// Channel to signal the simulator task to stop.
    stop_tx: watch::Sender<bool>,
    /// Receiver for the stop signal (cloned by the task).
    stop_rx: watch::Receiver<bool>,
}

impl SimulatorState {
    /// Create a new simulator state.
    pub fn new() -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            running: AtomicBool::new(false),
            stop_tx,
            stop_rx,
        }
    }

    /// Check if the simulator is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Try to mark the simulator as started. Returns `false` if it was
    /// already running.
    pub fn try_start(&self) -> bool {
        let _ = self.stop_tx.send(false);
        !self.running.swap(true, Ordering::SeqCst)
    }

    /// Get a receiver for the stop signal.
    pub fn subscribe_stop(&self) -> watch::Receiver<bool> {
        self.stop_rx.clone()
    }

    /// Signal the simulator task to stop.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(true);
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Default for SimulatorState {
    fn default() -> Self {
        Self::new()
    }
}
