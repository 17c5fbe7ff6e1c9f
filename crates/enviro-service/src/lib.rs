//! HTTP REST API, WebSocket fan-out, and cloud device link for the enviro
//! sensor hub.
//!
//! This crate wires the store, validator, and link state machine into a
//! running service:
//!
//! - Serves the REST API over the in-memory time-series store
//! - Fans out reading and link-status events to WebSocket observers
//! - Runs the MQTT transport for the cloud device-shadow channel
//! - Optionally generates synthetic readings for hardware-free operation
//!
//! # REST API Endpoints
//!
//! - `GET  /api/health` - Service health and store counters
//! - `GET  /api/sensors` - Current reading
//! - `GET  /api/sensors/:field` - One field with unit and timestamp
//! - `POST /api/sensors` - Validated partial update
//! - `GET  /api/sensors/history?limit=N` - Recent readings, oldest first
//! - `GET  /api/sensors/chart/:field?range=R` - Windowed, downsampled series
//! - `POST /api/sensors/clear` - Drop history
//! - `POST /api/sensors/reset` - Restore the startup reading
//! - `GET  /api/link/status` / `POST /api/link/{connect,disconnect,publish}`
//! - `POST /api/simulator/{start,stop}`
//! - `WS   /api/ws` - Real-time event stream (also accepts writes)
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/enviro/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [link]
//! product_key = "k1zfks5ATvF"
//! device_name = "rk3588-hub"
//! device_secret = "..."
//!
//! [simulator]
//! enabled = true
//! interval_secs = 5
//! ```

pub mod api;
pub mod config;
pub mod link;
pub mod recorder;
pub mod simulator;
pub mod state;
pub mod ws;

pub use config::{Config, ConfigError, LinkConfig, ServerConfig, SimulatorConfig, StoreConfig};
pub use state::{AppState, LinkRuntime, SimulatorState};
