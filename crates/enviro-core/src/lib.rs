//! Domain logic for the enviro sensor hub.
//!
//! This crate holds everything between the wire and the store, with no HTTP
//! or MQTT surface of its own:
//!
//! - **Validation**: range checks for incoming partial readings
//! - **Device link**: the connection state machine for the cloud IoT channel,
//!   with bounded reconnect attempts
//! - **Shadow payloads**: strict decoding of inbound device-shadow messages
//! - **Events**: the typed broadcast events fanned out to observers
//!
//! The state machine is pure and synchronous; the service crate owns the
//! transport and feeds it [`LinkEvent`]s.
//!
//! # Example
//!
//! ```
//! use enviro_core::link::{LinkCredentials, LinkEvent, LinkState, LinkStateMachine};
//!
//! let creds = LinkCredentials::new("k1zfks5ATvF", "rk3588-hub", "secret");
//! let mut machine = LinkStateMachine::new(3);
//! machine.connect(&creds).unwrap();
//! machine.apply(LinkEvent::Up);
//! assert_eq!(*machine.state(), LinkState::Connected);
//! ```

pub mod error;
pub mod events;
pub mod link;
pub mod shadow;
pub mod validation;

pub use error::{Error, Result};
pub use events::{EventReceiver, EventSender, HubEvent, event_channel};
pub use link::{FailureReason, LinkCredentials, LinkEvent, LinkState, LinkStateMachine, LinkStatus};
pub use shadow::ShadowPayload;
pub use validation::{ValidationError, validate};
