//! Connection state machine for the cloud device link.
//!
//! The machine is pure and synchronous: the transport layer (owned by the
//! service crate) feeds it [`LinkEvent`]s and reads back the resulting state.
//! Keeping I/O out of the transitions makes every path — including the
//! attempt-ceiling and cancellation paths — unit-testable without a broker.
//!
//! ```text
//! Idle --connect()--> Connecting --Up--> Connected
//! Connecting --Error--> Reconnecting(1)
//! Connected --Down--> Reconnecting(1) | Disconnected (ceiling == 0)
//! Reconnecting(n) --Up--> Connected              [attempts reset to 0]
//! Reconnecting(n) --Error, n < max--> Reconnecting(n+1)
//! Reconnecting(n) --Error, n >= max--> Failed
//! any --disconnect()--> Disconnected
//! ```
//!
//! Exceeding the ceiling halts automatic retry; a manual `connect()` is
//! required to resume. Events arriving after `disconnect()` (stale reconnect
//! callbacks) are ignored.

use core::fmt;

use serde::{Deserialize, Serialize, Serializer};
use tracing::{info, warn};

use crate::error::{Error, Result};

/// The credential triple for the cloud IoT channel.
///
/// All three identifiers must be present and non-placeholder before a
/// connection attempt is made.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCredentials {
    /// Product key assigned by the cloud platform.
    pub product_key: String,
    /// Device name registered under the product.
    pub device_name: String,
    /// Per-device secret.
    pub device_secret: String,
}

impl LinkCredentials {
    /// Create a new credential triple.
    pub fn new(
        product_key: impl Into<String>,
        device_name: impl Into<String>,
        device_secret: impl Into<String>,
    ) -> Self {
        Self {
            product_key: product_key.into(),
            device_name: device_name.into(),
            device_secret: device_secret.into(),
        }
    }

    /// True if all three identifiers are filled in with real values.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.incomplete_field().is_none()
    }

    /// Name of the first missing or placeholder field, if any.
    #[must_use]
    pub fn incomplete_field(&self) -> Option<&'static str> {
        fn placeholder(value: &str) -> bool {
            value.is_empty() || value.starts_with("YOUR_")
        }

        if placeholder(&self.product_key) {
            Some("product_key")
        } else if placeholder(&self.device_name) {
            Some("device_name")
        } else if placeholder(&self.device_secret) {
            Some("device_secret")
        } else {
            None
        }
    }
}

/// Why the link gave up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum FailureReason {
    /// Credentials missing or still placeholders; no network attempt made.
    ConfigIncomplete,
    /// The reconnect-attempt ceiling was exceeded.
    AttemptsExhausted {
        /// The last transport error seen.
        last_error: String,
    },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::ConfigIncomplete => write!(f, "configuration incomplete"),
            FailureReason::AttemptsExhausted { last_error } => {
                write!(f, "reconnect attempts exhausted: {}", last_error)
            }
        }
    }
}

/// Lifecycle state of the device link.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkState {
    /// Never connected.
    Idle,
    /// Connection attempt in flight.
    Connecting,
    /// Link established.
    Connected,
    /// Link lost; retrying. `attempt` counts toward the ceiling.
    Reconnecting {
        /// Current attempt number, starting at 1.
        attempt: u32,
    },
    /// Deliberately offline.
    Disconnected,
    /// Gave up; manual `connect()` required to resume.
    Failed(FailureReason),
}

impl LinkState {
    /// Short lowercase label for logs and status payloads.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            LinkState::Idle => "idle",
            LinkState::Connecting => "connecting",
            LinkState::Connected => "connected",
            LinkState::Reconnecting { .. } => "reconnecting",
            LinkState::Disconnected => "disconnected",
            LinkState::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Reconnecting { attempt } => write!(f, "reconnecting (attempt {})", attempt),
            LinkState::Failed(reason) => write!(f, "failed: {}", reason),
            other => f.write_str(other.label()),
        }
    }
}

impl Serialize for LinkState {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Transport-level events fed to the machine by the link runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Connection acknowledged by the broker.
    Up,
    /// An established connection dropped.
    Down,
    /// A connection or reconnection attempt failed.
    Error(String),
}

/// Pure projection of the machine for status endpoints and broadcasts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkStatus {
    /// Current lifecycle state.
    pub state: LinkState,
    /// True iff the state is `Connected`.
    pub connected: bool,
    /// Attempts made in the current reconnect cycle.
    pub reconnect_attempts: u32,
    /// The ceiling after which the link moves to `Failed`.
    pub max_reconnect_attempts: u32,
    /// Failure detail when the state is `Failed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The device-link state machine.
///
/// Owns the link lifecycle exclusively; the store never reads or writes it.
#[derive(Debug, Clone)]
pub struct LinkStateMachine {
    state: LinkState,
    reconnect_attempts: u32,
    max_reconnect_attempts: u32,
}

impl LinkStateMachine {
    /// Create a new machine in `Idle` with the given attempt ceiling.
    #[must_use]
    pub fn new(max_reconnect_attempts: u32) -> Self {
        Self {
            state: LinkState::Idle,
            reconnect_attempts: 0,
            max_reconnect_attempts,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &LinkState {
        &self.state
    }

    /// True iff the link is established.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    /// True while the transport should keep polling: a connection is live,
    /// in flight, or being retried.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(
            self.state,
            LinkState::Connecting | LinkState::Connected | LinkState::Reconnecting { .. }
        )
    }

    /// Attempts made in the current reconnect cycle.
    #[must_use]
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// Begin a connection attempt.
    ///
    /// A no-op returning success if already connected. An incomplete
    /// credential triple moves the machine to `Failed(ConfigIncomplete)`
    /// and returns the error without any network operation; the transport
    /// must not be started in that case.
    pub fn connect(&mut self, credentials: &LinkCredentials) -> Result<()> {
        if self.state == LinkState::Connected {
            return Ok(());
        }

        if let Some(field) = credentials.incomplete_field() {
            warn!("device link credentials incomplete ({}), skipping connect", field);
            self.state = LinkState::Failed(FailureReason::ConfigIncomplete);
            return Err(Error::ConfigIncomplete(format!(
                "{} is missing or a placeholder",
                field
            )));
        }

        info!("device link connecting");
        self.reconnect_attempts = 0;
        self.state = LinkState::Connecting;
        Ok(())
    }

    /// Force the link offline, cancelling any reconnect cycle.
    ///
    /// Unconditional: timers that fire afterwards deliver events into a
    /// `Disconnected` machine, and [`apply`](Self::apply) ignores them.
    pub fn disconnect(&mut self) {
        info!("device link disconnected");
        self.state = LinkState::Disconnected;
    }

    /// Apply a transport event. Returns `true` if the state changed.
    pub fn apply(&mut self, event: LinkEvent) -> bool {
        let next = match (&self.state, &event) {
            (LinkState::Connecting | LinkState::Reconnecting { .. }, LinkEvent::Up) => {
                info!("device link established");
                self.reconnect_attempts = 0;
                Some(LinkState::Connected)
            }
            // A drop or transport error on an established link starts (or
            // skips, with a zero ceiling) the reconnect cycle.
            (LinkState::Connected, LinkEvent::Down | LinkEvent::Error(_)) => {
                if self.max_reconnect_attempts == 0 {
                    warn!("device link lost, reconnect disabled");
                    Some(LinkState::Disconnected)
                } else {
                    warn!("device link lost, reconnecting");
                    self.reconnect_attempts = 1;
                    Some(LinkState::Reconnecting { attempt: 1 })
                }
            }
            (LinkState::Connecting, LinkEvent::Error(cause)) => {
                warn!("device link connect failed: {}", cause);
                self.reconnect_attempts = 1;
                Some(LinkState::Reconnecting { attempt: 1 })
            }
            (LinkState::Reconnecting { attempt }, LinkEvent::Error(cause)) => {
                if *attempt < self.max_reconnect_attempts {
                    let next_attempt = attempt + 1;
                    warn!(
                        "device link reconnect attempt {} of {} failed: {}",
                        attempt, self.max_reconnect_attempts, cause
                    );
                    self.reconnect_attempts = next_attempt;
                    Some(LinkState::Reconnecting {
                        attempt: next_attempt,
                    })
                } else {
                    warn!(
                        "device link giving up after {} reconnect attempts: {}",
                        attempt, cause
                    );
                    Some(LinkState::Failed(FailureReason::AttemptsExhausted {
                        last_error: cause.clone(),
                    }))
                }
            }
            // Stale callbacks after disconnect()/failure are ignored.
            _ => None,
        };

        match next {
            Some(state) => {
                self.state = state;
                true
            }
            None => false,
        }
    }

    /// Pure status projection. Never mutates.
    #[must_use]
    pub fn status(&self) -> LinkStatus {
        let reason = match &self.state {
            LinkState::Failed(reason) => Some(reason.to_string()),
            _ => None,
        };
        LinkStatus {
            state: self.state.clone(),
            connected: self.is_connected(),
            reconnect_attempts: self.reconnect_attempts,
            max_reconnect_attempts: self.max_reconnect_attempts,
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_creds() -> LinkCredentials {
        LinkCredentials::new("k1zfks5ATvF", "rk3588-hub", "f7a394d926c9")
    }

    #[test]
    fn test_connect_then_up() {
        let mut machine = LinkStateMachine::new(3);
        machine.connect(&complete_creds()).unwrap();
        assert_eq!(*machine.state(), LinkState::Connecting);

        assert!(machine.apply(LinkEvent::Up));
        assert_eq!(*machine.state(), LinkState::Connected);
        assert!(machine.is_connected());
    }

    #[test]
    fn test_connect_is_noop_when_connected() {
        let mut machine = LinkStateMachine::new(3);
        machine.connect(&complete_creds()).unwrap();
        machine.apply(LinkEvent::Up);

        machine.connect(&complete_creds()).unwrap();
        assert_eq!(*machine.state(), LinkState::Connected);
    }

    #[test]
    fn test_incomplete_credentials_fail_without_network() {
        let mut machine = LinkStateMachine::new(3);
        let creds = LinkCredentials::new("YOUR_PRODUCT_KEY", "rk3588-hub", "secret");

        let err = machine.connect(&creds).unwrap_err();
        assert!(matches!(err, Error::ConfigIncomplete(_)));
        assert!(err.to_string().contains("product_key"));
        assert_eq!(
            *machine.state(),
            LinkState::Failed(FailureReason::ConfigIncomplete)
        );
        assert!(!machine.is_active());
    }

    #[test]
    fn test_empty_credentials_are_incomplete() {
        let creds = LinkCredentials::new("k1zfks5ATvF", "", "secret");
        assert_eq!(creds.incomplete_field(), Some("device_name"));
        assert!(!creds.is_complete());
        assert!(complete_creds().is_complete());
    }

    #[test]
    fn test_down_starts_reconnect_cycle() {
        let mut machine = LinkStateMachine::new(3);
        machine.connect(&complete_creds()).unwrap();
        machine.apply(LinkEvent::Up);

        assert!(machine.apply(LinkEvent::Down));
        assert_eq!(*machine.state(), LinkState::Reconnecting { attempt: 1 });
        assert_eq!(machine.reconnect_attempts(), 1);
    }

    #[test]
    fn test_reconnect_cycle_exhausts_to_failed() {
        let mut machine = LinkStateMachine::new(3);
        machine.connect(&complete_creds()).unwrap();
        machine.apply(LinkEvent::Up);
        machine.apply(LinkEvent::Down);

        // Three consecutive errors: 2, 3, then the ceiling trips.
        machine.apply(LinkEvent::Error("timeout".to_string()));
        assert_eq!(*machine.state(), LinkState::Reconnecting { attempt: 2 });
        machine.apply(LinkEvent::Error("timeout".to_string()));
        assert_eq!(*machine.state(), LinkState::Reconnecting { attempt: 3 });
        machine.apply(LinkEvent::Error("timeout".to_string()));
        assert_eq!(
            *machine.state(),
            LinkState::Failed(FailureReason::AttemptsExhausted {
                last_error: "timeout".to_string()
            })
        );
        assert!(!machine.is_active());
    }

    #[test]
    fn test_up_from_reconnecting_resets_attempts() {
        let mut machine = LinkStateMachine::new(5);
        machine.connect(&complete_creds()).unwrap();
        machine.apply(LinkEvent::Up);
        machine.apply(LinkEvent::Down);
        machine.apply(LinkEvent::Error("refused".to_string()));
        assert_eq!(machine.reconnect_attempts(), 2);

        assert!(machine.apply(LinkEvent::Up));
        assert_eq!(*machine.state(), LinkState::Connected);
        assert_eq!(machine.reconnect_attempts(), 0);
    }

    #[test]
    fn test_zero_ceiling_goes_straight_to_disconnected() {
        let mut machine = LinkStateMachine::new(0);
        machine.connect(&complete_creds()).unwrap();
        machine.apply(LinkEvent::Up);

        machine.apply(LinkEvent::Down);
        assert_eq!(*machine.state(), LinkState::Disconnected);
    }

    #[test]
    fn test_connecting_error_begins_reconnecting() {
        let mut machine = LinkStateMachine::new(3);
        machine.connect(&complete_creds()).unwrap();

        machine.apply(LinkEvent::Error("dns failure".to_string()));
        assert_eq!(*machine.state(), LinkState::Reconnecting { attempt: 1 });
    }

    #[test]
    fn test_disconnect_cancels_and_stale_events_are_ignored() {
        let mut machine = LinkStateMachine::new(3);
        machine.connect(&complete_creds()).unwrap();
        machine.apply(LinkEvent::Up);
        machine.apply(LinkEvent::Down);

        machine.disconnect();
        assert_eq!(*machine.state(), LinkState::Disconnected);

        // A reconnect timer firing after cancellation must not resurrect
        // the cycle.
        assert!(!machine.apply(LinkEvent::Up));
        assert!(!machine.apply(LinkEvent::Error("late".to_string())));
        assert_eq!(*machine.state(), LinkState::Disconnected);
    }

    #[test]
    fn test_manual_connect_resumes_after_failure() {
        let mut machine = LinkStateMachine::new(1);
        machine.connect(&complete_creds()).unwrap();
        machine.apply(LinkEvent::Up);
        machine.apply(LinkEvent::Down);
        machine.apply(LinkEvent::Error("gone".to_string()));
        assert!(matches!(machine.state(), LinkState::Failed(_)));

        machine.connect(&complete_creds()).unwrap();
        assert_eq!(*machine.state(), LinkState::Connecting);
        assert_eq!(machine.reconnect_attempts(), 0);
    }

    #[test]
    fn test_status_projection() {
        let mut machine = LinkStateMachine::new(10);
        let status = machine.status();
        assert_eq!(status.state, LinkState::Idle);
        assert!(!status.connected);
        assert_eq!(status.reconnect_attempts, 0);
        assert_eq!(status.max_reconnect_attempts, 10);
        assert!(status.reason.is_none());

        machine.connect(&complete_creds()).unwrap();
        machine.apply(LinkEvent::Up);
        let status = machine.status();
        assert!(status.connected);

        // status() never mutates
        assert_eq!(machine.status(), machine.status());
    }

    #[test]
    fn test_status_serialization() {
        let mut machine = LinkStateMachine::new(3);
        machine.connect(&complete_creds()).unwrap();
        machine.apply(LinkEvent::Up);
        machine.apply(LinkEvent::Down);

        let json = serde_json::to_string(&machine.status()).unwrap();
        assert!(json.contains("\"state\":\"reconnecting\""));
        assert!(json.contains("\"connected\":false"));
        assert!(json.contains("\"reconnect_attempts\":1"));
    }

    #[test]
    fn test_failed_status_carries_reason() {
        let mut machine = LinkStateMachine::new(3);
        let creds = LinkCredentials::default();
        let _ = machine.connect(&creds);

        let status = machine.status();
        assert_eq!(status.state.label(), "failed");
        assert_eq!(status.reason.as_deref(), Some("configuration incomplete"));
    }
}
