//! Typed events fanned out to connected observers.
//!
//! The hub emits events onto a broadcast channel; the WebSocket layer (and
//! any other notifier) subscribes and forwards them. There is no direct
//! coupling between link internals and transport code — everything goes
//! through [`HubEvent`].

use serde::Serialize;
use tokio::sync::broadcast;

use enviro_types::Reading;

use crate::link::LinkStatus;

/// Source tag carried by link-originated data events.
pub const DEVICE_LINK_SOURCE: &str = "device-link";

/// Events broadcast by the hub.
///
/// Serialized with a kebab-case `type` tag so observers can dispatch on the
/// event name.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
#[non_exhaustive]
pub enum HubEvent {
    /// The current reading changed (any write source).
    ReadingChanged {
        /// The new current reading.
        reading: Reading,
    },
    /// The device link moved to a new state.
    LinkStatusChanged {
        /// Status projection at the time of the change.
        status: LinkStatus,
        /// Convenience copy of `status.connected`.
        connected: bool,
        /// Milliseconds since the Unix epoch.
        timestamp: i64,
    },
    /// A reading arrived over the device link.
    LinkDataReceived {
        /// Always [`DEVICE_LINK_SOURCE`].
        source: &'static str,
        /// The reading after merging into the store.
        reading: Reading,
        /// Milliseconds since the Unix epoch.
        timestamp: i64,
    },
}

/// Sender half of the event channel.
pub type EventSender = broadcast::Sender<HubEvent>;

/// Receiver half of the event channel.
pub type EventReceiver = broadcast::Receiver<HubEvent>;

/// Create a new event channel with the given buffer capacity.
///
/// Slow subscribers that fall behind by more than the capacity lose the
/// oldest events; senders never block.
#[must_use]
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    broadcast::channel(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkStateMachine;

    fn reading() -> Reading {
        Reading {
            temperature: 22.5,
            humidity: 45.0,
            light: 980.0,
            pwm: 33.0,
            timestamp: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_reading_changed_serialization() {
        let event = HubEvent::ReadingChanged { reading: reading() };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"reading-changed\""));
        assert!(json.contains("\"temperature\":22.5"));
    }

    #[test]
    fn test_link_status_changed_serialization() {
        let machine = LinkStateMachine::new(10);
        let event = HubEvent::LinkStatusChanged {
            status: machine.status(),
            connected: false,
            timestamp: 1_700_000_000_000,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"link-status-changed\""));
        assert!(json.contains("\"state\":\"idle\""));
    }

    #[test]
    fn test_link_data_received_serialization() {
        let event = HubEvent::LinkDataReceived {
            source: DEVICE_LINK_SOURCE,
            reading: reading(),
            timestamp: 1_700_000_000_001,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"link-data-received\""));
        assert!(json.contains("\"source\":\"device-link\""));
    }

    #[tokio::test]
    async fn test_event_channel_delivers_to_multiple_receivers() {
        let (tx, mut rx1) = event_channel(16);
        let mut rx2 = tx.subscribe();

        tx.send(HubEvent::ReadingChanged { reading: reading() })
            .unwrap();

        assert!(matches!(
            rx1.recv().await.unwrap(),
            HubEvent::ReadingChanged { .. }
        ));
        assert!(matches!(
            rx2.recv().await.unwrap(),
            HubEvent::ReadingChanged { .. }
        ));
    }
}
