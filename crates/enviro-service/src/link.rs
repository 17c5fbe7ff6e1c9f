//! Cloud device-link runner.
//!
//! Owns the MQTT transport for the device-shadow channel and feeds the pure
//! state machine in `enviro-core` with transport events. The split keeps the
//! lifecycle logic testable without a broker: this module only translates —
//! `ConnAck` becomes [`LinkEvent::Up`], a poll error becomes
//! [`LinkEvent::Error`] — and reacts to the machine's answers.
//!
//! The transport task exits as soon as the machine leaves an active state
//! (manual disconnect, or the reconnect ceiling tripping into `Failed`), so
//! a cancelled link cannot keep polling in the background.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use enviro_core::events::DEVICE_LINK_SOURCE;
use enviro_core::shadow::{self, ShadowPayload};
use enviro_core::{Error, HubEvent, LinkCredentials, LinkEvent, LinkStatus, Result};
use enviro_types::{Reading, now_ms};

use crate::state::AppState;

/// Delay between transport polls after an error, pacing the retry cycle.
const RETRY_PACE: Duration = Duration::from_secs(1);

/// Begin a connection attempt and return the resulting status.
///
/// A no-op if the link is already connected or a cycle is in flight.
/// Incomplete credentials move the machine to `Failed(ConfigIncomplete)`
/// without starting a transport; the status projection carries the reason.
pub async fn connect(state: &Arc<AppState>) -> LinkStatus {
    let (credentials, keep_alive, broker_host) = {
        let config = state.config.read().await;
        (
            config.link.credentials(),
            config.link.keep_alive_secs,
            config.link.broker_host(),
        )
    };

    let status = {
        let mut machine = state.link.machine.lock().await;
        if machine.is_active() {
            debug!("device link already {}, ignoring connect", machine.state());
            return machine.status();
        }
        match machine.connect(&credentials) {
            Ok(()) => machine.status(),
            Err(e) => {
                warn!("device link connect skipped: {}", e);
                let status = machine.status();
                drop(machine);
                broadcast_status(state, &status);
                return status;
            }
        }
    };
    broadcast_status(state, &status);

    let mut options = MqttOptions::new(credentials.device_name.clone(), broker_host, 1883);
    options.set_keep_alive(Duration::from_secs(keep_alive));
    options.set_credentials(
        format!("{}&{}", credentials.device_name, credentials.product_key),
        credentials.device_secret.clone(),
    );

    let (client, eventloop) = AsyncClient::new(options, 64);
    *state.link.client.lock().await = Some(client);

    let task_state = Arc::clone(state);
    tokio::spawn(async move {
        run_transport(task_state, eventloop, credentials).await;
    });

    status
}

/// Force the link offline, cancelling any reconnect cycle, and return the
/// resulting status.
pub async fn disconnect(state: &Arc<AppState>) -> LinkStatus {
    let status = {
        let mut machine = state.link.machine.lock().await;
        machine.disconnect();
        machine.status()
    };

    if let Some(client) = state.link.client.lock().await.take() {
        let _ = client.disconnect().await;
    }

    broadcast_status(state, &status);
    status
}

/// Current status projection.
pub async fn status(state: &Arc<AppState>) -> LinkStatus {
    state.link.machine.lock().await.status()
}

/// Publish the current reading to the cloud under its wire names.
///
/// Rejected with [`Error::NotConnected`] unless the link is established.
/// A single send; retry policy belongs to the reconnection transitions, not
/// to individual publishes.
pub async fn publish_current(state: &Arc<AppState>) -> Result<Reading> {
    if !state.link.machine.lock().await.is_connected() {
        return Err(Error::NotConnected);
    }

    let (product_key, device_name) = {
        let config = state.config.read().await;
        (config.link.product_key.clone(), config.link.device_name.clone())
    };

    let reading = state.store.lock().await.snapshot();
    let topic = shadow::property_post_topic(&product_key, &device_name);
    let body = shadow::property_post_body(&reading).to_string();

    let client_guard = state.link.client.lock().await;
    let client = client_guard.as_ref().ok_or(Error::NotConnected)?;
    client
        .publish(&topic, QoS::AtLeastOnce, false, body.into_bytes())
        .await
        .map_err(Error::link)?;

    debug!("published current reading to '{}'", topic);
    Ok(reading)
}

/// Connect at boot when the credential triple is complete, per the
/// configuration. Incomplete credentials skip the link silently.
pub async fn auto_start(state: &Arc<AppState>) {
    let complete = state.config.read().await.link.credentials().is_complete();
    if complete {
        info!("device link credentials present, connecting");
        connect(state).await;
    } else {
        info!("device link credentials incomplete, skipping auto-connect");
    }
}

/// Drive the MQTT event loop until the machine goes inactive.
async fn run_transport(state: Arc<AppState>, mut eventloop: EventLoop, creds: LinkCredentials) {
    let set_topic = shadow::property_set_topic(&creds.product_key, &creds.device_name);

    loop {
        // A disconnect() or ceiling trip since the last poll ends the task;
        // stale polls must not outlive the cycle they belong to.
        if !state.link.machine.lock().await.is_active() {
            break;
        }

        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                apply_event(&state, LinkEvent::Up).await;

                // (Re)subscribe to the downlink topic on every session start.
                let client_guard = state.link.client.lock().await;
                if let Some(client) = client_guard.as_ref() {
                    if let Err(e) = client.subscribe(&set_topic, QoS::AtLeastOnce).await {
                        warn!("failed to subscribe to '{}': {}", set_topic, e);
                    }
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                handle_inbound(&state, &publish.topic, &publish.payload).await;
            }
            Ok(_) => {}
            Err(e) => {
                apply_event(&state, LinkEvent::Error(e.to_string())).await;
                sleep(RETRY_PACE).await;
            }
        }
    }

    state.link.client.lock().await.take();
    info!("device link transport stopped");
}

/// Feed one event to the machine and broadcast the status if it changed.
async fn apply_event(state: &Arc<AppState>, event: LinkEvent) {
    let changed_status = {
        let mut machine = state.link.machine.lock().await;
        machine.apply(event).then(|| machine.status())
    };
    if let Some(status) = changed_status {
        broadcast_status(state, &status);
    }
}

/// Decode an inbound device-shadow payload and push it through the normal
/// write path.
///
/// Malformed JSON and payloads with no decodable field are dropped here —
/// logged, never a store mutation. Payloads arriving while the link is not
/// `Connected` are logged as unexpected but still forwarded; the link layer
/// does not gate the data layer.
async fn handle_inbound(state: &Arc<AppState>, topic: &str, payload: &[u8]) {
    let shadow = match ShadowPayload::parse(payload) {
        Ok(shadow) => shadow,
        Err(e) => {
            warn!("malformed shadow payload on '{}': {}", topic, e);
            return;
        }
    };

    let patch = shadow.to_patch();
    if patch.is_empty() {
        debug!("shadow payload on '{}' carried no usable fields", topic);
        return;
    }

    if !state.link.machine.lock().await.is_connected() {
        warn!("shadow payload received while link not connected, forwarding anyway");
    }

    match state.apply_update(&patch).await {
        Ok(reading) => {
            let _ = state.events_tx.send(HubEvent::LinkDataReceived {
                source: DEVICE_LINK_SOURCE,
                reading,
                timestamp: now_ms(),
            });
            debug!(
                "device link reading applied (temperature={:.1}, humidity={:.1})",
                reading.temperature, reading.humidity
            );
        }
        Err(errors) => {
            let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
            warn!("device link reading rejected: {}", details.join("; "));
        }
    }
}

fn broadcast_status(state: &Arc<AppState>, status: &LinkStatus) {
    let _ = state.events_tx.send(HubEvent::LinkStatusChanged {
        status: status.clone(),
        connected: status.connected,
        timestamp: now_ms(),
    });
}
