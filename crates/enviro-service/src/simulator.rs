//! Synthetic-data simulator.
//!
//! Generates a bounded random walk around the current reading so the hub can
//! be exercised without hardware. The simulator is just another writer: every
//! generated patch goes through the same validate → update → broadcast path
//! as a REST write or a device-link payload.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::interval;
use tracing::{debug, info, warn};

use enviro_types::{Reading, ReadingPatch};

use crate::state::AppState;

/// Start the simulator task. Returns `false` if it was already running.
pub fn start(state: Arc<AppState>) -> bool {
    if !state.simulator.try_start() {
        debug!("simulator already running");
        return false;
    }

    info!("starting synthetic-data simulator");
    let stop_rx = state.simulator.subscribe_stop();
    tokio::spawn(async move {
        run(state, stop_rx).await;
    });
    true
}

/// Signal the simulator task to stop. Returns `false` if it was not running.
pub fn stop(state: &AppState) -> bool {
    if !state.simulator.is_running() {
        return false;
    }
    info!("stopping synthetic-data simulator");
    state.simulator.signal_stop();
    true
}

/// Generate one random-walk step from the current reading.
///
/// Each field drifts by at most its variance per tick and is clamped to a
/// plausible indoor band, so generated patches always pass validation.
fn next_patch(current: &Reading) -> ReadingPatch {
    let mut rng = rand::rng();
    ReadingPatch {
        temperature: Some(walk(&mut rng, current.temperature, 15.0, 35.0, 0.5)),
        humidity: Some(walk(&mut rng, current.humidity, 40.0, 80.0, 1.0)),
        light: Some(walk(&mut rng, current.light, 200.0, 1000.0, 20.0)),
        pwm: Some(walk(&mut rng, current.pwm, 0.0, 100.0, 2.0)),
    }
}

fn walk<R: Rng>(rng: &mut R, current: f64, min: f64, max: f64, variance: f64) -> f64 {
    (current + rng.random_range(-variance..=variance)).clamp(min, max)
}

async fn run(state: Arc<AppState>, mut stop_rx: tokio::sync::watch::Receiver<bool>) {
    let period = {
        let config = state.config.read().await;
        Duration::from_secs(config.simulator.interval_secs)
    };
    let mut ticker = interval(period);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let current = state.store.lock().await.snapshot();
                let patch = next_patch(&current);
                if let Err(errors) = state.apply_update(&patch).await {
                    // The walk is clamped to in-range values, so this only
                    // fires if the ranges and the walk bounds drift apart.
                    let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
                    warn!("simulated reading rejected: {}", details.join("; "));
                }
            }
            _ = stop_rx.changed() => {
                if *stop_rx.borrow() {
                    break;
                }
            }
        }
    }

    info!("simulator stopped");
}
