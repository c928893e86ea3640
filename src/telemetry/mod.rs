//! Telemetry intake: a background poller fetches the agent's loosely-typed
//! status object and publishes it into a single shared slot. Exactly one
//! writer (the poll thread) and one reader (the frame loop); each published
//! snapshot carries a monotonic sequence number so the loop can skip
//! duplicates instead of feeding zero-dt samples into the filters.

pub mod normalize;

use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// One status payload as received from the tracking agent. Immutable once
/// published; the normalizer digs fields out of `value` on demand.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub seq: u64,
    pub received_at: Instant,
    pub value: serde_json::Value,
}

/// Single-slot mailbox between the poll thread and the frame loop.
#[derive(Debug, Default)]
pub struct SnapshotSlot {
    latest: Mutex<Option<Arc<Snapshot>>>,
}

impl SnapshotSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snapshot: Snapshot) {
        *self.latest.lock().unwrap() = Some(Arc::new(snapshot));
    }

    /// Latest published snapshot, if any. Cheap Arc clone; the frame loop
    /// compares `seq` against its last-seen value to detect staleness.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.latest.lock().unwrap().clone()
    }
}

fn build_agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(REQUEST_TIMEOUT))
        .build()
        .into()
}

/// Polls the status endpoint at a fixed target rate on a background thread.
///
/// Single-flight by construction: the loop issues one synchronous request,
/// publishes (or logs) the outcome, then sleeps out the remainder of the
/// poll interval before issuing the next. A fetch or parse failure leaves
/// the previously published snapshot untouched.
pub struct StatusPoller {
    slot: Arc<SnapshotSlot>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl StatusPoller {
    pub fn spawn(url: String, interval: Duration) -> Self {
        let slot = Arc::new(SnapshotSlot::new());
        let stop = Arc::new(AtomicBool::new(false));

        let slot_for_thread = Arc::clone(&slot);
        let stop_for_thread = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("telemetry-poll".into())
            .spawn(move || poll_loop(&url, interval, &slot_for_thread, &stop_for_thread))
            .expect("failed to spawn telemetry poll thread");

        info!("Telemetry poller started ({}ms interval)", interval.as_millis());
        Self {
            slot,
            stop,
            handle: Some(handle),
        }
    }

    pub fn slot(&self) -> Arc<SnapshotSlot> {
        Arc::clone(&self.slot)
    }

    /// Signals the poll thread to exit and waits for it. After this returns
    /// no further snapshots will be published.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn poll_loop(url: &str, interval: Duration, slot: &SnapshotSlot, stop: &AtomicBool) {
    let agent = build_agent();
    let mut seq: u64 = 0;
    let mut logged_failure = false;

    while !stop.load(Ordering::Relaxed) {
        let started = Instant::now();

        match agent.get(url).call() {
            Ok(resp) => {
                let mut body = resp.into_body();
                match body.read_json::<serde_json::Value>() {
                    Ok(value) => {
                        seq += 1;
                        slot.publish(Snapshot {
                            seq,
                            received_at: Instant::now(),
                            value,
                        });
                        logged_failure = false;
                    }
                    Err(e) => {
                        if !logged_failure {
                            warn!("Telemetry response is not valid JSON: {e}");
                            logged_failure = true;
                        }
                    }
                }
            }
            Err(e) => {
                // Stale-but-valid: keep whatever was last published.
                if !logged_failure {
                    warn!("Telemetry fetch failed: {e}");
                    logged_failure = true;
                } else {
                    debug!("Telemetry fetch still failing: {e}");
                }
            }
        }

        let elapsed = started.elapsed();
        if elapsed < interval {
            // Sleep in short slices so stop() is honored promptly.
            let mut remaining = interval - elapsed;
            while remaining > Duration::ZERO && !stop.load(Ordering::Relaxed) {
                let slice = remaining.min(Duration::from_millis(10));
                thread::sleep(slice);
                remaining = remaining.saturating_sub(slice);
            }
        }
    }
}
