//! Access-pattern recording: bounded local history plus telemetry.
//!
//! Every authorization decision lands here exactly once. The recorder
//! keeps a most-recent-first ring buffer for the local heuristics (risk
//! banners, anomaly assessment) and enqueues a copy for a background task
//! that reports it to the authorization service. Reporting is
//! fire-and-forget: a failed POST is logged and the event discarded, and a
//! full queue drops the new event rather than block the decision path.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use parapet_client::AuthApi;
use parapet_risk::patterns;
use parapet_risk::{AccessPatternEvent, PatternAssessment, PatternSummary};

use crate::store::SessionStore;

/// Bounded, most-recent-first history of authorization decisions.
pub struct AccessPatternRecorder {
    capacity: usize,
    buffer: Mutex<VecDeque<AccessPatternEvent>>,
    telemetry_tx: mpsc::Sender<AccessPatternEvent>,
}

impl AccessPatternRecorder {
    /// Build a recorder and the queue end the telemetry drain consumes.
    pub fn new(
        capacity: usize,
        queue_depth: usize,
    ) -> (Self, mpsc::Receiver<AccessPatternEvent>) {
        let (telemetry_tx, telemetry_rx) = mpsc::channel(queue_depth.max(1));
        let recorder = Self {
            capacity: capacity.max(1),
            buffer: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            telemetry_tx,
        };
        (recorder, telemetry_rx)
    }

    /// Record one decision.
    ///
    /// Prepends to the buffer, dropping the oldest entry once the capacity
    /// is exceeded, and offers the event to the telemetry queue without
    /// waiting on it.
    pub fn record(&self, event: AccessPatternEvent) {
        {
            let mut buffer = lock_buffer(&self.buffer);
            buffer.push_front(event.clone());
            buffer.truncate(self.capacity);
        }

        if let Err(err) = self.telemetry_tx.try_send(event) {
            // Queue full or drain gone; the local buffer already has the
            // event, only the report is lost.
            tracing::warn!("dropping access-pattern report: {err}");
        }
    }

    /// Snapshot of the buffer, most recent first.
    pub fn recent(&self) -> Vec<AccessPatternEvent> {
        lock_buffer(&self.buffer).iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock_buffer(&self.buffer).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Aggregates over the events recorded within `window` of now.
    pub fn summarize(&self, window: Duration) -> PatternSummary {
        patterns::summarize(&self.recent(), window, Utc::now())
    }

    /// Anomaly heuristic over the events recorded within `window` of now.
    pub fn assess(&self, window: Duration) -> PatternAssessment {
        patterns::assess(&self.recent(), window, Utc::now())
    }
}

/// A poisoned buffer still holds usable events; keep serving them.
fn lock_buffer(
    buffer: &Mutex<VecDeque<AccessPatternEvent>>,
) -> std::sync::MutexGuard<'_, VecDeque<AccessPatternEvent>> {
    buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Spawn the background task that forwards recorded events to
/// `/log-access-pattern`.
///
/// One attempt per event, never retried: a failure is logged and the event
/// dropped. Events recorded while no session is active are dropped too,
/// since the endpoint requires a bearer token. The task ends when every
/// sender side of the queue is gone, or when the returned handle is
/// aborted.
pub fn spawn_telemetry_drain(
    mut queue: mpsc::Receiver<AccessPatternEvent>,
    api: Arc<dyn AuthApi>,
    store: Arc<SessionStore>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::debug!("telemetry drain started");

        while let Some(event) = queue.recv().await {
            let Some(token) = store.raw_token() else {
                tracing::debug!(
                    resource = %event.resource,
                    "dropping access-pattern report recorded without a session"
                );
                continue;
            };

            if let Err(err) = api.log_access_pattern(&token, &event).await {
                tracing::warn!("access-pattern report failed, discarding: {err}");
            }
        }

        tracing::debug!("telemetry drain stopped");
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
