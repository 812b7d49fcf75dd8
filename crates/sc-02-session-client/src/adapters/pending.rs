//! Pending Request Store - correlates outbound requests with inbound responses.
//!
//! Owned exclusively by the session task, so no interior locking.
//!
//! Flow:
//! 1. The session task calls `register()` with the request ID and the caller's
//!    oneshot sender, before the frame is written
//! 2. An inbound response with that ID calls `complete()`
//! 3. The task sleeps until `next_deadline()` and calls `expire_due()`
//! 4. On disconnect `reject_all()` fails everything still outstanding

use crate::domain::error::ClientError;
use serde::Serialize;
use serde_json::Value;
use shared_types::RequestId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Outcome delivered to the waiting caller.
pub type RpcOutcome = Result<Value, ClientError>;

/// A pending request waiting for response
struct PendingRequest {
    /// Channel to send response
    sender: oneshot::Sender<RpcOutcome>,
    /// When request was created
    created_at: Instant,
    /// When it times out
    deadline: Instant,
    /// Method name (for logging and timeout errors)
    method: String,
}

/// Statistics for pending request store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PendingStats {
    /// Total requests registered
    pub registered: u64,
    /// Total requests answered (successfully or with a broker error)
    pub completed: u64,
    /// Total requests timed out
    pub timed_out: u64,
    /// Total requests rejected by a disconnect
    pub rejected: u64,
}

pub struct PendingRequestStore {
    pending: HashMap<RequestId, PendingRequest>,
    default_timeout: Duration,
    stats: PendingStats,
}

impl PendingRequestStore {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            default_timeout,
            stats: PendingStats::default(),
        }
    }

    /// Register a pending request.
    ///
    /// Fails with the sender handed back when `request_id` is already pending.
    pub fn register(
        &mut self,
        request_id: RequestId,
        method: &str,
        timeout: Option<Duration>,
        sender: oneshot::Sender<RpcOutcome>,
    ) -> Result<(), oneshot::Sender<RpcOutcome>> {
        if self.pending.contains_key(&request_id) {
            return Err(sender);
        }

        let now = Instant::now();
        let request = PendingRequest {
            sender,
            created_at: now,
            deadline: now + timeout.unwrap_or(self.default_timeout),
            method: method.to_string(),
        };
        self.pending.insert(request_id, request);
        self.stats.registered += 1;

        debug!(request_id, method, "Registered pending request");
        Ok(())
    }

    /// Resolve a pending request.
    ///
    /// Returns false if no request with this ID is pending.
    pub fn complete(&mut self, request_id: RequestId, outcome: RpcOutcome) -> bool {
        let Some(pending) = self.pending.remove(&request_id) else {
            return false;
        };

        self.stats.completed += 1;
        let response_time = pending.created_at.elapsed();
        if pending.sender.send(outcome).is_err() {
            debug!(
                request_id,
                method = pending.method,
                "Pending request receiver dropped"
            );
        } else {
            debug!(
                request_id,
                method = pending.method,
                response_time_ms = response_time.as_millis() as u64,
                "Completed pending request"
            );
        }
        true
    }

    /// Method of a pending request.
    pub fn method_of(&self, request_id: RequestId) -> Option<&str> {
        self.pending.get(&request_id).map(|p| p.method.as_str())
    }

    /// Earliest deadline among pending requests.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Fail every request whose deadline is at or before `now`.
    ///
    /// Returns the number of requests expired.
    pub fn expire_due(&mut self, now: Instant) -> usize {
        let due: Vec<RequestId> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(id, _)| *id)
            .collect();

        for request_id in &due {
            if let Some(pending) = self.pending.remove(request_id) {
                warn!(
                    request_id = *request_id,
                    method = pending.method,
                    elapsed_ms = now.duration_since(pending.created_at).as_millis() as u64,
                    "Pending request timed out"
                );
                self.stats.timed_out += 1;
                let _ = pending.sender.send(Err(ClientError::RequestTimeout {
                    request_id: *request_id,
                    method: pending.method,
                }));
            }
        }
        due.len()
    }

    /// Fail every pending request, e.g. on disconnect.
    pub fn reject_all(&mut self, reason: &str) -> usize {
        let count = self.pending.len();
        for (request_id, pending) in self.pending.drain() {
            debug!(request_id, method = pending.method, reason, "Rejecting pending request");
            let _ = pending
                .sender
                .send(Err(ClientError::Disconnected(reason.to_string())));
        }
        self.stats.rejected += count as u64;
        count
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, request_id: RequestId) -> bool {
        self.pending.contains_key(&request_id)
    }

    pub fn stats(&self) -> PendingStats {
        self.stats
    }
}
