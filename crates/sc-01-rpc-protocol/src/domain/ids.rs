//! Request ID and timestamp utilities.

use rand::Rng;
use shared_types::{RequestId, Timestamp};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Upper bound (exclusive) of the random offset added to the clock.
pub const REQUEST_ID_JITTER: u64 = 10_000;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        // Clock before Unix epoch - return 0 rather than panic
        .unwrap_or(0)
}

/// Highest ID handed out by this process.
static LAST_ISSUED: AtomicU64 = AtomicU64::new(0);

/// Fresh request ID: current time plus a random offset, so IDs from
/// consecutive connections rarely collide. Within one process IDs are
/// strictly increasing, so concurrent callers never share one.
pub fn generate_request_id() -> RequestId {
    let candidate = request_id_at(now_ms(), &mut rand::thread_rng());
    let next = |last: u64| candidate.max(last.saturating_add(1));
    match LAST_ISSUED.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(next(last))) {
        Ok(previous) | Err(previous) => next(previous),
    }
}

/// Deterministic core of [`generate_request_id`].
pub fn request_id_at<R: Rng + ?Sized>(now: Timestamp, rng: &mut R) -> RequestId {
    now.saturating_add(rng.gen_range(0..REQUEST_ID_JITTER))
}
