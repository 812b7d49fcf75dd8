//! Reconnect policy: `delay(attempt) = base_delay * factor^attempt`, bounded
//! by a maximum number of attempts.
//!
//! ```text
//! Disconnected x UncleanClose -> Reconnecting(attempt + 1)   while attempt < max
//!                             -> ConnectionLost               otherwise
//! ```

use super::config::ReconnectConfig;
use std::time::Duration;

/// Upper bound on any single delay.
pub const MAX_RECONNECT_DELAY: Duration = Duration::from_secs(300);

/// What to do after an unclean disconnect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReconnectDecision {
    /// Reconnect after `delay`; `attempt` is 1-based.
    Retry { attempt: u32, delay: Duration },
    /// Stop; `attempts` reconnects were already made.
    GiveUp { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    pub base_delay: Duration,
    pub factor: f64,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    /// Delay before the reconnect following `attempts_made` earlier ones.
    pub fn delay(&self, attempts_made: u32) -> Duration {
        let exponent = i32::try_from(attempts_made).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.factor.powi(exponent);
        if !secs.is_finite() || secs >= MAX_RECONNECT_DELAY.as_secs_f64() {
            return MAX_RECONNECT_DELAY;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Decide after a disconnect, given how many reconnects were already made.
    pub fn decide(&self, attempts_made: u32) -> ReconnectDecision {
        if !self.enabled || attempts_made >= self.max_attempts {
            return ReconnectDecision::GiveUp {
                attempts: attempts_made,
            };
        }
        ReconnectDecision::Retry {
            attempt: attempts_made + 1,
            delay: self.delay(attempts_made),
        }
    }
}

impl From<&ReconnectConfig> for ReconnectPolicy {
    fn from(config: &ReconnectConfig) -> Self {
        Self {
            enabled: config.enabled,
            base_delay: config.base_delay,
            factor: config.factor,
            max_attempts: config.max_attempts,
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from(&ReconnectConfig::default())
    }
}
