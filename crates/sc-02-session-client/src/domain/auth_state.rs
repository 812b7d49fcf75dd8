//! Authentication state machine.
//!
//! ```text
//! Disconnected -> Connecting -> AwaitingChallenge -> AwaitingVerifyResult -> Authenticated
//!                     |  (JWT resume) ------------------^        |
//!                     |                 AwaitingChallenge <------+ (JWT rejected)
//!   any in-flight state --(rejected | timed out)--> Failed
//!   any state --(closed)--> Disconnected
//! ```
//!
//! Transitions are a pure function so ordering rules (e.g. a late
//! `auth_challenge` after the verify was sent) are decided here, not by
//! transport ordering.

use serde::Serialize;
use std::fmt;

/// Per-connection authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    #[default]
    Disconnected,
    Connecting,
    AwaitingChallenge,
    AwaitingVerifyResult,
    Authenticated,
    Failed,
}

/// Inputs of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    /// A socket is being opened.
    ConnectStarted,
    /// Socket open, `auth_request` sent.
    AuthRequestSent,
    /// Socket open, JWT `auth_verify` sent.
    ResumeSent,
    /// Challenge answered with a signed `auth_verify`.
    ChallengeAnswered,
    /// Broker accepted `auth_verify`.
    Verified,
    /// Broker rejected a JWT; falling back to the full handshake.
    ResumeRejected,
    /// Broker returned an error during the handshake.
    Rejected,
    /// No terminal auth message within the window.
    TimedOut,
    /// Socket closed, for whatever reason.
    Closed,
}

impl AuthState {
    /// Next state, or `None` when `event` is not valid in this state.
    pub fn on(self, event: AuthEvent) -> Option<AuthState> {
        use AuthEvent::*;
        use AuthState::*;

        match (self, event) {
            (Disconnected | Failed, ConnectStarted) => Some(Connecting),
            (Connecting, AuthRequestSent) => Some(AwaitingChallenge),
            (Connecting, ResumeSent) => Some(AwaitingVerifyResult),
            (AwaitingChallenge, ChallengeAnswered) => Some(AwaitingVerifyResult),
            (AwaitingVerifyResult, Verified) => Some(Authenticated),
            (AwaitingVerifyResult, ResumeRejected) => Some(AwaitingChallenge),
            (Connecting | AwaitingChallenge | AwaitingVerifyResult, Rejected | TimedOut) => {
                Some(Failed)
            }
            (_, Closed) => Some(Disconnected),
            _ => None,
        }
    }

    /// A handshake is in flight.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            AuthState::Connecting | AuthState::AwaitingChallenge | AuthState::AwaitingVerifyResult
        )
    }

    pub fn is_authenticated(self) -> bool {
        self == AuthState::Authenticated
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthState::Disconnected => "disconnected",
            AuthState::Connecting => "connecting",
            AuthState::AwaitingChallenge => "awaiting_challenge",
            AuthState::AwaitingVerifyResult => "awaiting_verify_result",
            AuthState::Authenticated => "authenticated",
            AuthState::Failed => "failed",
        };
        f.write_str(name)
    }
}
