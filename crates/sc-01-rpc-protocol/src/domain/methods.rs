//! Method catalogue of the broker protocol.
//!
//! Every name the client produces or consumes, with how its outbound
//! envelope is authenticated.

use std::fmt;
use std::str::FromStr;

/// How an outbound envelope for a method is authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningMode {
    /// Carries the sentinel `[""]` signature slot.
    Sentinel,
    /// Carries no signature at all (the JWT is the credential).
    Unsigned,
    /// Signed by the session key.
    SessionKey,
    /// Signed over EIP-712 typed data by the identity key.
    TypedData,
    /// Never sent by the client.
    InboundOnly,
}

/// Wire method names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcMethod {
    AuthRequest,
    AuthChallenge,
    AuthVerify,
    Error,
    Ping,
    Pong,
    GetConfig,
    GetLedgerBalances,
    GetAppDefinition,
    CreateAppSession,
    CloseAppSession,
    Message,
    CloseChannel,
    ResizeChannel,
    GetChannels,
}

/// Static metadata for one method.
#[derive(Debug, Clone, Copy)]
pub struct MethodInfo {
    pub method: RpcMethod,
    pub signing: SigningMode,
    /// Part of the authentication handshake, never correlated as a normal request.
    pub is_auth: bool,
    pub description: &'static str,
}

impl MethodInfo {
    const fn new(
        method: RpcMethod,
        signing: SigningMode,
        is_auth: bool,
        description: &'static str,
    ) -> Self {
        Self {
            method,
            signing,
            is_auth,
            description,
        }
    }
}

const METHODS: &[MethodInfo] = &[
    MethodInfo::new(RpcMethod::AuthRequest, SigningMode::Sentinel, true, "Open the auth handshake"),
    MethodInfo::new(RpcMethod::AuthChallenge, SigningMode::InboundOnly, true, "Broker challenge"),
    MethodInfo::new(
        RpcMethod::AuthVerify,
        SigningMode::TypedData,
        true,
        "Answer the challenge or present a JWT",
    ),
    MethodInfo::new(RpcMethod::Error, SigningMode::InboundOnly, false, "Error response"),
    MethodInfo::new(RpcMethod::Ping, SigningMode::SessionKey, false, "Liveness probe"),
    MethodInfo::new(RpcMethod::Pong, SigningMode::InboundOnly, false, "Liveness reply"),
    MethodInfo::new(RpcMethod::GetConfig, SigningMode::SessionKey, false, "Broker configuration"),
    MethodInfo::new(
        RpcMethod::GetLedgerBalances,
        SigningMode::SessionKey,
        false,
        "Unified ledger balances",
    ),
    MethodInfo::new(
        RpcMethod::GetAppDefinition,
        SigningMode::SessionKey,
        false,
        "Definition of an app session",
    ),
    MethodInfo::new(
        RpcMethod::CreateAppSession,
        SigningMode::SessionKey,
        false,
        "Open an app session",
    ),
    MethodInfo::new(
        RpcMethod::CloseAppSession,
        SigningMode::SessionKey,
        false,
        "Close an app session with final allocations",
    ),
    MethodInfo::new(
        RpcMethod::Message,
        SigningMode::SessionKey,
        false,
        "Opaque in-session message",
    ),
    MethodInfo::new(
        RpcMethod::CloseChannel,
        SigningMode::SessionKey,
        false,
        "Cooperatively close a channel",
    ),
    MethodInfo::new(RpcMethod::ResizeChannel, SigningMode::SessionKey, false, "Resize a channel"),
    MethodInfo::new(RpcMethod::GetChannels, SigningMode::SessionKey, false, "List channels"),
];

impl RpcMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RpcMethod::AuthRequest => "auth_request",
            RpcMethod::AuthChallenge => "auth_challenge",
            RpcMethod::AuthVerify => "auth_verify",
            RpcMethod::Error => "error",
            RpcMethod::Ping => "ping",
            RpcMethod::Pong => "pong",
            RpcMethod::GetConfig => "get_config",
            RpcMethod::GetLedgerBalances => "get_ledger_balances",
            RpcMethod::GetAppDefinition => "get_app_definition",
            RpcMethod::CreateAppSession => "create_app_session",
            RpcMethod::CloseAppSession => "close_app_session",
            RpcMethod::Message => "message",
            RpcMethod::CloseChannel => "close_channel",
            RpcMethod::ResizeChannel => "resize_channel",
            RpcMethod::GetChannels => "get_channels",
        }
    }

    /// Metadata for this method.
    pub fn info(&self) -> MethodInfo {
        METHODS
            .iter()
            .copied()
            .find(|info| info.method == *self)
            .unwrap_or(MethodInfo::new(*self, SigningMode::InboundOnly, false, ""))
    }

    /// All known methods.
    pub fn all() -> impl Iterator<Item = RpcMethod> {
        METHODS.iter().map(|info| info.method)
    }
}

impl fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown method name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMethod(pub String);

impl fmt::Display for UnknownMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown method: {}", self.0)
    }
}

impl std::error::Error for UnknownMethod {}

impl FromStr for RpcMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RpcMethod::all()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

/// True when `method` names part of the auth handshake.
pub fn is_auth_method(method: &str) -> bool {
    method
        .parse::<RpcMethod>()
        .map(|m| m.info().is_auth)
        .unwrap_or(false)
}
