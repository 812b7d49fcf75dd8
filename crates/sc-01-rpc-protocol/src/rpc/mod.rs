//! # RPC Method Builders
//!
//! One constructor per broker method. Builders take typed parameters, lay
//! them out in the positional order the broker expects, sign where the method
//! requires it and return the JSON text ready for transmission. They never
//! send anything.

pub mod app_session;
pub mod auth;
pub mod channel;
pub mod ledger;

pub use app_session::AppSessionRpc;
pub use auth::AuthRpc;
pub use channel::ChannelRpc;
pub use ledger::LedgerRpc;

use crate::domain::envelope::{create_request, create_session_request};
use crate::domain::errors::ProtocolResult;
use crate::domain::methods::RpcMethod;
use crate::domain::signing::sign_request;
use crate::ports::outbound::MessageSigner;
use serde_json::Value;
use shared_types::{AuthRequestParams, RequestId, SessionId, Timestamp};
use std::sync::Arc;

/// Overrides for the generated request ID and timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub request_id: Option<RequestId>,
    pub timestamp: Option<Timestamp>,
}

impl RequestOptions {
    /// Fix the request ID, e.g. so the caller can correlate the response.
    pub fn with_id(request_id: RequestId) -> Self {
        Self {
            request_id: Some(request_id),
            timestamp: None,
        }
    }

    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Build, sign with `signer` and serialize a request.
pub(crate) async fn build_signed(
    signer: &dyn MessageSigner,
    method: RpcMethod,
    params: Vec<Value>,
    opts: RequestOptions,
) -> ProtocolResult<String> {
    let envelope = create_request(opts.request_id, method.as_str(), params, opts.timestamp);
    sign_request(envelope, signer).await?.to_json()
}

/// Like [`build_signed`], scoped to a session/topic.
pub(crate) async fn build_session_signed(
    signer: &dyn MessageSigner,
    method: RpcMethod,
    params: Vec<Value>,
    session_id: SessionId,
    opts: RequestOptions,
) -> ProtocolResult<String> {
    let envelope = create_session_request(
        opts.request_id,
        method.as_str(),
        params,
        opts.timestamp,
        session_id,
    );
    sign_request(envelope, signer).await?.to_json()
}

/// Every builder, sharing one session-key signer.
pub struct RpcBuilders {
    pub auth: AuthRpc,
    pub ledger: LedgerRpc,
    pub app_session: AppSessionRpc,
    pub channel: ChannelRpc,
}

impl RpcBuilders {
    /// `identity` answers the auth challenge; `session_key` signs everything else.
    pub fn new(
        identity: Arc<dyn MessageSigner>,
        session_key: Arc<dyn MessageSigner>,
        auth_params: AuthRequestParams,
    ) -> Self {
        Self {
            auth: AuthRpc::new(identity, auth_params),
            ledger: LedgerRpc::new(Arc::clone(&session_key)),
            app_session: AppSessionRpc::new(Arc::clone(&session_key)),
            channel: ChannelRpc::new(session_key),
        }
    }
}
