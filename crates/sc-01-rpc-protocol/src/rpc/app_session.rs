//! Application session lifecycle builders.
//!
//! `close_app_session` carries this client's signature only. Collecting the
//! remaining participants' signatures up to quorum happens outside this crate.

use super::{build_session_signed, build_signed, RequestOptions};
use crate::domain::errors::ProtocolResult;
use crate::domain::methods::RpcMethod;
use crate::ports::outbound::MessageSigner;
use serde_json::{json, Value};
use shared_types::{CloseAppSessionRequest, CreateAppSessionRequest, SessionId};
use std::sync::Arc;
use tracing::instrument;

/// App session builders.
pub struct AppSessionRpc {
    signer: Arc<dyn MessageSigner>,
}

impl AppSessionRpc {
    pub fn new(signer: Arc<dyn MessageSigner>) -> Self {
        Self { signer }
    }

    /// get_app_definition - participants, weights and quorum of a session.
    #[instrument(skip(self))]
    pub async fn get_app_definition(
        &self,
        app_session_id: &str,
        opts: RequestOptions,
    ) -> ProtocolResult<String> {
        build_signed(
            self.signer.as_ref(),
            RpcMethod::GetAppDefinition,
            vec![json!({ "app_session_id": app_session_id })],
            opts,
        )
        .await
    }

    /// create_app_session - fixes participants and weights for the session's lifetime.
    #[instrument(skip(self))]
    pub async fn create_app_session(
        &self,
        request: &CreateAppSessionRequest,
        opts: RequestOptions,
    ) -> ProtocolResult<String> {
        build_signed(
            self.signer.as_ref(),
            RpcMethod::CreateAppSession,
            vec![serde_json::to_value(request)?],
            opts,
        )
        .await
    }

    /// close_app_session - final allocations, singly signed.
    #[instrument(skip(self))]
    pub async fn close_app_session(
        &self,
        request: &CloseAppSessionRequest,
        opts: RequestOptions,
    ) -> ProtocolResult<String> {
        build_signed(
            self.signer.as_ref(),
            RpcMethod::CloseAppSession,
            vec![serde_json::to_value(request)?],
            opts,
        )
        .await
    }

    /// message - opaque application payload scoped to `app_session_id`.
    #[instrument(skip(self, payload))]
    pub async fn message(
        &self,
        app_session_id: SessionId,
        payload: Value,
        opts: RequestOptions,
    ) -> ProtocolResult<String> {
        build_session_signed(
            self.signer.as_ref(),
            RpcMethod::Message,
            vec![payload],
            app_session_id,
            opts,
        )
        .await
    }
}
