//! Authentication handshake builders.
//!
//! ```text
//! client                         broker
//!   | auth_request (sentinel sig)  |
//!   |----------------------------->|
//!   |          auth_challenge      |
//!   |<-----------------------------|
//!   | auth_verify (EIP-712 sig)    |
//!   |----------------------------->|
//!   |   auth_verify {success,jwt}  |
//!   |<-----------------------------|
//! ```

use super::RequestOptions;
use crate::domain::auth_policy::auth_typed_data;
use crate::domain::envelope::create_request;
use crate::domain::errors::{ProtocolError, ProtocolResult};
use crate::domain::methods::RpcMethod;
use crate::domain::parse::{parse_response, RawMessage};
use crate::ports::outbound::MessageSigner;
use serde_json::{json, Value};
use shared_types::AuthRequestParams;
use std::sync::Arc;
use tracing::instrument;

/// Auth builders bound to one identity and one set of declared parameters.
pub struct AuthRpc {
    identity: Arc<dyn MessageSigner>,
    params: AuthRequestParams,
}

impl AuthRpc {
    pub fn new(identity: Arc<dyn MessageSigner>, params: AuthRequestParams) -> Self {
        Self { identity, params }
    }

    pub fn params(&self) -> &AuthRequestParams {
        &self.params
    }

    /// auth_request - opens the handshake. Not signed: it carries the `[""]`
    /// sentinel signature slot.
    #[instrument(skip(self))]
    pub fn auth_request(&self, opts: RequestOptions) -> ProtocolResult<String> {
        let p = &self.params;
        let params = vec![
            json!(p.wallet),
            json!(p.participant),
            json!(p.app_name),
            serde_json::to_value(&p.allowances)?,
            json!(p.expire.clone().unwrap_or_default()),
            json!(p.scope.clone().unwrap_or_default()),
            json!(p.application.map(|a| a.to_hex()).unwrap_or_default()),
        ];
        let mut envelope = create_request(
            opts.request_id,
            RpcMethod::AuthRequest.as_str(),
            params,
            opts.timestamp,
        );
        envelope.signatures = vec![String::new()];
        envelope.to_json()
    }

    /// auth_verify - answers `challenge` with an EIP-712 signature by the identity key.
    #[instrument(skip(self))]
    pub async fn auth_verify_from_challenge(
        &self,
        challenge: &str,
        opts: RequestOptions,
    ) -> ProtocolResult<String> {
        let typed = auth_typed_data(&self.params, challenge);
        let signature = self.identity.sign_typed_data(&typed).await?;
        let mut envelope = create_request(
            opts.request_id,
            RpcMethod::AuthVerify.as_str(),
            vec![json!({ "challenge": challenge })],
            opts.timestamp,
        );
        envelope.signatures = vec![signature];
        envelope.to_json()
    }

    /// auth_verify - answers a raw `auth_challenge` response.
    ///
    /// Rejects anything that is not literally an `auth_challenge` carrying a
    /// `challenge_message` string in its first data element.
    pub async fn auth_verify_from_response<'a>(
        &self,
        raw: impl Into<RawMessage<'a>>,
        opts: RequestOptions,
    ) -> ProtocolResult<String> {
        let challenge = challenge_from_response(raw)?;
        self.auth_verify_from_challenge(&challenge, opts).await
    }

    /// auth_verify - resumes a session with a previously issued JWT. Not signed.
    #[instrument(skip(self, jwt))]
    pub fn auth_verify_with_jwt(&self, jwt: &str, opts: RequestOptions) -> ProtocolResult<String> {
        auth_verify_with_jwt(jwt, opts)
    }
}

/// auth_verify carrying a JWT and no signatures.
pub fn auth_verify_with_jwt(jwt: &str, opts: RequestOptions) -> ProtocolResult<String> {
    create_request(
        opts.request_id,
        RpcMethod::AuthVerify.as_str(),
        vec![json!({ "jwt": jwt })],
        opts.timestamp,
    )
    .to_json()
}

/// The `challenge_message` of a parsed `auth_challenge` response.
pub fn challenge_from_response<'a>(raw: impl Into<RawMessage<'a>>) -> ProtocolResult<String> {
    let parsed = parse_response(raw);
    if !parsed.is_valid {
        return Err(ProtocolError::InvalidResponse(
            parsed.error.unwrap_or_default(),
        ));
    }

    let method = parsed.method.unwrap_or_default();
    if method != RpcMethod::AuthChallenge.as_str() {
        return Err(ProtocolError::UnexpectedMethod {
            expected: RpcMethod::AuthChallenge.as_str().to_string(),
            actual: method,
        });
    }

    parsed
        .data
        .as_ref()
        .and_then(|d| d.get(0))
        .and_then(|first| first.get("challenge_message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ProtocolError::MissingChallenge)
}
