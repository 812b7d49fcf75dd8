//! Liveness, configuration and ledger queries.

use super::{build_signed, RequestOptions};
use crate::domain::errors::ProtocolResult;
use crate::domain::methods::RpcMethod;
use crate::ports::outbound::MessageSigner;
use serde_json::json;
use shared_types::Address;
use std::sync::Arc;
use tracing::instrument;

/// Ledger and broker query builders.
pub struct LedgerRpc {
    signer: Arc<dyn MessageSigner>,
}

impl LedgerRpc {
    pub fn new(signer: Arc<dyn MessageSigner>) -> Self {
        Self { signer }
    }

    /// ping - liveness probe, answered with `pong`.
    #[instrument(skip(self))]
    pub async fn ping(&self, opts: RequestOptions) -> ProtocolResult<String> {
        build_signed(self.signer.as_ref(), RpcMethod::Ping, vec![], opts).await
    }

    /// get_config - broker configuration (networks, custody addresses).
    #[instrument(skip(self))]
    pub async fn get_config(&self, opts: RequestOptions) -> ProtocolResult<String> {
        build_signed(self.signer.as_ref(), RpcMethod::GetConfig, vec![], opts).await
    }

    /// get_ledger_balances - unified ledger balances of `participant`.
    #[instrument(skip(self))]
    pub async fn get_ledger_balances(
        &self,
        participant: &Address,
        opts: RequestOptions,
    ) -> ProtocolResult<String> {
        build_signed(
            self.signer.as_ref(),
            RpcMethod::GetLedgerBalances,
            vec![json!({ "participant": participant })],
            opts,
        )
        .await
    }
}
