//! Channel lifecycle builders.

use super::{build_signed, RequestOptions};
use crate::domain::errors::ProtocolResult;
use crate::domain::methods::RpcMethod;
use crate::ports::outbound::MessageSigner;
use shared_types::{CloseChannelRequest, GetChannelsRequest, ResizeChannelRequest};
use std::sync::Arc;
use tracing::instrument;

/// Channel builders.
pub struct ChannelRpc {
    signer: Arc<dyn MessageSigner>,
}

impl ChannelRpc {
    pub fn new(signer: Arc<dyn MessageSigner>) -> Self {
        Self { signer }
    }

    /// close_channel - cooperative close; the broker answers with the final
    /// state to submit on chain.
    #[instrument(skip(self))]
    pub async fn close_channel(
        &self,
        request: &CloseChannelRequest,
        opts: RequestOptions,
    ) -> ProtocolResult<String> {
        build_signed(
            self.signer.as_ref(),
            RpcMethod::CloseChannel,
            vec![serde_json::to_value(request)?],
            opts,
        )
        .await
    }

    /// resize_channel
    #[instrument(skip(self))]
    pub async fn resize_channel(
        &self,
        request: &ResizeChannelRequest,
        opts: RequestOptions,
    ) -> ProtocolResult<String> {
        build_signed(
            self.signer.as_ref(),
            RpcMethod::ResizeChannel,
            vec![serde_json::to_value(request)?],
            opts,
        )
        .await
    }

    /// get_channels - filtered by participant and/or status.
    #[instrument(skip(self))]
    pub async fn get_channels(
        &self,
        filter: &GetChannelsRequest,
        opts: RequestOptions,
    ) -> ProtocolResult<String> {
        build_signed(
            self.signer.as_ref(),
            RpcMethod::GetChannels,
            vec![serde_json::to_value(filter)?],
            opts,
        )
        .await
    }
}
