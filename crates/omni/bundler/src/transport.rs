use std::borrow::Cow;
use std::future::Future;
use std::time::Duration;

use alloy_primitives::{Address, B256};
use alloy_rpc_client::RpcClient;
use alloy_transport::{RpcError, TransportError};
use alloy_transport_http::Http;
use tracing::trace;
use url::Url;

use crate::rpc::{RpcGasEstimate, RpcUserOperationV0_6, UserOperationReceipt};

/// Request timeout of the HTTP bundler client.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A failed bundler request.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("bundler unreachable: {0}")]
    Transport(#[source] TransportError),
    #[error("bundler rejected request ({code}): {message}")]
    Rejected {
        code: i64,
        message: String,
        data: Option<String>,
    },
}

impl RelayError {
    /// Connection level failures, where the same request may succeed later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Transport(RpcError::Transport(_) | RpcError::NullResp)
        )
    }
}

impl From<TransportError> for RelayError {
    fn from(err: TransportError) -> Self {
        match err {
            RpcError::ErrorResp(payload) => Self::Rejected {
                code: payload.code,
                message: payload.message.to_string(),
                data: payload.data.map(|data| data.get().to_string()),
            },
            other => Self::Transport(other),
        }
    }
}

/// The bundler JSON-RPC surface used to relay user operations.
pub trait BundlerTransport: Send + Sync {
    fn estimate_user_operation_gas(
        &self,
        op: &RpcUserOperationV0_6,
        entry_point: Address,
    ) -> impl Future<Output = Result<RpcGasEstimate, RelayError>> + Send;

    /// Submits `op`; returns the operation hash the bundler computed.
    fn send_user_operation(
        &self,
        op: &RpcUserOperationV0_6,
        entry_point: Address,
    ) -> impl Future<Output = Result<B256, RelayError>> + Send;

    /// `None` while the operation is not yet included.
    fn get_user_operation_receipt(
        &self,
        user_op_hash: B256,
    ) -> impl Future<Output = Result<Option<UserOperationReceipt>, RelayError>> + Send;

    fn supported_entry_points(
        &self,
    ) -> impl Future<Output = Result<Vec<Address>, RelayError>> + Send;
}

/// Bundler reached over HTTP JSON-RPC.
#[derive(Debug, Clone)]
pub struct HttpBundler {
    client: RpcClient,
    url: Url,
}

impl HttpBundler {
    pub fn new(url: Url) -> Result<Self, reqwest::Error> {
        Self::with_timeout(url, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        let http = Http::with_client(http_client, url.clone());
        Ok(Self {
            client: RpcClient::new(http, false),
            url,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl BundlerTransport for HttpBundler {
    async fn estimate_user_operation_gas(
        &self,
        op: &RpcUserOperationV0_6,
        entry_point: Address,
    ) -> Result<RpcGasEstimate, RelayError> {
        trace!(target: "versa_omni::bundler", url = %self.url, sender = %op.sender, "eth_estimateUserOperationGas");
        Ok(self
            .client
            .request(
                Cow::Borrowed("eth_estimateUserOperationGas"),
                (op.clone(), entry_point),
            )
            .await?)
    }

    async fn send_user_operation(
        &self,
        op: &RpcUserOperationV0_6,
        entry_point: Address,
    ) -> Result<B256, RelayError> {
        trace!(target: "versa_omni::bundler", url = %self.url, sender = %op.sender, "eth_sendUserOperation");
        Ok(self
            .client
            .request(
                Cow::Borrowed("eth_sendUserOperation"),
                (op.clone(), entry_point),
            )
            .await?)
    }

    async fn get_user_operation_receipt(
        &self,
        user_op_hash: B256,
    ) -> Result<Option<UserOperationReceipt>, RelayError> {
        Ok(self
            .client
            .request(
                Cow::Borrowed("eth_getUserOperationReceipt"),
                (user_op_hash,),
            )
            .await?)
    }

    async fn supported_entry_points(&self) -> Result<Vec<Address>, RelayError> {
        Ok(self
            .client
            .request_noparams(Cow::Borrowed("eth_supportedEntryPoints"))
            .await?)
    }
}
