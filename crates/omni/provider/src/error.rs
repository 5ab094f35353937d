use alloy_primitives::{Bytes, B256};
use alloy_provider::PendingTransactionError;
use alloy_sol_types::decode_revert_reason;
use alloy_transport::{RpcError, TransportError};

/// JSON-RPC error codes nodes use for rate limiting.
const RATE_LIMITED_CODES: [i64; 2] = [429, -32005];

/// Failure of a contract read or write.
///
/// Transport failures (connection refused, timeouts, rate limits) are kept apart
/// from on-chain reverts so callers can retry the former and surface the latter.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),
    #[error("execution reverted: {reason}")]
    Reverted { reason: String, data: Option<Bytes> },
    #[error("node rejected request ({code}): {message}")]
    Rpc { code: i64, message: String },
    #[error("could not decode contract return data: {0}")]
    Decode(#[from] alloy_sol_types::Error),
    #[error("transaction {0} was included but failed")]
    TransactionFailed(B256),
    #[error("waiting for transaction: {0}")]
    Pending(#[from] PendingTransactionError),
}

impl ContractError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(err) => is_transient_transport(err),
            Self::Rpc { code, .. } => RATE_LIMITED_CODES.contains(code),
            Self::Pending(PendingTransactionError::TransportError(err)) => {
                is_transient_transport(err)
            }
            _ => false,
        }
    }

    /// The decoded revert reason, if the failure was a revert.
    pub fn revert_reason(&self) -> Option<&str> {
        match self {
            Self::Reverted { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

fn is_transient_transport(err: &TransportError) -> bool {
    matches!(err, RpcError::Transport(_) | RpcError::NullResp)
}

impl From<TransportError> for ContractError {
    fn from(err: TransportError) -> Self {
        let RpcError::ErrorResp(payload) = err else {
            return Self::Transport(err);
        };

        if let Some(data) = payload.as_revert_data() {
            let reason = decode_revert_reason(&data).unwrap_or_else(|| payload.message.to_string());
            return Self::Reverted {
                reason,
                data: Some(data),
            };
        }

        if payload.message.contains("revert") {
            return Self::Reverted {
                reason: payload.message.to_string(),
                data: None,
            };
        }

        Self::Rpc {
            code: payload.code,
            message: payload.message.to_string(),
        }
    }
}
