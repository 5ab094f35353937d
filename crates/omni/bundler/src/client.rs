use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_signer_local::PrivateKeySigner;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use versa_omni_primitives::{GasLimits, OpContext, UnsignedUserOperation, UserOperation, ENTRY_POINT_V06};
use versa_omni_provider::RetryPolicy;

use crate::{
    builder::{AccountReader, BuilderError, UserOperationBuilder},
    rpc::{RpcUserOperationV0_6, UserOperationReceipt},
    transport::{BundlerTransport, RelayError},
};

/// Relay, retry and polling settings of a [`BundlerClient`].
#[derive(Debug, Clone, bon::Builder)]
pub struct BundlerConfig {
    #[builder(default = ENTRY_POINT_V06)]
    pub entry_point: Address,
    /// Submission attempts on transport failures, including the first.
    #[builder(default = 3)]
    pub max_submit_attempts: u32,
    #[builder(default = Duration::from_secs(1))]
    pub submit_backoff: Duration,
    #[builder(default = Duration::from_secs(2))]
    pub poll_interval: Duration,
    #[builder(default = Duration::from_secs(120))]
    pub receipt_timeout: Duration,
    /// Percentage added on top of the estimated pre-verification gas.
    #[builder(default = 0)]
    pub pre_verification_gas_padding_percent: u64,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl BundlerConfig {
    fn submit_retry(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_submit_attempts,
            backoff: self.submit_backoff,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BundlerError {
    #[error("gas estimation failed for {ctx}: {source}")]
    EstimationFailure {
        ctx: OpContext,
        #[source]
        source: RelayError,
    },
    #[error("submission failed for {ctx}: {source}")]
    SubmissionFailure {
        ctx: OpContext,
        #[source]
        source: RelayError,
    },
    #[error("no receipt for {ctx} after {waited:?}")]
    ReceiptTimeout { ctx: OpContext, waited: Duration },
    #[error("receipt lookup failed for {ctx}: {source}")]
    ReceiptQuery {
        ctx: OpContext,
        #[source]
        source: RelayError,
    },
    #[error("{ctx} was included but reverted: {reason}")]
    ExecutionReverted {
        ctx: OpContext,
        reason: String,
        receipt: Box<UserOperationReceipt>,
    },
    #[error("{ctx} is signed for entry point {signed_for} but the bundler relays to {relayed_to}")]
    EntryPointMismatch {
        ctx: OpContext,
        signed_for: Address,
        relayed_to: Address,
    },
    #[error(transparent)]
    Builder(#[from] BuilderError),
}

impl BundlerError {
    pub fn context(&self) -> &OpContext {
        match self {
            Self::EstimationFailure { ctx, .. }
            | Self::SubmissionFailure { ctx, .. }
            | Self::ReceiptTimeout { ctx, .. }
            | Self::ReceiptQuery { ctx, .. }
            | Self::ExecutionReverted { ctx, .. }
            | Self::EntryPointMismatch { ctx, .. } => ctx,
            Self::Builder(err) => err.context(),
        }
    }
}

/// Relays user operations for one chain through a bundler.
///
/// The client never changes an operation it was handed: retries resend the
/// identical signed operation, and a receipt timeout is reported rather than
/// resubmitted.
#[derive(Debug, Clone)]
pub struct BundlerClient<T> {
    transport: T,
    chain_id: u64,
    config: BundlerConfig,
}

impl<T: BundlerTransport> BundlerClient<T> {
    pub fn new(transport: T, chain_id: u64, config: BundlerConfig) -> Self {
        Self {
            transport,
            chain_id,
            config,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &BundlerConfig {
        &self.config
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub async fn supported_entry_points(&self) -> Result<Vec<Address>, RelayError> {
        self.transport.supported_entry_points().await
    }

    /// Asks the bundler for gas limits of `op`, signed with `placeholder`.
    ///
    /// Estimation failures are not retried.
    pub async fn estimate(
        &self,
        op: &UnsignedUserOperation,
        placeholder: Bytes,
    ) -> Result<GasLimits, BundlerError> {
        let ctx = OpContext::new(self.chain_id, op.sender);
        let request = RpcUserOperationV0_6::for_estimation(op, placeholder);
        let estimate = self
            .transport
            .estimate_user_operation_gas(&request, self.config.entry_point)
            .await
            .map_err(|source| BundlerError::EstimationFailure { ctx, source })?;

        let mut limits = GasLimits::from(estimate);
        let padding = limits.pre_verification_gas
            * U256::from(self.config.pre_verification_gas_padding_percent)
            / U256::from(100);
        limits.pre_verification_gas += padding;

        debug!(target: "versa_omni::bundler", %ctx, ?limits, "estimated gas");
        Ok(limits)
    }

    /// Submits `op`, retrying transport failures with linear backoff.
    ///
    /// Every attempt sends the same signed operation. A JSON-RPC rejection ends the
    /// attempt loop immediately. If an earlier attempt was lost on the transport, the
    /// bundler may already hold the operation and reject the resend as a duplicate, so
    /// a rejection at that point yields the locally computed hash for receipt polling.
    pub async fn submit(&self, op: &UserOperation) -> Result<B256, BundlerError> {
        let local_hash = op.hash(self.config.entry_point, self.chain_id);
        let ctx = OpContext::new(self.chain_id, op.sender()).with_hash(local_hash);
        let request = RpcUserOperationV0_6::from(op);
        let unacknowledged = AtomicBool::new(false);

        let result = self
            .config
            .submit_retry()
            .run("eth_sendUserOperation", RelayError::is_transient, || async {
                let result = self
                    .transport
                    .send_user_operation(&request, self.config.entry_point)
                    .await;
                if matches!(&result, Err(err) if err.is_transient()) {
                    unacknowledged.store(true, Ordering::Relaxed);
                }
                result
            })
            .await;

        let relayed_hash = match result {
            Ok(hash) => hash,
            Err(err @ RelayError::Rejected { .. }) if unacknowledged.load(Ordering::Relaxed) => {
                warn!(
                    target: "versa_omni::bundler",
                    %ctx,
                    error = %err,
                    "resend rejected after an unacknowledged attempt, polling for the original"
                );
                local_hash
            }
            Err(source) => return Err(BundlerError::SubmissionFailure { ctx, source }),
        };

        if relayed_hash != local_hash {
            warn!(
                target: "versa_omni::bundler",
                %ctx,
                %relayed_hash,
                "bundler reported a different user operation hash"
            );
        }
        info!(target: "versa_omni::bundler", %ctx, "submitted user operation");
        Ok(relayed_hash)
    }

    /// Polls for the receipt of `user_op_hash` until the configured timeout.
    pub async fn wait_for_receipt(
        &self,
        sender: Address,
        user_op_hash: B256,
    ) -> Result<UserOperationReceipt, BundlerError> {
        let ctx = OpContext::new(self.chain_id, sender).with_hash(user_op_hash);
        let started = Instant::now();
        let deadline = started + self.config.receipt_timeout;

        loop {
            match self.transport.get_user_operation_receipt(user_op_hash).await {
                Ok(Some(receipt)) if receipt.success => {
                    info!(
                        target: "versa_omni::bundler",
                        %ctx,
                        tx_hash = %receipt.receipt.transaction_hash,
                        "user operation included"
                    );
                    return Ok(receipt);
                }
                Ok(Some(receipt)) => {
                    let reason = receipt
                        .reason
                        .clone()
                        .unwrap_or_else(|| "no reason given".to_string());
                    return Err(BundlerError::ExecutionReverted {
                        ctx,
                        reason,
                        receipt: Box::new(receipt),
                    });
                }
                Ok(None) => {}
                Err(err) if err.is_transient() => {
                    warn!(target: "versa_omni::bundler", %ctx, error = %err, "receipt lookup failed, polling again");
                }
                Err(source) => return Err(BundlerError::ReceiptQuery { ctx, source }),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(BundlerError::ReceiptTimeout {
                    ctx,
                    waited: now - started,
                });
            }
            sleep(self.config.poll_interval.min(deadline - now)).await;
        }
    }

    /// Estimates, signs, submits and waits for `op`.
    ///
    /// Gas is estimated with a placeholder signature of the final length; the
    /// estimated limits replace those on `op` before it is signed.
    pub async fn estimate_and_submit<R: AccountReader>(
        &self,
        builder: &UserOperationBuilder<R>,
        mut op: UnsignedUserOperation,
        signers: &[PrivateKeySigner],
    ) -> Result<UserOperationReceipt, BundlerError> {
        if builder.entry_point() != self.config.entry_point {
            return Err(BundlerError::EntryPointMismatch {
                ctx: OpContext::new(self.chain_id, op.sender),
                signed_for: builder.entry_point(),
                relayed_to: self.config.entry_point,
            });
        }

        let placeholder = builder.placeholder_signature(signers.len());
        let limits = self.estimate(&op, placeholder).await?;
        op.set_gas_limits(limits);

        let signed = builder.sign(op, signers)?;
        let user_op_hash = self.submit(&signed).await?;
        self.wait_for_receipt(signed.sender(), user_op_hash).await
    }
}
