//! Creating an existing wallet on another chain through the bridge.
//!
//! The flow moves through
//! `AddressResolved -> FeeQuoted -> UserOpBuilt -> Submitted -> Confirmed`.
//! A quote that goes stale before submission sends the flow back to `FeeQuoted`
//! with a fresh quote; nothing is submitted with a stale fee.

use std::future::Future;

use alloy_primitives::{Address, B256, U256};
use alloy_signer_local::PrivateKeySigner;
use tracing::{info, warn};
use versa_omni_bundler::{
    AccountReader, BuilderError, BundlerClient, BundlerError, BundlerTransport,
    UserOperationBuilder, UserOperationReceipt,
};
use versa_omni_primitives::{UserOperation, ValidatorConfig};

use crate::{
    configurator::{BridgeError, CrossChainConfigurator},
    factory::OmniFactory,
    fee::FeeQuote,
};

/// How often a stale quote is replaced before the flow gives up.
pub const DEFAULT_MAX_REQUOTES: u32 = 3;

/// Human in the loop gate before funds are committed.
pub trait Confirmation: Send + Sync {
    /// Returns whether to proceed.
    fn confirm(&self, prompt: &str) -> impl Future<Output = std::io::Result<bool>> + Send;
}

/// Approves every prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl Confirmation for AutoConfirm {
    async fn confirm(&self, _prompt: &str) -> std::io::Result<bool> {
        Ok(true)
    }
}

/// Stage the flow last entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteCreateStage {
    AddressResolved,
    FeeQuoted,
    UserOpBuilt,
    Submitted,
    Confirmed,
}

#[derive(Debug, thiserror::Error)]
pub enum RemoteCreateError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error(transparent)]
    Builder(#[from] BuilderError),
    #[error(transparent)]
    Bundler(#[from] BundlerError),
    #[error("remote creation was declined by the operator")]
    Declined,
    #[error("confirmation prompt failed: {0}")]
    Confirmation(#[source] std::io::Error),
    #[error("fee quote went stale {0} times in a row")]
    RequoteLimit(u32),
}

/// Inputs of one remote creation.
#[derive(Debug, Clone)]
pub struct RemoteCreateRequest {
    pub wallet: Address,
    pub dst_bridge_chain_code: u16,
    pub supported_chain_ids: Vec<u64>,
    pub supported_bridge_chain_codes: Vec<u16>,
    /// Validators to install on the remote wallet.
    pub remote_validators: ValidatorConfig,
}

/// Result of a confirmed remote creation.
#[derive(Debug, Clone)]
pub struct RemoteCreateOutcome {
    pub quote: FeeQuote,
    /// Value sent with the bridge message.
    pub funded_fee: U256,
    pub user_op_hash: B256,
    pub receipt: UserOperationReceipt,
    pub requotes: u32,
}

/// Drives one remote creation for a wallet on the local chain.
#[derive(Debug)]
pub struct RemoteCreateFlow<'a, F, R, T, C> {
    configurator: &'a CrossChainConfigurator<F>,
    builder: &'a UserOperationBuilder<R>,
    bundler: &'a BundlerClient<T>,
    confirmation: C,
    max_requotes: u32,
    history: Vec<RemoteCreateStage>,
}

impl<'a, F, R, T, C> RemoteCreateFlow<'a, F, R, T, C>
where
    F: OmniFactory,
    R: AccountReader,
    T: BundlerTransport,
    C: Confirmation,
{
    pub fn new(
        configurator: &'a CrossChainConfigurator<F>,
        builder: &'a UserOperationBuilder<R>,
        bundler: &'a BundlerClient<T>,
        confirmation: C,
    ) -> Self {
        Self {
            configurator,
            builder,
            bundler,
            confirmation,
            max_requotes: DEFAULT_MAX_REQUOTES,
            history: Vec::new(),
        }
    }

    pub fn with_max_requotes(mut self, max_requotes: u32) -> Self {
        self.max_requotes = max_requotes;
        self
    }

    /// Stages entered so far, in order.
    pub fn history(&self) -> &[RemoteCreateStage] {
        &self.history
    }

    pub fn stage(&self) -> Option<RemoteCreateStage> {
        self.history.last().copied()
    }

    fn enter(&mut self, stage: RemoteCreateStage) {
        self.history.push(stage);
    }

    pub async fn run(
        &mut self,
        request: &RemoteCreateRequest,
        signers: &[PrivateKeySigner],
    ) -> Result<RemoteCreateOutcome, RemoteCreateError> {
        self.enter(RemoteCreateStage::AddressResolved);

        let mut requotes = 0;
        let (quote, op) = loop {
            let quote = self.quote(request).await?;

            match self.build(request, &quote, signers).await {
                Ok(op) => {
                    // Estimation and signing take time; the quote must still be
                    // fresh when the operation leaves.
                    match self.configurator.check_fresh(&quote) {
                        Ok(()) => break (quote, op),
                        Err(err) => warn!(target: "versa_omni::remote_create", error = %err, "quote expired while building"),
                    }
                }
                Err(RemoteCreateError::Bridge(err @ BridgeError::StaleFeeQuote { .. })) => {
                    warn!(target: "versa_omni::remote_create", error = %err, "quote expired before building");
                }
                Err(err) => return Err(err),
            }

            requotes += 1;
            if requotes > self.max_requotes {
                return Err(RemoteCreateError::RequoteLimit(requotes));
            }
        };

        let user_op_hash = self.bundler.submit(&op).await?;
        self.enter(RemoteCreateStage::Submitted);

        let receipt = self
            .bundler
            .wait_for_receipt(op.sender(), user_op_hash)
            .await?;
        self.enter(RemoteCreateStage::Confirmed);

        info!(
            target: "versa_omni::remote_create",
            wallet = %request.wallet,
            dst = request.dst_bridge_chain_code,
            %user_op_hash,
            tx_hash = %receipt.receipt.transaction_hash,
            requotes,
            "remote creation confirmed"
        );
        Ok(RemoteCreateOutcome {
            funded_fee: self.configurator.fee_policy().funded_fee(&quote),
            quote,
            user_op_hash,
            receipt,
            requotes,
        })
    }

    async fn quote(&mut self, request: &RemoteCreateRequest) -> Result<FeeQuote, RemoteCreateError> {
        let quote = self
            .configurator
            .estimate_remote_create_fee(
                request.wallet,
                request.dst_bridge_chain_code,
                &request.supported_chain_ids,
                &request.supported_bridge_chain_codes,
                &request.remote_validators,
            )
            .await?;
        self.enter(RemoteCreateStage::FeeQuoted);

        let funded = self.configurator.fee_policy().funded_fee(&quote);
        let prompt = format!(
            "create {} on bridge chain {} for {funded} wei (quoted {} wei); continue?",
            request.wallet, request.dst_bridge_chain_code, quote.native_fee_wei
        );
        let approved = self
            .confirmation
            .confirm(&prompt)
            .await
            .map_err(RemoteCreateError::Confirmation)?;
        if !approved {
            return Err(RemoteCreateError::Declined);
        }
        Ok(quote)
    }

    async fn build(
        &mut self,
        request: &RemoteCreateRequest,
        quote: &FeeQuote,
        signers: &[PrivateKeySigner],
    ) -> Result<UserOperation, RemoteCreateError> {
        let call_data = self
            .configurator
            .remote_create_call_data(quote, &request.remote_validators)?;

        let mut op = self.builder.prepare(request.wallet, call_data, None).await?;
        let limits = self
            .bundler
            .estimate(&op, self.builder.placeholder_signature(signers.len()))
            .await?;
        op.set_gas_limits(limits);
        let signed = self.builder.sign(op, signers)?;
        self.enter(RemoteCreateStage::UserOpBuilt);
        Ok(signed)
    }
}
