use std::future::Future;

use alloy_primitives::{aliases::U192, Address, Bytes, U256};
use alloy_provider::Provider;
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use tracing::{debug, info};
use versa_omni_primitives::{
    bindings::IEntryPoint,
    user_op::{pack_validator_signature, placeholder_signature},
    GasFees, GasLimits, OpContext, UnsignedUserOperation, UserOperation, ENTRY_POINT_V06,
};
use versa_omni_provider::{ChainClient, ContractError, RetryPolicy};

/// Gas limits used before the bundler has estimated the operation.
pub const DEFAULT_GAS_LIMITS: GasLimits = GasLimits {
    call_gas_limit: U256::from_limbs([1_000_000, 0, 0, 0]),
    verification_gas_limit: U256::from_limbs([1_000_000, 0, 0, 0]),
    pre_verification_gas: U256::from_limbs([100_000, 0, 0, 0]),
};

/// Chain state the builder needs to fill in an operation.
pub trait AccountReader: Send + Sync {
    fn chain_id(&self) -> u64;

    fn code_at(&self, address: Address)
        -> impl Future<Output = Result<Bytes, ContractError>> + Send;

    /// `EntryPoint.getNonce(sender, 0)`.
    fn entry_point_nonce(
        &self,
        entry_point: Address,
        sender: Address,
    ) -> impl Future<Output = Result<U256, ContractError>> + Send;

    fn fee_data(&self) -> impl Future<Output = Result<GasFees, ContractError>> + Send;
}

impl<P: Provider> AccountReader for ChainClient<P> {
    fn chain_id(&self) -> u64 {
        ChainClient::chain_id(self)
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ContractError> {
        ChainClient::code_at(self, address).await
    }

    async fn entry_point_nonce(
        &self,
        entry_point: Address,
        sender: Address,
    ) -> Result<U256, ContractError> {
        self.call(
            entry_point,
            &IEntryPoint::getNonceCall {
                sender,
                key: U192::ZERO,
            },
        )
        .await
    }

    async fn fee_data(&self) -> Result<GasFees, ContractError> {
        ChainClient::fee_data(self).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    #[error("could not resolve nonce for {ctx}: {source}")]
    UnresolvedNonce {
        ctx: OpContext,
        #[source]
        source: ContractError,
    },
    #[error("could not read gas price for {ctx}: {source}")]
    GasPrice {
        ctx: OpContext,
        #[source]
        source: ContractError,
    },
    #[error("signing failed for {ctx}: {reason}")]
    SigningError { ctx: OpContext, reason: String },
}

impl BuilderError {
    pub fn context(&self) -> &OpContext {
        match self {
            Self::UnresolvedNonce { ctx, .. }
            | Self::GasPrice { ctx, .. }
            | Self::SigningError { ctx, .. } => ctx,
        }
    }
}

/// Caller supplied gas values that take precedence over defaults and network data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GasOverrides {
    pub call_gas_limit: Option<U256>,
    pub verification_gas_limit: Option<U256>,
    pub pre_verification_gas: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
}

impl GasOverrides {
    fn limits(&self) -> GasLimits {
        GasLimits {
            call_gas_limit: self
                .call_gas_limit
                .unwrap_or(DEFAULT_GAS_LIMITS.call_gas_limit),
            verification_gas_limit: self
                .verification_gas_limit
                .unwrap_or(DEFAULT_GAS_LIMITS.verification_gas_limit),
            pre_verification_gas: self
                .pre_verification_gas
                .unwrap_or(DEFAULT_GAS_LIMITS.pre_verification_gas),
        }
    }

    fn fees(&self) -> Option<GasFees> {
        Some(GasFees {
            max_fee_per_gas: self.max_fee_per_gas?,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas?,
        })
    }
}

/// Assembles and signs user operations for wallets validated by one validator.
#[derive(Debug, Clone)]
pub struct UserOperationBuilder<R> {
    reader: R,
    entry_point: Address,
    validator: Address,
    read_retry: RetryPolicy,
    overrides: GasOverrides,
    paymaster_and_data: Bytes,
}

impl<R: AccountReader> UserOperationBuilder<R> {
    pub fn new(reader: R, validator: Address) -> Self {
        Self {
            reader,
            entry_point: ENTRY_POINT_V06,
            validator,
            read_retry: RetryPolicy::default(),
            overrides: GasOverrides::default(),
            paymaster_and_data: Bytes::new(),
        }
    }

    pub fn with_entry_point(mut self, entry_point: Address) -> Self {
        self.entry_point = entry_point;
        self
    }

    pub fn with_read_retry(mut self, policy: RetryPolicy) -> Self {
        self.read_retry = policy;
        self
    }

    pub fn with_gas_overrides(mut self, overrides: GasOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_paymaster_and_data(mut self, paymaster_and_data: Bytes) -> Self {
        self.paymaster_and_data = paymaster_and_data;
        self
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn chain_id(&self) -> u64 {
        self.reader.chain_id()
    }

    pub fn entry_point(&self) -> Address {
        self.entry_point
    }

    pub fn validator(&self) -> Address {
        self.validator
    }

    /// Signature of the right shape for `signers` signers, for gas estimation.
    pub fn placeholder_signature(&self, signers: usize) -> Bytes {
        placeholder_signature(self.validator, signers)
    }

    fn context(&self, wallet: Address) -> OpContext {
        OpContext::new(self.chain_id(), wallet)
    }

    /// Whether `wallet` has code on chain.
    pub async fn is_deployed(&self, wallet: Address) -> Result<bool, BuilderError> {
        let code = self
            .read_retry
            .run("eth_getCode", ContractError::is_transient, || {
                self.reader.code_at(wallet)
            })
            .await
            .map_err(|source| BuilderError::UnresolvedNonce {
                ctx: self.context(wallet),
                source,
            })?;
        Ok(!code.is_empty())
    }

    /// Next entry point nonce of `wallet`; zero for an undeployed wallet.
    pub async fn nonce(&self, wallet: Address) -> Result<U256, BuilderError> {
        if !self.is_deployed(wallet).await? {
            return Ok(U256::ZERO);
        }
        self.deployed_nonce(wallet).await
    }

    async fn deployed_nonce(&self, wallet: Address) -> Result<U256, BuilderError> {
        self.read_retry
            .run("getNonce", ContractError::is_transient, || {
                self.reader.entry_point_nonce(self.entry_point, wallet)
            })
            .await
            .map_err(|source| BuilderError::UnresolvedNonce {
                ctx: self.context(wallet),
                source,
            })
    }

    async fn gas_fees(&self, wallet: Address) -> Result<GasFees, BuilderError> {
        if let Some(fees) = self.overrides.fees() {
            return Ok(fees);
        }
        let network = self
            .read_retry
            .run("fee data", ContractError::is_transient, || {
                self.reader.fee_data()
            })
            .await
            .map_err(|source| BuilderError::GasPrice {
                ctx: self.context(wallet),
                source,
            })?;
        Ok(GasFees {
            max_fee_per_gas: self.overrides.max_fee_per_gas.unwrap_or(network.max_fee_per_gas),
            max_priority_fee_per_gas: self
                .overrides
                .max_priority_fee_per_gas
                .unwrap_or(network.max_priority_fee_per_gas),
        })
    }

    /// Fills in nonce and gas for a call from `wallet`.
    ///
    /// `init_code` is dropped when the wallet is already deployed, since the entry
    /// point rejects init code for an existing sender.
    pub async fn prepare(
        &self,
        wallet: Address,
        call_data: Bytes,
        init_code: Option<Bytes>,
    ) -> Result<UnsignedUserOperation, BuilderError> {
        let deployed = self.is_deployed(wallet).await?;
        let nonce = if deployed {
            self.deployed_nonce(wallet).await?
        } else {
            U256::ZERO
        };

        let init_code = match init_code {
            Some(code) if deployed => {
                debug!(target: "versa_omni::builder", %wallet, init_code_len = code.len(), "wallet already deployed, dropping init code");
                Bytes::new()
            }
            Some(code) => code,
            None => Bytes::new(),
        };

        let mut op = UnsignedUserOperation {
            sender: wallet,
            nonce,
            init_code,
            call_data,
            paymaster_and_data: self.paymaster_and_data.clone(),
            ..Default::default()
        };
        op.set_gas_limits(self.overrides.limits());
        op.set_gas_fees(self.gas_fees(wallet).await?);

        debug!(
            target: "versa_omni::builder",
            chain_id = self.chain_id(),
            %wallet,
            %nonce,
            deploys = op.deploys_wallet(),
            "prepared user operation"
        );
        Ok(op)
    }

    /// Signs `op` with every signer, in the order given, and freezes it.
    pub fn sign(
        &self,
        op: UnsignedUserOperation,
        signers: &[PrivateKeySigner],
    ) -> Result<UserOperation, BuilderError> {
        let hash = op.hash(self.entry_point, self.chain_id());
        let ctx = self.context(op.sender).with_hash(hash);
        if signers.is_empty() {
            return Err(BuilderError::SigningError {
                ctx,
                reason: "no signers given".to_string(),
            });
        }

        let signatures = signers
            .iter()
            .map(|signer| {
                signer
                    .sign_message_sync(hash.as_slice())
                    .map(|signature| signature.as_bytes())
                    .map_err(|err| BuilderError::SigningError {
                        ctx,
                        reason: err.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let signature =
            pack_validator_signature(self.validator, signatures.iter().map(|sig| sig.as_slice()));
        info!(target: "versa_omni::builder", %ctx, signers = signers.len(), "signed user operation");
        Ok(op.into_signed(signature))
    }

    /// [`prepare`](Self::prepare) followed by [`sign`](Self::sign).
    pub async fn build(
        &self,
        signers: &[PrivateKeySigner],
        wallet: Address,
        call_data: Bytes,
        init_code: Option<Bytes>,
    ) -> Result<UserOperation, BuilderError> {
        let op = self.prepare(wallet, call_data, init_code).await?;
        self.sign(op, signers)
    }
}
