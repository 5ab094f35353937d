use std::time::Duration;

use alloy_network::{EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types_eth::TransactionRequest;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolCall;
use tracing::{debug, info};
use url::Url;
use versa_omni_primitives::GasFees;

use crate::ContractError;

/// How long a write waits for its receipt before giving up.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Typed contract access for one chain.
///
/// Reads go through `eth_call`; writes are sent from the provider's wallet and
/// awaited until included.
#[derive(Debug, Clone)]
pub struct ChainClient<P = DynProvider> {
    provider: P,
    chain_id: u64,
    confirmation_timeout: Duration,
}

impl ChainClient<DynProvider> {
    /// Read-only client over HTTP.
    pub async fn connect(rpc_url: &Url) -> Result<Self, ContractError> {
        let provider = ProviderBuilder::new()
            .connect_http(rpc_url.clone())
            .erased();
        Self::new(provider).await
    }

    /// Client that signs and sends transactions with `signer`.
    pub async fn connect_with_signer(
        rpc_url: &Url,
        signer: PrivateKeySigner,
    ) -> Result<Self, ContractError> {
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(rpc_url.clone())
            .erased();
        Self::new(provider).await
    }
}

impl<P: Provider> ChainClient<P> {
    /// Wraps `provider`, asking it for the connected chain id.
    pub async fn new(provider: P) -> Result<Self, ContractError> {
        let chain_id = provider.get_chain_id().await?;
        debug!(target: "versa_omni::provider", chain_id, "connected");
        Ok(Self {
            provider,
            chain_id,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        })
    }

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Deployed code at `address`; empty if nothing is deployed.
    pub async fn code_at(&self, address: Address) -> Result<Bytes, ContractError> {
        Ok(self.provider.get_code_at(address).await?)
    }

    pub async fn balance(&self, address: Address) -> Result<U256, ContractError> {
        Ok(self.provider.get_balance(address).await?)
    }

    /// Current EIP-1559 fee estimate.
    pub async fn fee_data(&self) -> Result<GasFees, ContractError> {
        let estimate = self.provider.estimate_eip1559_fees().await?;
        Ok(GasFees {
            max_fee_per_gas: U256::from(estimate.max_fee_per_gas),
            max_priority_fee_per_gas: U256::from(estimate.max_priority_fee_per_gas),
        })
    }

    /// Executes `call` against `to` with `eth_call` and decodes its return value.
    pub async fn call<C: SolCall>(&self, to: Address, call: &C) -> Result<C::Return, ContractError> {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(call.abi_encode());
        let output = self.provider.call(tx).await?;
        Ok(C::abi_decode_returns(&output)?)
    }

    /// Sends `call` to `to` with `value` attached and waits for inclusion.
    ///
    /// Returns the transaction hash. A reverted receipt is an error.
    pub async fn send<C: SolCall>(
        &self,
        to: Address,
        call: &C,
        value: U256,
    ) -> Result<B256, ContractError> {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_input(call.abi_encode())
            .with_value(value);

        let pending = self.provider.send_transaction(tx).await?;
        let tx_hash = *pending.tx_hash();
        info!(
            target: "versa_omni::provider",
            chain_id = self.chain_id,
            %to,
            %tx_hash,
            method = C::SIGNATURE,
            "sent transaction"
        );

        let receipt = pending
            .with_timeout(Some(self.confirmation_timeout))
            .get_receipt()
            .await?;
        if !receipt.status() {
            return Err(ContractError::TransactionFailed(tx_hash));
        }

        debug!(
            target: "versa_omni::provider",
            %tx_hash,
            block = ?receipt.block_number,
            gas_used = receipt.gas_used,
            "transaction included"
        );
        Ok(tx_hash)
    }
}
