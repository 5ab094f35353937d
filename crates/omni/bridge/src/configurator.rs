use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256};
use alloy_sol_types::SolCall;
use tracing::{debug, info, warn};
use versa_omni_primitives::{execute::sudo_execute, ValidatorConfig};
use versa_omni_provider::ContractError;

use crate::{
    factory::{EndpointPair, OmniFactory},
    fee::{Clock, FeePolicy, FeeQuote, SystemClock},
    link::TrustedRemoteLink,
};

/// Revert reason of the bridge endpoint when a path is already trusted.
const ALREADY_TRUSTED_REASON: &str = "already trusted";

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("{method} on chain {chain_id} failed: {source}")]
    Contract {
        method: &'static str,
        chain_id: u64,
        #[source]
        source: ContractError,
    },
    #[error("link is configured on chain {expected} but the client is connected to chain {connected}")]
    WrongChain { expected: u64, connected: u64 },
    #[error("bridge chain code {0} is not a supported destination")]
    UnsupportedDestination(u16),
    #[error("{chain_ids} supported chain ids do not pair with {codes} bridge chain codes")]
    MismatchedSupportLists { chain_ids: usize, codes: usize },
    #[error("fee quote for bridge chain code {dst} is {age:?} old, past the {window:?} window; quote again")]
    StaleFeeQuote {
        dst: u16,
        age: Duration,
        window: Duration,
    },
}

/// Result of [`CrossChainConfigurator::ensure_trusted_remote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustOutcome {
    /// The link was already in place; nothing was sent.
    AlreadyTrusted,
    Configured { tx_hash: B256 },
}

/// Manages the bridge settings of the wallet factory on one chain.
#[derive(Debug, Clone)]
pub struct CrossChainConfigurator<F> {
    client: F,
    factory: Address,
    policy: FeePolicy,
    clock: Arc<dyn Clock>,
}

impl<F: OmniFactory> CrossChainConfigurator<F> {
    pub fn new(client: F, factory: Address) -> Self {
        Self {
            client,
            factory,
            policy: FeePolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_fee_policy(mut self, policy: FeePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn client(&self) -> &F {
        &self.client
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    pub fn fee_policy(&self) -> &FeePolicy {
        &self.policy
    }

    fn contract_err(&self, method: &'static str) -> impl FnOnce(ContractError) -> BridgeError {
        let chain_id = self.client.chain_id();
        move |source| BridgeError::Contract {
            method,
            chain_id,
            source,
        }
    }

    /// Makes sure the local factory trusts `link`'s remote factory.
    ///
    /// Reads the current setting first and only writes when the path is not yet
    /// trusted, so repeated calls send no transactions.
    pub async fn ensure_trusted_remote(
        &self,
        link: &TrustedRemoteLink,
    ) -> Result<TrustOutcome, BridgeError> {
        let connected = self.client.chain_id();
        if link.local_chain_id != connected {
            return Err(BridgeError::WrongChain {
                expected: link.local_chain_id,
                connected,
            });
        }

        let path = link.path();
        let trusted = self
            .client
            .is_trusted_remote(self.factory, link.remote_bridge_chain_code, path.clone())
            .await
            .map_err(self.contract_err("isTrustedRemote"))?;
        if trusted {
            debug!(target: "versa_omni::bridge", chain_id = connected, remote = link.remote_bridge_chain_code, %path, "source already set");
            return Ok(TrustOutcome::AlreadyTrusted);
        }

        match self
            .client
            .set_trusted_remote(self.factory, link.remote_bridge_chain_code, path.clone())
            .await
        {
            Ok(tx_hash) => {
                info!(
                    target: "versa_omni::bridge",
                    chain_id = connected,
                    remote = link.remote_bridge_chain_code,
                    %path,
                    %tx_hash,
                    "set trusted remote"
                );
                Ok(TrustOutcome::Configured { tx_hash })
            }
            Err(err)
                if err
                    .revert_reason()
                    .is_some_and(|reason| reason.contains(ALREADY_TRUSTED_REASON)) =>
            {
                debug!(target: "versa_omni::bridge", chain_id = connected, remote = link.remote_bridge_chain_code, "trusted by a concurrent writer");
                Ok(TrustOutcome::AlreadyTrusted)
            }
            Err(err) => Err(self.contract_err("setTrustedRemote")(err)),
        }
    }

    /// Overwrites the oracle pair for `dst_bridge_chain_code`. Always sends.
    pub async fn set_oracle(
        &self,
        dst_bridge_chain_code: u16,
        oracles: EndpointPair,
    ) -> Result<B256, BridgeError> {
        let tx_hash = self
            .client
            .set_oracle(self.factory, dst_bridge_chain_code, oracles)
            .await
            .map_err(self.contract_err("setOracle"))?;
        info!(
            target: "versa_omni::bridge",
            src = self.client.chain_id(),
            dst = dst_bridge_chain_code,
            send = %oracles.send,
            receive = %oracles.receive,
            %tx_hash,
            "set oracle"
        );
        Ok(tx_hash)
    }

    pub async fn get_oracle(&self, dst_bridge_chain_code: u16) -> Result<EndpointPair, BridgeError> {
        self.client
            .get_oracle(self.factory, dst_bridge_chain_code)
            .await
            .map_err(self.contract_err("getOracle"))
    }

    /// Overwrites the relayer pair for `dst_bridge_chain_code`. Always sends.
    pub async fn set_relayer(
        &self,
        dst_bridge_chain_code: u16,
        relayers: EndpointPair,
    ) -> Result<B256, BridgeError> {
        let tx_hash = self
            .client
            .set_relayer(self.factory, dst_bridge_chain_code, relayers)
            .await
            .map_err(self.contract_err("setRelayer"))?;
        info!(
            target: "versa_omni::bridge",
            src = self.client.chain_id(),
            dst = dst_bridge_chain_code,
            send = %relayers.send,
            receive = %relayers.receive,
            %tx_hash,
            "set relayer"
        );
        Ok(tx_hash)
    }

    pub async fn get_relayer(&self, dst_bridge_chain_code: u16) -> Result<EndpointPair, BridgeError> {
        self.client
            .get_relayer(self.factory, dst_bridge_chain_code)
            .await
            .map_err(self.contract_err("getRelayer"))
    }

    /// Quotes the native fee of creating `wallet` on `dst_bridge_chain_code` with
    /// the validators in `remote_validators`.
    ///
    /// `supported_chain_ids` and `supported_bridge_chain_codes` pair up by index
    /// and bound the destinations that may be quoted.
    pub async fn estimate_remote_create_fee(
        &self,
        wallet: Address,
        dst_bridge_chain_code: u16,
        supported_chain_ids: &[u64],
        supported_bridge_chain_codes: &[u16],
        remote_validators: &ValidatorConfig,
    ) -> Result<FeeQuote, BridgeError> {
        if supported_chain_ids.len() != supported_bridge_chain_codes.len() {
            return Err(BridgeError::MismatchedSupportLists {
                chain_ids: supported_chain_ids.len(),
                codes: supported_bridge_chain_codes.len(),
            });
        }
        if !supported_bridge_chain_codes.contains(&dst_bridge_chain_code) {
            return Err(BridgeError::UnsupportedDestination(dst_bridge_chain_code));
        }

        let payload = self
            .client
            .get_payload(self.factory, remote_validators.payload_call(wallet))
            .await
            .map_err(self.contract_err("getPayload"))?;
        let native_fee_wei = self
            .client
            .estimate_native_fee(self.factory, dst_bridge_chain_code, payload)
            .await
            .map_err(self.contract_err("estimateNativeFee"))?;

        info!(
            target: "versa_omni::bridge",
            src = self.client.chain_id(),
            dst = dst_bridge_chain_code,
            %wallet,
            fee_wei = %native_fee_wei,
            "quoted remote create fee"
        );
        Ok(FeeQuote {
            native_fee_wei,
            dst_bridge_chain_code,
            quoted_at: self.clock.now(),
        })
    }

    /// Wallet call data that creates the wallet on the quote's destination, funded
    /// with the quote plus the safety margin.
    ///
    /// Fails with [`BridgeError::StaleFeeQuote`] once the quote is older than the
    /// staleness window.
    pub fn remote_create_call_data(
        &self,
        quote: &FeeQuote,
        remote_validators: &ValidatorConfig,
    ) -> Result<Bytes, BridgeError> {
        self.check_fresh(quote)?;
        let fee = self.policy.funded_fee(quote);
        let create = remote_validators.remote_create_call(quote.dst_bridge_chain_code);
        Ok(sudo_execute(self.factory, fee, create.abi_encode().into()))
    }

    /// Fails with [`BridgeError::StaleFeeQuote`] if `quote` may no longer be used.
    pub fn check_fresh(&self, quote: &FeeQuote) -> Result<(), BridgeError> {
        let now = self.clock.now();
        if self.policy.is_stale(quote, now) {
            let age = now.saturating_duration_since(quote.quoted_at);
            warn!(target: "versa_omni::bridge", dst = quote.dst_bridge_chain_code, ?age, "fee quote is stale");
            return Err(BridgeError::StaleFeeQuote {
                dst: quote.dst_bridge_chain_code,
                age,
                window: self.policy.staleness_window,
            });
        }
        Ok(())
    }
}
