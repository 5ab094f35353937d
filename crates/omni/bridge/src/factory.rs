use std::future::Future;

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::Provider;
use versa_omni_primitives::bindings::IVersaOmniFactory;
use versa_omni_provider::{ChainClient, ContractError};

/// Send and receive side of a per-destination bridge setting (oracle or relayer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointPair {
    pub send: Address,
    pub receive: Address,
}

/// Bridge facing calls of the wallet factory deployed on one chain.
pub trait OmniFactory: Send + Sync {
    fn chain_id(&self) -> u64;

    fn is_trusted_remote(
        &self,
        factory: Address,
        remote_bridge_chain_code: u16,
        path: Bytes,
    ) -> impl Future<Output = Result<bool, ContractError>> + Send;

    /// Writes the trusted remote and waits for inclusion.
    fn set_trusted_remote(
        &self,
        factory: Address,
        remote_bridge_chain_code: u16,
        path: Bytes,
    ) -> impl Future<Output = Result<B256, ContractError>> + Send;

    fn set_oracle(
        &self,
        factory: Address,
        dst_bridge_chain_code: u16,
        oracles: EndpointPair,
    ) -> impl Future<Output = Result<B256, ContractError>> + Send;

    fn get_oracle(
        &self,
        factory: Address,
        dst_bridge_chain_code: u16,
    ) -> impl Future<Output = Result<EndpointPair, ContractError>> + Send;

    fn set_relayer(
        &self,
        factory: Address,
        dst_bridge_chain_code: u16,
        relayers: EndpointPair,
    ) -> impl Future<Output = Result<B256, ContractError>> + Send;

    fn get_relayer(
        &self,
        factory: Address,
        dst_bridge_chain_code: u16,
    ) -> impl Future<Output = Result<EndpointPair, ContractError>> + Send;

    /// Message the factory would send to create `call.wallet` remotely.
    fn get_payload(
        &self,
        factory: Address,
        call: IVersaOmniFactory::getPayloadCall,
    ) -> impl Future<Output = Result<Bytes, ContractError>> + Send;

    fn estimate_native_fee(
        &self,
        factory: Address,
        dst_bridge_chain_code: u16,
        payload: Bytes,
    ) -> impl Future<Output = Result<U256, ContractError>> + Send;
}

impl<P: Provider> OmniFactory for ChainClient<P> {
    fn chain_id(&self) -> u64 {
        ChainClient::chain_id(self)
    }

    async fn is_trusted_remote(
        &self,
        factory: Address,
        remote_bridge_chain_code: u16,
        path: Bytes,
    ) -> Result<bool, ContractError> {
        self.call(
            factory,
            &IVersaOmniFactory::isTrustedRemoteCall {
                srcChainId: remote_bridge_chain_code,
                path,
            },
        )
        .await
    }

    async fn set_trusted_remote(
        &self,
        factory: Address,
        remote_bridge_chain_code: u16,
        path: Bytes,
    ) -> Result<B256, ContractError> {
        self.send(
            factory,
            &IVersaOmniFactory::setTrustedRemoteCall {
                remoteChainId: remote_bridge_chain_code,
                path,
            },
            U256::ZERO,
        )
        .await
    }

    async fn set_oracle(
        &self,
        factory: Address,
        dst_bridge_chain_code: u16,
        oracles: EndpointPair,
    ) -> Result<B256, ContractError> {
        self.send(
            factory,
            &IVersaOmniFactory::setOracleCall {
                dstChainId: dst_bridge_chain_code,
                sendOracle: oracles.send,
                receiveOracle: oracles.receive,
            },
            U256::ZERO,
        )
        .await
    }

    async fn get_oracle(
        &self,
        factory: Address,
        dst_bridge_chain_code: u16,
    ) -> Result<EndpointPair, ContractError> {
        let oracle = self
            .call(
                factory,
                &IVersaOmniFactory::getOracleCall {
                    dstChainId: dst_bridge_chain_code,
                },
            )
            .await?;
        Ok(EndpointPair {
            send: oracle.sendOracle,
            receive: oracle.receiveOracle,
        })
    }

    async fn set_relayer(
        &self,
        factory: Address,
        dst_bridge_chain_code: u16,
        relayers: EndpointPair,
    ) -> Result<B256, ContractError> {
        self.send(
            factory,
            &IVersaOmniFactory::setRelayerCall {
                dstChainId: dst_bridge_chain_code,
                sendRelayer: relayers.send,
                receiveRelayer: relayers.receive,
            },
            U256::ZERO,
        )
        .await
    }

    async fn get_relayer(
        &self,
        factory: Address,
        dst_bridge_chain_code: u16,
    ) -> Result<EndpointPair, ContractError> {
        let relayer = self
            .call(
                factory,
                &IVersaOmniFactory::getRelayerCall {
                    dstChainId: dst_bridge_chain_code,
                },
            )
            .await?;
        Ok(EndpointPair {
            send: relayer.sendRelayer,
            receive: relayer.receiveRelayer,
        })
    }

    async fn get_payload(
        &self,
        factory: Address,
        call: IVersaOmniFactory::getPayloadCall,
    ) -> Result<Bytes, ContractError> {
        self.call(factory, &call).await
    }

    async fn estimate_native_fee(
        &self,
        factory: Address,
        dst_bridge_chain_code: u16,
        payload: Bytes,
    ) -> Result<U256, ContractError> {
        self.call(
            factory,
            &IVersaOmniFactory::estimateNativeFeeCall {
                dstChainId: dst_bridge_chain_code,
                payload,
            },
        )
        .await
    }
}
