use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_transport::TransportErrorKind;
use parking_lot::Mutex;
use versa_omni_bridge::{EndpointPair, OmniFactory};
use versa_omni_bundler::AccountReader;
use versa_omni_primitives::{bindings::IVersaOmniFactory, GasFees};
use versa_omni_provider::ContractError;

#[derive(Debug, Default)]
struct State {
    code: HashMap<Address, Bytes>,
    nonces: HashMap<Address, U256>,
    fees: GasFees,
    trusted: HashSet<(u16, Bytes)>,
    oracles: HashMap<u16, EndpointPair>,
    relayers: HashMap<u16, EndpointPair>,
    native_fee: U256,
    trust_write_revert: Option<String>,
    transient_read_failures: u32,
    writes: usize,
    nonce_reads: usize,
    fee_quotes: usize,
    payloads: Vec<IVersaOmniFactory::getPayloadCall>,
}

/// In-memory chain with a deployed wallet factory.
///
/// Clones share state, so a test can keep a handle while the code under test owns
/// another.
#[derive(Debug, Clone)]
pub struct MockChain {
    chain_id: u64,
    state: Arc<Mutex<State>>,
}

impl MockChain {
    pub fn new(chain_id: u64) -> Self {
        let state = State {
            fees: GasFees {
                max_fee_per_gas: U256::from(1_500_000_000u64),
                max_priority_fee_per_gas: U256::from(1_500_000_000u64),
            },
            native_fee: U256::from(250_000_000_000_000u64),
            ..Default::default()
        };
        Self {
            chain_id,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Marks `address` as deployed with entry point nonce `nonce`.
    pub fn deploy(&self, address: Address, nonce: U256) {
        let mut state = self.state.lock();
        state.code.insert(address, Bytes::from_static(&[0x60, 0x80]));
        state.nonces.insert(address, nonce);
    }

    pub fn set_gas_fees(&self, fees: GasFees) {
        self.state.lock().fees = fees;
    }

    pub fn set_native_fee(&self, fee: U256) {
        self.state.lock().native_fee = fee;
    }

    /// Records `path` as trusted for `remote_bridge_chain_code` without a write.
    pub fn trust(&self, remote_bridge_chain_code: u16, path: Bytes) {
        self.state
            .lock()
            .trusted
            .insert((remote_bridge_chain_code, path));
    }

    /// Makes every `setTrustedRemote` revert with `reason`.
    pub fn revert_trust_writes(&self, reason: impl Into<String>) {
        self.state.lock().trust_write_revert = Some(reason.into());
    }

    /// The next `count` account reads fail with a connection error.
    pub fn fail_reads(&self, count: u32) {
        self.state.lock().transient_read_failures = count;
    }

    /// Transactions sent to the factory so far.
    pub fn writes(&self) -> usize {
        self.state.lock().writes
    }

    pub fn nonce_reads(&self) -> usize {
        self.state.lock().nonce_reads
    }

    pub fn fee_quotes(&self) -> usize {
        self.state.lock().fee_quotes
    }

    pub fn payload_requests(&self) -> Vec<IVersaOmniFactory::getPayloadCall> {
        self.state.lock().payloads.clone()
    }

    pub fn oracle(&self, dst_bridge_chain_code: u16) -> Option<EndpointPair> {
        self.state.lock().oracles.get(&dst_bridge_chain_code).copied()
    }

    pub fn relayer(&self, dst_bridge_chain_code: u16) -> Option<EndpointPair> {
        self.state.lock().relayers.get(&dst_bridge_chain_code).copied()
    }

    fn take_read_failure(state: &mut State) -> Result<(), ContractError> {
        if state.transient_read_failures > 0 {
            state.transient_read_failures -= 1;
            return Err(ContractError::from(TransportErrorKind::custom_str(
                "connection refused",
            )));
        }
        Ok(())
    }

    fn record_write(state: &mut State, tag: &[u8]) -> B256 {
        state.writes += 1;
        let mut preimage = tag.to_vec();
        preimage.extend_from_slice(&state.writes.to_be_bytes());
        keccak256(preimage)
    }
}

impl AccountReader for MockChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn code_at(&self, address: Address) -> Result<Bytes, ContractError> {
        let mut state = self.state.lock();
        Self::take_read_failure(&mut state)?;
        Ok(state.code.get(&address).cloned().unwrap_or_default())
    }

    async fn entry_point_nonce(
        &self,
        _entry_point: Address,
        sender: Address,
    ) -> Result<U256, ContractError> {
        let mut state = self.state.lock();
        Self::take_read_failure(&mut state)?;
        state.nonce_reads += 1;
        Ok(state.nonces.get(&sender).copied().unwrap_or_default())
    }

    async fn fee_data(&self) -> Result<GasFees, ContractError> {
        Ok(self.state.lock().fees)
    }
}

impl OmniFactory for MockChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn is_trusted_remote(
        &self,
        _factory: Address,
        remote_bridge_chain_code: u16,
        path: Bytes,
    ) -> Result<bool, ContractError> {
        Ok(self
            .state
            .lock()
            .trusted
            .contains(&(remote_bridge_chain_code, path)))
    }

    async fn set_trusted_remote(
        &self,
        _factory: Address,
        remote_bridge_chain_code: u16,
        path: Bytes,
    ) -> Result<B256, ContractError> {
        let mut state = self.state.lock();
        let tx_hash = Self::record_write(&mut state, b"setTrustedRemote");
        if let Some(reason) = state.trust_write_revert.clone() {
            return Err(ContractError::Reverted { reason, data: None });
        }
        state.trusted.insert((remote_bridge_chain_code, path));
        Ok(tx_hash)
    }

    async fn set_oracle(
        &self,
        _factory: Address,
        dst_bridge_chain_code: u16,
        oracles: EndpointPair,
    ) -> Result<B256, ContractError> {
        let mut state = self.state.lock();
        state.oracles.insert(dst_bridge_chain_code, oracles);
        Ok(Self::record_write(&mut state, b"setOracle"))
    }

    async fn get_oracle(
        &self,
        _factory: Address,
        dst_bridge_chain_code: u16,
    ) -> Result<EndpointPair, ContractError> {
        Ok(self.oracle(dst_bridge_chain_code).unwrap_or(EndpointPair {
            send: Address::ZERO,
            receive: Address::ZERO,
        }))
    }

    async fn set_relayer(
        &self,
        _factory: Address,
        dst_bridge_chain_code: u16,
        relayers: EndpointPair,
    ) -> Result<B256, ContractError> {
        let mut state = self.state.lock();
        state.relayers.insert(dst_bridge_chain_code, relayers);
        Ok(Self::record_write(&mut state, b"setRelayer"))
    }

    async fn get_relayer(
        &self,
        _factory: Address,
        dst_bridge_chain_code: u16,
    ) -> Result<EndpointPair, ContractError> {
        Ok(self.relayer(dst_bridge_chain_code).unwrap_or(EndpointPair {
            send: Address::ZERO,
            receive: Address::ZERO,
        }))
    }

    async fn get_payload(
        &self,
        _factory: Address,
        call: IVersaOmniFactory::getPayloadCall,
    ) -> Result<Bytes, ContractError> {
        let payload = Bytes::copy_from_slice(call.wallet.as_slice());
        self.state.lock().payloads.push(call);
        Ok(payload)
    }

    async fn estimate_native_fee(
        &self,
        _factory: Address,
        _dst_bridge_chain_code: u16,
        _payload: Bytes,
    ) -> Result<U256, ContractError> {
        let mut state = self.state.lock();
        state.fee_quotes += 1;
        Ok(state.native_fee)
    }
}
