use alloy_primitives::{Address, Bytes};
use alloy_sol_types::SolValue;
use versa_omni_primitives::ChainDescriptor;

/// Authorization for the factory on a remote chain to deliver messages to the
/// factory on the local chain. Links are directional: each side holds its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustedRemoteLink {
    pub local_chain_id: u64,
    pub remote_chain_id: u64,
    pub remote_bridge_chain_code: u16,
    pub remote_address: Address,
    pub local_address: Address,
}

impl TrustedRemoteLink {
    pub fn new(
        local: &ChainDescriptor,
        local_address: Address,
        remote: &ChainDescriptor,
        remote_address: Address,
    ) -> Self {
        Self {
            local_chain_id: local.chain_id,
            remote_chain_id: remote.chain_id,
            remote_bridge_chain_code: remote.bridge_chain_code,
            remote_address,
            local_address,
        }
    }

    /// `remote ‖ local`, the path the bridge endpoint checks on delivery.
    pub fn path(&self) -> Bytes {
        (self.remote_address, self.local_address)
            .abi_encode_packed()
            .into()
    }

    /// The same pair seen from the remote chain.
    pub fn reversed(&self, local_bridge_chain_code: u16) -> Self {
        Self {
            local_chain_id: self.remote_chain_id,
            remote_chain_id: self.local_chain_id,
            remote_bridge_chain_code: local_bridge_chain_code,
            remote_address: self.local_address,
            local_address: self.remote_address,
        }
    }
}
