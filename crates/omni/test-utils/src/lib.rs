//! Fixtures and in-memory collaborators for testing omni wallet tooling without a
//! node or a bundler.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

use alloy_primitives::{address, bytes, Address, Bytes, U256};
use alloy_signer_local::{coins_bip39::English, MnemonicBuilder, PrivateKeySigner};
use versa_omni_primitives::{WalletAddressResolver, WalletInitSpec};

pub mod clock;
pub mod mock_bundler;
pub mod mock_chain;

pub use clock::ManualClock;
pub use mock_bundler::{MockBundler, ReceiptBehavior};
pub use mock_chain::MockChain;

const MNEMONIC: &str = "test test test test test test test test test test test junk";

pub const MUMBAI_CHAIN_ID: u64 = 80001;
pub const SCROLL_SEPOLIA_CHAIN_ID: u64 = 534351;

pub const FACTORY: Address = address!("1111111111111111111111111111111111111111");
pub const SINGLETON: Address = address!("2222222222222222222222222222222222222222");
pub const FALLBACK_HANDLER: Address = address!("3333333333333333333333333333333333333333");
pub const VALIDATOR: Address = address!("4444444444444444444444444444444444444444");
pub const REMOTE_FACTORY: Address = address!("5555555555555555555555555555555555555555");
pub const REMOTE_VALIDATOR: Address = address!("6666666666666666666666666666666666666666");
pub const OWNER: Address = address!("aAaAaAaaAaAaAaaAaAAAAAAAAaaaAaAaAaaAaaAa");

pub const SALT: u64 = 100001;

/// Start of a minimal proxy creation code; enough to fix the `CREATE2` code hash.
pub fn proxy_creation_code() -> Bytes {
    bytes!("608060405234801561001057600080fd5b506040516101e63803806101e68339818101604052602081101561003357600080fd5b8101908080519060200190929190505050")
}

pub fn wallet_spec() -> WalletInitSpec {
    WalletInitSpec::ecdsa(FACTORY, U256::from(SALT), VALIDATOR, OWNER)
}

pub fn resolver() -> WalletAddressResolver {
    WalletAddressResolver::new(SINGLETON, FALLBACK_HANDLER, proxy_creation_code())
        .expect("valid fixture resolver")
}

pub fn signer(index: u32) -> PrivateKeySigner {
    MnemonicBuilder::<English>::default()
        .phrase(MNEMONIC)
        .index(index)
        .expect("Failed to set index")
        .build()
        .expect("Failed to create signer")
}

pub fn account(index: u32) -> Address {
    signer(index).address()
}
