//! Shared types for operating omni wallet deployments: the chain registry, per-chain
//! address books, counterfactual wallet addresses and ERC-4337 user operations.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

use alloy_primitives::{address, Address};

/// Canonical ERC-4337 v0.6 entry point, deployed at the same address on every chain.
pub const ENTRY_POINT_V06: Address = address!("5FF137D4b0FDCD49DcA30c7CF57E578a026d2789");

pub mod address_book;
pub mod bindings;
pub mod chain;
pub mod context;
pub mod execute;
pub mod user_op;
pub mod wallet;

pub use address_book::{AddressBook, AddressBookError, AddressBookStore, AddressSlot, DeployedAddresses};
pub use chain::{BridgeNetwork, ChainDescriptor, ChainRegistry, ChainRegistryError, EndpointOverrides};
pub use context::OpContext;
pub use user_op::{GasFees, GasLimits, UnsignedUserOperation, UserOperation};
pub use wallet::{ResolvedWallet, ValidatorConfig, WalletAddressResolver, WalletError, WalletInitSpec};
