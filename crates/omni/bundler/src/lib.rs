//! ERC-4337 user operation assembly and relay: builds and signs operations for
//! omni wallets, estimates their gas with a bundler, submits them and waits for
//! inclusion.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod builder;
pub mod client;
pub mod rpc;
pub mod transport;

pub use builder::{AccountReader, BuilderError, GasOverrides, UserOperationBuilder, DEFAULT_GAS_LIMITS};
pub use client::{BundlerClient, BundlerConfig, BundlerError};
pub use rpc::{InclusionReceipt, RpcGasEstimate, RpcUserOperationV0_6, UserOperationReceipt};
pub use transport::{BundlerTransport, HttpBundler, RelayError};
