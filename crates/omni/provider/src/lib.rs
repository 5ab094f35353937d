//! Chain access for omni wallet tooling: typed contract reads and writes over an
//! alloy provider, with transport failures told apart from on-chain reverts.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

mod client;
mod error;
mod retry;

pub use client::{ChainClient, DEFAULT_CONFIRMATION_TIMEOUT};
pub use error::ContractError;
pub use retry::RetryPolicy;
