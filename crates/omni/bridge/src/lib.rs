//! Cross-chain configuration of the omni wallet factory: trusted remotes, message
//! oracles and relayers, remote creation fee quotes and the remote creation flow.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod configurator;
pub mod factory;
pub mod fee;
pub mod link;
pub mod remote_create;

pub use configurator::{BridgeError, CrossChainConfigurator, TrustOutcome};
pub use factory::{EndpointPair, OmniFactory};
pub use fee::{Clock, FeePolicy, FeeQuote, SystemClock, DEFAULT_SAFETY_MARGIN_WEI, DEFAULT_STALENESS_WINDOW};
pub use link::TrustedRemoteLink;
pub use remote_create::{
    AutoConfirm, Confirmation, RemoteCreateError, RemoteCreateFlow, RemoteCreateOutcome,
    RemoteCreateRequest, RemoteCreateStage,
};
