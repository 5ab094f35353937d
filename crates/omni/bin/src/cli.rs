use std::path::PathBuf;

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use clap::{Args, Parser, Subcommand};
use url::Url;
use versa_omni_primitives::AddressSlot;

pub mod book;
pub mod bridge;
pub mod confirm;
pub mod session;
pub mod wallet;

/// Operator tooling for omni wallets: deterministic wallet addresses, ERC-4337 user
/// operations through a bundler, and the bridge settings of the wallet factory.
///
/// Deployed contract addresses are read from one address book per chain under
/// `--address-book-dir`.
#[derive(Debug, Clone, Parser)]
#[clap(version, about)]
pub struct Cli {
    #[clap(flatten)]
    pub global: GlobalArgs,
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Chain to operate on.
    #[clap(long, env = "CHAIN_ID", global = true)]
    pub chain_id: Option<u64>,
    /// Node RPC endpoint, overriding the registry endpoint of `--chain-id`.
    #[clap(long, env = "RPC_URL", global = true)]
    pub rpc_url: Option<Url>,
    /// Bundler endpoint, overriding the registry endpoint of `--chain-id`.
    #[clap(long, env = "BUNDLER_URL", global = true)]
    pub bundler_url: Option<Url>,
    /// Directory holding the per-chain address books.
    #[clap(long, env = "ADDRESS_BOOK_DIR", default_value = "deployments", global = true)]
    pub address_book_dir: PathBuf,
    /// JSON file replacing the built-in chain registry.
    #[clap(long, env = "CHAIN_REGISTRY", global = true)]
    pub chain_registry: Option<PathBuf>,
    /// Owner keys. Repeat for multi-signer validators; signatures follow this order.
    #[clap(
        long = "private-key",
        env = "PRIVATE_KEYS",
        value_delimiter = ',',
        hide_env_values = true,
        global = true
    )]
    pub private_keys: Vec<PrivateKeySigner>,
    /// Attempts for node reads that fail on the transport.
    #[clap(long, default_value_t = 3, global = true)]
    pub read_attempts: u32,
    /// Attempts for bundler submissions that fail on the transport.
    #[clap(long, default_value_t = 3, global = true)]
    pub submit_attempts: u32,
    /// Milliseconds between receipt polls.
    #[clap(long, default_value_t = 2_000, global = true)]
    pub poll_interval_ms: u64,
    /// Seconds to wait for a user operation receipt.
    #[clap(long, default_value_t = 120, global = true)]
    pub receipt_timeout_secs: u64,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// List the supported chains.
    Chains,
    /// Edit an address book.
    #[clap(subcommand)]
    AddressBook(AddressBookCommand),
    /// Print the counterfactual wallet address and its init code.
    DeriveWallet(DeriveWalletArgs),
    /// Deploy the wallet on the connected chain with its first user operation.
    NormalCreate(WalletArgs),
    /// Create an already deployed wallet on another chain through the bridge.
    RemoteCreate(RemoteCreateArgs),
    /// Rotate the ECDSA validator signer on every chain the wallet lives on.
    SetSignerAndSync(SetSignerArgs),
    /// Trust the wallet factory of one or every remote chain.
    SetTrustedRemote(SetTrustedRemoteArgs),
    /// Set the bridge oracles for a destination.
    SetOracle(SetEndpointArgs),
    GetOracle(DestinationArgs),
    /// Set the bridge relayers for a destination.
    SetRelayer(SetEndpointArgs),
    GetRelayer(DestinationArgs),
}

#[derive(Debug, Clone, Subcommand)]
pub enum AddressBookCommand {
    /// Record an address deployed outside this tool.
    Set {
        /// Slot to write, e.g. `walletFactory` or `bridgeEndpoint`.
        key: AddressSlot,
        address: Address,
    },
}

#[derive(Debug, Clone, Args)]
pub struct WalletArgs {
    /// Wallet salt.
    #[clap(long, env = "SALT", default_value_t = 100001)]
    pub salt: u64,
    /// Owner installed in the sudo validator. Defaults to the first `--private-key`.
    #[clap(long)]
    pub owner: Option<Address>,
}

#[derive(Debug, Clone, Args)]
pub struct DeriveWalletArgs {
    #[clap(flatten)]
    pub wallet: WalletArgs,
    /// Record the derived address in every chain's address book.
    #[clap(long)]
    pub record: bool,
}

#[derive(Debug, Clone, Args)]
pub struct RemoteCreateArgs {
    #[clap(flatten)]
    pub wallet: WalletArgs,
    /// Chain to create the wallet on.
    #[clap(long)]
    pub dst_chain_id: u64,
    /// Skip the confirmation prompt.
    #[clap(long, short)]
    pub yes: bool,
    /// Fee re-quotes allowed when a quote expires before submission.
    #[clap(long, default_value_t = versa_omni_bridge::remote_create::DEFAULT_MAX_REQUOTES)]
    pub max_requotes: u32,
}

#[derive(Debug, Clone, Args)]
pub struct SetSignerArgs {
    #[clap(flatten)]
    pub wallet: WalletArgs,
    /// New signer of the ECDSA validator.
    #[clap(long)]
    pub new_signer: Address,
}

#[derive(Debug, Clone, Args)]
pub struct SetTrustedRemoteArgs {
    /// Remote chain to trust. Every other registered chain when omitted.
    #[clap(long)]
    pub remote_chain_id: Option<u64>,
}

#[derive(Debug, Clone, Args)]
pub struct DestinationArgs {
    /// Destination chain of the setting.
    #[clap(long)]
    pub dst_chain_id: u64,
}

#[derive(Debug, Clone, Args)]
pub struct SetEndpointArgs {
    #[clap(flatten)]
    pub destination: DestinationArgs,
    /// Send side address.
    #[clap(long)]
    pub send: Address,
    /// Receive side address.
    #[clap(long)]
    pub receive: Address,
}
