#![cfg_attr(not(test), warn(unused_crate_dependencies))]

use clap::Parser;
use eyre::config::HookBuilder;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

mod cli;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();

    HookBuilder::default()
        .theme(eyre::config::Theme::new())
        .install()?;

    // Enable backtraces unless a RUST_BACKTRACE value has already been explicitly provided.
    if std::env::var_os("RUST_BACKTRACE").is_none() {
        std::env::set_var("RUST_BACKTRACE", "1");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let session = cli::session::Session::new(cli.global)?;
    match cli.command {
        Commands::Chains => cli::book::list_chains(&session),
        Commands::AddressBook(cmd) => cli::book::address_book(&session, cmd),
        Commands::DeriveWallet(args) => cli::wallet::derive_wallet(&session, args).await,
        Commands::NormalCreate(args) => cli::wallet::normal_create(&session, args).await,
        Commands::RemoteCreate(args) => cli::wallet::remote_create(&session, args).await,
        Commands::SetSignerAndSync(args) => cli::wallet::set_signer_and_sync(&session, args).await,
        Commands::SetTrustedRemote(args) => cli::bridge::set_trusted_remote(&session, args).await,
        Commands::SetOracle(args) => cli::bridge::set_oracle(&session, args).await,
        Commands::GetOracle(args) => cli::bridge::get_oracle(&session, args).await,
        Commands::SetRelayer(args) => cli::bridge::set_relayer(&session, args).await,
        Commands::GetRelayer(args) => cli::bridge::get_relayer(&session, args).await,
    }
}
