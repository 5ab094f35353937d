use alloy_primitives::Address;
use tracing::info;
use versa_omni_bridge::{CrossChainConfigurator, EndpointPair, TrustOutcome, TrustedRemoteLink};
use versa_omni_primitives::{AddressSlot, ChainDescriptor};
use versa_omni_provider::ChainClient;

use super::{session::Session, DestinationArgs, SetEndpointArgs, SetTrustedRemoteArgs};

/// Configurator for the factory recorded for the selected chain.
async fn configurator(
    session: &Session,
) -> eyre::Result<(&ChainDescriptor, CrossChainConfigurator<ChainClient>)> {
    let chain = session.chain()?;
    let factory = factory(session, chain)?;
    let client = session.client(chain).await?;
    Ok((chain, CrossChainConfigurator::new(client, factory)))
}

fn factory(session: &Session, chain: &ChainDescriptor) -> eyre::Result<Address> {
    Ok(session
        .addresses(chain)?
        .require(AddressSlot::WalletFactory)?)
}

pub async fn set_trusted_remote(session: &Session, args: SetTrustedRemoteArgs) -> eyre::Result<()> {
    session.signers()?;
    let (chain, configurator) = configurator(session).await?;
    let remotes: Vec<&ChainDescriptor> = match args.remote_chain_id {
        Some(remote) => vec![session.registry.get(remote)?],
        None => session.registry.remotes_of(chain.chain_id).collect(),
    };

    for remote in remotes {
        let link = TrustedRemoteLink::new(
            chain,
            configurator.factory(),
            remote,
            factory(session, remote)?,
        );
        match configurator.ensure_trusted_remote(&link).await? {
            TrustOutcome::AlreadyTrusted => {
                println!("{} -> {}: source already set", remote.name, chain.name)
            }
            TrustOutcome::Configured { tx_hash } => {
                println!("{} -> {}: trusted in {tx_hash}", remote.name, chain.name)
            }
        }
    }
    Ok(())
}

pub async fn set_oracle(session: &Session, args: SetEndpointArgs) -> eyre::Result<()> {
    session.signers()?;
    let (chain, configurator) = configurator(session).await?;
    let dst = session.registry.get(args.destination.dst_chain_id)?;
    let tx_hash = configurator
        .set_oracle(dst.bridge_chain_code, endpoints(&args))
        .await?;
    info!(target: "versa_omni::cli", src = %chain.name, dst = %dst.name, %tx_hash, "oracle updated");
    Ok(())
}

pub async fn get_oracle(session: &Session, args: DestinationArgs) -> eyre::Result<()> {
    let (chain, configurator) = configurator(session).await?;
    let dst = session.registry.get(args.dst_chain_id)?;
    let oracles = configurator.get_oracle(dst.bridge_chain_code).await?;
    print_endpoints("oracle", chain, dst, oracles);
    Ok(())
}

pub async fn set_relayer(session: &Session, args: SetEndpointArgs) -> eyre::Result<()> {
    session.signers()?;
    let (chain, configurator) = configurator(session).await?;
    let dst = session.registry.get(args.destination.dst_chain_id)?;
    let tx_hash = configurator
        .set_relayer(dst.bridge_chain_code, endpoints(&args))
        .await?;
    info!(target: "versa_omni::cli", src = %chain.name, dst = %dst.name, %tx_hash, "relayer updated");
    Ok(())
}

pub async fn get_relayer(session: &Session, args: DestinationArgs) -> eyre::Result<()> {
    let (chain, configurator) = configurator(session).await?;
    let dst = session.registry.get(args.dst_chain_id)?;
    let relayers = configurator.get_relayer(dst.bridge_chain_code).await?;
    print_endpoints("relayer", chain, dst, relayers);
    Ok(())
}

fn endpoints(args: &SetEndpointArgs) -> EndpointPair {
    EndpointPair {
        send: args.send,
        receive: args.receive,
    }
}

fn print_endpoints(kind: &str, chain: &ChainDescriptor, dst: &ChainDescriptor, pair: EndpointPair) {
    println!(
        "{kind} {} -> {}: send {} receive {}",
        chain.name, dst.name, pair.send, pair.receive
    );
}
