use alloy_primitives::{Bytes, U256};
use alloy_signer_local::PrivateKeySigner;
use eyre::eyre::bail;
use tracing::info;
use versa_omni_bridge::{
    AutoConfirm, Confirmation, CrossChainConfigurator, RemoteCreateFlow, RemoteCreateOutcome,
    RemoteCreateRequest,
};
use versa_omni_bundler::{BundlerClient, HttpBundler, UserOperationBuilder, UserOperationReceipt};
use versa_omni_primitives::{
    bindings::IVersaOmniFactory,
    execute::{normal_execute, sync_set_signer},
    AddressSlot, ChainDescriptor, DeployedAddresses, ResolvedWallet, WalletAddressResolver,
    WalletInitSpec,
};
use versa_omni_provider::ChainClient;

use super::{
    confirm::StdinConfirm, session::Session, DeriveWalletArgs, RemoteCreateArgs, SetSignerArgs,
    WalletArgs,
};

/// Value sent to the owner by the deploying operation; 0.0000001 ether.
const NORMAL_CREATE_VALUE: U256 = U256::from_limbs([100_000_000_000, 0, 0, 0]);

/// Spec of the wallet owned by `args` on `addresses`' factory.
fn wallet_spec(
    session: &Session,
    addresses: &DeployedAddresses,
    args: &WalletArgs,
) -> eyre::Result<WalletInitSpec> {
    Ok(WalletInitSpec::ecdsa(
        addresses.require(AddressSlot::WalletFactory)?,
        U256::from(args.salt),
        addresses.require(AddressSlot::Validator)?,
        session.owner(args.owner)?,
    ))
}

/// Derives the wallet locally and checks the factory agrees.
async fn resolve_wallet(
    client: &ChainClient,
    addresses: &DeployedAddresses,
    spec: &WalletInitSpec,
) -> eyre::Result<ResolvedWallet> {
    let proxy_creation_code = client
        .call(spec.factory, &IVersaOmniFactory::proxyCreationCodeCall {})
        .await?;
    let resolver = WalletAddressResolver::new(
        addresses.require(AddressSlot::WalletSingleton)?,
        addresses.require(AddressSlot::FallbackHandler)?,
        proxy_creation_code,
    )?;
    let resolved = resolver.resolve(spec)?;

    let on_chain = client
        .call(spec.factory, &WalletAddressResolver::get_address_call(spec))
        .await?;
    if on_chain != resolved.address {
        bail!(
            "derived wallet {} but factory {} reports {on_chain}; check the address book",
            resolved.address,
            spec.factory
        );
    }
    Ok(resolved)
}

pub async fn derive_wallet(session: &Session, args: DeriveWalletArgs) -> eyre::Result<()> {
    let chain = session.chain()?;
    let addresses = session.addresses(chain)?;
    let client = session.client(chain).await?;
    let spec = wallet_spec(session, &addresses, &args.wallet)?;
    let wallet = resolve_wallet(&client, &addresses, &spec).await?;

    println!("wallet    {}", wallet.address);
    println!("init code {}", wallet.init_code);
    if args.record {
        session.store.record_wallet(session.registry.iter(), wallet.address)?;
        info!(target: "versa_omni::cli", wallet = %wallet.address, "recorded wallet in every address book");
    }
    Ok(())
}

pub async fn normal_create(session: &Session, args: WalletArgs) -> eyre::Result<()> {
    let chain = session.chain()?;
    let signers = session.signers()?;
    let addresses = session.addresses(chain)?;
    let client = session.client(chain).await?;
    let spec = wallet_spec(session, &addresses, &args)?;
    let wallet = resolve_wallet(&client, &addresses, &spec).await?;

    // The address is the same everywhere, so every book learns it now.
    session.store.record_wallet(session.registry.iter(), wallet.address)?;

    let owner = session.owner(args.owner)?;
    let call_data = normal_execute(owner, NORMAL_CREATE_VALUE, Bytes::new());
    let builder = session.builder(client, &addresses)?;
    let bundler = session.bundler(chain, &addresses)?;
    let op = builder
        .prepare(wallet.address, call_data, Some(wallet.init_code))
        .await?;
    if !op.deploys_wallet() {
        info!(target: "versa_omni::cli", wallet = %wallet.address, "wallet already deployed, sending a plain operation");
    }

    let receipt = bundler.estimate_and_submit(&builder, op, signers).await?;
    report(chain, &receipt);
    Ok(())
}

pub async fn remote_create(session: &Session, args: RemoteCreateArgs) -> eyre::Result<()> {
    let chain = session.chain()?;
    let signers = session.signers()?;
    let remote = session.registry.get(args.dst_chain_id)?;
    if remote.chain_id == chain.chain_id {
        bail!("destination {} is the connected chain", remote.name);
    }

    let addresses = session.addresses(chain)?;
    let remote_addresses = session.addresses(remote)?;
    let client = session.client(chain).await?;
    let spec = wallet_spec(session, &addresses, &args.wallet)?;
    let wallet = resolve_wallet(&client, &addresses, &spec).await?;
    let remote_spec = wallet_spec(session, &remote_addresses, &args.wallet)?;

    let request = RemoteCreateRequest {
        wallet: wallet.address,
        dst_bridge_chain_code: remote.bridge_chain_code,
        supported_chain_ids: session.registry.chain_ids(),
        supported_bridge_chain_codes: session.registry.bridge_chain_codes(),
        remote_validators: remote_spec.validator_config(),
    };

    let configurator = CrossChainConfigurator::new(client.clone(), spec.factory);
    let builder = session.builder(client, &addresses)?;
    let bundler = session.bundler(chain, &addresses)?;

    let outcome = if args.yes {
        run_remote_create(&configurator, &builder, &bundler, AutoConfirm, &args, &request, signers)
            .await?
    } else {
        run_remote_create(&configurator, &builder, &bundler, StdinConfirm, &args, &request, signers)
            .await?
    };
    println!(
        "funded {} wei for {} on {}",
        outcome.funded_fee, wallet.address, remote.name
    );
    report(chain, &outcome.receipt);
    Ok(())
}

async fn run_remote_create<C: Confirmation>(
    configurator: &CrossChainConfigurator<ChainClient>,
    builder: &UserOperationBuilder<ChainClient>,
    bundler: &BundlerClient<HttpBundler>,
    confirmation: C,
    args: &RemoteCreateArgs,
    request: &RemoteCreateRequest,
    signers: &[PrivateKeySigner],
) -> eyre::Result<RemoteCreateOutcome> {
    let mut flow = RemoteCreateFlow::new(configurator, builder, bundler, confirmation)
        .with_max_requotes(args.max_requotes);
    Ok(flow.run(request, signers).await?)
}

pub async fn set_signer_and_sync(session: &Session, args: SetSignerArgs) -> eyre::Result<()> {
    let chain = session.chain()?;
    let signers = session.signers()?;
    let addresses = session.addresses(chain)?;
    let client = session.client(chain).await?;
    let spec = wallet_spec(session, &addresses, &args.wallet)?;
    let wallet = resolve_wallet(&client, &addresses, &spec).await?.address;

    let call_data = sync_set_signer(addresses.require(AddressSlot::Validator)?, args.new_signer);
    let builder = session.builder(client, &addresses)?;
    let bundler = session.bundler(chain, &addresses)?;
    let op = builder.prepare(wallet, call_data, None).await?;
    let receipt = bundler.estimate_and_submit(&builder, op, signers).await?;

    info!(target: "versa_omni::cli", %wallet, new_signer = %args.new_signer, "signer rotation synced");
    report(chain, &receipt);
    Ok(())
}

fn report(chain: &ChainDescriptor, receipt: &UserOperationReceipt) {
    println!(
        "{} user operation {} included in transaction {} (block {}, gas cost {} wei)",
        chain.name,
        receipt.user_op_hash,
        receipt.receipt.transaction_hash,
        receipt.receipt.block_number,
        receipt.actual_gas_cost
    );
}
