use std::time::Duration;

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use eyre::eyre::{bail, eyre};
use tracing::{debug, info};
use versa_omni_bundler::{BundlerClient, BundlerConfig, HttpBundler, UserOperationBuilder};
use versa_omni_primitives::{
    AddressBookStore, AddressSlot, ChainDescriptor, ChainRegistry, DeployedAddresses,
    EndpointOverrides, ENTRY_POINT_V06,
};
use versa_omni_provider::{ChainClient, RetryPolicy};

use super::GlobalArgs;

/// Registry, address books and keys shared by every command of one invocation.
#[derive(Debug)]
pub struct Session {
    pub registry: ChainRegistry,
    pub store: AddressBookStore,
    signers: Vec<PrivateKeySigner>,
    chain_id: Option<u64>,
    read_retry: RetryPolicy,
    bundler_config: BundlerConfig,
}

impl Session {
    pub fn new(args: GlobalArgs) -> eyre::Result<Self> {
        let mut registry = match &args.chain_registry {
            Some(path) => ChainRegistry::from_json_file(path)?,
            None => ChainRegistry::builtin(),
        };
        if let Some(chain_id) = args.chain_id {
            registry = registry.with_overrides(
                chain_id,
                EndpointOverrides {
                    rpc_endpoint: args.rpc_url,
                    bundler_endpoint: args.bundler_url,
                },
            )?;
        }

        let bundler_config = BundlerConfig::builder()
            .max_submit_attempts(args.submit_attempts)
            .poll_interval(Duration::from_millis(args.poll_interval_ms))
            .receipt_timeout(Duration::from_secs(args.receipt_timeout_secs))
            .build();

        Ok(Self {
            registry,
            store: AddressBookStore::new(args.address_book_dir),
            signers: args.private_keys,
            chain_id: args.chain_id,
            read_retry: RetryPolicy {
                max_attempts: args.read_attempts,
                ..Default::default()
            },
            bundler_config,
        })
    }

    /// The chain selected with `--chain-id`.
    pub fn chain(&self) -> eyre::Result<&ChainDescriptor> {
        let chain_id = self
            .chain_id
            .ok_or_else(|| eyre!("--chain-id is required for this command"))?;
        Ok(self.registry.get(chain_id)?)
    }

    pub fn signers(&self) -> eyre::Result<&[PrivateKeySigner]> {
        if self.signers.is_empty() {
            bail!("at least one --private-key is required for this command");
        }
        Ok(&self.signers)
    }

    /// `owner` if given, else the first signer.
    pub fn owner(&self, owner: Option<Address>) -> eyre::Result<Address> {
        match owner {
            Some(owner) => Ok(owner),
            None => Ok(self.signers()?[0].address()),
        }
    }

    /// Recorded addresses of `chain`.
    pub fn addresses(&self, chain: &ChainDescriptor) -> eyre::Result<DeployedAddresses> {
        let addresses = self.store.read(chain)?;
        debug!(target: "versa_omni::cli", chain = %chain.name, path = %self.store.path_for(chain).display(), "loaded address book");
        Ok(addresses)
    }

    /// Connects to `chain`, sending from the first signer when one is given.
    ///
    /// Fails if the endpoint serves a different chain than the registry entry.
    pub async fn client(&self, chain: &ChainDescriptor) -> eyre::Result<ChainClient> {
        let client = match self.signers.first() {
            Some(signer) => ChainClient::connect_with_signer(&chain.rpc_endpoint, signer.clone()).await?,
            None => ChainClient::connect(&chain.rpc_endpoint).await?,
        };
        if client.chain_id() != chain.chain_id {
            bail!(
                "{} serves chain {} but {} is chain {}",
                chain.rpc_endpoint,
                client.chain_id(),
                chain.name,
                chain.chain_id
            );
        }
        info!(target: "versa_omni::cli", chain = %chain.name, chain_id = chain.chain_id, "connected");
        Ok(client)
    }

    pub fn builder(
        &self,
        client: ChainClient,
        addresses: &DeployedAddresses,
    ) -> eyre::Result<UserOperationBuilder<ChainClient>> {
        Ok(
            UserOperationBuilder::new(client, addresses.require(AddressSlot::Validator)?)
                .with_entry_point(entry_point(addresses))
                .with_read_retry(self.read_retry),
        )
    }

    pub fn bundler(
        &self,
        chain: &ChainDescriptor,
        addresses: &DeployedAddresses,
    ) -> eyre::Result<BundlerClient<HttpBundler>> {
        let transport = HttpBundler::new(chain.bundler_endpoint.clone())?;
        let config = BundlerConfig {
            entry_point: entry_point(addresses),
            ..self.bundler_config.clone()
        };
        Ok(BundlerClient::new(transport, chain.chain_id, config))
    }
}

/// The recorded entry point, or the canonical v0.6 deployment.
fn entry_point(addresses: &DeployedAddresses) -> Address {
    addresses
        .require(AddressSlot::EntryPoint)
        .unwrap_or(ENTRY_POINT_V06)
}
