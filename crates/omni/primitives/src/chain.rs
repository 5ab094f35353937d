//! Supported networks and their bridge chain codes.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use url::Url;

/// Networks with a known bridge chain code.
///
/// The string form is the human readable network name used by the bridge's
/// chain-code table and by the address book file names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "kebab-case")]
pub enum BridgeNetwork {
    Goerli,
    Sepolia,
    BscTestnet,
    Fuji,
    PolygonMumbai,
    OptimismGoerli,
    ArbitrumGoerli,
    ScrollTestnet,
    ScrollSepolia,
}

impl BridgeNetwork {
    /// The bridge's internal numeric identifier for this network.
    pub const fn bridge_chain_code(self) -> u16 {
        match self {
            Self::Goerli => 10121,
            Self::Sepolia => 10161,
            Self::BscTestnet => 10102,
            Self::Fuji => 10106,
            Self::PolygonMumbai => 10109,
            Self::OptimismGoerli => 10132,
            Self::ArbitrumGoerli => 10143,
            Self::ScrollTestnet => 10170,
            Self::ScrollSepolia => 10214,
        }
    }

    /// Looks up a network by bridge chain code.
    pub fn from_bridge_chain_code(code: u16) -> Option<Self> {
        Self::iter().find(|network| network.bridge_chain_code() == code)
    }
}

/// Static parameters of one supported network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDescriptor {
    /// Name used for display and for the per-chain address book file.
    pub name: String,
    pub chain_id: u64,
    pub bridge_chain_code: u16,
    pub rpc_endpoint: Url,
    pub bundler_endpoint: Url,
}

impl ChainDescriptor {
    /// File name of this chain's address book record.
    pub fn address_book_file(&self) -> String {
        format!("{}.json", self.name)
    }
}

/// Overrides applied to a descriptor while the registry is being loaded.
#[derive(Debug, Clone, Default)]
pub struct EndpointOverrides {
    pub rpc_endpoint: Option<Url>,
    pub bundler_endpoint: Option<Url>,
}

#[derive(Debug, thiserror::Error)]
pub enum ChainRegistryError {
    #[error("unsupported network: chain id {0}")]
    UnsupportedChain(u64),
    #[error("unknown network name `{0}`")]
    UnknownNetwork(String),
    #[error("bridge chain code {0} is not registered")]
    UnknownBridgeChainCode(u16),
    #[error("duplicate chain id {0} in registry")]
    DuplicateChain(u64),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Chain id keyed lookup of every supported network.
///
/// Built once per process and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRegistry {
    chains: BTreeMap<u64, ChainDescriptor>,
}

impl ChainRegistry {
    /// Builds a registry from a list of descriptors.
    pub fn new(
        descriptors: impl IntoIterator<Item = ChainDescriptor>,
    ) -> Result<Self, ChainRegistryError> {
        let mut chains = BTreeMap::new();
        for descriptor in descriptors {
            let chain_id = descriptor.chain_id;
            if chains.insert(chain_id, descriptor).is_some() {
                return Err(ChainRegistryError::DuplicateChain(chain_id));
            }
        }
        Ok(Self { chains })
    }

    /// The networks the omni wallet is deployed on.
    pub fn builtin() -> Self {
        let chains = [
            builtin_descriptor(
                BridgeNetwork::PolygonMumbai,
                80001,
                "https://polygon-testnet.public.blastapi.io",
                "http://3.38.245.156/bundler/polygon-mumbai",
            ),
            builtin_descriptor(
                BridgeNetwork::ScrollSepolia,
                534351,
                "https://scroll-sepolia.public.blastapi.io",
                "http://3.38.245.156/bundler/scroll-sepolia",
            ),
            builtin_descriptor(
                BridgeNetwork::ScrollTestnet,
                534353,
                "https://alpha-rpc.scroll.io/l2",
                "http://3.38.245.156/bundler/scroll-testnet",
            ),
        ];

        Self {
            chains: chains.into_iter().map(|c| (c.chain_id, c)).collect(),
        }
    }

    /// Reads a registry from a JSON array of descriptors.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ChainRegistryError> {
        let file = std::fs::File::open(path)?;
        let descriptors: Vec<ChainDescriptor> = serde_json::from_reader(file)?;
        Self::new(descriptors)
    }

    /// Applies endpoint overrides to one chain. Only valid before the registry is shared.
    pub fn with_overrides(
        mut self,
        chain_id: u64,
        overrides: EndpointOverrides,
    ) -> Result<Self, ChainRegistryError> {
        let descriptor = self
            .chains
            .get_mut(&chain_id)
            .ok_or(ChainRegistryError::UnsupportedChain(chain_id))?;
        if let Some(rpc) = overrides.rpc_endpoint {
            descriptor.rpc_endpoint = rpc;
        }
        if let Some(bundler) = overrides.bundler_endpoint {
            descriptor.bundler_endpoint = bundler;
        }
        Ok(self)
    }

    /// Selects the descriptor for the connected network.
    pub fn get(&self, chain_id: u64) -> Result<&ChainDescriptor, ChainRegistryError> {
        self.chains
            .get(&chain_id)
            .ok_or(ChainRegistryError::UnsupportedChain(chain_id))
    }

    pub fn by_name(&self, name: &str) -> Result<&ChainDescriptor, ChainRegistryError> {
        self.chains
            .values()
            .find(|c| c.name == name)
            .ok_or_else(|| ChainRegistryError::UnknownNetwork(name.to_string()))
    }

    pub fn by_bridge_chain_code(&self, code: u16) -> Result<&ChainDescriptor, ChainRegistryError> {
        self.chains
            .values()
            .find(|c| c.bridge_chain_code == code)
            .ok_or(ChainRegistryError::UnknownBridgeChainCode(code))
    }

    /// Every registered chain except `chain_id`, i.e. the remote side of each pair.
    pub fn remotes_of(&self, chain_id: u64) -> impl Iterator<Item = &ChainDescriptor> {
        self.chains.values().filter(move |c| c.chain_id != chain_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainDescriptor> {
        self.chains.values()
    }

    /// Native chain ids in registry order, paired with `bridge_chain_codes`.
    pub fn chain_ids(&self) -> Vec<u64> {
        self.chains.keys().copied().collect()
    }

    pub fn bridge_chain_codes(&self) -> Vec<u16> {
        self.chains.values().map(|c| c.bridge_chain_code).collect()
    }
}

fn builtin_descriptor(
    network: BridgeNetwork,
    chain_id: u64,
    rpc: &str,
    bundler: &str,
) -> ChainDescriptor {
    ChainDescriptor {
        name: network_file_stem(network),
        chain_id,
        bridge_chain_code: network.bridge_chain_code(),
        rpc_endpoint: Url::parse(rpc).expect("valid builtin rpc url"),
        bundler_endpoint: Url::parse(bundler).expect("valid builtin bundler url"),
    }
}

/// `polygon-mumbai` -> `polygonMumbai`, matching the address book file names.
fn network_file_stem(network: BridgeNetwork) -> String {
    let kebab = network.to_string();
    let mut out = String::with_capacity(kebab.len());
    let mut upper = false;
    for ch in kebab.chars() {
        if ch == '-' {
            upper = true;
        } else if upper {
            out.push(ch.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}
