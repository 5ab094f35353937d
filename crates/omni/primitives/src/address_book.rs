//! Per-chain record of deployed contract addresses.
//!
//! Each chain has one JSON file. A record is read in full when an [`AddressBook`] is
//! opened, mutated in memory and rewritten in full by [`AddressBook::persist`]. Opening
//! a book takes an exclusive advisory lock on a `.lock` file next to the record so two
//! processes cannot interleave rewrites of the same chain. The operating system drops
//! the lock when its holder exits, however it exits.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions, TryLockError};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::chain::ChainDescriptor;

/// Addresses of the contracts the omni wallet relies on for one chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedAddresses {
    #[serde(default)]
    pub entry_point: Address,
    #[serde(default, alias = "versaOmniFactory")]
    pub wallet_factory: Address,
    #[serde(default, alias = "versaOmniSingleton")]
    pub wallet_singleton: Address,
    #[serde(default, alias = "compatibilityFallbackHandler")]
    pub fallback_handler: Address,
    #[serde(default, alias = "ecdsaOmniValidator", alias = "ecdsaValidator")]
    pub validator: Address,
    #[serde(default, alias = "lzEndpoint", skip_serializing_if = "Option::is_none")]
    pub bridge_endpoint: Option<Address>,
    #[serde(default, alias = "versaOmniWallet", skip_serializing_if = "Option::is_none")]
    pub wallet: Option<Address>,
    /// Keys this tool does not interpret, carried through rewrites untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Named slots that can be written from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "camelCase")]
pub enum AddressSlot {
    EntryPoint,
    WalletFactory,
    WalletSingleton,
    FallbackHandler,
    Validator,
    BridgeEndpoint,
    Wallet,
}

impl DeployedAddresses {
    pub fn set(&mut self, slot: AddressSlot, address: Address) {
        match slot {
            AddressSlot::EntryPoint => self.entry_point = address,
            AddressSlot::WalletFactory => self.wallet_factory = address,
            AddressSlot::WalletSingleton => self.wallet_singleton = address,
            AddressSlot::FallbackHandler => self.fallback_handler = address,
            AddressSlot::Validator => self.validator = address,
            AddressSlot::BridgeEndpoint => self.bridge_endpoint = Some(address),
            AddressSlot::Wallet => self.wallet = Some(address),
        }
    }

    /// Returns the address in `slot`, failing if it was never recorded.
    pub fn require(&self, slot: AddressSlot) -> Result<Address, AddressBookError> {
        let address = match slot {
            AddressSlot::EntryPoint => Some(self.entry_point),
            AddressSlot::WalletFactory => Some(self.wallet_factory),
            AddressSlot::WalletSingleton => Some(self.wallet_singleton),
            AddressSlot::FallbackHandler => Some(self.fallback_handler),
            AddressSlot::Validator => Some(self.validator),
            AddressSlot::BridgeEndpoint => self.bridge_endpoint,
            AddressSlot::Wallet => self.wallet,
        };
        address
            .filter(|a| !a.is_zero())
            .ok_or(AddressBookError::Missing(slot))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AddressBookError {
    #[error("address book {} is locked by another writer", .0.display())]
    Locked(PathBuf),
    #[error("address `{0}` is not recorded in the address book")]
    Missing(AddressSlot),
    #[error("address book {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("address book {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Directory holding one address book file per chain.
#[derive(Debug, Clone)]
pub struct AddressBookStore {
    dir: PathBuf,
}

impl AddressBookStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, chain: &ChainDescriptor) -> PathBuf {
        self.dir.join(chain.address_book_file())
    }

    /// Opens the book for `chain`, taking its writer lock.
    pub fn open(&self, chain: &ChainDescriptor) -> Result<AddressBook, AddressBookError> {
        AddressBook::open(self.path_for(chain))
    }

    /// Reads the book for `chain` without taking the writer lock.
    pub fn read(&self, chain: &ChainDescriptor) -> Result<DeployedAddresses, AddressBookError> {
        read_record(&self.path_for(chain))
    }

    /// Records the same wallet address in every given chain's existing book.
    ///
    /// Omni wallets are deployed at one address on every chain, so a derived wallet
    /// is written to all books at once. Chains without a book are skipped. Every lock
    /// is taken before anything is written, so a held lock leaves all books untouched.
    pub fn record_wallet<'a>(
        &self,
        chains: impl IntoIterator<Item = &'a ChainDescriptor>,
        wallet: Address,
    ) -> Result<(), AddressBookError> {
        let mut books = Vec::new();
        for chain in chains {
            let path = self.path_for(chain);
            if !path.exists() {
                debug!(target: "versa_omni::address_book", chain = %chain.name, "no address book, not recording wallet");
                continue;
            }
            books.push(AddressBook::open(path)?);
        }

        for mut book in books {
            if book.addresses().wallet == Some(wallet) {
                continue;
            }
            book.addresses_mut().wallet = Some(wallet);
            book.persist()?;
        }
        Ok(())
    }
}

/// An opened, locked address book for one chain.
#[derive(Debug)]
pub struct AddressBook {
    path: PathBuf,
    addresses: DeployedAddresses,
    _lock: LockFile,
}

impl AddressBook {
    /// Opens the record at `path`. A missing file yields an empty record that is
    /// created on the first [`persist`](Self::persist).
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AddressBookError> {
        let path = path.into();
        let lock = LockFile::acquire(&path)?;
        let addresses = match read_record(&path) {
            Ok(addresses) => addresses,
            Err(AddressBookError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
                debug!(target: "versa_omni::address_book", path = %path.display(), "starting empty address book");
                DeployedAddresses::default()
            }
            Err(err) => return Err(err),
        };

        Ok(Self {
            path,
            addresses,
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn addresses(&self) -> &DeployedAddresses {
        &self.addresses
    }

    pub fn addresses_mut(&mut self) -> &mut DeployedAddresses {
        &mut self.addresses
    }

    /// Rewrites the whole record. The new content goes to a temporary file that is
    /// renamed over the old one, so readers never see a partial record.
    pub fn persist(&self) -> Result<(), AddressBookError> {
        let io_err = |source| AddressBookError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json =
            serde_json::to_string_pretty(&self.addresses).map_err(|source| AddressBookError::Json {
                path: self.path.clone(),
                source,
            })?;

        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = File::create(&tmp).map_err(io_err)?;
            file.write_all(json.as_bytes()).map_err(io_err)?;
            file.write_all(b"\n").map_err(io_err)?;
            file.sync_all().map_err(io_err)?;
        }
        fs::rename(&tmp, &self.path).map_err(io_err)?;

        info!(target: "versa_omni::address_book", path = %self.path.display(), "wrote address book");
        Ok(())
    }
}

fn read_record(path: &Path) -> Result<DeployedAddresses, AddressBookError> {
    let file = File::open(path).map_err(|source| AddressBookError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_reader(file).map_err(|source| AddressBookError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Exclusive advisory lock on `<record>.lock`, released when the file handle closes.
///
/// The lock file itself stays on disk. Only the lock decides ownership, so a file left
/// behind by a crashed writer does not block the next one.
#[derive(Debug)]
struct LockFile {
    _file: File,
}

impl LockFile {
    fn acquire(record: &Path) -> Result<Self, AddressBookError> {
        let mut path = record.as_os_str().to_owned();
        path.push(".lock");
        let path = PathBuf::from(path);
        let io_err = |source| AddressBookError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| AddressBookError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(io_err)?;

        match file.try_lock() {
            Ok(()) => {}
            Err(TryLockError::WouldBlock) => {
                return Err(AddressBookError::Locked(record.to_path_buf()))
            }
            Err(TryLockError::Error(source)) => return Err(io_err(source)),
        }

        // Holder pid, for whoever inspects a contended lock.
        file.set_len(0).map_err(io_err)?;
        writeln!(file, "{}", std::process::id()).map_err(io_err)?;
        Ok(Self { _file: file })
    }
}
