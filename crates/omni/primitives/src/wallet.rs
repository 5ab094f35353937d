//! Counterfactual wallet addresses.
//!
//! The wallet factory deploys proxies with `CREATE2`, salting each deployment with the
//! hash of the proxy's initializer call. Given the factory's creation-code semantics the
//! address of a wallet is therefore fully determined by the factory, the user supplied
//! salt and the initial validator configuration, and can be computed before the wallet
//! exists.

use std::str::FromStr;

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolValue};

use crate::bindings::{IVersaOmniFactory, IVersaOmniWallet};

/// Validator type flag for a sudo validator.
pub const SUDO_VALIDATOR: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalletError {
    #[error("invalid wallet spec: {0}")]
    InvalidSpec(String),
}

/// Inputs to wallet address derivation. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletInitSpec {
    pub factory: Address,
    pub salt: U256,
    pub sudo_validator: Address,
    pub sudo_validator_init_data: Bytes,
}

impl WalletInitSpec {
    /// Builds a spec from textual inputs, rejecting anything malformed.
    ///
    /// `salt` must be a non-negative decimal or `0x` prefixed hex integer.
    pub fn parse(
        factory: &str,
        salt: &str,
        sudo_validator: &str,
        sudo_validator_init_data: &str,
    ) -> Result<Self, WalletError> {
        let spec = Self {
            factory: parse_address("factory", factory)?,
            salt: parse_salt(salt)?,
            sudo_validator: parse_address("sudo validator", sudo_validator)?,
            sudo_validator_init_data: Bytes::from_str(sudo_validator_init_data).map_err(|e| {
                WalletError::InvalidSpec(format!("validator init data `{sudo_validator_init_data}`: {e}"))
            })?,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Spec for an ECDSA sudo validator whose init data is the ABI encoded owner.
    pub fn ecdsa(factory: Address, salt: U256, validator: Address, owner: Address) -> Self {
        Self {
            factory,
            salt,
            sudo_validator: validator,
            sudo_validator_init_data: owner.abi_encode().into(),
        }
    }

    pub fn validate(&self) -> Result<(), WalletError> {
        if self.factory.is_zero() {
            return Err(WalletError::InvalidSpec("factory address is zero".into()));
        }
        if self.sudo_validator.is_zero() {
            return Err(WalletError::InvalidSpec("sudo validator address is zero".into()));
        }
        Ok(())
    }

    /// Validator configuration shared by the initializer and the factory calls.
    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            validators: vec![self.sudo_validator],
            validator_init_data: vec![self.sudo_validator_init_data.clone()],
            validator_types: vec![SUDO_VALIDATOR],
        }
    }
}

/// Validators installed on a freshly created wallet. Hooks and modules are always empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidatorConfig {
    pub validators: Vec<Address>,
    pub validator_init_data: Vec<Bytes>,
    pub validator_types: Vec<u8>,
}

impl ValidatorConfig {
    /// `getPayload` call used to quote a remote account creation for `wallet`.
    pub fn payload_call(&self, wallet: Address) -> IVersaOmniFactory::getPayloadCall {
        IVersaOmniFactory::getPayloadCall {
            wallet,
            validators: self.validators.clone(),
            validatorInitData: self.validator_init_data.clone(),
            validatorType: self.validator_types.clone(),
            hooks: vec![],
            hooksInitData: vec![],
            modules: vec![],
            moduleInitData: vec![],
        }
    }

    /// `createAccountOnRemoteChain` call for destination `dst_bridge_chain_code`.
    pub fn remote_create_call(
        &self,
        dst_bridge_chain_code: u16,
    ) -> IVersaOmniFactory::createAccountOnRemoteChainCall {
        IVersaOmniFactory::createAccountOnRemoteChainCall {
            dstChainId: dst_bridge_chain_code,
            validators: self.validators.clone(),
            validatorInitData: self.validator_init_data.clone(),
            validatorType: self.validator_types.clone(),
            hooks: vec![],
            hooksInitData: vec![],
            modules: vec![],
            moduleInitData: vec![],
        }
    }
}

/// Derived wallet address together with the init code that deploys it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedWallet {
    pub address: Address,
    pub init_code: Bytes,
}

/// Computes wallet addresses for one factory deployment.
#[derive(Debug, Clone)]
pub struct WalletAddressResolver {
    singleton: Address,
    fallback_handler: Address,
    proxy_creation_code: Bytes,
}

impl WalletAddressResolver {
    /// `proxy_creation_code` is the factory's `proxyCreationCode()`.
    pub fn new(
        singleton: Address,
        fallback_handler: Address,
        proxy_creation_code: Bytes,
    ) -> Result<Self, WalletError> {
        if singleton.is_zero() {
            return Err(WalletError::InvalidSpec("wallet singleton address is zero".into()));
        }
        if proxy_creation_code.is_empty() {
            return Err(WalletError::InvalidSpec("proxy creation code is empty".into()));
        }
        Ok(Self {
            singleton,
            fallback_handler,
            proxy_creation_code,
        })
    }

    pub fn resolve(&self, spec: &WalletInitSpec) -> Result<ResolvedWallet, WalletError> {
        Ok(ResolvedWallet {
            address: self.address(spec)?,
            init_code: self.init_code(spec)?,
        })
    }

    /// The address the factory will deploy `spec` to.
    pub fn address(&self, spec: &WalletInitSpec) -> Result<Address, WalletError> {
        spec.validate()?;
        let initializer = self.initializer(spec);
        let salt = keccak256((keccak256(&initializer), spec.salt).abi_encode_packed());
        Ok(spec.factory.create2(salt, self.deployment_code_hash()))
    }

    /// `factory ‖ createAccount(...)`, the init code of the wallet's first operation.
    pub fn init_code(&self, spec: &WalletInitSpec) -> Result<Bytes, WalletError> {
        spec.validate()?;
        let config = spec.validator_config();
        let call = IVersaOmniFactory::createAccountCall {
            validators: config.validators,
            validatorInitData: config.validator_init_data,
            validatorType: config.validator_types,
            hooks: vec![],
            hooksInitData: vec![],
            modules: vec![],
            moduleInitData: vec![],
            salt: spec.salt,
        };

        let mut init_code = spec.factory.to_vec();
        init_code.extend_from_slice(&call.abi_encode());
        Ok(init_code.into())
    }

    /// The factory's `getAddress` view call for `spec`, used to cross-check derivation.
    pub fn get_address_call(spec: &WalletInitSpec) -> IVersaOmniFactory::getAddressCall {
        let config = spec.validator_config();
        IVersaOmniFactory::getAddressCall {
            validators: config.validators,
            validatorInitData: config.validator_init_data,
            validatorType: config.validator_types,
            hooks: vec![],
            hooksInitData: vec![],
            modules: vec![],
            moduleInitData: vec![],
            salt: spec.salt,
        }
    }

    fn initializer(&self, spec: &WalletInitSpec) -> Vec<u8> {
        let config = spec.validator_config();
        IVersaOmniWallet::initializeCall {
            fallbackHandler: self.fallback_handler,
            validators: config.validators,
            validatorInitData: config.validator_init_data,
            validatorType: config.validator_types,
            hooks: vec![],
            hooksInitData: vec![],
            modules: vec![],
            moduleInitData: vec![],
        }
        .abi_encode()
    }

    fn deployment_code_hash(&self) -> B256 {
        let mut code = self.proxy_creation_code.to_vec();
        code.extend_from_slice(&self.singleton.into_word().0);
        keccak256(code)
    }
}

fn parse_address(what: &str, value: &str) -> Result<Address, WalletError> {
    Address::from_str(value.trim())
        .map_err(|e| WalletError::InvalidSpec(format!("{what} address `{value}`: {e}")))
}

fn parse_salt(value: &str) -> Result<U256, WalletError> {
    let value = value.trim();
    if value.starts_with('-') {
        return Err(WalletError::InvalidSpec(format!("salt `{value}` is negative")));
    }
    U256::from_str(value)
        .map_err(|e| WalletError::InvalidSpec(format!("salt `{value}` is not an integer: {e}")))
}
