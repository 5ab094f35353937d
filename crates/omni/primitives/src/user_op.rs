//! ERC-4337 (entry point v0.6) user operations.
//!
//! An operation is assembled as an [`UnsignedUserOperation`], whose gas fields may be
//! rewritten by estimation, and becomes a [`UserOperation`] only once a signature over
//! its frozen fields is attached. A signed operation exposes no setters.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};

use crate::bindings::IEntryPoint;

/// Signature type byte for an instantly valid ECDSA validator signature.
pub const INSTANT_SIGNATURE: u8 = 0x00;

/// Length of one `r ‖ s ‖ v` ECDSA signature.
pub const ECDSA_SIGNATURE_LEN: usize = 65;

/// Gas limits returned by bundler estimation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasLimits {
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
}

/// EIP-1559 fee parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasFees {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

/// A user operation whose fields are still being filled in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedUserOperation {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: Bytes,
    pub call_data: Bytes,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub paymaster_and_data: Bytes,
}

impl UnsignedUserOperation {
    pub fn gas_limits(&self) -> GasLimits {
        GasLimits {
            call_gas_limit: self.call_gas_limit,
            verification_gas_limit: self.verification_gas_limit,
            pre_verification_gas: self.pre_verification_gas,
        }
    }

    pub fn set_gas_limits(&mut self, limits: GasLimits) {
        self.call_gas_limit = limits.call_gas_limit;
        self.verification_gas_limit = limits.verification_gas_limit;
        self.pre_verification_gas = limits.pre_verification_gas;
    }

    pub fn set_gas_fees(&mut self, fees: GasFees) {
        self.max_fee_per_gas = fees.max_fee_per_gas;
        self.max_priority_fee_per_gas = fees.max_priority_fee_per_gas;
    }

    /// Whether this operation deploys its sender.
    pub fn deploys_wallet(&self) -> bool {
        !self.init_code.is_empty()
    }

    /// The entry point v0.6 `getUserOpHash` for this operation.
    ///
    /// `keccak256(abi.encode(keccak256(pack(op)), entryPoint, chainId))`, where `pack`
    /// hashes every dynamic field and leaves the signature out.
    pub fn hash(&self, entry_point: Address, chain_id: u64) -> B256 {
        let packed = (
            self.sender,
            self.nonce,
            keccak256(&self.init_code),
            keccak256(&self.call_data),
            self.call_gas_limit,
            self.verification_gas_limit,
            self.pre_verification_gas,
            self.max_fee_per_gas,
            self.max_priority_fee_per_gas,
            keccak256(&self.paymaster_and_data),
        )
            .abi_encode();
        keccak256((keccak256(packed), entry_point, U256::from(chain_id)).abi_encode())
    }

    /// Attaches `signature`, freezing every other field.
    pub fn into_signed(self, signature: Bytes) -> UserOperation {
        UserOperation {
            inner: self,
            signature,
        }
    }

    /// The operation in RPC form carrying a placeholder signature, for gas estimation.
    pub fn with_placeholder_signature(&self, signature: Bytes) -> IEntryPoint::UserOperation {
        to_sol(self, signature)
    }
}

/// A signed user operation. Fields are read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOperation {
    #[serde(flatten)]
    inner: UnsignedUserOperation,
    signature: Bytes,
}

impl UserOperation {
    pub fn sender(&self) -> Address {
        self.inner.sender
    }

    pub fn nonce(&self) -> U256 {
        self.inner.nonce
    }

    pub fn signature(&self) -> &Bytes {
        &self.signature
    }

    /// The signed-over fields.
    pub fn fields(&self) -> &UnsignedUserOperation {
        &self.inner
    }

    /// A copy of the signed-over fields, for rebuilding a new operation.
    pub fn to_unsigned(&self) -> UnsignedUserOperation {
        self.inner.clone()
    }

    pub fn hash(&self, entry_point: Address, chain_id: u64) -> B256 {
        self.inner.hash(entry_point, chain_id)
    }

    pub fn to_sol(&self) -> IEntryPoint::UserOperation {
        to_sol(&self.inner, self.signature.clone())
    }
}

fn to_sol(op: &UnsignedUserOperation, signature: Bytes) -> IEntryPoint::UserOperation {
    IEntryPoint::UserOperation {
        sender: op.sender,
        nonce: op.nonce,
        initCode: op.init_code.clone(),
        callData: op.call_data.clone(),
        callGasLimit: op.call_gas_limit,
        verificationGasLimit: op.verification_gas_limit,
        preVerificationGas: op.pre_verification_gas,
        maxFeePerGas: op.max_fee_per_gas,
        maxPriorityFeePerGas: op.max_priority_fee_per_gas,
        paymasterAndData: op.paymaster_and_data.clone(),
        signature,
    }
}

/// `validator ‖ 0x00 ‖ sig_1 ‖ … ‖ sig_n`, the layout the wallet routes to its validator.
///
/// The validator contract enforces ordering and threshold rules; signatures are kept in
/// the order given.
pub fn pack_validator_signature<'a>(
    validator: Address,
    signatures: impl IntoIterator<Item = &'a [u8]>,
) -> Bytes {
    let mut out = Vec::with_capacity(21 + ECDSA_SIGNATURE_LEN);
    out.extend_from_slice(validator.as_slice());
    out.push(INSTANT_SIGNATURE);
    for signature in signatures {
        out.extend_from_slice(signature);
    }
    out.into()
}

/// A well-formed signature of the right length for `signers` signers, used while
/// estimating gas before the real signature exists.
pub fn placeholder_signature(validator: Address, signers: usize) -> Bytes {
    let mut dummy = [0xffu8; ECDSA_SIGNATURE_LEN];
    dummy[ECDSA_SIGNATURE_LEN - 1] = 0x1c;
    pack_validator_signature(
        validator,
        std::iter::repeat(dummy.as_slice()).take(signers.max(1)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, bytes};

    #[test]
    fn hash_is_bound_to_chain() {
        let op = UnsignedUserOperation {
            sender: address!("9406Cc6185a346906296840746125a0E44976454"),
            nonce: U256::ZERO,
            init_code: Bytes::new(),
            call_data: Bytes::new(),
            call_gas_limit: U256::from(0x5208),
            verification_gas_limit: U256::from(0x186a0),
            pre_verification_gas: U256::from(0xc350),
            max_fee_per_gas: U256::from(0x3b9aca00u64),
            max_priority_fee_per_gas: U256::from(0x3b9aca00u64),
            paymaster_and_data: Bytes::new(),
        };
        let entry_point = address!("5FF137D4b0FDCD49DcA30c7CF57E578a026d2789");

        let hash = op.hash(entry_point, 1);
        assert_eq!(hash, op.hash(entry_point, 1));
        assert_ne!(hash, op.hash(entry_point, 80001));
        assert_ne!(hash, B256::ZERO);
    }

    #[test]
    fn hash_ignores_signature_and_covers_every_field() {
        let base = UnsignedUserOperation {
            sender: address!("9406Cc6185a346906296840746125a0E44976454"),
            call_data: bytes!("deadbeef"),
            ..Default::default()
        };
        let entry_point = address!("5FF137D4b0FDCD49DcA30c7CF57E578a026d2789");
        let hash = base.hash(entry_point, 80001);

        let signed = base.clone().into_signed(bytes!("01"));
        assert_eq!(signed.hash(entry_point, 80001), hash);

        let mut changed = base.clone();
        changed.paymaster_and_data = bytes!("00");
        assert_ne!(changed.hash(entry_point, 80001), hash);

        let mut changed = base;
        changed.pre_verification_gas = U256::from(1);
        assert_ne!(changed.hash(entry_point, 80001), hash);
    }

    #[test]
    fn signature_layout() {
        let validator = address!("4444444444444444444444444444444444444444");
        let sig_a = [0xaa; ECDSA_SIGNATURE_LEN];
        let sig_b = [0xbb; ECDSA_SIGNATURE_LEN];
        let packed = pack_validator_signature(validator, [sig_a.as_slice(), sig_b.as_slice()]);

        assert_eq!(packed.len(), 20 + 1 + 2 * ECDSA_SIGNATURE_LEN);
        assert_eq!(&packed[..20], validator.as_slice());
        assert_eq!(packed[20], INSTANT_SIGNATURE);
        assert_eq!(&packed[21..86], sig_a.as_slice());
        assert_eq!(&packed[86..], sig_b.as_slice());
    }

    #[test]
    fn placeholder_has_final_length() {
        let validator = address!("4444444444444444444444444444444444444444");
        assert_eq!(placeholder_signature(validator, 1).len(), 86);
        assert_eq!(placeholder_signature(validator, 2).len(), 151);
    }

    #[test]
    fn sol_form_carries_signature() {
        let op = UnsignedUserOperation::default().into_signed(bytes!("0102"));
        let sol = op.to_sol();
        assert_eq!(sol.signature, bytes!("0102"));
        assert_eq!(sol.sender, Address::ZERO);
    }

    #[test]
    fn signed_round_trips_through_json() {
        let op = UnsignedUserOperation {
            nonce: U256::from(3),
            ..Default::default()
        }
        .into_signed(bytes!("0102"));
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["signature"], "0x0102");
        assert_eq!(json["nonce"], "0x3");
        let back: UserOperation = serde_json::from_value(json).unwrap();
        assert_eq!(back, op);
    }
}
