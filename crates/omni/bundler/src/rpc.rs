//! Wire types of the ERC-4337 bundler JSON-RPC API.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use versa_omni_primitives::{
    bindings::IEntryPoint, GasLimits, UnsignedUserOperation, UserOperation,
};

/// Entry point v0.6 user operation as sent to `eth_sendUserOperation` and
/// `eth_estimateUserOperationGas`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RpcUserOperationV0_6 {
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
    pub signature: Bytes,
}

impl From<IEntryPoint::UserOperation> for RpcUserOperationV0_6 {
    fn from(op: IEntryPoint::UserOperation) -> Self {
        Self {
            sender: op.sender,
            nonce: op.nonce,
            init_code: op.initCode,
            call_data: op.callData,
            call_gas_limit: op.callGasLimit,
            verification_gas_limit: op.verificationGasLimit,
            pre_verification_gas: op.preVerificationGas,
            max_fee_per_gas: op.maxFeePerGas,
            max_priority_fee_per_gas: op.maxPriorityFeePerGas,
            paymaster_and_data: op.paymasterAndData,
            signature: op.signature,
        }
    }
}

impl From<&UserOperation> for RpcUserOperationV0_6 {
    fn from(op: &UserOperation) -> Self {
        op.to_sol().into()
    }
}

impl RpcUserOperationV0_6 {
    /// Estimation form of `op`, carrying `signature` in place of the real one.
    pub fn for_estimation(op: &UnsignedUserOperation, signature: Bytes) -> Self {
        op.with_placeholder_signature(signature).into()
    }
}

/// Result of `eth_estimateUserOperationGas`.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RpcGasEstimate {
    pub pre_verification_gas: U256,
    // Some relays still answer with the pre-0.6 field name.
    #[serde(alias = "verificationGas")]
    pub verification_gas_limit: U256,
    pub call_gas_limit: U256,
}

impl From<RpcGasEstimate> for GasLimits {
    fn from(estimate: RpcGasEstimate) -> Self {
        Self {
            call_gas_limit: estimate.call_gas_limit,
            verification_gas_limit: estimate.verification_gas_limit,
            pre_verification_gas: estimate.pre_verification_gas,
        }
    }
}

/// Result of `eth_getUserOperationReceipt` once the operation is included.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
    pub user_op_hash: B256,
    pub sender: Address,
    pub nonce: U256,
    pub success: bool,
    #[serde(default)]
    pub reason: Option<String>,
    pub actual_gas_cost: U256,
    pub actual_gas_used: U256,
    pub receipt: InclusionReceipt,
}

/// The parts of the bundle transaction receipt the tooling reports.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InclusionReceipt {
    pub transaction_hash: B256,
    pub block_number: U256,
}
