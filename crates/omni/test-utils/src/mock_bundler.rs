use std::sync::Arc;

use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_transport::TransportErrorKind;
use parking_lot::Mutex;
use versa_omni_bundler::{
    BundlerTransport, InclusionReceipt, RelayError, RpcGasEstimate, RpcUserOperationV0_6,
    UserOperationReceipt,
};
use versa_omni_primitives::{UnsignedUserOperation, ENTRY_POINT_V06};

/// What receipt polling returns once an operation was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiptBehavior {
    /// Included and executed after `pending_polls` empty answers.
    Included { pending_polls: u32 },
    /// Included but the call reverted with `reason`.
    Reverted(String),
    /// Never included.
    Never,
}

#[derive(Debug)]
struct State {
    estimate: RpcGasEstimate,
    reject_estimate: Option<String>,
    reject_submit: Option<String>,
    transient_submit_failures: u32,
    lost_responses: u32,
    accepted: Vec<B256>,
    receipt: ReceiptBehavior,
    estimates: Vec<RpcUserOperationV0_6>,
    submissions: Vec<RpcUserOperationV0_6>,
    receipt_polls: u32,
}

/// Scripted bundler that records every request.
#[derive(Debug, Clone)]
pub struct MockBundler {
    chain_id: u64,
    state: Arc<Mutex<State>>,
}

impl MockBundler {
    pub fn new(chain_id: u64) -> Self {
        let state = State {
            estimate: RpcGasEstimate {
                pre_verification_gas: U256::from(48_000u64),
                verification_gas_limit: U256::from(350_000u64),
                call_gas_limit: U256::from(120_000u64),
            },
            reject_estimate: None,
            reject_submit: None,
            transient_submit_failures: 0,
            lost_responses: 0,
            accepted: Vec::new(),
            receipt: ReceiptBehavior::Included { pending_polls: 0 },
            estimates: Vec::new(),
            submissions: Vec::new(),
            receipt_polls: 0,
        };
        Self {
            chain_id,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn with_estimate(self, estimate: RpcGasEstimate) -> Self {
        self.state.lock().estimate = estimate;
        self
    }

    pub fn with_receipt(self, receipt: ReceiptBehavior) -> Self {
        self.state.lock().receipt = receipt;
        self
    }

    /// Receipt polling never finds the operation.
    pub fn always_pending(self) -> Self {
        self.with_receipt(ReceiptBehavior::Never)
    }

    pub fn reject_estimates(self, message: impl Into<String>) -> Self {
        self.state.lock().reject_estimate = Some(message.into());
        self
    }

    pub fn reject_submissions(self, message: impl Into<String>) -> Self {
        self.state.lock().reject_submit = Some(message.into());
        self
    }

    /// The next `count` submissions fail with a connection error.
    pub fn drop_submissions(self, count: u32) -> Self {
        self.state.lock().transient_submit_failures = count;
        self
    }

    /// The next `count` submissions are accepted into the mempool but their
    /// responses time out. Resending an accepted operation is rejected as a duplicate.
    pub fn lose_responses(self, count: u32) -> Self {
        self.state.lock().lost_responses = count;
        self
    }

    /// Every `eth_sendUserOperation` request received, including failed ones.
    pub fn submissions(&self) -> Vec<RpcUserOperationV0_6> {
        self.state.lock().submissions.clone()
    }

    pub fn estimates(&self) -> Vec<RpcUserOperationV0_6> {
        self.state.lock().estimates.clone()
    }

    pub fn receipt_polls(&self) -> u32 {
        self.state.lock().receipt_polls
    }

    fn user_op_hash(&self, op: &RpcUserOperationV0_6, entry_point: Address) -> B256 {
        UnsignedUserOperation {
            sender: op.sender,
            nonce: op.nonce,
            init_code: op.init_code.clone(),
            call_data: op.call_data.clone(),
            call_gas_limit: op.call_gas_limit,
            verification_gas_limit: op.verification_gas_limit,
            pre_verification_gas: op.pre_verification_gas,
            max_fee_per_gas: op.max_fee_per_gas,
            max_priority_fee_per_gas: op.max_priority_fee_per_gas,
            paymaster_and_data: op.paymaster_and_data.clone(),
        }
        .hash(entry_point, self.chain_id)
    }
}

fn rejected(message: &str) -> RelayError {
    RelayError::Rejected {
        code: -32500,
        message: message.to_string(),
        data: None,
    }
}

impl BundlerTransport for MockBundler {
    async fn estimate_user_operation_gas(
        &self,
        op: &RpcUserOperationV0_6,
        _entry_point: Address,
    ) -> Result<RpcGasEstimate, RelayError> {
        let mut state = self.state.lock();
        state.estimates.push(op.clone());
        match &state.reject_estimate {
            Some(message) => Err(rejected(message)),
            None => Ok(state.estimate),
        }
    }

    async fn send_user_operation(
        &self,
        op: &RpcUserOperationV0_6,
        entry_point: Address,
    ) -> Result<B256, RelayError> {
        let mut state = self.state.lock();
        state.submissions.push(op.clone());
        if state.transient_submit_failures > 0 {
            state.transient_submit_failures -= 1;
            return Err(RelayError::from(TransportErrorKind::custom_str(
                "connection reset by peer",
            )));
        }
        if let Some(message) = &state.reject_submit {
            return Err(rejected(message));
        }

        let hash = self.user_op_hash(op, entry_point);
        if state.accepted.contains(&hash) {
            return Err(rejected("user operation already in mempool"));
        }
        state.accepted.push(hash);
        if state.lost_responses > 0 {
            state.lost_responses -= 1;
            return Err(RelayError::from(TransportErrorKind::custom_str(
                "operation timed out",
            )));
        }
        Ok(hash)
    }

    async fn get_user_operation_receipt(
        &self,
        user_op_hash: B256,
    ) -> Result<Option<UserOperationReceipt>, RelayError> {
        let mut state = self.state.lock();
        state.receipt_polls += 1;
        let Some(op) = state.submissions.last().cloned() else {
            return Ok(None);
        };

        let (success, reason) = match &state.receipt {
            ReceiptBehavior::Never => return Ok(None),
            ReceiptBehavior::Included { pending_polls } => {
                if state.receipt_polls <= *pending_polls {
                    return Ok(None);
                }
                (true, None)
            }
            ReceiptBehavior::Reverted(reason) => (false, Some(reason.clone())),
        };

        Ok(Some(UserOperationReceipt {
            user_op_hash,
            sender: op.sender,
            nonce: op.nonce,
            success,
            reason,
            actual_gas_cost: U256::from(1_000_000u64),
            actual_gas_used: U256::from(100_000u64),
            receipt: InclusionReceipt {
                transaction_hash: keccak256(user_op_hash),
                block_number: U256::from(1u64),
            },
        }))
    }

    async fn supported_entry_points(&self) -> Result<Vec<Address>, RelayError> {
        Ok(vec![ENTRY_POINT_V06])
    }
}
