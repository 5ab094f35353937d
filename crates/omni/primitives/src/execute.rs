//! Call data for the wallet's execute entry points.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;

use crate::bindings::{IECDSAValidator, IVersaOmniWallet};

/// `operation` value of a plain call.
pub const CALL: u8 = 0;

/// `sudoExecute(to, value, data, CALL)`.
pub fn sudo_execute(to: Address, value: U256, data: Bytes) -> Bytes {
    IVersaOmniWallet::sudoExecuteCall {
        to,
        value,
        data,
        operation: CALL,
    }
    .abi_encode()
    .into()
}

/// `normalExecute(to, value, data, CALL)`.
pub fn normal_execute(to: Address, value: U256, data: Bytes) -> Bytes {
    IVersaOmniWallet::normalExecuteCall {
        to,
        value,
        data,
        operation: CALL,
    }
    .abi_encode()
    .into()
}

/// `batchSudoSyncExecute` of plain calls, replayed by the wallet on every chain it
/// is deployed to.
pub fn batch_sudo_sync_execute(calls: impl IntoIterator<Item = (Address, U256, Bytes)>) -> Bytes {
    let mut to = Vec::new();
    let mut value = Vec::new();
    let mut data = Vec::new();
    for (target, amount, payload) in calls {
        to.push(target);
        value.push(amount);
        data.push(payload);
    }
    let operation = vec![CALL; to.len()];
    IVersaOmniWallet::batchSudoSyncExecuteCall {
        to,
        value,
        data,
        operation,
    }
    .abi_encode()
    .into()
}

/// Wallet call data that rotates the ECDSA validator's signer on every chain.
pub fn sync_set_signer(validator: Address, signer: Address) -> Bytes {
    let set_signer: Bytes = IECDSAValidator::setSignerCall { signer }.abi_encode().into();
    batch_sudo_sync_execute([(validator, U256::ZERO, set_signer)])
}
