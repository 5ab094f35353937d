use std::time::Duration;

use alloy_primitives::{bytes, Address, Bytes, U256};
use alloy_signer::Signature;
use versa_omni_bundler::{BuilderError, GasOverrides, UserOperationBuilder, DEFAULT_GAS_LIMITS};
use versa_omni_primitives::{user_op::ECDSA_SIGNATURE_LEN, GasFees, ENTRY_POINT_V06};
use versa_omni_provider::RetryPolicy;
use versa_omni_test_utils::{resolver, signer, wallet_spec, MockChain, MUMBAI_CHAIN_ID, VALIDATOR};

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        backoff: Duration::from_millis(1),
    }
}

#[tokio::test]
async fn undeployed_wallet_starts_at_nonce_zero_with_init_code() {
    let chain = MockChain::new(MUMBAI_CHAIN_ID);
    let builder = UserOperationBuilder::new(chain.clone(), VALIDATOR);
    let wallet = resolver().resolve(&wallet_spec()).unwrap();

    let op = builder
        .prepare(wallet.address, bytes!("01"), Some(wallet.init_code.clone()))
        .await
        .unwrap();

    assert_eq!(op.nonce, U256::ZERO);
    assert_eq!(op.init_code, wallet.init_code);
    assert_eq!(op.gas_limits(), DEFAULT_GAS_LIMITS);
    assert_eq!(chain.nonce_reads(), 0);
}

#[tokio::test]
async fn deployed_wallet_reads_entry_point_nonce_and_drops_init_code() {
    let chain = MockChain::new(MUMBAI_CHAIN_ID);
    let wallet = resolver().resolve(&wallet_spec()).unwrap();
    chain.deploy(wallet.address, U256::from(7));
    let builder = UserOperationBuilder::new(chain.clone(), VALIDATOR);

    let op = builder
        .prepare(wallet.address, Bytes::new(), Some(wallet.init_code))
        .await
        .unwrap();

    assert_eq!(op.nonce, U256::from(7));
    assert!(op.init_code.is_empty());
    assert_eq!(chain.nonce_reads(), 1);
}

#[tokio::test]
async fn overrides_take_precedence_over_network_fees() {
    let chain = MockChain::new(MUMBAI_CHAIN_ID);
    chain.set_gas_fees(GasFees {
        max_fee_per_gas: U256::from(100),
        max_priority_fee_per_gas: U256::from(2),
    });
    let builder = UserOperationBuilder::new(chain, VALIDATOR).with_gas_overrides(GasOverrides {
        max_priority_fee_per_gas: Some(U256::from(5)),
        call_gas_limit: Some(U256::from(42)),
        ..Default::default()
    });

    let op = builder
        .prepare(Address::repeat_byte(0xab), Bytes::new(), None)
        .await
        .unwrap();
    assert_eq!(op.max_fee_per_gas, U256::from(100));
    assert_eq!(op.max_priority_fee_per_gas, U256::from(5));
    assert_eq!(op.call_gas_limit, U256::from(42));
    assert_eq!(
        op.verification_gas_limit,
        DEFAULT_GAS_LIMITS.verification_gas_limit
    );
}

#[tokio::test]
async fn transient_reads_are_retried() {
    let chain = MockChain::new(MUMBAI_CHAIN_ID);
    chain.fail_reads(2);
    let builder = UserOperationBuilder::new(chain, VALIDATOR).with_read_retry(fast_retry());

    let nonce = builder.nonce(Address::repeat_byte(0xab)).await.unwrap();
    assert_eq!(nonce, U256::ZERO);
}

#[tokio::test]
async fn persistent_read_failure_is_unresolved_nonce() {
    let chain = MockChain::new(MUMBAI_CHAIN_ID);
    chain.fail_reads(10);
    let builder = UserOperationBuilder::new(chain, VALIDATOR).with_read_retry(fast_retry());
    let wallet = Address::repeat_byte(0xab);

    let err = builder.prepare(wallet, Bytes::new(), None).await.unwrap_err();
    match err {
        BuilderError::UnresolvedNonce { ctx, .. } => {
            assert_eq!(ctx.chain_id, MUMBAI_CHAIN_ID);
            assert_eq!(ctx.wallet, wallet);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn signatures_follow_signer_order_and_recover() {
    let chain = MockChain::new(MUMBAI_CHAIN_ID);
    let builder = UserOperationBuilder::new(chain, VALIDATOR);
    let signers = [signer(0), signer(1)];

    let unsigned = builder
        .prepare(Address::repeat_byte(0xab), bytes!("deadbeef"), None)
        .await
        .unwrap();
    let hash = unsigned.hash(ENTRY_POINT_V06, MUMBAI_CHAIN_ID);
    let op = builder.sign(unsigned.clone(), &signers).unwrap();

    let signature = op.signature();
    assert_eq!(signature.len(), 21 + 2 * ECDSA_SIGNATURE_LEN);
    assert_eq!(&signature[..20], VALIDATOR.as_slice());
    assert_eq!(signature[20], 0x00);

    for (i, expected) in signers.iter().enumerate() {
        let start = 21 + i * ECDSA_SIGNATURE_LEN;
        let sig = Signature::try_from(&signature[start..start + ECDSA_SIGNATURE_LEN]).unwrap();
        let recovered = sig.recover_address_from_msg(hash.as_slice()).unwrap();
        assert_eq!(recovered, expected.address());
    }

    // Signing leaves every other field untouched.
    assert_eq!(op.fields(), &unsigned);
    assert_eq!(op.hash(ENTRY_POINT_V06, MUMBAI_CHAIN_ID), hash);
}

#[tokio::test]
async fn resigning_a_copy_does_not_touch_the_original() {
    let chain = MockChain::new(MUMBAI_CHAIN_ID);
    let builder = UserOperationBuilder::new(chain, VALIDATOR);
    let op = builder
        .build(&[signer(0)], Address::repeat_byte(0xab), Bytes::new(), None)
        .await
        .unwrap();
    let before = op.clone();

    let resigned = builder.sign(op.to_unsigned(), &[signer(1)]).unwrap();
    assert_eq!(op, before);
    assert_eq!(resigned.fields(), op.fields());
    assert_ne!(resigned.signature(), op.signature());
}

#[test]
fn signing_without_signers_fails() {
    let builder = UserOperationBuilder::new(MockChain::new(MUMBAI_CHAIN_ID), VALIDATOR);
    let err = builder
        .sign(Default::default(), &[])
        .unwrap_err();
    assert!(matches!(err, BuilderError::SigningError { .. }));
    assert!(err.context().user_op_hash.is_some());
}
