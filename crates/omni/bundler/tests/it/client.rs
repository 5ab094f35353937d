use std::time::Duration;

use alloy_primitives::{bytes, Address, Bytes, U256};
use test_case::test_case;
use versa_omni_bundler::{
    BundlerClient, BundlerConfig, BundlerError, RpcGasEstimate, RpcUserOperationV0_6,
    UserOperationBuilder,
};
use versa_omni_primitives::{GasLimits, UnsignedUserOperation, ENTRY_POINT_V06};
use versa_omni_test_utils::{
    resolver, signer, wallet_spec, MockBundler, MockChain, ReceiptBehavior, MUMBAI_CHAIN_ID,
    VALIDATOR,
};

fn fast_config() -> BundlerConfig {
    BundlerConfig::builder()
        .submit_backoff(Duration::from_millis(1))
        .poll_interval(Duration::from_millis(5))
        .receipt_timeout(Duration::from_millis(50))
        .build()
}

fn setup(bundler: MockBundler) -> (UserOperationBuilder<MockChain>, BundlerClient<MockBundler>) {
    let builder = UserOperationBuilder::new(MockChain::new(MUMBAI_CHAIN_ID), VALIDATOR);
    let client = BundlerClient::new(bundler, MUMBAI_CHAIN_ID, fast_config());
    (builder, client)
}

async fn unsigned(builder: &UserOperationBuilder<MockChain>) -> UnsignedUserOperation {
    let wallet = resolver().resolve(&wallet_spec()).unwrap();
    builder
        .prepare(wallet.address, bytes!("c0ffee"), Some(wallet.init_code))
        .await
        .unwrap()
}

#[test]
fn config_defaults() {
    let config = BundlerConfig::default();
    assert_eq!(config.entry_point, ENTRY_POINT_V06);
    assert_eq!(config.max_submit_attempts, 3);
    assert_eq!(config.pre_verification_gas_padding_percent, 0);
}

#[tokio::test]
async fn estimation_uses_placeholder_and_applies_limits() {
    let (builder, client) = setup(MockBundler::new(MUMBAI_CHAIN_ID));
    let op = unsigned(&builder).await;

    let limits = client
        .estimate(&op, builder.placeholder_signature(2))
        .await
        .unwrap();
    assert_eq!(
        limits,
        GasLimits {
            call_gas_limit: U256::from(120_000),
            verification_gas_limit: U256::from(350_000),
            pre_verification_gas: U256::from(48_000),
        }
    );

    let requests = client.transport().estimates();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].signature, builder.placeholder_signature(2));
    assert!(client.transport().submissions().is_empty());
}

#[test_case(0, 50_000 ; "no padding")]
#[test_case(10, 55_000 ; "ten percent")]
#[test_case(25, 62_500 ; "quarter")]
#[tokio::test]
async fn pre_verification_gas_padding(percent: u64, expected: u64) {
    let bundler = MockBundler::new(MUMBAI_CHAIN_ID).with_estimate(RpcGasEstimate {
        pre_verification_gas: U256::from(50_000),
        verification_gas_limit: U256::from(1),
        call_gas_limit: U256::from(1),
    });
    let builder = UserOperationBuilder::new(MockChain::new(MUMBAI_CHAIN_ID), VALIDATOR);
    let config = BundlerConfig::builder()
        .pre_verification_gas_padding_percent(percent)
        .build();
    let client = BundlerClient::new(bundler, MUMBAI_CHAIN_ID, config);

    let op = unsigned(&builder).await;
    let limits = client.estimate(&op, Bytes::new()).await.unwrap();
    assert_eq!(limits.pre_verification_gas, U256::from(expected));
}

#[tokio::test]
async fn estimation_failure_stops_before_submission() {
    let (builder, client) =
        setup(MockBundler::new(MUMBAI_CHAIN_ID).reject_estimates("AA21 didn't pay prefund"));
    let op = unsigned(&builder).await;
    let sender = op.sender;

    let err = client
        .estimate_and_submit(&builder, op, &[signer(0)])
        .await
        .unwrap_err();
    assert!(matches!(err, BundlerError::EstimationFailure { .. }));
    assert_eq!(err.context().wallet, sender);
    assert_eq!(client.transport().estimates().len(), 1);
    assert!(client.transport().submissions().is_empty());
}

#[tokio::test]
async fn end_to_end_submission_uses_estimated_limits() {
    let (builder, client) = setup(
        MockBundler::new(MUMBAI_CHAIN_ID).with_receipt(ReceiptBehavior::Included { pending_polls: 2 }),
    );
    let op = unsigned(&builder).await;

    let receipt = client
        .estimate_and_submit(&builder, op.clone(), &[signer(0)])
        .await
        .unwrap();
    assert!(receipt.success);
    assert_eq!(receipt.sender, op.sender);
    assert_eq!(client.transport().receipt_polls(), 3);

    let submissions = client.transport().submissions();
    assert_eq!(submissions.len(), 1);
    let sent = &submissions[0];
    assert_eq!(sent.call_gas_limit, U256::from(120_000));
    assert_eq!(sent.init_code, op.init_code);
    assert_eq!(sent.signature.len(), 21 + 65);
}

#[tokio::test]
async fn transient_submission_failures_resend_the_same_operation() {
    let (builder, client) = setup(MockBundler::new(MUMBAI_CHAIN_ID).drop_submissions(2));
    let signed = builder
        .build(&[signer(0)], Address::repeat_byte(0xab), Bytes::new(), None)
        .await
        .unwrap();

    let hash = client.submit(&signed).await.unwrap();
    assert_eq!(hash, signed.hash(ENTRY_POINT_V06, MUMBAI_CHAIN_ID));

    let submissions = client.transport().submissions();
    assert_eq!(submissions.len(), 3);
    let expected = RpcUserOperationV0_6::from(&signed);
    assert!(submissions.iter().all(|sent| *sent == expected));
}

#[tokio::test]
async fn duplicate_after_lost_response_polls_the_original() {
    let (builder, client) = setup(MockBundler::new(MUMBAI_CHAIN_ID).lose_responses(1));
    let signed = builder
        .build(&[signer(0)], Address::repeat_byte(0xab), Bytes::new(), None)
        .await
        .unwrap();
    let local_hash = signed.hash(ENTRY_POINT_V06, MUMBAI_CHAIN_ID);

    let hash = client.submit(&signed).await.unwrap();
    assert_eq!(hash, local_hash);
    assert_eq!(client.transport().submissions().len(), 2);

    let receipt = client.wait_for_receipt(signed.sender(), hash).await.unwrap();
    assert!(receipt.success);
    assert_eq!(receipt.user_op_hash, local_hash);
}

#[tokio::test]
async fn exhausted_submission_retries_fail() {
    let (builder, client) = setup(MockBundler::new(MUMBAI_CHAIN_ID).drop_submissions(10));
    let signed = builder
        .build(&[signer(0)], Address::repeat_byte(0xab), Bytes::new(), None)
        .await
        .unwrap();

    let err = client.submit(&signed).await.unwrap_err();
    assert!(matches!(err, BundlerError::SubmissionFailure { .. }));
    assert_eq!(client.transport().submissions().len(), 3);
}

#[tokio::test]
async fn rejection_is_not_retried() {
    let (builder, client) =
        setup(MockBundler::new(MUMBAI_CHAIN_ID).reject_submissions("AA25 invalid account nonce"));
    let signed = builder
        .build(&[signer(0)], Address::repeat_byte(0xab), Bytes::new(), None)
        .await
        .unwrap();

    let err = client.submit(&signed).await.unwrap_err();
    let BundlerError::SubmissionFailure { ctx, source } = err else {
        panic!("unexpected error");
    };
    assert!(source.to_string().contains("AA25"));
    assert_eq!(ctx.user_op_hash, Some(signed.hash(ENTRY_POINT_V06, MUMBAI_CHAIN_ID)));
    assert_eq!(client.transport().submissions().len(), 1);
}

#[tokio::test]
async fn pending_operation_times_out_without_resubmitting() {
    let (builder, client) = setup(MockBundler::new(MUMBAI_CHAIN_ID).always_pending());
    let op = unsigned(&builder).await;

    let err = client
        .estimate_and_submit(&builder, op, &[signer(0)])
        .await
        .unwrap_err();
    let BundlerError::ReceiptTimeout { waited, .. } = err else {
        panic!("expected a receipt timeout, got {err:?}");
    };
    assert!(waited >= Duration::from_millis(50));
    assert_eq!(client.transport().submissions().len(), 1);
    assert!(client.transport().receipt_polls() > 1);
}

#[tokio::test]
async fn reverted_execution_carries_the_receipt() {
    let (builder, client) = setup(
        MockBundler::new(MUMBAI_CHAIN_ID)
            .with_receipt(ReceiptBehavior::Reverted("insufficient fee".to_string())),
    );
    let op = unsigned(&builder).await;

    let err = client
        .estimate_and_submit(&builder, op, &[signer(0)])
        .await
        .unwrap_err();
    match err {
        BundlerError::ExecutionReverted {
            reason, receipt, ..
        } => {
            assert_eq!(reason, "insufficient fee");
            assert!(!receipt.success);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn builder_and_bundler_must_share_the_entry_point() {
    let builder = UserOperationBuilder::new(MockChain::new(MUMBAI_CHAIN_ID), VALIDATOR)
        .with_entry_point(Address::repeat_byte(0xee));
    let client = BundlerClient::new(MockBundler::new(MUMBAI_CHAIN_ID), MUMBAI_CHAIN_ID, fast_config());
    let op = unsigned(&builder).await;
    let sender = op.sender;

    let err = client
        .estimate_and_submit(&builder, op, &[signer(0)])
        .await
        .unwrap_err();
    let BundlerError::EntryPointMismatch {
        ctx,
        signed_for,
        relayed_to,
    } = err
    else {
        panic!("expected an entry point mismatch, got {err:?}");
    };
    assert_eq!(ctx.wallet, sender);
    assert_eq!(signed_for, Address::repeat_byte(0xee));
    assert_eq!(relayed_to, ENTRY_POINT_V06);
    assert!(client.transport().estimates().is_empty());
}
