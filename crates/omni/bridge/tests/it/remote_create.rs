use std::{
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
    time::Duration,
};

use alloy_primitives::U256;
use alloy_sol_types::SolCall;
use versa_omni_bridge::{
    AutoConfirm, Confirmation, CrossChainConfigurator, RemoteCreateError, RemoteCreateFlow,
    RemoteCreateRequest, RemoteCreateStage, DEFAULT_SAFETY_MARGIN_WEI,
};
use versa_omni_bundler::{BundlerClient, BundlerConfig, UserOperationBuilder};
use versa_omni_primitives::{bindings::IVersaOmniWallet, WalletInitSpec};
use versa_omni_test_utils::{
    resolver, signer, wallet_spec, ManualClock, MockBundler, MockChain, FACTORY, MUMBAI_CHAIN_ID,
    OWNER, REMOTE_FACTORY, REMOTE_VALIDATOR, SALT, SCROLL_SEPOLIA_CHAIN_ID, VALIDATOR,
};

const SCROLL_SEPOLIA_CODE: u16 = 10214;

/// An operator who takes `delay` to answer each of the first `slow_answers` prompts.
#[derive(Debug)]
struct SlowOperator {
    clock: Arc<ManualClock>,
    delay: Duration,
    slow_answers: u32,
    answer: bool,
    prompts: AtomicU32,
}

impl SlowOperator {
    fn new(clock: Arc<ManualClock>, delay: Duration, slow_answers: u32) -> Self {
        Self {
            clock,
            delay,
            slow_answers,
            answer: true,
            prompts: AtomicU32::new(0),
        }
    }

    fn declining(clock: Arc<ManualClock>) -> Self {
        Self {
            answer: false,
            ..Self::new(clock, Duration::ZERO, 0)
        }
    }
}

impl Confirmation for &SlowOperator {
    async fn confirm(&self, _prompt: &str) -> std::io::Result<bool> {
        let seen = self.prompts.fetch_add(1, Ordering::SeqCst);
        if seen < self.slow_answers {
            self.clock.advance(self.delay);
        }
        Ok(self.answer)
    }
}

struct Harness {
    chain: MockChain,
    clock: Arc<ManualClock>,
    configurator: CrossChainConfigurator<MockChain>,
    builder: UserOperationBuilder<MockChain>,
    bundler: BundlerClient<MockBundler>,
    request: RemoteCreateRequest,
}

fn harness() -> Harness {
    let chain = MockChain::new(MUMBAI_CHAIN_ID);
    let wallet = resolver().address(&wallet_spec()).unwrap();
    chain.deploy(wallet, U256::from(3));

    let clock = Arc::new(ManualClock::default());
    let configurator = CrossChainConfigurator::new(chain.clone(), FACTORY).with_clock(clock.clone());
    let builder = UserOperationBuilder::new(chain.clone(), VALIDATOR);
    let config = BundlerConfig::builder()
        .poll_interval(Duration::from_millis(5))
        .receipt_timeout(Duration::from_millis(100))
        .build();
    let bundler = BundlerClient::new(MockBundler::new(MUMBAI_CHAIN_ID), MUMBAI_CHAIN_ID, config);

    let remote_validators =
        WalletInitSpec::ecdsa(REMOTE_FACTORY, U256::from(SALT), REMOTE_VALIDATOR, OWNER)
            .validator_config();
    let request = RemoteCreateRequest {
        wallet,
        dst_bridge_chain_code: SCROLL_SEPOLIA_CODE,
        supported_chain_ids: vec![MUMBAI_CHAIN_ID, SCROLL_SEPOLIA_CHAIN_ID],
        supported_bridge_chain_codes: vec![10109, SCROLL_SEPOLIA_CODE],
        remote_validators,
    };

    Harness {
        chain,
        clock,
        configurator,
        builder,
        bundler,
        request,
    }
}

#[tokio::test]
async fn remote_creation_reaches_confirmed() {
    let h = harness();
    let mut flow = RemoteCreateFlow::new(&h.configurator, &h.builder, &h.bundler, AutoConfirm);

    let outcome = flow.run(&h.request, &[signer(0)]).await.unwrap();
    assert_eq!(outcome.requotes, 0);
    assert_eq!(outcome.funded_fee, outcome.quote.native_fee_wei + DEFAULT_SAFETY_MARGIN_WEI);
    assert!(outcome.receipt.success);
    assert_eq!(
        flow.history(),
        &[
            RemoteCreateStage::AddressResolved,
            RemoteCreateStage::FeeQuoted,
            RemoteCreateStage::UserOpBuilt,
            RemoteCreateStage::Submitted,
            RemoteCreateStage::Confirmed,
        ]
    );

    let submissions = h.bundler.transport().submissions();
    assert_eq!(submissions.len(), 1);
    let sent = &submissions[0];
    assert_eq!(sent.sender, h.request.wallet);
    assert_eq!(sent.nonce, U256::from(3));
    assert!(sent.init_code.is_empty());

    let execute = IVersaOmniWallet::sudoExecuteCall::abi_decode(&sent.call_data).unwrap();
    assert_eq!(execute.to, FACTORY);
    assert_eq!(execute.value, outcome.funded_fee);
}

#[tokio::test]
async fn slow_confirmation_forces_a_fresh_quote() {
    let h = harness();
    let operator = SlowOperator::new(h.clock.clone(), Duration::from_secs(61), 1);
    let mut flow = RemoteCreateFlow::new(&h.configurator, &h.builder, &h.bundler, &operator);

    let outcome = flow.run(&h.request, &[signer(0)]).await.unwrap();
    assert_eq!(outcome.requotes, 1);
    assert_eq!(h.chain.fee_quotes(), 2);
    assert_eq!(operator.prompts.load(Ordering::SeqCst), 2);
    assert_eq!(h.bundler.transport().submissions().len(), 1);
    assert_eq!(flow.stage(), Some(RemoteCreateStage::Confirmed));
}

#[tokio::test]
async fn persistently_stale_quotes_give_up_without_submitting() {
    let h = harness();
    let operator = SlowOperator::new(h.clock.clone(), Duration::from_secs(120), u32::MAX);
    let mut flow = RemoteCreateFlow::new(&h.configurator, &h.builder, &h.bundler, &operator)
        .with_max_requotes(1);

    let err = flow.run(&h.request, &[signer(0)]).await.unwrap_err();
    assert!(matches!(err, RemoteCreateError::RequoteLimit(2)));
    assert_eq!(h.chain.fee_quotes(), 2);
    assert!(h.bundler.transport().submissions().is_empty());
}

#[tokio::test]
async fn declined_confirmation_stops_after_quote() {
    let h = harness();
    let operator = SlowOperator::declining(h.clock.clone());
    let mut flow = RemoteCreateFlow::new(&h.configurator, &h.builder, &h.bundler, &operator);

    let err = flow.run(&h.request, &[signer(0)]).await.unwrap_err();
    assert!(matches!(err, RemoteCreateError::Declined));
    assert_eq!(flow.stage(), Some(RemoteCreateStage::FeeQuoted));
    assert!(h.bundler.transport().estimates().is_empty());
    assert!(h.bundler.transport().submissions().is_empty());
}

#[tokio::test]
async fn unsupported_destination_fails_before_prompting() {
    let mut h = harness();
    h.request.dst_bridge_chain_code = 10161;
    let operator = SlowOperator::new(h.clock.clone(), Duration::ZERO, 0);
    let mut flow = RemoteCreateFlow::new(&h.configurator, &h.builder, &h.bundler, &operator);

    let err = flow.run(&h.request, &[signer(0)]).await.unwrap_err();
    assert!(matches!(err, RemoteCreateError::Bridge(_)));
    assert_eq!(operator.prompts.load(Ordering::SeqCst), 0);
}
