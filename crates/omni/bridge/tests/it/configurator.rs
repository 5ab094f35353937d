use std::{sync::Arc, time::Duration};

use alloy_primitives::{address, Address, U256};
use alloy_sol_types::SolCall;
use test_case::test_case;
use versa_omni_bridge::{
    BridgeError, CrossChainConfigurator, EndpointPair, TrustOutcome, TrustedRemoteLink,
    DEFAULT_SAFETY_MARGIN_WEI,
};
use versa_omni_primitives::{
    bindings::{IVersaOmniFactory, IVersaOmniWallet},
    ChainRegistry,
};
use versa_omni_test_utils::{
    wallet_spec, ManualClock, MockChain, FACTORY, MUMBAI_CHAIN_ID, REMOTE_FACTORY,
    SCROLL_SEPOLIA_CHAIN_ID,
};

const MUMBAI_CODE: u16 = 10109;
const SCROLL_SEPOLIA_CODE: u16 = 10214;

fn link() -> TrustedRemoteLink {
    let registry = ChainRegistry::builtin();
    TrustedRemoteLink::new(
        registry.get(MUMBAI_CHAIN_ID).unwrap(),
        FACTORY,
        registry.get(SCROLL_SEPOLIA_CHAIN_ID).unwrap(),
        REMOTE_FACTORY,
    )
}

fn configurator(chain: &MockChain) -> (CrossChainConfigurator<MockChain>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let configurator = CrossChainConfigurator::new(chain.clone(), FACTORY).with_clock(clock.clone());
    (configurator, clock)
}

#[tokio::test]
async fn trusted_remote_is_written_once() {
    let chain = MockChain::new(MUMBAI_CHAIN_ID);
    let (configurator, _) = configurator(&chain);

    let first = configurator.ensure_trusted_remote(&link()).await.unwrap();
    assert!(matches!(first, TrustOutcome::Configured { .. }));
    let second = configurator.ensure_trusted_remote(&link()).await.unwrap();
    assert_eq!(second, TrustOutcome::AlreadyTrusted);
    assert_eq!(chain.writes(), 1);
}

#[tokio::test]
async fn pre_existing_trust_sends_nothing() {
    let chain = MockChain::new(MUMBAI_CHAIN_ID);
    chain.trust(SCROLL_SEPOLIA_CODE, link().path());
    let (configurator, _) = configurator(&chain);

    let outcome = configurator.ensure_trusted_remote(&link()).await.unwrap();
    assert_eq!(outcome, TrustOutcome::AlreadyTrusted);
    assert_eq!(chain.writes(), 0);
}

#[tokio::test]
async fn already_trusted_revert_is_success() {
    let chain = MockChain::new(MUMBAI_CHAIN_ID);
    chain.revert_trust_writes("LzApp: already trusted");
    let (configurator, _) = configurator(&chain);

    let outcome = configurator.ensure_trusted_remote(&link()).await.unwrap();
    assert_eq!(outcome, TrustOutcome::AlreadyTrusted);
}

#[tokio::test]
async fn other_reverts_surface_with_chain() {
    let chain = MockChain::new(MUMBAI_CHAIN_ID);
    chain.revert_trust_writes("Ownable: caller is not the owner");
    let (configurator, _) = configurator(&chain);

    let err = configurator.ensure_trusted_remote(&link()).await.unwrap_err();
    match err {
        BridgeError::Contract {
            method,
            chain_id,
            source,
        } => {
            assert_eq!(method, "setTrustedRemote");
            assert_eq!(chain_id, MUMBAI_CHAIN_ID);
            assert_eq!(source.revert_reason(), Some("Ownable: caller is not the owner"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn link_for_another_chain_is_refused() {
    let chain = MockChain::new(SCROLL_SEPOLIA_CHAIN_ID);
    let (configurator, _) = configurator(&chain);

    let err = configurator.ensure_trusted_remote(&link()).await.unwrap_err();
    assert!(matches!(
        err,
        BridgeError::WrongChain {
            expected: MUMBAI_CHAIN_ID,
            connected: SCROLL_SEPOLIA_CHAIN_ID,
        }
    ));
    assert_eq!(chain.writes(), 0);
}

#[tokio::test]
async fn oracle_and_relayer_writes_are_unconditional() {
    let chain = MockChain::new(MUMBAI_CHAIN_ID);
    let (configurator, _) = configurator(&chain);
    let oracles = EndpointPair {
        send: address!("00000000000000000000000000000000000000a1"),
        receive: address!("00000000000000000000000000000000000000a2"),
    };
    let relayers = EndpointPair {
        send: address!("00000000000000000000000000000000000000b1"),
        receive: address!("00000000000000000000000000000000000000b2"),
    };

    configurator.set_oracle(SCROLL_SEPOLIA_CODE, oracles).await.unwrap();
    configurator.set_oracle(SCROLL_SEPOLIA_CODE, oracles).await.unwrap();
    configurator.set_relayer(SCROLL_SEPOLIA_CODE, relayers).await.unwrap();
    assert_eq!(chain.writes(), 3);

    assert_eq!(configurator.get_oracle(SCROLL_SEPOLIA_CODE).await.unwrap(), oracles);
    assert_eq!(configurator.get_relayer(SCROLL_SEPOLIA_CODE).await.unwrap(), relayers);
    assert_eq!(
        configurator.get_oracle(MUMBAI_CODE).await.unwrap().send,
        Address::ZERO
    );
}

#[tokio::test]
async fn fresh_quote_funds_fee_plus_margin() {
    let chain = MockChain::new(MUMBAI_CHAIN_ID);
    chain.set_native_fee(U256::from(1_000));
    let (configurator, _) = configurator(&chain);
    let wallet = Address::repeat_byte(0xab);
    let validators = wallet_spec().validator_config();

    let quote = configurator
        .estimate_remote_create_fee(
            wallet,
            SCROLL_SEPOLIA_CODE,
            &[MUMBAI_CHAIN_ID, SCROLL_SEPOLIA_CHAIN_ID],
            &[MUMBAI_CODE, SCROLL_SEPOLIA_CODE],
            &validators,
        )
        .await
        .unwrap();
    assert_eq!(quote.native_fee_wei, U256::from(1_000));
    assert_eq!(quote.dst_bridge_chain_code, SCROLL_SEPOLIA_CODE);

    let payloads = chain.payload_requests();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].wallet, wallet);
    assert_eq!(payloads[0].validators, validators.validators);

    let call_data = configurator.remote_create_call_data(&quote, &validators).unwrap();
    let execute = IVersaOmniWallet::sudoExecuteCall::abi_decode(&call_data).unwrap();
    assert_eq!(execute.to, FACTORY);
    assert_eq!(execute.value, U256::from(1_000) + DEFAULT_SAFETY_MARGIN_WEI);
    let create =
        IVersaOmniFactory::createAccountOnRemoteChainCall::abi_decode(&execute.data).unwrap();
    assert_eq!(create.dstChainId, SCROLL_SEPOLIA_CODE);
}

#[test_case(0, true ; "fresh")]
#[test_case(59, true ; "inside window")]
#[test_case(60, true ; "at window edge")]
#[test_case(61, false ; "past window")]
#[test_case(600, false ; "long expired")]
#[tokio::test]
async fn quote_expires_after_window(age_secs: u64, usable: bool) {
    let chain = MockChain::new(MUMBAI_CHAIN_ID);
    let (configurator, clock) = configurator(&chain);
    let validators = wallet_spec().validator_config();

    let quote = configurator
        .estimate_remote_create_fee(
            Address::repeat_byte(0xab),
            SCROLL_SEPOLIA_CODE,
            &[SCROLL_SEPOLIA_CHAIN_ID],
            &[SCROLL_SEPOLIA_CODE],
            &validators,
        )
        .await
        .unwrap();

    clock.advance(Duration::from_secs(age_secs));
    match configurator.remote_create_call_data(&quote, &validators) {
        Ok(_) => assert!(usable, "quote aged {age_secs}s was accepted"),
        Err(BridgeError::StaleFeeQuote { dst, age, window }) => {
            assert!(!usable, "quote aged {age_secs}s was refused");
            assert_eq!(dst, SCROLL_SEPOLIA_CODE);
            assert_eq!(age, Duration::from_secs(age_secs));
            assert_eq!(window, Duration::from_secs(60));
        }
        Err(other) => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn unsupported_destination_is_not_quoted() {
    let chain = MockChain::new(MUMBAI_CHAIN_ID);
    let (configurator, _) = configurator(&chain);

    let err = configurator
        .estimate_remote_create_fee(
            Address::repeat_byte(0xab),
            10161,
            &[MUMBAI_CHAIN_ID, SCROLL_SEPOLIA_CHAIN_ID],
            &[MUMBAI_CODE, SCROLL_SEPOLIA_CODE],
            &wallet_spec().validator_config(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::UnsupportedDestination(10161)));
    assert_eq!(chain.fee_quotes(), 0);
}

#[tokio::test]
async fn support_lists_must_pair_up() {
    let chain = MockChain::new(MUMBAI_CHAIN_ID);
    let (configurator, _) = configurator(&chain);

    let err = configurator
        .estimate_remote_create_fee(
            Address::repeat_byte(0xab),
            SCROLL_SEPOLIA_CODE,
            &[MUMBAI_CHAIN_ID],
            &[MUMBAI_CODE, SCROLL_SEPOLIA_CODE],
            &wallet_spec().validator_config(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BridgeError::MismatchedSupportLists {
            chain_ids: 1,
            codes: 2
        }
    ));
}
