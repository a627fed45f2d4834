mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use alloy::primitives::U256;
use stakepack_core::codec::{to_base_units, to_display};
use stakepack_core::{
    Account, CancelToken, DashboardAggregator, EvmConnector, NetworkGuard, NetworkId, PackInfo,
    ProviderPort, WalletConnector, WalletError, WalletSession, EVM_SEPOLIA,
};

use common::{evm_stack, fast_config, init_tracing, whole, SIMULATED_EVM_ACCOUNT};

async fn connect(adapter: &Arc<stakepack_adapters::Eip1193Adapter>) -> (WalletSession, Account) {
    let session = WalletSession::new(EVM_SEPOLIA);
    let account = EvmConnector::new(Arc::clone(adapter))
        .connect(&session)
        .await
        .expect("connect");
    (session, account)
}

#[tokio::test]
async fn stake_buy_mint_and_dashboard() {
    init_tracing();
    let stack = evm_stack(&fast_config());
    let (session, account) = connect(&stack.adapter).await;
    assert_eq!(account.address, SIMULATED_EVM_ACCOUNT);
    let cancel = CancelToken::new();

    let amount = to_base_units("1", EVM_SEPOLIA.base_unit_exponent).expect("amount");
    let receipt = stack
        .contract
        .stake(&session, amount, &cancel)
        .await
        .expect("stake");
    assert!(receipt.success);
    assert!(receipt.block_number.is_some());
    assert_eq!(
        stack.contract.credits_of(&account.address).await.expect("credits"),
        U256::from(1_000u64)
    );

    let pack = stack.contract.get_pack(0).await.expect("pack 0");
    assert!(pack.active);
    assert_eq!(to_display(pack.price_base_units, 18), "0.01");
    stack
        .contract
        .buy_pack(&session, &pack, 2, &cancel)
        .await
        .expect("buy");
    assert_eq!(
        stack
            .contract
            .user_pack_balance(&account.address, 0)
            .await
            .expect("balance"),
        U256::from(2u64)
    );

    let minted = stack
        .contract
        .mint_from_pack(&session, &pack, &cancel)
        .await
        .expect("mint");
    assert!(minted.success);

    let (snapshot, owned) = DashboardAggregator::new(stack.contract.clone())
        .load(&account)
        .await
        .expect("dashboard");
    assert_eq!(snapshot.credits, U256::from(990u64));
    assert_eq!(snapshot.total_supply, U256::from(1u64));
    assert_eq!(snapshot.total_staked_base_units, whole(1, 18));
    assert_eq!(snapshot.user_staked_base_units, whole(1, 18));
    let expected: BTreeMap<u64, U256> = [(0, U256::from(1u64)), (1, U256::ZERO)].into();
    assert_eq!(owned, expected);
}

#[tokio::test]
async fn reverted_write_yields_failed_receipt() {
    init_tracing();
    let stack = evm_stack(&fast_config());
    let (session, _) = connect(&stack.adapter).await;

    let receipt = stack
        .contract
        .withdraw_stake(&session, whole(5, 18), &CancelToken::new())
        .await
        .expect("terminal receipt");
    assert!(!receipt.success);
}

#[tokio::test]
async fn pending_receipt_is_awaited() {
    init_tracing();
    let stack = evm_stack(&fast_config());
    stack.sim.set_pending_polls(3).expect("knob");
    let (session, _) = connect(&stack.adapter).await;

    let receipt = stack
        .contract
        .stake(&session, whole(1, 16), &CancelToken::new())
        .await
        .expect("stake");
    assert!(receipt.success);
}

#[tokio::test]
async fn wrong_chain_is_switched_before_writing() {
    init_tracing();
    let stack = evm_stack(&fast_config());
    stack.adapter.debug_set_chain_id(1).expect("set chain");
    let (session, _) = connect(&stack.adapter).await;

    let guard = NetworkGuard::new(Arc::clone(&stack.adapter));
    assert!(!guard.is_expected_network(&EVM_SEPOLIA).await.expect("check"));

    stack
        .contract
        .stake(&session, whole(1, 17), &CancelToken::new())
        .await
        .expect("stake after switch");
    assert_eq!(
        stack.adapter.network_id().await.expect("network"),
        NetworkId::ChainId(11_155_111)
    );
}

#[tokio::test]
async fn inactive_pack_cannot_be_bought() {
    init_tracing();
    let stack = evm_stack(&fast_config());
    let (session, _) = connect(&stack.adapter).await;

    let pack = stack.contract.get_pack(2).await.expect("pack 2");
    assert!(!pack.active);
    let err = stack
        .contract
        .buy_pack(&session, &pack, 1, &CancelToken::new())
        .await
        .expect_err("must fail");
    assert!(matches!(err, WalletError::PackUnavailable { pack_id: 2, .. }));
}

#[tokio::test]
async fn dashboard_survives_a_failing_pack_probe() {
    init_tracing();
    let stack = evm_stack(&fast_config());
    let (_, account) = connect(&stack.adapter).await;
    stack
        .sim
        .set_pack(PackInfo {
            pack_id: 2,
            price_base_units: whole(1, 17),
            credit_cost: U256::from(100u64),
            active: true,
        })
        .expect("activate pack 2");
    stack
        .sim
        .fail_method("userPackBalance", "node hiccup")
        .expect("knob");

    let (snapshot, owned) = DashboardAggregator::new(stack.contract.clone())
        .load(&account)
        .await
        .expect("load succeeds");
    assert_eq!(snapshot.credits, U256::ZERO);
    assert!(owned.is_empty());
}

#[tokio::test]
async fn unknown_method_fails_before_reaching_the_wallet() {
    init_tracing();
    let stack = evm_stack(&fast_config());
    let handle = stack
        .contract
        .gateway()
        .build_read_handle(
            &EVM_SEPOLIA,
            stack.contract.address(),
            stakepack_core::bundled_abi().expect("abi"),
        )
        .expect("handle");

    let err = stack
        .contract
        .gateway()
        .invoke_read(&handle, "ownerOf", &[])
        .await
        .expect_err("must fail");
    assert!(matches!(err, WalletError::Validation(_)));
}
