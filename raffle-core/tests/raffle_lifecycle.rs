use raffle_core::provider::mock::DEV_SUBSCRIPTION_FUNDING;
use raffle_core::{
    AccountId, Amount, Ledger, MockVrfCoordinator, RaffleCoordinator, RaffleError, RaffleState,
    RandomValue, RandomnessProvider, RoundConfig,
};
use std::sync::Arc;
use std::time::Duration;

fn account(n: u64) -> AccountId {
    format!("0x{:040x}", n).parse().unwrap()
}

fn deploy(fee: u128) -> (RaffleCoordinator, Arc<MockVrfCoordinator>, Arc<Ledger>) {
    let mock = Arc::new(MockVrfCoordinator::development());
    let sub = mock.create_subscription();
    mock.fund_subscription(sub, DEV_SUBSCRIPTION_FUNDING).unwrap();

    let ledger = Arc::new(Ledger::new());
    let config = RoundConfig::new(
        Amount::from_base_units(fee),
        Duration::ZERO,
        mock.address().clone(),
        sub,
    );
    let raffle = RaffleCoordinator::new(config, mock.clone(), ledger.clone()).unwrap();
    (raffle, mock, ledger)
}

#[tokio::test]
async fn test_three_entrants_second_one_wins_with_seven() {
    let (mut raffle, mock, ledger) = deploy(1);
    let one = Amount::from_base_units(1);

    for n in 1..=3 {
        raffle.enter(account(n), one).unwrap();
    }
    assert_eq!(raffle.prize_pool(), Amount::from_base_units(3));
    assert_eq!(raffle.entrant_count(), 3);

    let request_id = raffle.request_draw().await.unwrap();
    assert_eq!(raffle.state(), RaffleState::Drawing);

    let err = raffle.enter(account(4), one).unwrap_err();
    assert!(matches!(err, RaffleError::RaffleNotOpen));

    let result = mock
        .fulfill_random_words_with(request_id, RandomValue::from_u64(7), &mut raffle)
        .await
        .unwrap();

    assert_eq!(result.winner_index, 1);
    assert_eq!(result.winner, account(2));
    assert_eq!(ledger.balance_of(&account(2)), Amount::from_base_units(3));
    assert_eq!(raffle.state(), RaffleState::Open);
    assert_eq!(raffle.entrant_count(), 0);
    assert_eq!(raffle.prize_pool(), Amount::ZERO);
}

#[tokio::test]
async fn test_replayed_callback_is_rejected() {
    let (mut raffle, mock, _ledger) = deploy(1);
    raffle.enter(account(1), Amount::from_base_units(1)).unwrap();

    let request_id = raffle.request_draw().await.unwrap();
    mock.fulfill_random_words(request_id, &mut raffle)
        .await
        .unwrap();

    let before = raffle.snapshot();
    let provider = mock.address().clone();
    let err = raffle
        .on_randomness_received(&provider, request_id, RandomValue::from_u64(0))
        .await
        .unwrap_err();
    assert!(matches!(err, RaffleError::UnknownRequest(id) if id == request_id));
    assert_eq!(raffle.snapshot(), before);

    let err = mock
        .fulfill_random_words(request_id, &mut raffle)
        .await
        .unwrap_err();
    assert!(matches!(err, RaffleError::UnknownRequest(_)));
}

#[tokio::test]
async fn test_rounds_cycle_and_draw_from_request_time_snapshot() {
    let (mut raffle, mock, ledger) = deploy(10);
    let fee = Amount::from_base_units(10);

    for round in 1..=3u64 {
        for n in 0..round + 1 {
            raffle.enter(account(100 * round + n), fee).unwrap();
        }
        let entrants = raffle.entrant_count() as u64;

        let request_id = raffle.request_draw().await.unwrap();
        assert_eq!(raffle.pending_request().unwrap().entrant_count, entrants);

        let result = mock
            .fulfill_random_words_with(request_id, RandomValue::from_u64(41), &mut raffle)
            .await
            .unwrap();
        assert_eq!(result.round, round);
        assert_eq!(result.winner_index, 41 % entrants);
        assert_eq!(result.winner, account(100 * round + 41 % entrants));
        assert_eq!(ledger.balance_of(&result.winner), fee.checked_mul(entrants as u128).unwrap());
    }

    assert_eq!(raffle.round(), 3);
    assert!(raffle.recent_winner().is_some());
}

#[tokio::test]
async fn test_subscription_runs_dry() {
    let mock = Arc::new(MockVrfCoordinator::development());
    let sub = mock.create_subscription();
    // exactly one request's worth: 0.25 LINK + 1e9 * 500_000
    mock.fund_subscription(sub, Amount::from_base_units(250_500_000_000_000_000))
        .unwrap();

    let config = RoundConfig::new(
        Amount::from_base_units(1),
        Duration::ZERO,
        mock.address().clone(),
        sub,
    );
    let mut raffle = RaffleCoordinator::new(config, mock.clone(), Arc::new(Ledger::new())).unwrap();

    raffle.enter(account(1), Amount::from_base_units(1)).unwrap();
    let request_id = raffle.request_draw().await.unwrap();
    mock.fulfill_random_words(request_id, &mut raffle)
        .await
        .unwrap();
    assert_eq!(mock.subscription_balance(sub), Some(Amount::ZERO));

    raffle.enter(account(2), Amount::from_base_units(1)).unwrap();
    let err = raffle.request_draw().await.unwrap_err();
    assert!(matches!(err, RaffleError::InsufficientFunding { .. }));
    assert_eq!(raffle.state(), RaffleState::Open);
    assert_eq!(raffle.entrant_count(), 1);
}
