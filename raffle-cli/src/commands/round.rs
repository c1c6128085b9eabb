use super::{drain_events, eth, link, ETH_DECIMALS};
use raffle_core::{AccountId, Amount, RaffleManager, RandomValue, Result};

pub async fn enter(manager: &RaffleManager, name: &str, account: &str, amount: &str) -> Result<()> {
    let account: AccountId = account.parse()?;
    let amount = Amount::parse_units(amount, ETH_DECIMALS)?;

    let mut raffle = manager.load(name).await?;
    let mut rx = raffle.coordinator.subscribe();

    raffle.coordinator.enter(account.clone(), amount)?;

    manager.record_events(&raffle, &drain_events(&mut rx)).await?;
    manager.save(&raffle).await?;

    println!("{} entered raffle '{}' with {}", account, name, eth(amount));
    println!(
        "Entrants: {}, Prize pool: {}",
        raffle.coordinator.entrant_count(),
        eth(raffle.coordinator.prize_pool())
    );
    Ok(())
}

pub async fn check(manager: &RaffleManager, name: &str) -> Result<()> {
    let raffle = manager.load(name).await?;
    let readiness = raffle.coordinator.draw_readiness();

    println!("Upkeep check for raffle '{}':", name);
    println!("  State: {}", readiness.state);
    println!("  Interval elapsed: {}", readiness.interval_elapsed);
    println!("  Entrants: {}", readiness.entrant_count);
    println!("  Prize pool: {}", eth(readiness.prize_pool));
    println!();

    match readiness.reason() {
        None => println!("Upkeep needed: yes. Run 'raffle draw {}'", name),
        Some(reason) => println!("Upkeep needed: no ({})", reason),
    }
    Ok(())
}

pub async fn draw(manager: &RaffleManager, name: &str) -> Result<()> {
    let mut raffle = manager.load(name).await?;
    let mut rx = raffle.coordinator.subscribe();

    let request_id = raffle.coordinator.request_draw().await?;

    manager.record_events(&raffle, &drain_events(&mut rx)).await?;
    manager.save(&raffle).await?;

    println!("Requested randomness for raffle '{}'", name);
    println!("  Request ID: {}", request_id);
    println!("  Subscription balance: {}", link(raffle.subscription_balance()));
    println!();
    println!("Deliver the random word with: raffle fulfill {}", name);
    Ok(())
}

pub async fn fulfill(manager: &RaffleManager, name: &str, random: Option<&str>) -> Result<()> {
    let value = random.map(str::parse::<RandomValue>).transpose()?;

    let mut raffle = manager.load(name).await?;
    let mut rx = raffle.coordinator.subscribe();

    let result = raffle.fulfill(value).await?;

    manager.record_round(&raffle, &result).await?;
    manager.record_events(&raffle, &drain_events(&mut rx)).await?;
    manager.save(&raffle).await?;

    tracing::debug!("Random word {} for request {}", result.random_value, result.request_id);

    println!("Round {} of raffle '{}' settled!", result.round, name);
    println!("  Winner: {} (entrant #{})", result.winner, result.winner_index);
    println!("  Prize: {}", eth(result.prize));
    println!("  Entrants this round: {}", result.entrant_count);
    Ok(())
}

pub async fn fund(manager: &RaffleManager, name: &str, amount: &str) -> Result<()> {
    let amount = Amount::parse_units(amount, ETH_DECIMALS)?;

    let raffle = manager.load(name).await?;
    let balance = raffle.fund_subscription(amount)?;
    manager.save(&raffle).await?;

    println!(
        "Funded subscription {} with {}",
        raffle.coordinator.config().subscription_id,
        link(amount)
    );
    println!("  Balance: {}", link(balance));
    Ok(())
}
