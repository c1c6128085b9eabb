use raffle_core::{AccountId, ConfigOverrides, Network, RaffleManager};
use tempfile::tempdir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Create temp dir
    let temp_dir = tempdir()?;
    println!("Using temporary directory: {:?}", temp_dir.path());

    // Initialize raffle manager
    let manager = RaffleManager::new(temp_dir.path()).await?;

    println!("Deploying raffle...");
    let overrides = ConfigOverrides {
        interval_secs: Some(0),
        ..Default::default()
    };
    let mut raffle = manager
        .deploy("example-raffle", Network::Hardhat, overrides)
        .await?;

    println!("Raffle deployed!");
    println!("Raffle ID: {}", raffle.id());
    println!("VRF coordinator: {}", raffle.coordinator.config().provider);

    // Enter three players
    let fee = raffle.coordinator.entrance_fee();
    for _ in 0..3 {
        let player = AccountId::random();
        raffle.coordinator.enter(player.clone(), fee)?;
        println!("Entered: {}", player);
    }
    println!("Prize pool: {} ETH", raffle.coordinator.prize_pool().format_units(18));

    // Draw and settle
    let request_id = raffle.coordinator.request_draw().await?;
    println!("\nRequested randomness: {}", request_id);

    let result = raffle.fulfill(None).await?;
    manager.record_round(&raffle, &result).await?;
    manager.save(&raffle).await?;

    println!("\nWinner: {} (index {})", result.winner, result.winner_index);
    println!("Prize: {} ETH", result.prize.format_units(18));
    println!("Winner balance: {}", raffle.ledger.balance_of(&result.winner));

    let history = manager.history("example-raffle").await?;
    println!("\nSettled rounds: {}", history.len());

    println!("\nExample completed successfully!");

    Ok(())
}
