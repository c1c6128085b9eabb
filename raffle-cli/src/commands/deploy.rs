use super::{drain_events, eth, link};
use crate::config::CliConfig;
use comfy_table::{presets::UTF8_FULL, Table};
use dialoguer::Confirm;
use raffle_core::{ConfigOverrides, Network, NetworkConfig, RaffleManager, Result};
use std::path::PathBuf;

pub struct DeployArgs {
    pub network: Option<String>,
    pub config_file: Option<PathBuf>,
    pub entrance_fee: Option<String>,
    pub interval: Option<u64>,
    pub callback_gas_limit: Option<u32>,
}

pub async fn deploy(
    manager: &RaffleManager,
    config: &CliConfig,
    name: &str,
    args: DeployArgs,
) -> Result<()> {
    let network = match args.network.as_deref() {
        Some(network) => network.parse::<Network>()?,
        None => config.default_network,
    };

    let file_overrides = match &args.config_file {
        Some(path) => ConfigOverrides::from_file(path)?,
        None => ConfigOverrides::default(),
    };
    let overrides = file_overrides.merge(ConfigOverrides {
        entrance_fee: args.entrance_fee,
        interval_secs: args.interval,
        callback_gas_limit: args.callback_gas_limit,
        ..Default::default()
    });

    println!("Deploying raffle '{}' on {}...", name, network);
    let raffle = manager.deploy(name, network, overrides).await?;
    let round_config = raffle.coordinator.config();

    println!("Raffle deployed successfully!");
    println!();
    println!("Raffle Details:");
    println!("  Name: {}", raffle.name);
    println!("  ID: {}", raffle.id());
    println!("  Network: {} (chain {})", raffle.network, raffle.network.chain_id());
    println!("  Entrance fee: {}", eth(round_config.entrance_fee));
    println!("  Interval: {}s", round_config.interval.as_secs());
    println!("  Gas lane: {}", round_config.gas_lane);
    println!("  Callback gas limit: {}", round_config.callback_gas_limit);
    println!(
        "  Block confirmations: {}",
        NetworkConfig::for_network(raffle.network).block_confirmations
    );
    println!("  VRF coordinator (mock): {}", round_config.provider);
    println!(
        "  Subscription: {} (balance {})",
        round_config.subscription_id,
        link(raffle.subscription_balance())
    );

    Ok(())
}

pub async fn list(manager: &RaffleManager) -> Result<()> {
    let raffles = manager.list().await?;

    if raffles.is_empty() {
        println!("No raffles found.");
        println!("Deploy a new raffle with: raffle deploy <name>");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Name", "Network", "State", "Entrants", "Pool", "Rounds"]);

    for raffle in raffles {
        let snapshot = &raffle.snapshot;
        table.add_row(vec![
            raffle.name.clone(),
            raffle.network.to_string(),
            snapshot.state.to_string(),
            snapshot.entrants.len().to_string(),
            eth(snapshot.prize_pool),
            snapshot.round.to_string(),
        ]);
    }

    println!("{}", table);
    Ok(())
}

pub async fn close(manager: &RaffleManager, name: &str) -> Result<()> {
    let mut raffle = manager.load(name).await?;
    let mut rx = raffle.coordinator.subscribe();

    raffle.coordinator.close()?;

    manager.record_events(&raffle, &drain_events(&mut rx)).await?;
    manager.save(&raffle).await?;

    println!("Raffle '{}' closed after {} rounds.", name, raffle.coordinator.round());
    Ok(())
}

pub async fn delete(manager: &RaffleManager, name: &str, force: bool) -> Result<()> {
    if !force {
        let confirm = Confirm::new()
            .with_prompt(format!(
                "Are you sure you want to delete raffle '{}' and its history? This action cannot be undone.",
                name
            ))
            .default(false)
            .interact()?;

        if !confirm {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    manager.delete(name).await?;
    println!("Raffle '{}' deleted successfully.", name);
    Ok(())
}
