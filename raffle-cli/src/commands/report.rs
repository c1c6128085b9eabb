use super::{eth, link};
use comfy_table::{presets::UTF8_FULL, Table};
use raffle_core::{RaffleEvent, RaffleManager, Result};

pub async fn status(manager: &RaffleManager, name: &str) -> Result<()> {
    let raffle = manager.load(name).await?;
    let coordinator = &raffle.coordinator;

    println!("Raffle '{}':", raffle.name);
    println!("  ID: {}", raffle.id());
    println!("  Network: {}", raffle.network);
    println!("  State: {}", coordinator.state());
    println!("  Round: {}", coordinator.round() + 1);
    println!("  Entrance fee: {}", eth(coordinator.entrance_fee()));
    println!("  Interval: {}s", coordinator.interval().as_secs());
    println!(
        "  Round started: {}",
        coordinator.last_round_start().format("%Y-%m-%d %H:%M:%S")
    );
    println!("  Prize pool: {}", eth(coordinator.prize_pool()));
    println!(
        "  Recent winner: {}",
        coordinator
            .recent_winner()
            .map(|w| w.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!("  Subscription balance: {}", link(raffle.subscription_balance()));

    if let Some(pending) = coordinator.pending_request() {
        println!();
        println!("Pending draw:");
        println!("  Request ID: {}", pending.request_id);
        println!(
            "  Requested at: {}",
            pending.requested_at.format("%Y-%m-%d %H:%M:%S")
        );
        println!("  Entrants: {}", pending.entrant_count);
    }

    if coordinator.entrant_count() > 0 {
        println!();
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["#", "Account", "Amount"]);

        for (index, entrant) in coordinator.entrants().iter().enumerate() {
            table.add_row(vec![
                index.to_string(),
                entrant.account.to_string(),
                eth(entrant.amount),
            ]);
        }
        println!("{}", table);
    }

    Ok(())
}

pub async fn history(manager: &RaffleManager, name: &str) -> Result<()> {
    let rounds = manager.history(name).await?;

    if rounds.is_empty() {
        println!("No settled rounds for raffle '{}'.", name);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Round", "Request", "Winner", "Index", "Entrants", "Prize", "Settled"]);

    for round in &rounds {
        table.add_row(vec![
            round.round.to_string(),
            round.request_id.to_string(),
            round.winner.to_string(),
            round.winner_index.to_string(),
            round.entrant_count.to_string(),
            eth(round.prize),
            round.settled_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    println!("{}", table);

    let winnings = manager.winnings(name).await?;
    println!();
    println!("Total winnings:");
    for (account, total) in winnings {
        println!("  {}: {}", account, eth(total));
    }

    Ok(())
}

pub async fn events(manager: &RaffleManager, name: &str) -> Result<()> {
    let events = manager.events(name).await?;

    if events.is_empty() {
        println!("No events recorded for raffle '{}'.", name);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Seq", "Event", "Details", "Time"]);

    for stored in events {
        let details = match &stored.event {
            RaffleEvent::Entered { account, amount } => format!("{} paid {}", account, eth(*amount)),
            RaffleEvent::WinnerRequested { request_id } => format!("request {}", request_id),
            RaffleEvent::WinnerPicked {
                round,
                winner,
                prize,
            } => format!("round {}: {} won {}", round, winner, eth(*prize)),
            RaffleEvent::Closed => String::new(),
        };

        table.add_row(vec![
            stored.seq.to_string(),
            stored.event.kind().to_string(),
            details,
            stored.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    println!("{}", table);
    Ok(())
}
