pub mod deploy;
pub mod report;
pub mod round;

pub use deploy::{close, delete, deploy, list, DeployArgs};
pub use report::{events, history, status};
pub use round::{check, draw, enter, fulfill, fund};

use raffle_core::{Amount, RaffleEvent};
use tokio::sync::broadcast;

pub(crate) const ETH_DECIMALS: u32 = 18;

pub(crate) fn eth(amount: Amount) -> String {
    format!("{} ETH", amount.format_units(ETH_DECIMALS))
}

pub(crate) fn link(amount: Amount) -> String {
    format!("{} LINK", amount.format_units(ETH_DECIMALS))
}

/// Collect whatever the coordinator emitted since `rx` subscribed.
pub(crate) fn drain_events(rx: &mut broadcast::Receiver<RaffleEvent>) -> Vec<RaffleEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
