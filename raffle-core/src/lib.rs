//! VRF Raffle - lottery coordinator settled by verifiable randomness
//!
//! A raffle accepts paid entries, asks an external randomness provider for a
//! random word once a round is due, and pays the whole pool to the entrant
//! picked by that word when the provider calls back.

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod manager;
pub mod payout;
pub mod provider;
pub mod storage;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigOverrides, Network, NetworkConfig, RoundConfig};
pub use coordinator::{winner_index, DrawReadiness, RaffleCoordinator, RaffleSnapshot};
pub use error::{RaffleError, Result};
pub use manager::{DeployedRaffle, RaffleManager};
pub use payout::{Ledger, PrizeTransfer};
pub use provider::{MockVrfCoordinator, RandomnessProvider, RandomnessRequest};
pub use types::{
    AccountId, Amount, Entrant, PendingRequest, RaffleEvent, RaffleState, RandomValue, RequestId,
    RoundResult,
};

use std::sync::Arc;

/// Create a raffle bound to `provider`, paying winners through `payout`.
pub fn create_raffle(
    config: RoundConfig,
    provider: Arc<dyn RandomnessProvider>,
    payout: Arc<dyn PrizeTransfer>,
) -> Result<RaffleCoordinator> {
    RaffleCoordinator::new(config, provider, payout)
}
