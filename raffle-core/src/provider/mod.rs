pub mod mock;

pub use mock::{MockState, MockVrfCoordinator};

use crate::config::RoundConfig;
use crate::error::Result;
use crate::types::{AccountId, RequestId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Parameters of a single randomness request, derived from the round config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomnessRequest {
    pub key_hash: String,
    pub subscription_id: u64,
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

impl From<&RoundConfig> for RandomnessRequest {
    fn from(config: &RoundConfig) -> Self {
        Self {
            key_hash: config.gas_lane.clone(),
            subscription_id: config.subscription_id,
            request_confirmations: config.request_confirmations,
            callback_gas_limit: config.callback_gas_limit,
            num_words: config.num_words,
        }
    }
}

/// Source of verifiable randomness.
///
/// `request` only issues the request. The random value arrives later through
/// [`RaffleCoordinator::on_randomness_received`](crate::RaffleCoordinator::on_randomness_received),
/// invoked by the provider under its own [`address`](RandomnessProvider::address).
#[async_trait]
pub trait RandomnessProvider: Send + Sync {
    fn address(&self) -> &AccountId;

    /// Fails with `ProviderUnavailable` or `InsufficientFunding`.
    async fn request(&self, request: &RandomnessRequest) -> Result<RequestId>;
}
