use crate::coordinator::RaffleCoordinator;
use crate::error::{RaffleError, Result};
use crate::provider::{RandomnessProvider, RandomnessRequest};
use crate::types::{AccountId, Amount, RandomValue, RequestId, RoundResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// 0.25 LINK premium per request
pub const DEV_BASE_FEE: Amount = Amount::from_base_units(250_000_000_000_000_000);
/// LINK per gas unit
pub const DEV_GAS_PRICE_LINK: Amount = Amount::from_base_units(1_000_000_000);
/// 2 LINK, the amount a fresh development subscription is funded with
pub const DEV_SUBSCRIPTION_FUNDING: Amount = Amount::from_base_units(2_000_000_000_000_000_000);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: u64,
    pub balance: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockRequest {
    pub request_id: RequestId,
    pub subscription_id: u64,
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

/// Serializable state of the mock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockState {
    pub address: AccountId,
    pub base_fee: Amount,
    pub gas_price_link: Amount,
    pub available: bool,
    pub next_subscription_id: u64,
    pub next_request_id: u64,
    pub subscriptions: BTreeMap<u64, Subscription>,
    pub requests: BTreeMap<u64, MockRequest>,
}

/// In-process VRF coordinator for development networks.
///
/// Requests are charged against a funded subscription. Fulfilment is driven
/// explicitly through [`fulfill_random_words`](Self::fulfill_random_words).
pub struct MockVrfCoordinator {
    address: AccountId,
    inner: Mutex<MockState>,
}

impl MockVrfCoordinator {
    pub fn new(base_fee: Amount, gas_price_link: Amount) -> Self {
        let address = AccountId::random();
        Self {
            address: address.clone(),
            inner: Mutex::new(MockState {
                address,
                base_fee,
                gas_price_link,
                available: true,
                next_subscription_id: 1,
                next_request_id: 1,
                subscriptions: BTreeMap::new(),
                requests: BTreeMap::new(),
            }),
        }
    }

    pub fn development() -> Self {
        Self::new(DEV_BASE_FEE, DEV_GAS_PRICE_LINK)
    }

    pub fn from_state(state: MockState) -> Self {
        Self {
            address: state.address.clone(),
            inner: Mutex::new(state),
        }
    }

    pub fn state(&self) -> MockState {
        self.inner.lock().clone()
    }

    pub fn create_subscription(&self) -> u64 {
        let mut inner = self.inner.lock();
        let id = inner.next_subscription_id;
        inner.next_subscription_id += 1;
        inner.subscriptions.insert(
            id,
            Subscription {
                id,
                balance: Amount::ZERO,
            },
        );

        tracing::info!("Mock VRF coordinator {} created subscription {}", self.address, id);
        id
    }

    pub fn fund_subscription(&self, subscription_id: u64, amount: Amount) -> Result<Amount> {
        let mut inner = self.inner.lock();
        let subscription = inner
            .subscriptions
            .get_mut(&subscription_id)
            .ok_or_else(|| RaffleError::config(format!("Unknown subscription {}", subscription_id)))?;

        subscription.balance = subscription.balance.checked_add(amount)?;
        tracing::info!(
            "Funded subscription {} with {} (balance {})",
            subscription_id,
            amount,
            subscription.balance
        );
        Ok(subscription.balance)
    }

    pub fn subscription_balance(&self, subscription_id: u64) -> Option<Amount> {
        self.inner
            .lock()
            .subscriptions
            .get(&subscription_id)
            .map(|s| s.balance)
    }

    /// Simulate an outage: while unavailable every request fails.
    pub fn set_available(&self, available: bool) {
        self.inner.lock().available = available;
    }

    pub fn pending_requests(&self) -> Vec<RequestId> {
        self.inner
            .lock()
            .requests
            .values()
            .map(|r| r.request_id)
            .collect()
    }

    /// Deliver the deterministic word for `request_id` to `coordinator`.
    pub async fn fulfill_random_words(
        &self,
        request_id: RequestId,
        coordinator: &mut RaffleCoordinator,
    ) -> Result<RoundResult> {
        let value = derive_random_word(request_id, 0);
        self.fulfill_random_words_with(request_id, value, coordinator)
            .await
    }

    /// Deliver an explicit random word for `request_id` to `coordinator`.
    ///
    /// The subscription is charged only once the coordinator accepts the
    /// callback; on any error the request stays pending.
    pub async fn fulfill_random_words_with(
        &self,
        request_id: RequestId,
        value: RandomValue,
        coordinator: &mut RaffleCoordinator,
    ) -> Result<RoundResult> {
        let (subscription_id, payment) = {
            let inner = self.inner.lock();
            let request = inner
                .requests
                .get(&request_id.0)
                .ok_or(RaffleError::UnknownRequest(request_id))?;
            let payment = payment_for(&inner, request.callback_gas_limit)?;
            let balance = inner
                .subscriptions
                .get(&request.subscription_id)
                .map(|s| s.balance)
                .unwrap_or(Amount::ZERO);

            if balance < payment {
                return Err(RaffleError::InsufficientFunding {
                    subscription_id: request.subscription_id,
                    balance,
                    required: payment,
                });
            }
            (request.subscription_id, payment)
        };

        let result = coordinator
            .on_randomness_received(&self.address, request_id, value)
            .await?;

        let mut inner = self.inner.lock();
        inner.requests.remove(&request_id.0);
        if let Some(subscription) = inner.subscriptions.get_mut(&subscription_id) {
            subscription.balance = subscription
                .balance
                .checked_sub(payment)
                .unwrap_or(Amount::ZERO);
        }

        tracing::debug!(
            "Fulfilled request {} charging {} to subscription {}",
            request_id,
            payment,
            subscription_id
        );
        Ok(result)
    }
}

#[async_trait]
impl RandomnessProvider for MockVrfCoordinator {
    fn address(&self) -> &AccountId {
        &self.address
    }

    async fn request(&self, request: &RandomnessRequest) -> Result<RequestId> {
        let mut inner = self.inner.lock();

        if !inner.available {
            return Err(RaffleError::provider_unavailable(format!(
                "mock coordinator {} is offline",
                self.address
            )));
        }

        let balance = inner
            .subscriptions
            .get(&request.subscription_id)
            .map(|s| s.balance)
            .ok_or_else(|| {
                RaffleError::provider_unavailable(format!(
                    "unknown subscription {}",
                    request.subscription_id
                ))
            })?;

        let required = payment_for(&inner, request.callback_gas_limit)?;
        if balance < required {
            return Err(RaffleError::InsufficientFunding {
                subscription_id: request.subscription_id,
                balance,
                required,
            });
        }

        let request_id = RequestId(inner.next_request_id);
        inner.next_request_id += 1;
        inner.requests.insert(
            request_id.0,
            MockRequest {
                request_id,
                subscription_id: request.subscription_id,
                callback_gas_limit: request.callback_gas_limit,
                num_words: request.num_words,
            },
        );

        tracing::info!(
            "Mock VRF coordinator issued request {} for subscription {}",
            request_id,
            request.subscription_id
        );
        Ok(request_id)
    }
}

impl std::fmt::Debug for MockVrfCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MockVrfCoordinator")
            .field("address", &self.address)
            .field("subscriptions", &inner.subscriptions.len())
            .field("pending_requests", &inner.requests.len())
            .finish()
    }
}

fn payment_for(state: &MockState, callback_gas_limit: u32) -> Result<Amount> {
    state
        .gas_price_link
        .checked_mul(callback_gas_limit as u128)?
        .checked_add(state.base_fee)
}

/// SHA-256 over the big-endian request id and word index.
pub fn derive_random_word(request_id: RequestId, index: u32) -> RandomValue {
    let mut hasher = Sha256::new();
    hasher.update(request_id.0.to_be_bytes());
    hasher.update(index.to_be_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    RandomValue::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_GAS_LANE;

    fn request_for(subscription_id: u64) -> RandomnessRequest {
        RandomnessRequest {
            key_hash: DEFAULT_GAS_LANE.to_string(),
            subscription_id,
            request_confirmations: 3,
            callback_gas_limit: 500_000,
            num_words: 1,
        }
    }

    #[tokio::test]
    async fn test_request_requires_funding() {
        let mock = MockVrfCoordinator::development();
        let sub = mock.create_subscription();

        let err = mock.request(&request_for(sub)).await.unwrap_err();
        assert!(matches!(err, RaffleError::InsufficientFunding { .. }));
        assert!(mock.pending_requests().is_empty());

        mock.fund_subscription(sub, DEV_SUBSCRIPTION_FUNDING).unwrap();
        let id = mock.request(&request_for(sub)).await.unwrap();
        assert_eq!(id, RequestId(1));
        assert_eq!(mock.pending_requests(), vec![RequestId(1)]);
    }

    #[tokio::test]
    async fn test_offline_and_unknown_subscription() {
        let mock = MockVrfCoordinator::development();
        let sub = mock.create_subscription();
        mock.fund_subscription(sub, DEV_SUBSCRIPTION_FUNDING).unwrap();

        mock.set_available(false);
        let err = mock.request(&request_for(sub)).await.unwrap_err();
        assert!(matches!(err, RaffleError::ProviderUnavailable(_)));

        mock.set_available(true);
        let err = mock.request(&request_for(99)).await.unwrap_err();
        assert!(matches!(err, RaffleError::ProviderUnavailable(_)));
    }

    #[test]
    fn test_fund_unknown_subscription() {
        let mock = MockVrfCoordinator::development();
        assert!(mock.fund_subscription(7, DEV_BASE_FEE).is_err());
        assert!(mock.subscription_balance(7).is_none());
    }

    #[test]
    fn test_derived_words_are_deterministic() {
        let a = derive_random_word(RequestId(1), 0);
        let b = derive_random_word(RequestId(1), 0);
        let c = derive_random_word(RequestId(2), 0);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_state_round_trip_keeps_address() {
        let mock = MockVrfCoordinator::development();
        let sub = mock.create_subscription();
        mock.fund_subscription(sub, DEV_BASE_FEE).unwrap();

        let json = serde_json::to_string(&mock.state()).unwrap();
        let restored = MockVrfCoordinator::from_state(serde_json::from_str(&json).unwrap());

        assert_eq!(restored.address(), mock.address());
        assert_eq!(restored.subscription_balance(sub), Some(DEV_BASE_FEE));
    }
}
