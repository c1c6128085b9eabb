use crate::clock::SystemClock;
use crate::config::{ConfigOverrides, Network, NetworkConfig, RoundConfig};
use crate::coordinator::RaffleCoordinator;
use crate::error::{RaffleError, Result};
use crate::payout::Ledger;
use crate::provider::mock::{MockVrfCoordinator, DEV_SUBSCRIPTION_FUNDING};
use crate::provider::RandomnessProvider;
use crate::storage::event_store::StoredEvent;
use crate::storage::raffle_store::RaffleRecord;
use crate::storage::{EventStore, RaffleStore, RoundStore, Storage};
use crate::types::{AccountId, Amount, RaffleEvent, RandomValue, RoundResult};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// A raffle deployed on a development network, bound to its mock provider.
pub struct DeployedRaffle {
    pub name: String,
    pub network: Network,
    pub created_at: DateTime<Utc>,
    pub coordinator: RaffleCoordinator,
    pub provider: Arc<MockVrfCoordinator>,
    pub ledger: Arc<Ledger>,
}

impl DeployedRaffle {
    pub fn id(&self) -> String {
        self.coordinator.id().to_string()
    }

    pub fn subscription_balance(&self) -> Amount {
        self.provider
            .subscription_balance(self.coordinator.config().subscription_id)
            .unwrap_or(Amount::ZERO)
    }

    pub fn fund_subscription(&self, amount: Amount) -> Result<Amount> {
        self.provider
            .fund_subscription(self.coordinator.config().subscription_id, amount)
    }

    /// Have the mock answer the in-flight request, with `value` or a derived word.
    pub async fn fulfill(&mut self, value: Option<RandomValue>) -> Result<RoundResult> {
        let request_id = self
            .coordinator
            .pending_request()
            .map(|p| p.request_id)
            .ok_or_else(|| RaffleError::invalid_state("no draw in progress"))?;

        match value {
            Some(value) => {
                self.provider
                    .fulfill_random_words_with(request_id, value, &mut self.coordinator)
                    .await
            }
            None => {
                self.provider
                    .fulfill_random_words(request_id, &mut self.coordinator)
                    .await
            }
        }
    }
}

impl std::fmt::Debug for DeployedRaffle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployedRaffle")
            .field("name", &self.name)
            .field("network", &self.network)
            .field("coordinator", &self.coordinator)
            .finish()
    }
}

pub struct RaffleManager {
    storage: Arc<Storage>,
}

impl RaffleManager {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        let db_path = data_dir.join("raffle.db");
        let storage = Arc::new(Storage::new(&db_path).await?);

        Ok(Self { storage })
    }

    /// Deploy a raffle. Development networks get a funded mock VRF coordinator.
    pub async fn deploy(
        &self,
        name: &str,
        network: Network,
        overrides: ConfigOverrides,
    ) -> Result<DeployedRaffle> {
        let raffle_store = RaffleStore::new(&self.storage);
        if raffle_store.raffle_exists(name).await? {
            return Err(RaffleError::config(format!(
                "Raffle '{}' already exists",
                name
            )));
        }

        let preset = NetworkConfig::for_network(network);

        if !network.is_development() {
            let coordinator = preset
                .vrf_coordinator
                .as_ref()
                .map(|a| a.to_string())
                .unwrap_or_else(|| "<unset>".to_string());
            let subscription = overrides
                .subscription_id
                .or(preset.subscription_id)
                .map(|id| id.to_string())
                .unwrap_or_else(|| "<unset>".to_string());
            return Err(RaffleError::config(format!(
                "No mock provider on {}: bind the VRF coordinator {} with subscription {} ({} block confirmations) through RaffleCoordinator::new",
                network, coordinator, subscription, preset.block_confirmations
            )));
        }

        // the mock's own subscription is the only one that exists locally
        if let Some(id) = overrides.subscription_id {
            return Err(RaffleError::config(format!(
                "subscription_id {} cannot be set on {}; deploy creates and funds its own subscription",
                id, network
            )));
        }

        tracing::info!("Local network detected! Deploying mocks...");
        let provider = Arc::new(MockVrfCoordinator::development());
        let subscription_id = provider.create_subscription();
        provider.fund_subscription(subscription_id, DEV_SUBSCRIPTION_FUNDING)?;

        let config = RoundConfig::from_network(
            &preset,
            provider.address().clone(),
            subscription_id,
            &overrides,
        )?;

        let ledger = Arc::new(Ledger::new());
        let coordinator = RaffleCoordinator::new(config, provider.clone(), ledger.clone())?;

        let deployed = DeployedRaffle {
            name: name.to_string(),
            network,
            created_at: Utc::now(),
            coordinator,
            provider,
            ledger,
        };
        self.save(&deployed).await?;

        tracing::info!(
            "Deployed raffle '{}' on {} with ID: {}",
            name,
            network,
            deployed.id()
        );
        Ok(deployed)
    }

    pub async fn save(&self, raffle: &DeployedRaffle) -> Result<()> {
        let raffle_store = RaffleStore::new(&self.storage);
        let record = RaffleRecord {
            id: raffle.id(),
            name: raffle.name.clone(),
            network: raffle.network,
            created_at: raffle.created_at,
            snapshot: raffle.coordinator.snapshot(),
        };

        raffle_store.save_raffle(&record).await?;
        raffle_store
            .save_mock_state(&record.id, &raffle.provider.state())
            .await?;
        Ok(())
    }

    pub async fn load(&self, name: &str) -> Result<DeployedRaffle> {
        let raffle_store = RaffleStore::new(&self.storage);
        let record = raffle_store.load_raffle(name).await?;

        let state = raffle_store
            .load_mock_state(&record.id)
            .await?
            .ok_or_else(|| {
                RaffleError::config(format!("Raffle '{}' has no bound randomness provider", name))
            })?;
        let provider = Arc::new(MockVrfCoordinator::from_state(state));

        let balances = self.winnings_for(&record.id).await?;
        let ledger = Arc::new(Ledger::with_balances(balances.into_iter().collect()));

        let coordinator = RaffleCoordinator::from_snapshot(
            record.snapshot,
            provider.clone(),
            ledger.clone(),
            Arc::new(SystemClock),
        )?;

        Ok(DeployedRaffle {
            name: record.name,
            network: record.network,
            created_at: record.created_at,
            coordinator,
            provider,
            ledger,
        })
    }

    pub async fn list(&self) -> Result<Vec<RaffleRecord>> {
        RaffleStore::new(&self.storage).list_raffles().await
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        let raffle_store = RaffleStore::new(&self.storage);
        let record = raffle_store.load_raffle(name).await?;
        raffle_store.delete_raffle(&record.id).await?;

        tracing::info!("Deleted raffle '{}'", name);
        Ok(())
    }

    pub async fn record_round(&self, raffle: &DeployedRaffle, result: &RoundResult) -> Result<()> {
        RoundStore::new(&self.storage)
            .save_round(&raffle.id(), result)
            .await
    }

    pub async fn history(&self, name: &str) -> Result<Vec<RoundResult>> {
        let record = RaffleStore::new(&self.storage).load_raffle(name).await?;
        RoundStore::new(&self.storage).load_rounds(&record.id).await
    }

    pub async fn record_events(&self, raffle: &DeployedRaffle, events: &[RaffleEvent]) -> Result<()> {
        EventStore::new(&self.storage)
            .append(&raffle.id(), events)
            .await
    }

    pub async fn events(&self, name: &str) -> Result<Vec<StoredEvent>> {
        let record = RaffleStore::new(&self.storage).load_raffle(name).await?;
        EventStore::new(&self.storage).load_events(&record.id).await
    }

    /// Total prize paid to each account across all settled rounds.
    pub async fn winnings(&self, name: &str) -> Result<BTreeMap<AccountId, Amount>> {
        let record = RaffleStore::new(&self.storage).load_raffle(name).await?;
        self.winnings_for(&record.id).await
    }

    async fn winnings_for(&self, raffle_id: &str) -> Result<BTreeMap<AccountId, Amount>> {
        let rounds = RoundStore::new(&self.storage).load_rounds(raffle_id).await?;

        let mut totals: BTreeMap<AccountId, Amount> = BTreeMap::new();
        for round in rounds {
            let total = totals.entry(round.winner).or_insert(Amount::ZERO);
            *total = total.checked_add(round.prize)?;
        }
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RaffleState;
    use tempfile::tempdir;

    fn account(n: u64) -> AccountId {
        format!("0x{:040x}", n).parse().unwrap()
    }

    fn instant_overrides() -> ConfigOverrides {
        ConfigOverrides {
            entrance_fee: Some("0.01".to_string()),
            interval_secs: Some(0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_deploy_binds_funded_mock() {
        let temp_dir = tempdir().unwrap();
        let manager = RaffleManager::new(temp_dir.path()).await.unwrap();

        let raffle = manager
            .deploy("weekly", Network::Hardhat, ConfigOverrides::default())
            .await
            .unwrap();

        assert_eq!(raffle.coordinator.state(), RaffleState::Open);
        assert_eq!(raffle.coordinator.config().provider, *raffle.provider.address());
        assert_eq!(raffle.subscription_balance(), DEV_SUBSCRIPTION_FUNDING);
        assert_eq!(
            raffle.coordinator.entrance_fee(),
            Amount::from_ether("0.01").unwrap()
        );

        let names: Vec<String> = manager.list().await.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["weekly".to_string()]);
    }

    #[tokio::test]
    async fn test_deploy_rejects_duplicates_and_live_networks() {
        let temp_dir = tempdir().unwrap();
        let manager = RaffleManager::new(temp_dir.path()).await.unwrap();

        manager
            .deploy("weekly", Network::Hardhat, ConfigOverrides::default())
            .await
            .unwrap();
        assert!(manager
            .deploy("weekly", Network::Localhost, ConfigOverrides::default())
            .await
            .is_err());

        let err = manager
            .deploy("live", Network::Goerli, ConfigOverrides::default())
            .await
            .unwrap_err();
        match err {
            RaffleError::Config(msg) => {
                assert!(msg.contains("0x2ca8e0c643bde4c2e08ab1fa0da3401adad7734d"));
                assert!(msg.contains("subscription 0"));
                assert!(msg.contains("5 block confirmations"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!manager.list().await.unwrap().iter().any(|r| r.name == "live"));
    }

    #[tokio::test]
    async fn test_deploy_rejects_subscription_override_on_dev_network() {
        let temp_dir = tempdir().unwrap();
        let manager = RaffleManager::new(temp_dir.path()).await.unwrap();

        let overrides = ConfigOverrides {
            subscription_id: Some(42),
            ..instant_overrides()
        };
        let err = manager
            .deploy("pinned", Network::Hardhat, overrides)
            .await
            .unwrap_err();
        assert!(matches!(err, RaffleError::Config(_)));
        assert!(manager.list().await.unwrap().is_empty());

        let mut raffle = manager
            .deploy("pinned", Network::Hardhat, instant_overrides())
            .await
            .unwrap();
        assert_eq!(raffle.subscription_balance(), DEV_SUBSCRIPTION_FUNDING);
        raffle
            .coordinator
            .enter(account(1), Amount::from_ether("0.01").unwrap())
            .unwrap();
        raffle.coordinator.request_draw().await.unwrap();
        assert_eq!(raffle.coordinator.state(), RaffleState::Drawing);
    }

    #[tokio::test]
    async fn test_state_survives_reload_mid_draw() {
        let temp_dir = tempdir().unwrap();
        let manager = RaffleManager::new(temp_dir.path()).await.unwrap();
        let fee = Amount::from_ether("0.01").unwrap();

        let mut raffle = manager
            .deploy("daily", Network::Hardhat, instant_overrides())
            .await
            .unwrap();
        raffle.coordinator.enter(account(1), fee).unwrap();
        raffle.coordinator.enter(account(2), fee).unwrap();
        let request_id = raffle.coordinator.request_draw().await.unwrap();
        manager.save(&raffle).await.unwrap();

        let mut reloaded = manager.load("daily").await.unwrap();
        assert_eq!(reloaded.coordinator.snapshot(), raffle.coordinator.snapshot());
        assert_eq!(reloaded.provider.pending_requests(), vec![request_id]);

        let result = reloaded.fulfill(Some(RandomValue::from_u64(3))).await.unwrap();
        assert_eq!(result.winner, account(2));
        manager.record_round(&reloaded, &result).await.unwrap();
        manager.save(&reloaded).await.unwrap();

        let history = manager.history("daily").await.unwrap();
        assert_eq!(history, vec![result]);

        let winnings = manager.winnings("daily").await.unwrap();
        assert_eq!(winnings.get(&account(2)), Some(&fee.checked_add(fee).unwrap()));

        let again = manager.load("daily").await.unwrap();
        assert_eq!(again.coordinator.state(), RaffleState::Open);
        assert_eq!(again.ledger.balance_of(&account(2)), fee.checked_add(fee).unwrap());
    }

    #[tokio::test]
    async fn test_events_are_appended_in_order() {
        let temp_dir = tempdir().unwrap();
        let manager = RaffleManager::new(temp_dir.path()).await.unwrap();
        let raffle = manager
            .deploy("events", Network::Hardhat, instant_overrides())
            .await
            .unwrap();

        let entered = RaffleEvent::Entered {
            account: account(1),
            amount: Amount::from_base_units(1),
        };
        manager
            .record_events(&raffle, &[entered.clone()])
            .await
            .unwrap();
        manager
            .record_events(&raffle, &[RaffleEvent::Closed])
            .await
            .unwrap();

        let events = manager.events("events").await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].seq, 1);
        assert_eq!(events[0].event, entered);
        assert_eq!(events[1].seq, 2);
        assert_eq!(events[1].event, RaffleEvent::Closed);
    }

    #[tokio::test]
    async fn test_delete_removes_everything() {
        let temp_dir = tempdir().unwrap();
        let manager = RaffleManager::new(temp_dir.path()).await.unwrap();
        manager
            .deploy("gone", Network::Hardhat, ConfigOverrides::default())
            .await
            .unwrap();

        manager.delete("gone").await.unwrap();
        assert!(matches!(
            manager.load("gone").await,
            Err(RaffleError::RaffleNotFound { .. })
        ));
        assert!(manager.list().await.unwrap().is_empty());
    }
}
