use crate::error::{RaffleError, Result};
use crate::types::{AccountId, Amount, ETHER_DECIMALS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_GAS_LANE: &str =
    "0x79d3d8832d904592c0bf9818b621522c988bb8b0c05cdc3b15aea1b6e8db0c15";
pub const DEFAULT_CALLBACK_GAS_LIMIT: u32 = 500_000;
pub const DEFAULT_REQUEST_CONFIRMATIONS: u16 = 3;
pub const NUM_WORDS: u32 = 1;

const GOERLI_VRF_COORDINATOR: &str = "0x2ca8e0c643bde4c2e08ab1fa0da3401adad7734d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    Hardhat,
    Localhost,
    Goerli,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Hardhat | Network::Localhost => 31337,
            Network::Goerli => 5,
        }
    }

    /// Development networks get a mock randomness provider bound at deploy time.
    pub fn is_development(&self) -> bool {
        matches!(self, Network::Hardhat | Network::Localhost)
    }
}

impl FromStr for Network {
    type Err = RaffleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "hardhat" => Ok(Network::Hardhat),
            "localhost" => Ok(Network::Localhost),
            "goerli" => Ok(Network::Goerli),
            _ => Err(RaffleError::config(format!(
                "Invalid network: {}. Supported networks: hardhat, localhost, goerli",
                s
            ))),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Network::Hardhat => "hardhat",
            Network::Localhost => "localhost",
            Network::Goerli => "goerli",
        };
        f.write_str(s)
    }
}

/// Per-network deployment parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub network: Network,
    pub entrance_fee: Amount,
    pub gas_lane: String,
    pub callback_gas_limit: u32,
    pub interval: Duration,
    pub vrf_coordinator: Option<AccountId>,
    pub subscription_id: Option<u64>,
    pub block_confirmations: u32,
}

impl NetworkConfig {
    pub fn for_network(network: Network) -> Self {
        let entrance_fee = Amount::from_base_units(10u128.pow(ETHER_DECIMALS - 2)); // 0.01 ETH

        let mut config = Self {
            network,
            entrance_fee,
            gas_lane: DEFAULT_GAS_LANE.to_string(),
            callback_gas_limit: DEFAULT_CALLBACK_GAS_LIMIT,
            interval: Duration::from_secs(30),
            vrf_coordinator: None,
            subscription_id: None,
            block_confirmations: 1,
        };

        if network == Network::Goerli {
            config.vrf_coordinator = GOERLI_VRF_COORDINATOR.parse().ok();
            config.subscription_id = Some(0);
            config.block_confirmations = 5;
        }

        config
    }
}

/// Optional deploy-time overrides applied on top of a network preset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    /// Entrance fee in ETH, decimal notation
    pub entrance_fee: Option<String>,
    pub interval_secs: Option<u64>,
    pub callback_gas_limit: Option<u32>,
    pub gas_lane: Option<String>,
    pub subscription_id: Option<u64>,
}

impl ConfigOverrides {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Flag values win over values already present.
    pub fn merge(self, other: ConfigOverrides) -> Self {
        Self {
            entrance_fee: other.entrance_fee.or(self.entrance_fee),
            interval_secs: other.interval_secs.or(self.interval_secs),
            callback_gas_limit: other.callback_gas_limit.or(self.callback_gas_limit),
            gas_lane: other.gas_lane.or(self.gas_lane),
            subscription_id: other.subscription_id.or(self.subscription_id),
        }
    }
}

/// Immutable parameters of a raffle deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundConfig {
    pub entrance_fee: Amount,
    pub interval: Duration,
    pub callback_gas_limit: u32,
    pub gas_lane: String,
    pub subscription_id: u64,
    pub provider: AccountId,
    pub request_confirmations: u16,
    pub num_words: u32,
}

impl RoundConfig {
    pub fn new(
        entrance_fee: Amount,
        interval: Duration,
        provider: AccountId,
        subscription_id: u64,
    ) -> Self {
        Self {
            entrance_fee,
            interval,
            callback_gas_limit: DEFAULT_CALLBACK_GAS_LIMIT,
            gas_lane: DEFAULT_GAS_LANE.to_string(),
            subscription_id,
            provider,
            request_confirmations: DEFAULT_REQUEST_CONFIRMATIONS,
            num_words: NUM_WORDS,
        }
    }

    pub fn from_network(
        network: &NetworkConfig,
        provider: AccountId,
        subscription_id: u64,
        overrides: &ConfigOverrides,
    ) -> Result<Self> {
        let entrance_fee = match &overrides.entrance_fee {
            Some(fee) => Amount::from_ether(fee)?,
            None => network.entrance_fee,
        };

        let config = Self {
            entrance_fee,
            interval: overrides
                .interval_secs
                .map(Duration::from_secs)
                .unwrap_or(network.interval),
            callback_gas_limit: overrides
                .callback_gas_limit
                .unwrap_or(network.callback_gas_limit),
            gas_lane: overrides
                .gas_lane
                .clone()
                .unwrap_or_else(|| network.gas_lane.clone()),
            subscription_id: overrides.subscription_id.unwrap_or(subscription_id),
            provider,
            request_confirmations: DEFAULT_REQUEST_CONFIRMATIONS,
            num_words: NUM_WORDS,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn with_callback_gas_limit(mut self, limit: u32) -> Self {
        self.callback_gas_limit = limit;
        self
    }

    pub fn with_gas_lane(mut self, gas_lane: impl Into<String>) -> Self {
        self.gas_lane = gas_lane.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.entrance_fee.is_zero() {
            return Err(RaffleError::config("Entrance fee must be greater than 0"));
        }

        if self.callback_gas_limit == 0 {
            return Err(RaffleError::config(
                "Callback gas limit must be greater than 0",
            ));
        }

        if self.request_confirmations == 0 {
            return Err(RaffleError::config(
                "Request confirmations must be greater than 0",
            ));
        }

        if self.num_words == 0 {
            return Err(RaffleError::config("Number of words must be greater than 0"));
        }

        let lane = self
            .gas_lane
            .strip_prefix("0x")
            .ok_or_else(|| RaffleError::config("Gas lane must be 0x-prefixed hex"))?;
        let bytes = hex::decode(lane)
            .map_err(|e| RaffleError::config(format!("Invalid gas lane: {}", e)))?;
        if bytes.len() != 32 {
            return Err(RaffleError::config("Gas lane must be a 32-byte key hash"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_presets() {
        let hardhat = NetworkConfig::for_network(Network::Hardhat);
        assert_eq!(hardhat.entrance_fee, Amount::from_ether("0.01").unwrap());
        assert_eq!(hardhat.interval, Duration::from_secs(30));
        assert!(hardhat.vrf_coordinator.is_none());

        let goerli = NetworkConfig::for_network(Network::Goerli);
        assert_eq!(goerli.network.chain_id(), 5);
        assert!(goerli.vrf_coordinator.is_some());
        assert_eq!(goerli.block_confirmations, 5);
    }

    #[test]
    fn test_parse_network() {
        assert_eq!("Hardhat".parse::<Network>().unwrap(), Network::Hardhat);
        assert!(Network::Localhost.is_development());
        assert!(!Network::Goerli.is_development());
        assert!("mainnet".parse::<Network>().is_err());
    }

    #[test]
    fn test_overrides_apply_on_top_of_preset() {
        let preset = NetworkConfig::for_network(Network::Hardhat);
        let overrides = ConfigOverrides {
            entrance_fee: Some("1".to_string()),
            interval_secs: Some(0),
            ..Default::default()
        };

        let config = RoundConfig::from_network(&preset, AccountId::random(), 1, &overrides).unwrap();
        assert_eq!(config.entrance_fee, Amount::from_ether("1").unwrap());
        assert_eq!(config.interval, Duration::ZERO);
        assert_eq!(config.callback_gas_limit, DEFAULT_CALLBACK_GAS_LIMIT);
        assert_eq!(config.subscription_id, 1);
    }

    #[test]
    fn test_merge_prefers_later_values() {
        let file = ConfigOverrides {
            entrance_fee: Some("0.5".to_string()),
            interval_secs: Some(60),
            ..Default::default()
        };
        let flags = ConfigOverrides {
            interval_secs: Some(5),
            ..Default::default()
        };

        let merged = file.merge(flags);
        assert_eq!(merged.entrance_fee.as_deref(), Some("0.5"));
        assert_eq!(merged.interval_secs, Some(5));
    }

    #[test]
    fn test_overrides_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("raffle.json");
        std::fs::write(&path, r#"{"entrance_fee": "0.1", "interval_secs": 60}"#).unwrap();

        let overrides = ConfigOverrides::from_file(&path).unwrap();
        assert_eq!(overrides.entrance_fee.as_deref(), Some("0.1"));
        assert_eq!(overrides.interval_secs, Some(60));
        assert!(overrides.callback_gas_limit.is_none());

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ConfigOverrides::from_file(&path),
            Err(RaffleError::Serialization(_))
        ));
        assert!(matches!(
            ConfigOverrides::from_file(&temp_dir.path().join("missing.json")),
            Err(RaffleError::Io(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let provider = AccountId::random();
        let base = RoundConfig::new(Amount::from_base_units(1), Duration::ZERO, provider, 1);
        assert!(base.validate().is_ok());

        let zero_fee = RoundConfig {
            entrance_fee: Amount::ZERO,
            ..base.clone()
        };
        assert!(zero_fee.validate().is_err());

        assert!(base.clone().with_callback_gas_limit(0).validate().is_err());
        assert!(base.clone().with_gas_lane("0x1234").validate().is_err());
        assert!(base.with_gas_lane("not-hex").validate().is_err());
    }
}
