use raffle_core::{Network, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    pub default_network: Network,
    pub verbose: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("vrf-raffle"),
            default_network: Network::Hardhat,
            verbose: false,
        }
    }
}

impl CliConfig {
    /// Load `cli.json` from `data_dir` if present, defaults otherwise.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("cli.json");
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            Self::default()
        };

        config.data_dir = data_dir.to_path_buf();
        Ok(config)
    }
}
