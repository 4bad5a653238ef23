use serde::{ Deserialize, Serialize };
use std::time::Duration;

use crate::error::{ Error, Result };

/// Connection details for the cluster that hosts the managed indices.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub host: String,
    pub api_key: Option<String>,
    pub user: Option<String>,
    pub pass: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:9200".to_string(),
            api_key: None,
            user: None,
            pass: None,
            request_timeout_secs: 30,
        }
    }
}

impl ClusterConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Tuning for the shared outbound client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EgressConfig {
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub pool_idle_timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
    pub user_agent: Option<String>,
}

impl Default for EgressConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            pool_idle_timeout_secs: 90,
            pool_max_idle_per_host: 20,
            user_agent: None,
        }
    }
}

impl EgressConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    pub cluster: ClusterConfig,
    pub egress: EgressConfig,
}

impl PluginConfig {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json
            ::from_str(raw)
            .map_err(|e| Error::Configuration(format!("invalid plugin config: {}", e)))
    }
}
