use crate::yaml_include::{load_yaml_with_includes, yaml_to_string};
use serde::Deserialize;
use std::{error::Error, path::Path};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CommonConfig {
    pub project_name: String,
    pub database_url: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServerConfig {
    pub server_address: String,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct PaymentConfig {
    pub api_url: String,
    pub api_key: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "usd".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotificationConfig {
    pub api_url: String,
    pub from_address: String,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    pub common: CommonConfig,
    pub server: ServerConfig,
    pub payment: PaymentConfig,
    pub notifications: NotificationConfig,
}

impl Config {
    /// Load the config from a YAML file, resolving `!include` directives
    /// before deserializing.
    pub fn load(config_path: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let yaml = load_yaml_with_includes(Path::new(config_path))?;
        let contents = yaml_to_string(&yaml)?;
        let config = serde_yml::from_str(&contents)?;

        Ok(config)
    }
}
