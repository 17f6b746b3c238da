use crate::domain::model::ImageAssets;
use crate::utils::error::{Result, SiteError};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Parser)]
#[command(name = "site-forge")]
#[command(about = "Provisions tenant sites from a shared template and deploys them")]
pub struct CliArgs {
    #[arg(long, default_value = "site-forge.toml")]
    pub config: String,

    #[arg(long, help = "JSON file describing the account, site config and images")]
    pub request: String,

    #[arg(long, help = "Edit this existing site instead of creating a new one")]
    pub site_id: Option<String>,

    #[arg(long, default_value = "1", help = "Token balance to seed the account with")]
    pub tokens: i64,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON for aggregation")]
    pub log_json: bool,

    #[arg(long, help = "Enable system resource monitoring")]
    pub monitor: bool,
}

/// One-shot provisioning request read from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionRequest {
    pub account: AccountSeed,
    #[serde(default)]
    pub config: HashMap<String, String>,
    #[serde(default)]
    pub images: ImageAssets,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSeed {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub document: Option<String>,
}

impl ProvisionRequest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SiteError::IoError)?;
        serde_json::from_str(&content).map_err(|e| SiteError::ConfigError {
            message: format!("request file parsing error: {}", e),
        })
    }
}
