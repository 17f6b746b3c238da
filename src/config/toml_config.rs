use crate::adapters::netlify::ReadinessSettings;
use crate::core::payments::PaymentSettings;
use crate::core::provisioner::ProvisionSettings;
use crate::utils::error::{Result, SiteError};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub provisioning: ProvisioningConfig,
    pub deploy: DeployConfig,
    pub payments: PaymentsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    pub template_dir: String,
    #[serde(default = "default_output_root")]
    pub output_root: String,
    #[serde(default = "default_site_domain")]
    pub site_domain: String,
    #[serde(default = "default_token_cost")]
    pub token_cost: i64,
    #[serde(default = "default_free_edit_window_secs")]
    pub free_edit_window_secs: i64,
    #[serde(default)]
    pub refund_on_deploy_failure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default = "default_deploy_api_base")]
    pub api_base: String,
    pub token: String,
    #[serde(default)]
    pub readiness: ReadinessConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessConfig {
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_attempts: default_poll_attempts(),
            poll_interval_secs: default_poll_interval_secs(),
            settle_delay_secs: default_settle_delay_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentsConfig {
    #[serde(default = "default_payment_api_base")]
    pub api_base: String,
    pub api_key: String,
    #[serde(default = "default_min_token_quantity")]
    pub min_token_quantity: i64,
    #[serde(default = "default_token_price_cents")]
    pub token_price_cents: i64,
}

fn default_output_root() -> String {
    "generated-sites".to_string()
}

fn default_site_domain() -> String {
    "siteforge.dev".to_string()
}

fn default_token_cost() -> i64 {
    1
}

fn default_free_edit_window_secs() -> i64 {
    3600
}

fn default_deploy_api_base() -> String {
    "https://api.netlify.com/api/v1".to_string()
}

fn default_poll_attempts() -> u32 {
    10
}

fn default_poll_interval_secs() -> u64 {
    3
}

fn default_settle_delay_secs() -> u64 {
    15
}

fn default_payment_api_base() -> String {
    "https://api.pagar.me".to_string()
}

fn default_min_token_quantity() -> i64 {
    5
}

fn default_token_price_cents() -> i64 {
    400
}

impl EngineConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SiteError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SiteError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${NETLIFY_TOKEN})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").unwrap();

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn template_dir(&self) -> &Path {
        Path::new(&self.provisioning.template_dir)
    }

    pub fn provision_settings(&self) -> ProvisionSettings {
        ProvisionSettings {
            output_root: PathBuf::from(&self.provisioning.output_root),
            site_domain: self.provisioning.site_domain.clone(),
            token_cost: self.provisioning.token_cost,
            free_edit_window_secs: self.provisioning.free_edit_window_secs,
            refund_on_deploy_failure: self.provisioning.refund_on_deploy_failure,
        }
    }

    pub fn readiness_settings(&self) -> ReadinessSettings {
        ReadinessSettings {
            poll_attempts: self.deploy.readiness.poll_attempts,
            poll_interval_secs: self.deploy.readiness.poll_interval_secs,
            settle_delay_secs: self.deploy.readiness.settle_delay_secs,
        }
    }

    pub fn payment_settings(&self) -> PaymentSettings {
        PaymentSettings {
            min_token_quantity: self.payments.min_token_quantity,
            token_price_cents: self.payments.token_price_cents,
        }
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("provisioning.template_dir", &self.provisioning.template_dir)?;
        validate_non_empty_string("provisioning.output_root", &self.provisioning.output_root)?;
        validate_non_empty_string("provisioning.site_domain", &self.provisioning.site_domain)?;
        validate_positive_number("provisioning.token_cost", self.provisioning.token_cost, 1)?;
        validate_positive_number(
            "provisioning.free_edit_window_secs",
            self.provisioning.free_edit_window_secs,
            0,
        )?;
        validate_url("deploy.api_base", &self.deploy.api_base)?;
        validate_url("payments.api_base", &self.payments.api_base)?;
        validate_positive_number(
            "payments.min_token_quantity",
            self.payments.min_token_quantity,
            1,
        )?;
        validate_positive_number(
            "payments.token_price_cents",
            self.payments.token_price_cents,
            1,
        )?;
        Ok(())
    }
}
