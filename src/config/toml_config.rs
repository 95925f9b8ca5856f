use crate::domain::model::PlanTier;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{MapiesError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub geocoding: GeocodingSettings,
    pub import: ImportSettings,
    pub billing: BillingSettings,
    pub storage: StorageSettings,
    pub monitoring: MonitoringSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingSettings {
    pub nominatim_url: String,
    pub mapbox_url: String,
    pub mapbox_token: Option<String>,
    pub user_agent: String,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub request_delay_ms: u64,
    pub provider_delay_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for GeocodingSettings {
    fn default() -> Self {
        Self {
            nominatim_url: "https://nominatim.openstreetmap.org".to_string(),
            mapbox_url: "https://api.mapbox.com".to_string(),
            mapbox_token: None,
            user_agent: "Mapies/0.1 (support@mapies.com)".to_string(),
            max_attempts: 3,
            retry_delay_ms: 2000,
            request_delay_ms: 300,
            provider_delay_ms: 500,
            timeout_seconds: 10,
        }
    }
}

impl GeocodingSettings {
    /// 未替換的 `${VAR}` 視為未設定
    pub fn mapbox_token(&self) -> Option<&str> {
        self.mapbox_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty() && !token.starts_with("${"))
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn provider_delay(&self) -> Duration {
        Duration::from_millis(self.provider_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    pub max_file_bytes: usize,
    pub max_rows: usize,
    pub max_recorded_errors: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            max_file_bytes: 10 * 1024 * 1024,
            max_rows: 10_000,
            max_recorded_errors: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingSettings {
    pub webhook_secret: Option<String>,
    pub tolerance_seconds: i64,
    /// Stripe price id 對應的方案
    pub price_tiers: HashMap<String, PlanTier>,
}

impl Default for BillingSettings {
    fn default() -> Self {
        Self {
            webhook_secret: None,
            tolerance_seconds: 300,
            price_tiers: HashMap::new(),
        }
    }
}

impl BillingSettings {
    pub fn webhook_secret(&self) -> Option<&str> {
        self.webhook_secret
            .as_deref()
            .filter(|secret| !secret.is_empty() && !secret.starts_with("${"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSettings {
    pub enabled: bool,
    pub log_level: Option<String>,
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| MapiesError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MAPBOX_TOKEN})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| MapiesError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("geocoding.nominatim_url", &self.geocoding.nominatim_url)?;
        validation::validate_url("geocoding.mapbox_url", &self.geocoding.mapbox_url)?;
        validation::validate_non_empty_string("geocoding.user_agent", &self.geocoding.user_agent)?;
        validation::validate_range("geocoding.max_attempts", self.geocoding.max_attempts, 1, 10)?;
        validation::validate_range(
            "geocoding.retry_delay_ms",
            self.geocoding.retry_delay_ms,
            0,
            60_000,
        )?;
        validation::validate_positive_number("import.max_rows", self.import.max_rows, 1)?;
        validation::validate_positive_number(
            "import.max_file_bytes",
            self.import.max_file_bytes,
            1,
        )?;
        validation::validate_range(
            "billing.tolerance_seconds",
            self.billing.tolerance_seconds,
            1,
            86_400,
        )?;
        validation::validate_path("storage.data_dir", &self.storage.data_dir)?;
        Ok(())
    }
}

impl ConfigProvider for AppConfig {
    fn geocoding(&self) -> &GeocodingSettings {
        &self.geocoding
    }

    fn import(&self) -> &ImportSettings {
        &self.import
    }

    fn billing(&self) -> &BillingSettings {
        &self.billing
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();

        assert_eq!(config.geocoding.max_attempts, 3);
        assert_eq!(config.geocoding.retry_delay_ms, 2000);
        assert_eq!(config.geocoding.request_delay_ms, 300);
        assert_eq!(config.import.max_recorded_errors, 100);
        assert_eq!(config.billing.tolerance_seconds, 300);
        assert!(config.geocoding.mapbox_token().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_sections_and_price_tiers() {
        let toml_content = r#"
[geocoding]
nominatim_url = "http://localhost:9000"
max_attempts = 2
retry_delay_ms = 0

[import]
max_rows = 25

[billing]
webhook_secret = "whsec_test"

[billing.price_tiers]
price_starter = "starter"
price_pro = "professional"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.geocoding.nominatim_url, "http://localhost:9000");
        assert_eq!(config.geocoding.max_attempts, 2);
        assert_eq!(config.import.max_rows, 25);
        assert_eq!(config.billing.webhook_secret(), Some("whsec_test"));
        assert_eq!(
            config.billing.price_tiers.get("price_pro"),
            Some(&PlanTier::Professional)
        );
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("MAPIES_TEST_MAPBOX_TOKEN", "pk.test-token");

        let toml_content = r#"
[geocoding]
mapbox_token = "${MAPIES_TEST_MAPBOX_TOKEN}"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.geocoding.mapbox_token(), Some("pk.test-token"));

        std::env::remove_var("MAPIES_TEST_MAPBOX_TOKEN");
    }

    #[test]
    fn test_unresolved_token_is_treated_as_missing() {
        let toml_content = r#"
[geocoding]
mapbox_token = "${MAPIES_TEST_UNSET_TOKEN}"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert!(config.geocoding.mapbox_token().is_none());
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[geocoding]
nominatim_url = "invalid-url"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());

        let config = AppConfig::from_toml_str("[geocoding]\nmax_attempts = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[storage]\ndata_dir = \"/tmp/mapies-data\"\n")
            .unwrap();

        let config = AppConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.storage.data_dir, "/tmp/mapies-data");
    }
}
