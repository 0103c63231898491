use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// How the search results page is retrieved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Plain HTTP GET
    #[default]
    Http,
    /// Render the page in a browser through a WebDriver server
    WebDriver,
}

/// Configuration for one watch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Search results page to scrape
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request headers sent with the search request
    #[serde(default = "default_headers")]
    pub headers: BTreeMap<String, String>,

    /// Listings must be strictly cheaper than this
    #[serde(default = "default_price_ceiling")]
    pub price_ceiling: f64,

    /// Listing titles must contain this (case-insensitive)
    #[serde(default = "default_keyword")]
    pub keyword: String,

    /// File holding the identifiers already notified
    #[serde(default = "default_store_location")]
    pub store_location: PathBuf,

    /// Discord-style webhook receiving the alerts. Alerts are only logged when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// CSS selector matching one listing on the results page
    #[serde(default = "default_listing_selector")]
    pub listing_selector: String,

    /// Currency marker preceding prices
    #[serde(default = "default_currency_marker")]
    pub currency_marker: String,

    /// How to fetch the results page
    #[serde(default)]
    pub fetch_mode: FetchMode,

    /// URL for the WebDriver instance (only used with the webdriver fetch mode)
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Write the seen store after every delivered alert instead of once per run
    #[serde(default)]
    pub persist_each_notification: bool,

    /// Headline of the alert message; derived from keyword and ceiling when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_label: Option<String>,
}

/// Default search endpoint
fn default_endpoint() -> String {
    "https://www.olx.com.br/animais-e-acessorios/gatos?q=angor%C3%A1&region=piracicaba".to_string()
}

/// Default request headers
fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([("User-Agent".to_string(), "Mozilla/5.0".to_string())])
}

fn default_price_ceiling() -> f64 {
    300.0
}

fn default_keyword() -> String {
    "angorá".to_string()
}

fn default_store_location() -> PathBuf {
    PathBuf::from("sent_ads.json")
}

fn default_listing_selector() -> String {
    "li.sc-1fcmfeb-2".to_string()
}

fn default_currency_marker() -> String {
    crate::price::DEFAULT_CURRENCY_MARKER.to_string()
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::new(&default_endpoint())
    }
}

impl WatchConfig {
    /// Create a new configuration with default values
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            headers: default_headers(),
            price_ceiling: default_price_ceiling(),
            keyword: default_keyword(),
            store_location: default_store_location(),
            webhook_url: None,
            listing_selector: default_listing_selector(),
            currency_marker: default_currency_marker(),
            fetch_mode: FetchMode::default(),
            webdriver_url: default_webdriver_url(),
            persist_each_notification: false,
            message_label: None,
        }
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Override settings from `WEBHOOK_URL` and `WEBDRIVER_URL` when they are set
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(webhook_url) = std::env::var("WEBHOOK_URL") {
            if !webhook_url.is_empty() {
                self.webhook_url = Some(webhook_url);
            }
        }

        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.webdriver_url = webdriver_url;
            }
        }

        self
    }

    /// Check the values that would otherwise only fail halfway through a run
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint_url()?;

        if self.price_ceiling.is_nan() || self.price_ceiling <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "price_ceiling",
                reason: format!("must be a positive number, got {}", self.price_ceiling),
            });
        }

        if self.keyword.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "keyword",
                reason: "must not be empty".to_string(),
            });
        }

        if self.currency_marker.is_empty() {
            return Err(ConfigError::Invalid {
                field: "currency_marker",
                reason: "must not be empty".to_string(),
            });
        }

        if let Err(e) = scraper::Selector::parse(&self.listing_selector) {
            return Err(ConfigError::Invalid {
                field: "listing_selector",
                reason: e.to_string(),
            });
        }

        if let Some(webhook_url) = &self.webhook_url {
            if let Err(e) = Url::parse(webhook_url) {
                return Err(ConfigError::Invalid {
                    field: "webhook_url",
                    reason: e.to_string(),
                });
            }
        }

        Ok(())
    }

    /// The search endpoint as a parsed URL
    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.endpoint).map_err(|e| ConfigError::Invalid {
            field: "endpoint",
            reason: e.to_string(),
        })
    }

    /// Headline used at the top of every alert.
    ///
    /// The ceiling shown here is the same value the filter applies.
    pub fn message_label(&self) -> String {
        match &self.message_label {
            Some(label) => label.clone(),
            None => format!(
                "Novo gato {} abaixo de {}{}!",
                capitalize(&self.keyword),
                self.currency_marker,
                self.price_ceiling
            ),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WatchConfig::default();
        assert_eq!(config.price_ceiling, 300.0);
        assert_eq!(config.keyword, "angorá");
        assert_eq!(config.store_location, PathBuf::from("sent_ads.json"));
        assert_eq!(config.headers.get("User-Agent").unwrap(), "Mozilla/5.0");
        assert_eq!(config.fetch_mode, FetchMode::Http);
        assert!(config.webhook_url.is_none());
        assert!(!config.persist_each_notification);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_missing_fields() {
        let config = WatchConfig::from_json(
            r#"{
                "endpoint": "https://example.com/search?q=cat",
                "price_ceiling": 3000,
                "fetch_mode": "webdriver",
                "headers": {"User-Agent": "test-agent", "Accept-Language": "pt-BR"}
            }"#,
        )
        .unwrap();

        assert_eq!(config.endpoint, "https://example.com/search?q=cat");
        assert_eq!(config.price_ceiling, 3000.0);
        assert_eq!(config.fetch_mode, FetchMode::WebDriver);
        assert_eq!(config.headers.len(), 2);
        assert_eq!(config.keyword, "angorá");
        assert_eq!(config.listing_selector, "li.sc-1fcmfeb-2");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            WatchConfig::from_json("{"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = WatchConfig::new("not a url");
        assert!(config.validate().is_err());

        config = WatchConfig::default();
        config.price_ceiling = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "price_ceiling",
                ..
            })
        ));

        config = WatchConfig::default();
        config.keyword = "  ".to_string();
        assert!(config.validate().is_err());

        config = WatchConfig::default();
        config.listing_selector = "li[".to_string();
        assert!(config.validate().is_err());

        config = WatchConfig::default();
        config.webhook_url = Some("nope".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_message_label_uses_single_ceiling() {
        let config = WatchConfig::default();
        assert_eq!(config.message_label(), "Novo gato Angorá abaixo de R$300!");

        let mut config = WatchConfig::default();
        config.price_ceiling = 2999.5;
        assert_eq!(config.message_label(), "Novo gato Angorá abaixo de R$2999.5!");

        config.message_label = Some("Promo".to_string());
        assert_eq!(config.message_label(), "Promo");
    }
}
