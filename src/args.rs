use angora_watch::WatchConfig;
use angora_watch::config::FetchMode;
use angora_watch::error::ConfigError;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "angora-watch")]
#[command(about = "Alerts once for every new classified listing matching a keyword below a price")]
#[command(version)]
pub struct Args {
    /// JSON configuration file (defaults are used for anything it leaves out)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Search results page to scrape
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Keyword listing titles must contain
    #[arg(short, long)]
    pub keyword: Option<String>,

    /// Listings must be strictly cheaper than this
    #[arg(short, long)]
    pub price_ceiling: Option<f64>,

    /// File holding identifiers already notified
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    /// Webhook receiving the alerts (also read from WEBHOOK_URL)
    #[arg(long)]
    pub webhook_url: Option<String>,

    /// How to fetch the page
    #[arg(long, value_enum)]
    pub fetch_mode: Option<FetchModeArg>,

    /// Write the seen store after every delivered alert
    #[arg(long)]
    pub persist_each: bool,

    /// Log alerts instead of sending them and leave the seen store untouched
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FetchModeArg {
    Http,
    Webdriver,
}

/// Convert from CLI argument fetch mode to internal fetch mode
pub fn convert_fetch_mode(arg: FetchModeArg) -> FetchMode {
    match arg {
        FetchModeArg::Http => FetchMode::Http,
        FetchModeArg::Webdriver => FetchMode::WebDriver,
    }
}

impl Args {
    /// Builds the run configuration: config file, then environment, then flags
    pub fn load_config(&self) -> Result<WatchConfig, ConfigError> {
        let config = match &self.config {
            Some(path) => WatchConfig::from_file(path)?,
            None => WatchConfig::default(),
        };
        Ok(self.apply(config.with_env_overrides()))
    }

    /// Overrides `config` with the flags that were given
    pub fn apply(&self, mut config: WatchConfig) -> WatchConfig {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(keyword) = &self.keyword {
            config.keyword = keyword.clone();
        }
        if let Some(price_ceiling) = self.price_ceiling {
            config.price_ceiling = price_ceiling;
        }
        if let Some(store) = &self.store {
            config.store_location = store.clone();
        }
        if let Some(webhook_url) = &self.webhook_url {
            config.webhook_url = Some(webhook_url.clone());
        }
        if let Some(fetch_mode) = self.fetch_mode {
            config.fetch_mode = convert_fetch_mode(fetch_mode);
        }
        if self.persist_each {
            config.persist_each_notification = true;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_flags_keep_config() {
        let args = Args::try_parse_from(["angora-watch"]).unwrap();
        let config = args.apply(WatchConfig::default());
        assert_eq!(config.keyword, "angorá");
        assert_eq!(config.price_ceiling, 300.0);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "angora-watch",
            "--keyword",
            "persa",
            "--price-ceiling",
            "3000",
            "--store",
            "/tmp/seen.json",
            "--fetch-mode",
            "webdriver",
            "--persist-each",
            "--dry-run",
        ])
        .unwrap();
        let config = args.apply(WatchConfig::default());

        assert_eq!(config.keyword, "persa");
        assert_eq!(config.price_ceiling, 3000.0);
        assert_eq!(config.store_location, PathBuf::from("/tmp/seen.json"));
        assert_eq!(config.fetch_mode, FetchMode::WebDriver);
        assert!(config.persist_each_notification);
        assert!(args.dry_run);
    }
}
