use crate::config::WatchConfig;
use crate::error::SourceError;
use crate::listing::RawListing;
use crate::parsers;
use crate::sources::ListingSource;
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tokio::time::{Duration, timeout};

/// Upper bound for loading and reading the page in the browser
const PAGE_TIMEOUT: Duration = Duration::from_secs(45);

/// Fetches the results page through a WebDriver-controlled browser, for pages
/// that only render their listings with JavaScript
pub struct WebDriverSource {
    endpoint: String,
    webdriver_url: String,
    user_agent: Option<String>,
    listing_selector: String,
}

impl WebDriverSource {
    pub fn new(
        endpoint: impl Into<String>,
        webdriver_url: impl Into<String>,
        listing_selector: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            webdriver_url: webdriver_url.into(),
            user_agent: None,
            listing_selector: listing_selector.into(),
        }
    }

    /// Browsers cannot take arbitrary request headers; only the user agent is carried over
    pub fn from_config(config: &WatchConfig) -> Self {
        let mut source = Self::new(
            config.endpoint.clone(),
            config.webdriver_url.clone(),
            config.listing_selector.clone(),
        );
        source.user_agent = user_agent(&config.headers);
        source
    }

    /// Loads the page and returns its rendered source
    async fn fetch_page(&self, client: &Client) -> Result<String, SourceError> {
        client
            .goto(&self.endpoint)
            .await
            .map_err(|e| navigation_error(e, "accessing", &self.endpoint))?;

        client
            .source()
            .await
            .map_err(|e| navigation_error(e, "getting source for", &self.endpoint))
    }
}

#[async_trait]
impl ListingSource for WebDriverSource {
    async fn fetch(&self) -> Result<mpsc::Receiver<RawListing>, SourceError> {
        ::log::info!("Fetching {} through {}", self.endpoint, self.webdriver_url);
        let start = std::time::Instant::now();

        let client = connect_to_webdriver(&self.webdriver_url, self.user_agent.as_deref()).await?;

        let page = match timeout(PAGE_TIMEOUT, self.fetch_page(&client)).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::WebDriver(format!(
                "timeout loading {}",
                self.endpoint
            ))),
        };

        if let Err(e) = client.close().await {
            ::log::warn!("Failed to close WebDriver session: {}", e);
        }

        let page = page?;
        ::log::debug!(
            "Rendered {} in {:.2} seconds",
            self.endpoint,
            start.elapsed().as_secs_f64()
        );

        parsers::stream_listings(page, &self.listing_selector)
    }

    fn name(&self) -> &'static str {
        "webdriver"
    }
}

/// Picks the user agent out of the configured headers
fn user_agent(headers: &BTreeMap<String, String>) -> Option<String> {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
        .map(|(_, value)| value.clone())
}

/// Headless browser capabilities, overriding the user agent when one is given
pub fn browser_capabilities(user_agent: Option<&str>) -> Map<String, Value> {
    let mut chrome_args = vec![Value::from("--headless")];
    let mut firefox = json!({ "args": ["-headless"] });

    if let Some(agent) = user_agent {
        chrome_args.push(Value::from(format!("--user-agent={}", agent)));
        firefox["prefs"] = json!({ "general.useragent.override": agent });
    }

    let mut caps = Map::new();
    caps.insert("goog:chromeOptions".to_string(), json!({ "args": chrome_args }));
    caps.insert("moz:firefoxOptions".to_string(), firefox);
    caps
}

/// Connects to the WebDriver instance, falling back to common local driver ports
async fn connect_to_webdriver(
    webdriver_url: &str,
    user_agent: Option<&str>,
) -> Result<Client, SourceError> {
    let mut builder = ClientBuilder::native();
    builder.capabilities(browser_capabilities(user_agent));

    match builder.connect(webdriver_url).await {
        Ok(client) => {
            ::log::debug!("Connected to WebDriver at {}", webdriver_url);
            return Ok(client);
        }
        Err(e) => {
            ::log::error!("Failed to connect to WebDriver at {}: {}", webdriver_url, e);
        }
    }

    let fallback_urls = [
        "http://localhost:9515", // ChromeDriver default
        "http://localhost:4444", // geckodriver / Selenium default
        "http://127.0.0.1:4444",
    ];

    for url in fallback_urls.iter() {
        if *url == webdriver_url {
            continue;
        }

        ::log::info!("Trying fallback WebDriver URL: {}", url);
        if let Ok(client) = builder.connect(url).await {
            ::log::debug!("Connected to fallback WebDriver at {}", url);
            return Ok(client);
        }
    }

    Err(SourceError::WebDriver(format!(
        "no WebDriver server reachable at {} (set WEBDRIVER_URL)",
        webdriver_url
    )))
}

/// Maps navigation failures, calling out lost sessions
fn navigation_error(error: fantoccini::error::CmdError, context: &str, url: &str) -> SourceError {
    if error.to_string().contains("Unable to find session") {
        ::log::warn!("Lost WebDriver session while {} {}", context, url);
    }
    SourceError::WebDriver(format!("failed {} {}: {}", context, url, error))
}
