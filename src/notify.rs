use crate::config::WatchConfig;
use crate::error::NotifyError;
use crate::listing::ListingRecord;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Upper bound for one webhook delivery
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(15);

/// Delivers an alert for a qualifying listing
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver the alert. `Ok` means the listing may be marked as seen.
    async fn notify(&self, record: &ListingRecord) -> Result<(), NotifyError>;

    fn name(&self) -> &'static str;
}

/// Formats the alert text for a listing
#[derive(Debug, Clone)]
pub struct MessageFormat {
    /// Headline shown above every listing
    pub label: String,
    /// Currency marker printed before the price
    pub currency_marker: String,
}

impl MessageFormat {
    pub fn from_config(config: &WatchConfig) -> Self {
        Self {
            label: config.message_label(),
            currency_marker: config.currency_marker.clone(),
        }
    }

    pub fn format(&self, record: &ListingRecord) -> String {
        format!(
            "🐱 **{}**\n**{}**\n💰 {}{:.2}\n🔗 {}",
            self.label,
            record.title(),
            self.currency_marker,
            record.parsed_price(),
            record.link()
        )
    }
}

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    content: &'a str,
}

/// Posts alerts to a Discord-style webhook as `{"content": "..."}`
pub struct WebhookSink {
    client: reqwest::Client,
    webhook_url: String,
    format: MessageFormat,
}

impl WebhookSink {
    pub fn new(webhook_url: impl Into<String>, format: MessageFormat) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
            format,
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn notify(&self, record: &ListingRecord) -> Result<(), NotifyError> {
        let content = self.format.format(record);
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&WebhookMessage { content: &content })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }

        ::log::debug!("Webhook accepted alert for {}", record.identifier());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "webhook"
    }
}

/// Writes alerts to the log instead of sending them
pub struct LogSink {
    format: MessageFormat,
}

impl LogSink {
    pub fn new(format: MessageFormat) -> Self {
        Self { format }
    }
}

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, record: &ListingRecord) -> Result<(), NotifyError> {
        ::log::info!("Alert (not sent):\n{}", self.format.format(record));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Webhook sink when a webhook is configured, log sink for dry runs or without one
pub fn from_config(
    config: &WatchConfig,
    dry_run: bool,
) -> Result<Box<dyn NotificationSink>, NotifyError> {
    let format = MessageFormat::from_config(config);
    if dry_run {
        return Ok(Box::new(LogSink::new(format)));
    }

    match &config.webhook_url {
        Some(url) => Ok(Box::new(WebhookSink::new(url.clone(), format)?)),
        None => {
            ::log::warn!("No webhook configured, alerts will only be logged");
            Ok(Box::new(LogSink::new(format)))
        }
    }
}
