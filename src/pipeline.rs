use crate::config::WatchConfig;
use crate::error::{ConfigError, WatchError};
use crate::filter::QualificationRule;
use crate::listing::ListingRecord;
use crate::notify::{self, NotificationSink};
use crate::price::PriceExtractor;
use crate::seen::{JsonFileStore, SeenStore};
use crate::sources::{self, ListingSource};
use url::Url;

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Fragments received from the listing source
    pub fragments: usize,
    /// Fragments skipped for lack of a link
    pub malformed: usize,
    /// Listings that passed the qualification rule
    pub qualified: usize,
    /// Alerts delivered
    pub notified: usize,
    /// Alerts that could not be delivered
    pub failed: usize,
}

/// One end-to-end watch run: load seen set, fetch, qualify, notify, persist
pub struct Pipeline {
    base_url: Url,
    rule: QualificationRule,
    prices: PriceExtractor,
    store: Box<dyn SeenStore>,
    source: Box<dyn ListingSource>,
    sink: Box<dyn NotificationSink>,
    persist_each_notification: bool,
    dry_run: bool,
}

impl Pipeline {
    /// Create a pipeline from explicit collaborators
    pub fn new(
        config: &WatchConfig,
        store: Box<dyn SeenStore>,
        source: Box<dyn ListingSource>,
        sink: Box<dyn NotificationSink>,
    ) -> Result<Self, WatchError> {
        config.validate()?;

        let prices =
            PriceExtractor::new(&config.currency_marker).map_err(|e| ConfigError::Invalid {
                field: "currency_marker",
                reason: e.to_string(),
            })?;

        Ok(Self {
            base_url: config.endpoint_url()?,
            rule: QualificationRule::new(&config.keyword, config.price_ceiling),
            prices,
            store,
            source,
            sink,
            persist_each_notification: config.persist_each_notification,
            dry_run: false,
        })
    }

    /// Create a pipeline with the file store, source and sink selected by `config`.
    ///
    /// A dry run logs alerts instead of sending them and never writes the store.
    pub fn from_config(config: &WatchConfig, dry_run: bool) -> Result<Self, WatchError> {
        let store = Box::new(JsonFileStore::new(&config.store_location));
        let source = sources::from_config(config)?;
        let sink = notify::from_config(config, dry_run)?;
        Ok(Self::new(config, store, source, sink)?.with_dry_run(dry_run))
    }

    /// Deliver alerts but never write the seen store
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run once.
    ///
    /// Only load, fetch and persist failures abort the run. Listings without a
    /// link are skipped and failed alerts are retried on the next run.
    pub async fn run(&self) -> Result<RunSummary, WatchError> {
        let mut seen = self.store.load()?;
        ::log::info!(
            "Checking for \"{}\" below {} ({} already notified, alerts via {})",
            self.rule.keyword(),
            self.rule.price_ceiling(),
            seen.len(),
            self.sink.name()
        );

        let mut listings = self.source.fetch().await?;
        let mut summary = RunSummary::default();

        while let Some(raw) = listings.recv().await {
            summary.fragments += 1;

            let Some(record) = ListingRecord::from_raw(&raw, &self.base_url, &self.prices) else {
                summary.malformed += 1;
                ::log::debug!("Skipping listing without link: {:?}", raw.text);
                continue;
            };

            ::log::info!("{}", record.title());

            if let Some(reason) = self.rule.rejection(&record, &seen) {
                ::log::debug!("Skipping {}: {}", record.identifier(), reason);
                continue;
            }

            summary.qualified += 1;
            ::log::info!(
                "New listing found: {} - {:.2}",
                record.title(),
                record.parsed_price()
            );

            match self.sink.notify(&record).await {
                Ok(()) => {
                    seen.add(record.identifier());
                    summary.notified += 1;
                    if self.persist_each_notification && !self.dry_run {
                        self.store.persist(&seen)?;
                    }
                }
                Err(e) => {
                    summary.failed += 1;
                    ::log::warn!("Failed to notify {}: {}", record.identifier(), e);
                }
            }
        }

        ::log::info!(
            "Processed {} listings from {} source: {} new, {} sent, {} failed",
            summary.fragments,
            self.source.name(),
            summary.qualified,
            summary.notified,
            summary.failed
        );

        if self.dry_run {
            ::log::info!("Dry run, seen store left untouched");
        } else {
            self.store.persist(&seen)?;
        }

        Ok(summary)
    }
}
