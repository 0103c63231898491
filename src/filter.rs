use crate::listing::ListingRecord;
use crate::seen::SeenSet;
use std::fmt;

/// Returns true if `record` is a new listing matching `keyword` and priced below `price_ceiling`.
///
/// The keyword match is case-insensitive. A listing without a known price
/// (`f64::INFINITY`) never qualifies.
pub fn qualifies(
    record: &ListingRecord,
    seen_set: &SeenSet,
    keyword: &str,
    price_ceiling: f64,
) -> bool {
    QualificationRule::new(keyword, price_ceiling).qualifies(record, seen_set)
}

/// Why a listing did not qualify
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The listing was already notified
    Seen,
    /// The title does not contain the keyword
    KeywordMissing,
    /// The price is unknown or not below the ceiling
    OverCeiling,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Seen => write!(f, "already notified"),
            Rejection::KeywordMissing => write!(f, "keyword not in title"),
            Rejection::OverCeiling => write!(f, "price not below ceiling"),
        }
    }
}

/// Keyword and price ceiling a listing must satisfy to be notified
#[derive(Debug, Clone)]
pub struct QualificationRule {
    keyword: String,
    price_ceiling: f64,
}

impl QualificationRule {
    /// Create a rule; the keyword is matched case-insensitively
    pub fn new(keyword: &str, price_ceiling: f64) -> Self {
        Self {
            keyword: keyword.to_lowercase(),
            price_ceiling,
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn price_ceiling(&self) -> f64 {
        self.price_ceiling
    }

    /// Determine if a listing should be notified
    pub fn qualifies(&self, record: &ListingRecord, seen_set: &SeenSet) -> bool {
        self.rejection(record, seen_set).is_none()
    }

    /// The first rule the listing fails, or `None` if it qualifies
    pub fn rejection(&self, record: &ListingRecord, seen_set: &SeenSet) -> Option<Rejection> {
        if seen_set.contains(record.identifier()) {
            return Some(Rejection::Seen);
        }

        if !record.title().to_lowercase().contains(&self.keyword) {
            return Some(Rejection::KeywordMissing);
        }

        // Strict comparison; NaN and infinity both fail
        let below_ceiling = record.parsed_price() < self.price_ceiling;
        if !below_ceiling {
            return Some(Rejection::OverCeiling);
        }

        None
    }
}
