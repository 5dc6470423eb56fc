use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use haggle_core::domain::market::{DemandLevel, MarketQuery, MarketSnapshot, PriceRange};
use haggle_core::domain::negotiation::SpaceCategory;

use crate::governor::RequestGovernor;
use crate::llm::LlmClient;

/// Supplies comparable-pricing statistics for a space category and rough
/// location. Infallible by contract: implementations degrade to the
/// synthetic snapshot instead of surfacing errors, because the decision
/// engine always needs a snapshot to run.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn snapshot(&self, query: &MarketQuery) -> MarketSnapshot;
}

/// Offline provider: always the synthetic snapshot. Used by the simulate
/// command and by tests that should not depend on the external service.
#[derive(Clone, Copy, Debug, Default)]
pub struct SyntheticMarketDataProvider;

#[async_trait]
impl MarketDataProvider for SyntheticMarketDataProvider {
    async fn snapshot(&self, query: &MarketQuery) -> MarketSnapshot {
        MarketSnapshot::synthetic(query.listing_price)
    }
}

/// Production provider: asks the external completion service for comparable
/// stats, under the governor's budget and retry policy. All failure modes
/// (budget blocked, transport errors, unusable payloads) fall back to the
/// synthetic snapshot.
pub struct LlmMarketDataProvider {
    governor: Arc<RequestGovernor>,
    client: Arc<dyn LlmClient>,
}

impl LlmMarketDataProvider {
    pub fn new(governor: Arc<RequestGovernor>, client: Arc<dyn LlmClient>) -> Self {
        Self { governor, client }
    }
}

#[async_trait]
impl MarketDataProvider for LlmMarketDataProvider {
    async fn snapshot(&self, query: &MarketQuery) -> MarketSnapshot {
        if !self.governor.reserve() {
            debug!(
                location = %query.location,
                "pricing request budget exhausted; using synthetic snapshot"
            );
            return MarketSnapshot::synthetic(query.listing_price);
        }

        let prompt = snapshot_prompt(query);
        let raw = match self
            .governor
            .execute_with_retry("market_snapshot", || self.client.complete(&prompt))
            .await
        {
            Ok(raw) => raw,
            Err(error) => {
                warn!(
                    location = %query.location,
                    error = %error,
                    "market data call failed; using synthetic snapshot"
                );
                return MarketSnapshot::synthetic(query.listing_price);
            }
        };

        match parse_snapshot(&raw) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(
                    location = %query.location,
                    error = %error,
                    "unusable market payload; using synthetic snapshot"
                );
                MarketSnapshot::synthetic(query.listing_price)
            }
        }
    }
}

fn category_label(category: SpaceCategory) -> &'static str {
    match category {
        SpaceCategory::Driveway => "driveway",
        SpaceCategory::Garage => "garage",
        SpaceCategory::StorageUnit => "storage unit",
        SpaceCategory::ParkingLot => "parking lot",
        SpaceCategory::Other => "private space",
    }
}

fn snapshot_prompt(query: &MarketQuery) -> String {
    format!(
        "You are a rental pricing analyst. Estimate current hourly market \
         statistics for renting a {category} near {location}. Respond with a \
         single JSON object and nothing else, using these keys: \
         average_price, median_price, min_price, max_price (numbers in USD), \
         competitor_count (integer), demand_level (\"low\", \"medium\" or \
         \"high\"), seasonal_factor (number around 1.0).",
        category = category_label(query.category),
        location = query.location,
    )
}

#[derive(Debug, Error)]
pub enum SnapshotParseError {
    #[error("payload contained no JSON object")]
    MissingJson,
    #[error("payload was not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("payload value out of range: {0}")]
    OutOfRange(String),
}

#[derive(Debug, Deserialize)]
struct RawMarketStats {
    average_price: f64,
    median_price: Option<f64>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    competitor_count: Option<u32>,
    demand_level: Option<String>,
    seasonal_factor: Option<f64>,
}

/// Coerce the external payload into a validated snapshot. Completion
/// output is free text, so the JSON object is cut out of whatever
/// surrounds it (prose, code fences) before decoding, and every numeric
/// field is range-checked here rather than trusted downstream.
pub fn parse_snapshot(raw: &str) -> Result<MarketSnapshot, SnapshotParseError> {
    let start = raw.find('{').ok_or(SnapshotParseError::MissingJson)?;
    let end = raw.rfind('}').ok_or(SnapshotParseError::MissingJson)?;
    if end < start {
        return Err(SnapshotParseError::MissingJson);
    }

    let stats: RawMarketStats = serde_json::from_str(&raw[start..=end])?;

    let average = to_price("average_price", stats.average_price)?;
    if average <= Decimal::ZERO {
        return Err(SnapshotParseError::OutOfRange(format!(
            "average_price must be positive, got {average}"
        )));
    }

    let median = match stats.median_price {
        Some(value) => to_price("median_price", value)?,
        None => average,
    };

    let mut min = match stats.min_price {
        Some(value) => to_price("min_price", value)?,
        None => (average * Decimal::new(80, 2)).round_dp(2),
    };
    let mut max = match stats.max_price {
        Some(value) => to_price("max_price", value)?,
        None => (average * Decimal::new(120, 2)).round_dp(2),
    };
    if min > max {
        std::mem::swap(&mut min, &mut max);
    }

    let demand_level = match stats.demand_level.as_deref() {
        Some("low") => DemandLevel::Low,
        Some("high") => DemandLevel::High,
        _ => DemandLevel::Medium,
    };

    let seasonal_factor = stats
        .seasonal_factor
        .filter(|factor| factor.is_finite())
        .map(|factor| factor.clamp(0.5, 2.0))
        .unwrap_or(1.0);

    Ok(MarketSnapshot {
        average_price: average,
        median_price: median,
        price_range: PriceRange { min, max },
        competitor_count: stats.competitor_count.unwrap_or(0),
        demand_level,
        seasonal_factor,
    })
}

fn to_price(field: &str, value: f64) -> Result<Decimal, SnapshotParseError> {
    if !value.is_finite() || value < 0.0 {
        return Err(SnapshotParseError::OutOfRange(format!("{field} was {value}")));
    }

    Decimal::from_f64_retain(value)
        .map(|price| price.round_dp(2))
        .ok_or_else(|| SnapshotParseError::OutOfRange(format!("{field} was {value}")))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use haggle_core::domain::market::{DemandLevel, MarketQuery, MarketSnapshot};
    use haggle_core::domain::negotiation::SpaceCategory;

    use crate::governor::{RequestGovernor, RetryPolicy};
    use crate::llm::LlmClient;

    use super::{parse_snapshot, LlmMarketDataProvider, MarketDataProvider};

    struct CannedClient {
        response: String,
        calls: AtomicU32,
    }

    impl CannedClient {
        fn new(response: &str) -> Self {
            Self { response: response.to_string(), calls: AtomicU32::new(0) }
        }
    }

    #[async_trait]
    impl LlmClient for CannedClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    struct FailingClient;

    #[async_trait]
    impl LlmClient for FailingClient {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Err(anyhow!("connection refused"))
        }
    }

    fn query() -> MarketQuery {
        MarketQuery {
            category: SpaceCategory::Driveway,
            location: "Seattle, WA".to_string(),
            listing_price: Decimal::new(2_000, 2),
        }
    }

    fn fast_governor(budget: u32) -> Arc<RequestGovernor> {
        Arc::new(RequestGovernor::new(
            budget,
            RetryPolicy { max_attempts: 2, base_delay_ms: 0, max_delay_ms: 0 },
        ))
    }

    #[test]
    fn parses_a_clean_payload() {
        let snapshot = parse_snapshot(
            r#"{"average_price": 18.5, "median_price": 18.0, "min_price": 14.0,
                "max_price": 24.0, "competitor_count": 7, "demand_level": "high",
                "seasonal_factor": 1.1}"#,
        )
        .expect("parse");

        assert_eq!(snapshot.average_price, Decimal::new(1_850, 2));
        assert_eq!(snapshot.median_price, Decimal::new(1_800, 2));
        assert_eq!(snapshot.competitor_count, 7);
        assert_eq!(snapshot.demand_level, DemandLevel::High);
        assert_eq!(snapshot.seasonal_factor, 1.1);
    }

    #[test]
    fn parses_a_fenced_payload_and_fills_defaults() {
        let snapshot = parse_snapshot(
            "Here are the stats:\n```json\n{\"average_price\": 20.0}\n```\n",
        )
        .expect("parse");

        assert_eq!(snapshot.average_price, Decimal::new(2_000, 2));
        assert_eq!(snapshot.median_price, snapshot.average_price);
        assert_eq!(snapshot.price_range.min, Decimal::new(1_600, 2));
        assert_eq!(snapshot.price_range.max, Decimal::new(2_400, 2));
        assert_eq!(snapshot.demand_level, DemandLevel::Medium);
        assert_eq!(snapshot.seasonal_factor, 1.0);
    }

    #[test]
    fn rejects_non_positive_and_malformed_payloads() {
        assert!(parse_snapshot(r#"{"average_price": -3.0}"#).is_err());
        assert!(parse_snapshot(r#"{"average_price": 0.0}"#).is_err());
        assert!(parse_snapshot("no json here").is_err());
        assert!(parse_snapshot(r#"{"average_price": "twenty"}"#).is_err());
    }

    #[test]
    fn swaps_an_inverted_price_range() {
        let snapshot = parse_snapshot(
            r#"{"average_price": 20.0, "min_price": 30.0, "max_price": 10.0}"#,
        )
        .expect("parse");

        assert_eq!(snapshot.price_range.min, Decimal::new(1_000, 2));
        assert_eq!(snapshot.price_range.max, Decimal::new(3_000, 2));
    }

    #[tokio::test]
    async fn provider_returns_parsed_snapshot_for_good_payloads() {
        let client = Arc::new(CannedClient::new(
            r#"{"average_price": 18.0, "demand_level": "low"}"#,
        ));
        let provider = LlmMarketDataProvider::new(fast_governor(10), client.clone());

        let snapshot = provider.snapshot(&query()).await;

        assert_eq!(snapshot.average_price, Decimal::new(1_800, 2));
        assert_eq!(snapshot.demand_level, DemandLevel::Low);
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_falls_back_when_the_service_fails() {
        let provider = LlmMarketDataProvider::new(fast_governor(10), Arc::new(FailingClient));

        let snapshot = provider.snapshot(&query()).await;

        assert_eq!(snapshot, MarketSnapshot::synthetic(Decimal::new(2_000, 2)));
    }

    #[tokio::test]
    async fn provider_falls_back_on_unusable_payloads() {
        let client = Arc::new(CannedClient::new("sorry, I cannot help with that"));
        let provider = LlmMarketDataProvider::new(fast_governor(10), client);

        let snapshot = provider.snapshot(&query()).await;

        assert_eq!(snapshot, MarketSnapshot::synthetic(Decimal::new(2_000, 2)));
    }

    #[tokio::test]
    async fn exhausted_budget_skips_the_service_entirely() {
        let client = Arc::new(CannedClient::new(r#"{"average_price": 18.0}"#));
        let provider = LlmMarketDataProvider::new(fast_governor(0), client.clone());

        let snapshot = provider.snapshot(&query()).await;

        assert_eq!(snapshot, MarketSnapshot::synthetic(Decimal::new(2_000, 2)));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }
}
