use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::negotiation::SpaceCategory;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandLevel {
    Low,
    Medium,
    High,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Decimal,
    pub max: Decimal,
}

/// Aggregated comparable-pricing statistics for a space category and rough
/// location. Derived fresh per negotiation round and never cached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub average_price: Decimal,
    pub median_price: Decimal,
    pub price_range: PriceRange,
    pub competitor_count: u32,
    pub demand_level: DemandLevel,
    pub seasonal_factor: f64,
}

impl MarketSnapshot {
    /// Conservative stand-in derived from the listing's own price, used
    /// whenever real comparables are unavailable. The engine always needs a
    /// snapshot to run, so the market boundary degrades to this instead of
    /// surfacing an error.
    pub fn synthetic(listing_price: Decimal) -> Self {
        let average = (listing_price * Decimal::new(95, 2)).round_dp(2);
        Self {
            average_price: average,
            median_price: average,
            price_range: PriceRange {
                min: (listing_price * Decimal::new(80, 2)).round_dp(2),
                max: (listing_price * Decimal::new(120, 2)).round_dp(2),
            },
            competitor_count: 0,
            demand_level: DemandLevel::Medium,
            seasonal_factor: 1.0,
        }
    }
}

/// What the market boundary needs to produce a snapshot: the comparables
/// query plus the listing price the synthetic fallback is derived from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketQuery {
    pub category: SpaceCategory,
    pub location: String,
    pub listing_price: Decimal,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{DemandLevel, MarketSnapshot};

    #[test]
    fn synthetic_snapshot_is_anchored_below_the_listing_price() {
        let snapshot = MarketSnapshot::synthetic(Decimal::new(2_000, 2));

        assert_eq!(snapshot.average_price, Decimal::new(1_900, 2));
        assert_eq!(snapshot.median_price, snapshot.average_price);
        assert_eq!(snapshot.price_range.min, Decimal::new(1_600, 2));
        assert_eq!(snapshot.price_range.max, Decimal::new(2_400, 2));
        assert_eq!(snapshot.competitor_count, 0);
        assert_eq!(snapshot.demand_level, DemandLevel::Medium);
    }
}
