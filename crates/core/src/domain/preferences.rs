use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_COUNTER_OFFERS: u32 = 5;

/// How hard an unattended agent bargains on behalf of its party.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationStrategy {
    Aggressive,
    Moderate,
    Conservative,
}

/// Per-user agent configuration. `enabled` defaults to false: the engine
/// never responds for a party that has not explicitly opted in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentPreferences {
    pub enabled: bool,
    pub min_acceptable_price: Option<Decimal>,
    pub max_acceptable_price: Option<Decimal>,
    pub auto_accept_threshold: Decimal,
    pub strategy: NegotiationStrategy,
    pub max_counter_offers: u32,
}

impl Default for AgentPreferences {
    fn default() -> Self {
        Self {
            enabled: false,
            min_acceptable_price: None,
            max_acceptable_price: None,
            auto_accept_threshold: Decimal::new(95, 2),
            strategy: NegotiationStrategy::Moderate,
            max_counter_offers: DEFAULT_MAX_COUNTER_OFFERS,
        }
    }
}

impl AgentPreferences {
    /// Lowest price an owner-side agent will entertain. Falls back to 70%
    /// of the listing price when the owner has not set an explicit floor.
    pub fn floor_price(&self, listing_price: Decimal) -> Decimal {
        self.min_acceptable_price
            .unwrap_or_else(|| (listing_price * Decimal::new(70, 2)).round_dp(2))
    }

    /// Highest price a renter-side agent will entertain. Falls back to 110%
    /// of the listing price when the renter has not set an explicit budget.
    pub fn ceiling_price(&self, listing_price: Decimal) -> Decimal {
        self.max_acceptable_price
            .unwrap_or_else(|| (listing_price * Decimal::new(110, 2)).round_dp(2))
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{AgentPreferences, NegotiationStrategy};

    #[test]
    fn agents_are_disabled_unless_opted_in() {
        let preferences = AgentPreferences::default();
        assert!(!preferences.enabled);
        assert_eq!(preferences.strategy, NegotiationStrategy::Moderate);
        assert_eq!(preferences.auto_accept_threshold, Decimal::new(95, 2));
    }

    #[test]
    fn price_bounds_fall_back_to_listing_ratios() {
        let preferences = AgentPreferences::default();
        let listing = Decimal::new(2_000, 2);

        assert_eq!(preferences.floor_price(listing), Decimal::new(1_400, 2));
        assert_eq!(preferences.ceiling_price(listing), Decimal::new(2_200, 2));
    }

    #[test]
    fn explicit_price_bounds_win_over_defaults() {
        let preferences = AgentPreferences {
            min_acceptable_price: Some(Decimal::new(1_550, 2)),
            max_acceptable_price: Some(Decimal::new(2_050, 2)),
            ..AgentPreferences::default()
        };
        let listing = Decimal::new(2_000, 2);

        assert_eq!(preferences.floor_price(listing), Decimal::new(1_550, 2));
        assert_eq!(preferences.ceiling_price(listing), Decimal::new(2_050, 2));
    }
}
