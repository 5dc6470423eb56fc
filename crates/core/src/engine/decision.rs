//! Accept/reject/counter rule evaluation for one negotiation round.
//!
//! Rules are evaluated in a fixed total order and the first match wins:
//! accept checks run before reject checks so a good-enough deal is never
//! shadowed by a floor or ceiling check, and the counter path is the
//! fallback when nothing else fires.

use rust_decimal::Decimal;

use crate::domain::decision::Decision;
use crate::domain::market::MarketSnapshot;
use crate::domain::offer::PartyRole;
use crate::domain::preferences::AgentPreferences;
use crate::engine::context::NegotiationContext;
use crate::engine::counter::{counter_owner, counter_renter};
use crate::errors::DomainError;

const ACCEPT_THRESHOLD_CONFIDENCE: f64 = 0.95;
const ACCEPT_MARKET_CONFIDENCE: f64 = 0.85;
const ACCEPT_BUDGET_CONFIDENCE: f64 = 0.9;
const ACCEPT_BARGAIN_CONFIDENCE: f64 = 0.95;
const REJECT_CONFIDENCE: f64 = 0.9;
const COUNTER_CONFIDENCE: f64 = 0.75;

#[derive(Clone, Copy, Debug, Default)]
pub struct DecisionEngine;

impl DecisionEngine {
    /// Evaluate the pending offer in `context` on behalf of `role` (the
    /// responding side). Refuses to decide for a side without explicit
    /// opt-in; callers are expected to have checked that already.
    pub fn decide(
        &self,
        context: &NegotiationContext,
        role: PartyRole,
        market: &MarketSnapshot,
    ) -> Result<Decision, DomainError> {
        let preferences = context
            .preferences_for(role)
            .ok_or(DomainError::MissingPreferences { role })?;
        if !preferences.enabled {
            return Err(DomainError::AgentDisabled { role });
        }
        if context.original_listing_price <= Decimal::ZERO {
            return Err(DomainError::InvariantViolation(
                "listing price must be positive".to_string(),
            ));
        }
        if market.average_price <= Decimal::ZERO {
            return Err(DomainError::InvariantViolation(
                "market average price must be positive".to_string(),
            ));
        }

        let decision = match role {
            PartyRole::Owner => decide_for_owner(context, preferences, market),
            PartyRole::Renter => decide_for_renter(context, preferences, market),
        };
        Ok(decision)
    }
}

fn decide_for_owner(
    context: &NegotiationContext,
    preferences: &AgentPreferences,
    market: &MarketSnapshot,
) -> Decision {
    let listing = context.original_listing_price;
    let offer = context.current_offer;
    let offer_ratio = offer / listing;

    if offer_ratio >= preferences.auto_accept_threshold {
        return Decision::accept(
            format!(
                "Offer of {offer} is {}% of the {listing} listing price, at or above the auto-accept threshold",
                percent(offer_ratio)
            ),
            ACCEPT_THRESHOLD_CONFIDENCE,
        );
    }

    if offer >= market.average_price && offer_ratio >= Decimal::new(85, 2) {
        return Decision::accept(
            format!(
                "Offer of {offer} meets the market average of {} for comparable spaces",
                market.average_price
            ),
            ACCEPT_MARKET_CONFIDENCE,
        );
    }

    let floor = preferences.floor_price(listing);
    if offer < floor {
        return Decision::reject(
            format!("Offer of {offer} is below the minimum acceptable price of {floor}"),
            REJECT_CONFIDENCE,
        );
    }

    let price = counter_owner(
        listing,
        offer,
        floor,
        market,
        preferences.strategy,
        context.round_number(),
    );
    Decision::counter(
        price,
        format!(
            "Countering at {price}, between the {offer} offer and the {listing} listing price given {:?} demand",
            market.demand_level
        ),
        COUNTER_CONFIDENCE,
    )
}

fn decide_for_renter(
    context: &NegotiationContext,
    preferences: &AgentPreferences,
    market: &MarketSnapshot,
) -> Decision {
    let listing = context.original_listing_price;
    let offer = context.current_offer;
    let average = market.average_price;
    let market_ratio = offer / average;
    let ceiling = preferences.ceiling_price(listing);

    if offer < average * Decimal::new(85, 2) {
        return Decision::accept(
            format!("Asking price of {offer} is well below the market average of {average}"),
            ACCEPT_BARGAIN_CONFIDENCE,
        );
    }

    if offer <= ceiling && market_ratio <= Decimal::new(110, 2) {
        return Decision::accept(
            format!(
                "Asking price of {offer} is within the {ceiling} budget and in line with the market average of {average}"
            ),
            ACCEPT_BUDGET_CONFIDENCE,
        );
    }

    if offer > ceiling * Decimal::new(115, 2) {
        return Decision::reject(
            format!("Asking price of {offer} is far above the maximum budget of {ceiling}"),
            REJECT_CONFIDENCE,
        );
    }

    let price = counter_renter(
        offer,
        ceiling,
        market,
        preferences.strategy,
        context.round_number(),
    );
    Decision::counter(
        price,
        format!(
            "Countering at {price}, anchored on the market average of {average} for comparable spaces"
        ),
        COUNTER_CONFIDENCE,
    )
}

fn percent(ratio: Decimal) -> Decimal {
    (ratio * Decimal::ONE_HUNDRED).round_dp(0)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::decision::DecisionAction;
    use crate::domain::market::{DemandLevel, MarketSnapshot, PriceRange};
    use crate::domain::negotiation::NegotiationId;
    use crate::domain::offer::{Offer, PartyRole};
    use crate::domain::preferences::AgentPreferences;
    use crate::engine::context::NegotiationContext;
    use crate::errors::DomainError;

    use super::DecisionEngine;

    fn market(average_cents: i64) -> MarketSnapshot {
        let average = Decimal::new(average_cents, 2);
        MarketSnapshot {
            average_price: average,
            median_price: average,
            price_range: PriceRange {
                min: (average * Decimal::new(80, 2)).round_dp(2),
                max: (average * Decimal::new(120, 2)).round_dp(2),
            },
            competitor_count: 6,
            demand_level: DemandLevel::Medium,
            seasonal_factor: 1.0,
        }
    }

    fn context(listing_cents: i64, offer_cents: i64, offered_by: PartyRole) -> NegotiationContext {
        let negotiation_id = NegotiationId("N-1".to_string());
        let offer = Offer::new(negotiation_id, Decimal::new(offer_cents, 2), offered_by, None);
        let enabled = AgentPreferences { enabled: true, ..AgentPreferences::default() };

        NegotiationContext {
            original_listing_price: Decimal::new(listing_cents, 2),
            current_offer: Decimal::new(offer_cents, 2),
            owner_preferences: Some(enabled.clone()),
            renter_preferences: Some(enabled),
            offer_history: vec![offer],
        }
    }

    #[test]
    fn owner_accepts_at_the_auto_accept_threshold() {
        // Listing $20/hr, offer $19.50: ratio 0.975 clears the 0.95 default.
        let engine = DecisionEngine;
        let decision = engine
            .decide(&context(2_000, 1_950, PartyRole::Renter), PartyRole::Owner, &market(1_800))
            .expect("decision");

        assert_eq!(decision.action, DecisionAction::Accept);
        assert_eq!(decision.confidence, 0.95);
        assert!(decision.reasoning.contains("auto-accept threshold"));
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let engine = DecisionEngine;

        // Exactly 0.95 of the listing price accepts.
        let at_threshold = engine
            .decide(&context(2_000, 1_900, PartyRole::Renter), PartyRole::Owner, &market(2_400))
            .expect("decision");
        assert_eq!(at_threshold.action, DecisionAction::Accept);
        assert_eq!(at_threshold.confidence, 0.95);

        // One cent below does not fire the threshold rule (the high market
        // average keeps the market-accept rule out of the way).
        let below_threshold = engine
            .decide(&context(2_000, 1_899, PartyRole::Renter), PartyRole::Owner, &market(2_400))
            .expect("decision");
        assert_ne!(below_threshold.confidence, 0.95);
    }

    #[test]
    fn owner_accepts_offers_that_clear_the_market_average() {
        let engine = DecisionEngine;
        let decision = engine
            .decide(&context(2_000, 1_750, PartyRole::Renter), PartyRole::Owner, &market(1_700))
            .expect("decision");

        assert_eq!(decision.action, DecisionAction::Accept);
        assert_eq!(decision.confidence, 0.85);
        assert!(decision.reasoning.contains("market average"));
    }

    #[test]
    fn owner_rejects_below_the_default_floor() {
        // Listing $20/hr: default floor is $14. One cent below rejects.
        let engine = DecisionEngine;
        let decision = engine
            .decide(&context(2_000, 1_399, PartyRole::Renter), PartyRole::Owner, &market(1_800))
            .expect("decision");

        assert_eq!(decision.action, DecisionAction::Reject);
        assert_eq!(decision.confidence, 0.9);
        assert!(decision.reasoning.contains("minimum acceptable price"));
    }

    #[test]
    fn reject_floor_boundary_is_inclusive() {
        // An offer exactly at the floor is not rejected; it counters.
        let engine = DecisionEngine;
        let decision = engine
            .decide(&context(2_000, 1_400, PartyRole::Renter), PartyRole::Owner, &market(1_800))
            .expect("decision");

        assert_eq!(decision.action, DecisionAction::Counter);
        assert_eq!(decision.confidence, 0.75);
    }

    #[test]
    fn owner_counters_mid_range_offers_near_the_blend_point() {
        // Listing $20/hr, market average $18, offer $17: moderate strategy
        // counters at 18.20 on round 1.
        let engine = DecisionEngine;
        let decision = engine
            .decide(&context(2_000, 1_700, PartyRole::Renter), PartyRole::Owner, &market(1_800))
            .expect("decision");

        assert_eq!(decision.action, DecisionAction::Counter);
        assert_eq!(decision.counter_price, Some(Decimal::new(1_820, 2)));
    }

    #[test]
    fn renter_accepts_within_budget_when_near_market() {
        // Listing $20/hr, owner asks $21 (within the $22 default budget),
        // market average $20.
        let engine = DecisionEngine;
        let decision = engine
            .decide(&context(2_000, 2_100, PartyRole::Owner), PartyRole::Renter, &market(2_000))
            .expect("decision");

        assert_eq!(decision.action, DecisionAction::Accept);
        assert_eq!(decision.confidence, 0.9);
    }

    #[test]
    fn renter_snaps_up_clear_bargains() {
        let engine = DecisionEngine;
        let decision = engine
            .decide(&context(2_000, 1_500, PartyRole::Owner), PartyRole::Renter, &market(2_000))
            .expect("decision");

        assert_eq!(decision.action, DecisionAction::Accept);
        assert_eq!(decision.confidence, 0.95);
        assert!(decision.reasoning.contains("below the market average"));
    }

    #[test]
    fn renter_rejects_far_above_budget() {
        // Default budget is $22; 1.15x that is $25.30.
        let engine = DecisionEngine;
        let decision = engine
            .decide(&context(2_000, 2_550, PartyRole::Owner), PartyRole::Renter, &market(2_000))
            .expect("decision");

        assert_eq!(decision.action, DecisionAction::Reject);
        assert_eq!(decision.confidence, 0.9);
    }

    #[test]
    fn renter_counters_anchored_on_the_market_average() {
        // Owner asks $23.50 against a $20 market average: above budget but
        // not far enough to walk away.
        let engine = DecisionEngine;
        let decision = engine
            .decide(&context(2_000, 2_350, PartyRole::Owner), PartyRole::Renter, &market(2_000))
            .expect("decision");

        assert_eq!(decision.action, DecisionAction::Counter);
        let price = decision.counter_price.expect("counter price");
        assert!(price <= Decimal::new(2_200, 2));
    }

    #[test]
    fn refuses_to_decide_without_preferences() {
        let engine = DecisionEngine;
        let mut context = context(2_000, 1_700, PartyRole::Renter);
        context.owner_preferences = None;

        let error = engine
            .decide(&context, PartyRole::Owner, &market(1_800))
            .expect_err("no preferences");
        assert_eq!(error, DomainError::MissingPreferences { role: PartyRole::Owner });
    }

    #[test]
    fn refuses_to_decide_for_a_disabled_agent() {
        let engine = DecisionEngine;
        let mut context = context(2_000, 1_700, PartyRole::Renter);
        context.owner_preferences = Some(AgentPreferences::default());

        let error = engine
            .decide(&context, PartyRole::Owner, &market(1_800))
            .expect_err("agent disabled");
        assert_eq!(error, DomainError::AgentDisabled { role: PartyRole::Owner });
    }
}
