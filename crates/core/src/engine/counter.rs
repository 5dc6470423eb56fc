//! Counter-offer pricing math. Pure and deterministic: same inputs, same
//! price, which is what makes the convergence properties testable.

use rust_decimal::Decimal;

use crate::domain::market::{DemandLevel, MarketSnapshot};
use crate::domain::preferences::NegotiationStrategy;

/// Rounds over which the convergence pull ramps up to its ceiling.
const PULL_RAMP_ROUNDS: u32 = 5;

/// Owner-side counter: a strategy-weighted blend of the listing price and
/// the renter's offer, scaled by demand, then pulled toward the offer as
/// rounds accumulate so the chain narrows instead of oscillating.
pub fn counter_owner(
    original_price: Decimal,
    current_offer: Decimal,
    min_price: Decimal,
    market: &MarketSnapshot,
    strategy: NegotiationStrategy,
    round_number: u32,
) -> Decimal {
    let anchor_weight = match strategy {
        NegotiationStrategy::Aggressive => Decimal::new(70, 2),
        NegotiationStrategy::Moderate => Decimal::new(50, 2),
        NegotiationStrategy::Conservative => Decimal::new(40, 2),
    };

    let base = original_price * anchor_weight + current_offer * (Decimal::ONE - anchor_weight);
    let adjusted = base * demand_multiplier(market.demand_level);
    let pulled = pull_toward(
        adjusted,
        current_offer,
        progress_factor(round_number, Decimal::new(30, 2)),
    );

    pulled.max(min_price).round_dp(2)
}

/// Renter-side counter: anchored on the market average rather than the
/// listing price, and pulled toward the owner's offer faster than the
/// owner converges (progress ceiling 0.4 vs 0.3).
pub fn counter_renter(
    owner_offer: Decimal,
    max_price: Decimal,
    market: &MarketSnapshot,
    strategy: NegotiationStrategy,
    round_number: u32,
) -> Decimal {
    let average = market.average_price;
    let base = match strategy {
        NegotiationStrategy::Aggressive => average * Decimal::new(85, 2),
        NegotiationStrategy::Moderate => average * Decimal::new(95, 2),
        NegotiationStrategy::Conservative => (owner_offer + average) / Decimal::TWO,
    };

    let pulled = pull_toward(
        base,
        owner_offer,
        progress_factor(round_number, Decimal::new(40, 2)),
    );

    pulled.min(max_price).round_dp(2)
}

fn demand_multiplier(level: DemandLevel) -> Decimal {
    match level {
        DemandLevel::High => Decimal::new(105, 2),
        DemandLevel::Medium => Decimal::ONE,
        DemandLevel::Low => Decimal::new(95, 2),
    }
}

fn progress_factor(round_number: u32, ceiling: Decimal) -> Decimal {
    (Decimal::from(round_number) / Decimal::from(PULL_RAMP_ROUNDS)).min(ceiling)
}

fn pull_toward(value: Decimal, target: Decimal, factor: Decimal) -> Decimal {
    value + (target - value) * factor
}
