//! Offline agent-vs-agent simulation over in-memory repositories and the
//! synthetic market provider. No database or external service required.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::commands::CommandResult;
use haggle_core::domain::negotiation::{
    ListingId, Negotiation, NegotiationId, NegotiationStatus, SpaceCategory, UserId,
};
use haggle_core::domain::offer::{Offer, PartyRole};
use haggle_core::domain::preferences::{AgentPreferences, NegotiationStrategy};
use haggle_db::repositories::{
    InMemoryNegotiationRepository, InMemoryOfferRepository, InMemoryPreferencesRepository,
    NegotiationRepository, OfferRepository, PreferencesRepository,
};
use haggle_market::{MarketDataProvider, SyntheticMarketDataProvider};
use haggle_notify::{NotificationDispatcher, TracingDispatcher};
use haggle_orchestrator::{NegotiationOrchestrator, OrchestratorConfig, RoundOutcome};

#[derive(Debug, Serialize)]
struct SimulationReport {
    command: &'static str,
    listing_price: String,
    opening_offer: String,
    owner_strategy: String,
    renter_strategy: String,
    rounds: Vec<RoundReport>,
    final_status: String,
    agreed_price: Option<String>,
}

#[derive(Debug, Serialize)]
struct RoundReport {
    round: u32,
    actor: &'static str,
    action: &'static str,
    price: Option<String>,
    detail: String,
}

pub fn run(
    listing_price: &str,
    opening_offer: &str,
    owner_strategy: &str,
    renter_strategy: &str,
    max_rounds: u32,
) -> CommandResult {
    let listing_price = match parse_price("listing-price", listing_price) {
        Ok(price) => price,
        Err(result) => return result,
    };
    let opening_offer = match parse_price("opening-offer", opening_offer) {
        Ok(price) => price,
        Err(result) => return result,
    };
    let owner_strategy = match parse_strategy("owner-strategy", owner_strategy) {
        Ok(strategy) => strategy,
        Err(result) => return result,
    };
    let renter_strategy = match parse_strategy("renter-strategy", renter_strategy) {
        Ok(strategy) => strategy,
        Err(result) => return result,
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "simulate",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    runtime.block_on(simulate(
        listing_price,
        opening_offer,
        owner_strategy,
        renter_strategy,
        max_rounds,
    ))
}

async fn simulate(
    listing_price: Decimal,
    opening_offer: Decimal,
    owner_strategy: NegotiationStrategy,
    renter_strategy: NegotiationStrategy,
    max_rounds: u32,
) -> CommandResult {
    let negotiations = Arc::new(InMemoryNegotiationRepository::default());
    let offers = Arc::new(InMemoryOfferRepository::default());
    let preferences = Arc::new(InMemoryPreferencesRepository::default());

    let orchestrator = NegotiationOrchestrator::new(
        Arc::clone(&negotiations) as Arc<dyn NegotiationRepository>,
        Arc::clone(&offers) as Arc<dyn OfferRepository>,
        Arc::clone(&preferences) as Arc<dyn PreferencesRepository>,
        Arc::new(TracingDispatcher) as Arc<dyn NotificationDispatcher>,
        Arc::new(SyntheticMarketDataProvider) as Arc<dyn MarketDataProvider>,
        OrchestratorConfig { round_delay: std::time::Duration::ZERO, auto_chain: false },
    );

    let negotiation = Negotiation {
        id: NegotiationId::generate(),
        listing_id: ListingId("L-SIM".to_string()),
        owner_id: UserId("sim-owner".to_string()),
        renter_id: UserId("sim-renter".to_string()),
        listing_price,
        space_category: SpaceCategory::Driveway,
        location: "Simulation City".to_string(),
        status: NegotiationStatus::Pending,
        agreed_price: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    if let Err(error) = negotiations.save(negotiation.clone()).await {
        return CommandResult::failure("simulate", "setup", error.to_string(), 4);
    }

    for (user, strategy) in [
        (&negotiation.owner_id, owner_strategy),
        (&negotiation.renter_id, renter_strategy),
    ] {
        let result = preferences
            .save_for_user(user, AgentPreferences { enabled: true, strategy, ..AgentPreferences::default() })
            .await;
        if let Err(error) = result {
            return CommandResult::failure("simulate", "setup", error.to_string(), 4);
        }
    }

    let opening =
        Offer::new(negotiation.id.clone(), opening_offer, PartyRole::Renter, None);
    if let Err(error) = offers.insert(opening).await {
        return CommandResult::failure("simulate", "setup", error.to_string(), 4);
    }

    let outcomes = match orchestrator.run_to_completion(&negotiation.id, max_rounds).await {
        Ok(outcomes) => outcomes,
        Err(error) => {
            return CommandResult::failure("simulate", "negotiation", error.to_string(), 5);
        }
    };

    let rounds = outcomes
        .iter()
        .enumerate()
        .map(|(index, outcome)| round_report(index, outcome))
        .collect();

    let final_negotiation = match negotiations.find_by_id(&negotiation.id).await {
        Ok(Some(negotiation)) => negotiation,
        Ok(None) => {
            return CommandResult::failure("simulate", "negotiation", "negotiation vanished", 5);
        }
        Err(error) => {
            return CommandResult::failure("simulate", "negotiation", error.to_string(), 5);
        }
    };

    let report = SimulationReport {
        command: "simulate",
        listing_price: listing_price.to_string(),
        opening_offer: opening_offer.to_string(),
        owner_strategy: strategy_label(owner_strategy).to_string(),
        renter_strategy: strategy_label(renter_strategy).to_string(),
        rounds,
        final_status: status_label(final_negotiation.status).to_string(),
        agreed_price: final_negotiation.agreed_price.map(|price| price.to_string()),
    };

    match serde_json::to_string_pretty(&report) {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => CommandResult::failure(
            "simulate",
            "serialization",
            format!("failed to serialize report: {error}"),
            3,
        ),
    }
}

fn round_report(index: usize, outcome: &RoundOutcome) -> RoundReport {
    // The opening offer comes from the renter, so responders alternate
    // owner-first.
    let actor = if index % 2 == 0 { "owner" } else { "renter" };
    let round = index as u32 + 1;

    match outcome {
        RoundOutcome::Accepted { price } => RoundReport {
            round,
            actor,
            action: "accept",
            price: Some(price.to_string()),
            detail: "agreement reached".to_string(),
        },
        RoundOutcome::Rejected { reasoning } => RoundReport {
            round,
            actor,
            action: "reject",
            price: None,
            detail: reasoning.clone(),
        },
        RoundOutcome::Countered { price, .. } => RoundReport {
            round,
            actor,
            action: "counter",
            price: Some(price.to_string()),
            detail: "counter-offer sent".to_string(),
        },
        RoundOutcome::Skipped(reason) => RoundReport {
            round,
            actor,
            action: "skipped",
            price: None,
            detail: format!("{reason:?}"),
        },
    }
}

fn parse_price(flag: &str, value: &str) -> Result<Decimal, CommandResult> {
    match value.parse::<Decimal>() {
        Ok(price) if price > Decimal::ZERO => Ok(price.round_dp(2)),
        Ok(_) => Err(CommandResult::failure(
            "simulate",
            "invalid_argument",
            format!("--{flag} must be positive"),
            2,
        )),
        Err(_) => Err(CommandResult::failure(
            "simulate",
            "invalid_argument",
            format!("--{flag} must be a decimal price, got `{value}`"),
            2,
        )),
    }
}

fn parse_strategy(flag: &str, value: &str) -> Result<NegotiationStrategy, CommandResult> {
    match value.trim().to_ascii_lowercase().as_str() {
        "aggressive" => Ok(NegotiationStrategy::Aggressive),
        "moderate" => Ok(NegotiationStrategy::Moderate),
        "conservative" => Ok(NegotiationStrategy::Conservative),
        other => Err(CommandResult::failure(
            "simulate",
            "invalid_argument",
            format!("--{flag} must be aggressive|moderate|conservative, got `{other}`"),
            2,
        )),
    }
}

fn strategy_label(strategy: NegotiationStrategy) -> &'static str {
    match strategy {
        NegotiationStrategy::Aggressive => "aggressive",
        NegotiationStrategy::Moderate => "moderate",
        NegotiationStrategy::Conservative => "conservative",
    }
}

fn status_label(status: NegotiationStatus) -> &'static str {
    match status {
        NegotiationStatus::Pending => "pending",
        NegotiationStatus::Negotiating => "negotiating",
        NegotiationStatus::Accepted => "accepted",
        NegotiationStatus::Rejected => "rejected",
    }
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn default_simulation_reaches_agreement() {
        let result = run("20.00", "15.00", "moderate", "moderate", 12);

        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("\"final_status\": \"accepted\""));
        assert!(result.output.contains("\"action\": \"counter\""));
    }

    #[test]
    fn invalid_strategy_is_rejected_up_front() {
        let result = run("20.00", "15.00", "ruthless", "moderate", 12);

        assert_eq!(result.exit_code, 2);
        assert!(result.output.contains("owner-strategy"));
    }

    #[test]
    fn invalid_price_is_rejected_up_front() {
        let result = run("twenty", "15.00", "moderate", "moderate", 12);

        assert_eq!(result.exit_code, 2);
        assert!(result.output.contains("listing-price"));
    }
}
