use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use haggle_core::config::AppConfig;
use haggle_core::domain::decision::{Decision, DecisionAction};
use haggle_core::domain::market::MarketQuery;
use haggle_core::domain::negotiation::{Negotiation, NegotiationId, NegotiationStatus};
use haggle_core::domain::offer::{Offer, OfferStatus, PartyRole};
use haggle_core::domain::preferences::AgentPreferences;
use haggle_core::engine::context::NegotiationContext;
use haggle_core::engine::decision::DecisionEngine;
use haggle_core::errors::{ApplicationError, DomainError};
use haggle_db::repositories::{
    NegotiationRepository, OfferRepository, PreferencesRepository, RepositoryError,
};
use haggle_market::MarketDataProvider;
use haggle_notify::NotificationDispatcher;

use crate::outcome::{RoundOutcome, SkipReason};

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    /// Pause before a chained agent-vs-agent round fires. Zero is valid.
    pub round_delay: Duration,
    /// When false, counters never self-schedule the next round; callers
    /// drive rounds explicitly (simulate command, tests).
    pub auto_chain: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { round_delay: Duration::from_millis(1_500), auto_chain: true }
    }
}

impl OrchestratorConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            round_delay: Duration::from_millis(config.negotiation.round_delay_ms),
            auto_chain: true,
        }
    }
}

/// Executes one negotiation round at a time. Rounds for the same
/// negotiation are strictly sequential because every round re-reads the
/// persisted latest offer; scheduled rounds re-check that state on wake,
/// which is what logically cancels them when a human got there first.
#[derive(Clone)]
pub struct NegotiationOrchestrator {
    negotiations: Arc<dyn NegotiationRepository>,
    offers: Arc<dyn OfferRepository>,
    preferences: Arc<dyn PreferencesRepository>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    market: Arc<dyn MarketDataProvider>,
    engine: DecisionEngine,
    config: OrchestratorConfig,
}

impl NegotiationOrchestrator {
    pub fn new(
        negotiations: Arc<dyn NegotiationRepository>,
        offers: Arc<dyn OfferRepository>,
        preferences: Arc<dyn PreferencesRepository>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        market: Arc<dyn MarketDataProvider>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            negotiations,
            offers,
            preferences,
            dispatcher,
            market,
            engine: DecisionEngine,
            config,
        }
    }

    /// Entry point for an inbound offer event: evaluate the pending offer
    /// on behalf of the receiving side, if that side runs an agent.
    pub async fn handle_offer_event(
        &self,
        negotiation_id: &NegotiationId,
    ) -> Result<RoundOutcome, ApplicationError> {
        self.respond_once(negotiation_id).await
    }

    /// Re-entry point for scheduled rounds. Verifies the state still calls
    /// for an automatic response and no-ops otherwise.
    pub async fn trigger_next_round(
        &self,
        negotiation_id: &NegotiationId,
    ) -> Result<RoundOutcome, ApplicationError> {
        let outcome = self.respond_once(negotiation_id).await?;
        if let RoundOutcome::Skipped(reason) = &outcome {
            debug!(
                negotiation_id = %negotiation_id.0,
                reason = ?reason,
                "scheduled round was a no-op"
            );
        }
        Ok(outcome)
    }

    /// Drive chained rounds inline until the negotiation terminates or
    /// nobody is due to respond. The event-driven path schedules rounds
    /// asynchronously instead; this exists for simulation and operators.
    pub async fn run_to_completion(
        &self,
        negotiation_id: &NegotiationId,
        max_rounds: u32,
    ) -> Result<Vec<RoundOutcome>, ApplicationError> {
        let mut outcomes = Vec::new();
        for _ in 0..max_rounds {
            let outcome = self.respond_once(negotiation_id).await?;
            let done = !matches!(outcome, RoundOutcome::Countered { .. });
            outcomes.push(outcome);
            if done {
                break;
            }
        }
        Ok(outcomes)
    }

    async fn respond_once(
        &self,
        negotiation_id: &NegotiationId,
    ) -> Result<RoundOutcome, ApplicationError> {
        let negotiation = self
            .negotiations
            .find_by_id(negotiation_id)
            .await
            .map_err(persistence)?
            .ok_or_else(|| {
                ApplicationError::Persistence(format!(
                    "negotiation `{}` not found",
                    negotiation_id.0
                ))
            })?;

        if negotiation.status.is_terminal() {
            return Ok(RoundOutcome::Skipped(SkipReason::NegotiationTerminal));
        }

        let Some(latest) =
            self.offers.latest_for_negotiation(negotiation_id).await.map_err(persistence)?
        else {
            return Ok(RoundOutcome::Skipped(SkipReason::NoActiveOffer));
        };
        if !latest.is_pending() {
            return Ok(RoundOutcome::Skipped(SkipReason::OfferNotPending));
        }

        let responder = latest.to_party;
        let responder_user = negotiation.party_user(responder).clone();
        let Some(responder_preferences) =
            self.preferences.find_for_user(&responder_user).await.map_err(persistence)?
        else {
            debug!(
                negotiation_id = %negotiation_id.0,
                role = ?responder,
                "responding side has no agent preferences; offer stays pending"
            );
            return Ok(RoundOutcome::Skipped(SkipReason::AgentNotOptedIn));
        };
        if !responder_preferences.enabled {
            debug!(
                negotiation_id = %negotiation_id.0,
                role = ?responder,
                "responding side has not opted into automatic responses; offer stays pending"
            );
            return Ok(RoundOutcome::Skipped(SkipReason::AgentNotOptedIn));
        }

        let counterparty_user = negotiation.party_user(responder.counterparty());
        let counterparty_preferences =
            self.preferences.find_for_user(counterparty_user).await.map_err(persistence)?;

        let history =
            self.offers.history_for_negotiation(negotiation_id).await.map_err(persistence)?;
        let context = build_context(
            &negotiation,
            &latest,
            responder,
            responder_preferences.clone(),
            counterparty_preferences.clone(),
            history,
        );

        let decision = if context.round_number() >= responder_preferences.max_counter_offers {
            info!(
                negotiation_id = %negotiation_id.0,
                role = ?responder,
                round = context.round_number(),
                "negotiation round limit reached; forcing rejection"
            );
            Decision::reject(
                format!(
                    "Negotiation round limit of {} reached without agreement",
                    responder_preferences.max_counter_offers
                ),
                1.0,
            )
        } else {
            let query = MarketQuery {
                category: negotiation.space_category,
                location: negotiation.location.clone(),
                listing_price: negotiation.listing_price,
            };
            let snapshot = self.market.snapshot(&query).await;
            self.engine.decide(&context, responder, &snapshot)?
        };

        info!(
            negotiation_id = %negotiation_id.0,
            role = ?responder,
            round = context.round_number(),
            action = ?decision.action,
            confidence = decision.confidence,
            "negotiation round decided"
        );

        self.execute_decision(negotiation, latest, responder, counterparty_preferences, decision)
            .await
    }

    async fn execute_decision(
        &self,
        mut negotiation: Negotiation,
        mut latest: Offer,
        responder: PartyRole,
        counterparty_preferences: Option<AgentPreferences>,
        decision: Decision,
    ) -> Result<RoundOutcome, ApplicationError> {
        match decision.action {
            DecisionAction::Accept => {
                latest.transition_to(OfferStatus::Accepted)?;
                self.offers
                    .update_status(&latest.id, OfferStatus::Accepted)
                    .await
                    .map_err(persistence)?;
                negotiation.accept_at(latest.price)?;
                self.negotiations.save(negotiation.clone()).await.map_err(persistence)?;

                for user in [&negotiation.owner_id, &negotiation.renter_id] {
                    if let Err(error) =
                        self.dispatcher.notify_agreement_ready(user, &negotiation.id).await
                    {
                        warn!(
                            negotiation_id = %negotiation.id.0,
                            user_id = %user.0,
                            error = %error,
                            "agreement notification failed"
                        );
                    }
                }

                Ok(RoundOutcome::Accepted { price: latest.price })
            }
            DecisionAction::Reject => {
                latest.transition_to(OfferStatus::Rejected)?;
                self.offers
                    .update_status(&latest.id, OfferStatus::Rejected)
                    .await
                    .map_err(persistence)?;
                negotiation.transition_to(NegotiationStatus::Rejected)?;
                self.negotiations.save(negotiation.clone()).await.map_err(persistence)?;

                let offerer = negotiation.party_user(latest.from_party);
                if let Err(error) =
                    self.dispatcher.notify_rejection(offerer, &decision.reasoning).await
                {
                    warn!(
                        negotiation_id = %negotiation.id.0,
                        user_id = %offerer.0,
                        error = %error,
                        "rejection notification failed"
                    );
                }

                Ok(RoundOutcome::Rejected { reasoning: decision.reasoning })
            }
            DecisionAction::Counter => {
                let price = decision.counter_price.ok_or_else(|| {
                    ApplicationError::Domain(DomainError::InvariantViolation(
                        "counter decision carried no counter price".to_string(),
                    ))
                })?;

                latest.transition_to(OfferStatus::Superseded)?;
                self.offers
                    .update_status(&latest.id, OfferStatus::Superseded)
                    .await
                    .map_err(persistence)?;

                let counter_offer = Offer::new(
                    negotiation.id.clone(),
                    price,
                    responder,
                    Some(decision.reasoning.clone()),
                );
                self.offers.insert(counter_offer).await.map_err(persistence)?;

                negotiation.transition_to(NegotiationStatus::Negotiating)?;
                self.negotiations.save(negotiation.clone()).await.map_err(persistence)?;

                let offerer = negotiation.party_user(latest.from_party);
                if let Err(error) =
                    self.dispatcher.notify_offer(offerer, price, &decision.reasoning).await
                {
                    warn!(
                        negotiation_id = %negotiation.id.0,
                        user_id = %offerer.0,
                        error = %error,
                        "counter-offer notification failed"
                    );
                }

                let counterparty_has_agent =
                    counterparty_preferences.map(|p| p.enabled).unwrap_or(false);
                let next_round_scheduled = counterparty_has_agent && self.config.auto_chain;
                if next_round_scheduled {
                    self.schedule_next_round(negotiation.id.clone());
                }

                Ok(RoundOutcome::Countered { price, next_round_scheduled })
            }
        }
    }

    /// Delayed task for the next agent-vs-agent round. The wake-side state
    /// re-check in `respond_once` is the cancellation mechanism: if a human
    /// answered in the meantime, the task finds nothing pending and stops.
    fn schedule_next_round(&self, negotiation_id: NegotiationId) {
        let orchestrator = self.clone();
        let delay = self.config.round_delay;
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match orchestrator.trigger_next_round(&negotiation_id).await {
                Ok(outcome) => {
                    debug!(
                        negotiation_id = %negotiation_id.0,
                        outcome = ?outcome,
                        "scheduled round completed"
                    );
                }
                Err(error) => {
                    warn!(
                        negotiation_id = %negotiation_id.0,
                        error = %error,
                        "scheduled round failed; offer stays pending for a human"
                    );
                }
            }
        });
    }
}

fn build_context(
    negotiation: &Negotiation,
    latest: &Offer,
    responder: PartyRole,
    responder_preferences: AgentPreferences,
    counterparty_preferences: Option<AgentPreferences>,
    history: Vec<Offer>,
) -> NegotiationContext {
    let (owner_preferences, renter_preferences) = match responder {
        PartyRole::Owner => (Some(responder_preferences), counterparty_preferences),
        PartyRole::Renter => (counterparty_preferences, Some(responder_preferences)),
    };

    NegotiationContext {
        original_listing_price: negotiation.listing_price,
        current_offer: latest.price,
        owner_preferences,
        renter_preferences,
        offer_history: history,
    }
}

fn persistence(error: RepositoryError) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}
