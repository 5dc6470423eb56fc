pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;

pub use domain::decision::{Decision, DecisionAction};
pub use domain::market::{DemandLevel, MarketQuery, MarketSnapshot, PriceRange};
pub use domain::negotiation::{
    ListingId, Negotiation, NegotiationId, NegotiationStatus, SpaceCategory, UserId,
};
pub use domain::offer::{Offer, OfferId, OfferStatus, PartyRole};
pub use domain::preferences::{AgentPreferences, NegotiationStrategy, DEFAULT_MAX_COUNTER_OFFERS};
pub use engine::context::NegotiationContext;
pub use engine::counter::{counter_owner, counter_renter};
pub use engine::decision::DecisionEngine;
pub use errors::{ApplicationError, DomainError};
