use async_trait::async_trait;
use thiserror::Error;

use haggle_core::domain::negotiation::{Negotiation, NegotiationId, UserId};
use haggle_core::domain::offer::{Offer, OfferId, OfferStatus};
use haggle_core::domain::preferences::AgentPreferences;

pub mod memory;
pub mod negotiation;
pub mod offer;
pub mod preferences;

pub use memory::{
    InMemoryNegotiationRepository, InMemoryOfferRepository, InMemoryPreferencesRepository,
};
pub use negotiation::SqlNegotiationRepository;
pub use offer::SqlOfferRepository;
pub use preferences::SqlPreferencesRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("not found: {0}")]
    NotFound(String),
}

#[async_trait]
pub trait NegotiationRepository: Send + Sync {
    async fn find_by_id(&self, id: &NegotiationId)
        -> Result<Option<Negotiation>, RepositoryError>;
    async fn save(&self, negotiation: Negotiation) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait OfferRepository: Send + Sync {
    async fn insert(&self, offer: Offer) -> Result<(), RepositoryError>;
    async fn update_status(&self, id: &OfferId, status: OfferStatus)
        -> Result<(), RepositoryError>;
    /// The most recent offer on the negotiation, regardless of status.
    async fn latest_for_negotiation(
        &self,
        negotiation_id: &NegotiationId,
    ) -> Result<Option<Offer>, RepositoryError>;
    /// Full offer chain for the negotiation, most-recent-first.
    async fn history_for_negotiation(
        &self,
        negotiation_id: &NegotiationId,
    ) -> Result<Vec<Offer>, RepositoryError>;
}

#[async_trait]
pub trait PreferencesRepository: Send + Sync {
    async fn find_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<AgentPreferences>, RepositoryError>;
    async fn save_for_user(
        &self,
        user_id: &UserId,
        preferences: AgentPreferences,
    ) -> Result<(), RepositoryError>;
}
