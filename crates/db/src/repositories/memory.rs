use std::collections::HashMap;

use tokio::sync::RwLock;

use haggle_core::domain::negotiation::{Negotiation, NegotiationId, UserId};
use haggle_core::domain::offer::{Offer, OfferId, OfferStatus};
use haggle_core::domain::preferences::AgentPreferences;

use super::{
    NegotiationRepository, OfferRepository, PreferencesRepository, RepositoryError,
};

#[derive(Default)]
pub struct InMemoryNegotiationRepository {
    negotiations: RwLock<HashMap<String, Negotiation>>,
}

#[async_trait::async_trait]
impl NegotiationRepository for InMemoryNegotiationRepository {
    async fn find_by_id(
        &self,
        id: &NegotiationId,
    ) -> Result<Option<Negotiation>, RepositoryError> {
        let negotiations = self.negotiations.read().await;
        Ok(negotiations.get(&id.0).cloned())
    }

    async fn save(&self, negotiation: Negotiation) -> Result<(), RepositoryError> {
        let mut negotiations = self.negotiations.write().await;
        negotiations.insert(negotiation.id.0.clone(), negotiation);
        Ok(())
    }
}

/// Offers are kept in insertion order, which doubles as the time order the
/// SQL repository gets from `created_at`.
#[derive(Default)]
pub struct InMemoryOfferRepository {
    offers: RwLock<Vec<Offer>>,
}

#[async_trait::async_trait]
impl OfferRepository for InMemoryOfferRepository {
    async fn insert(&self, offer: Offer) -> Result<(), RepositoryError> {
        let mut offers = self.offers.write().await;
        offers.push(offer);
        Ok(())
    }

    async fn update_status(
        &self,
        id: &OfferId,
        status: OfferStatus,
    ) -> Result<(), RepositoryError> {
        let mut offers = self.offers.write().await;
        match offers.iter_mut().find(|offer| offer.id == *id) {
            Some(offer) => {
                offer.status = status;
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("offer `{}`", id.0))),
        }
    }

    async fn latest_for_negotiation(
        &self,
        negotiation_id: &NegotiationId,
    ) -> Result<Option<Offer>, RepositoryError> {
        let offers = self.offers.read().await;
        Ok(offers.iter().rev().find(|offer| offer.negotiation_id == *negotiation_id).cloned())
    }

    async fn history_for_negotiation(
        &self,
        negotiation_id: &NegotiationId,
    ) -> Result<Vec<Offer>, RepositoryError> {
        let offers = self.offers.read().await;
        Ok(offers
            .iter()
            .rev()
            .filter(|offer| offer.negotiation_id == *negotiation_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryPreferencesRepository {
    preferences: RwLock<HashMap<String, AgentPreferences>>,
}

#[async_trait::async_trait]
impl PreferencesRepository for InMemoryPreferencesRepository {
    async fn find_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<AgentPreferences>, RepositoryError> {
        let preferences = self.preferences.read().await;
        Ok(preferences.get(&user_id.0).cloned())
    }

    async fn save_for_user(
        &self,
        user_id: &UserId,
        preferences: AgentPreferences,
    ) -> Result<(), RepositoryError> {
        let mut store = self.preferences.write().await;
        store.insert(user_id.0.clone(), preferences);
        Ok(())
    }
}
