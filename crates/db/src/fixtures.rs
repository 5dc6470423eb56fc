//! Deterministic demo fixtures: one driveway negotiation with an enabled
//! owner agent and an opening renter offer, ready for a first round.

use chrono::Utc;
use rust_decimal::Decimal;

use haggle_core::domain::negotiation::{
    ListingId, Negotiation, NegotiationId, NegotiationStatus, SpaceCategory, UserId,
};
use haggle_core::domain::offer::{Offer, OfferId, OfferStatus, PartyRole};
use haggle_core::domain::preferences::{AgentPreferences, NegotiationStrategy};

use crate::repositories::{
    NegotiationRepository, OfferRepository, PreferencesRepository, RepositoryError,
    SqlNegotiationRepository, SqlOfferRepository, SqlPreferencesRepository,
};
use crate::DbPool;

pub const DEMO_NEGOTIATION_ID: &str = "N-DEMO-0001";
pub const DEMO_OWNER_ID: &str = "U-DEMO-OWNER";
pub const DEMO_RENTER_ID: &str = "U-DEMO-RENTER";

pub async fn seed_demo(pool: &DbPool) -> Result<(), RepositoryError> {
    let negotiations = SqlNegotiationRepository::new(pool.clone());
    let offers = SqlOfferRepository::new(pool.clone());
    let preferences = SqlPreferencesRepository::new(pool.clone());

    let negotiation = Negotiation {
        id: NegotiationId(DEMO_NEGOTIATION_ID.to_string()),
        listing_id: ListingId("L-DEMO-0001".to_string()),
        owner_id: UserId(DEMO_OWNER_ID.to_string()),
        renter_id: UserId(DEMO_RENTER_ID.to_string()),
        listing_price: Decimal::new(2_000, 2),
        space_category: SpaceCategory::Driveway,
        location: "Portland, OR".to_string(),
        status: NegotiationStatus::Pending,
        agreed_price: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    negotiations.save(negotiation.clone()).await?;

    preferences
        .save_for_user(
            &negotiation.owner_id,
            AgentPreferences {
                enabled: true,
                strategy: NegotiationStrategy::Moderate,
                ..AgentPreferences::default()
            },
        )
        .await?;

    let opening_offer = Offer {
        id: OfferId("O-DEMO-0001".to_string()),
        negotiation_id: negotiation.id,
        price: Decimal::new(1_700, 2),
        from_party: PartyRole::Renter,
        to_party: PartyRole::Owner,
        message: Some("Would you take $17/hr for the month?".to_string()),
        status: OfferStatus::Pending,
        created_at: Utc::now(),
    };
    offers.insert(opening_offer).await?;

    Ok(())
}
