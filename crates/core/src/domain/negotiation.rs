use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::offer::PartyRole;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NegotiationId(pub String);

impl NegotiationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Kind of private space the listing rents out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceCategory {
    Driveway,
    Garage,
    StorageUnit,
    ParkingLot,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationStatus {
    Pending,
    Negotiating,
    Accepted,
    Rejected,
}

impl NegotiationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }
}

/// The persistent aggregate for one owner/renter price negotiation over a
/// listing. Offers hang off this record; the agreed price is only set when
/// the negotiation reaches `Accepted`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Negotiation {
    pub id: NegotiationId,
    pub listing_id: ListingId,
    pub owner_id: UserId,
    pub renter_id: UserId,
    pub listing_price: Decimal,
    pub space_category: SpaceCategory,
    pub location: String,
    pub status: NegotiationStatus,
    pub agreed_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Negotiation {
    pub fn party_user(&self, role: PartyRole) -> &UserId {
        match role {
            PartyRole::Owner => &self.owner_id,
            PartyRole::Renter => &self.renter_id,
        }
    }

    pub fn can_transition_to(&self, next: NegotiationStatus) -> bool {
        matches!(
            (self.status, next),
            (NegotiationStatus::Pending, NegotiationStatus::Negotiating)
                | (NegotiationStatus::Pending, NegotiationStatus::Accepted)
                | (NegotiationStatus::Pending, NegotiationStatus::Rejected)
                | (NegotiationStatus::Negotiating, NegotiationStatus::Negotiating)
                | (NegotiationStatus::Negotiating, NegotiationStatus::Accepted)
                | (NegotiationStatus::Negotiating, NegotiationStatus::Rejected)
        )
    }

    pub fn transition_to(&mut self, next: NegotiationStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            self.updated_at = Utc::now();
            return Ok(());
        }

        Err(DomainError::InvalidNegotiationTransition { from: self.status, to: next })
    }

    /// Terminal acceptance: records the price both parties settled on.
    pub fn accept_at(&mut self, price: Decimal) -> Result<(), DomainError> {
        self.transition_to(NegotiationStatus::Accepted)?;
        self.agreed_price = Some(price);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{
        ListingId, Negotiation, NegotiationId, NegotiationStatus, SpaceCategory, UserId,
    };

    fn negotiation(status: NegotiationStatus) -> Negotiation {
        Negotiation {
            id: NegotiationId("N-1".to_string()),
            listing_id: ListingId("L-1".to_string()),
            owner_id: UserId("owner-1".to_string()),
            renter_id: UserId("renter-1".to_string()),
            listing_price: Decimal::new(2_000, 2),
            space_category: SpaceCategory::Driveway,
            location: "Portland, OR".to_string(),
            status,
            agreed_price: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn allows_pending_through_negotiating_to_accepted() {
        let mut negotiation = negotiation(NegotiationStatus::Pending);
        negotiation.transition_to(NegotiationStatus::Negotiating).expect("pending -> negotiating");
        negotiation
            .transition_to(NegotiationStatus::Negotiating)
            .expect("negotiating -> negotiating is another round");
        negotiation.accept_at(Decimal::new(1_850, 2)).expect("negotiating -> accepted");

        assert_eq!(negotiation.status, NegotiationStatus::Accepted);
        assert_eq!(negotiation.agreed_price, Some(Decimal::new(1_850, 2)));
    }

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        let mut accepted = negotiation(NegotiationStatus::Accepted);
        let error = accepted
            .transition_to(NegotiationStatus::Negotiating)
            .expect_err("accepted is terminal");
        assert!(matches!(
            error,
            crate::errors::DomainError::InvalidNegotiationTransition { .. }
        ));

        let mut rejected = negotiation(NegotiationStatus::Rejected);
        assert!(rejected.transition_to(NegotiationStatus::Accepted).is_err());
    }

    #[test]
    fn terminal_statuses_are_reported_as_terminal() {
        assert!(NegotiationStatus::Accepted.is_terminal());
        assert!(NegotiationStatus::Rejected.is_terminal());
        assert!(!NegotiationStatus::Negotiating.is_terminal());
        assert!(!NegotiationStatus::Pending.is_terminal());
    }
}
