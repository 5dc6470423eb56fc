use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::negotiation::NegotiationId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OfferId(pub String);

impl OfferId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// Which side of the negotiation a party is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartyRole {
    Owner,
    Renter,
}

impl PartyRole {
    pub fn counterparty(self) -> Self {
        match self {
            Self::Owner => Self::Renter,
            Self::Renter => Self::Owner,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
    Superseded,
}

/// One priced proposal in a negotiation, directional from one party to the
/// other. Offers are append-only: a pending offer moves to exactly one of
/// the terminal statuses and is never edited in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub negotiation_id: NegotiationId,
    pub price: Decimal,
    pub from_party: PartyRole,
    pub to_party: PartyRole,
    pub message: Option<String>,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
}

impl Offer {
    pub fn new(
        negotiation_id: NegotiationId,
        price: Decimal,
        from_party: PartyRole,
        message: Option<String>,
    ) -> Self {
        Self {
            id: OfferId::generate(),
            negotiation_id,
            price,
            from_party,
            to_party: from_party.counterparty(),
            message,
            status: OfferStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == OfferStatus::Pending
    }

    pub fn can_transition_to(&self, next: OfferStatus) -> bool {
        matches!(
            (self.status, next),
            (OfferStatus::Pending, OfferStatus::Accepted)
                | (OfferStatus::Pending, OfferStatus::Rejected)
                | (OfferStatus::Pending, OfferStatus::Superseded)
        )
    }

    pub fn transition_to(&mut self, next: OfferStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidOfferTransition { from: self.status, to: next })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::negotiation::NegotiationId;

    use super::{Offer, OfferStatus, PartyRole};

    fn offer() -> Offer {
        Offer::new(
            NegotiationId("N-1".to_string()),
            Decimal::new(1_500, 2),
            PartyRole::Renter,
            Some("opening offer".to_string()),
        )
    }

    #[test]
    fn new_offers_are_pending_and_directed_at_the_counterparty() {
        let offer = offer();
        assert!(offer.is_pending());
        assert_eq!(offer.from_party, PartyRole::Renter);
        assert_eq!(offer.to_party, PartyRole::Owner);
    }

    #[test]
    fn pending_offers_can_reach_each_terminal_status() {
        for next in [OfferStatus::Accepted, OfferStatus::Rejected, OfferStatus::Superseded] {
            let mut offer = offer();
            offer.transition_to(next).expect("pending -> terminal");
            assert_eq!(offer.status, next);
        }
    }

    #[test]
    fn terminal_offers_cannot_move_again() {
        let mut offer = offer();
        offer.transition_to(OfferStatus::Superseded).expect("pending -> superseded");

        let error = offer
            .transition_to(OfferStatus::Accepted)
            .expect_err("superseded offers are immutable");
        assert!(matches!(error, crate::errors::DomainError::InvalidOfferTransition { .. }));
    }
}
