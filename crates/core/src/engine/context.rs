use rust_decimal::Decimal;

use crate::domain::offer::{Offer, PartyRole};
use crate::domain::preferences::AgentPreferences;

/// Everything the engine reasons over for one round. Absence of a side's
/// preferences means that side is human-controlled and must never be
/// auto-responded for.
#[derive(Clone, Debug)]
pub struct NegotiationContext {
    pub original_listing_price: Decimal,
    pub current_offer: Decimal,
    pub owner_preferences: Option<AgentPreferences>,
    pub renter_preferences: Option<AgentPreferences>,
    /// Most-recent-first, including the offer currently under evaluation.
    pub offer_history: Vec<Offer>,
}

impl NegotiationContext {
    pub fn round_number(&self) -> u32 {
        self.offer_history.len() as u32
    }

    pub fn preferences_for(&self, role: PartyRole) -> Option<&AgentPreferences> {
        match role {
            PartyRole::Owner => self.owner_preferences.as_ref(),
            PartyRole::Renter => self.renter_preferences.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::negotiation::NegotiationId;
    use crate::domain::offer::{Offer, PartyRole};
    use crate::domain::preferences::AgentPreferences;

    use super::NegotiationContext;

    #[test]
    fn round_number_tracks_history_length() {
        let negotiation_id = NegotiationId("N-1".to_string());
        let history = vec![
            Offer::new(negotiation_id.clone(), Decimal::new(1_820, 2), PartyRole::Owner, None),
            Offer::new(negotiation_id, Decimal::new(1_700, 2), PartyRole::Renter, None),
        ];

        let context = NegotiationContext {
            original_listing_price: Decimal::new(2_000, 2),
            current_offer: Decimal::new(1_820, 2),
            owner_preferences: Some(AgentPreferences::default()),
            renter_preferences: None,
            offer_history: history,
        };

        assert_eq!(context.round_number(), 2);
        assert!(context.preferences_for(PartyRole::Owner).is_some());
        assert!(context.preferences_for(PartyRole::Renter).is_none());
    }
}
