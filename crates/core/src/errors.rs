use thiserror::Error;

use crate::domain::negotiation::NegotiationStatus;
use crate::domain::offer::{OfferStatus, PartyRole};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid negotiation transition from {from:?} to {to:?}")]
    InvalidNegotiationTransition { from: NegotiationStatus, to: NegotiationStatus },
    #[error("invalid offer transition from {from:?} to {to:?}")]
    InvalidOfferTransition { from: OfferStatus, to: OfferStatus },
    #[error("automatic responses are not enabled for the {role:?} side")]
    AgentDisabled { role: PartyRole },
    #[error("no agent preferences available for the {role:?} side")]
    MissingPreferences { role: PartyRole },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[cfg(test)]
mod tests {
    use crate::domain::offer::PartyRole;

    use super::{ApplicationError, DomainError};

    #[test]
    fn domain_errors_lift_into_application_errors() {
        let application = ApplicationError::from(DomainError::AgentDisabled {
            role: PartyRole::Owner,
        });

        assert!(matches!(
            application,
            ApplicationError::Domain(DomainError::AgentDisabled { role: PartyRole::Owner })
        ));
    }

    #[test]
    fn persistence_errors_carry_their_message() {
        let error = ApplicationError::Persistence("database lock timeout".to_string());
        assert_eq!(error.to_string(), "persistence failure: database lock timeout");
    }
}
