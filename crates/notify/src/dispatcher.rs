use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use haggle_core::domain::negotiation::{NegotiationId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// A new or countered price landed in the recipient's inbox.
    async fn notify_offer(
        &self,
        to_user: &UserId,
        price: Decimal,
        reasoning: &str,
    ) -> Result<(), DispatchError>;

    /// Both sides settled; the agreement is ready to finalize.
    async fn notify_agreement_ready(
        &self,
        user: &UserId,
        negotiation_id: &NegotiationId,
    ) -> Result<(), DispatchError>;

    async fn notify_rejection(&self, user: &UserId, reasoning: &str)
        -> Result<(), DispatchError>;
}

/// Production dispatcher backed by structured logs. The surrounding
/// application tails these events into its own delivery channels.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingDispatcher;

#[async_trait]
impl NotificationDispatcher for TracingDispatcher {
    async fn notify_offer(
        &self,
        to_user: &UserId,
        price: Decimal,
        reasoning: &str,
    ) -> Result<(), DispatchError> {
        info!(
            event_name = "notify.offer",
            user_id = %to_user.0,
            price = %price,
            reasoning,
            "offer notification"
        );
        Ok(())
    }

    async fn notify_agreement_ready(
        &self,
        user: &UserId,
        negotiation_id: &NegotiationId,
    ) -> Result<(), DispatchError> {
        info!(
            event_name = "notify.agreement_ready",
            user_id = %user.0,
            negotiation_id = %negotiation_id.0,
            "agreement-ready notification"
        );
        Ok(())
    }

    async fn notify_rejection(
        &self,
        user: &UserId,
        reasoning: &str,
    ) -> Result<(), DispatchError> {
        info!(
            event_name = "notify.rejection",
            user_id = %user.0,
            reasoning,
            "rejection notification"
        );
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SentNotification {
    Offer { to_user: UserId, price: Decimal, reasoning: String },
    AgreementReady { user: UserId, negotiation_id: NegotiationId },
    Rejection { user: UserId, reasoning: String },
}

/// Recording dispatcher for tests and the simulate command.
#[derive(Default)]
pub struct InMemoryDispatcher {
    sent: Mutex<Vec<SentNotification>>,
}

impl InMemoryDispatcher {
    pub async fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotificationDispatcher for InMemoryDispatcher {
    async fn notify_offer(
        &self,
        to_user: &UserId,
        price: Decimal,
        reasoning: &str,
    ) -> Result<(), DispatchError> {
        self.sent.lock().await.push(SentNotification::Offer {
            to_user: to_user.clone(),
            price,
            reasoning: reasoning.to_string(),
        });
        Ok(())
    }

    async fn notify_agreement_ready(
        &self,
        user: &UserId,
        negotiation_id: &NegotiationId,
    ) -> Result<(), DispatchError> {
        self.sent.lock().await.push(SentNotification::AgreementReady {
            user: user.clone(),
            negotiation_id: negotiation_id.clone(),
        });
        Ok(())
    }

    async fn notify_rejection(
        &self,
        user: &UserId,
        reasoning: &str,
    ) -> Result<(), DispatchError> {
        self.sent.lock().await.push(SentNotification::Rejection {
            user: user.clone(),
            reasoning: reasoning.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use haggle_core::domain::negotiation::{NegotiationId, UserId};

    use super::{InMemoryDispatcher, NotificationDispatcher, SentNotification};

    #[tokio::test]
    async fn recording_dispatcher_keeps_send_order() {
        let dispatcher = InMemoryDispatcher::default();
        let owner = UserId("owner-1".to_string());
        let renter = UserId("renter-1".to_string());
        let negotiation_id = NegotiationId("N-1".to_string());

        dispatcher
            .notify_offer(&owner, Decimal::new(1_820, 2), "countered")
            .await
            .expect("offer");
        dispatcher
            .notify_agreement_ready(&renter, &negotiation_id)
            .await
            .expect("agreement");

        let sent = dispatcher.sent().await;
        assert_eq!(sent.len(), 2);
        assert!(matches!(&sent[0], SentNotification::Offer { to_user, .. } if *to_user == owner));
        assert!(matches!(
            &sent[1],
            SentNotification::AgreementReady { user, .. } if *user == renter
        ));
    }
}
