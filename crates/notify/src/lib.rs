//! Outbound party notifications. Fire-and-forget: the orchestrator logs
//! dispatch failures and moves on, it never retries or rolls back a
//! decision because a notification could not be delivered.

pub mod dispatcher;

pub use dispatcher::{
    DispatchError, InMemoryDispatcher, NotificationDispatcher, SentNotification,
    TracingDispatcher,
};
