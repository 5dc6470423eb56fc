//! Market data boundary: comparable-pricing snapshots for a space
//! category and location, fetched from an external completion service
//! under a process-wide request budget, with a synthetic fallback so the
//! decision engine always has a snapshot to work with.

pub mod governor;
pub mod llm;
pub mod provider;

pub use governor::{QuotaDecision, RequestGovernor, RetryPolicy};
pub use llm::{HttpLlmClient, LlmClient};
pub use provider::{LlmMarketDataProvider, MarketDataProvider, SyntheticMarketDataProvider};
