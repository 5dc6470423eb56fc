use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Accept,
    Reject,
    Counter,
}

/// The engine's verdict on one pending offer. Decisions are never
/// persisted; the orchestrator translates them into offer/negotiation
/// updates and notifications, then discards them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: DecisionAction,
    pub counter_price: Option<Decimal>,
    pub reasoning: String,
    pub confidence: f64,
    pub ai_generated: bool,
}

impl Decision {
    pub fn accept(reasoning: impl Into<String>, confidence: f64) -> Self {
        Self {
            action: DecisionAction::Accept,
            counter_price: None,
            reasoning: reasoning.into(),
            confidence,
            ai_generated: true,
        }
    }

    pub fn reject(reasoning: impl Into<String>, confidence: f64) -> Self {
        Self {
            action: DecisionAction::Reject,
            counter_price: None,
            reasoning: reasoning.into(),
            confidence,
            ai_generated: true,
        }
    }

    pub fn counter(price: Decimal, reasoning: impl Into<String>, confidence: f64) -> Self {
        Self {
            action: DecisionAction::Counter,
            counter_price: Some(price),
            reasoning: reasoning.into(),
            confidence,
            ai_generated: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{Decision, DecisionAction};

    #[test]
    fn counter_price_is_present_exactly_for_counters() {
        let accept = Decision::accept("good offer", 0.95);
        let reject = Decision::reject("too low", 0.9);
        let counter = Decision::counter(Decimal::new(1_820, 2), "meet in the middle", 0.75);

        assert_eq!(accept.action, DecisionAction::Accept);
        assert!(accept.counter_price.is_none());
        assert!(reject.counter_price.is_none());
        assert_eq!(counter.counter_price, Some(Decimal::new(1_820, 2)));
        assert!(counter.ai_generated);
    }
}
