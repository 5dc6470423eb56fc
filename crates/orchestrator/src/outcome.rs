use rust_decimal::Decimal;

/// Why a round produced no decision. None of these are errors: a skipped
/// round leaves the pending offer for a human (or a later trigger).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The negotiation already reached `accepted` or `rejected`.
    NegotiationTerminal,
    /// No offers exist yet for this negotiation.
    NoActiveOffer,
    /// The latest offer is no longer pending (a human or an earlier round
    /// got there first). This is the stale-trigger guard.
    OfferNotPending,
    /// The responding side has not opted into automatic responses.
    AgentNotOptedIn,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RoundOutcome {
    Accepted { price: Decimal },
    Rejected { reasoning: String },
    Countered { price: Decimal, next_round_scheduled: bool },
    Skipped(SkipReason),
}
