//! The component-agnostic failure taxonomy every evaluator's typed error
//! collapses into, used by the orchestrator to decide whether to retry,
//! decline, or surface a 5xx.

/// Coarse classification of why a pipeline step failed. Every component
/// error (card directory lookup, limit check, risk score, balance check,
/// hold creation, ...) maps onto exactly one of these via its own
/// `kind()` method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Malformed or missing request data. Never retriable.
    Validation,
    /// Referenced entity (card, hold, spending window) does not exist.
    NotFound,
    /// Entity exists but is not in a state that allows the requested
    /// operation (e.g. capturing an already-released hold).
    InvalidState,
    /// A business rule rejected the request outright (limit exceeded,
    /// risk score too high, insufficient funds). Not a bug, not
    /// retriable - the answer is just "no".
    BusinessDecline,
    /// A downstream collaborator (ledger, FX, card directory, database)
    /// could not be reached or timed out. Retriable by the caller.
    TransientUpstream,
    /// Anything else: a bug, an invariant violation, a serialization
    /// failure. Never retriable, always logged at error level.
    Internal,
}

impl FailureKind {
    /// Whether a caller may safely retry the operation that produced
    /// this failure without changing any input.
    pub fn is_retriable(&self) -> bool {
        matches!(self, FailureKind::TransientUpstream)
    }

    /// The HTTP status family this failure kind should surface as at the
    /// API boundary.
    pub fn http_status(&self) -> u16 {
        match self {
            FailureKind::Validation => 400,
            FailureKind::NotFound => 404,
            FailureKind::InvalidState => 409,
            FailureKind::BusinessDecline => 200, // carried as a DECLINED decision, not an HTTP error
            FailureKind::TransientUpstream => 503,
            FailureKind::Internal => 500,
        }
    }
}

/// Implemented by every component's error enum so the orchestrator can
/// classify a failure without matching on its concrete variants.
pub trait Classify {
    fn kind(&self) -> FailureKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_upstream_is_retriable() {
        assert!(FailureKind::TransientUpstream.is_retriable());
        assert!(!FailureKind::Validation.is_retriable());
        assert!(!FailureKind::BusinessDecline.is_retriable());
        assert!(!FailureKind::Internal.is_retriable());
    }
}
