use chrono::Duration;
use std::time::Duration as StdDuration;

/// Orchestrator-level timing and policy knobs that don't belong to any
/// single evaluator: challenge/approval TTLs, the end-to-end deadline,
/// and the per-external-call budget the retry helper enforces.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// How long a CHALLENGE decision stays completable.
    pub challenge_ttl: Duration,
    /// How long an APPROVED/PARTIAL decision (and its hold) is valid for
    /// before the sweeper would expire it. Mirrors the hold's own TTL for
    /// the decision's `expiresAt`.
    pub approved_ttl: Duration,
    /// End-to-end deadline for a single `authorize` call.
    pub authorization_deadline: StdDuration,
    /// Per-external-call budget before a call is considered to have
    /// timed out.
    pub external_call_budget: StdDuration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            challenge_ttl: Duration::minutes(15),
            approved_ttl: Duration::days(7),
            authorization_deadline: StdDuration::from_secs(10),
            external_call_budget: StdDuration::from_secs(5),
        }
    }
}
