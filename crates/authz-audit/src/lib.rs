//! Builds the hash-chained `decisionPath` carried on every
//! [`authz_types::AuthorizationDecision`]: each step the pipeline takes is
//! appended as a [`DecisionPathEntry`] whose hash folds in the previous
//! entry's hash, so the trail as a whole is tamper-evident - altering or
//! reordering a past entry breaks every hash after it.

use authz_types::{DecisionPathEntry, ReasonCode};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Accumulates [`DecisionPathEntry`] values for a single authorization
/// request as the orchestrator walks its pipeline, one evaluator at a
/// time.
#[derive(Debug, Default)]
pub struct DecisionPathBuilder {
    entries: Vec<DecisionPathEntry>,
}

impl DecisionPathBuilder {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Record that `component` ran and produced `outcome`, optionally
    /// tagged with the reason code it settled on. Returns the appended
    /// entry's hash so callers (tests, logging) can cross-reference it.
    pub fn append(
        &mut self,
        component: impl Into<String>,
        outcome: impl Into<String>,
        reason_code: Option<ReasonCode>,
        at: DateTime<Utc>,
    ) -> &str {
        let prev_hash = self.entries.last().map(|e| e.hash.clone());
        let component = component.into();
        let outcome = outcome.into();
        let hash = chain_hash(prev_hash.as_deref(), &component, &outcome, reason_code, at);
        self.entries.push(DecisionPathEntry {
            component,
            outcome,
            reason_code,
            at,
            prev_hash,
            hash,
        });
        self.entries.last().unwrap().hash.as_str()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<DecisionPathEntry> {
        self.entries
    }
}

/// Computes the hash for one link of the chain: the previous entry's
/// hash (or empty for the first entry) concatenated with the new
/// entry's fields, SHA-256'd and hex-encoded.
fn chain_hash(
    prev_hash: Option<&str>,
    component: &str,
    outcome: &str,
    reason_code: Option<ReasonCode>,
    at: DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.unwrap_or("").as_bytes());
    hasher.update(b"|");
    hasher.update(component.as_bytes());
    hasher.update(b"|");
    hasher.update(outcome.as_bytes());
    hasher.update(b"|");
    hasher.update(reason_code.map(|r| r.code()).unwrap_or("").as_bytes());
    hasher.update(b"|");
    hasher.update(at.to_rfc3339().as_bytes());
    hex::encode(hasher.finalize())
}

/// Verifies that every entry's `hash` is the expected function of its
/// `prev_hash` and fields, and that `prev_hash` chains correctly from one
/// entry to the next. Used by dispute-resolution tooling and tests to
/// detect a tampered trail.
pub fn verify_chain(entries: &[DecisionPathEntry]) -> bool {
    let mut expected_prev: Option<&str> = None;
    for entry in entries {
        if entry.prev_hash.as_deref() != expected_prev {
            return false;
        }
        let recomputed = chain_hash(
            entry.prev_hash.as_deref(),
            &entry.component,
            &entry.outcome,
            entry.reason_code,
            entry.at,
        );
        if recomputed != entry.hash {
            return false;
        }
        expected_prev = Some(entry.hash.as_str());
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_entry_has_no_prev_hash() {
        let mut builder = DecisionPathBuilder::new();
        builder.append("validator", "PASSED", None, Utc::now());
        let entries = builder.into_entries();
        assert!(entries[0].prev_hash.is_none());
    }

    #[test]
    fn chain_links_each_entry_to_the_last() {
        let mut builder = DecisionPathBuilder::new();
        builder.append("validator", "PASSED", None, Utc::now());
        builder.append("limits", "PASSED", None, Utc::now());
        builder.append(
            "risk",
            "DECLINED",
            Some(ReasonCode::SuspectedFraud),
            Utc::now(),
        );
        let entries = builder.into_entries();
        assert_eq!(entries[1].prev_hash.as_deref(), Some(entries[0].hash.as_str()));
        assert_eq!(entries[2].prev_hash.as_deref(), Some(entries[1].hash.as_str()));
        assert!(verify_chain(&entries));
    }

    #[test]
    fn tampering_with_an_entry_breaks_verification() {
        let mut builder = DecisionPathBuilder::new();
        builder.append("validator", "PASSED", None, Utc::now());
        builder.append("limits", "PASSED", None, Utc::now());
        let mut entries = builder.into_entries();
        entries[0].outcome = "TAMPERED".to_string();
        assert!(!verify_chain(&entries));
    }
}
