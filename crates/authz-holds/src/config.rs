use chrono::Duration;

/// Configuration for the hold manager.
#[derive(Debug, Clone, Copy)]
pub struct HoldsConfig {
    pub hold_ttl: Duration,
}

impl Default for HoldsConfig {
    fn default() -> Self {
        Self {
            hold_ttl: Duration::hours(24 * 7),
        }
    }
}
