//! Cache Policy Module
//!
//! Static tables deciding how long entries live and which categories a
//! mutation cascades to, plus cache-key derivation from request URLs.

use std::time::Duration;

// == TTL Policy ==
/// Default time-to-live for one resource category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlPolicy {
    /// Category name, matched against cache keys
    pub category: String,
    /// Lifetime applied when the caller gives no explicit TTL
    pub ttl: Duration,
}

impl TtlPolicy {
    pub fn new(category: impl Into<String>, ttl: Duration) -> Self {
        Self {
            category: category.into(),
            ttl,
        }
    }
}

/// Built-in TTL table for the FitTracker resources.
pub fn default_ttl_policies() -> Vec<TtlPolicy> {
    const MINUTE: u64 = 60;
    vec![
        TtlPolicy::new("profile", Duration::from_secs(5 * MINUTE)),
        TtlPolicy::new("dietPlan", Duration::from_secs(10 * MINUTE)),
        TtlPolicy::new("dietPlans", Duration::from_secs(10 * MINUTE)),
        // exercise library changes rarely
        TtlPolicy::new("exercises", Duration::from_secs(30 * MINUTE)),
        TtlPolicy::new("workoutPlan", Duration::from_secs(10 * MINUTE)),
        TtlPolicy::new("trainingProfile", Duration::from_secs(5 * MINUTE)),
    ]
}

/// Looks up the table TTL for a key by exact category name.
///
/// Derived keys such as `dietPlan_42` are not matched and fall back to the
/// default TTL.
pub fn lookup_ttl(policies: &[TtlPolicy], key: &str) -> Option<Duration> {
    policies.iter().find(|p| p.category == key).map(|p| p.ttl)
}

// == Invalidation Rule ==
/// One dependency group of the cascade table.
///
/// A key containing any trigger causes every entry starting with any of the
/// prefixes to be cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationRule {
    pub triggers: Vec<String>,
    pub prefixes: Vec<String>,
}

impl InvalidationRule {
    pub fn new(triggers: &[&str], prefixes: &[&str]) -> Self {
        Self {
            triggers: triggers.iter().map(|s| s.to_string()).collect(),
            prefixes: prefixes.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Returns true if the key belongs to this dependency group.
    pub fn matches(&self, key: &str) -> bool {
        self.triggers.iter().any(|t| key.contains(t.as_str()))
    }
}

/// Built-in cascade table. Rules are checked in order; the first match wins.
pub fn default_invalidation_rules() -> Vec<InvalidationRule> {
    vec![
        // profile changes feed into generated diet and workout plans
        InvalidationRule::new(&["profile"], &["profile", "dietPlan", "workoutPlan"]),
        InvalidationRule::new(&["diet"], &["dietPlan", "dietPlans"]),
        InvalidationRule::new(&["training", "workout"], &["workoutPlan", "trainingProfile"]),
    ]
}

/// Returns the prefixes to clear for a key, empty for unrecognized keys.
pub fn cascade_prefixes<'a>(rules: &'a [InvalidationRule], key: &str) -> &'a [String] {
    rules
        .iter()
        .find(|rule| rule.matches(key))
        .map(|rule| rule.prefixes.as_slice())
        .unwrap_or(&[])
}

// == Key Derivation ==
/// Derives a cache key from a request URL.
///
/// Every character outside `[A-Za-z0-9]` becomes `_`.
pub fn key_from_url(url: &str) -> String {
    url.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
