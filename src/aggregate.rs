// 📊 Aggregator - per-(name, source, platform) tallies and report partitions
// First-seen ordering throughout, so identical inputs reproduce identical
// report tables byte for byte.

use crate::catalog::{Platform, Source};
use crate::engine::MatchedCredential;
use serde::Serialize;
use std::collections::HashMap;

/// Grouping key for the summary table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregateKey {
    pub badge_name: String,
    pub source: Source,
    pub platform: Platform,
}

/// One summary table row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub badge_name: String,
    pub source: Source,
    pub platform: Platform,
    pub cert_count: u64,
}

/// Accumulates matched credentials in production order.
///
/// Keeps aggregate counts, per-user counts (every registered user present,
/// zero included) and the matched/expiring partitions for the detail report.
#[derive(Debug, Default)]
pub struct Aggregator {
    counts: HashMap<AggregateKey, u64>,
    key_order: Vec<AggregateKey>,
    user_counts: HashMap<String, u64>,
    user_order: Vec<String>,
    matched: Vec<MatchedCredential>,
    expiring: Vec<MatchedCredential>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a roster user before any of their credentials are recorded.
    /// Guarantees the completeness invariant: a user with no matches still
    /// appears in the per-user counts at zero.
    pub fn register_user(&mut self, username: &str) {
        if !self.user_counts.contains_key(username) {
            self.user_counts.insert(username.to_string(), 0);
            self.user_order.push(username.to_string());
        }
    }

    /// Record one matched credential (called once per credential, in order)
    pub fn record(&mut self, credential: MatchedCredential) {
        let key = AggregateKey {
            badge_name: credential.badge_name.clone(),
            source: credential.source.clone(),
            platform: credential.platform,
        };
        if !self.counts.contains_key(&key) {
            self.key_order.push(key.clone());
        }
        *self.counts.entry(key).or_insert(0) += 1;

        self.register_user(&credential.username);
        if let Some(count) = self.user_counts.get_mut(&credential.username) {
            *count += 1;
        }

        if credential.expires_at.is_some() {
            self.expiring.push(credential.clone());
        }
        self.matched.push(credential);
    }

    /// Summary rows in first-seen key order
    pub fn summary_rows(&self) -> Vec<SummaryRow> {
        self.key_order
            .iter()
            .map(|key| SummaryRow {
                badge_name: key.badge_name.clone(),
                source: key.source.clone(),
                platform: key.platform,
                cert_count: self.counts[key],
            })
            .collect()
    }

    /// Per-user credential counts in roster order (zero-count users included)
    pub fn user_counts(&self) -> Vec<(String, u64)> {
        self.user_order
            .iter()
            .map(|username| (username.clone(), self.user_counts[username]))
            .collect()
    }

    /// All matched credentials in production order
    pub fn matched(&self) -> &[MatchedCredential] {
        &self.matched
    }

    /// Matched credentials that carry an expiry (detail report rows)
    pub fn expiring(&self) -> &[MatchedCredential] {
        &self.expiring
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn matched(
        username: &str,
        name: &str,
        source: Source,
        platform: Platform,
        expires: bool,
    ) -> MatchedCredential {
        MatchedCredential {
            username: username.to_string(),
            badge_id: format!("id-{}", name),
            badge_name: name.to_string(),
            expires_at: expires.then(|| Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap()),
            source,
            platform,
        }
    }

    #[test]
    fn test_counts_by_key() {
        let mut aggregator = Aggregator::new();
        aggregator.record(matched("alice", "Cloud Practitioner", Source::parse("whitelist"), Platform::Credly, false));
        aggregator.record(matched("bob", "Cloud Practitioner", Source::parse("whitelist"), Platform::Credly, false));
        aggregator.record(matched("alice", "Azure Fundamentals", Source::Azure, Platform::Microsoft, false));

        let rows = aggregator.summary_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].badge_name, "Cloud Practitioner");
        assert_eq!(rows[0].cert_count, 2);
        assert_eq!(rows[1].cert_count, 1);
    }

    #[test]
    fn test_same_name_different_source_are_distinct_keys() {
        let mut aggregator = Aggregator::new();
        aggregator.record(matched("alice", "Fundamentals", Source::Azure, Platform::Microsoft, false));
        aggregator.record(matched("bob", "Fundamentals", Source::Microsoft, Platform::Microsoft, false));

        assert_eq!(aggregator.summary_rows().len(), 2);
    }

    #[test]
    fn test_first_seen_row_order() {
        let mut aggregator = Aggregator::new();
        aggregator.record(matched("a", "Zeta", Source::Credly, Platform::Credly, false));
        aggregator.record(matched("a", "Alpha", Source::Credly, Platform::Credly, false));
        aggregator.record(matched("b", "Zeta", Source::Credly, Platform::Credly, false));

        let rows = aggregator.summary_rows();
        assert_eq!(rows[0].badge_name, "Zeta");
        assert_eq!(rows[1].badge_name, "Alpha");
    }

    #[test]
    fn test_expiring_partition() {
        let mut aggregator = Aggregator::new();
        aggregator.record(matched("alice", "Expiring", Source::Azure, Platform::Microsoft, true));
        aggregator.record(matched("alice", "Permanent", Source::Microsoft, Platform::Microsoft, false));

        assert_eq!(aggregator.matched().len(), 2);
        assert_eq!(aggregator.expiring().len(), 1);
        assert_eq!(aggregator.expiring()[0].badge_name, "Expiring");
    }

    #[test]
    fn test_registered_user_stays_at_zero() {
        let mut aggregator = Aggregator::new();
        aggregator.register_user("carol");
        aggregator.record(matched("alice", "Fundamentals", Source::Azure, Platform::Microsoft, false));

        assert_eq!(
            aggregator.user_counts(),
            vec![("carol".to_string(), 0), ("alice".to_string(), 1)]
        );
    }
}
