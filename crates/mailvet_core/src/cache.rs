//! Result cache gateway
//!
//! Read side of previously stored outcomes, keyed by `(owner id, normalized
//! address)`. The pipeline only reads through [`ResultCache`]; storing new
//! outcomes is the caller's job once validation has returned.

use crate::{
    heuristics::{self, TypoDetector},
    scoring,
    syntax::Address,
    Result, Status, ValidationFacts, ValidationResult,
};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_MAX_ENTRIES: usize = 100_000;
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Stored outcome for one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedOutcome {
    pub email: String,
    pub domain: String,
    pub status: Status,
    pub syntax_valid: bool,
    pub domain_exists: bool,
    pub mx_records: bool,
    pub is_disposable: bool,
    pub is_role_based: bool,
    pub is_catch_all: bool,
}

impl CachedOutcome {
    pub fn from_result(result: &ValidationResult) -> Self {
        Self {
            email: result.email.clone(),
            domain: result.domain.clone(),
            status: result.status,
            syntax_valid: result.facts.syntax_valid,
            domain_exists: result.facts.domain_exists,
            mx_records: result.facts.mx_present,
            is_disposable: result.facts.is_disposable,
            is_role_based: result.facts.is_role_based,
            is_catch_all: result.facts.is_catch_all,
        }
    }

    /// Rebuild a result; the stored status is kept as is
    ///
    /// Signals that only depend on the address (free provider, typo,
    /// suspicious local part, role prefix) are recomputed, then score and
    /// risk factors are derived from the combined facts.
    pub fn into_result(self, typo_detector: &TypoDetector) -> ValidationResult {
        let address = Address::parse(&self.email);
        let mut facts = ValidationFacts {
            syntax_valid: self.syntax_valid,
            domain_exists: self.domain_exists,
            mx_present: self.mx_records,
            is_disposable: self.is_disposable,
            is_role_based: self.is_role_based,
            is_catch_all: self.is_catch_all,
            ..Default::default()
        };

        if self.syntax_valid {
            let local_part = address.local_part();
            let domain = address.domain();
            facts.is_role_based |= heuristics::is_role_based(local_part);
            facts.is_free_provider = heuristics::is_free_provider(domain);
            facts.has_suspicious_pattern = heuristics::has_suspicious_pattern(local_part);
            facts.suggested_correction = typo_detector.check_typo(domain);
            facts.has_typo = facts.suggested_correction.is_some();
        }

        ValidationResult {
            email: address.normalized().to_string(),
            local_part: address.local_part().to_string(),
            domain: self.domain,
            score: scoring::score(&facts),
            status: self.status,
            risk_factors: scoring::risk_factors(&facts),
            facts,
        }
    }
}

#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Stored outcomes for the subset of `emails` known for this owner
    async fn lookup(&self, owner_id: &str, emails: &[String]) -> Result<Vec<CachedOutcome>>;
}

type CacheKey = (String, String);

#[derive(Debug)]
struct StoredEntry {
    outcome: CachedOutcome,
    expiry: Instant,
    sequence: u64,
}

/// Process-local result store, bounded in size and age
///
/// When full, the oldest stored outcome is evicted first.
#[derive(Debug)]
pub struct MemoryResultCache {
    entries: DashMap<CacheKey, StoredEntry>,
    insertion_order: Mutex<VecDeque<(CacheKey, u64)>>,
    next_sequence: AtomicU64,
    max_entries: usize,
    ttl: Duration,
}

impl Default for MemoryResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_TTL)
    }
}

impl MemoryResultCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            insertion_order: Mutex::new(VecDeque::new()),
            next_sequence: AtomicU64::new(0),
            max_entries,
            ttl,
        }
    }

    /// Store an outcome for the owner
    ///
    /// Internal-failure results are not stored so a transient fault is never
    /// replayed. Returns whether the outcome was stored.
    pub fn store(&self, owner_id: &str, result: &ValidationResult) -> bool {
        if result
            .risk_factors
            .iter()
            .any(|factor| factor == scoring::INTERNAL_FAILURE_FACTOR)
        {
            debug!("Not storing internal failure outcome");
            return false;
        }
        if self.max_entries == 0 {
            return false;
        }

        let key = (owner_id.to_string(), result.email.clone());
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        let mut order = self.insertion_order.lock();

        while self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            let Some((oldest, oldest_sequence)) = order.pop_front() else {
                break;
            };
            // Queue slots left behind by a re-store no longer match and are skipped
            if self
                .entries
                .remove_if(&oldest, |_, entry| entry.sequence == oldest_sequence)
                .is_some()
            {
                debug!("Evicted oldest stored outcome");
            }
        }

        self.entries.insert(
            key.clone(),
            StoredEntry {
                outcome: CachedOutcome::from_result(result),
                expiry: Instant::now() + self.ttl,
                sequence,
            },
        );
        order.push_back((key, sequence));

        if order.len() > self.max_entries.saturating_mul(2) {
            order.retain(|(key, sequence)| {
                self.entries
                    .get(key)
                    .is_some_and(|entry| entry.sequence == *sequence)
            });
        }

        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }
}

#[async_trait]
impl ResultCache for MemoryResultCache {
    async fn lookup(&self, owner_id: &str, emails: &[String]) -> Result<Vec<CachedOutcome>> {
        let now = Instant::now();
        let mut hits = Vec::new();

        for email in emails {
            let key = (owner_id.to_string(), email.clone());
            let expired = match self.entries.get(&key) {
                Some(entry) if entry.expiry > now => {
                    hits.push(entry.outcome.clone());
                    false
                }
                Some(_) => true,
                None => false,
            };

            if expired {
                self.entries.remove_if(&key, |_, entry| entry.expiry <= now);
            }
        }

        debug!("Result cache: {} of {} address(es) found", hits.len(), emails.len());
        Ok(hits)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::ValidationError;

    /// Gateway that always fails
    pub struct UnavailableCache;

    #[async_trait]
    impl ResultCache for UnavailableCache {
        async fn lookup(&self, _owner_id: &str, _emails: &[String]) -> Result<Vec<CachedOutcome>> {
            Err(ValidationError::CacheUnavailable("connection refused".to_string()))
        }
    }
}
