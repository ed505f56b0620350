//! # mailvet_core
//!
//! Email address classification engine combining static heuristics with live
//! DNS lookups, for single addresses and for large batches.
//!
//! ## Features
//!
//! - **RFC 5322 style syntax checks** with length limits
//! - **Static intelligence tables** for disposable, role-based, free-provider
//!   and typo detection
//! - **DNS validation** (A/AAAA/NS, MX, SPF, DMARC) via hickory-resolver
//! - **Deterministic scoring** into `valid`, `invalid` or `risky`
//! - **Bulk orchestration** resolving each distinct domain exactly once under
//!   bounded concurrency, preserving input order
//!
//! ## Example
//!
//! ```rust,no_run
//! use mailvet_core::{ValidationConfig, ValidationPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = ValidationPipeline::new(ValidationConfig::default())?;
//!
//!     let result = pipeline.validate_email("someone@example.com", None).await;
//!     println!("{} -> {:?} ({})", result.email, result.status, result.score);
//!
//!     Ok(())
//! }
//! ```

pub mod bulk;
pub mod cache;
pub mod deliverability;
pub mod disposable;
pub mod dns;
pub mod heuristics;
pub mod privacy;
pub mod reachability;
pub mod scoring;
pub mod syntax;
pub mod validation_pipeline;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for the email validation pipeline
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// DNS resolver timeout in milliseconds
    pub dns_timeout_ms: u64,
    /// Maximum number of DNS lookup attempts
    pub dns_attempts: usize,
    /// DNS cache size (number of entries)
    pub dns_cache_size: usize,
    /// Minimum TTL for positive DNS cache entries
    pub dns_min_ttl_secs: u64,
    /// Maximum number of domains resolved concurrently during a batch
    pub bulk_concurrency: usize,
    /// Look up SPF and DMARC records
    pub enable_auth_checks: bool,
    /// Fall back to edit-distance matching when the typo map has no entry
    pub fuzzy_typo_detection: bool,
    /// Salt used when redacting addresses in logs
    pub privacy_salt: Option<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            dns_timeout_ms: 500,
            dns_attempts: 2,
            dns_cache_size: 10_000,
            dns_min_ttl_secs: 60,
            bulk_concurrency: 100,
            enable_auth_checks: true,
            fuzzy_typo_detection: false,
            privacy_salt: None,
        }
    }
}

/// Terminal classification of an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Valid,
    Invalid,
    Risky,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Valid => "valid",
            Status::Invalid => "invalid",
            Status::Risky => "risky",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "valid" => Ok(Status::Valid),
            "invalid" => Ok(Status::Invalid),
            "risky" => Ok(Status::Risky),
            other => Err(ValidationError::InvalidRequest(format!(
                "Unknown status: {other}"
            ))),
        }
    }
}

/// Approximate mail server reachability, without a protocol handshake
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReachabilityFacts {
    pub attempted: bool,
    pub reachable: bool,
    pub accepts_all: bool,
    /// Unknown (`None`) unless a real mailbox probe answers
    pub mailbox_exists: Option<bool>,
}

/// SPF and DMARC presence for a domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationFacts {
    /// Whether the lookups were performed at all
    pub checked: bool,
    pub has_spf: bool,
    /// SPF record ends in `-all`
    pub spf_strict: bool,
    pub has_dmarc: bool,
    /// DMARC `p=` tag (`none`, `quarantine`, `reject`)
    pub dmarc_policy: Option<String>,
}

/// Raw signals computed for one address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationFacts {
    pub syntax_valid: bool,
    pub domain_exists: bool,
    pub mx_present: bool,
    /// Mail exchange hosts, most preferred first
    pub mx_hosts: Vec<String>,
    pub is_disposable: bool,
    pub is_role_based: bool,
    pub is_free_provider: bool,
    pub has_suspicious_pattern: bool,
    pub has_typo: bool,
    pub suggested_correction: Option<String>,
    /// Always false until real catch-all detection exists
    pub is_catch_all: bool,
    pub reachability: ReachabilityFacts,
    pub authentication: AuthenticationFacts,
}

/// Complete validation result for one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Normalized (trimmed, lower-cased) address
    pub email: String,
    pub local_part: String,
    pub domain: String,
    #[serde(flatten)]
    pub facts: ValidationFacts,
    /// 0-100, higher means more likely deliverable
    pub score: u8,
    pub status: Status,
    pub risk_factors: Vec<String>,
}

impl ValidationResult {
    /// Conservative result used when validating an address faulted
    pub fn internal_failure(email: &str) -> Self {
        let address = syntax::Address::parse(email);
        Self {
            email: address.normalized().to_string(),
            local_part: address.local_part().to_string(),
            domain: address.domain().to_string(),
            facts: ValidationFacts::default(),
            score: 0,
            status: Status::Invalid,
            risk_factors: vec![scoring::INTERNAL_FAILURE_FACTOR.to_string()],
        }
    }
}

/// Aggregate counts over a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub risky: usize,
    pub average_score: f64,
}

impl BatchSummary {
    pub fn from_results(results: &[ValidationResult]) -> Self {
        let mut summary = BatchSummary {
            total: results.len(),
            ..Default::default()
        };
        let mut score_sum: u64 = 0;

        for result in results {
            match result.status {
                Status::Valid => summary.valid += 1,
                Status::Invalid => summary.invalid += 1,
                Status::Risky => summary.risky += 1,
            }
            score_sum += u64::from(result.score);
        }

        if summary.total > 0 {
            summary.average_score = score_sum as f64 / summary.total as f64;
        }

        summary
    }
}

/// Ordered batch results plus their summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<ValidationResult>,
    pub summary: BatchSummary,
}

/// Errors that can occur during validation
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Result cache unavailable: {0}")]
    CacheUnavailable(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ValidationError>;

// Re-export main types
pub use cache::{CachedOutcome, MemoryResultCache, ResultCache};
pub use dns::{DnsLookup, DnsResolver};
pub use reachability::{HeuristicEstimator, ReachabilityProbe};
pub use validation_pipeline::ValidationPipeline;
