//! Main validation pipeline orchestrating all address checks
//!
//! Syntax and table lookups run first and never touch the network. DNS work
//! is only issued for syntactically valid addresses, with every record type
//! for a domain resolved concurrently.

use crate::{
    cache::{CachedOutcome, ResultCache},
    deliverability::DeliverabilityAnalyzer,
    disposable::{self, DISPOSABLE_DOMAINS},
    dns::{DnsLookup, DnsResolver},
    heuristics::{self, TypoDetector},
    privacy::PrivacyProcessor,
    reachability::{HeuristicEstimator, ReachabilityProbe},
    scoring,
    syntax::Address,
    AuthenticationFacts, ReachabilityFacts, Result, ValidationConfig, ValidationError,
    ValidationFacts, ValidationResult,
};

use anyhow::Context;
use futures::FutureExt;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// DNS-derived facts for one domain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainDns {
    pub domain_exists: bool,
    pub mx_present: bool,
    pub mx_hosts: Vec<String>,
    pub reachability: ReachabilityFacts,
    pub authentication: AuthenticationFacts,
}

#[derive(Debug, Default)]
pub(crate) struct PipelineCounters {
    pub(crate) validations: AtomicU64,
    pub(crate) batches: AtomicU64,
    pub(crate) domain_resolutions: AtomicU64,
}

/// Main validation pipeline coordinating all address checks
pub struct ValidationPipeline {
    config: ValidationConfig,
    resolver: Arc<dyn DnsLookup>,
    reachability: Arc<dyn ReachabilityProbe>,
    pub(crate) typo_detector: TypoDetector,
    privacy: PrivacyProcessor,
    result_cache: Option<Arc<dyn ResultCache>>,
    pub(crate) counters: PipelineCounters,
}

impl ValidationPipeline {
    /// Create a pipeline backed by the hickory resolver and the heuristic
    /// reachability estimator
    ///
    /// # Returns
    /// * `Ok(ValidationPipeline)` on success
    /// * `Err(ValidationError)` if the configuration is unusable or the
    ///   resolver cannot be initialized
    pub fn new(config: ValidationConfig) -> Result<Self> {
        info!("Initializing validation pipeline");

        if config.dns_attempts == 0 {
            return Err(ValidationError::ConfigurationError(
                "dns_attempts must be at least 1".to_string(),
            ));
        }
        if config.dns_timeout_ms == 0 {
            return Err(ValidationError::ConfigurationError(
                "dns_timeout_ms must be greater than 0".to_string(),
            ));
        }

        let resolver = DnsResolver::new(
            config.dns_timeout_ms,
            config.dns_attempts,
            config.dns_cache_size,
            config.dns_min_ttl_secs,
        )
        .context("Failed to initialize DNS resolver")?;

        Ok(Self::with_components(
            config,
            Arc::new(resolver),
            Arc::new(HeuristicEstimator::new()),
        ))
    }

    /// Create a pipeline around caller-supplied resolver and probe
    pub fn with_components(
        config: ValidationConfig,
        resolver: Arc<dyn DnsLookup>,
        reachability: Arc<dyn ReachabilityProbe>,
    ) -> Self {
        let typo_detector = TypoDetector::new(config.fuzzy_typo_detection);
        let privacy = PrivacyProcessor::from_config(config.privacy_salt.as_deref());

        info!(
            "Validation pipeline ready - {} disposable domains, bulk concurrency {}, auth checks {}",
            DISPOSABLE_DOMAINS.domain_count(),
            config.bulk_concurrency.max(1),
            config.enable_auth_checks
        );

        Self {
            config,
            resolver,
            reachability,
            typo_detector,
            privacy,
            result_cache: None,
            counters: PipelineCounters::default(),
        }
    }

    /// Consult this gateway before validating addresses with a known owner
    pub fn with_result_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.result_cache = Some(cache);
        self
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn privacy(&self) -> &PrivacyProcessor {
        &self.privacy
    }

    /// Validate a single address
    ///
    /// Never fails: DNS errors become negative facts and an internal fault
    /// yields a conservative `invalid` result.
    #[instrument(skip_all, fields(email = %self.privacy.redact(raw)))]
    pub async fn validate_email(&self, raw: &str, known_owner_id: Option<&str>) -> ValidationResult {
        self.counters.validations.fetch_add(1, Ordering::Relaxed);
        let address = Address::parse(raw);

        if let Some(owner_id) = known_owner_id {
            let emails = [address.normalized().to_string()];
            if let Some(outcome) = self.cached_outcomes(owner_id, &emails).await.remove(&emails[0]) {
                debug!("Returning cached outcome");
                return outcome.into_result(&self.typo_detector);
            }
        }

        let outcome = AssertUnwindSafe(self.validate_address(&address))
            .catch_unwind()
            .await;

        match outcome {
            Ok(result) => {
                debug!("Validation complete: {} ({})", result.status, result.score);
                result
            }
            Err(_) => {
                warn!("Validation faulted, returning conservative result");
                ValidationResult::internal_failure(address.normalized())
            }
        }
    }

    async fn validate_address(&self, address: &Address) -> ValidationResult {
        if !address.is_valid_syntax() || address.domain().is_empty() {
            debug!("Invalid syntax, skipping DNS");
            return self.assemble_result(address, None);
        }

        let dns = self.resolve_domain(address.domain()).await;
        self.assemble_result(address, Some(&dns))
    }

    /// Resolve existence, mail exchange, reachability and (optionally)
    /// SPF/DMARC for one domain
    #[instrument(skip(self))]
    pub async fn resolve_domain(&self, domain: &str) -> DomainDns {
        self.counters.domain_resolutions.fetch_add(1, Ordering::Relaxed);

        let auth_lookups = async {
            if !self.config.enable_auth_checks {
                return None;
            }
            Some(tokio::join!(
                self.resolver.spf_record(domain),
                self.resolver.dmarc_record(domain)
            ))
        };

        let (exists, mx, auth) = tokio::join!(
            self.resolver.domain_exists(domain),
            self.resolver.resolve_mx(domain),
            auth_lookups
        );

        let authentication = match auth {
            Some((spf, dmarc)) => {
                DeliverabilityAnalyzer::authentication_facts(spf.as_deref(), dmarc.as_deref())
            }
            None => AuthenticationFacts::default(),
        };

        let reachability = self.reachability.probe(domain, &mx.hosts).await;

        let dns = DomainDns {
            domain_exists: exists || mx.exists,
            mx_present: mx.exists,
            mx_hosts: mx.hosts,
            reachability,
            authentication,
        };

        debug!(
            "Domain resolved - exists: {}, mx: {}, spf: {}, dmarc: {}",
            dns.domain_exists, dns.mx_present, dns.authentication.has_spf, dns.authentication.has_dmarc
        );
        dns
    }

    /// Local-part and domain heuristics; all false unless the syntax is valid
    pub(crate) fn heuristic_facts(&self, address: &Address) -> ValidationFacts {
        if !address.is_valid_syntax() {
            return ValidationFacts::default();
        }

        let local_part = address.local_part();
        let domain = address.domain();
        let suggested_correction = self.typo_detector.check_typo(domain);

        ValidationFacts {
            syntax_valid: true,
            is_disposable: disposable::is_disposable(domain),
            is_role_based: heuristics::is_role_based(local_part),
            is_free_provider: heuristics::is_free_provider(domain),
            has_suspicious_pattern: heuristics::has_suspicious_pattern(local_part),
            has_typo: suggested_correction.is_some(),
            suggested_correction,
            ..Default::default()
        }
    }

    /// Combine heuristics with the domain's DNS facts and score the result
    pub(crate) fn assemble_result(&self, address: &Address, dns: Option<&DomainDns>) -> ValidationResult {
        let mut facts = self.heuristic_facts(address);

        if let Some(dns) = dns {
            facts.domain_exists = dns.domain_exists;
            facts.mx_present = dns.mx_present;
            facts.mx_hosts = dns.mx_hosts.clone();
            facts.reachability = dns.reachability.clone();
            facts.authentication = dns.authentication.clone();
        }

        let (score, status, risk_factors) = scoring::evaluate(&facts);

        ValidationResult {
            email: address.normalized().to_string(),
            local_part: address.local_part().to_string(),
            domain: address.domain().to_string(),
            facts,
            score,
            status,
            risk_factors,
        }
    }

    /// Previously stored outcomes by normalized address
    ///
    /// Gateway failures are logged and treated as "nothing cached".
    pub(crate) async fn cached_outcomes(
        &self,
        owner_id: &str,
        emails: &[String],
    ) -> HashMap<String, CachedOutcome> {
        let Some(cache) = &self.result_cache else {
            return HashMap::new();
        };

        match cache.lookup(owner_id, emails).await {
            Ok(outcomes) => outcomes
                .into_iter()
                .map(|outcome| (outcome.email.clone(), outcome))
                .collect(),
            Err(e) => {
                warn!("Result cache lookup failed, validating without it: {}", e);
                HashMap::new()
            }
        }
    }

    /// Get pipeline statistics for monitoring
    pub fn get_stats(&self) -> PipelineStats {
        PipelineStats {
            disposable_domains_count: DISPOSABLE_DOMAINS.domain_count(),
            role_prefixes_count: heuristics::role_prefix_count(),
            free_providers_count: heuristics::free_provider_count(),
            typo_entries_count: heuristics::typo_entry_count(),
            validations_total: self.counters.validations.load(Ordering::Relaxed),
            batches_total: self.counters.batches.load(Ordering::Relaxed),
            domain_resolutions_total: self.counters.domain_resolutions.load(Ordering::Relaxed),
        }
    }
}

/// Statistics about the validation pipeline
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStats {
    pub disposable_domains_count: usize,
    pub role_prefixes_count: usize,
    pub free_providers_count: usize,
    pub typo_entries_count: usize,
    pub validations_total: u64,
    pub batches_total: u64,
    pub domain_resolutions_total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{testing::UnavailableCache, MemoryResultCache};
    use crate::dns::testing::{StubDomain, StubResolver};
    use crate::Status;
    use pretty_assertions::assert_eq;

    fn pipeline_with(resolver: Arc<StubResolver>) -> ValidationPipeline {
        ValidationPipeline::with_components(
            ValidationConfig::default(),
            resolver,
            Arc::new(HeuristicEstimator::new()),
        )
    }

    fn stub() -> StubResolver {
        StubResolver::new()
            .with_domain("gmail.com", StubDomain::mail(&["gmail-smtp-in.l.google.com"]))
            .with_domain("smallbiz.test", StubDomain::mail(&["mx.smallbiz.test"]))
            .with_domain("tempmail.com", StubDomain::mail(&["mx.tempmail.com"]))
            .with_domain("example.com", StubDomain::mail(&["mx.example.com"]))
            .with_domain("webonly.test", StubDomain::web_only())
    }

    #[tokio::test]
    async fn test_pipeline_creation() {
        let pipeline = ValidationPipeline::new(ValidationConfig::default());
        assert!(pipeline.is_ok());
    }

    #[tokio::test]
    async fn test_free_provider_is_valid() {
        let pipeline = pipeline_with(Arc::new(stub()));
        let result = pipeline.validate_email("user@gmail.com", None).await;

        assert_eq!(result.status, Status::Valid);
        assert_eq!(result.score, 95);
        assert!(result.facts.is_free_provider);
        assert!(result.facts.reachability.reachable);
        assert_eq!(result.facts.mx_hosts, vec!["gmail-smtp-in.l.google.com"]);
        assert_eq!(result.risk_factors, vec!["Free email provider"]);
    }

    #[tokio::test]
    async fn test_role_based_address() {
        let pipeline = pipeline_with(Arc::new(stub()));
        let result = pipeline.validate_email("info@smallbiz.test", None).await;

        assert!(result.facts.is_role_based);
        assert_eq!(result.score, 80);
        assert_eq!(result.status, Status::Risky);
        assert_eq!(result.risk_factors, vec!["Role-based email address"]);

        let result = pipeline.validate_email("jane@smallbiz.test", None).await;
        assert_eq!(result.score, 100);
        assert_eq!(result.status, Status::Valid);
    }

    #[tokio::test]
    async fn test_disposable_address() {
        let pipeline = pipeline_with(Arc::new(stub()));
        let result = pipeline.validate_email("a@tempmail.com", None).await;

        assert!(result.facts.is_disposable);
        assert_eq!(result.score, 60);
        assert_eq!(result.status, Status::Risky);
    }

    #[tokio::test]
    async fn test_nonexistent_domain() {
        let pipeline = pipeline_with(Arc::new(stub()));
        let result = pipeline
            .validate_email("bob@nonexistent-domain-xyz123.test", None)
            .await;

        assert!(!result.facts.domain_exists);
        assert!(!result.facts.mx_present);
        assert_eq!(result.status, Status::Invalid);
        assert_eq!(result.score, 0);
        assert_eq!(
            result.risk_factors,
            vec!["Domain does not exist", "No MX records found"]
        );
    }

    #[tokio::test]
    async fn test_typo_domain() {
        // The misspelled domain does not resolve
        let pipeline = pipeline_with(Arc::new(stub()));
        let result = pipeline.validate_email("x@gmial.com", None).await;

        assert!(result.facts.has_typo);
        assert_eq!(result.facts.suggested_correction, Some("gmail.com".to_string()));
        assert_eq!(result.status, Status::Invalid);

        // The misspelled domain resolves
        let resolver = stub().with_domain("gmial.com", StubDomain::mail(&["mx.gmial.com"]));
        let pipeline = pipeline_with(Arc::new(resolver));
        let result = pipeline.validate_email("x@gmial.com", None).await;

        assert_eq!(result.score, 65);
        assert_eq!(result.status, Status::Risky);
        assert!(result
            .risk_factors
            .contains(&"Possible typo: did you mean gmail.com?".to_string()));
    }

    #[tokio::test]
    async fn test_domain_without_mx_is_invalid() {
        let pipeline = pipeline_with(Arc::new(stub()));
        let result = pipeline.validate_email("jane@webonly.test", None).await;

        assert!(result.facts.domain_exists);
        assert!(!result.facts.mx_present);
        assert_eq!(result.score, 50);
        assert_eq!(result.status, Status::Invalid);
        assert!(!result.facts.reachability.attempted);
    }

    #[tokio::test]
    async fn test_mx_implies_domain_exists() {
        let mut domain = StubDomain::mail(&["mx.mxonly.test"]);
        domain.exists = false;
        let pipeline = pipeline_with(Arc::new(stub().with_domain("mxonly.test", domain)));

        let result = pipeline.validate_email("jane@mxonly.test", None).await;
        assert!(result.facts.domain_exists);
        assert_eq!(result.status, Status::Valid);
    }

    #[tokio::test]
    async fn test_invalid_syntax_skips_dns() {
        let resolver = Arc::new(stub());
        let pipeline = pipeline_with(resolver.clone());

        for raw in ["not-an-email", "a@b", "user name@example.com", ""] {
            let result = pipeline.validate_email(raw, None).await;
            assert!(!result.facts.syntax_valid);
            assert_eq!(result.status, Status::Invalid);
            assert_eq!(result.score, 0);
            assert!(!result.facts.is_free_provider);
            assert_eq!(result.risk_factors[0], "Invalid email syntax");
        }

        assert_eq!(resolver.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_normalizes_input() {
        let pipeline = pipeline_with(Arc::new(stub()));
        let result = pipeline.validate_email("  Jane.Doe@Example.COM ", None).await;

        assert_eq!(result.email, "jane.doe@example.com");
        assert_eq!(result.local_part, "jane.doe");
        assert_eq!(result.domain, "example.com");
        assert_eq!(result.status, Status::Valid);
    }

    #[tokio::test]
    async fn test_validation_is_idempotent() {
        let pipeline = pipeline_with(Arc::new(stub()));
        let first = pipeline.validate_email("info@smallbiz.test", None).await;
        let second = pipeline.validate_email("info@smallbiz.test", None).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_auth_checks_can_be_disabled() {
        let resolver = Arc::new(stub());
        let config = ValidationConfig {
            enable_auth_checks: false,
            ..Default::default()
        };
        let pipeline = ValidationPipeline::with_components(
            config,
            resolver.clone(),
            Arc::new(HeuristicEstimator::new()),
        );

        let result = pipeline.validate_email("jane@example.com", None).await;
        assert!(!result.facts.authentication.checked);
        assert_eq!(resolver.calls("SPF", "example.com"), 0);
        assert_eq!(resolver.calls("DMARC", "example.com"), 0);
        assert_eq!(resolver.calls("MX", "example.com"), 1);
    }

    #[tokio::test]
    async fn test_missing_auth_records_are_informational() {
        let mut domain = StubDomain::mail(&["mx.noauth.test"]);
        domain.spf = None;
        domain.dmarc = None;
        let pipeline = pipeline_with(Arc::new(stub().with_domain("noauth.test", domain)));

        let result = pipeline.validate_email("jane@noauth.test", None).await;
        assert_eq!(result.score, 100);
        assert_eq!(result.status, Status::Valid);
        assert_eq!(result.risk_factors, vec!["No SPF record", "No DMARC record"]);
    }

    #[tokio::test]
    async fn test_cached_outcome_skips_dns() {
        let resolver = Arc::new(stub());
        let cache = Arc::new(MemoryResultCache::default());
        let pipeline = pipeline_with(resolver.clone()).with_result_cache(cache.clone());

        let mut stored = pipeline.validate_email("jane@example.com", None).await;
        stored.status = Status::Risky;
        cache.store("owner-1", &stored);
        let calls_before = resolver.total_calls();

        let result = pipeline.validate_email("JANE@example.com", Some("owner-1")).await;
        assert_eq!(result.status, Status::Risky);
        assert_eq!(result.email, "jane@example.com");
        assert_eq!(resolver.total_calls(), calls_before);

        // Another owner does not see the stored outcome
        let result = pipeline.validate_email("jane@example.com", Some("owner-2")).await;
        assert_eq!(result.status, Status::Valid);
        assert!(resolver.total_calls() > calls_before);
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = ValidationConfig {
            dns_attempts: 0,
            ..ValidationConfig::default()
        };
        let result = ValidationPipeline::new(config);
        assert!(matches!(result, Err(ValidationError::ConfigurationError(_))));

        let config = ValidationConfig {
            dns_timeout_ms: 0,
            ..ValidationConfig::default()
        };
        let result = ValidationPipeline::new(config);
        assert!(matches!(result, Err(ValidationError::ConfigurationError(_))));
    }

    #[tokio::test]
    async fn test_cached_outcome_matches_fresh_result() {
        let resolver = Arc::new(stub());
        let cache = Arc::new(MemoryResultCache::default());
        let pipeline = pipeline_with(resolver.clone()).with_result_cache(cache.clone());

        for email in ["user@gmail.com", "x@gmial.com"] {
            let fresh = pipeline.validate_email(email, None).await;
            cache.store("owner-1", &fresh);

            let cached = pipeline.validate_email(email, Some("owner-1")).await;
            assert_eq!(cached.status, fresh.status);
            assert_eq!(cached.score, fresh.score);
            assert_eq!(cached.risk_factors, fresh.risk_factors);
            assert_eq!(cached.facts.suggested_correction, fresh.facts.suggested_correction);
        }

        let cached = pipeline.validate_email("user@gmail.com", Some("owner-1")).await;
        assert_eq!(cached.score, 95);
        assert_eq!(cached.risk_factors, vec!["Free email provider"]);
    }

    #[tokio::test]
    async fn test_stored_failure_is_not_replayed() {
        let resolver = Arc::new(stub());
        let cache = Arc::new(MemoryResultCache::default());
        let pipeline = pipeline_with(resolver.clone()).with_result_cache(cache.clone());

        cache.store("owner-1", &ValidationResult::internal_failure("jane@example.com"));
        let result = pipeline.validate_email("jane@example.com", Some("owner-1")).await;
        assert_eq!(result.status, Status::Valid);
        assert!(resolver.total_calls() > 0);
    }

    #[tokio::test]
    async fn test_cache_failure_falls_back_to_validation() {
        let pipeline = pipeline_with(Arc::new(stub())).with_result_cache(Arc::new(UnavailableCache));
        let result = pipeline.validate_email("user@gmail.com", Some("owner-1")).await;
        assert_eq!(result.status, Status::Valid);
        assert_eq!(result.score, 95);
    }

    #[tokio::test]
    async fn test_resolver_fault_is_contained() {
        let faulty = StubDomain {
            panics: true,
            ..StubDomain::mail(&["mx.faulty.test"])
        };
        let pipeline = pipeline_with(Arc::new(stub().with_domain("faulty.test", faulty)));

        let result = pipeline.validate_email("jane@faulty.test", None).await;
        assert_eq!(result, ValidationResult::internal_failure("jane@faulty.test"));
    }

    #[tokio::test]
    async fn test_pipeline_stats() {
        let pipeline = pipeline_with(Arc::new(stub()));
        pipeline.validate_email("user@gmail.com", None).await;
        pipeline.validate_email("broken", None).await;

        let stats = pipeline.get_stats();
        assert!(stats.disposable_domains_count > 100);
        assert!(stats.role_prefixes_count > 0);
        assert!(stats.free_providers_count > 0);
        assert!(stats.typo_entries_count > 0);
        assert_eq!(stats.validations_total, 2);
        assert_eq!(stats.domain_resolutions_total, 1);
        assert_eq!(stats.batches_total, 0);
    }
}
