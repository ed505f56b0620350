//! Bulk orchestration
//!
//! A batch resolves every distinct domain exactly once, in chunks of at most
//! `bulk_concurrency` domains, and writes each result into the slot of its
//! input index so output order always matches input order.

use crate::{
    syntax::Address,
    validation_pipeline::{DomainDns, ValidationPipeline},
    BatchReport, BatchSummary, ValidationResult,
};
use futures::{future::join_all, FutureExt};
use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

impl ValidationPipeline {
    /// Validate an ordered list of addresses
    ///
    /// `results[i]` always corresponds to `emails[i]`, duplicates included. A
    /// fault while handling one address or domain only affects the addresses
    /// involved.
    #[instrument(skip_all, fields(batch_size = emails.len()))]
    pub async fn validate_batch(&self, emails: &[String], known_owner_id: Option<&str>) -> BatchReport {
        let started = Instant::now();
        self.counters.batches.fetch_add(1, Ordering::Relaxed);
        self.counters
            .validations
            .fetch_add(emails.len() as u64, Ordering::Relaxed);

        info!("Batch validation started: {} address(es)", emails.len());

        let addresses: Vec<Address> = emails.iter().map(|email| Address::parse(email)).collect();
        let mut slots: Vec<Option<ValidationResult>> = vec![None; addresses.len()];

        let cached = match known_owner_id {
            Some(owner_id) => {
                let mut seen = HashSet::new();
                let unique: Vec<String> = addresses
                    .iter()
                    .map(|address| address.normalized().to_string())
                    .filter(|email| seen.insert(email.clone()))
                    .collect();
                self.cached_outcomes(owner_id, &unique).await
            }
            None => HashMap::new(),
        };

        let mut domains: Vec<&str> = Vec::new();
        let mut seen_domains: HashSet<&str> = HashSet::new();
        let mut cache_hits = 0usize;

        for (index, address) in addresses.iter().enumerate() {
            if let Some(outcome) = cached.get(address.normalized()) {
                slots[index] = Some(outcome.clone().into_result(&self.typo_detector));
                cache_hits += 1;
                continue;
            }

            if !address.is_valid_syntax() || address.domain().is_empty() {
                slots[index] = Some(self.assemble_guarded(address, None));
                continue;
            }

            if seen_domains.insert(address.domain()) {
                domains.push(address.domain());
            }
        }

        debug!(
            "{} cached, {} distinct domain(s) to resolve",
            cache_hits,
            domains.len()
        );

        let domain_facts = self.resolve_domains(&domains).await;

        for (index, address) in addresses.iter().enumerate() {
            if slots[index].is_some() {
                continue;
            }

            slots[index] = Some(match domain_facts.get(address.domain()) {
                Some(Some(dns)) => self.assemble_guarded(address, Some(dns)),
                _ => ValidationResult::internal_failure(address.normalized()),
            });
        }

        let results: Vec<ValidationResult> = slots
            .into_iter()
            .zip(&addresses)
            .map(|(slot, address)| {
                slot.unwrap_or_else(|| ValidationResult::internal_failure(address.normalized()))
            })
            .collect();

        let summary = BatchSummary::from_results(&results);

        info!(
            "Batch validation complete in {:?}: {} valid, {} risky, {} invalid, {} domain(s) resolved",
            started.elapsed(),
            summary.valid,
            summary.risky,
            summary.invalid,
            domains.len()
        );

        BatchReport { results, summary }
    }

    /// Resolve each domain once, at most `bulk_concurrency` at a time
    ///
    /// A domain whose resolution faulted maps to `None`.
    async fn resolve_domains(&self, domains: &[&str]) -> HashMap<String, Option<DomainDns>> {
        let chunk_size = self.config().bulk_concurrency.max(1);
        let mut resolved = HashMap::with_capacity(domains.len());

        for (chunk_index, chunk) in domains.chunks(chunk_size).enumerate() {
            debug!("Resolving chunk {} ({} domain(s))", chunk_index, chunk.len());

            let lookups = chunk.iter().map(|&domain| async move {
                let outcome = AssertUnwindSafe(self.resolve_domain(domain))
                    .catch_unwind()
                    .await;
                if outcome.is_err() {
                    warn!("Resolution of {} faulted, affected addresses marked invalid", domain);
                }
                (domain.to_string(), outcome.ok())
            });

            resolved.extend(join_all(lookups).await);
        }

        resolved
    }

    fn assemble_guarded(&self, address: &Address, dns: Option<&DomainDns>) -> ValidationResult {
        catch_unwind(AssertUnwindSafe(|| self.assemble_result(address, dns))).unwrap_or_else(|_| {
            warn!("Result assembly faulted for {}", self.privacy().redact(address.normalized()));
            ValidationResult::internal_failure(address.normalized())
        })
    }
}
