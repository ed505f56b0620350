//! DNS resolution using hickory-resolver
//!
//! Every lookup fails safe: NXDOMAIN, timeouts and server errors are logged
//! and reported as a missing record, never as an error to the caller.

use anyhow::Result;
use async_trait::async_trait;
use hickory_resolver::{
    config::{ResolverConfig, ResolverOpts},
    AsyncResolver, TokioAsyncResolver,
};
use std::time::Duration;
use tracing::{debug, info};

/// Mail exchange lookup result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MxLookup {
    pub exists: bool,
    /// Exchange hosts, lowest preference value first
    pub hosts: Vec<String>,
}

impl MxLookup {
    /// Build from raw `(preference, exchange)` pairs
    pub fn from_records(mut records: Vec<(u16, String)>) -> Self {
        records.sort_by_key(|(preference, _)| *preference);

        let hosts: Vec<String> = records
            .into_iter()
            .map(|(_, exchange)| exchange.trim_end_matches('.').to_ascii_lowercase())
            .filter(|exchange| !exchange.is_empty())
            .collect();

        Self {
            exists: !hosts.is_empty(),
            hosts,
        }
    }
}

/// The record lookups the validation engine needs for one domain
#[async_trait]
pub trait DnsLookup: Send + Sync {
    /// True if any of A, AAAA or NS records resolve
    async fn domain_exists(&self, domain: &str) -> bool;

    /// Mail exchange hosts sorted by preference
    async fn resolve_mx(&self, domain: &str) -> MxLookup;

    /// First TXT record at `domain` starting with `v=spf1`
    async fn spf_record(&self, domain: &str) -> Option<String>;

    /// First TXT record at `_dmarc.<domain>` starting with `v=dmarc1`
    async fn dmarc_record(&self, domain: &str) -> Option<String>;

    async fn has_spf(&self, domain: &str) -> bool {
        self.spf_record(domain).await.is_some()
    }

    async fn has_dmarc(&self, domain: &str) -> bool {
        self.dmarc_record(domain).await.is_some()
    }
}

/// Pick the first record carrying the given version tag, case-insensitively
pub fn find_tagged_record(records: Vec<String>, tag: &str) -> Option<String> {
    records
        .into_iter()
        .find(|record| record.trim().to_ascii_lowercase().starts_with(tag))
}

/// DNS resolver wrapper with optimized configuration
pub struct DnsResolver {
    resolver: TokioAsyncResolver,
}

impl DnsResolver {
    /// Create a new DNS resolver
    ///
    /// # Arguments
    /// * `timeout_ms` - DNS query timeout in milliseconds
    /// * `attempts` - Maximum number of attempts per query
    /// * `cache_size` - Number of entries to cache
    /// * `min_ttl_secs` - Minimum TTL for positive cache entries
    pub fn new(
        timeout_ms: u64,
        attempts: usize,
        cache_size: usize,
        min_ttl_secs: u64,
    ) -> Result<Self> {
        if attempts == 0 {
            return Err(anyhow::anyhow!("DNS attempts must be at least 1"));
        }

        let config = ResolverConfig::cloudflare();

        let mut opts = ResolverOpts::default();
        opts.timeout = Duration::from_millis(timeout_ms);
        opts.attempts = attempts;
        opts.cache_size = cache_size;
        opts.positive_min_ttl = Some(Duration::from_secs(min_ttl_secs));
        opts.negative_min_ttl = Some(Duration::from_secs(30));
        opts.positive_max_ttl = Some(Duration::from_secs(3600));

        let resolver = AsyncResolver::tokio(config, opts);

        info!(
            "DNS resolver initialized - timeout: {}ms, attempts: {}, cache_size: {}",
            timeout_ms, attempts, cache_size
        );

        Ok(Self { resolver })
    }

    async fn has_a_records(&self, domain: &str) -> bool {
        match self.resolver.ipv4_lookup(domain).await {
            Ok(response) => response.iter().next().is_some(),
            Err(e) => {
                debug!("A record lookup failed for {}: {}", domain, e);
                false
            }
        }
    }

    async fn has_aaaa_records(&self, domain: &str) -> bool {
        match self.resolver.ipv6_lookup(domain).await {
            Ok(response) => response.iter().next().is_some(),
            Err(e) => {
                debug!("AAAA record lookup failed for {}: {}", domain, e);
                false
            }
        }
    }

    async fn has_ns_records(&self, domain: &str) -> bool {
        match self.resolver.ns_lookup(domain).await {
            Ok(response) => response.iter().next().is_some(),
            Err(e) => {
                debug!("NS record lookup failed for {}: {}", domain, e);
                false
            }
        }
    }

    /// Get TXT records for a name, one string per record
    pub async fn get_txt_records(&self, name: &str) -> Vec<String> {
        match self.resolver.txt_lookup(name).await {
            Ok(response) => {
                let records: Vec<String> = response
                    .iter()
                    .map(|txt| {
                        txt.txt_data()
                            .iter()
                            .map(|data| String::from_utf8_lossy(data))
                            .collect::<String>()
                    })
                    .collect();

                debug!("Found {} TXT record(s) for {}", records.len(), name);
                records
            }
            Err(e) => {
                debug!("TXT record lookup failed for {}: {}", name, e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl DnsLookup for DnsResolver {
    async fn domain_exists(&self, domain: &str) -> bool {
        let (has_a, has_aaaa, has_ns) = tokio::join!(
            self.has_a_records(domain),
            self.has_aaaa_records(domain),
            self.has_ns_records(domain)
        );

        debug!(
            "Domain {} - A: {}, AAAA: {}, NS: {}",
            domain, has_a, has_aaaa, has_ns
        );
        has_a || has_aaaa || has_ns
    }

    async fn resolve_mx(&self, domain: &str) -> MxLookup {
        match self.resolver.mx_lookup(domain).await {
            Ok(response) => {
                let records = response
                    .iter()
                    .map(|mx| (mx.preference(), mx.exchange().to_utf8()))
                    .collect();
                let lookup = MxLookup::from_records(records);
                debug!("Domain {} has {} MX record(s)", domain, lookup.hosts.len());
                lookup
            }
            Err(e) => {
                debug!("MX record lookup failed for {}: {}", domain, e);
                MxLookup::default()
            }
        }
    }

    async fn spf_record(&self, domain: &str) -> Option<String> {
        let record = find_tagged_record(self.get_txt_records(domain).await, "v=spf1");
        debug!("SPF record for {}: {:?}", domain, record);
        record
    }

    async fn dmarc_record(&self, domain: &str) -> Option<String> {
        let dmarc_domain = format!("_dmarc.{}", domain);
        let record = find_tagged_record(self.get_txt_records(&dmarc_domain).await, "v=dmarc1");
        debug!("DMARC record for {}: {:?}", domain, record);
        record
    }
}
