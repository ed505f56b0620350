//! Disposable domain detection
//!
//! This module provides exact and parent-domain matching against the bundled
//! list of throwaway mail domains (`data/disposable_domains.txt`).

use anyhow::Result;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

const BUNDLED_LIST: &str = include_str!("../data/disposable_domains.txt");

/// Process-wide detector loaded from the bundled list
pub static DISPOSABLE_DOMAINS: LazyLock<DisposableDetector> = LazyLock::new(|| {
    DisposableDetector::from_list_txt(BUNDLED_LIST).expect("bundled disposable list is not empty")
});

/// Check a domain against the bundled disposable list
pub fn is_disposable(domain: &str) -> bool {
    DISPOSABLE_DOMAINS.is_disposable(domain)
}

/// Read-only set of disposable domains
pub struct DisposableDetector {
    domains: HashSet<String>,
}

impl DisposableDetector {
    /// Create a new disposable detector from a list of domains
    ///
    /// # Example
    /// ```rust
    /// use mailvet_core::disposable::DisposableDetector;
    ///
    /// let domains = vec!["10minutemail.com".to_string(), "guerrillamail.com".to_string()];
    /// let detector = DisposableDetector::new(domains.into_iter())?;
    /// assert!(detector.is_disposable("10minutemail.com"));
    /// assert!(detector.is_disposable("eu.guerrillamail.com"));
    /// assert!(!detector.is_disposable("gmail.com"));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new<I>(domains: I) -> Result<Self>
    where
        I: Iterator<Item = String>,
    {
        let domains: HashSet<String> = domains
            .map(|d| d.trim().trim_end_matches('.').to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        anyhow::ensure!(!domains.is_empty(), "Disposable detector needs at least one domain");
        info!("Disposable detector loaded: {} domains", domains.len());

        Ok(Self { domains })
    }

    /// Build from the text format of `data/disposable_domains.txt`
    pub fn from_list_txt(list_content: &str) -> Result<Self> {
        Self::new(parse_disposable_list(list_content)?.into_iter())
    }

    /// True on an exact match or when `domain` is a sub-domain of a listed domain
    pub fn is_disposable(&self, domain: &str) -> bool {
        let normalized = domain.trim().trim_end_matches('.').to_lowercase();
        if normalized.is_empty() {
            return false;
        }

        let mut candidate = normalized.as_str();
        loop {
            if self.domains.contains(candidate) {
                debug!("Domain '{}' flagged as disposable (matched '{}')", normalized, candidate);
                return true;
            }
            match candidate.split_once('.') {
                Some((_, parent)) if parent.contains('.') => candidate = parent,
                _ => return false,
            }
        }
    }

    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }
}

/// One domain per line; `#` starts a comment, malformed entries are skipped
fn parse_disposable_list(content: &str) -> Result<HashSet<String>> {
    let mut skipped = Vec::new();
    let domains: HashSet<String> = content
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let entry = line.split('#').next().unwrap_or_default().trim();
            if entry.is_empty() {
                return None;
            }
            if is_listable_domain(entry) {
                Some(entry.to_ascii_lowercase())
            } else {
                skipped.push(index + 1);
                None
            }
        })
        .collect();

    if !skipped.is_empty() {
        warn!(
            "Skipped {} malformed disposable entries (first at line {})",
            skipped.len(),
            skipped[0]
        );
    }

    if domains.is_empty() {
        anyhow::bail!("Disposable list contains no usable domains");
    }

    debug!("Parsed {} disposable domains", domains.len());
    Ok(domains)
}

/// At least two LDH labels of 1-63 characters, 253 overall
fn is_listable_domain(domain: &str) -> bool {
    domain.len() <= 253
        && domain.contains('.')
        && domain.split('.').all(|label| {
            (1..=63).contains(&label.len())
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        })
}
