//! Static local-part and domain heuristics
//!
//! Role-based prefixes, free consumer providers, known domain misspellings and
//! suspicious local-part patterns. All tables are built once and shared
//! read-only by every request.

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;
use textdistance::str::levenshtein;
use tracing::debug;

const ROLE_PREFIXES: &[&str] = &[
    "info", "admin", "administrator", "support", "sales", "contact", "help", "hello",
    "team", "office", "marketing", "webmaster", "postmaster", "hostmaster", "abuse",
    "noreply", "no-reply", "donotreply", "billing", "accounts", "accounting", "hr",
    "jobs", "careers", "recruiting", "feedback", "press", "media", "legal", "privacy",
    "security", "enquiries", "inquiries", "service", "orders", "newsletter",
];

const FREE_PROVIDERS: &[&str] = &[
    // Google
    "gmail.com", "googlemail.com",
    // Microsoft
    "outlook.com", "hotmail.com", "live.com", "msn.com",
    // Yahoo
    "yahoo.com", "ymail.com", "rocketmail.com",
    // Apple
    "icloud.com", "me.com", "mac.com",
    // Other large consumer providers
    "aol.com", "protonmail.com", "proton.me", "zoho.com", "mail.com", "gmx.com",
    "gmx.de", "web.de", "yandex.com", "yandex.ru", "tutanota.com", "tuta.com",
    "fastmail.com", "qq.com", "163.com", "naver.com",
];

/// Canonical provider domain -> known misspellings
const TYPO_MAP: &[(&str, &[&str])] = &[
    (
        "gmail.com",
        &[
            "gmial.com", "gmai.com", "gmal.com", "gmaill.com", "gamil.com", "gnail.com",
            "gmali.com", "gmaik.com", "gmsil.com", "gmail.co", "gmail.cm", "gmail.con",
            "gmail.om", "gmail.cmo",
        ],
    ),
    (
        "yahoo.com",
        &[
            "yaho.com", "yahooo.com", "yhoo.com", "yaoo.com", "yahho.com", "yahoo.co",
            "yahoo.con", "yahoo.cm",
        ],
    ),
    (
        "hotmail.com",
        &[
            "hotmal.com", "hotmial.com", "hotmai.com", "hotmaill.com", "hotnail.com",
            "htomail.com", "hotmail.co", "hotmail.con", "hotmail.cm",
        ],
    ),
    (
        "outlook.com",
        &[
            "outlok.com", "outloo.com", "outllook.com", "otlook.com", "outlook.co",
            "outlook.con", "outlook.cm",
        ],
    ),
    ("icloud.com", &["iclod.com", "icoud.com", "icluod.com", "icloud.co", "icloud.con"]),
    ("aol.com", &["aoll.com", "aol.co", "aol.con"]),
    ("protonmail.com", &["protonmal.com", "protonmial.com", "protonmail.co", "protonmail.con"]),
];

static ROLE_PREFIX_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| ROLE_PREFIXES.iter().copied().collect());

static FREE_PROVIDER_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| FREE_PROVIDERS.iter().copied().collect());

/// Misspelling -> canonical provider domain
static TYPO_LOOKUP: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    TYPO_MAP
        .iter()
        .flat_map(|(canonical, typos)| typos.iter().map(move |typo| (*typo, *canonical)))
        .collect()
});

static SUSPICIOUS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // keyboard mash
        r"(qwert|asdf|zxcv|hjkl|yuiop|wasd)",
        // same character four or more times in a row
        r"(a{4,}|b{4,}|c{4,}|d{4,}|e{4,}|f{4,}|g{4,}|h{4,}|i{4,}|j{4,}|k{4,}|l{4,}|m{4,}|n{4,}|o{4,}|p{4,}|q{4,}|r{4,}|s{4,}|t{4,}|u{4,}|v{4,}|w{4,}|x{4,}|y{4,}|z{4,})",
        // placeholder words
        r"^(test|demo|sample|null|undefined|example|fake|asd)[0-9._-]*$",
        // long digit runs
        r"[0-9]{6,}",
        // malformed punctuation
        r"^\.",
        r"\.$",
        r"\.\.",
        r"[!#$%&'*+/=?^_`{|}~.-]{3,}",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("suspicious pattern is a valid regex"))
    .collect()
});

/// Exact role prefix, or a role prefix followed by `.`, `_`, `-` or only digits
pub fn is_role_based(local_part: &str) -> bool {
    let local_part = local_part.trim().to_lowercase();

    if ROLE_PREFIX_SET.contains(local_part.as_str()) {
        return true;
    }

    ROLE_PREFIXES.iter().any(|prefix| match local_part.strip_prefix(prefix) {
        Some(rest) if !rest.is_empty() => {
            rest.starts_with(['.', '_', '-']) || rest.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    })
}

/// Exact match against large consumer mail providers
pub fn is_free_provider(domain: &str) -> bool {
    FREE_PROVIDER_SET.contains(domain.trim().to_lowercase().as_str())
}

/// Canonical provider domain when `domain` is a known misspelling
pub fn check_typo(domain: &str) -> Option<String> {
    TYPO_LOOKUP
        .get(domain.trim().to_lowercase().as_str())
        .map(|canonical| canonical.to_string())
}

/// True if the local part looks fabricated or malformed
pub fn has_suspicious_pattern(local_part: &str) -> bool {
    let local_part = local_part.to_lowercase();
    SUSPICIOUS_PATTERNS
        .iter()
        .any(|pattern| pattern.is_match(&local_part))
}

/// Number of entries in each table, for monitoring
pub fn role_prefix_count() -> usize {
    ROLE_PREFIX_SET.len()
}

pub fn free_provider_count() -> usize {
    FREE_PROVIDER_SET.len()
}

pub fn typo_entry_count() -> usize {
    TYPO_LOOKUP.len()
}

/// Typo detector: explicit misspelling map, optionally followed by an
/// edit-distance comparison against the free provider list
#[derive(Debug, Clone, Default)]
pub struct TypoDetector {
    fuzzy: bool,
}

impl TypoDetector {
    pub fn new(fuzzy: bool) -> Self {
        debug!(
            "Typo detector initialized with {} known misspellings (fuzzy: {})",
            typo_entry_count(),
            fuzzy
        );
        Self { fuzzy }
    }

    /// Check if a domain might be a typo of a major provider
    ///
    /// # Returns
    /// * `Some(suggestion)` if likely typo with suggested correction
    /// * `None` if not a typo
    pub fn check_typo(&self, domain: &str) -> Option<String> {
        if let Some(suggestion) = check_typo(domain) {
            debug!("Known typo detected: {} -> {}", domain, suggestion);
            return Some(suggestion);
        }

        if self.fuzzy {
            return fuzzy_match(domain);
        }

        None
    }
}

/// Distance 1 for short provider domains, up to 2 for longer ones
fn fuzzy_match(domain: &str) -> Option<String> {
    let domain = domain.trim().to_lowercase();
    if domain.is_empty() || is_free_provider(&domain) {
        return None;
    }

    for provider in FREE_PROVIDERS {
        let distance = levenshtein(&domain, provider);
        let is_typo = if provider.len() <= 9 {
            distance == 1
        } else {
            distance > 0 && distance <= 2
        };

        if is_typo {
            debug!(
                "Potential typo detected: {} -> {} (distance: {})",
                domain, provider, distance
            );
            return Some(provider.to_string());
        }
    }

    None
}
