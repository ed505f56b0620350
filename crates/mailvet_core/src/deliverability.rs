//! SPF and DMARC record interpretation
//!
//! Turns the raw TXT records returned by the DNS layer into
//! [`AuthenticationFacts`]. Absent or malformed records are reported as
//! missing; nothing here affects the score.

use crate::AuthenticationFacts;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Parsed SPF record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpfAnalysis {
    pub exists: bool,
    /// Terminal `-all` mechanism
    pub is_strict: bool,
}

/// Parsed DMARC record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DmarcAnalysis {
    pub exists: bool,
    pub policy: Option<String>,
    pub percentage: Option<u8>,
}

/// Deliverability analyzer for SPF and DMARC records
pub struct DeliverabilityAnalyzer;

impl DeliverabilityAnalyzer {
    /// Analyze SPF record for strictness and validity
    ///
    /// # Arguments
    /// * `spf_record` - Raw SPF record string (e.g., "v=spf1 include:_spf.google.com ~all")
    pub fn analyze_spf_record(spf_record: Option<&str>) -> SpfAnalysis {
        let Some(record) = spf_record else {
            debug!("No SPF record found");
            return SpfAnalysis::default();
        };

        let record_lower = record.trim().to_lowercase();
        let mut terms = record_lower.split_whitespace();

        if terms.next() != Some("v=spf1") {
            warn!("Invalid SPF record format: {}", record);
            return SpfAnalysis::default();
        }

        let all_mechanism = terms.find(|term| term.trim_start_matches(['+', '-', '~', '?']) == "all");
        let is_strict = all_mechanism == Some("-all");
        debug!("SPF 'all' mechanism: {:?} (strict: {})", all_mechanism, is_strict);

        SpfAnalysis {
            exists: true,
            is_strict,
        }
    }

    /// Analyze DMARC record for policy and settings
    ///
    /// # Arguments
    /// * `dmarc_record` - Raw DMARC record string (e.g., "v=DMARC1; p=reject; rua=mailto:dmarc@example.com")
    pub fn analyze_dmarc_record(dmarc_record: Option<&str>) -> DmarcAnalysis {
        let Some(record) = dmarc_record else {
            debug!("No DMARC record found");
            return DmarcAnalysis::default();
        };

        let tags = Self::parse_dmarc_tags(record);
        if !tags
            .get("v")
            .is_some_and(|version| version.eq_ignore_ascii_case("dmarc1"))
        {
            warn!("Invalid DMARC record format: {}", record);
            return DmarcAnalysis::default();
        }

        let policy = tags.get("p").map(|p| p.to_lowercase());
        let percentage = tags
            .get("pct")
            .and_then(|pct| pct.parse::<u8>().ok())
            .filter(|&pct| pct <= 100);

        debug!("DMARC policy: {:?}, percentage: {:?}", policy, percentage);

        DmarcAnalysis {
            exists: true,
            policy,
            percentage,
        }
    }

    /// Combine both records into the facts attached to a validation result
    pub fn authentication_facts(
        spf_record: Option<&str>,
        dmarc_record: Option<&str>,
    ) -> AuthenticationFacts {
        let spf = Self::analyze_spf_record(spf_record);
        let dmarc = Self::analyze_dmarc_record(dmarc_record);

        AuthenticationFacts {
            checked: true,
            has_spf: spf.exists,
            spf_strict: spf.is_strict,
            has_dmarc: dmarc.exists,
            dmarc_policy: dmarc.policy,
        }
    }

    /// Parse DMARC record tags into a key-value map
    fn parse_dmarc_tags(record: &str) -> HashMap<String, String> {
        record
            .split(';')
            .filter_map(|part| part.trim().split_once('='))
            .map(|(key, value)| (key.trim().to_lowercase(), value.trim().to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_spf_analysis() {
        // Strict SPF record
        let spf = DeliverabilityAnalyzer::analyze_spf_record(Some(
            "v=spf1 include:_spf.google.com -all",
        ));
        assert!(spf.exists);
        assert!(spf.is_strict);

        // Soft fail SPF record
        let spf = DeliverabilityAnalyzer::analyze_spf_record(Some(
            "v=spf1 include:_spf.google.com ~all",
        ));
        assert!(spf.exists);
        assert!(!spf.is_strict);

        // A hyphenated include is not an 'all' mechanism
        let spf = DeliverabilityAnalyzer::analyze_spf_record(Some("v=spf1 include:spf-all.example.com"));
        assert!(spf.exists);
        assert!(!spf.is_strict);

        // No SPF record
        let spf = DeliverabilityAnalyzer::analyze_spf_record(None);
        assert_eq!(spf, SpfAnalysis::default());

        // Invalid SPF record
        let spf = DeliverabilityAnalyzer::analyze_spf_record(Some("invalid record"));
        assert!(!spf.exists);
    }

    #[test]
    fn test_dmarc_analysis() {
        let dmarc = DeliverabilityAnalyzer::analyze_dmarc_record(Some(
            "v=DMARC1; p=reject; rua=mailto:dmarc@example.com",
        ));
        assert!(dmarc.exists);
        assert_eq!(dmarc.policy, Some("reject".to_string()));
        assert_eq!(dmarc.percentage, None);

        let dmarc = DeliverabilityAnalyzer::analyze_dmarc_record(Some(
            "v=DMARC1; p=Quarantine; pct=50",
        ));
        assert_eq!(dmarc.policy, Some("quarantine".to_string()));
        assert_eq!(dmarc.percentage, Some(50));

        let dmarc = DeliverabilityAnalyzer::analyze_dmarc_record(Some("v=DMARC1; p=none; pct=250"));
        assert_eq!(dmarc.percentage, None);

        assert!(!DeliverabilityAnalyzer::analyze_dmarc_record(None).exists);
        assert!(!DeliverabilityAnalyzer::analyze_dmarc_record(Some("invalid record")).exists);
    }

    #[test]
    fn test_authentication_facts() {
        let facts = DeliverabilityAnalyzer::authentication_facts(
            Some("v=spf1 mx -all"),
            Some("v=DMARC1; p=reject"),
        );
        assert_eq!(
            facts,
            AuthenticationFacts {
                checked: true,
                has_spf: true,
                spf_strict: true,
                has_dmarc: true,
                dmarc_policy: Some("reject".to_string()),
            }
        );

        let facts = DeliverabilityAnalyzer::authentication_facts(None, None);
        assert!(facts.checked);
        assert!(!facts.has_spf);
        assert!(!facts.has_dmarc);
    }

    #[test]
    fn test_dmarc_tag_parsing() {
        let tags = DeliverabilityAnalyzer::parse_dmarc_tags(
            "v=DMARC1; p=reject; pct=100; rua=mailto:dmarc@example.com; ruf=mailto:forensic@example.com",
        );

        assert_eq!(tags.get("v"), Some(&"DMARC1".to_string()));
        assert_eq!(tags.get("p"), Some(&"reject".to_string()));
        assert_eq!(tags.get("pct"), Some(&"100".to_string()));
        assert_eq!(tags.get("rua"), Some(&"mailto:dmarc@example.com".to_string()));
    }
}
