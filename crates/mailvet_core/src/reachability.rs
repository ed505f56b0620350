//! Mail server reachability estimation
//!
//! No SMTP handshake is performed. [`HeuristicEstimator`] infers reachability
//! from the domain's MX hosts; a real `RCPT TO` probe can replace it behind
//! the [`ReachabilityProbe`] trait without touching scoring.

use crate::ReachabilityFacts;
use async_trait::async_trait;
use tracing::debug;

/// Mail exchange host suffixes of large providers
const PROVIDER_SIGNATURES: &[&str] = &[
    "google.com",
    "googlemail.com",
    "outlook.com",
    "hotmail.com",
    "yahoodns.net",
    "icloud.com",
    "protonmail.ch",
    "zoho.com",
    "yandex.net",
    "pphosted.com",
    "mimecast.com",
    "messagingengine.com",
];

#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Estimate reachability from the MX hosts, most preferred first
    async fn probe(&self, domain: &str, mx_hosts: &[String]) -> ReachabilityFacts;
}

/// Provider-signature estimator
#[derive(Debug, Clone, Default)]
pub struct HeuristicEstimator;

impl HeuristicEstimator {
    pub fn new() -> Self {
        Self
    }

    /// True if the host is, or is a sub-domain of, a known provider exchange
    pub fn is_known_provider(host: &str) -> bool {
        let host = host.trim_end_matches('.').to_ascii_lowercase();
        PROVIDER_SIGNATURES.iter().any(|signature| {
            host == *signature
                || host
                    .strip_suffix(signature)
                    .is_some_and(|rest| rest.ends_with('.'))
        })
    }

    pub fn estimate(&self, domain: &str, mx_hosts: &[String]) -> ReachabilityFacts {
        let Some(primary) = mx_hosts.first() else {
            debug!("No MX hosts for {}, reachability not attempted", domain);
            return ReachabilityFacts::default();
        };

        if Self::is_known_provider(primary) {
            debug!("Primary MX {} for {} matches a known provider", primary, domain);
        } else {
            debug!("Primary MX {} for {} is unrecognized, assuming reachable", primary, domain);
        }

        ReachabilityFacts {
            attempted: true,
            reachable: true,
            accepts_all: false,
            mailbox_exists: None,
        }
    }
}

#[async_trait]
impl ReachabilityProbe for HeuristicEstimator {
    async fn probe(&self, domain: &str, mx_hosts: &[String]) -> ReachabilityFacts {
        self.estimate(domain, mx_hosts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_known_provider_signatures() {
        assert!(HeuristicEstimator::is_known_provider("gmail-smtp-in.l.google.com"));
        assert!(HeuristicEstimator::is_known_provider("GMAIL-SMTP-IN.L.GOOGLE.COM."));
        assert!(HeuristicEstimator::is_known_provider("example-com.mail.protection.outlook.com"));
        assert!(HeuristicEstimator::is_known_provider("mta5.am0.yahoodns.net"));

        assert!(!HeuristicEstimator::is_known_provider("mx.smallbiz.test"));
        assert!(!HeuristicEstimator::is_known_provider("notgoogle.com"));
    }

    #[tokio::test]
    async fn test_no_hosts_not_attempted() {
        let facts = HeuristicEstimator::new().probe("example.com", &[]).await;
        assert_eq!(facts, ReachabilityFacts::default());
        assert_eq!(facts.mailbox_exists, None);
    }

    #[tokio::test]
    async fn test_known_and_unknown_hosts_are_reachable() {
        let estimator = HeuristicEstimator::new();
        let expected = ReachabilityFacts {
            attempted: true,
            reachable: true,
            accepts_all: false,
            mailbox_exists: None,
        };

        let hosts = vec!["gmail-smtp-in.l.google.com".to_string()];
        assert_eq!(estimator.probe("gmail.com", &hosts).await, expected);

        let hosts = vec!["mx.smallbiz.test".to_string()];
        assert_eq!(estimator.probe("smallbiz.test", &hosts).await, expected);
    }
}
