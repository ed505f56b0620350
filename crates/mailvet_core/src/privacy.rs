//! Address redaction for logs
//!
//! Addresses never reach the logs in clear. The local part is replaced by a
//! short salted SHA-256 prefix so the same address can still be correlated
//! across log lines, while the domain is kept as is.

use sha2::{Digest, Sha256};
use std::fmt;
use tracing::debug;

/// Hex characters of the digest kept in redacted output
const REDACTED_PREFIX_LEN: usize = 8;

/// Privacy-preserving email processor with salted hashing
#[derive(Clone)]
pub struct PrivacyProcessor {
    salt: Vec<u8>,
}

impl PrivacyProcessor {
    pub fn new(salt: Vec<u8>) -> Self {
        debug!("Privacy processor initialized with {}-byte salt", salt.len());
        Self { salt }
    }

    /// Use the configured salt, or a random one when none is set
    pub fn from_config(salt: Option<&str>) -> Self {
        match salt {
            Some(salt) if !salt.is_empty() => Self::new(salt.as_bytes().to_vec()),
            _ => Self::with_random_salt(),
        }
    }

    /// Create a privacy processor with a random salt
    ///
    /// Hashes are not stable across restarts with a random salt.
    pub fn with_random_salt() -> Self {
        use std::collections::hash_map::RandomState;
        use std::hash::{BuildHasher, Hasher};
        use std::time::SystemTime;

        let mut salt = Vec::with_capacity(32);
        while salt.len() < 32 {
            let mut hasher = RandomState::new().build_hasher();
            hasher.write_u128(
                SystemTime::now()
                    .duration_since(SystemTime::UNIX_EPOCH)
                    .map(|elapsed| elapsed.as_nanos())
                    .unwrap_or_default(),
            );
            salt.extend_from_slice(&hasher.finish().to_be_bytes());
        }

        Self::new(salt)
    }

    /// Hex-encoded SHA-256 of the salted local part
    ///
    /// # Example
    /// ```rust
    /// use mailvet_core::privacy::PrivacyProcessor;
    ///
    /// let processor = PrivacyProcessor::new(b"salt".to_vec());
    /// let hash = processor.hash_local_part("john.doe");
    /// assert_eq!(hash.len(), 64);
    /// ```
    pub fn hash_local_part(&self, local_part: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.salt);
        hasher.update(local_part.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// `<hash prefix>@domain`, or just the hash prefix when there is no `@`
    pub fn redact(&self, email: &str) -> String {
        match email.rsplit_once('@') {
            Some((local_part, domain)) => {
                let hash = self.hash_local_part(local_part);
                format!("{}@{}", &hash[..REDACTED_PREFIX_LEN], domain)
            }
            None => self.hash_local_part(email)[..REDACTED_PREFIX_LEN].to_string(),
        }
    }
}

impl fmt::Debug for PrivacyProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivacyProcessor")
            .field("salt_len", &self.salt.len())
            .finish()
    }
}

mod hex {
    pub fn encode(data: impl AsRef<[u8]>) -> String {
        data.as_ref()
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect()
    }
}
