//! Deterministic scoring and classification
//!
//! Scoring starts at 100 and subtracts a fixed deduction per negative signal.
//! Deductions are summed and the result clamped to `0..=100`.

use crate::{Status, ValidationFacts};

pub const SYNTAX_INVALID_DEDUCTION: u32 = 100;
pub const DOMAIN_MISSING_DEDUCTION: u32 = 100;
pub const NO_MX_DEDUCTION: u32 = 50;
pub const DISPOSABLE_DEDUCTION: u32 = 40;
pub const TYPO_DEDUCTION: u32 = 35;
pub const ROLE_BASED_DEDUCTION: u32 = 20;
pub const SUSPICIOUS_PATTERN_DEDUCTION: u32 = 15;
pub const CATCH_ALL_DEDUCTION: u32 = 10;
pub const FREE_PROVIDER_DEDUCTION: u32 = 5;

/// Below this score an address is risky regardless of other flags
pub const HIGH_RISK_THRESHOLD: u8 = 50;
/// Below this score an address cannot be valid
pub const VALID_THRESHOLD: u8 = 70;

pub const INTERNAL_FAILURE_FACTOR: &str = "Validation failed due to an internal error";

/// Score in `0..=100`
pub fn score(facts: &ValidationFacts) -> u8 {
    let deductions = [
        (!facts.syntax_valid, SYNTAX_INVALID_DEDUCTION),
        (!facts.domain_exists, DOMAIN_MISSING_DEDUCTION),
        (!facts.mx_present, NO_MX_DEDUCTION),
        (facts.is_disposable, DISPOSABLE_DEDUCTION),
        (facts.has_typo, TYPO_DEDUCTION),
        (facts.is_role_based, ROLE_BASED_DEDUCTION),
        (facts.has_suspicious_pattern, SUSPICIOUS_PATTERN_DEDUCTION),
        (facts.is_catch_all, CATCH_ALL_DEDUCTION),
        (facts.is_free_provider, FREE_PROVIDER_DEDUCTION),
    ];

    let total: u32 = deductions
        .iter()
        .filter(|(applies, _)| *applies)
        .map(|(_, points)| points)
        .sum();

    (100 - total.min(100)) as u8
}

/// Status from facts and score, first matching rule wins
pub fn classify(facts: &ValidationFacts, score: u8) -> Status {
    if !facts.syntax_valid || !facts.domain_exists {
        return Status::Invalid;
    }

    if !facts.mx_present {
        return Status::Invalid;
    }

    if score < HIGH_RISK_THRESHOLD || facts.is_disposable || facts.has_typo {
        return Status::Risky;
    }

    if score < VALID_THRESHOLD
        || facts.is_role_based
        || facts.is_catch_all
        || facts.has_suspicious_pattern
    {
        return Status::Risky;
    }

    Status::Valid
}

/// Human-readable negative signals in a fixed order
pub fn risk_factors(facts: &ValidationFacts) -> Vec<String> {
    let mut factors = Vec::new();

    if !facts.syntax_valid {
        factors.push("Invalid email syntax".to_string());
    }
    if !facts.domain_exists {
        factors.push("Domain does not exist".to_string());
    }
    if !facts.mx_present {
        factors.push("No MX records found".to_string());
    }
    if facts.is_disposable {
        factors.push("Disposable email domain".to_string());
    }
    if facts.is_role_based {
        factors.push("Role-based email address".to_string());
    }
    if facts.is_catch_all {
        factors.push("Catch-all domain".to_string());
    }
    if facts.is_free_provider {
        factors.push("Free email provider".to_string());
    }
    if facts.has_suspicious_pattern {
        factors.push("Suspicious local part pattern".to_string());
    }
    if facts.has_typo {
        match &facts.suggested_correction {
            Some(suggestion) => factors.push(format!("Possible typo: did you mean {suggestion}?")),
            None => factors.push("Possible domain typo".to_string()),
        }
    }
    if facts.mx_present && facts.reachability.attempted && !facts.reachability.reachable {
        factors.push("Mail server unreachable".to_string());
    }

    // Informational only, never part of the score
    let auth = &facts.authentication;
    if auth.checked && facts.domain_exists && facts.mx_present {
        if !auth.has_spf {
            factors.push("No SPF record".to_string());
        }
        if !auth.has_dmarc {
            factors.push("No DMARC record".to_string());
        }
    }

    factors
}

/// Score, status and risk factors in one pass
pub fn evaluate(facts: &ValidationFacts) -> (u8, Status, Vec<String>) {
    let score = score(facts);
    let status = classify(facts, score);
    (score, status, risk_factors(facts))
}
