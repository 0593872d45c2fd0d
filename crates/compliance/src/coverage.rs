//! Coverage of a required certification list by a talent's certificates.
//!
//! For each required code the most recently issued certificate still valid
//! at `now` is selected; the selected set drives the expiry-risk and
//! trusted-issuer counts.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::certificate::{CertificateRecord, TalentCertificate};
use crate::error::ComplianceError;

/// Tunables of the coverage computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageConfig {
    /// Internal certification authority earning the recency bonus.
    pub trusted_issuer: String,
    /// A selected certificate expiring within this window counts as expiring soon.
    pub expiry_window: Duration,
    /// A trusted-issuer certificate issued within this window counts as recent.
    pub recency_window: Duration,
    /// Retired course codes and their current replacement (compared uppercased).
    pub legacy_aliases: Vec<(String, String)>,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            trusted_issuer: "RMTC".to_string(),
            expiry_window: Duration::days(60),
            recency_window: Duration::days(2 * 365),
            legacy_aliases: vec![
                ("RRTC-OK".to_string(), "RMTC-OK".to_string()),
                ("RRTC_OK".to_string(), "RMTC-OK".to_string()),
            ],
        }
    }
}

impl CoverageConfig {
    pub fn with_trusted_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.trusted_issuer = issuer.into();
        self
    }

    pub fn with_expiry_window(mut self, window: Duration) -> Self {
        self.expiry_window = window;
        self
    }

    pub fn with_recency_window(mut self, window: Duration) -> Self {
        self.recency_window = window;
        self
    }

    pub fn with_legacy_alias(mut self, legacy: impl Into<String>, current: impl Into<String>) -> Self {
        self.legacy_aliases.push((legacy.into(), current.into()));
        self
    }

    /// Canonical form of a course code: trimmed, ASCII uppercase, aliases resolved.
    pub fn normalize_code(&self, raw: &str) -> String {
        let code = raw.trim().to_ascii_uppercase();
        self.legacy_aliases
            .iter()
            .find(|(legacy, _)| legacy.trim().eq_ignore_ascii_case(&code))
            .map(|(_, current)| current.trim().to_ascii_uppercase())
            .unwrap_or(code)
    }

    fn is_trusted_issuer(&self, issuer: &str) -> bool {
        issuer.trim().eq_ignore_ascii_case(self.trusted_issuer.trim())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageResult {
    /// Share of required codes satisfied, in `[0, 100]`.
    pub coverage_percent: f64,
    pub expires_soon: bool,
    pub expiring_soon_count: usize,
    pub recent_trusted_issuer_count: usize,
    pub missing_codes: Vec<String>,
    pub valid_codes: Vec<String>,
}

impl CoverageResult {
    /// Result for an empty requirement list.
    pub fn vacuous() -> Self {
        Self {
            coverage_percent: 100.0,
            expires_soon: false,
            expiring_soon_count: 0,
            recent_trusted_issuer_count: 0,
            missing_codes: Vec::new(),
            valid_codes: Vec::new(),
        }
    }

    pub fn is_full(&self) -> bool {
        self.coverage_percent >= 100.0
    }
}

pub fn compute_coverage<S: AsRef<str>>(
    certificates: &[TalentCertificate],
    required: &[S],
    now: DateTime<Utc>,
) -> CoverageResult {
    compute_coverage_with(&CoverageConfig::default(), certificates, required, now)
}

pub fn compute_coverage_with<S: AsRef<str>>(
    config: &CoverageConfig,
    certificates: &[TalentCertificate],
    required: &[S],
    now: DateTime<Utc>,
) -> CoverageResult {
    let required = dedup_codes(config, required);
    if required.is_empty() {
        return CoverageResult::vacuous();
    }

    let mut by_code: HashMap<String, Vec<&TalentCertificate>> = HashMap::new();
    for cert in certificates {
        by_code.entry(config.normalize_code(&cert.course_code)).or_default().push(cert);
    }

    // Windows reaching past the representable range are unbounded.
    let expiry_horizon = now.checked_add_signed(config.expiry_window).unwrap_or(DateTime::<Utc>::MAX_UTC);
    let recency_floor = now.checked_sub_signed(config.recency_window).unwrap_or(DateTime::<Utc>::MIN_UTC);

    let mut valid_codes = Vec::new();
    let mut missing_codes = Vec::new();
    let mut expiring_soon_count = 0;
    let mut recent_trusted_issuer_count = 0;

    for code in required {
        let selected = by_code.get(&code).and_then(|certs| select_current(certs, now));
        let Some(cert) = selected else {
            missing_codes.push(code);
            continue;
        };

        if cert.expires_at.is_some_and(|expires_at| expires_at <= expiry_horizon) {
            expiring_soon_count += 1;
        }
        if config.is_trusted_issuer(&cert.issuer) && cert.issued_at >= recency_floor {
            recent_trusted_issuer_count += 1;
        }
        valid_codes.push(code);
    }

    let total = valid_codes.len() + missing_codes.len();
    let coverage_percent = 100.0 * valid_codes.len() as f64 / total as f64;

    debug!(
        required = total,
        satisfied = valid_codes.len(),
        expiring_soon_count,
        recent_trusted_issuer_count,
        "coverage computed"
    );

    CoverageResult {
        coverage_percent,
        expires_soon: expiring_soon_count > 0,
        expiring_soon_count,
        recent_trusted_issuer_count,
        missing_codes,
        valid_codes,
    }
}

/// Parse raw rows, then compute coverage. The first malformed date aborts.
pub fn compute_coverage_from_records<S: AsRef<str>>(
    records: &[CertificateRecord],
    required: &[S],
    now: DateTime<Utc>,
) -> Result<CoverageResult, ComplianceError> {
    let certificates = records
        .iter()
        .map(TalentCertificate::try_from)
        .collect::<Result<Vec<_>, _>>()
        .inspect_err(|err| warn!(error = %err, "rejecting certificate data"))?;
    Ok(compute_coverage(&certificates, required, now))
}

/// Latest-issued certificate valid at `now`; ties keep the first seen.
fn select_current<'a>(certs: &[&'a TalentCertificate], now: DateTime<Utc>) -> Option<&'a TalentCertificate> {
    certs
        .iter()
        .copied()
        .filter(|cert| cert.is_valid_at(now))
        .fold(None, |best: Option<&TalentCertificate>, cert| match best {
            Some(best) if best.issued_at >= cert.issued_at => Some(best),
            _ => Some(cert),
        })
}

fn dedup_codes<S: AsRef<str>>(config: &CoverageConfig, required: &[S]) -> Vec<String> {
    let mut codes: Vec<String> = Vec::with_capacity(required.len());
    for raw in required {
        let code = config.normalize_code(raw.as_ref());
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    codes
}
