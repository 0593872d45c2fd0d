//! Eligibility scoring derived from a [`CoverageResult`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::certificate::CertificateRecord;
use crate::coverage::{CoverageResult, compute_coverage_from_records};
use crate::error::ComplianceError;

const FULL_COVERAGE_POINTS: u8 = 30;
const NO_EXPIRY_RISK_POINTS: u8 = 10;
const TRUSTED_ISSUER_POINTS: usize = 10;

/// Upper bound of the trusted-issuer bonus. One recent trusted certificate
/// already earns the whole bonus; more do not add anything.
pub const TRUSTED_ISSUER_BONUS_CAP: u8 = 10;

/// Codes the recruiter rescoring flow requires of every applicant.
pub const DEFAULT_SCREENING_CODES: [&str; 3] = ["H2S", "BOSIET", "FIRST_AID"];

/// Base score an application starts from before compliance points.
pub const DEFAULT_BASE_SCORE: i64 = 50;

/// Compliance points, in `[0, 50]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComplianceScore(u8);

impl ComplianceScore {
    pub const MAX: ComplianceScore =
        ComplianceScore(FULL_COVERAGE_POINTS + NO_EXPIRY_RISK_POINTS + TRUSTED_ISSUER_BONUS_CAP);

    pub fn value(self) -> u8 {
        self.0
    }
}

impl core::fmt::Display for ComplianceScore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ranking score stored on an application. Not clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationScore(i64);

impl ApplicationScore {
    pub fn value(self) -> i64 {
        self.0
    }
}

impl core::fmt::Display for ApplicationScore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn calculate_compliance_score(coverage: &CoverageResult) -> ComplianceScore {
    let mut points = 0;
    if coverage.is_full() {
        points += FULL_COVERAGE_POINTS;
    }
    if !coverage.expires_soon {
        points += NO_EXPIRY_RISK_POINTS;
    }

    let bonus = coverage
        .recent_trusted_issuer_count
        .saturating_mul(TRUSTED_ISSUER_POINTS)
        .min(TRUSTED_ISSUER_BONUS_CAP as usize);
    // bonus <= cap, fits in u8
    points += bonus as u8;

    ComplianceScore(points)
}

/// `base + compliance`, with `base` passed through whatever its range.
pub fn update_application_score(base: i64, coverage: &CoverageResult) -> ApplicationScore {
    let compliance = calculate_compliance_score(coverage);
    ApplicationScore(base.saturating_add(i64::from(compliance.value())))
}

/// Outcome of rescoring one application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Screening {
    pub coverage: CoverageResult,
    pub compliance: ComplianceScore,
    pub score: ApplicationScore,
}

/// Parse the applicant's certificate rows and rescore the application.
pub fn screen_application<S: AsRef<str>>(
    base: i64,
    records: &[CertificateRecord],
    required: &[S],
    now: DateTime<Utc>,
) -> Result<Screening, ComplianceError> {
    let coverage = compute_coverage_from_records(records, required, now)?;
    let compliance = calculate_compliance_score(&coverage);
    let score = update_application_score(base, &coverage);

    info!(
        coverage_percent = coverage.coverage_percent,
        missing = coverage.missing_codes.len(),
        compliance = compliance.value(),
        score = score.value(),
        "application screened"
    );

    Ok(Screening {
        coverage,
        compliance,
        score,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    use super::*;

    fn coverage(percent: f64, expires_soon: bool, trusted: usize) -> CoverageResult {
        CoverageResult {
            coverage_percent: percent,
            expires_soon,
            expiring_soon_count: usize::from(expires_soon),
            recent_trusted_issuer_count: trusted,
            missing_codes: Vec::new(),
            valid_codes: Vec::new(),
        }
    }

    #[test]
    fn full_safe_trusted_coverage_scores_fifty() {
        assert_eq!(calculate_compliance_score(&coverage(100.0, false, 1)).value(), 50);
        assert_eq!(calculate_compliance_score(&coverage(100.0, false, 1)), ComplianceScore::MAX);
    }

    /// The trusted-issuer bonus is deliberately capped at one certificate's
    /// worth: five recent certificates still add only ten points.
    #[test]
    fn trusted_issuer_bonus_saturates_at_cap() {
        assert_eq!(calculate_compliance_score(&coverage(100.0, false, 5)).value(), 50);
        assert_eq!(calculate_compliance_score(&coverage(0.0, true, usize::MAX)).value(), TRUSTED_ISSUER_BONUS_CAP);
    }

    #[test]
    fn partial_coverage_with_expiry_risk() {
        assert_eq!(calculate_compliance_score(&coverage(66.6, true, 0)).value(), 0);
        assert_eq!(calculate_compliance_score(&coverage(66.6, false, 0)).value(), 10);
    }

    #[test]
    fn base_score_is_not_clamped() {
        let full = coverage(100.0, false, 1);
        assert_eq!(update_application_score(-500, &full).value(), -450);
        assert_eq!(update_application_score(1_000, &full).value(), 1_050);
    }

    #[test]
    fn screening_uses_recruiter_defaults() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let record = |code: &str, issuer: &str| CertificateRecord {
            course_code: code.to_string(),
            issued_at: (now - Duration::days(90)).to_rfc3339(),
            expires_at: Some((now + Duration::days(365)).format("%Y-%m-%d").to_string()),
            issuer: issuer.to_string(),
        };
        let records = vec![record("h2s", "RMTC"), record("BOSIET", "OPITO"), record("FIRST_AID", "RMTC")];

        let screening = screen_application(DEFAULT_BASE_SCORE, &records, &DEFAULT_SCREENING_CODES, now).unwrap();
        assert_eq!(screening.coverage.coverage_percent, 100.0);
        assert_eq!(screening.coverage.recent_trusted_issuer_count, 2);
        assert_eq!(screening.compliance.value(), 50);
        assert_eq!(screening.score.value(), 100);
    }

    #[test]
    fn screening_rejects_bad_rows() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let records = vec![CertificateRecord {
            course_code: "H2S".to_string(),
            issued_at: "yesterday".to_string(),
            expires_at: None,
            issuer: "RMTC".to_string(),
        }];
        assert!(screen_application(DEFAULT_BASE_SCORE, &records, &DEFAULT_SCREENING_CODES, now).is_err());
    }

    proptest! {
        /// Property: the compliance score never leaves [0, 50] and the
        /// application score is exactly base plus compliance.
        #[test]
        fn scores_are_bounded_and_additive(
            percent in 0.0f64..=100.0,
            expires_soon in any::<bool>(),
            trusted in 0usize..20,
            base in -10_000i64..10_000,
        ) {
            let result = coverage(percent, expires_soon, trusted);
            let compliance = calculate_compliance_score(&result);

            prop_assert!(compliance <= ComplianceScore::MAX);
            prop_assert_eq!(
                update_application_score(base, &result).value(),
                base + i64::from(compliance.value())
            );
        }
    }
}
