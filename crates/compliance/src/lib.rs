//! Certification coverage and eligibility scoring.
//!
//! Pure functions only: no IO, no session state. Callers pass certificate
//! data, a required code list and the reference instant.

pub mod certificate;
pub mod coverage;
pub mod error;
pub mod score;

pub use certificate::{CertificateRecord, TalentCertificate};
pub use coverage::{
    CoverageConfig, CoverageResult, compute_coverage, compute_coverage_from_records, compute_coverage_with,
};
pub use error::ComplianceError;
pub use score::{
    ApplicationScore, ComplianceScore, DEFAULT_BASE_SCORE, DEFAULT_SCREENING_CODES, Screening, TRUSTED_ISSUER_BONUS_CAP,
    calculate_compliance_score, screen_application, update_application_score,
};
