//! Certificate held by a talent, in typed and raw (data store row) form.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ComplianceError;

/// A recorded certification. Never mutated; it expires by comparison with
/// the reference instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TalentCertificate {
    pub course_code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub issuer: String,
}

impl TalentCertificate {
    pub fn new(course_code: impl Into<String>, issuer: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            course_code: course_code.into(),
            issued_at,
            expires_at: None,
            issuer: issuer.into(),
        }
    }

    pub fn expiring(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Valid at `now` when it has no expiry or expires strictly after `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

/// Certificate row as stored, dates still as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub course_code: String,
    pub issued_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    pub issuer: String,
}

impl TryFrom<&CertificateRecord> for TalentCertificate {
    type Error = ComplianceError;

    fn try_from(record: &CertificateRecord) -> Result<Self, Self::Error> {
        let issued_at = parse_date("issued_at", &record.issued_at)?;
        let expires_at = match record.expires_at.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_date("expires_at", raw)?),
        };

        Ok(Self {
            course_code: record.course_code.clone(),
            issued_at,
            expires_at,
            issuer: record.issuer.clone(),
        })
    }
}

impl TryFrom<CertificateRecord> for TalentCertificate {
    type Error = ComplianceError;

    fn try_from(record: CertificateRecord) -> Result<Self, Self::Error> {
        Self::try_from(&record)
    }
}

/// RFC 3339 timestamp, or a bare `YYYY-MM-DD` date taken as midnight UTC.
fn parse_date(field: &'static str, raw: &str) -> Result<DateTime<Utc>, ComplianceError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ComplianceError::MalformedDate {
            field,
            value: raw.to_string(),
        })
}
