use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComplianceError {
    #[error("malformed date in `{field}`: {value:?}")]
    MalformedDate { field: &'static str, value: String },
}
