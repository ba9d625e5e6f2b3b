use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("query text must not be empty")]
    EmptyQuery,
}

/// Raised when no JSON object can be recovered from provider output.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("provider output is empty")]
    Empty,
    #[error("provider output is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("provider output parsed to {0}, expected an object")]
    NotAnObject(&'static str),
}

/// Raised when a parsed provider object lacks the fields an intent needs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("required field `{0}` is missing")]
    MissingField(&'static str),
    #[error("field `{field}` has an unusable value: {value}")]
    InvalidField { field: &'static str, value: String },
}
