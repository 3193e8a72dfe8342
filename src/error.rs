use thiserror::Error;

#[derive(Debug, Error)]
pub enum CspError {
    #[error("invalid value for {field}: {reason}")]
    InvalidFieldValue {
        field: &'static str,
        reason: String,
    },

    #[error("reportOnly requires reportUri to be set")]
    MissingReportUri,

    #[error("policy serialization produced an invalid header value")]
    InvalidHeaderValue,
}

impl CspError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidFieldValue {
            field,
            reason: reason.into(),
        }
    }
}
