use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    #[error("{code}: {message}")]
    Service { code: String, message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),
    #[error("no AWS credentials configured")]
    MissingCredentials,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl ExporterError {
    /// Service error code for structured upstream errors, `None` for everything else.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => Some(code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExporterError>;

#[cfg(test)]
mod tests {
    use super::ExporterError;

    #[test]
    fn only_service_errors_carry_a_code() {
        let service = ExporterError::Service {
            code: "Throttling".to_string(),
            message: "Rate exceeded".to_string(),
        };
        assert_eq!(service.error_code(), Some("Throttling"));
        assert_eq!(service.to_string(), "Throttling: Rate exceeded");

        let transport = ExporterError::Transport("connection refused".to_string());
        assert_eq!(transport.error_code(), None);
        assert_eq!(ExporterError::MissingCredentials.error_code(), None);
    }
}
