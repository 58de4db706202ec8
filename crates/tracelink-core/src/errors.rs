/// Errors raised while validating startup settings.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("capture and operator listeners cannot share {0}")]
    ListenerConflict(String),

    #[error("operator username must not be empty")]
    EmptyUsername,

    #[error("invalid value for {key}: {detail}")]
    InvalidValue { key: &'static str, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_conflict_display() {
        let err = ConfigError::ListenerConflict("127.0.0.1:5000".into());
        assert!(err.to_string().contains("127.0.0.1:5000"));
    }

    #[test]
    fn invalid_value_display() {
        let err = ConfigError::InvalidValue {
            key: "TRACELINK_CAPTURE_PORT",
            detail: "not a port".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid value for TRACELINK_CAPTURE_PORT: not a port"
        );
    }
}
