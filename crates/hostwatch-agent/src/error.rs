use crate::backend::BackendError;

/// Errors raised by the agent core.
///
/// Startup errors (identity, session, source resolution) are fatal and
/// propagate out of the wiring code. Everything raised from a periodic job
/// action is caught by the scheduler, logged, and dropped.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("duplicate log source name: {0}")]
    DuplicateLogSource(String),

    #[error("failed to resolve instance identity: {0}")]
    Identity(String),

    #[error("credential refresh failed: {0}")]
    CredentialRefresh(String),

    #[error("log shipping failed for sources: {0}")]
    LogShipping(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AgentError::InvalidConfig("empty endpoint".to_string());
        assert_eq!(error.to_string(), "invalid configuration: empty endpoint");
    }

    #[test]
    fn test_backend_error_is_transparent() {
        let error = AgentError::from(BackendError::Throttled);
        assert_eq!(error.to_string(), BackendError::Throttled.to_string());
    }

    #[test]
    fn test_all_error_variants() {
        // Ensure all variants can be constructed
        let _e1 = AgentError::InvalidConfig("test".into());
        let _e2 = AgentError::DuplicateLogSource("syslog".into());
        let _e3 = AgentError::Identity("test".into());
        let _e4 = AgentError::CredentialRefresh("test".into());
        let _e5 = AgentError::LogShipping("syslog, auth.log".into());
    }
}
