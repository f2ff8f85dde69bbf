use thiserror::Error;

/// Coarse category of a check-in failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Auth,
    Business,
    Refresh,
    Config,
    Internal,
}

impl ErrorKind {
    /// Failures an operator has to look into rather than the remote service.
    pub fn is_local(self) -> bool {
        matches!(self, ErrorKind::Config | ErrorKind::Internal)
    }
}

/// Terminal failure of a step, an account, or a whole run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckinError {
    /// Transient failures kept happening until the attempt budget ran out.
    #[error("transient failure, retries exhausted after {attempts} attempts: {cause}")]
    Network { attempts: u32, cause: String },

    #[error("credential invalid: {0}")]
    Auth(String),

    /// The service understood the request and refused it.
    #[error("rejected by service: {0}")]
    Business(String),

    #[error("credential invalid, refresh unavailable/failed: {0}")]
    Refresh(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// The account's workflow crashed; nothing is known about the remote state.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CheckinError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckinError::Network { .. } => ErrorKind::Network,
            CheckinError::Auth(_) => ErrorKind::Auth,
            CheckinError::Business(_) => ErrorKind::Business,
            CheckinError::Refresh(_) => ErrorKind::Refresh,
            CheckinError::Config(_) => ErrorKind::Config,
            CheckinError::Internal(_) => ErrorKind::Internal,
        }
    }
}
