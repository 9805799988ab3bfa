use thiserror::Error;

/// Rejected before anything is sent to the risk service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("amount '{0}' is not a number")]
    InvalidAmount(String),
    #[error("amount must be a non-negative finite number, got {0}")]
    AmountOutOfRange(String),
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

/// Failure talking to the risk service. Never surfaced to callers of
/// `RiskClient::analyze`; it becomes `AnalysisOutcome::Unavailable`.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("risk service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("risk service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed risk service response: {0}")]
    Malformed(String),
}

impl ServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(e) if e.is_timeout() => "timeout",
            Self::Transport(_) => "transport",
            Self::Status { .. } => "status",
            Self::Malformed(_) => "malformed",
        }
    }
}
