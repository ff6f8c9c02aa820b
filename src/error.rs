use thiserror::Error;

/// Errors surfaced by the dice, combat, storage and command layers.
///
/// The kinds keep user-correctable problems apart from infrastructure failures so the
/// command boundary can pick the right reply and tests can assert on the kind.
#[derive(Debug, Error)]
pub enum RpgError {
    /// Malformed dice expression such as `2x6` or `d+`.
    #[error("invalid dice expression: {0}")]
    InvalidExpression(String),

    /// Command arguments that fail validation (bad id, negative amount, name too long).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Sheet id unknown, or owned by another player or server.
    #[error("sheet #{id} not found")]
    NotFound { id: i64 },

    /// Underlying store failure (I/O, constraint violation, corrupt blob).
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Required configuration missing at process start.
    #[error("startup failed: {0}")]
    StartupFatal(String),
}

impl RpgError {
    /// True for errors the user can fix by re-issuing the command differently.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            RpgError::InvalidExpression(_) | RpgError::InvalidInput(_) | RpgError::NotFound { .. }
        )
    }
}

impl From<rusqlite::Error> for RpgError {
    fn from(e: rusqlite::Error) -> Self {
        RpgError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for RpgError {
    fn from(e: serde_json::Error) -> Self {
        RpgError::Persistence(format!("blob encoding: {e}"))
    }
}

impl From<tokio::task::JoinError> for RpgError {
    fn from(e: tokio::task::JoinError) -> Self {
        RpgError::Persistence(format!("store task join error: {e}"))
    }
}

pub type RpgResult<T> = Result<T, RpgError>;
