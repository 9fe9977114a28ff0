//! Engine gateway error types.

use dockyard_core::DockyardError;

/// Errors produced by the engine gateway and compose runner.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine endpoint cannot be reached. Fatal for the gateway
    /// instance that observed it.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// The named object does not exist in the engine inventory.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Any other failure reported by the engine API.
    #[error("engine api error: {0}")]
    Api(String),

    /// A compose subprocess failed to launch or exited non-zero.
    #[error("compose {action} failed: {reason}")]
    Compose {
        /// The compose action that failed (up, down, ls, ps).
        action: String,
        /// Failure detail, including captured output when available.
        reason: String,
    },
}

impl From<EngineError> for DockyardError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Unavailable(msg) => DockyardError::EngineUnavailable(msg),
            EngineError::NotFound(what) => DockyardError::NotFound(what),
            EngineError::Api(msg) => DockyardError::Engine(msg),
            EngineError::Compose { action, reason } => {
                DockyardError::Engine(format!("compose {action} failed: {reason}"))
            }
        }
    }
}
