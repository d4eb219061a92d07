use crate::scripting::executor::ScriptError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The job is in a state that does not allow the operation.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No job slot became free within the queue timeout.
    #[error("Service busy: {0}")]
    Busy(String),

    #[error("Job timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Script error: {0}")]
    Script(ScriptError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ScriptError> for CoreError {
    fn from(err: ScriptError) -> Self {
        match err {
            ScriptError::Timeout { elapsed_ms } => Self::Timeout { elapsed_ms },
            other => Self::Script(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn script_timeout_becomes_core_timeout() {
        let err: CoreError = ScriptError::Timeout { elapsed_ms: 250 }.into();
        assert_matches!(err, CoreError::Timeout { elapsed_ms: 250 });
    }

    #[test]
    fn script_not_found_stays_script_error() {
        let err: CoreError = ScriptError::NotFound("/opt/missing.R".into()).into();
        assert_matches!(err, CoreError::Script(ScriptError::NotFound(_)));
        assert_eq!(err.to_string(), "Script error: Script not found: /opt/missing.R");
    }
}
