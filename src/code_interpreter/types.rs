use std::collections::BTreeMap;

use documented::Documented;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Everything that can go wrong while running code.
/// All of these are terminal for the execution; nothing is retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecutionError {
    /// The code was too long and was never parsed.
    #[error("Code exceeds {limit} character limit")]
    SizeLimit { limit: usize },
    /// The code could not be parsed.
    #[error("{message}")]
    Syntax { message: String, trace: String },
    /// The code raised an exception while running.
    #[error("{message}")]
    Runtime { message: String, trace: String },
    /// Setting up or tearing down the interpreter failed, not the code itself.
    #[error("The interpreter failed: {0}")]
    Interpreter(String),
}

/// The category of an execution error, as sent to the client.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, strum::Display, strum::VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ExecutionErrorKind {
    SizeLimit,
    Syntax,
    Runtime,
    Interpreter,
}

impl ExecutionError {
    pub fn kind(&self) -> ExecutionErrorKind {
        match self {
            Self::SizeLimit { .. } => ExecutionErrorKind::SizeLimit,
            Self::Syntax { .. } => ExecutionErrorKind::Syntax,
            Self::Runtime { .. } => ExecutionErrorKind::Runtime,
            Self::Interpreter(_) => ExecutionErrorKind::Interpreter,
        }
    }

    /// The trace of the error, if there is one.
    pub fn trace(&self) -> Option<&str> {
        match self {
            Self::Syntax { trace, .. } | Self::Runtime { trace, .. } => Some(trace),
            Self::SizeLimit { .. } | Self::Interpreter(_) => None,
        }
    }
}

/// What a successful execution produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionSuccess {
    /// Everything the code wrote to stdout.
    pub output: String,
    /// All top-level bindings not starting with an underscore, rendered as JSON.
    pub variables: BTreeMap<String, serde_json::Value>,
}

/// # Execution Result
///
/// The result of running code, as it is stored in the session and sent to the client.
/// It is always a JSON object with a `status` field.
///
/// success: `{"status": "success", "output": "...", "variables": {"name": value}}`.
/// The output is the captured stdout, verbatim. Values that have no JSON equivalent are sent as their Python repr.
///
/// error: `{"status": "error", "kind": "...", "message": "...", "trace": "..." | null}`.
/// The kind is one of `size_limit`, `syntax`, `runtime` or `interpreter`.
/// Only syntax and runtime errors carry a trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Documented)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionResult {
    Success {
        output: String,
        variables: BTreeMap<String, serde_json::Value>,
    },
    Error {
        kind: ExecutionErrorKind,
        message: String,
        trace: Option<String>,
    },
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl From<Result<ExecutionSuccess, ExecutionError>> for ExecutionResult {
    fn from(value: Result<ExecutionSuccess, ExecutionError>) -> Self {
        match value {
            Ok(ExecutionSuccess { output, variables }) => Self::Success { output, variables },
            Err(e) => Self::Error {
                kind: e.kind(),
                message: e.to_string(),
                trace: e.trace().map(str::to_string),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_limit_message() {
        let result = ExecutionResult::from(Err(ExecutionError::SizeLimit { limit: 2000 }));
        assert_eq!(
            result,
            ExecutionResult::Error {
                kind: ExecutionErrorKind::SizeLimit,
                message: "Code exceeds 2000 character limit".to_string(),
                trace: None,
            }
        );
    }

    #[test]
    fn test_runtime_error_keeps_trace() {
        let result = ExecutionResult::from(Err(ExecutionError::Runtime {
            message: "division by zero".to_string(),
            trace: "Traceback (most recent call last):\nZeroDivisionError: division by zero"
                .to_string(),
        }));
        let ExecutionResult::Error {
            kind,
            message,
            trace,
        } = result
        else {
            panic!("Expected an error result");
        };
        assert_eq!(kind, ExecutionErrorKind::Runtime);
        assert_eq!(message, "division by zero");
        assert!(trace.is_some_and(|t| t.contains("ZeroDivisionError")));
    }

    #[test]
    fn test_serialized_shape() {
        let mut variables = BTreeMap::new();
        variables.insert("x".to_string(), serde_json::json!(5));
        let result = ExecutionResult::Success {
            output: "5\n".to_string(),
            variables,
        };
        let json = serde_json::to_value(&result).expect("ExecutionResult always serializes");
        assert_eq!(
            json,
            serde_json::json!({"status": "success", "output": "5\n", "variables": {"x": 5}})
        );

        let error = ExecutionResult::from(Err(ExecutionError::Interpreter("boom".to_string())));
        let json = serde_json::to_value(&error).expect("ExecutionResult always serializes");
        assert_eq!(json["status"], "error");
        assert_eq!(json["kind"], "interpreter");
        assert!(json["trace"].is_null());
    }

    #[test]
    fn test_kind_names_match_serde() {
        assert_eq!(ExecutionErrorKind::SizeLimit.to_string(), "size_limit");
        assert_eq!(
            <ExecutionErrorKind as strum::VariantNames>::VARIANTS,
            &["size_limit", "syntax", "runtime", "interpreter"]
        );
    }
}
