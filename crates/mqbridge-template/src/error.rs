//! Error types for template compilation and rendering

use thiserror::Error;

use crate::ir::Pos;

/// Result type for template operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while compiling or rendering a template
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Template text is not valid under the supported syntax and vocabulary
    #[error("template {name}:{line}:{column}: {message}")]
    Compile {
        /// Template name (the rule id)
        name: String,
        /// 1-based line of the offending token
        line: usize,
        /// 1-based column of the offending token
        column: usize,
        /// Description of the problem
        message: String,
    },

    /// Rendering faulted on the given input document
    #[error("template {name}:{line}:{column}: executing action: {message}")]
    Execution {
        /// Template name (the rule id)
        name: String,
        /// 1-based line of the action being executed
        line: usize,
        /// 1-based column of the action being executed
        column: usize,
        /// Description of the fault
        message: String,
    },
}

impl Error {
    pub(crate) fn compile(name: &str, pos: Pos, message: impl Into<String>) -> Self {
        Self::Compile {
            name: name.to_string(),
            line: pos.line,
            column: pos.column,
            message: message.into(),
        }
    }

    pub(crate) fn execution(name: &str, pos: Pos, message: impl Into<String>) -> Self {
        Self::Execution {
            name: name.to_string(),
            line: pos.line,
            column: pos.column,
            message: message.into(),
        }
    }

    /// Whether this error was raised while compiling (as opposed to rendering)
    pub fn is_compile(&self) -> bool {
        matches!(self, Self::Compile { .. })
    }
}
