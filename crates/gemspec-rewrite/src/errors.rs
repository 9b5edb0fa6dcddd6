use gemspec_ast::{Category, SyntaxError};
use thiserror::Error;

/// Errors that abort a rewrite session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    #[error("{0}")]
    Syntax(#[from] SyntaxError),

    #[error("{label}: no `{constructor}.new do |...|` block found")]
    Structure { label: String, constructor: String },

    #[error("Dependency '{gem}' is declared as {existing} and cannot become {requested} without forcing the type change")]
    TypeConflict {
        gem: String,
        existing: Category,
        requested: Category,
    },

    #[error("Invalid instruction: {0}")]
    InvalidInstruction(String),

    #[error("Internal invariant violated: {0}")]
    InternalInvariant(String),
}

impl RewriteError {
    /// Short machine-friendly name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            RewriteError::Syntax(_) => "syntax",
            RewriteError::Structure { .. } => "structure",
            RewriteError::TypeConflict { .. } => "type_conflict",
            RewriteError::InvalidInstruction(_) => "invalid_instruction",
            RewriteError::InternalInvariant(_) => "internal_invariant",
        }
    }
}
