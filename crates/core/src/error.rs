//! Error taxonomy for a migration run.
//!
//! Every variant is fatal: the engine never emits a partially rewritten input.
//! Line numbers are 1-based so diagnostics can be pasted straight into an editor.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    /// A structural scan (block body, property list, function body) hit end of input.
    #[error("lines {start}-{end}: unterminated block, expected a closing {expected}")]
    UnterminatedBlock {
        /// Line that opened the block
        start: usize,
        /// Last line searched
        end: usize,
        /// Terminators that were accepted
        expected: String,
    },

    /// A line inside a recognized shape did not have the expected textual form.
    #[error("line {line}: {reason}: `{text}`")]
    UnsupportedSyntax {
        line: usize,
        reason: String,
        /// Offending line, trimmed
        text: String,
    },

    /// No registration call names the block as its first argument.
    #[error("no registration call found for '{block}' (declared at line {line})")]
    RegistrationNotFound { block: String, line: usize },

    /// The block references a class initializer that has no definition before it.
    #[error("class initializer '{name}' referenced by '{block}' (line {line}) not found")]
    InitializerNotFound { name: String, block: String, line: usize },

    /// More than one definition matches the referenced initializer's signature.
    #[error("class initializer '{name}' is defined twice (lines {first} and {second})")]
    DuplicateInitializer { name: String, first: usize, second: usize },

    /// The block lacks a field the type descriptor cannot be built without.
    #[error("'{block}' (line {line}) is missing required field '.{field}'")]
    MissingField { block: String, field: &'static str, line: usize },

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("config {path}: {message}")]
    Config { path: String, message: String },
}

impl MigrateError {
    /// Build an `UnsupportedSyntax` error from a 0-based line index.
    pub(crate) fn syntax(index: usize, reason: impl Into<String>, text: &str) -> Self {
        MigrateError::UnsupportedSyntax {
            line: index + 1,
            reason: reason.into(),
            text: text.trim().to_string(),
        }
    }

    /// Short machine-friendly tag, used in JSON diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            MigrateError::UnterminatedBlock { .. } => "unterminated-block",
            MigrateError::UnsupportedSyntax { .. } => "unsupported-syntax",
            MigrateError::RegistrationNotFound { .. } => "registration-not-found",
            MigrateError::InitializerNotFound { .. } => "initializer-not-found",
            MigrateError::DuplicateInitializer { .. } => "duplicate-initializer",
            MigrateError::MissingField { .. } => "missing-field",
            MigrateError::Pattern(_) => "pattern",
            MigrateError::Config { .. } => "config",
        }
    }
}

pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_is_one_based_and_trimmed() {
        let err = MigrateError::syntax(4, "missing '='", "    .name \"foo\",  ");
        assert_eq!(err.to_string(), "line 5: missing '=': `.name \"foo\",`");
        assert_eq!(err.kind(), "unsupported-syntax");
    }

    #[test]
    fn test_unterminated_message_names_range() {
        let err = MigrateError::UnterminatedBlock { start: 3, end: 9, expected: "`};`".into() };
        assert_eq!(err.to_string(), "lines 3-9: unterminated block, expected a closing `};`");
    }
}
