//! Diagnostic error types for the mining engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]`
//! derives, providing error codes and help text. Invariant violations
//! (duplicate publication, enqueue after quiescence) are not errors but
//! programming bugs and abort the process with a diagnostic panic.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the mining engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full
/// diagnostic chain through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum MineError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Kb(#[from] KbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Assistant(#[from] AssistantError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Sink(#[from] SinkError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("maximum rule length must be at least 2, got {max_depth}")]
    #[diagnostic(
        code(hornmine::config::max_depth),
        help(
            "A rule needs a head atom and at least one body atom. \
             Pass --max-depth 2 or larger."
        )
    )]
    MaxDepthTooSmall { max_depth: usize },

    #[error("thread count must be at least 1")]
    #[diagnostic(
        code(hornmine::config::threads),
        help("Pass --threads with a positive value, or omit it to use all cores.")
    )]
    ZeroThreads,

    #[error("{name} must lie in [0, 1], got {value}")]
    #[diagnostic(
        code(hornmine::config::ratio_out_of_range),
        help("Confidence and head-coverage thresholds are ratios between 0 and 1.")
    )]
    RatioOutOfRange { name: &'static str, value: f64 },

    #[error("unknown head relation: \"{label}\"")]
    #[diagnostic(
        code(hornmine::config::unknown_relation),
        help(
            "The relation given as a mining seed does not occur in the loaded \
             knowledge base. Check the spelling against the input files."
        )
    )]
    UnknownRelation { label: String },
}

// ---------------------------------------------------------------------------
// Knowledge base errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum KbError {
    #[error("failed to read {path}")]
    #[diagnostic(
        code(hornmine::kb::io),
        help("Check that the file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: malformed triple (expected SUBJECT<TAB>RELATION<TAB>OBJECT)")]
    #[diagnostic(
        code(hornmine::kb::malformed_line),
        help(
            "Each non-comment line must hold exactly three tab-separated fields. \
             Lines starting with '#' and blank lines are ignored."
        )
    )]
    MalformedLine { path: String, line: usize },
}

// ---------------------------------------------------------------------------
// Assistant errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum AssistantError {
    #[error("operator {operator} failed on rule \"{rule}\": {message}")]
    #[diagnostic(
        code(hornmine::assistant::operator),
        help(
            "The candidate is dropped and mining continues. A lost rule may be \
             rediscovered through another parent."
        )
    )]
    OperatorFailed {
        operator: &'static str,
        rule: String,
        message: String,
    },

    #[error("knowledge base query failed: {message}")]
    #[diagnostic(
        code(hornmine::assistant::kb_query),
        help("The rule being evaluated is dropped; mining continues.")
    )]
    KbQuery { message: String },
}

// ---------------------------------------------------------------------------
// Sink errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SinkError {
    #[error("failed to write to the rule sink")]
    #[diagnostic(
        code(hornmine::sink::io),
        help("Check the output target (disk full, closed pipe, permissions).")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },
}

impl From<std::io::Error> for SinkError {
    fn from(source: std::io::Error) -> Self {
        SinkError::Io { source }
    }
}

/// Convenience alias for functions returning engine results.
pub type MineResult<T> = std::result::Result<T, MineError>;

/// Result type for configuration validation.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type for KB operations.
pub type KbResult<T> = std::result::Result<T, KbError>;

/// Result type for assistant operations.
pub type AssistantResult<T> = std::result::Result<T, AssistantError>;

/// Result type for sink operations.
pub type SinkResult<T> = std::result::Result<T, SinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_mine_error() {
        let err = ConfigError::MaxDepthTooSmall { max_depth: 1 };
        let mine: MineError = err.into();
        assert!(matches!(
            mine,
            MineError::Config(ConfigError::MaxDepthTooSmall { .. })
        ));
    }

    #[test]
    fn sink_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        let err: SinkError = io.into();
        let mine: MineError = err.into();
        assert!(matches!(mine, MineError::Sink(SinkError::Io { .. })));
    }

    #[test]
    fn error_display_messages_are_descriptive() {
        let err = ConfigError::RatioOutOfRange {
            name: "min_head_coverage",
            value: 1.5,
        };
        let msg = format!("{err}");
        assert!(msg.contains("min_head_coverage"));
        assert!(msg.contains("1.5"));
    }
}
