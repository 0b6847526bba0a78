//! Error types for gitscope
//!
//! Provides unified error handling across the crate.
//!
//! Unresolvable module names are deliberately NOT represented here: a name
//! that maps to no project file is a normal outcome (external dependency)
//! and is cached as `None` by the registry.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for gitscope operations
///
/// Every variant is fatal to the selection run. The selector performs no
/// error suppression: treating an unreadable or unparsable file as
/// dependency-free would silently hide real impact.
#[derive(Debug, Error)]
pub enum SelectError {
    /// A source file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A source file could not be statically parsed
    #[error("Parse error in {file}: {message}")]
    Parse { file: PathBuf, message: String },

    /// A relative import reaches above the declaring package
    ///
    /// `from ..x import y` with fewer package-path segments than dots.
    /// Surfaced as a hard error so malformed layouts fail loudly in
    /// release builds too.
    #[error("relative import level {level} exceeds package depth in {file}")]
    RelativeImport { file: PathBuf, level: u32 },

    /// The fixed point was not reached within the round cap
    #[error("impact propagation did not converge within {rounds} rounds")]
    RecursionLimit { rounds: usize },
}

impl SelectError {
    /// Create a parse error
    pub fn parse(file: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        SelectError::Parse {
            file: file.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for gitscope operations
pub type Result<T> = std::result::Result<T, SelectError>;
