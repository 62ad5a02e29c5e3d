//! Unified error types for surface-diff.
//!
//! This module provides the error hierarchy for the library, with chained
//! context for debugging and user-friendly messages.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for surface-diff operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SurfaceDiffError {
    /// Errors raised by the observation store
    #[error("Storage operation failed: {context}")]
    Storage {
        context: String,
        #[source]
        source: StorageErrorKind,
    },

    /// Errors during run comparison
    #[error("Comparison failed: {context}")]
    Compare {
        context: String,
        #[source]
        source: CompareErrorKind,
    },

    /// Errors loading or compiling analysis rules
    #[error("Rule configuration rejected: {context}")]
    Rules {
        context: String,
        #[source]
        source: RuleErrorKind,
    },

    /// IO errors with context
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Programmer errors: arguments that can never be valid
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Specific storage error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StorageErrorKind {
    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Run already exists: {0}")]
    DuplicateRun(String),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),
}

/// Specific comparison error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CompareErrorKind {
    #[error("Bucket {bucket} could not be compared: {reason}")]
    BucketFailed { bucket: String, reason: String },

    #[error("Comparison cancelled before completion")]
    Cancelled,

    #[error("Nothing could be reconciled")]
    NothingReconciled,
}

/// Specific rule configuration error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RuleErrorKind {
    #[error("Malformed rule document: {0}")]
    Malformed(String),

    #[error("Rule '{rule}' has an invalid regex '{pattern}': {reason}")]
    InvalidRegex {
        rule: String,
        pattern: String,
        reason: String,
    },

    #[error("Rule '{rule}' compares field '{field}' numerically but datum '{datum}' is not an integer")]
    InvalidNumber {
        rule: String,
        field: String,
        datum: String,
    },
}

// ============================================================================
// Result type alias
// ============================================================================

/// Convenient Result type for surface-diff operations
pub type Result<T> = std::result::Result<T, SurfaceDiffError>;

// ============================================================================
// Error construction helpers
// ============================================================================

impl SurfaceDiffError {
    /// Create a storage error with context
    pub fn storage(context: impl Into<String>, source: StorageErrorKind) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }

    /// Create a storage error for a run that does not exist
    pub fn run_not_found(run_id: impl Into<String>) -> Self {
        let run_id = run_id.into();
        Self::storage(
            format!("looking up run {run_id}"),
            StorageErrorKind::RunNotFound(run_id),
        )
    }

    /// Create a storage error for a poisoned lock
    pub fn lock_poisoned(context: impl Into<String>) -> Self {
        Self::storage(context, StorageErrorKind::LockPoisoned)
    }

    /// Create a comparison error
    pub fn compare(context: impl Into<String>, source: CompareErrorKind) -> Self {
        Self::Compare {
            context: context.into(),
            source,
        }
    }

    /// Create a rule configuration error
    pub fn rules(context: impl Into<String>, source: RuleErrorKind) -> Self {
        Self::Rules {
            context: context.into(),
            source,
        }
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        let message = format!("{source}");
        Self::Io {
            path: Some(path),
            message,
            source,
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error names a run that does not exist.
    #[must_use]
    pub const fn is_run_not_found(&self) -> bool {
        matches!(
            self,
            Self::Storage {
                source: StorageErrorKind::RunNotFound(_),
                ..
            }
        )
    }
}

// ============================================================================
// Conversions from existing error types
// ============================================================================

impl From<std::io::Error> for SurfaceDiffError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}

impl From<serde_json::Error> for SurfaceDiffError {
    fn from(err: serde_json::Error) -> Self {
        Self::storage(
            "JSON deserialization",
            StorageErrorKind::Corrupt(err.to_string()),
        )
    }
}

// ============================================================================
// Error context extension trait
// ============================================================================

/// Extension trait for adding context to errors.
///
/// Each call prepends to the error's existing context, creating a chain
/// that shows the path through the code.
///
/// # Example
///
/// ```ignore
/// use surface_diff::error::ErrorContext;
///
/// fn load(path: &Path) -> Result<RunSnapshot> {
///     let content = std::fs::read_to_string(path).context("reading snapshot")?;
///     RunSnapshot::from_json(&content)
///         .with_context(|| format!("parsing snapshot {}", path.display()))
/// }
/// ```
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context from a closure (lazy evaluation).
    ///
    /// The closure is only called if the result is an error.
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: Into<SurfaceDiffError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        let ctx: String = context.into();
        self.map_err(|e| add_context_to_error(e.into(), &ctx))
    }

    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| {
            let ctx: String = f().into();
            add_context_to_error(e.into(), &ctx)
        })
    }
}

/// Add context to an error, chaining with any existing context.
fn add_context_to_error(mut err: SurfaceDiffError, new_ctx: &str) -> SurfaceDiffError {
    let slot = match &mut err {
        SurfaceDiffError::Storage { context, .. }
        | SurfaceDiffError::Compare { context, .. }
        | SurfaceDiffError::Rules { context, .. } => context,
        SurfaceDiffError::Io { message, .. } => message,
        SurfaceDiffError::Config(msg)
        | SurfaceDiffError::InvalidArgument(msg)
        | SurfaceDiffError::Validation(msg) => msg,
    };
    *slot = chain_context(new_ctx, slot);
    err
}

/// Chain two context strings together.
///
/// If the existing context is empty, returns just the new context.
/// Otherwise, returns "`new_context`: `existing_context`".
fn chain_context(new: &str, existing: &str) -> String {
    if existing.is_empty() {
        new.to_string()
    } else {
        format!("{new}: {existing}")
    }
}

/// Extension trait for Option types to convert to errors with context.
pub trait OptionContext<T> {
    /// Convert None to an error with the given context.
    fn context_none(self, context: impl Into<String>) -> Result<T>;

    /// Convert None to an error with context from a closure.
    fn with_context_none<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T> OptionContext<T> for Option<T> {
    fn context_none(self, context: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| SurfaceDiffError::Validation(context.into()))
    }

    fn with_context_none<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.ok_or_else(|| SurfaceDiffError::Validation(f().into()))
    }
}
