//! Error types for the document lifecycle runtime.

use thiserror::Error;

/// Lifecycle errors
///
/// Represents every failure the runtime surfaces: disposal misuse, cancellation,
/// aggregated teardown failures, view resolution failures and thread-affinity
/// violations.
///
/// # Examples
///
/// ```rust
/// use ferrous_docs::DocError;
///
/// let disposed = DocError::AlreadyDisposed("document 'report'".to_string());
/// assert_eq!(disposed.to_string(), "Already disposed: document 'report'");
///
/// let aggregate = DocError::Teardown(vec![
///     DocError::Host("detach failed".to_string()),
///     DocError::Content("flush failed".to_string()),
/// ]);
/// assert_eq!(aggregate.failures().len(), 2);
/// assert!(DocError::Cancelled.is_cancelled());
/// ```
#[derive(Debug, Clone, Error)]
pub enum DocError {
    /// Operation attempted on an entity that is disposing or disposed
    #[error("Already disposed: {0}")]
    AlreadyDisposed(String),
    /// Operation observed a cancellation request
    #[error("Operation was cancelled")]
    Cancelled,
    /// One or more release actions failed during a lifetime unwind
    #[error("Teardown failed with {} error(s): {}", .0.len(), join_failures(.0))]
    Teardown(Vec<DocError>),
    /// A logical view name resolved to no type and no fallback was available
    #[error("View resolution failed: {0}")]
    Resolution(String),
    /// Operation invoked from a thread other than the owner
    #[error("Thread affinity violation: owned by {expected}, called from {actual}")]
    ThreadAffinity {
        /// Owning thread
        expected: String,
        /// Calling thread
        actual: String,
    },
    /// Registration attempted after the ledger started disposing
    #[error("Lifetime is closed: disposal has already started")]
    LifetimeClosed,
    /// A document identity can only be assigned once
    #[error("Document id already assigned: {0}")]
    IdAlreadyAssigned(String),
    /// The document is not registered with this manager
    #[error("Document is not registered with this manager")]
    UnknownDocument,
    /// Failure reported by the host adapter
    #[error("Host error: {0}")]
    Host(String),
    /// Failure reported by a content object
    #[error("Content error: {0}")]
    Content(String),
    /// A release action or hook panicked
    #[error("Panicked: {0}")]
    Panicked(String),
}

impl DocError {
    /// Returns true for the distinguishable cancellation outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DocError::Cancelled)
    }

    /// Returns the individual failures behind this error.
    ///
    /// Aggregates yield their members, every other variant yields itself.
    pub fn failures(&self) -> Vec<&DocError> {
        match self {
            DocError::Teardown(errors) => errors.iter().collect(),
            other => vec![other],
        }
    }

    /// Folds collected failures into a result, flattening nested aggregates.
    pub(crate) fn aggregate(errors: Vec<DocError>) -> DocResult<()> {
        if errors.is_empty() {
            return Ok(());
        }
        let mut flat = Vec::with_capacity(errors.len());
        for error in errors {
            match error {
                DocError::Teardown(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        Err(DocError::Teardown(flat))
    }
}

fn join_failures(errors: &[DocError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for lifecycle operations
///
/// A convenience alias for `Result<T, DocError>` used throughout the crate.
pub type DocResult<T> = Result<T, DocError>;
