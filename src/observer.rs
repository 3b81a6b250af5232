//! Lifecycle observers: the owner's diagnostic and error channel.
//!
//! The manager reports resolution fallbacks, close vetoes, close failures and
//! teardown failures here instead of letting them escape into the owner
//! thread's event loop. Errors that belong to a caller are still returned to
//! that caller as well.

use std::sync::Arc;

use crate::document::Document;
use crate::error::DocError;
use crate::resolution::ViewType;

/// Observer of document lifecycle events.
///
/// Every method has a no-op default. Calls are made synchronously on the
/// owner thread; keep implementations light.
///
/// # Examples
///
/// ```
/// use ferrous_docs::{DocError, Document, LifecycleObserver};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct FailureCounter(AtomicUsize);
///
/// impl LifecycleObserver for FailureCounter {
///     fn teardown_failed(&self, _document: Option<&Document>, _error: &DocError) {
///         self.0.fetch_add(1, Ordering::Relaxed);
///     }
/// }
/// ```
pub trait LifecycleObserver: Send + Sync {
    /// A document was registered with its manager.
    fn document_created(&self, _document: &Document) {}

    /// A document left its manager's roster.
    fn document_closed(&self, _document: &Document) {}

    /// A cooperative close was vetoed by the content.
    fn close_vetoed(&self, _document: &Document) {}

    /// The content's close predicate failed; the close counts as vetoed.
    fn close_failed(&self, _document: &Document, _error: &DocError) {}

    /// Release actions failed. `document` is `None` when a failed or
    /// cancelled creation was unwound.
    fn teardown_failed(&self, _document: Option<&Document>, _error: &DocError) {}

    /// A view name resolved to nothing and a fallback view was used.
    fn resolution_fallback(&self, _name: &str, _view: &ViewType) {}

    fn active_changed(&self, _old: Option<&Document>, _new: Option<&Document>) {}
}

/// Fan-out over registered observers.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn LifecycleObserver>) {
        self.observers.push(observer);
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn document_created(&self, document: &Document) {
        for observer in &self.observers {
            observer.document_created(document);
        }
    }

    pub(crate) fn document_closed(&self, document: &Document) {
        for observer in &self.observers {
            observer.document_closed(document);
        }
    }

    pub(crate) fn close_vetoed(&self, document: &Document) {
        for observer in &self.observers {
            observer.close_vetoed(document);
        }
    }

    pub(crate) fn close_failed(&self, document: &Document, error: &DocError) {
        for observer in &self.observers {
            observer.close_failed(document, error);
        }
    }

    pub(crate) fn teardown_failed(&self, document: Option<&Document>, error: &DocError) {
        for observer in &self.observers {
            observer.teardown_failed(document, error);
        }
    }

    pub(crate) fn resolution_fallback(&self, name: &str, view: &ViewType) {
        for observer in &self.observers {
            observer.resolution_fallback(name, view);
        }
    }

    pub(crate) fn active_changed(&self, old: Option<&Document>, new: Option<&Document>) {
        for observer in &self.observers {
            observer.active_changed(old, new);
        }
    }
}

/// Built-in observer that reports events through `tracing`.
///
/// Failures are logged at `warn`, vetoes and fallbacks at `info`, the rest
/// at `debug`.
pub struct TracingObserver {
    source: String,
}

impl TracingObserver {
    pub fn new() -> Self {
        Self {
            source: "ferrous-docs".to_string(),
        }
    }

    /// Tags every event with `source = <name>`.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self { source: name.into() }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleObserver for TracingObserver {
    fn document_created(&self, document: &Document) {
        tracing::debug!(source = %self.source, document = %document, "document created");
    }

    fn document_closed(&self, document: &Document) {
        tracing::debug!(source = %self.source, document = %document, "document closed");
    }

    fn close_vetoed(&self, document: &Document) {
        tracing::info!(source = %self.source, document = %document, "close vetoed");
    }

    fn close_failed(&self, document: &Document, error: &DocError) {
        tracing::warn!(source = %self.source, document = %document, %error, "close predicate failed");
    }

    fn teardown_failed(&self, document: Option<&Document>, error: &DocError) {
        match document {
            Some(document) => {
                tracing::warn!(source = %self.source, document = %document, %error, "teardown failed")
            }
            None => tracing::warn!(source = %self.source, %error, "creation unwind failed"),
        }
    }

    fn resolution_fallback(&self, name: &str, view: &ViewType) {
        tracing::info!(source = %self.source, name, view = %view, "using fallback view");
    }

    fn active_changed(&self, old: Option<&Document>, new: Option<&Document>) {
        tracing::debug!(
            source = %self.source,
            old = ?old.map(Document::to_string),
            new = ?new.map(Document::to_string),
            "active document changed"
        );
    }
}
