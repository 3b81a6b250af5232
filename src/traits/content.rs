//! Optional lifecycle capabilities of hosted content objects.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use super::AsyncDispose;
use crate::cancellation::CancellationToken;
use crate::error::DocResult;

/// Type-erased `Arc` used for parent contexts and parameters.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// A content object hosted by a document.
///
/// Every capability is optional: the defaults do nothing, allow closing, and
/// expose no asynchronous disposal.
///
/// # Examples
///
/// ```
/// use ferrous_docs::{CancellationToken, Content, DocResult, InitGate};
/// use async_trait::async_trait;
///
/// #[derive(Default)]
/// struct Editor {
///     dirty: bool,
///     init: InitGate,
/// }
///
/// #[async_trait]
/// impl Content for Editor {
///     async fn initialize(&self, _cancel: &CancellationToken) -> DocResult<()> {
///         self.init.run(|| async { Ok(()) }).await
///     }
///
///     async fn can_close(&self, _cancel: &CancellationToken) -> DocResult<bool> {
///         Ok(!self.dirty)
///     }
/// }
/// ```
#[async_trait]
pub trait Content: Send + Sync + 'static {
    /// Title used when the creation request does not carry one.
    fn title(&self) -> Option<String> {
        None
    }

    fn set_parent_context(&self, _context: AnyArc) {}

    fn set_parameter(&self, _parameter: AnyArc) {}

    /// Asynchronous initialization. Must be a no-op when already initialized.
    async fn initialize(&self, _cancel: &CancellationToken) -> DocResult<()> {
        Ok(())
    }

    /// Cooperative close predicate. `Ok(false)` vetoes the close.
    async fn can_close(&self, _cancel: &CancellationToken) -> DocResult<bool> {
        Ok(true)
    }

    /// Exposes the asynchronous disposal contract, if the content has one.
    fn async_disposer(self: Arc<Self>) -> Option<Arc<dyn AsyncDispose>> {
        None
    }
}

/// Runs an initialization routine at most once.
///
/// Concurrent callers wait for the first run; a failed run can be retried.
#[derive(Debug, Default)]
pub struct InitGate {
    cell: OnceCell<()>,
}

impl InitGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run<F, Fut>(&self, init: F) -> DocResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DocResult<()>>,
    {
        self.cell.get_or_try_init(init).await.map(|_| ())
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.initialized()
    }
}
