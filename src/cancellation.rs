//! Cancellation token support for lifecycle operations.
//!
//! Every long-running operation (document creation, cooperative close, bulk
//! shutdown) takes a [`CancellationToken`]. Cancellation is a value, not a
//! panic: operations check it at their suspension points and surface
//! [`DocError::Cancelled`].

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::{DocError, DocResult};

/// A token that can be used to signal cancellation across async operations.
///
/// Tokens form a tree: cancelling a token cancels every child created from
/// it, while cancelling a child leaves the parent untouched.
///
/// # Examples
///
/// ```
/// use ferrous_docs::CancellationToken;
///
/// let parent = CancellationToken::new();
/// let child = parent.child_token();
///
/// parent.cancel();
/// assert!(child.is_cancelled());
/// assert!(child.throw_if_cancelled().is_err());
/// ```
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<CancellationTokenInner>,
}

struct CancellationTokenInner {
    cancelled: AtomicBool,
    notify: Notify,
    children: Mutex<Vec<Weak<CancellationTokenInner>>>,
    created_at: Instant,
}

impl CancellationTokenInner {
    fn new() -> Self {
        Self {
            cancelled: AtomicBool::new(false),
            notify: Notify::new(),
            children: Mutex::new(Vec::new()),
            created_at: Instant::now(),
        }
    }

    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.notify.notify_waiters();
        let children = std::mem::take(&mut *self.children.lock());
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }
}

impl CancellationToken {
    /// Creates a new cancellation token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancellationTokenInner::new()),
        }
    }

    /// Creates a child token that is cancelled whenever this token is.
    pub fn child_token(&self) -> Self {
        let child = Arc::new(CancellationTokenInner::new());
        {
            let mut children = self.inner.children.lock();
            if !self.is_cancelled() {
                children.retain(|weak| weak.strong_count() > 0);
                children.push(Arc::downgrade(&child));
                return Self { inner: child };
            }
        }
        child.cancel();
        Self { inner: child }
    }

    /// Cancels the token and all of its descendants.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Returns true if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Returns [`DocError::Cancelled`] if the token is cancelled.
    pub fn throw_if_cancelled(&self) -> DocResult<()> {
        if self.is_cancelled() {
            Err(DocError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Completes when cancellation is requested.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Runs `fut` until it finishes or the token is cancelled.
    ///
    /// Cancellation wins ties: a token cancelled before the call returns
    /// [`DocError::Cancelled`] without polling `fut`.
    pub async fn run<F, T>(&self, fut: F) -> DocResult<T>
    where
        F: Future<Output = DocResult<T>>,
    {
        self.throw_if_cancelled()?;
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(DocError::Cancelled),
            result = fut => result,
        }
    }

    /// True when both handles refer to the same token.
    pub fn same_token(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns the elapsed time since this token was created.
    pub fn elapsed(&self) -> Duration {
        self.inner.created_at.elapsed()
    }

    /// Creates a token that cancels itself after `timeout`.
    ///
    /// Must be called inside a tokio runtime.
    pub fn with_timeout(timeout: Duration) -> Self {
        let token = Self::new();
        let weak = Arc::downgrade(&token.inner);
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(inner) = weak.upgrade() {
                inner.cancel();
            }
        });
        token
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
