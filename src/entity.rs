//! Disposable entity state machine.
//!
//! `NotDisposed -> Disposing -> Disposed`, monotonic. The first dispose call
//! wins a compare-and-set and runs the teardown; every other call returns
//! immediately.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::dispatcher::ThreadAffinity;
use crate::error::{DocError, DocResult};
use crate::internal::catch_release_async;
use crate::lifetime::AsyncLifetime;

/// Lifecycle state of a [`DisposableEntity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EntityState {
    NotDisposed = 0,
    Disposing = 1,
    Disposed = 2,
}

impl EntityState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => EntityState::NotDisposed,
            1 => EntityState::Disposing,
            _ => EntityState::Disposed,
        }
    }
}

/// Handle returned by subscription methods, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }
}

type DisposingHandler = Arc<dyn Fn() -> BoxFuture<'static, DocResult<()>> + Send + Sync>;

/// An entity owning one [`AsyncLifetime`] with idempotent disposal.
///
/// Disposal awaits every "disposing" handler while the entity is still
/// minimally functional, then unwinds the lifetime, then drops the handlers so
/// subscriptions cannot keep the entity alive.
///
/// # Examples
///
/// ```
/// use ferrous_docs::{DisposableEntity, EntityState, ThreadAffinity};
///
/// # async fn example() -> ferrous_docs::DocResult<()> {
/// let entity = DisposableEntity::new("editor", ThreadAffinity::current());
/// entity.lifetime().add(|| Ok(()))?;
/// entity.on_disposing(|| async { Ok(()) });
///
/// entity.dispose().await?;
/// entity.dispose().await?; // no-op
/// assert_eq!(entity.state(), EntityState::Disposed);
/// assert!(entity.ensure_not_disposed().is_err());
/// # Ok(())
/// # }
/// ```
pub struct DisposableEntity {
    label: String,
    state: AtomicU8,
    lifetime: AsyncLifetime,
    handlers: Mutex<Vec<(SubscriptionId, DisposingHandler)>>,
    next_subscription: AtomicU64,
    affinity: ThreadAffinity,
    state_tx: watch::Sender<EntityState>,
}

impl DisposableEntity {
    pub fn new(label: impl Into<String>, affinity: ThreadAffinity) -> Self {
        let (state_tx, _) = watch::channel(EntityState::NotDisposed);
        Self {
            label: label.into(),
            state: AtomicU8::new(EntityState::NotDisposed as u8),
            lifetime: AsyncLifetime::new(),
            handlers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            affinity,
            state_tx,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> EntityState {
        EntityState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_disposed(&self) -> bool {
        self.state() == EntityState::Disposed
    }

    pub fn is_disposing_or_disposed(&self) -> bool {
        self.state() != EntityState::NotDisposed
    }

    /// Strict guard: fails only once disposal has completed.
    pub fn ensure_not_disposed(&self) -> DocResult<()> {
        if self.is_disposed() {
            Err(DocError::AlreadyDisposed(self.label.clone()))
        } else {
            Ok(())
        }
    }

    /// Broad guard: also fails while disposal is running.
    pub fn ensure_alive(&self) -> DocResult<()> {
        if self.is_disposing_or_disposed() {
            Err(DocError::AlreadyDisposed(self.label.clone()))
        } else {
            Ok(())
        }
    }

    /// The owned teardown ledger.
    pub fn lifetime(&self) -> &AsyncLifetime {
        &self.lifetime
    }

    pub fn affinity(&self) -> ThreadAffinity {
        self.affinity
    }

    /// Subscribes to the "about to dispose" notification.
    ///
    /// Handlers are awaited in subscription order before the lifetime
    /// unwinds. A failing handler does not stop disposal; its error joins
    /// the aggregate returned by [`dispose`](Self::dispose).
    pub fn on_disposing<F, Fut>(&self, handler: F) -> SubscriptionId
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DocResult<()>> + Send + 'static,
    {
        let id = SubscriptionId::new(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        let handler: DisposingHandler = Arc::new(move || Box::pin(handler()));
        self.handlers.lock().push((id, handler));
        id
    }

    /// Removes a disposing handler. Returns false if it was not subscribed.
    pub fn remove_disposing(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    /// Disposes the entity. Redundant and nested calls are no-ops.
    pub async fn dispose(&self) -> DocResult<()> {
        self.try_dispose().await.map(|_| ())
    }

    /// Disposes the entity, reporting whether this call ran the teardown.
    ///
    /// Fails with [`DocError::ThreadAffinity`] off the owner thread.
    pub async fn try_dispose(&self) -> DocResult<bool> {
        self.affinity.verify()?;
        let won = self
            .state
            .compare_exchange(
                EntityState::NotDisposed as u8,
                EntityState::Disposing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if !won {
            return Ok(false);
        }
        self.state_tx.send_replace(EntityState::Disposing);
        tracing::debug!(entity = %self.label, "disposing");

        let handlers: Vec<DisposingHandler> = self.handlers.lock().iter().map(|(_, h)| h.clone()).collect();
        let mut errors = Vec::new();
        for handler in handlers {
            if let Err(e) = catch_release_async(Box::pin(async move { handler().await })).await {
                errors.push(e);
            }
        }

        if let Err(e) = self.lifetime.dispose().await {
            errors.push(e);
        }

        self.handlers.lock().clear();
        self.state.store(EntityState::Disposed as u8, Ordering::Release);
        self.state_tx.send_replace(EntityState::Disposed);

        if errors.is_empty() {
            tracing::debug!(entity = %self.label, "disposed");
        } else {
            tracing::warn!(entity = %self.label, failures = errors.len(), "disposed with failures");
        }
        DocError::aggregate(errors).map(|_| true)
    }

    /// Completes once the entity reaches [`EntityState::Disposed`].
    pub async fn wait_disposed(&self) {
        let mut rx = self.state_tx.subscribe();
        let _ = rx.wait_for(|state| *state == EntityState::Disposed).await;
    }
}

impl fmt::Debug for DisposableEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisposableEntity")
            .field("label", &self.label)
            .field("state", &self.state())
            .finish()
    }
}
