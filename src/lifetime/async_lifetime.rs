//! Ledger supporting asynchronous teardown and nested child lifetimes.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;

use super::{Lifetime, SyncRelease};
use crate::error::{DocError, DocResult};
use crate::internal::{catch_release, catch_release_async, BoxFutureResult, DisposeBag, Phase};
use crate::traits::{AsyncDispose, Dispose};

type AsyncRelease = Box<dyn FnOnce() -> BoxFutureResult + Send>;

enum AsyncUnit {
    Sync(SyncRelease),
    Async(AsyncRelease),
    Child(AsyncLifetime),
    SyncChild(Lifetime),
}

/// Ordered ledger of synchronous and asynchronous teardown units.
///
/// Sync and async units share one ordering: a sync action registered after
/// an async one is released before it. Child lifetimes are owned exclusively
/// and disposed at their position in the unwind.
///
/// # Examples
///
/// ```
/// use ferrous_docs::AsyncLifetime;
/// use std::sync::{Arc, Mutex};
///
/// # async fn example() {
/// let log = Arc::new(Mutex::new(Vec::new()));
/// let lifetime = AsyncLifetime::new();
///
/// let l = log.clone();
/// lifetime.add(move || { l.lock().unwrap().push("sync"); Ok(()) }).unwrap();
/// let l = log.clone();
/// lifetime
///     .add_async(move || async move {
///         l.lock().unwrap().push("async");
///         Ok(())
///     })
///     .unwrap();
///
/// lifetime.dispose().await.unwrap();
/// assert_eq!(*log.lock().unwrap(), vec!["async", "sync"]);
/// # }
/// ```
pub struct AsyncLifetime {
    bag: Mutex<DisposeBag<AsyncUnit>>,
}

impl AsyncLifetime {
    pub fn new() -> Self {
        Self {
            bag: Mutex::new(DisposeBag::default()),
        }
    }

    /// Registers a synchronous release-only action.
    pub fn add<F>(&self, release: F) -> DocResult<()>
    where
        F: FnOnce() -> DocResult<()> + Send + 'static,
    {
        self.push(AsyncUnit::Sync(Box::new(release)))
    }

    /// Registers an asynchronous release-only action.
    pub fn add_async<F, Fut>(&self, release: F) -> DocResult<()>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = DocResult<()>> + Send + 'static,
    {
        self.push(AsyncUnit::Async(Box::new(move || Box::pin(release()))))
    }

    /// Runs `acquire` now and registers a synchronous `release` for its result.
    pub fn add_bracket<T, A, R>(&self, acquire: A, release: R) -> DocResult<()>
    where
        A: FnOnce() -> DocResult<T>,
        R: FnOnce(T) -> DocResult<()> + Send + 'static,
        T: Send + 'static,
    {
        self.ensure_open()?;
        let value = acquire()?;
        let release: SyncRelease = Box::new(move || release(value));
        let pushed = self.bag.lock().push(AsyncUnit::Sync(release));
        match pushed {
            Ok(()) => Ok(()),
            Err(AsyncUnit::Sync(release)) => {
                // Closed while acquiring: the acquired value must not leak.
                catch_release(release)?;
                Err(DocError::LifetimeClosed)
            }
            Err(_) => Err(DocError::LifetimeClosed),
        }
    }

    /// Awaits `acquire` and registers an asynchronous `release` for its result.
    ///
    /// The acquired value is returned to the caller and a clone is handed to
    /// the release, hence `T: Clone`. Wrap non-`Clone` handles in an `Arc`.
    ///
    /// Nothing is registered when `acquire` fails. If the ledger closes while
    /// `acquire` is pending, the release runs before this returns
    /// [`DocError::LifetimeClosed`].
    pub async fn add_async_bracket<T, A, R, Fut>(&self, acquire: A, release: R) -> DocResult<T>
    where
        A: Future<Output = DocResult<T>>,
        R: FnOnce(T) -> Fut + Send + 'static,
        Fut: Future<Output = DocResult<()>> + Send + 'static,
        T: Clone + Send + 'static,
    {
        self.ensure_open()?;
        let value = acquire.await?;
        let held = value.clone();
        let unit = AsyncUnit::Async(Box::new(move || Box::pin(release(held))));
        let pushed = self.bag.lock().push(unit);
        match pushed {
            Ok(()) => Ok(value),
            Err(unit) => {
                run_unit(unit).await?;
                Err(DocError::LifetimeClosed)
            }
        }
    }

    /// Registers a [`Dispose`] handle.
    pub fn add_disposable<T>(&self, handle: Arc<T>) -> DocResult<()>
    where
        T: Dispose,
    {
        self.add(move || handle.dispose())
    }

    /// Registers an [`AsyncDispose`] handle.
    pub fn add_async_disposable<T>(&self, handle: Arc<T>) -> DocResult<()>
    where
        T: AsyncDispose + ?Sized,
    {
        self.add_async(move || async move { handle.dispose().await })
    }

    /// Takes ownership of an async child ledger.
    ///
    /// A child offered to a closed ledger is disposed before this returns
    /// [`DocError::LifetimeClosed`].
    pub async fn add_async_child(&self, child: AsyncLifetime) -> DocResult<()> {
        let pushed = self.bag.lock().push(AsyncUnit::Child(child));
        match pushed {
            Ok(()) => Ok(()),
            Err(unit) => {
                run_unit(unit).await?;
                Err(DocError::LifetimeClosed)
            }
        }
    }

    /// Takes ownership of a sync child ledger.
    ///
    /// A child offered to a closed ledger is disposed immediately.
    pub fn add_lifetime(&self, child: Lifetime) -> DocResult<()> {
        let pushed = self.bag.lock().push(AsyncUnit::SyncChild(child));
        match pushed {
            Ok(()) => Ok(()),
            Err(AsyncUnit::SyncChild(child)) => {
                child.dispose()?;
                Err(DocError::LifetimeClosed)
            }
            Err(_) => Err(DocError::LifetimeClosed),
        }
    }

    /// Runs every registered unit, most recent first.
    pub async fn dispose(&self) -> DocResult<()> {
        self.dispose_boxed().await
    }

    fn dispose_boxed(&self) -> BoxFuture<'_, DocResult<()>> {
        Box::pin(async move {
            let units = self.bag.lock().begin_dispose();
            let Some(units) = units else {
                return Ok(());
            };
            let mut errors = Vec::new();
            for unit in units {
                if let Err(e) = run_unit(unit).await {
                    errors.push(e);
                }
            }
            self.bag.lock().finish_dispose();
            if !errors.is_empty() {
                tracing::warn!(failures = errors.len(), "async lifetime teardown finished with failures");
            }
            DocError::aggregate(errors)
        })
    }

    pub fn is_disposed(&self) -> bool {
        self.bag.lock().phase() == Phase::Disposed
    }

    /// True once disposal has started, including after it finished.
    pub fn is_disposing(&self) -> bool {
        !self.bag.lock().is_open()
    }

    /// Number of pending units.
    pub fn len(&self) -> usize {
        self.bag.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bag.lock().is_empty()
    }

    fn push(&self, unit: AsyncUnit) -> DocResult<()> {
        self.bag
            .lock()
            .push(unit)
            .map_err(|_| DocError::LifetimeClosed)
    }

    fn ensure_open(&self) -> DocResult<()> {
        if self.bag.lock().is_open() {
            Ok(())
        } else {
            Err(DocError::LifetimeClosed)
        }
    }
}

async fn run_unit(unit: AsyncUnit) -> DocResult<()> {
    match unit {
        AsyncUnit::Sync(release) => catch_release(release),
        AsyncUnit::SyncChild(child) => child.dispose(),
        AsyncUnit::Async(release) => catch_release_async(release()).await,
        AsyncUnit::Child(child) => child.dispose_boxed().await,
    }
}

impl Default for AsyncLifetime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AsyncLifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bag = self.bag.lock();
        f.debug_struct("AsyncLifetime")
            .field("phase", &bag.phase())
            .field("pending", &bag.len())
            .finish()
    }
}

impl Drop for AsyncLifetime {
    fn drop(&mut self) {
        if !self.bag.get_mut().is_empty() {
            tracing::warn!("AsyncLifetime dropped with undisposed teardown actions. Call dispose().await before dropping.");
        }
    }
}
