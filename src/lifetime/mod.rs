//! Teardown ledgers with exactly-once LIFO release.
//!
//! A [`Lifetime`] records synchronous release actions; an [`AsyncLifetime`]
//! additionally records asynchronous ones and owns nested child lifetimes.
//! Both share the same contract:
//!
//! - units run in strict reverse-of-registration order,
//! - a failing (or panicking) unit does not stop the unwind; every failure is
//!   collected into one [`DocError::Teardown`],
//! - disposal runs once; later calls are no-ops,
//! - registering after disposal started fails with [`DocError::LifetimeClosed`].

mod async_lifetime;

pub use async_lifetime::AsyncLifetime;

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{DocError, DocResult};
use crate::internal::{catch_release, DisposeBag, Phase};
use crate::traits::Dispose;

pub(crate) type SyncRelease = Box<dyn FnOnce() -> DocResult<()> + Send>;

enum SyncUnit {
    Release(SyncRelease),
    Child(Lifetime),
}

/// Ordered ledger of synchronous teardown actions.
///
/// # Examples
///
/// ```
/// use ferrous_docs::Lifetime;
/// use std::sync::{Arc, Mutex};
///
/// let log = Arc::new(Mutex::new(Vec::new()));
/// let lifetime = Lifetime::new();
///
/// for name in ["B1", "B2", "B3"] {
///     let log = log.clone();
///     lifetime
///         .add_bracket(|| Ok(name), move |name| {
///             log.lock().unwrap().push(name);
///             Ok(())
///         })
///         .unwrap();
/// }
///
/// lifetime.dispose().unwrap();
/// lifetime.dispose().unwrap(); // no-op
/// assert_eq!(*log.lock().unwrap(), vec!["B3", "B2", "B1"]);
/// ```
pub struct Lifetime {
    bag: Mutex<DisposeBag<SyncUnit>>,
}

impl Lifetime {
    pub fn new() -> Self {
        Self {
            bag: Mutex::new(DisposeBag::default()),
        }
    }

    /// Registers a release-only action.
    pub fn add<F>(&self, release: F) -> DocResult<()>
    where
        F: FnOnce() -> DocResult<()> + Send + 'static,
    {
        self.bag
            .lock()
            .push(SyncUnit::Release(Box::new(release)))
            .map_err(|_| DocError::LifetimeClosed)
    }

    /// Runs `acquire` now and registers `release` for its result.
    ///
    /// Nothing is registered when `acquire` fails.
    pub fn add_bracket<T, A, R>(&self, acquire: A, release: R) -> DocResult<()>
    where
        A: FnOnce() -> DocResult<T>,
        R: FnOnce(T) -> DocResult<()> + Send + 'static,
        T: Send + 'static,
    {
        self.ensure_open()?;
        let value = acquire()?;
        let release: SyncRelease = Box::new(move || release(value));
        let pushed = self.bag.lock().push(SyncUnit::Release(release));
        match pushed {
            Ok(()) => Ok(()),
            Err(unit) => {
                // Closed while acquiring: the acquired value must not leak.
                run_sync_unit(unit)?;
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

    /// Takes ownership of a child ledger, disposed at its position in the unwind.
    ///
    /// A child offered to a closed ledger is disposed immediately.
    pub fn add_child(&self, child: Lifetime) -> DocResult<()> {
        let rejected = self.bag.lock().push(SyncUnit::Child(child));
        match rejected {
            Ok(()) => Ok(()),
            Err(unit) => {
                run_sync_unit(unit)?;
                Err(DocError::LifetimeClosed)
            }
        }
    }

    /// Runs every registered unit, most recent first.
    pub fn dispose(&self) -> DocResult<()> {
        let units = self.bag.lock().begin_dispose();
        let Some(units) = units else {
            return Ok(());
        };
        let mut errors = Vec::new();
        for unit in units {
            if let Err(e) = run_sync_unit(unit) {
                errors.push(e);
            }
        }
        self.bag.lock().finish_dispose();
        if !errors.is_empty() {
            tracing::warn!(failures = errors.len(), "lifetime teardown finished with failures");
        }
        DocError::aggregate(errors)
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

    fn ensure_open(&self) -> DocResult<()> {
        if self.bag.lock().is_open() {
            Ok(())
        } else {
            Err(DocError::LifetimeClosed)
        }
    }
}

fn run_sync_unit(unit: SyncUnit) -> DocResult<()> {
    match unit {
        SyncUnit::Release(release) => catch_release(release),
        SyncUnit::Child(child) => child.dispose(),
    }
}

impl Default for Lifetime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bag = self.bag.lock();
        f.debug_struct("Lifetime")
            .field("phase", &bag.phase())
            .field("pending", &bag.len())
            .finish()
    }
}

impl Drop for Lifetime {
    fn drop(&mut self) {
        if !self.bag.get_mut().is_empty() {
            tracing::warn!("Lifetime dropped with undisposed teardown actions. Call dispose() before dropping.");
        }
    }
}
