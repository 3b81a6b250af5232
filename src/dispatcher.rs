//! Thread affinity and marshaling onto an owner thread.
//!
//! Every document and manager belongs to one logical owner thread. The
//! [`ThreadAffinity`] token records that thread and is checked at the
//! boundary of every mutating operation. Work that starts elsewhere must be
//! marshaled with [`invoke`], which suspends until the owner thread has run
//! it.

use std::future::Future;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{mpsc, oneshot};

use crate::error::{DocError, DocResult};

/// Owned-by-thread capability.
///
/// # Examples
///
/// ```
/// use ferrous_docs::ThreadAffinity;
///
/// let affinity = ThreadAffinity::current();
/// assert!(affinity.check_access());
///
/// std::thread::spawn(move || {
///     assert!(affinity.verify().is_err());
/// })
/// .join()
/// .unwrap();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    owner: ThreadId,
}

impl ThreadAffinity {
    /// Affinity to the calling thread.
    pub fn current() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    pub fn new(owner: ThreadId) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// True when called on the owner thread.
    pub fn check_access(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Fails with [`DocError::ThreadAffinity`] off the owner thread.
    pub fn verify(&self) -> DocResult<()> {
        if self.check_access() {
            return Ok(());
        }
        let current = thread::current();
        Err(DocError::ThreadAffinity {
            expected: format!("{:?}", self.owner),
            actual: match current.name() {
                Some(name) => format!("{:?} ({name})", current.id()),
                None => format!("{:?}", current.id()),
            },
        })
    }
}

/// Unit of work posted to an owner thread.
pub type Job = BoxFuture<'static, ()>;

/// Injected thread-affinity service.
///
/// Owns the notion of "the UI thread" for a manager and its documents.
pub trait Dispatcher: Send + Sync + 'static {
    fn affinity(&self) -> ThreadAffinity;

    /// Queues `job` to run on the owner thread.
    fn post(&self, job: Job) -> DocResult<()>;

    fn check_access(&self) -> bool {
        self.affinity().check_access()
    }
}

/// Runs `f` on the dispatcher's owner thread and returns its result.
///
/// Runs inline when already on the owner thread. Otherwise the work is posted
/// and the caller suspends until it completes. A job dropped before
/// completing (owner thread shut down) yields [`DocError::Cancelled`].
pub async fn invoke<D, F, Fut, T>(dispatcher: &D, f: F) -> DocResult<T>
where
    D: Dispatcher + ?Sized,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = DocResult<T>> + Send + 'static,
    T: Send + 'static,
{
    if dispatcher.check_access() {
        return f().await;
    }
    let (tx, rx) = oneshot::channel();
    dispatcher.post(Box::pin(async move {
        let _ = tx.send(f().await);
    }))?;
    rx.await.map_err(|_| DocError::Cancelled)?
}

/// Dispatcher bound to the thread (and tokio runtime) that created it.
///
/// Posting lands on the owner thread only when the captured runtime is a
/// current-thread runtime driven by that thread, which is how
/// `#[tokio::main(flavor = "current_thread")]` and `#[tokio::test]`
/// applications run. Created anywhere else (outside a runtime, or on a
/// multi-thread runtime whose workers are not the owner) it still runs
/// [`invoke`] inline on the owner thread, but posting from other threads
/// fails. Use [`DedicatedDispatcher`] there.
pub struct CurrentThreadDispatcher {
    affinity: ThreadAffinity,
    handle: Option<Handle>,
}

impl CurrentThreadDispatcher {
    pub fn new() -> Self {
        Self {
            affinity: ThreadAffinity::current(),
            handle: Handle::try_current()
                .ok()
                .filter(|handle| handle.runtime_flavor() == RuntimeFlavor::CurrentThread),
        }
    }
}

impl Default for CurrentThreadDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher for CurrentThreadDispatcher {
    fn affinity(&self) -> ThreadAffinity {
        self.affinity
    }

    fn post(&self, job: Job) -> DocResult<()> {
        match &self.handle {
            Some(handle) => {
                handle.spawn(job);
                Ok(())
            }
            None => {
                self.affinity.verify()?;
                Err(DocError::Host(
                    "dispatcher was not created on a current-thread tokio runtime; use DedicatedDispatcher".to_string(),
                ))
            }
        }
    }
}

/// Dispatcher that owns a dedicated thread running a single-threaded runtime.
///
/// The thread plays the role of a UI thread: every posted job runs there, in
/// posting order of arrival. [`shutdown`](Self::shutdown) (or drop) stops the
/// loop and joins the thread.
///
/// # Examples
///
/// ```
/// use ferrous_docs::{invoke, DedicatedDispatcher, Dispatcher};
///
/// # #[tokio::main]
/// # async fn main() -> ferrous_docs::DocResult<()> {
/// let dispatcher = DedicatedDispatcher::spawn("ui")?;
/// let on_owner = invoke(&*dispatcher, || async {
///     Ok(std::thread::current().name().map(str::to_string))
/// })
/// .await?;
/// assert_eq!(on_owner.as_deref(), Some("ui"));
/// dispatcher.shutdown();
/// # Ok(())
/// # }
/// ```
pub struct DedicatedDispatcher {
    affinity: ThreadAffinity,
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl DedicatedDispatcher {
    /// Starts the owner thread.
    pub fn spawn(name: &str) -> DocResult<Arc<Self>> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<ThreadId, String>>();

        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(thread::current().id()));
                runtime.block_on(async move {
                    while let Some(job) = receiver.recv().await {
                        tokio::spawn(job);
                    }
                });
                tracing::debug!("dispatcher loop stopped");
            })
            .map_err(|e| DocError::Host(format!("failed to spawn owner thread: {e}")))?;

        let owner = ready_rx
            .recv()
            .map_err(|_| DocError::Host("owner thread exited during startup".to_string()))?
            .map_err(|e| DocError::Host(format!("failed to build owner runtime: {e}")))?;

        Ok(Arc::new(Self {
            affinity: ThreadAffinity::new(owner),
            sender: Mutex::new(Some(sender)),
            thread: Mutex::new(Some(thread)),
        }))
    }

    /// Stops accepting jobs, drops pending ones, and joins the owner thread.
    ///
    /// Called from the owner thread itself, the thread is left to finish on
    /// its own.
    pub fn shutdown(&self) {
        self.sender.lock().take();
        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            if !self.affinity.check_access() && handle.join().is_err() {
                tracing::warn!("owner thread panicked during shutdown");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.sender.lock().is_some()
    }
}

impl Dispatcher for DedicatedDispatcher {
    fn affinity(&self) -> ThreadAffinity {
        self.affinity
    }

    fn post(&self, job: Job) -> DocResult<()> {
        match self.sender.lock().as_ref() {
            Some(sender) => sender.send(job).map_err(|_| DocError::Cancelled),
            None => Err(DocError::Cancelled),
        }
    }
}

impl Drop for DedicatedDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
