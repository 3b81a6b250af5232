//! The document manager: roster, active selection, creation and bulk close.

mod builder;
mod create;
mod options;

pub use builder::DocumentManagerBuilder;
pub use options::ManagerOptions;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::cancellation::CancellationToken;
use crate::dispatcher::Dispatcher;
use crate::document::{Document, DocumentId};
use crate::entity::SubscriptionId;
use crate::error::{DocError, DocResult};
use crate::observer::Observers;
use crate::resolution::{TypeResolutionCache, ViewType};
use crate::traits::HostAdapter;

pub(crate) type FallbackView = Arc<dyn Fn(&str) -> ViewType + Send + Sync>;
type ActiveHandler = Arc<dyn Fn(&ActiveDocumentChanged) + Send + Sync>;

/// Payload of the active-document-changed notification.
#[derive(Debug, Clone)]
pub struct ActiveDocumentChanged {
    pub old: Option<Document>,
    pub new: Option<Document>,
}

/// Manager counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManagerStats {
    /// Documents registered
    pub created: u64,
    /// Documents that left the roster
    pub closed: u64,
    /// Cooperative closes vetoed by content
    pub vetoed: u64,
    /// Creations abandoned because of cancellation
    pub cancelled_creations: u64,
    /// Creations that failed for any other reason
    pub failed_creations: u64,
}

#[derive(Default)]
struct Counters {
    created: AtomicU64,
    closed: AtomicU64,
    vetoed: AtomicU64,
    cancelled_creations: AtomicU64,
    failed_creations: AtomicU64,
}

/// Clears a flag on drop, but only if this guard set it.
struct ReentrancyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ReentrancyGuard<'a> {
    fn try_enter(flag: &'a AtomicBool) -> Option<Self> {
        (!flag.swap(true, Ordering::AcqRel)).then_some(Self { flag })
    }
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub(crate) struct ManagerInner {
    host: Arc<dyn HostAdapter>,
    resolver: Arc<TypeResolutionCache>,
    dispatcher: Arc<dyn Dispatcher>,
    fallback_view: Option<FallbackView>,
    observers: Observers,
    options: ManagerOptions,
    roster: Mutex<Vec<Document>>,
    active: Mutex<Option<Document>>,
    changing_active: AtomicBool,
    active_handlers: Mutex<Vec<(SubscriptionId, ActiveHandler)>>,
    count_tx: watch::Sender<usize>,
    id_gates: Mutex<HashMap<DocumentId, Arc<tokio::sync::Mutex<()>>>>,
    next_serial: AtomicU64,
    next_subscription: AtomicU64,
    counters: Counters,
}

impl ManagerInner {
    fn new(
        host: Arc<dyn HostAdapter>,
        resolver: Arc<TypeResolutionCache>,
        dispatcher: Arc<dyn Dispatcher>,
        fallback_view: Option<FallbackView>,
        observers: Observers,
        options: ManagerOptions,
    ) -> Self {
        let (count_tx, _) = watch::channel(0);
        Self {
            host,
            resolver,
            dispatcher,
            fallback_view,
            observers,
            options,
            roster: Mutex::new(Vec::new()),
            active: Mutex::new(None),
            changing_active: AtomicBool::new(false),
            active_handlers: Mutex::new(Vec::new()),
            count_tx,
            id_gates: Mutex::new(HashMap::new()),
            next_serial: AtomicU64::new(1),
            next_subscription: AtomicU64::new(1),
            counters: Counters::default(),
        }
    }

    pub(crate) fn observers(&self) -> &Observers {
        &self.observers
    }

    pub(crate) fn record_veto(&self) {
        self.counters.vetoed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn is_active(&self, document: &Document) -> bool {
        self.active.lock().as_ref() == Some(document)
    }

    fn register(&self, document: &Document) {
        let mut roster = self.roster.lock();
        roster.push(document.clone());
        self.count_tx.send_replace(roster.len());
    }

    /// Roster release registered in every document's ledger.
    ///
    /// Removal, the active-selection repair and the count publication happen
    /// under the roster lock, so no reader sees a half-updated roster.
    fn unregister(&self, serial: u64) {
        let (removed, change) = {
            let mut roster = self.roster.lock();
            let Some(position) = roster.iter().position(|d| d.serial() == serial) else {
                return;
            };
            let removed = roster.remove(position);
            let mut active = self.active.lock();
            let change = if active.as_ref() == Some(&removed) {
                let next = if self.options.activate_fallback_on_close {
                    roster.last().cloned()
                } else {
                    None
                };
                let old = std::mem::replace(&mut *active, next.clone());
                Some((old, next))
            } else {
                None
            };
            self.count_tx.send_replace(roster.len());
            (removed, change)
        };

        self.counters.closed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(document = %removed, "document left roster");

        if let Some((old, new)) = change {
            let _guard = ReentrancyGuard::try_enter(&self.changing_active);
            if let Some(next) = &new {
                if let Err(error) = next.present() {
                    tracing::warn!(document = %next, %error, "failed to bring fallback document forward");
                }
            }
            self.notify_active_changed(old, new);
        }
        self.observers.document_closed(&removed);
    }

    /// Moves the active selection.
    ///
    /// Nested requests made while a change is being applied or announced are
    /// ignored. `foreground` asks the host to bring the document forward.
    pub(crate) fn change_active(&self, new: Option<Document>, foreground: bool) -> DocResult<()> {
        let Some(_guard) = ReentrancyGuard::try_enter(&self.changing_active) else {
            tracing::debug!("ignoring nested active document change");
            return Ok(());
        };

        if let Some(document) = &new {
            if !self.contains(document) {
                return Err(DocError::UnknownDocument);
            }
            if foreground {
                document.present()?;
            }
        }

        let old = {
            let roster = self.roster.lock();
            if let Some(document) = &new {
                if !roster.contains(document) {
                    return Err(DocError::UnknownDocument);
                }
            }
            let mut active = self.active.lock();
            if *active == new {
                return Ok(());
            }
            std::mem::replace(&mut *active, new.clone())
        };

        self.notify_active_changed(old, new);
        Ok(())
    }

    fn notify_active_changed(&self, old: Option<Document>, new: Option<Document>) {
        let event = ActiveDocumentChanged { old, new };
        let handlers: Vec<ActiveHandler> = self
            .active_handlers
            .lock()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(&event);
        }
        self.observers.active_changed(event.old.as_ref(), event.new.as_ref());
    }

    fn contains(&self, document: &Document) -> bool {
        self.roster.lock().contains(document)
    }

    fn id_gate(&self, id: &DocumentId) -> Arc<tokio::sync::Mutex<()>> {
        self.id_gates.lock().entry(id.clone()).or_default().clone()
    }

    fn release_id_gate(&self, id: &DocumentId, gate: Arc<tokio::sync::Mutex<()>>) {
        let mut gates = self.id_gates.lock();
        // One reference in the map plus ours: nobody else is waiting.
        if Arc::strong_count(&gate) <= 2 {
            gates.remove(id);
        }
    }
}

/// Owner of a roster of documents and the single active document.
///
/// Cheap to clone; clones share the same roster. All mutating operations
/// must run on the dispatcher's owner thread (see [`invoke`](crate::invoke)).
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use ferrous_docs::{CancellationToken, Content, DocumentManager, DocumentRequest, HostAdapter};
///
/// # struct Editor;
/// # impl Content for Editor {}
/// # async fn example(host: Arc<dyn HostAdapter>) -> ferrous_docs::DocResult<()> {
/// let manager = DocumentManager::builder(host).build();
/// let cancel = CancellationToken::new();
///
/// let a = manager
///     .create_document(DocumentRequest::new("EditorView", Arc::new(Editor)).with_id("A"), &cancel)
///     .await?;
/// let b = manager
///     .create_document(DocumentRequest::new("EditorView", Arc::new(Editor)).with_id("B"), &cancel)
///     .await?;
///
/// manager.set_active_document(Some(&b))?;
/// b.close(true).await?;
/// assert!(manager.active_document().is_none());
/// assert_eq!(manager.documents(), vec![a]);
///
/// manager.close_all(&cancel).await?;
/// assert_eq!(manager.count(), 0);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DocumentManager {
    inner: Arc<ManagerInner>,
}

impl DocumentManager {
    pub fn builder(host: Arc<dyn HostAdapter>) -> DocumentManagerBuilder {
        DocumentManagerBuilder::new(host)
    }

    pub(crate) fn from_inner(inner: Arc<ManagerInner>) -> Self {
        Self { inner }
    }

    pub fn resolver(&self) -> &Arc<TypeResolutionCache> {
        &self.inner.resolver
    }

    pub fn dispatcher(&self) -> Arc<dyn Dispatcher> {
        self.inner.dispatcher.clone()
    }

    pub fn host(&self) -> &Arc<dyn HostAdapter> {
        &self.inner.host
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.inner.options
    }

    pub fn count(&self) -> usize {
        self.inner.roster.lock().len()
    }

    /// Snapshot of the roster in registration order.
    pub fn documents(&self) -> Vec<Document> {
        self.inner.roster.lock().clone()
    }

    /// Receiver of the roster size, updated together with the roster.
    pub fn watch_count(&self) -> watch::Receiver<usize> {
        self.inner.count_tx.subscribe()
    }

    pub fn active_document(&self) -> Option<Document> {
        self.inner.active.lock().clone()
    }

    /// Selects the active document and brings it to the foreground.
    ///
    /// Fails with [`DocError::UnknownDocument`] for a document that is not in
    /// this manager's roster. `None` clears the selection.
    pub fn set_active_document(&self, document: Option<&Document>) -> DocResult<()> {
        self.verify_access()?;
        self.inner.change_active(document.cloned(), true)
    }

    /// Host-reported focus change. Updates the selection without asking the
    /// host to bring the document forward again.
    pub fn notify_host_activated(&self, document: &Document) -> DocResult<()> {
        self.verify_access()?;
        self.inner.change_active(Some(document.clone()), false)
    }

    /// Subscribes to active-document changes. Handlers run synchronously on
    /// the owner thread and cannot change the selection themselves.
    pub fn on_active_document_changed<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&ActiveDocumentChanged) + Send + Sync + 'static,
    {
        let id = SubscriptionId::new(self.inner.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.inner.active_handlers.lock().push((id, Arc::new(handler)));
        id
    }

    pub fn remove_active_document_changed(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.inner.active_handlers.lock();
        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        handlers.len() != before
    }

    pub fn find_document_by_id(&self, id: &str) -> Option<Document> {
        self.inner
            .roster
            .lock()
            .iter()
            .find(|document| document.id().is_some_and(|existing| existing.as_str() == id))
            .cloned()
    }

    /// Returns the document with `id`, creating it with `create` if absent.
    ///
    /// Concurrent calls for the same id are serialized: only the first runs
    /// `create`, the others receive its document. The created document gets
    /// `id` assigned unless it already carries it. A document that already
    /// carries a different id is force-closed and the assignment error
    /// returned.
    pub async fn find_document_by_id_or_create<F, Fut>(
        &self,
        id: impl Into<DocumentId>,
        create: F,
    ) -> DocResult<Document>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DocResult<Document>>,
    {
        let id = id.into();
        if let Some(document) = self.find_document_by_id(id.as_str()) {
            return Ok(document);
        }

        let gate = self.inner.id_gate(&id);
        let result = {
            let _permit = gate.lock().await;
            match self.find_document_by_id(id.as_str()) {
                Some(document) => Ok(document),
                None => self.create_with_id(&id, create).await,
            }
        };
        self.inner.release_id_gate(&id, gate);
        result
    }

    async fn create_with_id<F, Fut>(&self, id: &DocumentId, create: F) -> DocResult<Document>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DocResult<Document>>,
    {
        let document = create().await?;
        if document.id().as_ref() != Some(id) {
            if let Err(error) = document.set_id(id.clone()) {
                // The caller never sees this document, so it must not stay registered.
                if let Err(teardown) = document.close(true).await {
                    tracing::warn!(%teardown, "failed to unwind document created under a different id");
                }
                return Err(error);
            }
        }
        Ok(document)
    }

    /// Requests a cooperative close on every document and waits for the
    /// roster to empty.
    ///
    /// Individual close failures are reported to observers, not returned.
    /// While a veto stands the call keeps waiting; a forced close of the
    /// vetoing document, or cancelling `cancel`, lets it finish.
    pub async fn close_all(&self, cancel: &CancellationToken) -> DocResult<()> {
        self.verify_access()?;
        let documents = self.documents();
        tracing::debug!(count = documents.len(), "closing all documents");

        let closes = documents.iter().map(|document| async move {
            match document.close_with(false, cancel).await {
                Ok(_) => {}
                Err(error) if error.is_cancelled() => {}
                Err(error) => tracing::warn!(document = %document, %error, "close failed during close_all"),
            }
        });
        cancel
            .run(async {
                join_all(closes).await;
                Ok(())
            })
            .await?;

        let mut count = self.watch_count();
        cancel
            .run(async move {
                count
                    .wait_for(|n| *n == 0)
                    .await
                    .map(|_| ())
                    .map_err(|_| DocError::Cancelled)
            })
            .await
    }

    pub fn stats(&self) -> ManagerStats {
        let counters = &self.inner.counters;
        ManagerStats {
            created: counters.created.load(Ordering::Relaxed),
            closed: counters.closed.load(Ordering::Relaxed),
            vetoed: counters.vetoed.load(Ordering::Relaxed),
            cancelled_creations: counters.cancelled_creations.load(Ordering::Relaxed),
            failed_creations: counters.failed_creations.load(Ordering::Relaxed),
        }
    }

    fn verify_access(&self) -> DocResult<()> {
        self.inner.dispatcher.affinity().verify()
    }
}

impl fmt::Debug for DocumentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentManager")
            .field("count", &self.count())
            .field("active", &self.active_document().map(|d| d.to_string()))
            .field("observers", &self.inner.observers.len())
            .field("options", &self.inner.options)
            .finish()
    }
}
