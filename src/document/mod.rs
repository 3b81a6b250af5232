//! Documents: hosted, disposable units of content.
//!
//! A document is created and registered by a [`DocumentManager`]. Its
//! teardown ledger is filled at creation so that disposal, however it is
//! triggered, unwinds in this order:
//!
//! 1. unregister from the manager's roster,
//! 2. detach the container from the host,
//! 3. clear the content-to-container binding,
//! 4. dispose the content (only with `dispose_content_on_close`),
//! 5. destroy the container.

mod request;

pub use request::{DocumentId, DocumentRequest};

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::cancellation::CancellationToken;
use crate::commands::DocumentCommand;
use crate::dispatcher::ThreadAffinity;
use crate::entity::{DisposableEntity, EntityState, SubscriptionId};
use crate::error::{DocError, DocResult};
use crate::manager::{DocumentManager, ManagerInner};
use crate::resolution::ViewType;
use crate::traits::{ContainerHandle, Content, HostAdapter};

/// Document lifecycle state, superimposed on [`EntityState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentState {
    /// Registered and usable, shown or hidden
    Active,
    /// A cooperative close is being negotiated
    Closing,
    Disposing,
    Disposed,
}

pub(crate) struct DocumentParts {
    pub(crate) serial: u64,
    pub(crate) affinity: ThreadAffinity,
    pub(crate) manager: Weak<ManagerInner>,
    pub(crate) host: Arc<dyn HostAdapter>,
    pub(crate) container: ContainerHandle,
    pub(crate) view: ViewType,
    pub(crate) content: Arc<dyn Content>,
    pub(crate) title: Option<String>,
    pub(crate) id: Option<DocumentId>,
    pub(crate) dispose_content_on_close: Arc<AtomicBool>,
    pub(crate) hide_instead_of_close: bool,
}

struct DocumentInner {
    serial: u64,
    entity: DisposableEntity,
    manager: Weak<ManagerInner>,
    host: Arc<dyn HostAdapter>,
    container: ContainerHandle,
    view: ViewType,
    content: Arc<dyn Content>,
    id: Mutex<Option<DocumentId>>,
    title: Mutex<Option<String>>,
    dispose_content_on_close: Arc<AtomicBool>,
    hide_instead_of_close: AtomicBool,
    visible: AtomicBool,
    closing: Mutex<Option<CancellationToken>>,
}

/// One hosted document.
///
/// Cheap to clone; clones refer to the same document and compare equal.
///
/// # Examples
///
/// ```no_run
/// use ferrous_docs::{CancellationToken, DocumentManager, DocumentRequest};
/// # use ferrous_docs::Content;
/// # use std::sync::Arc;
/// # struct Editor;
/// # impl Content for Editor {}
///
/// # async fn example(manager: DocumentManager) -> ferrous_docs::DocResult<()> {
/// let doc = manager
///     .create_document(DocumentRequest::new("EditorView", Arc::new(Editor)), &CancellationToken::new())
///     .await?;
/// doc.set_id("editor-1")?;
/// doc.hide()?;
/// doc.show()?;
///
/// // Cooperative close: the content may veto.
/// if !doc.close(false).await? {
///     doc.close(true).await?;
/// }
/// assert!(manager.find_document_by_id("editor-1").is_none());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Document {
    inner: Arc<DocumentInner>,
}

impl Document {
    pub(crate) fn new(parts: DocumentParts) -> Self {
        let label = format!("document #{} ({})", parts.serial, parts.view.name());
        Self {
            inner: Arc::new(DocumentInner {
                serial: parts.serial,
                entity: DisposableEntity::new(label, parts.affinity),
                manager: parts.manager,
                host: parts.host,
                container: parts.container,
                view: parts.view,
                content: parts.content,
                id: Mutex::new(parts.id),
                title: Mutex::new(parts.title),
                dispose_content_on_close: parts.dispose_content_on_close,
                hide_instead_of_close: AtomicBool::new(parts.hide_instead_of_close),
                visible: AtomicBool::new(false),
                closing: Mutex::new(None),
            }),
        }
    }

    pub(crate) fn serial(&self) -> u64 {
        self.inner.serial
    }

    pub fn id(&self) -> Option<DocumentId> {
        self.inner.id.lock().clone()
    }

    /// Assigns the identity. Succeeds once per document.
    pub fn set_id(&self, id: impl Into<DocumentId>) -> DocResult<()> {
        self.inner.entity.ensure_not_disposed()?;
        let mut slot = self.inner.id.lock();
        if let Some(existing) = slot.as_ref() {
            return Err(DocError::IdAlreadyAssigned(existing.to_string()));
        }
        *slot = Some(id.into());
        Ok(())
    }

    pub fn title(&self) -> Option<String> {
        self.inner.title.lock().clone()
    }

    /// Sets the title and forwards it to the host container.
    pub fn set_title(&self, title: impl Into<String>) -> DocResult<()> {
        self.verify_access()?;
        self.inner.entity.ensure_alive()?;
        let title = title.into();
        self.inner.host.set_title(self.inner.container, &title)?;
        *self.inner.title.lock() = Some(title);
        Ok(())
    }

    pub fn dispose_content_on_close(&self) -> bool {
        self.inner.dispose_content_on_close.load(Ordering::Acquire)
    }

    pub fn set_dispose_content_on_close(&self, enabled: bool) {
        self.inner.dispose_content_on_close.store(enabled, Ordering::Release);
    }

    pub fn hide_instead_of_close(&self) -> bool {
        self.inner.hide_instead_of_close.load(Ordering::Acquire)
    }

    pub fn set_hide_instead_of_close(&self, enabled: bool) {
        self.inner.hide_instead_of_close.store(enabled, Ordering::Release);
    }

    pub fn is_visible(&self) -> bool {
        self.inner.visible.load(Ordering::Acquire)
    }

    pub fn content(&self) -> &Arc<dyn Content> {
        &self.inner.content
    }

    pub fn container(&self) -> ContainerHandle {
        self.inner.container
    }

    pub fn view(&self) -> &ViewType {
        &self.inner.view
    }

    /// The owning manager, if it is still alive.
    pub fn manager(&self) -> Option<DocumentManager> {
        self.inner.manager.upgrade().map(DocumentManager::from_inner)
    }

    /// The underlying disposable entity.
    ///
    /// Disposing it directly is a forced close without observer reporting.
    pub fn entity(&self) -> &DisposableEntity {
        &self.inner.entity
    }

    pub fn state(&self) -> DocumentState {
        match self.inner.entity.state() {
            EntityState::Disposed => DocumentState::Disposed,
            EntityState::Disposing => DocumentState::Disposing,
            EntityState::NotDisposed if self.inner.closing.lock().is_some() => DocumentState::Closing,
            EntityState::NotDisposed => DocumentState::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner
            .manager
            .upgrade()
            .is_some_and(|manager| manager.is_active(self))
    }

    /// Makes the document visible and brings it to the foreground.
    ///
    /// No-op once disposal has started.
    pub fn show(&self) -> DocResult<()> {
        self.verify_access()?;
        if self.inner.entity.is_disposing_or_disposed() {
            return Ok(());
        }
        self.present()?;
        if let Some(manager) = self.inner.manager.upgrade() {
            manager.change_active(Some(self.clone()), false)?;
        }
        Ok(())
    }

    /// Hides the document. A hidden document stops being the active one.
    ///
    /// No-op once disposal has started.
    pub fn hide(&self) -> DocResult<()> {
        self.verify_access()?;
        if self.inner.entity.is_disposing_or_disposed() {
            return Ok(());
        }
        self.inner.host.set_visible(self.inner.container, false)?;
        self.inner.visible.store(false, Ordering::Release);
        if let Some(manager) = self.inner.manager.upgrade() {
            if manager.is_active(self) {
                manager.change_active(None, false)?;
            }
        }
        Ok(())
    }

    /// Host-side part of showing: visibility plus foreground request.
    pub(crate) fn present(&self) -> DocResult<()> {
        self.inner.host.set_visible(self.inner.container, true)?;
        self.inner.visible.store(true, Ordering::Release);
        self.inner.host.activate(self.inner.container)
    }

    /// Closes the document with a fresh cancellation token.
    ///
    /// See [`close_with`](Self::close_with).
    pub async fn close(&self, force: bool) -> DocResult<bool> {
        self.close_with(force, &CancellationToken::new()).await
    }

    /// Closes the document.
    ///
    /// Returns `Ok(true)` when this call disposed the document. A cooperative
    /// close (`force == false`) asks the content first: a veto returns
    /// `Ok(false)`, a cancelled negotiation returns [`DocError::Cancelled`],
    /// and a failing predicate is reported to observers and returned. In every
    /// one of those cases the document stays open. A cooperative close while
    /// another is in flight returns `Ok(false)` at once.
    ///
    /// A forced close cancels any in-flight negotiation and disposes the
    /// document, returning the aggregated teardown failures, if any.
    pub async fn close_with(&self, force: bool, cancel: &CancellationToken) -> DocResult<bool> {
        self.verify_access()?;
        if self.inner.entity.is_disposing_or_disposed() {
            return Ok(false);
        }

        if force {
            let pending = self.inner.closing.lock().take();
            if let Some(negotiation) = pending {
                tracing::debug!(document = %self, "forced close cancels pending negotiation");
                negotiation.cancel();
            }
            return self.dispose_and_report().await;
        }

        let negotiation = {
            let mut closing = self.inner.closing.lock();
            if closing.is_some() {
                tracing::debug!(document = %self, "close already in flight");
                return Ok(false);
            }
            let token = cancel.child_token();
            *closing = Some(token.clone());
            token
        };

        let verdict = negotiation.run(self.inner.content.can_close(&negotiation)).await;
        {
            let mut closing = self.inner.closing.lock();
            if closing.as_ref().is_some_and(|t| t.same_token(&negotiation)) {
                *closing = None;
            }
        }

        let manager = self.inner.manager.upgrade();
        match verdict {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(document = %self, "close vetoed by content");
                if let Some(manager) = &manager {
                    manager.record_veto();
                    manager.observers().close_vetoed(self);
                }
                return Ok(false);
            }
            Err(DocError::Cancelled) => return Err(DocError::Cancelled),
            Err(error) => {
                tracing::warn!(document = %self, %error, "close predicate failed");
                if let Some(manager) = &manager {
                    manager.observers().close_failed(self, &error);
                }
                return Err(error);
            }
        }

        if self.inner.entity.is_disposing_or_disposed() {
            return Ok(false);
        }
        self.dispose_and_report().await
    }

    /// Close request from the host's own close affordance.
    ///
    /// With `hide_instead_of_close` the document is hidden and stays open.
    pub async fn request_host_close(&self) -> DocResult<bool> {
        if self.hide_instead_of_close() {
            self.hide()?;
            return Ok(false);
        }
        self.close(false).await
    }

    /// Subscribes to the notification raised before teardown starts.
    pub fn on_closing<F, Fut>(&self, handler: F) -> SubscriptionId
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DocResult<()>> + Send + 'static,
    {
        self.inner.entity.on_disposing(handler)
    }

    pub fn remove_closing(&self, id: SubscriptionId) -> bool {
        self.inner.entity.remove_disposing(id)
    }

    /// Completes once the document is disposed.
    pub async fn wait_closed(&self) {
        self.inner.entity.wait_disposed().await
    }

    pub fn can_execute(&self, command: DocumentCommand) -> bool {
        match command {
            DocumentCommand::Close => self.state() == DocumentState::Active,
            DocumentCommand::Show | DocumentCommand::Hide | DocumentCommand::ForceClose => {
                !self.inner.entity.is_disposing_or_disposed()
            }
        }
    }

    pub async fn execute(&self, command: DocumentCommand) -> DocResult<()> {
        match command {
            DocumentCommand::Show => self.show(),
            DocumentCommand::Hide => self.hide(),
            DocumentCommand::Close => self.close(false).await.map(|_| ()),
            DocumentCommand::ForceClose => self.close(true).await.map(|_| ()),
        }
    }

    fn verify_access(&self) -> DocResult<()> {
        self.inner.entity.affinity().verify()
    }

    async fn dispose_and_report(&self) -> DocResult<bool> {
        match self.inner.entity.try_dispose().await {
            Ok(disposed) => Ok(disposed),
            Err(error) => {
                if let Some(manager) = self.inner.manager.upgrade() {
                    manager.observers().teardown_failed(Some(self), &error);
                }
                Err(error)
            }
        }
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Document {}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.id.lock().as_ref() {
            Some(id) => write!(f, "{} '{}'", self.inner.entity.label(), id),
            None => f.write_str(self.inner.entity.label()),
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("serial", &self.inner.serial)
            .field("id", &*self.inner.id.lock())
            .field("view", &self.inner.view)
            .field("container", &self.inner.container)
            .field("state", &self.state())
            .finish()
    }
}
