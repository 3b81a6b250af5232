//! # ferrous-docs
//!
//! UI-agnostic lifecycle runtime for long-lived hosted documents: creation,
//! cancellable initialization, show/hide, cooperative and forced closing,
//! active-document tracking and deterministic teardown.
//!
//! ## Features
//!
//! - **Teardown ledgers**: [`Lifetime`] and [`AsyncLifetime`] record release actions and brackets and unwind them LIFO exactly once
//! - **Disposable entities**: idempotent, reentrancy-safe disposal with a "disposing" notification
//! - **Documents and managers**: roster consistency maintained by each document's own teardown
//! - **View resolution**: layered name-to-type cache with a placeholder fallback
//! - **Thread affinity**: every mutating operation checks an owned-by-thread token; [`invoke`] marshals work onto the owner
//! - **Cancellation as a value**: [`DocError::Cancelled`] rather than panics or unwinding
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use ferrous_docs::{
//!     CancellationToken, ContainerHandle, Content, DocResult, DocumentManager, DocumentRequest,
//!     HostAdapter, ViewType,
//! };
//!
//! struct NullHost;
//!
//! #[async_trait]
//! impl HostAdapter for NullHost {
//!     async fn create_container(&self, _view: &ViewType) -> DocResult<ContainerHandle> {
//!         Ok(ContainerHandle::new(1))
//!     }
//!     async fn bind_content(&self, _c: ContainerHandle, _content: Arc<dyn Content>) -> DocResult<()> {
//!         Ok(())
//!     }
//!     fn detach_content(&self, _c: ContainerHandle) -> DocResult<()> { Ok(()) }
//!     fn attach(&self, _c: ContainerHandle) -> DocResult<()> { Ok(()) }
//!     fn detach(&self, _c: ContainerHandle) -> DocResult<()> { Ok(()) }
//!     fn destroy(&self, _c: ContainerHandle) -> DocResult<()> { Ok(()) }
//! }
//!
//! struct Notes;
//! impl Content for Notes {}
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> DocResult<()> {
//! let manager = DocumentManager::builder(Arc::new(NullHost)).build();
//! let cancel = CancellationToken::new();
//!
//! let doc = manager
//!     .create_document(DocumentRequest::new("NotesView", Arc::new(Notes)).with_id("notes"), &cancel)
//!     .await?;
//! assert_eq!(manager.count(), 1);
//! assert_eq!(manager.active_document(), Some(doc.clone()));
//!
//! assert!(doc.close(false).await?);
//! assert_eq!(manager.count(), 0);
//! assert!(manager.active_document().is_none());
//! # Ok(())
//! # }
//! ```
//!
//! ## Teardown ledgers
//!
//! ```rust
//! use ferrous_docs::AsyncLifetime;
//! use std::sync::{Arc, Mutex};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let order = Arc::new(Mutex::new(Vec::new()));
//! let lifetime = AsyncLifetime::new();
//!
//! for name in ["connection", "session"] {
//!     let order = order.clone();
//!     lifetime
//!         .add_bracket(|| Ok(name), move |name| {
//!             order.lock().unwrap().push(name);
//!             Ok(())
//!         })
//!         .unwrap();
//! }
//!
//! lifetime.dispose().await.unwrap();
//! assert_eq!(*order.lock().unwrap(), vec!["session", "connection"]);
//! assert!(lifetime.add(|| Ok(())).is_err());
//! # }
//! ```

// Module declarations
pub mod cancellation;
pub mod commands;
pub mod dispatcher;
pub mod document;
pub mod entity;
pub mod error;
pub mod lifetime;
pub mod manager;
pub mod observer;
pub mod resolution;
pub mod traits;

// Internal modules
mod internal;

// Re-export core types
pub use cancellation::CancellationToken;
pub use commands::DocumentCommand;
pub use dispatcher::{invoke, CurrentThreadDispatcher, DedicatedDispatcher, Dispatcher, Job, ThreadAffinity};
pub use document::{Document, DocumentId, DocumentRequest, DocumentState};
pub use entity::{DisposableEntity, EntityState, SubscriptionId};
pub use error::{DocError, DocResult};
pub use lifetime::{AsyncLifetime, Lifetime};
pub use manager::{ActiveDocumentChanged, DocumentManager, DocumentManagerBuilder, ManagerOptions, ManagerStats};
pub use observer::{LifecycleObserver, TracingObserver};
pub use resolution::{
    CandidateSource, CandidateUnit, ExclusionPolicy, Resolution, ResolutionOrigin, ResolutionStats,
    StaticCandidateSource, TypeResolutionCache, ViewDescriptor, ViewType, Visibility,
};
pub use traits::{AnyArc, AsyncDispose, ContainerHandle, Content, Dispose, HostAdapter, InitGate};
