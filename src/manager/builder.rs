use std::sync::Arc;

use super::{DocumentManager, FallbackView, ManagerInner, ManagerOptions};
use crate::dispatcher::{CurrentThreadDispatcher, Dispatcher};
use crate::observer::{LifecycleObserver, Observers};
use crate::resolution::{TypeResolutionCache, ViewType};
use crate::traits::HostAdapter;

/// Builder for [`DocumentManager`].
///
/// Only the host adapter is required. Defaults: an empty resolution cache,
/// a [`CurrentThreadDispatcher`] bound to the thread calling
/// [`build`](Self::build), no fallback view, no observers, default options.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use ferrous_docs::{
///     DocumentManager, HostAdapter, ManagerOptions, TracingObserver, TypeResolutionCache, ViewType,
/// };
///
/// # fn example(host: Arc<dyn HostAdapter>) {
/// let manager = DocumentManager::builder(host)
///     .resolver(Arc::new(TypeResolutionCache::empty()))
///     .fallback_view(|_name| ViewType::new("app::views", "MissingView"))
///     .observer(Arc::new(TracingObserver::new()))
///     .options(ManagerOptions { show_on_create: false, ..Default::default() })
///     .build();
/// # }
/// ```
pub struct DocumentManagerBuilder {
    host: Arc<dyn HostAdapter>,
    resolver: Option<Arc<TypeResolutionCache>>,
    dispatcher: Option<Arc<dyn Dispatcher>>,
    fallback_view: Option<FallbackView>,
    observers: Observers,
    options: ManagerOptions,
}

impl DocumentManagerBuilder {
    pub(crate) fn new(host: Arc<dyn HostAdapter>) -> Self {
        Self {
            host,
            resolver: None,
            dispatcher: None,
            fallback_view: None,
            observers: Observers::default(),
            options: ManagerOptions::default(),
        }
    }

    pub fn resolver(mut self, resolver: Arc<TypeResolutionCache>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Thread-affinity service owning the manager and its documents.
    pub fn dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// View constructor used when a name resolves to nothing.
    pub fn fallback_view<F>(mut self, fallback: F) -> Self
    where
        F: Fn(&str) -> ViewType + Send + Sync + 'static,
    {
        self.fallback_view = Some(Arc::new(fallback));
        self
    }

    pub fn observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observers.add(observer);
        self
    }

    pub fn options(mut self, options: ManagerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> DocumentManager {
        let resolver = self
            .resolver
            .unwrap_or_else(|| Arc::new(TypeResolutionCache::empty()));
        let dispatcher = self
            .dispatcher
            .unwrap_or_else(|| Arc::new(CurrentThreadDispatcher::new()));
        DocumentManager::from_inner(Arc::new(ManagerInner::new(
            self.host,
            resolver,
            dispatcher,
            self.fallback_view,
            self.observers,
            self.options,
        )))
    }
}
