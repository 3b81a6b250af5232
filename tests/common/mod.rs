//! Shared fakes for integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ferrous_docs::*;

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Host adapter that records every call as a string like `"attach:3"`.
pub struct RecordingHost {
    log: EventLog,
    next: AtomicU64,
    live: Mutex<HashSet<u64>>,
    create_delay: Mutex<Option<Duration>>,
    fail_detach: AtomicBool,
    fail_create: AtomicBool,
}

impl RecordingHost {
    pub fn new(log: EventLog) -> Arc<Self> {
        Arc::new(Self {
            log,
            next: AtomicU64::new(1),
            live: Mutex::new(HashSet::new()),
            create_delay: Mutex::new(None),
            fail_detach: AtomicBool::new(false),
            fail_create: AtomicBool::new(false),
        })
    }

    pub fn set_create_delay(&self, delay: Duration) {
        *self.create_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_fail_detach(&self, fail: bool) {
        self.fail_detach.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Containers created and not yet destroyed.
    pub fn live_containers(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    pub fn events(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Events mentioning `container`, in order.
    pub fn events_for(&self, container: ContainerHandle) -> Vec<String> {
        let suffix = format!(":{}", container.raw());
        self.events()
            .into_iter()
            .filter(|e| e.ends_with(&suffix) || e.contains(&format!("{suffix}:")))
            .collect()
    }

    pub fn clear_events(&self) {
        self.log.lock().unwrap().clear();
    }

    fn record(&self, event: String) {
        self.log.lock().unwrap().push(event);
    }
}

#[async_trait]
impl HostAdapter for RecordingHost {
    async fn create_container(&self, view: &ViewType) -> DocResult<ContainerHandle> {
        let delay = *self.create_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(DocError::Host("container factory offline".into()));
        }
        let raw = self.next.fetch_add(1, Ordering::SeqCst);
        self.live.lock().unwrap().insert(raw);
        self.record(format!("create:{}:{}", raw, view.name()));
        Ok(ContainerHandle::new(raw))
    }

    async fn bind_content(&self, container: ContainerHandle, _content: Arc<dyn Content>) -> DocResult<()> {
        self.record(format!("bind:{}", container.raw()));
        Ok(())
    }

    fn detach_content(&self, container: ContainerHandle) -> DocResult<()> {
        self.record(format!("detach_content:{}", container.raw()));
        Ok(())
    }

    fn attach(&self, container: ContainerHandle) -> DocResult<()> {
        self.record(format!("attach:{}", container.raw()));
        Ok(())
    }

    fn detach(&self, container: ContainerHandle) -> DocResult<()> {
        self.record(format!("detach:{}", container.raw()));
        if self.fail_detach.load(Ordering::SeqCst) {
            return Err(DocError::Host("detach refused".into()));
        }
        Ok(())
    }

    fn destroy(&self, container: ContainerHandle) -> DocResult<()> {
        self.live.lock().unwrap().remove(&container.raw());
        self.record(format!("destroy:{}", container.raw()));
        Ok(())
    }

    fn set_visible(&self, container: ContainerHandle, visible: bool) -> DocResult<()> {
        self.record(format!("visible:{}:{}", container.raw(), visible));
        Ok(())
    }

    fn activate(&self, container: ContainerHandle) -> DocResult<()> {
        self.record(format!("activate:{}", container.raw()));
        Ok(())
    }

    fn set_title(&self, container: ContainerHandle, title: &str) -> DocResult<()> {
        self.record(format!("title:{}:{}", container.raw(), title));
        Ok(())
    }
}

/// Content whose lifecycle answers are scripted by the test.
pub struct ScriptedContent {
    log: EventLog,
    pub veto: AtomicBool,
    pub fail_can_close: AtomicBool,
    pub init_runs: AtomicUsize,
    pub can_close_calls: AtomicUsize,
    pub disposed: AtomicUsize,
    pub parent: Mutex<Option<AnyArc>>,
    pub parameter: Mutex<Option<AnyArc>>,
    init_delay: Option<Duration>,
    close_delay: Option<Duration>,
    async_dispose: bool,
    title: Option<String>,
    init: InitGate,
}

impl ScriptedContent {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            veto: AtomicBool::new(false),
            fail_can_close: AtomicBool::new(false),
            init_runs: AtomicUsize::new(0),
            can_close_calls: AtomicUsize::new(0),
            disposed: AtomicUsize::new(0),
            parent: Mutex::new(None),
            parameter: Mutex::new(None),
            init_delay: None,
            close_delay: None,
            async_dispose: false,
            title: None,
            init: InitGate::new(),
        }
    }

    pub fn vetoing(self) -> Self {
        self.veto.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_close(self) -> Self {
        self.fail_can_close.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_async_dispose(mut self) -> Self {
        self.async_dispose = true;
        self
    }

    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = Some(delay);
        self
    }

    pub fn with_close_delay(mut self, delay: Duration) -> Self {
        self.close_delay = Some(delay);
        self
    }

    pub fn titled(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn disposed_count(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Content for ScriptedContent {
    fn title(&self) -> Option<String> {
        self.title.clone()
    }

    fn set_parent_context(&self, context: AnyArc) {
        *self.parent.lock().unwrap() = Some(context);
    }

    fn set_parameter(&self, parameter: AnyArc) {
        *self.parameter.lock().unwrap() = Some(parameter);
    }

    async fn initialize(&self, cancel: &CancellationToken) -> DocResult<()> {
        self.init
            .run(|| async {
                self.init_runs.fetch_add(1, Ordering::SeqCst);
                if let Some(delay) = self.init_delay {
                    tokio::time::sleep(delay).await;
                }
                cancel.throw_if_cancelled()
            })
            .await
    }

    async fn can_close(&self, _cancel: &CancellationToken) -> DocResult<bool> {
        self.can_close_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.close_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_can_close.load(Ordering::SeqCst) {
            return Err(DocError::Content("unsaved changes could not be checked".into()));
        }
        Ok(!self.veto.load(Ordering::SeqCst))
    }

    fn async_disposer(self: Arc<Self>) -> Option<Arc<dyn AsyncDispose>> {
        if self.async_dispose {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl AsyncDispose for ScriptedContent {
    async fn dispose(&self) -> DocResult<()> {
        self.disposed.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push("content_disposed".to_string());
        Ok(())
    }
}

/// Observer that records lifecycle events as strings.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl LifecycleObserver for RecordingObserver {
    fn document_created(&self, document: &Document) {
        self.push(format!("created:{}", document.container().raw()));
    }

    fn document_closed(&self, document: &Document) {
        self.push(format!("closed:{}", document.container().raw()));
    }

    fn close_vetoed(&self, document: &Document) {
        self.push(format!("vetoed:{}", document.container().raw()));
    }

    fn close_failed(&self, document: &Document, _error: &DocError) {
        self.push(format!("close_failed:{}", document.container().raw()));
    }

    fn teardown_failed(&self, document: Option<&Document>, error: &DocError) {
        let target = document.map(|d| d.container().raw().to_string()).unwrap_or_else(|| "creation".into());
        self.push(format!("teardown_failed:{}:{}", target, error.failures().len()));
    }

    fn resolution_fallback(&self, name: &str, view: &ViewType) {
        self.push(format!("fallback:{}:{}", name, view.name()));
    }

    fn active_changed(&self, _old: Option<&Document>, new: Option<&Document>) {
        let target = new.map(|d| d.container().raw().to_string()).unwrap_or_else(|| "none".into());
        self.push(format!("active:{target}"));
    }
}

/// Candidate source with the views used across tests.
pub fn views() -> Arc<StaticCandidateSource> {
    Arc::new(StaticCandidateSource::with_units(vec![CandidateUnit::new(
        "app",
        vec![
            ViewType::new("app::views", "EditorView"),
            ViewType::new("app::views", "ReportView"),
        ],
    )]))
}

pub struct Fixture {
    pub log: EventLog,
    pub host: Arc<RecordingHost>,
    pub observer: Arc<RecordingObserver>,
    pub manager: DocumentManager,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_options(ManagerOptions::default())
    }

    pub fn with_options(options: ManagerOptions) -> Self {
        let log = event_log();
        let host = RecordingHost::new(log.clone());
        let observer = RecordingObserver::new();
        let manager = DocumentManager::builder(host.clone())
            .resolver(Arc::new(TypeResolutionCache::new(views())))
            .observer(observer.clone())
            .options(options)
            .build();
        Self {
            log,
            host,
            observer,
            manager,
        }
    }

    pub fn content(&self) -> ScriptedContent {
        ScriptedContent::new(self.log.clone())
    }

    pub async fn open(&self, id: &str) -> Document {
        self.open_with(id, self.content().build()).await
    }

    pub async fn open_with(&self, id: &str, content: Arc<ScriptedContent>) -> Document {
        self.manager
            .create_document(
                DocumentRequest::new("EditorView", content).with_id(id),
                &CancellationToken::new(),
            )
            .await
            .expect("document creation")
    }
}
