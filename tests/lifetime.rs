use ferrous_docs::{AsyncDispose, AsyncLifetime, DocError, DocResult, Dispose, Lifetime};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Log = Arc<Mutex<Vec<String>>>;

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn push(log: &Log, entry: &str) {
    log.lock().unwrap().push(entry.to_string());
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[test]
fn test_brackets_release_in_reverse_order() {
    let order = log();
    let lifetime = Lifetime::new();

    for name in ["B1", "B2", "B3"] {
        let order = order.clone();
        lifetime
            .add_bracket(|| Ok(name), move |name| {
                push(&order, name);
                Ok(())
            })
            .unwrap();
    }

    lifetime.dispose().unwrap();
    assert_eq!(entries(&order), vec!["B3", "B2", "B1"]);
}

#[test]
fn test_failed_acquire_registers_nothing() {
    let order = log();
    let lifetime = Lifetime::new();

    let o = order.clone();
    lifetime
        .add_bracket(|| Ok("B1"), move |name| {
            push(&o, name);
            Ok(())
        })
        .unwrap();

    let o = order.clone();
    let failed = lifetime.add_bracket(
        || -> DocResult<&'static str> { Err(DocError::Host("acquire failed".into())) },
        move |name| {
            push(&o, name);
            Ok(())
        },
    );
    assert!(matches!(failed, Err(DocError::Host(_))));
    assert_eq!(lifetime.len(), 1);

    lifetime.dispose().unwrap();
    assert_eq!(entries(&order), vec!["B1"]);
}

#[test]
fn test_acquire_runs_immediately() {
    let acquired = Arc::new(AtomicUsize::new(0));
    let lifetime = Lifetime::new();
    let a = acquired.clone();
    lifetime
        .add_bracket(
            move || {
                a.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            |()| Ok(()),
        )
        .unwrap();
    assert_eq!(acquired.load(Ordering::SeqCst), 1);
    lifetime.dispose().unwrap();
}

#[test]
fn test_failures_are_aggregated_and_unwind_continues() {
    let order = log();
    let lifetime = Lifetime::new();

    let o = order.clone();
    lifetime.add(move || { push(&o, "first"); Ok(()) }).unwrap();
    lifetime.add(|| Err(DocError::Host("detach failed".into()))).unwrap();
    let o = order.clone();
    lifetime.add(move || { push(&o, "third"); Ok(()) }).unwrap();
    lifetime.add(|| Err(DocError::Content("flush failed".into()))).unwrap();

    let err = lifetime.dispose().unwrap_err();
    match &err {
        DocError::Teardown(failures) => {
            assert_eq!(failures.len(), 2);
            // Most recent failure first, matching the unwind order.
            assert!(matches!(failures[0], DocError::Content(_)));
            assert!(matches!(failures[1], DocError::Host(_)));
        }
        other => panic!("expected aggregate, got {other:?}"),
    }
    assert_eq!(entries(&order), vec!["third", "first"]);
    assert!(lifetime.is_disposed());
}

#[test]
fn test_panicking_release_is_captured() {
    let ran = Arc::new(AtomicUsize::new(0));
    let lifetime = Lifetime::new();
    let r = ran.clone();
    lifetime.add(move || { r.fetch_add(1, Ordering::SeqCst); Ok(()) }).unwrap();
    lifetime.add(|| panic!("release exploded")).unwrap();

    let err = lifetime.dispose().unwrap_err();
    assert!(matches!(err.failures()[0], DocError::Panicked(msg) if msg == "release exploded"));
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn test_dispose_is_idempotent() {
    let runs = Arc::new(AtomicUsize::new(0));
    let lifetime = Lifetime::new();
    let r = runs.clone();
    lifetime.add(move || { r.fetch_add(1, Ordering::SeqCst); Ok(()) }).unwrap();

    for _ in 0..5 {
        lifetime.dispose().unwrap();
    }
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(lifetime.is_empty());
}

#[test]
fn test_registration_after_dispose_is_rejected() {
    let lifetime = Lifetime::new();
    lifetime.dispose().unwrap();
    assert!(matches!(lifetime.add(|| Ok(())), Err(DocError::LifetimeClosed)));
    assert!(matches!(
        lifetime.add_bracket(|| Ok(()), |()| Ok(())),
        Err(DocError::LifetimeClosed)
    ));
}

#[test]
fn test_child_lifetime_disposed_at_its_position() {
    let order = log();
    let parent = Lifetime::new();
    let child = Lifetime::new();

    let o = order.clone();
    parent.add(move || { push(&o, "parent-first"); Ok(()) }).unwrap();
    let o = order.clone();
    child.add(move || { push(&o, "child-a"); Ok(()) }).unwrap();
    let o = order.clone();
    child.add(move || { push(&o, "child-b"); Ok(()) }).unwrap();
    parent.add_child(child).unwrap();
    let o = order.clone();
    parent.add(move || { push(&o, "parent-last"); Ok(()) }).unwrap();

    parent.dispose().unwrap();
    assert_eq!(entries(&order), vec!["parent-last", "child-b", "child-a", "parent-first"]);
}

#[test]
fn test_child_offered_to_closed_parent_is_disposed() {
    let parent = Lifetime::new();
    parent.dispose().unwrap();

    let ran = Arc::new(AtomicUsize::new(0));
    let child = Lifetime::new();
    let r = ran.clone();
    child.add(move || { r.fetch_add(1, Ordering::SeqCst); Ok(()) }).unwrap();

    assert!(matches!(parent.add_child(child), Err(DocError::LifetimeClosed)));
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_async_child_offered_to_closed_parent_is_disposed() {
    let parent = AsyncLifetime::new();
    parent.dispose().await.unwrap();

    let order = log();
    let child = AsyncLifetime::new();
    let o = order.clone();
    child.add(move || { push(&o, "sync"); Ok(()) }).unwrap();
    let o = order.clone();
    child
        .add_async(move || async move {
            push(&o, "async");
            Ok(())
        })
        .unwrap();

    let result = parent.add_async_child(child).await;
    assert!(matches!(result, Err(DocError::LifetimeClosed)));
    assert_eq!(entries(&order), vec!["async", "sync"]);
}

struct Handle {
    name: &'static str,
    order: Log,
}

impl Dispose for Handle {
    fn dispose(&self) -> DocResult<()> {
        push(&self.order, self.name);
        Ok(())
    }
}

#[async_trait]
impl AsyncDispose for Handle {
    async fn dispose(&self) -> DocResult<()> {
        tokio::task::yield_now().await;
        push(&self.order, &format!("async-{}", self.name));
        Ok(())
    }
}

#[tokio::test]
async fn test_async_lifetime_orders_sync_and_async_units_together() {
    let order = log();
    let lifetime = AsyncLifetime::new();

    let o = order.clone();
    lifetime
        .add_async(move || async move {
            tokio::task::yield_now().await;
            push(&o, "async-1");
            Ok(())
        })
        .unwrap();
    let o = order.clone();
    lifetime.add(move || { push(&o, "sync-2"); Ok(()) }).unwrap();
    lifetime
        .add_async_disposable(Arc::new(Handle { name: "3", order: order.clone() }))
        .unwrap();
    lifetime
        .add_disposable(Arc::new(Handle { name: "sync-4", order: order.clone() }))
        .unwrap();

    lifetime.dispose().await.unwrap();
    assert_eq!(entries(&order), vec!["sync-4", "async-3", "sync-2", "async-1"]);
}

#[tokio::test]
async fn test_async_bracket_hands_value_to_release() {
    let order = log();
    let lifetime = AsyncLifetime::new();

    let o = order.clone();
    let value = lifetime
        .add_async_bracket(async { Ok(String::from("container-7")) }, move |value| async move {
            push(&o, &value);
            Ok(())
        })
        .await
        .unwrap();
    assert_eq!(value, "container-7");

    lifetime.dispose().await.unwrap();
    assert_eq!(entries(&order), vec!["container-7"]);
}

#[tokio::test]
async fn test_async_bracket_closed_during_acquire_releases_immediately() {
    let order = log();
    let lifetime = Arc::new(AsyncLifetime::new());

    let closer = lifetime.clone();
    let o = order.clone();
    let result = lifetime
        .add_async_bracket(
            async move {
                closer.dispose().await?;
                Ok(1u32)
            },
            move |_| async move {
                push(&o, "released");
                Ok(())
            },
        )
        .await;

    assert!(matches!(result, Err(DocError::LifetimeClosed)));
    assert_eq!(entries(&order), vec!["released"]);
}

#[tokio::test]
async fn test_nested_async_children_unwind_depth_first() {
    let order = log();
    let root = AsyncLifetime::new();
    let middle = AsyncLifetime::new();
    let leaf = Lifetime::new();

    let o = order.clone();
    leaf.add(move || { push(&o, "leaf"); Ok(()) }).unwrap();
    let o = order.clone();
    middle.add(move || { push(&o, "middle-before-leaf"); Ok(()) }).unwrap();
    middle.add_lifetime(leaf).unwrap();
    let o = order.clone();
    root.add(move || { push(&o, "root"); Ok(()) }).unwrap();
    root.add_async_child(middle).await.unwrap();

    root.dispose().await.unwrap();
    assert_eq!(entries(&order), vec!["leaf", "middle-before-leaf", "root"]);
}

#[tokio::test]
async fn test_child_failures_flatten_into_parent_aggregate() {
    let root = AsyncLifetime::new();
    let child = AsyncLifetime::new();
    child.add(|| Err(DocError::Host("a".into()))).unwrap();
    child.add_async(|| async { Err(DocError::Host("b".into())) }).unwrap();
    root.add(|| Err(DocError::Content("c".into()))).unwrap();
    root.add_async_child(child).await.unwrap();

    let err = root.dispose().await.unwrap_err();
    assert_eq!(err.failures().len(), 3);
}

#[tokio::test]
async fn test_concurrent_async_dispose_runs_units_once() {
    let runs = Arc::new(AtomicUsize::new(0));
    let lifetime = AsyncLifetime::new();
    let r = runs.clone();
    lifetime
        .add_async(move || async move {
            tokio::task::yield_now().await;
            r.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    let (a, b) = tokio::join!(lifetime.dispose(), lifetime.dispose());
    a.unwrap();
    b.unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(lifetime.is_disposed());
}

#[tokio::test]
#[allow(unreachable_code)]
async fn test_async_panic_is_captured() {
    let lifetime = AsyncLifetime::new();
    lifetime
        .add_async(|| async {
            panic!("async release exploded");
            Ok(())
        })
        .unwrap();
    let err = lifetime.dispose().await.unwrap_err();
    assert!(matches!(err.failures()[0], DocError::Panicked(_)));
}
