use ferrous_docs::{DisposableEntity, DocError, EntityState, ThreadAffinity};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn entity(label: &str) -> Arc<DisposableEntity> {
    Arc::new(DisposableEntity::new(label, ThreadAffinity::current()))
}

#[tokio::test]
async fn test_dispose_n_times_runs_teardown_once() {
    let entity = entity("editor");
    let runs = Arc::new(AtomicUsize::new(0));
    let r = runs.clone();
    entity
        .lifetime()
        .add(move || {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    let mut ran_teardown = 0;
    for _ in 0..4 {
        if entity.try_dispose().await.unwrap() {
            ran_teardown += 1;
        }
    }
    assert_eq!(ran_teardown, 1);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(entity.state(), EntityState::Disposed);
}

#[tokio::test]
async fn test_disposing_handlers_run_before_lifetime() {
    let entity = entity("editor");
    let order = Arc::new(Mutex::new(Vec::new()));

    let o = order.clone();
    entity
        .lifetime()
        .add(move || {
            o.lock().unwrap().push("lifetime");
            Ok(())
        })
        .unwrap();

    let o = order.clone();
    let observed = entity.clone();
    entity.on_disposing(move || {
        let o = o.clone();
        let observed = observed.clone();
        async move {
            assert_eq!(observed.state(), EntityState::Disposing);
            // Strict guard still passes, broad guard already fails.
            assert!(observed.ensure_not_disposed().is_ok());
            assert!(matches!(observed.ensure_alive(), Err(DocError::AlreadyDisposed(_))));
            o.lock().unwrap().push("handler");
            Ok(())
        }
    });

    entity.dispose().await.unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["handler", "lifetime"]);
}

#[tokio::test]
async fn test_nested_dispose_from_handler_is_noop() {
    let entity = entity("editor");
    let inner = entity.clone();
    entity.on_disposing(move || {
        let inner = inner.clone();
        async move {
            assert!(!inner.try_dispose().await?);
            Ok(())
        }
    });
    assert!(entity.try_dispose().await.unwrap());
}

#[tokio::test]
async fn test_handler_failure_is_aggregated_and_disposal_completes() {
    let entity = entity("editor");
    let released = Arc::new(AtomicUsize::new(0));
    let r = released.clone();
    entity
        .lifetime()
        .add(move || {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    entity.on_disposing(|| async { Err(DocError::Content("autosave failed".into())) });

    let err = entity.dispose().await.unwrap_err();
    assert!(matches!(err, DocError::Teardown(ref failures) if failures.len() == 1));
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert!(entity.is_disposed());
}

#[tokio::test]
async fn test_concurrent_dispose_second_caller_returns_immediately() {
    let entity = entity("editor");
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
    entity
        .lifetime()
        .add_async(move || async move {
            let _ = release_rx.await;
            Ok(())
        })
        .unwrap();

    let first = {
        let entity = entity.clone();
        tokio::spawn(async move { entity.try_dispose().await })
    };
    tokio::task::yield_now().await;
    assert_eq!(entity.state(), EntityState::Disposing);

    // Second call observes Disposing and does not wait.
    assert!(!entity.try_dispose().await.unwrap());
    assert_eq!(entity.state(), EntityState::Disposing);

    release_tx.send(()).unwrap();
    entity.wait_disposed().await;
    assert!(first.await.unwrap().unwrap());
    assert_eq!(entity.state(), EntityState::Disposed);
}

#[tokio::test]
async fn test_wait_disposed_after_completion_returns() {
    let entity = entity("editor");
    entity.dispose().await.unwrap();
    entity.wait_disposed().await;
}

#[test]
fn test_dispose_from_foreign_thread_is_rejected() {
    let entity = entity("editor");
    let remote = entity.clone();
    let result = std::thread::spawn(move || futures::executor::block_on(remote.dispose()))
        .join()
        .unwrap();
    assert!(matches!(result, Err(DocError::ThreadAffinity { .. })));
    assert_eq!(entity.state(), EntityState::NotDisposed);
}
