/// Property-based tests for teardown ledgers
///
/// Whatever mix of brackets succeeds or fails, the ledger must release exactly
/// the successful acquisitions, most recent first, and report every failing
/// release.
use ferrous_docs::{AsyncLifetime, DocError, Lifetime};
use proptest::prelude::*;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy)]
struct Step {
    acquire_fails: bool,
    release_fails: bool,
}

fn steps() -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec(
        (any::<bool>(), any::<bool>()).prop_map(|(acquire_fails, release_fails)| Step {
            acquire_fails,
            release_fails,
        }),
        0..24,
    )
}

proptest! {
    #[test]
    fn releases_mirror_successful_acquires(steps in steps()) {
        let released = Arc::new(Mutex::new(Vec::new()));
        let lifetime = Lifetime::new();
        let mut acquired = Vec::new();

        for (index, step) in steps.iter().copied().enumerate() {
            let released = released.clone();
            let result = lifetime.add_bracket(
                move || if step.acquire_fails {
                    Err(DocError::Host(format!("acquire {index}")))
                } else {
                    Ok(index)
                },
                move |index| {
                    released.lock().unwrap().push(index);
                    if step.release_fails {
                        Err(DocError::Host(format!("release {index}")))
                    } else {
                        Ok(())
                    }
                },
            );
            prop_assert_eq!(result.is_ok(), !step.acquire_fails);
            if result.is_ok() {
                acquired.push(index);
            }
        }
        prop_assert_eq!(lifetime.len(), acquired.len());

        let expected_failures = steps
            .iter()
            .filter(|s| !s.acquire_fails && s.release_fails)
            .count();
        match lifetime.dispose() {
            Ok(()) => prop_assert_eq!(expected_failures, 0),
            Err(err) => prop_assert_eq!(err.failures().len(), expected_failures),
        }

        acquired.reverse();
        prop_assert_eq!(&*released.lock().unwrap(), &acquired);
        prop_assert!(lifetime.dispose().is_ok());
    }
}

proptest! {
    #[test]
    fn nested_async_ledgers_unwind_depth_first(sizes in prop::collection::vec(0usize..5, 1..6)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let order = Arc::new(Mutex::new(Vec::new()));
        let root = AsyncLifetime::new();
        let mut expected = Vec::new();

        for (child_index, size) in sizes.iter().copied().enumerate() {
            let child = AsyncLifetime::new();
            let mut registered = Vec::new();
            for unit in 0..size {
                let order = order.clone();
                let label = format!("{child_index}.{unit}");
                registered.push(label.clone());
                child
                    .add_async(move || async move {
                        order.lock().unwrap().push(label);
                        Ok(())
                    })
                    .unwrap();
            }
            runtime.block_on(root.add_async_child(child)).unwrap();
            registered.reverse();
            expected.push(registered);
        }
        expected.reverse();
        let expected: Vec<String> = expected.into_iter().flatten().collect();

        runtime.block_on(root.dispose()).unwrap();
        prop_assert_eq!(&*order.lock().unwrap(), &expected);
    }
}
