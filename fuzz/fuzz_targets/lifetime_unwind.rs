#![no_main]

use ferrous_docs::{DocError, Lifetime};
use libfuzzer_sys::fuzz_target;
use std::sync::{Arc, Mutex};

fuzz_target!(|data: &[u8]| {
    let released = Arc::new(Mutex::new(Vec::new()));
    let root = Lifetime::new();
    let mut child = Some(Lifetime::new());
    let mut expected_failures = 0usize;

    for (index, byte) in data.iter().copied().enumerate().take(64) {
        let target = match (byte >> 4) % 2 {
            0 => &root,
            _ => match child.as_ref() {
                Some(child) => child,
                None => &root,
            },
        };
        match byte % 4 {
            0 => {
                let released = released.clone();
                let _ = target.add(move || {
                    released.lock().unwrap().push(index);
                    Ok(())
                });
            }
            1 => {
                if target.add(|| Err(DocError::Host("release".into()))).is_ok() {
                    expected_failures += 1;
                }
            }
            2 => {
                let _ = target.add_bracket(|| Err::<(), _>(DocError::Host("acquire".into())), |()| Ok(()));
            }
            _ => {
                if let Some(child) = child.take() {
                    let _ = root.add_child(child);
                }
            }
        }
    }

    // A child never attached is disposed on its own.
    if let Some(child) = child.take() {
        let _ = child.dispose();
    }

    let failures = match root.dispose() {
        Ok(()) => 0,
        Err(err) => err.failures().len(),
    };
    assert!(failures <= expected_failures);
    assert!(root.dispose().is_ok());
    assert!(root.add(|| Ok(())).is_err());

    let released = released.lock().unwrap();
    let mut deduped = released.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(deduped.len(), released.len());
});
