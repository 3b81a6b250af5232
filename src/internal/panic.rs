//! Panic capture for release actions.
//!
//! A panicking release must not abort the rest of an unwind, so every
//! release runs inside `catch_unwind` and a panic becomes
//! [`DocError::Panicked`](crate::DocError::Panicked).

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;

use super::BoxFutureResult;
use crate::error::{DocError, DocResult};

/// Runs a synchronous release, converting a panic into an error.
pub(crate) fn catch_release<F>(f: F) -> DocResult<()>
where
    F: FnOnce() -> DocResult<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(DocError::Panicked(panic_message(payload.as_ref()))),
    }
}

/// Awaits an asynchronous release, converting a panic into an error.
pub(crate) async fn catch_release_async(fut: BoxFutureResult) -> DocResult<()> {
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(DocError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
