//! Internal implementation details.

pub(crate) mod dispose_bag;
pub(crate) mod panic;

pub(crate) use dispose_bag::{BoxFutureResult, DisposeBag, Phase};
pub(crate) use panic::{catch_release, catch_release_async};
