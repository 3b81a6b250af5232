//! Internal disposal bag shared by the sync and async ledgers.

use futures::future::BoxFuture;

use crate::error::DocResult;

/// Future type for asynchronous release actions.
pub(crate) type BoxFutureResult = BoxFuture<'static, DocResult<()>>;

/// Disposal phase of a ledger. Monotonic: never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Open,
    Disposing,
    Disposed,
}

/// Ordered container of teardown units with LIFO execution order.
///
/// The bag only tracks ordering and phase; running the units is left to the
/// owning ledger so the same bookkeeping serves sync and async unwinds.
pub(crate) struct DisposeBag<E> {
    entries: Vec<E>,
    phase: Phase,
}

impl<E> Default for DisposeBag<E> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            phase: Phase::Open,
        }
    }
}

impl<E> DisposeBag<E> {
    /// Appends a unit. Hands the unit back if disposal already started.
    pub(crate) fn push(&mut self, entry: E) -> Result<(), E> {
        if self.phase != Phase::Open {
            return Err(entry);
        }
        self.entries.push(entry);
        Ok(())
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn is_open(&self) -> bool {
        self.phase == Phase::Open
    }

    /// Closes the bag and hands out its units in execution (LIFO) order.
    ///
    /// Returns `None` when another caller already started the unwind.
    pub(crate) fn begin_dispose(&mut self) -> Option<Vec<E>> {
        if self.phase != Phase::Open {
            return None;
        }
        self.phase = Phase::Disposing;
        let mut entries = std::mem::take(&mut self.entries);
        entries.reverse();
        Some(entries)
    }

    pub(crate) fn finish_dispose(&mut self) {
        self.phase = Phase::Disposed;
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the bag is empty (no units registered).
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
