//! Reader/writer access gate
//!
//! Coordinates agents mutating the tree against exports and saves:
//!
//! - Writers register as *pending* before they suspend, then take the single
//!   write permit. While any writer is pending, new readers wait.
//! - Readers may run concurrently with each other. A reader that already
//!   started is not interrupted by a writer arriving later.
//! - `save` combines both: it waits for writes to settle, becomes a writer,
//!   then waits for active readers to drain.
//!
//! Counters live under a synchronous mutex that is never held across an
//! `.await`; waiting is done on [`Notify`] signals. Both guards undo their
//! registration in `Drop`, so a cancelled or failed operation cannot leave
//! the gate blocked.

use parking_lot::Mutex;
use std::pin::pin;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard, Notify};

#[derive(Debug, Default)]
struct GateState {
    pending_writers: usize,
    active_readers: usize,
}

/// Reader/writer coordination for one biography
#[derive(Debug, Default)]
pub struct AccessGate {
    state: Mutex<GateState>,
    write_permit: AsyncMutex<()>,
    writes_settled: Notify,
    readers_drained: Notify,
}

impl AccessGate {
    /// Create an idle gate
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register as a pending writer, then wait for the exclusive permit.
    ///
    /// Registration happens before the first suspension point, so readers
    /// arriving while this call waits are already held back.
    pub async fn write(&self) -> WriteGuard<'_> {
        let pending = self.register_writer();
        let permit = self.write_permit.lock().await;
        WriteGuard {
            _permit: permit,
            _pending: pending,
        }
    }

    /// Wait until no writer is pending, then join the active readers.
    pub async fn read(&self) -> ReadGuard<'_> {
        loop {
            let mut notified = pin!(self.writes_settled.notified());
            notified.as_mut().enable();
            {
                let mut state = self.state.lock();
                if state.pending_writers == 0 {
                    state.active_readers += 1;
                    return ReadGuard { gate: self };
                }
            }
            notified.await;
        }
    }

    /// Wait until no writer is pending.
    pub async fn settled(&self) {
        loop {
            let mut notified = pin!(self.writes_settled.notified());
            notified.as_mut().enable();
            if self.state.lock().pending_writers == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Wait until no reader is active.
    pub async fn readers_drained(&self) {
        loop {
            let mut notified = pin!(self.readers_drained.notified());
            notified.as_mut().enable();
            if self.state.lock().active_readers == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Writers registered and not yet finished
    #[inline]
    #[must_use]
    pub fn pending_writers(&self) -> usize {
        self.state.lock().pending_writers
    }

    /// Readers currently inside a read
    #[inline]
    #[must_use]
    pub fn active_readers(&self) -> usize {
        self.state.lock().active_readers
    }

    fn register_writer(&self) -> PendingWriter<'_> {
        self.state.lock().pending_writers += 1;
        PendingWriter { gate: self }
    }
}

/// Pending-writer registration; released on drop
#[derive(Debug)]
struct PendingWriter<'a> {
    gate: &'a AccessGate,
}

impl Drop for PendingWriter<'_> {
    fn drop(&mut self) {
        let settled = {
            let mut state = self.gate.state.lock();
            state.pending_writers -= 1;
            state.pending_writers == 0
        };
        if settled {
            self.gate.writes_settled.notify_waiters();
        }
    }
}

/// Exclusive write access
///
/// Field order matters: the permit is released before the pending count
/// drops, so woken readers never race a writer still holding the permit.
#[derive(Debug)]
pub struct WriteGuard<'a> {
    _permit: AsyncMutexGuard<'a, ()>,
    _pending: PendingWriter<'a>,
}

/// Shared read access
#[derive(Debug)]
pub struct ReadGuard<'a> {
    gate: &'a AccessGate,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        let drained = {
            let mut state = self.gate.state.lock();
            state.active_readers -= 1;
            state.active_readers == 0
        };
        if drained {
            self.gate.readers_drained.notify_waiters();
        }
    }
}
