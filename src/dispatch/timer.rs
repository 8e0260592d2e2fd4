// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cancellable waits.

use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The full duration elapsed.
    Completed,
    /// The timer was cancelled first.
    Cancelled,
}

impl WaitOutcome {
    /// Returns true if the wait was cancelled.
    #[must_use]
    pub const fn is_cancelled(self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[derive(Debug, Default)]
struct Slot {
    next_seq: u64,
    pending: Option<(u64, CancellationToken)>,
}

/// A pending wait registered with [`CancellableTimer::arm`].
///
/// The wait can be driven later, for example from a spawned task, without
/// racing a cancellation issued in between.
#[derive(Debug)]
pub struct ArmedWait {
    seq: u64,
    token: CancellationToken,
}

impl ArmedWait {
    /// Sleeps for `duration` unless the timer is cancelled or re-armed first.
    pub async fn sleep(&self, duration: Duration) -> WaitOutcome {
        tokio::select! {
            biased;
            () = self.token.cancelled() => WaitOutcome::Cancelled,
            () = tokio::time::sleep(duration) => WaitOutcome::Completed,
        }
    }
}

/// A timer slot holding at most one pending wait.
///
/// Arming the slot cancels whatever wait was pending in it, so the latest
/// wait always wins. Cancelling an idle slot does nothing.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use telldus_bridge::dispatch::{CancellableTimer, WaitOutcome};
///
/// # #[tokio::main]
/// # async fn main() {
/// let timer = CancellableTimer::new();
/// timer.cancel(); // no-op
///
/// assert_eq!(timer.wait(Duration::from_millis(1)).await, WaitOutcome::Completed);
/// # }
/// ```
#[derive(Debug, Default)]
pub struct CancellableTimer {
    slot: Mutex<Slot>,
}

impl CancellableTimer {
    /// Creates an idle timer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new pending wait, cancelling the one already pending.
    #[must_use]
    pub fn arm(&self) -> ArmedWait {
        let token = CancellationToken::new();
        let mut slot = self.slot.lock();
        slot.next_seq += 1;
        let seq = slot.next_seq;
        if let Some((_, previous)) = slot.pending.replace((seq, token.clone())) {
            previous.cancel();
        }
        ArmedWait { seq, token }
    }

    /// Cancels the pending wait, if any.
    pub fn cancel(&self) {
        if let Some((_, token)) = self.slot.lock().pending.take() {
            token.cancel();
        }
    }

    /// Returns true while a wait is pending.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.slot.lock().pending.is_some()
    }

    /// Arms the timer and waits for `duration` or cancellation.
    pub async fn wait(&self, duration: Duration) -> WaitOutcome {
        let armed = self.arm();
        let outcome = armed.sleep(duration).await;
        self.disarm(&armed);
        outcome
    }

    /// Clears the slot if it still holds `armed`.
    pub fn disarm(&self, armed: &ArmedWait) {
        let mut slot = self.slot.lock();
        if slot.pending.as_ref().is_some_and(|(seq, _)| *seq == armed.seq) {
            slot.pending = None;
        }
    }
}
