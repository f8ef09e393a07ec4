//! Single-use result handoff between a delivering thread and a waiting caller.
//!
//! The signalling half is consumed by `signal`, so a waiter can be signalled at
//! most once by construction.

use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Outcome of waiting on a [`ResultWaiter`].
#[derive(Debug, PartialEq, Eq)]
pub enum WaitOutcome<T> {
    /// A result was delivered within the bound.
    Ready(T),
    /// The bound elapsed first.
    TimedOut,
    /// The signalling half was dropped without delivering (table cleared).
    Cancelled,
}

/// Signalling half, owned by the pending request table.
#[derive(Debug)]
pub struct WaiterHandle<T> {
    sender: oneshot::Sender<T>,
}

impl<T> WaiterHandle<T> {
    /// Deliver `value` to the waiter.
    ///
    /// Returns the value back if the waiting side is already gone.
    pub fn signal(self, value: T) -> Result<(), T> {
        self.sender.send(value)
    }

    /// True if the waiting side has been dropped.
    pub fn is_abandoned(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Waiting half, owned by the calling task.
#[derive(Debug)]
pub struct ResultWaiter<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T> ResultWaiter<T> {
    /// Wait up to `timeout` for the result.
    pub async fn wait(self, timeout: Duration) -> WaitOutcome<T> {
        match tokio::time::timeout(timeout, self.receiver).await {
            Ok(Ok(value)) => WaitOutcome::Ready(value),
            Ok(Err(_)) => WaitOutcome::Cancelled,
            Err(_) => WaitOutcome::TimedOut,
        }
    }

    /// Wait until `deadline` for the result.
    pub async fn wait_until(self, deadline: Instant) -> WaitOutcome<T> {
        match tokio::time::timeout_at(deadline, self.receiver).await {
            Ok(Ok(value)) => WaitOutcome::Ready(value),
            Ok(Err(_)) => WaitOutcome::Cancelled,
            Err(_) => WaitOutcome::TimedOut,
        }
    }
}

/// Create a connected handle/waiter pair.
pub fn result_waiter<T>() -> (WaiterHandle<T>, ResultWaiter<T>) {
    let (sender, receiver) = oneshot::channel();
    (WaiterHandle { sender }, ResultWaiter { receiver })
}
