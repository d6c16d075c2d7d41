// Admission gate - bounded in-flight calls with explicit FIFO hand-off
// Author: kelexine (https://github.com/kelexine)

use crate::error::{ClientError, Result};
use crate::metrics;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

/// Snapshot of gate occupancy.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GateStatus {
    pub capacity: usize,
    pub in_use: usize,
    pub available: usize,
    pub waiting: usize,
    /// Highest `in_use` observed since creation.
    pub peak_in_use: usize,
    pub total_granted: u64,
    pub closed: bool,
}

struct GateState {
    in_use: usize,
    waiters: VecDeque<oneshot::Sender<()>>,
    closed: bool,
    peak_in_use: usize,
    total_granted: u64,
}

struct GateInner {
    capacity: usize,
    state: Mutex<GateState>,
}

impl GateInner {
    /// Return one unit of capacity, handing it straight to the oldest live waiter.
    fn release_slot(&self) {
        let mut state = self.state.lock();
        while let Some(waiter) = state.waiters.pop_front() {
            if waiter.send(()).is_ok() {
                // Slot changes owner, in_use is unchanged
                state.total_granted += 1;
                metrics::update_admission(state.in_use, live_waiters(&state.waiters));
                return;
            }
        }
        state.in_use = state.in_use.saturating_sub(1);
        metrics::update_admission(state.in_use, state.waiters.len());
    }
}

fn live_waiters(waiters: &VecDeque<oneshot::Sender<()>>) -> usize {
    waiters.iter().filter(|tx| !tx.is_closed()).count()
}

/// Counting semaphore bounding concurrent transport calls.
///
/// Callers that find the gate full are queued and resumed strictly in arrival
/// order. Capacity is released when the returned [`Permit`] is dropped, so
/// every exit path (success, error, timeout, abandoned stream) gives it back.
#[derive(Clone)]
pub struct AdmissionGate {
    inner: Arc<GateInner>,
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Arc::new(GateInner {
                capacity,
                state: Mutex::new(GateState {
                    in_use: 0,
                    waiters: VecDeque::new(),
                    closed: false,
                    peak_in_use: 0,
                    total_granted: 0,
                }),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Acquire a permit, suspending until capacity is available.
    ///
    /// Fails with [`ClientError::ClientDestroyed`] if the gate is closed before
    /// or while waiting.
    pub async fn acquire(&self) -> Result<Permit> {
        let rx = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(ClientError::ClientDestroyed);
            }

            // Drop queue slots of callers that stopped waiting
            state.waiters.retain(|tx| !tx.is_closed());

            if state.in_use < self.inner.capacity && state.waiters.is_empty() {
                state.in_use += 1;
                state.total_granted += 1;
                state.peak_in_use = state.peak_in_use.max(state.in_use);
                metrics::update_admission(state.in_use, 0);
                return Ok(Permit::new(self.inner.clone()));
            }

            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            debug!(
                "Admission gate full ({}/{}), queued at position {}",
                state.in_use,
                self.inner.capacity,
                state.waiters.len()
            );
            metrics::update_admission(state.in_use, state.waiters.len());
            rx
        };

        let mut pending = PendingAcquire {
            rx,
            gate: self.inner.clone(),
            done: false,
        };
        let granted = (&mut pending.rx).await;
        pending.done = true;

        match granted {
            Ok(()) => Ok(Permit::new(self.inner.clone())),
            Err(_) => Err(ClientError::ClientDestroyed),
        }
    }

    /// Acquire a permit only if one is free right now.
    pub fn try_acquire(&self) -> Option<Permit> {
        let mut state = self.inner.state.lock();
        state.waiters.retain(|tx| !tx.is_closed());
        if state.closed || state.in_use >= self.inner.capacity || !state.waiters.is_empty() {
            return None;
        }
        state.in_use += 1;
        state.total_granted += 1;
        state.peak_in_use = state.peak_in_use.max(state.in_use);
        metrics::update_admission(state.in_use, 0);
        Some(Permit::new(self.inner.clone()))
    }

    /// Explicitly give a permit back. Equivalent to dropping it.
    pub fn release(&self, permit: Permit) {
        drop(permit);
    }

    pub fn status(&self) -> GateStatus {
        let state = self.inner.state.lock();
        GateStatus {
            capacity: self.inner.capacity,
            in_use: state.in_use,
            available: self.inner.capacity.saturating_sub(state.in_use),
            waiting: live_waiters(&state.waiters),
            peak_in_use: state.peak_in_use,
            total_granted: state.total_granted,
            closed: state.closed,
        }
    }

    /// Refuse new acquisitions and reject every queued waiter. Idempotent.
    ///
    /// Permits already handed out stay valid and are released normally.
    pub fn close(&self) {
        let mut state = self.inner.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let rejected = state.waiters.len();
        // Dropping the senders wakes each waiter with an error
        state.waiters.clear();
        metrics::update_admission(state.in_use, 0);
        debug!("Admission gate closed, rejected {} waiters", rejected);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }
}

/// Waiter-side guard: if the acquiring future is dropped after a slot was
/// handed to it but before it observed the hand-off, the slot is passed on.
struct PendingAcquire {
    rx: oneshot::Receiver<()>,
    gate: Arc<GateInner>,
    done: bool,
}

impl Drop for PendingAcquire {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        self.rx.close();
        if self.rx.try_recv().is_ok() {
            self.gate.release_slot();
        }
    }
}

/// One unit of in-flight capacity. Released exactly once, on drop.
#[must_use = "dropping a permit releases it immediately"]
pub struct Permit {
    gate: Arc<GateInner>,
}

impl Permit {
    fn new(gate: Arc<GateInner>) -> Self {
        Self { gate }
    }
}

impl std::fmt::Debug for Permit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Permit")
            .field("capacity", &self.gate.capacity)
            .finish()
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.gate.release_slot();
    }
}
