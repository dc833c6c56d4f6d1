//! Process-wide handle for hosts that instrument more than one thread.
//!
//! The memory taint context and the source registration sets are shared,
//! mutable, process-wide state; one coarse mutex covers every
//! read-modify-write on them (propagation, syscall post-processing, explicit
//! untaint, registration). Per-instruction call frequency dominates
//! contention, so anything finer than one lock buys nothing. Register
//! contexts are per-thread, stay caller-owned and never take the lock.

use std::sync::{Arc, Mutex, MutexGuard};

use libtaint_core::guest::GuestState;
use libtaint_core::types::OperandRecord;

use super::context::RegisterTaint;
use super::policy::{CheckPolicy, DefaultCheckPolicy};
use super::syscall::{PendingSyscall, TouchedRegion};
use super::TaintTracker;

pub struct SharedTracker<P = DefaultCheckPolicy> {
    inner: Arc<Mutex<TaintTracker<P>>>,
}

impl<P> Clone for SharedTracker<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for SharedTracker {
    fn default() -> Self {
        Self::new(TaintTracker::new())
    }
}

impl<P: CheckPolicy> SharedTracker<P> {
    pub fn new(tracker: TaintTracker<P>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tracker)),
        }
    }

    /// Lock the engine for a sequence of operations that must be atomic as
    /// a group (e.g. propagation immediately followed by checking).
    pub fn lock(&self) -> MutexGuard<'_, TaintTracker<P>> {
        self.inner.lock().expect("taint tracker lock poisoned")
    }

    pub fn propagate(
        &self,
        delta: &mut RegisterTaint,
        operands: &mut [OperandRecord],
    ) {
        self.lock().propagate(delta, operands);
    }

    pub fn taint_checking(
        &self,
        delta: &RegisterTaint,
        operands: &[OperandRecord],
    ) -> bool {
        self.lock().taint_checking(delta, operands)
    }

    pub fn pre_syscall<G: GuestState>(
        &self,
        callno: u64,
        args: &[u64; 6],
        guest: &G,
    ) -> Option<PendingSyscall> {
        self.lock().pre_syscall(callno, args, guest)
    }

    pub fn post_syscall(
        &self,
        ret: u64,
        state: PendingSyscall,
    ) -> Option<TouchedRegion> {
        self.lock().post_syscall(ret, state)
    }

    pub fn post_syscall_regs(&self, delta: &mut RegisterTaint) {
        self.lock().post_syscall_regs(delta);
    }
}
