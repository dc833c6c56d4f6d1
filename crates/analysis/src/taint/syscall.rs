//! Syscall hooks: classification before the call, taint introduction and
//! descriptor bookkeeping after it.
//!
//! The harness calls [`TaintTracker::pre_syscall`] with the raw call number
//! and argument words; a recognized taint-relevant call yields a
//! [`PendingSyscall`] the harness hands back to
//! [`TaintTracker::post_syscall`] together with the return value. Everything
//! else is `None` — the expected path for the vast majority of calls, not an
//! error. [`TaintTracker::post_syscall_regs`] runs after every call, tracked
//! or not, to refresh the return-value register's tag.

use std::collections::HashMap;

use lazy_static::lazy_static;
use libtaint_core::guest::GuestState;
use libtaint_core::types::{reg, Tag};
use libtaint_utils::log::debug;

use super::context::RegisterTaint;
use super::policy::CheckPolicy;
use super::source::SourceKind;
use super::TaintTracker;

/// Linux x86-64 syscall numbers the engine cares about.
pub mod nr {
    pub const READ: u64 = 0;
    pub const OPEN: u64 = 2;
    pub const CLOSE: u64 = 3;
    pub const PREAD64: u64 = 17;
    pub const DUP: u64 = 32;
    pub const DUP2: u64 = 33;
    pub const ACCEPT: u64 = 43;
    pub const RECVFROM: u64 = 45;
    pub const OPENAT: u64 = 257;
    pub const ACCEPT4: u64 = 288;
    pub const DUP3: u64 = 292;
}

lazy_static! {
    static ref SYSCALL_NAMES: HashMap<u64, &'static str> = {
        let mut m = HashMap::new();
        m.insert(nr::READ, "read");
        m.insert(nr::OPEN, "open");
        m.insert(nr::CLOSE, "close");
        m.insert(nr::PREAD64, "pread64");
        m.insert(nr::DUP, "dup");
        m.insert(nr::DUP2, "dup2");
        m.insert(nr::ACCEPT, "accept");
        m.insert(nr::RECVFROM, "recvfrom");
        m.insert(nr::OPENAT, "openat");
        m.insert(nr::ACCEPT4, "accept4");
        m.insert(nr::DUP3, "dup3");
        m
    };
}

fn syscall_name(callno: u64) -> &'static str {
    SYSCALL_NAMES.get(&callno).copied().unwrap_or("?")
}

/// State stashed between the pre- and post-call hooks of one syscall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingSyscall {
    /// open/openat; `path` is `None` when the path string could not be read
    /// from guest memory (the call still completes, it just cannot match a
    /// tracked file).
    Open { path: Option<String> },
    /// read/pread64 into `buf`.
    Read { fd: u32, buf: u64 },
    /// recvfrom into `buf`.
    Recv { fd: u32, buf: u64 },
    /// accept/accept4 on a listening socket.
    Accept,
    /// close of a tracked descriptor.
    Close { fd: u32 },
    /// dup-class call on a tracked descriptor.
    Dup,
}

/// The memory region a read-class syscall wrote, reported back to the
/// harness for accounting whether or not taint was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchedRegion {
    pub addr: u64,
    pub len: u64,
    pub tainted: bool,
}

impl<P: CheckPolicy> TaintTracker<P> {
    /// Classify a syscall at entry. Returns the state the matching
    /// [`TaintTracker::post_syscall`] needs, or `None` for calls the engine
    /// does not care about. Resets the pending return-value tag.
    pub fn pre_syscall<G: GuestState>(
        &mut self,
        callno: u64,
        args: &[u64; 6],
        guest: &G,
    ) -> Option<PendingSyscall> {
        self.ret_taint = Tag::CLEAN;
        let pending = match callno {
            nr::OPEN => Some(PendingSyscall::Open {
                path: self.read_guest_path(guest, args[0]),
            }),
            nr::OPENAT => Some(PendingSyscall::Open {
                path: self.read_guest_path(guest, args[1]),
            }),
            nr::READ | nr::PREAD64 => Some(PendingSyscall::Read {
                fd: args[0] as u32,
                buf: args[1],
            }),
            nr::RECVFROM => Some(PendingSyscall::Recv {
                fd: args[0] as u32,
                buf: args[1],
            }),
            nr::ACCEPT | nr::ACCEPT4 => Some(PendingSyscall::Accept),
            nr::CLOSE if self.fds.contains(&(args[0] as u32)) => {
                Some(PendingSyscall::Close { fd: args[0] as u32 })
            }
            nr::DUP | nr::DUP2 | nr::DUP3
                if self.fds.contains(&(args[0] as u32)) =>
            {
                Some(PendingSyscall::Dup)
            }
            _ => None,
        };
        if pending.is_some() {
            debug!(
                target: "taint::syscall",
                call = syscall_name(callno),
                "syscall classified as taint-relevant"
            );
        }
        pending
    }

    fn read_guest_path<G: GuestState>(
        &self,
        guest: &G,
        addr: u64,
    ) -> Option<String> {
        match guest.read_c_string(addr) {
            Ok(path) => Some(path),
            Err(err) => {
                debug!(
                    target: "taint::syscall",
                    %err,
                    "could not resolve open path"
                );
                None
            }
        }
    }

    /// Apply introduction rules at syscall return. `ret` is the raw return
    /// value (byte count for read-class calls, new descriptor for
    /// open/accept/dup-class calls).
    ///
    /// Read-class calls report the touched region either way; taint is
    /// applied only when the descriptor is tracked. Must be called exactly
    /// once per state returned by [`TaintTracker::pre_syscall`].
    pub fn post_syscall(
        &mut self,
        ret: u64,
        state: PendingSyscall,
    ) -> Option<TouchedRegion> {
        match state {
            PendingSyscall::Open { path } => {
                let fd = ret as i64;
                if fd >= 0 {
                    if let Some(path) = path {
                        if self.taint_files.contains(&path) {
                            debug!(
                                target: "taint::syscall",
                                path = path.as_str(),
                                fd,
                                "tracked file opened"
                            );
                            self.fds.insert(fd as u32);
                        }
                    }
                }
                None
            }
            PendingSyscall::Read { fd, buf } => {
                let kind = if fd == 0 {
                    SourceKind::Stdin
                } else {
                    SourceKind::File
                };
                self.introduce_read(kind, fd, buf, ret, self.tracks_fd(fd))
            }
            PendingSyscall::Recv { fd, buf } => {
                let tracked = self.fds.contains(&fd) || self.taint_net;
                self.introduce_read(SourceKind::Network, fd, buf, ret, tracked)
            }
            PendingSyscall::Accept => {
                let fd = ret as i64;
                if fd >= 0 {
                    self.accept_helper(fd as u32);
                }
                None
            }
            PendingSyscall::Close { fd } => {
                if ret as i64 == 0 {
                    debug!(
                        target: "taint::syscall",
                        fd,
                        "tracked descriptor closed"
                    );
                    self.fds.remove(&fd);
                }
                None
            }
            PendingSyscall::Dup => {
                let fd = ret as i64;
                if fd >= 0 {
                    self.fds.insert(fd as u32);
                }
                None
            }
        }
    }

    fn introduce_read(
        &mut self,
        kind: SourceKind,
        fd: u32,
        buf: u64,
        ret: u64,
        tracked: bool,
    ) -> Option<TouchedRegion> {
        let bytes = ret as i64;
        if bytes <= 0 {
            return None;
        }
        let len = bytes as u64;
        if tracked {
            // the returned count derives from the untrusted input too
            self.ret_taint = self.introduce_range(buf, len);
            debug!(
                target: "taint::syscall",
                source = %kind,
                fd,
                addr = buf,
                len,
                "tainted input bytes"
            );
        }
        Some(TouchedRegion {
            addr: buf,
            len,
            tainted: tracked,
        })
    }

    /// Refresh the return-value register after every syscall, tracked or
    /// not: the kernel overwrote it, so stale taint is cleared, and a
    /// taint-introducing call leaves the fold of its introduced tags.
    pub fn post_syscall_regs(&mut self, delta: &mut RegisterTaint) {
        delta.set(reg::RET, self.ret_taint);
        self.ret_taint = Tag::CLEAN;
    }

    /// Register a freshly accepted descriptor so subsequent receives on it
    /// are tracked. No-op unless network tainting is enabled.
    pub fn accept_helper(&mut self, fd: u32) {
        if self.taint_net {
            debug!(target: "taint::syscall", fd, "tracking accepted socket");
            self.fds.insert(fd);
        }
    }

    /// Directly taint `len` received bytes at `addr` when `fd` is tracked or
    /// network tainting is enabled; reports whether taint was applied.
    pub fn recv_helper(&mut self, fd: u32, addr: u64, len: u64) -> bool {
        if !self.fds.contains(&fd) && !self.taint_net {
            return false;
        }
        self.introduce_range(addr, len);
        debug!(
            target: "taint::syscall",
            fd,
            addr,
            len,
            "tainted received bytes"
        );
        true
    }
}
