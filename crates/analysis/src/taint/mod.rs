// Dynamic taint analysis for instrumented native execution.

#[macro_use]
pub mod policy;
pub mod config;
pub mod context;
pub mod propagation;
pub mod shared;
pub mod source;
pub mod syscall;

use std::collections::HashSet;

use libtaint_core::types::{OperandRecord, OperandType, RegId, Tag};
use libtaint_utils::log::info;

use self::config::TaintConfig;
use self::context::{MemoryTaint, RegisterTaint};
use self::policy::{CheckPolicy, DefaultCheckPolicy};

/// The taint engine: one instance per instrumented process.
///
/// Owns the process-wide memory taint context, the untrusted-source
/// registration state and the checking policy. Register taint contexts are
/// per-thread, owned by the caller, and passed into every operation that
/// needs one. Constructed at process attach and dropped at detach; for
/// multi-threaded hosts see [`shared::SharedTracker`].
pub struct TaintTracker<P = DefaultCheckPolicy> {
    /// Byte-granular taint over the tracked address space.
    memory: MemoryTaint,

    policy: P,

    /// Raw value of the next source tag to hand out; input byte numbering
    /// starts at 1 and skips the reserved clean/mixed values.
    next_source: u32,

    /// Taint computed for the result of the syscall currently in flight,
    /// installed into the return-value register by
    /// [`TaintTracker::post_syscall_regs`].
    ret_taint: Tag,

    // source registration state, consulted on every syscall hook
    pub(crate) taint_files: HashSet<String>,
    pub(crate) fds: HashSet<u32>,
    pub(crate) taint_env: HashSet<String>,
    pub(crate) taint_args: bool,
    pub(crate) taint_net: bool,
    pub(crate) taint_stdin: bool,
}

impl Default for TaintTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TaintTracker {
    /// A tracker with the default checking policy and every source disabled.
    pub fn new() -> Self {
        Self::with_policy(DefaultCheckPolicy::default())
    }
}

impl<P: CheckPolicy> TaintTracker<P> {
    pub fn with_policy(policy: P) -> Self {
        Self {
            memory: MemoryTaint::default(),
            policy,
            next_source: 1,
            ret_taint: Tag::CLEAN,
            taint_files: HashSet::new(),
            fds: HashSet::new(),
            taint_env: HashSet::new(),
            taint_args: false,
            taint_net: false,
            taint_stdin: false,
        }
    }

    /// A tracker with its sources registered from a loaded `[taint]` section.
    pub fn from_config(cfg: &TaintConfig, policy: P) -> Self {
        let mut tracker = Self::with_policy(policy);
        tracker.set_taint_args(cfg.args);
        for var in &cfg.env {
            tracker.set_taint_env(var.clone());
        }
        for file in &cfg.files {
            tracker.track_file(file.clone());
        }
        if cfg.stdin {
            tracker.set_taint_stdin();
        }
        if cfg.network {
            tracker.set_taint_network();
        }
        tracker
    }

    pub fn memory(&self) -> &MemoryTaint {
        &self.memory
    }

    pub(crate) fn memory_mut(&mut self) -> &mut MemoryTaint {
        &mut self.memory
    }

    /// Taint of the memory range starting at `addr` whose width is derived
    /// from `ty`. A range mixing distinct nonzero tags reads as mixed.
    pub fn get_mem_taint(&self, addr: u64, ty: OperandType) -> Tag {
        self.memory.range_tag(addr, ty.size() as u64)
    }

    /// Explicitly clear the tag of one memory byte, for locations known to
    /// be overwritten with clean data outside the propagation path.
    pub fn untaint_mem(&mut self, addr: u64) {
        self.memory.untaint(addr);
    }

    /// Drop every tag, memory and the given register context alike. Source
    /// registration and input byte numbering are left untouched.
    pub fn reset_taint(&mut self, delta: &mut RegisterTaint) {
        self.memory = MemoryTaint::default();
        delta.clear();
    }

    /// Evaluate the checking policy against the current instruction.
    /// Re-evaluated fresh on every call; nothing is memoized.
    pub fn taint_checking(
        &mut self,
        delta: &RegisterTaint,
        operands: &[OperandRecord],
    ) -> bool {
        let Self { policy, memory, .. } = self;
        policy.check(memory, delta, operands)
    }

    /// Dump the memory taint context, ascending by address, adjacent bytes
    /// with an identical tag coalesced into one line. Output only.
    pub fn print_mem(&self) {
        for (start, end, tag) in self.memory.runs() {
            info!(
                target: "taint::dump",
                "mem {:#x}..{:#x} {}",
                start,
                end,
                tag
            );
        }
    }
}

/// Dump a register taint context in ascending register-id order.
pub fn print_regs(delta: &RegisterTaint) {
    let mut entries: Vec<(RegId, Tag)> = delta.iter().collect();
    entries.sort_by_key(|(reg, _)| *reg);
    for (reg, tag) in entries {
        info!(target: "taint::dump", "reg {} {}", reg, tag);
    }
}

#[cfg(test)]
mod tests {
    use super::context::RegisterTaint;
    use super::*;
    use libtaint_core::types::OperandType;

    #[test]
    fn test_get_mem_taint_width_from_type() {
        let mut tracker = TaintTracker::new();
        tracker.memory_mut().set(0x100, Tag::from_raw(5));
        assert_eq!(
            tracker.get_mem_taint(0x100, OperandType::Memory(1)),
            Tag::from_raw(5)
        );
        // unknown operands have zero width and never read taint
        assert_eq!(
            tracker.get_mem_taint(0x100, OperandType::Unknown),
            Tag::CLEAN
        );
    }

    #[test]
    fn test_untaint_mem_clears_prior_taint() {
        let mut tracker = TaintTracker::new();
        tracker.memory_mut().set(0x2000, Tag::from_raw(9));
        assert!(tracker
            .get_mem_taint(0x2000, OperandType::Memory(1))
            .is_tainted());
        tracker.untaint_mem(0x2000);
        assert_eq!(
            tracker.get_mem_taint(0x2000, OperandType::Memory(1)),
            Tag::CLEAN
        );
    }

    #[test]
    fn test_reset_taint_drops_all_tags() {
        let mut tracker = TaintTracker::new();
        let mut delta = RegisterTaint::default();
        tracker.memory_mut().set_range(0x50, 4, Tag::from_raw(2));
        delta.set(3, Tag::from_raw(2));
        tracker.reset_taint(&mut delta);
        assert!(!tracker.memory().has_taint());
        assert!(!delta.has_taint());
    }

    #[test]
    fn test_from_config_registers_sources() {
        let cfg = TaintConfig {
            args: true,
            env: vec!["AUTH_TOKEN".to_string()],
            files: vec!["/tmp/input".to_string()],
            stdin: true,
            network: true,
        };
        let tracker =
            TaintTracker::from_config(&cfg, DefaultCheckPolicy::default());
        assert!(tracker.taint_args);
        assert!(tracker.taint_stdin);
        assert!(tracker.taint_net);
        assert!(tracker.taint_env.contains("AUTH_TOKEN"));
        assert!(tracker.taint_files.contains("/tmp/input"));
    }

    #[test]
    fn test_print_dumps_do_not_mutate() {
        let mut tracker = TaintTracker::new();
        tracker.memory_mut().set(0x10, Tag::from_raw(3));
        let before = tracker.memory().runs();
        tracker.print_mem();
        let mut delta = RegisterTaint::default();
        delta.set(4, Tag::from_raw(3));
        print_regs(&delta);
        assert_eq!(tracker.memory().runs(), before);
        assert_eq!(delta.get(4), Tag::from_raw(3));
    }
}
