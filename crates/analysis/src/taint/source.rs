//! Introduction of taint from untrusted sources, and the registration
//! mutators that decide what counts as untrusted.
//!
//! OS-specific argv/environment decoding belongs to the harness; the engine
//! receives normalized guest strings (base address plus raw bytes) and hands
//! back one assignment record per introduced byte for external logging.

use std::fmt;

use libtaint_core::types::Tag;
use libtaint_utils::log::{debug, info};
use serde::Serialize;

use super::policy::CheckPolicy;
use super::TaintTracker;

/// Origin class of an introduced byte. Argument and environment input are
/// distinct sources with distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceKind {
    Args,
    Env,
    File,
    Stdin,
    Network,
}

impl SourceKind {
    pub const fn id(self) -> u32 {
        match self {
            SourceKind::Args => 2,
            SourceKind::Env => 3,
            SourceKind::File => 4,
            SourceKind::Stdin => 5,
            SourceKind::Network => 6,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Args => "args",
            SourceKind::Env => "env",
            SourceKind::File => "file",
            SourceKind::Stdin => "stdin",
            SourceKind::Network => "network",
        };
        write!(f, "{}", name)
    }
}

/// A string in guest memory, already decoded by the harness: the address of
/// its first byte plus the raw bytes (no terminator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestString {
    pub addr: u64,
    pub data: Vec<u8>,
}

impl GuestString {
    pub fn new(addr: u64, data: impl Into<Vec<u8>>) -> Self {
        Self {
            addr,
            data: data.into(),
        }
    }
}

/// One environment entry: the variable name and its value in guest memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvVar {
    pub name: String,
    pub value: GuestString,
}

/// One introduced byte: where it lives and the tag it received. Returned to
/// the caller for external logging; the engine has already installed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TaintFrame {
    pub source: SourceKind,
    pub addr: u64,
    pub tag: Tag,
}

impl<P: CheckPolicy> TaintTracker<P> {
    /// Fresh source tag for the next untrusted input byte. Numbering starts
    /// at 1 and never lands on the reserved clean/mixed values.
    pub(crate) fn next_tag(&mut self) -> Tag {
        let raw = self.next_source;
        self.next_source = if raw >= u32::MAX - 1 { 1 } else { raw + 1 };
        Tag::from_raw(raw)
    }

    /// Tag every byte of `[addr, addr + len)` with a fresh source tag and
    /// return the fold of the introduced tags.
    pub(crate) fn introduce_range(&mut self, addr: u64, len: u64) -> Tag {
        let mut combined = Tag::CLEAN;
        for offset in 0..len {
            let tag = self.next_tag();
            self.memory_mut().set(addr + offset, tag);
            combined = combined.combine(tag);
        }
        combined
    }

    /// Seed taint from the command line. `argv[0]` is the program name, not
    /// attacker-chosen input, and is never tainted; every byte of the
    /// remaining arguments receives its own source tag. No-op unless
    /// argument tainting is enabled.
    pub fn taint_args(&mut self, argv: &[GuestString]) -> Vec<TaintFrame> {
        if !self.taint_args {
            return Vec::new();
        }
        let mut frames = Vec::new();
        for arg in argv.iter().skip(1) {
            self.introduce_string(SourceKind::Args, arg, &mut frames);
        }
        info!(
            target: "taint::source",
            bytes = frames.len(),
            "tainted command-line arguments"
        );
        frames
    }

    /// Seed taint from the environment: only entries whose name has been
    /// registered with [`TaintTracker::set_taint_env`], value bytes only.
    pub fn taint_env(&mut self, env: &[EnvVar]) -> Vec<TaintFrame> {
        let mut frames = Vec::new();
        for entry in env {
            if !self.taint_env.contains(&entry.name) {
                continue;
            }
            debug!(
                target: "taint::source",
                name = entry.name.as_str(),
                "tainting environment variable"
            );
            self.introduce_string(SourceKind::Env, &entry.value, &mut frames);
        }
        frames
    }

    fn introduce_string(
        &mut self,
        source: SourceKind,
        s: &GuestString,
        frames: &mut Vec<TaintFrame>,
    ) {
        for (offset, _) in s.data.iter().enumerate() {
            let tag = self.next_tag();
            let addr = s.addr + offset as u64;
            self.memory_mut().set(addr, tag);
            frames.push(TaintFrame { source, addr, tag });
        }
    }

    // Registration mutators. All idempotent; callable before or during
    // execution to extend the tracked sets.

    pub fn set_taint_args(&mut self, taint: bool) {
        self.taint_args = taint;
    }

    pub fn set_taint_env(&mut self, var: impl Into<String>) {
        self.taint_env.insert(var.into());
    }

    pub fn track_file(&mut self, path: impl Into<String>) {
        let path = path.into();
        info!(target: "taint::source", path = path.as_str(), "tracking file");
        self.taint_files.insert(path);
    }

    pub fn set_taint_stdin(&mut self) {
        self.taint_stdin = true;
    }

    pub fn set_taint_network(&mut self) {
        self.taint_net = true;
    }

    /// Whether reads on `fd` currently introduce taint.
    pub fn tracks_fd(&self, fd: u32) -> bool {
        self.fds.contains(&fd) || (fd == 0 && self.taint_stdin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libtaint_core::types::OperandType;

    #[test]
    fn test_taint_args_skips_argv0_and_numbers_bytes() {
        let mut tracker = TaintTracker::new();
        tracker.set_taint_args(true);
        let argv = [
            GuestString::new(0x100, *b"prog"),
            GuestString::new(0x200, *b"AAAA"),
        ];
        let frames = tracker.taint_args(&argv);

        assert_eq!(frames.len(), 4);
        // every byte of "AAAA" got its own tag
        let mut tags: Vec<u32> =
            frames.iter().map(|f| f.tag.raw()).collect();
        tags.dedup();
        assert_eq!(tags.len(), 4);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.source, SourceKind::Args);
            assert_eq!(frame.addr, 0x200 + i as u64);
            assert_eq!(tracker.memory().tag_at(frame.addr), frame.tag);
        }
        // argv[0] stays clean
        assert_eq!(tracker.memory().range_tag(0x100, 4), Tag::CLEAN);
    }

    #[test]
    fn test_taint_args_disabled_is_a_no_op() {
        let mut tracker = TaintTracker::new();
        let argv = [GuestString::new(0x100, *b"prog"),
                    GuestString::new(0x200, *b"AAAA")];
        assert!(tracker.taint_args(&argv).is_empty());
        assert!(!tracker.memory().has_taint());
    }

    #[test]
    fn test_taint_env_only_registered_names() {
        let mut tracker = TaintTracker::new();
        tracker.set_taint_env("SECRET");
        let env = [
            EnvVar {
                name: "PATH".to_string(),
                value: GuestString::new(0x300, *b"/bin"),
            },
            EnvVar {
                name: "SECRET".to_string(),
                value: GuestString::new(0x400, *b"xy"),
            },
        ];
        let frames = tracker.taint_env(&env);
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.source == SourceKind::Env));
        assert_eq!(tracker.memory().range_tag(0x300, 4), Tag::CLEAN);
        assert!(tracker.memory().tag_at(0x400).is_tainted());
        assert!(tracker.memory().tag_at(0x401).is_tainted());
    }

    #[test]
    fn test_source_kind_ids_are_distinct() {
        let kinds = [
            SourceKind::Args,
            SourceKind::Env,
            SourceKind::File,
            SourceKind::Stdin,
            SourceKind::Network,
        ];
        let mut ids: Vec<u32> = kinds.iter().map(|k| k.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), kinds.len());
    }

    #[test]
    fn test_next_tag_skips_reserved_values() {
        let mut tracker = TaintTracker::new();
        tracker.next_source = u32::MAX - 1;
        let t1 = tracker.next_tag();
        let t2 = tracker.next_tag();
        assert_eq!(t1, Tag::from_raw(u32::MAX - 1));
        assert!(!t2.is_mixed() && t2.is_tainted());
    }

    #[test]
    fn test_introduced_tags_merge_through_propagation() {
        // frames produced by introduction stay valid inputs to the merge
        let mut tracker = TaintTracker::new();
        tracker.set_taint_args(true);
        let argv = [
            GuestString::new(0x100, *b"p"),
            GuestString::new(0x200, *b"ab"),
        ];
        tracker.taint_args(&argv);
        assert_eq!(
            tracker.get_mem_taint(0x200, OperandType::Memory(2)),
            Tag::MIXED
        );
    }
}
