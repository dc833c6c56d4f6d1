//! Taint contexts: sparse maps from a location to its tag.
//!
//! Absence of a key always reads as clean, and storing clean removes the
//! key, so a context only ever holds live taint and `has_taint` is an
//! emptiness check.

use std::collections::HashMap;
use std::hash::Hash;

use libtaint_core::types::{OperandRecord, OperandType, RegId, Tag};

/// Generic point-addressable taint context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaintContext<K: Eq + Hash + Copy> {
    map: HashMap<K, Tag>,
}

impl<K: Eq + Hash + Copy> TaintContext<K> {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Tag of `key`; a missing entry is clean.
    pub fn get(&self, key: K) -> Tag {
        self.map.get(&key).copied().unwrap_or(Tag::CLEAN)
    }

    /// Install `tag` for `key`. Storing clean removes the entry.
    pub fn set(&mut self, key: K, tag: Tag) {
        if tag.is_clean() {
            self.map.remove(&key);
        } else {
            self.map.insert(key, tag);
        }
    }

    /// True iff any entry carries a nonzero tag.
    pub fn has_taint(&self) -> bool {
        !self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, Tag)> + '_ {
        self.map.iter().map(|(k, t)| (*k, *t))
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}

/// Per-thread register taint context. Owned by the caller, never by the
/// engine.
pub type RegisterTaint = TaintContext<RegId>;

/// Process-wide, byte-granular memory taint context. Grows lazily as
/// addresses are first tainted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryTaint {
    bytes: TaintContext<u64>,
}

impl MemoryTaint {
    pub fn new() -> Self {
        Self {
            bytes: TaintContext::new(),
        }
    }

    pub fn tag_at(&self, addr: u64) -> Tag {
        self.bytes.get(addr)
    }

    pub fn set(&mut self, addr: u64, tag: Tag) {
        self.bytes.set(addr, tag);
    }

    /// Combined tag of `[addr, addr + len)`: the merge-fold of the per-byte
    /// tags with clean as identity. Distinct nonzero tags anywhere in the
    /// range give mixed, never an arbitrary constituent.
    pub fn range_tag(&self, addr: u64, len: u64) -> Tag {
        let mut combined = Tag::CLEAN;
        for offset in 0..len {
            combined = combined.combine(self.bytes.get(addr + offset));
            if combined.is_mixed() {
                break;
            }
        }
        combined
    }

    /// Install one tag on every byte of `[addr, addr + len)`; a clean tag
    /// clears the range.
    pub fn set_range(&mut self, addr: u64, len: u64, tag: Tag) {
        for offset in 0..len {
            self.bytes.set(addr + offset, tag);
        }
    }

    /// Explicitly clear one byte.
    pub fn untaint(&mut self, addr: u64) {
        self.bytes.set(addr, Tag::CLEAN);
    }

    pub fn has_taint(&self) -> bool {
        self.bytes.has_taint()
    }

    /// Tainted bytes as maximal `[start, end)` runs of one identical tag,
    /// ascending by address. Stable across identical contexts.
    pub fn runs(&self) -> Vec<(u64, u64, Tag)> {
        let mut entries: Vec<(u64, Tag)> = self.bytes.iter().collect();
        entries.sort_by_key(|(addr, _)| *addr);
        let mut runs: Vec<(u64, u64, Tag)> = Vec::new();
        for (addr, tag) in entries {
            match runs.last_mut() {
                Some((_, end, run_tag)) if *end == addr && *run_tag == tag => {
                    *end += 1;
                }
                _ => runs.push((addr, addr + 1, tag)),
            }
        }
        runs
    }
}

/// Resolve the tag an operand currently carries: register classes from the
/// caller's register context, memory class from the memory context over the
/// operand width. Untracked operands are clean by definition.
pub fn resolve_operand(
    memory: &MemoryTaint,
    delta: &RegisterTaint,
    rec: &OperandRecord,
) -> Tag {
    match rec.ty {
        ty if ty.is_reg() => delta.get(rec.loc as RegId),
        OperandType::Memory(w) => memory.range_tag(rec.loc, w as u64),
        _ => Tag::CLEAN,
    }
}
