//! Core data model: taint tags and the per-instruction operand table.

use serde::{Deserialize, Serialize};

/// Identifier of a guest register. The harness maps ISA registers to dense
/// ids of its choosing, except for the two reserved ids in [`reg`].
pub type RegId = u32;

/// Register ids reserved by the engine contract. The harness must map its
/// ISA's instruction pointer and return-value register onto these.
pub mod reg {
    use super::RegId;

    /// Instruction pointer (RIP on x86-64).
    pub const PC: RegId = 0;
    /// Syscall/function return-value register (RAX on x86-64).
    pub const RET: RegId = 1;
}

/// A 32-bit provenance label attached to one byte of guest state.
///
/// Reserved values: zero means clean, `0xFFFF_FFFF` means mixed (two or more
/// distinct sources merged). Every other value identifies the n-th untrusted
/// input byte introduced by the engine.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Tag(u32);

impl Tag {
    pub const CLEAN: Tag = Tag(0);
    pub const MIXED: Tag = Tag(u32::MAX);

    /// Build a tag from a raw 32-bit value.
    pub const fn from_raw(raw: u32) -> Self {
        Tag(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_clean(self) -> bool {
        self.0 == 0
    }

    pub const fn is_tainted(self) -> bool {
        self.0 != 0
    }

    pub const fn is_mixed(self) -> bool {
        self.0 == u32::MAX
    }

    /// Merge two tags. Clean is the identity, a tag merged with itself is
    /// itself, two distinct nonzero tags give [`Tag::MIXED`]. Commutative,
    /// associative and idempotent.
    pub const fn combine(self, other: Tag) -> Tag {
        if self.0 == other.0 || other.0 == 0 {
            self
        } else if self.0 == 0 {
            other
        } else {
            Tag::MIXED
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_clean() {
            write!(f, "clean")
        } else if self.is_mixed() {
            write!(f, "mixed")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Classification of one operand of the instruction under analysis.
///
/// Widths are in bytes. `Address` stands for a register consumed by the
/// effective-address computation of a memory operand (base or index); it is
/// register-class and always pointer-width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperandType {
    Register(u8),
    Memory(u8),
    Immediate(u8),
    Address,
    Unknown,
}

impl OperandType {
    /// Operand width in bytes; zero for an unrecognized operand.
    pub const fn size(self) -> u32 {
        match self {
            OperandType::Register(w)
            | OperandType::Memory(w)
            | OperandType::Immediate(w) => w as u32,
            OperandType::Address => 8,
            OperandType::Unknown => 0,
        }
    }

    pub const fn is_valid(self) -> bool {
        !matches!(self, OperandType::Unknown)
    }

    pub const fn is_reg(self) -> bool {
        matches!(self, OperandType::Register(_) | OperandType::Address)
    }

    pub const fn is_mem(self) -> bool {
        matches!(self, OperandType::Memory(_))
    }

    /// Whether this operand participates in taint tracking at all.
    /// Immediates and unrecognized operands never carry taint.
    pub const fn is_tracked(self) -> bool {
        self.is_reg() || self.is_mem()
    }
}

/// How the instruction uses an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperandUsage {
    Read,
    Write,
    ReadWrite,
}

impl OperandUsage {
    pub const fn is_read(self) -> bool {
        matches!(self, OperandUsage::Read | OperandUsage::ReadWrite)
    }

    pub const fn is_written(self) -> bool {
        matches!(self, OperandUsage::Write | OperandUsage::ReadWrite)
    }
}

/// One entry of the per-instruction operand table.
///
/// `loc` holds a register id for register-class operands and a byte address
/// for memory-class operands. `taint` is a scratch slot filled by the
/// propagation pass; its value before that pass is meaningless.
///
/// The table is owned by the harness and supplied fresh, as a bounded slice,
/// for every instruction; the engine retains nothing across calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandRecord {
    pub ty: OperandType,
    pub loc: u64,
    pub value: u64,
    pub usage: OperandUsage,
    pub taint: Tag,
}

impl OperandRecord {
    pub fn new(ty: OperandType, loc: u64, value: u64, usage: OperandUsage) -> Self {
        Self {
            ty,
            loc,
            value,
            usage,
            taint: Tag::CLEAN,
        }
    }
}
