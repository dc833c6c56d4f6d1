//! Per-instruction taint propagation.
//!
//! One pass over the operand table the harness supplies for the current
//! instruction: every tracked read operand contributes its tag to one
//! combined input tag, and every tracked write operand's destination is set
//! to that tag. An instruction with no read operands definitively overwrites
//! its destinations with non-derived data, so their taint is cleared rather
//! than left stale.

use libtaint_core::types::{OperandRecord, RegId, Tag};

use super::context::{resolve_operand, RegisterTaint};
use super::policy::CheckPolicy;
use super::TaintTracker;

impl<P: CheckPolicy> TaintTracker<P> {
    /// Propagate taint for the instruction described by `operands`.
    ///
    /// Register writes update `delta` in place; memory writes update the
    /// engine's memory context. Scratch `taint` slots are filled for every
    /// record: the resolved input tag for reads, the installed tag for
    /// writes, clean for untracked operands.
    ///
    /// Precondition: `operands` describes the instruction about to commit;
    /// the engine retains nothing from the slice across calls.
    pub fn propagate(
        &mut self,
        delta: &mut RegisterTaint,
        operands: &mut [OperandRecord],
    ) {
        let mut combined = Tag::CLEAN;
        let mut saw_read = false;

        for rec in operands.iter_mut() {
            if !rec.ty.is_tracked() {
                rec.taint = Tag::CLEAN;
                continue;
            }
            if rec.usage.is_read() {
                saw_read = true;
                let tag = resolve_operand(&self.memory, delta, rec);
                rec.taint = tag;
                combined = combined.combine(tag);
            }
        }

        // zero read operands: the result derives from nothing tracked
        let result = if saw_read { combined } else { Tag::CLEAN };

        for rec in operands.iter_mut() {
            if !rec.ty.is_tracked() || !rec.usage.is_written() {
                continue;
            }
            rec.taint = result;
            if rec.ty.is_reg() {
                delta.set(rec.loc as RegId, result);
            } else {
                self.memory.set_range(rec.loc, rec.ty.size() as u64, result);
            }
        }
    }
}

/// Combined tag of every read-marked operand's scratch slot: "is this
/// instruction's input tainted", as one tag. Meaningful once
/// [`TaintTracker::propagate`] has run for the same table.
pub fn read_taint(operands: &[OperandRecord]) -> Tag {
    operands
        .iter()
        .filter(|rec| rec.ty.is_tracked() && rec.usage.is_read())
        .fold(Tag::CLEAN, |acc, rec| acc.combine(rec.taint))
}
