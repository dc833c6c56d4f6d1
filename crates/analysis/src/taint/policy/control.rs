use libtaint_core::types::{reg, OperandRecord, RegId, Tag};
use libtaint_utils::log::debug;

use crate::taint::context::{resolve_operand, MemoryTaint, RegisterTaint};
use crate::taint::policy::CheckPolicy;

/// Flags tainted control-flow targets: an instruction that writes the
/// instruction-pointer register (a branch, call or return) whose tracked
/// read operands carry taint is steering execution with untrusted data.
#[derive(Debug, Clone, Default)]
pub struct ControlFlowPolicy {}

impl CheckPolicy for ControlFlowPolicy {
    fn check(
        &mut self,
        memory: &MemoryTaint,
        delta: &RegisterTaint,
        operands: &[OperandRecord],
    ) -> bool {
        let writes_pc = operands.iter().any(|rec| {
            rec.ty.is_reg()
                && rec.usage.is_written()
                && rec.loc as RegId == reg::PC
        });
        if !writes_pc {
            return false;
        }
        let input = operands
            .iter()
            .filter(|rec| rec.ty.is_tracked() && rec.usage.is_read())
            .fold(Tag::CLEAN, |acc, rec| {
                acc.combine(resolve_operand(memory, delta, rec))
            });
        if input.is_tainted() {
            debug!(
                target: "taint::policy",
                tag = %input,
                "tainted control-flow target"
            );
            return true;
        }
        false
    }
}
