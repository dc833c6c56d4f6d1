use libtaint_core::types::{OperandRecord, OperandType, RegId};
use libtaint_utils::log::debug;

use crate::taint::context::{MemoryTaint, RegisterTaint};
use crate::taint::policy::CheckPolicy;

/// Flags tainted address-generation operands: a register consumed by an
/// effective-address computation that carries taint means untrusted data is
/// choosing which memory the instruction touches.
#[derive(Debug, Clone, Default)]
pub struct AddressPolicy {}

impl CheckPolicy for AddressPolicy {
    fn check(
        &mut self,
        _memory: &MemoryTaint,
        delta: &RegisterTaint,
        operands: &[OperandRecord],
    ) -> bool {
        for rec in operands {
            if rec.ty != OperandType::Address || !rec.usage.is_read() {
                continue;
            }
            let tag = delta.get(rec.loc as RegId);
            if tag.is_tainted() {
                debug!(
                    target: "taint::policy",
                    reg = rec.loc,
                    tag = %tag,
                    "tainted address-generation operand"
                );
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libtaint_core::types::{OperandUsage, Tag};

    #[test]
    fn test_trips_on_tainted_base_register() {
        let memory = MemoryTaint::new();
        let mut delta = RegisterTaint::new();
        delta.set(6, Tag::from_raw(21));
        // mov rax, [r6] — r6 appears as the address-generation operand
        let ops = [
            OperandRecord::new(OperandType::Address, 6, 0, OperandUsage::Read),
            OperandRecord::new(
                OperandType::Memory(8),
                0x5000,
                0,
                OperandUsage::Read,
            ),
            OperandRecord::new(
                OperandType::Register(8),
                2,
                0,
                OperandUsage::Write,
            ),
        ];
        let mut policy = AddressPolicy::default();
        assert!(policy.check(&memory, &delta, &ops));
    }

    #[test]
    fn test_ignores_clean_address_registers() {
        let memory = MemoryTaint::new();
        let mut delta = RegisterTaint::new();
        // taint elsewhere does not matter
        delta.set(2, Tag::from_raw(21));
        let ops = [
            OperandRecord::new(OperandType::Address, 6, 0, OperandUsage::Read),
            OperandRecord::new(
                OperandType::Register(8),
                2,
                0,
                OperandUsage::Write,
            ),
        ];
        let mut policy = AddressPolicy::default();
        assert!(!policy.check(&memory, &delta, &ops));
    }
}
