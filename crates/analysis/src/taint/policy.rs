pub mod address;
pub mod control;

use libtaint_core::types::OperandRecord;

use super::context::{MemoryTaint, RegisterTaint};

pub use self::address::AddressPolicy;
pub use self::control::ControlFlowPolicy;

/// A taint-checking policy: decides whether the instruction described by the
/// operand table uses tainted state dangerously.
///
/// Policies are pure functions of the supplied table and contexts,
/// re-evaluated fresh for every instruction; a policy must not cache
/// anything across calls. Reporting/alert formatting is the harness's
/// responsibility; a policy only answers yes or no.
#[auto_impl::auto_impl(&mut, Box)]
pub trait CheckPolicy {
    fn check(
        &mut self,
        memory: &MemoryTaint,
        delta: &RegisterTaint,
        operands: &[OperandRecord],
    ) -> bool;
}

impl CheckPolicy for () {
    #[inline]
    fn check(
        &mut self,
        _memory: &MemoryTaint,
        _delta: &RegisterTaint,
        _operands: &[OperandRecord],
    ) -> bool {
        false
    }
}

/// Two policies compose by disjunction. Both are always evaluated; a policy
/// has no side effects to short-circuit around, and keeping evaluation
/// unconditional keeps timing uniform across instructions.
impl<P1: CheckPolicy, P2: CheckPolicy> CheckPolicy for (P1, P2) {
    #[inline]
    fn check(
        &mut self,
        memory: &MemoryTaint,
        delta: &RegisterTaint,
        operands: &[OperandRecord],
    ) -> bool {
        let first = self.0.check(memory, delta, operands);
        let second = self.1.check(memory, delta, operands);
        first || second
    }
}

#[allow(unused_macros)]
macro_rules! policies {
    ($p:expr) => {
        $p
    };
    ($p1:expr, $p2:expr) => {
        ($p1, $p2)
    };
    ($p1:expr, $p2:expr, $($pTail:expr),+) => {
        ($p1, policies!($p2, $($pTail),+))
    };
}

/// The policy a plain [`super::TaintTracker::new`] evaluates: tainted
/// control-flow targets and tainted address-generation operands.
pub type DefaultCheckPolicy = (ControlFlowPolicy, AddressPolicy);

#[cfg(test)]
mod tests {
    use super::*;
    use libtaint_core::types::{
        reg, OperandType, OperandUsage, Tag,
    };

    /// Trips iff any operand scratch slot is mixed.
    #[derive(Debug, Default)]
    struct MixedScratchPolicy {}

    impl CheckPolicy for MixedScratchPolicy {
        fn check(
            &mut self,
            _memory: &MemoryTaint,
            _delta: &RegisterTaint,
            operands: &[OperandRecord],
        ) -> bool {
            operands.iter().any(|rec| rec.taint.is_mixed())
        }
    }

    #[test]
    fn test_unit_policy_never_trips() {
        let mut policy = ();
        assert!(!policy.check(
            &MemoryTaint::new(),
            &RegisterTaint::new(),
            &[]
        ));
    }

    #[test]
    fn test_tuple_composition_is_disjunction() {
        let memory = MemoryTaint::new();
        let delta = RegisterTaint::new();
        let mut rec = OperandRecord::new(
            OperandType::Register(8),
            3,
            0,
            OperandUsage::Read,
        );
        rec.taint = Tag::MIXED;

        let mut policy = ((), MixedScratchPolicy::default());
        assert!(policy.check(&memory, &delta, &[rec]));
        assert!(!policy.check(&memory, &delta, &[]));
    }

    #[test]
    fn test_compose_multiple_policy() {
        let mut policy = policies![
            ControlFlowPolicy::default(),
            AddressPolicy::default(),
            MixedScratchPolicy::default()
        ];
        let memory = MemoryTaint::new();
        let mut delta = RegisterTaint::new();
        delta.set(reg::PC, Tag::CLEAN);
        assert!(!policy.check(&memory, &delta, &[]));
    }
}
