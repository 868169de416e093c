//! The closed operand model every instruction is built from.

use core::fmt;

use crate::immediate::Immediate;
use crate::indirect::IndirectOperand;
use crate::registers::{MaskRegister, Register};
use crate::relative::RelativeOffset;
use crate::segmented::SegmentedAddress;

/// A single instruction operand. Closed over the six shapes the encoder and renderer
/// know how to handle; there is no catch-all variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    Register(Register),
    Immediate(Immediate),
    Indirect(IndirectOperand),
    Relative(RelativeOffset),
    Segmented(SegmentedAddress),
    Mask(MaskRegister),
}

impl Operand {
    #[must_use]
    pub const fn as_register(&self) -> Option<&Register> {
        match self {
            Operand::Register(r) => Some(r),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_indirect(&self) -> Option<&IndirectOperand> {
        match self {
            Operand::Indirect(i) => Some(i),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Operand::Indirect(_))
    }
}

impl From<Register> for Operand {
    fn from(value: Register) -> Self {
        Operand::Register(value)
    }
}

impl From<Immediate> for Operand {
    fn from(value: Immediate) -> Self {
        Operand::Immediate(value)
    }
}

impl From<IndirectOperand> for Operand {
    fn from(value: IndirectOperand) -> Self {
        Operand::Indirect(value)
    }
}

impl From<RelativeOffset> for Operand {
    fn from(value: RelativeOffset) -> Self {
        Operand::Relative(value)
    }
}

impl From<SegmentedAddress> for Operand {
    fn from(value: SegmentedAddress) -> Self {
        Operand::Segmented(value)
    }
}

impl From<MaskRegister> for Operand {
    fn from(value: MaskRegister) -> Self {
        Operand::Mask(value)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(r) => fmt::Display::fmt(r, f),
            Operand::Immediate(i) => fmt::Display::fmt(i, f),
            Operand::Indirect(i) => fmt::Display::fmt(i, f),
            Operand::Relative(r) => fmt::Display::fmt(r, f),
            Operand::Segmented(s) => fmt::Display::fmt(s, f),
            Operand::Mask(m) => fmt::Display::fmt(m, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::R64;

    #[test]
    fn from_register_wraps_into_operand() {
        let op: Operand = Register::R64(R64::Rax).into();
        assert_eq!(op.to_string(), "rax");
    }

    #[test]
    fn is_memory_only_true_for_indirect() {
        let reg_op: Operand = Register::R64(R64::Rax).into();
        assert!(!reg_op.is_memory());
    }
}
