//! A fully structured instruction: mnemonic, optional legacy prefix, optional
//! destination mask, and its operands in positional order.

use crate::error::IllegalArgument;
use crate::mnemonic::Mnemonic;
use crate::operand::Operand;
use crate::prefixes::GroupOnePrefix;
use crate::registers::MaskRegister;

/// A decoded or to-be-encoded instruction. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    legacy_prefix: Option<GroupOnePrefix>,
    mnemonic: Mnemonic,
    mask: Option<MaskRegister>,
    zero_merge: bool,
    operands: Vec<Operand>,
}

impl Instruction {
    #[must_use]
    pub const fn legacy_prefix(&self) -> Option<GroupOnePrefix> {
        self.legacy_prefix
    }

    #[must_use]
    pub const fn mnemonic(&self) -> Mnemonic {
        self.mnemonic
    }

    #[must_use]
    pub const fn mask(&self) -> Option<MaskRegister> {
        self.mask
    }

    #[must_use]
    pub const fn zero_merge(&self) -> bool {
        self.zero_merge
    }

    #[must_use]
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    #[must_use]
    pub fn operand(&self, index: usize) -> Option<&Operand> {
        self.operands.get(index)
    }
}

/// Assembles an [`Instruction`]. `with_operand` appends to the positional operand
/// list, so the "operand `i+1` only if `i` is present" invariant holds automatically.
#[derive(Debug, Default)]
pub struct InstructionBuilder {
    legacy_prefix: Option<GroupOnePrefix>,
    mnemonic: Option<Mnemonic>,
    mask: Option<MaskRegister>,
    zero_merge: bool,
    operands: Vec<Operand>,
}

impl InstructionBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mnemonic(mut self, mnemonic: Mnemonic) -> Result<Self, IllegalArgument> {
        if self.mnemonic.is_some() {
            return Err(IllegalArgument::BuilderMisuse(
                "mnemonic already set".to_string(),
            ));
        }
        self.mnemonic = Some(mnemonic);
        Ok(self)
    }

    pub fn with_legacy_prefix(mut self, prefix: GroupOnePrefix) -> Result<Self, IllegalArgument> {
        if self.legacy_prefix.is_some() {
            return Err(IllegalArgument::BuilderMisuse(
                "legacy prefix already set".to_string(),
            ));
        }
        self.legacy_prefix = Some(prefix);
        Ok(self)
    }

    pub fn with_mask(mut self, mask: MaskRegister) -> Result<Self, IllegalArgument> {
        if self.mask.is_some() {
            return Err(IllegalArgument::BuilderMisuse(
                "mask already set".to_string(),
            ));
        }
        self.mask = Some(mask);
        Ok(self)
    }

    #[must_use]
    pub fn with_zero_merge(mut self) -> Self {
        self.zero_merge = true;
        self
    }

    pub fn with_operand(mut self, operand: impl Into<Operand>) -> Result<Self, IllegalArgument> {
        if self.operands.len() >= 4 {
            return Err(IllegalArgument::BuilderMisuse(
                "an instruction takes at most 4 operands".to_string(),
            ));
        }
        self.operands.push(operand.into());
        Ok(self)
    }

    /// Consumes the builder, producing the finished instruction.
    pub fn build(self) -> Result<Instruction, IllegalArgument> {
        let mnemonic = self
            .mnemonic
            .ok_or_else(|| IllegalArgument::BuilderMisuse("mnemonic was never set".to_string()))?;
        if self.zero_merge && self.mask.is_none() {
            return Err(IllegalArgument::BuilderMisuse(
                "zero-merge flag requires a mask".to_string(),
            ));
        }
        Ok(Instruction {
            legacy_prefix: self.legacy_prefix,
            mnemonic,
            mask: self.mask,
            zero_merge: self.zero_merge,
            operands: self.operands,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::{Register, R64};

    #[test]
    fn build_without_mnemonic_is_builder_misuse() {
        let result = InstructionBuilder::new().build();
        assert!(matches!(result, Err(IllegalArgument::BuilderMisuse(_))));
    }

    #[test]
    fn double_set_mnemonic_is_builder_misuse() {
        let result = InstructionBuilder::new()
            .with_mnemonic(Mnemonic::Nop)
            .unwrap()
            .with_mnemonic(Mnemonic::Ret);
        assert!(matches!(result, Err(IllegalArgument::BuilderMisuse(_))));
    }

    #[test]
    fn zero_merge_without_mask_is_builder_misuse() {
        let result = InstructionBuilder::new()
            .with_mnemonic(Mnemonic::Nop)
            .unwrap()
            .with_zero_merge()
            .build();
        assert!(matches!(result, Err(IllegalArgument::BuilderMisuse(_))));
    }

    #[test]
    fn operands_preserve_positional_order() {
        let instruction = InstructionBuilder::new()
            .with_mnemonic(Mnemonic::Mov)
            .unwrap()
            .with_operand(Register::R64(R64::Rax))
            .unwrap()
            .with_operand(Register::R64(R64::Rbx))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(instruction.operands().len(), 2);
        assert_eq!(
            instruction.operand(0),
            Some(&Operand::Register(Register::R64(R64::Rax)))
        );
    }
}
