//! `[base + index*scale + disp]` memory operands, and the single-use builder that
//! assembles them.

use core::fmt;

use crate::error::IllegalArgument;
use crate::registers::{GpRegister, SegmentRegister};

/// The operand-size keyword a renderer prefixes an indirect operand with
/// (`BYTE PTR`, `DWORD PTR`, ...) when the size cannot be inferred from a register
/// operand elsewhere in the instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerSize {
    Byte,
    Word,
    Dword,
    Qword,
    Xmmword,
    Ymmword,
    Zmmword,
}

impl PointerSize {
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            PointerSize::Byte => "BYTE PTR",
            PointerSize::Word => "WORD PTR",
            PointerSize::Dword => "DWORD PTR",
            PointerSize::Qword => "QWORD PTR",
            PointerSize::Xmmword => "XMMWORD PTR",
            PointerSize::Ymmword => "YMMWORD PTR",
            PointerSize::Zmmword => "ZMMWORD PTR",
        }
    }
}

/// A memory operand: `[segment:base + index*scale + disp]`, every part optional
/// except that at least one of `base`, `index`, or `displacement` must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndirectOperand {
    base: Option<GpRegister>,
    index: Option<GpRegister>,
    scale: u8,
    displacement: Option<i32>,
    segment_override: Option<SegmentRegister>,
    pointer_size: Option<PointerSize>,
}

impl IndirectOperand {
    #[must_use]
    pub const fn base(&self) -> Option<GpRegister> {
        self.base
    }

    #[must_use]
    pub const fn index(&self) -> Option<GpRegister> {
        self.index
    }

    #[must_use]
    pub const fn scale(&self) -> u8 {
        self.scale
    }

    #[must_use]
    pub const fn displacement(&self) -> Option<i32> {
        self.displacement
    }

    #[must_use]
    pub const fn segment_override(&self) -> Option<SegmentRegister> {
        self.segment_override
    }

    #[must_use]
    pub const fn pointer_size(&self) -> Option<PointerSize> {
        self.pointer_size
    }

    /// True when `base` addresses through `RIP`/`EIP`, which the ModR/M synthesizer
    /// must encode as `mod=00, rm=101` with no SIB byte and no real base register.
    #[must_use]
    pub fn is_rip_relative(&self) -> bool {
        matches!(
            self.base,
            Some(GpRegister::R64(crate::registers::R64::Rip))
                | Some(GpRegister::R32(crate::registers::R32::Eip))
        )
    }
}

/// Assembles an [`IndirectOperand`] field by field. Each setter consumes and returns
/// `self`; calling the same setter twice, or calling [`build`](Self::build) with no
/// addressing component set at all, is a [`IllegalArgument::BuilderMisuse`].
#[derive(Debug, Default)]
pub struct IndirectOperandBuilder {
    base: Option<GpRegister>,
    index: Option<GpRegister>,
    scale: Option<u8>,
    displacement: Option<i32>,
    segment_override: Option<SegmentRegister>,
    pointer_size: Option<PointerSize>,
}

impl IndirectOperandBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(mut self, base: GpRegister) -> Result<Self, IllegalArgument> {
        if self.base.is_some() {
            return Err(IllegalArgument::BuilderMisuse(
                "base already set".to_string(),
            ));
        }
        self.base = Some(base);
        Ok(self)
    }

    pub fn with_index(mut self, index: GpRegister) -> Result<Self, IllegalArgument> {
        if self.index.is_some() {
            return Err(IllegalArgument::BuilderMisuse(
                "index already set".to_string(),
            ));
        }
        self.index = Some(index);
        Ok(self)
    }

    pub fn with_scale(mut self, scale: u8) -> Result<Self, IllegalArgument> {
        if self.scale.is_some() {
            return Err(IllegalArgument::BuilderMisuse(
                "scale already set".to_string(),
            ));
        }
        if !matches!(scale, 1 | 2 | 4 | 8) {
            return Err(IllegalArgument::InvalidOperandShape(format!(
                "scale must be 1, 2, 4, or 8, got {scale}"
            )));
        }
        self.scale = Some(scale);
        Ok(self)
    }

    pub fn with_displacement(mut self, displacement: i32) -> Result<Self, IllegalArgument> {
        if self.displacement.is_some() {
            return Err(IllegalArgument::BuilderMisuse(
                "displacement already set".to_string(),
            ));
        }
        self.displacement = Some(displacement);
        Ok(self)
    }

    pub fn with_segment_override(mut self, segment: SegmentRegister) -> Result<Self, IllegalArgument> {
        if self.segment_override.is_some() {
            return Err(IllegalArgument::BuilderMisuse(
                "segment override already set".to_string(),
            ));
        }
        self.segment_override = Some(segment);
        Ok(self)
    }

    pub fn with_pointer_size(mut self, size: PointerSize) -> Result<Self, IllegalArgument> {
        if self.pointer_size.is_some() {
            return Err(IllegalArgument::BuilderMisuse(
                "pointer size already set".to_string(),
            ));
        }
        self.pointer_size = Some(size);
        Ok(self)
    }

    /// Consumes the builder, producing the finished operand.
    pub fn build(self) -> Result<IndirectOperand, IllegalArgument> {
        if self.base.is_none() && self.index.is_none() && self.displacement.is_none() {
            return Err(IllegalArgument::BuilderMisuse(
                "indirect operand needs at least one of base, index, or displacement".to_string(),
            ));
        }
        if self.index.is_some() && self.scale.is_none() {
            return Err(IllegalArgument::BuilderMisuse(
                "index was set without a scale".to_string(),
            ));
        }
        Ok(IndirectOperand {
            base: self.base,
            index: self.index,
            scale: self.scale.unwrap_or(1),
            displacement: self.displacement,
            segment_override: self.segment_override,
            pointer_size: self.pointer_size,
        })
    }
}

impl IndirectOperand {
    /// Renders the `seg:[base+index*scale±disp]` address expression, without the
    /// `SIZE PTR` keyword — the renderer decides that part, since it may need to infer
    /// the size from a sibling operand rather than this operand's own `pointer_size`.
    fn fmt_address(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(segment) = self.segment_override {
            write!(f, "{segment}:")?;
        }
        f.write_str("[")?;
        let mut wrote_term = false;
        if let Some(base) = self.base {
            write!(f, "{base}")?;
            wrote_term = true;
        }
        if let Some(index) = self.index {
            if wrote_term {
                f.write_str("+")?;
            }
            write!(f, "{index}")?;
            if self.scale != 1 {
                write!(f, "*{}", self.scale)?;
            }
            wrote_term = true;
        }
        if let Some(disp) = self.displacement {
            if disp < 0 {
                write!(f, "-0x{:x}", -i64::from(disp))?;
            } else if wrote_term {
                write!(f, "+0x{disp:x}")?;
            } else {
                write!(f, "0x{disp:x}")?;
            }
        }
        f.write_str("]")
    }

    /// The address expression alone (no `SIZE PTR` keyword), for callers like
    /// [`crate::render`] that compute the keyword themselves from sibling operands.
    #[must_use]
    pub fn address_expression(&self) -> String {
        struct Wrapper<'a>(&'a IndirectOperand);
        impl fmt::Display for Wrapper<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt_address(f)
            }
        }
        Wrapper(self).to_string()
    }
}

impl fmt::Display for IndirectOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(size) = self.pointer_size {
            write!(f, "{} ", size.keyword())?;
        }
        self.fmt_address(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::R64;

    #[test]
    fn double_set_base_is_builder_misuse() {
        let result = IndirectOperandBuilder::new()
            .with_base(GpRegister::R64(R64::Rax))
            .unwrap()
            .with_base(GpRegister::R64(R64::Rbx));
        assert!(matches!(result, Err(IllegalArgument::BuilderMisuse(_))));
    }

    #[test]
    fn build_with_nothing_set_is_builder_misuse() {
        let result = IndirectOperandBuilder::new().build();
        assert!(matches!(result, Err(IllegalArgument::BuilderMisuse(_))));
    }

    #[test]
    fn invalid_scale_is_invalid_operand_shape() {
        let result = IndirectOperandBuilder::new().with_scale(3);
        assert!(matches!(
            result,
            Err(IllegalArgument::InvalidOperandShape(_))
        ));
    }

    #[test]
    fn renders_base_index_scale_displacement() {
        let operand = IndirectOperandBuilder::new()
            .with_base(GpRegister::R64(R64::Rax))
            .unwrap()
            .with_index(GpRegister::R64(R64::Rcx))
            .unwrap()
            .with_scale(4)
            .unwrap()
            .with_displacement(8)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(operand.to_string(), "[rax+rcx*4+0x8]");
    }

    #[test]
    fn displacement_only_renders_without_brackets_collision() {
        let operand = IndirectOperandBuilder::new()
            .with_displacement(0x1000)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(operand.to_string(), "[0x1000]");
    }

    #[test]
    fn rip_relative_is_detected() {
        let operand = IndirectOperandBuilder::new()
            .with_base(GpRegister::R64(R64::Rip))
            .unwrap()
            .with_displacement(0x10)
            .unwrap()
            .build()
            .unwrap();
        assert!(operand.is_rip_relative());
    }
}
