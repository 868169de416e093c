//! The nine x86-64 register families, and the code\<->register tables that the
//! ModR/M, SIB, and opcode-embedded-register encodings all key off of.
//!
//! Each family is a plain closed `enum`; there is no allocation and no runtime
//! representation beyond the discriminant (see `DESIGN.md`, Open Questions, for why
//! this differs from a const-generic-checked newtype-over-`u8`).

use core::fmt;

/// An 8-bit general-purpose register.
///
/// `Ah`, `Ch`, `Dh`, `Bh` are the legacy high-byte halves. They share their 3-bit
/// encoding with `Spl`/`Bpl`/`Sil`/`Dil`; which meaning a given encoding has depends
/// on whether a REX prefix is present anywhere in the instruction (see
/// [`R8::from_code_legacy`]). Because that disambiguation is external to the register
/// value itself, [`R8::from_code`]/[`R8::to_code`] round-trip only over the 16
/// REX-addressable registers (`Al`..`Dil`, `R8b`..`R15b`); the high-byte quartet is
/// reached exclusively through `from_code_legacy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum R8 {
    Al,
    Cl,
    Dl,
    Bl,
    Spl,
    Bpl,
    Sil,
    Dil,
    R8b,
    R9b,
    R10b,
    R11b,
    R12b,
    R13b,
    R14b,
    R15b,
    Ah,
    Ch,
    Dh,
    Bh,
}

impl R8 {
    /// 3-bit ModR/M-field encoding, ignoring the REX.B/opcode-embedded extension bit.
    #[must_use]
    pub const fn to_code(self) -> u8 {
        match self {
            R8::Al | R8::R8b | R8::Ah => 0,
            R8::Cl | R8::R9b | R8::Ch => 1,
            R8::Dl | R8::R10b | R8::Dh => 2,
            R8::Bl | R8::R11b | R8::Bh => 3,
            R8::Spl | R8::R12b => 4,
            R8::Bpl | R8::R13b => 5,
            R8::Sil | R8::R14b => 6,
            R8::Dil | R8::R15b => 7,
        }
    }

    /// True for `R8b`..`R15b`, which need the REX.B (or opcode-embedded-register)
    /// extension bit set.
    #[must_use]
    pub const fn requires_rex_extension(self) -> bool {
        matches!(
            self,
            R8::R8b | R8::R9b | R8::R10b | R8::R11b | R8::R12b | R8::R13b | R8::R14b | R8::R15b
        )
    }

    /// 8-bit registers never need the EVEX 32-register extension; GPR addressing
    /// tops out at 16 registers (R0..R15).
    #[must_use]
    pub const fn requires_evex_extension(self) -> bool {
        false
    }

    /// Reconstructs a register from its 3-bit code plus the REX.B extension bit,
    /// assuming a REX prefix is present in the instruction (so `4..=7` means
    /// `Spl..Dil`, never the legacy high-byte halves).
    #[must_use]
    pub const fn from_code(code: u8, rex_extension: bool, _evex_extension: bool) -> Self {
        Self::from_code_legacy(code, rex_extension, true)
    }

    /// Reconstructs a register from its 3-bit code, the REX.B extension bit, and
    /// whether any REX prefix is present in the instruction — the flag that decides
    /// whether codes `4..=7` mean `Spl..Dil` (REX present) or `Ah..Bh` (no REX).
    #[must_use]
    pub const fn from_code_legacy(code: u8, rex_extension: bool, rex_present: bool) -> Self {
        if rex_extension {
            return match code {
                0 => R8::R8b,
                1 => R8::R9b,
                2 => R8::R10b,
                3 => R8::R11b,
                4 => R8::R12b,
                5 => R8::R13b,
                6 => R8::R14b,
                7 => R8::R15b,
                _ => unreachable!(),
            };
        }
        match (code, rex_present) {
            (0, _) => R8::Al,
            (1, _) => R8::Cl,
            (2, _) => R8::Dl,
            (3, _) => R8::Bl,
            (4, false) => R8::Ah,
            (4, true) => R8::Spl,
            (5, false) => R8::Ch,
            (5, true) => R8::Bpl,
            (6, false) => R8::Dh,
            (6, true) => R8::Sil,
            (7, false) => R8::Bh,
            (7, true) => R8::Dil,
            _ => unreachable!(),
        }
    }
}

impl fmt::Display for R8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            R8::Al => "al",
            R8::Cl => "cl",
            R8::Dl => "dl",
            R8::Bl => "bl",
            R8::Spl => "spl",
            R8::Bpl => "bpl",
            R8::Sil => "sil",
            R8::Dil => "dil",
            R8::R8b => "r8b",
            R8::R9b => "r9b",
            R8::R10b => "r10b",
            R8::R11b => "r11b",
            R8::R12b => "r12b",
            R8::R13b => "r13b",
            R8::R14b => "r14b",
            R8::R15b => "r15b",
            R8::Ah => "ah",
            R8::Ch => "ch",
            R8::Dh => "dh",
            R8::Bh => "bh",
        };
        f.write_str(name)
    }
}

macro_rules! register_family {
    (
        $(#[$meta:meta])*
        $name:ident, $bits:expr, [$($variant:ident => $code:literal, $text:expr),+ $(,)?]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Declared operand width in bits.
            #[must_use]
            pub const fn bits() -> u32 {
                $bits
            }

            /// 3-bit ModR/M-field encoding, ignoring the REX/EVEX extension bits.
            #[must_use]
            pub const fn to_code(self) -> u8 {
                self.to_code_full() & 0b111
            }

            /// True when this register is outside the low 8 (needs REX.B/R/X, or the
            /// low bit of the EVEX extension when EVEX is present).
            #[must_use]
            pub const fn requires_rex_extension(self) -> bool {
                (self.to_code_full()) & 0b1000 != 0
            }

            /// True when this register is in the upper half of the 32-register EVEX
            /// space (register index 16..31).
            #[must_use]
            pub const fn requires_evex_extension(self) -> bool {
                (self.to_code_full()) & 0b1_0000 != 0
            }

            const fn to_code_full(self) -> u8 {
                match self {
                    $(Self::$variant => $code),+
                }
            }

            /// Reconstructs a register from its 3-bit code and the REX / EVEX
            /// extension bits.
            #[must_use]
            pub const fn from_code(code: u8, rex_extension: bool, evex_extension: bool) -> Self {
                let full = code
                    | ((rex_extension as u8) << 3)
                    | ((evex_extension as u8) << 4);
                match full {
                    $($code => Self::$variant,)+
                    _ => panic!("register code out of range for this family"),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let name = match self {
                    $(Self::$variant => $text),+
                };
                f.write_str(name)
            }
        }
    };
}

register_family!(
    /// A 16-bit general-purpose register.
    R16, 16,
    [
        Ax => 0, "ax", Cx => 1, "cx", Dx => 2, "dx", Bx => 3, "bx",
        Sp => 4, "sp", Bp => 5, "bp", Si => 6, "si", Di => 7, "di",
        R8w => 8, "r8w", R9w => 9, "r9w", R10w => 10, "r10w", R11w => 11, "r11w",
        R12w => 12, "r12w", R13w => 13, "r13w", R14w => 14, "r14w", R15w => 15, "r15w",
    ]
);

register_family!(
    /// A 32-bit general-purpose register, plus the `Eip`/`Eiz` address-only pseudo-registers.
    R32, 32,
    [
        Eax => 0, "eax", Ecx => 1, "ecx", Edx => 2, "edx", Ebx => 3, "ebx",
        Esp => 4, "esp", Ebp => 5, "ebp", Esi => 6, "esi", Edi => 7, "edi",
        R8d => 8, "r8d", R9d => 9, "r9d", R10d => 10, "r10d", R11d => 11, "r11d",
        R12d => 12, "r12d", R13d => 13, "r13d", R14d => 14, "r14d", R15d => 15, "r15d",
        Eip => 16, "eip", Eiz => 20, "eiz",
    ]
);

register_family!(
    /// A 64-bit general-purpose register, plus the `Rip`/`Riz` address-only pseudo-registers.
    R64, 64,
    [
        Rax => 0, "rax", Rcx => 1, "rcx", Rdx => 2, "rdx", Rbx => 3, "rbx",
        Rsp => 4, "rsp", Rbp => 5, "rbp", Rsi => 6, "rsi", Rdi => 7, "rdi",
        R8 => 8, "r8", R9 => 9, "r9", R10 => 10, "r10", R11 => 11, "r11",
        R12 => 12, "r12", R13 => 13, "r13", R14 => 14, "r14", R15 => 15, "r15",
        Rip => 16, "rip", Riz => 20, "riz",
    ]
);

register_family!(
    /// A 64-bit MMX register.
    Mmx, 64,
    [
        Mm0 => 0, "mm0", Mm1 => 1, "mm1", Mm2 => 2, "mm2", Mm3 => 3, "mm3",
        Mm4 => 4, "mm4", Mm5 => 5, "mm5", Mm6 => 6, "mm6", Mm7 => 7, "mm7",
    ]
);

register_family!(
    /// A 128-bit SSE register.
    Xmm, 128,
    [
        Xmm0 => 0, "xmm0", Xmm1 => 1, "xmm1", Xmm2 => 2, "xmm2", Xmm3 => 3, "xmm3",
        Xmm4 => 4, "xmm4", Xmm5 => 5, "xmm5", Xmm6 => 6, "xmm6", Xmm7 => 7, "xmm7",
        Xmm8 => 8, "xmm8", Xmm9 => 9, "xmm9", Xmm10 => 10, "xmm10", Xmm11 => 11, "xmm11",
        Xmm12 => 12, "xmm12", Xmm13 => 13, "xmm13", Xmm14 => 14, "xmm14", Xmm15 => 15, "xmm15",
        Xmm16 => 16, "xmm16", Xmm17 => 17, "xmm17", Xmm18 => 18, "xmm18", Xmm19 => 19, "xmm19",
        Xmm20 => 20, "xmm20", Xmm21 => 21, "xmm21", Xmm22 => 22, "xmm22", Xmm23 => 23, "xmm23",
        Xmm24 => 24, "xmm24", Xmm25 => 25, "xmm25", Xmm26 => 26, "xmm26", Xmm27 => 27, "xmm27",
        Xmm28 => 28, "xmm28", Xmm29 => 29, "xmm29", Xmm30 => 30, "xmm30", Xmm31 => 31, "xmm31",
    ]
);

register_family!(
    /// A 256-bit AVX register.
    Ymm, 256,
    [
        Ymm0 => 0, "ymm0", Ymm1 => 1, "ymm1", Ymm2 => 2, "ymm2", Ymm3 => 3, "ymm3",
        Ymm4 => 4, "ymm4", Ymm5 => 5, "ymm5", Ymm6 => 6, "ymm6", Ymm7 => 7, "ymm7",
        Ymm8 => 8, "ymm8", Ymm9 => 9, "ymm9", Ymm10 => 10, "ymm10", Ymm11 => 11, "ymm11",
        Ymm12 => 12, "ymm12", Ymm13 => 13, "ymm13", Ymm14 => 14, "ymm14", Ymm15 => 15, "ymm15",
        Ymm16 => 16, "ymm16", Ymm17 => 17, "ymm17", Ymm18 => 18, "ymm18", Ymm19 => 19, "ymm19",
        Ymm20 => 20, "ymm20", Ymm21 => 21, "ymm21", Ymm22 => 22, "ymm22", Ymm23 => 23, "ymm23",
        Ymm24 => 24, "ymm24", Ymm25 => 25, "ymm25", Ymm26 => 26, "ymm26", Ymm27 => 27, "ymm27",
        Ymm28 => 28, "ymm28", Ymm29 => 29, "ymm29", Ymm30 => 30, "ymm30", Ymm31 => 31, "ymm31",
    ]
);

register_family!(
    /// A 512-bit AVX-512 register.
    Zmm, 512,
    [
        Zmm0 => 0, "zmm0", Zmm1 => 1, "zmm1", Zmm2 => 2, "zmm2", Zmm3 => 3, "zmm3",
        Zmm4 => 4, "zmm4", Zmm5 => 5, "zmm5", Zmm6 => 6, "zmm6", Zmm7 => 7, "zmm7",
        Zmm8 => 8, "zmm8", Zmm9 => 9, "zmm9", Zmm10 => 10, "zmm10", Zmm11 => 11, "zmm11",
        Zmm12 => 12, "zmm12", Zmm13 => 13, "zmm13", Zmm14 => 14, "zmm14", Zmm15 => 15, "zmm15",
        Zmm16 => 16, "zmm16", Zmm17 => 17, "zmm17", Zmm18 => 18, "zmm18", Zmm19 => 19, "zmm19",
        Zmm20 => 20, "zmm20", Zmm21 => 21, "zmm21", Zmm22 => 22, "zmm22", Zmm23 => 23, "zmm23",
        Zmm24 => 24, "zmm24", Zmm25 => 25, "zmm25", Zmm26 => 26, "zmm26", Zmm27 => 27, "zmm27",
        Zmm28 => 28, "zmm28", Zmm29 => 29, "zmm29", Zmm30 => 30, "zmm30", Zmm31 => 31, "zmm31",
    ]
);

/// An AVX-512 opmask register. `K0` is a reserved encoding meaning "no mask"; it is
/// still a valid operand, just not usable as a *destination* mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaskRegister {
    K0,
    K1,
    K2,
    K3,
    K4,
    K5,
    K6,
    K7,
}

impl MaskRegister {
    #[must_use]
    pub const fn to_code(self) -> u8 {
        match self {
            MaskRegister::K0 => 0,
            MaskRegister::K1 => 1,
            MaskRegister::K2 => 2,
            MaskRegister::K3 => 3,
            MaskRegister::K4 => 4,
            MaskRegister::K5 => 5,
            MaskRegister::K6 => 6,
            MaskRegister::K7 => 7,
        }
    }

    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => MaskRegister::K0,
            1 => MaskRegister::K1,
            2 => MaskRegister::K2,
            3 => MaskRegister::K3,
            4 => MaskRegister::K4,
            5 => MaskRegister::K5,
            6 => MaskRegister::K6,
            7 => MaskRegister::K7,
            _ => panic!("mask register code must be 0..=7"),
        }
    }

    /// Mask registers have no defined bit width; callers that ask for one get an error.
    ///
    /// # Errors
    /// Always returns `Err`.
    pub const fn bits(self) -> Result<u32, MaskRegisterBitsError> {
        Err(MaskRegisterBitsError)
    }

    /// Whether this mask selects "no mask" when used as a destination mask.
    #[must_use]
    pub const fn is_no_mask(self) -> bool {
        matches!(self, MaskRegister::K0)
    }
}

/// Raised by [`MaskRegister::bits`]: mask registers have no defined bit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskRegisterBitsError;

impl fmt::Display for MaskRegisterBitsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("mask registers have no defined bit width")
    }
}

impl std::error::Error for MaskRegisterBitsError {}

impl fmt::Display for MaskRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "k{}", self.to_code())
    }
}

/// A segment register override, pairing the 16-bit segment selector with the
/// general-purpose register that implements it on this platform (e.g. `fs`/`gs` read
/// their base from `FS.base`/`GS.base`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentRegister {
    Es,
    Cs,
    Ss,
    Ds,
    Fs,
    Gs,
}

impl SegmentRegister {
    #[must_use]
    pub const fn to_code(self) -> u8 {
        match self {
            SegmentRegister::Es => 0,
            SegmentRegister::Cs => 1,
            SegmentRegister::Ss => 2,
            SegmentRegister::Ds => 3,
            SegmentRegister::Fs => 4,
            SegmentRegister::Gs => 5,
        }
    }

    #[must_use]
    pub const fn from_code(code: u8) -> Self {
        match code {
            0 => SegmentRegister::Es,
            1 => SegmentRegister::Cs,
            2 => SegmentRegister::Ss,
            3 => SegmentRegister::Ds,
            4 => SegmentRegister::Fs,
            5 => SegmentRegister::Gs,
            _ => panic!("segment register code must be 0..=5"),
        }
    }

    /// The single-byte legacy override prefix for this segment.
    #[must_use]
    pub const fn override_prefix_byte(self) -> u8 {
        match self {
            SegmentRegister::Es => 0x26,
            SegmentRegister::Cs => 0x2E,
            SegmentRegister::Ss => 0x36,
            SegmentRegister::Ds => 0x3E,
            SegmentRegister::Fs => 0x64,
            SegmentRegister::Gs => 0x65,
        }
    }

    #[must_use]
    pub const fn from_override_prefix_byte(byte: u8) -> Option<Self> {
        match byte {
            0x26 => Some(SegmentRegister::Es),
            0x2E => Some(SegmentRegister::Cs),
            0x36 => Some(SegmentRegister::Ss),
            0x3E => Some(SegmentRegister::Ds),
            0x64 => Some(SegmentRegister::Fs),
            0x65 => Some(SegmentRegister::Gs),
            _ => None,
        }
    }
}

impl fmt::Display for SegmentRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SegmentRegister::Es => "es",
            SegmentRegister::Cs => "cs",
            SegmentRegister::Ss => "ss",
            SegmentRegister::Ds => "ds",
            SegmentRegister::Fs => "fs",
            SegmentRegister::Gs => "gs",
        };
        f.write_str(name)
    }
}

/// Any general-purpose register width, used where an indirect operand's `base`/`index`
/// needs to carry either 32-bit or 64-bit addressing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpRegister {
    R32(R32),
    R64(R64),
}

impl GpRegister {
    #[must_use]
    pub const fn to_code(self) -> u8 {
        match self {
            GpRegister::R32(r) => r.to_code(),
            GpRegister::R64(r) => r.to_code(),
        }
    }

    #[must_use]
    pub const fn requires_rex_extension(self) -> bool {
        match self {
            GpRegister::R32(r) => r.requires_rex_extension(),
            GpRegister::R64(r) => r.requires_rex_extension(),
        }
    }

    #[must_use]
    pub const fn is_32_bit(self) -> bool {
        matches!(self, GpRegister::R32(_))
    }
}

impl fmt::Display for GpRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpRegister::R32(r) => fmt::Display::fmt(r, f),
            GpRegister::R64(r) => fmt::Display::fmt(r, f),
        }
    }
}

/// Any single register, closed over the eight addressable families plus segment
/// registers. This is the type [`crate::operand::Operand::Register`] carries; mask
/// registers have their own `Operand::Mask` variant since they can never appear where
/// a general operand register can.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    R8(R8),
    R16(R16),
    R32(R32),
    R64(R64),
    Mmx(Mmx),
    Xmm(Xmm),
    Ymm(Ymm),
    Zmm(Zmm),
    Segment(SegmentRegister),
}

impl Register {
    /// Operand width in bits, where one is defined (segment registers have none).
    #[must_use]
    pub const fn bits(self) -> Option<u32> {
        match self {
            Register::R8(_) => Some(8),
            Register::R16(_) => Some(R16::bits()),
            Register::R32(_) => Some(R32::bits()),
            Register::R64(_) => Some(R64::bits()),
            Register::Mmx(_) => Some(Mmx::bits()),
            Register::Xmm(_) => Some(Xmm::bits()),
            Register::Ymm(_) => Some(Ymm::bits()),
            Register::Zmm(_) => Some(Zmm::bits()),
            Register::Segment(_) => None,
        }
    }

    #[must_use]
    pub const fn to_code(self) -> u8 {
        match self {
            Register::R8(r) => r.to_code(),
            Register::R16(r) => r.to_code(),
            Register::R32(r) => r.to_code(),
            Register::R64(r) => r.to_code(),
            Register::Mmx(r) => r.to_code(),
            Register::Xmm(r) => r.to_code(),
            Register::Ymm(r) => r.to_code(),
            Register::Zmm(r) => r.to_code(),
            Register::Segment(r) => r.to_code(),
        }
    }

    #[must_use]
    pub const fn requires_rex_extension(self) -> bool {
        match self {
            Register::R8(r) => r.requires_rex_extension(),
            Register::R16(r) => r.requires_rex_extension(),
            Register::R32(r) => r.requires_rex_extension(),
            Register::R64(r) => r.requires_rex_extension(),
            Register::Mmx(r) => r.requires_rex_extension(),
            Register::Xmm(r) => r.requires_rex_extension(),
            Register::Ymm(r) => r.requires_rex_extension(),
            Register::Zmm(r) => r.requires_rex_extension(),
            Register::Segment(_) => false,
        }
    }

    #[must_use]
    pub const fn requires_evex_extension(self) -> bool {
        match self {
            Register::R8(r) => r.requires_evex_extension(),
            Register::R16(r) => r.requires_evex_extension(),
            Register::R32(r) => r.requires_evex_extension(),
            Register::R64(r) => r.requires_evex_extension(),
            Register::Mmx(r) => r.requires_evex_extension(),
            Register::Xmm(r) => r.requires_evex_extension(),
            Register::Ymm(r) => r.requires_evex_extension(),
            Register::Zmm(r) => r.requires_evex_extension(),
            Register::Segment(_) => false,
        }
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Register::R8(r) => fmt::Display::fmt(r, f),
            Register::R16(r) => fmt::Display::fmt(r, f),
            Register::R32(r) => fmt::Display::fmt(r, f),
            Register::R64(r) => fmt::Display::fmt(r, f),
            Register::Mmx(r) => fmt::Display::fmt(r, f),
            Register::Xmm(r) => fmt::Display::fmt(r, f),
            Register::Ymm(r) => fmt::Display::fmt(r, f),
            Register::Zmm(r) => fmt::Display::fmt(r, f),
            Register::Segment(r) => fmt::Display::fmt(r, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn r8_round_trip_over_rex_addressable_set() {
        let all = [
            R8::Al, R8::Cl, R8::Dl, R8::Bl, R8::Spl, R8::Bpl, R8::Sil, R8::Dil, R8::R8b, R8::R9b,
            R8::R10b, R8::R11b, R8::R12b, R8::R13b, R8::R14b, R8::R15b,
        ];
        for r in all {
            let code = r.to_code();
            let rex_ext = r.requires_rex_extension();
            assert_eq!(R8::from_code(code, rex_ext, false), r);
        }
    }

    #[test]
    fn r8_legacy_high_byte_needs_no_rex_flag() {
        assert_eq!(R8::from_code_legacy(4, false, false), R8::Ah);
        assert_eq!(R8::from_code_legacy(4, false, true), R8::Spl);
        assert_eq!(R8::from_code_legacy(7, false, false), R8::Bh);
    }

    #[test]
    fn r64_round_trip_including_pseudo_registers() {
        for code in 0u8..=20u8 {
            if (17..20).contains(&code) {
                continue; // unassigned codes between Rip (16) and Riz (20)
            }
            let rex_ext = code & 0b1000 != 0;
            let evex_ext = code & 0b1_0000 != 0;
            let r = R64::from_code(code & 0b111, rex_ext, evex_ext);
            assert_eq!(r.to_code_full(), code);
        }
    }

    #[test]
    fn xmm_reaches_all_32_registers_via_evex() {
        let r = Xmm::from_code(0b111, true, true);
        assert_eq!(r, Xmm::Xmm31);
        assert!(r.requires_rex_extension());
        assert!(r.requires_evex_extension());
    }

    #[test]
    fn mask_register_bits_is_an_error() {
        assert!(MaskRegister::K3.bits().is_err());
    }

    #[test]
    fn mask_register_k0_is_no_mask() {
        assert!(MaskRegister::K0.is_no_mask());
        assert!(!MaskRegister::K1.is_no_mask());
    }

    #[test]
    fn segment_override_prefix_round_trip() {
        for seg in [
            SegmentRegister::Es,
            SegmentRegister::Cs,
            SegmentRegister::Ss,
            SegmentRegister::Ds,
            SegmentRegister::Fs,
            SegmentRegister::Gs,
        ] {
            let byte = seg.override_prefix_byte();
            assert_eq!(SegmentRegister::from_override_prefix_byte(byte), Some(seg));
        }
    }

    #[test]
    fn display_matches_intel_syntax_lowercase_names() {
        assert_eq!(R64::Rax.to_string(), "rax");
        assert_eq!(R32::Eiz.to_string(), "eiz");
        assert_eq!(Xmm::Xmm9.to_string(), "xmm9");
        assert_eq!(MaskRegister::K4.to_string(), "k4");
    }
}
