//! Decodes raw bytes back into a structured [`Instruction`] — the formal inverse of
//! [`crate::encode::encode_instruction`].

use crate::error::DecodingException;
use crate::immediate::Immediate;
use crate::indirect::{IndirectOperand, IndirectOperandBuilder};
use crate::instruction::{Instruction, InstructionBuilder};
use crate::mnemonic::{ArithmeticOp, ConditionCode, Mnemonic};
use crate::modrm::{ModRm, Sib};
use crate::operand::Operand;
use crate::prefixes::legacy::reject_prefix_after_rex;
use crate::prefixes::rex::Rex;
use crate::prefixes::LegacyPrefixes;
use crate::registers::{GpRegister, SegmentRegister, R32, R64};
use crate::relative::RelativeOffset;

/// Decodes one instruction starting at offset 0 of `bytes`.
///
/// # Errors
/// [`DecodingException`] if the prefix, opcode, or operand bytes do not form a
/// recognized instruction.
pub fn decode_instruction(bytes: &[u8]) -> Result<(Instruction, usize), DecodingException> {
    // ENDBR64's leading 0xF3 is a real opcode byte here, not the REP group-1 prefix it
    // would otherwise be read as — the generic legacy-prefix scan must not see it.
    if bytes.starts_with(&[0xF3, 0x0F, 0x1E, 0xFA]) {
        let instruction = InstructionBuilder::new()
            .with_mnemonic(Mnemonic::Endbr64)
            .and_then(InstructionBuilder::build)
            .expect("a fixed-opcode instruction with no operands always builds");
        return Ok((instruction, 4));
    }

    let mut cursor = Cursor::new(bytes);

    let (legacy, legacy_len) = LegacyPrefixes::scan(bytes);
    cursor.advance(legacy_len);

    let rex = match cursor.peek()? {
        byte if (0x40..=0x4F).contains(&byte) => {
            cursor.advance(1);
            reject_prefix_after_rex(cursor.peek()?, cursor.position())?;
            Rex::from_byte(byte)
        }
        _ => None,
    };

    let opcode = cursor.read_u8("opcode")?;
    let mut builder = InstructionBuilder::new();
    if let Some(group1) = legacy.group_one {
        builder = builder
            .with_legacy_prefix(group1)
            .expect("freshly constructed builder has no legacy prefix set yet");
    }

    let (mnemonic, operands) = decode_opcode(
        opcode,
        rex,
        &mut cursor,
        legacy.address_size_override,
        legacy.segment_override,
    )?;
    builder = builder
        .with_mnemonic(mnemonic)
        .expect("freshly constructed builder has no mnemonic set yet");
    for operand in operands {
        builder = builder
            .with_operand(operand)
            .expect("an opcode table entry never produces more than 4 operands");
    }
    let instruction = builder
        .build()
        .expect("decode_opcode always pairs a mnemonic with a matching operand shape");
    Ok((instruction, cursor.position()))
}

struct Cursor<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Cursor { bytes, position: 0 }
    }

    fn position(&self) -> usize {
        self.position
    }

    fn advance(&mut self, n: usize) {
        self.position += n;
    }

    fn peek(&self) -> Result<u8, DecodingException> {
        self.bytes
            .get(self.position)
            .copied()
            .ok_or(DecodingException::UnexpectedEndOfStream {
                expected: "another instruction byte",
                position: self.position,
            })
    }

    fn read_u8(&mut self, expected: &'static str) -> Result<u8, DecodingException> {
        let byte = self
            .bytes
            .get(self.position)
            .copied()
            .ok_or(DecodingException::UnexpectedEndOfStream {
                expected,
                position: self.position,
            })?;
        self.position += 1;
        Ok(byte)
    }

    fn read_bytes(&mut self, n: usize, expected: &'static str) -> Result<&'a [u8], DecodingException> {
        let end = self.position + n;
        let slice = self
            .bytes
            .get(self.position..end)
            .ok_or(DecodingException::UnexpectedEndOfStream {
                expected,
                position: self.position,
            })?;
        self.position = end;
        Ok(slice)
    }
}

fn decode_opcode(
    opcode: u8,
    rex: Option<Rex>,
    cursor: &mut Cursor<'_>,
    addr32: bool,
    segment: Option<SegmentRegister>,
) -> Result<(Mnemonic, Vec<Operand>), DecodingException> {
    match opcode {
        0x90 => Ok((Mnemonic::Nop, vec![])),
        0xC3 => Ok((Mnemonic::Ret, vec![])),
        0xC9 => Ok((Mnemonic::Leave, vec![])),
        0xCC => Ok((Mnemonic::Int3, vec![])),
        // The `0x48` REX.W byte is already consumed by the generic REX scan above;
        // what distinguishes CDQE from a REX.W-prefixed instruction using opcode 0x98
        // is that no other mnemonic in this table uses 0x98.
        0x98 if rex.is_some_and(|r| r.w) => Ok((Mnemonic::Cdqe, vec![])),
        0x0F => decode_0f_opcode(rex, cursor, addr32, segment),
        0x70..=0x7F => {
            let cc = ConditionCode::from_cc(opcode - 0x70)
                .ok_or_else(|| DecodingException::UnknownOpcode(vec![opcode]))?;
            let rel = cursor.read_u8("rel8")? as i8;
            Ok((
                Mnemonic::Jcc(cc),
                vec![Operand::Relative(RelativeOffset::short(rel))],
            ))
        }
        0xEB => {
            let rel = cursor.read_u8("rel8")? as i8;
            Ok((Mnemonic::Jmp, vec![Operand::Relative(RelativeOffset::short(rel))]))
        }
        0xE9 => {
            let rel = read_i32(cursor, "rel32")?;
            Ok((Mnemonic::Jmp, vec![Operand::Relative(RelativeOffset::near(rel))]))
        }
        0xE8 => {
            let rel = read_i32(cursor, "rel32")?;
            Ok((Mnemonic::Call, vec![Operand::Relative(RelativeOffset::near(rel))]))
        }
        0xFF => decode_group_ff(rex, cursor, addr32, segment),
        0x50..=0x57 => Ok((
            Mnemonic::Push,
            vec![Operand::Register(decode_gp_register(
                opcode - 0x50,
                rex.is_some_and(|r| r.b),
                false,
            ))],
        )),
        0x58..=0x5F => Ok((
            Mnemonic::Pop,
            vec![Operand::Register(decode_gp_register(
                opcode - 0x58,
                rex.is_some_and(|r| r.b),
                false,
            ))],
        )),
        0x89 => decode_mr(rex, cursor, addr32, segment, Mnemonic::Mov, false),
        0x88 => decode_mr(rex, cursor, addr32, segment, Mnemonic::Mov, true),
        0x8B => decode_rm(rex, cursor, addr32, segment, Mnemonic::Mov, false),
        0x8A => decode_rm(rex, cursor, addr32, segment, Mnemonic::Mov, true),
        0x8D => decode_rm(rex, cursor, addr32, segment, Mnemonic::Lea, false),
        0x85 => decode_mr(rex, cursor, addr32, segment, Mnemonic::Test, false),
        0x84 => decode_mr(rex, cursor, addr32, segment, Mnemonic::Test, true),
        0x80 | 0x81 | 0x83 => decode_group1_immediate(opcode, rex, cursor, addr32, segment),
        _ => decode_arithmetic_mr(opcode, rex, cursor, addr32, segment)
            .ok_or_else(|| DecodingException::UnknownOpcode(vec![opcode]))?,
    }
}

fn decode_0f_opcode(
    rex: Option<Rex>,
    cursor: &mut Cursor<'_>,
    addr32: bool,
    segment: Option<SegmentRegister>,
) -> Result<(Mnemonic, Vec<Operand>), DecodingException> {
    let second = cursor.read_u8("0F opcode second byte")?;
    match second {
        0x0B => Ok((Mnemonic::Ud2, vec![])),
        0x80..=0x8F => {
            let cc = ConditionCode::from_cc(second - 0x80)
                .ok_or_else(|| DecodingException::UnknownOpcode(vec![0x0F, second]))?;
            let rel = read_i32(cursor, "rel32")?;
            Ok((
                Mnemonic::Jcc(cc),
                vec![Operand::Relative(RelativeOffset::near(rel))],
            ))
        }
        0x40..=0x4F => {
            let cc = ConditionCode::from_cc(second - 0x40)
                .ok_or_else(|| DecodingException::UnknownOpcode(vec![0x0F, second]))?;
            let (_, operands) = decode_rm(rex, cursor, addr32, segment, Mnemonic::Cmovcc(cc), false)?;
            Ok((Mnemonic::Cmovcc(cc), operands))
        }
        _ => Err(DecodingException::UnknownOpcode(vec![0x0F, second])),
    }
}

fn read_i32(cursor: &mut Cursor<'_>, expected: &'static str) -> Result<i32, DecodingException> {
    let bytes = cursor.read_bytes(4, expected)?;
    Ok(i32::from_le_bytes(bytes.try_into().unwrap()))
}

fn decode_gp_register(code: u8, rex_extension: bool, is_32_bit: bool) -> crate::registers::Register {
    if is_32_bit {
        crate::registers::Register::R32(R32::from_code(code, rex_extension, false))
    } else {
        crate::registers::Register::R64(R64::from_code(code, rex_extension, false))
    }
}

fn decode_reg_rm_operands(
    rex: Option<Rex>,
    cursor: &mut Cursor<'_>,
    addr32: bool,
    segment: Option<SegmentRegister>,
    is_8bit: bool,
) -> Result<(Operand, Operand), DecodingException> {
    let modrm_byte = cursor.read_u8("ModR/M byte")?;
    let modrm = ModRm::from_byte(modrm_byte);
    let rex = rex.unwrap_or_default();
    let reg_operand = decode_register_field(modrm.reg, rex.r, is_8bit, rex.w);
    let rm_operand = if modrm.is_register_direct() {
        Operand::Register(decode_register_field(modrm.rm, rex.b, is_8bit, rex.w))
    } else {
        Operand::Indirect(decode_memory(modrm, Some(rex), cursor, addr32, segment)?)
    };
    Ok((Operand::Register(reg_operand), rm_operand))
}

fn decode_register_field(code: u8, rex_extension: bool, is_8bit: bool, rex_w: bool) -> crate::registers::Register {
    use crate::registers::{Register, R8};
    if is_8bit {
        Register::R8(R8::from_code(code, rex_extension, false))
    } else if rex_w {
        Register::R64(R64::from_code(code, rex_extension, false))
    } else {
        Register::R32(R32::from_code(code, rex_extension, false))
    }
}

/// MR form: opcode `/r`, `rm` is the destination, `reg` is the source.
fn decode_mr(
    rex: Option<Rex>,
    cursor: &mut Cursor<'_>,
    addr32: bool,
    segment: Option<SegmentRegister>,
    mnemonic: Mnemonic,
    is_8bit: bool,
) -> Result<(Mnemonic, Vec<Operand>), DecodingException> {
    let (reg_operand, rm_operand) = decode_reg_rm_operands(rex, cursor, addr32, segment, is_8bit)?;
    Ok((mnemonic, vec![rm_operand, reg_operand]))
}

/// RM form: opcode `/r`, `reg` is the destination, `rm` is the source.
fn decode_rm(
    rex: Option<Rex>,
    cursor: &mut Cursor<'_>,
    addr32: bool,
    segment: Option<SegmentRegister>,
    mnemonic: Mnemonic,
    is_8bit: bool,
) -> Result<(Mnemonic, Vec<Operand>), DecodingException> {
    let (reg_operand, rm_operand) = decode_reg_rm_operands(rex, cursor, addr32, segment, is_8bit)?;
    Ok((mnemonic, vec![reg_operand, rm_operand]))
}

fn decode_arithmetic_mr(
    opcode: u8,
    rex: Option<Rex>,
    cursor: &mut Cursor<'_>,
    addr32: bool,
    segment: Option<SegmentRegister>,
) -> Option<Result<(Mnemonic, Vec<Operand>), DecodingException>> {
    for op in [
        ArithmeticOp::Add,
        ArithmeticOp::Or,
        ArithmeticOp::And,
        ArithmeticOp::Sub,
        ArithmeticOp::Xor,
        ArithmeticOp::Cmp,
    ] {
        if opcode == op.mr_opcode() {
            return Some(decode_mr(rex, cursor, addr32, segment, Mnemonic::Arithmetic(op), false));
        }
        if opcode == op.mr_opcode_8bit() {
            return Some(decode_mr(rex, cursor, addr32, segment, Mnemonic::Arithmetic(op), true));
        }
    }
    None
}

fn decode_group1_immediate(
    opcode: u8,
    rex: Option<Rex>,
    cursor: &mut Cursor<'_>,
    addr32: bool,
    segment: Option<SegmentRegister>,
) -> Result<(Mnemonic, Vec<Operand>), DecodingException> {
    let modrm_byte = cursor.read_u8("ModR/M byte")?;
    let modrm = ModRm::from_byte(modrm_byte);
    let rex = rex.unwrap_or_default();
    let is_8bit = opcode == 0x80;
    let rm_operand = if modrm.is_register_direct() {
        Operand::Register(decode_register_field(modrm.rm, rex.b, is_8bit, rex.w))
    } else {
        Operand::Indirect(decode_memory(modrm, Some(rex), cursor, addr32, segment)?)
    };
    let op = arithmetic_op_from_digit(modrm.reg)
        .ok_or_else(|| DecodingException::UnknownOpcode(vec![opcode, modrm_byte]))?;
    let immediate = match opcode {
        0x80 => Immediate::as_byte(cursor.read_u8("imm8")? as i8),
        0x83 => Immediate::as_byte(cursor.read_u8("imm8")? as i8),
        _ => Immediate::as_int(read_i32(cursor, "imm32")?),
    };
    Ok((Mnemonic::Arithmetic(op), vec![rm_operand, Operand::Immediate(immediate)]))
}

fn arithmetic_op_from_digit(digit: u8) -> Option<ArithmeticOp> {
    match digit {
        0 => Some(ArithmeticOp::Add),
        1 => Some(ArithmeticOp::Or),
        4 => Some(ArithmeticOp::And),
        5 => Some(ArithmeticOp::Sub),
        6 => Some(ArithmeticOp::Xor),
        7 => Some(ArithmeticOp::Cmp),
        _ => None,
    }
}

fn decode_group_ff(
    rex: Option<Rex>,
    cursor: &mut Cursor<'_>,
    addr32: bool,
    segment: Option<SegmentRegister>,
) -> Result<(Mnemonic, Vec<Operand>), DecodingException> {
    let modrm_byte = cursor.read_u8("ModR/M byte")?;
    let modrm = ModRm::from_byte(modrm_byte);
    let rex = rex.unwrap_or_default();
    let rm_operand = if modrm.is_register_direct() {
        Operand::Register(decode_register_field(modrm.rm, rex.b, false, rex.w))
    } else {
        Operand::Indirect(decode_memory(modrm, Some(rex), cursor, addr32, segment)?)
    };
    match modrm.reg {
        0 => Ok((Mnemonic::Inc, vec![rm_operand])),
        1 => Ok((Mnemonic::Dec, vec![rm_operand])),
        2 => Ok((Mnemonic::Call, vec![rm_operand])),
        4 => Ok((Mnemonic::Jmp, vec![rm_operand])),
        other => Err(DecodingException::UnknownOpcode(vec![0xFF, (other << 3) | modrm.rm])),
    }
}

/// The ModR/M + SIB decomposition always produces a well-formed addressing shape
/// (a scale straight from a 2-bit field is always 1/2/4/8, a base or displacement is
/// always present), so the [`IndirectOperandBuilder`] calls below cannot fail; any
/// `Err` here would mean [`ModRm`]/[`Sib`] decomposition itself is broken.
fn decode_memory(
    modrm: ModRm,
    rex: Option<Rex>,
    cursor: &mut Cursor<'_>,
    addr32: bool,
    segment: Option<SegmentRegister>,
) -> Result<IndirectOperand, DecodingException> {
    let rex = rex.unwrap_or_default();
    let gp = |code: u8, ext: bool| -> GpRegister {
        if addr32 {
            GpRegister::R32(R32::from_code(code, ext, false))
        } else {
            GpRegister::R64(R64::from_code(code, ext, false))
        }
    };
    let expect_msg = "ModR/M and SIB decomposition always produces a valid addressing shape";

    let mut builder = IndirectOperandBuilder::new();
    if let Some(segment) = segment {
        builder = builder.with_segment_override(segment).expect(expect_msg);
    }

    if modrm.is_rip_relative() {
        let disp = read_i32(cursor, "rip-relative disp32")?;
        builder = builder
            .with_base(if addr32 {
                GpRegister::R32(R32::Eip)
            } else {
                GpRegister::R64(R64::Rip)
            })
            .expect(expect_msg);
        builder = builder.with_displacement(disp).expect(expect_msg);
        return Ok(builder.build().expect(expect_msg));
    }

    if modrm.needs_sib() {
        let sib_byte = cursor.read_u8("SIB byte")?;
        let sib = Sib::from_byte(sib_byte);
        if !sib.has_no_index() {
            builder = builder.with_index(gp(sib.index, rex.x)).expect(expect_msg);
            builder = builder.with_scale(sib.scale()).expect(expect_msg);
        }
        if sib.has_no_base() && modrm.modbits == 0b00 {
            let disp = read_i32(cursor, "SIB disp32")?;
            builder = builder.with_displacement(disp).expect(expect_msg);
        } else {
            builder = builder.with_base(gp(sib.base, rex.b)).expect(expect_msg);
            if let Some(disp) = read_modrm_displacement(modrm.modbits, cursor)? {
                builder = builder.with_displacement(disp).expect(expect_msg);
            }
        }
        return Ok(builder.build().expect(expect_msg));
    }

    builder = builder.with_base(gp(modrm.rm, rex.b)).expect(expect_msg);
    if let Some(disp) = read_modrm_displacement(modrm.modbits, cursor)? {
        builder = builder.with_displacement(disp).expect(expect_msg);
    }
    Ok(builder.build().expect(expect_msg))
}

fn read_modrm_displacement(modbits: u8, cursor: &mut Cursor<'_>) -> Result<Option<i32>, DecodingException> {
    match modbits {
        0b00 => Ok(None),
        0b01 => Ok(Some(i32::from(cursor.read_u8("disp8")? as i8))),
        0b10 => Ok(Some(read_i32(cursor, "disp32")?)),
        _ => Ok(None),
    }
}
