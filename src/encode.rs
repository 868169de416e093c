//! Turns a structured [`Instruction`] back into bytes.
//!
//! Follows the prefix-emission order: legacy group 1, segment override,
//! address-size override, operand-size override, REX, opcode (with its map-escape
//! byte if any), ModR/M, SIB, displacement, immediate.

use crate::error::IllegalArgument;
use crate::indirect::IndirectOperand;
use crate::instruction::Instruction;
use crate::mnemonic::Mnemonic;
use crate::modrm::{ModRm, Sib};
use crate::operand::Operand;
use crate::prefixes::rex::Rex;
use crate::registers::{GpRegister, Register};

/// An append-only destination for encoded bytes. The core never allocates its own
/// output buffer; callers supply one (a `Vec<u8>`, a pre-sized slice cursor, ...).
pub trait ByteSink {
    fn push(&mut self, byte: u8);

    fn push_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.push(byte);
        }
    }
}

impl ByteSink for Vec<u8> {
    fn push(&mut self, byte: u8) {
        Vec::push(self, byte);
    }
}

/// Encodes `instruction`, appending its bytes to `sink`.
///
/// # Errors
/// [`IllegalArgument::InvalidOperandShape`] if `instruction`'s operands do not match
/// any encoding this mnemonic supports.
pub fn encode_instruction(
    instruction: &Instruction,
    sink: &mut dyn ByteSink,
) -> Result<(), IllegalArgument> {
    if let Some(prefix) = instruction.legacy_prefix() {
        sink.push(prefix.byte());
    }

    let operands = instruction.operands();
    if let Some(memory) = operands.iter().find_map(Operand::as_indirect) {
        if let Some(segment) = memory.segment_override() {
            sink.push(segment.override_prefix_byte());
        }
        if addressing_uses_32_bit_registers(memory) {
            sink.push(0x67);
        }
    }

    match instruction.mnemonic() {
        Mnemonic::Nop => encode_fixed(sink, &[0x90]),
        Mnemonic::Cdqe => encode_fixed(sink, &[0x48, 0x98]),
        Mnemonic::Ret => encode_fixed(sink, &[0xC3]),
        Mnemonic::Leave => encode_fixed(sink, &[0xC9]),
        Mnemonic::Int3 => encode_fixed(sink, &[0xCC]),
        Mnemonic::Ud2 => encode_fixed(sink, &[0x0F, 0x0B]),
        Mnemonic::Endbr64 => encode_fixed(sink, &[0xF3, 0x0F, 0x1E, 0xFA]),
        Mnemonic::Jcc(cc) => encode_jcc(sink, cc, operands),
        Mnemonic::Cmovcc(cc) => {
            encode_reg_rm(sink, 0x0F40 | u16::from(cc.cc()), operands)
        }
        Mnemonic::Call => encode_call_or_jmp(sink, operands, true),
        Mnemonic::Jmp => encode_call_or_jmp(sink, operands, false),
        Mnemonic::Mov => encode_mov(sink, operands),
        Mnemonic::Lea => encode_lea(sink, operands),
        Mnemonic::Arithmetic(op) => encode_arithmetic(sink, op, operands),
        Mnemonic::Test => encode_test(sink, operands),
        Mnemonic::Push => encode_opcode_embedded(sink, 0x50, operands),
        Mnemonic::Pop => encode_opcode_embedded(sink, 0x58, operands),
        Mnemonic::Inc => encode_group_ff(sink, 0, operands),
        Mnemonic::Dec => encode_group_ff(sink, 1, operands),
    }
}

fn encode_fixed(sink: &mut dyn ByteSink, bytes: &[u8]) -> Result<(), IllegalArgument> {
    sink.push_bytes(bytes);
    Ok(())
}

fn require_operand(operands: &[Operand], index: usize) -> Result<&Operand, IllegalArgument> {
    operands.get(index).ok_or_else(|| {
        IllegalArgument::InvalidOperandShape(format!("expected an operand at position {index}"))
    })
}

fn gp_register_of(operand: &Operand) -> Option<GpRegister> {
    match operand {
        Operand::Register(Register::R32(r)) => Some(GpRegister::R32(*r)),
        Operand::Register(Register::R64(r)) => Some(GpRegister::R64(*r)),
        _ => None,
    }
}

fn addressing_uses_32_bit_registers(memory: &IndirectOperand) -> bool {
    memory.base().is_some_and(GpRegister::is_32_bit) || memory.index().is_some_and(GpRegister::is_32_bit)
}

/// The pieces of a synthesized ModR/M + SIB + displacement, ready to append.
struct MemoryEncoding {
    modbits: u8,
    rm: u8,
    sib: Option<u8>,
    displacement: Vec<u8>,
    rex_x: bool,
    rex_b: bool,
}

fn encode_memory_operand(memory: &IndirectOperand) -> Result<MemoryEncoding, IllegalArgument> {
    if memory.is_rip_relative() {
        let disp = memory.displacement().unwrap_or(0);
        return Ok(MemoryEncoding {
            modbits: 0b00,
            rm: 0b101,
            sib: None,
            displacement: disp.to_le_bytes().to_vec(),
            rex_x: false,
            rex_b: false,
        });
    }

    match (memory.base(), memory.index()) {
        (None, None) => Err(IllegalArgument::InvalidOperandShape(
            "indirect operand has neither base nor index".to_string(),
        )),
        (Some(base), None) => {
            let base_low3 = base.to_code() & 0b111;
            let needs_sib_for_rsp_alias = base_low3 == 0b100;
            let is_rbp_alias = base_low3 == 0b101;
            let mut displacement = memory.displacement();
            let mut modbits = displacement_mod_bits(displacement);
            if is_rbp_alias && displacement.is_none() {
                displacement = Some(0);
                modbits = 0b01;
            }
            if needs_sib_for_rsp_alias {
                Ok(MemoryEncoding {
                    modbits,
                    rm: 0b100,
                    sib: Some(Sib {
                        scale_bits: 0b00,
                        index: 0b100,
                        base: base_low3,
                    }.to_byte()),
                    displacement: encode_displacement(displacement, modbits),
                    rex_x: false,
                    rex_b: base.requires_rex_extension(),
                })
            } else {
                Ok(MemoryEncoding {
                    modbits,
                    rm: base_low3,
                    sib: None,
                    displacement: encode_displacement(displacement, modbits),
                    rex_x: false,
                    rex_b: base.requires_rex_extension(),
                })
            }
        }
        (base, Some(index)) => {
            let scale = memory.scale();
            let scale_bits = Sib::from_scale(scale);
            let index_low3 = index.to_code() & 0b111;
            let (base_field, modbits, displacement, rex_b) = match base {
                Some(base) => {
                    let base_low3 = base.to_code() & 0b111;
                    let is_rbp_alias = base_low3 == 0b101;
                    let mut displacement = memory.displacement();
                    let mut modbits = displacement_mod_bits(displacement);
                    if is_rbp_alias && displacement.is_none() {
                        displacement = Some(0);
                        modbits = 0b01;
                    }
                    (base_low3, modbits, displacement, base.requires_rex_extension())
                }
                None => (0b101, 0b00, Some(memory.displacement().unwrap_or(0)), false),
            };
            Ok(MemoryEncoding {
                modbits,
                rm: 0b100,
                sib: Some(Sib {
                    scale_bits,
                    index: index_low3,
                    base: base_field,
                }.to_byte()),
                displacement: encode_displacement(displacement, modbits),
                rex_x: index.requires_rex_extension(),
                rex_b,
            })
        }
    }
}

fn displacement_mod_bits(displacement: Option<i32>) -> u8 {
    match displacement {
        None => 0b00,
        Some(d) if i8::try_from(d).is_ok() => 0b01,
        Some(_) => 0b10,
    }
}

fn encode_displacement(displacement: Option<i32>, modbits: u8) -> Vec<u8> {
    match (displacement, modbits) {
        (None, _) => Vec::new(),
        (Some(d), 0b01) => vec![d as i8 as u8],
        (Some(d), _) => d.to_le_bytes().to_vec(),
    }
}

fn append_modrm_sib_disp(
    sink: &mut dyn ByteSink,
    reg_field: u8,
    rm_operand: &Operand,
) -> Result<(bool, bool), IllegalArgument> {
    match rm_operand {
        Operand::Register(reg) => {
            sink.push(
                ModRm {
                    modbits: 0b11,
                    reg: reg_field,
                    rm: reg.to_code() & 0b111,
                }
                .to_byte(),
            );
            Ok((false, reg.requires_rex_extension()))
        }
        Operand::Indirect(memory) => {
            let encoding = encode_memory_operand(memory)?;
            sink.push(
                ModRm {
                    modbits: encoding.modbits,
                    reg: reg_field,
                    rm: encoding.rm,
                }
                .to_byte(),
            );
            if let Some(sib) = encoding.sib {
                sink.push(sib);
            }
            sink.push_bytes(&encoding.displacement);
            Ok((encoding.rex_x, encoding.rex_b))
        }
        other => Err(IllegalArgument::InvalidOperandShape(format!(
            "{other:?} cannot appear in the r/m position"
        ))),
    }
}

fn emit_rex_if_needed(sink: &mut dyn ByteSink, w: bool, r: bool, x: bool, b: bool) {
    let rex = Rex::new(w, r, x, b);
    if w || r || x || b {
        sink.push(rex.to_byte());
    }
}

fn register_operand(operand: &Operand) -> Result<&Register, IllegalArgument> {
    match operand {
        Operand::Register(r) => Ok(r),
        other => Err(IllegalArgument::InvalidOperandShape(format!(
            "{other:?} is not a register operand"
        ))),
    }
}

fn is_64_bit(register: &Register) -> bool {
    matches!(register, Register::R64(_))
}

fn encode_reg_rm_with_opcode_bytes(
    sink: &mut dyn ByteSink,
    opcode_bytes: &[u8],
    reg_operand: &Operand,
    rm_operand: &Operand,
) -> Result<(), IllegalArgument> {
    let reg = register_operand(reg_operand)?;
    let w = is_64_bit(reg);
    let r = reg.requires_rex_extension();
    let (x, b) = rm_extension_bits(rm_operand)?;
    emit_rex_if_needed(sink, w, r, x, b);
    sink.push_bytes(opcode_bytes);
    append_modrm_sib_disp(sink, reg.to_code() & 0b111, rm_operand)?;
    Ok(())
}

fn rm_extension_bits(rm_operand: &Operand) -> Result<(bool, bool), IllegalArgument> {
    match rm_operand {
        Operand::Register(reg) => Ok((false, reg.requires_rex_extension())),
        Operand::Indirect(memory) => {
            let encoding = encode_memory_operand(memory)?;
            Ok((encoding.rex_x, encoding.rex_b))
        }
        other => Err(IllegalArgument::InvalidOperandShape(format!(
            "{other:?} cannot appear in the r/m position"
        ))),
    }
}

fn encode_reg_rm(
    sink: &mut dyn ByteSink,
    opcode: u16,
    operands: &[Operand],
) -> Result<(), IllegalArgument> {
    let dest = require_operand(operands, 0)?;
    let src = require_operand(operands, 1)?;
    let bytes: Vec<u8> = if opcode > 0xFF {
        vec![0x0F, (opcode & 0xFF) as u8]
    } else {
        vec![opcode as u8]
    };
    encode_reg_rm_with_opcode_bytes(sink, &bytes, dest, src)
}

fn encode_jcc(
    sink: &mut dyn ByteSink,
    cc: crate::mnemonic::ConditionCode,
    operands: &[Operand],
) -> Result<(), IllegalArgument> {
    let target = require_operand(operands, 0)?;
    match target {
        Operand::Relative(rel) if rel.width() == crate::relative::RelativeWidth::Rel8 => {
            sink.push(0x70 + cc.cc());
            sink.push_bytes(&rel.to_le_bytes());
            Ok(())
        }
        Operand::Relative(rel) => {
            sink.push(0x0F);
            sink.push(0x80 + cc.cc());
            sink.push_bytes(&rel.to_le_bytes());
            Ok(())
        }
        other => Err(IllegalArgument::InvalidOperandShape(format!(
            "jcc expects a relative offset operand, got {other:?}"
        ))),
    }
}

fn encode_call_or_jmp(
    sink: &mut dyn ByteSink,
    operands: &[Operand],
    is_call: bool,
) -> Result<(), IllegalArgument> {
    let target = require_operand(operands, 0)?;
    match target {
        Operand::Relative(rel) if is_call => {
            sink.push(0xE8);
            sink.push_bytes(&rel.to_le_bytes());
            Ok(())
        }
        Operand::Relative(rel) if rel.width() == crate::relative::RelativeWidth::Rel8 => {
            sink.push(0xEB);
            sink.push_bytes(&rel.to_le_bytes());
            Ok(())
        }
        Operand::Relative(rel) => {
            sink.push(0xE9);
            sink.push_bytes(&rel.to_le_bytes());
            Ok(())
        }
        rm_operand @ (Operand::Register(_) | Operand::Indirect(_)) => {
            let (x, b) = rm_extension_bits(rm_operand)?;
            emit_rex_if_needed(sink, false, false, x, b);
            sink.push(0xFF);
            let digit = if is_call { 2 } else { 4 };
            append_modrm_sib_disp(sink, digit, rm_operand)?;
            Ok(())
        }
        other => Err(IllegalArgument::InvalidOperandShape(format!(
            "call/jmp target cannot be {other:?}"
        ))),
    }
}

fn encode_mov(sink: &mut dyn ByteSink, operands: &[Operand]) -> Result<(), IllegalArgument> {
    let dest = require_operand(operands, 0)?;
    let src = require_operand(operands, 1)?;
    match (dest, src) {
        (dest, Operand::Register(src_reg)) => {
            let opcode = if matches!(src_reg, Register::R8(_)) {
                0x88
            } else {
                0x89
            };
            encode_reg_rm_with_opcode_bytes(sink, &[opcode], src, dest)
        }
        (Operand::Register(dest_reg), Operand::Indirect(_)) => {
            let opcode = if matches!(dest_reg, Register::R8(_)) {
                0x8A
            } else {
                0x8B
            };
            encode_reg_rm_with_opcode_bytes(sink, &[opcode], dest, src)
        }
        (dest, Operand::Immediate(imm)) => {
            let dest_reg = register_operand(dest)?;
            let (x, b) = rm_extension_bits(dest)?;
            emit_rex_if_needed(sink, is_64_bit(dest_reg), false, x, b);
            sink.push(0xB8 + (dest_reg.to_code() & 0b111));
            sink.push_bytes(&imm.to_le_bytes());
            Ok(())
        }
        _ => Err(IllegalArgument::InvalidOperandShape(
            "unsupported mov operand shape".to_string(),
        )),
    }
}

fn encode_lea(sink: &mut dyn ByteSink, operands: &[Operand]) -> Result<(), IllegalArgument> {
    let dest = require_operand(operands, 0)?;
    let src = require_operand(operands, 1)?;
    if !matches!(src, Operand::Indirect(_)) {
        return Err(IllegalArgument::InvalidOperandShape(
            "lea's second operand must be memory".to_string(),
        ));
    }
    encode_reg_rm_with_opcode_bytes(sink, &[0x8D], dest, src)
}

fn encode_arithmetic(
    sink: &mut dyn ByteSink,
    op: crate::mnemonic::ArithmeticOp,
    operands: &[Operand],
) -> Result<(), IllegalArgument> {
    let dest = require_operand(operands, 0)?;
    let src = require_operand(operands, 1)?;
    match src {
        Operand::Register(src_reg) => {
            let opcode = if matches!(src_reg, Register::R8(_)) {
                op.mr_opcode_8bit()
            } else {
                op.mr_opcode()
            };
            encode_reg_rm_with_opcode_bytes(sink, &[opcode], src, dest)
        }
        Operand::Immediate(imm) => {
            let (x, b) = rm_extension_bits(dest)?;
            let w = gp_register_of_operand_is_64_bit(dest);
            emit_rex_if_needed(sink, w, false, x, b);
            let is_8bit_dest = matches!(dest, Operand::Register(Register::R8(_)));
            let opcode = match (is_8bit_dest, imm.width()) {
                (true, crate::immediate::ImmediateWidth::Byte) => 0x80,
                (true, _) => {
                    return Err(IllegalArgument::InvalidOperandShape(
                        "an 8-bit destination needs an 8-bit immediate".to_string(),
                    ))
                }
                (false, crate::immediate::ImmediateWidth::Byte) => 0x83,
                (false, crate::immediate::ImmediateWidth::Qword) => {
                    return Err(IllegalArgument::InvalidOperandShape(
                        "arithmetic group-1 opcodes have no 64-bit immediate form".to_string(),
                    ))
                }
                (false, _) => 0x81,
            };
            sink.push(opcode);
            append_modrm_sib_disp(sink, op.opcode_extension_digit(), dest)?;
            sink.push_bytes(&imm.to_le_bytes());
            Ok(())
        }
        other => Err(IllegalArgument::InvalidOperandShape(format!(
            "{other:?} cannot be the source of an arithmetic instruction"
        ))),
    }
}

fn gp_register_of_operand_is_64_bit(operand: &Operand) -> bool {
    matches!(operand, Operand::Register(Register::R64(_)))
}

fn encode_test(sink: &mut dyn ByteSink, operands: &[Operand]) -> Result<(), IllegalArgument> {
    let rm = require_operand(operands, 0)?;
    let reg_operand = require_operand(operands, 1)?;
    let reg = register_operand(reg_operand)?;
    let opcode = if matches!(reg, Register::R8(_)) { 0x84 } else { 0x85 };
    encode_reg_rm_with_opcode_bytes(sink, &[opcode], reg_operand, rm)
}

fn encode_opcode_embedded(
    sink: &mut dyn ByteSink,
    base_opcode: u8,
    operands: &[Operand],
) -> Result<(), IllegalArgument> {
    let operand = require_operand(operands, 0)?;
    let register = match operand {
        Operand::Register(Register::R64(r)) => *r,
        other => {
            return Err(IllegalArgument::InvalidOperandShape(format!(
                "expected a 64-bit register, got {other:?}"
            )))
        }
    };
    emit_rex_if_needed(sink, false, false, false, register.requires_rex_extension());
    sink.push(base_opcode + (register.to_code() & 0b111));
    Ok(())
}

fn encode_group_ff(
    sink: &mut dyn ByteSink,
    digit: u8,
    operands: &[Operand],
) -> Result<(), IllegalArgument> {
    let rm = require_operand(operands, 0)?;
    let (x, b) = rm_extension_bits(rm)?;
    let w = gp_register_of_operand_is_64_bit(rm);
    emit_rex_if_needed(sink, w, false, x, b);
    sink.push(0xFF);
    append_modrm_sib_disp(sink, digit, rm)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::immediate::Immediate;
    use crate::indirect::IndirectOperandBuilder;
    use crate::instruction::InstructionBuilder;
    use crate::registers::{R32, R64};

    fn encode(instruction: &Instruction) -> Vec<u8> {
        let mut bytes = Vec::new();
        encode_instruction(instruction, &mut bytes).unwrap();
        bytes
    }

    #[test]
    fn nop() {
        let instr = InstructionBuilder::new()
            .with_mnemonic(Mnemonic::Nop)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(encode(&instr), vec![0x90]);
    }

    #[test]
    fn cdqe() {
        let instr = InstructionBuilder::new()
            .with_mnemonic(Mnemonic::Cdqe)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(encode(&instr), vec![0x48, 0x98]);
    }

    #[test]
    fn endbr64() {
        let instr = InstructionBuilder::new()
            .with_mnemonic(Mnemonic::Endbr64)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(encode(&instr), vec![0xF3, 0x0F, 0x1E, 0xFA]);
    }

    #[test]
    fn jmp_rel8() {
        let instr = InstructionBuilder::new()
            .with_mnemonic(Mnemonic::Jmp)
            .unwrap()
            .with_operand(crate::relative::RelativeOffset::short(5))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(encode(&instr), vec![0xEB, 0x05]);
    }

    #[test]
    fn ja_rel32() {
        let instr = InstructionBuilder::new()
            .with_mnemonic(Mnemonic::Jcc(crate::mnemonic::ConditionCode::A))
            .unwrap()
            .with_operand(crate::relative::RelativeOffset::near(0))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(encode(&instr), vec![0x0F, 0x87, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn mov_rax_rbx() {
        let instr = InstructionBuilder::new()
            .with_mnemonic(Mnemonic::Mov)
            .unwrap()
            .with_operand(Register::R64(R64::Rax))
            .unwrap()
            .with_operand(Register::R64(R64::Rbx))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(encode(&instr), vec![0x48, 0x89, 0xD8]);
    }

    #[test]
    fn lea_rax_rcx_times_4_plus_0x10() {
        let memory = IndirectOperandBuilder::new()
            .with_index(GpRegister::R64(R64::Rcx))
            .unwrap()
            .with_scale(4)
            .unwrap()
            .with_displacement(0x10)
            .unwrap()
            .build()
            .unwrap();
        let instr = InstructionBuilder::new()
            .with_mnemonic(Mnemonic::Lea)
            .unwrap()
            .with_operand(Register::R64(R64::Rax))
            .unwrap()
            .with_operand(memory)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            encode(&instr),
            vec![0x48, 0x8D, 0x04, 0x8D, 0x10, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn mov_eax_esp_indirect_with_address_size_override() {
        let memory = IndirectOperandBuilder::new()
            .with_base(GpRegister::R32(R32::Esp))
            .unwrap()
            .build()
            .unwrap();
        let instr = InstructionBuilder::new()
            .with_mnemonic(Mnemonic::Mov)
            .unwrap()
            .with_operand(Register::R32(R32::Eax))
            .unwrap()
            .with_operand(memory)
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(encode(&instr), vec![0x67, 0x8B, 0x04, 0x24]);
    }

    #[test]
    fn add_reg_dword_imm_uses_full_width_opcode() {
        let instr = InstructionBuilder::new()
            .with_mnemonic(Mnemonic::Arithmetic(crate::mnemonic::ArithmeticOp::Add))
            .unwrap()
            .with_operand(Register::R64(R64::Rax))
            .unwrap()
            .with_operand(Immediate::as_int(1))
            .unwrap()
            .build()
            .unwrap();
        let bytes = encode(&instr);
        assert_eq!(bytes[0], 0x48);
        assert_eq!(bytes[1], 0x81);
    }

    #[test]
    fn add_reg_byte_imm_uses_sign_extended_opcode() {
        let instr = InstructionBuilder::new()
            .with_mnemonic(Mnemonic::Arithmetic(crate::mnemonic::ArithmeticOp::Add))
            .unwrap()
            .with_operand(Register::R64(R64::Rax))
            .unwrap()
            .with_operand(Immediate::as_byte(1))
            .unwrap()
            .build()
            .unwrap();
        let bytes = encode(&instr);
        assert_eq!(bytes[0], 0x48);
        assert_eq!(bytes[1], 0x83);
    }

    #[test]
    fn push_pop_rbp() {
        let push = InstructionBuilder::new()
            .with_mnemonic(Mnemonic::Push)
            .unwrap()
            .with_operand(Register::R64(R64::Rbp))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(encode(&push), vec![0x55]);

        let pop = InstructionBuilder::new()
            .with_mnemonic(Mnemonic::Pop)
            .unwrap()
            .with_operand(Register::R64(R64::Rbp))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(encode(&pop), vec![0x5D]);
    }
}
