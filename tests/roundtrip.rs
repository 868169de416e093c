//! `decode(encode(i)) == i` over instructions the scenario table doesn't already
//! cover, plus a handful of fixed byte sequences decoded and re-encoded the other way.

use x86_64_codec::decode_instruction;
use x86_64_codec::encode::encode_instruction;
use x86_64_codec::indirect::IndirectOperandBuilder;
use x86_64_codec::instruction::InstructionBuilder;
use x86_64_codec::mnemonic::{ArithmeticOp, ConditionCode, Mnemonic};
use x86_64_codec::operand::Operand;
use x86_64_codec::registers::{GpRegister, Register, R64};
use x86_64_codec::relative::RelativeOffset;
use x86_64_codec::Instruction;

fn encode(instruction: &Instruction) -> Vec<u8> {
    let mut bytes = Vec::new();
    encode_instruction(instruction, &mut bytes).unwrap();
    bytes
}

fn assert_round_trips(instruction: Instruction) {
    let bytes = encode(&instruction);
    let (decoded, consumed) = decode_instruction(&bytes).unwrap();
    assert_eq!(consumed, bytes.len());
    assert_eq!(decoded, instruction);
}

#[test]
fn fixed_opcode_instructions_round_trip() {
    for mnemonic in [Mnemonic::Nop, Mnemonic::Ret, Mnemonic::Leave, Mnemonic::Int3, Mnemonic::Ud2] {
        let instr = InstructionBuilder::new().with_mnemonic(mnemonic).unwrap().build().unwrap();
        assert_round_trips(instr);
    }
}

#[test]
fn call_rel32_round_trips() {
    let instr = InstructionBuilder::new()
        .with_mnemonic(Mnemonic::Call)
        .unwrap()
        .with_operand(RelativeOffset::near(-16))
        .unwrap()
        .build()
        .unwrap();
    assert_round_trips(instr);
}

#[test]
fn cmovge_round_trips() {
    let instr = InstructionBuilder::new()
        .with_mnemonic(Mnemonic::Cmovcc(ConditionCode::Ge))
        .unwrap()
        .with_operand(Register::R64(R64::Rax))
        .unwrap()
        .with_operand(Register::R64(R64::R12))
        .unwrap()
        .build()
        .unwrap();
    assert_round_trips(instr);
}

#[test]
fn arithmetic_reg_reg_round_trips_for_every_op() {
    for op in [
        ArithmeticOp::Add,
        ArithmeticOp::Or,
        ArithmeticOp::And,
        ArithmeticOp::Sub,
        ArithmeticOp::Xor,
        ArithmeticOp::Cmp,
    ] {
        let instr = InstructionBuilder::new()
            .with_mnemonic(Mnemonic::Arithmetic(op))
            .unwrap()
            .with_operand(Register::R64(R64::Rbx))
            .unwrap()
            .with_operand(Register::R64(R64::R9))
            .unwrap()
            .build()
            .unwrap();
        assert_round_trips(instr);
    }
}

#[test]
fn arithmetic_reg_imm32_round_trips() {
    let instr = InstructionBuilder::new()
        .with_mnemonic(Mnemonic::Arithmetic(ArithmeticOp::Sub))
        .unwrap()
        .with_operand(Register::R64(R64::Rsp))
        .unwrap()
        .with_operand(x86_64_codec::immediate::Immediate::as_int(0x100))
        .unwrap()
        .build()
        .unwrap();
    assert_round_trips(instr);
}

#[test]
fn test_reg_reg_round_trips() {
    let instr = InstructionBuilder::new()
        .with_mnemonic(Mnemonic::Test)
        .unwrap()
        .with_operand(Register::R64(R64::Rax))
        .unwrap()
        .with_operand(Register::R64(R64::Rax))
        .unwrap()
        .build()
        .unwrap();
    assert_round_trips(instr);
}

#[test]
fn push_and_pop_round_trip_for_extended_registers() {
    for mnemonic in [Mnemonic::Push, Mnemonic::Pop] {
        let instr = InstructionBuilder::new()
            .with_mnemonic(mnemonic)
            .unwrap()
            .with_operand(Register::R64(R64::R13))
            .unwrap()
            .build()
            .unwrap();
        assert_round_trips(instr);
    }
}

#[test]
fn inc_and_dec_memory_round_trip() {
    let memory = IndirectOperandBuilder::new()
        .with_base(GpRegister::R64(R64::Rdi))
        .unwrap()
        .with_displacement(0x20)
        .unwrap()
        .build()
        .unwrap();
    let instr = InstructionBuilder::new()
        .with_mnemonic(Mnemonic::Inc)
        .unwrap()
        .with_operand(memory)
        .unwrap()
        .build()
        .unwrap();
    assert_round_trips(instr);
}

#[test]
fn rsp_base_forces_sib_byte() {
    let memory = IndirectOperandBuilder::new()
        .with_base(GpRegister::R64(R64::Rsp))
        .unwrap()
        .build()
        .unwrap();
    let instr = InstructionBuilder::new()
        .with_mnemonic(Mnemonic::Mov)
        .unwrap()
        .with_operand(Register::R64(R64::Rax))
        .unwrap()
        .with_operand(memory)
        .unwrap()
        .build()
        .unwrap();
    let bytes = encode(&instr);
    assert_eq!(bytes, vec![0x48, 0x8B, 0x04, 0x24]);
    assert_round_trips(instr);
}

#[test]
fn rbp_base_with_no_displacement_gets_forced_disp8_zero() {
    let memory = IndirectOperandBuilder::new()
        .with_base(GpRegister::R64(R64::Rbp))
        .unwrap()
        .build()
        .unwrap();
    let instr = InstructionBuilder::new()
        .with_mnemonic(Mnemonic::Mov)
        .unwrap()
        .with_operand(Register::R64(R64::Rax))
        .unwrap()
        .with_operand(memory)
        .unwrap()
        .build()
        .unwrap();
    let bytes = encode(&instr);
    assert_eq!(bytes, vec![0x48, 0x8B, 0x45, 0x00]);
    let (decoded, _) = decode_instruction(&bytes).unwrap();
    let decoded_memory = decoded.operand(1).and_then(Operand::as_indirect).unwrap();
    assert_eq!(decoded_memory.displacement(), Some(0));
}

#[test]
fn sib_displacement_only_with_no_base_round_trips() {
    let memory = IndirectOperandBuilder::new()
        .with_index(GpRegister::R64(R64::Rdx))
        .unwrap()
        .with_scale(2)
        .unwrap()
        .with_displacement(0x1000)
        .unwrap()
        .build()
        .unwrap();
    let instr = InstructionBuilder::new()
        .with_mnemonic(Mnemonic::Mov)
        .unwrap()
        .with_operand(Register::R64(R64::Rcx))
        .unwrap()
        .with_operand(memory)
        .unwrap()
        .build()
        .unwrap();
    assert_round_trips(instr);
}

#[test]
fn rip_relative_round_trips() {
    let memory = IndirectOperandBuilder::new()
        .with_base(GpRegister::R64(R64::Rip))
        .unwrap()
        .with_displacement(0x123)
        .unwrap()
        .build()
        .unwrap();
    let instr = InstructionBuilder::new()
        .with_mnemonic(Mnemonic::Mov)
        .unwrap()
        .with_operand(Register::R64(R64::Rax))
        .unwrap()
        .with_operand(memory)
        .unwrap()
        .build()
        .unwrap();
    assert_round_trips(instr);
}
