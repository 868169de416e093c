//! Formats a decoded or built [`Instruction`] as Intel-syntax assembly text.

use crate::immediate::ImmediateWidth;
use crate::indirect::{IndirectOperand, PointerSize};
use crate::instruction::Instruction;
use crate::operand::Operand;

/// Renders `instruction` as Intel-syntax assembly text. Total: every well-formed
/// instruction this crate can build or decode has a rendering.
#[must_use]
pub fn render_intel(instruction: &Instruction) -> String {
    let mut out = String::new();
    if let Some(prefix) = instruction.legacy_prefix() {
        out.push_str(prefix.mnemonic());
        out.push(' ');
    }
    out.push_str(&instruction.mnemonic().to_string());

    let operands = instruction.operands();
    if !operands.is_empty() {
        out.push(' ');
        let rendered: Vec<String> = operands
            .iter()
            .enumerate()
            .map(|(index, operand)| render_operand(instruction, operand, index == 0))
            .collect();
        out.push_str(&rendered.join(","));
    }
    out
}

fn render_operand(instruction: &Instruction, operand: &Operand, is_first: bool) -> String {
    let mut rendered = match operand {
        Operand::Indirect(memory) => render_memory(instruction, memory),
        other => other.to_string(),
    };
    if is_first {
        if let Some(mask) = instruction.mask() {
            rendered.push_str(&format!("{{{mask}}}"));
            if instruction.zero_merge() {
                rendered.push_str("{z}");
            }
        }
    }
    rendered
}

fn render_memory(instruction: &Instruction, memory: &IndirectOperand) -> String {
    let address = memory.address_expression();
    if instruction.mnemonic().suppresses_pointer_size_keyword() {
        return address;
    }
    match infer_pointer_size(instruction, memory) {
        Some(size) => format!("{} {address}", size.keyword()),
        None => address,
    }
}

fn infer_pointer_size(instruction: &Instruction, memory: &IndirectOperand) -> Option<PointerSize> {
    if let Some(size) = memory.pointer_size() {
        return Some(size);
    }
    instruction.operands().iter().find_map(|operand| match operand {
        Operand::Register(register) => register.bits().map(pointer_size_from_bits),
        Operand::Immediate(immediate) => Some(pointer_size_from_immediate_width(immediate.width())),
        _ => None,
    })
}

fn pointer_size_from_bits(bits: u32) -> PointerSize {
    match bits {
        8 => PointerSize::Byte,
        16 => PointerSize::Word,
        32 => PointerSize::Dword,
        64 => PointerSize::Qword,
        128 => PointerSize::Xmmword,
        256 => PointerSize::Ymmword,
        512 => PointerSize::Zmmword,
        other => panic!("no SIZE PTR keyword for a {other}-bit register"),
    }
}

fn pointer_size_from_immediate_width(width: ImmediateWidth) -> PointerSize {
    match width {
        ImmediateWidth::Byte => PointerSize::Byte,
        ImmediateWidth::Word => PointerSize::Word,
        ImmediateWidth::Dword => PointerSize::Dword,
        ImmediateWidth::Qword => PointerSize::Qword,
    }
}
