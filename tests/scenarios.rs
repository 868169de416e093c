//! Black-box decode/render scenarios: literal bytes in, literal Intel-syntax text out.

use x86_64_codec::decode_instruction;
use x86_64_codec::render_intel;

fn decode_and_render(bytes: &[u8]) -> String {
    let (instruction, consumed) = decode_instruction(bytes).expect("bytes should decode");
    assert_eq!(consumed, bytes.len(), "expected the whole scenario to be consumed");
    render_intel(&instruction)
}

#[test]
fn nop() {
    assert_eq!(decode_and_render(&[0x90]), "nop");
}

#[test]
fn cdqe() {
    assert_eq!(decode_and_render(&[0x48, 0x98]), "cdqe");
}

#[test]
fn endbr64() {
    assert_eq!(decode_and_render(&[0xF3, 0x0F, 0x1E, 0xFA]), "endbr64");
}

#[test]
fn jmp_rel8() {
    assert_eq!(decode_and_render(&[0xEB, 0x05]), "jmp 0x5");
}

#[test]
fn ja_rel32() {
    assert_eq!(
        decode_and_render(&[0x0F, 0x87, 0x00, 0x00, 0x00, 0x00]),
        "ja 0x0"
    );
}

#[test]
fn mov_rax_rbx() {
    assert_eq!(decode_and_render(&[0x48, 0x89, 0xD8]), "mov rax,rbx");
}

#[test]
fn lea_rax_rcx4_plus_16() {
    assert_eq!(
        decode_and_render(&[0x48, 0x8D, 0x04, 0x8D, 0x10, 0x00, 0x00, 0x00]),
        "lea rax,[rcx*4+0x10]"
    );
}

#[test]
fn mov_eax_esp_with_address_size_override() {
    assert_eq!(
        decode_and_render(&[0x67, 0x8B, 0x04, 0x24]),
        "mov eax,DWORD PTR [esp]"
    );
}
