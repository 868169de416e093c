//! An x86-64 instruction codec: decode raw bytes into a structured [`Instruction`],
//! build one from scratch with [`InstructionBuilder`], re-encode it, and render it as
//! Intel-syntax assembly text.
//!
//! The core is a pure, I/O-free, single-threaded transformation pipeline with no
//! hidden global state: [`decode::decode_instruction`] and [`encode::encode_instruction`]
//! are formal inverses of each other over the opcode catalogue this crate covers, and
//! [`render::render_intel`] is a third, independent view of the same structured value.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod decode;
pub mod encode;
pub mod error;
pub mod immediate;
pub mod indirect;
pub mod instruction;
pub mod mnemonic;
pub mod operand;
pub mod prefixes;
pub mod registers;
pub mod relative;
pub mod render;
pub mod segmented;

pub(crate) mod bits;
pub(crate) mod modrm;

pub use decode::decode_instruction;
pub use encode::{encode_instruction, ByteSink};
pub use error::{DecodingException, IllegalArgument};
pub use instruction::{Instruction, InstructionBuilder};
pub use operand::Operand;
pub use render::render_intel;
