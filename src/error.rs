//! Typed decode-time and encode-time failures.
//!
//! `Debug`/`Display`/[`std::error::Error`] are hand-rolled rather than pulled in from a
//! derive-macro crate, for a handful of small, stable enums.

use core::fmt;
use std::error::Error;
use std::fmt::{Debug, Display};

/// A byte offset into the instruction stream being decoded.
pub type BytePosition = usize;

/// Decode-time failures. Never retried by the caller; always carries enough context
/// to report the offending byte(s) and position.
pub enum DecodingException {
    /// The opcode byte sequence has no entry in the mnemonic table.
    UnknownOpcode(Vec<u8>),
    /// Opcode is valid in 32-bit mode but reserved (`#UD`) in 64-bit mode.
    InvalidLegacyOpcode(u8),
    /// Opcode reserved by the ISA (no defined meaning in any mode).
    ReservedOpcode(Vec<u8>),
    /// A prefix-looking byte occurred where that prefix cannot appear.
    UnrecognizedPrefix {
        /// Human-readable prefix family, e.g. `"REX"`.
        kind: &'static str,
        /// Offset of the offending byte.
        position: BytePosition,
    },
    /// A reserved-bit rule on a multi-byte prefix was violated.
    InvalidPrefixField {
        /// Prefix family, e.g. `"EVEX"`.
        prefix: &'static str,
        /// Field name, e.g. `"byte1.bit3"`.
        field: &'static str,
        /// The offending raw value.
        value: u8,
    },
    /// Fewer bytes remained in the stream than the instruction required.
    UnexpectedEndOfStream {
        /// What was being read, e.g. `"ModR/M byte"`.
        expected: &'static str,
        /// Offset at which the stream ran out.
        position: BytePosition,
    },
}

impl Debug for DecodingException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for DecodingException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodingException::UnknownOpcode(bytes) => {
                write!(f, "unknown opcode: {}", format_bytes(bytes))
            }
            DecodingException::InvalidLegacyOpcode(byte) => {
                write!(f, "opcode 0x{byte:02x} is reserved in 64-bit mode")
            }
            DecodingException::ReservedOpcode(bytes) => {
                write!(f, "reserved opcode: {}", format_bytes(bytes))
            }
            DecodingException::UnrecognizedPrefix { kind, position } => {
                write!(f, "{kind} prefix cannot occur at byte offset {position}")
            }
            DecodingException::InvalidPrefixField {
                prefix,
                field,
                value,
            } => {
                write!(
                    f,
                    "{prefix} prefix violates reserved-bit rule on {field}: 0x{value:02x}"
                )
            }
            DecodingException::UnexpectedEndOfStream { expected, position } => {
                write!(f, "expected {expected} at byte offset {position}, but the stream ended")
            }
        }
    }
}

impl Error for DecodingException {}

fn format_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Encode-time failures. Always a programmer error: the caller handed the encoder (or
/// a builder) a shape that cannot be represented.
pub enum IllegalArgument {
    /// A builder field was set twice, `build()` was called twice, or a required field
    /// was missing at `build()` time.
    BuilderMisuse(String),
    /// An encode-time operand shape has no valid encoding (e.g. `scale == 3`).
    InvalidOperandShape(String),
}

impl Debug for IllegalArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for IllegalArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IllegalArgument::BuilderMisuse(message) => write!(f, "builder misuse: {message}"),
            IllegalArgument::InvalidOperandShape(message) => {
                write!(f, "invalid operand shape: {message}")
            }
        }
    }
}

impl Error for IllegalArgument {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_opcode_formats_bytes() {
        let err = DecodingException::UnknownOpcode(vec![0x0f, 0x04]);
        assert_eq!(err.to_string(), "unknown opcode: 0f 04");
    }

    #[test]
    fn builder_misuse_displays_message() {
        let err = IllegalArgument::BuilderMisuse("displacement already set".to_string());
        assert_eq!(
            err.to_string(),
            "builder misuse: displacement already set"
        );
    }
}
