//! Legacy (group 1–4) prefix scanning: LOCK/REP/REPNZ, segment overrides, and the
//! operand-size / address-size override bytes.

use crate::error::DecodingException;
use crate::registers::SegmentRegister;

/// Group 1: the bus-lock and string-repeat prefixes. Mutually exclusive with each
/// other; at most one may precede an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupOnePrefix {
    Lock,
    Repnz,
    Rep,
}

impl GroupOnePrefix {
    #[must_use]
    pub const fn byte(self) -> u8 {
        match self {
            GroupOnePrefix::Lock => 0xF0,
            GroupOnePrefix::Repnz => 0xF2,
            GroupOnePrefix::Rep => 0xF3,
        }
    }

    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0xF0 => Some(GroupOnePrefix::Lock),
            0xF2 => Some(GroupOnePrefix::Repnz),
            0xF3 => Some(GroupOnePrefix::Rep),
            _ => None,
        }
    }

    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            GroupOnePrefix::Lock => "lock",
            GroupOnePrefix::Repnz => "repnz",
            GroupOnePrefix::Rep => "rep",
        }
    }
}

/// The four legacy prefix groups, greedily scanned at most once each. Order in the
/// byte stream is not fixed by the ISA, but this codec always *emits* them in the
/// canonical order documented on [`crate::encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LegacyPrefixes {
    pub group_one: Option<GroupOnePrefix>,
    pub segment_override: Option<SegmentRegister>,
    pub operand_size_override: bool,
    pub address_size_override: bool,
}

impl LegacyPrefixes {
    /// Greedily consumes legacy prefix bytes from the front of `bytes`, returning the
    /// decoded groups and the number of bytes consumed. Never fails: any byte that
    /// does not match a recognized legacy prefix simply ends the scan.
    #[must_use]
    pub fn scan(bytes: &[u8]) -> (Self, usize) {
        let mut prefixes = LegacyPrefixes::default();
        let mut consumed = 0;
        for &byte in bytes {
            if let Some(group1) = GroupOnePrefix::from_byte(byte) {
                prefixes.group_one = Some(group1);
            } else if let Some(segment) = SegmentRegister::from_override_prefix_byte(byte) {
                prefixes.segment_override = Some(segment);
            } else if byte == 0x66 {
                prefixes.operand_size_override = true;
            } else if byte == 0x67 {
                prefixes.address_size_override = true;
            } else {
                break;
            }
            consumed += 1;
        }
        (prefixes, consumed)
    }
}

/// Verifies that a byte claiming to be a particular prefix kind can legally occur at
/// `position` — currently only used to reject a REX byte that is not immediately
/// followed by the opcode (i.e., another legacy-prefix-like byte after it).
pub fn reject_prefix_after_rex(byte: u8, position: usize) -> Result<(), DecodingException> {
    if GroupOnePrefix::from_byte(byte).is_some()
        || SegmentRegister::from_override_prefix_byte(byte).is_some()
        || byte == 0x66
        || byte == 0x67
    {
        return Err(DecodingException::UnrecognizedPrefix {
            kind: "legacy",
            position,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_one_prefix_per_group() {
        let bytes = [0xF3, 0x2E, 0x66, 0x67, 0x90];
        let (prefixes, consumed) = LegacyPrefixes::scan(&bytes);
        assert_eq!(consumed, 4);
        assert_eq!(prefixes.group_one, Some(GroupOnePrefix::Rep));
        assert_eq!(prefixes.segment_override, Some(SegmentRegister::Cs));
        assert!(prefixes.operand_size_override);
        assert!(prefixes.address_size_override);
    }

    #[test]
    fn stops_at_first_non_prefix_byte() {
        let bytes = [0x66, 0x90];
        let (prefixes, consumed) = LegacyPrefixes::scan(&bytes);
        assert_eq!(consumed, 1);
        assert!(prefixes.operand_size_override);
    }

    #[test]
    fn no_prefixes_consumes_nothing() {
        let bytes = [0x90];
        let (_, consumed) = LegacyPrefixes::scan(&bytes);
        assert_eq!(consumed, 0);
    }
}
