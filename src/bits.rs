//! Bit-level primitives shared by the prefix parsers and the ModR/M/SIB decomposition.

use bitvec::order::Lsb0;
use bitvec::view::BitView;

/// Extracts the inclusive-exclusive bit range `start..end` (LSB0, `start` is the
/// lowest bit) from `byte` and returns it right-aligned.
#[must_use]
pub(crate) fn bitfield(byte: u8, start: usize, end: usize) -> u8 {
    assert!(end > start && end <= 8, "bit range out of bounds for u8");
    let bits = byte.view_bits::<Lsb0>();
    let mut value = 0u8;
    for i in (start..end).rev() {
        value = (value << 1) | u8::from(bits[i]);
    }
    value
}
