//! Legacy, REX, and VEX/EVEX escape prefixes.

pub mod evex;
pub mod legacy;
pub mod rex;
pub mod vex;

pub use evex::Evex;
pub use legacy::{GroupOnePrefix, LegacyPrefixes};
pub use rex::Rex;
pub use vex::{Vex2, Vex3};

/// The three VEX-class escape prefixes unified into one tag, since most callers care
/// which kind of vector escape is present more often than its exact field layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VexPrefix {
    Vex2(Vex2),
    Vex3(Vex3),
    Evex(Evex),
}

impl VexPrefix {
    /// The `vvvv` field, present and meaning the same thing (an inverted 4-bit
    /// register number) in all three encodings.
    #[must_use]
    pub const fn vvvv(self) -> u8 {
        match self {
            VexPrefix::Vex2(v) => v.vvvv,
            VexPrefix::Vex3(v) => v.vvvv,
            VexPrefix::Evex(v) => v.vvvv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vvvv_reads_through_every_variant() {
        let vex2 = VexPrefix::Vex2(Vex2::new(false, 0b1010, false, 0));
        assert_eq!(vex2.vvvv(), 0b1010);

        let vex3 = VexPrefix::Vex3(Vex3::new(false, false, false, 1, false, 0b0101, false, 0).unwrap());
        assert_eq!(vex3.vvvv(), 0b0101);

        let evex = VexPrefix::Evex(
            Evex::new(false, false, false, false, 0, false, 0b0011, 0, false, false, false, false, true, 0)
                .unwrap(),
        );
        assert_eq!(evex.vvvv(), 0b0011);
    }
}
