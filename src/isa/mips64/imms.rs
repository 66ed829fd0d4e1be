//! MIPS64 ISA definitions: immediate constants.

/// A signed 16-bit immediate, as used by `daddiu`, loads and stores, and
/// branch displacements.
#[derive(Clone, Copy, Debug)]
pub struct Imm16 {
    /// The value, in range -32768..=32767.
    pub value: i16,
}

impl Imm16 {
    /// Create a signed 16-bit immediate from a full-range value, if possible.
    pub fn maybe_from_i64(value: i64) -> Option<Imm16> {
        if value >= i64::from(i16::MIN) && value <= i64::from(i16::MAX) {
            Some(Imm16 {
                value: value as i16,
            })
        } else {
            None
        }
    }

    /// Bits for the 16-bit immediate field.
    pub fn bits(&self) -> u32 {
        (self.value as u32) & 0xffff
    }
}

/// An unsigned 16-bit immediate, as used by the zero-extending logical
/// immediates `andi`/`ori`/`xori`.
#[derive(Clone, Copy, Debug)]
pub struct UImm16 {
    /// The value.
    pub value: u16,
}

impl UImm16 {
    /// Create an unsigned 16-bit immediate from a full-range value, if
    /// possible.
    pub fn maybe_from_u64(value: u64) -> Option<UImm16> {
        if value <= u64::from(u16::MAX) {
            Some(UImm16 {
                value: value as u16,
            })
        } else {
            None
        }
    }

    /// Bits for the 16-bit immediate field.
    pub fn bits(&self) -> u32 {
        u32::from(self.value)
    }
}

/// A signed 10-bit immediate, as used by MSA `ld.df`/`st.df` (scaled by the
/// element size) and `ldi.df`.
#[derive(Clone, Copy, Debug)]
pub struct SImm10 {
    /// The value, in range -512..=511.
    pub value: i16,
}

impl SImm10 {
    /// Create a signed 10-bit immediate from a full-range value, if possible.
    pub fn maybe_from_i64(value: i64) -> Option<SImm10> {
        if value >= -512 && value <= 511 {
            Some(SImm10 {
                value: value as i16,
            })
        } else {
            None
        }
    }

    /// Bits for the 10-bit immediate field.
    pub fn bits(&self) -> u32 {
        (self.value as u32) & 0x3ff
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn imm16_boundaries() {
        assert_eq!(Imm16::maybe_from_i64(-32768).unwrap().bits(), 0x8000);
        assert_eq!(Imm16::maybe_from_i64(32767).unwrap().bits(), 0x7fff);
        assert!(Imm16::maybe_from_i64(-32769).is_none());
        assert!(Imm16::maybe_from_i64(32768).is_none());
    }

    #[test]
    fn uimm16_boundaries() {
        assert_eq!(UImm16::maybe_from_u64(0xffff).unwrap().bits(), 0xffff);
        assert!(UImm16::maybe_from_u64(0x10000).is_none());
    }

    #[test]
    fn simm10_boundaries() {
        assert_eq!(SImm10::maybe_from_i64(-512).unwrap().bits(), 0x200);
        assert_eq!(SImm10::maybe_from_i64(511).unwrap().bits(), 0x1ff);
        assert!(SImm10::maybe_from_i64(512).is_none());
        assert!(SImm10::maybe_from_i64(-513).is_none());
    }
}
