//! PowerPC64 ISA definitions: immediate constants.

/// A signed 16-bit immediate, as used by `addi` and D-form memory accesses.
#[derive(Clone, Copy, Debug)]
pub struct SImm16 {
    /// The value, in range -32768..=32767.
    pub value: i16,
}

impl SImm16 {
    /// Create a signed 16-bit immediate from a full-range value, if possible.
    pub fn maybe_from_i64(value: i64) -> Option<SImm16> {
        if value >= i64::from(i16::MIN) && value <= i64::from(i16::MAX) {
            Some(SImm16 {
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

/// An unsigned 16-bit immediate, as used by `ori`/`xori`/`andi.`.
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

/// A DQ-form byte offset: signed 16-bit, 16-byte aligned, as used by the
/// ISA 3.0 `lxv`/`stxv` encodings.
#[derive(Clone, Copy, Debug)]
pub struct DqOffset {
    /// The value; always a multiple of 16.
    pub value: i16,
}

impl DqOffset {
    /// Create a DQ-form offset from a full-range byte offset, if possible.
    pub fn maybe_from_i64(value: i64) -> Option<DqOffset> {
        if value % 16 == 0 && value >= i64::from(i16::MIN) && value <= i64::from(i16::MAX) {
            Some(DqOffset {
                value: value as i16,
            })
        } else {
            None
        }
    }

    /// Bits for the instruction's offset field (bits 15..4).
    pub fn bits(&self) -> u32 {
        (self.value as u32) & 0xfff0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn simm16_boundaries() {
        assert_eq!(SImm16::maybe_from_i64(-32768).unwrap().bits(), 0x8000);
        assert!(SImm16::maybe_from_i64(32768).is_none());
    }

    #[test]
    fn dq_offset_respects_alignment() {
        assert_eq!(DqOffset::maybe_from_i64(32).unwrap().bits(), 0x20);
        assert_eq!(DqOffset::maybe_from_i64(-16).unwrap().bits(), 0xfff0);
        assert!(DqOffset::maybe_from_i64(8).is_none());
        assert!(DqOffset::maybe_from_i64(32768).is_none());
    }
}
