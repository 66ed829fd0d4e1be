//! AArch64 ISA definitions: immediate constants.

use crate::machinst::OperandSize;

/// An unsigned 12-bit immediate for arithmetic instructions, with an
/// optional left shift by 12.
#[derive(Copy, Clone, Debug)]
pub struct Imm12 {
    /// The immediate bits.
    pub bits: u16,
    /// Whether the immediate bits are shifted left by 12 or not.
    pub shift12: bool,
}

impl Imm12 {
    /// Compute an Imm12 from a raw value, if possible.
    pub fn maybe_from_u64(val: u64) -> Option<Imm12> {
        if val < 0x1000 {
            Some(Imm12 {
                bits: val as u16,
                shift12: false,
            })
        } else if val < 0x100_0000 && (val & 0xfff) == 0 {
            Some(Imm12 {
                bits: (val >> 12) as u16,
                shift12: true,
            })
        } else {
            None
        }
    }

    /// Bits for the 2-bit "shift" field of the instruction.
    pub fn shift_bits(&self) -> u32 {
        if self.shift12 {
            0b01
        } else {
            0b00
        }
    }

    /// Bits for the 12-bit "imm12" field of the instruction.
    pub fn imm_bits(&self) -> u32 {
        self.bits as u32
    }
}

/// A signed 9-bit immediate byte offset, as used by unscaled load/store
/// addressing.
#[derive(Clone, Copy, Debug)]
pub struct SImm9 {
    /// The value, in range -256..=255.
    pub value: i16,
}

impl SImm9 {
    /// Create a signed 9-bit offset from a full-range value, if possible.
    pub fn maybe_from_i64(value: i64) -> Option<SImm9> {
        if value >= -256 && value <= 255 {
            Some(SImm9 {
                value: value as i16,
            })
        } else {
            None
        }
    }

    /// Bits for encoding.
    pub fn bits(&self) -> u32 {
        (self.value as u32) & 0x1ff
    }
}

/// An unsigned, scaled 12-bit offset, as used by register-offset load/store
/// addressing. The encoded value is the byte offset divided by the access
/// size, which must divide it exactly.
#[derive(Clone, Copy, Debug)]
pub struct UImm12Scaled {
    /// The value, already scaled down: `byte_offset / scale`.
    value: u16,
    /// The access size in bytes the value is scaled by.
    scale: u32,
}

impl UImm12Scaled {
    /// Create a UImm12Scaled from a raw byte offset and the access size it
    /// will be used with, if possible.
    pub fn maybe_from_i64(value: i64, scale: u32) -> Option<UImm12Scaled> {
        let scale = i64::from(scale);
        if value >= 0 && value <= 4095 * scale && value % scale == 0 {
            Some(UImm12Scaled {
                value: (value / scale) as u16,
                scale: scale as u32,
            })
        } else {
            None
        }
    }

    /// A zero offset at the given scale.
    pub fn zero(scale: u32) -> UImm12Scaled {
        UImm12Scaled { value: 0, scale }
    }

    /// The scale this offset was created for.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Bits for encoding (the scaled value).
    pub fn bits(&self) -> u32 {
        self.value as u32
    }
}

/// A 16-bit immediate with an aligned left shift of 0, 16, 32 or 48 bits,
/// for the move-wide family (`movz`/`movn`/`movk`).
#[derive(Clone, Copy, Debug)]
pub struct MoveWideConst {
    /// The 16-bit payload.
    pub bits: u16,
    /// The half-word position, 0..=3.
    pub shift: u8,
}

impl MoveWideConst {
    /// Construct a MoveWideConst from an arbitrary 64-bit constant if
    /// exactly one half-word is nonzero (the `movz` shape).
    pub fn maybe_from_u64(value: u64) -> Option<MoveWideConst> {
        let mask0 = 0x0000_0000_0000_ffffu64;
        let mask1 = 0x0000_0000_ffff_0000u64;
        let mask2 = 0x0000_ffff_0000_0000u64;
        let mask3 = 0xffff_0000_0000_0000u64;

        if value == (value & mask0) {
            return Some(MoveWideConst {
                bits: (value & mask0) as u16,
                shift: 0,
            });
        }
        if value == (value & mask1) {
            return Some(MoveWideConst {
                bits: ((value >> 16) & mask0) as u16,
                shift: 1,
            });
        }
        if value == (value & mask2) {
            return Some(MoveWideConst {
                bits: ((value >> 32) & mask0) as u16,
                shift: 2,
            });
        }
        if value == (value & mask3) {
            return Some(MoveWideConst {
                bits: ((value >> 48) & mask0) as u16,
                shift: 3,
            });
        }
        None
    }

    /// The half-word for a `movk` at the given position.
    pub fn from_halfword(halfword: u16, shift: u8) -> MoveWideConst {
        debug_assert!(shift <= 3);
        MoveWideConst {
            bits: halfword,
            shift,
        }
    }
}

/// A logical-instruction immediate in the "N:immr:imms" bit-pattern form:
/// a run of ones, rotated, replicated across equal-sized elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImmLogic {
    /// `N` flag (element size 64).
    n: bool,
    /// `R` field: rotate amount.
    r: u8,
    /// `S` field: element size and run length.
    s: u8,
}

impl ImmLogic {
    /// Compute an ImmLogic from a raw value and operand size, if the value
    /// has a representable bit pattern. All-zero and all-ones values are not
    /// representable.
    pub fn maybe_from_u64(original: u64, size: OperandSize) -> Option<ImmLogic> {
        let value = match size {
            OperandSize::Size32 => {
                if original > u64::from(u32::MAX) {
                    return None;
                }
                let v = original as u32 as u64;
                v | (v << 32)
            }
            OperandSize::Size64 => original,
        };
        if value == 0 || value == u64::MAX {
            return None;
        }

        // Find the smallest element size at which the pattern repeats.
        let mut esize: u32 = 64;
        while esize > 2 {
            let half = esize / 2;
            let mask = (1u64 << half) - 1;
            if (value & mask) != ((value >> half) & mask) {
                break;
            }
            esize = half;
        }
        let emask = if esize == 64 {
            u64::MAX
        } else {
            (1u64 << esize) - 1
        };
        let elem = value & emask;

        // The element must be a rotated contiguous run of ones.
        let ones = elem.count_ones();
        debug_assert!(ones > 0 && ones < esize);
        let run = (1u64 << ones) - 1;
        let mut rotation = None;
        for r in 0..esize {
            let rot = if r == 0 {
                run
            } else {
                ((run >> r) | (run << (esize - r))) & emask
            };
            if rot == elem {
                rotation = Some(r);
                break;
            }
        }
        let r = rotation?;

        let prefix = 0x3f & !(2 * esize - 1);
        Some(ImmLogic {
            n: esize == 64,
            r: r as u8,
            s: (prefix | (ones - 1)) as u8,
        })
    }

    /// Bits for the 13-bit "N:immr:imms" field, positioned at bit 10.
    pub fn enc_bits(&self) -> u32 {
        ((self.n as u32) << 12) | (u32::from(self.r) << 6) | u32::from(self.s)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn imm12_boundaries() {
        assert!(Imm12::maybe_from_u64(0).is_some());
        assert!(Imm12::maybe_from_u64(4095).is_some());
        let shifted = Imm12::maybe_from_u64(4096).unwrap();
        assert!(shifted.shift12);
        assert_eq!(shifted.bits, 1);
        assert!(Imm12::maybe_from_u64(4097).is_none());
        assert!(Imm12::maybe_from_u64(0xfff << 12).is_some());
        assert!(Imm12::maybe_from_u64(0x1000 << 12).is_none());
    }

    #[test]
    fn simm9_boundaries() {
        assert_eq!(SImm9::maybe_from_i64(-256).unwrap().bits(), 0x100);
        assert_eq!(SImm9::maybe_from_i64(255).unwrap().bits(), 0xff);
        assert!(SImm9::maybe_from_i64(-257).is_none());
        assert!(SImm9::maybe_from_i64(256).is_none());
    }

    #[test]
    fn uimm12_scaled_respects_alignment() {
        assert!(UImm12Scaled::maybe_from_i64(32760, 8).is_some());
        assert!(UImm12Scaled::maybe_from_i64(32761, 8).is_none());
        assert!(UImm12Scaled::maybe_from_i64(4, 8).is_none());
        assert!(UImm12Scaled::maybe_from_i64(-8, 8).is_none());
        assert_eq!(UImm12Scaled::maybe_from_i64(32, 16).unwrap().bits(), 2);
    }

    #[test]
    fn move_wide_shapes() {
        let c = MoveWideConst::maybe_from_u64(0xffff).unwrap();
        assert_eq!((c.bits, c.shift), (0xffff, 0));
        let c = MoveWideConst::maybe_from_u64(0x1234_0000_0000).unwrap();
        assert_eq!((c.bits, c.shift), (0x1234, 2));
        assert!(MoveWideConst::maybe_from_u64(0x1_0001).is_none());
    }

    #[test]
    fn imm_logic_known_encodings() {
        // and x, x, #0xff: N=1, immr=0, imms=0b000111.
        let l = ImmLogic::maybe_from_u64(0xff, OperandSize::Size64).unwrap();
        assert_eq!(l.enc_bits(), (1 << 12) | 0b000111);
        // Two-bit run at bit 22: N=1, immr=42, imms=1.
        let l = ImmLogic::maybe_from_u64(0x3 << 22, OperandSize::Size64).unwrap();
        assert_eq!(l.enc_bits(), (1 << 12) | (42 << 6) | 1);
        // Repeating byte pattern 0x55..55: esize 2, ones 1.
        let l = ImmLogic::maybe_from_u64(0x5555_5555_5555_5555, OperandSize::Size64).unwrap();
        assert_eq!(l.enc_bits(), 0b111100);
        // Not a rotated run.
        assert!(ImmLogic::maybe_from_u64(0x1234, OperandSize::Size64).is_none());
        assert!(ImmLogic::maybe_from_u64(0, OperandSize::Size64).is_none());
        assert!(ImmLogic::maybe_from_u64(u64::MAX, OperandSize::Size64).is_none());
    }
}
