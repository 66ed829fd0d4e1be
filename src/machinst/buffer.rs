//! In-memory code buffer and label fixups.
//!
//! The buffer is an append-only sequence of bytes holding emitted opcode
//! words, together with a simple one-pass label scheme: a branch to a
//! not-yet-bound label records a fixup, and all fixups are patched when the
//! buffer is finalized. A fixup whose branch form cannot reach its label
//! fails finalization with `CodeTooLarge`; there is no veneer insertion or
//! branch relaxation here.

use crate::error::{CodegenError, CodegenResult};

/// A code offset in bytes from the start of the buffer.
pub type CodeOffset = u32;

/// A label refers to a position in emitted code: a potential branch target.
///
/// Labels are created with [`CodeBuffer::get_label`] and bound to an offset
/// with [`CodeBuffer::bind_label`]; branches may reference a label before it
/// is bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MachLabel(u32);

impl MachLabel {
    /// Get the label's index.
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Byte order of emitted opcode words.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

/// A use of a label by a branch word, with the target-specific bit-field
/// layout and reach of the branch's offset field.
///
/// Each target backend emits its branch words with a zero offset field and
/// records one of these; patching ORs the PC-relative offset, masked to the
/// field width, into the recorded word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelUse {
    /// AArch64 19-bit conditional-branch offset (`b.cond`, `cbz`/`cbnz`),
    /// word-scaled, relative to the branch word. +/-1MB.
    A64Branch19,
    /// AArch64 26-bit unconditional-branch offset (`b`), word-scaled,
    /// relative to the branch word. +/-128MB.
    A64Branch26,
    /// MIPS 16-bit branch offset (`beq`/`bne`), word-scaled, relative to the
    /// instruction after the branch (the delay slot). +/-128KB.
    MipsBranch16,
    /// MIPS R6 26-bit compact-branch offset (`bc`), word-scaled, relative to
    /// the instruction after the branch. +/-128MB.
    MipsBranch26,
    /// PowerPC 14-bit conditional-branch displacement (`bc`), byte
    /// displacement in bits 15..2, relative to the branch word. +/-32KB.
    PpcBranch14,
    /// PowerPC 24-bit branch displacement (`b`), byte displacement in bits
    /// 25..2, relative to the branch word. +/-32MB.
    PpcBranch24,
}

impl LabelUse {
    /// Maximum PC-relative distance to the label, forward.
    pub fn max_pos_range(self) -> i64 {
        match self {
            LabelUse::A64Branch19 => (1 << 20) - 4,
            LabelUse::A64Branch26 => (1 << 27) - 4,
            LabelUse::MipsBranch16 => (1 << 17) - 4,
            LabelUse::MipsBranch26 => (1 << 27) - 4,
            LabelUse::PpcBranch14 => (1 << 15) - 4,
            LabelUse::PpcBranch24 => (1 << 25) - 4,
        }
    }

    /// Maximum PC-relative distance to the label, backward.
    pub fn max_neg_range(self) -> i64 {
        self.max_pos_range() + 4
    }

    /// The PC the offset field is relative to: the branch word itself, or
    /// the following word for MIPS branches (the delay / forbidden slot).
    fn base_offset(self, use_offset: CodeOffset) -> CodeOffset {
        match self {
            LabelUse::A64Branch19
            | LabelUse::A64Branch26
            | LabelUse::PpcBranch14
            | LabelUse::PpcBranch24 => use_offset,
            LabelUse::MipsBranch16 | LabelUse::MipsBranch26 => use_offset + 4,
        }
    }

    /// Patch the offset field of the branch word `insn`, emitted at
    /// `use_offset`, to reach `label_offset`.
    pub fn patch(
        self,
        insn: u32,
        use_offset: CodeOffset,
        label_offset: CodeOffset,
    ) -> CodegenResult<u32> {
        let delta = i64::from(label_offset) - i64::from(self.base_offset(use_offset));
        debug_assert_eq!(delta & 3, 0);
        if delta > self.max_pos_range() || delta < -self.max_neg_range() {
            return Err(CodegenError::CodeTooLarge);
        }
        let delta = delta as u32;
        let patched = match self {
            LabelUse::A64Branch19 => insn | (((delta >> 2) & 0x7ffff) << 5),
            LabelUse::A64Branch26 => insn | ((delta >> 2) & 0x03ff_ffff),
            LabelUse::MipsBranch16 => insn | ((delta >> 2) & 0xffff),
            LabelUse::MipsBranch26 => insn | ((delta >> 2) & 0x03ff_ffff),
            LabelUse::PpcBranch14 => insn | (delta & 0xfffc),
            LabelUse::PpcBranch24 => insn | (delta & 0x03ff_fffc),
        };
        Ok(patched)
    }
}

/// A fixup to perform on the buffer once code is emitted: patch the word at
/// `offset` to refer to `label`.
#[derive(Clone, Copy, Debug)]
struct MachLabelFixup {
    label: MachLabel,
    offset: CodeOffset,
    kind: LabelUse,
}

/// The code stream: an append-only byte buffer of emitted machine code,
/// owned exclusively by one translation session.
pub struct CodeBuffer {
    data: Vec<u8>,
    endianness: Endianness,
    label_offsets: Vec<Option<CodeOffset>>,
    fixups: Vec<MachLabelFixup>,
}

impl CodeBuffer {
    /// Create a new, empty code buffer emitting words in the given byte
    /// order.
    pub fn new(endianness: Endianness) -> CodeBuffer {
        CodeBuffer {
            data: vec![],
            endianness,
            label_offsets: vec![],
            fixups: vec![],
        }
    }

    /// Current offset from the start of the buffer.
    pub fn cur_offset(&self) -> CodeOffset {
        self.data.len() as CodeOffset
    }

    /// Add a 32-bit opcode word.
    pub fn put4(&mut self, value: u32) {
        let bytes = match self.endianness {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        self.data.extend_from_slice(&bytes);
    }

    /// Read back the 32-bit word at `offset`. Used by fixup patching and by
    /// tests that inspect emitted words.
    pub fn get4(&self, offset: CodeOffset) -> u32 {
        let offset = offset as usize;
        let bytes = <[u8; 4]>::try_from(&self.data[offset..offset + 4]).unwrap();
        match self.endianness {
            Endianness::Little => u32::from_le_bytes(bytes),
            Endianness::Big => u32::from_be_bytes(bytes),
        }
    }

    fn set4(&mut self, offset: CodeOffset, value: u32) {
        let bytes = match self.endianness {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        self.data[offset as usize..offset as usize + 4].copy_from_slice(&bytes);
    }

    /// Reserve and return a new label.
    pub fn get_label(&mut self) -> MachLabel {
        let l = self.label_offsets.len() as u32;
        self.label_offsets.push(None);
        MachLabel(l)
    }

    /// Bind a label to the current offset.
    pub fn bind_label(&mut self, label: MachLabel) {
        log::trace!(
            "CodeBuffer: bind label {:?} at offset {}",
            label,
            self.cur_offset()
        );
        let slot = &mut self.label_offsets[label.index() as usize];
        debug_assert!(slot.is_none(), "label bound twice");
        *slot = Some(self.data.len() as CodeOffset);
    }

    /// Record a use of `label` by the branch word at `offset`.
    pub fn use_label_at_offset(&mut self, offset: CodeOffset, label: MachLabel, kind: LabelUse) {
        log::trace!(
            "CodeBuffer: use_label_at_offset: offset {} label {:?} kind {:?}",
            offset,
            label,
            kind
        );
        self.fixups.push(MachLabelFixup {
            label,
            offset,
            kind,
        });
    }

    /// The emitted bytes so far, without fixups applied. Only meaningful for
    /// code with no unresolved label uses.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Resolve all fixups and hand off the finished code.
    ///
    /// Fails with `CodeTooLarge` if any branch cannot reach its label, and
    /// with an operand-class error if a used label was never bound.
    pub fn finalize(mut self) -> CodegenResult<Vec<u8>> {
        let fixups = core::mem::take(&mut self.fixups);
        for fixup in fixups {
            let label_offset = self.label_offsets[fixup.label.index() as usize].ok_or_else(|| {
                CodegenError::OperandClass(format!(
                    "label{} used at offset {} but never bound",
                    fixup.label.index(),
                    fixup.offset
                ))
            })?;
            let insn = self.get4(fixup.offset);
            let patched = fixup.kind.patch(insn, fixup.offset, label_offset)?;
            self.set4(fixup.offset, patched);
        }
        Ok(self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_fixup_patches_offset() {
        let mut buf = CodeBuffer::new(Endianness::Little);
        let l = buf.get_label();
        buf.use_label_at_offset(0, l, LabelUse::A64Branch26);
        buf.put4(0x1400_0000); // b with zero offset
        buf.put4(0xd503_201f); // nop
        buf.bind_label(l);
        buf.put4(0xd503_201f);
        let code = buf.finalize().unwrap();
        let word = u32::from_le_bytes(code[0..4].try_into().unwrap());
        assert_eq!(word, 0x1400_0002);
    }

    #[test]
    fn backward_fixup_patches_offset() {
        let mut buf = CodeBuffer::new(Endianness::Little);
        let l = buf.get_label();
        buf.bind_label(l);
        buf.put4(0xd503_201f);
        buf.use_label_at_offset(4, l, LabelUse::A64Branch19);
        buf.put4(0x5400_0000); // b.eq with zero offset
        let code = buf.finalize().unwrap();
        let word = u32::from_le_bytes(code[4..8].try_into().unwrap());
        // -4 bytes = -1 word, 19-bit two's complement in bits 23..5.
        assert_eq!(word, 0x5400_0000 | (0x7ffff << 5));
    }

    #[test]
    fn mips_branch_is_delay_slot_relative() {
        let mut buf = CodeBuffer::new(Endianness::Little);
        let l = buf.get_label();
        buf.use_label_at_offset(0, l, LabelUse::MipsBranch16);
        buf.put4(0x1000_0000); // beq $zero, $zero with zero offset
        buf.put4(0x0000_0000); // delay slot nop
        buf.bind_label(l);
        buf.put4(0x0000_0000);
        let code = buf.finalize().unwrap();
        let word = u32::from_le_bytes(code[0..4].try_into().unwrap());
        // Target is 8 bytes ahead of the branch, 4 ahead of the delay slot.
        assert_eq!(word, 0x1000_0001);
    }

    #[test]
    fn unbound_label_is_an_error() {
        let mut buf = CodeBuffer::new(Endianness::Big);
        let l = buf.get_label();
        buf.use_label_at_offset(0, l, LabelUse::PpcBranch24);
        buf.put4(0x4800_0000);
        assert!(buf.finalize().is_err());
    }

    #[test]
    fn out_of_range_fixup_is_code_too_large() {
        let err = LabelUse::PpcBranch14.patch(0x4182_0000, 0, 1 << 16);
        assert_eq!(err, Err(CodegenError::CodeTooLarge));
    }
}
