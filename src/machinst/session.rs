//! Translation sessions: the owner of one code stream.
//!
//! A session pairs a target backend with a [`CodeBuffer`] and an
//! [`EmitState`], drives the wide-register pairing layer, and provides the
//! scoped rounding-mode override. Translation is strictly sequential: each
//! logical instruction is fully resolved and emitted before the next is
//! considered. Parallel translation is done by giving each thread its own
//! session; nothing here is shared.

use crate::error::{CodegenError, CodegenResult};
use crate::isa::{EmitState, TargetIsa};
use crate::machinst::{CodeBuffer, MInst, MachLabel, MemArg, Reg, RoundingMode, VectorWidth, Writable};

/// A translation session: one kernel's worth of code being encoded for one
/// target.
pub struct TranslationSession<'a> {
    isa: &'a dyn TargetIsa,
    buf: CodeBuffer,
    state: EmitState,
    in_rounding_scope: bool,
}

impl<'a> TranslationSession<'a> {
    /// Start a new session for the given backend.
    pub fn new(isa: &'a dyn TargetIsa) -> TranslationSession<'a> {
        TranslationSession {
            buf: CodeBuffer::new(isa.endianness()),
            state: EmitState::new(isa),
            isa,
            in_rounding_scope: false,
        }
    }

    /// The backend this session encodes for.
    pub fn isa(&self) -> &dyn TargetIsa {
        self.isa
    }

    /// Current offset into the code stream, in bytes.
    pub fn cur_offset(&self) -> u32 {
        self.buf.cur_offset()
    }

    /// Reserve a new branch-target label.
    pub fn create_label(&mut self) -> MachLabel {
        self.buf.get_label()
    }

    /// Bind a label to the current position in the code stream.
    pub fn bind_label(&mut self, label: MachLabel) {
        self.buf.bind_label(label);
    }

    /// Encode one logical instruction, appending its word(s) to the code
    /// stream.
    ///
    /// A vector instruction whose logical width exceeds the target's native
    /// vector width is decomposed here: the identical operation is re-issued
    /// once per pairing group, group i of the destination computed from
    /// group i of every logical-width source, in ascending group order.
    /// Fixed singleton operands (scalar sources, memory base registers) are
    /// referenced identically in every sub-instruction.
    pub fn emit(&mut self, inst: &MInst) -> CodegenResult<()> {
        log::trace!("emit: {}", inst);
        let native = self.isa.native_vector_bytes();
        match inst.vector_width() {
            Some(width) if width.bytes() > native => {
                let groups = width.bytes() / native;
                for group in 0..groups {
                    let sub = subdivide(inst, group, groups, native)?;
                    self.isa.emit(&sub, &mut self.buf, &mut self.state)?;
                }
                Ok(())
            }
            _ => self.isa.emit(inst, &mut self.buf, &mut self.state),
        }
    }

    /// Run `body` with the floating-point rounding mode overridden to
    /// `mode`.
    ///
    /// On entry this stages the mode into the target's control register,
    /// saving the previous control word; the previous mode is restored when
    /// the body finishes, whether or not it succeeded. Nesting is not
    /// supported (there is a single `fctrl_save` slot) and fails with an
    /// `Unsupported` error.
    pub fn with_rounding_mode<F>(&mut self, mode: RoundingMode, body: F) -> CodegenResult<()>
    where
        F: FnOnce(&mut TranslationSession<'a>) -> CodegenResult<()>,
    {
        if self.in_rounding_scope {
            return Err(CodegenError::Unsupported(
                "nested rounding-mode scopes".to_string(),
            ));
        }
        self.emit(&MInst::SetFpRoundingMode { mode })?;
        self.in_rounding_scope = true;
        let result = body(self);
        self.in_rounding_scope = false;
        let restored = self.emit(&MInst::RestoreFpRoundingMode);
        result.and(restored)
    }

    /// The emitted bytes so far, without label fixups applied.
    pub fn code(&self) -> &[u8] {
        self.buf.data()
    }

    /// Finish the session: resolve all branch fixups and hand off the code
    /// stream. Placing the bytes in executable memory, relocation and cache
    /// flushing are the caller's concern.
    pub fn finalize(self) -> CodegenResult<Vec<u8>> {
        self.buf.finalize()
    }
}

fn native_width(native_bytes: u32) -> VectorWidth {
    match native_bytes {
        16 => VectorWidth::V128,
        32 => VectorWidth::V256,
        _ => VectorWidth::V512,
    }
}

/// Map a logical-width vector register to its pairing-group member `group`.
///
/// Pairing groups are `groups` consecutive physical registers starting at
/// the named register, which must be aligned to the group size.
fn group_reg(reg: Reg, group: u32, groups: u32) -> CodegenResult<Reg> {
    if u32::from(reg.hw_enc()) % groups != 0 {
        return Err(CodegenError::OperandClass(format!(
            "wide vector register {} is not aligned to its pairing group of {}",
            reg, groups
        )));
    }
    Ok(reg.offset(group as u8))
}

fn group_writable(
    reg: Writable<Reg>,
    group: u32,
    groups: u32,
) -> CodegenResult<Writable<Reg>> {
    Ok(Writable::from_reg(group_reg(reg.to_reg(), group, groups)?))
}

fn group_mem(mem: MemArg, group: u32, native_bytes: u32) -> MemArg {
    mem.with_disp_added(i64::from(group) * i64::from(native_bytes))
}

/// Produce the sub-instruction for pairing group `group` of a wide vector
/// instruction.
///
/// This is the one place that distinguishes logical-width operand positions
/// (partitioned per group) from fixed singletons (the scalar source of a
/// broadcast, the base register of a memory operand, an immediate): the
/// latter are passed through unchanged.
fn subdivide(inst: &MInst, group: u32, groups: u32, native_bytes: u32) -> CodegenResult<MInst> {
    let width = native_width(native_bytes);
    match inst {
        MInst::VecAluRRR {
            op,
            lane,
            vd,
            vn,
            vm,
            ..
        } => Ok(MInst::VecAluRRR {
            op: *op,
            width,
            lane: *lane,
            vd: group_writable(*vd, group, groups)?,
            vn: group_reg(*vn, group, groups)?,
            vm: group_reg(*vm, group, groups)?,
        }),
        MInst::VecLoad { vd, mem, .. } => Ok(MInst::VecLoad {
            width,
            vd: group_writable(*vd, group, groups)?,
            mem: group_mem(*mem, group, native_bytes),
        }),
        MInst::VecStore { vs, mem, .. } => Ok(MInst::VecStore {
            width,
            vs: group_reg(*vs, group, groups)?,
            mem: group_mem(*mem, group, native_bytes),
        }),
        MInst::VecSplatImm { lane, vd, imm, .. } => Ok(MInst::VecSplatImm {
            width,
            lane: *lane,
            vd: group_writable(*vd, group, groups)?,
            imm: *imm,
        }),
        MInst::VecDup { lane, vd, rn, .. } => Ok(MInst::VecDup {
            width,
            lane: *lane,
            vd: group_writable(*vd, group, groups)?,
            // The scalar source is a fixed singleton.
            rn: *rn,
        }),
        _ => unreachable!("subdivide called on a non-vector instruction"),
    }
}
