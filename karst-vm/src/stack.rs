//! Field access for stack objects living in the arena.

use crate::{
    consts::{OBJECT_HEADER_BYTES, STACK_FRAMES, STACK_PC, STACK_SIZE, STACK_SP},
    error::VmError,
    memory::VmMemory,
    value,
};

use karst_asm::Word;

/// A view over the payload of a stack object.
///
/// Holds only the payload address, so a view is cheap to re-derive after
/// anything (a collection, an extender) may have moved the object.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StackView {
    payload: Word,
}

impl StackView {
    /// View the stack object behind a tagged reference.
    pub fn of(stack_ref: Word) -> Self {
        Self {
            payload: value::ref_to_ptr(stack_ref).wrapping_add(OBJECT_HEADER_BYTES),
        }
    }

    /// Byte size of the frame arena.
    pub fn size(&self, m: &VmMemory) -> Result<Word, VmError> {
        m.read_u64(self.payload + STACK_SIZE)
    }

    /// Address of the frame arena.
    pub fn frames(&self, m: &VmMemory) -> Result<Word, VmError> {
        m.read_u64(self.payload + STACK_FRAMES)
    }

    /// First byte past the frame arena.
    pub fn limit(&self, m: &VmMemory) -> Result<Word, VmError> {
        Ok(self.frames(m)? + self.size(m)?)
    }

    /// Saved stack pointer.
    pub fn saved_sp(&self, m: &VmMemory) -> Result<Word, VmError> {
        m.read_u64(self.payload + STACK_SP)
    }

    /// Saved resume offset; on a stack that has never run this holds the
    /// entry function id instead.
    pub fn saved_pc(&self, m: &VmMemory) -> Result<Word, VmError> {
        m.read_u64(self.payload + STACK_PC)
    }

    /// Record the suspension pair.
    pub fn save(&self, m: &mut VmMemory, sp: Word, pc: Word) -> Result<(), VmError> {
        m.write_u64(self.payload + STACK_SP, sp)?;
        m.write_u64(self.payload + STACK_PC, pc)
    }
}
