//! Calls, returns, branches and stack switching.

use super::Interpreter;
use crate::{
    consts::{
        frame_bytes, FRAME_HEADER_BYTES, FRAME_RETURN_PC, OBJECT_HEADER_BYTES,
        SYSTEM_RETURN_STUB, WORD_SIZE,
    },
    error::VmError,
    host::Host,
    stack::StackView,
    value,
};

use karst_asm::{decode, Word};

/// What an instruction did to the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Keep dispatching.
    Continue,
    /// A frame with a negative, non-stub return pc was returned from.
    Exit(i64),
}

impl<H> Interpreter<H> {
    /// Advance the stack pointer over a `locals`-slot frame and store the
    /// current pc as the new frame's return address.
    pub(crate) fn push_frame(&mut self, locals: Word) -> Result<(), VmError> {
        let new_sp = self.sp + frame_bytes(locals);
        self.memory.write_u64(new_sp + FRAME_RETURN_PC, self.pc)?;
        self.sp = new_sp;
        Ok(())
    }

    /// Retreat the stack pointer over a `locals`-slot frame.
    pub(crate) fn pop_frame(&mut self, locals: Word) {
        self.sp = self.sp.wrapping_sub(frame_bytes(locals));
    }

    /// Transfer to a function, pushing the callee frame.
    pub(crate) fn call_fid(&mut self, fid: Word, locals: Word) -> Result<(), VmError> {
        let target = self.program.code_offset(fid)?;
        self.push_frame(locals)?;
        self.pc = target;
        Ok(())
    }

    /// Transfer to a function reusing the current frame.
    pub(crate) fn tail_call(&mut self, fid: Word) -> Result<(), VmError> {
        self.pc = self.program.code_offset(fid)?;
        Ok(())
    }

    /// Function id stored in the first payload word of a closure object.
    pub(crate) fn closure_code(&self, closure: Word) -> Result<Word, VmError> {
        self.memory
            .read_u64(value::ref_to_ptr(closure) + OBJECT_HEADER_BYTES)
    }

    /// Set the pc `words` instruction words away from the instruction that
    /// started at `pc0`.
    pub(crate) fn branch(&mut self, pc0: Word, words: i64) {
        self.pc = (pc0 as i64).wrapping_add(words.wrapping_mul(4)) as Word;
    }

    /// The return protocol: a stub swaps back to the suspended
    /// counterpart stack, any other negative value exits, and everything
    /// else is a byte offset to resume the caller at.
    pub(crate) fn op_return(&mut self) -> Result<Flow, VmError> {
        let rpc = self.memory.read_i64(self.sp + FRAME_RETURN_PC)?;
        if rpc == SYSTEM_RETURN_STUB {
            self.swap_system_context();
            self.restore_state()?;
            Ok(Flow::Continue)
        } else if rpc < 0 {
            self.save_state()?;
            Ok(Flow::Exit(rpc))
        } else {
            self.pc = rpc as Word;
            Ok(Flow::Continue)
        }
    }

    /// Warm-switch to another stack, resuming its saved suspension pair.
    pub(crate) fn op_yield(&mut self, target: Word) -> Result<(), VmError> {
        self.save_state()?;
        self.current_stack = target;
        self.restore_state()
    }

    /// Cold-switch to a stack that has never run: the stack pointer lands
    /// at its frame base and the `pc` field names the entry function.
    pub(crate) fn op_enter_stack(&mut self, target: Word) -> Result<(), VmError> {
        self.save_state()?;
        self.current_stack = target;
        let view = StackView::of(target);
        self.sp = view.frames(&self.memory)?;
        let entry = view.saved_pc(&self.memory)?;
        self.pc = self.program.code_offset(entry)?;
        Ok(())
    }

    /// Function prologue headroom check: room for the callee's own frame
    /// plus one more for the extender. On underflow, escape to the system
    /// stack and call the in-language stack extender with the required
    /// byte count; the suspended stack resumes at the prologue itself.
    pub(crate) fn fnentry(&mut self, pc0: Word, locals: Word) -> Result<(), VmError> {
        let required = (WORD_SIZE as Word) * locals + 2 * FRAME_HEADER_BYTES;
        let view = StackView::of(self.current_stack);
        if self.sp + required <= view.limit(&self.memory)? {
            return Ok(());
        }

        tracing::debug!(required, "stack headroom exhausted; escaping to the system stack");
        view.save(&mut self.memory, self.sp, pc0)?;
        self.swap_system_context();
        let system = StackView::of(self.current_stack);
        self.sp = system.frames(&self.memory)?;
        self.memory
            .write_i64(self.sp + FRAME_RETURN_PC, SYSTEM_RETURN_STUB)?;
        self.regs.set(0, value::FALSE_MARKER);
        self.regs.set(1, 1);
        self.regs.set(2, required);
        self.pc = self
            .program
            .code_offset(self.program.extend_stack_id as Word)?;
        Ok(())
    }

    /// The protocol around any foreign call: shield the caller's frame,
    /// persist the suspension pair, call out, then re-derive `sp` and the
    /// return pc from memory since a collection inside the call may have
    /// moved the stack.
    pub(crate) fn foreign_call(
        &mut self,
        locals: Word,
        call: impl FnOnce(&mut Self) -> Result<(), VmError>,
    ) -> Result<(), VmError> {
        self.push_frame(locals)?;
        self.save_state()?;
        call(self)?;
        self.restore_state()?;
        self.pc = self.memory.read_u64(self.sp + FRAME_RETURN_PC)?;
        self.pop_frame(locals);
        Ok(())
    }

    /// Two-slot compare-and-branch over a pair of pre-decode-relative
    /// targets.
    pub(crate) fn cond_jump(
        &mut self,
        pc0: Word,
        w1: u32,
        pred: impl FnOnce(Word, Word) -> bool,
    ) -> Result<(), VmError> {
        let w2 = self.fetch()?;
        let w12 = decode::wide(w1, w2);
        let a = self.local(decode::f_x(w12))?;
        let b = self.local(decode::f_y(w12))?;
        let words = if pred(a, b) {
            decode::f_taken(w12)
        } else {
            decode::f_not_taken(w2)
        };
        self.branch(pc0, words as i64);
        Ok(())
    }

    /// Single-slot boolean test over a pair of targets.
    pub(crate) fn test_jump(&mut self, pc0: Word, w1: u32) -> Result<(), VmError> {
        let w2 = self.fetch()?;
        let w12 = decode::wide(w1, w2);
        let words = if self.local(decode::f_x(w12))? != 0 {
            decode::f_taken(w12)
        } else {
            decode::f_not_taken(w2)
        };
        self.branch(pc0, words as i64);
        Ok(())
    }
}

impl<H: Host> Interpreter<H> {
    /// Branch through an inline target table. `method` resolution maps
    /// indices past the first two to function ids.
    pub(crate) fn dispatch(
        &mut self,
        pc0: Word,
        format: u32,
        method: bool,
    ) -> Result<(), VmError> {
        let len = self.fetch()?;
        let table = self.pc;
        // The table is data; step past it before resolving.
        self.pc += 4 * len as Word;
        let index = H::dispatch_branch(self, format)?;
        if method && index >= 2 {
            let fid = (index - 2) as Word;
            self.pc = self.program.code_offset(fid)?;
            return Ok(());
        }
        if index >= len {
            return Err(VmError::BadDispatchIndex { index, len });
        }
        let words = self.code_word(table + 4 * index as Word)? as i32;
        self.branch(pc0, words as i64);
        Ok(())
    }
}
