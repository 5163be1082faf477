//! [`Interpreter`] state and embedder surface; the dispatch loop lives in
//! the `executors` submodule.

use crate::{
    consts::*,
    error::VmError,
    host::{Host, NullHost},
    memory::VmMemory,
    stack::StackView,
    state::{HeapRegion, Program, RegisterFile, Termination, VmImage, VmParams},
    value,
};

use karst_asm::{decode, Word};

use core::mem;

mod alu;
mod executors;
mod flow;
mod mem_ops;

/// The execution core.
///
/// Owns the loader tables, the memory arena, the heap window, both
/// register files and the two live stack references. Between trap points
/// the interpreter has exclusive use of all of it; during a [`Host`] hook
/// the hook does.
#[derive(Debug)]
pub struct Interpreter<H = NullHost> {
    program: Program,
    params: VmParams,
    memory: VmMemory,
    heap: HeapRegion,
    /// Active register file.
    regs: RegisterFile,
    /// The inactive file: the system file while user code runs, and the
    /// user file while the system stack runs.
    idle_regs: RegisterFile,
    current_stack: Word,
    system_stack: Word,
    pc: Word,
    sp: Word,
    host: H,
}

impl<H> Interpreter<H> {
    /// Build an interpreter over a loaded image.
    pub fn new(image: VmImage, params: VmParams, host: H) -> Result<Self, VmError> {
        if params.heap_base > params.heap_limit || params.heap_limit > params.memory_bytes {
            return Err(VmError::BadImage("heap window outside the arena"));
        }
        if params.free_base > params.free_limit || params.free_limit > params.memory_bytes {
            return Err(VmError::BadImage("free region outside the arena"));
        }

        let mut memory = VmMemory::new(params.memory_bytes as usize);
        memory
            .write_bytes(params.globals_base, &image.globals)
            .map_err(|_| VmError::BadImage("globals region overflows the arena"))?;
        memory
            .write_bytes(params.data_base, &image.data)
            .map_err(|_| VmError::BadImage("data region overflows the arena"))?;

        let heap = HeapRegion {
            base: params.heap_base,
            top: params.heap_base,
            limit: params.heap_limit,
            free_base: params.free_base,
            free_limit: params.free_limit,
        };

        let program = Program {
            code: image.code,
            code_offsets: image.code_offsets,
            consts: image.consts,
            global_offsets: image.global_offsets,
            data_offsets: image.data_offsets,
            extern_addrs: image.extern_addrs,
            extern_defn_addrs: image.extern_defn_addrs,
            extend_heap_id: image.extend_heap_id,
            extend_stack_id: image.extend_stack_id,
        };

        Ok(Self {
            program,
            params,
            memory,
            heap,
            regs: RegisterFile::new(),
            idle_regs: RegisterFile::new(),
            current_stack: 0,
            system_stack: 0,
            pc: 0,
            sp: 0,
            host,
        })
    }

    /// The loader tables.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The layout the interpreter was configured with.
    pub fn params(&self) -> &VmParams {
        &self.params
    }

    /// The memory arena.
    pub fn memory(&self) -> &VmMemory {
        &self.memory
    }

    /// The memory arena, writable.
    pub fn memory_mut(&mut self) -> &mut VmMemory {
        &mut self.memory
    }

    /// The heap window.
    pub fn heap(&self) -> &HeapRegion {
        &self.heap
    }

    /// The heap window, writable. Collectors update `top`, `limit` and the
    /// free region through this.
    pub fn heap_mut(&mut self) -> &mut HeapRegion {
        &mut self.heap
    }

    /// The active register file.
    pub fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    /// The active register file, writable.
    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    /// The inactive register file.
    pub fn idle_registers(&self) -> &RegisterFile {
        &self.idle_regs
    }

    /// The inactive register file, writable.
    pub fn idle_registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.idle_regs
    }

    /// Tagged reference to the running stack.
    pub fn current_stack(&self) -> Word {
        self.current_stack
    }

    /// Tagged reference to the suspended counterpart stack.
    pub fn system_stack(&self) -> Word {
        self.system_stack
    }

    /// Install the system stack used by the prologue overflow escape.
    pub fn set_system_stack(&mut self, stack_ref: Word) {
        self.system_stack = stack_ref;
    }

    /// Current stack pointer.
    pub fn sp(&self) -> Word {
        self.sp
    }

    /// Current program counter, in bytes.
    pub fn pc(&self) -> Word {
        self.pc
    }

    /// The embedder state.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The embedder state, writable.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Allocate a fresh stack object with a `frame_arena` byte frame area
    /// and `entry` as its cold-entry function. The frame arena is seeded
    /// with an exit frame so returning off its bottom leaves the
    /// interpreter.
    pub fn spawn_stack(
        &mut self,
        frame_arena: Word,
        entry: u32,
        type_id: Word,
    ) -> Result<Word, VmError> {
        let frame_arena = align_word(frame_arena);
        let total = OBJECT_HEADER_BYTES + STACK_HEADER_BYTES + frame_arena;
        if self.heap.top + total > self.heap.limit {
            return Err(VmError::HeapExhausted { requested: total });
        }
        let header = self.heap.top;
        self.heap.top += total;

        let payload = header + OBJECT_HEADER_BYTES;
        let frames = payload + STACK_HEADER_BYTES;
        self.memory.write_u64(header, type_id)?;
        self.memory.write_u64(payload + STACK_SIZE, frame_arena)?;
        self.memory.write_u64(payload + STACK_FRAMES, frames)?;
        self.memory.write_u64(payload + STACK_SP, frames)?;
        self.memory.write_u64(payload + STACK_PC, entry as Word)?;
        self.memory.write_i64(frames + FRAME_RETURN_PC, EXIT_RETURN)?;
        Ok(value::ptr_to_ref(header))
    }

    /// Local slot of the current frame.
    pub(crate) fn local(&self, slot: u16) -> Result<Word, VmError> {
        self.memory
            .read_u64(self.sp + FRAME_HEADER_BYTES + (WORD_SIZE as Word) * slot as Word)
    }

    /// Write a local slot of the current frame.
    pub(crate) fn set_local(&mut self, slot: u16, v: Word) -> Result<(), VmError> {
        self.memory
            .write_u64(self.sp + FRAME_HEADER_BYTES + (WORD_SIZE as Word) * slot as Word, v)
    }

    /// Fetch the next instruction word.
    pub(crate) fn fetch(&mut self) -> Result<u32, VmError> {
        let w = self.code_word(self.pc)?;
        self.pc += 4;
        Ok(w)
    }

    /// Fetch a trailing 64-bit immediate, low word first.
    pub(crate) fn fetch_wide(&mut self) -> Result<Word, VmError> {
        let lo = self.fetch()?;
        let hi = self.fetch()?;
        Ok(decode::wide(lo, hi))
    }

    /// Fetch the second word of a two-word packed instruction and return
    /// the concatenation.
    pub(crate) fn fetch_pair(&mut self, w1: u32) -> Result<Word, VmError> {
        let w2 = self.fetch()?;
        Ok(decode::wide(w1, w2))
    }

    /// Read a code word without advancing.
    pub(crate) fn code_word(&self, offset: Word) -> Result<u32, VmError> {
        if offset & 3 == 0 {
            if let Some(&w) = self.program.code.get((offset / 4) as usize) {
                return Ok(w);
            }
        }
        Err(VmError::InstructionFetch { offset })
    }

    /// Record the suspension pair into the current stack object.
    pub(crate) fn save_state(&mut self) -> Result<(), VmError> {
        StackView::of(self.current_stack).save(&mut self.memory, self.sp, self.pc)
    }

    /// Reload the suspension pair from the current stack object.
    pub(crate) fn restore_state(&mut self) -> Result<(), VmError> {
        let view = StackView::of(self.current_stack);
        self.sp = view.saved_sp(&self.memory)?;
        self.pc = view.saved_pc(&self.memory)?;
        Ok(())
    }

    /// Swap the register files together with the stack references. Used by
    /// every system-stack transition.
    pub(crate) fn swap_system_context(&mut self) {
        mem::swap(&mut self.regs, &mut self.idle_regs);
        mem::swap(&mut self.current_stack, &mut self.system_stack);
    }
}

impl<H: Host> Interpreter<H> {
    /// Cold-enter a stack: position the stack pointer at its frame base,
    /// resolve its entry function, and run to termination.
    pub fn enter(&mut self, stack_ref: Word) -> Result<Termination, VmError> {
        self.current_stack = stack_ref;
        let view = StackView::of(stack_ref);
        let frames = view.frames(&self.memory)?;
        let entry = view.saved_pc(&self.memory)?;
        let start = self.program.code_offset(entry)?;
        view.save(&mut self.memory, frames, start)?;
        self.run()
    }
}
