//! Loads, stores, allocation and the collector trap.

use super::Interpreter;
use crate::{consts::OBJECT_HEADER_BYTES, error::VmError, host::Host, value};

use karst_asm::{decode, Word};

impl<H> Interpreter<H> {
    /// Store the low `width` bytes of `local[y]` at `local[x] + value`,
    /// plus `local[z]` when `indexed`.
    pub(crate) fn store(&mut self, w1: u32, width: u32, indexed: bool) -> Result<(), VmError> {
        let w12 = self.fetch_pair(w1)?;
        let v = self.local(decode::e_y(w12))?;
        let mut addr = self
            .local(decode::e_x(w12))?
            .wrapping_add(decode::e_value(w12) as Word);
        if indexed {
            addr = addr.wrapping_add(self.local(decode::e_z(w12))?);
        }
        match width {
            1 => self.memory.write_u8(addr, v as u8),
            4 => self.memory.write_u32(addr, v as u32),
            _ => self.memory.write_u64(addr, v),
        }
    }

    /// Load `width` bytes from `local[y] + value` (plus `local[z]` when
    /// `indexed`) into `local[x]`, zero-extended.
    pub(crate) fn load(&mut self, w1: u32, width: u32, indexed: bool) -> Result<(), VmError> {
        let w12 = self.fetch_pair(w1)?;
        let mut addr = self
            .local(decode::e_y(w12))?
            .wrapping_add(decode::e_value(w12) as Word);
        if indexed {
            addr = addr.wrapping_add(self.local(decode::e_z(w12))?);
        }
        let v = match width {
            1 => self.memory.read_u8(addr)? as Word,
            4 => self.memory.read_u32(addr)? as Word,
            _ => self.memory.read_u64(addr)?,
        };
        self.set_local(decode::e_x(w12), v)
    }

    /// Confirm `size` free heap bytes by hopping `hop` words forward, or
    /// trap into the in-language heap extender with the request in the
    /// argument registers. The trap frame returns to the instruction after
    /// the reserve, where the compiler's recovery stub pops it and loops
    /// back to re-run the check.
    pub(crate) fn reserve(
        &mut self,
        pc0: Word,
        hop: Word,
        locals: Word,
        size: Word,
    ) -> Result<(), VmError> {
        if self.heap.top + size <= self.heap.limit {
            self.branch(pc0, hop as i64);
            return Ok(());
        }
        tracing::debug!(size, "heap reservation missed; trapping into the extender");
        self.regs.set(0, value::FALSE_MARKER);
        self.regs.set(1, 1);
        self.regs.set(2, size);
        self.push_frame(locals)?;
        self.pc = self
            .program
            .code_offset(self.program.extend_heap_id as Word)?;
        Ok(())
    }

    /// Bump-allocate an object: type id into the header, tagged reference
    /// into `local[dst]`. A successful reserve must precede this.
    pub(crate) fn alloc(&mut self, dst: u16, type_id: Word, payload: Word) -> Result<(), VmError> {
        self.memory.write_u64(self.heap.top, type_id)?;
        self.set_local(dst, value::ptr_to_ref(self.heap.top))?;
        self.heap.top += OBJECT_HEADER_BYTES + payload;
        Ok(())
    }

    /// Render a slot for the debug opcode.
    pub(crate) fn dump(&self, w1: u32) -> Result<(), VmError> {
        let v = self.local(decode::b_x(w1))?;
        const TARGET: &str = "karst_vm::dump";
        match decode::b_value(w1) {
            0 => tracing::debug!(target: TARGET, byte = v as u8),
            1 => tracing::debug!(target: TARGET, int = v as u32 as i32),
            2 => tracing::debug!(target: TARGET, long = v as i64),
            3 => tracing::debug!(target: TARGET, pointer = v),
            4 => tracing::debug!(target: TARGET, float = f32::from_bits(v as u32) as f64),
            _ => tracing::debug!(target: TARGET, double = f64::from_bits(v)),
        }
        Ok(())
    }
}

impl<H: Host> Interpreter<H> {
    /// The collection trap: state out, collector in, state back.
    pub(crate) fn gc(&mut self, w1: u32) -> Result<(), VmError> {
        let requested = self.local(decode::b_value(w1) as u16)?;
        tracing::debug!(requested, "collector invoked");
        self.save_state()?;
        let remaining = H::collect_garbage(self, requested)?;
        self.restore_state()?;
        self.set_local(decode::b_x(w1), remaining)
    }
}
