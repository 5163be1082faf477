//! Instruction fetch and the dispatch match.

use super::{
    alu::{as_f32, as_f64, byte, double, flag, float, int, long, nonzero_i32, nonzero_i64},
    flow::Flow,
    Interpreter,
};
use crate::{
    consts::{align_word, FRAME_LIVENESS, OBJECT_HEADER_BYTES},
    error::VmError,
    host::Host,
    state::Termination,
    value,
};

use karst_asm::{decode, InvalidOpcode, Opcode, Word};

impl<H> Interpreter<H> {
    fn global_addr(&self, index: Word) -> Result<Word, VmError> {
        Ok(self.params.globals_base + self.program.global_offset(index)?)
    }

    fn data_addr(&self, index: Word) -> Result<Word, VmError> {
        Ok(self.params.data_base + 8 * self.program.data_offset(index)?)
    }
}

impl<H: Host> Interpreter<H> {
    /// Resume the current stack at its saved suspension pair and execute
    /// until a frame with a negative, non-stub return pc is returned from.
    /// On exit the suspension pair is saved back, so the interpreter can
    /// be re-entered.
    pub fn run(&mut self) -> Result<Termination, VmError> {
        self.restore_state()?;
        loop {
            let pc0 = self.pc;
            let w1 = self.fetch()?;
            let op = Opcode::try_from(decode::opcode_byte(w1)).map_err(|InvalidOpcode(b)| {
                VmError::UnknownOpcode {
                    opcode: b,
                    offset: pc0,
                }
            })?;
            tracing::trace!(target: "karst_vm::exec", ?op, pc = pc0);
            match self.exec(pc0, w1, op)? {
                Flow::Continue => {}
                Flow::Exit(code) => return Ok(Termination::Exit(code)),
            }
        }
    }

    fn exec(&mut self, pc0: Word, w1: u32, op: Opcode) -> Result<Flow, VmError> {
        match op {
            // Data movement.
            Opcode::SetLocal => {
                let v = self.local(decode::b_value(w1) as u16)?;
                self.set_local(decode::b_x(w1), v)?;
            }
            Opcode::SetUnsigned => {
                let v = self.fetch()? as Word;
                self.set_local(decode::c_x(w1), v)?;
            }
            Opcode::SetSigned => {
                let v = self.fetch()? as i32 as i64 as Word;
                self.set_local(decode::c_x(w1), v)?;
            }
            Opcode::SetCode => {
                let v = self.fetch()? as Word;
                self.set_local(decode::c_x(w1), v)?;
            }
            Opcode::SetExtern => {
                let i = self.fetch()? as Word;
                let v = self.program.extern_addr(i)?;
                self.set_local(decode::c_x(w1), v)?;
            }
            Opcode::SetGlobal => {
                let i = self.fetch()? as Word;
                let v = self.global_addr(i)?;
                self.set_local(decode::c_x(w1), v)?;
            }
            Opcode::SetData => {
                let i = self.fetch()? as Word;
                let v = self.data_addr(i)?;
                self.set_local(decode::c_x(w1), v)?;
            }
            Opcode::SetConst => {
                let i = self.fetch()? as Word;
                let v = self.program.const_value(i)?;
                self.set_local(decode::c_x(w1), v)?;
            }
            Opcode::SetWide => {
                let v = self.fetch_wide()?;
                self.set_local(decode::d_x(w1), v)?;
            }
            Opcode::SetExternDefn => {
                let i = self.fetch()? as Word;
                let v = self.program.extern_defn_addr(i)?;
                self.set_local(decode::c_x(w1), v)?;
            }

            Opcode::SetRegLocal => {
                let v = self.local(decode::b_value(w1) as u16)?;
                self.regs.set(decode::b_x(w1), v);
            }
            Opcode::SetRegUnsigned => {
                let v = self.fetch()? as Word;
                self.regs.set(decode::c_x(w1), v);
            }
            Opcode::SetRegSigned => {
                let v = self.fetch()? as i32 as i64 as Word;
                self.regs.set(decode::c_x(w1), v);
            }
            Opcode::SetRegCode => {
                let v = self.fetch()? as Word;
                self.regs.set(decode::c_x(w1), v);
            }
            Opcode::SetRegExtern => {
                let i = self.fetch()? as Word;
                let v = self.program.extern_addr(i)?;
                self.regs.set(decode::c_x(w1), v);
            }
            Opcode::SetRegGlobal => {
                let i = self.fetch()? as Word;
                let v = self.global_addr(i)?;
                self.regs.set(decode::c_x(w1), v);
            }
            Opcode::SetRegData => {
                let i = self.fetch()? as Word;
                let v = self.data_addr(i)?;
                self.regs.set(decode::c_x(w1), v);
            }
            Opcode::SetRegConst => {
                let i = self.fetch()? as Word;
                let v = self.program.const_value(i)?;
                self.regs.set(decode::c_x(w1), v);
            }
            Opcode::SetRegWide => {
                let v = self.fetch_wide()?;
                self.regs.set(decode::d_x(w1), v);
            }
            Opcode::SetRegExternDefn => {
                let i = self.fetch()? as Word;
                let v = self.program.extern_defn_addr(i)?;
                self.regs.set(decode::c_x(w1), v);
            }
            Opcode::GetReg => {
                let v = self.regs.get(decode::b_value(w1) as u16);
                self.set_local(decode::b_x(w1), v)?;
            }

            // Calls and returns.
            Opcode::CallLocal => {
                let fid = self.local(decode::b_x(w1))?;
                self.call_fid(fid, decode::b_value(w1) as Word)?;
            }
            Opcode::CallCode => {
                let fid = self.fetch()? as Word;
                self.call_fid(fid, decode::c_x(w1) as Word)?;
            }
            Opcode::CallClosure => {
                let closure = self.local(decode::b_x(w1))?;
                let fid = self.closure_code(closure)?;
                self.call_fid(fid, decode::b_value(w1) as Word)?;
            }
            Opcode::TcallLocal => {
                let fid = self.local(decode::a_unsigned(w1) as u16)?;
                self.tail_call(fid)?;
            }
            Opcode::TcallCode => {
                self.tail_call(decode::a_unsigned(w1) as Word)?;
            }
            Opcode::TcallClosure => {
                let closure = self.local(decode::a_unsigned(w1) as u16)?;
                let fid = self.closure_code(closure)?;
                self.tail_call(fid)?;
            }
            Opcode::CallCLocal => {
                let address = self.local(decode::b_x(w1))?;
                let locals = decode::b_value(w1) as Word;
                tracing::debug!(address, "foreign call");
                self.foreign_call(locals, |vm| H::trampoline(vm, address))?;
            }
            Opcode::CallCExtern => {
                let locals = decode::c_x(w1) as Word;
                let i = self.fetch()? as Word;
                let address = self.program.extern_addr(i)?;
                tracing::debug!(address, "foreign call");
                self.foreign_call(locals, |vm| H::trampoline(vm, address))?;
            }
            Opcode::CallCExternDefn => {
                let locals = decode::c_x(w1) as Word;
                let stub = decode::c_y(w1) as u32;
                let i = self.fetch()? as Word;
                let address = self.program.extern_defn_addr(i)?;
                tracing::debug!(address, stub, "foreign call through a stub");
                self.foreign_call(locals, |vm| H::launch_foreign(vm, stub, address))?;
            }
            Opcode::PopFrame => {
                self.pop_frame(decode::a_unsigned(w1) as Word);
            }
            Opcode::Live => {
                let map = self.fetch_wide()?;
                self.memory.write_u64(self.sp + FRAME_LIVENESS, map)?;
            }
            Opcode::Yield => {
                let target = self.local(decode::a_unsigned(w1) as u16)?;
                self.op_yield(target)?;
            }
            Opcode::Return => return self.op_return(),
            Opcode::Dump => self.dump(w1)?,

            // Tagged small-integer family.
            Opcode::FixAdd => self.alu3(w1, |a, b| Ok(a.wrapping_add(b)))?,
            Opcode::FixSub => self.alu3(w1, |a, b| Ok(a.wrapping_sub(b)))?,
            Opcode::FixMul => {
                self.alu3(w1, |a, b| Ok((((a as i64) >> 32) as Word).wrapping_mul(b)))?
            }
            Opcode::FixDiv => self.alu3(w1, |a, b| {
                let d = nonzero_i64(b)?;
                Ok(((a as i64).wrapping_div(d) as Word).wrapping_shl(32))
            })?,
            Opcode::FixMod => self.alu3(w1, |a, b| {
                let d = nonzero_i64(b)?;
                Ok((a as i64).wrapping_rem(d) as Word)
            })?,
            Opcode::FixAnd => self.alu3(w1, |a, b| Ok(a & b))?,
            Opcode::FixOr => self.alu3(w1, |a, b| Ok(a | b))?,
            Opcode::FixXor => self.alu3(w1, |a, b| Ok(a ^ b))?,
            Opcode::FixShl => self.alu3(w1, |a, b| Ok(a.wrapping_shl((b >> 32) as u32)))?,
            Opcode::FixShr => self.alu3(w1, |a, b| {
                let r = a.wrapping_shr((b >> 32) as u32);
                Ok((r >> 32) << 32)
            })?,
            Opcode::FixAshr => self.alu3(w1, |a, b| {
                let r = (a as i64).wrapping_shr((b >> 32) as u32);
                Ok(((r >> 32) << 32) as Word)
            })?,
            Opcode::FixLt => self.alu3(w1, |a, b| Ok(value::bool_marker((a as i64) < (b as i64))))?,
            Opcode::FixGt => self.alu3(w1, |a, b| Ok(value::bool_marker((a as i64) > (b as i64))))?,
            Opcode::FixLe => self.alu3(w1, |a, b| Ok(value::bool_marker((a as i64) <= (b as i64))))?,
            Opcode::FixGe => self.alu3(w1, |a, b| Ok(value::bool_marker((a as i64) >= (b as i64))))?,

            // Raw equality.
            Opcode::EqByte => self.alu3(w1, |a, b| Ok(flag(a as u8 == b as u8)))?,
            Opcode::NeByte => self.alu3(w1, |a, b| Ok(flag(a as u8 != b as u8)))?,
            Opcode::EqChar => self.alu3(w1, |a, b| Ok(flag(a as u8 == b as u8)))?,
            Opcode::NeChar => self.alu3(w1, |a, b| Ok(flag(a as u8 != b as u8)))?,
            Opcode::EqInt => self.alu3(w1, |a, b| Ok(flag(a as u32 == b as u32)))?,
            Opcode::NeInt => self.alu3(w1, |a, b| Ok(flag(a as u32 != b as u32)))?,
            Opcode::EqLong => self.alu3(w1, |a, b| Ok(flag(a == b)))?,
            Opcode::NeLong => self.alu3(w1, |a, b| Ok(flag(a != b)))?,
            Opcode::EqFloat => self.alu3(w1, |a, b| Ok(flag(as_f32(a) == as_f32(b))))?,
            Opcode::NeFloat => self.alu3(w1, |a, b| Ok(flag(as_f32(a) != as_f32(b))))?,
            Opcode::EqDouble => self.alu3(w1, |a, b| Ok(flag(as_f64(a) == as_f64(b))))?,
            Opcode::NeDouble => self.alu3(w1, |a, b| Ok(flag(as_f64(a) != as_f64(b))))?,
            Opcode::EqRef => self.alu3(w1, |a, b| Ok(flag(a == b)))?,
            Opcode::NeRef => self.alu3(w1, |a, b| Ok(flag(a != b)))?,

            // Raw i32 arithmetic.
            Opcode::AddInt => self.alu3(w1, |a, b| Ok(int((a as i32).wrapping_add(b as i32))))?,
            Opcode::SubInt => self.alu3(w1, |a, b| Ok(int((a as i32).wrapping_sub(b as i32))))?,
            Opcode::MulInt => self.alu3(w1, |a, b| Ok(int((a as i32).wrapping_mul(b as i32))))?,
            Opcode::DivInt => {
                self.alu3(w1, |a, b| Ok(int((a as i32).wrapping_div(nonzero_i32(b)?))))?
            }
            Opcode::ModInt => {
                self.alu3(w1, |a, b| Ok(int((a as i32).wrapping_rem(nonzero_i32(b)?))))?
            }
            Opcode::AndInt => self.alu3(w1, |a, b| Ok(int(a as i32 & b as i32)))?,
            Opcode::OrInt => self.alu3(w1, |a, b| Ok(int(a as i32 | b as i32)))?,
            Opcode::XorInt => self.alu3(w1, |a, b| Ok(int(a as i32 ^ b as i32)))?,
            Opcode::ShlInt => self.alu3(w1, |a, b| Ok(int((a as i32).wrapping_shl(b as u32))))?,
            Opcode::ShrInt => {
                self.alu3(w1, |a, b| Ok(int((a as u32).wrapping_shr(b as u32) as i32)))?
            }
            Opcode::AshrInt => self.alu3(w1, |a, b| Ok(int((a as i32).wrapping_shr(b as u32))))?,
            Opcode::LtInt => self.alu3(w1, |a, b| Ok(flag((a as i32) < (b as i32))))?,
            Opcode::GtInt => self.alu3(w1, |a, b| Ok(flag((a as i32) > (b as i32))))?,
            Opcode::LeInt => self.alu3(w1, |a, b| Ok(flag((a as i32) <= (b as i32))))?,
            Opcode::GeInt => self.alu3(w1, |a, b| Ok(flag((a as i32) >= (b as i32))))?,

            // Raw i64 arithmetic.
            Opcode::AddLong => self.alu3(w1, |a, b| Ok(long((a as i64).wrapping_add(b as i64))))?,
            Opcode::SubLong => self.alu3(w1, |a, b| Ok(long((a as i64).wrapping_sub(b as i64))))?,
            Opcode::MulLong => self.alu3(w1, |a, b| Ok(long((a as i64).wrapping_mul(b as i64))))?,
            Opcode::DivLong => {
                self.alu3(w1, |a, b| Ok(long((a as i64).wrapping_div(nonzero_i64(b)?))))?
            }
            Opcode::ModLong => {
                self.alu3(w1, |a, b| Ok(long((a as i64).wrapping_rem(nonzero_i64(b)?))))?
            }
            Opcode::AndLong => self.alu3(w1, |a, b| Ok(a & b))?,
            Opcode::OrLong => self.alu3(w1, |a, b| Ok(a | b))?,
            Opcode::XorLong => self.alu3(w1, |a, b| Ok(a ^ b))?,
            Opcode::ShlLong => self.alu3(w1, |a, b| Ok(a.wrapping_shl(b as u32)))?,
            Opcode::ShrLong => self.alu3(w1, |a, b| Ok(a.wrapping_shr(b as u32)))?,
            Opcode::AshrLong => {
                self.alu3(w1, |a, b| Ok(long((a as i64).wrapping_shr(b as u32))))?
            }
            Opcode::LtLong => self.alu3(w1, |a, b| Ok(flag((a as i64) < (b as i64))))?,
            Opcode::GtLong => self.alu3(w1, |a, b| Ok(flag((a as i64) > (b as i64))))?,
            Opcode::LeLong => self.alu3(w1, |a, b| Ok(flag((a as i64) <= (b as i64))))?,
            Opcode::GeLong => self.alu3(w1, |a, b| Ok(flag((a as i64) >= (b as i64))))?,

            // Raw byte arithmetic.
            Opcode::AddByte => self.alu3(w1, |a, b| Ok(byte((a as u8).wrapping_add(b as u8))))?,
            Opcode::SubByte => self.alu3(w1, |a, b| Ok(byte((a as u8).wrapping_sub(b as u8))))?,
            Opcode::AndByte => self.alu3(w1, |a, b| Ok(byte(a as u8 & b as u8)))?,
            Opcode::OrByte => self.alu3(w1, |a, b| Ok(byte(a as u8 | b as u8)))?,
            Opcode::XorByte => self.alu3(w1, |a, b| Ok(byte(a as u8 ^ b as u8)))?,
            Opcode::ShlByte => self.alu3(w1, |a, b| Ok(byte((a as u8).wrapping_shl(b as u32))))?,
            Opcode::ShrByte => self.alu3(w1, |a, b| Ok(byte((a as u8).wrapping_shr(b as u32))))?,
            Opcode::LtByte => self.alu3(w1, |a, b| Ok(flag((a as u8) < (b as u8))))?,
            Opcode::GtByte => self.alu3(w1, |a, b| Ok(flag((a as u8) > (b as u8))))?,
            Opcode::LeByte => self.alu3(w1, |a, b| Ok(flag((a as u8) <= (b as u8))))?,
            Opcode::GeByte => self.alu3(w1, |a, b| Ok(flag((a as u8) >= (b as u8))))?,

            // Raw f32 arithmetic.
            Opcode::AddFloat => self.alu3(w1, |a, b| Ok(float(as_f32(a) + as_f32(b))))?,
            Opcode::SubFloat => self.alu3(w1, |a, b| Ok(float(as_f32(a) - as_f32(b))))?,
            Opcode::MulFloat => self.alu3(w1, |a, b| Ok(float(as_f32(a) * as_f32(b))))?,
            Opcode::DivFloat => self.alu3(w1, |a, b| Ok(float(as_f32(a) / as_f32(b))))?,
            Opcode::LtFloat => self.alu3(w1, |a, b| Ok(flag(as_f32(a) < as_f32(b))))?,
            Opcode::GtFloat => self.alu3(w1, |a, b| Ok(flag(as_f32(a) > as_f32(b))))?,
            Opcode::LeFloat => self.alu3(w1, |a, b| Ok(flag(as_f32(a) <= as_f32(b))))?,
            Opcode::GeFloat => self.alu3(w1, |a, b| Ok(flag(as_f32(a) >= as_f32(b))))?,

            // Raw f64 arithmetic.
            Opcode::AddDouble => self.alu3(w1, |a, b| Ok(double(as_f64(a) + as_f64(b))))?,
            Opcode::SubDouble => self.alu3(w1, |a, b| Ok(double(as_f64(a) - as_f64(b))))?,
            Opcode::MulDouble => self.alu3(w1, |a, b| Ok(double(as_f64(a) * as_f64(b))))?,
            Opcode::DivDouble => self.alu3(w1, |a, b| Ok(double(as_f64(a) / as_f64(b))))?,
            Opcode::LtDouble => self.alu3(w1, |a, b| Ok(flag(as_f64(a) < as_f64(b))))?,
            Opcode::GtDouble => self.alu3(w1, |a, b| Ok(flag(as_f64(a) > as_f64(b))))?,
            Opcode::LeDouble => self.alu3(w1, |a, b| Ok(flag(as_f64(a) <= as_f64(b))))?,
            Opcode::GeDouble => self.alu3(w1, |a, b| Ok(flag(as_f64(a) >= as_f64(b))))?,

            // Unsigned comparisons.
            Opcode::UltInt => self.alu3(w1, |a, b| Ok(flag((a as u32) < (b as u32))))?,
            Opcode::UgtInt => self.alu3(w1, |a, b| Ok(flag((a as u32) > (b as u32))))?,
            Opcode::UleInt => self.alu3(w1, |a, b| Ok(flag((a as u32) <= (b as u32))))?,
            Opcode::UgeInt => self.alu3(w1, |a, b| Ok(flag((a as u32) >= (b as u32))))?,
            Opcode::UltLong => self.alu3(w1, |a, b| Ok(flag(a < b)))?,
            Opcode::UgtLong => self.alu3(w1, |a, b| Ok(flag(a > b)))?,
            Opcode::UleLong => self.alu3(w1, |a, b| Ok(flag(a <= b)))?,
            Opcode::UgeLong => self.alu3(w1, |a, b| Ok(flag(a >= b)))?,
            Opcode::UltByte => self.alu3(w1, |a, b| Ok(flag((a as u8) < (b as u8))))?,
            Opcode::UgtByte => self.alu3(w1, |a, b| Ok(flag((a as u8) > (b as u8))))?,
            Opcode::UleByte => self.alu3(w1, |a, b| Ok(flag((a as u8) <= (b as u8))))?,
            Opcode::UgeByte => self.alu3(w1, |a, b| Ok(flag((a as u8) >= (b as u8))))?,

            // Unary operators.
            Opcode::NotInt => self.alu1(w1, |a| int(!(a as i32)))?,
            Opcode::NotLong => self.alu1(w1, |a| !a)?,
            Opcode::NegInt => self.alu1(w1, |a| int((a as i32).wrapping_neg()))?,
            Opcode::NegLong => self.alu1(w1, |a| long((a as i64).wrapping_neg()))?,
            Opcode::NegFloat => self.alu1(w1, |a| float(-as_f32(a)))?,
            Opcode::NegDouble => self.alu1(w1, |a| double(-as_f64(a)))?,
            Opcode::Deref => self.alu1(w1, |a| a.wrapping_add(7))?,
            Opcode::Typeof => {
                let index = H::dispatch_branch(self, decode::b_value(w1))?;
                self.set_local(decode::b_x(w1), index as Word)?;
            }

            // Control transfer.
            Opcode::Goto => self.branch(pc0, decode::a_signed(w1) as i64),
            Opcode::JumpSet => self.test_jump(pc0, w1)?,

            // Conversions.
            Opcode::ByteToInt => self.alu1(w1, |a| int(a as u8 as i32))?,
            Opcode::ByteToLong => self.alu1(w1, |a| long(a as u8 as i64))?,
            Opcode::ByteToFloat => self.alu1(w1, |a| float(a as u8 as f32))?,
            Opcode::IntToByte => self.alu1(w1, |a| byte(a as u8))?,
            Opcode::IntToLong => self.alu1(w1, |a| long(a as u32 as i32 as i64))?,
            Opcode::IntToFloat => self.alu1(w1, |a| float(a as u32 as i32 as f32))?,
            Opcode::IntToDouble => self.alu1(w1, |a| double(a as u32 as i32 as f64))?,
            Opcode::LongToByte => self.alu1(w1, |a| byte(a as u8))?,
            Opcode::LongToInt => self.alu1(w1, |a| int(a as i32))?,
            Opcode::LongToFloat => self.alu1(w1, |a| float(a as i64 as f32))?,
            Opcode::LongToDouble => self.alu1(w1, |a| double(a as i64 as f64))?,
            Opcode::FloatToInt => self.alu1(w1, |a| int(as_f32(a) as i32))?,
            Opcode::FloatToLong => self.alu1(w1, |a| long(as_f32(a) as i64))?,
            Opcode::FloatToDouble => self.alu1(w1, |a| double(as_f32(a) as f64))?,
            Opcode::DoubleToInt => self.alu1(w1, |a| int(as_f64(a) as i32))?,
            Opcode::DoubleToLong => self.alu1(w1, |a| long(as_f64(a) as i64))?,
            Opcode::DoubleToFloat => self.alu1(w1, |a| float(as_f64(a) as f32))?,

            // Tagging.
            Opcode::TagByte => self.alu1(w1, |a| value::tag_byte(a as u8))?,
            Opcode::TagChar => self.alu1(w1, |a| value::tag_char(a as u8))?,
            Opcode::TagInt => self.alu1(w1, |a| value::tag_int(a as i32))?,
            Opcode::TagFloat => self.alu1(w1, |a| value::tag_float(as_f32(a)))?,
            Opcode::Detag => self.alu1(w1, |a| value::detag(a) as Word)?,

            // Memory access.
            Opcode::Store1 => self.store(w1, 1, false)?,
            Opcode::Store4 => self.store(w1, 4, false)?,
            Opcode::Store8 => self.store(w1, 8, false)?,
            Opcode::Store1Indexed => self.store(w1, 1, true)?,
            Opcode::Store4Indexed => self.store(w1, 4, true)?,
            Opcode::Store8Indexed => self.store(w1, 8, true)?,
            Opcode::Load1 => self.load(w1, 1, false)?,
            Opcode::Load4 => self.load(w1, 4, false)?,
            Opcode::Load8 => self.load(w1, 8, false)?,
            Opcode::Load1Indexed => self.load(w1, 1, true)?,
            Opcode::Load4Indexed => self.load(w1, 4, true)?,
            Opcode::Load8Indexed => self.load(w1, 8, true)?,

            // Allocation and collection.
            Opcode::ReserveConst => {
                let size = self.fetch()? as Word;
                self.reserve(pc0, decode::c_x(w1) as Word, decode::c_y(w1) as Word, size)?;
            }
            Opcode::ReserveLocal => {
                let slot = self.fetch()?;
                let size = OBJECT_HEADER_BYTES + align_word(self.local(slot as u16)?);
                self.reserve(pc0, decode::c_x(w1) as Word, decode::c_y(w1) as Word, size)?;
            }
            Opcode::EnterStack => {
                let target = self.local(decode::a_unsigned(w1) as u16)?;
                self.op_enter_stack(target)?;
            }
            Opcode::AllocConst => {
                let w12 = self.fetch_pair(w1)?;
                let type_id = self.local(decode::e_y(w12))?;
                self.alloc(decode::e_x(w12), type_id, decode::e_value(w12) as Word)?;
            }
            Opcode::AllocLocal => {
                let w12 = self.fetch_pair(w1)?;
                let type_id = self.local(decode::e_y(w12))?;
                let payload = align_word(self.local(decode::e_z(w12))?);
                self.alloc(decode::e_x(w12), type_id, payload)?;
            }
            Opcode::Gc => self.gc(w1)?,

            // Introspection.
            Opcode::PrintStackTrace => {
                let stack_ref = self.local(decode::a_unsigned(w1) as u16)?;
                self.save_state()?;
                H::print_stack_trace(self, stack_ref)?;
                self.restore_state()?;
                self.regs.set(0, 0);
            }
            Opcode::FlushVm => {
                self.save_state()?;
                let token = self.params.state_token;
                self.set_local(decode::a_unsigned(w1) as u16, token)?;
            }
            Opcode::ClassName => {
                let class = self.local(decode::b_value(w1) as u16)?;
                let name = H::class_name(self, class)?;
                self.set_local(decode::b_x(w1), name)?;
            }

            // Typed two-target branches.
            Opcode::JumpEqByte => self.cond_jump(pc0, w1, |a, b| a as u8 == b as u8)?,
            Opcode::JumpNeByte => self.cond_jump(pc0, w1, |a, b| a as u8 != b as u8)?,
            Opcode::JumpLtByte => self.cond_jump(pc0, w1, |a, b| (a as u8) < (b as u8))?,
            Opcode::JumpGtByte => self.cond_jump(pc0, w1, |a, b| (a as u8) > (b as u8))?,
            Opcode::JumpLeByte => self.cond_jump(pc0, w1, |a, b| (a as u8) <= (b as u8))?,
            Opcode::JumpGeByte => self.cond_jump(pc0, w1, |a, b| (a as u8) >= (b as u8))?,
            Opcode::JumpEqInt => self.cond_jump(pc0, w1, |a, b| a as u32 == b as u32)?,
            Opcode::JumpNeInt => self.cond_jump(pc0, w1, |a, b| a as u32 != b as u32)?,
            Opcode::JumpLtInt => self.cond_jump(pc0, w1, |a, b| (a as i32) < (b as i32))?,
            Opcode::JumpGtInt => self.cond_jump(pc0, w1, |a, b| (a as i32) > (b as i32))?,
            Opcode::JumpLeInt => self.cond_jump(pc0, w1, |a, b| (a as i32) <= (b as i32))?,
            Opcode::JumpGeInt => self.cond_jump(pc0, w1, |a, b| (a as i32) >= (b as i32))?,
            Opcode::JumpEqLong => self.cond_jump(pc0, w1, |a, b| a == b)?,
            Opcode::JumpNeLong => self.cond_jump(pc0, w1, |a, b| a != b)?,
            Opcode::JumpLtLong => self.cond_jump(pc0, w1, |a, b| (a as i64) < (b as i64))?,
            Opcode::JumpGtLong => self.cond_jump(pc0, w1, |a, b| (a as i64) > (b as i64))?,
            Opcode::JumpLeLong => self.cond_jump(pc0, w1, |a, b| (a as i64) <= (b as i64))?,
            Opcode::JumpGeLong => self.cond_jump(pc0, w1, |a, b| (a as i64) >= (b as i64))?,
            Opcode::JumpEqFloat => self.cond_jump(pc0, w1, |a, b| as_f32(a) == as_f32(b))?,
            Opcode::JumpNeFloat => self.cond_jump(pc0, w1, |a, b| as_f32(a) != as_f32(b))?,
            Opcode::JumpLtFloat => self.cond_jump(pc0, w1, |a, b| as_f32(a) < as_f32(b))?,
            Opcode::JumpGtFloat => self.cond_jump(pc0, w1, |a, b| as_f32(a) > as_f32(b))?,
            Opcode::JumpLeFloat => self.cond_jump(pc0, w1, |a, b| as_f32(a) <= as_f32(b))?,
            Opcode::JumpGeFloat => self.cond_jump(pc0, w1, |a, b| as_f32(a) >= as_f32(b))?,
            Opcode::JumpEqDouble => self.cond_jump(pc0, w1, |a, b| as_f64(a) == as_f64(b))?,
            Opcode::JumpNeDouble => self.cond_jump(pc0, w1, |a, b| as_f64(a) != as_f64(b))?,
            Opcode::JumpLtDouble => self.cond_jump(pc0, w1, |a, b| as_f64(a) < as_f64(b))?,
            Opcode::JumpGtDouble => self.cond_jump(pc0, w1, |a, b| as_f64(a) > as_f64(b))?,
            Opcode::JumpLeDouble => self.cond_jump(pc0, w1, |a, b| as_f64(a) <= as_f64(b))?,
            Opcode::JumpGeDouble => self.cond_jump(pc0, w1, |a, b| as_f64(a) >= as_f64(b))?,
            Opcode::JumpUltByte => self.cond_jump(pc0, w1, |a, b| (a as u8) < (b as u8))?,
            Opcode::JumpUgtByte => self.cond_jump(pc0, w1, |a, b| (a as u8) > (b as u8))?,
            Opcode::JumpUleByte => self.cond_jump(pc0, w1, |a, b| (a as u8) <= (b as u8))?,
            Opcode::JumpUgeByte => self.cond_jump(pc0, w1, |a, b| (a as u8) >= (b as u8))?,
            Opcode::JumpUltInt => self.cond_jump(pc0, w1, |a, b| (a as u32) < (b as u32))?,
            Opcode::JumpUgtInt => self.cond_jump(pc0, w1, |a, b| (a as u32) > (b as u32))?,
            Opcode::JumpUleInt => self.cond_jump(pc0, w1, |a, b| (a as u32) <= (b as u32))?,
            Opcode::JumpUgeInt => self.cond_jump(pc0, w1, |a, b| (a as u32) >= (b as u32))?,
            Opcode::JumpUltLong => self.cond_jump(pc0, w1, |a, b| a < b)?,
            Opcode::JumpUgtLong => self.cond_jump(pc0, w1, |a, b| a > b)?,
            Opcode::JumpUleLong => self.cond_jump(pc0, w1, |a, b| a <= b)?,
            Opcode::JumpUgeLong => self.cond_jump(pc0, w1, |a, b| a >= b)?,
            Opcode::JumpEqRef => self.cond_jump(pc0, w1, |a, b| a == b)?,
            Opcode::JumpNeRef => self.cond_jump(pc0, w1, |a, b| a != b)?,

            // Dispatch and prologues.
            Opcode::Dispatch => self.dispatch(pc0, decode::a_unsigned(w1), false)?,
            Opcode::DispatchMethod => self.dispatch(pc0, decode::a_unsigned(w1), true)?,
            Opcode::JumpReg => {
                let target = self.fetch()? as i32;
                if self.regs.get(decode::c_x(w1)) == decode::c_y(w1) as Word {
                    self.branch(pc0, target as i64);
                }
            }
            Opcode::Fnentry => self.fnentry(pc0, decode::a_unsigned(w1) as Word)?,
        }

        Ok(Flow::Continue)
    }
}
