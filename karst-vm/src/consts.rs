//! Layout parameters of the execution core.

use karst_asm::Word;

use core::mem;

/// Length of a slot, in bytes.
pub const WORD_SIZE: usize = mem::size_of::<Word>();

/// Length of each register file. Covers the whole 10-bit register operand
/// space so register access never needs a range check; must stay a power
/// of two.
pub const REGISTER_COUNT: usize = 1024;

/// Byte size of a frame header: saved return pc plus liveness bitmap.
pub const FRAME_HEADER_BYTES: Word = 16;

/// Offset of the saved return pc within a frame.
pub const FRAME_RETURN_PC: Word = 0;

/// Offset of the liveness bitmap within a frame.
pub const FRAME_LIVENESS: Word = 8;

/// Byte size of a heap object header (the type-id word).
pub const OBJECT_HEADER_BYTES: Word = 8;

/// Stack object payload: byte size of the frame arena.
pub const STACK_SIZE: Word = 0;
/// Stack object payload: address of the frame arena.
pub const STACK_FRAMES: Word = 8;
/// Stack object payload: saved stack pointer.
pub const STACK_SP: Word = 16;
/// Stack object payload: saved resume offset, or the entry function id of
/// a stack that has never run.
pub const STACK_PC: Word = 24;
/// Byte size of the stack object fields ahead of the frame arena.
pub const STACK_HEADER_BYTES: Word = 32;

/// Return pc sentinel marking a frame that returns across a system-stack
/// transition.
pub const SYSTEM_RETURN_STUB: i64 = -2;

/// Return pc sentinel marking the bottom frame of a stack; returning
/// through it leaves the interpreter.
pub const EXIT_RETURN: i64 = -1;

/// Frame byte size for a given locals count.
pub const fn frame_bytes(locals: Word) -> Word {
    FRAME_HEADER_BYTES + (WORD_SIZE as Word) * locals
}

/// Round a byte count up to slot granularity.
pub const fn align_word(bytes: Word) -> Word {
    (bytes + (WORD_SIZE as Word - 1)) & !(WORD_SIZE as Word - 1)
}

static_assertions::const_assert_eq!(FRAME_HEADER_BYTES, 2 * WORD_SIZE as Word);
static_assertions::const_assert_eq!(STACK_HEADER_BYTES, 4 * WORD_SIZE as Word);
static_assertions::const_assert!(REGISTER_COUNT.is_power_of_two());
