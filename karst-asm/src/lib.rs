//! Instruction set of the Karst virtual machine.
//!
//! Karst instructions are sequences of little-endian 32-bit words. The low
//! 8 bits of the first word carry the opcode; the remaining bits, and for
//! some opcodes one or two trailing words, carry packed operands. Six
//! packing templates (A through F) cover the whole instruction set; see
//! [`decode`] for the exact bit layouts and [`ProgramBuilder`] for the
//! encoding side.

#![warn(missing_docs)]

mod builder;
pub mod decode;
mod opcode;

pub use builder::ProgramBuilder;
pub use opcode::{InvalidOpcode, Opcode};

/// A single raw instruction word.
pub type RawWord = u32;

/// Machine word of the VM. Every slot, register and immediate widens to
/// one of these.
pub type Word = u64;

#[cfg(test)]
mod encoding_tests;
