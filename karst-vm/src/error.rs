//! Runtime error surface of the execution core.

use karst_asm::Word;

/// Faults the interpreter can surface.
///
/// Heap and stack exhaustion are not here: those dispatch into the
/// in-language extender routines through the reserve and prologue traps.
/// What remains is either a malformed program (unknown opcode, bad table
/// index), a structural fault the compiled bytecode promised would not
/// happen, or a failing host call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum VmError {
    /// The fetched opcode byte names no instruction.
    #[error("unknown opcode {opcode:#04x} at byte offset {offset}")]
    UnknownOpcode {
        /// The offending byte.
        opcode: u8,
        /// Byte offset of the instruction in the code buffer.
        offset: Word,
    },

    /// The program counter left the code buffer.
    #[error("instruction fetch past the end of code at byte offset {offset}")]
    InstructionFetch {
        /// The out-of-range byte offset.
        offset: Word,
    },

    /// A data access fell outside the memory arena.
    #[error("{width}-byte access at address {addr:#x} is out of bounds")]
    MemoryAccess {
        /// Faulting address.
        addr: Word,
        /// Access width in bytes.
        width: Word,
    },

    /// A function id without a code offset.
    #[error("function id {id} has no code offset")]
    BadFunction {
        /// The unresolvable id.
        id: Word,
    },

    /// An index past the end of a loader table.
    #[error("index {index} out of bounds for the {table} table")]
    BadTableIndex {
        /// Which table was indexed.
        table: &'static str,
        /// The out-of-range index.
        index: Word,
    },

    /// A dispatch index with no matching table entry.
    #[error("dispatch index {index} outside a {len}-entry target table")]
    BadDispatchIndex {
        /// Index returned by the dispatch resolver.
        index: u32,
        /// Number of entries in the inline table.
        len: u32,
    },

    /// Integer division or remainder by zero.
    #[error("division by zero")]
    ArithmeticFault,

    /// The loaded image does not fit the configured memory layout.
    #[error("image does not fit the configured memory layout: {0}")]
    BadImage(&'static str),

    /// An embedder-side allocation ran the heap out.
    #[error("heap exhausted allocating {requested} bytes")]
    HeapExhausted {
        /// The request that failed.
        requested: Word,
    },

    /// A host hook failed.
    #[error("host call failed: {0}")]
    Host(String),
}
