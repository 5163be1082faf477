//! The trap interface between the interpreter and its embedder.

use crate::{error::VmError, interpreter::Interpreter};

use karst_asm::Word;

/// Embedder hooks the interpreter calls out through.
///
/// Hooks are associated functions over the full interpreter so a handler
/// can reach memory, both register files, the heap window and its own
/// state (via [`Interpreter::host_mut`]) while the loop is suspended. The
/// interpreter guarantees the suspension protocol around every hook: state
/// is saved before the call and restored afterwards, so a hook may move
/// heap objects and rewrite references as long as it leaves the saved
/// `(sp, pc)` pairs and the heap window coherent.
///
/// Every hook has an inert default, so an embedder overrides only what it
/// wires up: foreign calls do nothing, dispatch resolves to index zero,
/// and "collection" reports the space already available.
pub trait Host: Sized {
    /// Raw foreign call: marshalling is the callee's business, arguments
    /// and results travel through the active register file in place.
    fn trampoline(_vm: &mut Interpreter<Self>, _address: Word) -> Result<(), VmError> {
        Ok(())
    }

    /// Foreign call through a pre-registered marshalling stub.
    fn launch_foreign(
        _vm: &mut Interpreter<Self>,
        _stub: u32,
        _address: Word,
    ) -> Result<(), VmError> {
        Ok(())
    }

    /// Collect garbage, trying to make `requested` bytes available.
    /// Returns the bytes remaining below the heap limit afterwards.
    fn collect_garbage(vm: &mut Interpreter<Self>, _requested: Word) -> Result<Word, VmError> {
        Ok(vm.heap().remaining())
    }

    /// Resolve a dispatch-table index for the given table format,
    /// consulting arguments in the active register file.
    fn dispatch_branch(_vm: &mut Interpreter<Self>, _format: u32) -> Result<u32, VmError> {
        Ok(0)
    }

    /// Address of the name of a class.
    fn class_name(_vm: &mut Interpreter<Self>, _class: Word) -> Result<Word, VmError> {
        Ok(0)
    }

    /// Render a trace of the given (tagged) stack reference.
    fn print_stack_trace(_vm: &mut Interpreter<Self>, stack_ref: Word) -> Result<(), VmError> {
        tracing::debug!(stack_ref, "stack trace requested with no host tracer");
        Ok(())
    }
}

/// The all-defaults host for embedders that need no traps.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl Host for NullHost {}
