use super::test_helpers::{image, run_image, run_main};
use crate::{Host, Interpreter, NullHost, VmError};

use karst_asm::{Opcode, ProgramBuilder};

/// Resolves every dispatch to a fixed index and records the format seen.
#[derive(Debug)]
struct FixedIndex {
    index: u32,
    format_seen: u32,
}

impl Host for FixedIndex {
    fn dispatch_branch(vm: &mut Interpreter<Self>, format: u32) -> Result<u32, VmError> {
        vm.host_mut().format_seen = format;
        Ok(vm.host().index)
    }
}

/// A dispatch at word 0 over three 3-word arms, each writing its own
/// marker into register 0.
fn dispatch_program(op: Opcode) -> ProgramBuilder {
    let mut p = ProgramBuilder::new();
    p.dispatch_table(op, 6, &[5, 8, 11]); // words 0..5
    p.op_c_u(Opcode::SetRegUnsigned, 0, 0, 10); // words 5..7
    p.op_a_u(Opcode::Return, 0); // word 7
    p.op_c_u(Opcode::SetRegUnsigned, 0, 0, 20); // words 8..10
    p.op_a_u(Opcode::Return, 0); // word 10
    p.op_c_u(Opcode::SetRegUnsigned, 0, 0, 30); // words 11..13
    p.op_a_u(Opcode::Return, 0);
    p
}

#[test]
fn dispatch_branches_through_the_inline_table() {
    for (index, expect) in [(0u32, 10u64), (1, 20), (2, 30)] {
        let vm = run_main(
            dispatch_program(Opcode::Dispatch),
            FixedIndex {
                index,
                format_seen: u32::MAX,
            },
        )
        .unwrap();
        assert_eq!(vm.registers().get(0), expect);
        assert_eq!(vm.host().format_seen, 6, "table format reaches the resolver");
    }
}

#[test]
fn dispatch_rejects_an_index_past_the_table() {
    let err = run_main(
        dispatch_program(Opcode::Dispatch),
        FixedIndex {
            index: 7,
            format_seen: 0,
        },
    )
    .unwrap_err();
    assert_eq!(err, VmError::BadDispatchIndex { index: 7, len: 3 });
}

#[test]
fn dispatch_method_keeps_the_first_two_indices_in_the_table() {
    let vm = run_main(
        dispatch_program(Opcode::DispatchMethod),
        FixedIndex {
            index: 1,
            format_seen: 0,
        },
    )
    .unwrap();
    assert_eq!(vm.registers().get(0), 20, "index 1 is still a table target");
}

#[test]
fn dispatch_method_maps_later_indices_to_function_ids() {
    let mut p = ProgramBuilder::new();
    p.dispatch_table(Opcode::DispatchMethod, 0, &[4, 5]); // words 0..4
    p.op_a_u(Opcode::Return, 0); // word 4: "no method"
    p.op_a_u(Opcode::Return, 0); // word 5: "ambiguous"
    let method = p.word_offset();
    p.op_c_u(Opcode::SetRegUnsigned, 0, 0, 99);
    p.op_a_u(Opcode::Return, 0);

    // Index 3 resolves to function id 3 - 2 = 1.
    let img = image(p.into_words(), vec![0, method]);
    let vm = run_image(
        img,
        FixedIndex {
            index: 3,
            format_seen: 0,
        },
    )
    .unwrap();
    assert_eq!(vm.registers().get(0), 99);
}

#[test]
fn typeof_returns_the_index_without_branching() {
    let mut p = ProgramBuilder::new();
    p.op_b(Opcode::Typeof, 0, 9); // format 9
    p.op_b(Opcode::SetRegLocal, 0, 0);
    p.op_a_u(Opcode::Return, 0);

    let vm = run_main(
        p,
        FixedIndex {
            index: 4,
            format_seen: u32::MAX,
        },
    )
    .unwrap();
    assert_eq!(vm.registers().get(0), 4);
    assert_eq!(vm.host().format_seen, 9);
}

#[test]
fn null_host_dispatch_selects_index_zero() {
    let vm = run_main(dispatch_program(Opcode::Dispatch), NullHost).unwrap();
    assert_eq!(vm.registers().get(0), 10);
}

/// The resolver sees the register file exactly as the program left it.
#[test]
fn dispatch_consults_the_registers() {
    struct RegDriven;
    impl Host for RegDriven {
        fn dispatch_branch(vm: &mut Interpreter<Self>, _format: u32) -> Result<u32, VmError> {
            Ok(vm.registers().get(7) as u32)
        }
    }

    let mut p = ProgramBuilder::new();
    p.op_c_u(Opcode::SetRegUnsigned, 7, 0, 2); // words 0..2
    let at = p.word_offset() as i32;
    p.dispatch_table(Opcode::Dispatch, 0, &[7 - at, 10 - at, 13 - at]);
    p.op_c_u(Opcode::SetRegUnsigned, 0, 0, 10);
    p.op_a_u(Opcode::Return, 0);
    p.op_c_u(Opcode::SetRegUnsigned, 0, 0, 20);
    p.op_a_u(Opcode::Return, 0);
    p.op_c_u(Opcode::SetRegUnsigned, 0, 0, 30);
    p.op_a_u(Opcode::Return, 0);

    let vm = run_main(p, RegDriven).unwrap();
    assert_eq!(vm.registers().get(0), 30);
}

#[test]
fn dispatch_scenario_lands_at_table_offset_times_four() {
    // A dispatch at word 12 with targets in words relative to itself.
    let mut p = ProgramBuilder::new();
    for _ in 0..6 {
        p.op_c_u(Opcode::SetRegUnsigned, 1, 0, 0); // words 0..12: padding
    }
    let pc0 = p.word_offset();
    assert_eq!(pc0, 12);
    p.dispatch_table(Opcode::Dispatch, 0, &[5, 8, 11]); // words 12..17
    p.op_c_u(Opcode::SetRegUnsigned, 0, 0, 1); // word 17 (pc0 + 5)
    p.op_a_u(Opcode::Return, 0);
    p.op_c_u(Opcode::SetRegUnsigned, 0, 0, 2); // word 20 (pc0 + 8)
    p.op_a_u(Opcode::Return, 0);
    p.op_c_u(Opcode::SetRegUnsigned, 0, 0, 3); // word 23 (pc0 + 11)
    p.op_a_u(Opcode::Return, 0);

    let vm = run_main(
        p,
        FixedIndex {
            index: 1,
            format_seen: 0,
        },
    )
    .unwrap();
    assert_eq!(vm.registers().get(0), 2, "landed at byte pc0*4 + 8*4");
}

#[test]
fn dump_renders_without_disturbing_execution() {
    let mut p = ProgramBuilder::new();
    p.op_d(Opcode::SetWide, 0, f64::to_bits(1.5));
    for kind in 0..6 {
        p.op_b(Opcode::Dump, 0, kind);
    }
    p.op_b(Opcode::SetRegLocal, 0, 0);
    p.op_a_u(Opcode::Return, 0);

    let vm = run_main(p, NullHost).unwrap();
    assert_eq!(vm.registers().get(0), f64::to_bits(1.5));
}
