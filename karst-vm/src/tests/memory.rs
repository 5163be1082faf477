use super::test_helpers::{boot, image, run_image, MAIN_STACK_BYTES, STACK_TYPE};
use crate::{
    consts::OBJECT_HEADER_BYTES, value, Host, Interpreter, NullHost, Termination, VmError,
    VmParams,
};

use karst_asm::{Opcode, ProgramBuilder, Word};

#[test]
fn store_and_load_through_a_global_address() {
    let mut p = ProgramBuilder::new();
    p.op_c_u(Opcode::SetGlobal, 0, 0, 0);
    p.op_d(Opcode::SetWide, 1, 0xdead_beef_cafe_f00d);
    p.op_e(Opcode::Store8, 0, 1, 0, 0);
    p.op_e(Opcode::Load8, 2, 0, 0, 0);
    p.op_b(Opcode::SetRegLocal, 0, 2);
    p.op_a_u(Opcode::Return, 0);

    let mut img = image(p.into_words(), vec![0]);
    img.global_offsets = vec![0x40];
    let vm = run_image(img, NullHost).unwrap();
    assert_eq!(vm.registers().get(0), 0xdead_beef_cafe_f00d);

    // The write landed at globals_base + offset.
    let addr = vm.params().globals_base + 0x40;
    assert_eq!(vm.memory().read_u64(addr).unwrap(), 0xdead_beef_cafe_f00d);
}

#[test]
fn narrow_stores_truncate_and_narrow_loads_zero_extend() {
    let mut p = ProgramBuilder::new();
    p.op_c_u(Opcode::SetGlobal, 0, 0, 0);
    p.op_d(Opcode::SetWide, 1, 0xffff_ffff_ffff_ffff);
    p.op_e(Opcode::Store8, 0, 1, 0, 0);
    p.op_d(Opcode::SetWide, 2, 0x1234_5678_9abc_def0);
    p.op_e(Opcode::Store1, 0, 2, 0, 2); // one byte at +2
    p.op_e(Opcode::Load4, 3, 0, 0, 0);
    p.op_e(Opcode::Load1, 4, 0, 0, 2);
    p.op_b(Opcode::SetRegLocal, 0, 3);
    p.op_b(Opcode::SetRegLocal, 1, 4);
    p.op_a_u(Opcode::Return, 0);

    let mut img = image(p.into_words(), vec![0]);
    img.global_offsets = vec![0];
    let vm = run_image(img, NullHost).unwrap();
    assert_eq!(vm.registers().get(0), 0xfff0_ffff, "byte patched at +2");
    assert_eq!(vm.registers().get(1), 0xf0, "byte load is zero-extended");
}

#[test]
fn indexed_access_adds_a_slot_offset() {
    let mut p = ProgramBuilder::new();
    p.op_c_u(Opcode::SetData, 0, 0, 0);
    p.op_d(Opcode::SetWide, 1, 16); // variable offset
    p.op_d(Opcode::SetWide, 2, 0x77);
    p.op_e(Opcode::Store8Indexed, 0, 2, 1, 8); // data + 8 + 16
    p.op_e(Opcode::Load8Indexed, 3, 0, 1, 8);
    p.op_b(Opcode::SetRegLocal, 0, 3);
    p.op_a_u(Opcode::Return, 0);

    let mut img = image(p.into_words(), vec![0]);
    img.data_offsets = vec![4]; // record at data_base + 32
    let vm = run_image(img, NullHost).unwrap();
    assert_eq!(vm.registers().get(0), 0x77);
    let addr = vm.params().data_base + 8 * 4 + 24;
    assert_eq!(vm.memory().read_u64(addr).unwrap(), 0x77);
}

#[test]
fn data_addresses_scale_by_words() {
    let mut p = ProgramBuilder::new();
    p.op_c_u(Opcode::SetData, 0, 0, 1);
    p.op_b(Opcode::SetRegLocal, 0, 0);
    p.op_a_u(Opcode::Return, 0);

    let mut img = image(p.into_words(), vec![0]);
    img.data_offsets = vec![0, 6];
    let vm = run_image(img, NullHost).unwrap();
    assert_eq!(vm.registers().get(0), vm.params().data_base + 48);
}

#[test]
fn constants_and_wide_immediates_load_verbatim() {
    let mut p = ProgramBuilder::new();
    p.op_c_u(Opcode::SetConst, 0, 0, 1);
    p.op_b(Opcode::SetRegLocal, 0, 0);
    p.op_c_u(Opcode::SetRegSigned, 1, 0, -2i32 as u32);
    p.op_a_u(Opcode::Return, 0);

    let mut img = image(p.into_words(), vec![0]);
    img.consts = vec![5, value::tag_int(-1), 7];
    let vm = run_image(img, NullHost).unwrap();
    assert_eq!(vm.registers().get(0), value::tag_int(-1));
    assert_eq!(vm.registers().get(1) as i64, -2);
}

#[test]
fn successful_reserve_hops_and_alloc_bumps_the_heap() {
    let mut p = ProgramBuilder::new();
    p.op_d(Opcode::SetWide, 1, 42); // type id, words 0..3
    p.op_c_u(Opcode::ReserveConst, 2, 0, 0x100); // words 3..5, hop -> word 5
    p.op_e(Opcode::AllocConst, 0, 1, 0, 0x18); // words 5..7
    p.op_b(Opcode::SetRegLocal, 0, 0); // word 7
    p.op_a_u(Opcode::Return, 0);

    let img = image(p.into_words(), vec![0]);
    let mut vm = boot(img, NullHost);
    let stack = vm.spawn_stack(MAIN_STACK_BYTES, 0, STACK_TYPE).unwrap();
    let top0 = vm.heap().top;
    assert_eq!(vm.enter(stack).unwrap(), Termination::Exit(-1));

    let reference = vm.registers().get(0);
    assert_eq!(reference, value::ptr_to_ref(top0));
    assert_eq!(vm.memory().read_u64(top0).unwrap(), 42, "type header");
    assert_eq!(vm.heap().top, top0 + OBJECT_HEADER_BYTES + 0x18);
}

#[test]
fn alloc_local_rounds_the_payload_up() {
    let mut p = ProgramBuilder::new();
    p.op_d(Opcode::SetWide, 1, 9); // type id
    p.op_d(Opcode::SetWide, 2, 13); // requested payload bytes
    p.op_c_u(Opcode::ReserveLocal, 2, 0, 2); // size slot 2, hop over nothing
    p.op_e(Opcode::AllocLocal, 0, 1, 2, 0);
    p.op_a_u(Opcode::Return, 0);

    let img = image(p.into_words(), vec![0]);
    let mut vm = boot(img, NullHost);
    let stack = vm.spawn_stack(MAIN_STACK_BYTES, 0, STACK_TYPE).unwrap();
    let top0 = vm.heap().top;
    vm.enter(stack).unwrap();
    assert_eq!(vm.heap().top, top0 + 8 + 16, "13 bytes round up to 16");
}

/// A host whose "collector" widens the heap window instead of moving
/// anything, plus a counter to prove the trap fired exactly once.
#[derive(Default)]
struct GrowingCollector {
    collections: usize,
    granted: Word,
}

impl Host for GrowingCollector {
    fn collect_garbage(vm: &mut Interpreter<Self>, requested: Word) -> Result<Word, VmError> {
        vm.host_mut().collections += 1;
        let grant = requested.max(0x1000);
        vm.host_mut().granted = grant;
        vm.heap_mut().limit += grant;
        Ok(vm.heap().remaining())
    }
}

#[test]
fn reserve_miss_traps_into_the_extender_and_retries() {
    let params = VmParams::default();
    let heap_bytes = params.heap_limit - params.heap_base;
    let big = heap_bytes; // cannot fit after the stack allocation

    let mut p = ProgramBuilder::new();
    // main
    p.op_d(Opcode::SetWide, 1, 7); // type id, words 0..3
    p.op_c_u(Opcode::ReserveConst, 4, 2, big as u32); // words 3..5, hop -> word 7
    // recovery stub emitted after every reserve: pop the trap frame and
    // re-run the check
    p.op_a_u(Opcode::PopFrame, 2); // word 5
    p.op_a_s(Opcode::Goto, -3); // word 6, back to the reserve
    p.op_e(Opcode::AllocConst, 0, 1, 0, 0x20); // words 7..9
    p.op_b(Opcode::SetRegLocal, 0, 0);
    p.op_a_u(Opcode::Return, 0);
    let extend_heap = p.word_offset();
    // the in-language extender: forward the requested size to the collector
    p.op_b(Opcode::GetReg, 0, 2);
    p.op_b(Opcode::Gc, 1, 0);
    p.op_a_u(Opcode::Return, 0);

    let mut img = image(p.into_words(), vec![0, extend_heap]);
    img.extend_heap_id = 1;

    let mut vm = boot(img, GrowingCollector::default());
    let stack = vm.spawn_stack(MAIN_STACK_BYTES, 0, STACK_TYPE).unwrap();
    assert_eq!(vm.enter(stack).unwrap(), Termination::Exit(-1));

    assert_eq!(vm.host().collections, 1);
    assert_eq!(vm.host().granted, big);
    let reference = vm.registers().get(0);
    assert_eq!(value::tag_of(reference), value::TAG_REF);
    // The allocation landed and the heap invariant holds.
    assert!(vm.heap().top <= vm.heap().limit);
    assert_eq!(
        vm.memory().read_u64(value::ref_to_ptr(reference)).unwrap(),
        7
    );
}

#[test]
fn gc_opcode_reports_remaining_bytes() {
    let mut p = ProgramBuilder::new();
    p.op_d(Opcode::SetWide, 0, 0x40); // requested
    p.op_b(Opcode::Gc, 1, 0);
    p.op_b(Opcode::SetRegLocal, 0, 1);
    p.op_a_u(Opcode::Return, 0);

    let img = image(p.into_words(), vec![0]);
    let mut vm = boot(img, NullHost);
    let stack = vm.spawn_stack(MAIN_STACK_BYTES, 0, STACK_TYPE).unwrap();
    vm.enter(stack).unwrap();
    assert_eq!(
        vm.registers().get(0),
        vm.heap().limit - vm.heap().top,
        "remaining equals limit minus top after collection"
    );
}

#[test]
fn heap_top_is_monotonic_between_collections() {
    let mut p = ProgramBuilder::new();
    p.op_d(Opcode::SetWide, 1, 1); // type id
    p.op_c_u(Opcode::ReserveConst, 2, 0, 0x40);
    p.op_e(Opcode::AllocConst, 0, 1, 0, 0x8);
    p.op_c_u(Opcode::ReserveConst, 2, 0, 0x40);
    p.op_e(Opcode::AllocConst, 2, 1, 0, 0x10);
    p.op_a_u(Opcode::Return, 0);

    let img = image(p.into_words(), vec![0]);
    let mut vm = boot(img, NullHost);
    let stack = vm.spawn_stack(MAIN_STACK_BYTES, 0, STACK_TYPE).unwrap();
    let top0 = vm.heap().top;
    vm.enter(stack).unwrap();
    assert_eq!(vm.heap().top, top0 + (8 + 8) + (8 + 16));
}

#[test]
fn wild_addresses_fault_instead_of_corrupting() {
    let mut p = ProgramBuilder::new();
    p.op_d(Opcode::SetWide, 0, u64::MAX - 11);
    p.op_e(Opcode::Load8, 1, 0, 0, 0);
    p.op_a_u(Opcode::Return, 0);

    let err = run_image(image(p.into_words(), vec![0]), NullHost).unwrap_err();
    assert!(matches!(err, VmError::MemoryAccess { .. }));
}
