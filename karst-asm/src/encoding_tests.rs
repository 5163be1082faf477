use crate::{decode, Opcode, ProgramBuilder};

use proptest::prelude::*;

fn slot() -> impl Strategy<Value = u16> {
    0u16..1 << 10
}

proptest! {
    #[test]
    fn a_unsigned_round_trip(value in 0u32..1 << 24) {
        let mut b = ProgramBuilder::new();
        b.op_a_u(Opcode::PopFrame, value);
        let words = b.into_words();
        prop_assert_eq!(words.len(), 1);
        prop_assert_eq!(decode::opcode_byte(words[0]), Opcode::PopFrame as u8);
        prop_assert_eq!(decode::a_unsigned(words[0]), value);
    }

    #[test]
    fn a_signed_round_trip(value in -(1i32 << 23)..1 << 23) {
        let mut b = ProgramBuilder::new();
        b.op_a_s(Opcode::Goto, value);
        let words = b.into_words();
        prop_assert_eq!(decode::a_signed(words[0]), value);
    }

    #[test]
    fn b_round_trip(x in slot(), value in 0u32..1 << 14) {
        let mut b = ProgramBuilder::new();
        b.op_b(Opcode::SetLocal, x, value);
        let words = b.into_words();
        prop_assert_eq!(decode::b_x(words[0]), x);
        prop_assert_eq!(decode::b_value(words[0]), value);
    }

    #[test]
    fn c_round_trip(x in slot(), y in slot(), value: u32) {
        let mut b = ProgramBuilder::new();
        b.op_c_u(Opcode::ReserveConst, x, y, value);
        let words = b.into_words();
        prop_assert_eq!(words.len(), 2);
        prop_assert_eq!(decode::c_x(words[0]), x);
        prop_assert_eq!(decode::c_y(words[0]), y);
        prop_assert_eq!(words[1], value);
    }

    #[test]
    fn d_round_trip(x in slot(), value: u64) {
        let mut b = ProgramBuilder::new();
        b.op_d(Opcode::SetWide, x, value);
        let words = b.into_words();
        prop_assert_eq!(words.len(), 3);
        prop_assert_eq!(decode::d_x(words[0]), x);
        prop_assert_eq!(decode::wide(words[1], words[2]), value);
    }

    #[test]
    fn e_round_trip(
        x in slot(),
        y in slot(),
        z in slot(),
        value in -(1i64 << 25)..1 << 25,
    ) {
        let mut b = ProgramBuilder::new();
        b.op_e(Opcode::AddLong, x, y, z, value);
        let words = b.into_words();
        prop_assert_eq!(words.len(), 2);
        let w12 = decode::wide(words[0], words[1]);
        prop_assert_eq!(decode::opcode_byte(words[0]), Opcode::AddLong as u8);
        prop_assert_eq!(decode::e_x(w12), x);
        prop_assert_eq!(decode::e_y(w12), y);
        prop_assert_eq!(decode::e_z(w12), z);
        prop_assert_eq!(decode::e_value(w12), value);
    }

    #[test]
    fn f_round_trip(
        x in slot(),
        y in slot(),
        taken in -(1i32 << 17)..1 << 17,
        not_taken in -(1i32 << 17)..1 << 17,
    ) {
        let mut b = ProgramBuilder::new();
        b.op_f(Opcode::JumpLtInt, x, y, taken, not_taken);
        let words = b.into_words();
        let w12 = decode::wide(words[0], words[1]);
        prop_assert_eq!(decode::f_x(w12), x);
        prop_assert_eq!(decode::f_y(w12), y);
        prop_assert_eq!(decode::f_taken(w12), taken);
        prop_assert_eq!(decode::f_not_taken(words[1]), not_taken);
    }
}

#[test]
fn dispatch_table_layout() {
    let mut b = ProgramBuilder::new();
    b.dispatch_table(Opcode::Dispatch, 3, &[10, 20, 30]);
    let words = b.into_words();
    assert_eq!(words.len(), 5);
    assert_eq!(decode::a_unsigned(words[0]), 3);
    assert_eq!(words[1], 3);
    assert_eq!(&words[2..], &[10, 20, 30]);
}
