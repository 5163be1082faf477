use crate::{Opcode, RawWord};

/// Packs instructions into a word buffer.
///
/// Offsets handed to branch emitters are in instruction words, relative to
/// the first word of the branch being emitted, exactly as the interpreter
/// consumes them. [`ProgramBuilder::word_offset`] reports the position the
/// next instruction will start at, which is what label arithmetic needs.
///
/// Operand ranges are debug-asserted; the packing itself truncates, so a
/// release-mode caller that overflows a field corrupts its own program, not
/// the builder.
#[derive(Debug, Default, Clone)]
pub struct ProgramBuilder {
    words: Vec<RawWord>,
}

impl ProgramBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Word offset at which the next emitted instruction will begin.
    pub fn word_offset(&self) -> u32 {
        self.words.len() as u32
    }

    /// Finish and return the instruction words.
    pub fn into_words(self) -> Vec<RawWord> {
        self.words
    }

    fn push(&mut self, w: RawWord) {
        self.words.push(w);
    }

    /// Template A with an unsigned 24-bit operand.
    pub fn op_a_u(&mut self, op: Opcode, value: u32) {
        debug_assert!(value < 1 << 24);
        self.push(op as u32 | (value << 8));
    }

    /// Template A with a signed 24-bit operand.
    pub fn op_a_s(&mut self, op: Opcode, value: i32) {
        debug_assert!((-(1 << 23)..1 << 23).contains(&value));
        self.push(op as u32 | (((value as u32) & 0xff_ffff) << 8));
    }

    /// Template B: one slot and a 14-bit immediate.
    pub fn op_b(&mut self, op: Opcode, x: u16, value: u32) {
        debug_assert!(x < 1 << 10 && value < 1 << 14);
        self.push(op as u32 | ((x as u32) << 8) | (value << 18));
    }

    /// Template C: two slots and an unsigned 32-bit immediate.
    pub fn op_c_u(&mut self, op: Opcode, x: u16, y: u16, value: u32) {
        debug_assert!(x < 1 << 10 && y < 1 << 10);
        self.push(op as u32 | ((x as u32) << 8) | ((y as u32) << 22));
        self.push(value);
    }

    /// Template C: two slots and a signed 32-bit immediate.
    pub fn op_c_s(&mut self, op: Opcode, x: u16, y: u16, value: i32) {
        self.op_c_u(op, x, y, value as u32);
    }

    /// Template D: one slot and a 64-bit immediate.
    pub fn op_d(&mut self, op: Opcode, x: u16, value: u64) {
        debug_assert!(x < 1 << 10);
        self.push(op as u32 | ((x as u32) << 22));
        self.push(value as u32);
        self.push((value >> 32) as u32);
    }

    /// Template E: three slots and a signed 26-bit immediate.
    pub fn op_e(&mut self, op: Opcode, x: u16, y: u16, z: u16, value: i64) {
        debug_assert!(x < 1 << 10 && y < 1 << 10 && z < 1 << 10);
        debug_assert!((-(1 << 25)..1 << 25).contains(&value));
        let packed = op as u64
            | ((x as u64) << 8)
            | ((y as u64) << 18)
            | ((z as u64) << 28)
            | ((value as u64) << 38);
        self.push(packed as u32);
        self.push((packed >> 32) as u32);
    }

    /// Template F: two slots and two signed 18-bit branch offsets.
    pub fn op_f(&mut self, op: Opcode, x: u16, y: u16, taken: i32, not_taken: i32) {
        debug_assert!(x < 1 << 10 && y < 1 << 10);
        debug_assert!((-(1 << 17)..1 << 17).contains(&taken));
        debug_assert!((-(1 << 17)..1 << 17).contains(&not_taken));
        let packed = op as u64
            | ((x as u64) << 8)
            | ((y as u64) << 18)
            | (((taken as u64) & 0x3ffff) << 28)
            | (((not_taken as u64) & 0x3ffff) << 46);
        self.push(packed as u32);
        self.push((packed >> 32) as u32);
    }

    /// A dispatch opcode followed by its inline target table. Targets are
    /// word offsets relative to the dispatch instruction itself.
    pub fn dispatch_table(&mut self, op: Opcode, format: u32, targets: &[i32]) {
        self.op_a_u(op, format);
        self.push(targets.len() as u32);
        for &t in targets {
            self.push(t as u32);
        }
    }
}
