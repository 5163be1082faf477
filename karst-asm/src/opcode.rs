use core::fmt;

/// The byte does not name any Karst instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid opcode byte {0:#04x}")]
pub struct InvalidOpcode(pub u8);

macro_rules! opcodes {
    ($($(#[$attr:meta])* $name:ident = $num:literal,)*) => {
        /// Numeric instruction tags.
        ///
        /// The discriminants are part of the bytecode ABI and never move;
        /// gaps in the numbering are reserved and decode to
        /// [`InvalidOpcode`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[repr(u8)]
        pub enum Opcode {
            $($(#[$attr])* $name = $num,)*
        }

        impl TryFrom<u8> for Opcode {
            type Error = InvalidOpcode;

            fn try_from(b: u8) -> Result<Self, InvalidOpcode> {
                match b {
                    $($num => Ok(Self::$name),)*
                    _ => Err(InvalidOpcode(b)),
                }
            }
        }
    };
}

opcodes! {
    // Data movement into frame slots.
    /// `local[x] = local[value]`.
    SetLocal = 0,
    /// `local[x] = value`, zero-extended.
    SetUnsigned = 1,
    /// `local[x] = value`, sign-extended.
    SetSigned = 2,
    /// `local[x] = value`, a function id.
    SetCode = 3,
    /// `local[x] = extern_addrs[value]`.
    SetExtern = 4,
    /// `local[x] =` address of global cell `value`.
    SetGlobal = 5,
    /// `local[x] =` address of data record `value`.
    SetData = 6,
    /// `local[x] = consts[value]`.
    SetConst = 7,
    /// `local[x] = value`, a full 64-bit immediate.
    SetWide = 8,

    // Data movement into registers; sources as in the SetLocal block.
    /// `reg[x] = local[value]`.
    SetRegLocal = 9,
    /// `reg[x] = value`, zero-extended.
    SetRegUnsigned = 10,
    /// `reg[x] = value`, sign-extended.
    SetRegSigned = 11,
    /// `reg[x] = value`, a function id.
    SetRegCode = 12,
    /// `reg[x] = extern_addrs[value]`.
    SetRegExtern = 13,
    /// `reg[x] =` address of global cell `value`.
    SetRegGlobal = 14,
    /// `reg[x] =` address of data record `value`.
    SetRegData = 15,
    /// `reg[x] = consts[value]`.
    SetRegConst = 16,
    /// `reg[x] = value`, a full 64-bit immediate.
    SetRegWide = 17,
    /// `local[x] = reg[value]`.
    GetReg = 18,

    // Calls. The locals count rides along so the interpreter can advance
    // past the caller's frame; see `PopFrame` for the inverse.
    /// Call the function whose id is in `local[x]`.
    CallLocal = 19,
    /// Call function id `value`.
    CallCode = 20,
    /// `local[x] = extern_defn_addrs[value]`.
    SetExternDefn = 21,
    /// Call through the closure object referenced by `local[x]`.
    CallClosure = 22,
    /// Tail-call the function whose id is in `local[value]`.
    TcallLocal = 23,
    /// Tail-call function id `value`.
    TcallCode = 24,
    /// `reg[x] = extern_defn_addrs[value]`.
    SetRegExternDefn = 25,
    /// Tail-call through the closure object in `local[value]`.
    TcallClosure = 26,
    /// Foreign call to the address in `local[x]`.
    CallCLocal = 27,
    /// Foreign call to `extern_addrs[value]`.
    CallCExtern = 28,
    /// Foreign call through marshalling stub `y` to `extern_defn_addrs[value]`.
    CallCExternDefn = 29,
    /// Retreat the stack pointer over a `value`-local frame.
    PopFrame = 30,
    /// Record the liveness bitmap `value` in the current frame header.
    Live = 31,
    /// Suspend here and resume the stack referenced by `local[value]`.
    Yield = 32,
    /// Return through the current frame's saved pc.
    Return = 33,
    /// Debug-print `local[x]` rendered per `value`.
    Dump = 34,

    // Tagged small-integer arithmetic. Operands and results keep the
    // integer payload in the upper 32 bits with a zero tag.
    /// `local[x] = local[y] + local[z]` on tagged ints.
    FixAdd = 35,
    /// `local[x] = local[y] - local[z]` on tagged ints.
    FixSub = 36,
    /// Tagged multiply; the left operand is pre-shifted down.
    FixMul = 37,
    /// Tagged divide; the quotient is shifted back up.
    FixDiv = 38,
    /// `local[x] = local[y] % local[z]` on tagged ints.
    FixMod = 39,
    /// Bitwise and of two tagged ints.
    FixAnd = 40,
    /// Bitwise or of two tagged ints.
    FixOr = 41,
    /// Bitwise xor of two tagged ints.
    FixXor = 42,
    /// Tagged shift left by the detagged count in `local[z]`.
    FixShl = 43,
    /// Tagged logical shift right, re-clamped to tagged form.
    FixShr = 44,
    /// Tagged arithmetic shift right, re-clamped to tagged form.
    FixAshr = 45,
    /// Tagged signed less-than; result is a boolean marker.
    FixLt = 46,
    /// Tagged signed greater-than; result is a boolean marker.
    FixGt = 47,
    /// Tagged signed at-most; result is a boolean marker.
    FixLe = 48,
    /// Tagged signed at-least; result is a boolean marker.
    FixGe = 49,

    // Raw equality; results are raw 0/1 bytes.
    /// `local[x] = local[y] == local[z]` over `u8`.
    EqByte = 50,
    /// `local[x] = local[y] != local[z]` over `u8`.
    NeByte = 51,
    /// `local[x] = local[y] == local[z]` over characters.
    EqChar = 52,
    /// `local[x] = local[y] != local[z]` over characters.
    NeChar = 53,
    /// `local[x] = local[y] == local[z]` over `i32`.
    EqInt = 54,
    /// `local[x] = local[y] != local[z]` over `i32`.
    NeInt = 55,
    /// `local[x] = local[y] == local[z]` over `i64`.
    EqLong = 56,
    /// `local[x] = local[y] != local[z]` over `i64`.
    NeLong = 57,
    /// `local[x] = local[y] == local[z]` over `f32`.
    EqFloat = 58,
    /// `local[x] = local[y] != local[z]` over `f32`.
    NeFloat = 59,
    /// `local[x] = local[y] == local[z]` over `f64`.
    EqDouble = 60,
    /// `local[x] = local[y] != local[z]` over `f64`.
    NeDouble = 61,
    /// Whole-slot equality of two tagged values.
    EqRef = 62,
    /// Whole-slot inequality of two tagged values.
    NeRef = 63,

    // Raw i32 arithmetic; results sign-extend into the slot.
    /// `i32` add.
    AddInt = 64,
    /// `i32` subtract.
    SubInt = 65,
    /// `i32` multiply.
    MulInt = 66,
    /// `i32` divide.
    DivInt = 67,
    /// `i32` remainder.
    ModInt = 68,
    /// `i32` bitwise and.
    AndInt = 69,
    /// `i32` bitwise or.
    OrInt = 70,
    /// `i32` bitwise xor.
    XorInt = 71,
    /// `i32` shift left.
    ShlInt = 72,
    /// `u32` logical shift right.
    ShrInt = 73,
    /// `i32` arithmetic shift right.
    AshrInt = 74,
    /// `i32` less-than; raw 0/1 result.
    LtInt = 75,
    /// `i32` greater-than; raw 0/1 result.
    GtInt = 76,
    /// `i32` at-most; raw 0/1 result.
    LeInt = 77,
    /// `i32` at-least; raw 0/1 result.
    GeInt = 78,

    // Raw i64 arithmetic.
    /// `i64` add.
    AddLong = 79,
    /// `i64` subtract.
    SubLong = 80,
    /// `i64` multiply.
    MulLong = 81,
    /// `i64` divide.
    DivLong = 82,
    /// `i64` remainder.
    ModLong = 83,
    /// `i64` bitwise and.
    AndLong = 84,
    /// `i64` bitwise or.
    OrLong = 85,
    /// `i64` bitwise xor.
    XorLong = 86,
    /// `i64` shift left.
    ShlLong = 87,
    /// `u64` logical shift right.
    ShrLong = 88,
    /// `i64` arithmetic shift right.
    AshrLong = 89,
    /// `i64` less-than; raw 0/1 result.
    LtLong = 90,
    /// `i64` greater-than; raw 0/1 result.
    GtLong = 91,
    /// `i64` at-most; raw 0/1 result.
    LeLong = 92,
    /// `i64` at-least; raw 0/1 result.
    GeLong = 93,

    // Raw byte arithmetic; results zero-extend.
    /// `u8` add.
    AddByte = 94,
    /// `u8` subtract.
    SubByte = 95,
    /// `u8` bitwise and.
    AndByte = 96,
    /// `u8` bitwise or.
    OrByte = 97,
    /// `u8` bitwise xor.
    XorByte = 98,
    /// `u8` shift left.
    ShlByte = 99,
    /// `u8` logical shift right.
    ShrByte = 100,
    /// `u8` less-than; raw 0/1 result.
    LtByte = 101,
    /// `u8` greater-than; raw 0/1 result.
    GtByte = 102,
    /// `u8` at-most; raw 0/1 result.
    LeByte = 103,
    /// `u8` at-least; raw 0/1 result.
    GeByte = 104,

    // Raw f32 arithmetic on the low 32 bits of the slot.
    /// `f32` add.
    AddFloat = 105,
    /// `f32` subtract.
    SubFloat = 106,
    /// `f32` multiply.
    MulFloat = 107,
    /// `f32` divide.
    DivFloat = 108,
    /// `f32` less-than; raw 0/1 result.
    LtFloat = 109,
    /// `f32` greater-than; raw 0/1 result.
    GtFloat = 110,
    /// `f32` at-most; raw 0/1 result.
    LeFloat = 111,
    /// `f32` at-least; raw 0/1 result.
    GeFloat = 112,

    // Raw f64 arithmetic across the whole slot.
    /// `f64` add.
    AddDouble = 113,
    /// `f64` subtract.
    SubDouble = 114,
    /// `f64` multiply.
    MulDouble = 115,
    /// `f64` divide.
    DivDouble = 116,
    /// `f64` less-than; raw 0/1 result.
    LtDouble = 117,
    /// `f64` greater-than; raw 0/1 result.
    GtDouble = 118,
    /// `f64` at-most; raw 0/1 result.
    LeDouble = 119,
    /// `f64` at-least; raw 0/1 result.
    GeDouble = 120,

    // Unsigned comparisons; raw 0/1 results.
    /// `u32` less-than.
    UltInt = 121,
    /// `u32` greater-than.
    UgtInt = 122,
    /// `u32` at-most.
    UleInt = 123,
    /// `u32` at-least.
    UgeInt = 124,
    /// `u64` less-than.
    UltLong = 125,
    /// `u64` greater-than.
    UgtLong = 126,
    /// `u64` at-most.
    UleLong = 127,
    /// `u64` at-least.
    UgeLong = 128,
    /// `u8` less-than.
    UltByte = 129,
    /// `u8` greater-than.
    UgtByte = 130,
    /// `u8` at-most.
    UleByte = 131,
    /// `u8` at-least.
    UgeByte = 132,

    // Unary operators.
    /// `i32` bitwise not.
    NotInt = 133,
    /// `i64` bitwise not.
    NotLong = 134,
    /// `i32` negate.
    NegInt = 135,
    /// `i64` negate.
    NegLong = 136,
    /// `f32` negate.
    NegFloat = 137,
    /// `f64` negate.
    NegDouble = 138,
    /// Strip the reference tag and skip the object header.
    Deref = 139,
    /// Store the dispatch index for format `value` without branching.
    Typeof = 140,

    // Control transfer.
    /// Unconditional branch by `value` words from the instruction start.
    Goto = 144,
    /// Two-target branch on `local[x] != 0`.
    JumpSet = 145,

    // Width and representation conversions, C-style.
    /// `u8` to `i32`.
    ByteToInt = 146,
    /// `u8` to `i64`.
    ByteToLong = 147,
    /// `u8` to `f32`.
    ByteToFloat = 148,
    /// `i32` to `u8` (truncating).
    IntToByte = 149,
    /// `i32` to `i64` (sign-extending).
    IntToLong = 150,
    /// `i32` to `f32`.
    IntToFloat = 151,
    /// `i32` to `f64`.
    IntToDouble = 152,
    /// `i64` to `u8` (truncating).
    LongToByte = 153,
    /// `i64` to `i32` (truncating).
    LongToInt = 154,
    /// `i64` to `f32`.
    LongToFloat = 155,
    /// `i64` to `f64`.
    LongToDouble = 156,
    /// `f32` to `i32` (truncating).
    FloatToInt = 157,
    /// `f32` to `i64` (truncating).
    FloatToLong = 158,
    /// `f32` to `f64`.
    FloatToDouble = 159,
    /// `f64` to `i32` (truncating).
    DoubleToInt = 160,
    /// `f64` to `i64` (truncating).
    DoubleToLong = 161,
    /// `f64` to `f32`.
    DoubleToFloat = 162,

    // Moves between raw and tagged representations.
    /// Pack a raw byte into tagged form.
    TagByte = 163,
    /// Pack a raw character into tagged form.
    TagChar = 164,
    /// Pack a raw `i32` into tagged form.
    TagInt = 165,
    /// Pack a raw `f32` into tagged form.
    TagFloat = 166,
    /// Arithmetic shift right by 32: tagged payload to raw.
    Detag = 167,

    // Memory access. Addresses come from a base slot plus offsets; the
    // compiler is responsible for their validity.
    /// Store the low byte of `local[y]` at `local[x] + value`.
    Store1 = 168,
    /// Store the low 32 bits of `local[y]` at `local[x] + value`.
    Store4 = 169,
    /// Store `local[y]` at `local[x] + value`.
    Store8 = 170,
    /// Byte store at `local[x] + local[z] + value`.
    Store1Indexed = 171,
    /// 32-bit store at `local[x] + local[z] + value`.
    Store4Indexed = 172,
    /// 64-bit store at `local[x] + local[z] + value`.
    Store8Indexed = 173,
    /// Load a byte from `local[y] + value` into `local[x]`.
    Load1 = 174,
    /// Load 32 bits from `local[y] + value` into `local[x]`.
    Load4 = 175,
    /// Load 64 bits from `local[y] + value` into `local[x]`.
    Load8 = 176,
    /// Byte load from `local[y] + local[z] + value`.
    Load1Indexed = 177,
    /// 32-bit load from `local[y] + local[z] + value`.
    Load4Indexed = 178,
    /// 64-bit load from `local[y] + local[z] + value`.
    Load8Indexed = 179,

    // Allocation and collection.
    /// Confirm `value` free heap bytes or trap into the heap extender.
    ReserveConst = 180,
    /// As `ReserveConst` with the byte count taken from `local[value]`.
    ReserveLocal = 181,
    /// Cold-switch to the stack referenced by `local[value]`.
    EnterStack = 182,
    /// Allocate a `value`-byte object of type `local[y]` into `local[x]`.
    AllocConst = 183,
    /// As `AllocConst` with the payload size taken from `local[z]`.
    AllocLocal = 184,
    /// Run the collector for `local[value]` bytes; remaining to `local[x]`.
    Gc = 185,
    /// Print a trace of the stack referenced by `local[value]`.
    PrintStackTrace = 186,
    /// Save the interpreter state and expose its token in `local[value]`.
    FlushVm = 188,

    // Typed two-target branches.
    /// Branch on `u8` equality.
    JumpEqByte = 192,
    /// Branch on `u8` inequality.
    JumpNeByte = 193,
    /// Branch on `u8` less-than.
    JumpLtByte = 194,
    /// Branch on `u8` greater-than.
    JumpGtByte = 195,
    /// Branch on `u8` at-most.
    JumpLeByte = 196,
    /// Branch on `u8` at-least.
    JumpGeByte = 197,
    /// Branch on `i32` equality.
    JumpEqInt = 198,
    /// Branch on `i32` inequality.
    JumpNeInt = 199,
    /// Branch on `i32` less-than.
    JumpLtInt = 200,
    /// Branch on `i32` greater-than.
    JumpGtInt = 201,
    /// Branch on `i32` at-most.
    JumpLeInt = 202,
    /// Branch on `i32` at-least.
    JumpGeInt = 203,
    /// Branch on `i64` equality.
    JumpEqLong = 204,
    /// Branch on `i64` inequality.
    JumpNeLong = 205,
    /// Branch on `i64` less-than.
    JumpLtLong = 206,
    /// Branch on `i64` greater-than.
    JumpGtLong = 207,
    /// Branch on `i64` at-most.
    JumpLeLong = 208,
    /// Branch on `i64` at-least.
    JumpGeLong = 209,
    /// Branch on `f32` equality.
    JumpEqFloat = 210,
    /// Branch on `f32` inequality.
    JumpNeFloat = 211,
    /// Branch on `f32` less-than.
    JumpLtFloat = 212,
    /// Branch on `f32` greater-than.
    JumpGtFloat = 213,
    /// Branch on `f32` at-most.
    JumpLeFloat = 214,
    /// Branch on `f32` at-least.
    JumpGeFloat = 215,
    /// Branch on `f64` equality.
    JumpEqDouble = 216,
    /// Branch on `f64` inequality.
    JumpNeDouble = 217,
    /// Branch on `f64` less-than.
    JumpLtDouble = 218,
    /// Branch on `f64` greater-than.
    JumpGtDouble = 219,
    /// Branch on `f64` at-most.
    JumpLeDouble = 220,
    /// Branch on `f64` at-least.
    JumpGeDouble = 221,
    /// Branch on `u8` unsigned less-than.
    JumpUltByte = 222,
    /// Branch on `u8` unsigned greater-than.
    JumpUgtByte = 223,
    /// Branch on `u8` unsigned at-most.
    JumpUleByte = 224,
    /// Branch on `u8` unsigned at-least.
    JumpUgeByte = 225,
    /// Branch on `u32` unsigned less-than.
    JumpUltInt = 226,
    /// Branch on `u32` unsigned greater-than.
    JumpUgtInt = 227,
    /// Branch on `u32` unsigned at-most.
    JumpUleInt = 228,
    /// Branch on `u32` unsigned at-least.
    JumpUgeInt = 229,
    /// Branch on `u64` unsigned less-than.
    JumpUltLong = 230,
    /// Branch on `u64` unsigned greater-than.
    JumpUgtLong = 231,
    /// Branch on `u64` unsigned at-most.
    JumpUleLong = 232,
    /// Branch on `u64` unsigned at-least.
    JumpUgeLong = 233,
    /// Branch on whole-slot equality.
    JumpEqRef = 234,
    /// Branch on whole-slot inequality.
    JumpNeRef = 235,

    // Table dispatch and prologue checks.
    /// Branch through an inline target table.
    Dispatch = 236,
    /// As `Dispatch`, resolving indices past the table to function ids.
    DispatchMethod = 237,
    /// Branch by `value` words when `reg[x] == y`.
    JumpReg = 238,
    /// Function prologue stack-headroom check for `value` locals.
    Fnentry = 239,
    /// Resolve a class id to the address of its name.
    ClassName = 241,
}

impl Opcode {
    /// The opcode's position in the instruction stream ABI.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
