//! Core enumerations and flag words shared by the descriptor encoder,
//! the dispatcher, and the kernel generator boundary.
//!
//! Flag words travel through the public API as named field structs and
//! are packed into their bit-OR representation only at the descriptor
//! encoder boundary (`to_bits`/`from_bits`).

/// Element datatypes understood by the dispatch core.
///
/// The discriminants are stable: they are what the descriptor encoder
/// writes into the signature region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Datatype {
    F64 = 0,
    F32 = 1,
    Bf16 = 2,
    F16 = 3,
    I64 = 4,
    I32 = 5,
    I16 = 6,
    I8 = 7,
}

impl Datatype {
    /// Storage size of one element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            Datatype::F64 | Datatype::I64 => 8,
            Datatype::F32 | Datatype::I32 => 4,
            Datatype::Bf16 | Datatype::F16 | Datatype::I16 => 2,
            Datatype::I8 => 1,
        }
    }

    /// Whether this is a floating-point type.
    pub fn is_float(self) -> bool {
        matches!(
            self,
            Datatype::F64 | Datatype::F32 | Datatype::Bf16 | Datatype::F16
        )
    }

    pub(crate) fn code(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Datatype::F64,
            1 => Datatype::F32,
            2 => Datatype::Bf16,
            3 => Datatype::F16,
            4 => Datatype::I64,
            5 => Datatype::I32,
            6 => Datatype::I16,
            7 => Datatype::I8,
            _ => return None,
        })
    }
}

/// Unary elementwise operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UnaryKind {
    None = 0,
    /// Copy.
    Identity = 1,
    /// Zero fill.
    Xor = 2,
    X2 = 3,
    Sqrt = 4,
    Relu = 5,
    ReluInv = 6,
    Tanh = 7,
    TanhInv = 8,
    Sigmoid = 9,
    SigmoidInv = 10,
    Gelu = 11,
    GeluInv = 12,
    Negate = 13,
    Inc = 14,
    Reciprocal = 15,
    ReciprocalSqrt = 16,
    Exp = 17,
    ReduceXOpAdd = 18,
    ReduceX2OpAdd = 19,
    ReduceXX2OpAdd = 20,
    ReduceXOpMax = 21,
    ReduceXOpMul = 22,
    ReduceXOpAddNcncFormat = 23,
    ReduceToScalarOpAdd = 24,
    Dropout = 25,
    DropoutInv = 26,
    ReplicateColVar = 27,
    TransformNormToVnni = 28,
    TransformNormToNormt = 29,
    TransformVnniToVnnit = 30,
    TransformNormToVnnit = 31,
    TransformNormToVnniPad = 32,
    UnpackToBlocks = 33,
    LeakyRelu = 34,
    LeakyReluInv = 35,
    Elu = 36,
    EluInv = 37,
    StochasticRound = 38,
    TransformPadmMod2 = 39,
    TransformPadnMod2 = 40,
    TransformPadnmMod2 = 41,
    Quant = 42,
    Dequant = 43,
    ReduceColsIdx = 44,
}

/// Binary elementwise operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BinaryKind {
    None = 0,
    Add = 1,
    Mul = 2,
    Sub = 3,
    Div = 4,
    /// out += in0 * in1 (reads the output operand).
    Muladd = 5,
    Matmul = 6,
    MulAndReduceToScalarOpAdd = 7,
    Pack = 8,
}

/// Ternary elementwise operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TernaryKind {
    None = 0,
    /// out = in0 * in1 + in2.
    Muladd = 1,
    Matmul = 2,
    Blend = 3,
    Nmuladd = 4,
}

/// Broadcast mode for an elementwise input operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BroadcastMode {
    #[default]
    None,
    Row,
    Col,
    Scalar,
}

impl BroadcastMode {
    fn code(self) -> u16 {
        match self {
            BroadcastMode::None => 0,
            BroadcastMode::Row => 1,
            BroadcastMode::Col => 2,
            BroadcastMode::Scalar => 3,
        }
    }

    fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            0 => BroadcastMode::None,
            1 => BroadcastMode::Row,
            2 => BroadcastMode::Col,
            3 => BroadcastMode::Scalar,
            _ => return None,
        })
    }
}

/// Index width for indexed (gather-style) unary kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexSize {
    #[default]
    None,
    U32,
    U64,
}

/// Unary operation flags as named fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UnaryFlags {
    /// Emit a packed 1-bit-per-element keep mask through the secondary
    /// output slot.
    pub bitmask: bool,
    pub bcast: BroadcastMode,
    pub reduce_cols: bool,
    pub reduce_rows: bool,
    pub reduce_xor_acc: bool,
    pub index_size: IndexSize,
}

impl UnaryFlags {
    /// Convenience: only the bitmask flag set.
    pub fn with_bitmask() -> Self {
        UnaryFlags {
            bitmask: true,
            ..Default::default()
        }
    }

    pub(crate) fn to_bits(self) -> u16 {
        let mut bits = 0u16;
        if self.bitmask {
            bits |= 1;
        }
        bits |= self.bcast.code() << 1;
        if self.reduce_cols {
            bits |= 1 << 4;
        }
        if self.reduce_rows {
            bits |= 1 << 5;
        }
        if self.reduce_xor_acc {
            bits |= 1 << 6;
        }
        bits |= match self.index_size {
            IndexSize::None => 0,
            IndexSize::U32 => 1 << 7,
            IndexSize::U64 => 2 << 7,
        };
        bits
    }

    pub(crate) fn from_bits(bits: u16) -> Option<Self> {
        Some(UnaryFlags {
            bitmask: bits & 1 != 0,
            bcast: BroadcastMode::from_code((bits >> 1) & 0x3)?,
            reduce_cols: bits & (1 << 4) != 0,
            reduce_rows: bits & (1 << 5) != 0,
            reduce_xor_acc: bits & (1 << 6) != 0,
            index_size: match (bits >> 7) & 0x3 {
                0 => IndexSize::None,
                1 => IndexSize::U32,
                2 => IndexSize::U64,
                _ => return None,
            },
        })
    }
}

/// Binary operation flags: per-operand broadcast modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BinaryFlags {
    pub bcast_in0: BroadcastMode,
    pub bcast_in1: BroadcastMode,
}

impl BinaryFlags {
    pub(crate) fn to_bits(self) -> u16 {
        self.bcast_in0.code() | (self.bcast_in1.code() << 2)
    }

    pub(crate) fn from_bits(bits: u16) -> Option<Self> {
        Some(BinaryFlags {
            bcast_in0: BroadcastMode::from_code(bits & 0x3)?,
            bcast_in1: BroadcastMode::from_code((bits >> 2) & 0x3)?,
        })
    }
}

/// Ternary operation flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TernaryFlags {
    pub bcast_in0: BroadcastMode,
    pub bcast_in1: BroadcastMode,
    pub bcast_in2: BroadcastMode,
    /// Write the result through the in2 buffer instead of a distinct output.
    pub reuse_in2_as_out: bool,
}

impl TernaryFlags {
    pub(crate) fn to_bits(self) -> u16 {
        let mut bits =
            self.bcast_in0.code() | (self.bcast_in1.code() << 2) | (self.bcast_in2.code() << 4);
        if self.reuse_in2_as_out {
            bits |= 1 << 6;
        }
        bits
    }

    pub(crate) fn from_bits(bits: u16) -> Option<Self> {
        Some(TernaryFlags {
            bcast_in0: BroadcastMode::from_code(bits & 0x3)?,
            bcast_in1: BroadcastMode::from_code((bits >> 2) & 0x3)?,
            bcast_in2: BroadcastMode::from_code((bits >> 4) & 0x3)?,
            reuse_in2_as_out: bits & (1 << 6) != 0,
        })
    }
}

/// Batch-reduce calling convention for GEMM kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BatchReduce {
    #[default]
    None,
    /// Operand tiles passed as pointer arrays.
    Address,
    /// Operand tiles addressed by base pointer + offset arrays.
    Offset,
    /// Operand tiles addressed by base pointer + constant strides.
    Stride,
}

impl BatchReduce {
    fn code(self) -> u32 {
        match self {
            BatchReduce::None => 0,
            BatchReduce::Address => 1,
            BatchReduce::Offset => 2,
            BatchReduce::Stride => 3,
        }
    }

    fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => BatchReduce::None,
            1 => BatchReduce::Address,
            2 => BatchReduce::Offset,
            3 => BatchReduce::Stride,
            _ => return None,
        })
    }
}

/// GEMM flags as named fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GemmFlags {
    pub trans_a: bool,
    pub trans_b: bool,
    /// beta = 0 (overwrite C) instead of beta = 1 (accumulate).
    pub beta_zero: bool,
    pub align_a: bool,
    pub align_c: bool,
    pub batch_reduce: BatchReduce,
    pub a_unsigned: bool,
    pub b_unsigned: bool,
    pub c_unsigned: bool,
    pub vnni_a: bool,
    pub vnni_b: bool,
    pub vnni_c: bool,
    /// Non-temporal store hint for C.
    pub nts_hint: bool,
}

impl GemmFlags {
    pub(crate) fn to_bits(self) -> u32 {
        let mut bits = 0u32;
        if self.trans_a {
            bits |= 1;
        }
        if self.trans_b {
            bits |= 1 << 1;
        }
        if self.beta_zero {
            bits |= 1 << 2;
        }
        if self.align_a {
            bits |= 1 << 3;
        }
        if self.align_c {
            bits |= 1 << 4;
        }
        bits |= self.batch_reduce.code() << 5;
        if self.a_unsigned {
            bits |= 1 << 7;
        }
        if self.b_unsigned {
            bits |= 1 << 8;
        }
        if self.c_unsigned {
            bits |= 1 << 9;
        }
        if self.vnni_a {
            bits |= 1 << 10;
        }
        if self.vnni_b {
            bits |= 1 << 11;
        }
        if self.vnni_c {
            bits |= 1 << 12;
        }
        if self.nts_hint {
            bits |= 1 << 13;
        }
        bits
    }

    pub(crate) fn from_bits(bits: u32) -> Option<Self> {
        Some(GemmFlags {
            trans_a: bits & 1 != 0,
            trans_b: bits & (1 << 1) != 0,
            beta_zero: bits & (1 << 2) != 0,
            align_a: bits & (1 << 3) != 0,
            align_c: bits & (1 << 4) != 0,
            batch_reduce: BatchReduce::from_code((bits >> 5) & 0x3)?,
            a_unsigned: bits & (1 << 7) != 0,
            b_unsigned: bits & (1 << 8) != 0,
            c_unsigned: bits & (1 << 9) != 0,
            vnni_a: bits & (1 << 10) != 0,
            vnni_b: bits & (1 << 11) != 0,
            vnni_c: bits & (1 << 12) != 0,
            nts_hint: bits & (1 << 13) != 0,
        })
    }
}

/// Software prefetch strategy hint for GEMM kernels.
///
/// A configuration field on the request rather than trailing call
/// arguments; generators are free to ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Prefetch {
    #[default]
    None = 0,
    Al2 = 1,
    Bl2 = 2,
    Al2Bl2 = 3,
}

impl Prefetch {
    pub(crate) fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Prefetch::None,
            1 => Prefetch::Al2,
            2 => Prefetch::Bl2,
            3 => Prefetch::Al2Bl2,
            _ => return None,
        })
    }
}

pub(crate) fn unary_kind_from_code(code: u8) -> Option<UnaryKind> {
    if code > UnaryKind::ReduceColsIdx as u8 {
        return None;
    }
    // SAFETY: UnaryKind is repr(u8) with contiguous discriminants 0..=44,
    // checked above.
    Some(unsafe { std::mem::transmute::<u8, UnaryKind>(code) })
}

pub(crate) fn binary_kind_from_code(code: u8) -> Option<BinaryKind> {
    if code > BinaryKind::Pack as u8 {
        return None;
    }
    // SAFETY: repr(u8), contiguous 0..=8, checked above.
    Some(unsafe { std::mem::transmute::<u8, BinaryKind>(code) })
}

pub(crate) fn ternary_kind_from_code(code: u8) -> Option<TernaryKind> {
    if code > TernaryKind::Nmuladd as u8 {
        return None;
    }
    // SAFETY: repr(u8), contiguous 0..=4, checked above.
    Some(unsafe { std::mem::transmute::<u8, TernaryKind>(code) })
}
