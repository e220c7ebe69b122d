//! Descriptor encoder — packs operation parameters into fixed-size,
//! byte-comparable blobs used as cache keys.
//!
//! Every field that influences generated code lands at a fixed
//! little-endian offset inside the signature prefix; the blob is
//! zero-initialized so padding bytes are deterministic. Two requests
//! encode to the same signature if and only if they ask for the same
//! kernel (the registry relies on this being injective).

use crate::types::{
    binary_kind_from_code, ternary_kind_from_code, unary_kind_from_code, BinaryFlags, BinaryKind,
    Datatype, GemmFlags, Prefetch, TernaryFlags, TernaryKind, UnaryFlags, UnaryKind,
};

/// Maximum size of a descriptor blob.
pub const DESCRIPTOR_MAXSIZE: usize = 96;

/// Size of the signature prefix used for equality/hash comparison.
#[cfg(feature = "wide-signature")]
pub const SIGNATURE_SIZE: usize = 64;
#[cfg(not(feature = "wide-signature"))]
pub const SIGNATURE_SIZE: usize = 32;

/// Operation family tag, first byte of every descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpFamily {
    Gemm = 1,
    EltwiseUnary = 2,
    EltwiseBinary = 3,
    EltwiseTernary = 4,
}

/// The signature prefix of a descriptor: the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub(crate) [u8; SIGNATURE_SIZE]);

impl Signature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A fixed-size operation descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    blob: [u8; DESCRIPTOR_MAXSIZE],
}

impl Descriptor {
    /// The signature prefix used as the registry key.
    pub fn signature(&self) -> Signature {
        let mut sig = [0u8; SIGNATURE_SIZE];
        sig.copy_from_slice(&self.blob[..SIGNATURE_SIZE]);
        Signature(sig)
    }

    /// Which operation family this descriptor encodes.
    pub fn family(&self) -> Option<OpFamily> {
        Some(match self.blob[0] {
            1 => OpFamily::Gemm,
            2 => OpFamily::EltwiseUnary,
            3 => OpFamily::EltwiseBinary,
            4 => OpFamily::EltwiseTernary,
            _ => return None,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.blob
    }

    fn put_u16(&mut self, offset: usize, v: u16) {
        self.blob[offset..offset + 2].copy_from_slice(&v.to_le_bytes());
    }

    fn put_u32(&mut self, offset: usize, v: u32) {
        self.blob[offset..offset + 4].copy_from_slice(&v.to_le_bytes());
    }

    fn get_u16(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.blob[offset], self.blob[offset + 1]])
    }

    fn get_u32(&self, offset: usize) -> u32 {
        u32::from_le_bytes([
            self.blob[offset],
            self.blob[offset + 1],
            self.blob[offset + 2],
            self.blob[offset + 3],
        ])
    }
}

// ── Request structs (the natural parameters of each operation) ───────

/// Parameters of a unary elementwise operation.
///
/// Layout convention: M is the contiguous extent (ld ≥ M), N the number
/// of pitched rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnaryRequest {
    pub m: u32,
    pub n: u32,
    pub ldi: u32,
    pub ldo: u32,
    pub in_type: Datatype,
    pub comp_type: Datatype,
    pub out_type: Datatype,
    pub flags: UnaryFlags,
    pub kind: UnaryKind,
}

impl UnaryRequest {
    /// Basic shape validity: extents positive, leading dimensions cover
    /// the extent.
    pub fn is_valid(&self) -> bool {
        self.m > 0 && self.n > 0 && self.ldi >= self.m && self.ldo >= self.m
    }
}

/// Parameters of a binary elementwise operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BinaryRequest {
    pub m: u32,
    pub n: u32,
    pub ldi0: u32,
    pub ldi1: u32,
    pub ldo: u32,
    pub in0_type: Datatype,
    pub in1_type: Datatype,
    pub comp_type: Datatype,
    pub out_type: Datatype,
    pub flags: BinaryFlags,
    pub kind: BinaryKind,
}

impl BinaryRequest {
    pub fn is_valid(&self) -> bool {
        self.m > 0
            && self.n > 0
            && self.ldi0 >= self.m
            && self.ldi1 >= self.m
            && self.ldo >= self.m
    }
}

/// Parameters of a ternary elementwise operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TernaryRequest {
    pub m: u32,
    pub n: u32,
    pub ldi0: u32,
    pub ldi1: u32,
    pub ldi2: u32,
    pub ldo: u32,
    pub in0_type: Datatype,
    pub in1_type: Datatype,
    pub in2_type: Datatype,
    pub comp_type: Datatype,
    pub out_type: Datatype,
    pub flags: TernaryFlags,
    pub kind: TernaryKind,
}

impl TernaryRequest {
    pub fn is_valid(&self) -> bool {
        self.m > 0
            && self.n > 0
            && self.ldi0 >= self.m
            && self.ldi1 >= self.m
            && self.ldi2 >= self.m
            && self.ldo >= self.m
    }
}

/// Parameters of a small dense matrix multiply, column-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GemmRequest {
    pub m: u32,
    pub n: u32,
    pub k: u32,
    pub lda: u32,
    pub ldb: u32,
    pub ldc: u32,
    pub a_type: Datatype,
    pub b_type: Datatype,
    pub c_type: Datatype,
    pub comp_type: Datatype,
    pub flags: GemmFlags,
    pub prefetch: Prefetch,
}

impl GemmRequest {
    pub fn is_valid(&self) -> bool {
        let a_rows = if self.flags.trans_a { self.k } else { self.m };
        let b_rows = if self.flags.trans_b { self.n } else { self.k };
        self.m > 0
            && self.n > 0
            && self.k > 0
            && self.lda >= a_rows
            && self.ldb >= b_rows
            && self.ldc >= self.m
    }
}

// ── Encoding ─────────────────────────────────────────────────────────

/// Encode a unary request. Pure and deterministic.
pub fn encode_unary(req: &UnaryRequest) -> Descriptor {
    let mut d = Descriptor {
        blob: [0u8; DESCRIPTOR_MAXSIZE],
    };
    d.blob[0] = OpFamily::EltwiseUnary as u8;
    d.blob[1] = req.kind as u8;
    d.put_u16(2, req.flags.to_bits());
    d.put_u32(4, req.m);
    d.put_u32(8, req.n);
    d.put_u32(12, req.ldi);
    d.put_u32(16, req.ldo);
    d.blob[20] = req.in_type.code();
    d.blob[21] = req.comp_type.code();
    d.blob[22] = req.out_type.code();
    d
}

/// Decode a unary descriptor back into its request form.
pub fn decode_unary(desc: &Descriptor) -> Option<UnaryRequest> {
    if desc.family() != Some(OpFamily::EltwiseUnary) {
        return None;
    }
    Some(UnaryRequest {
        m: desc.get_u32(4),
        n: desc.get_u32(8),
        ldi: desc.get_u32(12),
        ldo: desc.get_u32(16),
        in_type: Datatype::from_code(desc.blob[20])?,
        comp_type: Datatype::from_code(desc.blob[21])?,
        out_type: Datatype::from_code(desc.blob[22])?,
        flags: UnaryFlags::from_bits(desc.get_u16(2))?,
        kind: unary_kind_from_code(desc.blob[1])?,
    })
}

/// Encode a binary request.
pub fn encode_binary(req: &BinaryRequest) -> Descriptor {
    let mut d = Descriptor {
        blob: [0u8; DESCRIPTOR_MAXSIZE],
    };
    d.blob[0] = OpFamily::EltwiseBinary as u8;
    d.blob[1] = req.kind as u8;
    d.put_u16(2, req.flags.to_bits());
    d.put_u32(4, req.m);
    d.put_u32(8, req.n);
    d.put_u32(12, req.ldi0);
    d.put_u32(16, req.ldi1);
    d.put_u32(20, req.ldo);
    d.blob[24] = req.in0_type.code();
    d.blob[25] = req.in1_type.code();
    d.blob[26] = req.comp_type.code();
    d.blob[27] = req.out_type.code();
    d
}

/// Decode a binary descriptor.
pub fn decode_binary(desc: &Descriptor) -> Option<BinaryRequest> {
    if desc.family() != Some(OpFamily::EltwiseBinary) {
        return None;
    }
    Some(BinaryRequest {
        m: desc.get_u32(4),
        n: desc.get_u32(8),
        ldi0: desc.get_u32(12),
        ldi1: desc.get_u32(16),
        ldo: desc.get_u32(20),
        in0_type: Datatype::from_code(desc.blob[24])?,
        in1_type: Datatype::from_code(desc.blob[25])?,
        comp_type: Datatype::from_code(desc.blob[26])?,
        out_type: Datatype::from_code(desc.blob[27])?,
        flags: BinaryFlags::from_bits(desc.get_u16(2))?,
        kind: binary_kind_from_code(desc.blob[1])?,
    })
}

/// Encode a ternary request. Datatypes are nibble-packed to stay inside
/// the signature prefix.
pub fn encode_ternary(req: &TernaryRequest) -> Descriptor {
    let mut d = Descriptor {
        blob: [0u8; DESCRIPTOR_MAXSIZE],
    };
    d.blob[0] = OpFamily::EltwiseTernary as u8;
    d.blob[1] = req.kind as u8;
    d.put_u16(2, req.flags.to_bits());
    d.put_u32(4, req.m);
    d.put_u32(8, req.n);
    d.put_u32(12, req.ldi0);
    d.put_u32(16, req.ldi1);
    d.put_u32(20, req.ldi2);
    d.put_u32(24, req.ldo);
    d.blob[28] = req.in0_type.code() | (req.in1_type.code() << 4);
    d.blob[29] = req.in2_type.code() | (req.comp_type.code() << 4);
    d.blob[30] = req.out_type.code();
    d
}

/// Decode a ternary descriptor.
pub fn decode_ternary(desc: &Descriptor) -> Option<TernaryRequest> {
    if desc.family() != Some(OpFamily::EltwiseTernary) {
        return None;
    }
    Some(TernaryRequest {
        m: desc.get_u32(4),
        n: desc.get_u32(8),
        ldi0: desc.get_u32(12),
        ldi1: desc.get_u32(16),
        ldi2: desc.get_u32(20),
        ldo: desc.get_u32(24),
        in0_type: Datatype::from_code(desc.blob[28] & 0xf)?,
        in1_type: Datatype::from_code(desc.blob[28] >> 4)?,
        in2_type: Datatype::from_code(desc.blob[29] & 0xf)?,
        comp_type: Datatype::from_code(desc.blob[29] >> 4)?,
        out_type: Datatype::from_code(desc.blob[30])?,
        flags: TernaryFlags::from_bits(desc.get_u16(2))?,
        kind: ternary_kind_from_code(desc.blob[1])?,
    })
}

/// Encode a GEMM request.
pub fn encode_gemm(req: &GemmRequest) -> Descriptor {
    let mut d = Descriptor {
        blob: [0u8; DESCRIPTOR_MAXSIZE],
    };
    d.blob[0] = OpFamily::Gemm as u8;
    d.blob[1] = req.prefetch as u8;
    d.blob[2] = req.a_type.code() | (req.b_type.code() << 4);
    d.blob[3] = req.c_type.code() | (req.comp_type.code() << 4);
    d.put_u32(4, req.flags.to_bits());
    d.put_u32(8, req.m);
    d.put_u32(12, req.n);
    d.put_u32(16, req.k);
    d.put_u32(20, req.lda);
    d.put_u32(24, req.ldb);
    d.put_u32(28, req.ldc);
    d
}

/// Decode a GEMM descriptor.
pub fn decode_gemm(desc: &Descriptor) -> Option<GemmRequest> {
    if desc.family() != Some(OpFamily::Gemm) {
        return None;
    }
    Some(GemmRequest {
        m: desc.get_u32(8),
        n: desc.get_u32(12),
        k: desc.get_u32(16),
        lda: desc.get_u32(20),
        ldb: desc.get_u32(24),
        ldc: desc.get_u32(28),
        a_type: Datatype::from_code(desc.blob[2] & 0xf)?,
        b_type: Datatype::from_code(desc.blob[2] >> 4)?,
        c_type: Datatype::from_code(desc.blob[3] & 0xf)?,
        comp_type: Datatype::from_code(desc.blob[3] >> 4)?,
        flags: GemmFlags::from_bits(desc.get_u32(4))?,
        prefetch: Prefetch::from_code(desc.blob[1])?,
    })
}
