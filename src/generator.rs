//! Kernel generator boundary.
//!
//! The registry materializes kernels through this trait; embedders can
//! plug in their own code emitter. The shipped [`ReferenceGenerator`]
//! backs every kernel with the portable reference routines instead of
//! emitted machine code.

use thiserror::Error;

use crate::descriptor::{
    decode_binary, decode_gemm, decode_ternary, decode_unary, Descriptor, OpFamily,
};
use crate::eltwise::{binary, ternary, unary, BinaryKernel, TernaryKernel, UnaryKernel};
use crate::gemm::{self, GemmKernel};

/// Why a generation attempt produced no kernel.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The descriptor is well-formed but asks for a combination this
    /// generator does not implement.
    #[error("unsupported descriptor: {0}")]
    Unsupported(String),
    /// The generator ran out of a resource (code arena, memory).
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
}

/// A materialized kernel, tagged by operation family.
#[derive(Debug, Clone)]
pub enum KernelHandle {
    Unary(UnaryKernel),
    Binary(BinaryKernel),
    Ternary(TernaryKernel),
    Gemm(GemmKernel),
}

/// Result of a successful generation: the handle plus metadata the
/// registry keeps for diagnostics.
#[derive(Debug, Clone)]
pub struct GeneratedKernel {
    pub kernel: KernelHandle,
    /// Emitted code bytes; zero for routines with no emitted code.
    pub code_size: usize,
    /// Flops of one invocation, zero where not meaningful.
    pub flops: u64,
}

/// Materializes a kernel from a descriptor.
///
/// Implementations must be pure with respect to the descriptor: the
/// same blob must always yield an equivalent kernel, since the registry
/// caches the first success per signature.
pub trait KernelGenerator: Send + Sync {
    fn generate(&self, desc: &Descriptor) -> Result<GeneratedKernel, GenerateError>;
}

/// Batch width of the stochastic reference routines.
///
/// A property of the generator, not of correctness: streams drawn at
/// different widths are both valid dropout but need not match
/// elementwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaneWidth {
    W4,
    W8,
    #[default]
    W16,
}

impl LaneWidth {
    pub fn lanes(self) -> usize {
        match self {
            LaneWidth::W4 => 4,
            LaneWidth::W8 => 8,
            LaneWidth::W16 => 16,
        }
    }
}

/// The shipped generator: reference routines for the supported subset,
/// `Unsupported` for everything else.
#[derive(Debug, Clone, Default)]
pub struct ReferenceGenerator {
    lane_width: LaneWidth,
}

impl ReferenceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lane_width(width: LaneWidth) -> Self {
        ReferenceGenerator { lane_width: width }
    }
}

impl KernelGenerator for ReferenceGenerator {
    fn generate(&self, desc: &Descriptor) -> Result<GeneratedKernel, GenerateError> {
        let family = desc
            .family()
            .ok_or_else(|| GenerateError::Unsupported("unknown family tag".into()))?;
        match family {
            OpFamily::EltwiseUnary => {
                let req = decode_unary(desc)
                    .ok_or_else(|| GenerateError::Unsupported("malformed unary blob".into()))?;
                let kernel = unary::generate(&req, self.lane_width.lanes())?;
                Ok(GeneratedKernel {
                    kernel: KernelHandle::Unary(kernel),
                    code_size: 0,
                    flops: req.m as u64 * req.n as u64,
                })
            }
            OpFamily::EltwiseBinary => {
                let req = decode_binary(desc)
                    .ok_or_else(|| GenerateError::Unsupported("malformed binary blob".into()))?;
                let kernel = binary::generate(&req)?;
                Ok(GeneratedKernel {
                    kernel: KernelHandle::Binary(kernel),
                    code_size: 0,
                    flops: req.m as u64 * req.n as u64,
                })
            }
            OpFamily::EltwiseTernary => {
                let req = decode_ternary(desc)
                    .ok_or_else(|| GenerateError::Unsupported("malformed ternary blob".into()))?;
                let kernel = ternary::generate(&req)?;
                Ok(GeneratedKernel {
                    kernel: KernelHandle::Ternary(kernel),
                    code_size: 0,
                    flops: 2 * req.m as u64 * req.n as u64,
                })
            }
            OpFamily::Gemm => {
                let req = decode_gemm(desc)
                    .ok_or_else(|| GenerateError::Unsupported("malformed gemm blob".into()))?;
                let kernel = gemm::generate(&req)?;
                Ok(GeneratedKernel {
                    kernel: KernelHandle::Gemm(kernel),
                    code_size: 0,
                    flops: gemm::flops(&req),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{encode_unary, UnaryRequest};
    use crate::types::{Datatype, UnaryFlags, UnaryKind};

    fn dropout_descriptor() -> Descriptor {
        encode_unary(&UnaryRequest {
            m: 16,
            n: 4,
            ldi: 16,
            ldo: 16,
            in_type: Datatype::F32,
            comp_type: Datatype::F32,
            out_type: Datatype::F32,
            flags: UnaryFlags::with_bitmask(),
            kind: UnaryKind::Dropout,
        })
    }

    #[test]
    fn reference_generator_builds_dropout() {
        let generated = ReferenceGenerator::new()
            .generate(&dropout_descriptor())
            .unwrap();
        assert!(matches!(generated.kernel, KernelHandle::Unary(_)));
        assert_eq!(generated.flops, 64);
    }

    #[test]
    fn identity_descriptor_generates() {
        let desc = encode_unary(&UnaryRequest {
            m: 1,
            n: 1,
            ldi: 1,
            ldo: 1,
            in_type: Datatype::F32,
            comp_type: Datatype::F32,
            out_type: Datatype::F32,
            flags: UnaryFlags::default(),
            kind: UnaryKind::Identity,
        });
        assert!(ReferenceGenerator::new().generate(&desc).is_ok());
    }

    #[test]
    fn lane_width_values() {
        assert_eq!(LaneWidth::default().lanes(), 16);
        assert_eq!(LaneWidth::W4.lanes(), 4);
        assert_eq!(LaneWidth::W8.lanes(), 8);
    }
}
