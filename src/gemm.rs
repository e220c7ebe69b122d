//! Small dense matrix multiply: calling conventions, handles and the
//! plain column-major reference kernel.
//!
//! Four conventions exist, one per batch-reduce mode. Only the plain
//! kernel has a reference routine; the batch-reduce variants are part
//! of the dispatch surface so embedders with their own generators can
//! return them, and requesting one from the reference generator yields
//! `Unsupported`.

use std::fmt;
use std::sync::Arc;

use crate::descriptor::GemmRequest;
use crate::generator::GenerateError;
use crate::types::{BatchReduce, Datatype};

/// Arguments of a plain GEMM call: `C = beta * C + A * B`,
/// column-major.
#[derive(Debug, Clone, Copy)]
pub struct GemmParam {
    pub a: *const u8,
    pub b: *const u8,
    pub c: *mut u8,
}

/// Batch-reduce over an array of operand pointers.
#[derive(Debug, Clone, Copy)]
pub struct BatchReduceAddressParam {
    pub a_ptrs: *const *const u8,
    pub b_ptrs: *const *const u8,
    pub c: *mut u8,
    pub count: u64,
}

/// Batch-reduce over byte offsets from a base pointer.
#[derive(Debug, Clone, Copy)]
pub struct BatchReduceOffsetParam {
    pub a: *const u8,
    pub b: *const u8,
    pub c: *mut u8,
    pub a_offsets: *const u64,
    pub b_offsets: *const u64,
    pub count: u64,
}

/// Batch-reduce over fixed strides baked into the kernel.
#[derive(Debug, Clone, Copy)]
pub struct BatchReduceStrideParam {
    pub a: *const u8,
    pub b: *const u8,
    pub c: *mut u8,
    pub count: u64,
}

macro_rules! gemm_callable {
    ($(#[$doc:meta])* $name:ident, $param:ty) => {
        $(#[$doc])*
        #[derive(Clone)]
        pub struct $name {
            f: Arc<dyn Fn(&$param) + Send + Sync>,
        }

        impl $name {
            /// Wrap a routine as a kernel handle. Custom generators use
            /// this to return their own materializations.
            pub fn new(f: impl Fn(&$param) + Send + Sync + 'static) -> Self {
                $name { f: Arc::new(f) }
            }

            /// Run the kernel.
            ///
            /// # Safety
            /// All operand buffers must be live, aligned for their
            /// datatype and sized for the dispatched shape and leading
            /// dimensions.
            pub unsafe fn call(&self, param: &$param) {
                (self.f)(param)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(stringify!($name))
            }
        }
    };
}

gemm_callable!(
    /// Plain single-product GEMM kernel.
    PlainGemmKernel,
    GemmParam
);
gemm_callable!(BrAddressGemmKernel, BatchReduceAddressParam);
gemm_callable!(BrOffsetGemmKernel, BatchReduceOffsetParam);
gemm_callable!(BrStrideGemmKernel, BatchReduceStrideParam);

/// A materialized GEMM kernel, tagged by calling convention.
#[derive(Debug, Clone)]
pub enum GemmKernel {
    Plain(PlainGemmKernel),
    BatchReduceAddress(BrAddressGemmKernel),
    BatchReduceOffset(BrOffsetGemmKernel),
    BatchReduceStride(BrStrideGemmKernel),
}

/// Flop count of one invocation, used for registry metadata.
pub(crate) fn flops(req: &GemmRequest) -> u64 {
    2 * req.m as u64 * req.n as u64 * req.k as u64
}

pub(crate) fn generate(req: &GemmRequest) -> Result<GemmKernel, GenerateError> {
    if req.flags.batch_reduce != BatchReduce::None {
        return Err(GenerateError::Unsupported(format!(
            "batch-reduce {:?}",
            req.flags.batch_reduce
        )));
    }
    if req.flags.trans_a || req.flags.trans_b {
        return Err(GenerateError::Unsupported("transposed operands".into()));
    }
    if req.flags.vnni_a || req.flags.vnni_b || req.flags.vnni_c {
        return Err(GenerateError::Unsupported("vnni layouts".into()));
    }
    let all_f32 = [req.a_type, req.b_type, req.c_type, req.comp_type]
        .iter()
        .all(|&t| t == Datatype::F32);
    if !all_f32 {
        return Err(GenerateError::Unsupported(format!(
            "gemm dtypes {:?}/{:?}/{:?} comp {:?}",
            req.a_type, req.b_type, req.c_type, req.comp_type
        )));
    }

    let m = req.m as usize;
    let n = req.n as usize;
    let k = req.k as usize;
    let lda = req.lda as usize;
    let ldb = req.ldb as usize;
    let ldc = req.ldc as usize;
    let beta_zero = req.flags.beta_zero;

    Ok(GemmKernel::Plain(PlainGemmKernel::new(
        move |param: &GemmParam| {
            // SAFETY: caller contract of PlainGemmKernel::call.
            unsafe {
                let a = param.a as *const f32;
                let b = param.b as *const f32;
                let c = param.c as *mut f32;
                for j in 0..n {
                    for i in 0..m {
                        let mut acc = if beta_zero { 0.0 } else { *c.add(j * ldc + i) };
                        for l in 0..k {
                            acc += *a.add(l * lda + i) * *b.add(j * ldb + l);
                        }
                        *c.add(j * ldc + i) = acc;
                    }
                }
            }
        },
    )))
}
