//! Shape-specialized tensor processing primitives with
//! descriptor-driven dispatch and caching.
//!
//! The crate turns typed operation requests into fixed-size descriptor
//! blobs, caches materialized kernels by descriptor signature, and
//! hands out cheap, shareable kernel handles:
//!
//! ```
//! use tpp_kernels::{
//!     ArgSlot, Datatype, KernelLibrary, RngState, UnaryFlags, UnaryKind, UnaryParam,
//!     UnaryRequest,
//! };
//!
//! let lib = KernelLibrary::new();
//! let kernel = lib
//!     .dispatch_unary(&UnaryRequest {
//!         m: 16,
//!         n: 1,
//!         ldi: 16,
//!         ldo: 16,
//!         in_type: Datatype::F32,
//!         comp_type: Datatype::F32,
//!         out_type: Datatype::F32,
//!         flags: UnaryFlags::with_bitmask(),
//!         kind: UnaryKind::Dropout,
//!     })
//!     .unwrap();
//!
//! let p = 0.3f32;
//! let mut rng = RngState::new(555);
//! let input = [1.0f32; 16];
//! let mut output = [0.0f32; 16];
//! let mut mask = [0u8; 2];
//!
//! let mut param = UnaryParam::default();
//! param.op.primary = &p as *const f32 as *mut u8;
//! param.op.secondary = &mut rng as *mut RngState as *mut u8;
//! param.input = ArgSlot::from_primary(input.as_ptr() as *mut f32);
//! param.out.primary = output.as_mut_ptr() as *mut u8;
//! param.out.secondary = mask.as_mut_ptr();
//!
//! // SAFETY: the buffers cover the dispatched 16x1 extent.
//! unsafe { kernel.call(&param) };
//! ```
//!
//! A second dispatch of the same request is a cache hit and returns a
//! handle to the same kernel. The library installs no logger; enable
//! one via the `log` facade to see dispatch rejections and
//! registrations.

pub mod descriptor;
pub mod dispatch;
pub mod eltwise;
pub mod gemm;
pub mod generator;
pub mod registry;
pub mod rng;
pub mod types;
pub mod validation;

pub use descriptor::{
    BinaryRequest, Descriptor, GemmRequest, OpFamily, Signature, TernaryRequest, UnaryRequest,
    DESCRIPTOR_MAXSIZE, SIGNATURE_SIZE,
};
pub use dispatch::KernelLibrary;
pub use eltwise::{
    ArgSlot, BinaryKernel, BinaryParam, TernaryKernel, TernaryParam, UnaryKernel, UnaryParam,
};
pub use gemm::{
    BatchReduceAddressParam, BatchReduceOffsetParam, BatchReduceStrideParam, BrAddressGemmKernel,
    BrOffsetGemmKernel, BrStrideGemmKernel, GemmKernel, GemmParam, PlainGemmKernel,
};
pub use generator::{
    GenerateError, GeneratedKernel, KernelGenerator, KernelHandle, LaneWidth, ReferenceGenerator,
};
pub use registry::{KernelEntry, KernelOrigin, KernelRegistry, RegistryInfo};
pub use rng::{RngState, RNG_LANES};
pub use types::{
    BatchReduce, BinaryFlags, BinaryKind, BroadcastMode, Datatype, GemmFlags, IndexSize, Prefetch,
    TernaryFlags, TernaryKind, UnaryFlags, UnaryKind,
};
