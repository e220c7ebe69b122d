//! Elementwise kernel surface: parameter blocks, callable handles and
//! the reduced-precision element accessors shared by the reference
//! routines.
//!
//! Invocation follows the role-slot convention: every operand of a
//! kernel is an [`ArgSlot`] of up to three raw buffer pointers whose
//! meaning depends on the operation (e.g. dropout uses the op slot for
//! probability and counter state, and the output's secondary pointer
//! for the bitmask). Calling a kernel is `unsafe`: the caller vouches
//! that every pointer the operation reads or writes covers the extents
//! the kernel was built for.

use std::fmt;
use std::ptr;
use std::sync::Arc;

use half::{bf16, f16};

use crate::types::Datatype;

pub mod binary;
pub mod dropout;
pub mod ternary;
pub mod unary;

/// One operand of a kernel invocation: up to three raw buffers whose
/// roles are defined by the operation.
#[derive(Debug, Clone, Copy)]
pub struct ArgSlot {
    pub primary: *mut u8,
    pub secondary: *mut u8,
    pub tertiary: *mut u8,
}

impl ArgSlot {
    /// An empty slot, all pointers null.
    pub const fn null() -> Self {
        ArgSlot {
            primary: ptr::null_mut(),
            secondary: ptr::null_mut(),
            tertiary: ptr::null_mut(),
        }
    }

    /// Slot with only the primary buffer set.
    pub fn from_primary<T>(p: *mut T) -> Self {
        ArgSlot {
            primary: p as *mut u8,
            ..ArgSlot::null()
        }
    }
}

impl Default for ArgSlot {
    fn default() -> Self {
        ArgSlot::null()
    }
}

/// Argument block of a unary kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnaryParam {
    /// Operation state (dropout: primary = &p, secondary = &mut RngState).
    pub op: ArgSlot,
    /// Input tensor (dropout backward: secondary = bitmask).
    pub input: ArgSlot,
    /// Output tensor (dropout forward: secondary = bitmask).
    pub out: ArgSlot,
}

/// Argument block of a binary kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryParam {
    pub op: ArgSlot,
    pub in0: ArgSlot,
    pub in1: ArgSlot,
    pub out: ArgSlot,
}

/// Argument block of a ternary kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct TernaryParam {
    pub op: ArgSlot,
    pub in0: ArgSlot,
    pub in1: ArgSlot,
    pub in2: ArgSlot,
    pub out: ArgSlot,
}

macro_rules! kernel_handle {
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
            /// Every buffer the operation touches must be live, properly
            /// aligned for its datatype and large enough for the extents
            /// and leading dimensions the kernel was dispatched for.
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

kernel_handle!(
    /// Materialized unary kernel, cheap to clone and share.
    UnaryKernel,
    UnaryParam
);
kernel_handle!(
    /// Materialized binary kernel.
    BinaryKernel,
    BinaryParam
);
kernel_handle!(
    /// Materialized ternary kernel.
    TernaryKernel,
    TernaryParam
);

// ── Reduced-precision element access ─────────────────────────────────
//
// Reference routines compute in f32; these accessors decode/encode one
// element at a linear index. Narrowing stores round to nearest even.

pub(crate) type LoadFn = unsafe fn(*const u8, usize) -> f32;
pub(crate) type StoreFn = unsafe fn(*mut u8, usize, f32);

unsafe fn load_f32(p: *const u8, i: usize) -> f32 {
    *(p as *const f32).add(i)
}

unsafe fn load_bf16(p: *const u8, i: usize) -> f32 {
    bf16::from_bits(*(p as *const u16).add(i)).to_f32()
}

unsafe fn load_f16(p: *const u8, i: usize) -> f32 {
    f16::from_bits(*(p as *const u16).add(i)).to_f32()
}

unsafe fn store_f32(p: *mut u8, i: usize, v: f32) {
    *(p as *mut f32).add(i) = v;
}

unsafe fn store_bf16(p: *mut u8, i: usize, v: f32) {
    *(p as *mut u16).add(i) = bf16::from_f32(v).to_bits();
}

unsafe fn store_f16(p: *mut u8, i: usize, v: f32) {
    *(p as *mut u16).add(i) = f16::from_f32(v).to_bits();
}

/// Element loader for a float datatype, `None` for integer types.
pub(crate) fn load_fn(dt: Datatype) -> Option<LoadFn> {
    Some(match dt {
        Datatype::F32 => load_f32,
        Datatype::Bf16 => load_bf16,
        Datatype::F16 => load_f16,
        _ => return None,
    })
}

/// Element storer for a float datatype, `None` for integer types.
pub(crate) fn store_fn(dt: Datatype) -> Option<StoreFn> {
    Some(match dt {
        Datatype::F32 => store_f32,
        Datatype::Bf16 => store_bf16,
        Datatype::F16 => store_f16,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bf16_load_is_upper_half_of_f32() {
        let x = 1.5f32;
        let narrowed = bf16::from_f32(x).to_bits();
        let buf = [narrowed];
        let v = unsafe { load_bf16(buf.as_ptr() as *const u8, 0) };
        // 1.5 is exactly representable in bf16.
        assert_eq!(v, 1.5);
        assert_eq!(v.to_bits(), (narrowed as u32) << 16);
    }

    #[test]
    fn f16_store_rounds_to_nearest_even() {
        let mut buf = [0u16; 1];
        unsafe { store_f16(buf.as_mut_ptr() as *mut u8, 0, 1.0 + 1.0 / 4096.0) };
        assert_eq!(buf[0], f16::from_f32(1.0 + 1.0 / 4096.0).to_bits());
    }

    #[test]
    fn integer_types_have_no_float_accessors() {
        assert!(load_fn(Datatype::I32).is_none());
        assert!(store_fn(Datatype::I8).is_none());
        assert!(load_fn(Datatype::F64).is_none());
    }

    #[test]
    fn null_slot_is_default() {
        let s = ArgSlot::default();
        assert!(s.primary.is_null() && s.secondary.is_null() && s.tertiary.is_null());
    }
}
