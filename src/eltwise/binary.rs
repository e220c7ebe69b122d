//! Reference binary kernels: pointwise combination of two pitched
//! inputs. Muladd accumulates into the output (`out += in0 * in1`), so
//! it also reads the output buffer.

use crate::descriptor::BinaryRequest;
use crate::eltwise::{load_fn, store_fn, BinaryKernel, BinaryParam};
use crate::generator::GenerateError;
use crate::types::{BinaryFlags, BinaryKind, Datatype};

pub(crate) fn generate(req: &BinaryRequest) -> Result<BinaryKernel, GenerateError> {
    if req.flags != BinaryFlags::default() {
        return Err(GenerateError::Unsupported(format!(
            "binary broadcast {:?}",
            req.flags
        )));
    }
    if req.comp_type != Datatype::F32 {
        return Err(GenerateError::Unsupported(format!(
            "binary compute {:?}",
            req.comp_type
        )));
    }
    let load0 = load_fn(req.in0_type)
        .ok_or_else(|| GenerateError::Unsupported(format!("binary in0 {:?}", req.in0_type)))?;
    let load1 = load_fn(req.in1_type)
        .ok_or_else(|| GenerateError::Unsupported(format!("binary in1 {:?}", req.in1_type)))?;
    let store = store_fn(req.out_type)
        .ok_or_else(|| GenerateError::Unsupported(format!("binary output {:?}", req.out_type)))?;
    // Muladd reads the previous output value back.
    let load_out = load_fn(req.out_type)
        .ok_or_else(|| GenerateError::Unsupported(format!("binary output {:?}", req.out_type)))?;

    let rule: fn(f32, f32) -> f32 = match req.kind {
        BinaryKind::Add => |a, b| a + b,
        BinaryKind::Mul => |a, b| a * b,
        BinaryKind::Sub => |a, b| a - b,
        BinaryKind::Div => |a, b| a / b,
        BinaryKind::Muladd => |a, b| a * b,
        other => {
            return Err(GenerateError::Unsupported(format!(
                "binary kind {other:?}"
            )))
        }
    };
    let accumulate = req.kind == BinaryKind::Muladd;

    let m = req.m as usize;
    let n = req.n as usize;
    let ldi0 = req.ldi0 as usize;
    let ldi1 = req.ldi1 as usize;
    let ldo = req.ldo as usize;

    Ok(BinaryKernel::new(move |param: &BinaryParam| {
        // SAFETY: caller contract of BinaryKernel::call.
        unsafe {
            let in0 = param.in0.primary as *const u8;
            let in1 = param.in1.primary as *const u8;
            let out = param.out.primary;
            for j in 0..n {
                for i in 0..m {
                    let mut v = rule(load0(in0, j * ldi0 + i), load1(in1, j * ldi1 + i));
                    if accumulate {
                        v += load_out(out, j * ldo + i);
                    }
                    store(out, j * ldo + i, v);
                }
            }
        }
    }))
}
