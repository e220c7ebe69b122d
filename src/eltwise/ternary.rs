//! Reference ternary kernels. Muladd is the fused form
//! `out = in0 * in1 + in2`; the remaining kinds have no reference
//! routine.

use crate::descriptor::TernaryRequest;
use crate::eltwise::{load_fn, store_fn, TernaryKernel, TernaryParam};
use crate::generator::GenerateError;
use crate::types::{Datatype, TernaryFlags, TernaryKind};

pub(crate) fn generate(req: &TernaryRequest) -> Result<TernaryKernel, GenerateError> {
    if req.kind != TernaryKind::Muladd {
        return Err(GenerateError::Unsupported(format!(
            "ternary kind {:?}",
            req.kind
        )));
    }
    if req.flags != TernaryFlags::default() {
        return Err(GenerateError::Unsupported(format!(
            "ternary flags {:?}",
            req.flags
        )));
    }
    if req.comp_type != Datatype::F32 {
        return Err(GenerateError::Unsupported(format!(
            "ternary compute {:?}",
            req.comp_type
        )));
    }
    let load0 = load_fn(req.in0_type)
        .ok_or_else(|| GenerateError::Unsupported(format!("ternary in0 {:?}", req.in0_type)))?;
    let load1 = load_fn(req.in1_type)
        .ok_or_else(|| GenerateError::Unsupported(format!("ternary in1 {:?}", req.in1_type)))?;
    let load2 = load_fn(req.in2_type)
        .ok_or_else(|| GenerateError::Unsupported(format!("ternary in2 {:?}", req.in2_type)))?;
    let store = store_fn(req.out_type)
        .ok_or_else(|| GenerateError::Unsupported(format!("ternary output {:?}", req.out_type)))?;

    let m = req.m as usize;
    let n = req.n as usize;
    let ldi0 = req.ldi0 as usize;
    let ldi1 = req.ldi1 as usize;
    let ldi2 = req.ldi2 as usize;
    let ldo = req.ldo as usize;

    Ok(TernaryKernel::new(move |param: &TernaryParam| {
        // SAFETY: caller contract of TernaryKernel::call.
        unsafe {
            let in0 = param.in0.primary as *const u8;
            let in1 = param.in1.primary as *const u8;
            let in2 = param.in2.primary as *const u8;
            let out = param.out.primary;
            for j in 0..n {
                for i in 0..m {
                    let v = load0(in0, j * ldi0 + i) * load1(in1, j * ldi1 + i)
                        + load2(in2, j * ldi2 + i);
                    store(out, j * ldo + i, v);
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eltwise::ArgSlot;

    fn request() -> TernaryRequest {
        TernaryRequest {
            m: 4,
            n: 1,
            ldi0: 4,
            ldi1: 4,
            ldi2: 4,
            ldo: 4,
            in0_type: Datatype::F32,
            in1_type: Datatype::F32,
            in2_type: Datatype::F32,
            comp_type: Datatype::F32,
            out_type: Datatype::F32,
            flags: TernaryFlags::default(),
            kind: TernaryKind::Muladd,
        }
    }

    #[test]
    fn fused_multiply_add() {
        let kernel = generate(&request()).unwrap();
        let a = [1.0f32, 2.0, 3.0, 4.0];
        let b = [10.0f32; 4];
        let c = [0.5f32, 0.5, 0.5, 0.5];
        let mut out = [0.0f32; 4];
        let mut param = TernaryParam::default();
        param.in0 = ArgSlot::from_primary(a.as_ptr() as *mut f32);
        param.in1 = ArgSlot::from_primary(b.as_ptr() as *mut f32);
        param.in2 = ArgSlot::from_primary(c.as_ptr() as *mut f32);
        param.out.primary = out.as_mut_ptr() as *mut u8;
        unsafe { kernel.call(&param) };
        assert_eq!(out, [10.5, 20.5, 30.5, 40.5]);
    }

    #[test]
    fn blend_is_unsupported() {
        let mut req = request();
        req.kind = TernaryKind::Blend;
        assert!(matches!(
            generate(&req),
            Err(GenerateError::Unsupported(_))
        ));
    }
}
