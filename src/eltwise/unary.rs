//! Reference unary kernels: pointwise math over a pitched 2-D extent.
//!
//! Everything runs through one decode → f32 → encode loop; the kind
//! selects the scalar rule. Dropout kinds are materialized by the
//! dropout module since they carry state and a mask.

use crate::descriptor::UnaryRequest;
use crate::eltwise::{dropout, load_fn, store_fn, UnaryKernel, UnaryParam};
use crate::generator::GenerateError;
use crate::types::{Datatype, UnaryFlags, UnaryKind};

fn scalar_rule(kind: UnaryKind) -> Option<fn(f32) -> f32> {
    Some(match kind {
        UnaryKind::Identity => |x| x,
        UnaryKind::Xor => |_| 0.0,
        UnaryKind::X2 => |x| x * x,
        UnaryKind::Sqrt => f32::sqrt,
        UnaryKind::Relu => |x| x.max(0.0),
        UnaryKind::Negate => |x| -x,
        UnaryKind::Inc => |x| x + 1.0,
        UnaryKind::Reciprocal => |x| 1.0 / x,
        UnaryKind::Exp => f32::exp,
        UnaryKind::Tanh => f32::tanh,
        UnaryKind::Sigmoid => |x| 1.0 / (1.0 + (-x).exp()),
        _ => return None,
    })
}

pub(crate) fn generate(req: &UnaryRequest, width: usize) -> Result<UnaryKernel, GenerateError> {
    if matches!(req.kind, UnaryKind::Dropout | UnaryKind::DropoutInv) {
        return dropout::generate(req, width);
    }
    // Flag modifiers (broadcasts, reductions, relu bitmask) have no
    // reference routine yet.
    if req.flags != UnaryFlags::default() {
        return Err(GenerateError::Unsupported(format!(
            "unary flags {:?} for {:?}",
            req.flags, req.kind
        )));
    }
    if req.comp_type != Datatype::F32 {
        return Err(GenerateError::Unsupported(format!(
            "unary compute {:?}",
            req.comp_type
        )));
    }
    let rule = scalar_rule(req.kind)
        .ok_or_else(|| GenerateError::Unsupported(format!("unary kind {:?}", req.kind)))?;
    let load = load_fn(req.in_type)
        .ok_or_else(|| GenerateError::Unsupported(format!("unary input {:?}", req.in_type)))?;
    let store = store_fn(req.out_type)
        .ok_or_else(|| GenerateError::Unsupported(format!("unary output {:?}", req.out_type)))?;

    let m = req.m as usize;
    let n = req.n as usize;
    let ldi = req.ldi as usize;
    let ldo = req.ldo as usize;

    Ok(UnaryKernel::new(move |param: &UnaryParam| {
        // SAFETY: caller contract of UnaryKernel::call.
        unsafe {
            let input = param.input.primary as *const u8;
            let out = param.out.primary;
            for j in 0..n {
                for i in 0..m {
                    store(out, j * ldo + i, rule(load(input, j * ldi + i)));
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eltwise::ArgSlot;

    fn request(kind: UnaryKind) -> UnaryRequest {
        UnaryRequest {
            m: 4,
            n: 2,
            ldi: 4,
            ldo: 4,
            in_type: Datatype::F32,
            comp_type: Datatype::F32,
            out_type: Datatype::F32,
            flags: UnaryFlags::default(),
            kind,
        }
    }

    fn run(kernel: &UnaryKernel, input: &[f32], output: &mut [f32]) {
        let mut param = UnaryParam::default();
        param.input = ArgSlot::from_primary(input.as_ptr() as *mut f32);
        param.out.primary = output.as_mut_ptr() as *mut u8;
        unsafe { kernel.call(&param) };
    }

    #[test]
    fn relu_clamps_negatives() {
        let kernel = generate(&request(UnaryKind::Relu), 16).unwrap();
        let input = [-2.0, -0.5, 0.0, 3.0, 1.0, -1.0, 7.0, -0.25];
        let mut output = [f32::NAN; 8];
        run(&kernel, &input, &mut output);
        assert_eq!(output, [0.0, 0.0, 0.0, 3.0, 1.0, 0.0, 7.0, 0.0]);
    }

    #[test]
    fn xor_zeroes_regardless_of_input() {
        let kernel = generate(&request(UnaryKind::Xor), 16).unwrap();
        let input = [5.0f32; 8];
        let mut output = [1.0f32; 8];
        run(&kernel, &input, &mut output);
        assert!(output.iter().all(|&y| y == 0.0));
    }

    #[test]
    fn sigmoid_midpoint() {
        let kernel = generate(&request(UnaryKind::Sigmoid), 16).unwrap();
        let input = [0.0f32; 8];
        let mut output = [0.0f32; 8];
        run(&kernel, &input, &mut output);
        assert!(output.iter().all(|&y| (y - 0.5).abs() < 1e-7));
    }

    #[test]
    fn copy_respects_pitch() {
        let mut req = request(UnaryKind::Identity);
        req.m = 3;
        req.ldi = 5;
        req.ldo = 4;
        let kernel = generate(&req, 16).unwrap();
        let input = [1., 2., 3., 99., 99., 4., 5., 6., 99., 99.];
        let mut output = [0.0f32; 8];
        run(&kernel, &input, &mut output);
        assert_eq!(&output[0..3], &[1., 2., 3.]);
        assert_eq!(&output[4..7], &[4., 5., 6.]);
        // Pitch gap untouched.
        assert_eq!(output[3], 0.0);
    }

    #[test]
    fn unimplemented_kind_is_unsupported() {
        assert!(matches!(
            generate(&request(UnaryKind::Gelu), 16),
            Err(GenerateError::Unsupported(_))
        ));
    }

    #[test]
    fn nondefault_flags_are_unsupported() {
        let mut req = request(UnaryKind::Relu);
        req.flags = UnaryFlags::with_bitmask();
        assert!(matches!(
            generate(&req, 16),
            Err(GenerateError::Unsupported(_))
        ));
    }
}
