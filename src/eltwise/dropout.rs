//! Dropout forward and backward reference kernels.
//!
//! Forward keeps each element with probability `1 - p` (one uniform
//! draw per element, consumed in lane-width batches), scales kept
//! elements by `1 / (1 - p)` and zeroes the rest. With the bitmask
//! flag set and a mask buffer supplied, kept positions are recorded in
//! a packed bitmask: bit `i % 8` of byte `i / 8`, one row every
//! `round_up_16(ld) / 8` bytes. Backward is a pure function of the
//! gradient, the mask and `p`: kept positions get `grad / (1 - p)`,
//! dropped positions zero.
//!
//! Probability and counter state travel through the op slot at call
//! time (`op.primary = &p`, `op.secondary = &mut RngState` for
//! forward), so one materialized kernel serves any probability.

use crate::descriptor::UnaryRequest;
use crate::eltwise::{load_fn, store_fn, UnaryKernel, UnaryParam};
use crate::generator::GenerateError;
use crate::rng::RngState;
use crate::types::UnaryKind;

/// Packed mask row pitch in bytes for a given leading dimension.
pub fn mask_row_bytes(ld: usize) -> usize {
    ((ld + 15) & !15) / 8
}

pub(crate) fn generate(req: &UnaryRequest, width: usize) -> Result<UnaryKernel, GenerateError> {
    let load = load_fn(req.in_type)
        .ok_or_else(|| GenerateError::Unsupported(format!("dropout input {:?}", req.in_type)))?;
    let store = store_fn(req.out_type)
        .ok_or_else(|| GenerateError::Unsupported(format!("dropout output {:?}", req.out_type)))?;
    if req.comp_type != crate::types::Datatype::F32 {
        return Err(GenerateError::Unsupported(format!(
            "dropout compute {:?}",
            req.comp_type
        )));
    }

    let m = req.m as usize;
    let n = req.n as usize;
    let ldi = req.ldi as usize;
    let ldo = req.ldo as usize;

    match req.kind {
        UnaryKind::Dropout => {
            let write_mask = req.flags.bitmask;
            let mask_ld = mask_row_bytes(ldo);
            Ok(UnaryKernel::new(move |param: &UnaryParam| {
                // SAFETY: caller contract of UnaryKernel::call — the op
                // slot carries a probability and counter state, the
                // tensor slots cover n rows at their leading dimensions.
                unsafe {
                    let p = *(param.op.primary as *const f32);
                    let rng = &mut *(param.op.secondary as *mut RngState);
                    let input = param.input.primary as *const u8;
                    let out = param.out.primary;
                    let mask = param.out.secondary;
                    let emit_mask = write_mask && !mask.is_null();

                    let thresh = 1.0 - p;
                    let scale = 1.0 / (1.0 - p);
                    let mut rnd = [0f32; 16];

                    for j in 0..n {
                        if emit_mask {
                            for byte in 0..(m + 7) / 8 {
                                *mask.add(j * mask_ld + byte) = 0;
                            }
                        }
                        let mut i = 0;
                        while i < m {
                            // A trailing partial batch still consumes a
                            // full lane-width draw.
                            rng.fill_uniform(&mut rnd[..width]);
                            for k in 0..width.min(m - i) {
                                let x = load(input, j * ldi + i + k);
                                if rnd[k] < thresh {
                                    store(out, j * ldo + i + k, x * scale);
                                    if emit_mask {
                                        let idx = i + k;
                                        *mask.add(j * mask_ld + idx / 8) |= 1 << (idx % 8);
                                    }
                                } else {
                                    store(out, j * ldo + i + k, 0.0);
                                }
                            }
                            i += width;
                        }
                    }
                }
            }))
        }
        UnaryKind::DropoutInv => {
            if !req.flags.bitmask {
                return Err(GenerateError::Unsupported(
                    "dropout backward requires the bitmask flag".into(),
                ));
            }
            let mask_ld = mask_row_bytes(ldi);
            Ok(UnaryKernel::new(move |param: &UnaryParam| {
                // SAFETY: caller contract — input carries the incoming
                // gradient with its bitmask in the secondary pointer.
                unsafe {
                    let p = *(param.op.primary as *const f32);
                    let grad = param.input.primary as *const u8;
                    let mask = param.input.secondary as *const u8;
                    let out = param.out.primary;

                    let scale = 1.0 / (1.0 - p);
                    for j in 0..n {
                        for i in 0..m {
                            let kept = (*mask.add(j * mask_ld + i / 8) >> (i % 8)) & 1 != 0;
                            let y = if kept {
                                load(grad, j * ldi + i) * scale
                            } else {
                                0.0
                            };
                            store(out, j * ldo + i, y);
                        }
                    }
                }
            }))
        }
        other => Err(GenerateError::Unsupported(format!(
            "not a dropout kind: {other:?}"
        ))),
    }
}
