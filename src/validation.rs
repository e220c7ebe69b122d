//! Numerical comparison helpers for kernel outputs.
//!
//! Norms are accumulated in f64 regardless of the storage precision of
//! the compared buffers. `normf_rel` is the headline figure test
//! harnesses gate on: relative Frobenius distance of the test buffer
//! from the reference.

/// Difference norms between a reference and a test buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffNorms {
    pub l1_ref: f64,
    pub l1_tst: f64,
    pub l2_abs: f64,
    pub linf_abs: f64,
    /// `||ref - tst||_F / ||ref||_F`; zero when both buffers are zero.
    pub normf_rel: f64,
}

/// Compare the logical `m x n` window of two pitched buffers.
pub fn diff_f32(reference: &[f32], test: &[f32], m: usize, n: usize, ld: usize) -> DiffNorms {
    let mut norms = DiffNorms::default();
    let mut ref_sq = 0.0f64;
    let mut diff_sq = 0.0f64;
    for j in 0..n {
        for i in 0..m {
            let r = reference[j * ld + i] as f64;
            let t = test[j * ld + i] as f64;
            let d = (r - t).abs();
            norms.l1_ref += r.abs();
            norms.l1_tst += t.abs();
            norms.linf_abs = norms.linf_abs.max(d);
            ref_sq += r * r;
            diff_sq += d * d;
        }
    }
    norms.l2_abs = diff_sq.sqrt();
    norms.normf_rel = if ref_sq > 0.0 {
        (diff_sq / ref_sq).sqrt()
    } else {
        norms.l2_abs
    };
    norms
}

/// Convenience for contiguous buffers.
pub fn normf_rel(reference: &[f32], test: &[f32]) -> f64 {
    diff_f32(reference, test, reference.len(), 1, reference.len()).normf_rel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_buffers_have_zero_distance() {
        let a = [1.0, -2.0, 3.0, 0.5];
        let norms = diff_f32(&a, &a, 4, 1, 4);
        assert_eq!(norms.normf_rel, 0.0);
        assert_eq!(norms.l2_abs, 0.0);
        assert_eq!(norms.linf_abs, 0.0);
    }

    #[test]
    fn relative_distance_scales_with_reference() {
        let reference = [10.0f32, 0.0, 0.0, 0.0];
        let test = [11.0f32, 0.0, 0.0, 0.0];
        let norms = diff_f32(&reference, &test, 4, 1, 4);
        assert!((norms.normf_rel - 0.1).abs() < 1e-12);
        assert_eq!(norms.linf_abs, 1.0);
    }

    #[test]
    fn pitch_gap_is_ignored() {
        let reference = [1.0f32, 2.0, 99.0, 1.0, 2.0, 99.0];
        let test = [1.0f32, 2.0, -99.0, 1.0, 2.0, -99.0];
        let norms = diff_f32(&reference, &test, 2, 2, 3);
        assert_eq!(norms.normf_rel, 0.0);
    }

    #[test]
    fn zero_reference_falls_back_to_absolute() {
        let norms = diff_f32(&[0.0f32; 4], &[0.0, 3.0, 4.0, 0.0], 4, 1, 4);
        assert_eq!(norms.normf_rel, 5.0);
    }
}
