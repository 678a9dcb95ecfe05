/// Cosine similarity between two equal-length vectors. A zero magnitude on
/// either side yields 0.0, never NaN.
#[inline]
pub fn cosine(a: &[f32], b: &[f32], simd_enabled: bool) -> f32 {
    let (dot, norm_a, norm_b) = dot_and_norms(a, b, simd_enabled);
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[inline]
pub fn dot_and_norms(a: &[f32], b: &[f32], simd_enabled: bool) -> (f32, f32, f32) {
    debug_assert_eq!(a.len(), b.len());
    if simd_enabled {
        #[cfg(target_arch = "x86_64")]
        {
            if std::is_x86_feature_detected!("avx2") && a.len() >= 8 {
                unsafe {
                    return accumulate_avx2(a, b);
                }
            }
        }
    }
    accumulate_scalar(a, b)
}

#[inline]
fn accumulate_scalar(a: &[f32], b: &[f32]) -> (f32, f32, f32) {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    (dot, norm_a, norm_b)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn accumulate_avx2(a: &[f32], b: &[f32]) -> (f32, f32, f32) {
    use std::arch::x86_64::*;

    let mut dot = _mm256_setzero_ps();
    let mut norm_a = _mm256_setzero_ps();
    let mut norm_b = _mm256_setzero_ps();
    let mut i = 0usize;

    while i + 8 <= a.len() {
        let va = _mm256_loadu_ps(a.as_ptr().add(i));
        let vb = _mm256_loadu_ps(b.as_ptr().add(i));
        dot = _mm256_add_ps(dot, _mm256_mul_ps(va, vb));
        norm_a = _mm256_add_ps(norm_a, _mm256_mul_ps(va, va));
        norm_b = _mm256_add_ps(norm_b, _mm256_mul_ps(vb, vb));
        i += 8;
    }

    let mut dot_tmp = [0f32; 8];
    let mut norm_a_tmp = [0f32; 8];
    let mut norm_b_tmp = [0f32; 8];
    _mm256_storeu_ps(dot_tmp.as_mut_ptr(), dot);
    _mm256_storeu_ps(norm_a_tmp.as_mut_ptr(), norm_a);
    _mm256_storeu_ps(norm_b_tmp.as_mut_ptr(), norm_b);

    let mut dot_sum = dot_tmp.iter().sum::<f32>();
    let mut norm_a_sum = norm_a_tmp.iter().sum::<f32>();
    let mut norm_b_sum = norm_b_tmp.iter().sum::<f32>();

    while i < a.len() {
        let x = a[i];
        let y = b[i];
        dot_sum += x * y;
        norm_a_sum += x * x;
        norm_b_sum += y * y;
        i += 1;
    }

    (dot_sum, norm_a_sum, norm_b_sum)
}
