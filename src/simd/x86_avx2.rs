#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
pub unsafe fn count_gc_avx2(seq: &[u8]) -> u64 {
    let mut gc = 0u64;
    let mut i = 0usize;
    let len = seq.len();

    let vg = _mm256_set1_epi8(b'G' as i8);
    let vc = _mm256_set1_epi8(b'C' as i8);

    while i + 32 <= len {
        let ptr = unsafe { seq.as_ptr().add(i) as *const __m256i };
        let v = unsafe { _mm256_loadu_si256(ptr) };
        let m = _mm256_or_si256(_mm256_cmpeq_epi8(v, vg), _mm256_cmpeq_epi8(v, vc));
        gc += (_mm256_movemask_epi8(m) as u32).count_ones() as u64;
        i += 32;
    }

    for &b in &seq[i..] {
        if b == b'G' || b == b'C' {
            gc += 1;
        }
    }

    gc
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
pub unsafe fn sum_bytes_avx2(bytes: &[u8]) -> u64 {
    let mut i = 0usize;
    let len = bytes.len();

    let zero = _mm256_setzero_si256();
    let mut acc = _mm256_setzero_si256();

    while i + 32 <= len {
        let ptr = unsafe { bytes.as_ptr().add(i) as *const __m256i };
        let v = unsafe { _mm256_loadu_si256(ptr) };
        acc = _mm256_add_epi64(acc, _mm256_sad_epu8(v, zero));
        i += 32;
    }

    let mut lanes = [0u64; 4];
    unsafe { _mm256_storeu_si256(lanes.as_mut_ptr() as *mut __m256i, acc) };
    let mut sum = lanes[0] + lanes[1] + lanes[2] + lanes[3];

    for &b in &bytes[i..] {
        sum += b as u64;
    }

    sum
}
