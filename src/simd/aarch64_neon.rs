#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::*;

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
pub unsafe fn count_gc_neon(seq: &[u8]) -> u64 {
    let mut gc = 0u64;
    let mut i = 0usize;
    let len = seq.len();

    let vg = vdupq_n_u8(b'G');
    let vc = vdupq_n_u8(b'C');
    let ones = vdupq_n_u8(1);

    while i + 16 <= len {
        let v = unsafe { vld1q_u8(seq.as_ptr().add(i)) };
        let m = vorrq_u8(vceqq_u8(v, vg), vceqq_u8(v, vc));
        gc += vaddvq_u8(vandq_u8(m, ones)) as u64;
        i += 16;
    }

    for &b in &seq[i..] {
        if b == b'G' || b == b'C' {
            gc += 1;
        }
    }

    gc
}

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
pub unsafe fn sum_bytes_neon(bytes: &[u8]) -> u64 {
    let mut sum = 0u64;
    let mut i = 0usize;
    let len = bytes.len();

    while i + 16 <= len {
        let v = unsafe { vld1q_u8(bytes.as_ptr().add(i)) };
        sum += vaddlvq_u8(v) as u64;
        i += 16;
    }

    for &b in &bytes[i..] {
        sum += b as u64;
    }

    sum
}
