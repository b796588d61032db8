#[cfg(target_arch = "aarch64")]
mod aarch64_neon;
mod scalar;
#[cfg(target_arch = "x86_64")]
mod x86_avx2;

/// Number of uppercase `G` and `C` bytes. Lowercase bases are not counted.
pub fn count_gc(seq: &[u8]) -> u64 {
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("avx2") {
            // SAFETY: AVX2 availability checked at runtime.
            return unsafe { x86_avx2::count_gc_avx2(seq) };
        }
    }
    #[cfg(target_arch = "aarch64")]
    {
        if std::arch::is_aarch64_feature_detected!("neon") {
            // SAFETY: NEON availability checked at runtime.
            return unsafe { aarch64_neon::count_gc_neon(seq) };
        }
    }
    scalar::count_gc(seq)
}

/// Sum of raw byte values, no offset applied.
pub fn sum_bytes(bytes: &[u8]) -> u64 {
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("avx2") {
            // SAFETY: AVX2 availability checked at runtime.
            return unsafe { x86_avx2::sum_bytes_avx2(bytes) };
        }
    }
    #[cfg(target_arch = "aarch64")]
    {
        if std::arch::is_aarch64_feature_detected!("neon") {
            // SAFETY: NEON availability checked at runtime.
            return unsafe { aarch64_neon::sum_bytes_neon(bytes) };
        }
    }
    scalar::sum_bytes(bytes)
}
