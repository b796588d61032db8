pub fn count_gc(seq: &[u8]) -> u64 {
    let mut gc = 0u64;
    for &b in seq {
        if b == b'G' || b == b'C' {
            gc += 1;
        }
    }
    gc
}

pub fn sum_bytes(bytes: &[u8]) -> u64 {
    let mut sum = 0u64;
    for &b in bytes {
        sum += b as u64;
    }
    sum
}
