//! LSD radix sort for `u64` keys.
//! 8-bit passes, only as many as the largest key needs. Stable via counting
//! + prefix sums.

/// Sort `keys` ascending. `scratch` is resized as needed and can be reused
/// across calls to avoid reallocating.
pub fn radix_sort_u64(keys: &mut [u64], scratch: &mut Vec<u64>) {
    let n = keys.len();
    if n <= 1 {
        return;
    }
    let max = keys.iter().copied().max().unwrap_or(0);
    let significant_bits = 64 - max.leading_zeros();
    let passes = significant_bits.div_ceil(8);

    scratch.clear();
    scratch.resize(n, 0);

    let mut in_keys = true;
    for pass in 0..passes {
        let shift = pass * 8;
        let (src, dst): (&[u64], &mut [u64]) = if in_keys {
            (&*keys, scratch.as_mut_slice())
        } else {
            (scratch.as_slice(), &mut *keys)
        };

        let mut counts = [0usize; 256];
        for &k in src {
            counts[((k >> shift) & 0xFF) as usize] += 1;
        }

        let mut sum = 0usize;
        for c in counts.iter_mut() {
            let tmp = *c;
            *c = sum;
            sum += tmp;
        }

        for &k in src {
            let b = ((k >> shift) & 0xFF) as usize;
            dst[counts[b]] = k;
            counts[b] += 1;
        }
        in_keys = !in_keys;
    }

    if !in_keys {
        keys.copy_from_slice(&scratch[..]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorts_like_std() {
        let mut keys: Vec<u64> = (0..1000u64)
            .map(|i| i.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> (i % 40))
            .collect();
        let mut expected = keys.clone();
        expected.sort_unstable();

        let mut scratch = Vec::new();
        radix_sort_u64(&mut keys, &mut scratch);
        assert_eq!(keys, expected);
    }

    #[test]
    fn test_small_inputs() {
        let mut scratch = Vec::new();
        let mut empty: Vec<u64> = Vec::new();
        radix_sort_u64(&mut empty, &mut scratch);
        assert!(empty.is_empty());

        let mut zeros = vec![0u64; 5];
        radix_sort_u64(&mut zeros, &mut scratch);
        assert_eq!(zeros, vec![0; 5]);

        let mut small = vec![3u64, 1, 2, 1];
        radix_sort_u64(&mut small, &mut scratch);
        assert_eq!(small, vec![1, 1, 2, 3]);
    }
}
