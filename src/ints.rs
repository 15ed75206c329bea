//! Uniform integers over arbitrary inclusive ranges.
//!
//! Ranges whose size is a power of two read exactly that many bits. Any other
//! size `m` is sampled by dice expansion: keep `n` equally likely virtual
//! outcomes and the current outcome `x`, read just enough bits `k` to make
//! `n << k >= m`, then accept `x mod m` if `x` falls in the largest multiple of
//! `m`. Otherwise the `n mod m` leftover outcomes become the next round's
//! state. No entropy is thrown away and the result is exactly uniform.

use crate::gen::Gen;

use std::ops::RangeInclusive;

impl Gen<u64> {
    /// Uniform over `range`. A single-value range reads nothing and the full
    /// `u64` range reads 64 bits.
    ///
    /// # Panics
    /// If the range is empty.
    pub fn uint(range: RangeInclusive<u64>) -> Self {
        let (first, last) = range.into_inner();
        assert!(first <= last, "Gen::uint: empty range {}..={}", first, last);

        if first == last {
            return Gen::done(first);
        }
        let m = u128::from(last - first) + 1;
        if m.is_power_of_two() {
            let width = m.trailing_zeros();
            return Gen::bits(width).map(move |offset| first + offset);
        }
        dice(first, m, 1, 0)
    }
}

impl Gen<i64> {
    /// Uniform over `range`, sampled as an unsigned offset from the start.
    ///
    /// # Panics
    /// If the range is empty.
    pub fn int(range: RangeInclusive<i64>) -> Self {
        let (first, last) = range.into_inner();
        assert!(first <= last, "Gen::int: empty range {}..={}", first, last);

        let span = (last as u64).wrapping_sub(first as u64);
        Gen::uint(0..=span).map(move |offset| first.wrapping_add(offset as i64))
    }
}

impl Gen<usize> {
    /// Uniform `usize` over `range`; convenient for lengths and indices.
    pub fn size(range: RangeInclusive<usize>) -> Self {
        let (first, last) = range.into_inner();
        Gen::uint(first as u64..=last as u64).map(|n| n as usize)
    }
}

impl Gen<bool> {
    /// One bit; a set bit is `true`.
    pub fn boolean() -> Self {
        Gen::bits(1).map(|bit| bit == 1)
    }
}

/// One round of dice expansion with `n` equally likely outcomes, currently at
/// outcome `x < n`.
fn dice(first: u64, m: u128, n: u128, x: u128) -> Gen<u64> {
    let width = expansion_width(n, m);
    Gen::bits(width).flat_map(move |read| {
        let n = n << width;
        let x = (x << width) | u128::from(read);
        let accepted = n / m * m;
        if x < accepted {
            // x % m < m <= last - first + 1
            Gen::done(first + (x % m) as u64)
        } else {
            dice(first, m, n - accepted, x - accepted)
        }
    })
}

/// Smallest `k` with `n << k >= m`.
fn expansion_width(n: u128, m: u128) -> u32 {
    let mut k = 0;
    while (n << k) < m {
        k += 1;
    }
    k
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RunResult;
    use crate::tape::Tape;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn bits_consumed<A: 'static>(gen: &Gen<A>, seed: u64) -> u64 {
        let mut tape = Tape::from_seed(seed);
        assert!(gen.run_tape(&mut tape, u64::MAX).is_ok());
        tape.bits_read()
    }

    #[test]
    fn test_expansion_width() {
        assert_eq!(expansion_width(1, 1000), 10);
        assert_eq!(expansion_width(1, 1024), 10);
        assert_eq!(expansion_width(24, 1000), 6);
        assert_eq!(expansion_width(5, 3), 0);
        assert_eq!(expansion_width(1, 1u128 << 64), 64);
    }

    #[test]
    fn test_single_value_range_reads_nothing() {
        assert_eq!(bits_consumed(&Gen::uint(42..=42), 0), 0);
        assert_eq!(bits_consumed(&Gen::int(-3..=-3), 0), 0);
    }

    #[test]
    fn test_power_of_two_range_reads_exact_width() {
        for seed in 0..20 {
            assert_eq!(bits_consumed(&Gen::uint(10..=25), seed), 4);
            assert_eq!(bits_consumed(&Gen::uint(0..=u64::MAX), seed), 64);
            assert_eq!(bits_consumed(&Gen::boolean(), seed), 1);
        }
    }

    #[test]
    fn test_values_stay_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let ranges = [(0u64, 2u64), (5, 17), (1_000, 1_999), (u64::MAX - 5, u64::MAX)];
        for (first, last) in ranges {
            let gen = Gen::uint(first..=last);
            for _ in 0..500 {
                let v = gen.sample(&mut rng).unwrap();
                assert!((first..=last).contains(&v), "{} outside {}..={}", v, first, last);
            }
        }
    }

    #[test]
    fn test_near_full_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(18);
        let gen = Gen::uint(1..=u64::MAX);
        for _ in 0..200 {
            assert!(gen.sample(&mut rng).unwrap() >= 1);
        }
    }

    #[test]
    fn test_signed_ranges() {
        let mut rng = ChaCha8Rng::seed_from_u64(19);
        let small = Gen::int(-5..=5);
        let mut seen = [false; 11];
        for _ in 0..1_000 {
            let v = small.sample(&mut rng).unwrap();
            assert!((-5..=5).contains(&v));
            seen[(v + 5) as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));

        let full = Gen::int(i64::MIN..=i64::MAX);
        let values: Vec<i64> = (0..200).filter_map(|_| full.sample(&mut rng)).collect();
        assert!(values.iter().any(|&v| v < 0));
        assert!(values.iter().any(|&v| v > 0));
    }

    #[test]
    fn test_eof_under_short_limit() {
        let mut tape = Tape::from_seed(0);
        assert_eq!(Gen::int(0..=100).run_tape(&mut tape, 2), RunResult::Eof);
    }

    #[test]
    #[should_panic(expected = "empty range")]
    #[allow(clippy::reversed_empty_ranges)]
    fn test_empty_range_panics() {
        Gen::uint(5..=4);
    }
}
