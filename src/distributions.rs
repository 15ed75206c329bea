//! Floats and weighted choice.

use crate::gen::Gen;

/// Bits of precision in an `f64` mantissa; `uniform` never reads more.
const MANTISSA_BITS: u32 = 53;

impl Gen<f64> {
    /// Uniform in `[0, 1)` at full double precision.
    pub fn uniform() -> Self {
        Gen::uniform_with_epsilon(0.0)
    }

    /// Uniform in `[0, 1)` at a resolution of roughly `epsilon`: reads
    /// `ceil(-log2(epsilon)) + 1` bits, capped at 53. An `epsilon` of 0 asks for
    /// full precision.
    ///
    /// # Panics
    /// Unless `0 <= epsilon < 1`.
    pub fn uniform_with_epsilon(epsilon: f64) -> Self {
        assert!(
            (0.0..1.0).contains(&epsilon),
            "Gen::uniform_with_epsilon: epsilon must be within [0, 1), got {}",
            epsilon
        );
        let width = if epsilon == 0.0 {
            MANTISSA_BITS
        } else {
            let needed = (-epsilon.log2()).ceil() as u32 + 1;
            needed.min(MANTISSA_BITS)
        };
        let scale = (1u64 << width) as f64;
        Gen::bits(width).map(move |bits| bits as f64 / scale)
    }
}

impl<A: Clone + 'static> Gen<A> {
    /// Picks one of `options` uniformly.
    ///
    /// # Panics
    /// If `options` is empty.
    pub fn one_of(options: Vec<A>) -> Self {
        assert!(!options.is_empty(), "Gen::one_of: no options to choose from");
        let last = options.len() - 1;
        Gen::size(0..=last).map(move |index| options[index].clone())
    }

    /// Picks from `options` with probability proportional to the integer
    /// weights. Zero-weight options are never picked.
    ///
    /// # Panics
    /// If `options` is empty or the weights sum to zero or overflow.
    pub fn freq(options: Vec<(u64, A)>) -> Self {
        assert!(!options.is_empty(), "Gen::freq: no options to choose from");
        let cumulative = cumulative_weights(options.iter().map(|(weight, _)| *weight));
        let total = cumulative.last().copied().unwrap_or(0);
        assert!(total > 0, "Gen::freq: weights sum to zero");

        Gen::uint(0..=total - 1).map(move |point| {
            let index = cumulative.partition_point(|&bound| bound <= point);
            options[index].1.clone()
        })
    }

    /// Like [`Gen::freq`] with real weights. The choice is driven by one
    /// [`Gen::uniform`] draw.
    ///
    /// # Panics
    /// If `options` is empty, a weight is negative or not finite, or the
    /// weights sum to zero.
    pub fn freq_f64(options: Vec<(f64, A)>) -> Self {
        assert!(!options.is_empty(), "Gen::freq_f64: no options to choose from");
        let mut cumulative = Vec::with_capacity(options.len());
        let mut total = 0.0;
        for (weight, _) in &options {
            assert!(
                weight.is_finite() && *weight >= 0.0,
                "Gen::freq_f64: weights must be finite and non-negative, got {}",
                weight
            );
            total += weight;
            cumulative.push(total);
        }
        assert!(total > 0.0, "Gen::freq_f64: weights sum to zero");

        let last = options.len() - 1;
        Gen::uniform().map(move |u| {
            let point = u * total;
            let index = cumulative.partition_point(|&bound| bound <= point).min(last);
            options[index].1.clone()
        })
    }
}

impl<A: 'static> Gen<A> {
    /// Picks one of `gens` uniformly and continues with it.
    pub fn one_of_gen(gens: Vec<Gen<A>>) -> Self {
        Gen::one_of(gens).flat_map(|gen| gen)
    }

    /// Picks one of `gens` by integer weight and continues with it.
    pub fn freq_gen(gens: Vec<(u64, Gen<A>)>) -> Self {
        Gen::freq(gens).flat_map(|gen| gen)
    }

    pub fn freq_gen_f64(gens: Vec<(f64, Gen<A>)>) -> Self {
        Gen::freq_f64(gens).flat_map(|gen| gen)
    }
}

fn cumulative_weights(weights: impl Iterator<Item = u64>) -> Vec<u64> {
    let mut total = 0u64;
    weights
        .map(|weight| {
            total = total
                .checked_add(weight)
                .unwrap_or_else(|| panic!("Gen::freq: weights overflow u64"));
            total
        })
        .collect()
}
