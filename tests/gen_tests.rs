//! Statistical and structural behaviour of the generator combinators.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tapegen::{Gen, RunResult, Tape, TapeInput, TapeSeed};

fn counts<A: 'static>(gen: &Gen<A>, seed: u64, samples: usize, bucket: impl Fn(A) -> usize, buckets: usize) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut counts = vec![0; buckets];
    gen.foreach(&mut rng, samples, |value| counts[bucket(value)] += 1);
    counts
}

#[test]
fn test_ranged_ints_are_uniform() {
    const SAMPLES: usize = 100_000;
    for (i, m) in [3u64, 4, 5, 7, 11, 13, 16, 17].into_iter().enumerate() {
        let observed = counts(&Gen::uint(0..=m - 1), i as u64, SAMPLES, |v| v as usize, m as usize);
        let expected = SAMPLES as f64 / m as f64;
        for (value, &count) in observed.iter().enumerate() {
            let deviation = (count as f64 - expected).abs() / expected;
            assert!(deviation < 0.05, "m = {}: value {} seen {} times, expected ~{}", m, value, count, expected);
        }
    }
}

#[test]
fn test_offset_ranges_are_uniform() {
    let observed = counts(&Gen::int(-1_000_003..=-999_997), 40, 70_000, |v| (v + 1_000_003) as usize, 7);
    for &count in &observed {
        assert!((9_500..10_500).contains(&count), "{:?}", observed);
    }
}

#[test]
fn test_boolean_is_fair() {
    let observed = counts(&Gen::boolean(), 1, 100_000, usize::from, 2);
    let ratio = observed[1] as f64 / 100_000.0;
    assert!((0.48..0.52).contains(&ratio), "ratio {}", ratio);
}

#[test]
fn test_freq_follows_weights() {
    let observed = counts(&Gen::freq(vec![(2, 0usize), (1, 1)]), 2, 30_000, |v| v, 2);
    let ratio = observed[0] as f64 / observed[1] as f64;
    assert!((1.8..2.2).contains(&ratio), "ratio {}", ratio);

    let real = counts(&Gen::freq_f64(vec![(0.5, 0usize), (1.5, 1)]), 3, 40_000, |v| v, 2);
    let ratio = real[1] as f64 / real[0] as f64;
    assert!((2.7..3.3).contains(&ratio), "ratio {}", ratio);
}

#[test]
fn test_freq_gen_picks_generators_by_weight() {
    let gen = Gen::freq_gen(vec![(5, Gen::done(0usize)), (1, Gen::uint(1..=3).map(|v| v as usize))]);
    let observed = counts(&gen, 4, 60_000, |v| usize::from(v != 0), 2);
    let ratio = observed[0] as f64 / observed[1] as f64;
    assert!((4.0..6.0).contains(&ratio), "ratio {}", ratio);

    let real = Gen::freq_gen_f64(vec![(1.0, Gen::done('a')), (0.0, Gen::done('b'))]);
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    real.foreach(&mut rng, 500, |c| assert_eq!(c, 'a'));
}

#[test]
fn test_one_of_gen_uses_every_branch() {
    let gen = Gen::one_of_gen(vec![Gen::done(0usize), Gen::done(1), Gen::done(2)]);
    let observed = counts(&gen, 6, 3_000, |v| v, 3);
    assert!(observed.iter().all(|&c| c > 800), "{:?}", observed);
}

#[test]
fn test_fail_never_produces_a_value() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut produced = 0;
    Gen::<u64>::fail().foreach(&mut rng, 1_000, |_| produced += 1);
    assert_eq!(produced, 0);

    let failing = Gen::bits(8).flat_map(|_| Gen::<u64>::fail());
    let mut tape = Tape::from_seed(0);
    assert_eq!(failing.run_tape(&mut tape, u64::MAX), RunResult::Filtered);
    assert_eq!(tape.bits_read(), 8);
}

#[test]
fn test_eof_respects_limit() {
    let mut tape = Tape::from_seed(8);
    assert_eq!(Gen::uint(0..=100).run(&mut TapeInput::with_limit(&mut tape, 2)), RunResult::Eof);

    let mut tape = Tape::from_seed(8);
    let pair = Gen::bits(2).zip(&Gen::bits(32));
    assert_eq!(pair.run_tape(&mut tape, 2), RunResult::Eof);
    assert_eq!(tape.bits_read(), 2);
}

#[test]
fn test_filter_keeps_only_matching_values() {
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let evens = Gen::uint(0..=99).filter(|v| v % 2 == 0);
    let mut seen = 0;
    evens.foreach(&mut rng, 1_000, |v| {
        assert_eq!(v % 2, 0);
        seen += 1;
    });
    assert!((400..600).contains(&seen), "{}", seen);
}

#[test]
fn test_sequence_and_repeat_shapes() {
    let mut rng = ChaCha8Rng::seed_from_u64(10);
    let gens = vec![Gen::uint(0..=9), Gen::uint(10..=19), Gen::uint(20..=29)];
    let triple = Gen::sequence(gens).sample(&mut rng).unwrap();
    assert_eq!(triple.len(), 3);
    for (i, v) in triple.iter().enumerate() {
        assert_eq!(*v / 10, i as u64);
    }

    let repeated = Gen::repeat(250, Gen::boolean()).sample(&mut rng).unwrap();
    assert_eq!(repeated.len(), 250);
    assert!(repeated.iter().any(|&b| b) && repeated.iter().any(|&b| !b));
}

#[derive(Clone, Debug)]
enum Expr {
    Lit(u64),
    Add(Box<Expr>, Box<Expr>),
}

impl Expr {
    fn eval(&self) -> u64 {
        match self {
            Expr::Lit(v) => *v,
            Expr::Add(l, r) => l.eval() + r.eval(),
        }
    }

    fn leaves(&self) -> u64 {
        match self {
            Expr::Lit(_) => 1,
            Expr::Add(l, r) => l.leaves() + r.leaves(),
        }
    }

    fn depth(&self) -> usize {
        match self {
            Expr::Lit(_) => 1,
            Expr::Add(l, r) => 1 + l.depth().max(r.depth()),
        }
    }
}

#[test]
fn test_recursive_expressions() {
    let exprs = Gen::recursive(|expr: Gen<Expr>| {
        let lit = Gen::uint(0..=9).map(Expr::Lit);
        let add = expr.zip(&expr).map(|(l, r)| Expr::Add(Box::new(l), Box::new(r)));
        Gen::freq_gen(vec![(3, lit), (1, add)])
    });
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let mut deepest = 0;
    exprs.foreach(&mut rng, 300, |e| {
        deepest = deepest.max(e.depth());
        assert!(e.eval() <= 9 * e.leaves());
    });
    assert!(deepest >= 3);
}

#[test]
fn test_delay_defers_construction() {
    let lazy = Gen::delay(|| Gen::uint(5..=6));
    let mut rng = ChaCha8Rng::seed_from_u64(12);
    lazy.foreach(&mut rng, 100, |v| assert!(v == 5 || v == 6));
}

#[test]
fn test_nullable_and_strings() {
    let mut rng = ChaCha8Rng::seed_from_u64(13);
    let maybe = Gen::string_of_len(3, &Gen::char_range('a'..='c')).nullable();
    let mut nones = 0;
    maybe.foreach(&mut rng, 400, |s| match s {
        None => nones += 1,
        Some(s) => {
            assert_eq!(s.chars().count(), 3);
            assert!(s.chars().all(|c| ('a'..='c').contains(&c)));
        }
    });
    assert!((120..280).contains(&nones), "{}", nones);
}

#[test]
fn test_uniform_mean() {
    let mut rng = ChaCha8Rng::seed_from_u64(14);
    let mut sum = 0.0;
    let mut n = 0;
    Gen::uniform().foreach(&mut rng, 20_000, |u| {
        sum += u;
        n += 1;
    });
    let mean = sum / n as f64;
    assert!((0.49..0.51).contains(&mean), "mean {}", mean);
}

#[test]
fn test_replay_is_exact() {
    let gen = Gen::small_string().zip(&Gen::int(-50..=50));
    for seed in 0..50 {
        let tape_seed = TapeSeed::from_seed(seed);
        let (first, tape) = gen.replay(&tape_seed);
        let (second, again) = gen.replay(&tape_seed);
        assert_eq!(first, second);
        assert_eq!(tape.bits_read(), again.bits_read());
    }
}
