//! TapeSeed round trips through bytes, Base58 text and serde.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tapegen::{BitDeque, Tape, TapeSeed, TapeSeedError};

fn random_seed(rng: &mut ChaCha8Rng) -> TapeSeed {
    let len = rng.gen_range(0..=256);
    let flips: BitDeque = (0..len).map(|_| rng.gen::<bool>()).collect();
    TapeSeed::new(rng.gen(), flips)
}

#[test]
fn test_random_seeds_round_trip() {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    for _ in 0..100 {
        let seed = random_seed(&mut rng);
        assert_eq!(TapeSeed::from_bytes(&seed.to_bytes()), Ok(seed.clone()));
        assert_eq!(TapeSeed::from_base58(&seed.to_base58()), Ok(seed.clone()));

        let json = serde_json::to_string(&seed).unwrap();
        let back: TapeSeed = serde_json::from_str(&json).unwrap();
        assert_eq!(back, seed);
    }
}

#[test]
fn test_decoded_seed_reproduces_bits() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    for _ in 0..20 {
        let seed = random_seed(&mut rng);
        let decoded: TapeSeed = seed.to_string().parse().unwrap();
        let mut original = Tape::new(seed);
        let mut restored = Tape::new(decoded);
        for width in [1, 64, 17, 33, 64, 64, 64, 5] {
            assert_eq!(original.read(width), restored.read(width));
        }
    }
}

#[test]
fn test_bad_text_is_an_error() {
    assert!(matches!("".parse::<TapeSeed>(), Err(TapeSeedError::TooShort(0))));
    assert!(matches!("not base58!".parse::<TapeSeed>(), Err(TapeSeedError::Base58(_))));
    assert!(serde_json::from_str::<TapeSeed>("\"0000\"").is_err());
}
