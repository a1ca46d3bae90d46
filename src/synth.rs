use rand::Rng;

use crate::alphabet::WeightedAlphabet;
use crate::dataset::Sequence;
use crate::error::SimResult;

/// Draws a sequence of exactly `len` bases, each picked independently from `alphabet`.
///
/// The caller owns `rng`; concurrent workers must each pass their own generator.
pub fn synthesize<R: Rng>(
    len: usize,
    alphabet: &WeightedAlphabet,
    rng: &mut R,
) -> SimResult<Sequence> {
    (0..len).map(|_| alphabet.draw(rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Weights;
    use crate::error::SimError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn exact_length_and_alphabet() {
        let alphabet = WeightedAlphabet::new(Weights::new(1, 1, 1, 1)).unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        for len in [0, 1, 5, 100] {
            let seq = synthesize(len, &alphabet, &mut rng).unwrap();
            assert_eq!(seq.len(), len);
            assert!(seq.iter().all(|b| b"ACGT".contains(b)));
        }
    }

    #[test]
    fn zero_weight_bases_never_appear() {
        let alphabet = WeightedAlphabet::new(Weights::new(3, 0, 1, 0)).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let seq = synthesize(2000, &alphabet, &mut rng).unwrap();

        assert!(seq.iter().all(|b| *b == b'A' || *b == b'G'));
    }

    #[test]
    fn frequencies_follow_weights() {
        let alphabet = WeightedAlphabet::new(Weights::new(3, 1, 0, 0)).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let seq = synthesize(40_000, &alphabet, &mut rng).unwrap();

        let a = seq.iter().filter(|b| **b == b'A').count() as f64 / seq.len() as f64;
        assert!((a - 0.75).abs() < 0.02, "observed A fraction {a}");
    }

    #[test]
    fn same_seed_same_sequence() {
        let alphabet = WeightedAlphabet::new(Weights::new(1, 2, 3, 4)).unwrap();
        let a = synthesize(50, &alphabet, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = synthesize(50, &alphabet, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_pool_is_an_error() {
        let alphabet = WeightedAlphabet::new(Weights::new(0, 0, 0, 0)).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            synthesize(10, &alphabet, &mut rng),
            Err(SimError::InvalidConfiguration(_))
        ));
    }
}
