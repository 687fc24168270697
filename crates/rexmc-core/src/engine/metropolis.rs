use rand::Rng;

/// Metropolis criterion for a score change `delta` at temperature `kt`.
///
/// Downhill and neutral moves are always accepted and consume no random number.
#[inline]
pub fn accept(delta: f64, kt: f64, rng: &mut impl Rng) -> bool {
    if delta <= 0.0 {
        return true;
    }
    rng.r#gen::<f64>() < (-delta / kt).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn downhill_and_neutral_moves_are_always_accepted() {
        let mut rng = StdRng::seed_from_u64(7);
        for delta in [0.0, -1e-12, -1.0, -1e6] {
            for kt in [1e-6, 1.0, 100.0] {
                assert!(accept(delta, kt, &mut rng));
            }
        }
    }

    #[test]
    fn huge_uphill_moves_are_rejected() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            assert!(!accept(1e4, 1.0, &mut rng));
        }
    }

    #[test]
    fn acceptance_rate_follows_boltzmann_factor() {
        let mut rng = StdRng::seed_from_u64(11);
        let trials = 20_000;
        let accepted = (0..trials).filter(|_| accept(1.0, 1.0, &mut rng)).count();
        let rate = accepted as f64 / trials as f64;
        assert!((rate - (-1.0f64).exp()).abs() < 0.02, "rate = {}", rate);
    }

    #[test]
    fn same_seed_gives_same_decisions() {
        let mut a = StdRng::seed_from_u64(3);
        let mut b = StdRng::seed_from_u64(3);
        let da: Vec<bool> = (0..100).map(|_| accept(0.5, 1.0, &mut a)).collect();
        let db: Vec<bool> = (0..100).map(|_| accept(0.5, 1.0, &mut b)).collect();
        assert_eq!(da, db);
    }
}
