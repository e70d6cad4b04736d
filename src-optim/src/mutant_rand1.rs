use ndarray::{Array1, Array2};
use rand::Rng;

use crate::distinct_indices::distinct_indices;

/// Donor vector `x_r1 + F * (x_r2 - x_r3)` with r1, r2, r3 distinct and != i
pub(crate) fn mutant_rand1<R: Rng + ?Sized>(i: usize, pop: &Array2<f64>, f: f64, rng: &mut R) -> Array1<f64> {
    let idxs = distinct_indices(i, 3, pop.nrows(), rng);
    let (r1, r2, r3) = (idxs[0], idxs[1], idxs[2]);
    &pop.row(r1) + &((&pop.row(r2) - &pop.row(r3)) * f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_mutant_with_zero_weight_copies_a_donor() {
        let pop = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let m = mutant_rand1(0, &pop, 0.0, &mut rng);
            assert!(m[0] >= 2.0 && m[0] <= 4.0);
            assert_eq!(m[0], m[1]);
        }
    }
}
