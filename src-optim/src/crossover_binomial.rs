use ndarray::Array1;
use rand::Rng;

/// Take each gene from `mutant` with probability `cr`, and always gene `j_rand`
pub(crate) fn binomial_crossover<R: Rng + ?Sized>(
    target: &Array1<f64>,
    mutant: &Array1<f64>,
    cr: f64,
    rng: &mut R,
) -> Array1<f64> {
    let n = target.len();
    let j_rand = rng.random_range(0..n);
    let mut trial = target.clone();
    for j in 0..n {
        if rng.random::<f64>() < cr || j == j_rand {
            trial[j] = mutant[j];
        }
    }
    trial
}
