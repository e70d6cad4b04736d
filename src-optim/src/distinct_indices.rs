use rand::Rng;

/// Draw `count` distinct indices in `0..pool_size`, none equal to `exclude`
///
/// Rejection sampling: redraw until the index is new. The pool is tiny
/// (a handful of members), so this terminates fast.
pub(crate) fn distinct_indices<R: Rng + ?Sized>(
    exclude: usize,
    count: usize,
    pool_size: usize,
    rng: &mut R,
) -> Vec<usize> {
    debug_assert!(count <= pool_size.saturating_sub(1));
    let mut out: Vec<usize> = Vec::with_capacity(count);
    while out.len() < count {
        let idx = rng.random_range(0..pool_size);
        if idx != exclude && !out.contains(&idx) {
            out.push(idx);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_indices_distinct_and_exclude_target() {
        let mut rng = StdRng::seed_from_u64(7);
        for target in 0..4 {
            for _ in 0..200 {
                let idxs = distinct_indices(target, 3, 4, &mut rng);
                assert_eq!(idxs.len(), 3);
                assert!(!idxs.contains(&target));
                assert!(idxs.iter().all(|&i| i < 4));
                assert!(idxs[0] != idxs[1] && idxs[0] != idxs[2] && idxs[1] != idxs[2]);
            }
        }
    }
}
