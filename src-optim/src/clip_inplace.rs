use ndarray::ArrayViewMut1;

/// Clamp every gene into its closed [lower, upper] interval
pub(crate) fn clip_inplace(mut x: ArrayViewMut1<'_, f64>, bounds: &[(f64, f64)]) {
    for (xi, &(lower, upper)) in x.iter_mut().zip(bounds.iter()) {
        if *xi < lower {
            *xi = lower;
        }
        if *xi > upper {
            *xi = upper;
        }
    }
}
