use ndarray::{Array2, ArrayView2, Axis};
use ndarray_rand::{
    rand::Rng,
    rand_distr::Uniform,
    RandomExt,
};

/// Add a single-row bias to every row of `m`.
pub fn forward_bias(m: &mut Array2<f64>, b: &Array2<f64>) {
    assert_eq!(b.nrows(), 1, "bias must have exactly one row");
    assert_eq!(m.ncols(), b.ncols());
    for mut row in m.rows_mut() {
        row += &b.row(0);
    }
}

/// Subtract the column sums of `delta` into the bias gradient `db`.
pub fn backward_bias(delta: ArrayView2<f64>, db: &mut Array2<f64>) {
    assert_eq!(db.nrows(), 1, "bias gradient must have exactly one row");
    assert_eq!(delta.ncols(), db.ncols());
    let sums = delta.sum_axis(Axis(0));
    db.row_mut(0).scaled_add(-1.0, &sums);
}

/// Matrix with entries drawn uniformly from `[-scale, scale]`.
pub fn random_matrix<R: Rng + ?Sized>(
    rows: usize,
    cols: usize,
    scale: f64,
    rng: &mut R,
) -> Array2<f64> {
    assert!(scale > 0.0);
    Array2::random_using((rows, cols), Uniform::new(-scale, scale), rng)
}
