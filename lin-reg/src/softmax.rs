use nalgebra::DMatrix;

/// Apply the softmax function to every row, turning each into a probability distribution
pub fn softmax_rows(m: &mut DMatrix<f64>) {
    for mut row in m.row_iter_mut() {
        // shift by the maximum for numerical stability
        let max = row.max();
        row.apply(|v| *v = (*v - max).exp());
        let sum = row.sum();
        row /= sum;
    }
}
