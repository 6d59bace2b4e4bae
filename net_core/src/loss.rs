use ndarray::{Array2, ArrayView2};

const EPSILON: f32 = 1e-7;

pub trait LossFn {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32;
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32>;
}

/// Categorical cross-entropy over one-hot targets and probability rows.
#[derive(Default, Clone, Copy)]
pub struct CategoricalCrossentropy;

impl CategoricalCrossentropy {
    /// Returns a new `CategoricalCrossentropy`.
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for CategoricalCrossentropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let n = y_pred.nrows().max(1) as f32;
        let mut total = 0.0;
        for (p, t) in y_pred.iter().zip(y.iter()) {
            total -= t * (p + EPSILON).ln();
        }
        total / n
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let n = y_pred.nrows().max(1) as f32;
        let mut grad = y_pred.to_owned();
        grad.zip_mut_with(&y, |p, &t| *p = -t / ((*p + EPSILON) * n));
        grad
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn perfect_prediction_has_near_zero_loss() {
        let y = array![[0.0_f32, 1.0, 0.0]];
        let pred = array![[0.0_f32, 1.0, 0.0]];
        let loss = CategoricalCrossentropy.loss(pred.view(), y.view());
        assert!(loss.abs() < 1e-5);
    }

    #[test]
    fn confident_wrong_prediction_costs_more_than_uncertain() {
        let y = array![[1.0_f32, 0.0]];
        let uncertain = array![[0.5_f32, 0.5]];
        let wrong = array![[0.1_f32, 0.9]];
        let cce = CategoricalCrossentropy;
        assert!(cce.loss(wrong.view(), y.view()) > cce.loss(uncertain.view(), y.view()));
    }

    #[test]
    fn gradient_pushes_the_true_class_up() {
        let y = array![[1.0_f32, 0.0]];
        let pred = array![[0.3_f32, 0.7]];
        let grad = CategoricalCrossentropy.loss_prime(pred.view(), y.view());
        // Negative gradient on the true class, zero elsewhere.
        assert!(grad[[0, 0]] < 0.0);
        assert_eq!(grad[[0, 1]], 0.0);
    }
}
