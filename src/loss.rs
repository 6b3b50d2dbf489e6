use ndarray::{ArrayBase, Array2, Data, Ix2};

/// Loss function trait for training neural networks
pub trait LossFunction {
    /// Compute the loss between predictions and targets
    fn compute_loss<S1, S2>(&self, predictions: &ArrayBase<S1, Ix2>, targets: &ArrayBase<S2, Ix2>) -> f64
    where
        S1: Data<Elem = f64>,
        S2: Data<Elem = f64>;

    /// Compute the gradient of the loss with respect to predictions
    fn compute_gradient<S1, S2>(&self, predictions: &ArrayBase<S1, Ix2>, targets: &ArrayBase<S2, Ix2>) -> Array2<f64>
    where
        S1: Data<Elem = f64>,
        S2: Data<Elem = f64>;
}

/// Mean Squared Error loss, averaged over every element
#[derive(Clone, Copy, Debug, Default)]
pub struct MSELoss;

impl LossFunction for MSELoss {
    fn compute_loss<S1, S2>(&self, predictions: &ArrayBase<S1, Ix2>, targets: &ArrayBase<S2, Ix2>) -> f64
    where
        S1: Data<Elem = f64>,
        S2: Data<Elem = f64>,
    {
        let diff = predictions - targets;
        diff.mapv(|x| x * x).sum() / (predictions.len() as f64)
    }

    fn compute_gradient<S1, S2>(&self, predictions: &ArrayBase<S1, Ix2>, targets: &ArrayBase<S2, Ix2>) -> Array2<f64>
    where
        S1: Data<Elem = f64>,
        S2: Data<Elem = f64>,
    {
        let diff = predictions - targets;
        2.0 * diff / (predictions.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, s};

    #[test]
    fn test_mse_loss() {
        let loss_fn = MSELoss;
        let predictions = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
        let targets = arr2(&[[1.5, 2.5], [2.5, 3.5]]);

        let loss = loss_fn.compute_loss(&predictions, &targets);
        assert!((loss - 0.25).abs() < 1e-6);

        let gradient = loss_fn.compute_gradient(&predictions, &targets);
        assert_eq!(gradient, arr2(&[[-0.25, -0.25], [0.25, 0.25]]));
    }

    #[test]
    fn test_mse_loss_on_views() {
        let predictions = arr2(&[[1.0, 2.0, 9.0], [3.0, 4.0, 9.0]]);
        let targets = arr2(&[[1.0, 2.0], [3.0, 5.0]]);

        // Only the leading columns take part, as when scoring teacher-forced predictions
        let loss = MSELoss.compute_loss(&predictions.slice(s![.., ..2]), &targets);
        assert!((loss - 0.25).abs() < 1e-12);
    }
}
