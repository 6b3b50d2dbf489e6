/// Activation and initialization helpers shared by the layers.

use ndarray::Array2;
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::Uniform;

/// Sigmoid activation function: σ(x) = 1 / (1 + e^(-x))
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Derivative of the sigmoid expressed through its output: σ'(x) = s(1 - s)
pub fn sigmoid_grad(s: f64) -> f64 {
    s * (1.0 - s)
}

/// Derivative of tanh expressed through its output: tanh'(x) = 1 - t²
pub fn tanh_grad(t: f64) -> f64 {
    1.0 - t * t
}

/// Matrix with every entry drawn from U(-bound, bound).
pub fn uniform_array<R: Rng + ?Sized>(shape: (usize, usize), bound: f64, rng: &mut R) -> Array2<f64> {
    Array2::random_using(shape, Uniform::new_inclusive(-bound, bound), rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-10);
        assert!(sigmoid(1000.0) > 0.99);
        assert!(sigmoid(-1000.0) < 0.01);
    }

    #[test]
    fn test_activation_gradients() {
        assert!((sigmoid_grad(sigmoid(0.0)) - 0.25).abs() < 1e-12);
        assert!((tanh_grad(0.0_f64.tanh()) - 1.0).abs() < 1e-12);

        let x: f64 = 0.3;
        let eps = 1e-6;
        let numeric = ((x + eps).tanh() - (x - eps).tanh()) / (2.0 * eps);
        assert!((tanh_grad(x.tanh()) - numeric).abs() < 1e-8);
    }

    #[test]
    fn test_uniform_array_bounds_and_seeding() {
        let a = uniform_array((4, 3), 0.5, &mut StdRng::seed_from_u64(7));
        let b = uniform_array((4, 3), 0.5, &mut StdRng::seed_from_u64(7));

        assert_eq!(a.shape(), &[4, 3]);
        assert!(a.iter().all(|&x| (-0.5..=0.5).contains(&x)));
        assert_eq!(a, b);
    }
}
