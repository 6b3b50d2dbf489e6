use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use crate::errors::ModelError;
use crate::layers::linear::{LinearGradients, LinearLayer};
use crate::layers::lstm_cell::{LSTMCell, LSTMCellCache, LSTMCellGradients};

/// Cached values for one time step of the stacked network
#[derive(Clone, Debug)]
pub struct StepCache {
    pub lstm1: LSTMCellCache,
    pub lstm2: LSTMCellCache,
    /// Second-layer hidden state, i.e. the read-out input
    pub h2: Array2<f64>,
}

/// Cached values for a whole teacher-forced sequence
#[derive(Clone, Debug)]
pub struct SequenceCache {
    pub steps: Vec<StepCache>,
}

/// Gradients for every parameter of a `SequenceModel`
#[derive(Clone, Debug)]
pub struct SequenceGradients {
    pub lstm1: LSTMCellGradients,
    pub lstm2: LSTMCellGradients,
    pub linear: LinearGradients,
}

impl SequenceGradients {
    /// Flattens the gradients in the same order as `SequenceModel::flat_parameters`
    pub fn flatten(&self) -> Array1<f64> {
        self.lstm1.tensors().into_iter()
            .chain(self.lstm2.tensors())
            .chain(self.linear.tensors())
            .flat_map(|t| t.iter().copied())
            .collect()
    }
}

/// Two stacked LSTM cells followed by a linear read-out to a scalar.
///
/// Sequences are given as (batch, time) matrices of scalars. Each column is
/// fed through lstm1 -> lstm2 -> linear, and for predictions beyond the end
/// of the input the previous output is fed back in as the next input.
#[derive(Clone, Debug)]
pub struct SequenceModel {
    pub lstm1: LSTMCell,
    pub lstm2: LSTMCell,
    pub linear: LinearLayer,
    pub hidden_size: usize,
}

impl SequenceModel {
    pub fn new<R: Rng + ?Sized>(hidden_size: usize, rng: &mut R) -> Self {
        SequenceModel {
            lstm1: LSTMCell::new(1, hidden_size, rng),
            lstm2: LSTMCell::new(hidden_size, hidden_size, rng),
            linear: LinearLayer::new(hidden_size, 1, rng),
            hidden_size,
        }
    }

    /// Assembles a model from existing layers (used for deserialization)
    pub fn from_layers(lstm1: LSTMCell, lstm2: LSTMCell, linear: LinearLayer) -> Result<Self, ModelError> {
        let hidden_size = lstm1.hidden_size;
        let expected = [1, hidden_size, hidden_size, hidden_size, 1];
        let actual = [
            lstm1.input_size,
            lstm2.input_size,
            lstm2.hidden_size,
            linear.input_size,
            linear.output_size,
        ];
        if expected != actual {
            return Err(ModelError::ShapeMismatch {
                expected: expected.to_vec(),
                actual: actual.to_vec(),
            });
        }

        Ok(SequenceModel { lstm1, lstm2, linear, hidden_size })
    }

    /// Runs the network over `input` and then `future` more steps on its own output.
    ///
    /// Returns a (batch, time + future) matrix of predictions. State starts at
    /// zero on every call.
    pub fn forward(&self, input: &Array2<f64>, future: usize) -> Result<Array2<f64>, ModelError> {
        let (batch, time) = input.dim();
        if time == 0 && future > 0 {
            return Err(ModelError::EmptySequence { future });
        }

        let mut outputs = Array2::<f64>::zeros((batch, time + future));
        let (mut h1, mut c1) = self.lstm1.zero_state(batch);
        let (mut h2, mut c2) = self.lstm2.zero_state(batch);
        let mut output = Array2::<f64>::zeros((1, batch));

        for t in 0..time + future {
            let x = if t < time { column(input.view(), t) } else { output };
            (h1, c1) = self.lstm1.forward(&x, &h1, &c1);
            (h2, c2) = self.lstm2.forward(&h1, &h2, &c2);
            output = self.linear.forward(&h2);
            outputs.column_mut(t).assign(&output.row(0));
        }

        Ok(outputs)
    }

    /// Teacher-forced pass over `input` that keeps what backpropagation needs
    pub fn forward_with_cache(&self, input: &Array2<f64>) -> (Array2<f64>, SequenceCache) {
        let (batch, time) = input.dim();
        let mut outputs = Array2::<f64>::zeros((batch, time));
        let mut steps = Vec::with_capacity(time);
        let (mut h1, mut c1) = self.lstm1.zero_state(batch);
        let (mut h2, mut c2) = self.lstm2.zero_state(batch);

        for t in 0..time {
            let x = column(input.view(), t);
            let (new_h1, new_c1, lstm1) = self.lstm1.forward_with_cache(&x, &h1, &c1);
            let (new_h2, new_c2, lstm2) = self.lstm2.forward_with_cache(&new_h1, &h2, &c2);
            let output = self.linear.forward(&new_h2);
            outputs.column_mut(t).assign(&output.row(0));

            steps.push(StepCache { lstm1, lstm2, h2: new_h2.clone() });
            (h1, c1, h2, c2) = (new_h1, new_c1, new_h2, new_c2);
        }

        (outputs, SequenceCache { steps })
    }

    /// Backpropagation through time.
    ///
    /// `d_outputs` is the loss gradient with respect to the (batch, time)
    /// output of `forward_with_cache`.
    pub fn backward(&self, d_outputs: &Array2<f64>, cache: &SequenceCache) -> SequenceGradients {
        let batch = d_outputs.nrows();
        let mut gradients = self.zero_gradients();

        let (mut dh1_next, mut dc1_next) = self.lstm1.zero_state(batch);
        let (mut dh2_next, mut dc2_next) = self.lstm2.zero_state(batch);

        for (t, step) in cache.steps.iter().enumerate().rev() {
            let dy = column(d_outputs.view(), t);
            let (linear_grads, dh2_out) = self.linear.backward(&dy, &step.h2);

            let dh2 = dh2_out + &dh2_next;
            let (lstm2_grads, dx2, dh2_prev, dc2_prev) = self.lstm2.backward(&dh2, &dc2_next, &step.lstm2);

            let dh1 = dx2 + &dh1_next;
            let (lstm1_grads, _, dh1_prev, dc1_prev) = self.lstm1.backward(&dh1, &dc1_next, &step.lstm1);

            gradients.linear.accumulate(&linear_grads);
            gradients.lstm2.accumulate(&lstm2_grads);
            gradients.lstm1.accumulate(&lstm1_grads);

            dh2_next = dh2_prev;
            dc2_next = dc2_prev;
            dh1_next = dh1_prev;
            dc1_next = dc1_prev;
        }

        gradients
    }

    /// Initialize zero gradients for all layers
    pub fn zero_gradients(&self) -> SequenceGradients {
        SequenceGradients {
            lstm1: self.lstm1.zero_gradients(),
            lstm2: self.lstm2.zero_gradients(),
            linear: self.linear.zero_gradients(),
        }
    }

    /// All parameters as one vector: lstm1, lstm2, then linear
    pub fn flat_parameters(&self) -> Array1<f64> {
        self.lstm1.parameters().into_iter()
            .chain(self.lstm2.parameters())
            .chain(self.linear.parameters())
            .flat_map(|p| p.iter().copied())
            .collect()
    }

    /// Overwrites all parameters from a vector laid out like `flat_parameters`
    pub fn set_flat_parameters(&mut self, flat: &Array1<f64>) -> Result<(), ModelError> {
        let expected = self.num_parameters();
        if flat.len() != expected {
            return Err(ModelError::ParameterCountMismatch { expected, actual: flat.len() });
        }

        let mut values = flat.iter().copied();
        let params = self.lstm1.parameters_mut().into_iter()
            .chain(self.lstm2.parameters_mut())
            .chain(self.linear.parameters_mut());
        for param in params {
            param.iter_mut().zip(values.by_ref()).for_each(|(p, v)| *p = v);
        }

        Ok(())
    }

    pub fn num_parameters(&self) -> usize {
        self.lstm1.num_parameters() + self.lstm2.num_parameters() + self.linear.num_parameters()
    }
}

/// Column `t` of a (batch, time) matrix as a (1, batch) input
fn column(data: ArrayView2<f64>, t: usize) -> Array2<f64> {
    data.slice(s![.., t]).insert_axis(Axis(0)).to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loss::{LossFunction, MSELoss};
    use ndarray::arr2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_model() -> SequenceModel {
        SequenceModel::new(4, &mut StdRng::seed_from_u64(0))
    }

    fn sample_input() -> Array2<f64> {
        arr2(&[[0.0, 0.3, 0.6, 0.8], [0.5, 0.2, -0.1, -0.4]])
    }

    #[test]
    fn test_forward_shapes() {
        let model = small_model();
        let input = sample_input();

        assert_eq!(model.forward(&input, 0).unwrap().shape(), &[2, 4]);
        assert_eq!(model.forward(&input, 6).unwrap().shape(), &[2, 10]);
    }

    #[test]
    fn test_future_extends_teacher_forced_prefix() {
        let model = small_model();
        let input = sample_input();

        let plain = model.forward(&input, 0).unwrap();
        let extended = model.forward(&input, 3).unwrap();
        assert_eq!(extended.slice(s![.., ..4]), plain);

        let (cached, _) = model.forward_with_cache(&input);
        assert_eq!(cached, plain);
    }

    #[test]
    fn test_empty_input_with_future_is_rejected() {
        let model = small_model();
        let empty = Array2::zeros((2, 0));

        assert!(matches!(model.forward(&empty, 5), Err(ModelError::EmptySequence { future: 5 })));
        assert_eq!(model.forward(&empty, 0).unwrap().shape(), &[2, 0]);
    }

    #[test]
    fn test_flat_parameter_round_trip() {
        let mut model = small_model();
        let flat = model.flat_parameters();
        assert_eq!(flat.len(), model.num_parameters());

        let shifted = &flat + 1.0;
        model.set_flat_parameters(&shifted).unwrap();
        assert_eq!(model.flat_parameters(), shifted);
        assert_eq!(model.lstm1.w_ih[[0, 0]], flat[0] + 1.0);

        let result = model.set_flat_parameters(&Array1::zeros(3));
        assert!(matches!(result, Err(ModelError::ParameterCountMismatch { actual: 3, .. })));
    }

    #[test]
    fn test_from_layers_validates_shapes() {
        let mut rng = StdRng::seed_from_u64(0);
        let lstm1 = LSTMCell::new(1, 4, &mut rng);
        let lstm2 = LSTMCell::new(4, 4, &mut rng);

        assert!(SequenceModel::from_layers(lstm1.clone(), lstm2.clone(), LinearLayer::new(4, 1, &mut rng)).is_ok());
        assert!(SequenceModel::from_layers(lstm1, lstm2, LinearLayer::new(3, 1, &mut rng)).is_err());
    }

    #[test]
    fn test_bptt_matches_finite_differences() {
        let mut model = small_model();
        let input = sample_input();
        let target = arr2(&[[0.3, 0.6, 0.8, 0.9], [0.2, -0.1, -0.4, -0.6]]);

        let (outputs, cache) = model.forward_with_cache(&input);
        let d_outputs = MSELoss.compute_gradient(&outputs, &target);
        let analytic = model.backward(&d_outputs, &cache).flatten();

        let base = model.flat_parameters();
        let eps = 1e-6;
        // Spot-check parameters from every tensor of every layer
        let n = base.len();
        let indices = [0, 5, 17, 40, 90, 100, n - 30, n - 6, n - 1];
        for &i in &indices {
            let mut plus = base.clone();
            plus[i] += eps;
            model.set_flat_parameters(&plus).unwrap();
            let loss_plus = MSELoss.compute_loss(&model.forward(&input, 0).unwrap(), &target);

            let mut minus = base.clone();
            minus[i] -= eps;
            model.set_flat_parameters(&minus).unwrap();
            let loss_minus = MSELoss.compute_loss(&model.forward(&input, 0).unwrap(), &target);

            let numeric = (loss_plus - loss_minus) / (2.0 * eps);
            assert!(
                (analytic[i] - numeric).abs() < 1e-7 + 1e-5 * numeric.abs(),
                "parameter {}: analytic {} vs numeric {}", i, analytic[i], numeric
            );
        }
    }
}
