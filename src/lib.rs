//! # Time Sequence Prediction
//!
//! Learns to continue sine waves with a two-layer LSTM trained by L-BFGS.
//!
//! ## Core Components
//!
//! - **Layers**: batched LSTM cell and linear read-out with hand-written backpropagation
//! - **Model**: `SequenceModel` stacks LSTM -> LSTM -> linear and can free-run past its input
//! - **Optimizer**: L-BFGS over the flattened parameter vector
//! - **Training**: full-batch training with per-step evaluation on held-out waves
//! - **Data & plots**: sine-wave dataset generation and HTML prediction plots
//!
//! ## Quick Start
//!
//! ```rust
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use time_sequence_prediction::data::{generate, SequenceSplit, SineWaveConfig};
//! use time_sequence_prediction::{create_lbfgs_trainer, SequenceModel, TrainingConfig};
//!
//! let data = generate(&SineWaveConfig { length: 20, count: 5, ..SineWaveConfig::default() }).unwrap();
//! let split = SequenceSplit::new(&data, 3).unwrap();
//!
//! let model = SequenceModel::new(8, &mut StdRng::seed_from_u64(0));
//! let config = TrainingConfig { steps: 1, future: 5, plot: false, ..TrainingConfig::default() };
//! let mut trainer = create_lbfgs_trainer(model, 0.8).with_config(config);
//!
//! let (metrics, predictions) = trainer.train_step(&split).unwrap();
//! assert_eq!(predictions.ncols(), 19 + 5);
//! assert!(metrics.test_loss.is_finite());
//! ```

pub mod utils;
pub mod errors;
pub mod layers;
pub mod models;
pub mod loss;
pub mod optimizers;
pub mod data;
pub mod training;
pub mod plot;
pub mod persistence;

// Re-export commonly used items
pub use models::sequence::SequenceModel;
pub use layers::lstm_cell::LSTMCell;
pub use layers::linear::LinearLayer;
pub use training::{create_lbfgs_trainer, SequenceTrainer, StepMetrics, TrainingConfig};
pub use optimizers::{LbfgsConfig, LBFGS};
pub use loss::{LossFunction, MSELoss};
pub use errors::{DataError, ModelError, TrainingError};
pub use persistence::{ModelPersistence, PersistentModel, ModelMetadata, PersistenceError};

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_library_integration() {
        let model = SequenceModel::new(51, &mut StdRng::seed_from_u64(0));
        let input = arr2(&[[0.0, 0.05, 0.1], [0.5, 0.45, 0.4]]);

        let predictions = model.forward(&input, 4).unwrap();

        assert_eq!(predictions.shape(), &[2, 7]);
        assert_eq!(model.num_parameters(), 4 * 51 * (1 + 51 + 2) + 4 * 51 * (51 + 51 + 2) + 51 + 1);
    }
}
