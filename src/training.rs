use ndarray::{s, Array2};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use crate::data::SequenceSplit;
use crate::errors::{ModelError, TrainingError};
use crate::loss::{LossFunction, MSELoss};
use crate::models::sequence::SequenceModel;
use crate::optimizers::{LbfgsConfig, LBFGS};
use crate::plot;

/// Configuration for the training run
#[derive(Clone, Debug)]
pub struct TrainingConfig {
    /// Number of optimizer steps
    pub steps: usize,
    /// Free-running steps predicted past the end of each test wave
    pub future: usize,
    /// Directory receiving `predict{step}.html`
    pub output_dir: PathBuf,
    pub plot: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            steps: 15,
            future: 1000,
            output_dir: PathBuf::from("."),
            plot: true,
        }
    }
}

/// Metrics recorded after every optimizer step
#[derive(Debug, Clone)]
pub struct StepMetrics {
    pub step: usize,
    /// Loss at the start of the step
    pub train_loss: f64,
    /// Loss on the held-out waves over their known time steps
    pub test_loss: f64,
    pub time_elapsed: f64,
}

/// Trains a `SequenceModel` with L-BFGS over the whole training batch
pub struct SequenceTrainer<L: LossFunction> {
    pub model: SequenceModel,
    pub loss_function: L,
    pub optimizer: LBFGS,
    pub config: TrainingConfig,
    pub metrics_history: Vec<StepMetrics>,
}

impl<L: LossFunction> SequenceTrainer<L> {
    pub fn new(model: SequenceModel, loss_function: L, optimizer: LBFGS) -> Self {
        SequenceTrainer {
            model,
            loss_function,
            optimizer,
            config: TrainingConfig::default(),
            metrics_history: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: TrainingConfig) -> Self {
        self.config = config;
        self
    }

    /// One L-BFGS step over the full training batch, followed by evaluation
    /// on the held-out waves. Returns the metrics and the test predictions.
    pub fn train_step(&mut self, split: &SequenceSplit) -> Result<(StepMetrics, Array2<f64>), ModelError> {
        let start_time = Instant::now();
        let step = self.metrics_history.len();

        let SequenceTrainer { model, loss_function, optimizer, .. } = self;
        let mut params = model.flat_parameters();
        let train_loss = optimizer.step(&mut params, |p| {
            model.set_flat_parameters(p)?;
            let (outputs, cache) = model.forward_with_cache(&split.input);
            let loss = loss_function.compute_loss(&outputs, &split.target);
            info!("loss: {}", loss);

            let d_outputs = loss_function.compute_gradient(&outputs, &split.target);
            Ok::<_, ModelError>((loss, model.backward(&d_outputs, &cache).flatten()))
        })?;
        self.model.set_flat_parameters(&params)?;

        let (test_loss, predictions) = self.evaluate(&split.test_input, &split.test_target)?;

        let metrics = StepMetrics {
            step,
            train_loss,
            test_loss,
            time_elapsed: start_time.elapsed().as_secs_f64(),
        };
        self.metrics_history.push(metrics.clone());

        Ok((metrics, predictions))
    }

    /// Runs the configured number of steps, logging losses and plotting test predictions
    pub fn train(&mut self, split: &SequenceSplit) -> Result<(), TrainingError> {
        info!(
            steps = self.config.steps,
            parameters = self.model.num_parameters(),
            sequences = split.input.nrows(),
            "starting training"
        );

        for i in 0..self.config.steps {
            info!("STEP: {}", i);
            let (metrics, predictions) = self.train_step(split)?;
            info!("test loss: {}", metrics.test_loss);

            if self.config.plot {
                let path = self.config.output_dir.join(format!("predict{}.html", metrics.step));
                plot::draw_result(&predictions, split.input_len(), &path)?;
            }
        }

        info!("training completed");
        Ok(())
    }

    /// Predicts `config.future` steps past `input` and scores the known part against `target`
    pub fn evaluate(&self, input: &Array2<f64>, target: &Array2<f64>) -> Result<(f64, Array2<f64>), ModelError> {
        let predictions = self.predict(input)?;
        let known = predictions.slice(s![.., ..target.ncols()]);
        let loss = self.loss_function.compute_loss(&known, target);
        Ok((loss, predictions))
    }

    /// Generate predictions for input sequences plus `config.future` steps
    pub fn predict(&self, input: &Array2<f64>) -> Result<Array2<f64>, ModelError> {
        self.model.forward(input, self.config.future)
    }

    pub fn get_latest_metrics(&self) -> Option<&StepMetrics> {
        self.metrics_history.last()
    }

    pub fn get_metrics_history(&self) -> &[StepMetrics] {
        &self.metrics_history
    }
}

/// Create a trainer with L-BFGS at the given learning rate and MSE loss
pub fn create_lbfgs_trainer(model: SequenceModel, learning_rate: f64) -> SequenceTrainer<MSELoss> {
    let optimizer = LBFGS::new(LbfgsConfig::default().with_lr(learning_rate));
    SequenceTrainer::new(model, MSELoss, optimizer)
}
