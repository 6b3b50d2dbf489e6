use clap::builder::RangedU64ValueParser;
use clap::{Args, Subcommand};
use std::path::PathBuf;
use time_sequence_prediction::data::SineWaveConfig;
use time_sequence_prediction::{LbfgsConfig, TrainingConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the sine-wave dataset
    Generate(GenerateArgs),

    /// Train the model, plotting test predictions after every step
    Train(TrainArgs),

    /// Load a saved model and plot its predictions for the held-out waves
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Output file (.json for JSON, anything else for bincode)
    #[arg(long, default_value = "traindata.bin")]
    pub output: PathBuf,

    /// Period divisor T in sin(x / T)
    #[arg(long, default_value_t = 20)]
    pub period: usize,

    /// Samples per wave
    #[arg(long, default_value_t = 1000)]
    pub length: usize,

    /// Number of waves
    #[arg(long, default_value_t = 100)]
    pub count: usize,

    #[arg(long, default_value_t = 2)]
    pub seed: u64,
}

impl From<&GenerateArgs> for SineWaveConfig {
    fn from(a: &GenerateArgs) -> Self {
        SineWaveConfig {
            period: a.period,
            length: a.length,
            count: a.count,
            seed: a.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Dataset written by `generate`
    #[arg(long, default_value = "traindata.bin")]
    pub data: PathBuf,

    /// Steps to run
    #[arg(long, default_value_t = 15)]
    pub steps: usize,

    /// Future steps predicted for the test waves
    #[arg(long, default_value_t = 1000)]
    pub future: usize,

    /// Waves held out for testing
    #[arg(long, default_value_t = 3)]
    pub test_count: usize,

    /// Units per LSTM layer
    #[arg(long, default_value_t = 51, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub hidden_size: usize,

    /// L-BFGS learning rate
    #[arg(long, default_value_t = 0.8)]
    pub lr: f64,

    /// L-BFGS iterations per step
    #[arg(long, default_value_t = 20)]
    pub max_iter: usize,

    /// L-BFGS curvature history length
    #[arg(long, default_value_t = 100)]
    pub history_size: usize,

    /// Seed for weight initialization
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Directory receiving predict{step}.html
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Skip writing prediction plots
    #[arg(long)]
    pub no_plot: bool,

    /// Save the trained model here (.json for JSON, anything else for bincode)
    #[arg(long)]
    pub save_model: Option<PathBuf>,
}

impl From<&TrainArgs> for TrainingConfig {
    fn from(a: &TrainArgs) -> Self {
        TrainingConfig {
            steps: a.steps,
            future: a.future,
            output_dir: a.output_dir.clone(),
            plot: !a.no_plot,
        }
    }
}

impl From<&TrainArgs> for LbfgsConfig {
    fn from(a: &TrainArgs) -> Self {
        LbfgsConfig {
            lr: a.lr,
            max_iter: a.max_iter,
            history_size: a.history_size,
            ..LbfgsConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Model saved by `train --save-model`
    #[arg(long)]
    pub model: PathBuf,

    #[arg(long, default_value = "traindata.bin")]
    pub data: PathBuf,

    #[arg(long, default_value_t = 1000)]
    pub future: usize,

    #[arg(long, default_value_t = 3)]
    pub test_count: usize,

    #[arg(long, default_value = "predict.html")]
    pub output: PathBuf,
}
