pub mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, GenerateArgs, PredictArgs, TrainArgs};
use rand::rngs::StdRng;
use rand::SeedableRng;
use time_sequence_prediction::data::{self, SequenceSplit, SineWaveConfig};
use time_sequence_prediction::persistence::write_by_extension;
use time_sequence_prediction::{
    plot, LossFunction, LBFGS, MSELoss, ModelPersistence, PersistentModel, SequenceModel,
    SequenceTrainer,
};

#[derive(Parser, Debug)]
#[command(
    name = "time-sequence-prediction",
    version,
    about = "Train a two-layer LSTM with L-BFGS to continue sine waves, plotting its forecasts."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Generate(args) => run_generate(&args),
            Commands::Train(args) => run_train(&args),
            Commands::Predict(args) => run_predict(&args),
        }
    }
}

fn run_generate(args: &GenerateArgs) -> Result<()> {
    let config = SineWaveConfig::from(args);
    let waves = data::generate(&config).context("generating sine waves")?;
    data::save(&waves, &args.output)
        .with_context(|| format!("writing dataset to {}", args.output.display()))?;
    Ok(())
}

fn run_train(args: &TrainArgs) -> Result<()> {
    let waves = data::load(&args.data)
        .with_context(|| format!("loading dataset from {}", args.data.display()))?;
    let split = SequenceSplit::new(&waves, args.test_count)?;

    let config = args.into();
    if !args.no_plot {
        std::fs::create_dir_all(&args.output_dir)
            .with_context(|| format!("creating {}", args.output_dir.display()))?;
    }

    let model = SequenceModel::new(args.hidden_size, &mut StdRng::seed_from_u64(args.seed));
    let mut trainer = SequenceTrainer::new(model, MSELoss, LBFGS::new(args.into())).with_config(config);
    trainer.train(&split)?;

    if let Some(path) = &args.save_model {
        let latest = trainer.get_latest_metrics();
        let saved = ModelPersistence::create_saved_model(
            &trainer.model,
            "time_sequence_prediction".to_string(),
            trainer.get_metrics_history().len(),
            latest.map(|m| m.train_loss),
            latest.map(|m| m.test_loss),
            Some(format!("trained on {}", args.data.display())),
        );
        write_by_extension(&saved, path)
            .with_context(|| format!("saving model to {}", path.display()))?;
        tracing::info!(path = %path.display(), "model saved");
    }

    Ok(())
}

fn run_predict(args: &PredictArgs) -> Result<()> {
    let (model, metadata) = SequenceModel::load(&args.model)
        .with_context(|| format!("loading model from {}", args.model.display()))?;
    tracing::info!(
        name = %metadata.model_name,
        steps_trained = metadata.steps_trained,
        hidden_size = metadata.hidden_size,
        "model loaded"
    );

    let waves = data::load(&args.data)
        .with_context(|| format!("loading dataset from {}", args.data.display()))?;
    let split = SequenceSplit::new(&waves, args.test_count)?;

    let predictions = model.forward(&split.test_input, args.future)?;
    let known = predictions.slice(ndarray::s![.., ..split.test_target.ncols()]);
    tracing::info!("test loss: {}", MSELoss.compute_loss(&known, &split.test_target));

    plot::draw_result(&predictions, split.input_len(), &args.output)?;
    Ok(())
}
