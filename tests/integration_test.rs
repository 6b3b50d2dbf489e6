use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::tempdir;
use time_sequence_prediction::data::{self, generate, SequenceSplit, SineWaveConfig};
use time_sequence_prediction::{create_lbfgs_trainer, SequenceModel, TrainingConfig};

#[test]
fn test_generate_save_train_end_to_end() {
    let dir = tempdir().unwrap();
    let data_path = dir.path().join("traindata.bin");

    let waves = generate(&SineWaveConfig { length: 30, count: 8, ..SineWaveConfig::default() }).unwrap();
    data::save(&waves, &data_path).unwrap();
    let loaded = data::load(&data_path).unwrap();
    assert_eq!(loaded, waves);

    let split = SequenceSplit::new(&loaded, 3).unwrap();
    assert_eq!(split.input.shape(), &[5, 29]);
    assert_eq!(split.test_input.shape(), &[3, 29]);

    let model = SequenceModel::new(6, &mut StdRng::seed_from_u64(0));
    let config = TrainingConfig {
        steps: 3,
        future: 20,
        output_dir: dir.path().to_path_buf(),
        plot: true,
    };
    let mut trainer = create_lbfgs_trainer(model, 0.8).with_config(config);
    trainer.train(&split).unwrap();

    let history = trainer.get_metrics_history();
    assert_eq!(history.len(), 3);
    assert!(history.last().unwrap().train_loss < history[0].train_loss);
    for step in 0..3 {
        assert!(dir.path().join(format!("predict{}.html", step)).exists());
    }

    let forecast = trainer.predict(&split.test_input).unwrap();
    assert_eq!(forecast.shape(), &[3, 29 + 20]);
    assert!(forecast.iter().all(|v| v.is_finite()));
}

#[test]
fn test_same_seed_gives_same_training_run() {
    let waves = generate(&SineWaveConfig { length: 20, count: 5, ..SineWaveConfig::default() }).unwrap();
    let split = SequenceSplit::new(&waves, 2).unwrap();

    let run = || {
        let model = SequenceModel::new(4, &mut StdRng::seed_from_u64(7));
        let config = TrainingConfig { steps: 1, future: 4, plot: false, ..TrainingConfig::default() };
        let mut trainer = create_lbfgs_trainer(model, 0.8).with_config(config);
        trainer.train_step(&split).unwrap().1
    };

    assert_eq!(run(), run());
}
