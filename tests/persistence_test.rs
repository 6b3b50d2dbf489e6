use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use time_sequence_prediction::{
    create_lbfgs_trainer,
    data::{generate, SequenceSplit, SineWaveConfig},
    persistence::{ModelPersistence, PersistentModel, ModelMetadata},
    SequenceModel, TrainingConfig,
};
use tempfile::tempdir;

fn metadata(name: &str, hidden_size: usize) -> ModelMetadata {
    ModelMetadata {
        model_name: name.to_string(),
        version: "0.1.0".to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
        hidden_size,
        steps_trained: 0,
        final_train_loss: None,
        final_test_loss: None,
        description: None,
    }
}

fn probe_input() -> Array2<f64> {
    Array2::from_shape_fn((2, 6), |(r, c)| ((r * 3 + c) as f64 / 20.0).sin())
}

#[test]
fn test_model_save_load_json() {
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("test_model.json");

    let model = SequenceModel::new(4, &mut StdRng::seed_from_u64(1));
    let output_before = model.forward(&probe_input(), 5).unwrap();

    model.save(&file_path, metadata("json_model", 4)).unwrap();
    assert!(file_path.exists());

    let (loaded, loaded_metadata) = SequenceModel::load(&file_path).unwrap();
    assert_eq!(loaded_metadata.model_name, "json_model");
    assert_eq!(loaded.hidden_size, 4);

    let output_after = loaded.forward(&probe_input(), 5).unwrap();
    let diff = (&output_before - &output_after).mapv(f64::abs).sum();
    assert!(diff < 1e-10, "loaded model output differs: {}", diff);
}

#[test]
fn test_model_save_load_binary() {
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("test_model.bin");

    let model = SequenceModel::new(3, &mut StdRng::seed_from_u64(2));
    let mut meta = metadata("binary_model", 3);
    meta.steps_trained = 15;
    meta.final_test_loss = Some(0.05);

    model.save(&file_path, meta).unwrap();
    let (loaded, loaded_metadata) = SequenceModel::load(&file_path).unwrap();

    assert_eq!(loaded_metadata.steps_trained, 15);
    assert_eq!(loaded_metadata.final_test_loss, Some(0.05));
    // bincode stores f64 bit-exactly
    assert_eq!(loaded.flat_parameters(), model.flat_parameters());
}

#[test]
fn test_model_persistence_create_saved_model() {
    let model = SequenceModel::new(5, &mut StdRng::seed_from_u64(0));

    let saved_model = ModelPersistence::create_saved_model(
        &model,
        "created_model".to_string(),
        15,
        Some(0.001),
        Some(0.002),
        Some("Created via ModelPersistence".to_string()),
    );

    assert_eq!(saved_model.metadata.model_name, "created_model");
    assert_eq!(saved_model.metadata.steps_trained, 15);
    assert_eq!(saved_model.metadata.final_train_loss, Some(0.001));
    assert_eq!(saved_model.metadata.final_test_loss, Some(0.002));
    assert_eq!(saved_model.metadata.hidden_size, 5);
}

#[test]
fn test_persistence_with_trained_model() {
    let dir = tempdir().unwrap();
    let file_path = dir.path().join("trained_model.json");

    let data = generate(&SineWaveConfig { length: 20, count: 5, ..SineWaveConfig::default() }).unwrap();
    let split = SequenceSplit::new(&data, 2).unwrap();

    let model = SequenceModel::new(4, &mut StdRng::seed_from_u64(0));
    let config = TrainingConfig { steps: 1, future: 3, plot: false, ..TrainingConfig::default() };
    let mut trainer = create_lbfgs_trainer(model, 0.8).with_config(config);
    trainer.train(&split).unwrap();

    let latest = trainer.get_latest_metrics().unwrap();
    let mut meta = metadata("trained_model", 4);
    meta.steps_trained = 1;
    meta.final_train_loss = Some(latest.train_loss);
    trainer.model.save(&file_path, meta).unwrap();

    let (loaded, loaded_metadata) = SequenceModel::load(&file_path).unwrap();
    assert_eq!(loaded_metadata.steps_trained, 1);

    let predictions = loaded.forward(&split.test_input, 3).unwrap();
    assert_eq!(predictions.shape(), &[2, 19 + 3]);
}

#[test]
fn test_file_extension_detection() {
    let dir = tempdir().unwrap();
    let model = SequenceModel::new(2, &mut StdRng::seed_from_u64(0));

    for name in ["model.json", "model.bin", "model.model", "model.xyz"] {
        let path = dir.path().join(name);
        model.save(&path, metadata("extension_test", 2)).unwrap();
        assert!(path.exists());
        assert!(SequenceModel::load(&path).is_ok(), "{} did not load back", name);
    }

    let json = std::fs::read_to_string(dir.path().join("model.json")).unwrap();
    assert!(json.contains("extension_test"));
}

#[test]
fn test_error_handling() {
    assert!(SequenceModel::load("/non/existent/path.json").is_err());

    let model = SequenceModel::new(1, &mut StdRng::seed_from_u64(0));
    let result = model.save("/invalid/path/that/does/not/exist.json", metadata("error_test", 1));
    assert!(result.is_err());
}
