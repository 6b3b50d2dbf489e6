//! Error types for model evaluation and dataset handling.

use thiserror::Error;

use crate::persistence::PersistenceError;

/// Errors raised while running or reshaping the sequence model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Cannot predict {future} future steps from an empty input sequence")]
    EmptySequence { future: usize },

    #[error("Parameter count mismatch: expected {expected}, got {actual}")]
    ParameterCountMismatch { expected: usize, actual: usize },

    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch { expected: Vec<usize>, actual: Vec<usize> },
}

/// Errors raised while generating, loading or splitting the dataset.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Dataset needs at least 2 time steps, got {0}")]
    TooFewTimeSteps(usize),

    #[error("Dataset has {rows} sequences; need more than {test_count} to hold out {test_count} for testing")]
    TooFewSequences { rows: usize, test_count: usize },

    #[error("At least one sequence must be held out for testing")]
    NoTestSequences,

    #[error("Invalid dataset: {0}")]
    Invalid(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Errors raised by the training driver.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("Failed to write prediction plot {path}: {source}")]
    Plot {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
