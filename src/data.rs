//! Sine-wave training data.
//!
//! The dataset is a (count, length) matrix where every row is a sine wave
//! with period `2π·period` sampled at integer positions and shifted by a
//! random whole number of samples.

use ndarray::{s, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use tracing::info;

use crate::errors::DataError;
use crate::persistence::{read_by_extension, write_by_extension, SerializableArray2};

/// Parameters of the generated sine-wave dataset
#[derive(Clone, Debug)]
pub struct SineWaveConfig {
    pub period: usize,
    pub length: usize,
    pub count: usize,
    pub seed: u64,
}

impl Default for SineWaveConfig {
    fn default() -> Self {
        SineWaveConfig {
            period: 20,
            length: 1000,
            count: 100,
            seed: 2,
        }
    }
}

/// Generates `count` waves: `data[n, k] = sin((k + shift_n) / period)`
/// with `shift_n` drawn from `[-4·period, 4·period)`.
pub fn generate(config: &SineWaveConfig) -> Result<Array2<f64>, DataError> {
    if config.period == 0 || config.length == 0 || config.count == 0 {
        return Err(DataError::Invalid(format!(
            "period, length and count must be positive (got {}, {}, {})",
            config.period, config.length, config.count
        )));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let bound = 4 * config.period as i64;
    let period = config.period as f64;

    let mut data = Array2::<f64>::zeros((config.count, config.length));
    for mut row in data.rows_mut() {
        let shift = rng.gen_range(-bound..bound);
        for (k, value) in row.iter_mut().enumerate() {
            *value = ((k as i64 + shift) as f64 / period).sin();
        }
    }

    Ok(data)
}

/// Writes a dataset; `.json` paths are stored as JSON, anything else as bincode
pub fn save<P: AsRef<Path>>(data: &Array2<f64>, path: P) -> Result<(), DataError> {
    let path = path.as_ref();
    write_by_extension(&SerializableArray2::from(data), path)?;
    info!(path = %path.display(), rows = data.nrows(), cols = data.ncols(), "dataset saved");
    Ok(())
}

/// Reads a dataset written by `save`
pub fn load<P: AsRef<Path>>(path: P) -> Result<Array2<f64>, DataError> {
    let path = path.as_ref();
    let stored: SerializableArray2 = read_by_extension(path)?;
    let data = stored.into_array()?;
    info!(path = %path.display(), rows = data.nrows(), cols = data.ncols(), "dataset loaded");
    Ok(data)
}

/// Next-value prediction pairs, with the first `test_count` waves held out
#[derive(Clone, Debug)]
pub struct SequenceSplit {
    pub input: Array2<f64>,
    pub target: Array2<f64>,
    pub test_input: Array2<f64>,
    pub test_target: Array2<f64>,
}

impl SequenceSplit {
    /// Targets are the inputs shifted one step ahead: `target[:, k] = data[:, k + 1]`
    pub fn new(data: &Array2<f64>, test_count: usize) -> Result<Self, DataError> {
        let (rows, cols) = data.dim();
        if test_count == 0 {
            return Err(DataError::NoTestSequences);
        }
        if cols < 2 {
            return Err(DataError::TooFewTimeSteps(cols));
        }
        if rows <= test_count {
            return Err(DataError::TooFewSequences { rows, test_count });
        }

        Ok(SequenceSplit {
            input: data.slice(s![test_count.., ..-1]).to_owned(),
            target: data.slice(s![test_count.., 1..]).to_owned(),
            test_input: data.slice(s![..test_count, ..-1]).to_owned(),
            test_target: data.slice(s![..test_count, 1..]).to_owned(),
        })
    }

    /// Number of time steps in each input sequence
    pub fn input_len(&self) -> usize {
        self.input.ncols()
    }
}
