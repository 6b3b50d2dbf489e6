use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use ndarray::{Array2, Dimension};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

use crate::layers::linear::LinearLayer;
use crate::layers::lstm_cell::LSTMCell;
use crate::models::sequence::SequenceModel;

/// Serializable version of Array2<f64> for persistence
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SerializableArray2 {
    data: Vec<f64>,
    shape: (usize, usize),
}

impl From<&Array2<f64>> for SerializableArray2 {
    fn from(array: &Array2<f64>) -> Self {
        Self {
            data: array.iter().cloned().collect(),
            shape: array.raw_dim().into_pattern(),
        }
    }
}

impl SerializableArray2 {
    pub fn into_array(self) -> Result<Array2<f64>, PersistenceError> {
        let shape = self.shape;
        Array2::from_shape_vec(shape, self.data).map_err(|err| {
            PersistenceError::InvalidModel(format!("array of shape {:?}: {}", shape, err))
        })
    }
}

/// Serializable LSTM cell parameters
#[derive(Serialize, Deserialize)]
pub struct SerializableLSTMCell {
    w_ih: SerializableArray2,
    w_hh: SerializableArray2,
    b_ih: SerializableArray2,
    b_hh: SerializableArray2,
    input_size: usize,
    hidden_size: usize,
}

impl From<&LSTMCell> for SerializableLSTMCell {
    fn from(cell: &LSTMCell) -> Self {
        Self {
            w_ih: (&cell.w_ih).into(),
            w_hh: (&cell.w_hh).into(),
            b_ih: (&cell.b_ih).into(),
            b_hh: (&cell.b_hh).into(),
            input_size: cell.input_size,
            hidden_size: cell.hidden_size,
        }
    }
}

impl TryFrom<SerializableLSTMCell> for LSTMCell {
    type Error = PersistenceError;

    fn try_from(cell: SerializableLSTMCell) -> Result<Self, Self::Error> {
        let (input_size, hidden_size) = (cell.input_size, cell.hidden_size);
        let restored = LSTMCell {
            w_ih: cell.w_ih.into_array()?,
            w_hh: cell.w_hh.into_array()?,
            b_ih: cell.b_ih.into_array()?,
            b_hh: cell.b_hh.into_array()?,
            input_size,
            hidden_size,
        };

        let gates = 4 * hidden_size;
        let shapes_ok = restored.w_ih.dim() == (gates, input_size)
            && restored.w_hh.dim() == (gates, hidden_size)
            && restored.b_ih.dim() == (gates, 1)
            && restored.b_hh.dim() == (gates, 1);
        if !shapes_ok {
            return Err(PersistenceError::InvalidModel(format!(
                "LSTM cell parameters do not match input_size={} hidden_size={}",
                input_size, hidden_size
            )));
        }

        Ok(restored)
    }
}

/// Serializable linear layer parameters
#[derive(Serialize, Deserialize)]
pub struct SerializableLinear {
    weight: SerializableArray2,
    bias: SerializableArray2,
}

impl From<&LinearLayer> for SerializableLinear {
    fn from(layer: &LinearLayer) -> Self {
        Self {
            weight: (&layer.weight).into(),
            bias: (&layer.bias).into(),
        }
    }
}

impl TryFrom<SerializableLinear> for LinearLayer {
    type Error = PersistenceError;

    fn try_from(layer: SerializableLinear) -> Result<Self, Self::Error> {
        let weight = layer.weight.into_array()?;
        let bias = layer.bias.into_array()?;
        if bias.dim() != (weight.nrows(), 1) {
            return Err(PersistenceError::InvalidModel(format!(
                "linear bias shape {:?} does not match weight shape {:?}",
                bias.dim(),
                weight.dim()
            )));
        }
        Ok(LinearLayer::from_weights(weight, bias))
    }
}

/// Serializable two-layer sequence model
#[derive(Serialize, Deserialize)]
pub struct SerializableSequenceModel {
    lstm1: SerializableLSTMCell,
    lstm2: SerializableLSTMCell,
    linear: SerializableLinear,
    hidden_size: usize,
}

impl From<&SequenceModel> for SerializableSequenceModel {
    fn from(model: &SequenceModel) -> Self {
        Self {
            lstm1: (&model.lstm1).into(),
            lstm2: (&model.lstm2).into(),
            linear: (&model.linear).into(),
            hidden_size: model.hidden_size,
        }
    }
}

impl TryFrom<SerializableSequenceModel> for SequenceModel {
    type Error = PersistenceError;

    fn try_from(model: SerializableSequenceModel) -> Result<Self, Self::Error> {
        let restored = SequenceModel::from_layers(
            model.lstm1.try_into()?,
            model.lstm2.try_into()?,
            model.linear.try_into()?,
        )
        .map_err(|err| PersistenceError::InvalidModel(err.to_string()))?;

        if restored.hidden_size != model.hidden_size {
            return Err(PersistenceError::InvalidModel(format!(
                "stored hidden_size {} does not match layers ({})",
                model.hidden_size, restored.hidden_size
            )));
        }
        Ok(restored)
    }
}

/// Model metadata for tracking training information
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ModelMetadata {
    pub model_name: String,
    pub version: String,
    pub created_at: String,
    pub hidden_size: usize,
    pub steps_trained: usize,
    pub final_train_loss: Option<f64>,
    pub final_test_loss: Option<f64>,
    pub description: Option<String>,
}

/// Complete saved model including network and metadata
#[derive(Serialize, Deserialize)]
pub struct SavedModel {
    pub model: SerializableSequenceModel,
    pub metadata: ModelMetadata,
}

/// Errors that can occur during model persistence operations
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid stored model: {0}")]
    InvalidModel(String),
}

impl From<serde_json::Error> for PersistenceError {
    fn from(error: serde_json::Error) -> Self {
        PersistenceError::SerializationError(error.to_string())
    }
}

impl From<bincode::Error> for PersistenceError {
    fn from(error: bincode::Error) -> Self {
        PersistenceError::SerializationError(error.to_string())
    }
}

/// On-disk encodings
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Json,
    Binary,
}

impl Format {
    /// `.json` selects JSON; `.bin`, `.model` and anything else select bincode
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|s| s.to_str()) {
            Some("json") => Format::Json,
            _ => Format::Binary,
        }
    }
}

/// Serializes `value` to `path` in the given format
pub fn write_as<T: Serialize, P: AsRef<Path>>(value: &T, path: P, format: Format) -> Result<(), PersistenceError> {
    let mut writer = BufWriter::new(File::create(path)?);
    match format {
        Format::Json => serde_json::to_writer_pretty(&mut writer, value)?,
        Format::Binary => bincode::serialize_into(&mut writer, value)?,
    }
    writer.flush()?;
    Ok(())
}

/// Deserializes a value written by `write_as` with the same format
pub fn read_as<T: DeserializeOwned, P: AsRef<Path>>(path: P, format: Format) -> Result<T, PersistenceError> {
    let reader = BufReader::new(File::open(path)?);
    let value = match format {
        Format::Json => serde_json::from_reader(reader)?,
        Format::Binary => bincode::deserialize_from(reader)?,
    };
    Ok(value)
}

/// Serializes `value` to `path` in the format chosen by its extension
pub fn write_by_extension<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<(), PersistenceError> {
    let format = Format::from_path(path.as_ref());
    write_as(value, path, format)
}

/// Deserializes a value written by `write_by_extension`
pub fn read_by_extension<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, PersistenceError> {
    let format = Format::from_path(path.as_ref());
    read_as(path, format)
}

/// Model persistence operations
pub struct ModelPersistence;

impl ModelPersistence {
    /// Save model to JSON format (human-readable)
    pub fn save_to_json<P: AsRef<Path>>(model: &SavedModel, path: P) -> Result<(), PersistenceError> {
        write_as(model, path, Format::Json)
    }

    /// Load model from JSON format
    pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<SavedModel, PersistenceError> {
        read_as(path, Format::Json)
    }

    /// Save model to binary format (compact and fast)
    pub fn save_to_binary<P: AsRef<Path>>(model: &SavedModel, path: P) -> Result<(), PersistenceError> {
        write_as(model, path, Format::Binary)
    }

    /// Load model from binary format
    pub fn load_from_binary<P: AsRef<Path>>(path: P) -> Result<SavedModel, PersistenceError> {
        read_as(path, Format::Binary)
    }

    /// Create a model with metadata stamped with the crate version and current time
    pub fn create_saved_model(
        model: &SequenceModel,
        model_name: String,
        steps_trained: usize,
        final_train_loss: Option<f64>,
        final_test_loss: Option<f64>,
        description: Option<String>,
    ) -> SavedModel {
        let metadata = ModelMetadata {
            model_name,
            version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            hidden_size: model.hidden_size,
            steps_trained,
            final_train_loss,
            final_test_loss,
            description,
        };

        SavedModel {
            model: model.into(),
            metadata,
        }
    }
}

/// Convenience trait for easy model saving/loading
pub trait PersistentModel {
    /// Save model to file (format determined by file extension)
    fn save<P: AsRef<Path>>(&self, path: P, metadata: ModelMetadata) -> Result<(), PersistenceError>;

    /// Load model from file (format determined by file extension)
    fn load<P: AsRef<Path>>(path: P) -> Result<(Self, ModelMetadata), PersistenceError>
    where
        Self: Sized;
}

impl PersistentModel for SequenceModel {
    fn save<P: AsRef<Path>>(&self, path: P, metadata: ModelMetadata) -> Result<(), PersistenceError> {
        let saved_model = SavedModel {
            model: self.into(),
            metadata,
        };
        write_by_extension(&saved_model, path)
    }

    fn load<P: AsRef<Path>>(path: P) -> Result<(Self, ModelMetadata), PersistenceError> {
        let saved_model: SavedModel = read_by_extension(path)?;
        Ok((saved_model.model.try_into()?, saved_model.metadata))
    }
}
