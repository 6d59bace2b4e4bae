use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{Result, ZooErr, arch::ArchKind};

/// Label table of the dataset the reference setup trains on.
pub const CIFAR_10_CLASS_NAMES: [&str; 10] = [
    "airplane",
    "automobile",
    "bird",
    "cat",
    "deer",
    "dog",
    "frog",
    "horse",
    "ship",
    "truck",
];

/// Per-model configuration: the input resolution the assembler builds for
/// and the label table used to decode predictions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEntry {
    pub input_shape: (usize, usize),
    pub class_names: Vec<String>,
}

/// Mapping from model name to its hyperparameters. Passed explicitly into
/// every factory and loader call; nothing reads it through a global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZooConfig {
    pub models: BTreeMap<String, ModelEntry>,
}

impl Default for ZooConfig {
    /// Registers every known architecture at 224x224 over CIFAR-10 labels.
    fn default() -> Self {
        let class_names: Vec<String> = CIFAR_10_CLASS_NAMES
            .iter()
            .map(|s| s.to_string())
            .collect();
        let models = ArchKind::ALL
            .iter()
            .map(|arch| {
                (
                    arch.name().to_string(),
                    ModelEntry {
                        input_shape: (224, 224),
                        class_names: class_names.clone(),
                    },
                )
            })
            .collect();
        Self { models }
    }
}

impl ZooConfig {
    /// Loads a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ZooErr::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| ZooErr::Config {
            path: path.to_path_buf(),
            msg: e.to_string(),
        })
    }

    /// Looks up a model entry, failing with the offending name.
    pub fn entry(&self, model_name: &str) -> Result<&ModelEntry> {
        self.models
            .get(model_name)
            .ok_or_else(|| ZooErr::UnknownModel(model_name.to_string()))
    }
}
