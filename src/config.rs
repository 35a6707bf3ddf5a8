//! Run configuration for the training binary (feature: `serde`).
//!
//! Every field is optional in the JSON file; missing fields take the values
//! from [`RunConfig::default`], which reproduce the classic MNIST setup
//! (784 → 300 → 10, uniform ±0.01 init, lr 0.0005, 10 epochs).
//!
//! ```json
//! {
//!   "data_dir": "data/mnist",
//!   "hidden_dims": [128],
//!   "train": { "epochs": 3, "lr_schedule": { "kind": "step", "step_size": 1, "gamma": 0.5 } }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Init, Loss, NetworkBuilder, Result, TrainConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory holding the four MNIST IDX files.
    pub data_dir: PathBuf,
    pub hidden_dims: Vec<usize>,
    pub init: Init,
    /// Seed for weight initialization.
    pub seed: u64,
    pub loss: Loss,
    pub train: TrainConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("../data/mnist/"),
            hidden_dims: vec![300],
            init: Init::Uniform {
                low: -0.01,
                high: 0.01,
            },
            seed: 0,
            loss: Loss::CrossEntropy,
            train: TrainConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: RunConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json_str(&s)
    }

    pub fn to_json_string_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.hidden_dims.contains(&0) {
            return Err(Error::InvalidConfig(
                "hidden_dims must all be > 0".to_owned(),
            ));
        }
        self.train.validate()
    }

    /// Classifier for `input_dim` features and `classes` outputs.
    pub fn network_builder(&self, input_dim: usize, classes: usize) -> Result<NetworkBuilder> {
        let mut sizes = Vec::with_capacity(self.hidden_dims.len() + 2);
        sizes.push(input_dim);
        sizes.extend_from_slice(&self.hidden_dims);
        sizes.push(classes);
        NetworkBuilder::classifier(&sizes, self.init)
    }
}
