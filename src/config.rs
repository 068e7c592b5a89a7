use serde::Serialize;

use crate::{Error, Result};

/// Losses.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum LossType {
    /// Logistic regression with negative sampling.
    NegativeSampling,

    /// Categorical cross-entropy over the full output vocabulary.
    ///
    /// Far more expensive than negative sampling; mostly useful as a
    /// correctness reference on small vocabularies.
    Softmax,
}

impl LossType {
    pub fn try_from_str(loss: &str) -> Result<LossType> {
        match loss {
            "ns" => Ok(LossType::NegativeSampling),
            "softmax" => Ok(LossType::Softmax),
            _ => Err(Error::Config(format!("unknown loss type: {}", loss))),
        }
    }
}

/// Embedding model hyperparameters.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Config {
    /// The loss function used for the model.
    pub loss: LossType,

    /// The number of preceding and succeeding tokens that will be
    /// considered as context during training.
    ///
    /// For example, a context size of 5 will consider the 5 tokens preceding
    /// and the 5 tokens succeeding the focus token.
    pub context_size: u32,

    /// Subsample threshold.
    ///
    /// The threshold is used to compute the keep probability of a token
    /// from its corpus frequency. Tokens with approximately this frequency
    /// or less will never be dropped.
    pub subsample: f32,

    /// Word embedding dimensionality.
    pub dims: u32,

    /// The number of training epochs.
    pub epochs: u32,

    /// Number of negative samples drawn per batch.
    ///
    /// A count of zero degenerates to the positive logistic term only.
    pub negative_samples: u32,

    /// Number of (center, context) pairs per training batch.
    pub batch_size: usize,

    /// The learning rate.
    pub lr: f32,

    /// Exponent applied to unigram frequencies for negative sampling.
    ///
    /// Raising frequencies to a power below 1 flattens the frequency skew,
    /// favoring moderate-frequency words.
    pub distortion: f32,

    /// Report training progress every this many batches. Zero disables
    /// reporting.
    pub report_interval: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            loss: LossType::NegativeSampling,
            context_size: 5,
            subsample: 1e-3,
            dims: 300,
            epochs: 5,
            negative_samples: 5,
            batch_size: 1000,
            lr: 0.001,
            distortion: 0.75,
            report_interval: 500,
        }
    }
}

impl Config {
    /// Check that all hyperparameters are within their valid ranges.
    pub fn validate(&self) -> Result<()> {
        if self.context_size < 1 {
            return Err(Error::Config(format!(
                "context size must be at least 1, got {}",
                self.context_size
            )));
        }

        if self.batch_size < 1 {
            return Err(Error::Config("batch size must be at least 1".into()));
        }

        if self.dims < 1 {
            return Err(Error::Config("dimensionality must be at least 1".into()));
        }

        if !(self.subsample > 0.0 && self.subsample < 1.0) {
            return Err(Error::Config(format!(
                "subsample threshold must lie in (0, 1), got {}",
                self.subsample
            )));
        }

        if !(self.distortion > 0.0 && self.distortion <= 1.0) {
            return Err(Error::Config(format!(
                "distortion exponent must lie in (0, 1], got {}",
                self.distortion
            )));
        }

        if !(self.lr > 0.0) {
            return Err(Error::Config(format!(
                "learning rate must be positive, got {}",
                self.lr
            )));
        }

        Ok(())
    }
}
