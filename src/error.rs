use std::io;

use thiserror::Error;

/// Errors raised by the training pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// The subsampling reader was used before its frequency pass.
    #[error("reader is not fitted, call count_words before read")]
    NotFitted,

    /// A hyperparameter is outside its valid range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A training example refers to an index outside the vocabulary.
    #[error("index {index} out of range for vocabulary of size {vocab_size}")]
    OutOfRange { index: usize, vocab_size: usize },

    /// The parallel input/label arrays of a batch have different lengths.
    #[error("batch arrays have mismatched lengths: {inputs} inputs, {labels} labels")]
    ShapeMismatch { inputs: usize, labels: usize },

    /// The corpus could not be read.
    #[error("cannot read corpus")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
