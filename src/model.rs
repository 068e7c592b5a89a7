use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayViewMut1};
use ndarray_rand::RandomExt;
use rand::distributions::Uniform;

use crate::batch::Batch;
use crate::config::Config;
use crate::loss::{log_logistic_loss, log_sum_exp};
use crate::vocab::Vocabulary;
use crate::{Error, Result};

/// Numeric model collaborator.
///
/// The training core treats the numeric model as an opaque
/// collaborator: it looks up embeddings to form logits and hands whole
/// batches to a loss-minimization step, which applies the parameter
/// update and returns the realized loss. A model maintains two
/// distinct embedding tables, one for observed (input) words and one
/// for predicted (output) words, plus a per-word output bias.
pub trait Model {
    /// Get the number of words in the model's vocabulary.
    fn vocab_size(&self) -> usize;

    /// Get the embedding dimensionality.
    fn dims(&self) -> usize;

    /// Get the input embedding with the given index.
    fn input_embedding(&self, idx: usize) -> Result<ArrayView1<f32>>;

    /// Get the output embedding with the given index.
    fn output_embedding(&self, idx: usize) -> Result<ArrayView1<f32>>;

    /// Get the output bias with the given index.
    fn output_bias(&self, idx: usize) -> Result<f32>;

    /// Apply a negative-sampling update for one batch.
    ///
    /// `negatives` is the set of negative output indices shared by all
    /// examples in the batch. Returns the realized loss, normalized by
    /// the batch size.
    fn negative_sampling_step(
        &mut self,
        batch: &Batch,
        negatives: &[usize],
        lr: f32,
    ) -> Result<f32>;

    /// Apply a full-softmax update for one batch.
    ///
    /// Computes logits against the entire output table. Far more
    /// expensive than negative sampling; returns the realized loss,
    /// normalized by the batch size.
    fn softmax_step(&mut self, batch: &Batch, lr: f32) -> Result<f32>;
}

/// Default embedding model.
///
/// Stores the input matrix, output matrix and output bias vector as
/// dense `ndarray` arrays and applies plain stochastic gradient
/// descent updates.
pub struct EmbeddingModel {
    input: Array2<f32>,
    output: Array2<f32>,
    bias: Array1<f32>,
}

impl EmbeddingModel {
    /// Construct a model for a vocabulary.
    ///
    /// This randomly initializes the input and output matrices using a
    /// uniform distribution in the range [-1/dims, 1/dims]; biases
    /// start at zero.
    pub fn from_vocab(vocab: &Vocabulary, config: &Config) -> Self {
        let init_bound = 1.0 / config.dims as f32;
        let distribution = Uniform::new_inclusive(-init_bound, init_bound);

        let input = Array2::random((vocab.len(), config.dims as usize), distribution);
        let output = Array2::random((vocab.len(), config.dims as usize), distribution);
        let bias = Array1::zeros(vocab.len());

        EmbeddingModel {
            input,
            output,
            bias,
        }
    }

    /// Construct a model from existing parameters.
    pub fn from_parts(
        input: Array2<f32>,
        output: Array2<f32>,
        bias: Array1<f32>,
    ) -> Result<Self> {
        if input.dim() != output.dim() || input.nrows() != bias.len() {
            return Err(Error::Config(format!(
                "mismatched parameter shapes: input {:?}, output {:?}, bias {}",
                input.dim(),
                output.dim(),
                bias.len()
            )));
        }

        Ok(EmbeddingModel {
            input,
            output,
            bias,
        })
    }

    /// Get the input embedding matrix.
    pub fn input(&self) -> ArrayView2<f32> {
        self.input.view()
    }

    /// Get the output embedding matrix.
    pub fn output(&self) -> ArrayView2<f32> {
        self.output.view()
    }

    /// Get the output bias vector.
    pub fn bias(&self) -> ArrayView1<f32> {
        self.bias.view()
    }

    fn check_idx(&self, idx: usize) -> Result<usize> {
        if idx < self.vocab_size() {
            Ok(idx)
        } else {
            Err(Error::OutOfRange {
                index: idx,
                vocab_size: self.vocab_size(),
            })
        }
    }

    /// Update one output word and accumulate the input-side gradient.
    ///
    /// Returns the loss for predicting `output` with the given label.
    fn update_output(
        &mut self,
        embed: ArrayView1<f32>,
        mut input_delta: ArrayViewMut1<f32>,
        output: usize,
        label: bool,
        lr: f32,
    ) -> f32 {
        let (loss, grad) =
            log_logistic_loss(embed, self.output.row(output), self.bias[output], label);

        // Accumulate the input update; it is applied once per example.
        input_delta.scaled_add(lr * grad, &self.output.row(output));

        self.output.row_mut(output).scaled_add(lr * grad, &embed);
        self.bias[output] += lr * grad;

        loss
    }
}

impl Model for EmbeddingModel {
    fn vocab_size(&self) -> usize {
        self.input.nrows()
    }

    fn dims(&self) -> usize {
        self.input.ncols()
    }

    fn input_embedding(&self, idx: usize) -> Result<ArrayView1<f32>> {
        Ok(self.input.row(self.check_idx(idx)?))
    }

    fn output_embedding(&self, idx: usize) -> Result<ArrayView1<f32>> {
        Ok(self.output.row(self.check_idx(idx)?))
    }

    fn output_bias(&self, idx: usize) -> Result<f32> {
        Ok(self.bias[self.check_idx(idx)?])
    }

    fn negative_sampling_step(
        &mut self,
        batch: &Batch,
        negatives: &[usize],
        lr: f32,
    ) -> Result<f32> {
        if batch.is_empty() {
            return Ok(0.0);
        }

        for &negative in negatives {
            self.check_idx(negative)?;
        }

        let mut loss_sum = 0f32;
        for (input, label) in batch.examples() {
            self.check_idx(input)?;
            self.check_idx(label)?;

            let embed = self.input.row(input).to_owned();
            let mut input_delta = Array1::zeros(self.dims());

            // Update the output embedding of the positive instance.
            loss_sum += self.update_output(embed.view(), input_delta.view_mut(), label, true, lr);

            // Update the output embeddings of the shared negatives.
            for &negative in negatives {
                loss_sum +=
                    self.update_output(embed.view(), input_delta.view_mut(), negative, false, lr);
            }

            // Update the input embedding with the accumulated gradient.
            self.input.row_mut(input).scaled_add(1.0, &input_delta);
        }

        Ok(loss_sum / batch.len() as f32)
    }

    fn softmax_step(&mut self, batch: &Batch, lr: f32) -> Result<f32> {
        if batch.is_empty() {
            return Ok(0.0);
        }

        let mut loss_sum = 0f32;
        for (input, label) in batch.examples() {
            self.check_idx(input)?;
            self.check_idx(label)?;

            let embed = self.input.row(input).to_owned();
            let logits = self.output.dot(&embed) + &self.bias;
            let lse = log_sum_exp(logits.view());
            loss_sum += lse - logits[label];

            let mut input_delta = Array1::zeros(self.dims());
            for j in 0..self.vocab_size() {
                let p = (logits[j] - lse).exp();
                let grad = (j == label) as usize as f32 - p;

                input_delta.scaled_add(lr * grad, &self.output.row(j));
                self.output.row_mut(j).scaled_add(lr * grad, &embed);
                self.bias[j] += lr * grad;
            }

            self.input.row_mut(input).scaled_add(1.0, &input_delta);
        }

        Ok(loss_sum / batch.len() as f32)
    }
}
