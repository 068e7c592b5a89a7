use chrono::{DateTime, Local};
use rand::Rng;

use crate::batch::Batches;
use crate::config::{Config, LossType};
use crate::io::Corpus;
use crate::model::Model;
use crate::objective::NegativeSamplingObjective;
use crate::sampling::UnigramRangeGenerator;
use crate::subsample::SubsampledReader;
use crate::window::WindowPairs;
use crate::{Error, Result};

/// A progress report emitted during training.
#[derive(Clone, Copy, Debug)]
pub struct TrainProgress {
    /// The current epoch, starting at 1.
    pub epoch: u32,

    /// Batches processed so far, across epochs.
    pub batch: usize,

    /// Running mean loss over all processed batches.
    pub loss: f32,
}

/// Summary of a finished training run.
#[derive(Clone, Debug)]
pub struct TrainSummary {
    pub epochs: u32,
    pub n_batches: usize,
    pub n_examples: usize,
    pub train_loss: f32,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

/// Epoch-driving training loop.
///
/// Pulls batches from the subsampled pair pipeline and feeds them to
/// the model collaborator, one batch at a time; a batch's update
/// completes before the next batch is requested. A failing model
/// update aborts the current epoch and is surfaced to the caller; it
/// is not retried.
pub struct TrainingLoop<M, R> {
    config: Config,
    reader: SubsampledReader<R>,
    objective: Option<NegativeSamplingObjective<UnigramRangeGenerator<R>>>,
    model: M,
    loss_sum: f32,
    n_batches: usize,
    n_examples: usize,
}

impl<M, R> TrainingLoop<M, R>
where
    M: Model,
    R: Rng + Clone,
{
    /// Construct a training loop from a fitted reader and a model.
    pub fn new(config: Config, reader: SubsampledReader<R>, model: M, rng: R) -> Result<Self> {
        config.validate()?;

        let vocab = reader.vocab()?.clone();
        if model.vocab_size() != vocab.len() {
            return Err(Error::Config(format!(
                "model has {} rows for a vocabulary of {} words",
                model.vocab_size(),
                vocab.len()
            )));
        }

        // The softmax fallback contrasts against the whole vocabulary
        // and draws no negative samples.
        let objective = match config.loss {
            LossType::NegativeSampling => {
                Some(NegativeSamplingObjective::from_vocab(&vocab, &config, rng)?)
            }
            LossType::Softmax => None,
        };

        Ok(TrainingLoop {
            config,
            reader,
            objective,
            model,
            loss_sum: 0.0,
            n_batches: 0,
            n_examples: 0,
        })
    }

    /// Get the model associated with this loop.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Consume the loop, returning the trained model.
    pub fn into_model(self) -> M {
        self.model
    }

    /// Get the mean training loss over all batches seen so far.
    pub fn train_loss(&self) -> f32 {
        if self.n_batches == 0 {
            0.0
        } else {
            self.loss_sum / self.n_batches as f32
        }
    }

    /// Run `epochs` full passes over the corpus.
    ///
    /// `report` is invoked every `report_interval` batches. With zero
    /// configured epochs no model update is performed.
    pub fn run<C, F>(&mut self, corpus: &C, mut report: F) -> Result<TrainSummary>
    where
        C: Corpus,
        F: FnMut(&TrainProgress),
    {
        let started_at = Local::now();
        let span = self.config.context_size as usize;
        let vocab = self.reader.vocab()?.clone();

        for epoch in 1..=self.config.epochs {
            let vocab = vocab.clone();
            let docs = self.reader.read(corpus)?;
            let indexed = docs.map(move |doc| doc.map(|words| vocab.index_document(&words)));
            let pairs = WindowPairs::new(indexed, span);
            let batches = Batches::new(pairs, self.config.batch_size);

            for batch in batches {
                let batch = batch?;
                let lr = self.config.lr;

                let loss = match self.objective.as_mut() {
                    Some(objective) => {
                        let negatives = objective.draw_negatives();
                        self.model
                            .negative_sampling_step(&batch, &negatives, lr)?
                    }
                    None => self.model.softmax_step(&batch, lr)?,
                };

                self.loss_sum += loss;
                self.n_batches += 1;
                self.n_examples += batch.len();

                if self.config.report_interval != 0
                    && self.n_batches % self.config.report_interval == 0
                {
                    report(&TrainProgress {
                        epoch,
                        batch: self.n_batches,
                        loss: self.train_loss(),
                    });
                }
            }
        }

        Ok(TrainSummary {
            epochs: self.config.epochs,
            n_batches: self.n_batches,
            n_examples: self.n_examples,
            train_loss: self.train_loss(),
            started_at,
            finished_at: Local::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lazy_static::lazy_static;
    use ndarray::ArrayView1;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    use super::TrainingLoop;
    use crate::batch::Batch;
    use crate::config::{Config, LossType};
    use crate::model::{EmbeddingModel, Model};
    use crate::subsample::SubsampledReader;
    use crate::{Error, Result};

    const SEED: [u8; 16] = [
        0xe9, 0xfe, 0xf0, 0xfb, 0x6a, 0x23, 0x2a, 0xb3, 0x7c, 0xce, 0x27, 0x9b, 0x56, 0xac, 0xdb,
        0xf8,
    ];

    lazy_static! {
        static ref CORPUS: Vec<Vec<String>> = vec![
            "a b c d e f".split(' ').map(str::to_string).collect(),
            "a b c a b c".split(' ').map(str::to_string).collect(),
        ];
    }

    // A threshold large enough that no word of the test corpus is ever
    // dropped, making the pipeline deterministic.
    fn test_config() -> Config {
        Config {
            context_size: 2,
            subsample: 0.5,
            dims: 4,
            epochs: 2,
            negative_samples: 2,
            batch_size: 4,
            lr: 0.05,
            report_interval: 1,
            ..Config::default()
        }
    }

    fn fitted_reader(config: &Config) -> SubsampledReader<XorShiftRng> {
        let mut reader = SubsampledReader::new(config.subsample, XorShiftRng::from_seed(SEED));
        reader.count_words(&*CORPUS).unwrap();
        reader
    }

    #[test]
    fn trains_over_the_full_pipeline() {
        let config = test_config();
        let reader = fitted_reader(&config);
        let vocab = reader.vocab().unwrap().clone();
        let model = EmbeddingModel::from_vocab(&vocab, &config);

        let mut reports = 0;
        let mut training =
            TrainingLoop::new(config, reader, model, XorShiftRng::from_seed(SEED)).unwrap();
        let summary = training.run(&*CORPUS, |_| reports += 1).unwrap();

        // Both documents have 6 words; with span 2 each yields 18
        // pairs, so an epoch is 36 pairs in 9 batches of 4.
        assert_eq!(summary.n_batches, 18);
        assert_eq!(summary.n_examples, 72);
        assert_eq!(reports, 18);
        assert!(summary.train_loss.is_finite());
        assert!(summary.finished_at >= summary.started_at);
    }

    #[test]
    fn zero_epochs_performs_no_updates() {
        let mut config = test_config();
        config.epochs = 0;

        let reader = fitted_reader(&config);
        let vocab = reader.vocab().unwrap().clone();
        let model = EmbeddingModel::from_vocab(&vocab, &config);
        let before = model.input().to_owned();

        let mut reports = 0;
        let mut training =
            TrainingLoop::new(config, reader, model, XorShiftRng::from_seed(SEED)).unwrap();
        let summary = training.run(&*CORPUS, |_| reports += 1).unwrap();

        assert_eq!(summary.n_batches, 0);
        assert_eq!(summary.n_examples, 0);
        assert_eq!(summary.train_loss, 0.0);
        assert_eq!(reports, 0);
        assert_eq!(training.model().input(), before);
    }

    #[test]
    fn softmax_loss_type_trains_without_sampling() {
        let mut config = test_config();
        config.loss = LossType::Softmax;

        let reader = fitted_reader(&config);
        let vocab = reader.vocab().unwrap().clone();
        let model = EmbeddingModel::from_vocab(&vocab, &config);

        let mut training =
            TrainingLoop::new(config, reader, model, XorShiftRng::from_seed(SEED)).unwrap();
        let summary = training.run(&*CORPUS, |_| ()).unwrap();

        assert_eq!(summary.n_batches, 18);
        assert!(summary.train_loss.is_finite());
    }

    #[test]
    fn mismatched_model_is_rejected() {
        let config = test_config();
        let reader = fitted_reader(&config);

        // One row too few.
        let words = reader.vocab().unwrap().len() - 1;
        let model = EmbeddingModel::from_parts(
            ndarray::Array2::zeros((words, 4)),
            ndarray::Array2::zeros((words, 4)),
            ndarray::Array1::zeros(words),
        )
        .unwrap();

        match TrainingLoop::new(config, reader, model, XorShiftRng::from_seed(SEED)) {
            Err(Error::Config(_)) => (),
            other => panic!("Expected Config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn unfitted_reader_is_rejected() {
        let config = test_config();
        let reader = SubsampledReader::new(config.subsample, XorShiftRng::from_seed(SEED));
        let model = EmbeddingModel::from_parts(
            ndarray::Array2::zeros((6, 4)),
            ndarray::Array2::zeros((6, 4)),
            ndarray::Array1::zeros(6),
        )
        .unwrap();

        match TrainingLoop::new(config, reader, model, XorShiftRng::from_seed(SEED)) {
            Err(Error::NotFitted) => (),
            other => panic!("Expected NotFitted, got {:?}", other.map(|_| ())),
        }
    }

    /// A collaborator whose update step always fails.
    struct FailingModel {
        vocab_size: usize,
    }

    impl Model for FailingModel {
        fn vocab_size(&self) -> usize {
            self.vocab_size
        }

        fn dims(&self) -> usize {
            1
        }

        fn input_embedding(&self, _idx: usize) -> Result<ArrayView1<f32>> {
            Err(Error::Config("failing model".into()))
        }

        fn output_embedding(&self, _idx: usize) -> Result<ArrayView1<f32>> {
            Err(Error::Config("failing model".into()))
        }

        fn output_bias(&self, _idx: usize) -> Result<f32> {
            Err(Error::Config("failing model".into()))
        }

        fn negative_sampling_step(
            &mut self,
            _batch: &Batch,
            _negatives: &[usize],
            _lr: f32,
        ) -> Result<f32> {
            Err(Error::Config("failing model".into()))
        }

        fn softmax_step(&mut self, _batch: &Batch, _lr: f32) -> Result<f32> {
            Err(Error::Config("failing model".into()))
        }
    }

    #[test]
    fn model_failure_aborts_training() {
        let config = test_config();
        let reader = fitted_reader(&config);
        let vocab_size = reader.vocab().unwrap().len();

        let mut training = TrainingLoop::new(
            config,
            reader,
            FailingModel { vocab_size },
            XorShiftRng::from_seed(SEED),
        )
        .unwrap();

        let mut reports = 0;
        assert!(training.run(&*CORPUS, |_| reports += 1).is_err());
        assert_eq!(reports, 0);
    }

    #[test]
    fn vocabulary_is_shared_not_rebuilt() {
        let config = test_config();
        let reader = fitted_reader(&config);
        let vocab = reader.vocab().unwrap().clone();
        assert_eq!(Arc::strong_count(&vocab), 2);
    }
}
