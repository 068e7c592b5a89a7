use rand::Rng;

use crate::batch::Batch;
use crate::config::Config;
use crate::loss::{log_sum_exp, sigmoid_cross_entropy};
use crate::model::Model;
use crate::sampling::{RangeGenerator, UnigramRangeGenerator};
use crate::vocab::Vocabulary;
use crate::{Error, Result};

/// Number of entries in the distorted-unigram sampling table.
const UNIGRAM_TABLE_SIZE: usize = 1 << 20;

/// Noise-contrastive training objective.
///
/// Contrasts each (input, label) pair of a batch against `k` negative
/// labels drawn from the unigram distribution raised to the distortion
/// power. One negative sample set is drawn per batch and shared by all
/// of its examples; this trades some statistical independence for
/// speed.
pub struct NegativeSamplingObjective<G> {
    negative_samples: usize,
    range_gen: G,
}

impl<R> NegativeSamplingObjective<UnigramRangeGenerator<R>>
where
    R: Rng,
{
    /// Construct an objective sampling from a vocabulary's distorted
    /// unigram distribution.
    pub fn from_vocab(vocab: &Vocabulary, config: &Config, rng: R) -> Result<Self> {
        if vocab.is_empty() {
            return Err(Error::Config(
                "cannot train on an empty vocabulary".into(),
            ));
        }

        Self::new(
            config.negative_samples as usize,
            UnigramRangeGenerator::new(rng, vocab, config.distortion, UNIGRAM_TABLE_SIZE),
        )
    }
}

impl<G> NegativeSamplingObjective<G>
where
    G: RangeGenerator,
{
    /// Construct an objective over a negative-sample generator.
    ///
    /// The generator's range must be larger than the negative sample
    /// count; sampling without replacement could not terminate
    /// otherwise.
    pub fn new(negative_samples: usize, range_gen: G) -> Result<Self> {
        if negative_samples >= range_gen.upper_bound() {
            return Err(Error::Config(format!(
                "{} negative samples requires a vocabulary larger than {}",
                negative_samples,
                range_gen.upper_bound()
            )));
        }

        Ok(NegativeSamplingObjective {
            negative_samples,
            range_gen,
        })
    }

    pub fn negative_samples(&self) -> usize {
        self.negative_samples
    }

    /// Draw the shared negative sample set for one batch.
    ///
    /// The returned indices are distinct among themselves; they may
    /// coincide with a label in the batch.
    pub fn draw_negatives(&mut self) -> Vec<usize> {
        let mut negatives = Vec::with_capacity(self.negative_samples);

        while negatives.len() < self.negative_samples {
            // Cannot panic, the generator is endless.
            let negative = self.range_gen.next().unwrap();
            if !negatives.contains(&negative) {
                negatives.push(negative);
            }
        }

        negatives
    }

    /// Compute the forward loss of a batch against a model.
    ///
    /// Per example: binary cross-entropy of the true logit against
    /// target 1, plus the cross-entropies of the shared negative logits
    /// against target 0, averaged over the batch.
    pub fn batch_loss<M>(&self, model: &M, batch: &Batch, negatives: &[usize]) -> Result<f32>
    where
        M: Model,
    {
        if batch.is_empty() {
            return Ok(0.0);
        }

        let mut loss_sum = 0f32;
        for (input, label) in batch.examples() {
            let embed = model.input_embedding(input)?;

            let true_logit = embed.dot(&model.output_embedding(label)?) + model.output_bias(label)?;
            loss_sum += sigmoid_cross_entropy(true_logit, true);

            for &negative in negatives {
                let neg_logit =
                    embed.dot(&model.output_embedding(negative)?) + model.output_bias(negative)?;
                loss_sum += sigmoid_cross_entropy(neg_logit, false);
            }
        }

        Ok(loss_sum / batch.len() as f32)
    }
}

/// Compute the full-softmax loss of a batch against a model.
///
/// Logits are formed against the entire output table and scored with
/// categorical cross-entropy against the true label. This is the
/// non-sampling fallback; it is far more expensive than negative
/// sampling and mostly serves as a correctness reference.
pub fn softmax_batch_loss<M>(model: &M, batch: &Batch) -> Result<f32>
where
    M: Model,
{
    if batch.is_empty() {
        return Ok(0.0);
    }

    let mut loss_sum = 0f32;
    for (input, label) in batch.examples() {
        let embed = model.input_embedding(input)?;

        // Bounds-check the label before it indexes into the logits.
        model.output_bias(label)?;

        let mut logits = Vec::with_capacity(model.vocab_size());
        for j in 0..model.vocab_size() {
            logits.push(embed.dot(&model.output_embedding(j)?) + model.output_bias(j)?);
        }

        let logits = ndarray::Array1::from(logits);
        loss_sum += log_sum_exp(logits.view()) - logits[label];
    }

    Ok(loss_sum / batch.len() as f32)
}

#[cfg(test)]
mod tests {
    use ndarray::{arr1, arr2};
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    use super::{softmax_batch_loss, NegativeSamplingObjective};
    use crate::batch::Batch;
    use crate::config::Config;
    use crate::loss::{logistic_function, sigmoid_cross_entropy};
    use crate::model::{EmbeddingModel, Model};
    use crate::sampling::UnigramRangeGenerator;
    use crate::util::close;
    use crate::vocab::{Vocabulary, Word};
    use crate::Error;

    const SEED: [u8; 16] = [
        0xc8, 0xae, 0xa3, 0x99, 0x28, 0x5a, 0xbb, 0x27, 0x90, 0xe9, 0x61, 0x60, 0xe5, 0xca, 0xfe,
        0x22,
    ];

    fn test_vocab() -> Vocabulary {
        let words = vec![
            Word::new("a".to_string(), 16),
            Word::new("b".to_string(), 8),
            Word::new("c".to_string(), 4),
            Word::new("d".to_string(), 2),
        ];
        Vocabulary::new(1e-3, words, 30)
    }

    fn test_model() -> EmbeddingModel {
        let input = arr2(&[
            [0.5f32, -0.25],
            [-0.5, 0.25],
            [0.25, 0.5],
            [0.0, -0.25],
        ]);
        let output = arr2(&[
            [0.25f32, 0.5],
            [-0.25, 0.25],
            [0.5, -0.5],
            [0.0, 0.25],
        ]);
        let bias = arr1(&[0.1f32, -0.1, 0.0, 0.05]);

        EmbeddingModel::from_parts(input, output, bias).unwrap()
    }

    fn objective(
        negative_samples: u32,
    ) -> NegativeSamplingObjective<UnigramRangeGenerator<XorShiftRng>> {
        let config = Config {
            negative_samples,
            ..Config::default()
        };
        NegativeSamplingObjective::from_vocab(&test_vocab(), &config, XorShiftRng::from_seed(SEED))
            .unwrap()
    }

    #[test]
    fn too_many_negative_samples_is_a_config_error() {
        let config = Config {
            negative_samples: 4,
            ..Config::default()
        };
        match NegativeSamplingObjective::from_vocab(
            &test_vocab(),
            &config,
            XorShiftRng::from_seed(SEED),
        ) {
            Err(Error::Config(_)) => (),
            other => panic!("Expected Config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn empty_vocabulary_is_a_config_error() {
        let vocab = Vocabulary::new(1e-3, Vec::new(), 0);
        let config = Config::default();
        assert!(NegativeSamplingObjective::from_vocab(
            &vocab,
            &config,
            XorShiftRng::from_seed(SEED)
        )
        .is_err());
    }

    #[test]
    fn negatives_are_distinct_and_shared_per_draw() {
        let mut objective = objective(3);

        for _ in 0..50 {
            let negatives = objective.draw_negatives();
            assert_eq!(negatives.len(), 3);

            let mut deduped = negatives.clone();
            deduped.sort_unstable();
            deduped.dedup();
            assert_eq!(deduped.len(), 3, "negatives are not distinct");
            assert!(negatives.iter().all(|&n| n < 4));
        }
    }

    #[test]
    fn batch_loss_is_finite_and_non_negative() {
        let mut objective = objective(2);
        let model = test_model();
        let batch = Batch::new(vec![0, 1, 2, 3], vec![1, 2, 3, 0]).unwrap();

        for _ in 0..20 {
            let negatives = objective.draw_negatives();
            let loss = objective.batch_loss(&model, &batch, &negatives).unwrap();
            assert!(loss.is_finite());
            assert!(loss >= 0.0);
        }
    }

    #[test]
    fn zero_negatives_degenerates_to_the_positive_term() {
        let objective = objective(0);
        let model = test_model();
        let batch = Batch::new(vec![0, 1, 2], vec![1, 2, 0]).unwrap();

        let loss = objective.batch_loss(&model, &batch, &[]).unwrap();

        let mut expected = 0f32;
        for (input, label) in batch.examples() {
            let logit = model
                .input_embedding(input)
                .unwrap()
                .dot(&model.output_embedding(label).unwrap())
                + model.output_bias(label).unwrap();
            expected += -(logistic_function(logit) + 1e-5).ln();
        }
        expected /= batch.len() as f32;

        assert!(close(loss, expected, 1e-6));
    }

    #[test]
    fn out_of_range_indices_are_rejected() {
        let objective = objective(1);
        let model = test_model();

        let batch = Batch::new(vec![0], vec![11]).unwrap();
        match objective.batch_loss(&model, &batch, &[1]) {
            Err(Error::OutOfRange { index: 11, .. }) => (),
            other => panic!("Expected OutOfRange, got {:?}", other),
        }

        let batch = Batch::new(vec![0], vec![1]).unwrap();
        assert!(objective.batch_loss(&model, &batch, &[17]).is_err());
    }

    #[test]
    fn monte_carlo_loss_matches_analytic_expectation() {
        // With one negative per draw, the expected negative term is the
        // distortion-weighted average of the per-word cross-entropies.
        let mut objective = objective(1);
        let model = test_model();
        let batch = Batch::new(vec![0], vec![2]).unwrap();

        const DRAWS: usize = 30_000;
        let mut mc_loss = 0f64;
        for _ in 0..DRAWS {
            let negatives = objective.draw_negatives();
            mc_loss += objective.batch_loss(&model, &batch, &negatives).unwrap() as f64;
        }
        mc_loss /= DRAWS as f64;

        // count^0.75 weights of the test vocabulary.
        let weights = [8.0f64, 4.75683, 2.82843, 1.68179];
        let weight_sum: f64 = weights.iter().sum();

        let embed = model.input_embedding(0).unwrap();
        let true_logit = embed.dot(&model.output_embedding(2).unwrap())
            + model.output_bias(2).unwrap();
        let mut expected = sigmoid_cross_entropy(true_logit, true) as f64;
        for j in 0..4 {
            let neg_logit =
                embed.dot(&model.output_embedding(j).unwrap()) + model.output_bias(j).unwrap();
            expected += weights[j] / weight_sum * sigmoid_cross_entropy(neg_logit, false) as f64;
        }

        assert!(
            (mc_loss - expected).abs() < 1e-2,
            "Monte Carlo loss {} does not match expectation {}",
            mc_loss,
            expected
        );
    }

    #[test]
    fn softmax_loss_is_finite_and_non_negative() {
        let model = test_model();
        let batch = Batch::new(vec![0, 1, 2, 3], vec![1, 2, 3, 0]).unwrap();

        let loss = softmax_batch_loss(&model, &batch).unwrap();
        assert!(loss.is_finite());
        assert!(loss >= 0.0);
    }

    #[test]
    fn softmax_agrees_with_negative_sampling_after_training() {
        // Both objectives must agree that training improved the model:
        // negative-sampling updates should also lower the full-softmax
        // cross-entropy of the trained pairs.
        let mut model = test_model();
        let mut objective = objective(2);
        let batch = Batch::new(vec![0, 1, 2], vec![1, 2, 0]).unwrap();

        let before = softmax_batch_loss(&model, &batch).unwrap();
        for _ in 0..200 {
            let negatives = objective.draw_negatives();
            model.negative_sampling_step(&batch, &negatives, 0.1).unwrap();
        }
        let after = softmax_batch_loss(&model, &batch).unwrap();

        assert!(
            after < before,
            "softmax loss did not improve: {} -> {}",
            before,
            after
        );
    }
}
