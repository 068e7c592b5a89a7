use std::sync::Arc;

use rand::Rng;

use crate::vocab::Vocabulary;

/// Iterator that draws indices from *[0, upper_bound)*.
pub trait RangeGenerator: Iterator<Item = usize> {
    /// Get the upper bound in *[0, upper_bound)*.
    fn upper_bound(&self) -> usize;
}

/// An iterator that draws from *[0, n)* with a distorted unigram
/// distribution.
///
/// The probability of each vocabulary index is proportional to its
/// corpus count raised to the distortion power. A power below 1
/// flattens the frequency skew, so that negative samples favor
/// moderate-frequency words over either extreme.
///
/// The distribution is materialized as a table in which each index
/// occurs as often as its (normalized) weight; indices are then drawn
/// from the table uniformly.
#[derive(Clone)]
pub struct UnigramRangeGenerator<R> {
    table: Arc<Vec<usize>>,
    rng: R,
    vocab_len: usize,
}

impl<R> UnigramRangeGenerator<R> {
    pub fn new(rng: R, vocab: &Vocabulary, distortion: f32, table_size: usize) -> Self {
        assert!(!vocab.is_empty(), "Cannot sample from an empty vocabulary.");

        let mut table = Vec::with_capacity(table_size);

        let weight_sum = vocab
            .words()
            .iter()
            .map(|w| (w.count() as f32).powf(distortion))
            .sum::<f32>();

        for (word_idx, word) in vocab.words().iter().enumerate() {
            let word_weight = (word.count() as f32).powf(distortion);
            let n_table_elems = ((word_weight / weight_sum) * table_size as f32) as usize;

            // Rounding must not leave a word unsampleable.
            for _ in 0..n_table_elems.max(1) {
                table.push(word_idx);
            }
        }

        UnigramRangeGenerator {
            table: Arc::new(table),
            rng,
            vocab_len: vocab.len(),
        }
    }
}

impl<R> Iterator for UnigramRangeGenerator<R>
where
    R: Rng,
{
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let rand_idx = self.rng.gen_range(0..self.table.len());
        Some(self.table[rand_idx])
    }
}

impl<R> RangeGenerator for UnigramRangeGenerator<R>
where
    R: Rng,
{
    fn upper_bound(&self) -> usize {
        self.vocab_len
    }
}
