use std::sync::Arc;

use rand::Rng;

use crate::io::Corpus;
use crate::vocab::{VocabBuilder, Vocabulary};
use crate::{Error, Result};

/// Frequency-subsampling corpus reader.
///
/// Wraps a corpus and drops words stochastically based on their
/// corpus-wide frequency, biasing the resulting stream against very
/// frequent words. The reader must be fitted through a one-time
/// frequency pass (`count_words`) before it can be read; the decision
/// to keep or drop a word is drawn independently for every occurrence.
pub struct SubsampledReader<R> {
    subsample: f32,
    vocab: Option<Arc<Vocabulary>>,
    rng: R,
}

impl<R> SubsampledReader<R>
where
    R: Rng + Clone,
{
    /// Construct an unfitted reader with the given subsample threshold.
    pub fn new(subsample: f32, rng: R) -> Self {
        SubsampledReader {
            subsample,
            vocab: None,
            rng,
        }
    }

    /// Construct a reader that is already fitted with a vocabulary.
    pub fn from_vocab(vocab: Arc<Vocabulary>, rng: R) -> Self {
        SubsampledReader {
            subsample: vocab.subsample(),
            vocab: Some(vocab),
            rng,
        }
    }

    /// Fit the reader by counting word frequencies in a full corpus pass.
    pub fn count_words<C>(&mut self, corpus: &C) -> Result<Arc<Vocabulary>>
    where
        C: Corpus,
    {
        let mut builder = VocabBuilder::new(self.subsample);
        for doc in corpus.documents()? {
            for word in doc? {
                builder.count(word);
            }
        }

        let vocab = Arc::new(Vocabulary::from(builder));
        self.vocab = Some(vocab.clone());
        Ok(vocab)
    }

    /// Get the fitted vocabulary.
    pub fn vocab(&self) -> Result<&Arc<Vocabulary>> {
        self.vocab.as_ref().ok_or(Error::NotFitted)
    }

    /// Read the corpus with frequency subsampling applied.
    ///
    /// Returns an error when the reader has not been fitted yet. Words
    /// that are not in the vocabulary are always kept; this is the
    /// deliberate fallback for unseen tokens, which are treated as
    /// occurring once.
    pub fn read<C>(&self, corpus: &C) -> Result<SubsampledDocs<C::Iter, R>>
    where
        C: Corpus,
    {
        let vocab = self.vocab()?.clone();

        Ok(SubsampledDocs {
            docs: corpus.documents()?,
            vocab,
            rng: self.rng.clone(),
        })
    }
}

/// Iterator over subsampled documents.
///
/// A document in which every word was dropped is yielded as an empty
/// document; it contributes no training pairs but is not an error.
pub struct SubsampledDocs<I, R> {
    docs: I,
    vocab: Arc<Vocabulary>,
    rng: R,
}

impl<I, R> Iterator for SubsampledDocs<I, R>
where
    I: Iterator<Item = Result<Vec<String>>>,
    R: Rng,
{
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        let doc = match self.docs.next()? {
            Ok(doc) => doc,
            Err(err) => return Some(Err(err)),
        };

        let vocab = &self.vocab;
        let rng = &mut self.rng;
        let kept = doc
            .into_iter()
            .filter(|word| match vocab.idx(word) {
                Some(idx) => rng.gen::<f32>() < vocab.keep_prob(idx),
                None => true,
            })
            .collect();

        Some(Ok(kept))
    }
}
