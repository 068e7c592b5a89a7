use fnv::FnvHashMap;

pub type Word = CountedType<String>;

/// A vocabulary type with its observed corpus count.
#[derive(Clone, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct CountedType<T> {
    count: usize,
    label: T,
}

impl<T> CountedType<T> {
    /// Construct a new type.
    pub(crate) fn new(label: T, count: usize) -> Self {
        CountedType { label, count }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn label(&self) -> &T {
        &self.label
    }
}

impl CountedType<String> {
    /// The string representation of the word.
    pub fn word(&self) -> &str {
        &self.label
    }
}

/// A corpus vocabulary.
///
/// Maps every word observed in the corpus to a dense index in
/// *[0, len)* and back, and carries the per-word keep probabilities
/// used for frequency subsampling. Words are sorted by descending
/// corpus frequency. The vocabulary is immutable once built; share it
/// behind an `Arc` when several pipeline stages need it.
#[derive(Clone)]
pub struct Vocabulary {
    subsample: f32,
    words: Vec<Word>,
    index: FnvHashMap<String, usize>,
    keep_probs: Vec<f32>,
    n_tokens: usize,
}

impl Vocabulary {
    /// Construct a new vocabulary.
    ///
    /// Normally a `VocabBuilder` should be used.
    pub(crate) fn new(subsample: f32, words: Vec<Word>, n_tokens: usize) -> Self {
        let index = create_indices(&words);
        let keep_probs = create_keep_probs(subsample, &words, n_tokens);
        Vocabulary {
            subsample,
            words,
            index,
            keep_probs,
            n_tokens,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Get the number of entries in the vocabulary.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Get the index of a word, `None` if the word is not present.
    pub fn idx(&self, word: &str) -> Option<usize> {
        self.index.get(word).cloned()
    }

    /// Get the given word.
    pub fn word(&self, word: &str) -> Option<&Word> {
        self.idx(word).map(|idx| &self.words[idx])
    }

    /// Get all words in the vocabulary, sorted by descending frequency.
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    /// Get the keep probability of the word with the given index.
    pub fn keep_prob(&self, idx: usize) -> f32 {
        self.keep_probs[idx]
    }

    /// Get the number of tokens in the corpus the vocabulary was built from.
    pub fn n_tokens(&self) -> usize {
        self.n_tokens
    }

    /// Get the subsample threshold the keep probabilities were derived from.
    pub fn subsample(&self) -> f32 {
        self.subsample
    }

    /// Map a document to vocabulary indices, dropping unknown words.
    pub fn index_document<S>(&self, words: &[S]) -> Vec<usize>
    where
        S: AsRef<str>,
    {
        words
            .iter()
            .filter_map(|word| self.idx(word.as_ref()))
            .collect()
    }
}

/// Builder to count corpus words.
///
/// Words are added and counted using the `count` method; the finished
/// vocabulary is obtained through `From`.
pub struct VocabBuilder {
    subsample: f32,
    items: FnvHashMap<String, usize>,
    n_items: usize,
}

impl VocabBuilder {
    pub fn new(subsample: f32) -> Self {
        VocabBuilder {
            subsample,
            items: FnvHashMap::default(),
            n_items: 0,
        }
    }

    pub fn count<S>(&mut self, item: S)
    where
        S: Into<String>,
    {
        self.n_items += 1;
        *self.items.entry(item.into()).or_insert(0) += 1;
    }
}

impl From<VocabBuilder> for Vocabulary {
    fn from(builder: VocabBuilder) -> Self {
        let mut words: Vec<_> = builder
            .items
            .into_iter()
            .map(|(word, count)| Word::new(word, count))
            .collect();
        words.sort_unstable_by(|w1, w2| w2.cmp(&w1));
        Vocabulary::new(builder.subsample, words, builder.n_items)
    }
}

/// Compute keep probabilities from the threshold and per-word counts.
///
/// For a word with corpus-relative frequency *f* and threshold *t*, the
/// keep probability is *sqrt(f/t + 1) * t/f*, clamped to 1. Rare words
/// get probability 1; the probability decreases monotonically with
/// frequency.
fn create_keep_probs(subsample: f32, words: &[Word], n_tokens: usize) -> Vec<f32> {
    let mut keep_probs = Vec::with_capacity(words.len());

    for word in words {
        let freq = word.count() as f32 / n_tokens as f32;
        let p_keep = (freq / subsample + 1.0).sqrt() * (subsample / freq);
        keep_probs.push(1f32.min(p_keep));
    }

    keep_probs
}

/// Create lookup.
fn create_indices(words: &[Word]) -> FnvHashMap<String, usize> {
    let mut word_indices = FnvHashMap::default();

    for (idx, word) in words.iter().enumerate() {
        word_indices.insert(word.label.clone(), idx);
    }

    // Invariant: the index size should be the same as the number of words.
    assert_eq!(words.len(), word_indices.len());

    word_indices
}
