use crate::{Error, Result};

/// A batch of training examples as parallel index arrays.
///
/// `inputs` holds the center words, `labels` the corresponding context
/// words. Both arrays always have the same length; `len` is the
/// authoritative batch size, which for the final batch of a stream may
/// be smaller than the configured one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Batch {
    inputs: Vec<usize>,
    labels: Vec<usize>,
}

impl Batch {
    /// Construct a batch from parallel input/label arrays.
    pub fn new(inputs: Vec<usize>, labels: Vec<usize>) -> Result<Self> {
        if inputs.len() != labels.len() {
            return Err(Error::ShapeMismatch {
                inputs: inputs.len(),
                labels: labels.len(),
            });
        }

        Ok(Batch { inputs, labels })
    }

    /// The actual number of examples in this batch.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn inputs(&self) -> &[usize] {
        &self.inputs
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Iterate over the (input, label) examples of this batch.
    pub fn examples(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.inputs
            .iter()
            .cloned()
            .zip(self.labels.iter().cloned())
    }
}

/// Iterator slicing a pair stream into fixed-size batches.
///
/// Pairs are pulled greedily, `batch_size` at a time. The final batch
/// of a finite stream is passed through at its actual size rather than
/// padded or dropped; consumers must normalize by `Batch::len`.
pub struct Batches<I> {
    pairs: I,
    batch_size: usize,
}

impl<I> Batches<I>
where
    I: Iterator<Item = Result<(usize, usize)>>,
{
    pub fn new(pairs: I, batch_size: usize) -> Self {
        assert!(batch_size >= 1, "Batch size must be at least 1.");

        Batches { pairs, batch_size }
    }
}

impl<I> Iterator for Batches<I>
where
    I: Iterator<Item = Result<(usize, usize)>>,
{
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut inputs = Vec::with_capacity(self.batch_size);
        let mut labels = Vec::with_capacity(self.batch_size);

        while inputs.len() < self.batch_size {
            match self.pairs.next() {
                Some(Ok((input, label))) => {
                    inputs.push(input);
                    labels.push(label);
                }
                Some(Err(err)) => return Some(Err(err)),
                None => break,
            }
        }

        if inputs.is_empty() {
            None
        } else {
            Some(Ok(Batch { inputs, labels }))
        }
    }
}
