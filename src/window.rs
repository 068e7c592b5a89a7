use std::cmp;
use std::collections::VecDeque;
use std::iter::{Fuse, FusedIterator};
use std::vec;

use crate::Result;

/// Iterator over (center, context) pairs within one document.
///
/// For a window radius `span`, every ordered pair of words at most
/// `span` positions apart is produced exactly once, in document order:
/// centers are visited front to back, contexts within a center in
/// ascending position. A word is never its own context, although the
/// same word type pairs with itself when it recurs nearby.
///
/// The generator holds a bounded window of at most `2 * span + 1`
/// words; the document itself is consumed as a single forward pass and
/// is never indexed randomly. Documents shorter than the window yield
/// all pairs that have a valid context, down to a single-word document
/// that yields nothing.
pub struct DocPairs<W>
where
    W: Iterator,
{
    words: Fuse<W>,
    span: usize,
    window: VecDeque<W::Item>,
    pending: VecDeque<(W::Item, W::Item)>,
    phase: Phase,
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum Phase {
    Prime,
    Slide,
    Done,
}

impl<W> DocPairs<W>
where
    W: Iterator,
    W::Item: Clone,
{
    /// Constructs a new `DocPairs` over a document's words.
    pub fn new(words: W, span: usize) -> Self {
        assert!(span >= 1, "Window radius must be at least 1.");

        DocPairs {
            words: words.fuse(),
            span,
            window: VecDeque::with_capacity(2 * span + 1),
            pending: VecDeque::new(),
            phase: Phase::Prime,
        }
    }

    fn window_size(&self) -> usize {
        2 * self.span + 1
    }

    /// Queue the pairs for the center at window slot `i`.
    ///
    /// Contexts are the slots within `span` positions of `i` that exist
    /// in the window, excluding `i` itself.
    fn queue_center(&mut self, i: usize) {
        let lo = i.saturating_sub(self.span);
        let hi = cmp::min(i + self.span, self.window.len() - 1);

        for j in lo..=hi {
            if j != i {
                self.pending
                    .push_back((self.window[i].clone(), self.window[j].clone()));
            }
        }
    }

    /// Fill the window and queue the leading-edge centers.
    fn prime(&mut self) {
        while self.window.len() < self.window_size() {
            match self.words.next() {
                Some(word) => self.window.push_back(word),
                None => break,
            }
        }

        // Words in the first `span` positions never get a full left
        // context; their pairs come from the partial window.
        for i in 0..cmp::min(self.span, self.window.len()) {
            self.queue_center(i);
        }

        self.phase = Phase::Slide;
    }

    /// Advance the window by one word, or drain the trailing edge.
    fn slide(&mut self) {
        match self.words.next() {
            Some(word) => {
                // The window is full here: priming only leaves it
                // underfilled when the document is already exhausted.
                self.queue_center(self.span);
                self.window.pop_front();
                self.window.push_back(word);
            }
            None => {
                let tail_start = if self.window.len() == self.window_size() {
                    self.queue_center(self.span);
                    self.span + 1
                } else {
                    self.span
                };

                for i in tail_start..self.window.len() {
                    self.queue_center(i);
                }

                self.phase = Phase::Done;
            }
        }
    }
}

impl<W> Iterator for DocPairs<W>
where
    W: Iterator,
    W::Item: Clone,
{
    type Item = (W::Item, W::Item);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(pair) = self.pending.pop_front() {
                return Some(pair);
            }

            match self.phase {
                Phase::Prime => self.prime(),
                Phase::Slide => self.slide(),
                Phase::Done => return None,
            }
        }
    }
}

impl<W> FusedIterator for DocPairs<W>
where
    W: Iterator,
    W::Item: Clone,
{
}

/// Iterator over (center, context) pairs in a stream of documents.
///
/// The window never crosses a document boundary; it is reset for every
/// document. Errors from the underlying document stream are passed
/// through immediately.
pub struct WindowPairs<I, T> {
    docs: I,
    span: usize,
    current: Option<DocPairs<vec::IntoIter<T>>>,
}

impl<I, T> WindowPairs<I, T>
where
    I: Iterator<Item = Result<Vec<T>>>,
    T: Clone,
{
    /// Constructs a new `WindowPairs` with the given window radius.
    pub fn new(docs: I, span: usize) -> Self {
        assert!(span >= 1, "Window radius must be at least 1.");

        WindowPairs {
            docs,
            span,
            current: None,
        }
    }
}

impl<I, T> Iterator for WindowPairs<I, T>
where
    I: Iterator<Item = Result<Vec<T>>>,
    T: Clone,
{
    type Item = Result<(T, T)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(pairs) = self.current.as_mut() {
                if let Some(pair) = pairs.next() {
                    return Some(Ok(pair));
                }

                self.current = None;
            }

            match self.docs.next()? {
                Ok(doc) => self.current = Some(DocPairs::new(doc.into_iter(), self.span)),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}
