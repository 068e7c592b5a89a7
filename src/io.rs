use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};

use crate::Result;

/// A progress bar that implements the `Read` trait.
///
/// This wrapper of `indicatif`'s `ProgressBar` updates progress based on the
/// current offset within the file.
pub struct FileProgress {
    inner: File,
    progress: ProgressBar,
}

impl FileProgress {
    pub fn new(file: File) -> io::Result<Self> {
        let metadata = file.metadata()?;
        let progress = ProgressBar::new(metadata.len());
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{bar:30} {bytes}/{total_bytes} ETA: {eta_precise}"),
        );

        Ok(FileProgress {
            inner: file,
            progress,
        })
    }
}

impl Read for FileProgress {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n_read = self.inner.read(buf)?;
        let pos = self.inner.seek(SeekFrom::Current(0))?;
        self.progress.set_position(pos);
        Ok(n_read)
    }
}

impl Drop for FileProgress {
    fn drop(&mut self) {
        self.progress.finish();
    }
}

/// Document iterator.
///
/// This iterator consumes a reader with tokenized documents:
///
/// - One document per line.
/// - Tokens separated by whitespace.
///
/// It produces `Vec`s with the tokens. Lines that are empty or only
/// consist of whitespace are discarded.
pub struct SentenceIterator<R> {
    lines: Lines<R>,
}

impl<R> SentenceIterator<R>
where
    R: BufRead,
{
    pub fn new(read: R) -> Self {
        SentenceIterator {
            lines: read.lines(),
        }
    }
}

impl<R> Iterator for SentenceIterator<R>
where
    R: BufRead,
{
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        for line in &mut self.lines {
            let line = match line {
                Ok(ref line) => line.trim(),
                Err(err) => return Some(Err(err.into())),
            };

            // Skip empty lines.
            if !line.is_empty() {
                return Some(Ok(whitespace_tokenize(line)));
            }
        }

        None
    }
}

fn whitespace_tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(ToOwned::to_owned).collect()
}

/// A re-iterable corpus of tokenized documents.
///
/// Every call to `documents` starts a fresh forward pass over the
/// corpus, so the same corpus value can drive the vocabulary pass and
/// each training epoch.
pub trait Corpus {
    type Iter: Iterator<Item = Result<Vec<String>>>;

    fn documents(&self) -> Result<Self::Iter>;
}

/// A corpus backed by a tokenized text file, one document per line.
#[derive(Clone, Debug)]
pub struct TextCorpus {
    path: PathBuf,
}

impl TextCorpus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TextCorpus { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Corpus for TextCorpus {
    type Iter = SentenceIterator<BufReader<File>>;

    fn documents(&self) -> Result<Self::Iter> {
        let f = File::open(&self.path)?;
        Ok(SentenceIterator::new(BufReader::new(f)))
    }
}

/// In-memory corpora, mostly useful for small data and tests.
impl Corpus for Vec<Vec<String>> {
    type Iter = std::vec::IntoIter<Result<Vec<String>>>;

    fn documents(&self) -> Result<Self::Iter> {
        let docs: Vec<_> = self.iter().cloned().map(Ok).collect();
        Ok(docs.into_iter())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::{Corpus, SentenceIterator};

    #[test]
    fn sentence_iterator_test() {
        let v = b"This is a sentence .\nAnd another one .\n".to_vec();
        let c = Cursor::new(v);
        let mut iter = SentenceIterator::new(c);
        assert_eq!(
            iter.next().unwrap().unwrap(),
            vec!["This", "is", "a", "sentence", "."]
        );
        assert_eq!(
            iter.next().unwrap().unwrap(),
            vec!["And", "another", "one", "."]
        );
        assert!(iter.next().is_none());
    }

    #[test]
    fn sentence_iterator_no_newline_test() {
        let v = b"This is a sentence .\nAnd another one .".to_vec();
        let c = Cursor::new(v);
        let mut iter = SentenceIterator::new(c);
        assert_eq!(
            iter.next().unwrap().unwrap(),
            vec!["This", "is", "a", "sentence", "."]
        );
        assert_eq!(
            iter.next().unwrap().unwrap(),
            vec!["And", "another", "one", "."]
        );
        assert!(iter.next().is_none());
    }

    #[test]
    fn sentence_iterator_empty_test() {
        let v = b"".to_vec();
        let c = Cursor::new(v);
        let mut iter = SentenceIterator::new(c);
        assert!(iter.next().is_none());
    }

    #[test]
    fn sentence_iterator_empty_newline_test() {
        let v = b"\n \n   \n".to_vec();
        let c = Cursor::new(v);
        let mut iter = SentenceIterator::new(c);
        assert!(iter.next().is_none());
    }

    #[test]
    fn memory_corpus_is_reiterable() {
        let corpus: Vec<Vec<String>> = vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["c".to_string()],
        ];

        for _ in 0..2 {
            let docs: Vec<_> = corpus
                .documents()
                .unwrap()
                .collect::<crate::Result<Vec<_>>>()
                .unwrap();
            assert_eq!(docs, vec![vec!["a", "b"], vec!["c"]]);
        }
    }
}
