mod batch;
pub use crate::batch::{Batch, Batches};

mod config;
pub use crate::config::{Config, LossType};

mod error;
pub use crate::error::{Error, Result};

mod io;
pub use crate::io::{Corpus, FileProgress, SentenceIterator, TextCorpus};

mod loss;

mod model;
pub use crate::model::{EmbeddingModel, Model};

mod objective;
pub use crate::objective::{softmax_batch_loss, NegativeSamplingObjective};

mod sampling;
pub use crate::sampling::{RangeGenerator, UnigramRangeGenerator};

mod subsample;
pub use crate::subsample::{SubsampledDocs, SubsampledReader};

mod train;
pub use crate::train::{TrainProgress, TrainSummary, TrainingLoop};

pub(crate) mod util;

mod vocab;
pub use crate::vocab::{CountedType, VocabBuilder, Vocabulary, Word};

mod window;
pub use crate::window::{DocPairs, WindowPairs};
