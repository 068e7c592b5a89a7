use std::fs::File;
use std::io::BufReader;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{App, AppSettings, Arg, ArgMatches};
use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use skipwind::{
    Config, EmbeddingModel, FileProgress, LossType, SentenceIterator, SubsampledReader,
    TextCorpus, TrainingLoop, VocabBuilder, Vocabulary,
};

static DEFAULT_CLAP_SETTINGS: &[AppSettings] = &[
    AppSettings::DontCollapseArgsInUsage,
    AppSettings::UnifiedHelpMessage,
];

// Option constants
static BATCH_SIZE: &str = "batch_size";
static CONTEXT: &str = "context";
static DIMS: &str = "dims";
static DISTORTION: &str = "distortion";
static EPOCHS: &str = "epochs";
static LOSS: &str = "loss";
static LR: &str = "lr";
static NS: &str = "ns";
static PRINT_CONFIG: &str = "print_config";
static REPORT_INTERVAL: &str = "report_interval";
static SUBSAMPLE: &str = "subsample";
static CORPUS: &str = "CORPUS";

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let matches = app().get_matches();
    let config = parse_config(&matches)?;
    config.validate()?;

    if matches.is_present(PRINT_CONFIG) {
        eprintln!(
            "{}",
            toml::to_string(&config).context("Cannot serialize configuration")?
        );
    }

    let corpus_path = matches.value_of(CORPUS).unwrap();
    let vocab = Arc::new(build_vocab(&config, corpus_path)?);
    eprintln!(
        "Vocabulary: {} words, {} tokens",
        vocab.len(),
        vocab.n_tokens()
    );

    let corpus = TextCorpus::new(corpus_path);
    let reader = SubsampledReader::from_vocab(vocab.clone(), XorShiftRng::from_entropy());
    let model = EmbeddingModel::from_vocab(&vocab, &config);
    let mut training =
        TrainingLoop::new(config, reader, model, XorShiftRng::from_entropy())
            .context("Cannot construct training loop")?;

    let progress = ProgressBar::new_spinner();
    progress.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}"));

    let summary = training
        .run(&corpus, |p| {
            progress.set_message(&format!(
                "epoch {} batch {} loss: {:.5}",
                p.epoch, p.batch, p.loss
            ));
            progress.tick();
        })
        .context("Training failed")?;
    progress.finish();

    eprintln!(
        "Trained {} epochs, {} batches, {} examples, mean loss {:.5}",
        summary.epochs, summary.n_batches, summary.n_examples, summary.train_loss
    );
    eprintln!(
        "Started {}, finished {}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S"),
        summary.finished_at.format("%Y-%m-%d %H:%M:%S")
    );

    Ok(())
}

fn app() -> App<'static, 'static> {
    App::new("skipwind")
        .settings(DEFAULT_CLAP_SETTINGS)
        .version(env!("CARGO_PKG_VERSION"))
        .about("Train a skip-gram model with negative sampling")
        .arg(
            Arg::with_name(BATCH_SIZE)
                .long("batch-size")
                .value_name("N")
                .help("Pairs per training batch")
                .takes_value(true)
                .default_value("1000"),
        )
        .arg(
            Arg::with_name(CONTEXT)
                .long("context")
                .value_name("CONTEXT_SIZE")
                .help("Context size")
                .takes_value(true)
                .default_value("5"),
        )
        .arg(
            Arg::with_name(DIMS)
                .long("dims")
                .value_name("DIMENSIONS")
                .help("Embedding dimensionality")
                .takes_value(true)
                .default_value("300"),
        )
        .arg(
            Arg::with_name(DISTORTION)
                .long("distortion")
                .value_name("EXP")
                .help("Exponent of the unigram distribution for negative sampling")
                .takes_value(true)
                .default_value("0.75"),
        )
        .arg(
            Arg::with_name(EPOCHS)
                .long("epochs")
                .value_name("N")
                .help("Number of epochs")
                .takes_value(true)
                .default_value("5"),
        )
        .arg(
            Arg::with_name(LOSS)
                .long("loss")
                .value_name("LOSS")
                .help("Loss function")
                .takes_value(true)
                .possible_values(&["ns", "softmax"])
                .default_value("ns"),
        )
        .arg(
            Arg::with_name(LR)
                .long("lr")
                .value_name("LEARNING_RATE")
                .help("Learning rate")
                .takes_value(true)
                .default_value("0.001"),
        )
        .arg(
            Arg::with_name(NS)
                .long("ns")
                .value_name("FREQ")
                .help("Negative samples per batch")
                .takes_value(true)
                .default_value("5"),
        )
        .arg(
            Arg::with_name(REPORT_INTERVAL)
                .long("report-interval")
                .value_name("N")
                .help("Report progress every N batches (0 disables)")
                .takes_value(true)
                .default_value("500"),
        )
        .arg(
            Arg::with_name(SUBSAMPLE)
                .long("subsample")
                .value_name("THRESHOLD")
                .help("Subsample threshold")
                .takes_value(true)
                .default_value("1e-3"),
        )
        .arg(
            Arg::with_name(PRINT_CONFIG)
                .long("print-config")
                .help("Print the effective configuration as TOML"),
        )
        .arg(
            Arg::with_name(CORPUS)
                .help("Tokenized corpus, one document per line")
                .index(1)
                .required(true),
        )
}

fn parse_config(matches: &ArgMatches) -> Result<Config> {
    let batch_size = matches
        .value_of(BATCH_SIZE)
        .map(|v| v.parse().context("Cannot parse batch size"))
        .transpose()?
        .unwrap();
    let context_size = matches
        .value_of(CONTEXT)
        .map(|v| v.parse().context("Cannot parse context size"))
        .transpose()?
        .unwrap();
    let dims = matches
        .value_of(DIMS)
        .map(|v| v.parse().context("Cannot parse dimensionality"))
        .transpose()?
        .unwrap();
    let distortion = matches
        .value_of(DISTORTION)
        .map(|v| v.parse().context("Cannot parse distortion exponent"))
        .transpose()?
        .unwrap();
    let epochs = matches
        .value_of(EPOCHS)
        .map(|v| v.parse().context("Cannot parse number of epochs"))
        .transpose()?
        .unwrap();
    let loss = matches
        .value_of(LOSS)
        .map(|v| LossType::try_from_str(v).context("Cannot parse loss type"))
        .transpose()?
        .unwrap();
    let lr = matches
        .value_of(LR)
        .map(|v| v.parse().context("Cannot parse learning rate"))
        .transpose()?
        .unwrap();
    let negative_samples = matches
        .value_of(NS)
        .map(|v| v.parse().context("Cannot parse number of negative samples"))
        .transpose()?
        .unwrap();
    let report_interval = matches
        .value_of(REPORT_INTERVAL)
        .map(|v| v.parse().context("Cannot parse report interval"))
        .transpose()?
        .unwrap();
    let subsample = matches
        .value_of(SUBSAMPLE)
        .map(|v| v.parse().context("Cannot parse subsample threshold"))
        .transpose()?
        .unwrap();

    Ok(Config {
        loss,
        context_size,
        subsample,
        dims,
        epochs,
        negative_samples,
        batch_size,
        lr,
        distortion,
        report_interval,
    })
}

fn build_vocab(config: &Config, corpus_path: &str) -> Result<Vocabulary> {
    let f = File::open(corpus_path).context("Cannot open corpus for reading")?;
    let file_progress = FileProgress::new(f).context("Cannot create progress bar")?;

    let sentences = SentenceIterator::new(BufReader::new(file_progress));

    let mut builder = VocabBuilder::new(config.subsample);
    for sentence in sentences {
        let sentence = sentence.context("Cannot read sentence")?;

        for token in sentence {
            builder.count(token);
        }
    }

    Ok(builder.into())
}
