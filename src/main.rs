//! Command-line driver for the pinyin-to-hanzi transliteration model.
//!
//! `train` runs the full training loop and then evaluates the final checkpoint,
//! `evaluate` scores a checkpoint on the test set, and `transliterate` decodes
//! free-text pinyin.

use clap::{Parser, Subcommand, ValueEnum};
use hanzi_bigru::prelude::*;
use log::{LevelFilter, error, info, warn};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand::rngs::StdRng;
use simple_logger::SimpleLogger;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "hanzi-bigru",
    about = "Train and run a bidirectional GRU that transliterates pinyin into hanzi"
)]
struct Cli {
    /// Experiment configuration (JSON); built-in defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbosity of the log output
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Override the vocabulary file from the configuration
    #[arg(long, global = true)]
    vocab_file: Option<PathBuf>,

    /// Override the dataset file from the configuration
    #[arg(long, global = true)]
    dataset_file: Option<PathBuf>,

    /// Override the checkpoint directory from the configuration
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train a new model, then evaluate its final parameters
    Train {
        /// Override the random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Hide the progress bar
        #[arg(long, default_value_t = false)]
        no_progress: bool,

        /// Test pair shown as a qualitative example after training
        #[arg(long, default_value_t = 1000)]
        example_index: usize,
    },
    /// Evaluate a checkpoint on the test set
    Evaluate {
        /// Checkpoint to load (defaults to parameters_final.json in the model directory)
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Test pair shown as a qualitative example
        #[arg(long, default_value_t = 1000)]
        example_index: usize,
    },
    /// Transliterate pinyin strings
    Transliterate {
        /// Checkpoint to load (defaults to parameters_final.json in the model directory)
        #[arg(long)]
        checkpoint: Option<PathBuf>,

        /// Inputs to transliterate; a fixed list of sentences is used when empty
        inputs: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = SimpleLogger::new()
        .with_level(cli.log_level.into())
        .init()
    {
        eprintln!("failed to initialise logger: {}", e);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), PipelineError> {
    let mut config = match &cli.config {
        Some(path) => ExperimentConfig::from_path(path)?,
        None => ExperimentConfig::default(),
    };
    if let Some(path) = cli.vocab_file {
        config.paths.vocab_file = path;
    }
    if let Some(path) = cli.dataset_file {
        config.paths.dataset_file = path;
    }
    if let Some(path) = cli.model_dir {
        config.paths.model_dir = path;
    }
    if let Command::Train {
        seed: Some(seed), ..
    } = &cli.command
    {
        config.training.seed = *seed;
    }
    config.validate()?;

    let vocab = VocabularyPair::load_from_path(&config.paths.vocab_file)?;
    vocab.validate(
        config.model.source_vocab_size,
        config.model.n_output,
        config.symbols.filler,
    )?;
    let final_checkpoint = config
        .paths
        .model_dir
        .join(CheckpointLabel::Final.file_name());

    match cli.command {
        Command::Train {
            no_progress,
            example_index,
            ..
        } => {
            let dataset = DatasetSplit::load_from_path(&config.paths.dataset_file)?;
            let mut rng = StdRng::seed_from_u64(config.training.seed);
            let mut model = BiGruModel::new(config.model.clone(), &mut rng)?;
            let mut trainer = Trainer::new(config.training.clone(), &config.paths.model_dir)?
                .with_progress_bar(!no_progress);
            let report = trainer.fit(&mut model, &dataset, &vocab)?;
            info!(
                "trained for {} iterations on {} samples",
                report.iterations, report.samples_seen
            );

            evaluate(
                &config,
                vocab.clone(),
                &dataset,
                &report.final_checkpoint,
                example_index,
            )?;
            transliterate(&config, vocab, &report.final_checkpoint, &[])
        }
        Command::Evaluate {
            checkpoint,
            example_index,
        } => {
            let dataset = DatasetSplit::load_from_path(&config.paths.dataset_file)?;
            let path = checkpoint.unwrap_or(final_checkpoint);
            evaluate(&config, vocab, &dataset, &path, example_index)
        }
        Command::Transliterate { checkpoint, inputs } => {
            let path = checkpoint.unwrap_or(final_checkpoint);
            transliterate(&config, vocab, &path, &inputs)
        }
    }
}

fn evaluate(
    config: &ExperimentConfig,
    vocab: VocabularyPair,
    dataset: &DatasetSplit,
    checkpoint: &Path,
    example_index: usize,
) -> Result<(), PipelineError> {
    dataset.validate(config.model.n_step_input, &vocab)?;
    let transliterator = Transliterator::from_checkpoint(config, vocab, checkpoint)?;
    if dataset.test.is_empty() {
        warn!("test set is empty, nothing to evaluate");
        return Ok(());
    }
    transliterator.evaluate(&dataset.test, config.training.batch_size)?;

    match dataset.test.get(example_index) {
        Some(pair) => {
            let example = transliterator.example_report(pair)?;
            info!("source:     {}", example.source);
            info!("target:     {}", example.target);
            info!("prediction: {}", example.prediction);
            info!("edit dist is {}", example.edit_distance);
        }
        None => warn!(
            "test set has {} pairs, no example at index {}",
            dataset.test.len(),
            example_index
        ),
    }
    Ok(())
}

fn transliterate(
    config: &ExperimentConfig,
    vocab: VocabularyPair,
    checkpoint: &Path,
    inputs: &[String],
) -> Result<(), PipelineError> {
    let transliterator = Transliterator::from_checkpoint(config, vocab, checkpoint)?;
    let inputs: Vec<&str> = if inputs.is_empty() {
        DEFAULT_INPUTS.to_vec()
    } else {
        inputs.iter().map(String::as_str).collect()
    };
    for input in inputs {
        let result = transliterator.transliterate(input)?;
        info!("source:     {}", result.source);
        info!("prediction: {}", result.prediction);
    }
    Ok(())
}
