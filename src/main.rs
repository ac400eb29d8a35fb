use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use recognizer::{GaussianHmm, ModelRegistry, Recognition, TestCorpus};

/// Guess the label of every sequence in the test data (FILE) by maximum likelihood
/// over a set of trained models (MODELS)
#[derive(Debug, Parser)]
#[command(version)]
struct Argv {
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// read the labelled models from a JSON file (MODELS)
    #[arg(short, long, required = true, value_name = "MODELS")]
    models: PathBuf,
    /// output the log-likelihood of every label
    #[arg(short, long)]
    scores: bool,
    /// score the test sequences in parallel
    #[arg(short, long)]
    parallel: bool,
    /// test data, one frame per line: <id>\t<v1>\t<v2>...
    #[arg(required = true, value_name = "<FILE>")]
    datasets: Vec<PathBuf>,
}

fn run(argv: &Argv) -> recognizer::Result<Recognition> {
    let models = ModelRegistry::<GaussianHmm>::from_path(&argv.models)?;
    let mut tests = TestCorpus::new();
    for fpath in &argv.datasets {
        log::info!("reading test data from: {}", fpath.display());
        tests.extend(TestCorpus::from_path(fpath)?);
    }
    recognize(&models, &tests, argv.parallel)
}

#[cfg(feature = "parallel")]
fn recognize(models: &ModelRegistry<GaussianHmm>, tests: &TestCorpus, parallel: bool) -> recognizer::Result<Recognition> {
    if parallel {
        recognizer::recognize_par(models, tests)
    } else {
        recognizer::recognize(models, tests)
    }
}

#[cfg(not(feature = "parallel"))]
fn recognize(models: &ModelRegistry<GaussianHmm>, tests: &TestCorpus, parallel: bool) -> recognizer::Result<Recognition> {
    if parallel {
        log::warn!("built without the `parallel` feature, scoring sequentially");
    }
    recognizer::recognize(models, tests)
}

fn main() -> ExitCode {
    let argv = Argv::parse();
    let level = match argv.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();
    log::info!("argv: {:?}", argv);

    let recognition = match run(&argv) {
        Ok(r) => r,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    for ((test_id, record), guess) in recognition.test_ids.iter().zip(&recognition.scores).zip(&recognition.guesses) {
        let mut line = format!("{test_id}\t{}", guess.as_deref().unwrap_or("-"));
        if argv.scores {
            for (label, score) in record.iter() {
                line.push_str(&format!("\t{label}={score}"));
            }
        }
        println!("{line}");
    }
    ExitCode::SUCCESS
}
