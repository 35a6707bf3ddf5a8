//! Train a feed-forward classifier on MNIST.
//!
//! Usage: `ffnet [config.json]`. Without a config file the defaults from
//! [`RunConfig::default`] are used. Set `RUST_LOG=debug` for per-class output
//! dumps.

use std::process::ExitCode;

use log::{error, info};

use ffnet::mnist::{self, NUM_CLASSES, Split};
use ffnet::{DataSource, RunConfig, Trainer};

fn run() -> ffnet::Result<()> {
    let cfg = match std::env::args().nth(1) {
        Some(path) => RunConfig::load_json(path)?,
        None => RunConfig::default(),
    };

    let train = mnist::load_mnist(&cfg.data_dir, Split::Train)?;
    let test = mnist::load_mnist(&cfg.data_dir, Split::Test)?;
    info!(
        "loaded {} training and {} test samples from {}",
        train.len(),
        test.len(),
        cfg.data_dir.display()
    );

    let network = cfg
        .network_builder(train.input_dim(), NUM_CLASSES)?
        .build_with_seed(cfg.seed)?;
    let mut trainer = Trainer::new(network, cfg.loss, cfg.train.clone())?;
    let report = trainer.fit(&train, Some(&test))?;

    if let Some(last) = report.epochs.last() {
        info!(
            "done: final epoch loss = {} train accuracy = {}%",
            last.mean_loss, last.train_accuracy
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
