//! Training and evaluation loop.
//!
//! Training is single-example stochastic gradient descent over the dataset in
//! its own order: forward, loss, backward in reverse layer order, then one
//! `update_weights` per parameterized layer.
//!
//! Progress goes through the `log` facade:
//! - `info`: epoch markers, windowed average loss and train accuracy every
//!   `log_every` samples, and `correct/total = accuracy%` for every held-out pass
//! - `debug`: per-class output vs target for the logged sample
//! - `warn`: skipped accuracy reports (empty evaluation set)

use log::{debug, info, warn};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::metrics::{Accuracy, RunningMean};
use crate::{DataSource, Error, Loss, Network, Result, Sample, Tensor};

/// Learning-rate policy, evaluated once per epoch.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LrSchedule {
    #[default]
    Constant,
    /// Multiply by `gamma` every `step_size` epochs.
    Step { step_size: usize, gamma: f32 },
    /// Multiply by `gamma` every epoch.
    Exponential { gamma: f32 },
}

impl LrSchedule {
    pub fn validate(self) -> Result<()> {
        match self {
            LrSchedule::Constant => Ok(()),
            LrSchedule::Step { step_size, gamma } => {
                if step_size == 0 {
                    return Err(Error::InvalidConfig(
                        "lr schedule step_size must be > 0".to_owned(),
                    ));
                }
                validate_gamma(gamma)
            }
            LrSchedule::Exponential { gamma } => validate_gamma(gamma),
        }
    }

    /// Learning rate for the zero-based `epoch`.
    pub fn lr_at(self, base: f32, epoch: usize) -> f32 {
        match self {
            LrSchedule::Constant => base,
            LrSchedule::Step { step_size, gamma } => {
                base * gamma.powi((epoch / step_size) as i32)
            }
            LrSchedule::Exponential { gamma } => base * gamma.powi(epoch as i32),
        }
    }
}

fn validate_gamma(gamma: f32) -> Result<()> {
    if !(gamma.is_finite() && gamma > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "lr schedule gamma must be finite and > 0, got {gamma}"
        )));
    }
    Ok(())
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub epochs: usize,
    pub learning_rate: f32,
    pub lr_schedule: LrSchedule,
    /// Log the windowed loss/accuracy every this many samples.
    pub log_every: usize,
    /// Run a held-out accuracy pass every this many samples, in addition to
    /// the pass at the end of each epoch.
    pub eval_every: Option<usize>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 10,
            learning_rate: 5e-4,
            lr_schedule: LrSchedule::Constant,
            log_every: 1000,
            eval_every: Some(10_000),
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(Error::InvalidConfig("epochs must be > 0".to_owned()));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning_rate must be finite and > 0, got {}",
                self.learning_rate
            )));
        }
        if self.log_every == 0 {
            return Err(Error::InvalidConfig("log_every must be > 0".to_owned()));
        }
        if self.eval_every == Some(0) {
            return Err(Error::InvalidConfig("eval_every must be > 0".to_owned()));
        }
        self.lr_schedule.validate()
    }
}

/// Outcome of one training step.
#[derive(Debug, Clone)]
pub struct StepReport {
    pub loss: f32,
    /// Argmax of the network output.
    pub predicted: usize,
    /// Argmax of the target.
    pub target_class: usize,
    pub output: Tensor,
    pub target: Tensor,
}

/// Outcome of a read-only accuracy pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalReport {
    pub correct: usize,
    pub total: usize,
    /// Percent in `[0, 100]`.
    pub accuracy: f32,
}

#[derive(Debug, Clone)]
pub struct EpochReport {
    pub epoch: usize,
    pub learning_rate: f32,
    pub mean_loss: f32,
    pub train_accuracy: f32,
    /// End-of-epoch held-out accuracy; `None` without an evaluation set or
    /// when it was empty.
    pub eval: Option<EvalReport>,
}

#[derive(Debug, Clone, Default)]
pub struct FitReport {
    pub epochs: Vec<EpochReport>,
}

impl FitReport {
    pub fn final_loss(&self) -> Option<f32> {
        self.epochs.last().map(|e| e.mean_loss)
    }
}

/// One SGD step on a single sample.
pub fn train_step(
    network: &mut Network,
    loss: Loss,
    sample: Sample,
    lr: f32,
) -> Result<StepReport> {
    let Sample { input, target } = sample;

    let trace = network.forward(input)?;
    let value = loss.forward(trace.output(), &target)?;
    network.backward_loss(&trace, loss, &target)?;
    network.update_weights(lr)?;

    let predicted = trace.output().max_idx()?;
    Ok(StepReport {
        loss: value,
        predicted,
        target_class: target.max_idx()?,
        output: trace.into_output(),
        target,
    })
}

/// Accuracy of `network` over `data`, using forward passes only.
///
/// Fails with [`Error::UndefinedAccuracy`] when `data` is empty.
pub fn evaluate<D: DataSource + ?Sized>(network: &Network, data: &D) -> Result<EvalReport> {
    let mut acc = Accuracy::new();
    for i in 0..data.len() {
        let sample = data.sample(i)?;
        let probs = network.predict(&sample.input)?;
        acc.record_tensors(&probs, &sample.target)?;

        if i % 1000 == 0 {
            debug!("evaluating held-out set... {i}/{}", data.len());
        }
    }

    let accuracy = acc.percent()?;
    Ok(EvalReport {
        correct: acc.correct(),
        total: acc.total(),
        accuracy,
    })
}

/// Where a [`Trainer`] is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    Training { epochs_done: usize },
    Done,
}

/// Drives a network through `config.epochs` epochs.
#[derive(Debug, Clone)]
pub struct Trainer {
    network: Network,
    loss: Loss,
    config: TrainConfig,
    phase: Phase,
}

impl Trainer {
    pub fn new(network: Network, loss: Loss, config: TrainConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            network,
            loss,
            config,
            phase: Phase::Init,
        })
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    #[inline]
    pub fn network(&self) -> &Network {
        &self.network
    }

    #[inline]
    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    /// Run every remaining epoch.
    pub fn fit(
        &mut self,
        train: &dyn DataSource,
        eval: Option<&dyn DataSource>,
    ) -> Result<FitReport> {
        let mut report = FitReport::default();
        while self.phase != Phase::Done {
            report.epochs.push(self.run_epoch(train, eval)?);
        }
        Ok(report)
    }

    /// Run one epoch over `train`, then an accuracy pass over `eval`.
    pub fn run_epoch(
        &mut self,
        train: &dyn DataSource,
        eval: Option<&dyn DataSource>,
    ) -> Result<EpochReport> {
        let epoch = match self.phase {
            Phase::Init => 0,
            Phase::Training { epochs_done } => epochs_done,
            Phase::Done => {
                return Err(Error::InvalidConfig(
                    "training already ran all configured epochs".to_owned(),
                ));
            }
        };
        if train.is_empty() {
            return Err(Error::InvalidData(
                "train dataset must not be empty".to_owned(),
            ));
        }

        let lr = self
            .config
            .lr_schedule
            .lr_at(self.config.learning_rate, epoch);
        info!("--- epoch {epoch} --- lr = {lr}");

        let mut window_loss = RunningMean::default();
        let mut window_acc = Accuracy::new();
        let mut epoch_loss = RunningMean::default();
        let mut epoch_acc = Accuracy::new();

        for j in 0..train.len() {
            let step = train_step(&mut self.network, self.loss, train.sample(j)?, lr)?;
            window_loss.push(step.loss);
            epoch_loss.push(step.loss);
            window_acc.record(step.predicted, step.target_class);
            epoch_acc.record(step.predicted, step.target_class);

            if j % self.config.log_every == 0 {
                log_window(epoch, j, lr, &step, &window_loss, &window_acc);
                window_loss.reset();
                window_acc.reset();
            }

            if let (Some(every), Some(eval)) = (self.config.eval_every, eval) {
                if j % every == 0 {
                    self.report_accuracy(eval)?;
                }
            }
        }

        let eval = match eval {
            Some(eval) => self.report_accuracy(eval)?,
            None => None,
        };

        let done = epoch + 1;
        self.phase = if done >= self.config.epochs {
            Phase::Done
        } else {
            Phase::Training { epochs_done: done }
        };

        Ok(EpochReport {
            epoch,
            learning_rate: lr,
            mean_loss: epoch_loss.mean().unwrap_or_default(),
            train_accuracy: epoch_acc.percent()?,
            eval,
        })
    }

    /// Held-out accuracy pass; an empty set is logged and skipped.
    fn report_accuracy(&self, eval: &dyn DataSource) -> Result<Option<EvalReport>> {
        match evaluate(&self.network, eval) {
            Ok(report) => {
                info!(
                    "accuracy = {}/{} = {}%",
                    report.correct, report.total, report.accuracy
                );
                Ok(Some(report))
            }
            Err(Error::UndefinedAccuracy) => {
                warn!("skipping accuracy report: evaluation set is empty");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

fn log_window(
    epoch: usize,
    sample: usize,
    lr: f32,
    step: &StepReport,
    loss: &RunningMean,
    acc: &Accuracy,
) {
    info!(
        "epoch {epoch} sample {sample}: avg loss = {} lr = {lr}",
        loss.mean().unwrap_or_default()
    );
    for (k, (p, t)) in step
        .output
        .as_slice()
        .iter()
        .zip(step.target.as_slice())
        .enumerate()
    {
        debug!("output[{k}] = {p} target = {t}");
    }
    debug!(
        "predicted {} for target {}",
        step.predicted, step.target_class
    );
    if let Ok(pct) = acc.percent() {
        info!("train accuracy: {pct}%");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dataset, Init, NetworkBuilder};

    fn toy_data() -> Dataset {
        Dataset::from_rows(
            &[
                vec![1.0, 0.0],
                vec![0.0, 1.0],
                vec![0.9, 0.2],
                vec![0.1, 0.8],
            ],
            &[
                vec![1.0, 0.0],
                vec![0.0, 1.0],
                vec![1.0, 0.0],
                vec![0.0, 1.0],
            ],
        )
        .unwrap()
    }

    fn toy_network() -> Network {
        NetworkBuilder::new(2)
            .unwrap()
            .linear(2, Init::Uniform { low: -0.1, high: 0.1 })
            .unwrap()
            .softmax()
            .build_with_seed(5)
            .unwrap()
    }

    fn config(epochs: usize) -> TrainConfig {
        TrainConfig {
            epochs,
            learning_rate: 0.5,
            lr_schedule: LrSchedule::Constant,
            log_every: 2,
            eval_every: Some(3),
        }
    }

    #[test]
    fn lr_schedules() {
        assert_eq!(LrSchedule::Constant.lr_at(0.1, 7), 0.1);

        let halving = LrSchedule::Step {
            step_size: 1,
            gamma: 0.5,
        };
        assert_eq!(halving.lr_at(1.0, 0), 1.0);
        assert_eq!(halving.lr_at(1.0, 3), 0.125);

        let every_two = LrSchedule::Step {
            step_size: 2,
            gamma: 0.1,
        };
        assert_eq!(every_two.lr_at(1.0, 1), 1.0);
        assert!((every_two.lr_at(1.0, 2) - 0.1).abs() < 1e-7);

        let exp = LrSchedule::Exponential { gamma: 0.5 };
        assert_eq!(exp.lr_at(2.0, 2), 0.5);
    }

    #[test]
    fn config_validation_rejects_bad_values() {
        assert!(TrainConfig::default().validate().is_ok());

        let bad = [
            TrainConfig {
                epochs: 0,
                ..TrainConfig::default()
            },
            TrainConfig {
                learning_rate: -1.0,
                ..TrainConfig::default()
            },
            TrainConfig {
                log_every: 0,
                ..TrainConfig::default()
            },
            TrainConfig {
                eval_every: Some(0),
                ..TrainConfig::default()
            },
            TrainConfig {
                lr_schedule: LrSchedule::Step {
                    step_size: 0,
                    gamma: 0.5,
                },
                ..TrainConfig::default()
            },
        ];
        for cfg in bad {
            assert!(
                matches!(cfg.validate(), Err(Error::InvalidConfig(_))),
                "{cfg:?}"
            );
        }
    }

    #[test]
    fn train_step_reports_loss_and_classes() {
        let mut net = toy_network();
        let sample = toy_data().sample(1).unwrap();
        let step = train_step(&mut net, Loss::CrossEntropy, sample, 0.1).unwrap();
        assert!(step.loss > 0.0);
        assert_eq!(step.target_class, 1);
        assert_eq!(step.target.as_slice(), &[0.0, 1.0]);
        assert_eq!(step.output.shape(), &[1, 2]);
    }

    #[test]
    fn trainer_walks_phases_and_stops() {
        let data = toy_data();
        let mut trainer = Trainer::new(toy_network(), Loss::CrossEntropy, config(2)).unwrap();
        assert_eq!(trainer.phase(), Phase::Init);

        trainer.run_epoch(&data, None).unwrap();
        assert_eq!(trainer.phase(), Phase::Training { epochs_done: 1 });

        let report = trainer.fit(&data, Some(&data)).unwrap();
        assert_eq!(report.epochs.len(), 1);
        assert_eq!(report.epochs[0].epoch, 1);
        assert!(report.epochs[0].eval.is_some());
        assert_eq!(trainer.phase(), Phase::Done);

        assert!(matches!(
            trainer.run_epoch(&data, None),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn empty_eval_set_is_skipped_not_fatal() {
        let data = toy_data();
        let empty = Dataset::empty(2, 2).unwrap();

        let net = toy_network();
        assert!(matches!(
            evaluate(&net, &empty),
            Err(Error::UndefinedAccuracy)
        ));

        let mut trainer = Trainer::new(net, Loss::CrossEntropy, config(1)).unwrap();
        let report = trainer.fit(&data, Some(&empty)).unwrap();
        assert!(report.epochs[0].eval.is_none());
        assert!(report.epochs[0].mean_loss.is_finite());
    }

    #[test]
    fn empty_train_set_is_rejected() {
        let empty = Dataset::empty(2, 2).unwrap();
        let mut trainer = Trainer::new(toy_network(), Loss::CrossEntropy, config(1)).unwrap();
        assert!(matches!(
            trainer.fit(&empty, None),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn shape_errors_abort_the_run() {
        let wide = Dataset::from_rows(&[vec![1.0, 0.0, 0.0]], &[vec![1.0, 0.0]]).unwrap();
        let mut trainer = Trainer::new(toy_network(), Loss::CrossEntropy, config(1)).unwrap();
        assert!(matches!(
            trainer.fit(&wide, None),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn evaluate_counts_argmax_matches() {
        let data = toy_data();
        let mut trainer = Trainer::new(toy_network(), Loss::CrossEntropy, config(20)).unwrap();
        trainer.fit(&data, None).unwrap();

        let net = trainer.into_network();
        let report = evaluate(&net, &data).unwrap();
        assert_eq!(report.total, 4);
        assert_eq!(report.correct, 4);
        assert_eq!(report.accuracy, 100.0);
    }
}
