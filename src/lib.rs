//! A small feed-forward network trainer with hand-written backpropagation.
//!
//! `ffnet` builds classifiers out of three layer kinds ([`Linear`], [`Relu`],
//! [`Softmax`]) and two losses ([`Loss::CrossEntropy`],
//! [`Loss::MeanSquaredError`]). There is no autodiff graph: every layer
//! implements its own forward transform and its exact gradient, and
//! [`Network`] composes them by walking an ordered list forward and then in
//! reverse.
//!
//! # Contracts
//!
//! - Scalars are `f32`; [`Tensor`]s are row-major and viewed as matrices with
//!   the last dimension as columns.
//! - `backward` on a layer must receive the same input its matching `forward`
//!   received, and consumes that forward's record: calling it twice, or
//!   without a forward, fails with [`Error::MissingForward`].
//! - A linear layer's weight gradient is consumed by exactly one
//!   `update_weights`; a second call fails with [`Error::NoGradientAvailable`].
//! - [`Loss::backward`] always returns the derivative of [`Loss::forward`]
//!   with respect to its predictions. [`Network::backward_loss`] is the
//!   training entry point: for a softmax output under cross-entropy it seeds
//!   the backward pass with `probs - target` at the logits, which stays exact
//!   when the softmax saturates.
//! - [`Network::predict`] never touches forward records, so it can run
//!   between a `forward` and its `backward`.
//!
//! # Quick start
//!
//! ```rust
//! use ffnet::{Dataset, Init, Loss, NetworkBuilder, TrainConfig, Trainer};
//!
//! # fn main() -> ffnet::Result<()> {
//! let train = Dataset::from_rows(
//!     &[vec![1.0, 0.0], vec![0.0, 1.0]],
//!     &[vec![1.0, 0.0], vec![0.0, 1.0]],
//! )?;
//!
//! let net = NetworkBuilder::new(2)?
//!     .linear(8, Init::He)?
//!     .relu()
//!     .linear(2, Init::Xavier)?
//!     .softmax()
//!     .build_with_seed(0)?;
//!
//! let cfg = TrainConfig {
//!     epochs: 50,
//!     learning_rate: 0.1,
//!     ..TrainConfig::default()
//! };
//! let mut trainer = Trainer::new(net, Loss::CrossEntropy, cfg)?;
//! let report = trainer.fit(&train, Some(&train))?;
//! assert_eq!(report.epochs.len(), 50);
//! # Ok(())
//! # }
//! ```
//!
//! # Manual training step
//!
//! ```rust
//! use ffnet::{Init, Loss, NetworkBuilder, Tensor};
//!
//! # fn main() -> ffnet::Result<()> {
//! let mut net = NetworkBuilder::new(3)?
//!     .linear(2, Init::Xavier)?
//!     .softmax()
//!     .build_with_seed(0)?;
//!
//! let x = Tensor::new(vec![1, 3], vec![0.1, -0.2, 0.3])?;
//! let t = Tensor::new(vec![1, 2], vec![0.0, 1.0])?;
//!
//! let trace = net.forward(x)?;
//! net.backward_loss(&trace, Loss::CrossEntropy, &t)?;
//! net.update_weights(1e-2)?;
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod builder;
#[cfg(feature = "serde")]
pub mod config;
pub mod data;
pub mod error;
pub mod layer;
pub mod linear;
pub mod loss;
pub(crate) mod matmul;
pub mod metrics;
pub mod mnist;
pub mod network;
pub mod tensor;
pub mod train;

#[cfg(test)]
pub(crate) mod testutil;

pub use activation::{Relu, Softmax};
pub use builder::NetworkBuilder;
#[cfg(feature = "serde")]
pub use config::RunConfig;
pub use data::{DataSource, Dataset, Sample};
pub use error::{Error, Result};
pub use layer::{Init, Layer};
pub use linear::Linear;
pub use loss::Loss;
pub use metrics::{Accuracy, RunningMean};
pub use network::{Network, Trace};
pub use tensor::Tensor;
pub use train::{
    EpochReport, EvalReport, FitReport, LrSchedule, Phase, StepReport, TrainConfig, Trainer,
    evaluate, train_step,
};
