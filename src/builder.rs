//! Network builder.
//!
//! `NetworkBuilder` fixes the depth and layer order once, at configuration
//! time. The training loop then drives the resulting [`Network`] generically.
//!
//! ```rust
//! use ffnet::{Init, NetworkBuilder};
//!
//! # fn main() -> ffnet::Result<()> {
//! let net = NetworkBuilder::new(784)?
//!     .linear(300, Init::Uniform { low: -0.01, high: 0.01 })?
//!     .relu()
//!     .linear(10, Init::Uniform { low: -0.01, high: 0.01 })?
//!     .softmax()
//!     .build_with_seed(0)?;
//! assert_eq!(net.num_layers(), 4);
//! # Ok(())
//! # }
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Error, Init, Layer, Linear, Network, Relu, Result, Softmax};

#[derive(Debug, Clone, Copy)]
enum LayerSpec {
    Linear { in_dim: usize, out_dim: usize, init: Init },
    Relu,
    Softmax,
}

#[derive(Debug, Clone)]
pub struct NetworkBuilder {
    input_dim: usize,
    dim: usize,
    layers: Vec<LayerSpec>,
}

impl NetworkBuilder {
    /// Start a network that accepts inputs with trailing dimension `input_dim`.
    pub fn new(input_dim: usize) -> Result<Self> {
        if input_dim == 0 {
            return Err(Error::InvalidConfig("input_dim must be > 0".to_owned()));
        }
        Ok(Self {
            input_dim,
            dim: input_dim,
            layers: Vec::new(),
        })
    }

    /// Classifier shape: `Linear → ReLU` for every hidden size, then a final
    /// `Linear → Softmax`.
    ///
    /// `sizes` includes input and output dimensions.
    pub fn classifier(sizes: &[usize], init: Init) -> Result<Self> {
        let [input_dim, hidden @ .., output_dim] = sizes else {
            return Err(Error::InvalidConfig(
                "sizes must include input and output dims".to_owned(),
            ));
        };

        let mut b = Self::new(*input_dim)?;
        for &h in hidden {
            b = b.linear(h, init)?.relu();
        }
        Ok(b.linear(*output_dim, init)?.softmax())
    }

    pub fn linear(mut self, out_dim: usize, init: Init) -> Result<Self> {
        if out_dim == 0 {
            return Err(Error::InvalidConfig("linear out_dim must be > 0".to_owned()));
        }
        self.layers.push(LayerSpec::Linear {
            in_dim: self.dim,
            out_dim,
            init,
        });
        self.dim = out_dim;
        Ok(self)
    }

    pub fn relu(mut self) -> Self {
        self.layers.push(LayerSpec::Relu);
        self
    }

    pub fn softmax(mut self) -> Self {
        self.layers.push(LayerSpec::Softmax);
        self
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Trailing dimension produced by the layers added so far.
    #[inline]
    pub fn output_dim(&self) -> usize {
        self.dim
    }

    pub fn build_with_seed(self, seed: u64) -> Result<Network> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.build_with_rng(&mut rng)
    }

    /// Weights are drawn in layer order, so a given RNG state always yields
    /// the same network.
    pub fn build_with_rng<R: Rng + ?Sized>(self, rng: &mut R) -> Result<Network> {
        let mut layers = Vec::with_capacity(self.layers.len());
        for spec in self.layers {
            let layer = match spec {
                LayerSpec::Linear {
                    in_dim,
                    out_dim,
                    init,
                } => Layer::from(Linear::random(in_dim, out_dim, init, rng)?),
                LayerSpec::Relu => Layer::from(Relu::new()),
                LayerSpec::Softmax => Layer::from(Softmax::new()),
            };
            layers.push(layer);
        }
        Network::from_layers(layers)
    }
}
