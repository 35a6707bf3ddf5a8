use crate::{Error, Layer, Linear, Loss, Result, Tensor};

/// An ordered chain of layers.
///
/// The chain is walked front to back by [`Network::forward`] and back to front
/// by [`Network::backward`]; nothing else about the topology is assumed.
#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<Layer>,
}

/// The inputs each layer saw during one forward pass, plus the final output.
///
/// `backward` hands `inputs[i]` back to layer `i`, which is how each layer gets
/// the same tensor it was given in `forward`.
#[derive(Debug, Clone)]
pub struct Trace {
    inputs: Vec<Tensor>,
    output: Tensor,
}

impl Trace {
    #[inline]
    pub fn output(&self) -> &Tensor {
        &self.output
    }

    pub fn into_output(self) -> Tensor {
        self.output
    }

    /// The network input (the input of layer 0).
    #[inline]
    pub fn input(&self) -> &Tensor {
        &self.inputs[0]
    }

    #[inline]
    pub fn layer_input(&self, idx: usize) -> Option<&Tensor> {
        self.inputs.get(idx)
    }
}

impl Network {
    pub fn from_layers(layers: Vec<Layer>) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::InvalidConfig(
                "network must have at least one layer".to_owned(),
            ));
        }
        Ok(Self { layers })
    }

    #[inline]
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    #[inline]
    pub fn layer(&self, idx: usize) -> Option<&Layer> {
        self.layers.get(idx)
    }

    #[inline]
    pub fn layer_mut(&mut self, idx: usize) -> Option<&mut Layer> {
        self.layers.get_mut(idx)
    }

    /// Parameterized layers, in chain order.
    pub fn linear_layers(&self) -> impl Iterator<Item = &Linear> {
        self.layers.iter().filter_map(Layer::as_linear)
    }

    /// Forward pass that keeps every intermediate input for a later backward.
    pub fn forward(&mut self, input: Tensor) -> Result<Trace> {
        let mut inputs = Vec::with_capacity(self.layers.len());
        let mut x = input;
        for layer in &mut self.layers {
            let y = layer.forward(&x)?;
            inputs.push(x);
            x = y;
        }
        Ok(Trace { inputs, output: x })
    }

    /// Forward pass for inference only. Forward records are left as they
    /// were, so a pending backward is unaffected.
    pub fn predict(&self, input: &Tensor) -> Result<Tensor> {
        let (first, rest) = self
            .layers
            .split_first()
            .ok_or_else(|| Error::InvalidConfig("network has no layers".to_owned()))?;
        let mut x = first.apply(input)?;
        for layer in rest {
            x = layer.apply(&x)?;
        }
        Ok(x)
    }

    /// Backward pass in strictly reverse layer order.
    ///
    /// `output_grad` is `dL/d(output)` for the output in `trace`. Each
    /// parameterized layer keeps its weight gradient until
    /// [`Network::update_weights`]. Returns `dL/d(input)`.
    pub fn backward(&mut self, trace: &Trace, output_grad: Tensor) -> Result<Tensor> {
        self.check_trace(trace)?;
        self.backward_through(trace, self.layers.len(), output_grad)
    }

    /// Backward pass seeded by `loss` against `target`.
    ///
    /// When the last layer is [`Softmax`](crate::Softmax) and the loss is
    /// cross-entropy, the softmax Jacobian and the raw cross-entropy gradient
    /// are replaced by their product `probs - target`, taken with respect to
    /// the logits. Otherwise this is `loss.backward` followed by
    /// [`Network::backward`].
    pub fn backward_loss(&mut self, trace: &Trace, loss: Loss, target: &Tensor) -> Result<Tensor> {
        self.check_trace(trace)?;
        let last = self.layers.len() - 1;

        if loss == Loss::CrossEntropy {
            if let Some(Layer::Softmax(softmax)) = self.layers.last_mut() {
                let d_logits = softmax.backward_cross_entropy(&trace.inputs[last], target)?;
                return self.backward_through(trace, last, d_logits);
            }
        }

        let output_grad = loss.backward(trace.output(), target)?;
        self.backward_through(trace, self.layers.len(), output_grad)
    }

    fn check_trace(&self, trace: &Trace) -> Result<()> {
        if trace.inputs.len() != self.layers.len() {
            return Err(Error::ShapeMismatch(format!(
                "trace has {} layer inputs, network has {} layers",
                trace.inputs.len(),
                self.layers.len()
            )));
        }
        Ok(())
    }

    /// Walks layers `0..end` in reverse, starting from `dL/d(output of end - 1)`.
    fn backward_through(&mut self, trace: &Trace, end: usize, grad: Tensor) -> Result<Tensor> {
        let mut grad = grad;
        for (layer, input) in self.layers[..end].iter_mut().zip(&trace.inputs).rev() {
            grad = layer.backward(input, &grad)?;
        }
        Ok(grad)
    }

    /// Apply the pending gradient of every parameterized layer.
    ///
    /// No two layers share parameters, so the order does not matter.
    pub fn update_weights(&mut self, lr: f32) -> Result<()> {
        for layer in self.layers.iter_mut().filter(|l| l.is_parameterized()) {
            layer.update_weights(lr)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{assert_close, numeric_grad};
    use crate::{Init, Loss, NetworkBuilder};

    fn small_network(seed: u64) -> Network {
        NetworkBuilder::new(3)
            .unwrap()
            .linear(4, Init::Xavier)
            .unwrap()
            .relu()
            .linear(3, Init::Xavier)
            .unwrap()
            .softmax()
            .build_with_seed(seed)
            .unwrap()
    }

    fn loss_for(net: &Network, x: &Tensor, target: &Tensor) -> f32 {
        let probs = net.predict(x).unwrap();
        Loss::CrossEntropy.forward(&probs, target).unwrap()
    }

    fn linear_at(net: &Network, idx: usize) -> Linear {
        net.layer(idx).unwrap().as_linear().unwrap().clone()
    }

    #[test]
    fn seeded_build_is_deterministic() {
        let a = small_network(123);
        let b = small_network(123);
        let x = Tensor::new(vec![1, 3], vec![0.3, -0.7, 0.1]).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn forward_trace_records_each_layer_input() {
        let mut net = small_network(0);
        let x = Tensor::new(vec![1, 3], vec![0.3, -0.7, 0.1]).unwrap();
        let trace = net.forward(x.clone()).unwrap();

        assert_eq!(trace.input(), &x);
        assert_eq!(trace.layer_input(1).unwrap().shape(), &[1, 4]);
        assert_eq!(trace.layer_input(3).unwrap().shape(), &[1, 3]);
        assert!(trace.layer_input(4).is_none());
        assert_eq!(trace.output(), &net.predict(&x).unwrap());
    }

    #[test]
    fn backward_matches_numeric_gradients() {
        let mut net = small_network(0);
        let x = Tensor::new(vec![1, 3], vec![0.5, -0.4, 0.9]).unwrap();
        let target = Tensor::new(vec![1, 3], vec![0.0, 0.0, 1.0]).unwrap();
        let reference = net.clone();

        let trace = net.forward(x.clone()).unwrap();
        let d_out = Loss::CrossEntropy.backward(trace.output(), &target).unwrap();
        let d_x = net.backward(&trace, d_out).unwrap();

        let numeric = numeric_grad(&x, |xp| loss_for(&reference, xp, &target));
        for (&a, &n) in d_x.as_slice().iter().zip(&numeric) {
            assert_close(a, n, 1e-3, 1e-2);
        }

        for layer_idx in [0, 2] {
            let w = linear_at(&reference, layer_idx).weights().clone();
            let numeric = numeric_grad(&w, |wp| {
                let mut perturbed = reference.clone();
                let linear = perturbed.layer_mut(layer_idx).unwrap().as_linear_mut().unwrap();
                *linear.weights_mut() = wp.clone();
                loss_for(&perturbed, &x, &target)
            });
            let trained = linear_at(&net, layer_idx);
            let analytic = trained.weight_grad().unwrap();
            for (&a, &n) in analytic.as_slice().iter().zip(&numeric) {
                assert_close(a, n, 1e-3, 1e-2);
            }
        }
    }

    #[test]
    fn backward_loss_matches_numeric_gradients() {
        let mut net = small_network(4);
        let x = Tensor::new(vec![1, 3], vec![-0.2, 0.7, 0.4]).unwrap();
        let target = Tensor::new(vec![1, 3], vec![0.0, 1.0, 0.0]).unwrap();
        let reference = net.clone();

        let trace = net.forward(x.clone()).unwrap();
        let d_x = net
            .backward_loss(&trace, Loss::CrossEntropy, &target)
            .unwrap();

        let numeric = numeric_grad(&x, |xp| loss_for(&reference, xp, &target));
        for (&a, &n) in d_x.as_slice().iter().zip(&numeric) {
            assert_close(a, n, 1e-3, 1e-2);
        }
    }

    #[test]
    fn backward_loss_keeps_full_gradient_for_saturated_softmax() {
        // Identity weights, so the logits are the input itself.
        let w = Tensor::new(vec![2, 2], vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        let mut net = Network::from_layers(vec![
            Linear::new(w).unwrap().into(),
            crate::Softmax::new().into(),
        ])
        .unwrap();
        let x = Tensor::new(vec![1, 2], vec![0.0, 30.0]).unwrap();
        let target = Tensor::new(vec![1, 2], vec![1.0, 0.0]).unwrap();

        let trace = net.forward(x).unwrap();
        let d_x = net
            .backward_loss(&trace, Loss::CrossEntropy, &target)
            .unwrap();
        assert_close(d_x.as_slice()[0], -1.0, 1e-6, 1e-6);
        assert_close(d_x.as_slice()[1], 1.0, 1e-6, 1e-6);

        // dL/dW = xᵀ (probs - target)
        let d_w = linear_at(&net, 0).weight_grad().unwrap().clone();
        let expected = [0.0, 0.0, -30.0, 30.0];
        for (&a, &e) in d_w.as_slice().iter().zip(&expected) {
            assert_close(a, e, 1e-4, 1e-6);
        }
    }

    #[test]
    fn predict_between_forward_and_backward_does_not_change_gradients() {
        let x1 = Tensor::new(vec![1, 3], vec![0.5, -0.4, 0.9]).unwrap();
        let x2 = Tensor::new(vec![1, 3], vec![-1.0, 2.0, 0.3]).unwrap();
        let target = Tensor::new(vec![1, 3], vec![0.0, 0.0, 1.0]).unwrap();

        let mut clean = small_network(9);
        let trace = clean.forward(x1.clone()).unwrap();
        let expected = clean
            .backward_loss(&trace, Loss::CrossEntropy, &target)
            .unwrap();

        let mut net = small_network(9);
        let trace = net.forward(x1.clone()).unwrap();
        net.predict(&x2).unwrap();
        let d_out = Loss::CrossEntropy.backward(trace.output(), &target).unwrap();
        let composed = net.backward(&trace, d_out).unwrap();
        for (&a, &e) in composed.as_slice().iter().zip(expected.as_slice()) {
            assert_close(a, e, 1e-5, 1e-4);
        }

        let mut net = small_network(9);
        let trace = net.forward(x1).unwrap();
        net.predict(&x2).unwrap();
        let fused = net
            .backward_loss(&trace, Loss::CrossEntropy, &target)
            .unwrap();
        assert_eq!(fused, expected);
    }

    #[test]
    fn backward_loss_with_mse_goes_through_softmax_jacobian() {
        let mut net = small_network(2);
        let x = Tensor::new(vec![1, 3], vec![0.1, 0.2, -0.3]).unwrap();
        let target = Tensor::new(vec![1, 3], vec![1.0, 0.0, 0.0]).unwrap();
        let reference = net.clone();

        let trace = net.forward(x.clone()).unwrap();
        let d_x = net
            .backward_loss(&trace, Loss::MeanSquaredError, &target)
            .unwrap();

        let numeric = numeric_grad(&x, |xp| {
            let probs = reference.predict(xp).unwrap();
            Loss::MeanSquaredError.forward(&probs, &target).unwrap()
        });
        for (&a, &n) in d_x.as_slice().iter().zip(&numeric) {
            assert_close(a, n, 1e-3, 1e-2);
        }
    }

    #[test]
    fn update_weights_needs_backward_first() {
        let mut net = small_network(0);
        assert!(matches!(
            net.update_weights(0.1),
            Err(Error::NoGradientAvailable)
        ));
    }

    #[test]
    fn backward_rejects_trace_from_another_network() {
        let mut net = small_network(0);
        let mut shallow = NetworkBuilder::new(3)
            .unwrap()
            .linear(3, Init::Xavier)
            .unwrap()
            .build_with_seed(0)
            .unwrap();
        let x = Tensor::new(vec![1, 3], vec![0.1, 0.2, 0.3]).unwrap();
        let trace = shallow.forward(x).unwrap();
        let grad = Tensor::zeros(vec![1, 3]).unwrap();
        assert!(matches!(
            net.backward(&trace, grad),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn from_layers_rejects_empty_chain() {
        assert!(matches!(
            Network::from_layers(vec![]),
            Err(Error::InvalidConfig(_))
        ));
    }
}
