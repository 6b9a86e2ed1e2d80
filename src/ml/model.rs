// ============================================================
// Layer 5 — Digit Classifier (Burn module)
// ============================================================
// Turns a validated Architecture into real Burn modules.
//
// A valid architecture always has the same outline:
//
//   input → (conv2d | maxpool2d)* → flatten+ → dense+
//
// so the model keeps two ordered stage lists: the feature
// extractor working on images and the dense head working on
// vectors. Stage plans are plain data and are stored as
// `Ignored` so they are not treated as parameters.
//
// Tensor layout:
//   - callers pass images channels-last [N, H, W, C]
//   - Burn's conv/pool kernels work channels-first [N, C, H, W]
//   - flatten happens in H×W×C order, so Dense weights line up
//     with a channels-last feature map

use anyhow::Result;
use burn::{
    module::Ignored,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation,
};

use crate::domain::architecture::Architecture;
use crate::domain::layer::{Activation, LayerSpec, Padding, Shape};

/// One step of the convolutional feature extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureStage {
    /// Index into `convs`, followed by the activation
    Conv(usize, Activation),
    /// Index into `pools`
    Pool(usize),
}

#[derive(Module, Debug)]
pub struct DigitClassifier<B: Backend> {
    pub convs:             Vec<Conv2d<B>>,
    pub pools:             Vec<MaxPool2d>,
    pub denses:            Vec<Linear<B>>,
    pub features:          Ignored<Vec<FeatureStage>>,
    pub dense_activations: Ignored<Vec<Activation>>,
}

impl<B: Backend> DigitClassifier<B> {
    /// Validate `architecture` and instantiate its layers on `device`.
    ///
    /// Weights come from Burn's default initialisers; seed the backend
    /// with `B::seed` beforehand for reproducible weights.
    pub fn new(architecture: &Architecture, device: &B::Device) -> Result<Self> {
        let infos = architecture.infer()?;

        let mut convs             = Vec::new();
        let mut pools             = Vec::new();
        let mut denses            = Vec::new();
        let mut features          = Vec::new();
        let mut dense_activations = Vec::new();

        let mut previous: Option<Shape> = None;
        for info in &infos {
            match (info.spec, previous) {
                (LayerSpec::Conv2d(c), Some(Shape::Image { channels, .. })) => {
                    let padding = match c.padding {
                        Padding::Same  => PaddingConfig2d::Same,
                        Padding::Valid => PaddingConfig2d::Valid,
                    };
                    features.push(FeatureStage::Conv(convs.len(), c.activation));
                    convs.push(
                        Conv2dConfig::new([channels, c.filters], [c.kernel, c.kernel])
                            .with_padding(padding)
                            .init(device),
                    );
                }
                (LayerSpec::MaxPool2d(p), _) => {
                    features.push(FeatureStage::Pool(pools.len()));
                    pools.push(
                        MaxPool2dConfig::new([p.size, p.size])
                            .with_strides([p.size, p.size])
                            .init(),
                    );
                }
                (LayerSpec::Dense(d), Some(Shape::Vector(inputs))) => {
                    tracing::debug!("{}: {} -> {} ({})", info.name, inputs, d.units, d.activation.name());
                    denses.push(LinearConfig::new(inputs, d.units).init(device));
                    dense_activations.push(d.activation);
                }
                // Input and Flatten own no parameters
                _ => {}
            }
            previous = Some(info.output);
        }

        tracing::debug!(
            "Built classifier: {} conv, {} pool, {} dense layers",
            convs.len(),
            pools.len(),
            denses.len(),
        );

        Ok(Self {
            convs,
            pools,
            denses,
            features:          Ignored(features),
            dense_activations: Ignored(dense_activations),
        })
    }

    /// Activation applied by the final Dense layer
    pub fn output_activation(&self) -> Activation {
        self.dense_activations.0.last().copied().unwrap_or(Activation::Linear)
    }

    /// images: [N, H, W, C] → pre-activation of the final layer [N, classes]
    pub fn forward_logits(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut x = images.permute([0, 3, 1, 2]);

        for stage in self.features.0.iter() {
            x = match *stage {
                FeatureStage::Conv(i, act) => activate(self.convs[i].forward(x), act),
                FeatureStage::Pool(i)      => self.pools[i].forward(x),
            };
        }

        // Back to channels-last before flattening
        let mut x: Tensor<B, 2> = x.permute([0, 2, 3, 1]).flatten(1, 3);

        let last = self.denses.len().saturating_sub(1);
        for (i, (dense, act)) in self.denses.iter().zip(self.dense_activations.0.iter()).enumerate() {
            x = dense.forward(x);
            if i < last {
                x = activate(x, *act);
            }
        }
        x
    }

    /// images: [N, H, W, C] → network output [N, classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        activate(self.forward_logits(images), self.output_activation())
    }
}

/// Apply `act` element-wise; softmax normalises over dimension 1
/// (classes for [N, classes], channels for [N, C, H, W]).
pub fn activate<B: Backend, const D: usize>(x: Tensor<B, D>, act: Activation) -> Tensor<B, D> {
    match act {
        Activation::Relu    => activation::relu(x),
        Activation::Softmax => activation::softmax(x, 1),
        Activation::Sigmoid => activation::sigmoid(x),
        Activation::Tanh    => activation::tanh(x),
        Activation::Linear  => x,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::layer::{Conv2dSpec, DenseSpec, InputSpec, PoolSpec};
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn digit_model() -> DigitClassifier<TestBackend> {
        let device = Default::default();
        DigitClassifier::new(&Architecture::digit_cnn(), &device).unwrap()
    }

    #[test]
    fn test_output_shape_and_softmax_rows() {
        let model  = digit_model();
        let device = Default::default();
        let images = Tensor::<TestBackend, 4>::random(
            [3, 28, 28, 1],
            burn::tensor::Distribution::Uniform(0.0, 1.0),
            &device,
        );

        let out = model.forward(images);
        assert_eq!(out.dims(), [3, 10]);

        let sums: Vec<f32> = out.sum_dim(1).into_data().to_vec().unwrap();
        for s in sums {
            assert!((s - 1.0).abs() < 1e-5, "row sums to {s}");
        }
    }

    #[test]
    fn test_parameter_count_matches_architecture() {
        let model = digit_model();
        assert_eq!(model.num_params(), 402_442);
        assert_eq!(model.num_params(), Architecture::digit_cnn().param_count().unwrap());
    }

    #[test]
    fn test_layer_inventory() {
        let model = digit_model();
        assert_eq!(model.convs.len(), 1);
        assert_eq!(model.pools.len(), 1);
        assert_eq!(model.denses.len(), 2);
        assert_eq!(
            model.features.0,
            vec![FeatureStage::Conv(0, Activation::Relu), FeatureStage::Pool(0)]
        );
        assert_eq!(model.output_activation(), Activation::Softmax);
    }

    #[test]
    fn test_valid_padding_and_deeper_stack() {
        let arch = Architecture::new(vec![
            LayerSpec::Input(InputSpec { height: 12, width: 12, channels: 2 }),
            LayerSpec::Conv2d(Conv2dSpec {
                filters:    4,
                kernel:     3,
                activation: Activation::Tanh,
                padding:    Padding::Valid,
            }),
            LayerSpec::MaxPool2d(PoolSpec { size: 2 }),
            LayerSpec::Flatten,
            LayerSpec::Dense(DenseSpec { units: 5, activation: Activation::Sigmoid }),
            LayerSpec::Dense(DenseSpec { units: 3, activation: Activation::Linear }),
        ]);
        let device = Default::default();
        let model  = DigitClassifier::<TestBackend>::new(&arch, &device).unwrap();
        assert_eq!(model.num_params(), arch.param_count().unwrap());

        let images = Tensor::<TestBackend, 4>::zeros([2, 12, 12, 2], &device);
        assert_eq!(model.forward(images).dims(), [2, 3]);
    }

    #[test]
    fn test_invalid_architecture_is_rejected() {
        let arch = Architecture::new(vec![
            LayerSpec::Input(InputSpec { height: 28, width: 28, channels: 1 }),
            LayerSpec::Dense(DenseSpec { units: 10, activation: Activation::Softmax }),
        ]);
        let device = Default::default();
        assert!(DigitClassifier::<TestBackend>::new(&arch, &device).is_err());
    }

    #[test]
    fn test_flatten_only_network() {
        let arch = Architecture::new(vec![
            LayerSpec::Input(InputSpec { height: 2, width: 2, channels: 1 }),
            LayerSpec::Flatten,
            LayerSpec::Dense(DenseSpec { units: 4, activation: Activation::Linear }),
        ]);
        let device = Default::default();
        let model  = DigitClassifier::<TestBackend>::new(&arch, &device).unwrap();
        assert!(model.features.0.is_empty());
        assert_eq!(model.output_activation(), Activation::Linear);

        let images = Tensor::<TestBackend, 1>::from_floats([1.0, 2.0, 3.0, 4.0], &device)
            .reshape([1, 2, 2, 1]);
        assert_eq!(model.forward(images).dims(), [1, 4]);
    }
}
