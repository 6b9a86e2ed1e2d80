// ============================================================
// Layer 3 — Architecture & Shape Inference
// ============================================================
// An Architecture is an ordered list of LayerSpecs. Before any
// tensors are allocated, `infer` walks the list and checks that
// every layer's output shape feeds the next one:
//
//   (28, 28, 1) ─conv2d same─▶ (28, 28, 32) ─pool 2─▶ (14, 14, 32)
//               ─flatten─▶ 6272 ─dense─▶ 64 ─dense─▶ 10
//
// The same walk yields the per-layer parameter counts printed
// in the model summary.

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::layer::{
    Activation, Conv2dSpec, DenseSpec, InputSpec, LayerSpec, Padding, PoolSpec, Shape,
};

/// Number of digit classes (0..=9)
pub const DIGIT_CLASSES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Architecture {
    layers: Vec<LayerSpec>,
}

/// Result of shape inference for one layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerInfo {
    /// Unique display name, e.g. `dense_1`
    pub name:   String,
    pub spec:   LayerSpec,
    pub output: Shape,
    pub params: usize,
}

impl Architecture {
    pub fn new(layers: Vec<LayerSpec>) -> Self {
        Self { layers }
    }

    /// The digit classifier trained by `digit-cnn run` when no
    /// description file is given.
    pub fn digit_cnn() -> Self {
        Self::new(vec![
            LayerSpec::Input(InputSpec { height: 28, width: 28, channels: 1 }),
            LayerSpec::Conv2d(Conv2dSpec {
                filters:    32,
                kernel:     3,
                activation: Activation::Relu,
                padding:    Padding::Same,
            }),
            LayerSpec::MaxPool2d(PoolSpec { size: 2 }),
            LayerSpec::Flatten,
            LayerSpec::Dense(DenseSpec { units: 64, activation: Activation::Relu }),
            LayerSpec::Dense(DenseSpec {
                units:      DIGIT_CLASSES,
                activation: Activation::Softmax,
            }),
        ])
    }

    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    /// The declared input shape, if the first layer is an Input layer
    pub fn input(&self) -> Option<InputSpec> {
        match self.layers.first() {
            Some(LayerSpec::Input(spec)) => Some(*spec),
            _ => None,
        }
    }

    /// Spec of the final layer, which must be Dense for a valid network
    pub fn output(&self) -> Option<DenseSpec> {
        match self.layers.last() {
            Some(LayerSpec::Dense(spec)) => Some(*spec),
            _ => None,
        }
    }

    /// Walk the layers, checking that shapes chain, and return one
    /// LayerInfo per layer (Input included).
    pub fn infer(&self) -> Result<Vec<LayerInfo>> {
        let Some(input) = self.input() else {
            bail!("the first layer must be an input layer");
        };
        if input.height == 0 || input.width == 0 || input.channels == 0 {
            bail!(
                "input shape ({}, {}, {}) must be non-zero in every dimension",
                input.height, input.width, input.channels
            );
        }
        if self.output().is_none() {
            bail!("the last layer must be a dense (output) layer");
        }

        let mut shape = Shape::Image {
            height:   input.height,
            width:    input.width,
            channels: input.channels,
        };
        let mut names = Namer::default();
        let mut infos = Vec::with_capacity(self.layers.len());

        for (index, spec) in self.layers.iter().enumerate() {
            let (output, params) = match (spec, shape) {
                (LayerSpec::Input(_), _) if index == 0 => (shape, 0),
                (LayerSpec::Input(_), _) => {
                    bail!("layer {index}: an input layer may only appear first")
                }

                (LayerSpec::Conv2d(c), Shape::Image { height, width, channels }) => {
                    if c.filters == 0 || c.kernel == 0 {
                        bail!("layer {index} (Conv2D): filters and kernel must be positive");
                    }
                    let (h, w) = match c.padding {
                        Padding::Same => {
                            if c.kernel % 2 == 0 {
                                bail!(
                                    "layer {index} (Conv2D): same padding needs an odd kernel, got {}",
                                    c.kernel
                                );
                            }
                            (height, width)
                        }
                        Padding::Valid => {
                            if c.kernel > height || c.kernel > width {
                                bail!(
                                    "layer {index} (Conv2D): kernel {} does not fit a {height}x{width} input",
                                    c.kernel
                                );
                            }
                            (height - c.kernel + 1, width - c.kernel + 1)
                        }
                    };
                    let params = c.kernel
                        .checked_mul(c.kernel)
                        .and_then(|k| k.checked_mul(channels))
                        .and_then(|k| k.checked_mul(c.filters))
                        .and_then(|w| w.checked_add(c.filters))
                        .ok_or_else(|| anyhow!("layer {index} (Conv2D): size overflows"))?;
                    (Shape::Image { height: h, width: w, channels: c.filters }, params)
                }

                (LayerSpec::MaxPool2d(p), Shape::Image { height, width, channels }) => {
                    if p.size == 0 || p.size > height || p.size > width {
                        bail!(
                            "layer {index} (MaxPooling2D): window {} does not fit a {height}x{width} input",
                            p.size
                        );
                    }
                    (
                        Shape::Image { height: height / p.size, width: width / p.size, channels },
                        0,
                    )
                }

                (LayerSpec::Flatten, current) => {
                    let n = current
                        .numel()
                        .ok_or_else(|| anyhow!("layer {index} (Flatten): size overflows"))?;
                    (Shape::Vector(n), 0)
                }

                (LayerSpec::Dense(d), Shape::Vector(n)) => {
                    if d.units == 0 {
                        bail!("layer {index} (Dense): units must be positive");
                    }
                    let params = n
                        .checked_mul(d.units)
                        .and_then(|w| w.checked_add(d.units))
                        .ok_or_else(|| anyhow!("layer {index} (Dense): size overflows"))?;
                    (Shape::Vector(d.units), params)
                }

                (LayerSpec::Conv2d(_) | LayerSpec::MaxPool2d(_), Shape::Vector(n)) => bail!(
                    "layer {index} ({}): needs an image input but receives a vector of {n}",
                    spec.kind()
                ),
                (LayerSpec::Dense(_), image @ Shape::Image { .. }) => bail!(
                    "layer {index} (Dense): receives image {image}; add a flatten layer first"
                ),
            };

            infos.push(LayerInfo { name: names.next(spec), spec: *spec, output, params });
            shape = output;
        }

        Ok(infos)
    }

    /// Total trainable parameters
    pub fn param_count(&self) -> Result<usize> {
        sum_params(&self.infer()?)
    }

    /// Build the printable summary table
    pub fn summary(&self, name: &str) -> Result<Summary> {
        let layers = self.infer()?;
        let total_params = sum_params(&layers)?;
        Ok(Summary { name: name.to_string(), layers, total_params })
    }
}

fn sum_params(layers: &[LayerInfo]) -> Result<usize> {
    layers
        .iter()
        .try_fold(0usize, |total, l| total.checked_add(l.params))
        .ok_or_else(|| anyhow!("parameter count overflows"))
}

/// Hands out `conv2d`, `conv2d_1`, `conv2d_2`, ... per layer kind
#[derive(Default)]
struct Namer {
    seen: std::collections::HashMap<&'static str, usize>,
}

impl Namer {
    fn next(&mut self, spec: &LayerSpec) -> String {
        let base  = spec.base_name();
        let count = self.seen.entry(base).or_insert(0);
        let name  = if *count == 0 { base.to_string() } else { format!("{base}_{count}") };
        *count += 1;
        name
    }
}

/// Keras-style model summary
#[derive(Debug, Clone)]
pub struct Summary {
    pub name:         String,
    pub layers:       Vec<LayerInfo>,
    pub total_params: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const RULE: &str =
            "─────────────────────────────────────────────────────────────────";
        writeln!(f, "Model: \"{}\"", self.name)?;
        writeln!(f, "{RULE}")?;
        writeln!(f, "{:<32}{:<24}{:>9}", "Layer (type)", "Output Shape", "Param #")?;
        writeln!(f, "{RULE}")?;
        // The input layer is implied by the first real layer's shape
        for layer in self.layers.iter().filter(|l| !matches!(l.spec, LayerSpec::Input(_))) {
            writeln!(
                f,
                "{:<32}{:<24}{:>9}",
                format!("{} ({})", layer.name, layer.spec.kind()),
                layer.output.to_string(),
                group_thousands(layer.params),
            )?;
        }
        writeln!(f, "{RULE}")?;
        writeln!(f, "Total params: {}", group_thousands(self.total_params))?;
        writeln!(f, "Trainable params: {}", group_thousands(self.total_params))?;
        write!(f, "Non-trainable params: 0")
    }
}

/// 402442 → "402,442"
pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
