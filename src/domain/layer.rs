// ============================================================
// Layer 3 — Layer Specifications
// ============================================================
// The closed set of layer kinds a network can be built from.
// Each variant carries its own typed parameters, so a `match`
// over LayerSpec is checked for exhaustiveness everywhere it
// is consumed (shape inference, summary, model building).
//
// Tensor layout used throughout the domain: (height, width, channels)
// for images, a plain unit count for vectors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Element-wise (or row-wise, for softmax) function applied after a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    Relu,
    Softmax,
    Sigmoid,
    Tanh,
    /// Identity, no activation
    Linear,
}

impl Activation {
    /// Look up an activation by its description-language name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "relu"    => Some(Self::Relu),
            "softmax" => Some(Self::Softmax),
            "sigmoid" => Some(Self::Sigmoid),
            "tanh"    => Some(Self::Tanh),
            "linear" | "none" => Some(Self::Linear),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Relu    => "relu",
            Self::Softmax => "softmax",
            Self::Sigmoid => "sigmoid",
            Self::Tanh    => "tanh",
            Self::Linear  => "linear",
        }
    }
}

/// Convolution border handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Padding {
    /// Output keeps the input's height and width
    Same,
    /// No padding; the kernel only visits full windows
    Valid,
}

impl Padding {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "same"  => Some(Self::Same),
            "valid" => Some(Self::Valid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSpec {
    pub height:   usize,
    pub width:    usize,
    pub channels: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conv2dSpec {
    /// Number of output feature maps
    pub filters:    usize,
    /// Square kernel side length
    pub kernel:     usize,
    pub activation: Activation,
    pub padding:    Padding,
}

/// Max pooling over square windows; the stride equals the window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSpec {
    pub size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenseSpec {
    pub units:      usize,
    pub activation: Activation,
}

/// One entry of a sequential network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayerSpec {
    Input(InputSpec),
    Conv2d(Conv2dSpec),
    MaxPool2d(PoolSpec),
    Flatten,
    Dense(DenseSpec),
}

impl LayerSpec {
    /// Layer type name as shown in the model summary
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input(_)     => "InputLayer",
            Self::Conv2d(_)    => "Conv2D",
            Self::MaxPool2d(_) => "MaxPooling2D",
            Self::Flatten      => "Flatten",
            Self::Dense(_)     => "Dense",
        }
    }

    /// Lower-case prefix used to name layers (`conv2d`, `conv2d_1`, ...)
    pub fn base_name(&self) -> &'static str {
        match self {
            Self::Input(_)     => "input_layer",
            Self::Conv2d(_)    => "conv2d",
            Self::MaxPool2d(_) => "max_pooling2d",
            Self::Flatten      => "flatten",
            Self::Dense(_)     => "dense",
        }
    }
}

/// Output shape of a layer, batch dimension excluded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    Image { height: usize, width: usize, channels: usize },
    Vector(usize),
}

impl Shape {
    /// Total number of scalars per sample, `None` if it overflows `usize`
    pub fn numel(&self) -> Option<usize> {
        match *self {
            Shape::Image { height, width, channels } => {
                height.checked_mul(width)?.checked_mul(channels)
            }
            Shape::Vector(n) => Some(n),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Image { height, width, channels } => {
                write!(f, "(None, {height}, {width}, {channels})")
            }
            Shape::Vector(n) => write!(f, "(None, {n})"),
        }
    }
}
