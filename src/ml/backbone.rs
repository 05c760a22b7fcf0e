// ============================================================
// Layer 5 — Dilated ResNet Backbone
// ============================================================
// Feature extractor for the FCN.
//
//   stem:   conv 7x7/2 → norm → relu → maxpool 3x3/2     (1/4)
//   stage1: residual blocks, stride 1                    (1/4)
//   stage2: residual blocks, stride 2                    (1/8)
//   stage3: residual blocks, stride 1, dilation 2        (1/8)
//   stage4: residual blocks, stride 1, dilation 4        (1/8)
//
// Stages 3 and 4 trade stride for dilation so the heads see an
// output stride of 8 instead of 32.
//
// Depths:  18 → [2,2,2,2]   basic        (expansion 1)
//          34 → [3,4,6,3]   basic
//          50 → [3,4,6,3]   bottleneck   (expansion 4)
//         101 → [3,4,23,3]  bottleneck
//         152 → [3,8,36,3]  bottleneck
//
// Normalisation is GroupNorm: batch statistics from a dozen
// 256x256 crops per step are too noisy for BatchNorm.
//
// Reference: He et al. (2016) Deep Residual Learning
//            Yu & Koltun (2016) Dilated Convolutions

use std::{fmt, str::FromStr};

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        GroupNorm, GroupNormConfig, PaddingConfig2d,
    },
    prelude::*,
    tensor::activation::relu,
};
use serde::{Deserialize, Serialize};

// ─── Backbone selection ───────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackboneKind {
    Resnet18,
    Resnet34,
    Resnet50,
    Resnet101,
    Resnet152,
}

impl BackboneKind {
    /// Residual blocks per stage
    pub fn blocks(self) -> [usize; 4] {
        match self {
            Self::Resnet18  => [2, 2, 2, 2],
            Self::Resnet34  => [3, 4, 6, 3],
            Self::Resnet50  => [3, 4, 6, 3],
            Self::Resnet101 => [3, 4, 23, 3],
            Self::Resnet152 => [3, 8, 36, 3],
        }
    }

    pub fn bottleneck(self) -> bool {
        matches!(self, Self::Resnet50 | Self::Resnet101 | Self::Resnet152)
    }

    /// Output channels multiplier of a block relative to its width
    pub fn expansion(self) -> usize {
        if self.bottleneck() { 4 } else { 1 }
    }
}

impl fmt::Display for BackboneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resnet18  => "resnet18",
            Self::Resnet34  => "resnet34",
            Self::Resnet50  => "resnet50",
            Self::Resnet101 => "resnet101",
            Self::Resnet152 => "resnet152",
        };
        f.write_str(name)
    }
}

impl FromStr for BackboneKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "resnet18"  => Ok(Self::Resnet18),
            "resnet34"  => Ok(Self::Resnet34),
            "resnet50"  => Ok(Self::Resnet50),
            "resnet101" => Ok(Self::Resnet101),
            "resnet152" => Ok(Self::Resnet152),
            other => Err(format!(
                "unknown backbone '{other}' (expected resnet18, resnet34, resnet50, resnet101 or resnet152)"
            )),
        }
    }
}

// ─── Building blocks ──────────────────────────────────────────────────────────
/// Largest group count from {32, 16, 8, 4, 2, 1} dividing `channels`.
pub(crate) fn group_count(channels: usize) -> usize {
    [32, 16, 8, 4, 2, 1]
        .into_iter()
        .find(|g| channels % g == 0)
        .unwrap_or(1)
}

pub(crate) fn norm<B: Backend>(channels: usize, device: &B::Device) -> GroupNorm<B> {
    GroupNormConfig::new(group_count(channels), channels).init(device)
}

/// Bias-free square convolution with "same" padding for its dilation.
pub(crate) fn conv<B: Backend>(
    channels: [usize; 2],
    kernel:   usize,
    stride:   usize,
    dilation: usize,
    device:   &B::Device,
) -> Conv2d<B> {
    let pad = dilation * (kernel - 1) / 2;
    Conv2dConfig::new(channels, [kernel, kernel])
        .with_stride([stride, stride])
        .with_dilation([dilation, dilation])
        .with_padding(PaddingConfig2d::Explicit(pad, pad))
        .with_bias(false)
        .init(device)
}

/// 1x1 projection for the residual path when shape changes
#[derive(Module, Debug)]
pub struct Downsample<B: Backend> {
    conv: Conv2d<B>,
    norm: GroupNorm<B>,
}

impl<B: Backend> Downsample<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.norm.forward(self.conv.forward(x))
    }
}

/// Basic block (conv3 = None) or bottleneck block (conv3 = Some).
#[derive(Module, Debug)]
pub struct ResidualBlock<B: Backend> {
    conv1:      Conv2d<B>,
    norm1:      GroupNorm<B>,
    conv2:      Conv2d<B>,
    norm2:      GroupNorm<B>,
    conv3:      Option<Conv2d<B>>,
    norm3:      Option<GroupNorm<B>>,
    downsample: Option<Downsample<B>>,
}

impl<B: Backend> ResidualBlock<B> {
    fn new(
        kind:     BackboneKind,
        in_ch:    usize,
        width:    usize,
        stride:   usize,
        dilation: usize,
        device:   &B::Device,
    ) -> Self {
        let out_ch = width * kind.expansion();

        let downsample = (stride != 1 || in_ch != out_ch).then(|| Downsample {
            conv: conv([in_ch, out_ch], 1, stride, 1, device),
            norm: norm(out_ch, device),
        });

        if kind.bottleneck() {
            // 1x1 reduce → 3x3 (strided, dilated) → 1x1 expand
            Self {
                conv1: conv([in_ch, width], 1, 1, 1, device),
                norm1: norm(width, device),
                conv2: conv([width, width], 3, stride, dilation, device),
                norm2: norm(width, device),
                conv3: Some(conv([width, out_ch], 1, 1, 1, device)),
                norm3: Some(norm(out_ch, device)),
                downsample,
            }
        } else {
            Self {
                conv1: conv([in_ch, width], 3, stride, dilation, device),
                norm1: norm(width, device),
                conv2: conv([width, width], 3, 1, dilation, device),
                norm2: norm(width, device),
                conv3: None,
                norm3: None,
                downsample,
            }
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let identity = match &self.downsample {
            Some(ds) => ds.forward(x.clone()),
            None => x.clone(),
        };

        let out = relu(self.norm1.forward(self.conv1.forward(x)));
        let out = self.norm2.forward(self.conv2.forward(out));
        let out = match (&self.conv3, &self.norm3) {
            (Some(conv3), Some(norm3)) => norm3.forward(conv3.forward(relu(out))),
            _ => out,
        };

        relu(out + identity)
    }
}

// ─── Backbone ─────────────────────────────────────────────────────────────────
#[derive(Config, Debug)]
pub struct ResNetConfig {
    #[config(default = "BackboneKind::Resnet101")]
    pub kind: BackboneKind,

    /// Width of the stem and of stage 1 (64 in the standard ResNets)
    #[config(default = 64)]
    pub base_width: usize,
}

/// Features handed to the segmentation heads
pub struct BackboneFeatures<B: Backend> {
    /// Stage 3 output, feeds the auxiliary head
    pub c3: Tensor<B, 4>,
    /// Stage 4 output, feeds the main head
    pub c4: Tensor<B, 4>,
}

#[derive(Module, Debug)]
pub struct ResNet<B: Backend> {
    stem_conv: Conv2d<B>,
    stem_norm: GroupNorm<B>,
    pool:      MaxPool2d,
    stage1:    Vec<ResidualBlock<B>>,
    stage2:    Vec<ResidualBlock<B>>,
    stage3:    Vec<ResidualBlock<B>>,
    stage4:    Vec<ResidualBlock<B>>,
}

impl ResNetConfig {
    /// Channels of the stage 3 and stage 4 outputs
    pub fn out_channels(&self) -> (usize, usize) {
        let e = self.kind.expansion();
        (self.base_width * 4 * e, self.base_width * 8 * e)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ResNet<B> {
        let base = self.base_width;
        let blocks = self.kind.blocks();

        let stem_conv = Conv2dConfig::new([3, base], [7, 7])
            .with_stride([2, 2])
            .with_padding(PaddingConfig2d::Explicit(3, 3))
            .with_bias(false)
            .init(device);
        let pool = MaxPool2dConfig::new([3, 3])
            .with_strides([2, 2])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init();

        // (width, stride, dilation) per stage
        let plan = [(base, 1, 1), (base * 2, 2, 1), (base * 4, 1, 2), (base * 8, 1, 4)];

        let mut in_ch = base;
        let [stage1, stage2, stage3, stage4] = [0, 1, 2, 3].map(|s| {
            let (width, stride, dilation) = plan[s];
            (0..blocks[s])
                .map(|i| {
                    let stride = if i == 0 { stride } else { 1 };
                    let block = ResidualBlock::new(self.kind, in_ch, width, stride, dilation, device);
                    in_ch = width * self.kind.expansion();
                    block
                })
                .collect::<Vec<_>>()
        });

        ResNet {
            stem_conv,
            stem_norm: norm(base, device),
            pool,
            stage1,
            stage2,
            stage3,
            stage4,
        }
    }
}

impl<B: Backend> ResNet<B> {
    pub fn forward(&self, images: Tensor<B, 4>) -> BackboneFeatures<B> {
        let x = relu(self.stem_norm.forward(self.stem_conv.forward(images)));
        let x = self.pool.forward(x);

        let run = |stage: &[ResidualBlock<B>], x: Tensor<B, 4>| {
            stage.iter().fold(x, |x, block| block.forward(x))
        };

        let x  = run(&self.stage1, x);
        let x  = run(&self.stage2, x);
        let c3 = run(&self.stage3, x);
        let c4 = run(&self.stage4, c3.clone());

        BackboneFeatures { c3, c4 }
    }
}
