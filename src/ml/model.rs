use std::path::Path;

use anyhow::{anyhow, Result};
use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        Dropout, DropoutConfig, GroupNorm,
    },
    prelude::*,
    record::{BinBytesRecorder, BinFileRecorder, FullPrecisionSettings, Recorder},
    tensor::{activation::relu, TensorData},
};

use crate::domain::traits::ParameterSnapshot;
use crate::ml::backbone::{self, BackboneKind, ResNet, ResNetConfig};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally, so do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct FcnConfig {
    pub backbone:    BackboneKind,
    pub num_classes: usize,
    #[config(default = 64)]
    pub base_width:  usize,
    #[config(default = 0.1)]
    pub dropout:     f64,
}

impl FcnConfig {
    pub fn backbone_config(&self) -> ResNetConfig {
        ResNetConfig::new()
            .with_kind(self.backbone)
            .with_base_width(self.base_width)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> FcnModel<B> {
        let resnet = self.backbone_config();
        let (c3, c4) = resnet.out_channels();
        FcnModel {
            backbone: resnet.init(device),
            head:     self.build_head(c4, device),
            aux_head: self.build_head(c3, device),
        }
    }

    fn build_head<B: Backend>(&self, in_ch: usize, device: &B::Device) -> FcnHead<B> {
        let inter = (in_ch / 4).max(1);
        FcnHead {
            conv:       backbone::conv([in_ch, inter], 3, 1, 1, device),
            norm:       backbone::norm(inter, device),
            dropout:    DropoutConfig::new(self.dropout).init(),
            classifier: Conv2dConfig::new([inter, self.num_classes], [1, 1]).init(device),
        }
    }
}

/// conv3x3 → norm → relu → dropout → conv1x1 to class scores
#[derive(Module, Debug)]
pub struct FcnHead<B: Backend> {
    pub conv:       Conv2d<B>,
    pub norm:       GroupNorm<B>,
    pub dropout:    Dropout,
    pub classifier: Conv2d<B>,
}

impl<B: Backend> FcnHead<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.norm.forward(self.conv.forward(x)));
        self.classifier.forward(self.dropout.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct FcnModel<B: Backend> {
    pub backbone: ResNet<B>,
    pub head:     FcnHead<B>,
    pub aux_head: FcnHead<B>,
}

/// Per-pixel class scores, both upsampled to the input size
pub struct SegOutput<B: Backend> {
    /// [batch, num_classes, height, width]
    pub main: Tensor<B, 4>,
    /// [batch, num_classes, height, width]
    pub aux:  Tensor<B, 4>,
}

impl<B: Backend> FcnModel<B> {
    /// images: [batch, 3, height, width] → SegOutput
    pub fn forward(&self, images: Tensor<B, 4>) -> SegOutput<B> {
        let [_, _, height, width] = images.dims();
        let feats = self.backbone.forward(images);

        SegOutput {
            main: upsample_bilinear(self.head.forward(feats.c4), [height, width]),
            aux:  upsample_bilinear(self.aux_head.forward(feats.c3), [height, width]),
        }
    }

    /// Replace the backbone with parameters from a burn record file.
    pub fn with_pretrained_backbone(self, path: &Path, device: &B::Device) -> Result<Self> {
        let recorder = BinFileRecorder::<FullPrecisionSettings>::new();
        let backbone = self
            .backbone
            .load_file(path.to_path_buf(), &recorder, device)
            .map_err(|e| anyhow!("Cannot load pretrained backbone from {}: {:?}", path.display(), e))?;
        tracing::info!("Pretrained backbone loaded from {}", path.display());
        Ok(Self { backbone, ..self })
    }
}

// ─── Bilinear upsampling ──────────────────────────────────────────────────────
// Separable bilinear resize (align_corners = true) as two matmuls:
//
//   out = Wh · x · Wwᵀ      Wh: [H, h], Ww: [W, w]
//
// Built from matmul only, so every backend can differentiate it.

/// Row-major [out_len, in_len] interpolation weights; each row sums to 1.
pub(crate) fn bilinear_weights(out_len: usize, in_len: usize) -> Vec<f32> {
    let mut weights = vec![0.0f32; out_len * in_len];
    let scale = if out_len > 1 {
        (in_len - 1) as f32 / (out_len - 1) as f32
    } else {
        0.0
    };

    for i in 0..out_len {
        let src  = i as f32 * scale;
        let lo   = (src.floor() as usize).min(in_len - 1);
        let hi   = (lo + 1).min(in_len - 1);
        let frac = src - lo as f32;
        weights[i * in_len + lo] += 1.0 - frac;
        weights[i * in_len + hi] += frac;
    }
    weights
}

/// x: [batch, channels, h, w] → [batch, channels, size[0], size[1]]
pub fn upsample_bilinear<B: Backend>(x: Tensor<B, 4>, size: [usize; 2]) -> Tensor<B, 4> {
    let [batch, channels, h, w] = x.dims();
    let [out_h, out_w] = size;
    if [h, w] == size {
        return x;
    }

    let device = x.device();
    let n = batch * channels;
    let wh = Tensor::<B, 2>::from_data(TensorData::new(bilinear_weights(out_h, h), [out_h, h]), &device)
        .reshape([1, out_h, h])
        .expand([n, out_h, h]);
    let ww_t = Tensor::<B, 2>::from_data(TensorData::new(bilinear_weights(out_w, w), [out_w, w]), &device)
        .transpose()
        .reshape([1, w, out_w])
        .expand([n, w, out_w]);

    wh.matmul(x.reshape([n, h, w]))
        .matmul(ww_t)
        .reshape([batch, channels, out_h, out_w])
}

impl<B: Backend> ParameterSnapshot for FcnModel<B> {
    type Device = B::Device;

    fn snapshot(&self) -> Result<Vec<u8>> {
        let recorder: BinBytesRecorder<FullPrecisionSettings> = BinBytesRecorder::default();
        Recorder::<B>::record(&recorder, self.clone().into_record(), ())
            .map_err(|e| anyhow!("Cannot serialise model parameters: {:?}", e))
    }

    fn restore(self, bytes: &[u8], device: &B::Device) -> Result<Self> {
        let recorder: BinBytesRecorder<FullPrecisionSettings> = BinBytesRecorder::default();
        let record = Recorder::<B>::load(&recorder, bytes.to_vec(), device)
            .map_err(|e| anyhow!("Checkpoint does not match the model architecture: {:?}", e))?;
        Ok(self.load_record(record))
    }
}
