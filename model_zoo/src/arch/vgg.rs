//! VGG variants: plain 3x3 convolution stacks separated by max pools.

use net_core::{Act, GraphBuilder, NetworkGraph, Padding, Result};

use super::{OUTPUT, check_classes};

#[derive(Debug, Clone, Copy)]
pub(super) enum Variant {
    Vgg11,
    Vgg13,
    Vgg16,
}

impl Variant {
    fn blocks(self) -> &'static [&'static [usize]] {
        match self {
            Variant::Vgg11 => &[&[64], &[128], &[256, 256], &[512, 512], &[512, 512]],
            Variant::Vgg13 => &[
                &[64, 64],
                &[128, 128],
                &[256, 256],
                &[512, 512],
                &[512, 512],
            ],
            Variant::Vgg16 => &[
                &[64, 64],
                &[128, 128],
                &[256, 256, 256],
                &[512, 512, 512],
                &[512, 512, 512],
            ],
        }
    }
}

pub(super) fn build(
    variant: Variant,
    input_shape: (usize, usize),
    num_classes: usize,
) -> Result<NetworkGraph> {
    check_classes("vgg", num_classes)?;
    let (h, w) = input_shape;
    let mut b = GraphBuilder::new();
    let mut x = b.input(h, w, 3)?;

    for block in variant.blocks() {
        for &filters in *block {
            x = b.conv2d(x, filters, 3, 1, Padding::Same, Some(Act::Relu))?;
        }
        x = b.max_pool2d(x, 2, 2, Padding::Valid)?;
    }

    let mut x = b.flatten(x)?;
    for _ in 0..2 {
        x = b.dense(x, 4096, Some(Act::Relu))?;
        x = b.dropout(x, 0.5)?;
    }
    let out = b.dense(x, num_classes, Some(Act::Softmax))?;
    b.output(OUTPUT, out)?;
    b.finish()
}
