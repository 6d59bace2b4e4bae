//! ResNet50: bottleneck residual stages over batch-normalized convolutions.

use net_core::{Act, GraphBuilder, NetworkGraph, NodeId, Padding, Result};

use super::{OUTPUT, check_classes};

fn conv_bn(
    b: &mut GraphBuilder,
    x: NodeId,
    filters: usize,
    kernel: usize,
    stride: usize,
    padding: Padding,
    act: Option<Act>,
) -> Result<NodeId> {
    let x = b.conv2d(x, filters, kernel, stride, padding, None)?;
    let x = b.batch_norm(x)?;
    match act {
        Some(a) => b.activation(x, a),
        None => Ok(x),
    }
}

/// Bottleneck block whose shortcut is the identity; input and output
/// channel counts must already agree.
fn identity_block(b: &mut GraphBuilder, x: NodeId, filters: [usize; 3]) -> Result<NodeId> {
    let [f1, f2, f3] = filters;
    let y = conv_bn(b, x, f1, 1, 1, Padding::Valid, Some(Act::Relu))?;
    let y = conv_bn(b, y, f2, 3, 1, Padding::Same, Some(Act::Relu))?;
    let y = conv_bn(b, y, f3, 1, 1, Padding::Valid, None)?;
    let y = b.add(x, y)?;
    b.activation(y, Act::Relu)
}

/// Bottleneck block with a projection shortcut; first in every stage,
/// optionally downsampling with `stride`.
fn conv_block(
    b: &mut GraphBuilder,
    x: NodeId,
    filters: [usize; 3],
    stride: usize,
) -> Result<NodeId> {
    let [f1, f2, f3] = filters;
    let y = conv_bn(b, x, f1, 1, stride, Padding::Valid, Some(Act::Relu))?;
    let y = conv_bn(b, y, f2, 3, 1, Padding::Same, Some(Act::Relu))?;
    let y = conv_bn(b, y, f3, 1, 1, Padding::Valid, None)?;
    let shortcut = conv_bn(b, x, f3, 1, stride, Padding::Valid, None)?;
    let y = b.add(shortcut, y)?;
    b.activation(y, Act::Relu)
}

fn stage(
    b: &mut GraphBuilder,
    mut x: NodeId,
    filters: [usize; 3],
    blocks: usize,
    stride: usize,
) -> Result<NodeId> {
    x = conv_block(b, x, filters, stride)?;
    for _ in 1..blocks {
        x = identity_block(b, x, filters)?;
    }
    Ok(x)
}

pub(super) fn build(input_shape: (usize, usize), num_classes: usize) -> Result<NetworkGraph> {
    check_classes("resnet50", num_classes)?;
    let (h, w) = input_shape;
    let mut b = GraphBuilder::new();
    let input = b.input(h, w, 3)?;

    let x = conv_bn(&mut b, input, 64, 7, 2, Padding::Same, Some(Act::Relu))?;
    let x = b.max_pool2d(x, 3, 2, Padding::Same)?;

    let x = stage(&mut b, x, [64, 64, 256], 3, 1)?;
    let x = stage(&mut b, x, [128, 128, 512], 4, 2)?;
    let x = stage(&mut b, x, [256, 256, 1024], 6, 2)?;
    let x = stage(&mut b, x, [512, 512, 2048], 3, 2)?;

    let x = b.global_avg_pool(x)?;
    let out = b.dense(x, num_classes, Some(Act::Softmax))?;
    b.output(OUTPUT, out)?;
    b.finish()
}
