//! MobileNetV1 (depthwise-separable stacks) and MobileNetV2 (inverted
//! residual bottlenecks with linear projections).

use net_core::{Act, GraphBuilder, NetworkGraph, NodeId, Padding, Result, Shape};

use super::{OUTPUT, check_classes};

/// V1 pointwise filter counts with the stride of the preceding depthwise.
const V1_BLOCKS: [(usize, usize); 13] = [
    (64, 1),
    (128, 2),
    (128, 1),
    (256, 2),
    (256, 1),
    (512, 2),
    (512, 1),
    (512, 1),
    (512, 1),
    (512, 1),
    (512, 1),
    (1024, 2),
    (1024, 1),
];

/// V2 bottleneck table: (expansion, output channels, repeats, first stride).
const V2_BLOCKS: [(usize, usize, usize, usize); 7] = [
    (1, 16, 1, 1),
    (6, 24, 2, 2),
    (6, 32, 3, 2),
    (6, 64, 4, 2),
    (6, 96, 3, 1),
    (6, 160, 3, 2),
    (6, 320, 1, 1),
];

fn conv_bn(
    b: &mut GraphBuilder,
    x: NodeId,
    filters: usize,
    kernel: usize,
    stride: usize,
    act: Option<Act>,
) -> Result<NodeId> {
    let x = b.conv2d(x, filters, kernel, stride, Padding::Same, None)?;
    let x = b.batch_norm(x)?;
    match act {
        Some(a) => b.activation(x, a),
        None => Ok(x),
    }
}

fn depthwise_bn(b: &mut GraphBuilder, x: NodeId, stride: usize, act: Act) -> Result<NodeId> {
    let x = b.depthwise_conv2d(x, 3, stride, Padding::Same, None)?;
    let x = b.batch_norm(x)?;
    b.activation(x, act)
}

fn channels(b: &GraphBuilder, x: NodeId) -> Result<usize> {
    match b.shape_of(x)? {
        Shape::Map { c, .. } => Ok(c),
        Shape::Flat { len } => Ok(len),
    }
}

pub(super) fn build_v1(input_shape: (usize, usize), num_classes: usize) -> Result<NetworkGraph> {
    check_classes("mobilenet_v1", num_classes)?;
    let (h, w) = input_shape;
    let mut b = GraphBuilder::new();
    let input = b.input(h, w, 3)?;

    let mut x = conv_bn(&mut b, input, 32, 3, 2, Some(Act::Relu))?;
    for (filters, stride) in V1_BLOCKS {
        x = depthwise_bn(&mut b, x, stride, Act::Relu)?;
        x = conv_bn(&mut b, x, filters, 1, 1, Some(Act::Relu))?;
    }

    let x = b.global_avg_pool(x)?;
    let out = b.dense(x, num_classes, Some(Act::Softmax))?;
    b.output(OUTPUT, out)?;
    b.finish()
}

/// One inverted residual: expand with 1x1 (skipped when the expansion
/// factor is 1), depthwise 3x3, linearly project back down; the residual
/// connection only exists at stride 1 with matching channels.
fn bottleneck(
    b: &mut GraphBuilder,
    x: NodeId,
    expansion: usize,
    out_c: usize,
    stride: usize,
) -> Result<NodeId> {
    let in_c = channels(b, x)?;
    let mut y = x;
    if expansion > 1 {
        y = conv_bn(b, y, expansion * in_c, 1, 1, Some(Act::Relu6))?;
    }
    y = depthwise_bn(b, y, stride, Act::Relu6)?;
    y = conv_bn(b, y, out_c, 1, 1, None)?;
    if stride == 1 && in_c == out_c {
        return b.add(x, y);
    }
    Ok(y)
}

pub(super) fn build_v2(input_shape: (usize, usize), num_classes: usize) -> Result<NetworkGraph> {
    check_classes("mobilenet_v2", num_classes)?;
    let (h, w) = input_shape;
    let mut b = GraphBuilder::new();
    let input = b.input(h, w, 3)?;

    let mut x = conv_bn(&mut b, input, 32, 3, 2, Some(Act::Relu6))?;
    for (expansion, out_c, repeats, first_stride) in V2_BLOCKS {
        for i in 0..repeats {
            let stride = if i == 0 { first_stride } else { 1 };
            x = bottleneck(&mut b, x, expansion, out_c, stride)?;
        }
    }
    let x = conv_bn(&mut b, x, 1280, 1, 1, Some(Act::Relu6))?;

    let x = b.global_avg_pool(x)?;
    let out = b.dense(x, num_classes, Some(Act::Softmax))?;
    b.output(OUTPUT, out)?;
    b.finish()
}
