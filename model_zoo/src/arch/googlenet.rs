//! GoogLeNet assembly: inception blocks, auxiliary classifier heads and the
//! full three-output graph with the published filter table.

use net_core::{Act, GraphBuilder, NetworkGraph, NodeId, Padding, Result, Shape};

use super::{OUTPUT, check_classes};

pub const OUTPUT_AUX_1: &str = "output_aux_1";
pub const OUTPUT_AUX_2: &str = "output_aux_2";

/// Hyperparameters fully determining one inception block's topology.
///
/// `filters` are the per-branch output channels for the 1x1, 3x3 and 5x5
/// convolutions; `reduced_filters` are the 3x3 reduction, the 5x5 reduction
/// and the pool projection, in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpec {
    pub filters: [usize; 3],
    pub reduced_filters: [usize; 3],
    pub kernel_sizes: [usize; 3],
    pub pool_size: usize,
}

impl BlockSpec {
    pub const fn new(filters: [usize; 3], reduced_filters: [usize; 3]) -> Self {
        Self {
            filters,
            reduced_filters,
            kernel_sizes: [1, 3, 5],
            pool_size: 3,
        }
    }
}

// Published architecture table. These constants must match the paper
// exactly for behavioral parity with trained artifacts.
const INCEPTION_3A: BlockSpec = BlockSpec::new([64, 128, 32], [96, 16, 32]);
const INCEPTION_3B: BlockSpec = BlockSpec::new([128, 192, 96], [128, 32, 64]);
const INCEPTION_4A: BlockSpec = BlockSpec::new([192, 208, 48], [96, 16, 64]);
const INCEPTION_4B: BlockSpec = BlockSpec::new([160, 224, 64], [112, 24, 64]);
const INCEPTION_4C: BlockSpec = BlockSpec::new([128, 256, 64], [128, 24, 64]);
const INCEPTION_4D: BlockSpec = BlockSpec::new([112, 288, 64], [144, 32, 64]);
const INCEPTION_4E: BlockSpec = BlockSpec::new([256, 320, 128], [160, 32, 128]);
const INCEPTION_5A: BlockSpec = BlockSpec::new([256, 320, 128], [160, 32, 128]);
const INCEPTION_5B: BlockSpec = BlockSpec::new([384, 384, 128], [192, 48, 128]);

/// The naive inception block: three parallel valid-padded convolutions plus
/// a max-pooling branch over the same input, channel-concatenated.
///
/// Valid padding gives each branch a different spatial extent, so every
/// branch is center-cropped to the smallest one before concatenation. The
/// order 1x1, 3x3, 5x5, pooled is fixed. Channel counts grow unbounded with
/// depth; this block exists as the documented inferior baseline to
/// [`inception_block`].
pub fn naive_inception_block(
    b: &mut GraphBuilder,
    x: NodeId,
    filters: [usize; 3],
    kernel_sizes: [usize; 3],
    pool_size: usize,
) -> Result<NodeId> {
    let mut branches = Vec::with_capacity(4);
    for (&f, &k) in filters.iter().zip(kernel_sizes.iter()) {
        branches.push(b.conv2d(x, f, k, 1, Padding::Valid, Some(Act::Relu))?);
    }
    branches.push(b.max_pool2d(x, pool_size, 1, Padding::Same)?);

    let mut th = usize::MAX;
    let mut tw = usize::MAX;
    for &branch in &branches {
        if let Shape::Map { h, w, .. } = b.shape_of(branch)? {
            th = th.min(h);
            tw = tw.min(w);
        }
    }
    let mut aligned = Vec::with_capacity(branches.len());
    for branch in branches {
        let cropped = match b.shape_of(branch)? {
            Shape::Map { h, w, .. } if h == th && w == tw => branch,
            _ => b.crop_center(branch, th, tw)?,
        };
        aligned.push(cropped);
    }
    b.concat(&aligned)
}

/// The dimensionality-reduced inception block: 1x1 reductions run before
/// the 3x3 and 5x5 convolutions and a 1x1 projection follows the pooling
/// branch. Same padding throughout, so the spatial extent is preserved.
/// Concatenation order is fixed: 1x1, 3x3, 5x5, pooled projection.
pub fn inception_block(b: &mut GraphBuilder, x: NodeId, spec: &BlockSpec) -> Result<NodeId> {
    let [f1, f3, f5] = spec.filters;
    let [r3, r5, pool_proj] = spec.reduced_filters;
    let [k1, k3, k5] = spec.kernel_sizes;

    let b1 = b.conv2d(x, f1, k1, 1, Padding::Same, Some(Act::Relu))?;

    let red3 = b.conv2d(x, r3, 1, 1, Padding::Same, Some(Act::Relu))?;
    let b3 = b.conv2d(red3, f3, k3, 1, Padding::Same, Some(Act::Relu))?;

    let red5 = b.conv2d(x, r5, 1, 1, Padding::Same, Some(Act::Relu))?;
    let b5 = b.conv2d(red5, f5, k5, 1, Padding::Same, Some(Act::Relu))?;

    let pooled = b.max_pool2d(x, spec.pool_size, 1, Padding::Same)?;
    let proj = b.conv2d(pooled, pool_proj, 1, 1, Padding::Same, Some(Act::Relu))?;

    b.concat(&[b1, b3, b5, proj])
}

/// A read-only classifier head tapped off an intermediate feature map to
/// inject gradient signal at depth. Returns the softmax node; the caller
/// registers it as a named output so the main output can stay first in
/// declaration order.
pub fn auxiliary_classifier(
    b: &mut GraphBuilder,
    x: NodeId,
    num_classes: usize,
) -> Result<NodeId> {
    let p = b.avg_pool2d(x, 5, 3, Padding::Valid)?;
    let c = b.conv2d(p, 128, 1, 1, Padding::Same, Some(Act::Relu))?;
    let f = b.flatten(c)?;
    let d = b.dense(f, 1024, Some(Act::Relu))?;
    let d = b.dropout(d, 0.7)?;
    b.dense(d, num_classes, Some(Act::Softmax))
}

/// Assembles the full GoogLeNet graph with outputs
/// `output`, `output_aux_1` and `output_aux_2`.
pub fn build(input_shape: (usize, usize), num_classes: usize) -> Result<NetworkGraph> {
    check_classes("googlenet", num_classes)?;
    let (h, w) = input_shape;
    let mut b = GraphBuilder::new();
    let input = b.input(h, w, 3)?;

    // Stem.
    let x = b.conv2d(input, 64, 7, 2, Padding::Same, None)?;
    let x = b.max_pool2d(x, 3, 2, Padding::Same)?;
    let x = b.conv2d(x, 64, 1, 1, Padding::Valid, None)?;
    let x = b.conv2d(x, 192, 3, 1, Padding::Same, None)?;
    let x = b.max_pool2d(x, 3, 2, Padding::Same)?;

    let x = inception_block(&mut b, x, &INCEPTION_3A)?;
    let x = inception_block(&mut b, x, &INCEPTION_3B)?;
    let x = b.max_pool2d(x, 3, 2, Padding::Same)?;

    let x = inception_block(&mut b, x, &INCEPTION_4A)?;
    let aux_1 = auxiliary_classifier(&mut b, x, num_classes)?;

    let x = inception_block(&mut b, x, &INCEPTION_4B)?;
    let x = inception_block(&mut b, x, &INCEPTION_4C)?;
    let x = inception_block(&mut b, x, &INCEPTION_4D)?;
    let aux_2 = auxiliary_classifier(&mut b, x, num_classes)?;

    let x = inception_block(&mut b, x, &INCEPTION_4E)?;
    let x = b.max_pool2d(x, 3, 2, Padding::Same)?;
    let x = inception_block(&mut b, x, &INCEPTION_5A)?;
    let x = inception_block(&mut b, x, &INCEPTION_5B)?;

    let x = b.avg_pool2d(x, 7, 1, Padding::Valid)?;
    let x = b.flatten(x)?;
    let x = b.dropout(x, 0.4)?;
    let x = b.dense(x, 1000, Some(Act::Relu))?;
    let out = b.dense(x, num_classes, Some(Act::Softmax))?;

    b.output(OUTPUT, out)?;
    b.output(OUTPUT_AUX_1, aux_1)?;
    b.output(OUTPUT_AUX_2, aux_2)?;
    b.finish()
}
