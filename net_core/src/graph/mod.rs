mod exec;

use rand::Rng;

use crate::{
    NetErr, Result,
    act::Act,
    ops::{BatchNorm, Conv2d, Dense, DepthwiseConv2d, Op, Pool2d},
    shape::{Padding, Shape, pad_before, window_out},
};

/// Handle to a node inside one builder/graph. Ids are only meaningful for
/// the builder that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) op: Op,
    pub(crate) inputs: Vec<NodeId>,
    pub(crate) out_shape: Shape,
    pub(crate) param_offset: usize,
}

/// Builds an acyclic computation graph out of explicit tensor handles.
///
/// Every method validates shapes eagerly and fails with a construction
/// error before any execution resource exists. Since an op can only consume
/// ids that were already handed out, the node list is in topological order
/// by construction.
pub struct GraphBuilder {
    nodes: Vec<Node>,
    input: Option<NodeId>,
    outputs: Vec<(String, NodeId)>,
    param_size: usize,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            input: None,
            outputs: Vec::new(),
            param_size: 0,
        }
    }

    fn push(&mut self, op: Op, inputs: Vec<NodeId>, out_shape: Shape) -> NodeId {
        let param_offset = self.param_size;
        self.param_size += op.param_size();
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            op,
            inputs,
            out_shape,
            param_offset,
        });
        id
    }

    /// The output shape of an already-built node.
    pub fn shape_of(&self, id: NodeId) -> Result<Shape> {
        self.nodes
            .get(id.0)
            .map(|n| n.out_shape)
            .ok_or(NetErr::UnknownNode { id: id.0 })
    }

    /// Declares the single input feature map. May only be called once.
    pub fn input(&mut self, h: usize, w: usize, c: usize) -> Result<NodeId> {
        if self.input.is_some() {
            return Err(NetErr::InvalidParam {
                op: "input",
                what: "second input node",
            });
        }
        if h == 0 || w == 0 || c == 0 {
            return Err(NetErr::InvalidParam {
                op: "input",
                what: "zero-sized dimension",
            });
        }
        let id = self.push(Op::Input, vec![], Shape::map(h, w, c));
        self.input = Some(id);
        Ok(id)
    }

    pub fn conv2d(
        &mut self,
        x: NodeId,
        filters: usize,
        kernel: usize,
        stride: usize,
        padding: Padding,
        act: Option<Act>,
    ) -> Result<NodeId> {
        let (h, w, c) = self.shape_of(x)?.as_map("conv2d")?;
        if filters == 0 || kernel == 0 || stride == 0 {
            return Err(NetErr::InvalidParam {
                op: "conv2d",
                what: "zero-sized hyperparameter",
            });
        }
        if let Some(a) = act
            && !a.is_elementwise()
        {
            return Err(NetErr::InvalidParam {
                op: "conv2d",
                what: "non-elementwise activation on a feature map",
            });
        }
        let (oh, ow) = self.window_dims("conv2d", h, w, kernel, stride, padding)?;
        let op = Op::Conv2d(Conv2d {
            in_c: c,
            filters,
            kernel,
            stride,
            act,
            out_hw: (oh, ow),
            pad: (
                pad_before(h, oh, kernel, stride),
                pad_before(w, ow, kernel, stride),
            ),
        });
        Ok(self.push(op, vec![x], Shape::map(oh, ow, filters)))
    }

    pub fn depthwise_conv2d(
        &mut self,
        x: NodeId,
        kernel: usize,
        stride: usize,
        padding: Padding,
        act: Option<Act>,
    ) -> Result<NodeId> {
        let (h, w, c) = self.shape_of(x)?.as_map("depthwise_conv2d")?;
        if kernel == 0 || stride == 0 {
            return Err(NetErr::InvalidParam {
                op: "depthwise_conv2d",
                what: "zero-sized hyperparameter",
            });
        }
        let (oh, ow) = self.window_dims("depthwise_conv2d", h, w, kernel, stride, padding)?;
        let op = Op::DepthwiseConv2d(DepthwiseConv2d {
            c,
            kernel,
            stride,
            act,
            out_hw: (oh, ow),
            pad: (
                pad_before(h, oh, kernel, stride),
                pad_before(w, ow, kernel, stride),
            ),
        });
        Ok(self.push(op, vec![x], Shape::map(oh, ow, c)))
    }

    pub fn max_pool2d(
        &mut self,
        x: NodeId,
        window: usize,
        stride: usize,
        padding: Padding,
    ) -> Result<NodeId> {
        let (op, shape) = self.pool("max_pool2d", x, window, stride, padding)?;
        Ok(self.push(Op::MaxPool2d(op), vec![x], shape))
    }

    pub fn avg_pool2d(
        &mut self,
        x: NodeId,
        window: usize,
        stride: usize,
        padding: Padding,
    ) -> Result<NodeId> {
        let (op, shape) = self.pool("avg_pool2d", x, window, stride, padding)?;
        Ok(self.push(Op::AvgPool2d(op), vec![x], shape))
    }

    fn pool(
        &self,
        name: &'static str,
        x: NodeId,
        window: usize,
        stride: usize,
        padding: Padding,
    ) -> Result<(Pool2d, Shape)> {
        let (h, w, c) = self.shape_of(x)?.as_map(name)?;
        if window == 0 || stride == 0 {
            return Err(NetErr::InvalidParam {
                op: name,
                what: "zero-sized hyperparameter",
            });
        }
        let (oh, ow) = self.window_dims(name, h, w, window, stride, padding)?;
        let op = Pool2d {
            window,
            stride,
            out_hw: (oh, ow),
            pad: (
                pad_before(h, oh, window, stride),
                pad_before(w, ow, window, stride),
            ),
        };
        Ok((op, Shape::map(oh, ow, c)))
    }

    pub fn global_avg_pool(&mut self, x: NodeId) -> Result<NodeId> {
        let (_, _, c) = self.shape_of(x)?.as_map("global_avg_pool")?;
        Ok(self.push(Op::GlobalAvgPool, vec![x], Shape::Flat { len: c }))
    }

    pub fn batch_norm(&mut self, x: NodeId) -> Result<NodeId> {
        let shape = self.shape_of(x)?;
        let (_, _, c) = shape.as_map("batch_norm")?;
        Ok(self.push(Op::BatchNorm(BatchNorm { c }), vec![x], shape))
    }

    pub fn activation(&mut self, x: NodeId, act: Act) -> Result<NodeId> {
        let shape = self.shape_of(x)?;
        if matches!(shape, Shape::Map { .. }) && !act.is_elementwise() {
            return Err(NetErr::InvalidParam {
                op: "activation",
                what: "non-elementwise activation on a feature map",
            });
        }
        Ok(self.push(Op::Activation(act), vec![x], shape))
    }

    pub fn dense(&mut self, x: NodeId, units: usize, act: Option<Act>) -> Result<NodeId> {
        let in_dim = self.shape_of(x)?.as_flat("dense")?;
        if units == 0 {
            return Err(NetErr::InvalidParam {
                op: "dense",
                what: "zero units",
            });
        }
        let op = Op::Dense(Dense { in_dim, units, act });
        Ok(self.push(op, vec![x], Shape::Flat { len: units }))
    }

    pub fn flatten(&mut self, x: NodeId) -> Result<NodeId> {
        let (h, w, c) = self.shape_of(x)?.as_map("flatten")?;
        Ok(self.push(Op::Flatten, vec![x], Shape::Flat { len: h * w * c }))
    }

    pub fn dropout(&mut self, x: NodeId, rate: f32) -> Result<NodeId> {
        if !(0.0..1.0).contains(&rate) {
            return Err(NetErr::InvalidParam {
                op: "dropout",
                what: "rate outside [0, 1)",
            });
        }
        let shape = self.shape_of(x)?;
        Ok(self.push(Op::Dropout { rate }, vec![x], shape))
    }

    /// Concatenates feature maps along the channel axis. The order of `xs`
    /// is preserved both in the wiring and in the channel layout.
    pub fn concat(&mut self, xs: &[NodeId]) -> Result<NodeId> {
        if xs.len() < 2 {
            return Err(NetErr::InvalidParam {
                op: "concat",
                what: "fewer than two branches",
            });
        }
        let (h, w, mut channels) = self.shape_of(xs[0])?.as_map("concat")?;
        for &x in &xs[1..] {
            let (bh, bw, bc) = self.shape_of(x)?.as_map("concat")?;
            if bh != h || bw != w {
                return Err(NetErr::SizeMismatch {
                    what: "concat branch spatial size",
                    got: bh * bw,
                    expected: h * w,
                });
            }
            channels += bc;
        }
        Ok(self.push(Op::Concat, xs.to_vec(), Shape::map(h, w, channels)))
    }

    pub fn add(&mut self, a: NodeId, b: NodeId) -> Result<NodeId> {
        let sa = self.shape_of(a)?;
        let (_, _, ca) = sa.as_map("add")?;
        let (_, _, cb) = self.shape_of(b)?.as_map("add")?;
        if sa != self.shape_of(b)? {
            return Err(NetErr::SizeMismatch {
                what: "residual branch channels",
                got: cb,
                expected: ca,
            });
        }
        Ok(self.push(Op::Add, vec![a, b], sa))
    }

    /// Center-crops a feature map down to `h` by `w`.
    pub fn crop_center(&mut self, x: NodeId, h: usize, w: usize) -> Result<NodeId> {
        let (ih, iw, c) = self.shape_of(x)?.as_map("crop_center")?;
        if h == 0 || w == 0 || h > ih || w > iw {
            return Err(NetErr::InvalidParam {
                op: "crop_center",
                what: "target larger than the input",
            });
        }
        Ok(self.push(Op::CropCenter { h, w }, vec![x], Shape::map(h, w, c)))
    }

    /// Registers `x` as a named output. Declaration order is the order
    /// `forward` reports outputs in; the first registered output is the
    /// primary one.
    pub fn output(&mut self, name: &str, x: NodeId) -> Result<()> {
        self.shape_of(x)?;
        if self.outputs.iter().any(|(n, _)| n == name) {
            return Err(NetErr::DuplicateOutput {
                name: name.to_string(),
            });
        }
        self.outputs.push((name.to_string(), x));
        Ok(())
    }

    /// Seals the graph. Fails unless exactly one input was declared and at
    /// least one output was named.
    pub fn finish(self) -> Result<NetworkGraph> {
        let input = self.input.ok_or(NetErr::GraphIncomplete {
            what: "an input node",
        })?;
        if self.outputs.is_empty() {
            return Err(NetErr::GraphIncomplete {
                what: "named outputs",
            });
        }
        let input_shape = self.nodes[input.0].out_shape;
        log::debug!(
            "sealed graph: {} nodes, {} outputs, {} parameters",
            self.nodes.len(),
            self.outputs.len(),
            self.param_size
        );
        Ok(NetworkGraph {
            nodes: self.nodes,
            input_shape,
            outputs: self.outputs,
            param_size: self.param_size,
        })
    }

    fn window_dims(
        &self,
        op: &'static str,
        h: usize,
        w: usize,
        window: usize,
        stride: usize,
        padding: Padding,
    ) -> Result<(usize, usize)> {
        let collapse = NetErr::ShapeCollapse {
            op,
            h,
            w,
            window,
            stride,
        };
        let oh = window_out(h, window, stride, padding).ok_or(collapse.clone())?;
        let ow = window_out(w, window, stride, padding).ok_or(collapse)?;
        Ok((oh, ow))
    }
}

/// An immutable directed acyclic computation graph with one input node and
/// one or more named outputs. Parameters are not stored here; callers hold
/// them as a flat slice sized by [`NetworkGraph::param_size`].
#[derive(Debug, Clone)]
pub struct NetworkGraph {
    pub(crate) nodes: Vec<Node>,
    input_shape: Shape,
    pub(crate) outputs: Vec<(String, NodeId)>,
    param_size: usize,
}

impl NetworkGraph {
    /// The feature-map shape the input node accepts.
    pub fn input_shape(&self) -> Shape {
        self.input_shape
    }

    /// Output names in declaration order; the first is the primary output.
    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// The shape of the named output, if it exists.
    pub fn output_shape(&self, name: &str) -> Option<Shape> {
        self.outputs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| self.nodes[id.0].out_shape)
    }

    /// Total amount of scalar parameters the graph consumes.
    pub fn param_size(&self) -> usize {
        self.param_size
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Op names with their output shapes, in evaluation order. Two graphs
    /// built from the same description produce identical topologies.
    pub fn topology(&self) -> Vec<(&'static str, Shape)> {
        self.nodes
            .iter()
            .map(|n| (n.op.name(), n.out_shape))
            .collect()
    }

    /// Allocates and fills a fresh parameter vector: uniform kernels,
    /// Glorot-uniform dense weights, zero biases, identity norm statistics.
    pub fn init_params<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f32> {
        let mut params = vec![0.0; self.param_size];
        for node in &self.nodes {
            let size = node.op.param_size();
            let slice = &mut params[node.param_offset..node.param_offset + size];
            node.op.init_params(slice, rng);
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use crate::{Act, NetErr, Padding};

    use super::GraphBuilder;

    #[test]
    fn rejects_a_second_input() {
        let mut b = GraphBuilder::new();
        b.input(8, 8, 3).unwrap();
        assert!(matches!(
            b.input(8, 8, 3),
            Err(NetErr::InvalidParam { op: "input", .. })
        ));
    }

    #[test]
    fn valid_window_collapse_is_a_construction_error() {
        let mut b = GraphBuilder::new();
        let x = b.input(4, 4, 1).unwrap();
        assert!(matches!(
            b.avg_pool2d(x, 7, 1, Padding::Valid),
            Err(NetErr::ShapeCollapse { op: "avg_pool2d", .. })
        ));
    }

    #[test]
    fn softmax_is_rejected_on_feature_maps() {
        let mut b = GraphBuilder::new();
        let x = b.input(4, 4, 1).unwrap();
        assert!(b.conv2d(x, 2, 1, 1, Padding::Same, Some(Act::Softmax)).is_err());
        assert!(b.activation(x, Act::Softmax).is_err());
    }

    #[test]
    fn finish_requires_input_and_output() {
        assert!(matches!(
            GraphBuilder::new().finish(),
            Err(NetErr::GraphIncomplete { .. })
        ));

        let mut b = GraphBuilder::new();
        b.input(4, 4, 1).unwrap();
        assert!(matches!(
            b.finish(),
            Err(NetErr::GraphIncomplete { .. })
        ));
    }

    #[test]
    fn duplicate_output_names_are_rejected() {
        let mut b = GraphBuilder::new();
        let x = b.input(4, 4, 1).unwrap();
        let f = b.flatten(x).unwrap();
        b.output("output", f).unwrap();
        assert!(matches!(
            b.output("output", f),
            Err(NetErr::DuplicateOutput { .. })
        ));
    }

    #[test]
    fn param_offsets_accumulate_in_wiring_order() {
        let mut b = GraphBuilder::new();
        let x = b.input(8, 8, 3).unwrap();
        let c = b.conv2d(x, 4, 3, 1, Padding::Same, Some(Act::Relu)).unwrap();
        let f = b.flatten(c).unwrap();
        let d = b.dense(f, 10, Some(Act::Softmax)).unwrap();
        b.output("output", d).unwrap();
        let g = b.finish().unwrap();
        // conv: 3*3*3*4 + 4, dense: (8*8*4 + 1) * 10.
        assert_eq!(g.param_size(), 112 + 2570);
    }
}
