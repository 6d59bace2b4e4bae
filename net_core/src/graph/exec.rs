use ndarray::{Array2, ArrayView4};

use crate::{
    NetErr, Result,
    ops::Op,
    shape::Value,
};

use super::NetworkGraph;

impl NetworkGraph {
    /// Runs one forward pass and returns every named output as a
    /// `(batch, features)` matrix, in output declaration order.
    ///
    /// # Arguments
    /// * `params` - The flat parameter slice, exactly `param_size` long.
    /// * `x` - An NHWC batch matching the graph's input shape.
    ///
    /// # Errors
    /// Fails before evaluating anything if the parameter count or the input
    /// shape disagrees with the graph.
    pub fn forward(
        &self,
        params: &[f32],
        x: ArrayView4<f32>,
    ) -> Result<Vec<(String, Array2<f32>)>> {
        if params.len() != self.param_size() {
            return Err(NetErr::SizeMismatch {
                what: "params",
                got: params.len(),
                expected: self.param_size(),
            });
        }
        let (_, h, w, c) = x.dim();
        let (eh, ew, ec) = self.input_shape().as_map("input")?;
        for (what, got, expected) in [
            ("input height", h, eh),
            ("input width", w, ew),
            ("input channels", c, ec),
        ] {
            if got != expected {
                return Err(NetErr::SizeMismatch {
                    what,
                    got,
                    expected,
                });
            }
        }

        let bound = Value::Map(x.to_owned());
        let mut values: Vec<Option<Value>> = vec![None; self.nodes.len()];
        for (idx, node) in self.nodes.iter().enumerate() {
            let value = {
                let inputs: Vec<&Value> = if matches!(node.op, Op::Input) {
                    vec![&bound]
                } else {
                    node.inputs
                        .iter()
                        .map(|dep| values[dep.0].as_ref().unwrap())
                        .collect()
                };
                let size = node.op.param_size();
                let slice = &params[node.param_offset..node.param_offset + size];
                node.op.forward(slice, &inputs)?
            };
            values[idx] = Some(value);
        }

        let mut outputs = Vec::with_capacity(self.outputs.len());
        for (name, id) in &self.outputs {
            let value = values[id.0].as_ref().unwrap();
            outputs.push((name.clone(), value.as_flat("output")?.clone()));
        }
        Ok(outputs)
    }
}
