mod conv;
mod dense;
mod norm;
mod pool;

use ndarray::Axis;
use rand::Rng;

pub(crate) use conv::{Conv2d, DepthwiseConv2d};
pub(crate) use dense::Dense;
pub(crate) use norm::BatchNorm;
pub(crate) use pool::Pool2d;

use crate::{
    Result,
    act::Act,
    shape::Value,
};

/// One node's operation. Parameters live outside the op in a flat slice;
/// each op only knows how many it consumes and how to view them.
#[derive(Debug, Clone)]
pub(crate) enum Op {
    Input,
    Conv2d(Conv2d),
    DepthwiseConv2d(DepthwiseConv2d),
    Dense(Dense),
    MaxPool2d(Pool2d),
    AvgPool2d(Pool2d),
    GlobalAvgPool,
    BatchNorm(BatchNorm),
    Activation(Act),
    Flatten,
    Dropout { rate: f32 },
    Concat,
    Add,
    CropCenter { h: usize, w: usize },
}

impl Op {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Op::Input => "input",
            Op::Conv2d(_) => "conv2d",
            Op::DepthwiseConv2d(_) => "depthwise_conv2d",
            Op::Dense(_) => "dense",
            Op::MaxPool2d(_) => "max_pool2d",
            Op::AvgPool2d(_) => "avg_pool2d",
            Op::GlobalAvgPool => "global_avg_pool",
            Op::BatchNorm(_) => "batch_norm",
            Op::Activation(_) => "activation",
            Op::Flatten => "flatten",
            Op::Dropout { .. } => "dropout",
            Op::Concat => "concat",
            Op::Add => "add",
            Op::CropCenter { .. } => "crop_center",
        }
    }

    /// The amount of parameters this op consumes from the flat slice.
    pub(crate) fn param_size(&self) -> usize {
        match self {
            Op::Conv2d(l) => l.param_size(),
            Op::DepthwiseConv2d(l) => l.param_size(),
            Op::Dense(l) => l.param_size(),
            Op::BatchNorm(l) => l.param_size(),
            _ => 0,
        }
    }

    /// Evaluates the op. `inputs` follows the wiring order fixed at
    /// construction; `params` is exactly `param_size` long.
    pub(crate) fn forward(&self, params: &[f32], inputs: &[&Value]) -> Result<Value> {
        match self {
            Op::Input => Ok((*inputs[0]).clone()),
            Op::Conv2d(l) => l.forward(params, inputs[0]),
            Op::DepthwiseConv2d(l) => l.forward(params, inputs[0]),
            Op::Dense(l) => l.forward(params, inputs[0]),
            Op::MaxPool2d(l) => l.forward_max(inputs[0]),
            Op::AvgPool2d(l) => l.forward_avg(inputs[0]),
            Op::GlobalAvgPool => {
                let x = inputs[0].as_map("global_avg_pool")?;
                let pooled = x.mean_axis(Axis(1)).unwrap().mean_axis(Axis(1)).unwrap();
                Ok(Value::Flat(pooled))
            }
            Op::BatchNorm(l) => l.forward(params, inputs[0]),
            Op::Activation(act) => match (*inputs[0]).clone() {
                Value::Map(mut x) => {
                    act.apply_map(&mut x);
                    Ok(Value::Map(x))
                }
                Value::Flat(mut x) => {
                    act.apply_flat(&mut x);
                    Ok(Value::Flat(x))
                }
            },
            Op::Flatten => {
                let x = inputs[0].as_map("flatten")?;
                let (n, h, w, c) = x.dim();
                let flat = x.clone().into_shape_with_order((n, h * w * c)).unwrap();
                Ok(Value::Flat(flat))
            }
            // Dropout only acts during training, which happens outside this
            // crate; at inference it forwards its input untouched.
            Op::Dropout { .. } => Ok((*inputs[0]).clone()),
            Op::Concat => {
                let mut views = Vec::with_capacity(inputs.len());
                for v in inputs {
                    views.push(v.as_map("concat")?.view());
                }
                Ok(Value::Map(ndarray::concatenate(Axis(3), &views).unwrap()))
            }
            Op::Add => {
                let a = inputs[0].as_map("add")?;
                let b = inputs[1].as_map("add")?;
                Ok(Value::Map(a + b))
            }
            Op::CropCenter { h, w } => {
                let x = inputs[0].as_map("crop_center")?;
                let (_, ih, iw, _) = x.dim();
                let top = (ih - h) / 2;
                let left = (iw - w) / 2;
                let cropped = x
                    .slice(ndarray::s![.., top..top + h, left..left + w, ..])
                    .to_owned();
                Ok(Value::Map(cropped))
            }
        }
    }

    /// Fills this op's slice of a fresh parameter vector.
    pub(crate) fn init_params<R: Rng + ?Sized>(&self, params: &mut [f32], rng: &mut R) {
        match self {
            Op::Conv2d(l) => l.init_params(params, rng),
            Op::DepthwiseConv2d(l) => l.init_params(params, rng),
            Op::Dense(l) => l.init_params(params, rng),
            Op::BatchNorm(l) => l.init_params(params),
            _ => {}
        }
    }
}
