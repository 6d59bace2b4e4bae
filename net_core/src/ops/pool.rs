use ndarray::Array4;

use crate::{
    Result,
    shape::Value,
};

/// A 2-D pooling window. Padding cells never contribute: max ignores them
/// and average divides by the in-bounds cell count, matching the framework
/// semantics the architectures were published against.
#[derive(Debug, Clone)]
pub(crate) struct Pool2d {
    pub(crate) window: usize,
    pub(crate) stride: usize,
    pub(crate) out_hw: (usize, usize),
    pub(crate) pad: (usize, usize),
}

impl Pool2d {
    pub(crate) fn forward_max(&self, input: &Value) -> Result<Value> {
        self.forward(input, "max_pool2d", f32::max, |acc, _| acc)
    }

    pub(crate) fn forward_avg(&self, input: &Value) -> Result<Value> {
        self.forward(input, "avg_pool2d", |a, b| a + b, |acc, count| {
            acc / count as f32
        })
    }

    fn forward(
        &self,
        input: &Value,
        op: &'static str,
        fold: impl Fn(f32, f32) -> f32,
        finish: impl Fn(f32, usize) -> f32,
    ) -> Result<Value> {
        let x = input.as_map(op)?;
        let (n, h, w, c) = x.dim();
        let (oh, ow) = self.out_hw;

        let mut out = Array4::zeros((n, oh, ow, c));
        for b in 0..n {
            for oy in 0..oh {
                for ox in 0..ow {
                    for ch in 0..c {
                        let mut acc = f32::NEG_INFINITY;
                        let mut count = 0;
                        for ky in 0..self.window {
                            let iy = (oy * self.stride + ky) as isize - self.pad.0 as isize;
                            if iy < 0 || iy >= h as isize {
                                continue;
                            }
                            for kx in 0..self.window {
                                let ix = (ox * self.stride + kx) as isize - self.pad.1 as isize;
                                if ix < 0 || ix >= w as isize {
                                    continue;
                                }
                                let v = x[[b, iy as usize, ix as usize, ch]];
                                acc = if count == 0 { v } else { fold(acc, v) };
                                count += 1;
                            }
                        }
                        out[[b, oy, ox, ch]] = finish(acc, count);
                    }
                }
            }
        }
        Ok(Value::Map(out))
    }
}
