use ndarray::{Array2, Array4, ArrayView1, ArrayView2, ArrayView3, Axis, linalg};
use rand::Rng;

use crate::{
    Result,
    act::Act,
    shape::Value,
};

/// Uniform init range for convolution kernels.
const UNIFORM_LIMIT: f32 = 0.05;

/// A 2-D convolution over NHWC feature maps.
///
/// The spatial product is lowered to im2col followed by one GEMM per batch
/// item, so the expensive part runs through `general_mat_mul` just like the
/// dense layers do. Parameters are laid out `[k, k, in_c, filters]` followed
/// by `filters` biases.
#[derive(Debug, Clone)]
pub(crate) struct Conv2d {
    pub(crate) in_c: usize,
    pub(crate) filters: usize,
    pub(crate) kernel: usize,
    pub(crate) stride: usize,
    pub(crate) act: Option<Act>,
    pub(crate) out_hw: (usize, usize),
    pub(crate) pad: (usize, usize),
}

impl Conv2d {
    pub(crate) fn param_size(&self) -> usize {
        self.kernel * self.kernel * self.in_c * self.filters + self.filters
    }

    /// Gives a view of the raw parameter slice as the kernel matrix and biases.
    fn view_params<'a>(&self, params: &'a [f32]) -> (ArrayView2<'a, f32>, ArrayView1<'a, f32>) {
        let w_size = self.param_size() - self.filters;
        let w_rows = self.kernel * self.kernel * self.in_c;
        let weights = ArrayView2::from_shape((w_rows, self.filters), &params[..w_size]).unwrap();
        let biases = ArrayView1::from_shape(self.filters, &params[w_size..]).unwrap();
        (weights, biases)
    }

    pub(crate) fn forward(&self, params: &[f32], input: &Value) -> Result<Value> {
        let x = input.as_map("conv2d")?;
        let (n, _, _, _) = x.dim();
        let (oh, ow) = self.out_hw;
        let (weights, biases) = self.view_params(params);

        let mut out = Array4::zeros((n, oh, ow, self.filters));
        for b in 0..n {
            let cols = im2col(
                x.index_axis(Axis(0), b),
                self.kernel,
                self.stride,
                self.pad,
                self.out_hw,
            );
            let mut z = Array2::zeros((oh * ow, self.filters));
            linalg::general_mat_mul(1.0, &cols, &weights, 0.0, &mut z);
            z += &biases;
            if let Some(act) = self.act {
                act.apply_flat(&mut z);
            }
            let z = z.into_shape_with_order((oh, ow, self.filters)).unwrap();
            out.index_axis_mut(Axis(0), b).assign(&z);
        }
        Ok(Value::Map(out))
    }

    pub(crate) fn init_params<R: Rng + ?Sized>(&self, params: &mut [f32], rng: &mut R) {
        let w_size = self.param_size() - self.filters;
        for p in &mut params[..w_size] {
            *p = rng.random_range(-UNIFORM_LIMIT..UNIFORM_LIMIT);
        }
        params[w_size..].fill(0.0);
    }
}

/// A depthwise 2-D convolution: one `k`x`k` kernel per input channel, no
/// cross-channel mixing. Parameters are `[k, k, c]` kernels then `c` biases.
#[derive(Debug, Clone)]
pub(crate) struct DepthwiseConv2d {
    pub(crate) c: usize,
    pub(crate) kernel: usize,
    pub(crate) stride: usize,
    pub(crate) act: Option<Act>,
    pub(crate) out_hw: (usize, usize),
    pub(crate) pad: (usize, usize),
}

impl DepthwiseConv2d {
    pub(crate) fn param_size(&self) -> usize {
        self.kernel * self.kernel * self.c + self.c
    }

    pub(crate) fn forward(&self, params: &[f32], input: &Value) -> Result<Value> {
        let x = input.as_map("depthwise_conv2d")?;
        let (n, h, w, c) = x.dim();
        let (oh, ow) = self.out_hw;
        let k = self.kernel;
        let w_size = k * k * c;
        let kernels = ArrayView3::from_shape((k, k, c), &params[..w_size]).unwrap();
        let biases = &params[w_size..];

        let mut out = Array4::zeros((n, oh, ow, c));
        for b in 0..n {
            for oy in 0..oh {
                for ox in 0..ow {
                    for ch in 0..c {
                        let mut acc = biases[ch];
                        for ky in 0..k {
                            let iy = (oy * self.stride + ky) as isize - self.pad.0 as isize;
                            if iy < 0 || iy >= h as isize {
                                continue;
                            }
                            for kx in 0..k {
                                let ix = (ox * self.stride + kx) as isize - self.pad.1 as isize;
                                if ix < 0 || ix >= w as isize {
                                    continue;
                                }
                                acc += kernels[[ky, kx, ch]]
                                    * x[[b, iy as usize, ix as usize, ch]];
                            }
                        }
                        out[[b, oy, ox, ch]] = acc;
                    }
                }
            }
        }
        if let Some(act) = self.act {
            act.apply_map(&mut out);
        }
        Ok(Value::Map(out))
    }

    pub(crate) fn init_params<R: Rng + ?Sized>(&self, params: &mut [f32], rng: &mut R) {
        let w_size = self.param_size() - self.c;
        for p in &mut params[..w_size] {
            *p = rng.random_range(-UNIFORM_LIMIT..UNIFORM_LIMIT);
        }
        params[w_size..].fill(0.0);
    }
}

/// Unrolls one image's sliding windows into a `(out_h * out_w, k * k * c)`
/// matrix. Out-of-bounds positions stay zero, which realizes the padding.
fn im2col(
    img: ArrayView3<f32>,
    k: usize,
    stride: usize,
    pad: (usize, usize),
    out_hw: (usize, usize),
) -> Array2<f32> {
    let (h, w, c) = img.dim();
    let (oh, ow) = out_hw;
    let mut cols = Array2::zeros((oh * ow, k * k * c));
    for oy in 0..oh {
        for ox in 0..ow {
            let row = oy * ow + ox;
            for ky in 0..k {
                let iy = (oy * stride + ky) as isize - pad.0 as isize;
                if iy < 0 || iy >= h as isize {
                    continue;
                }
                for kx in 0..k {
                    let ix = (ox * stride + kx) as isize - pad.1 as isize;
                    if ix < 0 || ix >= w as isize {
                        continue;
                    }
                    let base = (ky * k + kx) * c;
                    for ch in 0..c {
                        cols[[row, base + ch]] = img[[iy as usize, ix as usize, ch]];
                    }
                }
            }
        }
    }
    cols
}

#[cfg(test)]
mod tests {
    use ndarray::Array4;

    use super::*;

    fn ramp_input(h: usize, w: usize) -> Value {
        let mut x = Array4::zeros((1, h, w, 1));
        for y in 0..h {
            for xx in 0..w {
                x[[0, y, xx, 0]] = (y * w + xx) as f32;
            }
        }
        Value::Map(x)
    }

    #[test]
    fn valid_conv_sums_windows() {
        let conv = Conv2d {
            in_c: 1,
            filters: 1,
            kernel: 2,
            stride: 1,
            act: None,
            out_hw: (2, 2),
            pad: (0, 0),
        };
        // All-ones kernel, zero bias: each output is its window sum.
        let params = vec![1.0; 4 + 1];
        let params = {
            let mut p = params;
            p[4] = 0.0;
            p
        };
        let out = conv.forward(&params, &ramp_input(3, 3)).unwrap();
        let Value::Map(out) = out else { unreachable!() };
        // Window at (0,0) covers 0,1,3,4.
        assert_eq!(out[[0, 0, 0, 0]], 8.0);
        assert_eq!(out[[0, 1, 1, 0]], 4.0 + 5.0 + 7.0 + 8.0);
    }

    #[test]
    fn bias_and_relu_apply_after_the_sum() {
        let conv = Conv2d {
            in_c: 1,
            filters: 1,
            kernel: 1,
            stride: 1,
            act: Some(Act::Relu),
            out_hw: (2, 2),
            pad: (0, 0),
        };
        // Kernel -1, bias +1: output is relu(1 - x).
        let params = vec![-1.0, 1.0];
        let out = conv.forward(&params, &ramp_input(2, 2)).unwrap();
        let Value::Map(out) = out else { unreachable!() };
        assert_eq!(out[[0, 0, 0, 0]], 1.0);
        assert_eq!(out[[0, 0, 1, 0]], 0.0);
        assert_eq!(out[[0, 1, 1, 0]], 0.0);
    }

    #[test]
    fn depthwise_keeps_channels_independent() {
        let dw = DepthwiseConv2d {
            c: 2,
            kernel: 1,
            stride: 1,
            act: None,
            out_hw: (1, 1),
            pad: (0, 0),
        };
        let mut x = Array4::zeros((1, 1, 1, 2));
        x[[0, 0, 0, 0]] = 3.0;
        x[[0, 0, 0, 1]] = 5.0;
        // Channel kernels [2, 10], biases [0, 1].
        let params = vec![2.0, 10.0, 0.0, 1.0];
        let out = dw.forward(&params, &Value::Map(x)).unwrap();
        let Value::Map(out) = out else { unreachable!() };
        assert_eq!(out[[0, 0, 0, 0]], 6.0);
        assert_eq!(out[[0, 0, 0, 1]], 51.0);
    }
}
