use ndarray::{Array2, ArrayView1, ArrayView2, linalg};
use rand::Rng;

use crate::{
    Result,
    act::Act,
    shape::Value,
};

/// A fully-connected layer over flat values. Parameters are the
/// `(in_dim, units)` weight matrix followed by `units` biases.
#[derive(Debug, Clone)]
pub(crate) struct Dense {
    pub(crate) in_dim: usize,
    pub(crate) units: usize,
    pub(crate) act: Option<Act>,
}

impl Dense {
    pub(crate) fn param_size(&self) -> usize {
        (self.in_dim + 1) * self.units
    }

    /// Gives a view of the raw parameter slice as the weights and biases of this layer.
    fn view_params<'a>(&self, params: &'a [f32]) -> (ArrayView2<'a, f32>, ArrayView1<'a, f32>) {
        let w_size = self.in_dim * self.units;
        let weights =
            ArrayView2::from_shape((self.in_dim, self.units), &params[..w_size]).unwrap();
        let biases = ArrayView1::from_shape(self.units, &params[w_size..]).unwrap();
        (weights, biases)
    }

    pub(crate) fn forward(&self, params: &[f32], input: &Value) -> Result<Value> {
        let x = input.as_flat("dense")?;
        let (weights, biases) = self.view_params(params);

        let mut z = Array2::zeros((x.nrows(), self.units));
        linalg::general_mat_mul(1.0, x, &weights, 0.0, &mut z);
        z += &biases;
        if let Some(act) = self.act {
            act.apply_flat(&mut z);
        }
        Ok(Value::Flat(z))
    }

    /// Glorot-uniform weights, zero biases.
    pub(crate) fn init_params<R: Rng + ?Sized>(&self, params: &mut [f32], rng: &mut R) {
        let w_size = self.in_dim * self.units;
        let limit = (6.0 / (self.in_dim + self.units) as f32).sqrt();
        for p in &mut params[..w_size] {
            *p = rng.random_range(-limit..limit);
        }
        params[w_size..].fill(0.0);
    }
}
