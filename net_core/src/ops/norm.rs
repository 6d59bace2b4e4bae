use crate::{
    Result,
    shape::Value,
};

const EPSILON: f32 = 1e-3;

/// Inference-time batch normalization over the channel axis. Parameters are
/// four per-channel vectors in order: gamma, beta, moving mean, moving
/// variance.
#[derive(Debug, Clone)]
pub(crate) struct BatchNorm {
    pub(crate) c: usize,
}

impl BatchNorm {
    pub(crate) fn param_size(&self) -> usize {
        4 * self.c
    }

    pub(crate) fn forward(&self, params: &[f32], input: &Value) -> Result<Value> {
        let x = input.as_map("batch_norm")?;
        let c = self.c;
        let (gamma, rest) = params.split_at(c);
        let (beta, rest) = rest.split_at(c);
        let (mean, var) = rest.split_at(c);

        let mut out = x.clone();
        for ((_, _, _, ch), v) in out.indexed_iter_mut() {
            *v = gamma[ch] * (*v - mean[ch]) / (var[ch] + EPSILON).sqrt() + beta[ch];
        }
        Ok(Value::Map(out))
    }

    /// Identity statistics: gamma 1, beta 0, mean 0, variance 1.
    pub(crate) fn init_params(&self, params: &mut [f32]) {
        let c = self.c;
        params[..c].fill(1.0);
        params[c..3 * c].fill(0.0);
        params[3 * c..].fill(1.0);
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array4;

    use super::*;

    #[test]
    fn normalizes_with_stored_statistics() {
        let bn = BatchNorm { c: 1 };
        // gamma 2, beta 1, mean 3, var 1.
        let params = vec![2.0, 1.0, 3.0, 1.0];
        let mut x = Array4::zeros((1, 1, 1, 1));
        x[[0, 0, 0, 0]] = 5.0;
        let out = bn.forward(&params, &Value::Map(x)).unwrap();
        let Value::Map(out) = out else { unreachable!() };
        let expected = 2.0 * (5.0 - 3.0) / (1.0_f32 + EPSILON).sqrt() + 1.0;
        assert!((out[[0, 0, 0, 0]] - expected).abs() < 1e-6);
    }

    #[test]
    fn identity_init_passes_values_through() {
        let bn = BatchNorm { c: 2 };
        let mut params = vec![0.0; bn.param_size()];
        bn.init_params(&mut params);
        let mut x = Array4::zeros((1, 1, 1, 2));
        x[[0, 0, 0, 0]] = -1.5;
        x[[0, 0, 0, 1]] = 2.5;
        let out = bn.forward(&params, &Value::Map(x.clone())).unwrap();
        let Value::Map(out) = out else { unreachable!() };
        for (a, b) in out.iter().zip(x.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }
}
