use ndarray::{Array2, Array4};

/// Activation functions applied by the ops that carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Act {
    Relu,
    Relu6,
    /// Row-wise softmax; only valid on flat values.
    Softmax,
}

impl Act {
    /// Whether the activation is defined elementwise and can therefore run
    /// on a feature map.
    pub(crate) fn is_elementwise(&self) -> bool {
        !matches!(self, Act::Softmax)
    }

    pub(crate) fn apply_map(&self, x: &mut Array4<f32>) {
        match self {
            Act::Relu => x.mapv_inplace(|v| v.max(0.0)),
            Act::Relu6 => x.mapv_inplace(|v| v.clamp(0.0, 6.0)),
            // Rejected at graph construction.
            Act::Softmax => {}
        }
    }

    pub(crate) fn apply_flat(&self, x: &mut Array2<f32>) {
        match self {
            Act::Relu => x.mapv_inplace(|v| v.max(0.0)),
            Act::Relu6 => x.mapv_inplace(|v| v.clamp(0.0, 6.0)),
            Act::Softmax => {
                for mut row in x.rows_mut() {
                    let max = row.fold(f32::NEG_INFINITY, |a, &b| a.max(b));
                    row.mapv_inplace(|v| (v - max).exp());
                    let sum = row.sum();
                    row.mapv_inplace(|v| v / sum);
                }
            }
        }
    }
}
