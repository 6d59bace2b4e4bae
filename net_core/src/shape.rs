use ndarray::{Array2, Array4};

use crate::{NetErr, Result};

/// Edge handling for convolution and pooling windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// Zero-pad so the output keeps `ceil(dim / stride)` positions.
    Same,
    /// No padding; the window must fit entirely inside the input.
    Valid,
}

/// The build-time shape of a node's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A feature map of `h` by `w` positions with `c` channels.
    Map { h: usize, w: usize, c: usize },
    /// A flat feature vector.
    Flat { len: usize },
}

impl Shape {
    pub fn map(h: usize, w: usize, c: usize) -> Self {
        Shape::Map { h, w, c }
    }

    pub(crate) fn as_map(&self, op: &'static str) -> Result<(usize, usize, usize)> {
        match *self {
            Shape::Map { h, w, c } => Ok((h, w, c)),
            Shape::Flat { .. } => Err(NetErr::WrongRank { op }),
        }
    }

    pub(crate) fn as_flat(&self, op: &'static str) -> Result<usize> {
        match *self {
            Shape::Flat { len } => Ok(len),
            Shape::Map { .. } => Err(NetErr::WrongRank { op }),
        }
    }
}

/// A runtime tensor flowing between ops. Feature maps are NHWC.
#[derive(Debug, Clone)]
pub enum Value {
    Map(Array4<f32>),
    Flat(Array2<f32>),
}

impl Value {
    pub(crate) fn as_map(&self, op: &'static str) -> Result<&Array4<f32>> {
        match self {
            Value::Map(x) => Ok(x),
            Value::Flat(_) => Err(NetErr::WrongRank { op }),
        }
    }

    pub(crate) fn as_flat(&self, op: &'static str) -> Result<&Array2<f32>> {
        match self {
            Value::Flat(x) => Ok(x),
            Value::Map(_) => Err(NetErr::WrongRank { op }),
        }
    }
}

/// Output extent of one spatial dimension for a sliding window, or `None`
/// when a valid window no longer fits.
pub(crate) fn window_out(dim: usize, window: usize, stride: usize, padding: Padding) -> Option<usize> {
    match padding {
        Padding::Same => Some(dim.div_ceil(stride)),
        Padding::Valid => {
            if dim >= window && window > 0 {
                Some((dim - window) / stride + 1)
            } else {
                None
            }
        }
    }
}

/// Leading zero-pad for one dimension given its precomputed output extent.
pub(crate) fn pad_before(dim: usize, out: usize, window: usize, stride: usize) -> usize {
    ((out - 1) * stride + window).saturating_sub(dim) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_padding_preserves_unit_stride_extent() {
        assert_eq!(window_out(28, 3, 1, Padding::Same), Some(28));
        assert_eq!(window_out(28, 5, 1, Padding::Same), Some(28));
    }

    #[test]
    fn same_padding_halves_on_stride_two() {
        assert_eq!(window_out(224, 7, 2, Padding::Same), Some(112));
        assert_eq!(window_out(5, 3, 2, Padding::Same), Some(3));
    }

    #[test]
    fn valid_padding_shrinks() {
        assert_eq!(window_out(28, 5, 1, Padding::Valid), Some(24));
        assert_eq!(window_out(14, 5, 3, Padding::Valid), Some(4));
    }

    #[test]
    fn valid_padding_collapses_when_window_exceeds_input() {
        assert_eq!(window_out(4, 7, 1, Padding::Valid), None);
    }

    #[test]
    fn pad_before_centers_the_window() {
        // 3x3 same window on stride 1 pads one cell on the leading edge.
        assert_eq!(pad_before(28, 28, 3, 1), 1);
        // 7x7 stride-2 same on 224 -> 112 outputs, total pad 5, leading 2.
        assert_eq!(pad_before(224, 112, 7, 2), 2);
    }
}
