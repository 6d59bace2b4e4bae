//! Persistence of flat parameter vectors as safetensors artifacts.
//!
//! A model's entire parameter vector is stored as a single rank-1
//! tensor, either at full precision or quantized to half precision.
//! The model name travels in the file metadata so a loader can refuse
//! mismatched artifacts.

use std::{collections::HashMap, fs, path::Path};

use half::f16;
use safetensors::SafeTensors;
use safetensors::tensor::{Dtype, TensorView};

use crate::error::{Result, ZooErr};

/// Name of the single tensor each artifact carries.
pub const PARAMS_TENSOR: &str = "params";

/// Metadata key the model name is filed under.
pub const MODEL_KEY: &str = "model";

/// Storage precision of an artifact's parameter tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    F32,
    F16,
}

/// Writes `params` to `path` as a safetensors artifact.
///
/// # Arguments
///
/// * `path` - Destination file, created or truncated.
/// * `model_name` - Recorded in the metadata for later validation.
/// * `params` - The model's flat parameter vector.
/// * `precision` - `F16` halves the file size at some accuracy cost.
pub fn save<P: AsRef<Path>>(
    path: P,
    model_name: &str,
    params: &[f32],
    precision: Precision,
) -> Result<()> {
    let path = path.as_ref();
    let bytes: Vec<u8> = match precision {
        Precision::F32 => bytemuck::cast_slice(params).to_vec(),
        Precision::F16 => {
            let halves: Vec<f16> = params.iter().map(|&v| f16::from_f32(v)).collect();
            bytemuck::cast_slice(&halves).to_vec()
        }
    };
    let dtype = match precision {
        Precision::F32 => Dtype::F32,
        Precision::F16 => Dtype::F16,
    };
    let view = TensorView::new(dtype, vec![params.len()], &bytes).map_err(|e| {
        ZooErr::Artifact {
            path: path.to_path_buf(),
            msg: e.to_string(),
        }
    })?;
    let metadata = HashMap::from([(MODEL_KEY.to_string(), model_name.to_string())]);
    let data = safetensors::serialize([(PARAMS_TENSOR, view)], &Some(metadata)).map_err(|e| {
        ZooErr::Artifact {
            path: path.to_path_buf(),
            msg: e.to_string(),
        }
    })?;
    fs::write(path, data).map_err(|source| ZooErr::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads an artifact back into an f32 parameter vector, widening half
/// precision tensors on the fly. Returns the parameters and the model
/// name recorded at save time, if any.
pub fn load<P: AsRef<Path>>(path: P) -> Result<(Vec<f32>, Option<String>)> {
    let path = path.as_ref();
    let raw = fs::read(path).map_err(|source| ZooErr::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bad = |msg: String| ZooErr::Artifact {
        path: path.to_path_buf(),
        msg,
    };
    let tensors = SafeTensors::deserialize(&raw).map_err(|e| bad(e.to_string()))?;
    let tensor = tensors
        .tensor(PARAMS_TENSOR)
        .map_err(|e| bad(e.to_string()))?;
    // The byte payload may be unaligned inside the file, so copy
    // through bytemuck rather than reinterpreting in place.
    let params = match tensor.dtype() {
        Dtype::F32 => bytemuck::pod_collect_to_vec::<u8, f32>(tensor.data()),
        Dtype::F16 => bytemuck::pod_collect_to_vec::<u8, f16>(tensor.data())
            .into_iter()
            .map(f16::to_f32)
            .collect(),
        other => return Err(bad(format!("unsupported dtype {other:?}"))),
    };
    let (_, metadata) = SafeTensors::read_metadata(&raw).map_err(|e| bad(e.to_string()))?;
    let model = metadata
        .metadata()
        .as_ref()
        .and_then(|m| m.get(MODEL_KEY))
        .cloned();
    Ok((params, model))
}
