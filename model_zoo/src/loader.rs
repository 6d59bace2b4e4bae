//! Rebuilds a model from its name and a saved parameter artifact.

use std::path::Path;

use crate::artifact;
use crate::config::ZooConfig;
use crate::error::{Result, ZooErr};
use crate::factory::{self, CompiledModel};

/// Rebuilds the named model and pairs it with the parameters stored at
/// `path`.
///
/// The graph is assembled fresh from the configuration, so the artifact
/// must have been saved from a model built with the same entry. A
/// parameter count mismatch fails instead of producing a silently
/// broken model.
pub fn load_model<P: AsRef<Path>>(
    config: &ZooConfig,
    name: &str,
    path: P,
) -> Result<(CompiledModel, Vec<f32>)> {
    let entry = config.entry(name)?;
    let num_classes = entry.class_names.len();
    let model = factory::get_model(config, name, num_classes)?;

    let (params, saved_name) = artifact::load(path)?;
    if let Some(saved) = &saved_name
        && saved != name
    {
        log::warn!("artifact was saved from {saved}, loading into {name}");
    }
    let expected = model.graph.param_size();
    if params.len() != expected {
        return Err(ZooErr::ParamCount {
            model: name.to_string(),
            got: params.len(),
            expected,
        });
    }
    log::info!("loaded {} parameters for {name}", params.len());
    Ok((model, params))
}
