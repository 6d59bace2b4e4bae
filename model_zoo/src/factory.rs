//! Builds ready-to-train models from a name and a configuration entry.

use net_core::NetworkGraph;

use crate::arch::googlenet::{OUTPUT_AUX_1, OUTPUT_AUX_2};
use crate::arch::{ArchKind, OUTPUT};
use crate::config::ZooConfig;
use crate::error::{Result, ZooErr};
use crate::recipe::{Loss, LossRecipe, LossTerm, OptimizerSpec};

/// A built graph together with the recipe it should be trained with.
#[derive(Debug)]
pub struct CompiledModel {
    pub graph: NetworkGraph,
    pub recipe: LossRecipe,
    pub input_shape: (usize, usize),
}

/// Builds the named model at the input resolution and class count the
/// configuration prescribes.
///
/// # Arguments
///
/// * `config` - The zoo configuration holding per-model entries.
/// * `name` - A registered model name, e.g. `"GoogLeNet"`.
/// * `num_classes` - Width of the softmax head(s).
pub fn get_model(config: &ZooConfig, name: &str, num_classes: usize) -> Result<CompiledModel> {
    let entry = config.entry(name)?;
    let kind =
        ArchKind::from_name(name).ok_or_else(|| ZooErr::UnknownModel(name.to_string()))?;
    let input_shape = entry.input_shape;

    log::info!(
        "building {} at {}x{} with {} classes",
        kind.name(),
        input_shape.0,
        input_shape.1,
        num_classes
    );

    let graph = kind.build(input_shape, num_classes)?;
    let recipe = recipe_for(kind)?;
    Ok(CompiledModel {
        graph,
        recipe,
        input_shape,
    })
}

fn recipe_for(kind: ArchKind) -> Result<LossRecipe> {
    let recipe = match kind {
        // Two auxiliary heads, each weighted well below the main head.
        ArchKind::GoogLeNet => LossRecipe::weighted(
            vec![
                LossTerm {
                    output: OUTPUT.to_string(),
                    loss: Loss::CategoricalCrossentropy,
                    weight: 1.0,
                },
                LossTerm {
                    output: OUTPUT_AUX_1.to_string(),
                    loss: Loss::CategoricalCrossentropy,
                    weight: 0.3,
                },
                LossTerm {
                    output: OUTPUT_AUX_2.to_string(),
                    loss: Loss::CategoricalCrossentropy,
                    weight: 0.3,
                },
            ],
            OptimizerSpec::Sgd {
                learning_rate: 0.1,
                momentum: 0.9,
            },
        )?,
        ArchKind::MobileNetV2 => LossRecipe::single(
            Loss::CategoricalCrossentropy,
            OptimizerSpec::Sgd {
                learning_rate: 0.01,
                momentum: 0.0,
            },
        ),
        _ => LossRecipe::single(
            Loss::CategoricalCrossentropy,
            OptimizerSpec::Adam {
                learning_rate: 0.001,
            },
        ),
    };
    Ok(recipe)
}
