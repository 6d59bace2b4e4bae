//! Single-image classification against a saved model artifact.

use std::path::Path;

use anyhow::{Context, bail};
use model_zoo::ZooConfig;
use ndarray::ArrayView1;

use crate::images;

/// Loads the named model from `artifact`, runs `image` through it and
/// returns the predicted class name.
pub fn classify<P: AsRef<Path>>(
    config: &ZooConfig,
    model_name: &str,
    artifact: P,
    image: P,
) -> anyhow::Result<String> {
    let entry = config.entry(model_name)?;
    let class_names = entry.class_names.clone();
    let (h, w) = entry.input_shape;

    let (model, params) = model_zoo::load_model(config, model_name, artifact)
        .context("failed to load the model artifact")?;
    let batch = images::load_images(&[image], h, w)?;

    let outputs = model.graph.forward(&params, batch.view())?;
    // The primary output is declared first; auxiliary heads only matter
    // during training.
    let (_, probs) = outputs
        .first()
        .context("the graph produced no outputs")?;
    predict_label(probs.row(0), &class_names)
}

/// Maps a probability row to the name of its strongest class.
pub fn predict_label(probs: ArrayView1<f32>, class_names: &[String]) -> anyhow::Result<String> {
    if probs.len() != class_names.len() {
        bail!(
            "model emits {} classes but the label table has {}",
            probs.len(),
            class_names.len()
        );
    }
    let best = argmax(probs).context("the model emitted an empty probability row")?;
    log::debug!("predicted class {best} with probability {}", probs[best]);
    Ok(class_names[best].clone())
}

fn argmax(row: ArrayView1<f32>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in row.iter().enumerate() {
        if best.is_none_or(|(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use model_zoo::artifact::{self, Precision};
    use model_zoo::{ModelEntry, ZooConfig};
    use ndarray::array;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn argmax_picks_the_strongest_class() {
        let row = array![0.1_f32, 0.7, 0.2];
        assert_eq!(argmax(row.view()), Some(1));
        assert_eq!(argmax(array![].view()), None);
    }

    #[test]
    fn predict_label_rejects_a_mismatched_label_table() {
        let row = array![0.5_f32, 0.5];
        let names = vec!["cat".to_string()];
        assert!(predict_label(row.view(), &names).is_err());
    }

    #[test]
    fn classify_runs_a_saved_model_end_to_end() {
        let mut config = ZooConfig::default();
        config.models.insert(
            "MobileNetV2".to_string(),
            ModelEntry {
                input_shape: (32, 32),
                class_names: model_zoo::CIFAR_10_CLASS_NAMES
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
        );
        let built = model_zoo::get_model(&config, "MobileNetV2", 10).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let params = built.graph.init_params(&mut rng);

        let dir = tempfile::tempdir().unwrap();
        let artifact_path = dir.path().join("mnv2.st");
        artifact::save(&artifact_path, "MobileNetV2", &params, Precision::F16).unwrap();

        let image_path = dir.path().join("sample.png");
        image::RgbImage::from_pixel(8, 8, image::Rgb([40, 90, 200]))
            .save(&image_path)
            .unwrap();

        let label = classify(&config, "MobileNetV2", &artifact_path, &image_path).unwrap();
        assert!(model_zoo::CIFAR_10_CLASS_NAMES.contains(&label.as_str()));

        // The label must be the argmax of the same forward pass the
        // driver ran, through the same widened parameters.
        let (model, loaded) =
            model_zoo::load_model(&config, "MobileNetV2", &artifact_path).unwrap();
        let batch = images::load_images(&[&image_path], 32, 32).unwrap();
        let outputs = model.graph.forward(&loaded, batch.view()).unwrap();
        let (_, probs) = &outputs[0];
        let best = argmax(probs.row(0)).unwrap();
        assert_eq!(label, model_zoo::CIFAR_10_CLASS_NAMES[best]);
    }
}
