use std::env;
use std::path::PathBuf;

use log::info;
use model_zoo::ZooConfig;

mod driver;
mod images;

const DEFAULT_MODEL: &str = "GoogLeNet";
const DEFAULT_IMAGE: &str = "samples/11.png";

/// Classifies one image with a saved model artifact.
///
/// Usage: `infer [MODEL] [IMAGE] [ARTIFACT]`. The artifact path defaults
/// to `models/cifar-10/<MODEL>.st`; `ZOO_CONFIG` may point at a JSON
/// configuration overriding the built-in model table.
fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let model = args.next().unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let image = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGE));
    let artifact = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("models/cifar-10/{model}.st")));

    let config = match env::var("ZOO_CONFIG") {
        Ok(path) => ZooConfig::from_file(path)?,
        Err(_) => ZooConfig::default(),
    };

    info!(
        "classifying {} with {model} from {}",
        image.display(),
        artifact.display()
    );
    let label = driver::classify(&config, &model, &artifact, &image)?;
    println!("The predicted label is {label}");
    Ok(())
}
