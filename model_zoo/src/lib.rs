//! A catalog of convolutional image classifiers built on `net_core`
//! graphs: assemblers for ResNet50, the MobileNets, GoogLeNet and the
//! VGG family, a config-driven factory that pairs each with its
//! training recipe, and safetensors persistence for trained
//! parameters.

pub mod arch;
pub mod artifact;
pub mod config;
pub mod error;
pub mod factory;
pub mod loader;
pub mod recipe;

mod test;

pub use arch::ArchKind;
pub use config::{CIFAR_10_CLASS_NAMES, ModelEntry, ZooConfig};
pub use error::{Result, ZooErr};
pub use factory::{CompiledModel, get_model};
pub use loader::load_model;
