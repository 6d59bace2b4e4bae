pub mod googlenet;
mod mobilenet;
mod resnet;
mod vgg;

use net_core::NetworkGraph;

pub use googlenet::{BlockSpec, auxiliary_classifier, inception_block, naive_inception_block};

/// Name of the primary classifier output, shared by every architecture.
pub const OUTPUT: &str = "output";

/// The closed set of supported architectures. Dispatching over this enum
/// instead of raw strings keeps "forgot a model" a compile-time concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchKind {
    ResNet50,
    MobileNetV1,
    MobileNetV2,
    GoogLeNet,
    Vgg16,
    Vgg13,
    Vgg11,
}

impl ArchKind {
    pub const ALL: [ArchKind; 7] = [
        ArchKind::ResNet50,
        ArchKind::MobileNetV1,
        ArchKind::MobileNetV2,
        ArchKind::GoogLeNet,
        ArchKind::Vgg16,
        ArchKind::Vgg13,
        ArchKind::Vgg11,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ResNet50" => Some(ArchKind::ResNet50),
            "MobileNetV1" => Some(ArchKind::MobileNetV1),
            "MobileNetV2" => Some(ArchKind::MobileNetV2),
            "GoogLeNet" => Some(ArchKind::GoogLeNet),
            "VGG16" => Some(ArchKind::Vgg16),
            "VGG13" => Some(ArchKind::Vgg13),
            "VGG11" => Some(ArchKind::Vgg11),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ArchKind::ResNet50 => "ResNet50",
            ArchKind::MobileNetV1 => "MobileNetV1",
            ArchKind::MobileNetV2 => "MobileNetV2",
            ArchKind::GoogLeNet => "GoogLeNet",
            ArchKind::Vgg16 => "VGG16",
            ArchKind::Vgg13 => "VGG13",
            ArchKind::Vgg11 => "VGG11",
        }
    }

    /// Assembles the architecture's computation graph.
    ///
    /// # Errors
    /// Fails fast when `num_classes` is zero or the input resolution cannot
    /// survive the architecture's stride reductions.
    pub fn build(
        self,
        input_shape: (usize, usize),
        num_classes: usize,
    ) -> net_core::Result<NetworkGraph> {
        match self {
            ArchKind::ResNet50 => resnet::build(input_shape, num_classes),
            ArchKind::MobileNetV1 => mobilenet::build_v1(input_shape, num_classes),
            ArchKind::MobileNetV2 => mobilenet::build_v2(input_shape, num_classes),
            ArchKind::GoogLeNet => googlenet::build(input_shape, num_classes),
            ArchKind::Vgg16 => vgg::build(vgg::Variant::Vgg16, input_shape, num_classes),
            ArchKind::Vgg13 => vgg::build(vgg::Variant::Vgg13, input_shape, num_classes),
            ArchKind::Vgg11 => vgg::build(vgg::Variant::Vgg11, input_shape, num_classes),
        }
    }
}

/// Guard shared by the assemblers: every head needs at least one class.
pub(crate) fn check_classes(op: &'static str, num_classes: usize) -> net_core::Result<()> {
    if num_classes == 0 {
        return Err(net_core::NetErr::InvalidParam {
            op,
            what: "zero classes",
        });
    }
    Ok(())
}
