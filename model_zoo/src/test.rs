#![cfg(test)]

use ndarray::Array4;
use net_core::{GraphBuilder, Padding, Shape};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::arch::googlenet::{OUTPUT_AUX_1, OUTPUT_AUX_2};
use crate::arch::{ArchKind, BlockSpec, OUTPUT, inception_block, naive_inception_block};
use crate::artifact::{self, Precision};
use crate::config::{ModelEntry, ZooConfig};
use crate::error::ZooErr;
use crate::factory::get_model;
use crate::loader::load_model;
use crate::recipe::{Loss, LossRecipe, LossTerm, OptimizerSpec};

#[test]
fn every_architecture_builds_at_default_resolution() {
    for kind in ArchKind::ALL {
        let graph = kind
            .build((224, 224), 10)
            .unwrap_or_else(|e| panic!("{} failed to build: {e}", kind.name()));
        assert_eq!(graph.output_names()[0], OUTPUT, "{}", kind.name());
        assert_eq!(
            graph.output_shape(OUTPUT),
            Some(Shape::Flat { len: 10 }),
            "{}",
            kind.name()
        );
        assert!(graph.param_size() > 0, "{}", kind.name());
    }
}

#[test]
fn googlenet_declares_the_main_output_first() {
    let graph = ArchKind::GoogLeNet.build((224, 224), 10).unwrap();
    assert_eq!(graph.output_names(), vec![OUTPUT, OUTPUT_AUX_1, OUTPUT_AUX_2]);
    for name in [OUTPUT_AUX_1, OUTPUT_AUX_2] {
        assert_eq!(graph.output_shape(name), Some(Shape::Flat { len: 10 }));
    }
}

#[test]
fn single_headed_architectures_declare_one_output() {
    for kind in [ArchKind::ResNet50, ArchKind::MobileNetV2, ArchKind::Vgg11] {
        let graph = kind.build((224, 224), 10).unwrap();
        assert_eq!(graph.output_names(), vec![OUTPUT], "{}", kind.name());
    }
}

#[test]
fn inception_block_concatenates_all_four_branches() {
    let spec = BlockSpec::new([64, 128, 32], [96, 16, 32]);
    let mut b = GraphBuilder::new();
    let x = b.input(28, 28, 192).unwrap();
    let out = inception_block(&mut b, x, &spec).unwrap();
    // 64 + 128 + 32 from the convolutions plus the 32-wide pool projection.
    assert_eq!(
        b.shape_of(out).unwrap(),
        Shape::Map { h: 28, w: 28, c: 256 }
    );
}

#[test]
fn naive_block_shrinks_to_the_widest_kernel_and_keeps_input_channels() {
    let mut b = GraphBuilder::new();
    let x = b.input(32, 32, 3).unwrap();
    let out = naive_inception_block(&mut b, x, [8, 16, 4], [1, 3, 5], 3).unwrap();
    // The 5x5 valid branch loses 4 rows and columns; everything else is
    // cropped to match. The pool branch contributes the raw input channels.
    assert_eq!(
        b.shape_of(out).unwrap(),
        Shape::Map { h: 28, w: 28, c: 8 + 16 + 4 + 3 }
    );
}

#[test]
fn naive_block_forward_crops_each_branch_around_the_center() {
    let mut b = GraphBuilder::new();
    let x = b.input(8, 8, 1).unwrap();
    let block = naive_inception_block(&mut b, x, [1, 1, 1], [1, 3, 5], 3).unwrap();
    let f = b.flatten(block).unwrap();
    b.output(OUTPUT, f).unwrap();
    let g = b.finish().unwrap();

    // Zeroed parameters silence the convolution branches, leaving only
    // the parameter-free pooling branch in channel 3.
    let params = vec![0.0; g.param_size()];
    let mut x = Array4::zeros((1, 8, 8, 1));
    for y in 0..8 {
        for xx in 0..8 {
            x[[0, y, xx, 0]] = (y * 8 + xx) as f32;
        }
    }
    let outputs = g.forward(&params, x.view()).unwrap();
    let (_, out) = &outputs[0];
    assert_eq!(out.dim(), (1, 4 * 4 * 4));
    for cy in 0..4 {
        for cx in 0..4 {
            let base = (cy * 4 + cx) * 4;
            for ch in 0..3 {
                assert_eq!(out[[0, base + ch]], 0.0);
            }
            // A 3x3 max over the ramp at cropped position (cy, cx) sits
            // one cell down-right of input position (cy + 2, cx + 2).
            let expected = ((cy + 3) * 8 + (cx + 3)) as f32;
            assert_eq!(out[[0, base + 3]], expected);
        }
    }
}

#[test]
fn identical_descriptions_build_identical_topologies() {
    let a = ArchKind::GoogLeNet.build((224, 224), 10).unwrap();
    let b = ArchKind::GoogLeNet.build((224, 224), 10).unwrap();
    assert_eq!(a.topology(), b.topology());
    assert_eq!(a.param_size(), b.param_size());
}

#[test]
fn googlenet_rejects_inputs_its_tail_pooling_cannot_survive() {
    assert!(ArchKind::GoogLeNet.build((32, 32), 10).is_err());
}

#[test]
fn factory_weights_auxiliary_heads_below_the_primary() {
    let config = ZooConfig::default();
    let model = get_model(&config, "GoogLeNet", 10).unwrap();
    let primary = model.recipe.weight_of(OUTPUT).unwrap();
    for aux in [OUTPUT_AUX_1, OUTPUT_AUX_2] {
        assert!(model.recipe.weight_of(aux).unwrap() < primary);
    }
    assert_eq!(model.recipe.terms().len(), 3);
}

#[test]
fn recipe_rejects_an_auxiliary_weight_at_or_above_the_primary() {
    let terms = vec![
        LossTerm {
            output: OUTPUT.to_string(),
            loss: Loss::CategoricalCrossentropy,
            weight: 1.0,
        },
        LossTerm {
            output: OUTPUT_AUX_1.to_string(),
            loss: Loss::CategoricalCrossentropy,
            weight: 1.0,
        },
    ];
    let optimizer = OptimizerSpec::Sgd {
        learning_rate: 0.1,
        momentum: 0.9,
    };
    assert!(matches!(
        LossRecipe::weighted(terms, optimizer),
        Err(ZooErr::BadRecipe { .. })
    ));
}

#[test]
fn recipe_rejects_a_negative_weight() {
    let terms = vec![
        LossTerm {
            output: OUTPUT.to_string(),
            loss: Loss::CategoricalCrossentropy,
            weight: 1.0,
        },
        LossTerm {
            output: OUTPUT_AUX_1.to_string(),
            loss: Loss::CategoricalCrossentropy,
            weight: -0.3,
        },
    ];
    let optimizer = OptimizerSpec::Sgd {
        learning_rate: 0.1,
        momentum: 0.9,
    };
    assert!(matches!(
        LossRecipe::weighted(terms, optimizer),
        Err(ZooErr::BadRecipe { .. })
    ));
}

#[test]
fn unregistered_names_are_rejected_by_name() {
    let config = ZooConfig::default();
    match get_model(&config, "FooNet", 10) {
        Err(ZooErr::UnknownModel(name)) => assert_eq!(name, "FooNet"),
        other => panic!("expected UnknownModel, got {other:?}"),
    }
}

#[test]
fn artifacts_round_trip_at_full_precision() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny.st");
    let params: Vec<f32> = (0..64).map(|i| i as f32 * 0.25 - 8.0).collect();
    artifact::save(&path, "VGG11", &params, Precision::F32).unwrap();
    let (loaded, name) = artifact::load(&path).unwrap();
    assert_eq!(loaded, params);
    assert_eq!(name.as_deref(), Some("VGG11"));
}

#[test]
fn half_precision_artifacts_widen_back_with_bounded_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny16.st");
    let params: Vec<f32> = (0..64).map(|i| (i as f32 - 32.0) * 0.013).collect();
    artifact::save(&path, "VGG11", &params, Precision::F16).unwrap();
    let (loaded, _) = artifact::load(&path).unwrap();
    assert_eq!(loaded.len(), params.len());
    for (a, b) in loaded.iter().zip(&params) {
        assert!((a - b).abs() < 1e-2, "{a} vs {b}");
    }
}

#[test]
fn loading_a_wrongly_sized_artifact_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stub.st");
    artifact::save(&path, "GoogLeNet", &[0.0; 10], Precision::F32).unwrap();
    let config = ZooConfig::default();
    match load_model(&config, "GoogLeNet", &path) {
        Err(ZooErr::ParamCount { model, got, .. }) => {
            assert_eq!(model, "GoogLeNet");
            assert_eq!(got, 10);
        }
        other => panic!("expected ParamCount, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn a_loaded_model_predicts_probabilities() {
    // Small resolution keeps the forward pass fast; MobileNetV2 is the
    // only stock architecture whose tail tolerates it.
    let mut config = ZooConfig::default();
    config.models.insert(
        "MobileNetV2".to_string(),
        ModelEntry {
            input_shape: (32, 32),
            class_names: (0..10).map(|i| i.to_string()).collect(),
        },
    );
    let built = get_model(&config, "MobileNetV2", 10).unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    let params = built.graph.init_params(&mut rng);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mnv2.st");
    artifact::save(&path, "MobileNetV2", &params, Precision::F32).unwrap();

    let (model, loaded) = load_model(&config, "MobileNetV2", &path).unwrap();
    let x = Array4::from_elem((1, 32, 32, 3), 0.5);
    let outputs = model.graph.forward(&loaded, x.view()).unwrap();
    assert_eq!(outputs.len(), 1);
    let (name, probs) = &outputs[0];
    assert_eq!(name, OUTPUT);
    assert_eq!(probs.dim(), (1, 10));
    let sum: f32 = probs.row(0).sum();
    assert!((sum - 1.0).abs() < 1e-4);
}
