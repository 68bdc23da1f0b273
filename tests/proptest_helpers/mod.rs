#![allow(dead_code)]

use vocmap::ir::{Annotation, BBoxXYXY, Detection, GroundTruthSet, Pixel, PredictionSet};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub const CLASSES: [&str; 3] = ["cat", "dog", "car"];

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

pub fn class_names() -> Vec<String> {
    CLASSES.iter().map(|c| c.to_string()).collect()
}

/// Integer-cornered boxes on a small canvas, so overlaps are common.
pub fn arb_bbox() -> BoxedStrategy<BBoxXYXY<Pixel>> {
    (0u32..60, 0u32..60, 0u32..40, 0u32..40)
        .prop_map(|(x, y, w, h)| {
            BBoxXYXY::from_xyxy(x as f64, y as f64, (x + w) as f64, (y + h) as f64)
        })
        .boxed()
}

pub fn arb_label() -> BoxedStrategy<String> {
    prop::sample::select(CLASSES.to_vec())
        .prop_map(str::to_string)
        .boxed()
}

fn image_name(index: usize) -> String {
    format!("img{index:03}")
}

pub fn arb_ground_truth(max_images: usize, max_per_image: usize) -> BoxedStrategy<GroundTruthSet> {
    prop::collection::vec(
        prop::collection::vec((arb_label(), arb_bbox()), 0..=max_per_image),
        1..=max_images,
    )
    .prop_map(|images| {
        let mut gt = GroundTruthSet::new();
        for (index, anns) in images.into_iter().enumerate() {
            let id = image_name(index);
            gt.add_image(id.clone());
            for (label, bbox) in anns {
                gt.push(id.clone(), Annotation::new(label, bbox));
            }
        }
        gt
    })
    .boxed()
}

/// Predictions over the same image names as [`arb_ground_truth`], with
/// scores drawn from a coarse grid so ties occur.
pub fn arb_predictions(max_images: usize, max_per_image: usize) -> BoxedStrategy<PredictionSet> {
    prop::collection::vec(
        prop::collection::vec((arb_label(), arb_bbox(), 0u32..=10), 0..=max_per_image),
        1..=max_images,
    )
    .prop_map(|images| {
        let mut preds = PredictionSet::new();
        for (index, dets) in images.into_iter().enumerate() {
            let id = image_name(index);
            preds.add_image(id.clone());
            for (label, bbox, score) in dets {
                preds.push(Detection::new(id.clone(), label, bbox, score as f64 / 10.0));
            }
        }
        preds
    })
    .boxed()
}

/// Ground truth plus predictions that copy every box exactly.
pub fn arb_perfect_pair(
    max_images: usize,
    max_per_image: usize,
) -> BoxedStrategy<(GroundTruthSet, PredictionSet)> {
    arb_ground_truth(max_images, max_per_image)
        .prop_map(|gt| {
            let mut preds = PredictionSet::new();
            for (image_id, anns) in &gt.images {
                preds.add_image(image_id.clone());
                for ann in anns {
                    preds.push(Detection::new(image_id.clone(), ann.label.clone(), ann.bbox, 0.9));
                }
            }
            (gt, preds)
        })
        .boxed()
}
