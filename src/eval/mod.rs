//! PASCAL VOC mean Average Precision.
//!
//! [`evaluate`] ranks every detection by confidence, matches each class's
//! detections against ground truth with [`match_detections`], integrates the
//! resulting precision/recall curve with [`voc_ap`], and averages AP over
//! the class list.

mod curve;
mod matcher;
mod report;

pub use curve::{sample_curve, voc_ap, PrCurve, PrPoint, VocApCurve};
pub use matcher::{match_detections, Disposition};
pub use report::{ClassResult, EvalIssue, EvalReport, ImageIdCoverage, IssueCode, Severity};

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;

use crate::ir::{Detection, GroundTruthSet, PredictionSet};

/// Minimum IoU for a detection to count, as defined by the VOC2012 challenge.
pub const DEFAULT_MIN_OVERLAP: f64 = 0.5;

/// Evaluation options.
#[derive(Clone, Debug)]
pub struct EvalOptions {
    /// IoU a detection must reach to match a ground-truth instance.
    pub min_overlap: f64,
    /// Approximate number of envelope points kept per class for display.
    pub samples: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            min_overlap: DEFAULT_MIN_OVERLAP,
            samples: 10,
        }
    }
}

/// Compute per-class AP and mAP for `predictions` against `ground_truth`.
///
/// Classes are evaluated independently (and in parallel); each keeps its
/// own record of claimed ground-truth instances, so the result does not
/// depend on scheduling and repeated runs are bit-identical.
///
/// Classes without ground truth get `average_precision: None` and are left
/// out of the mean. Anomalies never abort the evaluation; they are listed in
/// [`EvalReport::issues`].
pub fn evaluate(
    ground_truth: &GroundTruthSet,
    predictions: &PredictionSet,
    class_names: &[String],
    opts: &EvalOptions,
) -> EvalReport {
    let mut report = EvalReport {
        min_overlap: opts.min_overlap,
        coverage: check_image_ids(ground_truth, predictions),
        ..Default::default()
    };
    report_coverage(&mut report);

    if class_names.is_empty() {
        report.add(EvalIssue::error(
            IssueCode::EmptyClassList,
            "no classes to evaluate",
        ));
        return report;
    }

    let evaluated: BTreeSet<&str> = class_names.iter().map(String::as_str).collect();
    let gt_counts = count_ground_truth(ground_truth, &evaluated, &mut report);
    let ranked = rank_detections(predictions);
    report_unevaluated_predictions(&ranked, &evaluated, &mut report);

    report.classes = class_names
        .par_iter()
        .map(|class_name| {
            let gt_count = gt_counts.get(class_name.as_str()).copied().unwrap_or(0);
            evaluate_class(class_name, ground_truth, &ranked, gt_count, opts)
        })
        .collect();

    let unevaluable: Vec<EvalIssue> = report
        .classes
        .iter()
        .filter(|class| class.average_precision.is_none())
        .map(|class| {
            EvalIssue::warning(
                IssueCode::ClassWithoutGroundTruth,
                format!(
                    "class '{}' has no ground-truth instances ({} detection(s)); excluded from mAP",
                    class.class_name, class.detection_count
                ),
            )
        })
        .collect();
    for issue in unevaluable {
        report.add(issue);
    }

    let aps: Vec<f64> = report
        .classes
        .iter()
        .filter_map(|class| class.average_precision)
        .collect();
    report.evaluated_classes = aps.len();
    report.mean_average_precision = if aps.is_empty() {
        0.0
    } else {
        aps.iter().sum::<f64>() / aps.len() as f64
    };

    report
}

/// Compare the image keys of both sets.
pub fn check_image_ids(ground_truth: &GroundTruthSet, predictions: &PredictionSet) -> ImageIdCoverage {
    let gt_ids: BTreeSet<&str> = ground_truth.images.keys().map(|id| id.as_str()).collect();
    let pred_ids: BTreeSet<&str> = predictions.images.keys().map(|id| id.as_str()).collect();

    ImageIdCoverage {
        shared: gt_ids.intersection(&pred_ids).count(),
        only_in_ground_truth: gt_ids.difference(&pred_ids).map(|s| s.to_string()).collect(),
        only_in_predictions: pred_ids.difference(&gt_ids).map(|s| s.to_string()).collect(),
    }
}

/// Flatten all detections and sort them by descending score.
///
/// The sort is stable, so equal scores keep their flattened order (image key
/// order, then order within the image).
pub fn rank_detections(predictions: &PredictionSet) -> Vec<&Detection> {
    let mut ranked: Vec<&Detection> = predictions.iter().collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

fn evaluate_class(
    class_name: &str,
    ground_truth: &GroundTruthSet,
    ranked: &[&Detection],
    ground_truth_count: usize,
    opts: &EvalOptions,
) -> ClassResult {
    let class_ranked: Vec<&Detection> = ranked
        .iter()
        .copied()
        .filter(|det| det.label == class_name)
        .collect();

    let mut result = ClassResult {
        class_name: class_name.to_string(),
        ground_truth_count,
        detection_count: class_ranked.len(),
        ..Default::default()
    };

    let dispositions = match_detections(class_name, ground_truth, &class_ranked, opts.min_overlap);
    let Some(curve) = PrCurve::from_dispositions(&dispositions, ground_truth_count) else {
        result.false_positives = class_ranked.len();
        return result;
    };

    let envelope = voc_ap(&curve.recall, &curve.precision);
    result.average_precision = Some(envelope.average_precision);
    result.samples = sample_curve(&envelope, opts.samples);
    result.true_positives = curve.true_positives;
    result.false_positives = curve.false_positives;
    result.precision_curve = curve.precision;
    result.recall_curve = curve.recall;
    result
}

fn count_ground_truth<'a>(
    ground_truth: &'a GroundTruthSet,
    evaluated: &BTreeSet<&str>,
    report: &mut EvalReport,
) -> BTreeMap<&'a str, usize> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut skipped: BTreeMap<&str, usize> = BTreeMap::new();

    for annotation in ground_truth.images.values().flatten() {
        let label = annotation.label.as_str();
        if evaluated.contains(label) {
            *counts.entry(label).or_default() += 1;
        } else {
            *skipped.entry(label).or_default() += 1;
        }
    }

    if !skipped.is_empty() {
        let total: usize = skipped.values().sum();
        report.add(EvalIssue::warning(
            IssueCode::GroundTruthLabelNotEvaluated,
            format!(
                "{} ground-truth annotation(s) carry labels outside the class list: {}",
                total,
                label_counts(&skipped)
            ),
        ));
    }

    counts
}

fn report_unevaluated_predictions(
    ranked: &[&Detection],
    evaluated: &BTreeSet<&str>,
    report: &mut EvalReport,
) {
    let mut skipped: BTreeMap<&str, usize> = BTreeMap::new();
    for det in ranked {
        if !evaluated.contains(det.label.as_str()) {
            *skipped.entry(det.label.as_str()).or_default() += 1;
        }
    }

    if !skipped.is_empty() {
        let total: usize = skipped.values().sum();
        report.add(EvalIssue::warning(
            IssueCode::PredictionLabelNotEvaluated,
            format!(
                "{} detection(s) carry labels outside the class list: {}",
                total,
                label_counts(&skipped)
            ),
        ));
    }
}

fn report_coverage(report: &mut EvalReport) {
    let missing_preds = report.coverage.only_in_ground_truth.len();
    if missing_preds > 0 {
        report.add(EvalIssue::warning(
            IssueCode::ImagesMissingPredictions,
            format!(
                "{} image(s) have ground truth but no prediction entry (e.g. {}); treated as having no detections",
                missing_preds, report.coverage.only_in_ground_truth[0]
            ),
        ));
    }

    let missing_gt = report.coverage.only_in_predictions.len();
    if missing_gt > 0 {
        report.add(EvalIssue::warning(
            IssueCode::ImagesMissingGroundTruth,
            format!(
                "{} image(s) have predictions but no ground-truth entry (e.g. {}); their detections are false positives",
                missing_gt, report.coverage.only_in_predictions[0]
            ),
        ));
    }
}

fn label_counts(counts: &BTreeMap<&str, usize>) -> String {
    counts
        .iter()
        .map(|(label, count)| format!("{label} ({count})"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Annotation, BBoxXYXY};

    fn bbox(x0: f64, y0: f64, x1: f64, y1: f64) -> BBoxXYXY<crate::ir::Pixel> {
        BBoxXYXY::from_xyxy(x0, y0, x1, y1)
    }

    fn classes(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn perfect_single_detection_scores_one() {
        let mut gt = GroundTruthSet::new();
        gt.push("img", Annotation::new("person", bbox(0.0, 0.0, 10.0, 10.0)));
        let mut preds = PredictionSet::new();
        preds.push(Detection::new("img", "person", bbox(0.0, 0.0, 10.0, 10.0), 0.9));

        let report = evaluate(&gt, &preds, &classes(&["person"]), &EvalOptions::default());
        let person = report.class("person").expect("person result");
        assert_eq!(person.average_precision, Some(1.0));
        assert_eq!(report.mean_average_precision, 1.0);
        assert!(report.issues.is_empty(), "{:?}", report.issues);
    }

    #[test]
    fn ranking_is_stable_for_equal_scores() {
        let mut preds = PredictionSet::new();
        preds.push(Detection::new("a", "x", bbox(0.0, 0.0, 1.0, 1.0), 0.5));
        preds.push(Detection::new("a", "y", bbox(0.0, 0.0, 1.0, 1.0), 0.9));
        preds.push(Detection::new("b", "z", bbox(0.0, 0.0, 1.0, 1.0), 0.5));

        let labels: Vec<&str> = rank_detections(&preds)
            .iter()
            .map(|d| d.label.as_str())
            .collect();
        assert_eq!(labels, vec!["y", "x", "z"]);
    }

    #[test]
    fn classes_without_ground_truth_are_excluded_from_map() {
        let mut gt = GroundTruthSet::new();
        gt.push("img", Annotation::new("cat", bbox(0.0, 0.0, 10.0, 10.0)));
        let mut preds = PredictionSet::new();
        preds.push(Detection::new("img", "cat", bbox(0.0, 0.0, 10.0, 10.0), 0.9));
        preds.push(Detection::new("img", "dog", bbox(0.0, 0.0, 10.0, 10.0), 0.8));

        let report = evaluate(&gt, &preds, &classes(&["cat", "dog"]), &EvalOptions::default());
        let dog = report.class("dog").expect("dog result");
        assert_eq!(dog.average_precision, None);
        assert_eq!(dog.false_positives, 1);
        assert_eq!(report.evaluated_classes, 1);
        assert_eq!(report.mean_average_precision, 1.0);
        assert!(report
            .issues
            .iter()
            .any(|i| i.code == IssueCode::ClassWithoutGroundTruth));
    }

    #[test]
    fn ground_truth_without_detections_scores_zero() {
        let mut gt = GroundTruthSet::new();
        gt.push("img", Annotation::new("cat", bbox(0.0, 0.0, 10.0, 10.0)));
        let preds = PredictionSet::new();

        let report = evaluate(&gt, &preds, &classes(&["cat"]), &EvalOptions::default());
        let cat = report.class("cat").expect("cat result");
        assert_eq!(cat.average_precision, Some(0.0));
        assert!(cat.precision_curve.is_empty());
        assert_eq!(report.mean_average_precision, 0.0);
        assert!(report
            .issues
            .iter()
            .any(|i| i.code == IssueCode::ImagesMissingPredictions));
    }

    #[test]
    fn unknown_labels_and_images_are_reported_with_counts() {
        let mut gt = GroundTruthSet::new();
        gt.push("img", Annotation::new("cat", bbox(0.0, 0.0, 10.0, 10.0)));
        gt.push("img", Annotation::new("bird", bbox(0.0, 0.0, 10.0, 10.0)));
        let mut preds = PredictionSet::new();
        preds.push(Detection::new("img", "cat", bbox(0.0, 0.0, 10.0, 10.0), 0.9));
        preds.push(Detection::new("other", "fish", bbox(0.0, 0.0, 1.0, 1.0), 0.4));
        preds.push(Detection::new("other", "fish", bbox(0.0, 0.0, 1.0, 1.0), 0.3));

        let report = evaluate(&gt, &preds, &classes(&["cat"]), &EvalOptions::default());
        let messages: Vec<String> = report.issues.iter().map(|i| i.to_string()).collect();
        assert!(messages.iter().any(|m| m.contains("1 ground-truth annotation(s)") && m.contains("bird (1)")));
        assert!(messages.iter().any(|m| m.contains("2 detection(s)") && m.contains("fish (2)")));
        assert_eq!(report.coverage.only_in_predictions, vec!["other".to_string()]);
        assert_eq!(report.mean_average_precision, 1.0);
    }

    #[test]
    fn empty_class_list_is_an_error() {
        let report = evaluate(
            &GroundTruthSet::new(),
            &PredictionSet::new(),
            &[],
            &EvalOptions::default(),
        );
        assert_eq!(report.error_count(), 1);
        assert!(report.classes.is_empty());
    }

    #[test]
    fn check_image_ids_counts_both_sides() {
        let mut gt = GroundTruthSet::new();
        gt.add_image("a");
        gt.add_image("b");
        let mut preds = PredictionSet::new();
        preds.add_image("b");
        preds.add_image("c");

        let coverage = check_image_ids(&gt, &preds);
        assert_eq!(coverage.shared, 1);
        assert_eq!(coverage.only_in_ground_truth, vec!["a".to_string()]);
        assert_eq!(coverage.only_in_predictions, vec!["c".to_string()]);
    }
}
