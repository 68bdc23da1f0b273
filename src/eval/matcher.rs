//! Greedy assignment of ranked detections to ground-truth instances.

use std::collections::HashSet;

use serde::Serialize;

use crate::ir::{Detection, GroundTruthSet};

/// Outcome of matching one detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Claimed a previously unclaimed ground-truth instance.
    TruePositive,
    /// Overlap below threshold, no candidate at all, or a duplicate of an
    /// already claimed instance.
    FalsePositive,
}

/// Match detections of one class, in rank order, against ground truth.
///
/// `ranked` must already be filtered to `class_name` and sorted by
/// descending score. For each detection the same-label annotation of its
/// image with the highest inclusive-pixel IoU is selected, earlier
/// annotations winning ties. When that IoU reaches `min_overlap` the
/// detection is a true positive if the annotation is still unclaimed and a
/// false positive otherwise.
///
/// Claims are tracked as `(image, annotation index)` pairs owned by this
/// call, so independent invocations never see each other's state.
pub fn match_detections(
    class_name: &str,
    ground_truth: &GroundTruthSet,
    ranked: &[&Detection],
    min_overlap: f64,
) -> Vec<Disposition> {
    let mut claimed: HashSet<(&str, usize)> = HashSet::new();
    let mut dispositions = Vec::with_capacity(ranked.len());

    for detection in ranked {
        let image_id = detection.image_id.as_str();
        let candidates = ground_truth.annotations(image_id);

        let mut best: Option<(usize, f64)> = None;
        for (idx, annotation) in candidates.iter().enumerate() {
            if annotation.label != class_name {
                continue;
            }

            let iou = detection.bbox.iou_inclusive(&annotation.bbox);
            // No shared pixels: never a candidate, even at a zero threshold.
            if iou <= 0.0 {
                continue;
            }
            if best.map_or(true, |(_, best_iou)| iou > best_iou) {
                best = Some((idx, iou));
            }
        }

        let disposition = match best {
            Some((idx, iou)) if iou >= min_overlap => {
                if claimed.insert((image_id, idx)) {
                    Disposition::TruePositive
                } else {
                    Disposition::FalsePositive
                }
            }
            _ => Disposition::FalsePositive,
        };
        dispositions.push(disposition);
    }

    dispositions
}
