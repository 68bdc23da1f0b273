//! Precision/recall curves and VOC2012 average precision.

use serde::Serialize;

use super::matcher::Disposition;

/// Running precision and recall after each ranked detection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrCurve {
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    pub true_positives: usize,
    pub false_positives: usize,
}

impl PrCurve {
    /// Builds the curve from dispositions in rank order.
    ///
    /// Returns `None` when the class has no ground truth, since recall is
    /// undefined.
    pub fn from_dispositions(
        dispositions: &[Disposition],
        ground_truth_count: usize,
    ) -> Option<Self> {
        if ground_truth_count == 0 {
            return None;
        }

        let total = ground_truth_count as f64;
        let mut curve = PrCurve {
            precision: Vec::with_capacity(dispositions.len()),
            recall: Vec::with_capacity(dispositions.len()),
            ..Default::default()
        };

        for disposition in dispositions {
            match disposition {
                Disposition::TruePositive => curve.true_positives += 1,
                Disposition::FalsePositive => curve.false_positives += 1,
            }

            let tp = curve.true_positives as f64;
            let seen = (curve.true_positives + curve.false_positives) as f64;
            curve.recall.push(tp / total);
            curve.precision.push(if seen > 0.0 { tp / seen } else { 0.0 });
        }

        Some(curve)
    }
}

/// The sentinel-padded, monotone precision envelope and its area.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VocApCurve {
    pub average_precision: f64,
    /// `0.0`, the measured recalls, `1.0`.
    pub recall: Vec<f64>,
    /// `0.0`, the measured precisions made non-increasing, `0.0`.
    pub precision: Vec<f64>,
}

/// Average precision with the VOC2012 exact-integration rule.
///
/// The precision sequence is padded with zeros, the recall sequence with
/// 0 and 1, precision is made non-increasing from the end, and the area is
/// summed over every step where recall changes. This is not the 11-point
/// interpolation of VOC2007.
pub fn voc_ap(recall: &[f64], precision: &[f64]) -> VocApCurve {
    let mut mrec = Vec::with_capacity(recall.len() + 2);
    mrec.push(0.0);
    mrec.extend_from_slice(recall);
    mrec.push(1.0);

    let mut mpre = Vec::with_capacity(precision.len() + 2);
    mpre.push(0.0);
    mpre.extend_from_slice(precision);
    mpre.push(0.0);

    for i in (0..mpre.len() - 1).rev() {
        mpre[i] = mpre[i].max(mpre[i + 1]);
    }

    let average_precision = (1..mrec.len())
        .filter(|&i| mrec[i] != mrec[i - 1])
        .map(|i| (mrec[i] - mrec[i - 1]) * mpre[i])
        .sum();

    VocApCurve {
        average_precision,
        recall: mrec,
        precision: mpre,
    }
}

/// One (recall, precision) point of the envelope.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PrPoint {
    pub recall: f64,
    pub precision: f64,
}

/// Picks roughly `samples` evenly spaced points of the envelope for display,
/// plus the last measured point.
///
/// Diagnostic only. Short curves are sampled at every point and
/// `samples == 0` yields nothing.
pub fn sample_curve(curve: &VocApCurve, samples: usize) -> Vec<PrPoint> {
    let len = curve.recall.len().min(curve.precision.len());
    if samples == 0 || len == 0 {
        return Vec::new();
    }

    let point = |i: usize| PrPoint {
        recall: curve.recall[i],
        precision: curve.precision[i],
    };

    let step = (len / samples).max(1);
    let mut points: Vec<PrPoint> = (0..len).step_by(step).map(point).collect();

    if len >= 2 {
        let last_measured = len - 2;
        if last_measured % step != 0 {
            points.push(point(last_measured));
        }
    }

    points
}
