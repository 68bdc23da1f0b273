//! Evaluation report types and text formatting.
//!
//! The report is the only output of an evaluation. It renders as the
//! familiar per-class AP listing through `Display` and serializes to JSON
//! for programmatic use.

use serde::Serialize;
use std::fmt;

use super::curve::PrPoint;

/// Result of evaluating one prediction set against one ground-truth set.
#[derive(Clone, Debug, Default, Serialize)]
pub struct EvalReport {
    /// IoU threshold used for matching.
    pub min_overlap: f64,
    /// Per-class results, in class-list order.
    pub classes: Vec<ClassResult>,
    /// Unweighted mean of AP over classes that have ground truth.
    pub mean_average_precision: f64,
    /// Number of classes that contributed to the mean.
    pub evaluated_classes: usize,
    /// Which images appear on only one side.
    pub coverage: ImageIdCoverage,
    /// Anomalies found while evaluating.
    pub issues: Vec<EvalIssue>,
}

impl EvalReport {
    pub fn add(&mut self, issue: EvalIssue) {
        self.issues.push(issue);
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Result for a class by name.
    pub fn class(&self, name: &str) -> Option<&ClassResult> {
        self.classes.iter().find(|c| c.class_name == name)
    }
}

/// Output of one class's evaluation.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ClassResult {
    pub class_name: String,
    pub ground_truth_count: usize,
    pub detection_count: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    /// `None` when the class has no ground truth.
    pub average_precision: Option<f64>,
    /// Precision after each ranked detection.
    pub precision_curve: Vec<f64>,
    /// Recall after each ranked detection.
    pub recall_curve: Vec<f64>,
    /// A few points of the smoothed envelope, for display.
    pub samples: Vec<PrPoint>,
}

/// Image keys present in only one of the two sets.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ImageIdCoverage {
    pub shared: usize,
    pub only_in_ground_truth: Vec<String>,
    pub only_in_predictions: Vec<String>,
}

impl ImageIdCoverage {
    pub fn is_complete(&self) -> bool {
        self.only_in_ground_truth.is_empty() && self.only_in_predictions.is_empty()
    }
}

impl fmt::Display for ImageIdCoverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for id in &self.only_in_ground_truth {
            writeln!(f, "{id} not in predictions")?;
        }
        for id in &self.only_in_predictions {
            writeln!(f, "{id} not in ground-truth")?;
        }
        writeln!(
            f,
            "Images: {} shared, {} only in ground truth, {} only in predictions",
            self.shared,
            self.only_in_ground_truth.len(),
            self.only_in_predictions.len()
        )
    }
}

/// A single anomaly found during evaluation.
#[derive(Clone, Debug, Serialize)]
pub struct EvalIssue {
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
}

impl EvalIssue {
    pub fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for EvalIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN ",
        };
        write!(f, "[{}] {:?}: {}", severity, self.code, self.message)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// Stable codes for evaluation anomalies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// Images with ground truth but no prediction entry.
    ImagesMissingPredictions,
    /// Images with predictions but no ground-truth entry.
    ImagesMissingGroundTruth,
    /// A class has no ground-truth instances and is left out of the mean.
    ClassWithoutGroundTruth,
    /// Ground-truth annotations whose label is not in the class list.
    GroundTruthLabelNotEvaluated,
    /// Detections whose label is not in the class list.
    PredictionLabelNotEvaluated,
    /// No classes to evaluate.
    EmptyClassList,
}

/// Formats a fraction as a percentage with two decimals.
fn percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn format_series(values: impl Iterator<Item = f64>) -> String {
    let parts: Vec<String> = values.map(|v| format!("{v:.2}")).collect();
    format!("[{}]", parts.join(", "))
}

impl fmt::Display for EvalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for class in &self.classes {
            match class.average_precision {
                Some(ap) => writeln!(f, "{} = {} AP", percent(ap), class.class_name)?,
                None => writeln!(f, "n/a = {} AP (no ground truth)", class.class_name)?,
            }
            writeln!(
                f,
                " Precision: {}",
                format_series(class.samples.iter().map(|p| p.precision))
            )?;
            writeln!(
                f,
                " Recall   : {}",
                format_series(class.samples.iter().map(|p| p.recall))
            )?;
        }

        if !self.issues.is_empty() {
            writeln!(f)?;
            writeln!(
                f,
                "Evaluation reported {} error(s) and {} warning(s):",
                self.error_count(),
                self.warning_count()
            )?;
            for issue in &self.issues {
                writeln!(f, "  {}", issue)?;
            }
        }

        writeln!(f)?;
        writeln!(f, "# mAP of all classes")?;
        writeln!(
            f,
            "mAP = {} ({} of {} classes, IoU >= {})",
            percent(self.mean_average_precision),
            self.evaluated_classes,
            self.classes.len(),
            self.min_overlap
        )
    }
}
