use std::path::PathBuf;
use thiserror::Error;

/// The main error type for vocmap operations.
///
/// Every variant is a reader or configuration failure raised before any AP
/// is computed. Evaluation itself reports anomalies in the
/// [`EvalReport`](crate::eval::EvalReport) instead of failing.
#[derive(Debug, Error)]
pub enum VocMapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid VOC layout at {path}: {message}")]
    VocLayoutInvalid { path: PathBuf, message: String },

    #[error("Failed to parse VOC XML {path}: {message}")]
    VocXmlParse { path: PathBuf, message: String },

    #[error("Invalid YOLO layout at {path}: {message}")]
    YoloLayoutInvalid { path: PathBuf, message: String },

    #[error("Failed to parse YOLO label {path}:{line}: {message}")]
    YoloLabelParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("No image found for YOLO label {label_path} (expected {expected_stem}.<ext>)")]
    YoloImageNotFound {
        label_path: PathBuf,
        expected_stem: String,
    },

    #[error("Failed to read image dimensions from {path}: {source}")]
    YoloImageDimensionRead {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Failed to parse class names from {path}: {source}")]
    ClassNamesParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid class names in {path}: {message}")]
    ClassNamesInvalid { path: PathBuf, message: String },

    #[error("Failed to parse detection log {path}:{line}: {message}")]
    DetectionLogParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Failed to parse COCO prediction JSON from {path}: {source}")]
    CocoJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(
        "COCO prediction #{index} in {path} has category_id {category_id}, \
         outside 1..={class_count}"
    )]
    CocoCategoryOutOfRange {
        path: PathBuf,
        index: usize,
        category_id: i64,
        class_count: usize,
    },

    #[error("COCO prediction #{index} in {path} has an invalid box: {message}")]
    CocoBoxInvalid {
        path: PathBuf,
        index: usize,
        message: String,
    },

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Failed to write report: {0}")]
    ReportWrite(#[source] serde_json::Error),

    #[error("Evaluation failed: {error_count} error(s), {warning_count} warning(s)")]
    EvaluationFailed {
        error_count: usize,
        warning_count: usize,
    },
}
