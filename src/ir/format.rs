//! Named reader selection.
//!
//! Each source format is one enum variant; callers pick a variant and call
//! `read`, so every reader is reachable through the same signature.

use std::path::Path;

use super::io_coco_json::{read_coco_predictions, CocoBboxFormat};
use super::io_detection_log::read_detection_log;
use super::io_voc_xml::read_voc_dir;
use super::io_yolo::{read_yolo_ground_truth, read_yolo_predictions};
use super::model::{GroundTruthSet, PredictionSet};
use crate::error::VocMapError;

/// Settings some readers need beyond the input path.
#[derive(Clone, Copy, Debug)]
pub struct ReadContext<'a> {
    /// Ordered class list; YOLO class indices and COCO category ids point into it.
    pub class_names: &'a [String],
    /// Image directory for YOLO dimension lookup, if not mirrored from `labels/`.
    pub images_dir: Option<&'a Path>,
    /// Layout of COCO `bbox` arrays.
    pub coco_bbox: CocoBboxFormat,
}

impl<'a> ReadContext<'a> {
    pub fn new(class_names: &'a [String]) -> Self {
        Self {
            class_names,
            images_dir: None,
            coco_bbox: CocoBboxFormat::default(),
        }
    }
}

/// Source formats that can provide ground truth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum GroundTruthFormat {
    /// Directory of Pascal VOC XML files.
    #[value(alias = "voc-xml")]
    Voc,
    /// YOLO `labels/` directory with normalized rows.
    Yolo,
}

impl GroundTruthFormat {
    pub fn read(self, path: &Path, ctx: &ReadContext<'_>) -> Result<GroundTruthSet, VocMapError> {
        match self {
            GroundTruthFormat::Voc => read_voc_dir(path),
            GroundTruthFormat::Yolo => read_yolo_ground_truth(path, ctx.images_dir, ctx.class_names),
        }
    }
}

/// Source formats that can provide detections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum PredictionFormat {
    /// Flat text log from the vendor inference tool.
    #[value(name = "log", alias = "detection-log")]
    DetectionLog,
    /// COCO results JSON array.
    #[value(alias = "coco-json")]
    Coco,
    /// YOLO label files with a trailing confidence column.
    Yolo,
}

impl PredictionFormat {
    pub fn read(self, path: &Path, ctx: &ReadContext<'_>) -> Result<PredictionSet, VocMapError> {
        match self {
            PredictionFormat::DetectionLog => read_detection_log(path),
            PredictionFormat::Coco => read_coco_predictions(path, ctx.class_names, ctx.coco_bbox),
            PredictionFormat::Yolo => read_yolo_predictions(path, ctx.images_dir, ctx.class_names),
        }
    }
}
