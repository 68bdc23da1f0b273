//! Common records for ground truth and predictions, and the readers that
//! produce them.
//!
//! Every reader converts its source format into the same two shapes:
//! a [`GroundTruthSet`] (annotations without scores) or a
//! [`PredictionSet`] (detections with scores), both keyed by [`ImageId`]
//! and holding boxes as absolute pixel XYXY. Nothing downstream knows which
//! format the data came from.
//!
//! # Example
//!
//! ```
//! use vocmap::ir::{Annotation, BBoxXYXY, Detection, GroundTruthSet, PredictionSet};
//!
//! let mut gt = GroundTruthSet::new();
//! gt.push("000001", Annotation::new("person", BBoxXYXY::from_xyxy(0.0, 0.0, 10.0, 10.0)));
//!
//! let mut preds = PredictionSet::new();
//! preds.push(Detection::new("000001", "person", BBoxXYXY::from_xyxy(0.0, 0.0, 10.0, 10.0), 0.9));
//! ```

mod bbox;
pub mod class_names;
mod coord;
pub mod format;
mod ids;
pub mod io_coco_json;
pub mod io_detection_log;
pub mod io_voc_xml;
pub mod io_yolo;
mod model;
mod space;

pub use bbox::BBoxXYXY;
pub use coord::Coord;
pub use format::{GroundTruthFormat, PredictionFormat, ReadContext};
pub use ids::ImageId;
pub use model::{Annotation, Detection, GroundTruthSet, PredictionSet};
pub use space::{Normalized, Pixel};
