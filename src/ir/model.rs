//! Common in-memory records shared by every reader and the evaluator.
//!
//! Readers turn their source format into a [`GroundTruthSet`] or a
//! [`PredictionSet`]; the evaluator only ever sees these two shapes, with
//! boxes already in absolute pixel XYXY.

use std::collections::BTreeMap;

use super::bbox::BBoxXYXY;
use super::ids::ImageId;
use super::space::Pixel;

/// A ground-truth object instance.
///
/// Annotations carry no "used" flag. Which instances have been claimed by a
/// detection is tracked by the matcher for the class it is evaluating.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    /// Class name (e.g., "person").
    pub label: String,

    /// Bounding box in pixel coordinates (XYXY format).
    pub bbox: BBoxXYXY<Pixel>,
}

impl Annotation {
    pub fn new(label: impl Into<String>, bbox: BBoxXYXY<Pixel>) -> Self {
        Self {
            label: label.into(),
            bbox,
        }
    }
}

/// A single predicted instance.
///
/// `score` is only compared against other scores from the same source, so
/// its range is whatever the detector emits.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    /// Image this detection was made on.
    pub image_id: ImageId,

    /// Predicted class name.
    pub label: String,

    /// Bounding box in pixel coordinates (XYXY format).
    pub bbox: BBoxXYXY<Pixel>,

    /// Detector confidence.
    pub score: f64,
}

impl Detection {
    pub fn new(
        image_id: impl Into<ImageId>,
        label: impl Into<String>,
        bbox: BBoxXYXY<Pixel>,
        score: f64,
    ) -> Self {
        Self {
            image_id: image_id.into(),
            label: label.into(),
            bbox,
            score,
        }
    }
}

/// Ground-truth annotations grouped by image.
///
/// An image may be present with no annotations; that still counts as
/// "covered" when checking predictions against ground truth.
#[derive(Clone, Debug, Default)]
pub struct GroundTruthSet {
    pub images: BTreeMap<ImageId, Vec<Annotation>>,
}

impl GroundTruthSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an image, leaving existing annotations untouched.
    pub fn add_image(&mut self, image_id: impl Into<ImageId>) {
        self.images.entry(image_id.into()).or_default();
    }

    /// Appends an annotation to an image, registering the image if needed.
    pub fn push(&mut self, image_id: impl Into<ImageId>, annotation: Annotation) {
        self.images
            .entry(image_id.into())
            .or_default()
            .push(annotation);
    }

    /// Annotations for an image; an unknown image has none.
    pub fn annotations(&self, image_id: &str) -> &[Annotation] {
        self.images.get(image_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_image(&self, image_id: &str) -> bool {
        self.images.contains_key(image_id)
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn annotation_count(&self) -> usize {
        self.images.values().map(Vec::len).sum()
    }
}

/// Detections grouped by image.
#[derive(Clone, Debug, Default)]
pub struct PredictionSet {
    pub images: BTreeMap<ImageId, Vec<Detection>>,
}

impl PredictionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an image that was processed but produced no detections.
    pub fn add_image(&mut self, image_id: impl Into<ImageId>) {
        self.images.entry(image_id.into()).or_default();
    }

    /// Appends a detection under its own `image_id`.
    pub fn push(&mut self, detection: Detection) {
        self.images
            .entry(detection.image_id.clone())
            .or_default()
            .push(detection);
    }

    pub fn contains_image(&self, image_id: &str) -> bool {
        self.images.contains_key(image_id)
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn detection_count(&self) -> usize {
        self.images.values().map(Vec::len).sum()
    }

    /// All detections in image-key order, preserving per-image order.
    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.images.values().flatten()
    }

    /// Re-keys all-digit image ids that have no exact ground-truth entry
    /// onto the ground-truth id with the same numeric value, so COCO's
    /// `139` joins the file stem `000000000139`.
    ///
    /// Only unambiguous targets are used. Returns the `(from, to)` pairs
    /// that were applied.
    pub fn align_numeric_ids(&mut self, ground_truth: &GroundTruthSet) -> Vec<(ImageId, ImageId)> {
        let mut by_value: BTreeMap<&str, Vec<&ImageId>> = BTreeMap::new();
        for id in ground_truth.images.keys() {
            if let Some(value) = numeric_value(id.as_str()) {
                by_value.entry(value).or_default().push(id);
            }
        }

        let renames: Vec<(ImageId, ImageId)> = self
            .images
            .keys()
            .filter(|id| !ground_truth.contains_image(id.as_str()))
            .filter_map(|id| {
                let value = numeric_value(id.as_str())?;
                match by_value.get(value)?.as_slice() {
                    [target] => Some((id.clone(), (*target).clone())),
                    _ => None,
                }
            })
            .collect();

        for (from, to) in &renames {
            if let Some(mut detections) = self.images.remove(from) {
                for detection in &mut detections {
                    detection.image_id = to.clone();
                }
                self.images.entry(to.clone()).or_default().extend(detections);
            }
        }

        renames
    }
}

/// Canonical digits of an all-digit id, without leading zeros.
fn numeric_value(id: &str) -> Option<&str> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let trimmed = id.trim_start_matches('0');
    Some(if trimmed.is_empty() { "0" } else { trimmed })
}
