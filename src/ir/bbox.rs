//! Bounding box types in canonical XYXY format.

use super::coord::Coord;
use super::{Normalized, Pixel};

/// An axis-aligned bounding box in XYXY format (xmin, ymin, xmax, ymax).
///
/// The `TSpace` parameter should be either [`Pixel`] or [`Normalized`].
///
/// The constructor does not enforce `min <= max`. Readers hand boxes to the
/// evaluator as-is and callers are responsible for ordering.
#[derive(Clone, Copy, PartialEq)]
pub struct BBoxXYXY<TSpace> {
    pub min: Coord<TSpace>,
    pub max: Coord<TSpace>,
}

impl<TSpace> BBoxXYXY<TSpace> {
    /// Creates a new bounding box from explicit coordinates.
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            min: Coord::new(xmin, ymin),
            max: Coord::new(xmax, ymax),
        }
    }

    /// Converts from XYWH format where (x, y) is the top-left corner.
    ///
    /// This is the format used by COCO detection results.
    #[inline]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_xyxy(x, y, x + width, y + height)
    }

    /// Converts from center-based format (cx, cy, width, height).
    ///
    /// The far corner is computed as `min + size` rather than `cx + w / 2`
    /// so widths survive the conversion exactly.
    #[inline]
    pub fn from_cxcywh(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        let xmin = cx - width / 2.0;
        let ymin = cy - height / 2.0;
        Self::from_xyxy(xmin, ymin, xmin + width, ymin + height)
    }

    #[inline]
    pub fn xmin(&self) -> f64 {
        self.min.x
    }

    #[inline]
    pub fn ymin(&self) -> f64 {
        self.min.y
    }

    #[inline]
    pub fn xmax(&self) -> f64 {
        self.max.x
    }

    #[inline]
    pub fn ymax(&self) -> f64 {
        self.max.y
    }

    /// Returns true if all coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Returns true if the box is properly ordered (min <= max for both axes).
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y
    }
}

impl<TSpace> std::fmt::Debug for BBoxXYXY<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBoxXYXY")
            .field("xmin", &self.min.x)
            .field("ymin", &self.min.y)
            .field("xmax", &self.max.x)
            .field("ymax", &self.max.y)
            .finish()
    }
}

impl<TSpace> Default for BBoxXYXY<TSpace> {
    fn default() -> Self {
        Self::from_xyxy(0.0, 0.0, 0.0, 0.0)
    }
}

/// Inclusive-pixel geometry, as used by the VOC development kit.
///
/// A box spanning `xmin..=xmax` covers `xmax - xmin + 1` pixel columns, so a
/// box with identical corners still has an area of one pixel.
impl BBoxXYXY<Pixel> {
    #[inline]
    pub fn inclusive_width(&self) -> f64 {
        self.max.x - self.min.x + 1.0
    }

    #[inline]
    pub fn inclusive_height(&self) -> f64 {
        self.max.y - self.min.y + 1.0
    }

    #[inline]
    pub fn inclusive_area(&self) -> f64 {
        self.inclusive_width() * self.inclusive_height()
    }

    /// Width and height of the clipped overlap, or `None` when the boxes do
    /// not share at least a sliver of positive area.
    pub fn inclusive_intersection(&self, other: &Self) -> Option<(f64, f64)> {
        let iw = self.max.x.min(other.max.x) - self.min.x.max(other.min.x) + 1.0;
        let ih = self.max.y.min(other.max.y) - self.min.y.max(other.min.y) + 1.0;
        (iw > 0.0 && ih > 0.0).then_some((iw, ih))
    }

    /// Intersection over union with inclusive-pixel areas.
    ///
    /// Returns 0.0 for disjoint boxes and for boxes that only touch along a
    /// zero-area seam.
    pub fn iou_inclusive(&self, other: &Self) -> f64 {
        let Some((iw, ih)) = self.inclusive_intersection(other) else {
            return 0.0;
        };
        let intersection = iw * ih;
        let union = self.inclusive_area() + other.inclusive_area() - intersection;
        intersection / union
    }
}

impl BBoxXYXY<Normalized> {
    /// Converts normalized coordinates to pixel coordinates.
    pub fn to_pixel(&self, image_width: f64, image_height: f64) -> BBoxXYXY<Pixel> {
        BBoxXYXY::from_xyxy(
            self.min.x * image_width,
            self.min.y * image_height,
            self.max.x * image_width,
            self.max.y * image_height,
        )
    }
}
