//! Coordinate space markers.
//!
//! Zero-sized types used as type parameters so that normalized YOLO boxes
//! cannot reach the evaluator without being converted to pixels first.

use std::fmt;

/// Absolute pixel coordinates, (0, 0) at the top-left corner of the image.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pixel {}

/// Coordinates expressed as fractions of the image size (0.0 to 1.0).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalized {}

impl fmt::Debug for Pixel {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}

impl fmt::Debug for Normalized {
    fn fmt(&self, _: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {}
    }
}
