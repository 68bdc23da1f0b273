//! COCO-style detection results reader.
//!
//! Detectors evaluated with COCO tooling dump a flat JSON array of results:
//!
//! ```json
//! [{"image_id": 42, "category_id": 1, "bbox": [10, 20, 30, 40], "score": 0.9}]
//! ```
//!
//! `category_id` is 1-based into the evaluated class list. The official
//! results format stores `bbox` as `[x, y, width, height]`; some exporters
//! write corners instead, so the layout is selected with [`CocoBboxFormat`].

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use super::model::{Detection, PredictionSet};
use super::{BBoxXYXY, ImageId, Pixel};
use crate::error::VocMapError;

/// Layout of the four numbers in a COCO `bbox` field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CocoBboxFormat {
    /// `[x, y, width, height]`, the COCO results convention.
    #[default]
    Xywh,
    /// `[xmin, ymin, xmax, ymax]`.
    Xyxy,
}

#[derive(Debug, Deserialize)]
struct CocoResult {
    image_id: CocoImageId,
    category_id: i64,
    bbox: [f64; 4],
    score: f64,
}

/// COCO uses integer image ids; other exporters write file stems.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CocoImageId {
    Int(i64),
    Str(String),
}

impl fmt::Display for CocoImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CocoImageId::Int(id) => write!(f, "{id}"),
            CocoImageId::Str(id) => f.write_str(id),
        }
    }
}

/// Reads detection results from a COCO results JSON file.
///
/// # Errors
/// Fails if the file cannot be read or parsed, or if a `category_id` does
/// not name one of `class_names`.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use vocmap::ir::io_coco_json::{read_coco_predictions, CocoBboxFormat};
///
/// let classes = vec!["person".to_string()];
/// let preds = read_coco_predictions(Path::new("results.json"), &classes, CocoBboxFormat::Xywh)?;
/// # Ok::<(), vocmap::VocMapError>(())
/// ```
pub fn read_coco_predictions(
    path: &Path,
    class_names: &[String],
    bbox_format: CocoBboxFormat,
) -> Result<PredictionSet, VocMapError> {
    let file = File::open(path).map_err(VocMapError::Io)?;
    let reader = BufReader::new(file);

    let results: Vec<CocoResult> =
        serde_json::from_reader(reader).map_err(|source| VocMapError::CocoJsonParse {
            path: path.to_path_buf(),
            source,
        })?;

    results_to_predictions(results, class_names, bbox_format, path)
}

/// Reads detection results from a JSON string.
///
/// Useful for testing without file I/O.
pub fn from_coco_predictions_str(
    json: &str,
    class_names: &[String],
    bbox_format: CocoBboxFormat,
) -> Result<PredictionSet, VocMapError> {
    let path = Path::new("<memory>");
    let results: Vec<CocoResult> =
        serde_json::from_str(json).map_err(|source| VocMapError::CocoJsonParse {
            path: path.to_path_buf(),
            source,
        })?;
    results_to_predictions(results, class_names, bbox_format, path)
}

fn results_to_predictions(
    results: Vec<CocoResult>,
    class_names: &[String],
    bbox_format: CocoBboxFormat,
    path: &Path,
) -> Result<PredictionSet, VocMapError> {
    let mut predictions = PredictionSet::new();

    for (index, result) in results.into_iter().enumerate() {
        let label = usize::try_from(result.category_id)
            .ok()
            .and_then(|id| id.checked_sub(1))
            .and_then(|idx| class_names.get(idx))
            .ok_or_else(|| VocMapError::CocoCategoryOutOfRange {
                path: path.to_path_buf(),
                index,
                category_id: result.category_id,
                class_count: class_names.len(),
            })?;

        let [a, b, c, d] = result.bbox;
        let bbox = match bbox_format {
            CocoBboxFormat::Xywh => BBoxXYXY::<Pixel>::from_xywh(a, b, c, d),
            CocoBboxFormat::Xyxy => BBoxXYXY::<Pixel>::from_xyxy(a, b, c, d),
        };
        if !bbox.is_finite() || !bbox.is_ordered() {
            return Err(VocMapError::CocoBoxInvalid {
                path: path.to_path_buf(),
                index,
                message: format!("{:?} from bbox {:?} is not finite and ordered", bbox, result.bbox),
            });
        }

        predictions.push(Detection::new(
            ImageId::new(result.image_id.to_string()),
            label.clone(),
            bbox,
            result.score,
        ));
    }

    Ok(predictions)
}
