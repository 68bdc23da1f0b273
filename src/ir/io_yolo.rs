//! Ultralytics-style YOLO label reader.
//!
//! Label files hold one normalized `class cx cy w h` row per object, with an
//! extra confidence column when they are detector outputs. Boxes are
//! denormalized with the dimensions of the matching image, looked up in the
//! `images/` tree that mirrors `labels/`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use super::model::{Annotation, Detection, GroundTruthSet, PredictionSet};
use super::{BBoxXYXY, ImageId, Normalized, Pixel};
use crate::error::VocMapError;

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "png", "jpeg", "bmp", "webp"];
const LABEL_EXTENSION: &str = "txt";

/// Read YOLO ground-truth labels.
///
/// `path` may be a dataset root containing `labels/` or a labels directory
/// itself. `images_dir` overrides the mirrored `images/` lookup.
pub fn read_yolo_ground_truth(
    path: &Path,
    images_dir: Option<&Path>,
    class_names: &[String],
) -> Result<GroundTruthSet, VocMapError> {
    let mut ground_truth = GroundTruthSet::new();
    for_each_label_file(path, images_dir, LabelKind::GroundTruth, |image_id, rows| {
        ground_truth.add_image(image_id.clone());
        for row in rows {
            let label = class_name(class_names, &row)?;
            ground_truth.push(image_id.clone(), Annotation::new(label, row.bbox));
        }
        Ok(())
    })?;
    Ok(ground_truth)
}

/// Read YOLO detector output (`class cx cy w h confidence` rows).
pub fn read_yolo_predictions(
    path: &Path,
    images_dir: Option<&Path>,
    class_names: &[String],
) -> Result<PredictionSet, VocMapError> {
    let mut predictions = PredictionSet::new();
    for_each_label_file(path, images_dir, LabelKind::Prediction, |image_id, rows| {
        predictions.add_image(image_id.clone());
        for row in rows {
            let label = class_name(class_names, &row)?;
            let score = row_confidence(&row)?;
            predictions.push(Detection::new(image_id.clone(), label, row.bbox, score));
        }
        Ok(())
    })?;
    Ok(predictions)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LabelKind {
    GroundTruth,
    Prediction,
}

impl LabelKind {
    fn expected_tokens(self) -> usize {
        match self {
            LabelKind::GroundTruth => 5,
            LabelKind::Prediction => 6,
        }
    }
}

#[derive(Debug, PartialEq)]
struct YoloLabelRow {
    class_id: usize,
    cx: f64,
    cy: f64,
    w: f64,
    h: f64,
    confidence: Option<f64>,
}

/// A parsed row already converted to pixel space.
struct PixelRow {
    class_id: usize,
    bbox: BBoxXYXY<Pixel>,
    confidence: Option<f64>,
    path: PathBuf,
    line: usize,
}

#[derive(Clone, Debug)]
struct YoloLayout {
    images_dir: PathBuf,
    labels_dir: PathBuf,
}

fn for_each_label_file<F>(
    path: &Path,
    images_dir: Option<&Path>,
    kind: LabelKind,
    mut visit: F,
) -> Result<(), VocMapError>
where
    F: FnMut(&ImageId, Vec<PixelRow>) -> Result<(), VocMapError>,
{
    let layout = discover_layout(path, images_dir)?;

    let mut label_files = collect_files_with_extensions(&layout.labels_dir, &[LABEL_EXTENSION])?;
    label_files.sort_by_cached_key(|label_path| rel_string(&layout.labels_dir, label_path));

    let mut first_by_stem: BTreeMap<ImageId, String> = BTreeMap::new();
    let mut shared_stems: Vec<(String, String)> = Vec::new();

    for label_path in label_files {
        let label_rel = label_path.strip_prefix(&layout.labels_dir).map_err(|_| {
            VocMapError::YoloLayoutInvalid {
                path: label_path.clone(),
                message: format!(
                    "label path '{}' is outside labels dir '{}'",
                    label_path.display(),
                    layout.labels_dir.display()
                ),
            }
        })?;

        let image_path = find_image_for_label(&layout.images_dir, label_rel).ok_or_else(|| {
            VocMapError::YoloImageNotFound {
                label_path: label_path.clone(),
                expected_stem: rel_string(&layout.labels_dir, &label_path.with_extension("")),
            }
        })?;
        let (width, height) = read_image_dimensions(&image_path)?;

        let image_id = label_path
            .file_stem()
            .map(|stem| ImageId::new(stem.to_string_lossy()))
            .ok_or_else(|| VocMapError::YoloLayoutInvalid {
                path: label_path.clone(),
                message: "label file has no stem to use as image id".to_string(),
            })?;

        let label_rel_string = rel_string(&layout.labels_dir, &label_path);
        match first_by_stem.get(&image_id) {
            Some(first) => shared_stems.push((label_rel_string, first.clone())),
            None => {
                first_by_stem.insert(image_id.clone(), label_rel_string);
            }
        }

        let content = fs::read_to_string(&label_path).map_err(VocMapError::Io)?;
        let mut rows = Vec::new();
        for (line_idx, line) in content.lines().enumerate() {
            let line_num = line_idx + 1;
            let Some(parsed) = parse_label_line(line, &label_path, line_num, kind)? else {
                continue;
            };

            let bbox_norm =
                BBoxXYXY::<Normalized>::from_cxcywh(parsed.cx, parsed.cy, parsed.w, parsed.h);
            let bbox = bbox_norm.to_pixel(width as f64, height as f64);
            if !bbox.is_finite() || !bbox.is_ordered() {
                return Err(VocMapError::YoloLabelParse {
                    path: label_path.clone(),
                    line: line_num,
                    message: format!(
                        "box {:?} is not finite and ordered after denormalizing to {}x{}",
                        bbox, width, height
                    ),
                });
            }
            rows.push(PixelRow {
                class_id: parsed.class_id,
                bbox,
                confidence: parsed.confidence,
                path: label_path.clone(),
                line: line_num,
            });
        }

        visit(&image_id, rows)?;
    }

    if let Some((later, first)) = shared_stems.first() {
        eprintln!(
            "Warning: {} YOLO label file(s) share a file stem with an earlier file and were merged into the same image, e.g. {} into {}",
            shared_stems.len(),
            later,
            first
        );
    }

    Ok(())
}

fn class_name(class_names: &[String], row: &PixelRow) -> Result<String, VocMapError> {
    class_names
        .get(row.class_id)
        .cloned()
        .ok_or_else(|| VocMapError::YoloLabelParse {
            path: row.path.clone(),
            line: row.line,
            message: format!(
                "class_id {} is out of range for class list with {} class(es)",
                row.class_id,
                class_names.len()
            ),
        })
}

fn row_confidence(row: &PixelRow) -> Result<f64, VocMapError> {
    row.confidence.ok_or_else(|| VocMapError::YoloLabelParse {
        path: row.path.clone(),
        line: row.line,
        message: "prediction row has no confidence column".to_string(),
    })
}

fn discover_layout(input: &Path, images_dir: Option<&Path>) -> Result<YoloLayout, VocMapError> {
    if !input.is_dir() {
        return Err(VocMapError::YoloLayoutInvalid {
            path: input.to_path_buf(),
            message: "input must be a directory".to_string(),
        });
    }

    let labels_dir = if input.join("labels").is_dir() {
        input.join("labels")
    } else {
        input.to_path_buf()
    };

    let images_dir = match images_dir {
        Some(dir) => dir.to_path_buf(),
        None => mirrored_images_dir(&labels_dir).ok_or_else(|| VocMapError::YoloLayoutInvalid {
            path: labels_dir.clone(),
            message: "cannot locate images: path has no 'labels' component; pass an images directory explicitly"
                .to_string(),
        })?,
    };

    if !images_dir.is_dir() {
        return Err(VocMapError::YoloLayoutInvalid {
            path: images_dir,
            message: "missing images directory".to_string(),
        });
    }

    Ok(YoloLayout {
        images_dir,
        labels_dir,
    })
}

/// Swaps the last `labels` path component for `images`, so that
/// `data/labels/val2017` maps to `data/images/val2017`.
fn mirrored_images_dir(labels_dir: &Path) -> Option<PathBuf> {
    let components: Vec<Component<'_>> = labels_dir.components().collect();
    let position = components
        .iter()
        .rposition(|component| component.as_os_str().eq_ignore_ascii_case("labels"))?;

    let mut mirrored = PathBuf::new();
    for (idx, component) in components.iter().enumerate() {
        if idx == position {
            mirrored.push("images");
        } else {
            mirrored.push(component.as_os_str());
        }
    }
    Some(mirrored)
}

fn collect_files_with_extensions(
    root: &Path,
    extensions: &[&str],
) -> Result<Vec<PathBuf>, VocMapError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|source| VocMapError::YoloLayoutInvalid {
            path: root.to_path_buf(),
            message: format!("failed while traversing directory: {source}"),
        })?;

        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            files.push(entry.path().to_path_buf());
        }
    }

    Ok(files)
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    allowed
        .iter()
        .any(|allowed_ext| ext.eq_ignore_ascii_case(allowed_ext))
}

fn read_image_dimensions(path: &Path) -> Result<(u32, u32), VocMapError> {
    let size = imagesize::size(path).map_err(|source| VocMapError::YoloImageDimensionRead {
        path: path.to_path_buf(),
        source,
    })?;

    let width: u32 = size
        .width
        .try_into()
        .map_err(|_| VocMapError::YoloLayoutInvalid {
            path: path.to_path_buf(),
            message: format!("image width {} does not fit in u32", size.width),
        })?;

    let height: u32 = size
        .height
        .try_into()
        .map_err(|_| VocMapError::YoloLayoutInvalid {
            path: path.to_path_buf(),
            message: format!("image height {} does not fit in u32", size.height),
        })?;

    Ok((width, height))
}

fn find_image_for_label(images_dir: &Path, label_rel_path: &Path) -> Option<PathBuf> {
    let stem_rel_path = label_rel_path.with_extension("");
    IMAGE_EXTENSIONS
        .iter()
        .map(|ext| images_dir.join(&stem_rel_path).with_extension(ext))
        .find(|candidate| candidate.is_file())
}

fn parse_label_line(
    line: &str,
    file_path: &Path,
    line_num: usize,
    kind: LabelKind,
) -> Result<Option<YoloLabelRow>, VocMapError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let expected = kind.expected_tokens();
    // Bounded take so pathological lines do not allocate without limit.
    let tokens: Vec<&str> = trimmed.split_whitespace().take(expected + 1).collect();

    if tokens.len() != expected {
        let message = if tokens.len() > expected {
            format!("expected {expected} tokens, found more; segmentation/pose rows are not supported")
        } else {
            format!("expected {expected} tokens, found {}", tokens.len())
        };
        return Err(VocMapError::YoloLabelParse {
            path: file_path.to_path_buf(),
            line: line_num,
            message,
        });
    }

    let class_id = tokens[0]
        .parse::<usize>()
        .map_err(|_| VocMapError::YoloLabelParse {
            path: file_path.to_path_buf(),
            line: line_num,
            message: format!(
                "invalid class_id '{}'; expected non-negative integer",
                tokens[0]
            ),
        })?;

    let cx = parse_f64_token(tokens[1], "x_center", file_path, line_num)?;
    let cy = parse_f64_token(tokens[2], "y_center", file_path, line_num)?;
    let w = parse_f64_token(tokens[3], "width", file_path, line_num)?;
    let h = parse_f64_token(tokens[4], "height", file_path, line_num)?;
    let confidence = match kind {
        LabelKind::GroundTruth => None,
        LabelKind::Prediction => Some(parse_f64_token(
            tokens[5],
            "confidence",
            file_path,
            line_num,
        )?),
    };

    Ok(Some(YoloLabelRow {
        class_id,
        cx,
        cy,
        w,
        h,
        confidence,
    }))
}

/// Fuzz-only entrypoint for YOLO single-line parsing.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_label_line(input: &str) -> Result<(), VocMapError> {
    let ground_truth = parse_label_line(input, Path::new("<fuzz>"), 1, LabelKind::GroundTruth);
    let prediction = parse_label_line(input, Path::new("<fuzz>"), 1, LabelKind::Prediction);
    ground_truth.and(prediction).map(|_| ())
}

fn parse_f64_token(
    raw: &str,
    field_name: &str,
    file_path: &Path,
    line_num: usize,
) -> Result<f64, VocMapError> {
    let value = raw
        .parse::<f64>()
        .map_err(|_| VocMapError::YoloLabelParse {
            path: file_path.to_path_buf(),
            line: line_num,
            message: format!("invalid {field_name} '{raw}'; expected floating-point number"),
        })?;
    if !value.is_finite() {
        return Err(VocMapError::YoloLabelParse {
            path: file_path.to_path_buf(),
            line: line_num,
            message: format!("{field_name} '{raw}' is not a finite number"),
        });
    }
    Ok(value)
}

fn rel_string(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}
