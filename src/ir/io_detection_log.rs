//! Reader for the plain-text detection log written by the vendor inference
//! tool.
//!
//! The log is a flat sequence of blocks. A header line names the image being
//! processed and every following box line is one detection on that image:
//!
//! ```text
//! 识别图片:/data/val/000123.jpg大小=1920x1080
//! box[(12,40),(210,388)]类别=person, 置信度=0.913
//! box[(400,52),(512,300)]类别=person, 置信度=0.402
//! ```
//!
//! Any other line (timings, banners) is ignored.

use std::fs;
use std::path::{Path, PathBuf};

use super::model::{Detection, PredictionSet};
use super::{BBoxXYXY, ImageId, Pixel};
use crate::error::VocMapError;

const IMAGE_HEADER_PREFIX: &str = "识别图片:";
const IMAGE_HEADER_SIZE_MARKER: &str = "大小=";
const BOX_PREFIX: &str = "box[(";
const LABEL_MARKER: &str = "]类别=";
const SCORE_MARKER: &str = ", 置信度=";

/// Read a detection log file into a [`PredictionSet`].
pub fn read_detection_log(path: &Path) -> Result<PredictionSet, VocMapError> {
    let text = fs::read_to_string(path).map_err(VocMapError::Io)?;
    parse_detection_log(&text, path)
}

/// Parse detection log text held in memory.
pub fn from_detection_log_str(text: &str) -> Result<PredictionSet, VocMapError> {
    parse_detection_log(text, Path::new("<memory>"))
}

#[derive(Debug, PartialEq)]
struct LogBox {
    bbox: BBoxXYXY<Pixel>,
    label: String,
    score: f64,
}

fn parse_detection_log(text: &str, path: &Path) -> Result<PredictionSet, VocMapError> {
    let mut predictions = PredictionSet::new();
    let mut current: Option<ImageId> = None;

    for (line_idx, line) in text.lines().enumerate() {
        let line_num = line_idx + 1;

        if let Some(image_path) = parse_image_header(line) {
            let image_id = image_id_from_path(image_path).ok_or_else(|| {
                parse_error(
                    path,
                    line_num,
                    format!("cannot derive an image id from '{image_path}'"),
                )
            })?;
            predictions.add_image(image_id.clone());
            current = Some(image_id);
            continue;
        }

        let Some(start) = line.find(BOX_PREFIX) else {
            continue;
        };

        let log_box = parse_box(&line[start + BOX_PREFIX.len()..])
            .map_err(|message| parse_error(path, line_num, message))?;

        let image_id = current.clone().ok_or_else(|| {
            parse_error(
                path,
                line_num,
                "box line appears before any image header".to_string(),
            )
        })?;

        predictions.push(Detection::new(
            image_id,
            log_box.label,
            log_box.bbox,
            log_box.score,
        ));
    }

    Ok(predictions)
}

fn parse_error(path: &Path, line: usize, message: String) -> VocMapError {
    VocMapError::DetectionLogParse {
        path: PathBuf::from(path),
        line,
        message,
    }
}

/// Returns the image path of a header line, up to the last size marker.
fn parse_image_header(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(IMAGE_HEADER_PREFIX)?;
    let end = rest.rfind(IMAGE_HEADER_SIZE_MARKER)?;
    Some(&rest[..end])
}

/// File stem of a path written by either a Unix or a Windows host.
fn image_id_from_path(raw: &str) -> Option<ImageId> {
    let file_name = raw.trim().rsplit(['/', '\\']).next()?;
    let stem = Path::new(file_name).file_stem()?;
    Some(ImageId::new(stem.to_string_lossy()))
}

/// Parses `x0,y0),(x1,y1)]类别=<label>, 置信度=<score>`.
fn parse_box(rest: &str) -> Result<LogBox, String> {
    let (x0, rest) = take_integer(rest, ",", "x0")?;
    let (y0, rest) = take_integer(rest, "),(", "y0")?;
    let (x1, rest) = take_integer(rest, ",", "x1")?;
    let (y1, rest) = take_integer(rest, ")", "y1")?;
    let bbox = BBoxXYXY::<Pixel>::from_xyxy(x0, y0, x1, y1);
    if !bbox.is_ordered() {
        return Err(format!(
            "box corners ({x0},{y0}),({x1},{y1}) are inverted; expected top-left then bottom-right"
        ));
    }

    let rest = rest
        .strip_prefix(LABEL_MARKER)
        .ok_or_else(|| format!("expected '{LABEL_MARKER}' after box corners"))?;

    let label_len = rest
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map(|(idx, _)| idx)
        .unwrap_or(rest.len());
    if label_len == 0 {
        return Err("empty class label".to_string());
    }
    let (label, rest) = rest.split_at(label_len);

    let rest = rest
        .strip_prefix(SCORE_MARKER)
        .ok_or_else(|| format!("expected '{SCORE_MARKER}' after class label"))?;
    let raw_score = rest.split_whitespace().next().unwrap_or_default();
    let score = raw_score
        .parse::<f64>()
        .ok()
        .filter(|score| score.is_finite())
        .ok_or_else(|| format!("invalid confidence '{raw_score}'; expected finite number"))?;

    Ok(LogBox {
        bbox,
        label: label.to_string(),
        score,
    })
}

fn take_integer<'a>(
    input: &'a str,
    terminator: &str,
    field: &str,
) -> Result<(f64, &'a str), String> {
    let end = input
        .find(terminator)
        .ok_or_else(|| format!("missing '{terminator}' after {field}"))?;
    let raw = &input[..end];
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid {field} '{raw}'; expected non-negative integer"));
    }
    let value = raw
        .parse::<u64>()
        .map_err(|_| format!("invalid {field} '{raw}'; value out of range"))?;
    Ok((value as f64, &input[end + terminator.len()..]))
}
