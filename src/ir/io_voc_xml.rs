//! Pascal VOC XML ground-truth reader.
//!
//! Accepts either a VOC dataset root containing `Annotations/` or any
//! directory holding one XML file per image. The image key is the XML file
//! stem, which is what detectors usually name their outputs after.

use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::Node;
use walkdir::WalkDir;

use super::model::{Annotation, GroundTruthSet};
use super::{BBoxXYXY, ImageId, Pixel};
use crate::error::VocMapError;

const VOC_XML_EXTENSION: &str = "xml";

/// Read a Pascal VOC annotation directory into a [`GroundTruthSet`].
///
/// Objects flagged `<difficult>1</difficult>` are left out of the ground
/// truth; how many were dropped is printed as a warning.
pub fn read_voc_dir(path: &Path) -> Result<GroundTruthSet, VocMapError> {
    let annotations_dir = discover_annotations_dir(path)?;
    let xml_files = collect_xml_files(&annotations_dir)?;

    let mut ground_truth = GroundTruthSet::new();
    let mut difficult_skipped = 0usize;

    for xml_path in xml_files {
        let image_id = file_stem_id(&xml_path)?;
        let xml = fs::read_to_string(&xml_path).map_err(VocMapError::Io)?;
        let parsed = parse_voc_xml_str(&xml, &xml_path)?;

        difficult_skipped += parsed.difficult_skipped;
        ground_truth.add_image(image_id.clone());
        for annotation in parsed.annotations {
            ground_truth.push(image_id.clone(), annotation);
        }
    }

    if difficult_skipped > 0 {
        eprintln!(
            "Warning: skipped {} difficult VOC object(s) under {}",
            difficult_skipped,
            annotations_dir.display()
        );
    }

    Ok(ground_truth)
}

/// Parse a single VOC XML document held in memory.
///
/// Returns the non-difficult objects. Useful for tests and fuzzing.
pub fn from_voc_xml_str(xml: &str) -> Result<Vec<Annotation>, VocMapError> {
    Ok(parse_voc_xml_str(xml, Path::new("<memory>"))?.annotations)
}

/// Parse VOC XML from bytes. The input must be valid UTF-8.
pub fn from_voc_xml_slice(bytes: &[u8]) -> Result<Vec<Annotation>, VocMapError> {
    let xml = std::str::from_utf8(bytes).map_err(|source| VocMapError::VocXmlParse {
        path: PathBuf::from("<memory>"),
        message: format!("input is not valid UTF-8: {source}"),
    })?;
    from_voc_xml_str(xml)
}

#[derive(Debug)]
struct ParsedVocFile {
    annotations: Vec<Annotation>,
    difficult_skipped: usize,
}

fn discover_annotations_dir(input: &Path) -> Result<PathBuf, VocMapError> {
    if !input.is_dir() {
        return Err(VocMapError::VocLayoutInvalid {
            path: input.to_path_buf(),
            message: "input must be a directory".to_string(),
        });
    }

    let nested = input.join("Annotations");
    if nested.is_dir() {
        Ok(nested)
    } else {
        Ok(input.to_path_buf())
    }
}

fn collect_xml_files(dir: &Path) -> Result<Vec<PathBuf>, VocMapError> {
    let mut files = Vec::new();
    let mut nested_xml = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true).min_depth(1) {
        let entry = entry.map_err(|source| VocMapError::VocLayoutInvalid {
            path: dir.to_path_buf(),
            message: format!("failed while traversing annotations directory: {source}"),
        })?;

        if !entry.file_type().is_file() || !has_xml_extension(entry.path()) {
            continue;
        }

        if entry.depth() == 1 {
            files.push(entry.path().to_path_buf());
        } else {
            nested_xml.push(entry.path().to_path_buf());
        }
    }

    files.sort_by_cached_key(|path| rel_string(dir, path));

    if !nested_xml.is_empty() {
        nested_xml.sort_by_cached_key(|path| rel_string(dir, path));
        eprintln!(
            "Warning: VOC reader scans annotations flat (non-recursive); skipping {} nested .xml file(s), e.g. {}",
            nested_xml.len(),
            rel_string(dir, &nested_xml[0])
        );
    }

    Ok(files)
}

fn parse_voc_xml_str(xml: &str, path: &Path) -> Result<ParsedVocFile, VocMapError> {
    let document = roxmltree::Document::parse(xml).map_err(|source| VocMapError::VocXmlParse {
        path: path.to_path_buf(),
        message: source.to_string(),
    })?;

    let annotation = document.root_element();
    if annotation.tag_name().name() != "annotation" {
        return Err(VocMapError::VocXmlParse {
            path: path.to_path_buf(),
            message: "missing <annotation> root element".to_string(),
        });
    }

    let mut annotations = Vec::new();
    let mut difficult_skipped = 0;

    for object in annotation
        .children()
        .filter(|node| node.is_element() && node.tag_name().name() == "object")
    {
        let name = required_child_text(object, "name", path, "<object>")?;

        if is_difficult(object, path)? {
            difficult_skipped += 1;
            continue;
        }

        let bndbox = required_child_element(object, "bndbox", path, "<object>")?;
        let xmin = parse_required_f64(bndbox, "xmin", path, "<bndbox>")?;
        let ymin = parse_required_f64(bndbox, "ymin", path, "<bndbox>")?;
        let xmax = parse_required_f64(bndbox, "xmax", path, "<bndbox>")?;
        let ymax = parse_required_f64(bndbox, "ymax", path, "<bndbox>")?;

        let bbox = BBoxXYXY::<Pixel>::from_xyxy(xmin, ymin, xmax, ymax);
        if !bbox.is_finite() || !bbox.is_ordered() {
            return Err(VocMapError::VocXmlParse {
                path: path.to_path_buf(),
                message: format!(
                    "<bndbox> of object '{name}' is not finite and ordered: {bbox:?}"
                ),
            });
        }
        annotations.push(Annotation::new(name, bbox));
    }

    Ok(ParsedVocFile {
        annotations,
        difficult_skipped,
    })
}

fn is_difficult(object: Node<'_, '_>, path: &Path) -> Result<bool, VocMapError> {
    let Some(raw) = optional_child_text(object, "difficult") else {
        return Ok(false);
    };

    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(VocMapError::VocXmlParse {
            path: path.to_path_buf(),
            message: format!("invalid <difficult> value '{raw}' in <object>; expected 0 or 1"),
        }),
    }
}

fn required_child_element<'a, 'input>(
    node: Node<'a, 'input>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<Node<'a, 'input>, VocMapError> {
    child_element(node, tag).ok_or_else(|| VocMapError::VocXmlParse {
        path: path.to_path_buf(),
        message: format!("missing <{tag}> in {context}"),
    })
}

fn required_child_text(
    node: Node<'_, '_>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<String, VocMapError> {
    optional_child_text(node, tag).ok_or_else(|| VocMapError::VocXmlParse {
        path: path.to_path_buf(),
        message: format!("missing <{tag}> in {context}"),
    })
}

fn parse_required_f64(
    node: Node<'_, '_>,
    tag: &str,
    path: &Path,
    context: &str,
) -> Result<f64, VocMapError> {
    let raw = required_child_text(node, tag, path, context)?;
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| VocMapError::VocXmlParse {
            path: path.to_path_buf(),
            message: format!(
                "invalid <{tag}> value '{raw}' in {context}; expected finite number"
            ),
        })
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|child| child.is_element() && child.tag_name().name() == tag)
}

fn optional_child_text(node: Node<'_, '_>, tag: &str) -> Option<String> {
    child_element(node, tag)
        .and_then(|child| child.text())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}

fn file_stem_id(path: &Path) -> Result<ImageId, VocMapError> {
    path.file_stem()
        .map(|stem| ImageId::new(stem.to_string_lossy()))
        .ok_or_else(|| VocMapError::VocXmlParse {
            path: path.to_path_buf(),
            message: "file has no stem to use as image id".to_string(),
        })
}

fn has_xml_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(VOC_XML_EXTENSION))
        .unwrap_or(false)
}

fn rel_string(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<annotation>
  <filename>img1.jpg</filename>
  <object>
    <name>cat</name>
    <difficult>0</difficult>
    <bndbox>
      <xmin>10</xmin>
      <ymin>20</ymin>
      <xmax>30</xmax>
      <ymax>40</ymax>
    </bndbox>
  </object>
  <object>
    <name>dog</name>
    <difficult>1</difficult>
    <bndbox>
      <xmin>1</xmin>
      <ymin>2</ymin>
      <xmax>3</xmax>
      <ymax>4</ymax>
    </bndbox>
  </object>
  <object>
    <name>dog</name>
    <bndbox>
      <xmin>5.5</xmin>
      <ymin>6</ymin>
      <xmax>50</xmax>
      <ymax>60</ymax>
    </bndbox>
  </object>
</annotation>"#;

    #[test]
    fn parse_excludes_difficult_objects() {
        let parsed = parse_voc_xml_str(SAMPLE, Path::new("sample.xml")).expect("parse xml");
        assert_eq!(parsed.difficult_skipped, 1);
        assert_eq!(parsed.annotations.len(), 2);
        assert_eq!(parsed.annotations[0].label, "cat");
        assert_eq!(
            parsed.annotations[0].bbox,
            BBoxXYXY::from_xyxy(10.0, 20.0, 30.0, 40.0)
        );
        assert_eq!(parsed.annotations[1].label, "dog");
        assert_eq!(parsed.annotations[1].bbox.xmin(), 5.5);
    }

    #[test]
    fn parse_rejects_bad_difficult_flag() {
        let xml = "<annotation><object><name>a</name><difficult>maybe</difficult>\
                   <bndbox><xmin>0</xmin><ymin>0</ymin><xmax>1</xmax><ymax>1</ymax></bndbox>\
                   </object></annotation>";
        let err = from_voc_xml_str(xml).unwrap_err();
        assert!(matches!(err, VocMapError::VocXmlParse { .. }));
    }

    #[test]
    fn parse_rejects_missing_coordinate() {
        let xml = "<annotation><object><name>a</name>\
                   <bndbox><xmin>0</xmin><ymin>0</ymin><xmax>1</xmax></bndbox>\
                   </object></annotation>";
        let err = from_voc_xml_str(xml).unwrap_err();
        assert!(err.to_string().contains("missing <ymax>"));
    }

    #[test]
    fn parse_rejects_wrong_root() {
        assert!(from_voc_xml_str("<something/>").is_err());
    }

    #[test]
    fn read_voc_dir_accepts_root_or_flat_dir() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let annotations = temp.path().join("Annotations");
        fs::create_dir_all(&annotations).expect("create annotations dir");
        fs::write(annotations.join("000001.xml"), SAMPLE).expect("write xml");
        fs::write(
            annotations.join("000002.xml"),
            "<annotation><filename>x.jpg</filename></annotation>",
        )
        .expect("write empty xml");

        for input in [temp.path().to_path_buf(), annotations.clone()] {
            let gt = read_voc_dir(&input).expect("read voc");
            assert_eq!(gt.image_count(), 2);
            assert_eq!(gt.annotation_count(), 2);
            assert!(gt.contains_image("000002"));
            assert!(gt.annotations("000002").is_empty());
        }
    }

    #[test]
    fn read_voc_dir_rejects_files() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let file = temp.path().join("a.xml");
        fs::write(&file, SAMPLE).expect("write xml");
        let err = read_voc_dir(&file).unwrap_err();
        assert!(matches!(err, VocMapError::VocLayoutInvalid { .. }));
    }

    fn single_object(xmin: &str, ymin: &str, xmax: &str, ymax: &str) -> String {
        format!(
            "<annotation><object><name>a</name><bndbox><xmin>{xmin}</xmin><ymin>{ymin}</ymin>\
             <xmax>{xmax}</xmax><ymax>{ymax}</ymax></bndbox></object></annotation>"
        )
    }

    #[test]
    fn parse_rejects_non_finite_coordinates() {
        for xml in [
            single_object("nan", "0", "1", "1"),
            single_object("0", "0", "inf", "1"),
            single_object("0", "-infinity", "1", "1"),
        ] {
            let err = from_voc_xml_str(&xml).unwrap_err();
            assert!(err.to_string().contains("expected finite number"), "{err}");
        }
    }

    #[test]
    fn parse_rejects_inverted_box() {
        let err = from_voc_xml_str(&single_object("50", "50", "0", "0")).unwrap_err();
        assert!(err.to_string().contains("not finite and ordered"), "{err}");

        // A single-pixel box is still ordered.
        let anns = from_voc_xml_str(&single_object("5", "5", "5", "5")).expect("parse xml");
        assert_eq!(anns.len(), 1);
    }
}
