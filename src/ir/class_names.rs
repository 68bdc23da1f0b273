//! Loading the ordered list of class names under evaluation.
//!
//! The order matters: YOLO class indices and COCO category ids both index
//! into it, and per-class results are reported in it.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::VocMapError;

/// Upper bound on class indices accepted from a `names:` mapping.
const MAX_CLASS_COUNT: usize = 100_000;

#[derive(Debug, Deserialize)]
struct DataYaml {
    names: DataYamlNames,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DataYamlNames {
    Sequence(Vec<String>),
    Mapping(BTreeMap<usize, String>),
}

/// Read class names from a YOLO `data.yaml` (`.yaml`/`.yml`) or from a plain
/// text file with one name per line.
pub fn read_class_names(path: &Path) -> Result<Vec<String>, VocMapError> {
    let data = fs::read_to_string(path).map_err(VocMapError::Io)?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
        .unwrap_or(false);

    let names = if is_yaml {
        parse_data_yaml_names(&data, path)?
    } else {
        parse_names_txt(&data, path)?
    };

    check_class_names(&names).map_err(|message| VocMapError::ClassNamesInvalid {
        path: path.to_path_buf(),
        message,
    })?;
    Ok(names)
}

/// Checks that the list is non-empty and every name is unique and non-blank.
pub fn check_class_names(names: &[String]) -> Result<(), String> {
    if names.is_empty() {
        return Err("class list is empty".to_string());
    }

    let mut seen = BTreeSet::new();
    for (index, name) in names.iter().enumerate() {
        if name.trim().is_empty() {
            return Err(format!("class {index} has an empty name"));
        }
        if !seen.insert(name.as_str()) {
            return Err(format!("class name '{name}' appears more than once"));
        }
    }
    Ok(())
}

fn parse_data_yaml_names(data: &str, path: &Path) -> Result<Vec<String>, VocMapError> {
    let parsed: DataYaml =
        serde_yaml::from_str(data).map_err(|source| VocMapError::ClassNamesParse {
            path: path.to_path_buf(),
            source,
        })?;

    let names = match parsed.names {
        DataYamlNames::Sequence(names) => names,
        DataYamlNames::Mapping(mapping) => {
            let Some(max_index) = mapping.keys().max().copied() else {
                return Ok(Vec::new());
            };
            if max_index >= MAX_CLASS_COUNT {
                return Err(VocMapError::ClassNamesInvalid {
                    path: path.to_path_buf(),
                    message: format!(
                        "class index {max_index} exceeds the limit of {MAX_CLASS_COUNT} classes"
                    ),
                });
            }
            let mut names = vec![String::new(); max_index + 1];
            for (index, name) in mapping {
                names[index] = name;
            }
            for (index, name) in names.iter_mut().enumerate() {
                if name.trim().is_empty() {
                    *name = format!("class_{}", index);
                }
            }
            names
        }
    };

    Ok(names)
}

fn parse_names_txt(data: &str, path: &Path) -> Result<Vec<String>, VocMapError> {
    let mut names = Vec::new();

    for (line_idx, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            // Tolerate trailing blank lines only.
            if data.lines().skip(line_idx).all(|rest| rest.trim().is_empty()) {
                break;
            }
            return Err(VocMapError::ClassNamesInvalid {
                path: path.to_path_buf(),
                message: format!("line {} is empty", line_idx + 1),
            });
        }
        names.push(trimmed.to_string());
    }

    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_yaml_sequence_and_mapping() {
        let temp = tempfile::tempdir().expect("create temp dir");

        let seq = temp.path().join("seq.yaml");
        fs::write(&seq, "names:\n  - person\n  - car\n").expect("write yaml");
        assert_eq!(read_class_names(&seq).expect("read"), vec!["person", "car"]);

        let map = temp.path().join("map.yml");
        fs::write(&map, "names:\n  0: person\n  2: car\n").expect("write yaml");
        assert_eq!(
            read_class_names(&map).expect("read"),
            vec!["person", "class_1", "car"]
        );
    }

    #[test]
    fn reads_one_name_per_line() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let path = temp.path().join("voc.names");
        fs::write(&path, "aeroplane\nbicycle\n\n").expect("write names");
        assert_eq!(
            read_class_names(&path).expect("read"),
            vec!["aeroplane", "bicycle"]
        );
    }

    #[test]
    fn rejects_inner_blank_lines_and_duplicates() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let gap = temp.path().join("gap.txt");
        fs::write(&gap, "a\n\nb\n").expect("write names");
        assert!(matches!(
            read_class_names(&gap).unwrap_err(),
            VocMapError::ClassNamesInvalid { .. }
        ));

        let dup = temp.path().join("dup.txt");
        fs::write(&dup, "a\nb\na\n").expect("write names");
        let err = read_class_names(&dup).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn check_rejects_empty_list() {
        assert!(check_class_names(&[]).is_err());
        assert!(check_class_names(&["x".to_string()]).is_ok());
    }

    #[test]
    fn huge_mapping_index_is_rejected() {
        let temp = tempfile::tempdir().expect("create temp dir");
        for key in ["18446744073709551615", "100000"] {
            let yaml = temp.path().join("data.yaml");
            fs::write(&yaml, format!("names:\n  0: person\n  {key}: car\n")).expect("write yaml");
            let err = read_class_names(&yaml).unwrap_err();
            assert!(
                matches!(err, VocMapError::ClassNamesInvalid { .. }),
                "{key}: {err}"
            );
        }

        let yaml = temp.path().join("data.yaml");
        fs::write(&yaml, "names:\n  99999: car\n").expect("write yaml");
        assert_eq!(read_class_names(&yaml).expect("read").len(), 100_000);
    }
}
