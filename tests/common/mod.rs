#![allow(dead_code)]

use std::fs;
use std::path::Path;

/// One `<object>` of a VOC annotation file.
pub struct VocObject<'a> {
    pub name: &'a str,
    pub bbox: [f64; 4],
    pub difficult: bool,
}

pub fn obj(name: &str, bbox: [f64; 4]) -> VocObject<'_> {
    VocObject {
        name,
        bbox,
        difficult: false,
    }
}

pub fn voc_xml(filename: &str, objects: &[VocObject<'_>]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<annotation>\n  <filename>{filename}</filename>\n"
    );
    for object in objects {
        let [xmin, ymin, xmax, ymax] = object.bbox;
        xml.push_str(&format!(
            "  <object>\n    <name>{}</name>\n    <difficult>{}</difficult>\n    <bndbox>\n      <xmin>{xmin}</xmin>\n      <ymin>{ymin}</ymin>\n      <xmax>{xmax}</xmax>\n      <ymax>{ymax}</ymax>\n    </bndbox>\n  </object>\n",
            object.name,
            u8::from(object.difficult),
        ));
    }
    xml.push_str("</annotation>\n");
    xml
}

/// Writes `<dir>/Annotations/<stem>.xml`.
pub fn write_voc(dir: &Path, stem: &str, objects: &[VocObject<'_>]) {
    let annotations = dir.join("Annotations");
    fs::create_dir_all(&annotations).expect("create Annotations dir");
    fs::write(
        annotations.join(format!("{stem}.xml")),
        voc_xml(&format!("{stem}.jpg"), objects),
    )
    .expect("write voc xml");
}

/// A detection log block for one image.
pub fn log_block(stem: &str, boxes: &[(&str, [i64; 4], f64)]) -> String {
    let mut text = format!("识别图片:/data/val/{stem}.jpg大小=640x480\n");
    for (label, [x0, y0, x1, y1], score) in boxes {
        text.push_str(&format!(
            "box[({x0},{y0}),({x1},{y1})]类别={label}, 置信度={score}\n"
        ));
    }
    text
}

pub fn write_text(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, contents).expect("write text file");
}

pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

pub fn write_bmp(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write bmp file");
}
