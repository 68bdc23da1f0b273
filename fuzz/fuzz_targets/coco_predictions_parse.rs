//! Fuzz target for COCO detection-result JSON.
//!
//! Run with:
//!   cargo +nightly fuzz run coco_predictions_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use vocmap::ir::io_coco_json::{from_coco_predictions_str, CocoBboxFormat};

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };

    let classes = vec!["person".to_string(), "car".to_string()];
    let _ = from_coco_predictions_str(json, &classes, CocoBboxFormat::Xywh);
    let _ = from_coco_predictions_str(json, &classes, CocoBboxFormat::Xyxy);
});
