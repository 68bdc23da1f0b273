//! Fuzz target for the detection log parser.
//!
//! The log format is scanned by hand, so this mostly guards the slicing
//! around the `box[(`, `类别=` and `置信度=` markers.
//!
//! Run with:
//!   cargo +nightly fuzz run detection_log_parse

#![no_main]

use libfuzzer_sys::fuzz_target;
use vocmap::ir::io_detection_log::from_detection_log_str;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let _ = from_detection_log_str(text);
});
