//! Parses whole label files and maps them back into pixel space.

#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use labelkit::ir::denormalize;
use labelkit::ir::io_label::from_label_str;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let Ok(content) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(records) = from_label_str(content, Path::new("<fuzz>")) {
        for record in &records {
            let _ = denormalize(record, 640.0, 480.0);
        }
    }
});
