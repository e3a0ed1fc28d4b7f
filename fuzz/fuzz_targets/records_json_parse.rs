//! Fuzz target for detection record parsing.
//!
//! Feeds arbitrary bytes to the record parser and, when they parse, runs
//! NMS and equality over the result to shake out panics on odd shapes.
//!
//! Run with:
//!   cargo +nightly fuzz run records_json_parse

#![no_main]

use boxlist::io_records::{from_records_slice, fuzz_parse_record};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Cap input size to avoid OOM on very large inputs.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = fuzz_parse_record(data);

    let Ok(lists) = from_records_slice(data) else {
        return;
    };
    for list in &lists {
        let _ = list.suppress(0.5);
        let _ = list.equals(list);
    }
});
