//! JSON files of per-image detection records.
//!
//! A record file is a JSON array with one object per image:
//!
//! ```json
//! [
//!   {"format": "xyxy", "boxes": [[0, 0, 10, 10]], "class_ids": [0], "scores": [0.9]},
//!   {"boxes": [[5, 5, 2, 2]], "class_ids": [1]}
//! ]
//! ```
//!
//! `format` defaults to `xywh`, the usual on-disk annotation convention.
//! Ground-truth records omit `scores`. Records are written back in
//! whichever format the caller asks for.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::boxes::{Box4, BoxFormat, BoxList, Field, CLASS_IDS, SCORES};
use crate::error::BoxListError;

/// Box format assumed when a record has no `format` tag.
pub const DEFAULT_RECORD_FORMAT: BoxFormat = BoxFormat::Xywh;

#[derive(Debug, Serialize, Deserialize)]
struct DetectionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    format: Option<String>,

    boxes: Vec<Box4>,

    class_ids: Vec<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    scores: Option<Vec<f64>>,
}

/// Reads one box list per record from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, if a record names
/// an unknown box format, or if a record's arrays have different lengths.
pub fn read_records(path: &Path) -> Result<Vec<BoxList>, BoxListError> {
    let file = File::open(path).map_err(BoxListError::Io)?;
    let reader = BufReader::new(file);

    let records: Vec<DetectionRecord> =
        serde_json::from_reader(reader).map_err(|source| BoxListError::RecordJsonParse {
            path: path.to_path_buf(),
            source,
        })?;

    records.into_iter().map(record_to_list).collect()
}

/// Writes box lists as records with boxes in `format`.
///
/// # Errors
/// Returns an error if a list has no `class_ids` or the file cannot be
/// written.
pub fn write_records(
    path: &Path,
    lists: &[BoxList],
    format: BoxFormat,
) -> Result<(), BoxListError> {
    let records = lists
        .iter()
        .map(|list| list_to_record(list, format))
        .collect::<Result<Vec<_>, _>>()?;

    let file = File::create(path).map_err(BoxListError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, &records).map_err(|source| {
        BoxListError::RecordJsonWrite {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Reads records from a JSON string.
///
/// Useful for testing without file I/O.
pub fn from_records_str(json: &str) -> Result<Vec<BoxList>, BoxListError> {
    let records: Vec<DetectionRecord> =
        serde_json::from_str(json).map_err(BoxListError::RecordJson)?;
    records.into_iter().map(record_to_list).collect()
}

/// Reads records from a JSON byte slice.
///
/// Useful for fuzzing and processing raw bytes without UTF-8 validation overhead.
pub fn from_records_slice(bytes: &[u8]) -> Result<Vec<BoxList>, BoxListError> {
    let records: Vec<DetectionRecord> =
        serde_json::from_slice(bytes).map_err(BoxListError::RecordJson)?;
    records.into_iter().map(record_to_list).collect()
}

/// Writes records to a JSON string.
pub fn to_records_string(lists: &[BoxList], format: BoxFormat) -> Result<String, BoxListError> {
    let records = lists
        .iter()
        .map(|list| list_to_record(list, format))
        .collect::<Result<Vec<_>, _>>()?;
    serde_json::to_string_pretty(&records).map_err(BoxListError::RecordJson)
}

/// Fuzz-only entrypoint for parsing a single record object.
#[cfg(feature = "fuzzing")]
pub fn fuzz_parse_record(bytes: &[u8]) -> Result<(), BoxListError> {
    let record: DetectionRecord =
        serde_json::from_slice(bytes).map_err(BoxListError::RecordJson)?;
    let _ = record_to_list(record)?;
    Ok(())
}

fn record_to_list(record: DetectionRecord) -> Result<BoxList, BoxListError> {
    let format = match record.format.as_deref() {
        Some(tag) => tag.parse()?,
        None => DEFAULT_RECORD_FORMAT,
    };

    let mut extras = BTreeMap::from([(CLASS_IDS.to_string(), Field::Int(record.class_ids))]);
    if let Some(scores) = record.scores {
        extras.insert(SCORES.to_string(), Field::Float(scores));
    }

    BoxList::new(record.boxes, format, extras)
}

fn list_to_record(list: &BoxList, format: BoxFormat) -> Result<DetectionRecord, BoxListError> {
    let scores = if list.contains(SCORES) {
        Some(list.floats(SCORES)?.to_vec())
    } else {
        None
    };

    Ok(DetectionRecord {
        format: Some(format.as_str().to_string()),
        boxes: list.convert_boxes(format),
        class_ids: list.ints(CLASS_IDS)?.to_vec(),
        scores,
    })
}
