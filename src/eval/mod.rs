//! COCO-style evaluation records.
//!
//! This module shapes ground-truth and predicted box lists into the JSON
//! records a COCO evaluator (e.g. pycocotools) consumes. It does not compute
//! any metric itself; the evaluator is supplied through the [`Evaluator`]
//! trait.
//!
//! # Conventions
//!
//! - One box list per image; image ids are assigned 1, 2, ... in input order.
//! - Image metadata (size, file name) is a placeholder, since evaluators only
//!   join on the image id.
//! - Boxes are written as `[x, y, width, height]`.
//! - Category ids are shifted from 0-indexed `class_ids` to 1-indexed.
//! - `iscrowd` is always `0`.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::boxes::{geometry, BoxFormat, BoxList, CLASS_IDS, SCORES};
use crate::error::BoxListError;

/// Height and width written for every synthetic image entry.
pub const PLACEHOLDER_IMAGE_SIZE: u32 = 1000;

const SUPERCATEGORY: &str = "super";

// ============================================================================
// COCO Schema Types
// ============================================================================

/// A COCO ground-truth file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoGroundTruth {
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoAnnotation>,
    pub categories: Vec<CocoCategory>,
}

/// COCO image entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CocoImage {
    pub id: u64,
    pub height: u32,
    pub width: u32,
    pub file_name: String,
}

/// COCO ground-truth annotation entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CocoAnnotation {
    pub id: u64,
    pub image_id: u64,
    pub category_id: i64,
    pub area: f64,
    /// `[x, y, width, height]` with `(x, y)` the top-left corner.
    pub bbox: [f64; 4],
    pub iscrowd: u8,
}

/// COCO category entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CocoCategory {
    pub id: u64,
    pub name: String,
    pub supercategory: String,
}

/// One detection in COCO results format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CocoPrediction {
    pub image_id: u64,
    pub category_id: i64,
    /// `[x, y, width, height]` with `(x, y)` the top-left corner.
    pub bbox: [f64; 4],
    pub score: f64,
}

/// Computes metrics from ground truth and predictions.
pub trait Evaluator {
    type Metrics;
    type Error: std::error::Error + Send + Sync + 'static;

    fn summarize(
        &self,
        ground_truth: &CocoGroundTruth,
        predictions: &[CocoPrediction],
    ) -> Result<Self::Metrics, Self::Error>;
}

// ============================================================================
// Public API
// ============================================================================

/// Builds a COCO ground-truth record from one box list per image.
///
/// # Errors
/// Returns [`BoxListError::MissingField`] if a list has no `class_ids`.
pub fn to_ground_truth_json(
    targets: &[BoxList],
    num_categories: usize,
) -> Result<CocoGroundTruth, BoxListError> {
    let mut images = Vec::with_capacity(targets.len());
    let mut annotations = Vec::new();
    let mut ann_id = 1u64;

    for (image_id, target) in (1u64..).zip(targets) {
        images.push(CocoImage {
            id: image_id,
            height: PLACEHOLDER_IMAGE_SIZE,
            width: PLACEHOLDER_IMAGE_SIZE,
            file_name: format!("{}.png", image_id),
        });

        let class_ids = target.ints(CLASS_IDS)?;
        let xywh = target.convert_boxes(BoxFormat::Xywh);
        for ((canonical, bbox), &class_id) in target.boxes().iter().zip(xywh).zip(class_ids) {
            annotations.push(CocoAnnotation {
                id: ann_id,
                image_id,
                category_id: class_id + 1,
                area: geometry::area(canonical),
                bbox,
                iscrowd: 0,
            });
            ann_id += 1;
        }
    }

    let categories = (1..=num_categories as u64)
        .map(|id| CocoCategory {
            id,
            name: id.to_string(),
            supercategory: SUPERCATEGORY.to_string(),
        })
        .collect();

    Ok(CocoGroundTruth {
        images,
        annotations,
        categories,
    })
}

/// Builds COCO result records from one box list per image.
///
/// Returns `Ok(None)` when there is not a single predicted box: average
/// precision is undefined in that case and the evaluator must not be run.
///
/// # Errors
/// Returns [`BoxListError::MissingField`] if a list has no `class_ids` or
/// `scores`.
pub fn to_predictions_json(
    outputs: &[BoxList],
) -> Result<Option<Vec<CocoPrediction>>, BoxListError> {
    let mut predictions = Vec::new();

    for (image_id, output) in (1u64..).zip(outputs) {
        let class_ids = output.ints(CLASS_IDS)?;
        let scores = output.floats(SCORES)?;
        let xywh = output.convert_boxes(BoxFormat::Xywh);
        for ((bbox, &class_id), &score) in xywh.into_iter().zip(class_ids).zip(scores) {
            predictions.push(CocoPrediction {
                image_id,
                category_id: class_id + 1,
                bbox,
                score,
            });
        }
    }

    if predictions.is_empty() {
        return Ok(None);
    }
    Ok(Some(predictions))
}

/// Exports both sides and runs `evaluator`.
///
/// Returns `Ok(None)` without calling the evaluator when there are no
/// predictions.
pub fn compute_coco_eval<E: Evaluator>(
    outputs: &[BoxList],
    targets: &[BoxList],
    num_categories: usize,
    evaluator: &E,
) -> Result<Option<E::Metrics>, BoxListError> {
    let Some(predictions) = to_predictions_json(outputs)? else {
        warn!("no predicted boxes; skipping evaluation (metric undefined)");
        return Ok(None);
    };
    let ground_truth = to_ground_truth_json(targets, num_categories)?;

    evaluator
        .summarize(&ground_truth, &predictions)
        .map(Some)
        .map_err(|e| BoxListError::Evaluator(Box::new(e)))
}

/// Writes a ground-truth record to a JSON file.
pub fn write_ground_truth_json(
    path: &Path,
    ground_truth: &CocoGroundTruth,
) -> Result<(), BoxListError> {
    write_json(path, ground_truth)
}

/// Writes prediction records to a JSON file.
pub fn write_predictions_json(
    path: &Path,
    predictions: &[CocoPrediction],
) -> Result<(), BoxListError> {
    write_json(path, predictions)
}

/// Serializes a ground-truth record to a JSON string.
///
/// Useful for testing without file I/O.
pub fn to_ground_truth_string(ground_truth: &CocoGroundTruth) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(ground_truth)
}

/// Serializes prediction records to a JSON string.
pub fn to_predictions_string(predictions: &[CocoPrediction]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(predictions)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), BoxListError> {
    let file = File::create(path).map_err(BoxListError::Io)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, value).map_err(|source| BoxListError::CocoJsonWrite {
        path: path.to_path_buf(),
        source,
    })
}

// ============================================================================
// Tests
// ============================================================================
