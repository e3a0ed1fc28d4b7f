//! Bridge between [`BoxList`]s and an external detector's tensors.
//!
//! Detectors in the torchvision family take per-image `{boxes, labels}`
//! targets and emit per-image `{boxes, labels, scores}` detections, with
//! labels 1-indexed so that `0` can mean "background". Box lists use
//! 0-indexed `class_ids`. This module owns that translation and nothing
//! else: the network itself is reached through the [`Detector`] trait.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::boxes::{Box4, BoxFormat, BoxList, Field, CLASS_IDS, SCORES};
use crate::error::BoxListError;

/// Key under which [`DetectorAdapter::forward`] reports the summed loss.
pub const TOTAL_LOSS: &str = "total_loss";

/// Named loss terms returned by a detector in training mode.
pub type LossMap = BTreeMap<String, f64>;

/// One image's training target in the detector's convention.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelTarget {
    pub boxes: Vec<Box4>,
    /// 1-indexed class labels.
    pub labels: Vec<i64>,
}

/// One image's detections in the detector's convention.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelOutput {
    pub boxes: Vec<Box4>,
    /// 1-indexed class labels; `0` is background.
    pub labels: Vec<i64>,
    pub scores: Vec<f64>,
}

/// An object detector that can be trained or queried.
pub trait Detector {
    /// A batch of input images.
    type Batch: ?Sized;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs the detector in training mode and returns its loss terms.
    fn losses(
        &mut self,
        batch: &Self::Batch,
        targets: &[ModelTarget],
    ) -> Result<LossMap, Self::Error>;

    /// Runs the detector in inference mode, one output per image.
    fn infer(&mut self, batch: &Self::Batch) -> Result<Vec<ModelOutput>, Self::Error>;
}

/// How box lists map onto the detector's tensors.
#[derive(Clone, Debug)]
pub struct AdapterConfig {
    /// Output labels that are dropped (background / null classes).
    pub ignored_label_indices: BTreeSet<i64>,
    /// Coordinate order the detector reads and writes.
    pub box_format: BoxFormat,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            ignored_label_indices: BTreeSet::from([0]),
            box_format: BoxFormat::Xyxy,
        }
    }
}

/// Result of [`DetectorAdapter::forward`].
#[derive(Clone, Debug)]
pub enum Forward {
    /// Training mode: every loss term plus [`TOTAL_LOSS`].
    Losses(LossMap),
    /// Inference mode: one box list per image with `class_ids` and `scores`.
    Detections(Vec<BoxList>),
}

/// Converts a box list into a detector target, shifting class ids to
/// 1-indexed labels.
///
/// # Errors
/// Returns [`BoxListError::MissingField`] if the list has no `class_ids`.
pub fn to_model_input(list: &BoxList, box_format: BoxFormat) -> Result<ModelTarget, BoxListError> {
    let class_ids = list.ints(CLASS_IDS)?;
    Ok(ModelTarget {
        boxes: list.convert_boxes(box_format),
        labels: class_ids.iter().map(|&c| c + 1).collect(),
    })
}

/// Converts detector output into a box list.
///
/// Detections whose label is in `config.ignored_label_indices` are dropped
/// in a single pass, and the remaining labels are shifted back to 0-indexed
/// `class_ids`.
///
/// # Errors
/// Returns [`BoxListError::ShapeMismatch`] if `labels` or `scores` do not
/// have one entry per box.
pub fn from_model_output(
    output: &ModelOutput,
    config: &AdapterConfig,
) -> Result<BoxList, BoxListError> {
    let n = output.boxes.len();
    for (name, len) in [("labels", output.labels.len()), (SCORES, output.scores.len())] {
        if len != n {
            return Err(BoxListError::ShapeMismatch {
                name: name.to_string(),
                expected: n,
                actual: len,
            });
        }
    }

    let keep: Vec<bool> = output
        .labels
        .iter()
        .map(|label| !config.ignored_label_indices.contains(label))
        .collect();

    let mut boxes = Vec::with_capacity(n);
    let mut class_ids = Vec::with_capacity(n);
    let mut scores = Vec::with_capacity(n);
    for (i, _) in keep.iter().enumerate().filter(|&(_, &k)| k) {
        boxes.push(output.boxes[i]);
        class_ids.push(output.labels[i] - 1);
        scores.push(output.scores[i]);
    }

    BoxList::new(
        boxes,
        config.box_format,
        BTreeMap::from([
            (CLASS_IDS.to_string(), Field::Int(class_ids)),
            (SCORES.to_string(), Field::Float(scores)),
        ]),
    )
}

/// Wraps a [`Detector`] so that it speaks in box lists.
#[derive(Debug)]
pub struct DetectorAdapter<D> {
    detector: D,
    config: AdapterConfig,
}

impl<D: Detector> DetectorAdapter<D> {
    /// Wraps `detector` with the default configuration (ignore label `0`,
    /// `xyxy` boxes).
    pub fn new(detector: D) -> Self {
        Self::with_config(detector, AdapterConfig::default())
    }

    pub fn with_config(detector: D, config: AdapterConfig) -> Self {
        Self { detector, config }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn into_inner(self) -> D {
        self.detector
    }

    pub fn to_model_input(&self, list: &BoxList) -> Result<ModelTarget, BoxListError> {
        to_model_input(list, self.config.box_format)
    }

    pub fn from_model_output(&self, output: &ModelOutput) -> Result<BoxList, BoxListError> {
        from_model_output(output, &self.config)
    }

    /// Runs the detector.
    ///
    /// With `targets`, the detector runs in training mode and the returned
    /// loss map gains a [`TOTAL_LOSS`] entry holding the sum of all terms.
    /// Without, it runs in inference mode and each output is converted to a
    /// box list. Scores are not thresholded here.
    pub fn forward(
        &mut self,
        batch: &D::Batch,
        targets: Option<&[BoxList]>,
    ) -> Result<Forward, BoxListError> {
        match targets {
            Some(targets) => {
                let targets = targets
                    .iter()
                    .map(|t| self.to_model_input(t))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut losses = self
                    .detector
                    .losses(batch, &targets)
                    .map_err(|e| BoxListError::Detector(Box::new(e)))?;
                let total: f64 = losses.values().sum();
                debug!("detector returned {} loss terms, total {}", losses.len(), total);
                losses.insert(TOTAL_LOSS.to_string(), total);
                Ok(Forward::Losses(losses))
            }
            None => {
                let outputs = self
                    .detector
                    .infer(batch)
                    .map_err(|e| BoxListError::Detector(Box::new(e)))?;
                let lists = outputs
                    .iter()
                    .map(|out| self.from_model_output(out))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Forward::Detections(lists))
            }
        }
    }
}
