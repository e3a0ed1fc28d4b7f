//! The [`BoxList`] collection and its transforms.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use super::field::Field;
use super::format::{self, Box4, BoxFormat};
use super::geometry;
use super::residency::Residency;
use crate::error::BoxListError;

/// Name under which [`BoxList::get`] exposes the canonical boxes.
pub const BOXES: &str = "boxes";
/// Conventional name of the 0-indexed class id column.
pub const CLASS_IDS: &str = "class_ids";
/// Conventional name of the confidence score column.
pub const SCORES: &str = "scores";

/// Default threshold for [`BoxList::score_filter`].
pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.25;

/// A borrowed view of one named column of a [`BoxList`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldRef<'a> {
    Boxes(&'a [Box4]),
    Extra(&'a Field),
}

impl FieldRef<'_> {
    pub fn len(&self) -> usize {
        match self {
            FieldRef::Boxes(b) => b.len(),
            FieldRef::Extra(f) => f.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A list of `n` bounding boxes plus named per-box attributes.
///
/// Boxes are always stored as `(y_min, x_min, y_max, x_max)`. Every extra
/// column has exactly `n` entries, and every operation that reorders or
/// filters the boxes applies the same index operation to all extras.
///
/// Transforms return a new `BoxList`; the only in-place operation is
/// [`pin`](BoxList::pin), which changes a placement hint and nothing else.
#[derive(Clone, Debug, Default)]
pub struct BoxList {
    boxes: Vec<Box4>,
    extras: BTreeMap<String, Field>,
    residency: Residency,
}

impl BoxList {
    /// Creates a box list from boxes in `format` and a set of extras.
    ///
    /// # Errors
    /// Returns [`BoxListError::ShapeMismatch`] if any extra does not have one
    /// entry per box.
    pub fn new(
        boxes: Vec<Box4>,
        format: BoxFormat,
        extras: BTreeMap<String, Field>,
    ) -> Result<Self, BoxListError> {
        let n = boxes.len();
        for (name, field) in &extras {
            check_len(name, field, n)?;
        }

        let boxes = if format == BoxFormat::CANONICAL {
            boxes
        } else {
            format::convert(&boxes, format, BoxFormat::CANONICAL)
        };

        Ok(Self {
            boxes,
            extras,
            residency: Residency::Host,
        })
    }

    /// Creates a box list with no extras.
    pub fn from_boxes(boxes: Vec<Box4>, format: BoxFormat) -> Self {
        Self {
            boxes: format::convert(&boxes, format, BoxFormat::CANONICAL),
            extras: BTreeMap::new(),
            residency: Residency::Host,
        }
    }

    /// Creates an empty box list with no extras.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds (or replaces) an extra column.
    ///
    /// # Errors
    /// Returns [`BoxListError::ShapeMismatch`] if the column length differs
    /// from the number of boxes.
    pub fn with_field(
        mut self,
        name: impl Into<String>,
        field: impl Into<Field>,
    ) -> Result<Self, BoxListError> {
        let name = name.into();
        let field = field.into();
        check_len(&name, &field, self.boxes.len())?;
        self.extras.insert(name, field);
        Ok(self)
    }

    /// Number of boxes.
    #[inline]
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// The canonical `(y_min, x_min, y_max, x_max)` boxes.
    #[inline]
    pub fn boxes(&self) -> &[Box4] {
        &self.boxes
    }

    /// All extra columns, keyed by name.
    #[inline]
    pub fn extras(&self) -> &BTreeMap<String, Field> {
        &self.extras
    }

    /// Names of the extra columns in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.extras.keys().map(String::as_str)
    }

    /// Looks up a column by name. `"boxes"` always refers to the boxes.
    pub fn get(&self, name: &str) -> Option<FieldRef<'_>> {
        if name == BOXES {
            Some(FieldRef::Boxes(&self.boxes))
        } else {
            self.extras.get(name).map(FieldRef::Extra)
        }
    }

    /// Looks up an extra column by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.extras.get(name)
    }

    /// Returns true for `"boxes"` and for any extra present in the list.
    pub fn contains(&self, name: &str) -> bool {
        name == BOXES || self.extras.contains_key(name)
    }

    /// Returns an integer extra column.
    ///
    /// # Errors
    /// [`BoxListError::MissingField`] if absent, [`BoxListError::FieldType`]
    /// if the column does not hold integers.
    pub fn ints(&self, name: &str) -> Result<&[i64], BoxListError> {
        let field = self.require(name)?;
        field.as_ints().ok_or_else(|| BoxListError::FieldType {
            name: name.to_string(),
            expected: "int",
            found: field.kind(),
        })
    }

    /// Returns a float extra column.
    ///
    /// # Errors
    /// [`BoxListError::MissingField`] if absent, [`BoxListError::FieldType`]
    /// if the column does not hold floats.
    pub fn floats(&self, name: &str) -> Result<&[f64], BoxListError> {
        let field = self.require(name)?;
        field.as_floats().ok_or_else(|| BoxListError::FieldType {
            name: name.to_string(),
            expected: "float",
            found: field.kind(),
        })
    }

    fn require(&self, name: &str) -> Result<&Field, BoxListError> {
        self.extras
            .get(name)
            .ok_or_else(|| BoxListError::MissingField(name.to_string()))
    }

    /// Gathers the boxes and every extra at `indices`.
    ///
    /// Indices may repeat and appear in any order; the result has
    /// `indices.len()` entries.
    ///
    /// # Errors
    /// Returns [`BoxListError::IndexOutOfBounds`] for an index `>= len()`.
    pub fn index_filter(&self, indices: &[usize]) -> Result<Self, BoxListError> {
        let len = self.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(BoxListError::IndexOutOfBounds { index, len });
        }

        Ok(Self {
            boxes: indices.iter().map(|&i| self.boxes[i]).collect(),
            extras: self
                .extras
                .iter()
                .map(|(name, field)| (name.clone(), field.gather(indices)))
                .collect(),
            residency: self.residency,
        })
    }

    /// Keeps only the boxes whose `"scores"` entry is strictly greater than
    /// `threshold`.
    ///
    /// # Errors
    /// Returns [`BoxListError::MissingField`] if there is no `"scores"` column.
    pub fn score_filter(&self, threshold: f64) -> Result<Self, BoxListError> {
        let scores = self.floats(SCORES)?;
        let keep: Vec<usize> = scores
            .iter()
            .enumerate()
            .filter(|&(_, &s)| s > threshold)
            .map(|(i, _)| i)
            .collect();
        debug!(
            "score_filter: kept {} of {} boxes above {}",
            keep.len(),
            self.len(),
            threshold
        );
        self.index_filter(&keep)
    }

    /// Clamps every box into a `height` x `width` image.
    ///
    /// # Errors
    /// Returns [`BoxListError::InvalidImageSize`] if either dimension is
    /// negative or NaN.
    pub fn clip_to_image(&self, height: f64, width: f64) -> Result<Self, BoxListError> {
        if !(height >= 0.0 && width >= 0.0) {
            return Err(BoxListError::InvalidImageSize { height, width });
        }
        Ok(self.map_boxes(|b| geometry::clip(b, height, width)))
    }

    /// Multiplies `(y_min, x_min, y_max, x_max)` by
    /// `(y_scale, x_scale, y_scale, x_scale)`.
    pub fn scale(&self, y_scale: f64, x_scale: f64) -> Self {
        self.map_boxes(|b| [b[0] * y_scale, b[1] * x_scale, b[2] * y_scale, b[3] * x_scale])
    }

    /// Maps boxes from the `[-1, 1]` normalized range into pixel space of a
    /// `height` x `width` image.
    pub fn to_pixel(&self, height: f64, width: f64) -> Self {
        self.map_boxes(|b| {
            let f = |v: f64, extent: f64| (v + 1.0) / 2.0 * extent;
            [
                f(b[0], height),
                f(b[1], width),
                f(b[2], height),
                f(b[3], width),
            ]
        })
    }

    fn map_boxes(&self, f: impl Fn(&Box4) -> Box4) -> Self {
        Self {
            boxes: self.boxes.iter().map(f).collect(),
            extras: self.extras.clone(),
            residency: self.residency,
        }
    }

    /// Exports the boxes in `format`. The stored boxes are not modified.
    pub fn convert_boxes(&self, format: BoxFormat) -> Vec<Box4> {
        format::convert(&self.boxes, BoxFormat::CANONICAL, format)
    }

    /// Runs per-class greedy non-maximum suppression.
    ///
    /// See [`crate::nms::batched_nms`] for the algorithm. An empty list is
    /// returned unchanged.
    ///
    /// # Errors
    /// Requires `"class_ids"` (int) and `"scores"` (float) columns and an
    /// `iou_threshold` in `(0, 1]`.
    pub fn suppress(&self, iou_threshold: f64) -> Result<Self, BoxListError> {
        crate::nms::suppress(self, iou_threshold)
    }

    /// Concatenates box lists in order.
    ///
    /// # Errors
    /// Returns [`BoxListError::KeySetMismatch`] if the inputs do not all have
    /// the same extra names, or [`BoxListError::FieldType`] if a column
    /// changes kind between inputs.
    pub fn concat<'a, I>(lists: I) -> Result<Self, BoxListError>
    where
        I: IntoIterator<Item = &'a BoxList>,
    {
        let mut iter = lists.into_iter();
        let Some(first) = iter.next() else {
            return Ok(Self::empty());
        };

        let mut out = Self {
            boxes: first.boxes.clone(),
            extras: first.extras.clone(),
            residency: Residency::Host,
        };

        for list in iter {
            if !list.extras.keys().eq(out.extras.keys()) {
                return Err(BoxListError::KeySetMismatch {
                    left: out.extras.keys().cloned().collect(),
                    right: list.extras.keys().cloned().collect(),
                });
            }
            out.boxes.extend_from_slice(&list.boxes);
            for (name, field) in out.extras.iter_mut() {
                // Key sets were checked equal above.
                if let Some(other) = list.extras.get(name) {
                    field.append(name, other)?;
                }
            }
        }

        Ok(out)
    }

    /// Order-independent equality.
    ///
    /// Two lists are equal when they have the same length, the same extra
    /// names, and the same set of rows, where a row is the box coordinates
    /// followed by each extra's value(s) in key order. Values are compared
    /// exactly (`-0.0` equals `0.0`); quantize first if a tolerance is
    /// needed.
    pub fn equals(&self, other: &BoxList) -> bool {
        if self.len() != other.len() {
            return false;
        }
        if !self.extras.keys().eq(other.extras.keys()) {
            return false;
        }
        self.row_set() == other.row_set()
    }

    fn row_set(&self) -> BTreeSet<Vec<u64>> {
        let mut row = Vec::new();
        (0..self.len())
            .map(|i| {
                row.clear();
                row.extend_from_slice(&self.boxes[i]);
                for field in self.extras.values() {
                    field.extend_row(i, &mut row);
                }
                row.iter().map(|&v| exact_bits(v)).collect()
            })
            .collect()
    }

    /// Current placement hint.
    #[inline]
    pub fn residency(&self) -> Residency {
        self.residency
    }

    /// Moves the list to `target`, returning the new handle.
    pub fn to_residency(mut self, target: Residency) -> Self {
        if self.residency != target {
            debug!("moving box list from {} to {}", self.residency, target);
        }
        self.residency = target;
        self
    }

    /// Marks the list as page-locked in place.
    pub fn pin(&mut self) -> &mut Self {
        self.residency = Residency::Pinned;
        self
    }
}

impl PartialEq for BoxList {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

fn check_len(name: &str, field: &Field, expected: usize) -> Result<(), BoxListError> {
    if field.len() != expected {
        return Err(BoxListError::ShapeMismatch {
            name: name.to_string(),
            expected,
            actual: field.len(),
        });
    }
    Ok(())
}

#[inline]
fn exact_bits(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else {
        v.to_bits()
    }
}
