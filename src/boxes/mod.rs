//! Bounding-box collections and the geometry they are built on.
//!
//! A [`BoxList`] holds `n` boxes in a single canonical coordinate order,
//! `(y_min, x_min, y_max, x_max)`, together with any number of named
//! per-box columns ("extras") such as `class_ids` and `scores`.
//!
//! # Design Principles
//!
//! 1. **Canonical Storage**: boxes are converted once at construction, and
//!    only converted again on explicit export via
//!    [`BoxList::convert_boxes`].
//!
//! 2. **Aligned Columns**: every extra has exactly one entry per box. This
//!    is checked whenever a list is built, and every gather/filter applies
//!    the same indices to the boxes and to all extras.
//!
//! 3. **Value Semantics**: transforms return new lists. Empty lists are
//!    valid inputs and outputs everywhere.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use boxlist::boxes::{BoxFormat, BoxList, Field};
//!
//! let list = BoxList::new(
//!     vec![[0.0, 0.0, 10.0, 10.0], [1.0, 1.0, 9.0, 9.0]],
//!     BoxFormat::Xyxy,
//!     BTreeMap::from([
//!         ("class_ids".to_string(), Field::from(vec![0i64, 0])),
//!         ("scores".to_string(), Field::from(vec![0.9, 0.8])),
//!     ]),
//! )?;
//!
//! let kept = list.suppress(0.5)?;
//! assert_eq!(kept.len(), 1);
//! # Ok::<(), boxlist::BoxListError>(())
//! ```

mod collection;
mod field;
pub mod format;
pub mod geometry;
mod residency;

pub use collection::{
    BoxList, FieldRef, BOXES, CLASS_IDS, DEFAULT_SCORE_THRESHOLD, SCORES,
};
pub use field::Field;
pub use format::{convert, Box4, BoxFormat};
pub use geometry::{clip, iou};
pub use residency::Residency;
