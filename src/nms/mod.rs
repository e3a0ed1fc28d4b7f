//! Per-class greedy non-maximum suppression.
//!
//! Boxes only compete with boxes of the same class. Within a class, boxes
//! are visited from highest to lowest score (ties broken by original index)
//! and each accepted box suppresses every later box whose IoU with it is
//! strictly greater than the threshold.
//!
//! The surviving indices are emitted class by class, in ascending class id
//! order, and within a class in the order they were accepted. The cost is
//! quadratic in the size of each class, which is fine for per-image box
//! counts.

use std::collections::BTreeMap;

use log::debug;

use crate::boxes::{iou, Box4, BoxList, CLASS_IDS, SCORES};
use crate::error::BoxListError;

/// Default IoU threshold for [`suppress`].
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.5;

/// Runs class-aware NMS over parallel arrays and returns the kept indices.
///
/// # Errors
/// Returns [`BoxListError::InvalidThreshold`] unless
/// `0 < iou_threshold <= 1`, and [`BoxListError::ShapeMismatch`] if `scores`
/// or `class_ids` do not have one entry per box.
pub fn batched_nms(
    boxes: &[Box4],
    scores: &[f64],
    class_ids: &[i64],
    iou_threshold: f64,
) -> Result<Vec<usize>, BoxListError> {
    if !(iou_threshold > 0.0 && iou_threshold <= 1.0) {
        return Err(BoxListError::InvalidThreshold(iou_threshold));
    }
    for (name, len) in [(SCORES, scores.len()), (CLASS_IDS, class_ids.len())] {
        if len != boxes.len() {
            return Err(BoxListError::ShapeMismatch {
                name: name.to_string(),
                expected: boxes.len(),
                actual: len,
            });
        }
    }

    let mut partitions: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &class_id) in class_ids.iter().enumerate() {
        partitions.entry(class_id).or_default().push(i);
    }

    let mut keep = Vec::with_capacity(boxes.len());
    for mut order in partitions.into_values() {
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
        greedy_suppress(boxes, &order, iou_threshold, &mut keep);
    }

    Ok(keep)
}

/// Walks `order` (already sorted by descending score) and pushes every
/// accepted index onto `keep`.
fn greedy_suppress(boxes: &[Box4], order: &[usize], iou_threshold: f64, keep: &mut Vec<usize>) {
    let mut suppressed = vec![false; order.len()];
    for pos in 0..order.len() {
        if suppressed[pos] {
            continue;
        }
        let current = &boxes[order[pos]];
        keep.push(order[pos]);

        for later in (pos + 1)..order.len() {
            if !suppressed[later] && iou(current, &boxes[order[later]]) > iou_threshold {
                suppressed[later] = true;
            }
        }
    }
}

/// Runs [`batched_nms`] on a box list and gathers the survivors.
///
/// An empty list is returned unchanged, whatever its columns.
///
/// # Errors
/// Returns [`BoxListError::MissingField`] if `class_ids` or `scores` is
/// absent, plus any error from [`batched_nms`].
pub fn suppress(list: &BoxList, iou_threshold: f64) -> Result<BoxList, BoxListError> {
    if list.is_empty() {
        return Ok(list.clone());
    }

    let keep = batched_nms(
        list.boxes(),
        list.floats(SCORES)?,
        list.ints(CLASS_IDS)?,
        iou_threshold,
    )?;
    debug!(
        "nms: kept {} of {} boxes at iou_threshold={}",
        keep.len(),
        list.len(),
        iou_threshold
    );
    list.index_filter(&keep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boxes::BoxFormat;

    fn list(boxes: Vec<Box4>, class_ids: Vec<i64>, scores: Vec<f64>) -> BoxList {
        BoxList::from_boxes(boxes, BoxFormat::Yxyx)
            .with_field(CLASS_IDS, class_ids)
            .unwrap()
            .with_field(SCORES, scores)
            .unwrap()
    }

    #[test]
    fn test_contained_box_is_suppressed() {
        let boxes = [[0.0, 0.0, 10.0, 10.0], [1.0, 1.0, 9.0, 9.0]];
        let keep = batched_nms(&boxes, &[0.9, 0.8], &[0, 0], 0.5).unwrap();
        assert_eq!(keep, vec![0]);
    }

    #[test]
    fn test_higher_score_wins_regardless_of_position() {
        let boxes = [[0.0, 0.0, 10.0, 10.0], [1.0, 1.0, 9.0, 9.0]];
        let keep = batched_nms(&boxes, &[0.2, 0.8], &[0, 0], 0.5).unwrap();
        assert_eq!(keep, vec![1]);
    }

    #[test]
    fn test_classes_do_not_suppress_each_other() {
        let boxes = [[0.0, 0.0, 10.0, 10.0], [0.0, 0.0, 10.0, 10.0]];
        let keep = batched_nms(&boxes, &[0.9, 0.8], &[3, 1], 0.5).unwrap();
        // class 1 partition first, then class 3
        assert_eq!(keep, vec![1, 0]);
    }

    #[test]
    fn test_ties_broken_by_index() {
        let boxes = [[0.0, 0.0, 10.0, 10.0]; 3];
        let keep = batched_nms(&boxes, &[0.5, 0.5, 0.5], &[0, 0, 0], 0.5).unwrap();
        assert_eq!(keep, vec![0]);
    }

    #[test]
    fn test_iou_equal_to_threshold_is_kept() {
        // IoU is exactly 0.2
        let boxes = [[0.0, 0.0, 10.0, 10.0], [4.0, 0.0, 6.0, 10.0]];
        let keep = batched_nms(&boxes, &[0.9, 0.8], &[0, 0], 0.2).unwrap();
        assert_eq!(keep, vec![0, 1]);
    }

    #[test]
    fn test_suppressed_box_does_not_suppress_others() {
        // B overlaps both A and C heavily, A and C are disjoint.
        let boxes = [
            [0.0, 0.0, 10.0, 10.0],
            [0.0, 5.0, 10.0, 15.0],
            [0.0, 10.0, 10.0, 20.0],
        ];
        let keep = batched_nms(&boxes, &[0.9, 0.8, 0.7], &[0, 0, 0], 0.3).unwrap();
        assert_eq!(keep, vec![0, 2]);
    }

    #[test]
    fn test_greedy_order_can_keep_more_at_lower_threshold() {
        // At 0.1 the wide box B is removed by A, so C and D survive.
        // At 0.2 B survives and removes both C and D.
        let boxes = [
            [4.0, 0.0, 6.0, 10.0],
            [0.0, 0.0, 10.0, 10.0],
            [0.0, 0.0, 3.0, 10.0],
            [7.0, 0.0, 10.0, 10.0],
        ];
        let scores = [0.9, 0.8, 0.7, 0.6];
        let classes = [0, 0, 0, 0];
        assert_eq!(
            batched_nms(&boxes, &scores, &classes, 0.1).unwrap(),
            vec![0, 2, 3]
        );
        assert_eq!(
            batched_nms(&boxes, &scores, &classes, 0.2).unwrap(),
            vec![0, 1]
        );
    }

    #[test]
    fn test_invalid_threshold() {
        let boxes = [[0.0, 0.0, 1.0, 1.0]];
        for t in [0.0, -0.5, 1.5, f64::NAN] {
            let err = batched_nms(&boxes, &[0.5], &[0], t).unwrap_err();
            assert!(matches!(err, BoxListError::InvalidThreshold(_)));
        }
        assert!(batched_nms(&boxes, &[0.5], &[0], 1.0).is_ok());
    }

    #[test]
    fn test_length_mismatch() {
        let boxes = [[0.0, 0.0, 1.0, 1.0]; 2];
        let err = batched_nms(&boxes, &[0.5], &[0, 0], 0.5).unwrap_err();
        assert!(matches!(err, BoxListError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_suppress_list_keeps_extras_aligned() {
        let input = list(
            vec![[0.0, 0.0, 10.0, 10.0], [1.0, 1.0, 9.0, 9.0], [50.0, 50.0, 60.0, 60.0]],
            vec![0, 0, 0],
            vec![0.9, 0.8, 0.7],
        );
        let out = input.suppress(DEFAULT_IOU_THRESHOLD).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.floats(SCORES).unwrap(), &[0.9, 0.7]);
        assert_eq!(out.boxes()[1], [50.0, 50.0, 60.0, 60.0]);
    }

    #[test]
    fn test_suppress_empty_list_is_unchanged() {
        let empty = BoxList::empty();
        let out = suppress(&empty, 0.5).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_suppress_requires_scores() {
        let input = BoxList::from_boxes(vec![[0.0, 0.0, 1.0, 1.0]], BoxFormat::Yxyx)
            .with_field(CLASS_IDS, vec![0i64])
            .unwrap();
        let err = suppress(&input, 0.5).unwrap_err();
        assert!(matches!(err, BoxListError::MissingField(name) if name == "scores"));
    }
}
