#![allow(dead_code)]

use boxlist::boxes::{Box4, BoxFormat, BoxList, CLASS_IDS, SCORES};
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub const EPS_CONVERT: f64 = 1e-9;

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// A well-formed canonical box on a quarter-pixel grid, so that format
/// conversions stay exact in binary floating point.
pub fn arb_box() -> BoxedStrategy<Box4> {
    (0u32..2000, 0u32..2000, 1u32..800, 1u32..800)
        .prop_map(|(y, x, h, w)| box_from_seed(y, x, h, w))
        .boxed()
}

/// A box anywhere in a small area, so that overlaps are common.
pub fn arb_crowded_box() -> BoxedStrategy<Box4> {
    (0u32..80, 0u32..80, 4u32..60, 4u32..60)
        .prop_map(|(y, x, h, w)| box_from_seed(y, x, h, w))
        .boxed()
}

pub fn arb_format() -> BoxedStrategy<BoxFormat> {
    prop::sample::select(BoxFormat::ALL.to_vec()).boxed()
}

/// Thresholds in (0, 1].
pub fn arb_iou_threshold() -> BoxedStrategy<f64> {
    (1u32..=100).prop_map(|t| t as f64 / 100.0).boxed()
}

/// A list with `class_ids` in `0..num_classes` and scores in `[0, 1]`.
pub fn arb_scored_list(max_boxes: usize, num_classes: i64) -> BoxedStrategy<BoxList> {
    assert!(num_classes > 0, "num_classes must be > 0");

    proptest::collection::vec(
        (arb_crowded_box(), 0..num_classes, 0u16..=1000u16),
        0..=max_boxes,
    )
    .prop_map(|rows| {
        let mut boxes = Vec::with_capacity(rows.len());
        let mut class_ids = Vec::with_capacity(rows.len());
        let mut scores = Vec::with_capacity(rows.len());
        for (b, class_id, raw_score) in rows {
            boxes.push(b);
            class_ids.push(class_id);
            scores.push(raw_score as f64 / 1000.0);
        }
        scored_list(boxes, class_ids, scores)
    })
    .boxed()
}

/// A list where every class has at most two boxes.
pub fn arb_paired_list(max_pairs: usize) -> BoxedStrategy<BoxList> {
    proptest::collection::vec(
        (arb_crowded_box(), arb_crowded_box(), 0u16..=1000u16, 0u16..=1000u16),
        0..=max_pairs,
    )
    .prop_map(|pairs| {
        let mut boxes = Vec::new();
        let mut class_ids = Vec::new();
        let mut scores = Vec::new();
        for (class_id, (a, b, sa, sb)) in (0i64..).zip(pairs) {
            boxes.extend([a, b]);
            class_ids.extend([class_id, class_id]);
            scores.extend([sa as f64 / 1000.0, sb as f64 / 1000.0]);
        }
        scored_list(boxes, class_ids, scores)
    })
    .boxed()
}

pub fn scored_list(boxes: Vec<Box4>, class_ids: Vec<i64>, scores: Vec<f64>) -> BoxList {
    BoxList::from_boxes(boxes, BoxFormat::Yxyx)
        .with_field(CLASS_IDS, class_ids)
        .expect("class_ids aligned with boxes")
        .with_field(SCORES, scores)
        .expect("scores aligned with boxes")
}

pub fn assert_boxes_close(left: &[Box4], right: &[Box4], eps: f64) -> Result<(), String> {
    if left.len() != right.len() {
        return Err(format!(
            "box count mismatch: left={} right={}",
            left.len(),
            right.len()
        ));
    }
    for (idx, (a, b)) in left.iter().zip(right).enumerate() {
        if a.iter().zip(b).any(|(x, y)| (x - y).abs() > eps) {
            return Err(format!("box {idx} differs: {a:?} vs {b:?} (eps={eps})"));
        }
    }
    Ok(())
}

/// Checks that every extra column has one entry per box.
pub fn assert_aligned(list: &BoxList) -> Result<(), String> {
    for (name, field) in list.extras() {
        if field.len() != list.len() {
            return Err(format!(
                "field '{}' has {} entries for {} boxes",
                name,
                field.len(),
                list.len()
            ));
        }
    }
    Ok(())
}

fn box_from_seed(y: u32, x: u32, h: u32, w: u32) -> Box4 {
    let q = |v: u32| v as f64 / 4.0;
    [q(y), q(x), q(y + h), q(x + w)]
}
