//! Box coordinate conventions and conversions between them.
//!
//! Every [`BoxList`](super::BoxList) stores its boxes as
//! `(y_min, x_min, y_max, x_max)` ([`BoxFormat::Yxyx`]). The other formats
//! only appear at construction time or on explicit export.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BoxListError;

/// Four box coordinates, interpreted according to a [`BoxFormat`].
pub type Box4 = [f64; 4];

/// A bounding box coordinate convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxFormat {
    /// `(x_min, y_min, x_max, y_max)`
    Xyxy,
    /// `(y_min, x_min, y_max, x_max)`, the canonical storage format.
    Yxyx,
    /// `(x_min, y_min, width, height)`, as used by COCO annotations.
    Xywh,
    /// `(center_x, center_y, width, height)`
    Cxcywh,
}

impl BoxFormat {
    /// The format boxes are stored in internally.
    pub const CANONICAL: BoxFormat = BoxFormat::Yxyx;

    /// All supported formats.
    pub const ALL: [BoxFormat; 4] = [
        BoxFormat::Xyxy,
        BoxFormat::Yxyx,
        BoxFormat::Xywh,
        BoxFormat::Cxcywh,
    ];

    /// Returns the short tag used in files and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            BoxFormat::Xyxy => "xyxy",
            BoxFormat::Yxyx => "yxyx",
            BoxFormat::Xywh => "xywh",
            BoxFormat::Cxcywh => "cxcywh",
        }
    }
}

impl fmt::Display for BoxFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoxFormat {
    type Err = BoxListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xyxy" => Ok(BoxFormat::Xyxy),
            "yxyx" => Ok(BoxFormat::Yxyx),
            "xywh" => Ok(BoxFormat::Xywh),
            "cxcywh" => Ok(BoxFormat::Cxcywh),
            _ => Err(BoxListError::UnsupportedFormat(format!(
                "'{}' (supported: xyxy, yxyx, xywh, cxcywh)",
                s
            ))),
        }
    }
}

fn to_xyxy(b: Box4, format: BoxFormat) -> Box4 {
    match format {
        BoxFormat::Xyxy => b,
        BoxFormat::Yxyx => [b[1], b[0], b[3], b[2]],
        BoxFormat::Xywh => [b[0], b[1], b[0] + b[2], b[1] + b[3]],
        BoxFormat::Cxcywh => {
            let [cx, cy, w, h] = b;
            [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0]
        }
    }
}

fn from_xyxy(b: Box4, format: BoxFormat) -> Box4 {
    let [x0, y0, x1, y1] = b;
    match format {
        BoxFormat::Xyxy => b,
        BoxFormat::Yxyx => [y0, x0, y1, x1],
        BoxFormat::Xywh => [x0, y0, x1 - x0, y1 - y0],
        BoxFormat::Cxcywh => [(x0 + x1) / 2.0, (y0 + y1) / 2.0, x1 - x0, y1 - y0],
    }
}

/// Converts a single box between formats.
#[inline]
pub fn convert_box(b: Box4, from: BoxFormat, to: BoxFormat) -> Box4 {
    if from == to {
        return b;
    }
    from_xyxy(to_xyxy(b, from), to)
}

/// Converts a slice of boxes between formats, returning a new vector.
///
/// Returns an unchanged copy when `from == to`.
pub fn convert(boxes: &[Box4], from: BoxFormat, to: BoxFormat) -> Vec<Box4> {
    boxes.iter().map(|&b| convert_box(b, from, to)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_formats() {
        assert_eq!("xyxy".parse::<BoxFormat>().unwrap(), BoxFormat::Xyxy);
        assert_eq!("YXYX".parse::<BoxFormat>().unwrap(), BoxFormat::Yxyx);
        assert_eq!("xywh".parse::<BoxFormat>().unwrap(), BoxFormat::Xywh);
        assert_eq!("cxcywh".parse::<BoxFormat>().unwrap(), BoxFormat::Cxcywh);
    }

    #[test]
    fn test_parse_unknown_format_fails() {
        let err = "xyz".parse::<BoxFormat>().unwrap_err();
        assert!(matches!(err, BoxListError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_xywh_to_canonical() {
        // COCO [10, 20, 90, 60] -> ymin=20, xmin=10, ymax=80, xmax=100
        let out = convert_box([10.0, 20.0, 90.0, 60.0], BoxFormat::Xywh, BoxFormat::Yxyx);
        assert_eq!(out, [20.0, 10.0, 80.0, 100.0]);
    }

    #[test]
    fn test_cxcywh_to_xyxy() {
        let out = convert_box([50.0, 40.0, 20.0, 10.0], BoxFormat::Cxcywh, BoxFormat::Xyxy);
        assert_eq!(out, [40.0, 35.0, 60.0, 45.0]);
    }

    #[test]
    fn test_same_format_is_noop() {
        let boxes = vec![[1.5, 2.5, 3.5, 4.5], [0.0, -1.0, 7.0, 9.0]];
        for format in BoxFormat::ALL {
            assert_eq!(convert(&boxes, format, format), boxes);
        }
    }

    #[test]
    fn test_serde_uses_lowercase_tags() {
        let json = serde_json::to_string(&BoxFormat::Cxcywh).unwrap();
        assert_eq!(json, "\"cxcywh\"");
        let parsed: BoxFormat = serde_json::from_str("\"xywh\"").unwrap();
        assert_eq!(parsed, BoxFormat::Xywh);
    }
}
