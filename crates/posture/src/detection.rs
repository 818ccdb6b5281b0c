//! Detection types produced by frame classifiers

use serde::{Deserialize, Serialize};

/// Axis-aligned box in integer pixel coordinates.
///
/// Classifiers should produce `x2 >= x1` and `y2 >= y1`, but nothing here
/// relies on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Signed width, widened so extreme coordinates cannot overflow
    pub fn width(&self) -> i64 {
        i64::from(self.x2) - i64::from(self.x1)
    }

    /// Signed height, widened so extreme coordinates cannot overflow
    pub fn height(&self) -> i64 {
        i64::from(self.y2) - i64::from(self.y1)
    }
}

/// One labeled, scored object found in a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Bounding box
    #[serde(flatten)]
    pub bbox: BoundingBox,

    /// Class label, e.g. "person"
    pub label: String,

    /// Confidence on a 0-100 scale
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: BoundingBox, label: impl Into<String>, confidence: f32) -> Self {
        Self {
            bbox,
            label: label.into(),
            confidence,
        }
    }
}
