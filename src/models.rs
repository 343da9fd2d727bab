use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Axis-aligned bounding box in image pixel coordinates, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Long side over short side. 1.0 for a square box.
    pub fn skew(&self) -> f32 {
        let w = self.width() as f32;
        let h = self.height() as f32;
        (w / h).max(h / w)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width() as f32 / self.height() as f32
    }

    pub fn center(&self) -> (u32, u32) {
        ((self.min_x + self.max_x) / 2, (self.min_y + self.max_y) / 2)
    }

    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// A detected hold-candidate region. Produced only by the contour detector
/// and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contour {
    /// Boundary pixels of the region (unordered, one entry per edge pixel).
    pub boundary: Vec<(u32, u32)>,
    pub bbox: BoundingBox,
    /// Enclosed area in pixels.
    pub area_px: u32,
    /// Mean RGB color sampled over the region in the source image.
    pub mean_color: [u8; 3],
}

impl Contour {
    pub fn center(&self) -> (u32, u32) {
        self.bbox.center()
    }
}

/// Closed set of hold tape colors. A hold is always tagged with exactly one
/// of these; samples too far from every palette entry are rejected instead
/// of being force-fitted to the nearest class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorClass {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Black,
    White,
}

impl std::fmt::Display for ColorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColorClass::Red => "red",
            ColorClass::Orange => "orange",
            ColorClass::Yellow => "yellow",
            ColorClass::Green => "green",
            ColorClass::Blue => "blue",
            ColorClass::Purple => "purple",
            ColorClass::Black => "black",
            ColorClass::White => "white",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoldType {
    Handhold,
    Foothold,
}

/// A graded contour. `score` is an ease score in [0, 1]: the lowest-scoring
/// hold on a route is its limiting hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hold {
    pub bbox: BoundingBox,
    pub area_px: u32,
    pub color: ColorClass,
    pub hold_type: HoldType,
    pub score: f32,
    /// Enclosed area over convex hull area, in (0, 1].
    pub convexity: f32,
    /// Major-axis angle measured from vertical, degrees in [0, 90].
    pub axis_angle_deg: f32,
    pub circularity: f32,
    pub aspect_ratio: f32,
}

impl Hold {
    pub fn center(&self) -> (u32, u32) {
        self.bbox.center()
    }
}

/// Aggregate result for the holds of one color class on one image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grade {
    pub color: ColorClass,
    /// Ordinal difficulty bucket label, e.g. "V3".
    pub bucket: String,
    /// Continuous difficulty in [0, 1] the bucket was derived from.
    pub difficulty: f32,
    /// Confidence in [0, 1]; low when hold scores disagree strongly.
    pub confidence: f32,
}

/// Persisted outcome of one successful processing request. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    /// Unix milliseconds at creation.
    pub timestamp_ms: i64,
    /// Object key of the source image.
    pub object_key: String,
    pub grades: Vec<Grade>,
    /// Full hold list kept for audit.
    pub holds: Vec<Hold>,
}

impl HistoryRecord {
    pub fn new(object_key: &str, grades: Vec<Grade>, holds: Vec<Hold>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp_ms: now_ms(),
            object_key: object_key.to_string(),
            grades,
            holds,
        }
    }
}

pub fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
