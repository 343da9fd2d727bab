use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::models::ColorClass;

/// Everything the grading core is parameterized by. Constructed once and
/// passed to the components explicitly; nothing reads the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraderConfig {
    /// Root directory of the filesystem image store.
    pub image_dir: PathBuf,
    /// Path of the sqlite history database.
    pub history_db: PathBuf,
    /// Seconds an issued upload slot stays redeemable.
    pub upload_slot_ttl_secs: u64,
    pub detection: DetectionConfig,
    pub scoring: ScoringConfig,
    pub timeouts: TimeoutConfig,
    /// Reference color per class; nearest match wins, within the cutoff.
    pub palette: Vec<PaletteEntry>,
    /// Ordered difficulty buckets, ascending upper bounds over [0, 1].
    pub buckets: Vec<GradeBucket>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub blur_sigma: f32,
    /// Regions smaller than this many pixels are rejected as noise.
    pub min_area_px: u32,
    /// Regions whose bounding box is longer than this ratio are rejected.
    pub max_aspect_skew: f32,
    /// Regions covering more than this fraction of the image are rejected
    /// as background rather than reported as holds.
    pub max_area_frac: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.2,
            min_area_px: 50,
            max_aspect_skew: 4.0,
            max_area_frac: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Hold score weights; easier attributes push the score toward 1.
    pub convexity_weight: f32,
    pub area_weight: f32,
    pub angle_weight: f32,
    /// Bounding-box pixel areas mapped linearly onto [0, 1] for the size term.
    pub area_range_px: (f32, f32),
    /// Below this area a region votes toward being a foothold.
    pub foothold_area_px: f32,
    /// RGB distance below which a palette match is accepted (exclusive).
    pub color_cutoff: f32,
    /// Route aggregation: weight of the hold-count term (fewer = harder).
    pub count_weight: f32,
    /// Route aggregation: weight of the vertical-span term (taller = harder).
    pub span_weight: f32,
    /// Vertical span in pixels that counts as a full-height route.
    pub span_reference_px: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            convexity_weight: 0.4,
            area_weight: 0.35,
            angle_weight: 0.25,
            area_range_px: (50.0, 20_000.0),
            foothold_area_px: 600.0,
            color_cutoff: 90.0,
            count_weight: 0.08,
            span_weight: 0.12,
            span_reference_px: 2_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub fetch_ms: u64,
    pub store_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            fetch_ms: 5_000,
            store_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaletteEntry {
    pub class: ColorClass,
    pub rgb: [u8; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeBucket {
    /// Upper bound of the bucket, exclusive except for the final bucket.
    pub upper: f32,
    pub label: String,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            image_dir: PathBuf::from("data/images"),
            history_db: PathBuf::from("data/history.db"),
            upload_slot_ttl_secs: 300,
            detection: DetectionConfig::default(),
            scoring: ScoringConfig::default(),
            timeouts: TimeoutConfig::default(),
            palette: default_palette(),
            buckets: default_buckets(),
        }
    }
}

fn default_palette() -> Vec<PaletteEntry> {
    [
        (ColorClass::Red, [220, 40, 40]),
        (ColorClass::Orange, [240, 140, 40]),
        (ColorClass::Yellow, [235, 220, 60]),
        (ColorClass::Green, [60, 180, 75]),
        (ColorClass::Blue, [50, 80, 230]),
        (ColorClass::Purple, [140, 60, 180]),
        (ColorClass::Black, [25, 25, 25]),
        (ColorClass::White, [240, 240, 240]),
    ]
    .into_iter()
    .map(|(class, rgb)| PaletteEntry { class, rgb })
    .collect()
}

/// V-scale thresholds over the continuous [0, 1] difficulty.
fn default_buckets() -> Vec<GradeBucket> {
    [
        (0.10, "V0"),
        (0.16, "V1"),
        (0.22, "V2"),
        (0.28, "V3"),
        (0.34, "V4"),
        (0.40, "V5"),
        (0.50, "V6"),
        (0.60, "V7"),
        (0.75, "V8"),
        (1.00, "V9+"),
    ]
    .into_iter()
    .map(|(upper, label)| GradeBucket {
        upper,
        label: label.to_string(),
    })
    .collect()
}

impl GraderConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read config file {:?}", path.as_ref()))?;
        let config: GraderConfig = toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {:?}", path.as_ref()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.palette.is_empty() {
            anyhow::bail!("palette must not be empty");
        }
        if self.buckets.is_empty() {
            anyhow::bail!("grade bucket scale must not be empty");
        }
        let mut prev = f32::NEG_INFINITY;
        for bucket in &self.buckets {
            if bucket.upper <= prev {
                anyhow::bail!(
                    "grade bucket bounds must be strictly increasing (got {} after {})",
                    bucket.upper,
                    prev
                );
            }
            prev = bucket.upper;
        }
        let (lo, hi) = self.scoring.area_range_px;
        if lo >= hi {
            anyhow::bail!("scoring.area_range_px must be an increasing range");
        }
        if self.scoring.color_cutoff <= 0.0 {
            anyhow::bail!("scoring.color_cutoff must be positive");
        }
        Ok(())
    }
}
