pub mod contours;
pub mod preprocessing;

use std::io::Cursor;

use image::ImageReader;
use tracing::debug;

use crate::config::DetectionConfig;
use crate::error::GraderError;
use crate::models::Contour;

/// Extracts hold-candidate regions from raw image bytes.
///
/// Pure function of the bytes plus the configured thresholds; a fresh
/// detector can be built per request for free.
#[derive(Debug, Clone)]
pub struct ContourDetector {
    config: DetectionConfig,
}

impl ContourDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// Run detection over encoded image bytes.
    ///
    /// Returns `InvalidImage` when the bytes cannot be decoded and
    /// `NoHoldsDetected` when no region survives the noise filters; an empty
    /// success is never reported.
    pub fn detect(&self, bytes: &[u8]) -> Result<Vec<Contour>, GraderError> {
        let img = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| GraderError::InvalidImage(e.to_string()))?
            .decode()
            .map_err(|e| GraderError::InvalidImage(e.to_string()))?;

        let rgb = img.to_rgb8();
        let gray = preprocessing::to_grayscale(&img);
        let blurred = preprocessing::apply_blur(&gray, self.config.blur_sigma);
        let mask = preprocessing::binarize(&blurred);

        let raw = contours::find_regions(&mask, &rgb);
        let raw_count = raw.len();

        let total_px = (rgb.width() * rgb.height()) as f32;
        let max_area_px = (total_px * self.config.max_area_frac) as u32;
        let mut kept: Vec<Contour> = raw
            .into_iter()
            .filter(|c| {
                c.area_px >= self.config.min_area_px
                    && c.area_px <= max_area_px
                    && c.bbox.skew() <= self.config.max_aspect_skew
            })
            .collect();
        // Stable output order independent of labelling internals.
        kept.sort_by_key(|c| (c.bbox.min_y, c.bbox.min_x));

        debug!(
            raw = raw_count,
            kept = kept.len(),
            "contour detection finished"
        );

        if kept.is_empty() {
            return Err(GraderError::NoHoldsDetected);
        }
        Ok(kept)
    }
}
