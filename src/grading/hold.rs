use imageproc::geometry::convex_hull;
use imageproc::point::Point;

use crate::config::{PaletteEntry, ScoringConfig};
use crate::error::GraderError;
use crate::models::{ColorClass, Contour, Hold, HoldType};

/// Scores one detected contour using shape and color descriptors.
#[derive(Debug, Clone)]
pub struct HoldGrader {
    scoring: ScoringConfig,
    palette: Vec<PaletteEntry>,
}

impl HoldGrader {
    pub fn new(scoring: ScoringConfig, palette: Vec<PaletteEntry>) -> Self {
        Self { scoring, palette }
    }

    /// Grade a contour into a hold.
    ///
    /// Fails with `InvalidContour` for degenerate boundaries (zero hull
    /// area) and `AmbiguousColorClass` when the color sample is at or beyond
    /// the configured cutoff distance from every palette entry. Both are
    /// per-hold failures the caller is expected to drop, not abort on.
    pub fn grade(&self, contour: &Contour) -> Result<Hold, GraderError> {
        let points: Vec<Point<i64>> = contour
            .boundary
            .iter()
            .map(|&(x, y)| Point::new(x as i64, y as i64))
            .collect();
        if points.len() < 3 {
            return Err(GraderError::InvalidContour);
        }

        let hull = convex_hull(points);
        let hull_area = polygon_area(&hull);
        if hull_area <= 0.0 {
            return Err(GraderError::InvalidContour);
        }

        let (color, _distance) = self.classify_color(contour.mean_color)?;

        let convexity = ((contour.area_px as f64 / hull_area) as f32).min(1.0);
        let axis_angle_deg = axis_angle_from_vertical(&contour.boundary);
        let perimeter = polygon_perimeter(&hull);
        let circularity = if perimeter > 0.0 {
            ((4.0 * std::f64::consts::PI * contour.area_px as f64) / (perimeter * perimeter))
                .min(1.0) as f32
        } else {
            0.0
        };
        let aspect_ratio = contour.bbox.aspect_ratio();

        let bbox_area = (contour.bbox.width() * contour.bbox.height()) as f32;
        let hold_type = self.classify_type(contour.area_px as f32, circularity, convexity, aspect_ratio);
        let score = self.score(convexity, bbox_area, axis_angle_deg);

        Ok(Hold {
            bbox: contour.bbox,
            area_px: contour.area_px,
            color,
            hold_type,
            score,
            convexity,
            axis_angle_deg,
            circularity,
            aspect_ratio,
        })
    }

    /// Nearest palette entry by RGB distance. The cutoff is exclusive on the
    /// matched side: a sample exactly at the cutoff is ambiguous.
    fn classify_color(&self, sample: [u8; 3]) -> Result<(ColorClass, f32), GraderError> {
        let mut best: Option<(ColorClass, f32)> = None;
        for entry in &self.palette {
            let d = color_distance(sample, entry.rgb);
            if best.map(|(_, bd)| d < bd).unwrap_or(true) {
                best = Some((entry.class, d));
            }
        }
        // Config validation guarantees a non-empty palette.
        let (class, distance) = best.ok_or(GraderError::AmbiguousColorClass { distance: f32::MAX })?;
        if distance >= self.scoring.color_cutoff {
            return Err(GraderError::AmbiguousColorClass { distance });
        }
        Ok((class, distance))
    }

    /// Ease score in [0, 1]; lower is harder. Convex, large, vertically
    /// oriented holds score high. The size term reads the bounding-box
    /// area, not the enclosed area.
    fn score(&self, convexity: f32, bbox_area_px: f32, axis_angle_deg: f32) -> f32 {
        let (lo, hi) = self.scoring.area_range_px;
        let size_term = ((bbox_area_px - lo) / (hi - lo)).clamp(0.0, 1.0);
        let vertical_term = 1.0 - (axis_angle_deg / 90.0).clamp(0.0, 1.0);

        let score = self.scoring.convexity_weight * convexity
            + self.scoring.area_weight * size_term
            + self.scoring.angle_weight * vertical_term;
        score.clamp(0.0, 1.0)
    }

    /// Vote-based handhold/foothold split: small, round, concave,
    /// near-square regions read as footholds.
    fn classify_type(
        &self,
        area_px: f32,
        circularity: f32,
        convexity: f32,
        aspect_ratio: f32,
    ) -> HoldType {
        let mut votes: i32 = if area_px < self.scoring.foothold_area_px {
            2
        } else {
            -1
        };
        if circularity > 0.5 {
            votes += 1;
        }
        if convexity < 0.7 {
            votes += 1;
        }
        if (0.7..=1.3).contains(&aspect_ratio) {
            votes += 1;
        }
        if votes >= 2 {
            HoldType::Foothold
        } else {
            HoldType::Handhold
        }
    }
}

fn color_distance(a: [u8; 3], b: [u8; 3]) -> f32 {
    let dr = a[0] as f32 - b[0] as f32;
    let dg = a[1] as f32 - b[1] as f32;
    let db = a[2] as f32 - b[2] as f32;
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Shoelace area of a polygon given by its vertices in order.
fn polygon_area(polygon: &[Point<i64>]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }
    let mut twice_area: i64 = 0;
    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[(i + 1) % polygon.len()];
        twice_area += a.x * b.y - b.x * a.y;
    }
    (twice_area.abs() as f64) / 2.0
}

fn polygon_perimeter(polygon: &[Point<i64>]) -> f64 {
    if polygon.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    for i in 0..polygon.len() {
        let a = polygon[i];
        let b = polygon[(i + 1) % polygon.len()];
        let dx = (a.x - b.x) as f64;
        let dy = (a.y - b.y) as f64;
        total += (dx * dx + dy * dy).sqrt();
    }
    total
}

/// Major-axis angle from vertical, in degrees [0, 90], via second-order
/// central moments of the boundary points. Near-isotropic regions have no
/// dominant axis and report 0.
fn axis_angle_from_vertical(boundary: &[(u32, u32)]) -> f32 {
    let n = boundary.len() as f64;
    if n < 2.0 {
        return 0.0;
    }

    let mean_x = boundary.iter().map(|&(x, _)| x as f64).sum::<f64>() / n;
    let mean_y = boundary.iter().map(|&(_, y)| y as f64).sum::<f64>() / n;

    let mut mu20 = 0.0;
    let mut mu02 = 0.0;
    let mut mu11 = 0.0;
    for &(x, y) in boundary {
        let dx = x as f64 - mean_x;
        let dy = y as f64 - mean_y;
        mu20 += dx * dx;
        mu02 += dy * dy;
        mu11 += dx * dy;
    }

    let spread = (((mu20 - mu02) / 2.0).powi(2) + mu11 * mu11).sqrt();
    if spread < 1e-6 {
        return 0.0;
    }

    // Angle of the major axis against the x-axis, in [-90, 90] degrees.
    let theta = 0.5 * (2.0 * mu11).atan2(mu20 - mu02);
    let from_horizontal = theta.to_degrees().abs();
    (90.0 - from_horizontal) as f32
}
