use crate::config::{GradeBucket, ScoringConfig};
use crate::error::GraderError;
use crate::models::{Grade, Hold};

/// Aggregates the holds of one color class into a route grade.
#[derive(Debug, Clone)]
pub struct RouteGrader {
    scoring: ScoringConfig,
    buckets: Vec<GradeBucket>,
}

impl RouteGrader {
    pub fn new(scoring: ScoringConfig, buckets: Vec<GradeBucket>) -> Self {
        Self { scoring, buckets }
    }

    /// Grade a route.
    ///
    /// Preconditions: at least one hold, all sharing one color class. The
    /// limiting (minimum-score) hold dominates; count and span only add
    /// difficulty on top of it, so the resulting bucket is never easier than
    /// the one implied by the limiting hold alone.
    ///
    /// Extra easy holds are extra options for the climber, so a route is
    /// never harder than what remains after stripping its easiest holds.
    /// The difficulty is the minimum over those hardest-first subsets, which
    /// makes removing the easiest hold from a route (even one at a span
    /// extreme) incapable of lowering the grade.
    pub fn aggregate(&self, holds: &[Hold]) -> Result<Grade, GraderError> {
        let first = holds.first().ok_or(GraderError::EmptyRoute)?;
        let color = first.color;
        if holds.iter().any(|h| h.color != color) {
            return Err(GraderError::MixedColorClasses);
        }

        // Hardest first; each prefix is the route with some number of its
        // easiest holds removed. Position breaks score ties deterministically.
        let mut ordered: Vec<&Hold> = holds.iter().collect();
        ordered.sort_by(|a, b| {
            a.score
                .total_cmp(&b.score)
                .then(a.bbox.min_y.cmp(&b.bbox.min_y))
                .then(a.bbox.min_x.cmp(&b.bbox.min_x))
        });

        let limit = (1.0 - ordered[0].score).clamp(0.0, 1.0);

        let mut difficulty = f32::INFINITY;
        let mut top = u32::MAX;
        let mut bottom = 0u32;
        for (i, hold) in ordered.iter().enumerate() {
            top = top.min(hold.bbox.min_y);
            bottom = bottom.max(hold.bbox.max_y);

            let count_term = self.scoring.count_weight / (i + 1) as f32;
            let span_px = bottom.saturating_sub(top) as f32;
            let span_term = self.scoring.span_weight
                * (span_px / self.scoring.span_reference_px).clamp(0.0, 1.0);

            let subset = (limit + count_term + span_term).clamp(0.0, 1.0);
            difficulty = difficulty.min(subset);
        }

        // Floor at the limiting hold's own bucket.
        let index = self
            .bucket_index(difficulty)?
            .max(self.bucket_index(limit)?);

        Ok(Grade {
            color,
            bucket: self.buckets[index].label.clone(),
            difficulty,
            confidence: confidence(holds),
        })
    }

    /// Map a continuous difficulty onto the ordered bucket scale.
    ///
    /// Bounds are exclusive upper limits except for the final bucket, which
    /// also takes values equal to its bound. A value beyond the scale is a
    /// configuration bug surfaced as `GradeOutOfRange`.
    pub fn bucket_index(&self, difficulty: f32) -> Result<usize, GraderError> {
        for (i, bucket) in self.buckets.iter().enumerate() {
            if difficulty < bucket.upper {
                return Ok(i);
            }
        }
        if let Some(last) = self.buckets.last() {
            if difficulty <= last.upper {
                return Ok(self.buckets.len() - 1);
            }
        }
        Err(GraderError::GradeOutOfRange { value: difficulty })
    }
}

/// Confidence from the variance of hold scores: consistent holds give high
/// confidence, a wide spread hints the class may hide several routes.
fn confidence(holds: &[Hold]) -> f32 {
    let n = holds.len() as f32;
    let mean = holds.iter().map(|h| h.score).sum::<f32>() / n;
    let variance = holds
        .iter()
        .map(|h| (h.score - mean) * (h.score - mean))
        .sum::<f32>()
        / n;
    // 0.25 is the maximum possible variance of values in [0, 1].
    (1.0 - variance / 0.25).clamp(0.0, 1.0)
}
