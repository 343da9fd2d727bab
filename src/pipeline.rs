use std::collections::BTreeMap;
use std::time::Duration;

use rayon::prelude::*;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{GraderConfig, TimeoutConfig};
use crate::detection::ContourDetector;
use crate::error::{GraderError, PipelineError, Stage};
use crate::grading::{HoldGrader, RouteGrader};
use crate::models::{ColorClass, Grade, HistoryRecord, Hold};
use crate::store::{HistoryStore, ImageStore};

/// Result of one successful processing request.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    /// Also the id of the appended history record.
    pub correlation_id: Uuid,
    /// One grade per color class present on the image, class-ordered.
    pub grades: Vec<Grade>,
    pub holds: Vec<Hold>,
    /// Contours dropped for per-hold failures, recorded but excluded.
    pub dropped: usize,
}

/// Sequences detection, hold grading, route grading and persistence for one
/// submitted image.
///
/// Holds no cross-request mutable state: each `process` call runs the stage
/// machine `Fetch → Detect → GradeHolds → Aggregate → Persist` to completion
/// or failure over the injected collaborators.
pub struct Orchestrator<I, H> {
    detector: ContourDetector,
    hold_grader: HoldGrader,
    route_grader: RouteGrader,
    timeouts: TimeoutConfig,
    images: I,
    history: H,
}

impl<I: ImageStore, H: HistoryStore> Orchestrator<I, H> {
    pub fn new(config: &GraderConfig, images: I, history: H) -> Self {
        Self {
            detector: ContourDetector::new(config.detection.clone()),
            hold_grader: HoldGrader::new(config.scoring.clone(), config.palette.clone()),
            route_grader: RouteGrader::new(config.scoring.clone(), config.buckets.clone()),
            timeouts: config.timeouts.clone(),
            images,
            history,
        }
    }

    /// Process the image stored under `object_key`.
    ///
    /// Per-hold failures (`InvalidContour`, `AmbiguousColorClass`) are logged
    /// and excluded without aborting; everything else fails the request with
    /// the originating stage. Exactly one history record is appended on
    /// success and none on failure.
    pub async fn process(&self, object_key: &str) -> Result<ProcessOutcome, PipelineError> {
        let correlation_id = Uuid::new_v4();
        debug!(%correlation_id, object_key, "processing started");

        let bytes = tokio::time::timeout(
            Duration::from_millis(self.timeouts.fetch_ms),
            self.images.fetch(object_key),
        )
        .await
        .map_err(|_| {
            PipelineError::new(
                Stage::Fetch,
                GraderError::FetchFailure(format!("fetch of {object_key:?} timed out")),
            )
        })?
        .map_err(|e| PipelineError::new(Stage::Fetch, e))?;

        let contours = self
            .detector
            .detect(&bytes)
            .map_err(|e| PipelineError::new(Stage::Detect, e))?;
        debug!(%correlation_id, contours = contours.len(), "contours extracted");

        // Holds are independent; grade them in parallel. Borrow only the
        // grader so the stores need not be shareable across rayon workers.
        let hold_grader = &self.hold_grader;
        let graded: Vec<Result<Hold, GraderError>> = contours
            .par_iter()
            .map(|c| hold_grader.grade(c))
            .collect();

        let mut holds = Vec::with_capacity(graded.len());
        let mut dropped = 0usize;
        for result in graded {
            match result {
                Ok(hold) => holds.push(hold),
                Err(e) if e.is_hold_drop() => {
                    warn!(%correlation_id, error = %e, "dropping contour");
                    dropped += 1;
                }
                Err(e) => return Err(PipelineError::new(Stage::GradeHolds, e)),
            }
        }
        if holds.is_empty() {
            return Err(PipelineError::new(
                Stage::GradeHolds,
                GraderError::NoHoldsDetected,
            ));
        }

        let mut by_class: BTreeMap<ColorClass, Vec<Hold>> = BTreeMap::new();
        for hold in &holds {
            by_class.entry(hold.color).or_default().push(hold.clone());
        }

        let mut grades = Vec::with_capacity(by_class.len());
        for (class, route) in &by_class {
            let grade = self
                .route_grader
                .aggregate(route)
                .map_err(|e| PipelineError::new(Stage::Aggregate, e))?;
            debug!(%correlation_id, class = %class, bucket = %grade.bucket, "route graded");
            grades.push(grade);
        }

        let mut record = HistoryRecord::new(object_key, grades.clone(), holds.clone());
        record.id = correlation_id;
        tokio::time::timeout(
            Duration::from_millis(self.timeouts.store_ms),
            self.history.append(&record),
        )
        .await
        .map_err(|_| {
            PipelineError::new(
                Stage::Persist,
                GraderError::StorageFailure("history append timed out".to_string()),
            )
        })?
        .map_err(|e| PipelineError::new(Stage::Persist, e))?;

        info!(
            %correlation_id,
            object_key,
            routes = grades.len(),
            holds = holds.len(),
            dropped,
            "processing finished"
        );

        Ok(ProcessOutcome {
            correlation_id,
            grades,
            holds,
            dropped,
        })
    }
}
