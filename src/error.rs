use thiserror::Error;

/// Domain errors of the grading core.
///
/// `InvalidContour` and `AmbiguousColorClass` are per-hold: the orchestrator
/// drops the affected contour and continues. Everything else aborts the
/// request it occurs in.
#[derive(Error, Debug)]
pub enum GraderError {
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("no holds detected")]
    NoHoldsDetected,

    #[error("degenerate contour with zero convex hull area")]
    InvalidContour,

    #[error("color sample matches no palette entry (nearest distance {distance:.1})")]
    AmbiguousColorClass { distance: f32 },

    #[error("image fetch failed: {0}")]
    FetchFailure(String),

    #[error("storage failed: {0}")]
    StorageFailure(String),

    #[error("difficulty {value:.3} falls outside the configured grade scale")]
    GradeOutOfRange { value: f32 },

    #[error("route mixes color classes")]
    MixedColorClasses,

    #[error("route contains no holds")]
    EmptyRoute,
}

impl GraderError {
    /// True for the per-hold failures the orchestrator absorbs.
    pub fn is_hold_drop(&self) -> bool {
        matches!(
            self,
            GraderError::InvalidContour | GraderError::AmbiguousColorClass { .. }
        )
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Detect,
    GradeHolds,
    Aggregate,
    Persist,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Detect => "detect",
            Stage::GradeHolds => "grade-holds",
            Stage::Aggregate => "aggregate",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

/// A request-aborting failure tagged with the stage it originated in.
#[derive(Error, Debug)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: GraderError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: GraderError) -> Self {
        Self { stage, source }
    }
}
