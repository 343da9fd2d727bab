pub mod config;
pub mod detection;
pub mod error;
pub mod grading;
pub mod models;
pub mod pipeline;
pub mod store;

pub use config::GraderConfig;
pub use detection::ContourDetector;
pub use error::{GraderError, PipelineError, Stage};
pub use grading::{HoldGrader, RouteGrader};
pub use models::{
    BoundingBox, ColorClass, Contour, Grade, HistoryRecord, Hold, HoldType,
};
pub use pipeline::{Orchestrator, ProcessOutcome};
pub use store::{
    FsImageStore, HistoryQuery, HistoryStore, ImageStore, SqliteHistoryStore, UploadCoordinator,
    UploadSlot,
};
