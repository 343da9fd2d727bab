pub mod hold;
pub mod route;

pub use hold::HoldGrader;
pub use route::RouteGrader;
