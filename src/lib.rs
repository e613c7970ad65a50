pub mod barrier;
pub mod config;
pub mod display;
pub mod error;
pub mod evaluator;
pub mod repo_status;
pub mod scan;
pub mod snooze;
pub mod upstream;
pub mod visit;

pub use error::{Result, StatusError};
pub use repo_status::ProjectStatus;
