pub mod ids;
pub mod store;

pub use ids::{InvalidRunId, RunId, SolutionName};
pub use store::{ResultStore, SessionPaths, SolutionIndex};
