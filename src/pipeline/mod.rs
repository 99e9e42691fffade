mod api;
mod graph;
mod model;

pub use api::{ApiClient, ApiError, job_file_path};
pub use graph::GraphModel;
pub use model::{Edge, JobDetail, JobKind, JobStatus, MapInfo, Node, Pipeline};
