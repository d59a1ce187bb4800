pub mod backends;
pub mod clients;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod pipeline;
#[cfg(feature = "server")]
pub mod server;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use clients::ServiceClients;
pub use config::Config;
pub use error::{BackendErrorCategory, PipelineError, Result};
pub use models::{
    AdapterConfig, ItemOutcome, PipelineInput, PipelineReport, PipelineRequest, PipelineResponse,
};
pub use pipeline::PipelineCoordinator;
