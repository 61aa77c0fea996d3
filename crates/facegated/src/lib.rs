//! facegated: HTTP services turning uploaded photos into face embeddings or
//! reference-identity decisions.
//!
//! Two binaries share this library: `facegate-embed` (`POST /generate-embedding`)
//! and `facegate-verify` (`POST /verify`). Models live on one engine thread;
//! handlers reach it through [`engine::EngineHandle`].

pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod reference;
pub mod response;
pub mod routes;
pub mod server;

pub use config::{Config, ConfigError, Service};
pub use engine::{spawn_engine, DispatchError, EngineHandle};
pub use error::RequestError;
pub use pipeline::{PipelineError, PipelineSettings};
pub use reference::Reference;
pub use response::{decide, Decision};
