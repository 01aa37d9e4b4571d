pub mod layer;
pub mod logger;
pub mod middleware;
pub mod trace_context;

pub use layer::JsonLogLayer;
pub use logger::{LoggerConfig, json_logger, shutdown_tracing, tracer_provider};
