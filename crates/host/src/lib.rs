//! The tool host: a fixed catalog of telemetry and process-control
//! operations served over the tool-invocation protocol.

mod catalog;
mod service;

pub use catalog::{Catalog, HandlerFn, Operation};
pub use service::HostService;
