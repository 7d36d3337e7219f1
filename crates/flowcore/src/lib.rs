//! Core abstractions for the flow engine
//!
//! This crate provides the node contract and the data exchanged at every
//! `execute` boundary. It has no runtime dependencies beyond tokio's sync
//! primitives.

mod catalog;
mod context;
mod definition;
mod error;
pub mod events;
mod metadata;
mod node;
pub mod port;
mod result;
mod settings;
mod value;

pub use catalog::NodeCatalog;
pub use context::{ExecutionContext, ExecutionLimits};
pub use definition::{CompositeDefinition, Edge, Endpoint, NodeSpec, Position};
pub use error::{FlowError, GraphError, NodeError};
pub use events::*;
pub use metadata::NodeMetadata;
pub use node::{Node, NodeId, NodeKind, NodeOutput, ValidationReport};
pub use port::{DataType, PortDefinition, PortDirection};
pub use result::{CompositeExecutionResult, ExecutionResult, ResultMetadata};
pub use settings::ExecutionSettings;
pub use value::Value;

/// Result type for flow operations
pub type Result<T> = std::result::Result<T, FlowError>;
