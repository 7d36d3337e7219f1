//! Composite execution runtime
//!
//! This crate provides the engine that runs graphs of nodes: dependency
//! resolution, cycle detection, sequential and bounded-concurrency
//! scheduling, port aggregation, and the composite node that ties them
//! together behind the ordinary node contract.

mod bound;
mod builder;
mod composite;
mod dependency;
mod executor;
mod graph;
mod policy;
pub mod ports;
mod registry;
mod runtime;

pub use bound::BoundNode;
pub use builder::build_composite;
pub use composite::{CompositeNode, COMPOSITE_NODE_TYPE};
pub use dependency::DependencyGraph;
pub use executor::CompositeExecutor;
pub use graph::CompositeGraph;
pub use policy::{invoke, Invocation, InvocationPolicy};
pub use registry::NodeRegistry;
pub use runtime::{FlowRuntime, RuntimeConfig};
