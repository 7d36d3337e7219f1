//! Standard node library
//!
//! Collection of built-in atomic nodes for common operations. Each node is
//! a stateless singleton registered once per type.

mod debug;
mod http;
mod math;
mod time;
mod transform;

pub use debug::DebugNode;
pub use http::HttpRequestNode;
pub use math::AddNode;
pub use time::DelayNode;
pub use transform::{JsonParseNode, JsonStringifyNode};
use flowruntime::NodeRegistry;

use std::sync::Arc;

/// Register all standard nodes with a registry
pub fn register_all(registry: &mut NodeRegistry) {
    registry.register(Arc::new(DebugNode));
    registry.register(Arc::new(HttpRequestNode::new()));
    registry.register(Arc::new(AddNode));
    registry.register(Arc::new(JsonParseNode));
    registry.register(Arc::new(JsonStringifyNode));
    registry.register(Arc::new(DelayNode));
}
