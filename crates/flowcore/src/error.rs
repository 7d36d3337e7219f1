use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Node error: {0}")]
    Node(#[from] NodeError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure of a single node invocation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NodeError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input type for '{field}': expected {expected}, got {actual}")]
    InvalidInputType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Timeout after {millis}ms")]
    Timeout { millis: u64 },

    #[error("Cancelled")]
    Cancelled,

    #[error("Node panicked: {0}")]
    Panicked(String),

    #[error("Node has been disposed")]
    Disposed,
}

/// Structural problems with a composite graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Duplicate child id: {0}")]
    DuplicateChild(String),

    #[error("Child not found: {0}")]
    ChildNotFound(String),

    #[error("Invalid edge: {0}")]
    InvalidEdge(String),

    #[error("Circular dependency detected at node: {node_id}")]
    CyclicDependency { node_id: String },

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Invalid graph: {0}")]
    Invalid(String),
}
