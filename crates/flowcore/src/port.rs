use crate::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
    Trigger,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Binary,
    Any,
}

impl DataType {
    /// Lowercase name, as written in definitions and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Number => "number",
            DataType::Boolean => "boolean",
            DataType::Object => "object",
            DataType::Array => "array",
            DataType::Binary => "binary",
            DataType::Any => "any",
        }
    }
}

/// A named data slot on a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDefinition {
    pub id: String,
    pub name: String,
    pub direction: PortDirection,
    pub data_type: DataType,
    #[serde(default)]
    pub required: bool,
    /// Accepts more than one incoming connection.
    #[serde(default)]
    pub multiple: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
}

impl PortDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        direction: PortDirection,
        data_type: DataType,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            direction,
            data_type,
            required: false,
            multiple: false,
            description: None,
            default_value: None,
        }
    }

    pub fn input(id: impl Into<String>, name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(id, name, PortDirection::Input, data_type)
    }

    pub fn output(id: impl Into<String>, name: impl Into<String>, data_type: DataType) -> Self {
        Self::new(id, name, PortDirection::Output, data_type)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }
}

/// Id under which a child's port is exposed on its enclosing composite.
pub fn exposed_port_id(child_id: &str, port_id: &str) -> String {
    format!("{}_{}", child_id, port_id)
}

/// Display name under which a child's port is exposed on its enclosing composite.
pub fn exposed_port_name(child_name: &str, port_name: &str) -> String {
    format!("{} - {}", child_name, port_name)
}
