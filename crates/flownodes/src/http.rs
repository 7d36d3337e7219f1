use async_trait::async_trait;
use flowcore::{
    DataType, ExecutionContext, Node, NodeError, NodeMetadata, NodeOutput, PortDefinition,
    Value,
};
use std::collections::HashMap;

/// HTTP request node
pub struct HttpRequestNode {
    client: reqwest::Client,
}

impl HttpRequestNode {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    fn with_body(request: reqwest::RequestBuilder, body: Option<&Value>) -> reqwest::RequestBuilder {
        match body {
            Some(Value::String(text)) => request.body(text.clone()),
            Some(Value::Null) | None => request,
            Some(other) => request.json(&other.to_json()),
        }
    }
}

impl Default for HttpRequestNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for HttpRequestNode {
    fn id(&self) -> &str {
        "http.request"
    }

    fn name(&self) -> &str {
        "HTTP Request"
    }

    fn node_type(&self) -> &str {
        "http.request"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new("http", "Make HTTP requests").with_tags(["fetch", "api", "rest"])
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        vec![
            PortDefinition::input("url", "URL", DataType::String).required(),
            PortDefinition::input("body", "Body", DataType::Any),
        ]
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        vec![
            PortDefinition::output("status", "Status", DataType::Number),
            PortDefinition::output("body", "Body", DataType::String),
            PortDefinition::output("headers", "Headers", DataType::Object),
        ]
    }

    fn validate_config(&self, config: &HashMap<String, Value>) -> Result<(), NodeError> {
        if let Some(method) = config.get("method") {
            match method.as_str().map(str::to_uppercase).as_deref() {
                Some("GET" | "POST" | "PUT" | "DELETE") => {}
                _ => {
                    return Err(NodeError::Configuration(format!(
                        "Unsupported method: {:?}",
                        method
                    )))
                }
            }
        }
        Ok(())
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<NodeOutput, NodeError> {
        let url = ctx.require_str("url")?;
        let method_value = ctx.get_config_or("method", Value::String("GET".to_string()));
        let method = method_value.as_str().unwrap_or("GET").to_uppercase();

        ctx.events.info(format!("{} {}", method, url));

        let body = ctx.inputs.get("body");
        let request = match method.as_str() {
            "GET" => self.client.get(url),
            "POST" => Self::with_body(self.client.post(url), body),
            "PUT" => Self::with_body(self.client.put(url), body),
            "DELETE" => self.client.delete(url),
            _ => return Err(NodeError::Configuration(format!("Unsupported method: {}", method))),
        };

        // Add headers if provided
        let request = match ctx.config.get("headers").and_then(Value::as_object) {
            Some(headers) => headers.iter().fold(request, |req, (key, value)| match value.as_str() {
                Some(val) => req.header(key, val),
                None => req,
            }),
            None => request,
        };

        let response = tokio::select! {
            response = request.send() => response
                .map_err(|e| NodeError::ExecutionFailed(format!("HTTP request failed: {}", e)))?,
            _ = ctx.cancellation.cancelled() => return Err(NodeError::Cancelled),
        };

        let status = response.status().as_u16();
        let headers_map: HashMap<String, Value> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_str().unwrap_or("").to_string())))
            .collect();

        let body_text = response
            .text()
            .await
            .map_err(|e| NodeError::ExecutionFailed(format!("Failed to read response: {}", e)))?;

        ctx.events.info(format!("Response status: {}", status));

        Ok(NodeOutput::new()
            .with_output("status", status as f64)
            .with_output("body", body_text)
            .with_output("headers", Value::Object(headers_map)))
    }
}
