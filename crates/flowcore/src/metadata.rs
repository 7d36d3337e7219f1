use serde::{Deserialize, Serialize};

/// Descriptive information about a node kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    pub category: String,
    pub description: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub experimental: bool,
    #[serde(default)]
    pub deprecated: bool,
}

impl Default for NodeMetadata {
    fn default() -> Self {
        Self {
            category: "general".to_string(),
            description: String::new(),
            version: "1.0.0".to_string(),
            author: None,
            tags: Vec::new(),
            experimental: false,
            deprecated: false,
        }
    }
}

impl NodeMetadata {
    pub fn new(category: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Lowercase lookup terms for a catalog search box: the words of the
    /// display name, the dot-separated segments of the type, the category
    /// and the tags, first occurrence wins.
    pub fn search_terms(&self, name: &str, node_type: &str) -> Vec<String> {
        let candidates = name
            .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
            .chain(node_type.split(['.', '_']))
            .chain(std::iter::once(self.category.as_str()))
            .chain(self.tags.iter().map(String::as_str));

        let mut terms: Vec<String> = Vec::new();
        for term in candidates {
            let term = term.trim().to_lowercase();
            if !term.is_empty() && !terms.contains(&term) {
                terms.push(term);
            }
        }
        terms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_terms_are_deduplicated_in_order() {
        let metadata = NodeMetadata::new("http", "Make HTTP requests").with_tags(["web", "HTTP"]);
        let terms = metadata.search_terms("HTTP Request", "http.request");
        assert_eq!(terms, vec!["http", "request", "web"]);
    }
}
