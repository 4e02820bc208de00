//! API Element Tree
//!
//! The management API exchanges generic named trees in both directions: a
//! request is an `Element` naming the remote call, and every response is an
//! `Element` rooted at `results`. A node carries either scalar content or an
//! ordered list of children.

use serde::{Deserialize, Serialize};

// =============================================================================
// Element
// =============================================================================

/// A named node with optional scalar content and ordered children
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    name: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<Element>,
}

impl Element {
    /// Create an empty element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: String::new(),
            children: Vec::new(),
        }
    }

    /// Create a leaf element holding `content`
    pub fn leaf(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            children: Vec::new(),
        }
    }

    /// Append a leaf child (builder style)
    pub fn with_value(mut self, name: impl Into<String>, content: impl ToString) -> Self {
        self.children.push(Element::leaf(name, content.to_string()));
        self
    }

    /// Append a child element (builder style)
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Append a child element
    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Set the scalar content
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// First direct child named `name`
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Content of the first direct child named `name`.
    ///
    /// Empty content is reported as `None`, matching how the API marks
    /// absent optional fields.
    pub fn child_str(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.content.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Children of the direct child named `name`, or an empty slice
    pub fn children_of(&self, name: &str) -> &[Element] {
        self.child(name).map(|c| c.children()).unwrap_or(&[])
    }
}

// =============================================================================
// API Response
// =============================================================================

/// Status attached to every `results` node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultStatus {
    /// Zero when the call passed
    pub errno: i64,
    /// Server-reported reason for a failure
    pub reason: String,
}

impl ResultStatus {
    pub fn passed() -> Self {
        Self::default()
    }

    pub fn failed(errno: i64, reason: impl Into<String>) -> Self {
        Self {
            errno,
            reason: reason.into(),
        }
    }
}

/// A response returned by the transport: status plus the `results` tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: ResultStatus,
    pub results: Element,
}

impl ApiResponse {
    /// A passed response wrapping `results`
    pub fn passed(results: Element) -> Self {
        Self {
            status: ResultStatus::passed(),
            results,
        }
    }

    /// A failed response with an empty `results` node
    pub fn failed(errno: i64, reason: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::failed(errno, reason),
            results: Element::new("results"),
        }
    }

    pub fn results_errno(&self) -> i64 {
        self.status.errno
    }

    pub fn results_reason(&self) -> &str {
        &self.status.reason
    }

    pub fn is_passed(&self) -> bool {
        self.status.errno == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_lookup() {
        let el = Element::new("perf-object-instance-list-info-iter")
            .with_value("objectname", "volume")
            .with_value("max-records", 999)
            .with_child(Element::new("desired-attributes"));

        assert_eq!(el.children().len(), 3);
        assert_eq!(el.child_str("objectname"), Some("volume"));
        assert_eq!(el.child_str("max-records"), Some("999"));
        assert_eq!(el.child_str("desired-attributes"), None);
        assert!(el.child("missing").is_none());
        assert!(el.children_of("missing").is_empty());
    }

    #[test]
    fn test_response_status() {
        let ok = ApiResponse::passed(Element::new("results"));
        assert!(ok.is_passed());

        let failed = ApiResponse::failed(13005, "Unable to find API");
        assert!(!failed.is_passed());
        assert_eq!(failed.results_errno(), 13005);
        assert_eq!(failed.results_reason(), "Unable to find API");
    }
}
