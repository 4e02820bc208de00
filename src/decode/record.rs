//! Normalized records and field filters

use crate::domain::Element;
use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeSet;

// =============================================================================
// Normalized Record
// =============================================================================

/// Decoder output: a scalar, a keyed mapping or an ordered sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NormalizedRecord {
    Scalar(String),
    Map(IndexMap<String, NormalizedRecord>),
    List(Vec<NormalizedRecord>),
}

impl NormalizedRecord {
    /// The raw form of a childless element: `{name, content}`
    pub fn raw_element(node: &Element) -> Self {
        let mut map = IndexMap::with_capacity(2);
        map.insert(
            "name".to_string(),
            NormalizedRecord::Scalar(node.name().to_string()),
        );
        map.insert(
            "content".to_string(),
            NormalizedRecord::Scalar(node.content().to_string()),
        );
        NormalizedRecord::Map(map)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NormalizedRecord::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, NormalizedRecord>> {
        match self {
            NormalizedRecord::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[NormalizedRecord]> {
        match self {
            NormalizedRecord::List(l) => Some(l),
            _ => None,
        }
    }

    /// Look up a key when this record is a mapping
    pub fn get(&self, key: &str) -> Option<&NormalizedRecord> {
        self.as_map().and_then(|m| m.get(key))
    }
}

// =============================================================================
// Field Filter
// =============================================================================

/// Set of leaf field names kept when decoding a record of leaves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFilter {
    fields: BTreeSet<String>,
}

impl FieldFilter {
    /// Filter keeping a single field
    pub fn single(field: impl Into<String>) -> Self {
        Self {
            fields: std::iter::once(field.into()).collect(),
        }
    }

    /// Filter keeping every listed field
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a filter from a dynamically typed value.
    ///
    /// Accepts a string or an array of strings; anything else is an
    /// input error.
    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(s) => Ok(Self::single(s.clone())),
            serde_json::Value::Array(items) => {
                let mut fields = BTreeSet::new();
                for item in items {
                    match item {
                        serde_json::Value::String(s) => {
                            fields.insert(s.clone());
                        }
                        other => {
                            return Err(Error::Input(format!(
                                "filter entry {} is not a field name",
                                other
                            )))
                        }
                    }
                }
                Ok(Self { fields })
            }
            other => Err(Error::Input(format!(
                "filter ({}) is of an unknown type",
                other
            ))),
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<&str> for FieldFilter {
    fn from(field: &str) -> Self {
        Self::single(field)
    }
}

impl From<String> for FieldFilter {
    fn from(field: String) -> Self {
        Self::single(field)
    }
}

impl From<Vec<String>> for FieldFilter {
    fn from(fields: Vec<String>) -> Self {
        Self::new(fields)
    }
}

impl From<&[&str]> for FieldFilter {
    fn from(fields: &[&str]) -> Self {
        Self::new(fields.iter().copied())
    }
}
