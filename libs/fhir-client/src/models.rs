//! Wire models exchanged with a FHIR REST endpoint

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Search parameters for a type-level search (`GET [base]/[type]?...`).
///
/// Parameters keep their insertion order; repeated names are allowed since
/// FHIR treats them as AND-joined criteria.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchParams {
    pub params: Vec<(String, String)>,
    pub count: Option<u32>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `name=value` criterion.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Page size requested via `_count`.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.count.is_none()
    }

    /// Encode as a URL query string without the leading `?`.
    pub fn to_query_string(&self) -> String {
        let mut parts: Vec<String> = self
            .params
            .iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    urlencoding::encode(name),
                    urlencoding::encode(value)
                )
            })
            .collect();

        if let Some(count) = self.count {
            parts.push(format!("_count={}", count));
        }

        parts.join("&")
    }
}

/// Searchset Bundle as returned by a FHIR search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    #[serde(default = "default_resource_type")]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type", default)]
    pub bundle_type: Option<String>,

    /// If search, the total number of matches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link: Vec<BundleLink>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<BundleEntry>,

    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

fn default_resource_type() -> String {
    "Bundle".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleLink {
    pub relation: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Value>,

    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl Bundle {
    /// URL of the `next` page link, if the server paged the result.
    pub fn next_link(&self) -> Option<&str> {
        self.link
            .iter()
            .find(|l| l.relation == "next")
            .map(|l| l.url.as_str())
    }

    /// Resources carried by the entries, in order.
    pub fn resources(&self) -> impl Iterator<Item = &Value> {
        self.entry.iter().filter_map(|e| e.resource.as_ref())
    }
}
