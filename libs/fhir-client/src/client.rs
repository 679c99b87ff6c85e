//! The client handle consumed by resource repositories

use crate::error::Result;
use crate::models::{Bundle, SearchParams};
use async_trait::async_trait;
use serde_json::Value;

/// Remote operations against a FHIR endpoint.
///
/// Resources travel as raw JSON; typing happens one layer up, in the
/// repositories. Implementations must be shareable across tasks since a
/// single handle is injected into every repository.
#[async_trait]
pub trait FhirClient: Send + Sync {
    /// Service base URL, without a trailing slash.
    fn base_url(&self) -> &str;

    /// `GET [base]/[type]/[id]`. A missing or deleted resource is `Ok(None)`.
    async fn read(&self, resource_type: &str, id: &str) -> Result<Option<Value>>;

    /// `POST [base]/[type]`, returning the stored representation.
    async fn create(&self, resource_type: &str, resource: &Value) -> Result<Value>;

    /// `PUT [base]/[type]/[id]`, returning the stored representation.
    async fn update(&self, resource_type: &str, id: &str, resource: &Value) -> Result<Value>;

    /// `DELETE [base]/[type]/[id]`
    async fn delete(&self, resource_type: &str, id: &str) -> Result<()>;

    /// `GET [base]/[type]?params`, first page only.
    async fn search(&self, resource_type: &str, params: &SearchParams) -> Result<Bundle>;

    /// Follow an absolute paging link returned in a previous Bundle.
    async fn fetch_page(&self, url: &str) -> Result<Bundle>;
}
