//! Typed repositories over an injected [`FhirClient`]
//!
//! One generic [`FhirRepository`] serves every resource kind; a concrete
//! repository is just the generic type applied to a resource model.

use crate::consent::Consent;
use crate::error::{Error, Result};
use crate::resource::{FhirResource, ResourceType};
use sdoh_fhir_client::{Bundle, FhirClient, SearchParams};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Repository for SDOH `Consent` resources.
pub type ConsentRepository = FhirRepository<Consent>;

/// Upper bound on `next` links followed by a single search.
pub const DEFAULT_MAX_PAGES: usize = 50;

/// CRUD and search for resources of kind `R`.
///
/// The client handle is shared, never owned: every operation delegates to
/// the exact instance passed to [`FhirRepository::new`].
pub struct FhirRepository<R: FhirResource> {
    client: Arc<dyn FhirClient>,
    max_pages: usize,
    _resource: PhantomData<fn() -> R>,
}

impl<R: FhirResource> FhirRepository<R> {
    pub fn new(client: Arc<dyn FhirClient>) -> Self {
        Self {
            client,
            max_pages: DEFAULT_MAX_PAGES,
            _resource: PhantomData,
        }
    }

    /// Cap on the number of result pages a search will read (at least 1).
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// The resource kind this repository serves.
    pub fn resource_type(&self) -> ResourceType {
        R::RESOURCE_TYPE
    }

    pub fn client(&self) -> &Arc<dyn FhirClient> {
        &self.client
    }

    /// Read by id. Missing or deleted resources are `Ok(None)`.
    pub async fn find(&self, id: &str) -> Result<Option<R>> {
        let resource_type = R::RESOURCE_TYPE;
        tracing::debug!(resource_type = %resource_type, id, "Reading resource");

        match self.client.read(resource_type.as_str(), id).await? {
            Some(value) => decode(value).map(Some),
            None => Ok(None),
        }
    }

    /// Read by id, treating absence as an error.
    pub async fn get(&self, id: &str) -> Result<R> {
        self.find(id).await?.ok_or_else(|| Error::NotFound {
            resource_type: R::RESOURCE_TYPE,
            id: id.to_string(),
        })
    }

    /// Create the resource; the server assigns the id.
    pub async fn create(&self, resource: &R) -> Result<R> {
        let resource_type = R::RESOURCE_TYPE;
        tracing::debug!(resource_type = %resource_type, "Creating resource");

        let body = encode(resource)?;
        let stored = self.client.create(resource_type.as_str(), &body).await?;
        let stored: R = decode(stored)?;

        tracing::info!(
            resource_type = %resource_type,
            id = stored.id().unwrap_or_default(),
            "Created resource"
        );
        Ok(stored)
    }

    /// Replace the resource stored under its own id.
    pub async fn update(&self, resource: &R) -> Result<R> {
        let resource_type = R::RESOURCE_TYPE;
        let id = resource
            .id()
            .filter(|id| !id.is_empty())
            .ok_or(Error::MissingId(resource_type))?;
        tracing::debug!(resource_type = %resource_type, id, "Updating resource");

        let body = encode(resource)?;
        let stored = self.client.update(resource_type.as_str(), id, &body).await?;
        decode(stored)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let resource_type = R::RESOURCE_TYPE;
        tracing::debug!(resource_type = %resource_type, id, "Deleting resource");

        self.client.delete(resource_type.as_str(), id).await?;
        Ok(())
    }

    /// Run a search and collect matches from every result page.
    ///
    /// Entries of other types (included resources, OperationOutcome
    /// warnings) are skipped.
    pub async fn search(&self, params: &SearchParams) -> Result<Vec<R>> {
        let resource_type = R::RESOURCE_TYPE;
        tracing::debug!(
            resource_type = %resource_type,
            query = %params.to_query_string(),
            "Searching resources"
        );

        let mut bundle = self.client.search(resource_type.as_str(), params).await?;
        let mut results = Vec::new();
        let mut pages = 1;

        loop {
            collect_matches(&bundle, &mut results)?;

            let Some(next) = bundle.next_link() else {
                break;
            };
            if pages >= self.max_pages {
                tracing::warn!(
                    resource_type = %resource_type,
                    max_pages = self.max_pages,
                    "Search truncated at page limit"
                );
                break;
            }

            let next = next.to_string();
            bundle = self.client.fetch_page(&next).await?;
            pages += 1;
        }

        tracing::debug!(
            resource_type = %resource_type,
            pages,
            count = results.len(),
            "Search complete"
        );
        Ok(results)
    }
}

impl<R: FhirResource> Clone for FhirRepository<R> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            max_pages: self.max_pages,
            _resource: PhantomData,
        }
    }
}

impl<R: FhirResource> fmt::Debug for FhirRepository<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FhirRepository")
            .field("resource_type", &R::RESOURCE_TYPE)
            .field("base_url", &self.client.base_url())
            .field("max_pages", &self.max_pages)
            .finish()
    }
}

fn collect_matches<R: FhirResource>(bundle: &Bundle, out: &mut Vec<R>) -> Result<()> {
    for resource in bundle.resources() {
        if resource_type_of(resource) != Some(R::RESOURCE_TYPE.as_str()) {
            continue;
        }
        out.push(decode(resource.clone())?);
    }
    Ok(())
}

fn resource_type_of(value: &Value) -> Option<&str> {
    value.get("resourceType").and_then(Value::as_str)
}

/// Serialize an outgoing resource, refusing bodies whose `resourceType`
/// does not match the endpoint they would be sent to.
fn encode<R: FhirResource>(resource: &R) -> Result<Value> {
    let value = serde_json::to_value(resource)?;
    let expected = R::RESOURCE_TYPE;
    match resource_type_of(&value) {
        Some(actual) if actual == expected.as_str() => {}
        actual => {
            return Err(Error::UnexpectedResourceType {
                expected,
                actual: actual.unwrap_or("<missing>").to_string(),
            })
        }
    }
    Ok(value)
}

fn decode<R: FhirResource>(value: Value) -> Result<R> {
    let expected = R::RESOURCE_TYPE;
    match resource_type_of(&value) {
        Some(actual) if actual == expected.as_str() => {}
        actual => {
            return Err(Error::UnexpectedResourceType {
                expected,
                actual: actual.unwrap_or("<missing>").to_string(),
            })
        }
    }

    serde_json::from_value(value).map_err(|source| Error::Decode {
        resource_type: expected,
        source,
    })
}
