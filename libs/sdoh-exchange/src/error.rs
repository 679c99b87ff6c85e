//! Error types for SDOH resource access

use crate::resource::ResourceType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("FHIR client error: {0}")]
    Client(#[from] sdoh_fhir_client::Error),

    #[error("{resource_type}/{id} not found")]
    NotFound {
        resource_type: ResourceType,
        id: String,
    },

    #[error("{0} has no id; cannot update")]
    MissingId(ResourceType),

    #[error("Failed to decode {resource_type}: {source}")]
    Decode {
        resource_type: ResourceType,
        #[source]
        source: serde_json::Error,
    },

    #[error("Expected {expected} but server returned {actual}")]
    UnexpectedResourceType {
        expected: ResourceType,
        actual: String,
    },

    #[error("Unknown SDOH profile: {0}")]
    UnknownProfile(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
