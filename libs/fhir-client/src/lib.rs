//! FHIR REST Client
//!
//! Async client for talking to an EHR's FHIR endpoint. Repositories depend on
//! the [`FhirClient`] trait; [`RestClient`] is the HTTP implementation.
//!
//! # Example
//!
//! ```rust,no_run
//! use sdoh_fhir_client::{FhirClient, RestClient, SearchParams};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = RestClient::new("https://ehr.example.org/fhir")?;
//! let consent = client.read("Consent", "123").await?;
//! let bundle = client
//!     .search("Consent", &SearchParams::new().with("patient", "Patient/1"))
//!     .await?;
//! # Ok(())
//! # }
//! ```
pub mod client;
pub mod error;
pub mod models;
pub mod rest;

pub use client::FhirClient;
pub use error::{Error, Result};
pub use models::{Bundle, BundleEntry, BundleLink, SearchParams};
pub use rest::{RestClient, RestClientOptions};
