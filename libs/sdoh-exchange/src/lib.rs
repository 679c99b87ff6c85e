//! SDOH Exchange resource access
//!
//! - [`profiles`]: SDOH Clinical Care profile URIs and helpers to stamp them
//!   into `meta.profile`
//! - [`repository`]: a generic typed repository over an injected
//!   [`FhirClient`](sdoh_fhir_client::FhirClient), and [`ConsentRepository`]
//! - [`consent`]: the Consent resource model
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sdoh_exchange::{profiles, ConsentRepository, FhirResource};
//! use sdoh_fhir_client::RestClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(RestClient::new("https://ehr.example.org/fhir")?);
//! let consents = ConsentRepository::new(client);
//!
//! if let Some(consent) = consents.find("123").await? {
//!     println!("SDOH profile: {}", consent.has_profile(profiles::CONSENT));
//! }
//! # Ok(())
//! # }
//! ```

pub mod consent;
pub mod error;
pub mod profiles;
pub mod repository;
pub mod resource;

pub use consent::{Consent, ConsentStatus};
pub use error::{Error, Result};
pub use profiles::SdohProfile;
pub use repository::{ConsentRepository, FhirRepository, DEFAULT_MAX_PAGES};
pub use resource::{FhirResource, Meta, ResourceType};

// Re-export the client types repositories are built from
pub use sdoh_fhir_client::{FhirClient, SearchParams};
