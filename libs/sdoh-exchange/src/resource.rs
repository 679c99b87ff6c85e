//! Resource kinds and the common resource trait

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// FHIR resource types covered by the SDOH profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    Task,
    Condition,
    ServiceRequest,
    Goal,
    Procedure,
    Consent,
    QuestionnaireResponse,
}

impl ResourceType {
    /// Type name as used in REST paths and `resourceType`.
    pub const fn as_str(self) -> &'static str {
        match self {
            ResourceType::Task => "Task",
            ResourceType::Condition => "Condition",
            ResourceType::ServiceRequest => "ServiceRequest",
            ResourceType::Goal => "Goal",
            ResourceType::Procedure => "Procedure",
            ResourceType::Consent => "Consent",
            ResourceType::QuestionnaireResponse => "QuestionnaireResponse",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource metadata (`Resource.meta`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,

    /// Profiles this resource claims to conform to
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub profile: Vec<String>,

    /// security, tag, source, extension, ...
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl Meta {
    pub fn has_profile(&self, profile: &str) -> bool {
        self.profile.iter().any(|p| p == profile)
    }

    /// Returns `true` if the profile was added.
    pub fn ensure_profile(&mut self, profile: &str) -> bool {
        if self.has_profile(profile) {
            return false;
        }
        self.profile.push(profile.to_string());
        true
    }
}

/// A typed FHIR resource bound to a single [`ResourceType`].
///
/// The associated constant is the kind tag that specializes
/// [`FhirRepository`](crate::repository::FhirRepository).
pub trait FhirResource: Serialize + DeserializeOwned + Send + Sync + 'static {
    const RESOURCE_TYPE: ResourceType;

    fn id(&self) -> Option<&str>;

    fn meta(&self) -> Option<&Meta>;

    fn meta_mut(&mut self) -> &mut Option<Meta>;

    fn has_profile(&self, profile: &str) -> bool {
        self.meta().is_some_and(|m| m.has_profile(profile))
    }

    /// Add `profile` to `meta.profile`, creating `meta` when absent.
    fn ensure_profile(&mut self, profile: &str) -> bool {
        self.meta_mut()
            .get_or_insert_with(Meta::default)
            .ensure_profile(profile)
    }
}
