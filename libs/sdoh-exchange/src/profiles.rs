//! SDOH Clinical Care profile catalog
//!
//! Canonical StructureDefinition URLs for the resources this system writes.
//! EHRs are not required to use these profiles, but every resource created
//! here is stamped with the matching one.

use crate::error::Error;
use crate::resource::ResourceType;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

pub const TASK: &str = "http://hl7.org/fhir/us/sdoh-clinicalcare/StructureDefinition/SDOHCC-Task";
pub const PATIENT_TASK: &str =
    "http://hl7.org/fhir/us/sdoh-clinicalcare/StructureDefinition/SDOHCC-TaskForPatient";
pub const CONDITION: &str =
    "http://hl7.org/fhir/us/sdoh-clinicalcare/StructureDefinition/SDOHCC-Condition";
pub const SERVICE_REQUEST: &str =
    "http://hl7.org/fhir/us/sdoh-clinicalcare/StructureDefinition/SDOHCC-ServiceRequest";
pub const GOAL: &str = "http://hl7.org/fhir/us/sdoh-clinicalcare/StructureDefinition/SDOHCC-Goal";
pub const PROCEDURE: &str =
    "http://hl7.org/fhir/us/sdoh-clinicalcare/StructureDefinition/SDOHCC-Procedure";
pub const CONSENT: &str =
    "http://hl7.org/fhir/us/sdoh-clinicalcare/StructureDefinition/SDOHCC-Consent";
/// Versioned canonical: the SDC profile is pinned to 2.7.
pub const QUESTIONNAIRE_RESPONSE: &str =
    "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaireresponse|2.7";

/// The profile categories, one per constant above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdohProfile {
    Task,
    PatientTask,
    Condition,
    ServiceRequest,
    Goal,
    Procedure,
    Consent,
    QuestionnaireResponse,
}

impl SdohProfile {
    pub const ALL: [SdohProfile; 8] = [
        SdohProfile::Task,
        SdohProfile::PatientTask,
        SdohProfile::Condition,
        SdohProfile::ServiceRequest,
        SdohProfile::Goal,
        SdohProfile::Procedure,
        SdohProfile::Consent,
        SdohProfile::QuestionnaireResponse,
    ];

    /// Profile URI exactly as it should appear in `meta.profile`.
    pub const fn uri(self) -> &'static str {
        match self {
            SdohProfile::Task => TASK,
            SdohProfile::PatientTask => PATIENT_TASK,
            SdohProfile::Condition => CONDITION,
            SdohProfile::ServiceRequest => SERVICE_REQUEST,
            SdohProfile::Goal => GOAL,
            SdohProfile::Procedure => PROCEDURE,
            SdohProfile::Consent => CONSENT,
            SdohProfile::QuestionnaireResponse => QUESTIONNAIRE_RESPONSE,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SdohProfile::Task => "Task",
            SdohProfile::PatientTask => "PatientTask",
            SdohProfile::Condition => "Condition",
            SdohProfile::ServiceRequest => "ServiceRequest",
            SdohProfile::Goal => "Goal",
            SdohProfile::Procedure => "Procedure",
            SdohProfile::Consent => "Consent",
            SdohProfile::QuestionnaireResponse => "QuestionnaireResponse",
        }
    }

    /// The FHIR resource type the profile constrains.
    pub const fn base_resource_type(self) -> ResourceType {
        match self {
            SdohProfile::Task | SdohProfile::PatientTask => ResourceType::Task,
            SdohProfile::Condition => ResourceType::Condition,
            SdohProfile::ServiceRequest => ResourceType::ServiceRequest,
            SdohProfile::Goal => ResourceType::Goal,
            SdohProfile::Procedure => ResourceType::Procedure,
            SdohProfile::Consent => ResourceType::Consent,
            SdohProfile::QuestionnaireResponse => ResourceType::QuestionnaireResponse,
        }
    }

    /// Canonical URL without the `|version` suffix.
    pub fn canonical(self) -> &'static str {
        split_canonical(self.uri()).0
    }

    /// Version pinned in the URI, if any.
    pub fn version(self) -> Option<&'static str> {
        split_canonical(self.uri()).1
    }
}

impl fmt::Display for SdohProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SdohProfile {
    type Err = Error;

    /// Accepts the category name in any case, with or without separators
    /// (`ServiceRequest`, `service-request`, `SERVICE_REQUEST`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();

        SdohProfile::ALL
            .into_iter()
            .find(|p| p.name().to_ascii_lowercase() == wanted)
            .ok_or_else(|| Error::UnknownProfile(s.to_string()))
    }
}

/// Split `url|version` into its parts.
pub fn split_canonical(uri: &str) -> (&str, Option<&str>) {
    match uri.split_once('|') {
        Some((url, version)) => (url, Some(version)),
        None => (uri, None),
    }
}

/// Whether `resource.meta.profile` already lists `profile`.
pub fn has_profile(resource: &Value, profile: &str) -> bool {
    resource
        .get("meta")
        .and_then(|m| m.get("profile"))
        .and_then(Value::as_array)
        .is_some_and(|profiles| profiles.iter().any(|p| p.as_str() == Some(profile)))
}

/// Add `profile` to `resource.meta.profile`, creating `meta` and the list
/// when missing. Returns `false` when the profile was already present or
/// when the value, `meta` or `meta.profile` has the wrong JSON shape; nothing
/// is modified in that case.
pub fn ensure_profile(resource: &mut Value, profile: &str) -> bool {
    let Some(obj) = resource.as_object_mut() else {
        return false;
    };

    let Some(meta) = obj
        .entry("meta")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
    else {
        return false;
    };

    let Some(profiles) = meta
        .entry("profile")
        .or_insert_with(|| Value::Array(Vec::new()))
        .as_array_mut()
    else {
        return false;
    };

    if profiles.iter().any(|p| p.as_str() == Some(profile)) {
        return false;
    }
    profiles.push(Value::String(profile.to_string()));
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn constants_are_absolute_http_uris() {
        for profile in SdohProfile::ALL {
            let uri = profile.uri();
            assert!(!uri.is_empty());
            assert!(uri.starts_with("http://hl7.org/fhir/"), "{uri}");
            assert!(!uri.contains(char::is_whitespace), "{uri}");
        }
    }

    #[test]
    fn only_questionnaire_response_is_versioned() {
        for profile in SdohProfile::ALL {
            match profile {
                SdohProfile::QuestionnaireResponse => {
                    assert_eq!(profile.version(), Some("2.7"));
                    assert_eq!(
                        profile.canonical(),
                        "http://hl7.org/fhir/uv/sdc/StructureDefinition/sdc-questionnaireresponse"
                    );
                }
                other => {
                    assert_eq!(other.version(), None, "{other}");
                    assert!(!other.uri().contains('|'));
                }
            }
        }
    }

    #[test]
    fn uris_are_pairwise_distinct() {
        let unique: HashSet<&str> = SdohProfile::ALL.iter().map(|p| p.uri()).collect();
        assert_eq!(unique.len(), SdohProfile::ALL.len());
    }

    #[test]
    fn enum_matches_constants() {
        assert_eq!(SdohProfile::Consent.uri(), CONSENT);
        assert_eq!(SdohProfile::PatientTask.uri(), PATIENT_TASK);
        assert_eq!(
            CONSENT,
            "http://hl7.org/fhir/us/sdoh-clinicalcare/StructureDefinition/SDOHCC-Consent"
        );
    }

    #[test]
    fn patient_task_constrains_task() {
        assert_eq!(SdohProfile::PatientTask.base_resource_type(), ResourceType::Task);
        assert_eq!(SdohProfile::Task.base_resource_type(), ResourceType::Task);
        assert_eq!(SdohProfile::Consent.base_resource_type(), ResourceType::Consent);
    }

    #[test]
    fn parses_category_names_loosely() {
        assert_eq!("Consent".parse::<SdohProfile>().unwrap(), SdohProfile::Consent);
        assert_eq!(
            "service-request".parse::<SdohProfile>().unwrap(),
            SdohProfile::ServiceRequest
        );
        assert_eq!(
            "QUESTIONNAIRE_RESPONSE".parse::<SdohProfile>().unwrap(),
            SdohProfile::QuestionnaireResponse
        );
        assert!(matches!(
            "Observation".parse::<SdohProfile>(),
            Err(Error::UnknownProfile(_))
        ));
    }

    #[test]
    fn ensure_profile_creates_meta_and_is_idempotent() {
        let mut consent = json!({"resourceType": "Consent", "status": "active"});

        assert!(ensure_profile(&mut consent, CONSENT));
        assert!(!ensure_profile(&mut consent, CONSENT));
        assert!(has_profile(&consent, CONSENT));
        assert_eq!(consent["meta"]["profile"], json!([CONSENT]));
    }

    #[test]
    fn ensure_profile_keeps_existing_profiles() {
        let mut consent = json!({
            "resourceType": "Consent",
            "meta": {"versionId": "2", "profile": ["http://example.org/StructureDefinition/local-consent"]}
        });

        assert!(ensure_profile(&mut consent, CONSENT));
        assert_eq!(consent["meta"]["versionId"], "2");
        assert_eq!(
            consent["meta"]["profile"],
            json!(["http://example.org/StructureDefinition/local-consent", CONSENT])
        );
    }

    #[test]
    fn ensure_profile_leaves_malformed_meta_untouched() {
        let mut bad_meta = json!({"resourceType": "Consent", "meta": "v1"});
        assert!(!ensure_profile(&mut bad_meta, CONSENT));
        assert_eq!(bad_meta["meta"], "v1");

        let mut bad_profile = json!({"resourceType": "Consent", "meta": {"profile": CONSENT}});
        assert!(!ensure_profile(&mut bad_profile, CONSENT));
        assert_eq!(bad_profile["meta"]["profile"], CONSENT);
    }

    #[test]
    fn ensure_profile_ignores_non_objects() {
        let mut value = json!(["not", "a", "resource"]);
        assert!(!ensure_profile(&mut value, CONSENT));
        assert!(!has_profile(&value, CONSENT));
    }
}
