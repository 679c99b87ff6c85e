//! FHIR R4 Consent model
//!
//! Core fields are typed; complex datatypes stay as JSON and anything else
//! lands in `extensions` so a read-modify-write cycle loses nothing.

use crate::resource::{FhirResource, Meta, ResourceType};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consent {
    /// Resource type - always "Consent"
    #[serde(
        default = "default_resource_type",
        deserialize_with = "deserialize_resource_type"
    )]
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    pub status: ConsentStatus,

    /// Which of the four areas this resource covers (CodeableConcept)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<Value>,

    /// Who the consent applies to (Reference(Patient))
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<Value>,

    /// When this Consent was created or indexed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policy: Vec<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_rule: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub provision: Option<Value>,

    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

fn default_resource_type() -> String {
    ResourceType::Consent.as_str().to_string()
}

fn deserialize_resource_type<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    if value != ResourceType::Consent.as_str() {
        return Err(de::Error::custom(format!(
            "expected resourceType \"Consent\", found {:?}",
            value
        )));
    }
    Ok(value)
}

/// Consent.status (required binding)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsentStatus {
    Draft,
    Proposed,
    Active,
    Rejected,
    Inactive,
    EnteredInError,
}

impl Consent {
    pub fn new(status: ConsentStatus) -> Self {
        Self {
            resource_type: default_resource_type(),
            id: None,
            meta: None,
            status,
            scope: None,
            category: Vec::new(),
            patient: None,
            date_time: None,
            policy: Vec::new(),
            policy_rule: None,
            provision: None,
            extensions: Map::new(),
        }
    }

    /// Patient reference string (`Patient/123`), if present.
    pub fn patient_reference(&self) -> Option<&str> {
        self.patient
            .as_ref()
            .and_then(|p| p.get("reference"))
            .and_then(Value::as_str)
    }
}

impl FhirResource for Consent {
    const RESOURCE_TYPE: ResourceType = ResourceType::Consent;

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn meta(&self) -> Option<&Meta> {
        self.meta.as_ref()
    }

    fn meta_mut(&mut self) -> &mut Option<Meta> {
        &mut self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "resourceType": "Consent",
            "id": "consent-1",
            "meta": {"profile": [profiles::CONSENT]},
            "status": "active",
            "scope": {"coding": [{"system": "http://terminology.hl7.org/CodeSystem/consentscope", "code": "patient-privacy"}]},
            "category": [{"coding": [{"system": "http://loinc.org", "code": "59284-0"}]}],
            "patient": {"reference": "Patient/smith"},
            "dateTime": "2024-03-01T10:00:00Z",
            "provision": {"type": "permit"},
            "sourceAttachment": {"contentType": "application/pdf", "title": "Signed consent"}
        })
    }

    #[test]
    fn parses_sdoh_consent() {
        let consent: Consent = serde_json::from_value(sample()).unwrap();

        assert_eq!(consent.id(), Some("consent-1"));
        assert_eq!(consent.status, ConsentStatus::Active);
        assert_eq!(consent.patient_reference(), Some("Patient/smith"));
        assert!(consent.has_profile(profiles::CONSENT));
        assert!(consent.extensions.contains_key("sourceAttachment"));
    }

    #[test]
    fn unknown_fields_survive_serialization() {
        let consent: Consent = serde_json::from_value(sample()).unwrap();
        let back = serde_json::to_value(&consent).unwrap();

        assert_eq!(back["sourceAttachment"]["title"], "Signed consent");
        assert_eq!(back["dateTime"], "2024-03-01T10:00:00Z");
        assert_eq!(back["resourceType"], "Consent");
    }

    #[test]
    fn other_resource_types_are_rejected() {
        let err = serde_json::from_value::<Consent>(
            json!({"resourceType": "Patient", "status": "active"}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Patient"), "{err}");

        let consent: Consent = serde_json::from_value(json!({"status": "active"})).unwrap();
        assert_eq!(consent.resource_type, "Consent");
    }

    #[test]
    fn unknown_fields_keep_document_order() {
        let consent: Consent = serde_json::from_value(json!({
            "resourceType": "Consent",
            "status": "active",
            "zeta": 1,
            "sourceReference": {"reference": "DocumentReference/1"},
            "alpha": 2
        }))
        .unwrap();

        let keys: Vec<&str> = consent.extensions.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "sourceReference", "alpha"]);
    }

    #[test]
    fn status_uses_fhir_codes() {
        assert_eq!(
            serde_json::to_value(ConsentStatus::EnteredInError).unwrap(),
            json!("entered-in-error")
        );
        let err = serde_json::from_value::<Consent>(json!({"resourceType": "Consent", "status": "unknown"}));
        assert!(err.is_err());
    }

    #[test]
    fn new_consent_gets_profile_on_demand() {
        let mut consent = Consent::new(ConsentStatus::Draft);
        assert!(!consent.has_profile(profiles::CONSENT));

        assert!(consent.ensure_profile(profiles::CONSENT));
        assert!(!consent.ensure_profile(profiles::CONSENT));

        let value = serde_json::to_value(&consent).unwrap();
        assert_eq!(value["meta"]["profile"], json!([profiles::CONSENT]));
        assert!(value.get("id").is_none());
        assert!(value.get("category").is_none());
    }
}
