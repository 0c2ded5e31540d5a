//! # Core Domain Types
//!
//! Shared data model for medications, patient profiles, and memory prompts.
//! Field names serialize as camelCase to match the companion REST API, and
//! the Mongo `_id` is aliased onto `id` on deserialize.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Added ConversationEntry for AI interaction logging
//! - 1.0.0: Initial creation with Medication, PatientProfile, MemoryPrompt

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A scheduled medication. `time` is always `HH:MM` (24-hour); the engine
/// still parses it defensively because the value crosses the wire as a
/// plain string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    /// Time of day in HH:MM (24-hour) format
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// HH:MM of the last wall-clock minute a reminder fired for this
    /// medication. Suppresses re-alerting within that exact minute only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reminded_at: Option<String>,
    /// Soft-delete flag. Inactive medications keep their history but are
    /// excluded from all scheduling.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Medication {
    /// Create a new active medication with a locally generated id. The
    /// server replaces the id with its own on first save.
    pub fn new(name: impl Into<String>, time: impl Into<String>) -> Self {
        Medication {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            time: time.into(),
            dosage: None,
            notes: None,
            last_reminded_at: None,
            is_active: true,
        }
    }

    pub fn with_dosage(mut self, dosage: impl Into<String>) -> Self {
        self.dosage = Some(dosage.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// The single patient profile attached to a caregiver account.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default)]
    pub family_members: Vec<FamilyMember>,
    #[serde(default)]
    pub personal_memories: Vec<String>,
    #[serde(default)]
    pub important_dates: Vec<ImportantDate>,
    #[serde(default)]
    pub preferences: Preferences,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMember {
    pub name: String,
    pub relationship: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportantDate {
    pub date: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: DateKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateKind {
    Birthday,
    Anniversary,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite_food: Option<String>,
    #[serde(default)]
    pub hobbies: Vec<String>,
}

/// A caregiver-curated prompt consumed (never mutated) by the memory engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryPrompt {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PromptKind,
    pub content: String,
    pub frequency: PromptFrequency,
}

impl MemoryPrompt {
    pub fn new(kind: PromptKind, content: impl Into<String>, frequency: PromptFrequency) -> Self {
        MemoryPrompt {
            id: Uuid::new_v4().to_string(),
            kind,
            content: content.into(),
            frequency,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    Identity,
    Family,
    Memory,
    Routine,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptFrequency {
    Daily,
    Weekly,
    Occasional,
}

/// One logged AI interaction, mirrored to the conversation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEntry {
    pub patient_input: String,
    pub ai_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    /// Context tag: medication, memory, or general
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_medication_builder() {
        let med = Medication::new("Aspirin", "08:00")
            .with_dosage("1 tablet")
            .with_notes("with food");

        assert_eq!(med.name, "Aspirin");
        assert_eq!(med.time, "08:00");
        assert_eq!(med.dosage.as_deref(), Some("1 tablet"));
        assert_eq!(med.notes.as_deref(), Some("with food"));
        assert!(med.is_active);
        assert!(med.last_reminded_at.is_none());
        assert!(!med.id.is_empty());
    }

    #[test]
    fn test_medication_deserializes_mongo_id() {
        let json = r#"{"_id":"abc123","name":"Aspirin","time":"08:00"}"#;
        let med: Medication = serde_json::from_str(json).unwrap();

        assert_eq!(med.id, "abc123");
        assert!(med.is_active, "isActive should default to true");
    }

    #[test]
    fn test_medication_camel_case_round_trip() {
        let mut med = Medication::new("Lipitor", "21:30");
        med.last_reminded_at = Some("21:30".to_string());

        let json = serde_json::to_string(&med).unwrap();
        assert!(json.contains("lastRemindedAt"));
        assert!(json.contains("isActive"));

        let back: Medication = serde_json::from_str(&json).unwrap();
        assert_eq!(back, med);
    }

    #[test]
    fn test_prompt_kind_serializes_lowercase() {
        let prompt = MemoryPrompt::new(
            PromptKind::Memory,
            "your trip to the lake",
            PromptFrequency::Weekly,
        );
        let json = serde_json::to_string(&prompt).unwrap();

        assert!(json.contains(r#""type":"memory""#));
        assert!(json.contains(r#""frequency":"weekly""#));
    }

    #[test]
    fn test_profile_defaults_missing_collections() {
        let json = r#"{"name":"Margaret"}"#;
        let profile: PatientProfile = serde_json::from_str(json).unwrap();

        assert_eq!(profile.name, "Margaret");
        assert!(profile.age.is_none());
        assert!(profile.family_members.is_empty());
        assert!(profile.personal_memories.is_empty());
        assert!(profile.preferences.hobbies.is_empty());
    }
}
