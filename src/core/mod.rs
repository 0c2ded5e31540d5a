//! # Core Module
//!
//! Core domain types and configuration for the companion.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Added ConversationEntry to types
//! - 1.0.0: Initial creation with config and types modules

pub mod config;
pub mod types;

// Re-export commonly used items
pub use config::Config;
pub use types::{
    ConversationEntry, DateKind, FamilyMember, ImportantDate, Medication, MemoryPrompt,
    PatientProfile, Preferences, PromptFrequency, PromptKind,
};
