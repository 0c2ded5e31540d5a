// Core layer - shared types and configuration
pub mod core;

// API layer - companion storage backend over HTTP
pub mod api;

// Features layer - all feature modules
pub mod features;

// Re-export core config and types for convenience
pub use core::{
    Config, ConversationEntry, FamilyMember, ImportantDate, Medication, MemoryPrompt,
    PatientProfile, Preferences, PromptFrequency, PromptKind,
};

// Re-export API surface
pub use api::{ApiClient, CompanionStore};

// Re-export feature items
pub use features::{
    // AI companion
    AiCompanion, ReplyContext,
    // Memory prompts
    MemoryEngine,
    // Reminders
    MedicationRegistry, ReminderEngine,
    // Scheduler
    SessionScheduler,
    // Speech
    LocalTts, SpeechGate, SpeechInput, SpeechOutput, TranscriptChunk,
};
