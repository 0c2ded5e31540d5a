// Feature modules - each is self-contained with its own engine and tests

pub mod ai;
pub mod memory;
pub mod reminders;
pub mod scheduler;
pub mod speech;

// Re-export the main feature types
pub use ai::{AiCompanion, ReplyContext};
pub use memory::MemoryEngine;
pub use reminders::{MedicationRegistry, ReminderEngine};
pub use scheduler::SessionScheduler;
pub use speech::{LocalTts, SpeechGate, SpeechInput, SpeechOutput, TranscriptChunk};
