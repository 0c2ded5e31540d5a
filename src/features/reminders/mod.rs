//! # Feature: Medication Reminders
//!
//! Time-window due-ness evaluation, deterministic reminder text, and the
//! in-memory medication registry the scheduler persists through.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Late tolerance window for due checks (still due up to 2 minutes past)
//! - 1.1.0: MedicationRegistry with persistence-failure recovery
//! - 1.0.0: Initial release with due checks and reminder text generation

pub mod engine;
pub mod registry;

pub use engine::ReminderEngine;
pub use registry::MedicationRegistry;
