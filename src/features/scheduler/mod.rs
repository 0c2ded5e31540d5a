//! # Feature: Session Scheduler
//!
//! Drives the reminder and memory engines on a cadence while a caregiver
//! session is active and routes everything they produce to speech.
//!
//! Cadences: reminder checks every 30 seconds plus one initial check 5
//! seconds after session start; an immediate re-check (debounced by 1
//! second) whenever the medication set changes; memory prompts every 5
//! minutes; a midnight timer that clears session-local reminder tracking.
//!
//! Polling at 30-second granularity with minute-string de-dup means a
//! reminder is missed if the process is down at the due minute. That is a
//! documented non-goal, not a bug.
//!
//! - **Version**: 1.3.0
//! - **Since**: 0.5.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.3.0: Session-local reminder stamps survive registry refreshes
//! - 1.2.0: Voice transcript handling with AI replies
//! - 1.1.0: Midnight reset timer
//! - 1.0.0: Initial release with reminder + memory cadences

use chrono::{Local, NaiveDateTime};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, sleep, Instant};

use crate::api::CompanionStore;
use crate::core::{MemoryPrompt, PatientProfile};
use crate::features::ai::{AiCompanion, ReplyContext};
use crate::features::memory::MemoryEngine;
use crate::features::reminders::{MedicationRegistry, ReminderEngine};
use crate::features::speech::{SpeechGate, TranscriptChunk};

/// First reminder check after entering the session.
const INITIAL_CHECK_DELAY: Duration = Duration::from_secs(5);
/// Settle time between a medication-set change and the triggered re-check.
const MEDS_CHANGE_DEBOUNCE: Duration = Duration::from_secs(1);

const NO_PROFILE_REPLY: &str =
    "I'm not sure who you are yet. Ask your caregiver to set up your profile.";

/// One companion session: constructed at login, dropped at logout. Owns its
/// timers; aborting [`SessionScheduler::run`] cancels everything pending.
pub struct SessionScheduler {
    engine: ReminderEngine,
    memory: MemoryEngine,
    registry: MedicationRegistry,
    profile: Option<PatientProfile>,
    prompts: Vec<MemoryPrompt>,
    store: Arc<dyn CompanionStore>,
    speech: Arc<SpeechGate>,
    ai: Arc<AiCompanion>,
    reminder_every: Duration,
    memory_every: Duration,
    /// Session-local stamps (medication id -> HH:MM). Guards against
    /// re-alerting when a registry refresh pulls back a record whose
    /// persisted stamp was lost to a storage failure. Cleared at midnight.
    session_stamps: HashMap<String, String>,
}

impl SessionScheduler {
    pub fn new(
        store: Arc<dyn CompanionStore>,
        speech: Arc<SpeechGate>,
        ai: Arc<AiCompanion>,
        reminder_every: Duration,
        memory_every: Duration,
    ) -> Self {
        SessionScheduler {
            engine: ReminderEngine::new(),
            memory: MemoryEngine::new(),
            registry: MedicationRegistry::new(),
            profile: None,
            prompts: Vec::new(),
            store,
            speech,
            ai,
            reminder_every,
            memory_every,
            session_stamps: HashMap::new(),
        }
    }

    /// Run the session until `shutdown` flips to true. Pending timers and
    /// in-flight speech are cancelled on the way out.
    pub async fn run(
        mut self,
        mut transcripts: mpsc::Receiver<TranscriptChunk>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!("Session started, loading data from storage");
        self.load_all().await;

        let mut reminder_ticks = interval_at(
            Instant::now() + INITIAL_CHECK_DELAY,
            self.reminder_every,
        );
        let mut memory_ticks = interval_at(Instant::now() + self.memory_every, self.memory_every);

        // Fires once after a detected medication-set change
        let mut recheck_at: Option<Instant> = None;

        loop {
            let recheck = async move {
                match recheck_at {
                    Some(deadline) => tokio::time::sleep_until(deadline).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                _ = reminder_ticks.tick() => {
                    if self.registry.refresh(self.store.as_ref()).await {
                        debug!("Medication set changed, scheduling debounced re-check");
                        recheck_at = Some(Instant::now() + MEDS_CHANGE_DEBOUNCE);
                    }
                    self.run_reminder_pass(Local::now().naive_local()).await;
                }
                _ = recheck => {
                    recheck_at = None;
                    self.run_reminder_pass(Local::now().naive_local()).await;
                }
                _ = memory_ticks.tick() => {
                    self.refresh_memory_sources().await;
                    self.run_memory_pass().await;
                }
                _ = sleep(ms_until_midnight(Local::now().naive_local())) => {
                    info!("Midnight: resetting session reminder tracking");
                    self.session_stamps.clear();
                }
                Some(chunk) = transcripts.recv() => {
                    if chunk.is_final {
                        self.handle_transcript(&chunk.text).await;
                    } else {
                        debug!("Interim transcript: {}", chunk.text);
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Session stopping, cancelling timers and speech");
        self.speech.shutdown().await;
    }

    async fn load_all(&mut self) {
        self.registry.refresh(self.store.as_ref()).await;
        self.refresh_memory_sources().await;
        info!(
            "Loaded {} medications, profile: {}, {} memory prompts",
            self.registry.len(),
            self.profile.is_some(),
            self.prompts.len()
        );
    }

    /// Reload profile and curated prompts, keeping prior state on error.
    async fn refresh_memory_sources(&mut self) {
        match self.store.fetch_profile().await {
            Ok(profile) => self.profile = profile,
            Err(e) => warn!("Failed to refresh patient profile, keeping prior: {e}"),
        }
        match self.store.fetch_memory_prompts().await {
            Ok(prompts) => self.prompts = prompts,
            Err(e) => warn!("Failed to refresh memory prompts, keeping prior: {e}"),
        }
    }

    /// One reminder evaluation at `now`: feed the engine the registry
    /// snapshot, speak every due medication, stamp and persist it.
    pub async fn run_reminder_pass(&mut self, now: NaiveDateTime) {
        self.engine.set_medications(self.registry.snapshot());

        let due = self.engine.check_all_due_at(now.time());
        if due.is_empty() {
            debug!(
                "No reminders due at {} ({} medications)",
                now.format("%H:%M"),
                self.registry.len()
            );
            return;
        }

        let hhmm = now.format("%H:%M").to_string();
        for med in due {
            if self.session_stamps.get(&med.id) == Some(&hhmm) {
                continue;
            }

            let text = self.engine.generate_reminder_text(&med);
            info!("Reminder due for '{}' at {hhmm}", med.name);
            self.speech.say(&text).await;

            self.session_stamps.insert(med.id.clone(), hhmm.clone());
            self.registry
                .mark_reminded(&med.id, &hhmm, self.store.as_ref())
                .await;
        }
    }

    /// Speak one memory prompt if a profile exists.
    pub async fn run_memory_pass(&mut self) {
        let Some(profile) = &self.profile else {
            debug!("No patient profile yet, skipping memory prompt");
            return;
        };

        let prompt = self.memory.generate_prompt(profile, &self.prompts);
        self.speech.say(&prompt).await;
    }

    /// Final voice transcript -> AI reply -> speech, with conversation
    /// logging. AI failures already degrade inside the companion; logging
    /// failures are only warnings.
    pub async fn handle_transcript(&mut self, transcript: &str) {
        info!("Voice input: {transcript}");

        if self.profile.is_none() {
            self.speech.say(NO_PROFILE_REPLY).await;
            return;
        }

        let medications = self.registry.snapshot();
        let reply = self
            .ai
            .generate_response(
                transcript,
                ReplyContext {
                    profile: self.profile.as_ref(),
                    medications: &medications,
                },
            )
            .await;

        if let Err(e) = self.store.log_conversation(transcript, "general").await {
            warn!("Failed to log conversation: {e}");
        }

        self.speech.say(&reply).await;
    }
}

/// Time remaining until the next local midnight.
pub fn ms_until_midnight(now: NaiveDateTime) -> Duration {
    let tomorrow = now
        .date()
        .succ_opt()
        .unwrap_or(now.date())
        .and_hms_opt(0, 0, 0)
        .unwrap_or(now);
    (tomorrow - now)
        .to_std()
        .unwrap_or(Duration::from_secs(24 * 60 * 60))
}
