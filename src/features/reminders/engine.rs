//! Due-ness evaluation and reminder text generation.
//!
//! The engine is a pure evaluator: it owns no timers and never touches the
//! clock on its own. Every clock-dependent operation has an `*_at` form that
//! takes an explicit simulated time; the plain form wraps `Local::now()`.
//! The scheduler drives it and persists the resulting state transitions.

use chrono::{Local, NaiveDateTime, NaiveTime, Timelike};
use log::warn;
use std::collections::HashSet;

use crate::core::Medication;

/// How many minutes past the exact scheduled minute a reminder is still
/// considered due. Covers clock drift between the 30-second poll ticks.
const LATE_TOLERANCE_MINUTES: i64 = 2;

/// Evaluates which medications are due and what to say about them.
///
/// Each medication is implicitly in one of two states per minute: *not yet
/// alerted this minute* or *alerted this minute*. The transition happens when
/// a due check fires and the caller writes the updated `last_reminded_at`
/// stamp back via [`ReminderEngine::set_medications`] on the next cycle.
#[derive(Debug, Clone, Default)]
pub struct ReminderEngine {
    medications: Vec<Medication>,
}

impl ReminderEngine {
    pub fn new() -> Self {
        ReminderEngine {
            medications: Vec::new(),
        }
    }

    /// Replace the working set the engine schedules against. The list is
    /// accepted as-is and overwrites any previous set.
    pub fn set_medications(&mut self, medications: Vec<Medication>) {
        self.medications = medications;
    }

    pub fn medications(&self) -> &[Medication] {
        &self.medications
    }

    /// Parse an `HH:MM` string defensively. Malformed entries are reported
    /// once per evaluation as a data-quality warning and treated as never due.
    fn parse_time(med: &Medication) -> Option<NaiveTime> {
        match NaiveTime::parse_from_str(&med.time, "%H:%M") {
            Ok(t) => Some(t),
            Err(_) => {
                warn!(
                    "Medication '{}' has malformed time '{}', skipping",
                    med.name, med.time
                );
                None
            }
        }
    }

    fn hhmm(time: NaiveTime) -> String {
        format!("{:02}:{:02}", time.hour(), time.minute())
    }

    /// Whether a medication is due within `window_minutes`, evaluated against
    /// the real clock.
    pub fn is_due_soon(&self, med: &Medication, window_minutes: i64) -> bool {
        self.is_due_soon_at(med, Local::now().time(), window_minutes)
    }

    /// Whether a medication is due within `window_minutes` of `now`.
    ///
    /// The scheduled time is interpreted as occurring *today*: no day
    /// rollover, so a time far in the past reads as "far away", not "due
    /// tomorrow". Tolerance policy: due when the signed minute difference
    /// (scheduled minus now) lies in `[-LATE_TOLERANCE_MINUTES, window]`,
    /// and the medication was not already reminded this exact minute.
    pub fn is_due_soon_at(&self, med: &Medication, now: NaiveTime, window_minutes: i64) -> bool {
        let Some(scheduled) = Self::parse_time(med) else {
            return false;
        };

        let diff_minutes = minutes_of(scheduled) - minutes_of(now);
        let already_reminded = med.last_reminded_at.as_deref() == Some(Self::hhmm(now).as_str());

        diff_minutes >= -LATE_TOLERANCE_MINUTES
            && diff_minutes <= window_minutes
            && !already_reminded
    }

    /// All active medications due right now: exact HH:MM matches unioned
    /// with anything inside a 1-minute [`ReminderEngine::is_due_soon`]
    /// window, de-duplicated by id.
    pub fn check_all_due_now(&self) -> Vec<Medication> {
        self.check_all_due_at(Local::now().time())
    }

    pub fn check_all_due_at(&self, now: NaiveTime) -> Vec<Medication> {
        let current = Self::hhmm(now);
        let mut seen = HashSet::new();
        let mut due = Vec::new();

        for med in self.medications.iter().filter(|m| m.is_active) {
            let already_reminded = med.last_reminded_at.as_deref() == Some(current.as_str());
            let exact_match = med.time == current && !already_reminded;

            if (exact_match || self.is_due_soon_at(med, now, 1)) && seen.insert(med.id.clone()) {
                due.push(med.clone());
            }
        }

        due
    }

    /// Deterministic reminder text for a medication. Same input always
    /// produces the identical string.
    pub fn generate_reminder_text(&self, med: &Medication) -> String {
        let mut message = format!("It's time for your {}", med.name);

        if let Some(dosage) = &med.dosage {
            message.push_str(&format!(". Please take {dosage}"));
        }

        if let Some(notes) = &med.notes {
            message.push_str(&format!(". Remember: {notes}"));
        }

        message.push_str(". Please take your medication now.");
        message
    }

    /// Active medications whose next occurrence (today, or tomorrow once the
    /// time has passed) falls within `hours_ahead` hours. Sorted ascending
    /// by scheduled (hour, minute), not by the projected datetime; ties keep
    /// original list order.
    pub fn get_upcoming(&self, hours_ahead: i64) -> Vec<Medication> {
        self.get_upcoming_at(Local::now().naive_local(), hours_ahead)
    }

    pub fn get_upcoming_at(&self, now: NaiveDateTime, hours_ahead: i64) -> Vec<Medication> {
        let mut upcoming: Vec<(NaiveTime, Medication)> = Vec::new();

        for med in self.medications.iter().filter(|m| m.is_active) {
            let Some(scheduled) = Self::parse_time(med) else {
                continue;
            };

            let mut occurrence = now.date().and_time(scheduled);
            if occurrence < now {
                occurrence += chrono::Duration::days(1);
            }

            let minutes_away = (occurrence - now).num_minutes();
            if minutes_away >= 0 && minutes_away <= hours_ahead * 60 {
                upcoming.push((scheduled, med.clone()));
            }
        }

        // Stable sort by the raw time-of-day, not the rolled-over datetime
        upcoming.sort_by_key(|(t, _)| (t.hour(), t.minute()));
        upcoming.into_iter().map(|(_, med)| med).collect()
    }

    /// The single active medication closest in the future (rolling to
    /// tomorrow when its time already passed today), or `None` when nothing
    /// is schedulable.
    pub fn get_next_reminder(&self) -> Option<Medication> {
        self.get_next_reminder_at(Local::now().time())
    }

    pub fn get_next_reminder_at(&self, now: NaiveTime) -> Option<Medication> {
        self.medications
            .iter()
            .filter(|m| m.is_active)
            .filter_map(|med| {
                let scheduled = Self::parse_time(med)?;
                let mut diff = minutes_of(scheduled) - minutes_of(now);
                if diff < 0 {
                    diff += 24 * 60;
                }
                Some((diff, med))
            })
            .min_by_key(|(diff, _)| *diff)
            .map(|(_, med)| med.clone())
    }

    /// One-line human-readable schedule: "{name} at {time}" for every active
    /// medication sorted by time-of-day.
    pub fn get_daily_schedule_summary(&self) -> String {
        let mut active: Vec<&Medication> = self.medications.iter().filter(|m| m.is_active).collect();

        if active.is_empty() {
            return "You have no medications scheduled today.".to_string();
        }

        // Malformed times sort to the end rather than aborting the summary
        active.sort_by_key(|med| {
            Self::parse_time(med)
                .map(|t| (t.hour(), t.minute()))
                .unwrap_or((u32::MAX, u32::MAX))
        });

        active
            .iter()
            .map(|med| format!("{} at {}", med.name, med.time))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn minutes_of(time: NaiveTime) -> i64 {
    i64::from(time.hour()) * 60 + i64::from(time.minute())
}
