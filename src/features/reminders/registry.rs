//! In-memory medication working set, refreshable from storage.
//!
//! The registry is the single source the scheduler feeds into the engine
//! each cycle. Storage failures never clear it: the prior state stays and
//! the next natural cycle retries.

use log::{debug, warn};

use crate::api::CompanionStore;
use crate::core::Medication;

#[derive(Debug, Default)]
pub struct MedicationRegistry {
    medications: Vec<Medication>,
}

impl MedicationRegistry {
    pub fn new() -> Self {
        MedicationRegistry {
            medications: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> Vec<Medication> {
        self.medications.clone()
    }

    pub fn len(&self) -> usize {
        self.medications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.medications.is_empty()
    }

    pub fn replace(&mut self, medications: Vec<Medication>) {
        self.medications = medications;
    }

    /// Reload the working set from storage. On error the prior in-memory
    /// state is kept and the reload is retried on the next cycle.
    /// Returns whether the set actually changed.
    pub async fn refresh(&mut self, store: &dyn CompanionStore) -> bool {
        match store.fetch_medications().await {
            Ok(medications) => {
                let changed = medications != self.medications;
                if changed {
                    debug!(
                        "Medication set refreshed: {} -> {} records",
                        self.medications.len(),
                        medications.len()
                    );
                }
                self.medications = medications;
                changed
            }
            Err(e) => {
                warn!("Failed to refresh medications, keeping prior set: {e}");
                false
            }
        }
    }

    /// Stamp a medication's `last_reminded_at` to `hhmm` and persist the
    /// record. The local update always sticks; a persistence failure is a
    /// recoverable warning (the stamp may not survive a restart).
    pub async fn mark_reminded(&mut self, id: &str, hhmm: &str, store: &dyn CompanionStore) {
        let Some(med) = self.medications.iter_mut().find(|m| m.id == id) else {
            warn!("mark_reminded: medication {id} not in registry");
            return;
        };

        med.last_reminded_at = Some(hhmm.to_string());
        let updated = med.clone();

        if let Err(e) = store.update_medication(&updated).await {
            warn!(
                "Failed to persist reminder stamp for '{}' - continuing with local state: {e}",
                updated.name
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::core::{MemoryPrompt, PatientProfile};

    /// In-memory store that can be switched into a failing mode.
    struct MemStore {
        medications: Mutex<Vec<Medication>>,
        failing: bool,
        updates: Mutex<Vec<Medication>>,
    }

    impl MemStore {
        fn with(medications: Vec<Medication>) -> Self {
            MemStore {
                medications: Mutex::new(medications),
                failing: false,
                updates: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            MemStore {
                medications: Mutex::new(Vec::new()),
                failing: true,
                updates: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompanionStore for MemStore {
        async fn fetch_medications(&self) -> Result<Vec<Medication>> {
            if self.failing {
                return Err(anyhow!("network down"));
            }
            Ok(self.medications.lock().unwrap().clone())
        }

        async fn update_medication(&self, med: &Medication) -> Result<Medication> {
            if self.failing {
                return Err(anyhow!("network down"));
            }
            self.updates.lock().unwrap().push(med.clone());
            Ok(med.clone())
        }

        async fn fetch_profile(&self) -> Result<Option<PatientProfile>> {
            Ok(None)
        }

        async fn fetch_memory_prompts(&self) -> Result<Vec<MemoryPrompt>> {
            Ok(Vec::new())
        }

        async fn log_conversation(&self, _message: &str, _context: &str) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_refresh_replaces_set() {
        let store = MemStore::with(vec![Medication::new("Aspirin", "08:00")]);
        let mut registry = MedicationRegistry::new();

        assert!(registry.refresh(&store).await);
        assert_eq!(registry.len(), 1);

        // Identical fetch reports no change
        assert!(!registry.refresh(&store).await);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_prior_state() {
        let mut registry = MedicationRegistry::new();
        registry.replace(vec![Medication::new("Aspirin", "08:00")]);

        let store = MemStore::failing();
        assert!(!registry.refresh(&store).await);
        assert_eq!(registry.len(), 1, "prior set must survive a failed refresh");
    }

    #[tokio::test]
    async fn test_mark_reminded_stamps_and_persists() {
        let med = Medication::new("Aspirin", "08:00");
        let id = med.id.clone();
        let store = MemStore::with(vec![]);

        let mut registry = MedicationRegistry::new();
        registry.replace(vec![med]);
        registry.mark_reminded(&id, "08:00", &store).await;

        assert_eq!(
            registry.snapshot()[0].last_reminded_at.as_deref(),
            Some("08:00")
        );
        let updates = store.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].last_reminded_at.as_deref(), Some("08:00"));
    }

    #[tokio::test]
    async fn test_mark_reminded_keeps_local_stamp_on_persist_failure() {
        let med = Medication::new("Aspirin", "08:00");
        let id = med.id.clone();
        let store = MemStore::failing();

        let mut registry = MedicationRegistry::new();
        registry.replace(vec![med]);
        registry.mark_reminded(&id, "08:00", &store).await;

        assert_eq!(
            registry.snapshot()[0].last_reminded_at.as_deref(),
            Some("08:00"),
            "local stamp must not roll back when persistence fails"
        );
    }
}
