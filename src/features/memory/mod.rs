//! # Feature: Memory Prompts
//!
//! Generates spoken memory prompts from patient identity, family, curated
//! memories, and time of day. Selection is uniform over the full candidate
//! pool; the RNG and the clock are injectable so tests can pin both.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Injectable RNG seam for deterministic tests
//! - 1.0.0: Initial release with four candidate pools + wellness/encouragement

use chrono::{Local, Timelike};
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::core::{MemoryPrompt, PatientProfile, PromptKind};

/// Spoken when the candidate pool is somehow empty. Routine prompts exist
/// for every hour, so this only fires on a logic regression.
const DEFAULT_GREETING: &str = "Hello! I'm here with you today. How are you feeling?";

const WELLNESS_CHECKS: &[&str] = &[
    "How are you feeling right now? Remember, I'm here to help.",
    "Have you had some water recently? Staying hydrated is important.",
    "Are you comfortable? Let me know if you need anything.",
    "Take a deep breath with me. In... and out. You're doing great.",
    "Remember, you are loved and cared for. You're not alone.",
];

const ENCOURAGEMENTS: &[&str] = &[
    "You are strong, capable, and loved.",
    "Every day is a gift, and you make it brighter.",
    "Your presence brings joy to those around you.",
    "You have touched so many lives in wonderful ways.",
    "You are valued, respected, and cherished.",
];

#[derive(Debug, Clone, Default)]
pub struct MemoryEngine;

impl MemoryEngine {
    pub fn new() -> Self {
        MemoryEngine
    }

    /// Pick one prompt uniformly at random from the full candidate pool for
    /// the current hour.
    pub fn generate_prompt(&self, profile: &PatientProfile, prompts: &[MemoryPrompt]) -> String {
        self.generate_prompt_with(
            &mut rand::rng(),
            Local::now().hour(),
            profile,
            prompts,
        )
    }

    /// RNG- and clock-injectable variant of [`MemoryEngine::generate_prompt`].
    pub fn generate_prompt_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        hour: u32,
        profile: &PatientProfile,
        prompts: &[MemoryPrompt],
    ) -> String {
        let candidates = self.candidate_prompts(hour, profile, prompts);

        candidates
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| DEFAULT_GREETING.to_string())
    }

    /// The full candidate pool: identity, family, personal-memory, and
    /// routine prompts concatenated in that order. Exposed so tests can
    /// assert membership instead of random output.
    pub fn candidate_prompts(
        &self,
        hour: u32,
        profile: &PatientProfile,
        prompts: &[MemoryPrompt],
    ) -> Vec<String> {
        let mut candidates = self.identity_prompts(profile);
        candidates.extend(self.family_prompts(profile));
        candidates.extend(self.personal_memory_prompts(prompts));
        candidates.extend(self.routine_prompts(hour));
        candidates
    }

    fn identity_prompts(&self, profile: &PatientProfile) -> Vec<String> {
        let mut prompts = Vec::new();

        if !profile.name.is_empty() {
            let name = &profile.name;
            prompts.push(format!("Hello {name}! It's wonderful to see you today."));
            prompts.push(format!("Good day, {name}. I hope you're feeling well."));
            prompts.push(format!("Hi there, {name}. You're looking great today!"));
        }

        if let Some(age) = profile.age {
            prompts.push(format!(
                "You have so much wisdom from your {age} years of life."
            ));
            prompts.push(format!(
                "At {age}, you've experienced so many wonderful things."
            ));
        }

        prompts
    }

    fn family_prompts(&self, profile: &PatientProfile) -> Vec<String> {
        let mut prompts = Vec::new();

        for member in &profile.family_members {
            let (name, rel) = (&member.name, &member.relationship);
            prompts.push(format!(
                "Do you remember {name}? They're your {rel} and they love you very much."
            ));
            prompts.push(format!("{name}, your {rel}, thinks about you often."));
            prompts.push(format!("Your {rel} {name} cares about you deeply."));
        }

        prompts
    }

    fn personal_memory_prompts(&self, prompts: &[MemoryPrompt]) -> Vec<String> {
        prompts
            .iter()
            .filter(|p| p.kind == PromptKind::Memory)
            .map(|p| {
                format!(
                    "Do you remember {}? That was such a special time.",
                    p.content
                )
            })
            .collect()
    }

    /// Fixed routine prompts bucketed by hour: [6,12) morning, [12,17)
    /// afternoon, [17,21) evening, everything else night.
    fn routine_prompts(&self, hour: u32) -> Vec<String> {
        let prompts: &[&str] = match hour {
            6..=11 => &[
                "Good morning! It's a beautiful day to start fresh.",
                "The morning sun is shining just for you today.",
                "What a lovely morning! I hope you slept well.",
            ],
            12..=16 => &[
                "Good afternoon! How has your day been so far?",
                "The afternoon is perfect for reflecting on happy memories.",
                "It's a peaceful afternoon. Take a moment to relax.",
            ],
            17..=20 => &[
                "Good evening! The day is winding down nicely.",
                "What a pleasant evening. Time to take things easy.",
                "The evening is here. Perfect time for some quiet reflection.",
            ],
            _ => &[
                "It's getting late. Time to rest and recharge.",
                "The night is peaceful. Sweet dreams await you.",
                "Time to wind down for the evening. You've had a good day.",
            ],
        };

        prompts.iter().map(|p| p.to_string()).collect()
    }

    pub fn wellness_check(&self) -> String {
        self.wellness_check_with(&mut rand::rng())
    }

    pub fn wellness_check_with<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        WELLNESS_CHECKS
            .choose(rng)
            .map(|s| s.to_string())
            .unwrap_or_else(|| DEFAULT_GREETING.to_string())
    }

    pub fn encouragement(&self) -> String {
        self.encouragement_with(&mut rand::rng())
    }

    pub fn encouragement_with<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        ENCOURAGEMENTS
            .choose(rng)
            .map(|s| s.to_string())
            .unwrap_or_else(|| DEFAULT_GREETING.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::core::{FamilyMember, PromptFrequency};

    fn profile() -> PatientProfile {
        PatientProfile {
            name: "Margaret".to_string(),
            age: Some(82),
            family_members: vec![FamilyMember {
                name: "Susan".to_string(),
                relationship: "daughter".to_string(),
                photo: None,
            }],
            personal_memories: vec!["the lake house".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_candidate_pool_contains_all_generators() {
        let engine = MemoryEngine::new();
        let prompts = vec![MemoryPrompt::new(
            PromptKind::Memory,
            "your wedding day",
            PromptFrequency::Weekly,
        )];

        let candidates = engine.candidate_prompts(9, &profile(), &prompts);

        // 3 identity name + 2 age + 3 family + 1 memory + 3 morning routine
        assert_eq!(candidates.len(), 12);
        assert!(candidates
            .iter()
            .any(|c| c.contains("Margaret") && c.contains("wonderful to see you")));
        assert!(candidates.iter().any(|c| c.contains("82 years")));
        assert!(candidates
            .iter()
            .any(|c| c.contains("Susan") && c.contains("daughter")));
        assert!(candidates
            .iter()
            .any(|c| c == "Do you remember your wedding day? That was such a special time."));
        assert!(candidates.iter().any(|c| c.contains("Good morning")));
    }

    #[test]
    fn test_non_memory_prompts_filtered_out() {
        let engine = MemoryEngine::new();
        let prompts = vec![
            MemoryPrompt::new(PromptKind::Identity, "you are Margaret", PromptFrequency::Daily),
            MemoryPrompt::new(PromptKind::Routine, "lunch at noon", PromptFrequency::Daily),
        ];

        let candidates = engine.candidate_prompts(9, &PatientProfile::default(), &prompts);
        assert!(!candidates.iter().any(|c| c.contains("you are Margaret")));
        assert!(!candidates.iter().any(|c| c.contains("lunch at noon")));
    }

    #[test]
    fn test_routine_hour_buckets() {
        let engine = MemoryEngine::new();
        let empty = PatientProfile::default();

        for (hour, marker) in [
            (6, "morning"),
            (11, "morning"),
            (12, "afternoon"),
            (16, "afternoon"),
            (17, "evening"),
            (20, "evening"),
            (21, "rest and recharge"),
            (2, "rest and recharge"),
        ] {
            let candidates = engine.candidate_prompts(hour, &empty, &[]);
            assert!(
                candidates.iter().any(|c| c.to_lowercase().contains(marker)),
                "hour {hour} should produce a {marker} prompt, got {candidates:?}"
            );
        }
    }

    #[test]
    fn test_selection_always_from_pool() {
        let engine = MemoryEngine::new();
        let mut rng = StdRng::seed_from_u64(7);
        let prompts = vec![];
        let profile = profile();

        let pool = engine.candidate_prompts(14, &profile, &prompts);
        for _ in 0..50 {
            let picked = engine.generate_prompt_with(&mut rng, 14, &profile, &prompts);
            assert!(pool.contains(&picked));
        }
    }

    #[test]
    fn test_empty_profile_still_returns_prompt() {
        // No name, no family, no memory prompts: routine pool still applies
        let engine = MemoryEngine::new();
        let mut rng = StdRng::seed_from_u64(1);

        let prompt =
            engine.generate_prompt_with(&mut rng, 3, &PatientProfile::default(), &[]);
        assert!(!prompt.is_empty());
    }

    #[test]
    fn test_wellness_and_encouragement_from_fixed_lists() {
        let engine = MemoryEngine::new();
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..20 {
            let check = engine.wellness_check_with(&mut rng);
            assert!(WELLNESS_CHECKS.contains(&check.as_str()));

            let boost = engine.encouragement_with(&mut rng);
            assert!(ENCOURAGEMENTS.contains(&boost.as_str()));
        }
    }
}
