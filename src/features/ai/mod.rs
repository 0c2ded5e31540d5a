//! # Feature: AI Companion Replies
//!
//! Conversational replies through an OpenAI-compatible chat completions
//! endpoint, degrading to a rule-based canned-response table whenever the
//! service is unconfigured or erroring. A reply is always produced; AI
//! failures never reach the patient as failures.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.4.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.2.0: AI-generated memory prompts with canned fallback
//! - 1.1.0: Context-aware canned responses (medication schedule, time of day)
//! - 1.0.0: Initial release with chat completions + keyword fallback

use chrono::{DateTime, Local, Timelike};
use log::{debug, warn};
use rand::seq::IndexedRandom;
use serde_json::json;

use crate::core::{Medication, PatientProfile};

/// Context handed to reply generation; everything is optional because the
/// companion keeps talking even before a caregiver finishes setup.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplyContext<'a> {
    pub profile: Option<&'a PatientProfile>,
    pub medications: &'a [Medication],
}

pub struct AiCompanion {
    http: reqwest::Client,
    api_url: String,
    model: String,
    api_key: Option<String>,
}

impl AiCompanion {
    pub fn new(api_url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        if api_key.is_none() {
            warn!("No AI API key configured, using canned fallback responses only");
        }
        AiCompanion {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
            model: model.into(),
            api_key,
        }
    }

    /// Generate a conversational reply. Never fails: any error on the remote
    /// path falls back to the canned-response table.
    pub async fn generate_response(&self, user_text: &str, ctx: ReplyContext<'_>) -> String {
        if self.api_key.is_some() {
            match self.request_completion(user_text, ctx).await {
                Ok(reply) => return reply,
                Err(e) => warn!("AI service error, falling back to canned response: {e}"),
            }
        }
        Self::fallback_response_at(user_text, ctx, Local::now())
    }

    async fn request_completion(
        &self,
        user_text: &str,
        ctx: ReplyContext<'_>,
    ) -> anyhow::Result<String> {
        let system_prompt = Self::build_system_prompt(ctx);
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_text },
            ],
        });

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(self.api_key.as_deref().unwrap_or_default())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("AI service returned status {}", response.status());
        }

        let payload: serde_json::Value = response.json().await?;
        let reply = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Unexpected AI response shape"))?
            .trim()
            .to_string();

        debug!("AI reply ({} chars)", reply.len());
        Ok(reply)
    }

    /// System prompt describing the companion role, enriched with whatever
    /// profile and medication context is available.
    fn build_system_prompt(ctx: ReplyContext<'_>) -> String {
        let mut prompt = String::from(
            "You are a compassionate AI companion for an elderly patient with \
             Alzheimer's disease. Provide emotional support, help with medication \
             reminders, and engage in gentle memory conversations. Keep responses \
             concise but warm (1-3 sentences), use simple and clear language, be \
             patient with repeated questions, redirect gently when the patient \
             seems confused, and avoid complex medical advice.",
        );

        if let Some(profile) = ctx.profile {
            prompt.push_str(&format!("\n\nPatient name: {}", profile.name));
            if let Some(age) = profile.age {
                prompt.push_str(&format!("\nAge: {age}"));
            }
            if !profile.family_members.is_empty() {
                let family: Vec<String> = profile
                    .family_members
                    .iter()
                    .map(|f| format!("{} ({})", f.name, f.relationship))
                    .collect();
                prompt.push_str(&format!("\nFamily: {}", family.join(", ")));
            }
            if !profile.personal_memories.is_empty() {
                prompt.push_str(&format!(
                    "\nPersonal memories: {}",
                    profile.personal_memories.join(", ")
                ));
            }
        }

        if !ctx.medications.is_empty() {
            prompt.push_str("\n\nCurrent medications:");
            for med in ctx.medications {
                let dosage = med
                    .dosage
                    .as_deref()
                    .map(|d| format!(" ({d})"))
                    .unwrap_or_default();
                prompt.push_str(&format!("\n- {} at {}{}", med.name, med.time, dosage));
            }
        }

        prompt
    }

    /// Keyword-matched canned response. Categories are checked in order:
    /// medication, pain, family, confusion, time, greeting, wellbeing, help,
    /// then a default supportive reply.
    pub fn fallback_response(user_text: &str, ctx: ReplyContext<'_>) -> String {
        Self::fallback_response_at(user_text, ctx, Local::now())
    }

    pub fn fallback_response_at(
        user_text: &str,
        ctx: ReplyContext<'_>,
        now: DateTime<Local>,
    ) -> String {
        let lower = user_text.to_lowercase();
        let name = ctx.profile.map(|p| p.name.as_str()).unwrap_or("");
        let addr = if name.is_empty() {
            String::new()
        } else {
            format!("{name}, ")
        };
        // ", Margaret" or nothing, for sentence-final address
        let who = if name.is_empty() {
            String::new()
        } else {
            format!(", {name}")
        };

        let contains_any =
            |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

        if contains_any(&["medication", "medicine", "pill", "take"]) {
            if let Some(next) = ctx.medications.first() {
                let count = ctx.medications.len();
                let plural = if count > 1 { "s" } else { "" };
                return format!(
                    "{addr}I see you have {count} medication{plural} scheduled. Your next one \
                     is {} at {}. It's important to take your medicines as prescribed.",
                    next.name, next.time
                );
            }
            return format!(
                "{addr}I understand you're asking about medication. Please speak with your \
                 caregiver about your medication schedule."
            );
        }

        if contains_any(&["hurt", "pain", "sick", "feel bad"]) {
            return format!(
                "{addr}I'm sorry you're not feeling well. Your comfort is important. Please \
                 let your caregiver know about any pain or discomfort so they can help you \
                 feel better."
            );
        }

        if contains_any(&["family", "daughter", "son", "wife", "husband", "children"]) {
            return format!(
                "{addr}your family loves you very much. They care about you deeply and want \
                 you to be comfortable and happy. You mean the world to them."
            );
        }

        if contains_any(&["confused", "remember", "forgot", "lost", "where am i"]) {
            return format!(
                "{addr}it's completely okay to feel confused sometimes. You're safe and cared \
                 for. I'm here with you, and you're not alone. Take a deep breath - everything \
                 is going to be alright."
            );
        }

        if contains_any(&["time", "day", "date"]) {
            let time_str = now.format("%-I:%M %p").to_string();
            let date_str = now.format("%A, %B %-d, %Y").to_string();
            return format!("{addr}it's {time_str} on {date_str}. You're doing well today.");
        }

        let is_greeting = contains_any(&["hello", "good morning", "good afternoon", "good evening"])
            || lower.split_whitespace().any(|w| w == "hi");
        if is_greeting {
            let greeting = match now.hour() {
                0..=11 => "Good morning",
                12..=16 => "Good afternoon",
                _ => "Good evening",
            };
            let hail = if name.is_empty() {
                greeting.to_string()
            } else {
                format!("{greeting} {name}")
            };
            return format!(
                "{hail}! It's wonderful to see you today. How are you feeling right now?"
            );
        }

        if contains_any(&["how are you", "feeling", "okay", "alright"]) {
            return format!(
                "Thank you for asking{who}. I'm here and ready to help you. More \
                 importantly, how are you feeling today? Is there anything I can do to make \
                 you more comfortable?"
            );
        }

        if contains_any(&["help", "need", "want", "can you"]) {
            return format!(
                "{addr}I'm here to help you in any way I can. I can remind you about \
                 medications, chat with you, or help you feel more comfortable. What would \
                 you like me to help you with?"
            );
        }

        format!(
            "I hear what you're saying{who}. Thank you for sharing that with me. I'm here \
             to listen and support you. Is there anything specific I can help you with right \
             now?"
        )
    }

    /// AI-generated personalized memory prompt, with a canned fallback.
    pub async fn generate_memory_prompt(&self, profile: &PatientProfile) -> String {
        if self.api_key.is_some() {
            let family: Vec<String> = profile
                .family_members
                .iter()
                .map(|f| format!("{} ({})", f.name, f.relationship))
                .collect();
            let request = format!(
                "Generate one gentle, personalized memory prompt for an elderly patient \
                 with Alzheimer's. Name: {}. Family: {}. Memories: {}. Keep it warm, \
                 simple, and comforting - a single short sentence.",
                profile.name,
                family.join(", "),
                profile.personal_memories.join(", ")
            );

            let ctx = ReplyContext {
                profile: Some(profile),
                medications: &[],
            };
            match self.request_completion(&request, ctx).await {
                Ok(prompt) => return prompt,
                Err(e) => warn!("AI memory prompt failed, using canned fallback: {e}"),
            }
        }
        Self::fallback_memory_prompt(profile)
    }

    fn fallback_memory_prompt(profile: &PatientProfile) -> String {
        let name = &profile.name;
        let prompts = [
            format!(
                "Hello {name}! Do you remember any happy times with your family? They think \
                 about you often."
            ),
            format!(
                "{name}, you have lived such a rich life. What's one thing that always makes \
                 you smile?"
            ),
            format!(
                "Good day, {name}! Your family loves you very much. Can you tell me about a \
                 favorite memory?"
            ),
        ];
        prompts
            .choose(&mut rand::rng())
            .cloned()
            .unwrap_or_else(|| format!("Hello {name}! I'm here with you today."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn profile() -> PatientProfile {
        PatientProfile {
            name: "Margaret".to_string(),
            ..Default::default()
        }
    }

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_fallback_medication_with_schedule() {
        let profile = profile();
        let meds = vec![Medication::new("Aspirin", "08:00")];
        let ctx = ReplyContext {
            profile: Some(&profile),
            medications: &meds,
        };

        let reply = AiCompanion::fallback_response_at("when do I take my pills?", ctx, noon());
        assert!(reply.contains("Margaret"));
        assert!(reply.contains("Aspirin"));
        assert!(reply.contains("08:00"));
    }

    #[test]
    fn test_fallback_medication_without_schedule() {
        let reply = AiCompanion::fallback_response_at(
            "I need my medicine",
            ReplyContext::default(),
            noon(),
        );
        assert!(reply.contains("speak with your caregiver"));
    }

    #[test]
    fn test_fallback_pain_category() {
        let reply =
            AiCompanion::fallback_response_at("my knee hurts", ReplyContext::default(), noon());
        assert!(reply.contains("sorry you're not feeling well"));
    }

    #[test]
    fn test_fallback_family_category() {
        let profile = profile();
        let ctx = ReplyContext {
            profile: Some(&profile),
            medications: &[],
        };
        let reply = AiCompanion::fallback_response_at("where is my daughter", ctx, noon());
        assert!(reply.contains("your family loves you very much"));
    }

    #[test]
    fn test_fallback_confusion_category() {
        let reply = AiCompanion::fallback_response_at(
            "I can't remember where am i",
            ReplyContext::default(),
            noon(),
        );
        assert!(reply.contains("okay to feel confused"));
    }

    #[test]
    fn test_fallback_time_category() {
        let reply = AiCompanion::fallback_response_at(
            "what day is it",
            ReplyContext::default(),
            noon(),
        );
        assert!(reply.contains("12:00 PM"));
        assert!(reply.contains("Monday, June 10, 2024"));
    }

    #[test]
    fn test_fallback_greeting_uses_hour() {
        let morning = Local.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap();
        let reply =
            AiCompanion::fallback_response_at("hello there", ReplyContext::default(), morning);
        assert!(reply.starts_with("Good morning"));

        let evening = Local.with_ymd_and_hms(2024, 6, 10, 19, 0, 0).unwrap();
        let reply =
            AiCompanion::fallback_response_at("hello there", ReplyContext::default(), evening);
        assert!(reply.starts_with("Good evening"));
    }

    #[test]
    fn test_fallback_default_category() {
        let profile = profile();
        let ctx = ReplyContext {
            profile: Some(&profile),
            medications: &[],
        };
        let reply = AiCompanion::fallback_response_at("the weather was nice", ctx, noon());
        assert!(reply.contains("I hear what you're saying, Margaret"));
    }

    #[test]
    fn test_category_order_medication_before_pain() {
        // "take" wins over "hurt" because medication is checked first
        let reply = AiCompanion::fallback_response_at(
            "it hurts to take them",
            ReplyContext::default(),
            noon(),
        );
        assert!(reply.contains("medication"));
    }

    #[test]
    fn test_system_prompt_includes_context() {
        let mut profile = profile();
        profile.age = Some(82);
        let meds = vec![Medication::new("Aspirin", "08:00").with_dosage("1 tablet")];
        let ctx = ReplyContext {
            profile: Some(&profile),
            medications: &meds,
        };

        let prompt = AiCompanion::build_system_prompt(ctx);
        assert!(prompt.contains("Margaret"));
        assert!(prompt.contains("Age: 82"));
        assert!(prompt.contains("Aspirin at 08:00 (1 tablet)"));
    }

    #[tokio::test]
    async fn test_no_api_key_uses_fallback() {
        let ai = AiCompanion::new("http://localhost:9/never", "test-model", None);
        let reply = ai.generate_response("hello", ReplyContext::default()).await;
        assert!(!reply.is_empty());
        assert!(reply.contains("wonderful to see you today"));
    }

    #[test]
    fn test_fallback_memory_prompt_mentions_name() {
        let prompt = AiCompanion::fallback_memory_prompt(&profile());
        assert!(prompt.contains("Margaret"));
    }
}
