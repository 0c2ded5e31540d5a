//! # Storage API Client
//!
//! REST client for the companion backend (Express + Mongo). Handles
//! caregiver auth, medication/profile/memory-prompt CRUD, conversation
//! logging, and analytics. Every authenticated call carries the bearer
//! token from login; a 401 clears the local session so the caller can
//! re-authenticate.
//!
//! Medication deletion is a *soft delete* server-side: the record is marked
//! inactive and drops out of scheduling while keeping its history.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Added analytics and health endpoints
//! - 1.1.0: Conversation logging
//! - 1.0.0: Initial release with auth + CRUD

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::{ConversationEntry, Medication, MemoryPrompt, PatientProfile};

/// The storage surface the scheduler and registry depend on. Kept narrow so
/// tests can substitute an in-memory implementation.
#[async_trait]
pub trait CompanionStore: Send + Sync {
    async fn fetch_medications(&self) -> Result<Vec<Medication>>;
    /// Persist an updated medication record (including reminder stamps).
    async fn update_medication(&self, med: &Medication) -> Result<Medication>;
    async fn fetch_profile(&self) -> Result<Option<PatientProfile>>;
    async fn fetch_memory_prompts(&self) -> Result<Vec<MemoryPrompt>>;
    /// Log one side of an AI conversation; failures are non-fatal.
    async fn log_conversation(&self, message: &str, context: &str) -> Result<()>;
}

#[derive(Debug, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: AuthUser,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsData {
    #[serde(default)]
    pub recent_conversations: Vec<ConversationEntry>,
    pub medication_count: u64,
    pub memory_prompt_count: u64,
    pub total_interactions: u64,
}

#[derive(Debug, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub database: String,
}

#[derive(Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct ConversationRequest<'a> {
    message: &'a str,
    context: &'a str,
}

#[derive(Deserialize)]
struct ConversationResponse {
    #[allow(dead_code)]
    response: String,
}

/// HTTP client for the companion REST API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        ApiClient {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: RwLock::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn bearer(&self) -> Result<String> {
        self.token
            .read()
            .await
            .clone()
            .ok_or_else(|| anyhow!("Not logged in"))
    }

    /// A 401 invalidates the local session: the stored token is cleared so
    /// the next call fails fast with "Not logged in".
    async fn check_auth(&self, status: StatusCode) -> Result<()> {
        if status == StatusCode::UNAUTHORIZED {
            warn!("Session token rejected (401), clearing local session");
            *self.token.write().await = None;
            return Err(anyhow!("Session expired"));
        }
        if !status.is_success() {
            return Err(anyhow!("API request failed with status {}", status));
        }
        Ok(())
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<AuthResponse> {
        let response = self
            .http
            .post(self.url("/auth/register"))
            .json(&Credentials { username, password })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Registration failed: {}", response.status()));
        }

        let auth: AuthResponse = response.json().await?;
        *self.token.write().await = Some(auth.token.clone());
        info!("Registered caregiver account '{}'", auth.user.username);
        Ok(auth)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthResponse> {
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&Credentials { username, password })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Login failed: {}", response.status()));
        }

        let auth: AuthResponse = response.json().await?;
        *self.token.write().await = Some(auth.token.clone());
        info!("Logged in as caregiver '{}'", auth.user.username);
        Ok(auth)
    }

    pub async fn logout(&self) {
        *self.token.write().await = None;
        info!("Logged out, session cleared");
    }

    pub async fn is_logged_in(&self) -> bool {
        self.token.read().await.is_some()
    }

    pub async fn create_medication(&self, med: &Medication) -> Result<Medication> {
        let response = self
            .http
            .post(self.url("/medications"))
            .bearer_auth(self.bearer().await?)
            .json(med)
            .send()
            .await?;
        self.check_auth(response.status()).await?;

        let created: Medication = response.json().await?;
        debug!("Created medication '{}' ({})", created.name, created.id);
        Ok(created)
    }

    /// Soft delete: the server flips `isActive` to false rather than
    /// removing the record.
    pub async fn delete_medication(&self, id: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("/medications/{id}")))
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;
        self.check_auth(response.status()).await?;

        debug!("Soft-deleted medication {id}");
        Ok(())
    }

    pub async fn save_profile(&self, profile: &PatientProfile) -> Result<PatientProfile> {
        let response = self
            .http
            .post(self.url("/profile"))
            .bearer_auth(self.bearer().await?)
            .json(profile)
            .send()
            .await?;
        self.check_auth(response.status()).await?;
        Ok(response.json().await?)
    }

    pub async fn create_memory_prompt(&self, prompt: &MemoryPrompt) -> Result<MemoryPrompt> {
        let response = self
            .http
            .post(self.url("/memory-prompts"))
            .bearer_auth(self.bearer().await?)
            .json(prompt)
            .send()
            .await?;
        self.check_auth(response.status()).await?;
        Ok(response.json().await?)
    }

    pub async fn delete_memory_prompt(&self, id: &str) -> Result<()> {
        let response = self
            .http
            .delete(self.url(&format!("/memory-prompts/{id}")))
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;
        self.check_auth(response.status()).await?;
        Ok(())
    }

    pub async fn analytics(&self) -> Result<AnalyticsData> {
        let response = self
            .http
            .get(self.url("/analytics"))
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;
        self.check_auth(response.status()).await?;
        Ok(response.json().await?)
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        let response = self.http.get(self.url("/health")).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("Health check failed: {}", response.status()));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl CompanionStore for ApiClient {
    async fn fetch_medications(&self) -> Result<Vec<Medication>> {
        let response = self
            .http
            .get(self.url("/medications"))
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;
        self.check_auth(response.status()).await?;

        let medications: Vec<Medication> = response.json().await?;
        debug!("Fetched {} medications", medications.len());
        Ok(medications)
    }

    async fn update_medication(&self, med: &Medication) -> Result<Medication> {
        let response = self
            .http
            .put(self.url(&format!("/medications/{}", med.id)))
            .bearer_auth(self.bearer().await?)
            .json(med)
            .send()
            .await?;
        self.check_auth(response.status()).await?;
        Ok(response.json().await?)
    }

    async fn fetch_profile(&self) -> Result<Option<PatientProfile>> {
        let response = self
            .http
            .get(self.url("/profile"))
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;

        // A missing profile is a normal state, not an error
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.check_auth(response.status()).await?;
        Ok(Some(response.json().await?))
    }

    async fn fetch_memory_prompts(&self) -> Result<Vec<MemoryPrompt>> {
        let response = self
            .http
            .get(self.url("/memory-prompts"))
            .bearer_auth(self.bearer().await?)
            .send()
            .await?;
        self.check_auth(response.status()).await?;
        Ok(response.json().await?)
    }

    async fn log_conversation(&self, message: &str, context: &str) -> Result<()> {
        let response = self
            .http
            .post(self.url("/conversation"))
            .bearer_auth(self.bearer().await?)
            .json(&ConversationRequest { message, context })
            .send()
            .await?;
        self.check_auth(response.status()).await?;

        let _: ConversationResponse = response.json().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_client_starts_logged_out() {
        let client = ApiClient::new("http://localhost:3001/api");
        assert!(!client.is_logged_in().await);
        assert!(client.bearer().await.is_err());
    }

    #[tokio::test]
    async fn test_401_clears_session() {
        let client = ApiClient::new("http://localhost:3001/api");
        *client.token.write().await = Some("stale-token".to_string());

        let result = client.check_auth(StatusCode::UNAUTHORIZED).await;
        assert!(result.is_err());
        assert!(!client.is_logged_in().await);
    }

    #[tokio::test]
    async fn test_check_auth_passes_success() {
        let client = ApiClient::new("http://localhost:3001/api");
        assert!(client.check_auth(StatusCode::OK).await.is_ok());
        assert!(client.check_auth(StatusCode::INTERNAL_SERVER_ERROR).await.is_err());
    }

    #[test]
    fn test_url_joins_paths() {
        let client = ApiClient::new("http://localhost:3001/api");
        assert_eq!(
            client.url("/medications"),
            "http://localhost:3001/api/medications"
        );
    }
}
