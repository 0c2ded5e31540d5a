//! # Feature: Speech
//!
//! Text-to-speech output and streaming speech input seams. The scheduler
//! talks to [`SpeechGate`], which enforces at-most-one audible utterance:
//! a new request interrupts whatever is in progress (last-wins), and any
//! speech error is treated as "speech ended" so the speaking flag can
//! never deadlock.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.3.0
//! - **Toggleable**: true
//!
//! ## Changelog
//! - 1.1.0: Added LocalTts subprocess synthesizer
//! - 1.0.0: Initial release with SpeechOutput/SpeechInput traits and SpeechGate

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Converts text to audible speech. `speak` resolves when the utterance
/// finishes (or errors); `cancel` interrupts an in-progress utterance.
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    async fn speak(&self, text: &str) -> Result<()>;
    async fn cancel(&self);
}

/// One chunk of a streaming transcription.
#[derive(Debug, Clone)]
pub struct TranscriptChunk {
    pub text: String,
    pub is_final: bool,
}

/// Streaming speech capture. Interim and final chunks arrive on the channel
/// until `stop` is called.
#[async_trait]
pub trait SpeechInput: Send + Sync {
    async fn start(&self, chunks: mpsc::Sender<TranscriptChunk>) -> Result<()>;
    async fn stop(&self);
}

/// Serializes speech so at most one utterance is audible. The reminder and
/// memory timers can both want to speak near-simultaneously; the second
/// request cancels the first, which is the accepted trade-off.
pub struct SpeechGate {
    output: Arc<dyn SpeechOutput>,
    speaking: AtomicBool,
}

impl SpeechGate {
    pub fn new(output: Arc<dyn SpeechOutput>) -> Self {
        SpeechGate {
            output,
            speaking: AtomicBool::new(false),
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    /// Speak `text`, interrupting any in-progress utterance first. Errors
    /// from the sink are logged and treated as a completed utterance.
    pub async fn say(&self, text: &str) {
        if self.speaking.swap(true, Ordering::SeqCst) {
            debug!("Interrupting in-progress speech (last-wins)");
            self.output.cancel().await;
        }

        info!("Speaking: {text}");
        if let Err(e) = self.output.speak(text).await {
            // Treat as "speech ended" so the flag cannot wedge
            warn!("Speech output error (treated as ended): {e}");
        }

        self.speaking.store(false, Ordering::SeqCst);
    }

    /// Stop any in-flight speech, e.g. when the session ends.
    pub async fn shutdown(&self) {
        self.output.cancel().await;
        self.speaking.store(false, Ordering::SeqCst);
    }
}

/// Subprocess-backed synthesizer. Spawns a TTS command (espeak by default,
/// overridable via `TTS_COMMAND`) per utterance; cancel kills the child.
/// A missing binary degrades to log-only output rather than failing the
/// session.
pub struct LocalTts {
    command: String,
    child: Mutex<Option<tokio::process::Child>>,
}

impl LocalTts {
    pub fn new() -> Self {
        let command = std::env::var("TTS_COMMAND").unwrap_or_else(|_| "espeak".to_string());
        LocalTts {
            command,
            child: Mutex::new(None),
        }
    }
}

impl Default for LocalTts {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechOutput for LocalTts {
    async fn speak(&self, text: &str) -> Result<()> {
        // Slow rate and slightly raised volume suit elderly listeners
        let spawned = tokio::process::Command::new(&self.command)
            .args(["-s", "130", "-a", "180", text])
            .spawn();

        let child = match spawned {
            Ok(child) => child,
            Err(e) => {
                warn!(
                    "TTS command '{}' unavailable ({e}), utterance logged only",
                    self.command
                );
                return Ok(());
            }
        };

        *self.child.lock().await = Some(child);

        // Poll rather than wait() so cancel() can steal the handle mid-utterance
        loop {
            {
                let mut guard = self.child.lock().await;
                let Some(child) = guard.as_mut() else {
                    // Cancelled out from under us
                    return Ok(());
                };
                if let Some(status) = child.try_wait()? {
                    guard.take();
                    debug!("TTS process exited: {status}");
                    return Ok(());
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
    }

    async fn cancel(&self) {
        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(e) = child.kill().await {
                debug!("Failed to kill TTS process: {e}");
            }
        }
    }
}
