//! Speech engine capability.
//!
//! The queue never talks to an audio stack directly. It is handed an
//! `Option<Arc<dyn SpeechEngine>>` at startup; `None` means the display runs
//! silently and the visual sequence is unchanged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, info};

/// Errors reported by a speech engine.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SpeechError {
    /// Playback started and failed.
    #[error("Speech playback failed: {0}")]
    Playback(String),

    /// Playback was cut short by `cancel`.
    #[error("Speech interrupted")]
    Interrupted,
}

/// Voice parameters applied to every utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub locale: String,
    pub volume: f32,
    pub rate: f32,
    pub pitch: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            locale: "ko-KR".to_string(),
            volume: 0.8,
            rate: 0.9,
            pitch: 1.0,
        }
    }
}

/// A single piece of text to speak.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub locale: String,
    pub volume: f32,
    pub rate: f32,
    pub pitch: f32,
}

impl Utterance {
    pub fn new(text: impl Into<String>, voice: &VoiceSettings) -> Self {
        Self {
            text: text.into(),
            locale: voice.locale.clone(),
            volume: voice.volume,
            rate: voice.rate,
            pitch: voice.pitch,
        }
    }
}

/// Contract the queue needs from a text-to-speech engine.
///
/// `speak` resolves when playback ends or fails. The caller may drop the
/// future at any time; `cancel` must stop whatever the engine is playing.
#[async_trait]
pub trait SpeechEngine: Send + Sync + 'static {
    async fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError>;

    fn cancel(&self);

    fn name(&self) -> &str {
        "speech"
    }
}

/// Engine that writes utterances to the log and simulates playback time.
///
/// Used by the demo binary where no audio device is assumed. `cancel` cuts the
/// simulated playback short.
#[derive(Debug, Clone)]
pub struct TracingSpeech {
    per_char: Duration,
    cancelled: Arc<Notify>,
}

impl TracingSpeech {
    pub fn new(per_char: Duration) -> Self {
        Self {
            per_char,
            cancelled: Arc::new(Notify::new()),
        }
    }

    fn playback_time(&self, utterance: &Utterance) -> Duration {
        let chars = utterance.text.chars().count() as u32;
        let rate = if utterance.rate > 0.0 { utterance.rate } else { 1.0 };
        self.per_char.mul_f32(chars as f32 / rate)
    }
}

impl Default for TracingSpeech {
    fn default() -> Self {
        Self::new(Duration::from_millis(120))
    }
}

#[async_trait]
impl SpeechEngine for TracingSpeech {
    async fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError> {
        info!(text = %utterance.text, locale = %utterance.locale, "Speaking");
        tokio::select! {
            _ = tokio::time::sleep(self.playback_time(utterance)) => Ok(()),
            _ = self.cancelled.notified() => Err(SpeechError::Interrupted),
        }
    }

    fn cancel(&self) {
        debug!("Speech cancel requested");
        self.cancelled.notify_waiters();
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utterance_takes_voice_settings() {
        let voice = VoiceSettings::default();
        let utterance = Utterance::new("포장 십 이번 고객님", &voice);
        assert_eq!(utterance.locale, "ko-KR");
        assert_eq!(utterance.volume, 0.8);
        assert_eq!(utterance.rate, 0.9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracing_speech_simulates_playback() {
        let engine = TracingSpeech::new(Duration::from_millis(100));
        let voice = VoiceSettings { rate: 1.0, ..VoiceSettings::default() };
        let utterance = Utterance::new("abcd", &voice);

        let start = tokio::time::Instant::now();
        engine.speak(&utterance).await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(399) && elapsed <= Duration::from_millis(401));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tracing_speech_cancel_interrupts_playback() {
        let engine = TracingSpeech::new(Duration::from_secs(1));
        let utterance = Utterance::new("abcd", &VoiceSettings::default());

        let playing = tokio::spawn({
            let engine = engine.clone();
            async move { engine.speak(&utterance).await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        engine.cancel();

        assert_eq!(playing.await.unwrap(), Err(SpeechError::Interrupted));
    }
}
