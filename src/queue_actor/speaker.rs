//! Single-slot speech driver used by the queue actor.
//!
//! At most one utterance is in flight. Starting a new one aborts the previous
//! task, cancels the engine, and waits the cancel grace delay before speaking.
//! The same grace applies after an explicit [`Speaker::cancel`]: the next
//! utterance starts no earlier than `cancel_delay` after the engine was told to
//! stop.
//! Every utterance is bounded by the watchdog, so a silent engine cannot hold
//! the slot forever. Results come back through `next_report`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use crate::announcement::announcement_text;
use crate::config::TimingConfig;
use crate::model::NotificationItem;
use crate::speech::{SpeechEngine, SpeechError, Utterance, VoiceSettings};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SpeechOutcome {
    Finished,
    Failed(SpeechError),
    TimedOut,
}

#[derive(Debug)]
pub(crate) struct SpeechReport {
    pub generation: u64,
    pub item_id: Uuid,
    pub call: u8,
    pub outcome: SpeechOutcome,
}

struct SpeechSlot {
    generation: u64,
    handle: JoinHandle<()>,
}

pub(crate) struct Speaker {
    engine: Option<Arc<dyn SpeechEngine>>,
    voice: VoiceSettings,
    cancel_delay: Duration,
    watchdog: Duration,
    slot: Option<SpeechSlot>,
    generation: u64,
    /// When the engine was last told to stop.
    cancelled_at: Option<Instant>,
    reports_tx: mpsc::UnboundedSender<SpeechReport>,
    reports_rx: mpsc::UnboundedReceiver<SpeechReport>,
}

impl Speaker {
    pub fn new(
        engine: Option<Arc<dyn SpeechEngine>>,
        voice: VoiceSettings,
        timing: &TimingConfig,
    ) -> Self {
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        Self {
            engine,
            voice,
            cancel_delay: timing.speech_cancel_delay(),
            watchdog: timing.speech_watchdog(),
            slot: None,
            generation: 0,
            cancelled_at: None,
            reports_tx,
            reports_rx,
        }
    }

    pub fn engine_name(&self) -> &str {
        self.engine.as_ref().map(|e| e.name()).unwrap_or("none")
    }

    pub fn is_active(&self) -> bool {
        self.slot.is_some()
    }

    /// Starts announcing `item`, replacing whatever is currently spoken.
    pub fn speak(&mut self, item: &NotificationItem) {
        let Some(engine) = self.engine.clone() else {
            debug!(item_id = %item.id, "No speech engine, skipping audio");
            return;
        };

        let interrupted = match self.slot.take() {
            Some(slot) => {
                slot.handle.abort();
                true
            }
            None => false,
        };
        let now = Instant::now();
        let speak_at = if interrupted {
            Some(now + self.cancel_delay)
        } else {
            self.cancelled_at
                .map(|at| at + self.cancel_delay)
                .filter(|at| *at > now)
        };

        self.generation += 1;
        let generation = self.generation;
        let item_id = item.id;
        let call = item.call_count;
        let utterance = Utterance::new(
            announcement_text(item.order_type, item.order_number),
            &self.voice,
        );
        let watchdog = self.watchdog;
        let reports = self.reports_tx.clone();

        let handle = tokio::spawn(async move {
            if interrupted {
                engine.cancel();
            }
            if let Some(at) = speak_at {
                tokio::time::sleep_until(at).await;
            }
            debug!(%item_id, call, text = %utterance.text, "Speech requested");
            let outcome = match tokio::time::timeout(watchdog, engine.speak(&utterance)).await {
                Ok(Ok(())) => SpeechOutcome::Finished,
                Ok(Err(e)) => SpeechOutcome::Failed(e),
                Err(_) => {
                    engine.cancel();
                    SpeechOutcome::TimedOut
                }
            };
            let _ = reports.send(SpeechReport {
                generation,
                item_id,
                call,
                outcome,
            });
        });

        if interrupted {
            self.cancelled_at = Some(now);
        }
        self.slot = Some(SpeechSlot { generation, handle });
    }

    /// Stops the in-flight utterance, if any.
    pub fn cancel(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.handle.abort();
            if let Some(engine) = &self.engine {
                engine.cancel();
                self.cancelled_at = Some(Instant::now());
            }
            debug!(generation = slot.generation, "Speech cancelled");
        }
    }

    pub async fn next_report(&mut self) -> Option<SpeechReport> {
        self.reports_rx.recv().await
    }

    /// Frees the slot if `report` belongs to the current utterance.
    ///
    /// Returns `false` for reports of utterances that were already replaced.
    pub fn settle(&mut self, report: &SpeechReport) -> bool {
        match &self.slot {
            Some(slot) if slot.generation == report.generation => {
                self.slot = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::mock::{RecordingSpeech, SpeechScript};
    use crate::model::{OrderNumber, OrderType};

    fn item(number: u16) -> NotificationItem {
        let mut item = NotificationItem::new(OrderType::Takeout, OrderNumber::new(number).unwrap());
        item.advance_call();
        item
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_frees_slot() {
        let engine = RecordingSpeech::new(SpeechScript::Finish(Duration::from_millis(500)));
        let mut speaker = Speaker::new(
            Some(engine.clone() as Arc<dyn SpeechEngine>),
            VoiceSettings::default(),
            &TimingConfig::default(),
        );

        speaker.speak(&item(3));
        assert!(speaker.is_active());

        let report = speaker.next_report().await.unwrap();
        assert_eq!(report.outcome, SpeechOutcome::Finished);
        assert!(speaker.settle(&report));
        assert!(!speaker.is_active());
        assert_eq!(engine.spoken_texts(), vec!["포장 삼번 고객님".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_resolves_stuck_engine() {
        let engine = RecordingSpeech::new(SpeechScript::Hang);
        let timing = TimingConfig::default();
        let mut speaker = Speaker::new(
            Some(engine.clone() as Arc<dyn SpeechEngine>),
            VoiceSettings::default(),
            &timing,
        );

        let start = tokio::time::Instant::now();
        speaker.speak(&item(3));
        let report = speaker.next_report().await.unwrap();

        assert_eq!(report.outcome, SpeechOutcome::TimedOut);
        assert_eq!(start.elapsed(), timing.speech_watchdog());
        assert_eq!(engine.cancel_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_utterance_replaces_old_one() {
        let engine = RecordingSpeech::new(SpeechScript::Finish(Duration::from_secs(3)));
        let mut speaker = Speaker::new(
            Some(engine.clone() as Arc<dyn SpeechEngine>),
            VoiceSettings::default(),
            &TimingConfig::default(),
        );

        speaker.speak(&item(1));
        tokio::time::sleep(Duration::from_millis(100)).await;
        speaker.speak(&item(2));

        let report = speaker.next_report().await.unwrap();
        assert_eq!(report.outcome, SpeechOutcome::Finished);
        assert!(speaker.settle(&report));
        // The first task was aborted before it could report
        assert_eq!(engine.cancel_count(), 1);
        assert_eq!(engine.spoken_texts().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_speaking_after_cancel_waits_grace_delay() {
        let engine = RecordingSpeech::new(SpeechScript::Finish(Duration::from_secs(5)));
        let timing = TimingConfig::default();
        let mut speaker = Speaker::new(
            Some(engine.clone() as Arc<dyn SpeechEngine>),
            VoiceSettings::default(),
            &timing,
        );

        let start = Instant::now();
        speaker.speak(&item(1));
        tokio::time::sleep(Duration::from_secs(1)).await;
        speaker.cancel();
        speaker.speak(&item(2));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.spoken_texts().len(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let offsets: Vec<_> = engine.spoken_at().iter().map(|at| *at - start).collect();
        assert_eq!(offsets, vec![Duration::ZERO, Duration::from_millis(1_200)]);
        assert_eq!(engine.cancel_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_long_ago_adds_no_delay() {
        let engine = RecordingSpeech::new(SpeechScript::Finish(Duration::from_secs(5)));
        let mut speaker = Speaker::new(
            Some(engine.clone() as Arc<dyn SpeechEngine>),
            VoiceSettings::default(),
            &TimingConfig::default(),
        );

        speaker.speak(&item(1));
        speaker.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let start = Instant::now();
        speaker.speak(&item(2));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(engine.spoken_at().last().copied(), Some(start));
    }

    #[tokio::test]
    async fn test_without_engine_nothing_is_spoken() {
        let mut speaker = Speaker::new(None, VoiceSettings::default(), &TimingConfig::default());
        speaker.speak(&item(9));
        assert!(!speaker.is_active());
        assert_eq!(speaker.engine_name(), "none");
    }
}
