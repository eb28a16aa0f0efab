//! # Queue Actor
//!
//! The `QueueActor` owns the pending list and the item being announced, and
//! drives each item through its two call stages:
//!
//! ```text
//! enqueue ──► Pending ──► FirstCall ──(call interval)──► SecondCall ──(display duration)──► Completed
//!                          show + speak                   show + speak                    hide + complete
//! ```
//!
//! All state changes happen inside [`QueueActor::run`], one message or timer at
//! a time, so nothing here needs a lock. Timers are plain values stored with
//! the in-flight item; dropping the item drops its timer, which is how removal
//! and `clear` cancel a sequence.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::message::{EnqueueOutcome, QueueEvent, QueueEventKind, QueueRequest, RemoveOutcome};
use super::speaker::{SpeechOutcome, SpeechReport, Speaker};
use crate::config::TimingConfig;
use crate::framework::short_type_name;
use crate::model::{CallKey, NotificationItem, NotificationStatus, QueueStatus};
use crate::speech::{SpeechEngine, VoiceSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StageTimerKind {
    SecondCall,
    HidePopup,
}

/// Deadline for the next transition of a specific item.
#[derive(Debug, Clone, Copy)]
struct StageTimer {
    item_id: Uuid,
    kind: StageTimerKind,
    deadline: Instant,
}

struct InFlight {
    item: NotificationItem,
    timer: Option<StageTimer>,
    popup_visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Completion {
    /// Both calls ran and the popup timed out.
    Finished,
    /// Removal or administrative override cut the sequence short.
    Forced,
}

/// The single-flight, FIFO notification queue.
pub struct QueueActor {
    receiver: mpsc::Receiver<QueueRequest>,
    events: broadcast::Sender<QueueEvent>,
    timing: TimingConfig,
    voice: VoiceSettings,
    pending: VecDeque<NotificationItem>,
    current: Option<InFlight>,
    resume_at: Option<Instant>,
}

impl QueueActor {
    pub fn new(
        receiver: mpsc::Receiver<QueueRequest>,
        events: broadcast::Sender<QueueEvent>,
        timing: TimingConfig,
        voice: VoiceSettings,
    ) -> Self {
        Self {
            receiver,
            events,
            timing,
            voice,
            pending: VecDeque::new(),
            current: None,
            resume_at: None,
        }
    }

    /// Runs the actor's event loop until every client is dropped.
    ///
    /// # Context Injection
    /// The speech engine is handed in here rather than at construction, so the
    /// queue can be created before the audio stack is ready. `None` runs the
    /// visual sequence without audio.
    pub async fn run(mut self, speech: Option<Arc<dyn SpeechEngine>>) {
        let mut speaker = Speaker::new(speech, self.voice.clone(), &self.timing);
        info!(actor = short_type_name::<Self>(), speech = speaker.engine_name(), "Started");

        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                msg = self.receiver.recv() => match msg {
                    Some(msg) => self.handle_request(msg, &mut speaker),
                    None => break,
                },
                Some(report) = speaker.next_report() => self.handle_speech_report(report, &mut speaker),
                _ = sleep_until_deadline(deadline) => self.fire_due_timers(&mut speaker),
            }
        }

        speaker.cancel();
        info!(pending = self.pending.len(), in_flight = self.current.is_some(), "Shutdown");
    }

    // =========================================================================
    // Requests
    // =========================================================================

    fn handle_request(&mut self, msg: QueueRequest, speaker: &mut Speaker) {
        match msg {
            QueueRequest::Enqueue { key, respond_to } => {
                let outcome = self.enqueue(key, speaker);
                let _ = respond_to.send(outcome);
            }
            QueueRequest::Remove { key, respond_to } => {
                let outcome = self.remove(key, speaker);
                let _ = respond_to.send(outcome);
            }
            QueueRequest::MarkCurrentCompleted { respond_to } => {
                let completed = self.complete_current(Completion::Forced, speaker);
                if completed.is_none() {
                    debug!("Nothing to complete");
                }
                let _ = respond_to.send(completed);
            }
            QueueRequest::Clear { respond_to } => {
                self.clear(speaker);
                let _ = respond_to.send(());
            }
            QueueRequest::Status { respond_to } => {
                let _ = respond_to.send(self.status(speaker));
            }
        }
    }

    fn is_active(&self, key: &CallKey) -> bool {
        let in_pending = self
            .pending
            .iter()
            .any(|item| item.matches(key) && !item.is_completed());
        let in_flight = self
            .current
            .as_ref()
            .is_some_and(|f| f.item.matches(key) && !f.item.is_completed());
        in_pending || in_flight
    }

    fn enqueue(&mut self, key: CallKey, speaker: &mut Speaker) -> EnqueueOutcome {
        if self.is_active(&key) {
            debug!(%key, "Duplicate call ignored");
            return EnqueueOutcome::Duplicate;
        }

        let item = NotificationItem::new(key.order_type, key.order_number);
        let id = item.id;
        info!(%key, item_id = %id, pending = self.pending.len() + 1, "Enqueued");
        self.pending.push_back(item);

        if self.current.is_none() {
            self.process_next(speaker);
        }

        match self.pending.iter().position(|item| item.id == id) {
            Some(index) => {
                self.emit(QueueEventKind::StatusChanged, speaker);
                EnqueueOutcome::Queued { id, position: index + 1 }
            }
            None => EnqueueOutcome::Started { id },
        }
    }

    fn remove(&mut self, key: CallKey, speaker: &mut Speaker) -> RemoveOutcome {
        let before = self.pending.len();
        self.pending.retain(|item| !item.matches(&key));
        let removed_pending = before - self.pending.len();
        if removed_pending > 0 {
            info!(%key, removed_pending, "Removed from pending");
        }

        let current_matches = self
            .current
            .as_ref()
            .is_some_and(|f| f.item.matches(&key) && !f.item.is_completed());
        let cancelled_current = if current_matches {
            info!(%key, "Stopping in-flight announcement");
            self.complete_current(Completion::Forced, speaker).is_some()
        } else {
            false
        };

        if removed_pending > 0 && !cancelled_current {
            self.emit(QueueEventKind::StatusChanged, speaker);
        }
        if removed_pending == 0 && !cancelled_current {
            debug!(%key, "Nothing to remove");
        }

        RemoveOutcome {
            removed_pending,
            cancelled_current,
        }
    }

    /// Drops everything. A second call finds nothing and publishes nothing.
    fn clear(&mut self, speaker: &mut Speaker) {
        let was_speaking = speaker.is_active();
        speaker.cancel();
        let dropped_pending = self.pending.len();
        let dropped_current = self.current.take().is_some();
        self.pending.clear();
        let had_resume = self.resume_at.take().is_some();

        if dropped_pending == 0 && !dropped_current && !had_resume && !was_speaking {
            debug!("Queue already empty");
            return;
        }
        info!(dropped_pending, dropped_current, "Queue cleared");
        self.emit(QueueEventKind::HidePopup, speaker);
    }

    fn status(&self, speaker: &Speaker) -> QueueStatus {
        QueueStatus {
            is_processing: self.current.is_some(),
            pending_count: self.pending.len(),
            current_item: self.current.as_ref().map(|f| f.item.clone()),
            speech_active: speaker.is_active(),
        }
    }

    fn emit(&self, kind: QueueEventKind, speaker: &Speaker) {
        let event = QueueEvent {
            kind,
            status: self.status(speaker),
        };
        // No subscribers is fine; the display may not be attached yet
        let _ = self.events.send(event);
    }

    // =========================================================================
    // Stage driver
    // =========================================================================

    fn process_next(&mut self, speaker: &mut Speaker) {
        if self.current.is_some() {
            return;
        }
        let Some(mut item) = self.pending.pop_front() else {
            return;
        };
        self.resume_at = None;

        item.advance_call();
        let timer = StageTimer {
            item_id: item.id,
            kind: StageTimerKind::SecondCall,
            deadline: Instant::now() + self.timing.call_interval(),
        };
        self.current = Some(InFlight {
            item,
            timer: Some(timer),
            popup_visible: true,
        });
        self.announce(speaker);
    }

    /// Shows the popup for the current stage and speaks it.
    fn announce(&mut self, speaker: &mut Speaker) {
        let Some(flight) = &self.current else {
            return;
        };
        let item = flight.item.clone();
        info!(
            item_id = %item.id,
            order_type = %item.order_type,
            order_number = %item.order_number,
            call = item.call_count,
            "Call"
        );
        speaker.speak(&item);
        self.emit(QueueEventKind::ShowPopup(item), speaker);
    }

    fn second_call(&mut self, item_id: Uuid, speaker: &mut Speaker) {
        let Some(flight) = self.current.as_mut() else {
            return;
        };
        if flight.item.id != item_id || flight.item.status != NotificationStatus::FirstCall {
            warn!(%item_id, status = ?flight.item.status, "Stale second-call timer ignored");
            return;
        }

        flight.item.advance_call();
        flight.timer = Some(StageTimer {
            item_id,
            kind: StageTimerKind::HidePopup,
            deadline: Instant::now() + self.timing.display_duration(),
        });
        self.announce(speaker);
    }

    fn hide_and_complete(&mut self, item_id: Uuid, speaker: &mut Speaker) {
        let Some(flight) = self.current.as_ref() else {
            return;
        };
        if flight.item.id != item_id || flight.item.status != NotificationStatus::SecondCall {
            warn!(%item_id, status = ?flight.item.status, "Stale hide timer ignored");
            return;
        }
        self.complete_current(Completion::Finished, speaker);
    }

    /// Moves the current item to `completed` and releases it.
    ///
    /// Hide (if the popup is up) is always published before `Completed`.
    fn complete_current(&mut self, how: Completion, speaker: &mut Speaker) -> Option<NotificationItem> {
        let mut flight = self.current.take()?;
        flight.timer = None;

        if how == Completion::Forced {
            speaker.cancel();
        }
        if flight.popup_visible {
            self.emit(QueueEventKind::HidePopup, speaker);
        }

        flight.item.complete();
        info!(
            item_id = %flight.item.id,
            order_type = %flight.item.order_type,
            order_number = %flight.item.order_number,
            calls = flight.item.call_count,
            forced = how == Completion::Forced,
            "Completed"
        );

        if !self.pending.is_empty() {
            self.resume_at = Some(Instant::now() + self.timing.resume_delay());
        }
        self.emit(QueueEventKind::Completed(flight.item.clone()), speaker);
        Some(flight.item)
    }

    // =========================================================================
    // Timers
    // =========================================================================

    fn next_deadline(&self) -> Option<Instant> {
        let stage = self
            .current
            .as_ref()
            .and_then(|f| f.timer)
            .map(|t| t.deadline);
        match (stage, self.resume_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn fire_due_timers(&mut self, speaker: &mut Speaker) {
        let now = Instant::now();

        let due = self
            .current
            .as_mut()
            .and_then(|f| f.timer.take_if(|t| t.deadline <= now));
        if let Some(timer) = due {
            match timer.kind {
                StageTimerKind::SecondCall => self.second_call(timer.item_id, speaker),
                StageTimerKind::HidePopup => self.hide_and_complete(timer.item_id, speaker),
            }
        }

        if self.resume_at.is_some_and(|at| at <= now) {
            self.resume_at = None;
            self.process_next(speaker);
        }
    }

    fn handle_speech_report(&mut self, report: SpeechReport, speaker: &mut Speaker) {
        if !speaker.settle(&report) {
            debug!(item_id = %report.item_id, call = report.call, "Stale speech report");
            return;
        }
        match &report.outcome {
            SpeechOutcome::Finished => {
                debug!(item_id = %report.item_id, call = report.call, "Speech finished")
            }
            SpeechOutcome::Failed(e) => {
                warn!(item_id = %report.item_id, call = report.call, error = %e, "Speech failed")
            }
            SpeechOutcome::TimedOut => {
                warn!(item_id = %report.item_id, call = report.call, "Speech watchdog fired")
            }
        }
        self.emit(QueueEventKind::StatusChanged, speaker);
    }
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
