//! Single-threaded coordination loop.
//!
//! The dispatcher is the only place that mutates the transcript and the
//! presenter. Everything background workers want to tell it travels
//! through the response queue; the loop wakes on pushes (or a fallback
//! tick) and drains whatever is available with non-blocking pops.

pub mod channel;
pub mod workers;

pub use channel::{OutcomeSender, ResponseQueue, WorkerEvent};
pub use workers::WorkerSet;

use crate::ai::client::{AiClient, ChatSession};
use crate::ai::worker::spawn_generation;
use crate::config::CompanionConfig;
use crate::speech::capture::{spawn_capture, CaptureLimits, Microphone, Transcriber};
use crate::speech::tts::{spawn_speak, Speaker};
use crate::transcript::{Transcript, Turn};
use crate::{CompanionError, Result};
use crossbeam_channel::{select, unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// User-originated events fed into the loop.
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// Typed text was submitted.
    SubmitText(String),

    /// The user asked to start voice input.
    StartVoice,

    /// The user toggled speech synthesis.
    ToggleTts,

    /// The user closed the application.
    Shutdown,
}

/// Narrow interface to the presentation layer. Called only from the
/// loop thread.
pub trait Presenter: Send {
    fn append_turn(&mut self, turn: &Turn);
    fn set_listening_indicator(&mut self, visible: bool);
    fn set_tts_button_label(&mut self, label: &str);
}

/// External collaborators wired in at startup.
pub struct Collaborators {
    pub presenter: Box<dyn Presenter>,
    pub ai: Box<dyn AiClient>,
    pub microphone: Option<Arc<dyn Microphone>>,
    pub transcriber: Option<Arc<dyn Transcriber>>,
    pub speaker: Option<Arc<dyn Speaker>>,
}

/// Handle for feeding events into a running dispatcher.
#[derive(Clone)]
pub struct DispatcherHandle {
    events_tx: Sender<UiEvent>,
    transcript: Transcript,
}

impl DispatcherHandle {
    pub fn send(&self, event: UiEvent) -> Result<()> {
        self.events_tx
            .send(event)
            .map_err(|e| CompanionError::ChannelError(format!("dispatcher gone: {e}")))
    }

    pub fn submit_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(UiEvent::SubmitText(text.into()))
    }

    pub fn start_voice(&self) -> Result<()> {
        self.send(UiEvent::StartVoice)
    }

    pub fn toggle_tts(&self) -> Result<()> {
        self.send(UiEvent::ToggleTts)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(UiEvent::Shutdown)
    }

    /// Shared view of the conversation transcript.
    pub fn transcript(&self) -> Transcript {
        self.transcript.clone()
    }
}

/// The coordination loop.
pub struct Dispatcher {
    config: CompanionConfig,
    presenter: Box<dyn Presenter>,
    transcript: Transcript,
    session: Arc<ChatSession>,
    microphone: Option<Arc<dyn Microphone>>,
    transcriber: Option<Arc<dyn Transcriber>>,
    speaker: Option<Arc<dyn Speaker>>,
    tts_enabled: bool,
    capture_flag: Arc<AtomicBool>,
    responses: ResponseQueue,
    events_rx: Receiver<UiEvent>,
    workers: WorkerSet,
}

impl Dispatcher {
    pub fn new(config: CompanionConfig, collaborators: Collaborators) -> (Self, DispatcherHandle) {
        let (events_tx, events_rx) = unbounded();
        let transcript = Transcript::new();

        let handle = DispatcherHandle {
            events_tx,
            transcript: transcript.clone(),
        };

        let tts_enabled = config.tts.enabled_at_start && collaborators.speaker.is_some();

        let dispatcher = Self {
            config,
            presenter: collaborators.presenter,
            transcript,
            session: Arc::new(ChatSession::new(collaborators.ai)),
            microphone: collaborators.microphone,
            transcriber: collaborators.transcriber,
            speaker: collaborators.speaker,
            tts_enabled,
            capture_flag: Arc::new(AtomicBool::new(false)),
            responses: ResponseQueue::new(),
            events_rx,
            workers: WorkerSet::new(),
        };

        (dispatcher, handle)
    }

    /// Run until a shutdown event arrives or every handle is dropped.
    pub fn run(mut self) {
        info!("dispatch loop started");
        self.presenter.set_tts_button_label(&tts_label(self.tts_enabled));

        let events_rx = self.events_rx.clone();
        let responses_rx = self.responses.receiver().clone();
        let drain_interval = self.config.drain_interval;

        loop {
            select! {
                recv(events_rx) -> event => match event {
                    Ok(UiEvent::Shutdown) | Err(_) => break,
                    Ok(UiEvent::SubmitText(text)) => self.handle_typed_submission(text),
                    Ok(UiEvent::StartVoice) => self.start_voice(),
                    Ok(UiEvent::ToggleTts) => self.toggle_tts(),
                },
                recv(responses_rx) -> event => {
                    if let Ok(event) = event {
                        self.handle_worker_event(event);
                    }
                },
                default(drain_interval) => {}
            }

            self.drain();
        }

        self.shutdown();
        info!("dispatch loop stopped");
    }

    /// Drain everything currently queued. Appends and spawns nothing
    /// when the queue is empty.
    fn drain(&mut self) {
        while let Some(event) = self.responses.try_pop() {
            self.handle_worker_event(event);
        }
    }

    fn handle_worker_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Reply(text) => {
                self.append(Turn::assistant(text.clone()));
                if self.tts_enabled {
                    if let Some(speaker) = &self.speaker {
                        spawn_speak(&self.workers, Arc::clone(speaker), text);
                    }
                }
            }
            WorkerEvent::Notice(text) => {
                self.append(Turn::assistant(text));
            }
            WorkerEvent::Transcribed(text) => {
                // Voice input joins the same path as typed text.
                self.submit_text(text);
            }
            WorkerEvent::CaptureEnded => {
                self.presenter.set_listening_indicator(false);
            }
        }
    }

    /// Typed input is ignored while a voice capture is in progress; the
    /// capture's own transcription re-enters through `Transcribed`, which
    /// bypasses this gate (the flag may still be held when it drains).
    fn handle_typed_submission(&mut self, text: String) {
        if self.capture_flag.load(Ordering::Acquire) {
            debug!("capture in progress, ignoring typed submission");
            return;
        }
        self.submit_text(text);
    }

    fn submit_text(&mut self, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }

        self.append(Turn::user(text.clone()));
        spawn_generation(
            &self.workers,
            Arc::clone(&self.session),
            text,
            self.responses.sender(),
        );
    }

    fn start_voice(&mut self) {
        let (Some(microphone), Some(transcriber)) = (&self.microphone, &self.transcriber) else {
            debug!("voice input unavailable, ignoring start request");
            return;
        };

        let started = spawn_capture(
            &self.workers,
            Arc::clone(microphone),
            Arc::clone(transcriber),
            CaptureLimits::from(&self.config.speech),
            Arc::clone(&self.capture_flag),
            self.responses.sender(),
        );

        if started {
            self.presenter.set_listening_indicator(true);
        }
    }

    fn toggle_tts(&mut self) {
        self.tts_enabled = !self.tts_enabled;
        let label = tts_label(self.tts_enabled);
        let status = if self.tts_enabled { "On" } else { "Off" };
        info!(enabled = self.tts_enabled, "speech synthesis toggled");

        self.presenter.set_tts_button_label(&label);
        self.append(Turn::assistant(format!("Text-to-speech is now {status}.")));
    }

    fn append(&mut self, turn: Turn) {
        self.transcript.append(turn.clone());
        self.presenter.append_turn(&turn);
    }

    fn shutdown(&mut self) {
        if let Some(speaker) = &self.speaker {
            speaker.stop();
        }
        let abandoned = self.workers.drain(self.config.shutdown_grace);
        info!(abandoned, "dispatcher shut down");
    }
}

fn tts_label(enabled: bool) -> String {
    format!("TTS: {}", if enabled { "On" } else { "Off" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::client::ChatMessage;
    use parking_lot::Mutex;

    struct NullPresenter;

    impl Presenter for NullPresenter {
        fn append_turn(&mut self, _turn: &Turn) {}
        fn set_listening_indicator(&mut self, _visible: bool) {}
        fn set_tts_button_label(&mut self, _label: &str) {}
    }

    struct StaticClient(&'static str);

    impl AiClient for StaticClient {
        fn generate(&self, _history: &[ChatMessage]) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct LabelRecorder(Arc<Mutex<Vec<String>>>);

    impl Presenter for LabelRecorder {
        fn append_turn(&mut self, _turn: &Turn) {}
        fn set_listening_indicator(&mut self, _visible: bool) {}
        fn set_tts_button_label(&mut self, label: &str) {
            self.0.lock().push(label.to_string());
        }
    }

    fn collaborators(presenter: Box<dyn Presenter>) -> Collaborators {
        Collaborators {
            presenter,
            ai: Box::new(StaticClient("ok")),
            microphone: None,
            transcriber: None,
            speaker: None,
        }
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let (mut dispatcher, _handle) =
            Dispatcher::new(CompanionConfig::default(), collaborators(Box::new(NullPresenter)));

        dispatcher.submit_text("   ".to_string());
        assert!(dispatcher.transcript.is_empty());
        assert_eq!(dispatcher.workers.outstanding(), 0);
    }

    #[test]
    fn test_typed_input_ignored_during_capture() {
        let (mut dispatcher, _handle) =
            Dispatcher::new(CompanionConfig::default(), collaborators(Box::new(NullPresenter)));

        dispatcher.capture_flag.store(true, Ordering::Release);
        dispatcher.handle_typed_submission("2+2".to_string());
        assert!(dispatcher.transcript.is_empty());

        dispatcher.capture_flag.store(false, Ordering::Release);
        dispatcher.handle_typed_submission("2+2".to_string());
        assert_eq!(dispatcher.transcript.len(), 1);
    }

    #[test]
    fn test_drain_on_empty_queue_appends_nothing() {
        let (mut dispatcher, _handle) =
            Dispatcher::new(CompanionConfig::default(), collaborators(Box::new(NullPresenter)));

        dispatcher.drain();
        dispatcher.drain();
        assert!(dispatcher.transcript.is_empty());
    }

    #[test]
    fn test_start_voice_without_collaborators_is_noop() {
        let (mut dispatcher, _handle) =
            Dispatcher::new(CompanionConfig::default(), collaborators(Box::new(NullPresenter)));

        dispatcher.start_voice();
        assert_eq!(dispatcher.workers.outstanding(), 0);
    }

    #[test]
    fn test_tts_disabled_without_speaker() {
        let (dispatcher, _handle) =
            Dispatcher::new(CompanionConfig::default(), collaborators(Box::new(NullPresenter)));
        assert!(!dispatcher.tts_enabled);
    }

    #[test]
    fn test_toggle_updates_label_and_appends_status() {
        let labels = Arc::new(Mutex::new(Vec::new()));
        let (mut dispatcher, _handle) = Dispatcher::new(
            CompanionConfig::default(),
            collaborators(Box::new(LabelRecorder(Arc::clone(&labels)))),
        );

        dispatcher.toggle_tts();
        let turns = dispatcher.transcript.get_all();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].text, "Text-to-speech is now On.");
        assert_eq!(labels.lock().as_slice(), &["TTS: On".to_string()]);

        dispatcher.toggle_tts();
        let turns = dispatcher.transcript.get_all();
        assert_eq!(turns[1].text, "Text-to-speech is now Off.");
    }
}
