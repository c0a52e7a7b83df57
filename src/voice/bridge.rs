//! Listening/speaking state machine over the injected capabilities

use super::capability::{
    RecognizerCapability, RecognizerEvent, SynthesizerCapability, SynthesizerEvent,
};
use crate::{ConfabError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::debug;

/// Exactly one value at a time; listening and speaking are mutually
/// exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Idle,
    Listening,
    Speaking,
}

/// Events surfaced by the bridge after draining its capabilities
#[derive(Debug, Clone)]
pub enum VoiceEvent {
    /// A transcript arrived; the bridge is idle again
    Transcript(String),
    /// Recognition failed; the user may retry
    RecognitionFailed(String),
    /// Playback of a spoken reply ended
    SpeakingFinished,
    /// Synthesis or playback failed mid-reply
    SynthesisFailed(String),
}

pub struct VoiceBridge {
    recognizer: RecognizerCapability,
    synthesizer: SynthesizerCapability,
    state: VoiceState,
    recognizer_tx: Sender<RecognizerEvent>,
    recognizer_rx: Receiver<RecognizerEvent>,
    synthesizer_tx: Sender<SynthesizerEvent>,
    synthesizer_rx: Receiver<SynthesizerEvent>,
}

impl VoiceBridge {
    pub fn new(recognizer: RecognizerCapability, synthesizer: SynthesizerCapability) -> Self {
        let (recognizer_tx, recognizer_rx) = bounded(16);
        let (synthesizer_tx, synthesizer_rx) = bounded(16);
        Self {
            recognizer,
            synthesizer,
            state: VoiceState::Idle,
            recognizer_tx,
            recognizer_rx,
            synthesizer_tx,
            synthesizer_rx,
        }
    }

    /// Bridge with no capabilities at all; every voice request surfaces an
    /// unsupported error.
    pub fn unavailable() -> Self {
        Self::new(
            RecognizerCapability::Unavailable,
            SynthesizerCapability::Unavailable,
        )
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn can_listen(&self) -> bool {
        self.recognizer.is_available()
    }

    pub fn can_speak(&self) -> bool {
        self.synthesizer.is_available()
    }

    /// Begin a capture.
    ///
    /// A request while speaking is a no-op leaving the state unchanged. A
    /// missing capability is an error the caller surfaces as a notice.
    pub fn start_listening(&mut self) -> Result<()> {
        match self.state {
            VoiceState::Speaking => {
                debug!("listen request ignored while speaking");
                return Ok(());
            }
            VoiceState::Listening => return Ok(()),
            VoiceState::Idle => {}
        }
        match &mut self.recognizer {
            RecognizerCapability::Available(recognizer) => {
                recognizer.start(self.recognizer_tx.clone())?;
                self.state = VoiceState::Listening;
                Ok(())
            }
            RecognizerCapability::Unavailable => Err(ConfabError::VoiceUnsupported(
                "speech recognition".to_string(),
            )),
        }
    }

    /// Stop an in-progress capture.
    pub fn stop_listening(&mut self) {
        if self.state == VoiceState::Listening {
            if let RecognizerCapability::Available(recognizer) = &mut self.recognizer {
                recognizer.stop();
            }
            self.state = VoiceState::Idle;
        }
    }

    /// Speak a reply aloud. Only valid from idle; a request while listening
    /// is a no-op.
    pub fn speak(&mut self, text: &str) -> Result<()> {
        if self.state == VoiceState::Listening {
            debug!("speak request ignored while listening");
            return Ok(());
        }
        match &mut self.synthesizer {
            SynthesizerCapability::Available(synthesizer) => {
                synthesizer.speak(text, self.synthesizer_tx.clone())?;
                self.state = VoiceState::Speaking;
                Ok(())
            }
            SynthesizerCapability::Unavailable => Err(ConfabError::VoiceUnsupported(
                "speech synthesis".to_string(),
            )),
        }
    }

    /// Cancel in-progress playback.
    pub fn cancel_speaking(&mut self) {
        if self.state == VoiceState::Speaking {
            if let SynthesizerCapability::Available(synthesizer) = &mut self.synthesizer {
                synthesizer.cancel();
            }
            self.state = VoiceState::Idle;
        }
    }

    /// Drain capability results, updating the state as they land.
    pub fn poll(&mut self) -> Vec<VoiceEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.recognizer_rx.try_recv() {
            self.state = VoiceState::Idle;
            match event {
                RecognizerEvent::Transcript(text) => events.push(VoiceEvent::Transcript(text)),
                RecognizerEvent::Error(error) => {
                    events.push(VoiceEvent::RecognitionFailed(error))
                }
            }
        }
        while let Ok(event) = self.synthesizer_rx.try_recv() {
            self.state = VoiceState::Idle;
            match event {
                SynthesizerEvent::Finished => events.push(VoiceEvent::SpeakingFinished),
                SynthesizerEvent::Error(error) => events.push(VoiceEvent::SynthesisFailed(error)),
            }
        }
        events
    }

    /// Release both capabilities: stop recognition, cancel playback.
    pub fn shutdown(&mut self) {
        self.stop_listening();
        self.cancel_speaking();
    }
}

impl Drop for VoiceBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}
