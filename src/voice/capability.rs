//! Injected speech capability interfaces
//!
//! A capability is either `Available` with an engine behind a trait object,
//! or `Unavailable`. Engine results come back asynchronously on a channel
//! the bridge hands to `start`/`speak`.

use crate::Result;
use crossbeam_channel::Sender;
use tracing::debug;

/// Results delivered by a speech-to-text engine
#[derive(Debug, Clone)]
pub enum RecognizerEvent {
    /// A finished transcript
    Transcript(String),
    /// Recognition failed; the capture is over
    Error(String),
}

/// Results delivered by a text-to-speech engine
#[derive(Debug, Clone)]
pub enum SynthesizerEvent {
    /// Playback ended
    Finished,
    /// Synthesis or playback failed
    Error(String),
}

/// A speech-to-text engine
pub trait Recognizer: Send {
    /// Begin a single capture. Results are delivered on `events`.
    fn start(&mut self, events: Sender<RecognizerEvent>) -> Result<()>;

    /// Stop an in-progress capture.
    fn stop(&mut self);
}

/// A text-to-speech engine
pub trait Synthesizer: Send {
    /// Speak `text`. A `Finished` event is delivered on `events` when
    /// playback ends.
    fn speak(&mut self, text: &str, events: Sender<SynthesizerEvent>) -> Result<()>;

    /// Cancel any in-progress playback.
    fn cancel(&mut self);
}

pub enum RecognizerCapability {
    Available(Box<dyn Recognizer>),
    Unavailable,
}

impl RecognizerCapability {
    pub fn is_available(&self) -> bool {
        matches!(self, RecognizerCapability::Available(_))
    }
}

pub enum SynthesizerCapability {
    Available(Box<dyn Synthesizer>),
    Unavailable,
}

impl SynthesizerCapability {
    pub fn is_available(&self) -> bool {
        matches!(self, SynthesizerCapability::Available(_))
    }
}

/// Recognizer that resolves instantly with a fixed transcript.
///
/// Stands in for a real engine in demos and environments without one, the
/// "simulated voice input" mode of the chat front-end.
pub struct SimulatedRecognizer {
    transcript: String,
}

impl SimulatedRecognizer {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
        }
    }
}

impl Default for SimulatedRecognizer {
    fn default() -> Self {
        Self::new("This is a simulated voice input.")
    }
}

impl Recognizer for SimulatedRecognizer {
    fn start(&mut self, events: Sender<RecognizerEvent>) -> Result<()> {
        let _ = events.send(RecognizerEvent::Transcript(self.transcript.clone()));
        Ok(())
    }

    fn stop(&mut self) {}
}

/// Synthesizer that "plays" instantly, for demos and engine-less setups.
pub struct SimulatedSynthesizer;

impl Synthesizer for SimulatedSynthesizer {
    fn speak(&mut self, text: &str, events: Sender<SynthesizerEvent>) -> Result<()> {
        debug!("simulated playback of {} chars", text.chars().count());
        let _ = events.send(SynthesizerEvent::Finished);
        Ok(())
    }

    fn cancel(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    #[test]
    fn test_simulated_recognizer_emits_transcript() {
        let (tx, rx) = unbounded();
        let mut recognizer = SimulatedRecognizer::new("hello there");
        recognizer.start(tx).unwrap();

        match rx.try_recv().unwrap() {
            RecognizerEvent::Transcript(text) => assert_eq!(text, "hello there"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_simulated_synthesizer_finishes_immediately() {
        let (tx, rx) = unbounded();
        let mut synthesizer = SimulatedSynthesizer;
        synthesizer.speak("anything", tx).unwrap();

        assert!(matches!(rx.try_recv().unwrap(), SynthesizerEvent::Finished));
    }

    #[test]
    fn test_capability_availability() {
        let available =
            RecognizerCapability::Available(Box::new(SimulatedRecognizer::default()));
        assert!(available.is_available());
        assert!(!RecognizerCapability::Unavailable.is_available());
        assert!(!SynthesizerCapability::Unavailable.is_available());
    }
}
