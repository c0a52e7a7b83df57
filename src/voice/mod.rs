//! Voice bridge: speech-to-text and text-to-speech behind one component
//!
//! Speech engines are never discovered from the environment; they are
//! injected as capability values so the bridge behaves identically whether
//! a real engine, a simulated one, or nothing at all is present.

pub mod bridge;
pub mod capability;

pub use bridge::{VoiceBridge, VoiceEvent, VoiceState};
pub use capability::{
    Recognizer, RecognizerCapability, RecognizerEvent, SimulatedRecognizer, SimulatedSynthesizer,
    Synthesizer, SynthesizerCapability, SynthesizerEvent,
};
