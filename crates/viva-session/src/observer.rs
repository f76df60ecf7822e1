use viva_core::Speaker;

/// Caller-facing event hooks, invoked synchronously from the handling path —
/// at most once per event, in delivery order. Implementations must not block.
pub trait SessionObserver: Send + Sync {
    /// RMS level of an outbound microphone frame.
    fn on_input_level(&self, _level: f32) {}

    /// Gain-adjusted RMS level of an inbound response buffer.
    fn on_response_level(&self, _level: f32) {}

    /// An incremental transcript fragment. Fragments are surfaced as they
    /// arrive; aggregation is the caller's job.
    fn on_transcript(&self, _text: &str, _speaker: Speaker) {}

    /// The session transitioned to closed from the remote side (close frame
    /// or transport failure). Reported at most once.
    fn on_closed(&self, _reason: &str) {}
}

/// Observer that drops every event.
pub struct NullObserver;

impl SessionObserver for NullObserver {}
