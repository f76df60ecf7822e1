use async_trait::async_trait;
use tokio::sync::mpsc;
use viva_core::{EncodedChunk, SessionError};

/// Session configuration sent to the endpoint at setup.
#[derive(Debug, Clone)]
pub struct SessionSetup {
    pub model: String,
    pub voice: String,
    /// System persona text; the endpoint speaks in this role.
    pub persona: String,
    /// Rate of the outbound PCM stream, declared once at setup.
    pub input_sample_rate: u32,
}

/// One inbound message. Fields are independent; a single message may carry
/// any combination of them.
#[derive(Debug, Clone, Default)]
pub struct ServerMessage {
    /// Base64-encoded PCM fragment of the model's speech.
    pub audio: Option<String>,
    pub user_transcript: Option<String>,
    pub model_transcript: Option<String>,
    /// The model's in-progress speech should stop immediately.
    pub interrupted: bool,
}

#[derive(Debug)]
pub enum TransportEvent {
    Message(ServerMessage),
    /// The endpoint closed the session.
    Closed,
    /// Unrecoverable transport failure; the session is over.
    Error(String),
}

/// Live half of an established connection: FIFO audio out, ordered events in.
///
/// The sender only exists once the endpoint has acknowledged setup, so audio
/// cannot be queued (or silently dropped) before readiness.
pub struct TransportSession {
    pub audio: mpsc::UnboundedSender<EncodedChunk>,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

/// The logical bidirectional channel to the remote speech endpoint,
/// abstracted from its protocol.
#[async_trait]
pub trait Transport: Send {
    /// Establish the session. Resolves only after the endpoint reports
    /// ready; fails with [`SessionError::Connect`] otherwise.
    async fn connect(&mut self, setup: &SessionSetup) -> Result<TransportSession, SessionError>;

    /// Best-effort teardown; never fails.
    async fn close(&mut self);
}
