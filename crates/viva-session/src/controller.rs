use crate::observer::SessionObserver;
use crate::transport::{SessionSetup, Transport, TransportEvent, TransportSession};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use viva_audio::scheduler::PlaybackScheduler;
use viva_audio::{
    decode_payload, encode_pcm16, rms, rms_head, CaptureHandle, CaptureNode, OutputHandle,
    OutputNode,
};
use viva_core::{AppConfig, AudioFrame, SessionError, SessionState};

const STATE_IDLE: u8 = 0;
const STATE_CONNECTING: u8 = 1;
const STATE_OPEN: u8 = 2;
const STATE_CLOSED: u8 = 3;

fn state_from_u8(v: u8) -> SessionState {
    match v {
        STATE_CONNECTING => SessionState::Connecting,
        STATE_OPEN => SessionState::Open,
        STATE_CLOSED => SessionState::Closed,
        _ => SessionState::Idle,
    }
}

// ── SessionController ─────────────────────────────────────────

/// Owns one connection to the speech endpoint: capture → encode → transmit
/// on one side, receive → decode → meter → schedule on the other.
///
/// Lifecycle is Idle → Connecting → Open → Closed with no way back; build a
/// fresh controller to reconnect.
pub struct SessionController {
    config: AppConfig,
    transport: Option<Box<dyn Transport>>,
    observer: Arc<dyn SessionObserver>,
    state: Arc<AtomicU8>,
    capture: Option<CaptureNode>,
    capture_handle: Option<CaptureHandle>,
    output: Option<OutputNode>,
    output_handle: Option<OutputHandle>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl SessionController {
    pub fn new(
        config: AppConfig,
        transport: Box<dyn Transport>,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        Self {
            config,
            transport: Some(transport),
            observer,
            state: Arc::new(AtomicU8::new(STATE_IDLE)),
            capture: None,
            capture_handle: None,
            output: None,
            output_handle: None,
            tasks: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        state_from_u8(self.state.load(Ordering::Acquire))
    }

    /// Shared mute/health flag of the capture node; the caller that owns
    /// device state drives it, the session only reads audio.
    pub fn capture_handle(&self) -> Option<&CaptureHandle> {
        self.capture_handle.as_ref()
    }

    pub fn output_handle(&self) -> Option<&OutputHandle> {
        self.output_handle.as_ref()
    }

    /// Open the session against real audio devices.
    ///
    /// Capture and output streams are only built after the transport reports
    /// ready, so no audio is recorded, queued, or dropped before readiness.
    pub async fn connect(
        &mut self,
        input: &cpal::Device,
        output: &cpal::Device,
    ) -> Result<(), SessionError> {
        let session = self.open_transport().await?;

        let scheduler = PlaybackScheduler::new(self.config.audio.output_sample_rate);
        let frame_rx = match self.build_graph(input, output, &scheduler) {
            Ok(rx) => rx,
            Err(e) => {
                // The transport is up but the audio graph is not: tear the
                // session down on this exit path too
                if let Some(transport) = self.transport.as_mut() {
                    transport.close().await;
                }
                self.capture = None;
                self.capture_handle = None;
                self.output = None;
                self.output_handle = None;
                self.state.store(STATE_CLOSED, Ordering::Release);
                return Err(e.into());
            }
        };

        self.start_pipelines(session, frame_rx, scheduler);
        Ok(())
    }

    fn build_graph(
        &mut self,
        input: &cpal::Device,
        output: &cpal::Device,
        scheduler: &PlaybackScheduler,
    ) -> Result<mpsc::UnboundedReceiver<AudioFrame>, viva_core::AudioError> {
        let audio = self.config.audio.clone();
        let (output_node, output_handle) = OutputNode::new(
            output,
            scheduler.sink(),
            audio.output_sample_rate,
            audio.capture_buffer_size,
        )?;
        self.output = Some(output_node);
        self.output_handle = Some(output_handle);

        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (capture_node, capture_handle) = CaptureNode::new(
            input,
            audio.input_sample_rate,
            audio.capture_buffer_size,
            frame_tx,
        )?;
        self.capture = Some(capture_node);
        self.capture_handle = Some(capture_handle);
        Ok(frame_rx)
    }

    /// Open the session against caller-provided capture frames and playback
    /// scheduler instead of real devices. `connect` builds on this seam; it
    /// is also the headless path for tests.
    pub async fn connect_with(
        &mut self,
        frames: mpsc::UnboundedReceiver<AudioFrame>,
        scheduler: PlaybackScheduler,
    ) -> Result<(), SessionError> {
        let session = self.open_transport().await?;
        self.start_pipelines(session, frames, scheduler);
        Ok(())
    }

    /// Idle → Connecting and transport setup. On failure the controller is
    /// Closed and must be discarded.
    async fn open_transport(&mut self) -> Result<TransportSession, SessionError> {
        let current = self.state.load(Ordering::Acquire);
        if current != STATE_IDLE {
            return Err(SessionError::InvalidState(match state_from_u8(current) {
                SessionState::Connecting => "connecting",
                SessionState::Open => "open",
                SessionState::Closed => "closed",
                SessionState::Idle => "idle",
            }));
        }
        self.state.store(STATE_CONNECTING, Ordering::Release);

        let setup = SessionSetup {
            model: self.config.session.model.clone(),
            voice: self.config.session.voice.clone(),
            persona: self.config.session.persona.clone(),
            input_sample_rate: self.config.audio.input_sample_rate,
        };
        let transport = self
            .transport
            .as_mut()
            .expect("transport present until close");
        match transport.connect(&setup).await {
            Ok(session) => Ok(session),
            Err(e) => {
                self.state.store(STATE_CLOSED, Ordering::Release);
                Err(e)
            }
        }
    }

    fn start_pipelines(
        &mut self,
        session: TransportSession,
        mut frames: mpsc::UnboundedReceiver<AudioFrame>,
        mut scheduler: PlaybackScheduler,
    ) {
        let TransportSession {
            audio: audio_tx,
            events: mut event_rx,
        } = session;

        // Outbound: meter and encode each captured frame, then hand it to
        // the transport. Transmission is fire-and-forget; capture never
        // waits on the network.
        let observer = Arc::clone(&self.observer);
        let outbound = tokio::spawn(async move {
            while let Some(frame) = frames.recv().await {
                observer.on_input_level(rms(&frame.samples));
                let chunk = encode_pcm16(&frame.samples, frame.sample_rate);
                if audio_tx.send(chunk).is_err() {
                    break;
                }
            }
        });

        // Inbound: route each transport event in arrival order. The
        // scheduler's next_start is owned by this task alone.
        let observer = Arc::clone(&self.observer);
        let state = Arc::clone(&self.state);
        let output_rate = self.config.audio.output_sample_rate;
        let meter_window = self.config.audio.meter_window;
        let response_gain = self.config.audio.response_gain;
        let inbound = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                match event {
                    TransportEvent::Message(msg) => {
                        if let Some(text) = msg.user_transcript {
                            observer.on_transcript(&text, viva_core::Speaker::User);
                        }
                        if let Some(text) = msg.model_transcript {
                            observer.on_transcript(&text, viva_core::Speaker::Model);
                        }
                        if let Some(payload) = msg.audio {
                            match decode_payload(&payload, output_rate, 1) {
                                Ok(buffer) => {
                                    let level = rms_head(&buffer.samples, meter_window);
                                    observer.on_response_level(level * response_gain);
                                    scheduler.schedule(buffer);
                                }
                                Err(e) => {
                                    // Non-fatal: drop the chunk, keep the
                                    // schedule and the session intact
                                    tracing::warn!("dropping malformed audio payload: {}", e);
                                }
                            }
                        }
                        if msg.interrupted {
                            tracing::debug!("response interrupted, flushing playback backlog");
                            scheduler.interrupt();
                        }
                    }
                    TransportEvent::Closed => {
                        state.store(STATE_CLOSED, Ordering::Release);
                        observer.on_closed("remote endpoint closed the session");
                        break;
                    }
                    TransportEvent::Error(reason) => {
                        tracing::error!("transport failed: {}", reason);
                        state.store(STATE_CLOSED, Ordering::Release);
                        observer.on_closed(&reason);
                        break;
                    }
                }
            }
        });

        self.tasks = vec![outbound, inbound];
        self.state.store(STATE_OPEN, Ordering::Release);
    }

    /// Tear the session down. Valid from any state, idempotent, and never
    /// fails: transport close errors are swallowed, every device handle is
    /// released, and the state ends Closed unconditionally.
    pub async fn disconnect(&mut self) {
        self.state.store(STATE_CLOSED, Ordering::Release);
        for task in self.tasks.drain(..) {
            task.abort();
        }
        // Dropping the nodes stops the cpal streams
        self.capture = None;
        self.capture_handle = None;
        self.output = None;
        self.output_handle = None;
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
        }
    }
}
