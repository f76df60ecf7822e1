use cpal::traits::DeviceTrait;
use cpal::{Device, SampleRate, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use viva_core::{AudioError, AudioFrame};

const STATUS_OK: u8 = 0;
const STATUS_ERROR: u8 = 1;

// ── CaptureHandle ─────────────────────────────────────────────

/// Shared control surface for a capture node. The enable flag belongs to the
/// caller that owns device permission and mute state; the session only reads
/// frames.
#[derive(Clone)]
pub struct CaptureHandle {
    enabled: Arc<AtomicBool>,
    status: Arc<AtomicU8>,
}

impl CaptureHandle {
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, v: bool) {
        self.enabled.store(v, Ordering::Relaxed);
    }

    pub fn is_healthy(&self) -> bool {
        self.status.load(Ordering::Relaxed) == STATUS_OK
    }
}

// ── CaptureNode ───────────────────────────────────────────────

/// A cpal input stream delivering fixed-size mono frames.
///
/// The device callback only copies samples into an [`AudioFrame`] and sends
/// it down an unbounded channel; metering, encoding, and transmission happen
/// on the consumer side, so a slow network never stalls capture.
pub struct CaptureNode {
    _stream: Stream,
}

impl CaptureNode {
    pub fn new(
        device: &Device,
        sample_rate: u32,
        buffer_size: u32,
        frames: mpsc::UnboundedSender<AudioFrame>,
    ) -> Result<(Self, CaptureHandle), AudioError> {
        let channels: u16 = 1;
        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Fixed(buffer_size),
        };

        let enabled = Arc::new(AtomicBool::new(true));
        let enabled_flag = Arc::clone(&enabled);
        let status = Arc::new(AtomicU8::new(STATUS_OK));
        let status_flag = Arc::clone(&status);

        let err_callback = move |err: cpal::StreamError| {
            tracing::error!("capture stream error: {}", err);
            status_flag.store(STATUS_ERROR, Ordering::Relaxed);
        };

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !enabled_flag.load(Ordering::Relaxed) {
                        return;
                    }
                    let frame = AudioFrame {
                        samples: data.to_vec(),
                        sample_rate,
                        channels,
                    };
                    // Receiver gone means the session is tearing down
                    let _ = frames.send(frame);
                },
                err_callback,
                None,
            )
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

        let handle = CaptureHandle { enabled, status };
        Ok((Self { _stream: stream }, handle))
    }
}
