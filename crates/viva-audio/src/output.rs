use crate::scheduler::PlaybackSink;
use cpal::traits::DeviceTrait;
use cpal::{Device, SampleRate, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use viva_core::AudioError;

const STATUS_OK: u8 = 0;
const STATUS_ERROR: u8 = 1;

// ── OutputHandle ──────────────────────────────────────────────

#[derive(Clone)]
pub struct OutputHandle {
    playing: Arc<AtomicBool>,
    status: Arc<AtomicU8>,
}

impl OutputHandle {
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    pub fn set_playing(&self, v: bool) {
        self.playing.store(v, Ordering::Relaxed);
    }

    pub fn is_healthy(&self) -> bool {
        self.status.load(Ordering::Relaxed) == STATUS_OK
    }
}

// ── OutputNode ────────────────────────────────────────────────

/// A cpal output stream whose callback renders the playback schedule.
///
/// While paused the callback keeps advancing silence through the sink so the
/// output clock stays monotonic.
pub struct OutputNode {
    _stream: Stream,
}

impl OutputNode {
    pub fn new(
        device: &Device,
        sink: PlaybackSink,
        sample_rate: u32,
        buffer_size: u32,
    ) -> Result<(Self, OutputHandle), AudioError> {
        let config = StreamConfig {
            channels: 1,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Fixed(buffer_size),
        };

        let playing = Arc::new(AtomicBool::new(true));
        let playing_flag = Arc::clone(&playing);
        let status = Arc::new(AtomicU8::new(STATUS_OK));
        let status_flag = Arc::clone(&status);

        let err_callback = move |err: cpal::StreamError| {
            tracing::error!("output stream error: {}", err);
            status_flag.store(STATUS_ERROR, Ordering::Relaxed);
        };

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    sink.render(data);
                    if !playing_flag.load(Ordering::Relaxed) {
                        data.fill(0.0);
                    }
                },
                err_callback,
                None,
            )
            .map_err(|e| AudioError::StreamBuild(e.to_string()))?;

        let handle = OutputHandle { playing, status };
        Ok((Self { _stream: stream }, handle))
    }
}
