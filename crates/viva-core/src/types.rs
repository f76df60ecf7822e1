/// A block of normalized f32 samples as delivered by the capture device.
///
/// Samples are mono, in [-1.0, 1.0], at the session input rate. Frames are
/// produced at a fixed cadence and consumed exactly once by the encoder.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// 16-bit little-endian PCM bytes ready for transmission.
///
/// Carries only the sample rate; the remote endpoint learns the format from
/// session setup, not from the chunk itself.
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    pub data: Vec<u8>,
    pub sample_rate: u32,
}

/// Decoded response audio, ready for scheduled playback.
#[derive(Debug, Clone)]
pub struct PlayableBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PlayableBuffer {
    /// Duration in seconds on the output timeline.
    pub fn duration(&self) -> f64 {
        let frames = self.samples.len() / self.channels.max(1) as usize;
        frames as f64 / self.sample_rate as f64
    }
}

/// Which side of the conversation a transcript fragment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Model,
}

/// Session lifecycle. There is no path back to `Open`; reconnecting requires
/// a fresh controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Open,
    Closed,
}
