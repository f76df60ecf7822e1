use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use viva_core::PlayableBuffer;

// ── Scheduled ─────────────────────────────────────────────────

struct Scheduled {
    /// Output-timeline frame at which this buffer begins.
    start: u64,
    samples: Vec<f32>,
}

impl Scheduled {
    fn end(&self) -> u64 {
        self.start + self.samples.len() as u64
    }
}

// ── PlaybackSink ──────────────────────────────────────────────

/// Consumer half of the scheduler, driven by the audio output callback.
///
/// The render cursor counts frames written to the device and doubles as the
/// output clock: `now() = frames / sample_rate`.
#[derive(Clone)]
pub struct PlaybackSink {
    queue: Arc<Mutex<VecDeque<Scheduled>>>,
    cursor: Arc<AtomicU64>,
    sample_rate: u32,
}

impl PlaybackSink {
    /// Current position on the output timeline, in seconds.
    pub fn now(&self) -> f64 {
        self.cursor.load(Ordering::Acquire) as f64 / self.sample_rate as f64
    }

    /// Fill one output callback's worth of frames from the scheduled queue,
    /// emitting silence outside scheduled intervals, and advance the cursor.
    pub fn render(&self, out: &mut [f32]) {
        let base = self.cursor.load(Ordering::Acquire);
        if let Ok(mut queue) = self.queue.lock() {
            for (i, sample) in out.iter_mut().enumerate() {
                let frame = base + i as u64;
                while queue.front().is_some_and(|b| b.end() <= frame) {
                    queue.pop_front();
                }
                *sample = match queue.front() {
                    Some(front) if front.start <= frame => {
                        front.samples[(frame - front.start) as usize]
                    }
                    _ => 0.0,
                };
            }
        } else {
            // Mutex poisoned — fill with silence
            out.fill(0.0);
        }
        self.cursor.store(base + out.len() as u64, Ordering::Release);
    }
}

// ── PlaybackScheduler ─────────────────────────────────────────

/// Turns independently-arriving response buffers into continuous audio.
///
/// Keeps a single `next_start` timestamp; each buffer is scheduled to begin
/// exactly where the previous one ends, or immediately when the pipeline has
/// gone idle. Buffers never overlap and are never reordered.
pub struct PlaybackScheduler {
    sink: PlaybackSink,
    /// Next start position in output-timeline frames.
    next_start: u64,
}

impl PlaybackScheduler {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sink: PlaybackSink {
                queue: Arc::new(Mutex::new(VecDeque::new())),
                cursor: Arc::new(AtomicU64::new(0)),
                sample_rate,
            },
            next_start: 0,
        }
    }

    /// Clone of the render half, for the output node's callback.
    pub fn sink(&self) -> PlaybackSink {
        self.sink.clone()
    }

    pub fn now(&self) -> f64 {
        self.sink.now()
    }

    /// Committed start time of the next buffer, in seconds.
    pub fn next_start(&self) -> f64 {
        self.next_start as f64 / self.sink.sample_rate as f64
    }

    /// Schedule a buffer to play gaplessly after the current backlog.
    /// Returns the start time in seconds.
    pub fn schedule(&mut self, buffer: PlayableBuffer) -> f64 {
        if buffer.sample_rate != self.sink.sample_rate {
            tracing::warn!(
                buffer_rate = buffer.sample_rate,
                output_rate = self.sink.sample_rate,
                "scheduling buffer at mismatched sample rate",
            );
        }

        let now = self.sink.cursor.load(Ordering::Acquire);
        // Pipeline went idle — never schedule into the past
        if self.next_start < now {
            self.next_start = now;
        }

        let start = self.next_start;
        let len = buffer.samples.len() as u64;
        if let Ok(mut queue) = self.sink.queue.lock() {
            queue.push_back(Scheduled {
                start,
                samples: buffer.samples,
            });
        }
        self.next_start = start + len;
        start as f64 / self.sink.sample_rate as f64
    }

    /// The remote endpoint cut its response short: discard the committed
    /// backlog, including buffers already queued for future starts, and
    /// rebase `next_start` on the current output time.
    pub fn interrupt(&mut self) {
        self.next_start = self.sink.cursor.load(Ordering::Acquire);
        if let Ok(mut queue) = self.sink.queue.lock() {
            queue.clear();
        }
    }
}
