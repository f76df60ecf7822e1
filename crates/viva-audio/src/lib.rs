pub mod capture;
pub mod device;
pub mod meter;
pub mod output;
pub mod pcm;
pub mod scheduler;

pub use capture::{CaptureHandle, CaptureNode};
pub use meter::{rms, rms_head};
pub use output::{OutputHandle, OutputNode};
pub use pcm::{decode_payload, decode_pcm16, encode_pcm16, to_base64};
pub use scheduler::{PlaybackScheduler, PlaybackSink};
