use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use viva_core::{DecodeError, EncodedChunk, PlayableBuffer};

/// Quantize normalized f32 samples to 16-bit signed little-endian PCM.
///
/// Out-of-range samples are clamped, never rejected. Positive samples scale
/// by 32767 and negative by 32768 to cover the asymmetric two's-complement
/// range exactly.
pub fn encode_pcm16(samples: &[f32], sample_rate: u32) -> EncodedChunk {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let s = s.clamp(-1.0, 1.0);
        let v = if s >= 0.0 {
            (s * 32767.0).round() as i16
        } else {
            (s * 32768.0).round() as i16
        };
        data.extend_from_slice(&v.to_le_bytes());
    }
    EncodedChunk { data, sample_rate }
}

/// Reinterpret raw bytes as 16-bit signed little-endian PCM.
pub fn decode_pcm16(
    bytes: &[u8],
    sample_rate: u32,
    channels: u16,
) -> Result<PlayableBuffer, DecodeError> {
    if bytes.len() % 2 != 0 {
        return Err(DecodeError::OddLength(bytes.len()));
    }
    let samples = bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
        .collect();
    Ok(PlayableBuffer {
        samples,
        sample_rate,
        channels,
    })
}

/// Decode a transport payload: base64 → raw bytes → PCM buffer.
pub fn decode_payload(
    payload: &str,
    sample_rate: u32,
    channels: u16,
) -> Result<PlayableBuffer, DecodeError> {
    let bytes = BASE64
        .decode(payload)
        .map_err(|e| DecodeError::Base64(e.to_string()))?;
    decode_pcm16(&bytes, sample_rate, channels)
}

/// Base64-encode an outbound chunk for transports that carry audio as text.
pub fn to_base64(chunk: &EncodedChunk) -> String {
    BASE64.encode(&chunk.data)
}
