/// Root-mean-square loudness of a sample block. Returns 0.0 for an empty block.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// RMS over at most the first `max_samples` of the block, bounding the cost
/// for long response buffers.
pub fn rms_head(samples: &[f32], max_samples: usize) -> f32 {
    let n = samples.len().min(max_samples);
    rms(&samples[..n])
}
