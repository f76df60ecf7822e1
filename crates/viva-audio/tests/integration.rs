use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use viva_audio::scheduler::PlaybackScheduler;
use viva_audio::{decode_payload, encode_pcm16, rms_head, to_base64};

#[test]
fn test_encode_decode_schedule_pipeline() {
    // Microphone-side frame, 440 Hz sine at 16 kHz
    let frame: Vec<f32> = (0..2048)
        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 16000.0).sin() * 0.6)
        .collect();
    let chunk = encode_pcm16(&frame, 16000);
    assert_eq!(chunk.data.len(), 4096);

    // Pretend the endpoint echoed the same PCM back as base64 at 24 kHz
    let payload = to_base64(&chunk);
    let buffer = decode_payload(&payload, 24000, 1).unwrap();
    assert_eq!(buffer.samples.len(), 2048);

    let level = rms_head(&buffer.samples, 1000);
    assert!(level > 0.1, "sine should meter well above silence");

    let mut sched = PlaybackScheduler::new(24000);
    let sink = sched.sink();
    let start = sched.schedule(buffer);
    assert_eq!(start, 0.0);

    // Render the whole buffer and compare against the original
    let mut out = vec![0.0f32; 2048];
    sink.render(&mut out);
    for (orig, played) in frame.iter().zip(out.iter()) {
        assert!((orig - played).abs() <= 2.0 / 32768.0);
    }
}

#[test]
fn test_malformed_payload_does_not_disturb_schedule() {
    let mut sched = PlaybackScheduler::new(24000);

    let before = sched.next_start();

    // Odd-length payload: decode fails, nothing is scheduled
    let bad = BASE64.encode([0u8; 33]);
    assert!(decode_payload(&bad, 24000, 1).is_err());
    assert_eq!(sched.next_start(), before);

    // The next well-formed payload decodes and schedules normally
    let good = BASE64.encode([0u8; 4800]);
    let buffer = decode_payload(&good, 24000, 1).unwrap();
    let start = sched.schedule(buffer);
    assert_eq!(start, before);
    assert!((sched.next_start() - 0.1).abs() < 1e-9);
}

#[test]
fn test_bursty_then_sparse_arrivals_stay_gapless() {
    let mut sched = PlaybackScheduler::new(24000);
    let sink = sched.sink();

    // Burst: three buffers decoded back-to-back before any playback
    for level in [0.1f32, 0.2, 0.3] {
        let chunk = encode_pcm16(&vec![level; 480], 24000);
        let buffer = decode_payload(&to_base64(&chunk), 24000, 1).unwrap();
        sched.schedule(buffer);
    }

    let mut out = vec![0.0f32; 1440];
    sink.render(&mut out);
    // No silence between the three segments
    assert!(out.iter().all(|&s| s.abs() > 0.05));

    // Sparse: long silence, then a late buffer starts at its arrival time
    let mut gap = vec![0.0f32; 24000];
    sink.render(&mut gap);
    let chunk = encode_pcm16(&vec![0.4f32; 480], 24000);
    let buffer = decode_payload(&to_base64(&chunk), 24000, 1).unwrap();
    let start = sched.schedule(buffer);
    assert!((start - sink.now()).abs() < 1e-9);
}
