use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use viva_audio::scheduler::PlaybackScheduler;
use viva_audio::{encode_pcm16, to_base64};
use viva_core::{AppConfig, AudioFrame, EncodedChunk, SessionError, SessionState, Speaker};
use viva_session::{
    ServerMessage, SessionController, SessionObserver, SessionSetup, Transport, TransportEvent,
    TransportSession,
};

struct ScriptedTransport {
    session: Option<TransportSession>,
    closed: Arc<AtomicBool>,
}

fn scripted_transport() -> (
    ScriptedTransport,
    mpsc::UnboundedSender<TransportEvent>,
    mpsc::UnboundedReceiver<EncodedChunk>,
    Arc<AtomicBool>,
) {
    let (event_tx, events) = mpsc::unbounded_channel();
    let (audio, audio_rx) = mpsc::unbounded_channel();
    let closed = Arc::new(AtomicBool::new(false));
    let transport = ScriptedTransport {
        session: Some(TransportSession { audio, events }),
        closed: Arc::clone(&closed),
    };
    (transport, event_tx, audio_rx, closed)
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&mut self, _setup: &SessionSetup) -> Result<TransportSession, SessionError> {
        Ok(self.session.take().expect("connect called twice"))
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[derive(Default)]
struct CaptionObserver {
    lines: Mutex<Vec<String>>,
}

impl SessionObserver for CaptionObserver {
    fn on_transcript(&self, text: &str, speaker: Speaker) {
        let prefix = match speaker {
            Speaker::User => "you",
            Speaker::Model => "examiner",
        };
        self.lines.lock().unwrap().push(format!("{}: {}", prefix, text));
    }
}

fn config() -> AppConfig {
    AppConfig::from_toml_str(
        r#"
[session]
endpoint = "wss://example.test/live"
api_key = "key"
model = "speech-live-1"
persona = "You are a strict speaking examiner."
"#,
    )
    .unwrap()
}

#[tokio::test]
async fn test_full_exchange_then_disconnect_leaves_no_playback() {
    let (transport, events, mut sent_audio, transport_closed) = scripted_transport();
    let observer = Arc::new(CaptionObserver::default());
    let mut controller =
        SessionController::new(
            config(),
            Box::new(transport),
            Arc::clone(&observer) as Arc<dyn SessionObserver>,
        );

    let scheduler = PlaybackScheduler::new(24000);
    let sink = scheduler.sink();
    let (frame_tx, frame_rx) = mpsc::unbounded_channel();
    controller.connect_with(frame_rx, scheduler).await.unwrap();
    assert_eq!(controller.state(), SessionState::Open);

    // Candidate speaks: a captured frame flows out encoded
    frame_tx
        .send(AudioFrame {
            samples: vec![0.2; 2048],
            sample_rate: 16000,
            channels: 1,
        })
        .unwrap();

    // Examiner replies with audio and both transcripts
    let reply = encode_pcm16(&vec![0.4f32; 4800], 24000);
    events
        .send(TransportEvent::Message(ServerMessage {
            audio: Some(to_base64(&reply)),
            user_transcript: Some("my name is Chen".to_string()),
            model_transcript: Some("thank you, let us begin".to_string()),
            interrupted: false,
        }))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let chunk = sent_audio.try_recv().unwrap();
    assert_eq!(chunk.data.len(), 4096);

    {
        let lines = observer.lines.lock().unwrap();
        assert_eq!(
            *lines,
            vec![
                "you: my name is Chen".to_string(),
                "examiner: thank you, let us begin".to_string(),
            ],
        );
    }

    // Part of the reply plays back
    let mut out = vec![0.0f32; 1200];
    sink.render(&mut out);
    assert!(out.iter().all(|&s| s > 0.3));

    // Disconnect from Open: transport closed, state Closed, and events that
    // arrive afterwards are ignored
    controller.disconnect().await;
    assert_eq!(controller.state(), SessionState::Closed);
    assert!(transport_closed.load(Ordering::Acquire));

    let late = encode_pcm16(&vec![0.9f32; 2400], 24000);
    let _ = events.send(TransportEvent::Message(ServerMessage {
        audio: Some(to_base64(&late)),
        ..Default::default()
    }));
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Skip past the tail of the pre-disconnect reply; nothing new plays
    let mut drain = vec![0.0f32; 4800];
    sink.render(&mut drain);
    let mut out = vec![1.0f32; 2400];
    sink.render(&mut out);
    assert!(
        out.iter().all(|&s| s == 0.0),
        "audio scheduled after disconnect",
    );
}

#[tokio::test]
async fn test_interrupted_reply_restarts_cleanly() {
    let (transport, events, _sent_audio, _closed) = scripted_transport();
    let observer = Arc::new(CaptionObserver::default());
    let mut controller = SessionController::new(config(), Box::new(transport), observer);

    let scheduler = PlaybackScheduler::new(24000);
    let sink = scheduler.sink();
    let (_frame_tx, frame_rx) = mpsc::unbounded_channel();
    controller.connect_with(frame_rx, scheduler).await.unwrap();

    // A long committed answer, cut off mid-delivery
    let long_reply = encode_pcm16(&vec![0.6f32; 48000], 24000);
    events
        .send(TransportEvent::Message(ServerMessage {
            audio: Some(to_base64(&long_reply)),
            ..Default::default()
        }))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut out = vec![0.0f32; 2400];
    sink.render(&mut out);
    assert!(out.iter().all(|&s| s > 0.5));

    events
        .send(TransportEvent::Message(ServerMessage {
            interrupted: true,
            ..Default::default()
        }))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The follow-up answer starts at the interruption point, not after the
    // discarded backlog
    let short_reply = encode_pcm16(&vec![0.1f32; 2400], 24000);
    events
        .send(TransportEvent::Message(ServerMessage {
            audio: Some(to_base64(&short_reply)),
            ..Default::default()
        }))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let mut out = vec![0.0f32; 2400];
    sink.render(&mut out);
    assert!(out.iter().all(|&s| s > 0.05 && s < 0.2));
}
