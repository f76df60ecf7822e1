use crate::transport::{ServerMessage, SessionSetup, Transport, TransportEvent, TransportSession};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use viva_core::{EncodedChunk, SessionError};

// ── Wire format ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerEnvelope {
    setup_complete: Option<serde_json::Value>,
    server_content: Option<ServerContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerContent {
    model_turn: Option<ModelTurn>,
    input_transcription: Option<Transcription>,
    output_transcription: Option<Transcription>,
    #[serde(default)]
    interrupted: bool,
}

#[derive(Debug, Deserialize)]
struct ModelTurn {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
struct InlineData {
    data: String,
}

#[derive(Debug, Deserialize)]
struct Transcription {
    text: Option<String>,
}

impl ServerEnvelope {
    fn into_message(self) -> Option<ServerMessage> {
        let content = self.server_content?;
        let audio = content
            .model_turn
            .and_then(|turn| turn.parts.into_iter().find_map(|p| p.inline_data))
            .map(|inline| inline.data);
        Some(ServerMessage {
            audio,
            user_transcript: content.input_transcription.and_then(|t| t.text),
            model_transcript: content.output_transcription.and_then(|t| t.text),
            interrupted: content.interrupted,
        })
    }
}

fn setup_json(setup: &SessionSetup) -> serde_json::Value {
    json!({
        "setup": {
            "model": setup.model,
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": setup.voice }
                    }
                }
            },
            "systemInstruction": {
                "parts": [{ "text": setup.persona }]
            },
            "inputAudioTranscription": {},
            "outputAudioTranscription": {}
        }
    })
}

fn realtime_input_json(chunk: &EncodedChunk) -> serde_json::Value {
    json!({
        "realtimeInput": {
            "mediaChunks": [{
                "mimeType": format!("audio/pcm;rate={}", chunk.sample_rate),
                "data": viva_audio::to_base64(chunk),
            }]
        }
    })
}

fn message_text(msg: &Message) -> Option<&str> {
    match msg {
        Message::Text(text) => Some(text),
        Message::Binary(bytes) => std::str::from_utf8(bytes).ok(),
        _ => None,
    }
}

// ── LiveTransport ─────────────────────────────────────────────

/// Websocket transport speaking the live bidi protocol: client `setup`,
/// server `setupComplete`, then `realtimeInput` media chunks out and
/// `serverContent` messages in.
pub struct LiveTransport {
    endpoint: String,
    api_key: String,
    shutdown: Option<oneshot::Sender<()>>,
    tasks: Vec<tokio::task::JoinHandle<()>>,
}

impl LiveTransport {
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            shutdown: None,
            tasks: Vec::new(),
        }
    }
}

#[async_trait]
impl Transport for LiveTransport {
    async fn connect(&mut self, setup: &SessionSetup) -> Result<TransportSession, SessionError> {
        let url = format!("{}?key={}", self.endpoint, self.api_key);
        let (ws, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| SessionError::Connect(e.to_string()))?;
        let (mut write, mut read) = ws.split();

        write
            .send(Message::Text(setup_json(setup).to_string()))
            .await
            .map_err(|e| SessionError::Connect(e.to_string()))?;

        // Two-phase connect: nothing is usable until the endpoint acks setup
        loop {
            match read.next().await {
                Some(Ok(msg)) => {
                    let parsed = message_text(&msg)
                        .and_then(|text| serde_json::from_str::<ServerEnvelope>(text).ok());
                    if parsed.is_some_and(|e| e.setup_complete.is_some()) {
                        break;
                    }
                }
                Some(Err(e)) => return Err(SessionError::Connect(e.to_string())),
                None => {
                    return Err(SessionError::Connect(
                        "connection closed during setup".to_string(),
                    ))
                }
            }
        }
        tracing::info!(model = %setup.model, "live session established");

        let (audio_tx, mut audio_rx) = mpsc::unbounded_channel::<EncodedChunk>();
        let (event_tx, events) = mpsc::unbounded_channel();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        // Writer: FIFO transmission of encoded chunks, detached from capture
        let writer = tokio::spawn(async move {
            loop {
                tokio::select! {
                    chunk = audio_rx.recv() => match chunk {
                        Some(chunk) => {
                            let payload = realtime_input_json(&chunk).to_string();
                            if write.send(Message::Text(payload)).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                    _ = &mut shutdown_rx => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        });

        // Reader: surface messages in arrival order, then one terminal event
        let reader = tokio::spawn(async move {
            let mut failure: Option<String> = None;
            while let Some(result) = read.next().await {
                match result {
                    Ok(Message::Close(_)) => break,
                    Ok(msg) => {
                        let Some(text) = message_text(&msg) else { continue };
                        match serde_json::from_str::<ServerEnvelope>(text) {
                            Ok(envelope) => {
                                if let Some(message) = envelope.into_message() {
                                    if event_tx.send(TransportEvent::Message(message)).is_err() {
                                        return;
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::debug!("ignoring unrecognized server message: {}", e);
                            }
                        }
                    }
                    Err(e) => {
                        failure = Some(e.to_string());
                        break;
                    }
                }
            }
            let _ = match failure {
                Some(reason) => event_tx.send(TransportEvent::Error(reason)),
                None => event_tx.send(TransportEvent::Closed),
            };
        });

        self.shutdown = Some(shutdown_tx);
        self.tasks = vec![writer, reader];

        Ok(TransportSession {
            audio: audio_tx,
            events,
        })
    }

    async fn close(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        // Give the writer a chance to flush the close frame, then stop hard
        tokio::task::yield_now().await;
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}
