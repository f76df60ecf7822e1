use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;
use viva_audio::{CaptureHandle, OutputHandle};
use tracing_subscriber::EnvFilter;
use viva_core::Speaker;
use viva_session::{LiveTransport, SessionController, SessionObserver};

#[derive(Parser)]
#[command(name = "viva", about = "Realtime voice-exam session client")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// List audio devices and exit
    #[arg(long)]
    list_devices: bool,
}

/// Prints live captions to stdout and pushes levels into the log stream.
struct ConsoleObserver {
    last_speaker: Mutex<Option<Speaker>>,
    closed: Arc<Notify>,
}

impl SessionObserver for ConsoleObserver {
    fn on_input_level(&self, level: f32) {
        tracing::trace!(level, "mic level");
    }

    fn on_response_level(&self, level: f32) {
        tracing::trace!(level, "examiner level");
    }

    fn on_transcript(&self, text: &str, speaker: Speaker) {
        let mut last = self.last_speaker.lock().unwrap();
        if *last != Some(speaker) {
            if last.is_some() {
                println!();
            }
            let prefix = match speaker {
                Speaker::User => "you",
                Speaker::Model => "examiner",
            };
            print!("{}: ", prefix);
            *last = Some(speaker);
        }
        print!("{}", text);
        let _ = std::io::stdout().flush();
    }

    fn on_closed(&self, reason: &str) {
        tracing::info!("session closed: {}", reason);
        self.closed.notify_one();
    }
}

/// Line-based device commands while the session runs: `m` mutes/unmutes the
/// mic, `p` pauses/resumes playback. Ends quietly when stdin closes.
async fn run_key_commands(mic: CaptureHandle, speaker: OutputHandle) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        match line.trim() {
            "m" => {
                let enabled = !mic.is_enabled();
                mic.set_enabled(enabled);
                tracing::info!(enabled, "microphone toggled");
            }
            "p" => {
                let playing = !speaker.is_playing();
                speaker.set_playing(playing);
                tracing::info!(playing, "playback toggled");
            }
            _ => {}
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_devices {
        let (inputs, outputs) =
            viva_audio::device::list_device_names().context("failed to enumerate devices")?;
        println!("Input devices:");
        for name in inputs {
            println!("  - {}", name);
        }
        println!("Output devices:");
        for name in outputs {
            println!("  - {}", name);
        }
        return Ok(());
    }

    let config = viva_core::AppConfig::load_from_file(&cli.config)
        .with_context(|| format!("failed to load config from {:?}", cli.config))?;

    let env_filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("viva starting");

    let input = viva_audio::device::input_device(&config.audio.input_device)
        .with_context(|| format!("failed to get input device: {}", config.audio.input_device))?;
    let output = viva_audio::device::output_device(&config.audio.output_device)
        .with_context(|| format!("failed to get output device: {}", config.audio.output_device))?;

    let closed = Arc::new(Notify::new());
    let observer = Arc::new(ConsoleObserver {
        last_speaker: Mutex::new(None),
        closed: Arc::clone(&closed),
    });

    let transport = Box::new(LiveTransport::new(
        &config.session.endpoint,
        &config.session.api_key,
    ));
    let mut controller = SessionController::new(config, transport, observer);

    controller
        .connect(&input, &output)
        .await
        .context("failed to open session")?;
    tracing::info!("session open: 'm' toggles the mic, 'p' toggles playback, Ctrl-C ends the exam");

    if let (Some(mic), Some(speaker)) = (
        controller.capture_handle().cloned(),
        controller.output_handle().cloned(),
    ) {
        tokio::spawn(run_key_commands(mic, speaker));
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
        _ = closed.notified() => {}
    }

    println!();
    controller.disconnect().await;
    Ok(())
}
