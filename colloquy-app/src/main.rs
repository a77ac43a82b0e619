//! Colloquy console host.
//!
//! A headless client for the academic dialogue service: typed lines stand in
//! for spoken utterances, replies are "spoken" as paced console output. The
//! graphical shell talks to the same `VoiceController` surface this binary
//! exercises.
//!
//! ```text
//! :listen        arm the microphone (next typed line = final transcript)
//! :stop          stop listening / stop speaking
//! :voice on|off  toggle voice output
//! :quit          tear down and exit
//! ```

mod console;
mod settings;

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use colloquy_core::{
    AccessTokenSource, ControllerConfig, HttpDialogueClient, NoticeLevel, VoiceController,
};

use console::{ConsoleSpeechOutput, LineCapture};
use settings::{default_settings_path, load_settings};

/// Token source: environment first, settings file as fallback.
struct HostToken {
    from_settings: Option<String>,
}

impl AccessTokenSource for HostToken {
    fn bearer_token(&self) -> Option<String> {
        std::env::var("COLLOQUY_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.from_settings.clone())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings_path = default_settings_path();
    let settings = load_settings(&settings_path);
    info!(path = %settings_path.display(), url = %settings.service_url, "settings loaded");

    let token = Arc::new(HostToken {
        from_settings: settings.access_token.clone(),
    });
    let dialogue = Arc::new(
        HttpDialogueClient::new(&settings.service_url, token)
            .with_timeout(Duration::from_secs(settings.request_timeout_secs)),
    );

    let capture = Arc::new(LineCapture::new());
    let output = Arc::new(ConsoleSpeechOutput::new(settings.speaking_rate_wpm));

    let config = ControllerConfig {
        greeting: if settings.greeting_enabled {
            ControllerConfig::default().greeting
        } else {
            None
        },
        voice_output_enabled: settings.voice_output_enabled,
        ..ControllerConfig::default()
    };

    let controller = Arc::new(VoiceController::initialize(
        config,
        Arc::clone(&capture) as Arc<dyn colloquy_core::SpeechCapture>,
        Arc::clone(&output) as Arc<dyn colloquy_core::SpeechOutput>,
        dialogue,
    ));
    info!(session = controller.session_id(), "voice controller ready");

    spawn_event_printers(&controller);
    print_help();

    let mut lines = stdin_lines();
    while let Some(line) = lines.recv().await {
        let line = line.trim().to_string();
        match line.as_str() {
            "" => {}
            ":quit" | ":q" => break,
            ":listen" | ":l" => controller.request_listen(),
            ":stop" => controller.request_stop_listen(),
            ":voice on" => controller.set_voice_output_enabled(true),
            ":voice off" => controller.set_voice_output_enabled(false),
            ":help" => print_help(),
            text => {
                if !capture.submit(text) {
                    println!("(not listening — type :listen first)");
                }
            }
        }
    }

    controller.teardown().await;
    info!("goodbye");
    Ok(())
}

fn print_help() {
    println!(":listen  :stop  :voice on|off  :help  :quit");
    println!("While listening, a typed line is treated as your spoken utterance.");
}

/// Forward controller events to the terminal.
fn spawn_event_printers(controller: &Arc<VoiceController>) {
    use tokio::sync::broadcast::error::RecvError;

    let mut notices = controller.subscribe_notices();
    tokio::spawn(async move {
        loop {
            match notices.recv().await {
                Ok(notice) => {
                    let tag = match notice.level {
                        NoticeLevel::Info => "info",
                        NoticeLevel::Success => "ok",
                        NoticeLevel::Error => "error",
                    };
                    println!("[{tag}] {}", notice.message);
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut previews = controller.subscribe_preview();
    tokio::spawn(async move {
        loop {
            match previews.recv().await {
                Ok(preview) if !preview.text.is_empty() => println!("… {}", preview.text),
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut replies = controller.subscribe_replies();
    tokio::spawn(async move {
        loop {
            match replies.recv().await {
                Ok(turn) => {
                    println!("you: {}", turn.utterance);
                    println!("assistant: {}", turn.reply);
                    if let Some(intent) = turn.intent {
                        info!(intent = %intent, seq = turn.seq, "turn resolved");
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut expired = controller.subscribe_session_expired();
    tokio::spawn(async move {
        if expired.recv().await.is_ok() {
            println!("Your session has expired — restart with a fresh COLLOQUY_ACCESS_TOKEN.");
        }
    });
}

/// Blocking stdin reader bridged onto a channel.
fn stdin_lines() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}
