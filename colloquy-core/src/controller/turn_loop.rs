//! Single-writer turn loop.
//!
//! ## Turn stages
//!
//! ```text
//! 1. Listen    — capture session runs; interim text feeds the preview
//! 2. Dispatch  — final transcript + session id → DialogueService (spawned task)
//! 3. Normalize — reply text → SpeechStyler::to_speakable
//! 4. Speak     — speech output plays the reply (when the toggle allows)
//! ```
//!
//! Commands, capability events, and dialogue completions are folded into one
//! `ControllerEvent` stream and processed strictly in arrival order against
//! the current state. An event that does not make sense in the current state
//! (a stray `Final` after stop, an `Ended` from a cancelled utterance) is
//! dropped, never acted on. Dispatch is strictly sequential: listen requests
//! are refused while a round trip is in flight, so at most one dialogue call
//! can ever be outstanding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::controller::{ControllerConfig, SessionExpired};
use crate::dialogue::{DialogueReply, DialogueService};
use crate::error::{ColloquyError, Result};
use crate::ipc::events::{
    ControllerState, ControllerStateEvent, NoticeEvent, NoticeLevel, TranscriptPreviewEvent,
    TurnReplyEvent,
};
use crate::session::ConversationSession;
use crate::speakable::SpeechStyler;
use crate::speech::{
    Availability, CaptureEvent, CaptureSink, OutputEvent, OutputSink, SpeechCapture, SpeechOutput,
};

/// External commands entering the loop.
#[derive(Debug)]
pub(crate) enum Command {
    Listen,
    StopListen,
    SetVoiceOutput(bool),
    Teardown,
}

/// Everything the loop reacts to.
pub(crate) enum ControllerEvent {
    Command(Command),
    Capture(CaptureEvent),
    Output(OutputEvent),
    DialogueResolved {
        utterance: String,
        result: Result<DialogueReply>,
    },
}

/// All context the loop needs, passed as one struct so the task stays tidy.
pub(crate) struct LoopContext {
    pub config: ControllerConfig,
    pub session: ConversationSession,
    pub capture: Arc<dyn SpeechCapture>,
    pub output: Arc<dyn SpeechOutput>,
    pub dialogue: Arc<dyn DialogueService>,
    pub styler: SpeechStyler,
    pub capture_availability: Availability,
    pub output_availability: Availability,
    pub state: Arc<Mutex<ControllerState>>,
    pub preview: Arc<Mutex<String>>,
    pub voice_output_enabled: Arc<AtomicBool>,
    pub state_tx: broadcast::Sender<ControllerStateEvent>,
    pub preview_tx: broadcast::Sender<TranscriptPreviewEvent>,
    pub notice_tx: broadcast::Sender<NoticeEvent>,
    pub reply_tx: broadcast::Sender<TurnReplyEvent>,
    pub expired_tx: broadcast::Sender<SessionExpired>,
    /// Sink handed to `capture.start()`.
    pub capture_sink: CaptureSink,
    /// Sink handed to `output.speak()`.
    pub output_sink: OutputSink,
    /// Re-entry point for spawned dispatch tasks.
    pub loop_tx: mpsc::UnboundedSender<ControllerEvent>,
    pub preview_seq: u64,
    pub reply_seq: u64,
}

/// Run the turn loop until teardown or channel close.
pub(crate) async fn run(
    mut ctx: LoopContext,
    mut events: mpsc::UnboundedReceiver<ControllerEvent>,
) {
    info!(session = %ctx.session, "turn loop started");

    // Capability gaps are reported exactly once, here.
    if ctx.capture_availability == Availability::Unavailable {
        notice(
            &ctx,
            NoticeLevel::Error,
            "Voice recognition is not supported here.",
        );
    }
    if ctx.output_availability == Availability::Unavailable {
        notice(
            &ctx,
            NoticeLevel::Error,
            "Speech output is not supported here. Replies will be shown as text.",
        );
    }

    if let Some(greeting) = ctx.config.greeting.clone() {
        if voice_output_on(&ctx) {
            start_speaking(&mut ctx, &greeting).await;
        }
    }

    while let Some(event) = events.recv().await {
        match event {
            ControllerEvent::Command(Command::Listen) => on_listen(&mut ctx).await,
            ControllerEvent::Command(Command::StopListen) => on_stop_listen(&mut ctx).await,
            ControllerEvent::Command(Command::SetVoiceOutput(enabled)) => {
                on_set_voice_output(&mut ctx, enabled).await;
            }
            ControllerEvent::Command(Command::Teardown) => {
                shutdown(&mut ctx).await;
                break;
            }
            ControllerEvent::Capture(event) => on_capture_event(&mut ctx, event),
            ControllerEvent::Output(event) => on_output_event(&mut ctx, event),
            ControllerEvent::DialogueResolved { utterance, result } => {
                on_dialogue_resolved(&mut ctx, utterance, result).await;
            }
        }
    }

    info!("turn loop stopped");
}

// ── Command handlers ─────────────────────────────────────────────────────

async fn on_listen(ctx: &mut LoopContext) {
    match current_state(ctx) {
        ControllerState::Idle => start_capture(ctx).await,
        ControllerState::Speaking => {
            // Barge-in: output must be silent before the mic opens.
            if let Err(e) = ctx.output.cancel().await {
                warn!(error = %e, "output cancel failed during barge-in");
            }
            set_state(ctx, ControllerState::Idle, None);
            start_capture(ctx).await;
        }
        ControllerState::Listening => {
            debug!("listen request ignored — already listening");
        }
        ControllerState::Dispatching => {
            debug!("listen request ignored — turn in flight");
        }
        ControllerState::Error => {}
    }
}

async fn on_stop_listen(ctx: &mut LoopContext) {
    match current_state(ctx) {
        ControllerState::Listening => {
            if let Err(e) = ctx.capture.stop().await {
                warn!(error = %e, "capture stop failed");
            }
            clear_preview(ctx);
            set_state(ctx, ControllerState::Idle, None);
        }
        ControllerState::Speaking => {
            if let Err(e) = ctx.output.cancel().await {
                warn!(error = %e, "output cancel failed");
            }
            set_state(ctx, ControllerState::Idle, None);
        }
        // A dispatch in flight is never cancelled; its result is honored.
        _ => {}
    }
}

async fn on_set_voice_output(ctx: &mut LoopContext, enabled: bool) {
    let was = ctx.voice_output_enabled.swap(enabled, Ordering::SeqCst);
    if was == enabled {
        return;
    }
    if enabled {
        notice(ctx, NoticeLevel::Success, "Voice output enabled");
    } else {
        notice(ctx, NoticeLevel::Info, "Voice output disabled");
        if current_state(ctx) == ControllerState::Speaking {
            if let Err(e) = ctx.output.cancel().await {
                warn!(error = %e, "output cancel failed on voice-off");
            }
            set_state(ctx, ControllerState::Idle, None);
        }
    }
}

async fn shutdown(ctx: &mut LoopContext) {
    match current_state(ctx) {
        ControllerState::Listening => {
            let _ = ctx.capture.stop().await;
        }
        ControllerState::Speaking => {
            let _ = ctx.output.cancel().await;
        }
        _ => {}
    }
    clear_preview(ctx);
    set_state(ctx, ControllerState::Idle, None);
    info!("voice controller teardown");
}

// ── Capability event handlers ────────────────────────────────────────────

fn on_capture_event(ctx: &mut LoopContext, event: CaptureEvent) {
    if current_state(ctx) != ControllerState::Listening {
        debug!(?event, "capture event ignored outside listening");
        return;
    }
    match event {
        CaptureEvent::Started => {
            notice(ctx, NoticeLevel::Success, "Listening... Speak now!");
        }
        CaptureEvent::Interim(text) => emit_preview(ctx, text),
        CaptureEvent::Final(text) => {
            clear_preview(ctx);
            let utterance = text.trim().to_string();
            if utterance.is_empty() {
                debug!("whitespace-only transcript discarded");
                set_state(ctx, ControllerState::Idle, None);
                return;
            }
            notice(ctx, NoticeLevel::Info, &format!("Processing: \"{utterance}\""));
            set_state(ctx, ControllerState::Dispatching, None);
            spawn_dispatch(ctx, utterance);
        }
        CaptureEvent::Error(kind) => {
            clear_preview(ctx);
            fail(ctx, format!("Voice recognition error: {kind}"));
        }
        CaptureEvent::Ended => {
            // Session closed without a final transcript.
            clear_preview(ctx);
            set_state(ctx, ControllerState::Idle, None);
        }
    }
}

fn on_output_event(ctx: &mut LoopContext, event: OutputEvent) {
    if current_state(ctx) != ControllerState::Speaking {
        debug!(?event, "output event ignored outside speaking");
        return;
    }
    match event {
        OutputEvent::Started => {}
        OutputEvent::Ended => set_state(ctx, ControllerState::Idle, None),
        OutputEvent::Error(message) => fail(ctx, format!("Speech output error: {message}")),
    }
}

// ── Dispatch ─────────────────────────────────────────────────────────────

fn spawn_dispatch(ctx: &LoopContext, utterance: String) {
    let dialogue = Arc::clone(&ctx.dialogue);
    let session = ctx.session.clone();
    let loop_tx = ctx.loop_tx.clone();
    tokio::spawn(async move {
        let result = dialogue.send(&utterance, &session).await;
        let _ = loop_tx.send(ControllerEvent::DialogueResolved { utterance, result });
    });
}

async fn on_dialogue_resolved(
    ctx: &mut LoopContext,
    utterance: String,
    result: Result<DialogueReply>,
) {
    if current_state(ctx) != ControllerState::Dispatching {
        debug!("dialogue result ignored — turn no longer in flight");
        return;
    }
    match result {
        Ok(reply) => {
            let spoken = ctx.styler.to_speakable(&reply.response);
            ctx.reply_seq += 1;
            let _ = ctx.reply_tx.send(TurnReplyEvent {
                seq: ctx.reply_seq,
                utterance,
                reply: reply.response.clone(),
                spoken: spoken.clone(),
                intent: reply.intent.clone(),
            });
            if voice_output_on(ctx) && !spoken.is_empty() {
                start_speaking(ctx, &spoken).await;
            } else {
                set_state(ctx, ControllerState::Idle, None);
            }
        }
        Err(ColloquyError::DialogueUnauthorized) => {
            warn!("dialogue turn rejected — session token expired");
            notice(ctx, NoticeLevel::Error, "Session expired. Please sign in again.");
            let _ = ctx.expired_tx.send(SessionExpired);
            set_state(ctx, ControllerState::Idle, None);
        }
        Err(e) => {
            warn!(error = %e, "dialogue turn failed");
            let apology = ctx.config.fallback_apology.clone();
            notice(ctx, NoticeLevel::Error, &apology);
            if voice_output_on(ctx) {
                start_speaking(ctx, &apology).await;
            } else {
                set_state(ctx, ControllerState::Idle, None);
            }
        }
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn start_capture(ctx: &mut LoopContext) {
    if !ctx.capture_availability.usable() {
        notice(
            ctx,
            NoticeLevel::Error,
            "Voice recognition is not supported here.",
        );
        return;
    }
    match ctx.capture.start(ctx.capture_sink.clone()).await {
        Ok(()) => {
            clear_preview(ctx);
            set_state(ctx, ControllerState::Listening, None);
        }
        Err(e) => fail(ctx, format!("Voice recognition error: {e}")),
    }
}

async fn start_speaking(ctx: &mut LoopContext, text: &str) {
    match ctx.output.speak(text, ctx.output_sink.clone()).await {
        Ok(()) => set_state(ctx, ControllerState::Speaking, None),
        Err(e) => fail(ctx, format!("Speech output error: {e}")),
    }
}

/// Transient failure: surface once, then recover to `Idle`.
fn fail(ctx: &mut LoopContext, message: String) {
    warn!(message = %message, "transient controller failure");
    set_state(ctx, ControllerState::Error, Some(message.clone()));
    notice(ctx, NoticeLevel::Error, &message);
    set_state(ctx, ControllerState::Idle, None);
}

fn current_state(ctx: &LoopContext) -> ControllerState {
    *ctx.state.lock()
}

fn voice_output_on(ctx: &LoopContext) -> bool {
    ctx.voice_output_enabled.load(Ordering::SeqCst) && ctx.output_availability.usable()
}

fn set_state(ctx: &mut LoopContext, new_state: ControllerState, detail: Option<String>) {
    *ctx.state.lock() = new_state;
    let _ = ctx.state_tx.send(ControllerStateEvent {
        state: new_state,
        detail,
    });
}

fn notice(ctx: &LoopContext, level: NoticeLevel, message: &str) {
    let _ = ctx.notice_tx.send(NoticeEvent {
        level,
        message: message.to_string(),
    });
}

fn emit_preview(ctx: &mut LoopContext, text: String) {
    *ctx.preview.lock() = text.clone();
    ctx.preview_seq += 1;
    let _ = ctx.preview_tx.send(TranscriptPreviewEvent {
        seq: ctx.preview_seq,
        text,
    });
}

fn clear_preview(ctx: &mut LoopContext) {
    if ctx.preview.lock().is_empty() {
        return;
    }
    emit_preview(ctx, String::new());
}
