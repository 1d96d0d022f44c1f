//! Protocol Engine (C4, §4.4) — the hard core. One TCP session at a time;
//! `accept` closes and replaces the previous one. Inside a running session
//! two cooperative tasks share the connection (§5): a reader that
//! demultiplexes inbound frames into a single-slot rendezvous channel, and
//! the cycle driver that owns the write half and runs the Gate/Request/
//! Receive/Observe/Decide/Act loop. Mirrors the reader/sender task split in
//! the teacher's `websocket.rs` `handle_socket`, narrowed to a
//! capacity-1 channel per the spec's "single-slot rendezvous... with
//! cancellation on timeout."

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use mgba_bridge_config::{ConfigSnapshot, ConfigStore};
use mgba_bridge_detect::GameDetector;
use mgba_bridge_llm::{encode_png_base64, to_data_uri, AnalyzeRequest, LlmAdapter, MemoryContext, ReadinessConfig};
use mgba_bridge_protocol::{classify, ChatMessageBody, ScreenshotEnvelope};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::buffer::ChatBuffer;
use crate::frame::{
    game_config_frame, parse_line, InboundFrame, LineOutcome, FrameAccumulator, REQUEST_SCREENSHOT,
};

const CONFIG_RETRY_LIMIT: u32 = 3;
const CONFIG_RETRY_DELAY: Duration = Duration::from_secs(1);

/// The fixed set of collaborators one running session needs. Built once at
/// service start and cloned (as `Arc`s) into every accepted session.
pub struct ProtocolEngine {
    buffer: Arc<ChatBuffer>,
    config_store: Arc<dyn ConfigStore>,
    detector: Arc<GameDetector>,
    llm: Arc<LlmAdapter>,
    cycle_timeout: Duration,
    malformed_threshold: u32,
    malformed_window: Duration,
    /// Per-cycle movement/action history, shared so `POST /api/reset-llm-session/`
    /// can clear it without tearing down the running session (§6).
    memory: Mutex<MemoryContext>,
    current_session: Mutex<Option<AbortOnDrop>>,
    /// Tracks the outer accept loop's task, separate from `current_session`
    /// (the active connection), so `stop`/`start` can free and rebind the
    /// listening port instead of layering a second listener on top of it.
    listener_task: Mutex<Option<AbortOnDrop>>,
}

/// Aborts the held task when dropped, so replacing or ending a session always
/// tears down its reader task too (§5 cancellation).
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl ProtocolEngine {
    pub fn new(
        buffer: Arc<ChatBuffer>,
        config_store: Arc<dyn ConfigStore>,
        detector: Arc<GameDetector>,
        llm: Arc<LlmAdapter>,
        cycle_timeout: Duration,
        malformed_threshold: u32,
        malformed_window: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            buffer,
            config_store,
            detector,
            llm,
            cycle_timeout,
            malformed_threshold,
            malformed_window,
            memory: Mutex::new(MemoryContext::default()),
            current_session: Mutex::new(None),
            listener_task: Mutex::new(None),
        })
    }

    /// Start the outer accept loop on a background task, unless one is
    /// already running. Returns `false` without starting a second listener
    /// if the engine is already bound (`POST /api/restart-service/` calls
    /// `stop` first so this always finds a free slot).
    pub async fn start(self: Arc<Self>, bind_addr: String) -> bool {
        let mut slot = self.listener_task.lock().await;
        if slot.is_some() {
            tracing::warn!("start requested but the protocol engine is already listening");
            return false;
        }

        let engine = self.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = engine.serve(&bind_addr).await {
                tracing::error!(error = %e, "protocol engine listener stopped");
            }
        });
        *slot = Some(AbortOnDrop(handle));
        true
    }

    /// Stop the listener (freeing the port) and cancel whatever session is
    /// currently running (`POST /api/stop-service/`, §6). Safe to call when
    /// nothing is running.
    pub async fn stop(&self) {
        let mut listener_slot = self.listener_task.lock().await;
        *listener_slot = None;
        drop(listener_slot);
        self.stop_current_session().await;
    }

    /// The outer accept loop (§4.4: "a new `accept` closes and replaces the
    /// previous session"). Runs until the listener itself fails. Exposed for
    /// tests that want to drive a session directly; production code should
    /// go through [`start`](Self::start)/[`stop`](Self::stop) instead.
    pub async fn serve(self: Arc<Self>, bind_addr: &str) -> std::io::Result<()> {
        let listener = TcpListener::bind(bind_addr).await?;
        tracing::info!(bind_addr, "protocol engine listening");

        loop {
            let (stream, peer) = listener.accept().await?;
            tracing::info!(%peer, "accepted emulator connection, replacing any prior session");

            let engine = self.clone();
            let handle = tokio::spawn(async move {
                engine.run_session(stream).await;
            });

            let mut slot = self.current_session.lock().await;
            *slot = Some(AbortOnDrop(handle));
        }
    }

    /// Cancel whatever session is currently running (`POST /api/stop-service/`,
    /// §6), re-entering `Listening`.
    pub async fn stop_current_session(&self) {
        let mut slot = self.current_session.lock().await;
        *slot = None;
    }

    /// Clear the per-cycle movement/action history without restarting the
    /// session (`POST /api/reset-llm-session/`, §6).
    pub async fn reset_memory(&self) {
        *self.memory.lock().await = MemoryContext::default();
    }

    async fn run_session(self: Arc<Self>, stream: TcpStream) {
        let session_id = uuid::Uuid::new_v4();
        let _span = tracing::info_span!("session", %session_id).entered();

        self.buffer
            .append(ChatMessageBody::System {
                content: "emulator connected".to_string(),
            })
            .await;

        let (mut read_half, mut write_half) = stream.into_split();
        let mut acc = FrameAccumulator::new();
        let mut pending: VecDeque<String> = VecDeque::new();

        if !matches!(
            await_ready(&mut read_half, &mut acc, &mut pending).await,
            Ok(true)
        ) {
            tracing::info!("session ended during handshake");
            return;
        }
        tracing::info!("handshake complete, configuring");

        let config = match self.config_store.get_snapshot().await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "failed to read config snapshot");
                return;
            }
        };

        let (game_id, source) =
            self.detector
                .detect(&config.rom_path, &config.rom_name, config.game_override.as_deref());
        tracing::info!(game_id, source = source.as_str(), "game detected");

        let game_config = match self.detector.config_for(&game_id) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "no game config available for detected game");
                return;
            }
        };

        let frame = game_config_frame(&game_config);
        let configured = await_config_loaded(
            &mut read_half,
            &mut write_half,
            &mut acc,
            &mut pending,
            &frame,
        )
        .await;

        if !matches!(configured, Ok(true)) {
            tracing::info!("configuring phase did not complete, returning to listening");
            return;
        }

        self.buffer
            .append(ChatMessageBody::System {
                content: format!("game configured: {game_id}"),
            })
            .await;
        tracing::info!("entering running state");

        // A fresh session starts with a clean slate, matching "Reset read
        // buffer, cycle counter, and last-cycle timestamps" on accept (§4.4).
        self.reset_memory().await;

        self.run_cycle_loop(read_half, write_half, acc, pending, config).await;
    }

    async fn run_cycle_loop(
        self: Arc<Self>,
        read_half: OwnedReadHalf,
        mut write_half: OwnedWriteHalf,
        acc: FrameAccumulator,
        pending: VecDeque<String>,
        config: ConfigSnapshot,
    ) {
        let (tx_screenshot, mut rx_screenshot) = mpsc::channel::<ScreenshotEnvelope>(1);

        // Out-of-order `after_screenshot_data` frames (§4.4's resolved open
        // question) are only ever appended to the Chat Buffer, never fed to
        // the LLM — but encoding them to base64 still takes real time, so
        // that work is handed off this same way the driver's own
        // Gate/Request/Receive/Observe loop keeps encoding off the reader
        // (§5: "No user code runs on the socket reader path longer than
        // buffer append + rendezvous signal").
        let (tx_after, mut rx_after) = mpsc::unbounded_channel::<ScreenshotEnvelope>();
        let after_buffer = self.buffer.clone();
        let after_writer_handle = tokio::spawn(async move {
            while let Some(env) = rx_after.recv().await {
                let body = screenshot_body(&env).await;
                after_buffer.append(body).await;
            }
        });
        let _after_writer_guard = AbortOnDrop(after_writer_handle);

        let reader_handle = tokio::spawn(reader_loop(
            read_half,
            acc,
            pending,
            tx_screenshot,
            tx_after,
            self.buffer.clone(),
            self.malformed_threshold,
            self.malformed_window,
        ));
        let _reader_guard = AbortOnDrop(reader_handle);

        let mut last_action_sent: Option<Instant> = None;

        'cycle: loop {
            // 1. Gate.
            let class = self.memory.lock().await.last_action_class.unwrap_or_default();
            let factor = class.multiplier(
                config.timing.movement_multiplier,
                config.timing.interaction_multiplier,
                config.timing.menu_multiplier,
            );
            let cooldown = Duration::from_secs_f64(config.decision_cooldown_s * factor)
                .max(Duration::from_secs_f64(config.decision_cooldown_s));

            if let Some(sent_at) = last_action_sent {
                let elapsed = sent_at.elapsed();
                if elapsed < cooldown {
                    tokio::time::sleep(cooldown - elapsed).await;
                }
            }

            // 2. Request.
            if write_half
                .write_all(format!("{REQUEST_SCREENSHOT}\n").as_bytes())
                .await
                .is_err()
            {
                tracing::warn!("socket fault sending request_screenshot, closing session");
                break 'cycle;
            }

            // 3. Receive.
            let received = tokio::time::timeout(self.cycle_timeout, rx_screenshot.recv()).await;
            let envelope = match received {
                Ok(Some(env)) => env,
                Ok(None) => {
                    tracing::info!("reader closed, ending session");
                    break 'cycle;
                }
                Err(_) => {
                    self.buffer
                        .append(ChatMessageBody::System {
                            content: "cycle timeout".to_string(),
                        })
                        .await;
                    continue 'cycle;
                }
            };

            // 4. Observe.
            self.observe(&envelope).await;

            // 5. Decide.
            let readiness = ReadinessConfig {
                base_stabilization_ms: config.timing.base_stabilization_ms,
                movement_multiplier: config.timing.movement_multiplier,
                interaction_multiplier: config.timing.interaction_multiplier,
                menu_multiplier: config.timing.menu_multiplier,
                max_wait_ms: config.timing.max_wait_ms,
            };
            let memory_snapshot = self.memory.lock().await.clone();
            let request = AnalyzeRequest {
                current_path: envelope.current_path.clone(),
                previous_path: envelope.previous_path.clone(),
                game_state: envelope.game_state,
                memory: memory_snapshot,
                notepad_path: config.notepad_path.clone(),
                readiness,
            };
            let decision = self.llm.analyze(request).await;

            if let Some(error) = &decision.error {
                self.buffer
                    .append(ChatMessageBody::AiResponse {
                        text: decision.text.clone(),
                        actions: vec![],
                        error_details: Some(error.detail()),
                    })
                    .await;
                continue 'cycle;
            }

            // 6. Act.
            let class = classify(&decision.actions);
            self.buffer
                .append(ChatMessageBody::AiResponse {
                    text: decision.text.clone(),
                    actions: decision.actions.actions().to_vec(),
                    error_details: None,
                })
                .await;

            if !decision.actions.is_empty() {
                let frame = decision.actions.encode_wire();
                if write_half
                    .write_all(format!("{frame}\n").as_bytes())
                    .await
                    .is_err()
                {
                    tracing::warn!("socket fault sending button frame, closing session");
                    break 'cycle;
                }
                last_action_sent = Some(Instant::now());
                self.memory.lock().await.last_action_class = Some(class);
            }
            self.memory
                .lock()
                .await
                .push_actions(decision.actions.names().into_iter().map(String::from).collect());
        }
    }

    async fn observe(&self, envelope: &ScreenshotEnvelope) {
        let body = screenshot_body(envelope).await;
        self.buffer.append(body).await;
        self.memory.lock().await.push_position(&envelope.game_state);
    }
}

/// Base64-encode a screenshot envelope into its Chat Buffer body (§3). Free
/// function so both the cycle driver's `observe` and the after-screenshot
/// writer task can reuse it without either running on the socket reader path.
async fn screenshot_body(envelope: &ScreenshotEnvelope) -> ChatMessageBody {
    let current_uri = match encode_png_base64(&envelope.current_path).await {
        Ok(encoded) => to_data_uri(&encoded),
        Err(e) => {
            tracing::warn!(error = %e, "failed to encode screenshot for chat buffer");
            String::new()
        }
    };

    match &envelope.previous_path {
        Some(previous_path) => {
            let previous_uri = match encode_png_base64(previous_path).await {
                Ok(encoded) => to_data_uri(&encoded),
                Err(_) => String::new(),
            };
            ChatMessageBody::ScreenshotComparison {
                previous_uri,
                current_uri,
                game_state: envelope.game_state,
            }
        }
        None => ChatMessageBody::Screenshot {
            image_data_uri: current_uri,
            game_state: envelope.game_state,
        },
    }
}

async fn read_next_line(
    read_half: &mut OwnedReadHalf,
    acc: &mut FrameAccumulator,
    pending: &mut VecDeque<String>,
) -> std::io::Result<Option<String>> {
    if let Some(line) = pending.pop_front() {
        return Ok(Some(line));
    }

    let mut buf = [0u8; 4096];
    loop {
        let n = read_half.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        let mut lines = acc.push(&buf[..n]);
        if lines.is_empty() {
            continue;
        }
        let first = lines.remove(0);
        pending.extend(lines);
        return Ok(Some(first));
    }
}

async fn await_ready(
    read_half: &mut OwnedReadHalf,
    acc: &mut FrameAccumulator,
    pending: &mut VecDeque<String>,
) -> std::io::Result<bool> {
    loop {
        match read_next_line(read_half, acc, pending).await? {
            None => return Ok(false),
            Some(line) => {
                if matches!(parse_line(&line), LineOutcome::Frame(InboundFrame::Ready)) {
                    return Ok(true);
                }
            }
        }
    }
}

async fn await_config_loaded(
    read_half: &mut OwnedReadHalf,
    write_half: &mut OwnedWriteHalf,
    acc: &mut FrameAccumulator,
    pending: &mut VecDeque<String>,
    config_frame: &str,
) -> std::io::Result<bool> {
    write_half.write_all(config_frame.as_bytes()).await?;
    write_half.write_all(b"\n").await?;

    let mut retries = 0u32;
    loop {
        match read_next_line(read_half, acc, pending).await? {
            None => return Ok(false),
            Some(line) => match parse_line(&line) {
                LineOutcome::Frame(InboundFrame::ConfigLoaded) => return Ok(true),
                LineOutcome::Frame(InboundFrame::ConfigError(detail)) => {
                    tracing::warn!(detail, retries, "config rejected by emulator");
                    retries += 1;
                    if retries > CONFIG_RETRY_LIMIT {
                        return Ok(false);
                    }
                    tokio::time::sleep(CONFIG_RETRY_DELAY).await;
                    write_half.write_all(config_frame.as_bytes()).await?;
                    write_half.write_all(b"\n").await?;
                }
                _ => {}
            },
        }
    }
}

/// The reader side of the Running state: demultiplexes inbound frames,
/// forwarding screenshot-bearing ones through the rendezvous channel and
/// handling everything else out of band (§4.4's "dispatched out of band").
async fn reader_loop(
    mut read_half: OwnedReadHalf,
    mut acc: FrameAccumulator,
    seed: VecDeque<String>,
    tx_screenshot: mpsc::Sender<ScreenshotEnvelope>,
    tx_after: mpsc::UnboundedSender<ScreenshotEnvelope>,
    buffer: Arc<ChatBuffer>,
    malformed_threshold: u32,
    malformed_window: Duration,
) {
    let mut malformed_times: VecDeque<Instant> = VecDeque::new();

    for line in seed {
        if !process_line(
            &line,
            &tx_screenshot,
            &tx_after,
            &buffer,
            &mut malformed_times,
            malformed_threshold,
            malformed_window,
        )
        .await
        {
            return;
        }
    }

    let mut buf = [0u8; 4096];
    loop {
        let n = match read_half.read(&mut buf).await {
            Ok(0) => {
                tracing::info!("emulator closed the connection");
                return;
            }
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, "socket fault, ending session");
                return;
            }
        };

        for line in acc.push(&buf[..n]) {
            if !process_line(
                &line,
                &tx_screenshot,
                &tx_after,
                &buffer,
                &mut malformed_times,
                malformed_threshold,
                malformed_window,
            )
            .await
            {
                return;
            }
        }
    }
}

/// Returns `false` when the session should end (malformed threshold hit or
/// the rendezvous receiver has gone away).
async fn process_line(
    line: &str,
    tx_screenshot: &mpsc::Sender<ScreenshotEnvelope>,
    tx_after: &mpsc::UnboundedSender<ScreenshotEnvelope>,
    buffer: &Arc<ChatBuffer>,
    malformed_times: &mut VecDeque<Instant>,
    malformed_threshold: u32,
    malformed_window: Duration,
) -> bool {
    match parse_line(line) {
        LineOutcome::Frame(InboundFrame::Screenshot(env))
        | LineOutcome::Frame(InboundFrame::EnhancedScreenshot(env)) => {
            // At most one outstanding screenshot request per session (P6); if
            // the slot is somehow already full, the newer frame is dropped
            // rather than blocking the reader.
            let _ = tx_screenshot.try_send(env);
        }
        LineOutcome::Frame(InboundFrame::AfterScreenshot(env)) => {
            // Resolved open question: an unrequested after-frame is attached
            // to the Chat Buffer only, never fed to the LLM. Forwarded
            // unencoded so the reader stays on the hot path (§5); the
            // after-screenshot writer task does the actual base64 work.
            let _ = tx_after.send(env);
        }
        LineOutcome::Frame(InboundFrame::ConfigError(detail)) => {
            tracing::warn!(detail, "config_error received outside configuring phase");
        }
        LineOutcome::Frame(InboundFrame::State(state)) => {
            tracing::debug!(?state, "state-only frame received during running phase, ignoring");
        }
        LineOutcome::Frame(InboundFrame::Ready) | LineOutcome::Frame(InboundFrame::ConfigLoaded) => {
            tracing::debug!("handshake frame repeated mid-session, ignoring");
        }
        LineOutcome::ToleratedUnknown(raw) => {
            tracing::debug!(raw, "tolerated unknown residual");
        }
        LineOutcome::Malformed(raw) => {
            tracing::warn!(raw, "malformed frame");
            let now = Instant::now();
            malformed_times.push_back(now);
            while malformed_times
                .front()
                .is_some_and(|t| now.duration_since(*t) > malformed_window)
            {
                malformed_times.pop_front();
            }
            if malformed_times.len() as u32 >= malformed_threshold {
                tracing::error!("malformed frame threshold exceeded, closing session");
                buffer
                    .append(ChatMessageBody::System {
                        content: "malformed frame threshold exceeded, closing session".to_string(),
                    })
                    .await;
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_cooldown_respects_decision_cooldown_floor() {
        let base = Duration::from_secs_f64(2.0);
        let factor = mgba_bridge_protocol::ActionClass::Base.multiplier(1.0, 1.5, 2.0);
        let cooldown = Duration::from_secs_f64(2.0 * factor).max(base);
        assert_eq!(cooldown, Duration::from_secs_f64(2.0));
    }
}
