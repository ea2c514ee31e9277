//! The connection actor.
//!
//! Owns the transport handle, the decoder, and all timers for the current
//! attempt; every reconnect creates fresh ones. All failure sources funnel
//! into [`ClientActor::handle_failure`], which decides retry vs. terminal.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::dispatch::{lifecycle, EventDispatcher, EventPayload};
use crate::error::{DisconnectReason, TransportError};
use crate::sse::{SseDecoder, SseFrame};
use crate::traits::{Headers, StreamTransport};

use super::{
    backoff_delay, ClientCommand, ConnectionState, RetryState, SseClientConfig, StateChange,
};

/// How one connection attempt ended.
enum AttemptOutcome {
    /// The attempt failed; run the error path.
    Failed(DisconnectReason),
    /// A manual reconnect was requested mid-attempt.
    Reconnect,
    /// Close was requested (or the handle dropped).
    CloseRequested,
    /// `[DONE]` arrived with auto-close configured.
    DoneAutoClose,
}

/// Whether the actor keeps running after the error path.
#[derive(PartialEq)]
enum Flow {
    Continue,
    Stop,
}

enum FrameFlow {
    Continue,
    Done,
}

struct ClientActor {
    config: SseClientConfig,
    transport: Arc<dyn StreamTransport>,
    dispatcher: Arc<EventDispatcher>,
    command_rx: mpsc::UnboundedReceiver<ClientCommand>,
    state_tx: watch::Sender<ConnectionState>,
    closed: Arc<AtomicBool>,
    retry: RetryState,
    /// Record ids already delivered, when dedup-by-id is on.
    seen_ids: HashSet<String>,
}

pub(crate) async fn run_client_loop(
    config: SseClientConfig,
    transport: Arc<dyn StreamTransport>,
    dispatcher: Arc<EventDispatcher>,
    command_rx: mpsc::UnboundedReceiver<ClientCommand>,
    state_tx: watch::Sender<ConnectionState>,
    closed: Arc<AtomicBool>,
) {
    let retry = RetryState {
        retry_count: 0,
        base_interval: config.base_retry_interval,
        last_event_id: None,
    };
    let mut actor = ClientActor {
        config,
        transport,
        dispatcher,
        command_rx,
        state_tx,
        closed,
        retry,
        seen_ids: HashSet::new(),
    };
    actor.run().await;
}

impl ClientActor {
    async fn run(&mut self) {
        loop {
            if self.closed.load(Ordering::SeqCst) {
                break;
            }
            match self.run_attempt().await {
                AttemptOutcome::Failed(reason) => {
                    if self.handle_failure(reason).await == Flow::Stop {
                        break;
                    }
                }
                AttemptOutcome::Reconnect => {
                    self.retry.retry_count = 0;
                }
                AttemptOutcome::CloseRequested => break,
                AttemptOutcome::DoneAutoClose => {
                    // Same permanent flag as a manual close: no reconnect
                    // after a completed stream.
                    self.closed.store(true, Ordering::SeqCst);
                    break;
                }
            }
        }
        debug!("connection loop ended");
        self.enter_closed();
    }

    /// One full connection attempt: open, validate, then pump the stream.
    async fn run_attempt(&mut self) -> AttemptOutcome {
        self.notify(ConnectionState::Connecting, None, None);
        debug!("connecting to {}", self.config.url);

        let headers = self.build_headers();
        // The watchdog covers the connect phase as well: an open that
        // hangs past the heartbeat timeout is a dead connection.
        let open_result = tokio::select! {
            result = tokio::time::timeout(
                self.config.heartbeat_timeout,
                self.transport.open(&self.config.url, &headers),
            ) => result,
            cmd = self.command_rx.recv() => return Self::command_outcome(cmd),
        };
        let handle = match open_result {
            Ok(Ok(handle)) => handle,
            Ok(Err(err)) => return AttemptOutcome::Failed(DisconnectReason::Transport(err)),
            Err(_) => return AttemptOutcome::Failed(DisconnectReason::HeartbeatTimeout),
        };

        // Best-effort validation: only what the transport surfaces.
        if let Some(status) = handle.status {
            if !(200..300).contains(&status) {
                return AttemptOutcome::Failed(DisconnectReason::Transport(
                    TransportError::HttpStatus { status },
                ));
            }
        }
        if let Some(content_type) = &handle.content_type {
            if !content_type.to_ascii_lowercase().contains("text/event-stream") {
                return AttemptOutcome::Failed(DisconnectReason::Transport(
                    TransportError::ContentType(content_type.clone()),
                ));
            }
        }

        self.retry.retry_count = 0;
        info!("stream open: {}", self.config.url);
        self.notify(ConnectionState::Open, None, None);
        self.dispatcher.emit(lifecycle::OPEN, &EventPayload::Open);

        let mut stream = handle.stream;
        let mut decoder = SseDecoder::new();
        let mut last_receive = Instant::now();
        // The watchdog runs at half the timeout; comment lines count as
        // received data because last_receive is fed at the chunk level.
        let mut watchdog = tokio::time::interval(self.config.heartbeat_timeout / 2);
        watchdog.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        last_receive = Instant::now();
                        let frames = decoder.feed(&bytes);
                        match self.process_frames(frames, &mut decoder) {
                            FrameFlow::Continue => {}
                            FrameFlow::Done => return AttemptOutcome::DoneAutoClose,
                        }
                    }
                    Some(Err(err)) => {
                        return AttemptOutcome::Failed(DisconnectReason::Transport(err));
                    }
                    None => {
                        // The server hung up without the sentinel.
                        return AttemptOutcome::Failed(DisconnectReason::Transport(
                            TransportError::StreamEnded,
                        ));
                    }
                },
                _ = watchdog.tick() => {
                    if last_receive.elapsed() > self.config.heartbeat_timeout {
                        return AttemptOutcome::Failed(DisconnectReason::HeartbeatTimeout);
                    }
                }
                cmd = self.command_rx.recv() => return Self::command_outcome(cmd),
            }
        }
    }

    fn command_outcome(cmd: Option<ClientCommand>) -> AttemptOutcome {
        match cmd {
            Some(ClientCommand::Reconnect) => AttemptOutcome::Reconnect,
            Some(ClientCommand::Close) | None => AttemptOutcome::CloseRequested,
        }
    }

    /// Dispatch decoded frames and harvest decoder side-channels.
    fn process_frames(&mut self, frames: Vec<SseFrame>, decoder: &mut SseDecoder) -> FrameFlow {
        if let Some(interval) = decoder.take_retry_hint() {
            debug!("server adjusted retry interval to {:?}", interval);
            self.retry.base_interval = interval;
        }
        if let Some(id) = decoder.last_event_id() {
            self.retry.last_event_id = Some(id.to_string());
        }

        for frame in frames {
            match frame {
                SseFrame::Done => {
                    info!("stream completed");
                    self.dispatcher.emit(lifecycle::DONE, &EventPayload::Done);
                    if self.config.auto_close_on_done {
                        return FrameFlow::Done;
                    }
                }
                SseFrame::Record(record) => {
                    if self.config.dedup_by_id {
                        if let Some(id) = &record.id {
                            if !self.seen_ids.insert(id.clone()) {
                                debug!("skipping duplicate record id {}", id);
                                continue;
                            }
                        }
                    }
                    let event = record.event.clone();
                    self.dispatcher.emit(&event, &EventPayload::Message(record));
                }
            }
        }
        FrameFlow::Continue
    }

    /// The single error funnel: notify, tear down, schedule retry or go
    /// terminal.
    async fn handle_failure(&mut self, reason: DisconnectReason) -> Flow {
        if self.closed.load(Ordering::SeqCst) {
            return Flow::Stop;
        }

        let code = match &reason {
            DisconnectReason::Transport(err) => err.error_code(),
            DisconnectReason::HeartbeatTimeout => "E_HEARTBEAT",
        };
        let reason_text = reason.to_string();
        warn!("stream error ({}): {}", code, reason_text);
        self.dispatcher.emit(
            lifecycle::ERROR,
            &EventPayload::Error {
                reason: reason_text.clone(),
            },
        );

        self.retry.retry_count += 1;
        if self.retry.retry_count > self.config.max_retries {
            error!(
                "giving up after {} consecutive failures",
                self.config.max_retries
            );
            self.notify(ConnectionState::Closed, None, Some(reason_text));
            return self.wait_for_manual_reconnect().await;
        }

        let delay = backoff_delay(
            self.retry.base_interval,
            self.retry.retry_count,
            self.config.max_retry_delay,
        );
        info!(
            "reconnect attempt {} of {} in {:?}",
            self.retry.retry_count, self.config.max_retries, delay
        );
        self.notify(ConnectionState::Connecting, Some(delay), Some(reason_text));

        tokio::select! {
            _ = tokio::time::sleep(delay) => Flow::Continue,
            cmd = self.command_rx.recv() => match cmd {
                Some(ClientCommand::Reconnect) => {
                    self.retry.retry_count = 0;
                    Flow::Continue
                }
                Some(ClientCommand::Close) | None => Flow::Stop,
            },
        }
    }

    /// Park after retries are exhausted. Automatic reconnection has
    /// stopped, but a manual reconnect() still restarts the loop.
    async fn wait_for_manual_reconnect(&mut self) -> Flow {
        loop {
            match self.command_rx.recv().await {
                Some(ClientCommand::Reconnect) => {
                    if self.closed.load(Ordering::SeqCst) {
                        return Flow::Stop;
                    }
                    self.retry.retry_count = 0;
                    return Flow::Continue;
                }
                Some(ClientCommand::Close) | None => return Flow::Stop,
            }
        }
    }

    fn build_headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert("Accept".to_string(), "text/event-stream".to_string());
        headers.insert("Cache-Control".to_string(), "no-cache".to_string());
        if let Some(id) = &self.retry.last_event_id {
            headers.insert("Last-Event-ID".to_string(), id.clone());
        }
        // Caller-supplied headers win on collision.
        headers.extend(self.config.headers.clone());
        headers
    }

    fn notify(
        &self,
        state: ConnectionState,
        next_retry_delay: Option<std::time::Duration>,
        reason: Option<String>,
    ) {
        let _ = self.state_tx.send(state);
        let change = StateChange {
            state,
            retry_count: self.retry.retry_count,
            retry_interval: self.retry.base_interval,
            next_retry_delay,
            reason,
            last_event_id: self.retry.last_event_id.clone(),
            timestamp: Utc::now(),
        };
        self.dispatcher
            .emit(lifecycle::STATE_CHANGE, &EventPayload::StateChange(change));
    }

    fn enter_closed(&self) {
        if *self.state_tx.borrow() != ConnectionState::Closed {
            self.notify(ConnectionState::Closed, None, None);
        }
    }
}
