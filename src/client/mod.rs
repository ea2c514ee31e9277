//! Resilient SSE connection state machine.
//!
//! [`SseClient`] is a handle to a background actor task that owns the
//! transport connection, the decoder, and all timers for the current
//! attempt. The actor drives the Connecting -> Open -> Connecting (on
//! error, with backoff) -> Closed (manual close or retries exhausted)
//! lifecycle and fans decoded records out through an [`EventDispatcher`].
//!
//! # Module structure
//! - `config` - [`SseClientConfig`], backoff schedule
//! - `actor` - the connection loop (`tokio::select!` over stream, watchdog
//!   and commands)

mod actor;
mod config;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::info;

use crate::adapters::ReqwestTransport;
use crate::dispatch::{EventDispatcher, EventPayload, SubscriberId};
use crate::traits::StreamTransport;

pub use config::SseClientConfig;
pub(crate) use config::{backoff_delay, RetryState};

/// Connection lifecycle state.
///
/// `Closed` is terminal only when reached via manual close or
/// max-retries-exceeded; error-triggered teardown returns to `Connecting`
/// so automatic retry can proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// Snapshot delivered with every `statechange` notification.
#[derive(Debug, Clone)]
pub struct StateChange {
    pub state: ConnectionState,
    pub retry_count: u32,
    /// Current base retry interval (server-adjustable via `retry:`).
    pub retry_interval: std::time::Duration,
    /// Computed backoff delay when a retry has been scheduled.
    pub next_retry_delay: Option<std::time::Duration>,
    /// Human-readable failure reason, on the error path.
    pub reason: Option<String>,
    pub last_event_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Commands accepted by the connection actor.
#[derive(Debug)]
pub(crate) enum ClientCommand {
    Close,
    Reconnect,
}

/// Handle to a streaming connection.
///
/// Created once per logical stream subscription; dropping it closes the
/// connection. Internally the actor recreates the transport connection and
/// decoder buffers on every reconnect.
pub struct SseClient {
    dispatcher: Arc<EventDispatcher>,
    command_tx: mpsc::UnboundedSender<ClientCommand>,
    state_rx: watch::Receiver<ConnectionState>,
    /// Manually-closed flag. Permanent once set; guards every callback and
    /// retry path in the actor.
    closed: Arc<AtomicBool>,
}

impl SseClient {
    /// Connect using the production reqwest transport.
    ///
    /// Spawns the connection actor and returns immediately; subscribe to
    /// `open`/`error`/`statechange` (or watch [`state_receiver`]) to follow
    /// the attempt. Must be called within a tokio runtime.
    ///
    /// [`state_receiver`]: SseClient::state_receiver
    pub fn connect(config: SseClientConfig) -> Self {
        Self::connect_with(config, Arc::new(ReqwestTransport::new()))
    }

    /// Connect using an injected transport (used by tests).
    pub fn connect_with(config: SseClientConfig, transport: Arc<dyn StreamTransport>) -> Self {
        let dispatcher = Arc::new(EventDispatcher::new());
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let closed = Arc::new(AtomicBool::new(false));

        let actor_dispatcher = dispatcher.clone();
        let actor_closed = closed.clone();
        tokio::spawn(async move {
            actor::run_client_loop(
                config,
                transport,
                actor_dispatcher,
                command_rx,
                state_tx,
                actor_closed,
            )
            .await;
        });

        Self {
            dispatcher,
            command_tx,
            state_rx,
            closed,
        }
    }

    /// Subscribe a callback under an event name (lifecycle or custom).
    pub fn on<F>(&self, event: &str, callback: F) -> SubscriberId
    where
        F: Fn(&EventPayload) + Send + Sync + 'static,
    {
        self.dispatcher.on(event, callback)
    }

    /// Remove a subscriber.
    pub fn off(&self, event: &str, id: SubscriberId) -> bool {
        self.dispatcher.off(event, id)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Subscribe to connection state changes.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Whether `close()` has been called (permanent).
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close the connection. Terminal and idempotent; no automatic
    /// reconnection afterwards.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("closing stream client");
        // The actor may already be gone (e.g. after auto-close on done).
        let _ = self.command_tx.send(ClientCommand::Close);
    }

    /// Reset the retry counter and reconnect immediately. No-op after
    /// `close()`.
    pub fn reconnect(&self) {
        if self.is_closed() {
            return;
        }
        let _ = self.command_tx.send(ClientCommand::Reconnect);
    }
}

impl Drop for SseClient {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SseClient")
            .field("state", &self.state())
            .field("closed", &self.is_closed())
            .finish()
    }
}
