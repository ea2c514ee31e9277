//! Pacing actor and handle.
//!
//! [`Pacer`] is a handle to a background task that owns a [`PacerCore`]
//! and the render callback, and drives flushes on a tokio interval. All
//! mutation happens on the actor task; the handle only sends commands.

use tokio::sync::mpsc;
use tracing::debug;

use super::core::{FlushUpdate, PacerConfig, PacerCore};

#[derive(Debug)]
enum PacerCommand {
    Enqueue(String),
    Pause,
    Resume,
    FlushNow,
    Stop,
}

/// Handle to a pacing queue.
///
/// Created once per rendering session; dropping it (or calling
/// [`stop`](Pacer::stop)) ends the session and discards queued data.
pub struct Pacer {
    command_tx: mpsc::UnboundedSender<PacerCommand>,
}

impl Pacer {
    /// Spawn the pacing actor. The render callback runs on the actor task,
    /// once per flush. Must be called within a tokio runtime.
    pub fn spawn<F>(config: PacerConfig, on_flush: F) -> Self
    where
        F: FnMut(FlushUpdate<'_>) + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_pacer_loop(PacerCore::new(config), on_flush, command_rx));
        Self { command_tx }
    }

    /// Queue a fragment for paced delivery. Ignored after `stop()`.
    pub fn enqueue(&self, fragment: impl Into<String>) {
        let _ = self.command_tx.send(PacerCommand::Enqueue(fragment.into()));
    }

    /// Halt flushing without discarding queued data.
    pub fn pause(&self) {
        let _ = self.command_tx.send(PacerCommand::Pause);
    }

    /// Restart flushing without replaying already-flushed output.
    pub fn resume(&self) {
        let _ = self.command_tx.send(PacerCommand::Resume);
    }

    /// Drain the queue with an enlarged budget until empty (or paused).
    /// Used when the upstream signals completion, so a long residual tail
    /// is not paced out slowly after the source already finished.
    pub fn flush_now(&self) {
        let _ = self.command_tx.send(PacerCommand::FlushNow);
    }

    /// Terminal: discard queued data, halt the timer, reject further
    /// enqueues. Safe and idempotent at any time.
    pub fn stop(&self) {
        let _ = self.command_tx.send(PacerCommand::Stop);
    }
}

impl Drop for Pacer {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Pacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pacer").finish_non_exhaustive()
    }
}

async fn run_pacer_loop<F>(
    mut core: PacerCore,
    mut on_flush: F,
    mut command_rx: mpsc::UnboundedReceiver<PacerCommand>,
) where
    F: FnMut(FlushUpdate<'_>) + Send + 'static,
{
    let mut ticker = tokio::time::interval(core.config().flush_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(start) = core.flush_once() {
                    on_flush(core.update_from(start));
                }
            }
            cmd = command_rx.recv() => match cmd {
                Some(PacerCommand::Enqueue(fragment)) => core.enqueue(&fragment),
                Some(PacerCommand::Pause) => core.pause(),
                Some(PacerCommand::Resume) => core.resume(),
                Some(PacerCommand::FlushNow) => {
                    while let Some(start) = core.flush_burst() {
                        on_flush(core.update_from(start));
                    }
                }
                Some(PacerCommand::Stop) | None => {
                    core.stop();
                    break;
                }
            },
        }
    }
    debug!("pacing loop ended");
}
