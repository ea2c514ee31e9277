//! Latest-value coalescer for full-document re-renders.
//!
//! The pacing queue can deliver many small flushes per second; a consumer
//! that re-renders the whole document on each one wastes work. The
//! throttler keeps only the latest pending text and renders it once per
//! delay window, skipping values that were superseded before the window
//! fired.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
enum ThrottleCommand {
    Push(String),
    FlushNow,
    Stop,
}

/// Handle to a render throttler.
pub struct RenderThrottler {
    command_tx: mpsc::UnboundedSender<ThrottleCommand>,
}

impl RenderThrottler {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(80);

    /// Spawn the throttler actor with the default 80 ms window. The render
    /// callback runs on the actor task with the latest pending text only.
    pub fn spawn<F>(on_render: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        Self::spawn_with_interval(Self::DEFAULT_INTERVAL, on_render)
    }

    pub fn spawn_with_interval<F>(interval: Duration, on_render: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_throttle_loop(interval, on_render, command_rx));
        Self { command_tx }
    }

    /// Submit the current full text. Ignored if it equals the last
    /// rendered text; otherwise it replaces any pending value and arms the
    /// delay if not already armed.
    pub fn push(&self, text: impl Into<String>) {
        let _ = self.command_tx.send(ThrottleCommand::Push(text.into()));
    }

    /// Cancel the delay and render the pending value immediately.
    pub fn flush_now(&self) {
        let _ = self.command_tx.send(ThrottleCommand::FlushNow);
    }

    /// Cancel the delay and drop any pending value.
    pub fn stop(&self) {
        let _ = self.command_tx.send(ThrottleCommand::Stop);
    }
}

impl Drop for RenderThrottler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for RenderThrottler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderThrottler").finish_non_exhaustive()
    }
}

async fn run_throttle_loop<F>(
    interval: Duration,
    mut on_render: F,
    mut command_rx: mpsc::UnboundedReceiver<ThrottleCommand>,
) where
    F: FnMut(&str) + Send + 'static,
{
    let mut pending: Option<String> = None;
    let mut last_rendered = String::new();
    let mut deadline: Option<Instant> = None;

    loop {
        let armed = deadline;
        let delay = async move {
            match armed {
                Some(at) => tokio::time::sleep_until(at).await,
                None => futures::future::pending().await,
            }
        };

        tokio::select! {
            _ = delay => {
                deadline = None;
                if let Some(text) = pending.take() {
                    on_render(&text);
                    last_rendered = text;
                }
            }
            cmd = command_rx.recv() => match cmd {
                Some(ThrottleCommand::Push(text)) => {
                    if text == last_rendered {
                        continue;
                    }
                    pending = Some(text);
                    if deadline.is_none() {
                        deadline = Some(Instant::now() + interval);
                    }
                }
                Some(ThrottleCommand::FlushNow) => {
                    deadline = None;
                    if let Some(text) = pending.take() {
                        on_render(&text);
                        last_rendered = text;
                    }
                }
                Some(ThrottleCommand::Stop) | None => break,
            },
        }
    }
    debug!("render throttle loop ended");
}
