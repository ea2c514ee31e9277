//! Minimal end-to-end demo: connect to an SSE endpoint and pace its text
//! to stdout with a typing cadence.
//!
//! Run with: cargo run --example stream_demo -- http://host/stream

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use trickle::client::{ConnectionState, SseClient, SseClientConfig};
use trickle::dispatch::{lifecycle, EventPayload};
use trickle::pacing::{Pacer, PacerConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://127.0.0.1:8080/stream".to_string());

    let pacer = Arc::new(Pacer::spawn(PacerConfig::token(), |update| {
        print!("{}", update.appended);
        let _ = std::io::stdout().flush();
    }));

    let client = SseClient::connect(SseClientConfig::new(&url));

    let enqueue = pacer.clone();
    client.on(lifecycle::MESSAGE, move |payload| {
        if let EventPayload::Message(record) = payload {
            enqueue.enqueue(record.data.as_str());
        }
    });
    let finish = pacer.clone();
    client.on(lifecycle::DONE, move |_| finish.flush_now());
    client.on(lifecycle::ERROR, |payload| {
        if let EventPayload::Error { reason } = payload {
            eprintln!("\nstream error: {}", reason);
        }
    });

    // Run until the connection reaches its terminal state.
    let mut state_rx = client.state_receiver();
    loop {
        if *state_rx.borrow_and_update() == ConnectionState::Closed {
            break;
        }
        if state_rx.changed().await.is_err() {
            break;
        }
    }

    pacer.flush_now();
    tokio::time::sleep(Duration::from_millis(100)).await;
    println!();
}
