pub mod backoff; // Reconnect delay policy
pub mod client;  // Push/poll sync client

use std::time::Duration;

use thiserror::Error;

use hallwatch_core::{ScanResult, Snapshot};

pub use backoff::Backoff;
pub use client::{SyncClient, SyncSettings};

// --- Error Type ---
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Malformed snapshot payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Which transport currently feeds snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Push,
    Poll,
}

/// Connectivity as surfaced to the UI. `Lost` is a state, not a transport;
/// the last good snapshot stays on screen while in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected(TransportKind),
    Reconnecting,
    Lost,
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Connected(TransportKind::Push) => "push",
            ConnectionState::Connected(TransportKind::Poll) => "poll",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Lost => "lost",
        }
    }

    /// Timers must stop advancing once connectivity is lost.
    pub fn is_lost(&self) -> bool {
        matches!(self, ConnectionState::Lost)
    }
}

/// Everything the sync tasks hand to the render thread. The render thread
/// drains these at the top of each tick; sync tasks never touch pool state.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A freshly-installed snapshot. `rtt` is measured around poll
    /// fetches; push messages carry none.
    Snapshot {
        snapshot: Snapshot,
        rtt: Option<Duration>,
    },
    Connection(ConnectionState),
    Scan(ScanResult),
}
