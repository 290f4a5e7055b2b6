//! # Watch Streams
//!
//! A [`WatchStream`] is an effectively infinite sequence of change notifications. It
//! never reports a lag as an error: a subscriber that falls behind receives a single
//! [`WatchEvent::Resync`] and is expected to re-list, which is all a level-triggered
//! consumer needs.

use crate::message::WatchEvent;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

pub struct WatchStream {
    receiver: broadcast::Receiver<WatchEvent>,
}

impl WatchStream {
    pub fn new(receiver: broadcast::Receiver<WatchEvent>) -> Self {
        Self { receiver }
    }

    /// Waits for the next event. Returns `None` once the store has shut down.
    pub async fn next(&mut self) -> Option<WatchEvent> {
        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(RecvError::Lagged(missed)) => {
                warn!(missed, "Watch lagged, requesting resync");
                Some(WatchEvent::Resync)
            }
            Err(RecvError::Closed) => None,
        }
    }
}
