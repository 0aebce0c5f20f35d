use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use patchwire_codec::EventEnvelope;
use patchwire_core::PatchwireError;
use tokio::sync::mpsc;

/// Sending half of an open event stream.
///
/// Every clone shares one `closed` flag: once a terminal event went out, no
/// holder may write again. The envelope last set by the callback is shared
/// the same way, so blocks written by the guard carry it too.
#[derive(Clone)]
pub(crate) struct StreamLink {
    tx: mpsc::UnboundedSender<Bytes>,
    closed: Arc<AtomicBool>,
    envelope: Arc<Mutex<EventEnvelope>>,
}

impl StreamLink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Bytes>) -> Self {
        Self {
            tx,
            closed: Arc::new(AtomicBool::new(false)),
            envelope: Arc::new(Mutex::new(EventEnvelope::default())),
        }
    }

    pub(crate) fn set_envelope(&self, envelope: &EventEnvelope) {
        let mut current = self.envelope.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = envelope.clone();
    }

    pub(crate) fn envelope(&self) -> EventEnvelope {
        self.envelope
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Queues a block for the body. The block is on its way to the peer
    /// before this returns; a dropped receiver means the peer disconnected.
    pub(crate) fn send(&self, block: Bytes) -> Result<(), PatchwireError> {
        if self.is_closed() {
            return Err(PatchwireError::Terminated);
        }
        self.tx.send(block).map_err(|_| {
            tracing::debug!("StreamLink: peer disconnected");
            PatchwireError::Transport("client disconnected".into())
        })
    }

    /// Writes the final block and closes the link for every holder.
    pub(crate) fn send_terminal(&self, block: Bytes) -> Result<(), PatchwireError> {
        let sent = self.send(block);
        self.closed.store(true, Ordering::Release);
        sent
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// True once the body was dropped, i.e. the client went away.
    pub(crate) fn is_peer_gone(&self) -> bool {
        self.tx.is_closed()
    }
}
