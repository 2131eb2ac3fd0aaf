//! Selection sync between the observing side and the authoritative side.
//!
//! The observing side (where the player picks a mode) sends one [`SyncMessage`] per
//! selection write; the authoritative side applies each message as a raw write. There is
//! no acknowledgement and no retry: the channel is ordered and reliable, sending never
//! blocks, and a message that fails to decode is logged and dropped.
//!
//! Frames travel as byte chunks per agent, so the receiver keeps one [`SyncFramer`] per
//! agent and only applies complete, checksummed frames, in the order they were sent.

pub mod framer;

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tokio::sync::mpsc;

use crate::code::{AssetCode, ModeCode};
use crate::selection::{AgentId, TreeKey};

pub use framer::{decode_body, encode_frame, SyncFramer, MAX_FRAME_SIZE};

/// The single sync message type: which tree, which key, and the new value (`None` clears).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMessage {
    pub tree: TreeKey,
    pub key: AssetCode,
    pub value: Option<ModeCode>,
}

impl SyncMessage {
    pub fn new(tree: TreeKey, key: AssetCode, value: Option<ModeCode>) -> Self {
        Self { tree, key, value }
    }
}

/// Raw bytes from one agent's connection.
#[derive(Debug)]
pub struct SyncEnvelope {
    pub agent: AgentId,
    pub bytes: Vec<u8>,
}

/// Create a connected sender/receiver pair.
pub fn channel() -> (SyncSender, SyncReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SyncSender { tx }, SyncReceiver::new(rx))
}

/// Observing-side handle. Cloning shares the same ordered channel.
#[derive(Clone, Debug)]
pub struct SyncSender {
    tx: mpsc::UnboundedSender<SyncEnvelope>,
}

impl SyncSender {
    /// Fire-and-forget send. Failures are logged, never returned.
    pub fn send(&self, agent: &AgentId, msg: &SyncMessage) {
        let bytes = match encode_frame(msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("dropping tool mode sync for {}: {}", agent, e);
                return;
            }
        };
        self.send_raw(agent, bytes);
    }

    /// Send pre-encoded bytes; they may hold a partial frame or several frames.
    pub fn send_raw(&self, agent: &AgentId, bytes: Vec<u8>) {
        let envelope = SyncEnvelope {
            agent: agent.clone(),
            bytes,
        };
        if self.tx.send(envelope).is_err() {
            log::warn!("tool mode sync channel closed; dropping update for {}", agent);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Authoritative-side handle yielding decoded messages in send order.
pub struct SyncReceiver {
    rx: mpsc::UnboundedReceiver<SyncEnvelope>,
    framers: HashMap<AgentId, SyncFramer>,
    ready: VecDeque<(AgentId, SyncMessage)>,
    dropped: u64,
}

impl SyncReceiver {
    fn new(rx: mpsc::UnboundedReceiver<SyncEnvelope>) -> Self {
        Self {
            rx,
            framers: HashMap::new(),
            ready: VecDeque::new(),
            dropped: 0,
        }
    }

    /// Frames that failed to decode so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn ingest(&mut self, envelope: SyncEnvelope) {
        let framer = self.framers.entry(envelope.agent.clone()).or_default();
        framer.push(&envelope.bytes);
        while framer.buffered() > 0 {
            let before = framer.buffered();
            let Some(body) = framer.next_frame() else {
                // a dropped byte means the framer is resyncing; anything else needs more input
                if framer.buffered() < before {
                    continue;
                }
                break;
            };
            match decode_body(&body) {
                Ok(msg) => self.ready.push_back((envelope.agent.clone(), msg)),
                Err(e) => {
                    self.dropped += 1;
                    log::warn!("ignoring tool mode sync from {}: {}", envelope.agent, e);
                }
            }
        }
        // only agents with a partial frame in flight keep a framer
        if framer.buffered() == 0 {
            self.framers.remove(&envelope.agent);
        }
    }

    /// Next decoded message; `None` once every sender is gone and nothing is buffered.
    pub async fn recv(&mut self) -> Option<(AgentId, SyncMessage)> {
        loop {
            if let Some(next) = self.ready.pop_front() {
                return Some(next);
            }
            let envelope = self.rx.recv().await?;
            self.ingest(envelope);
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv) for draining inside a simulation tick.
    pub fn try_recv(&mut self) -> Option<(AgentId, SyncMessage)> {
        loop {
            if let Some(next) = self.ready.pop_front() {
                return Some(next);
            }
            let envelope = self.rx.try_recv().ok()?;
            self.ingest(envelope);
        }
    }
}
