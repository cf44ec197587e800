//! Channel broadcaster
//!
//! Hands transactions to a relay task over a bounded channel and waits for
//! the relay's verdict.

use crate::domain::errors::BroadcastError;
use crate::ports::outbound::Broadcaster;
use async_trait::async_trait;
use overlay_types::TxId;
use tokio::sync::{mpsc, oneshot};

/// A transaction awaiting a relay verdict.
#[derive(Debug)]
pub struct RelayRequest {
    pub txid: TxId,
    pub raw_tx: Vec<u8>,
    respond_to: oneshot::Sender<Result<(), String>>,
}

impl RelayRequest {
    pub fn accept(self) {
        // Submitter gave up waiting
        let _ = self.respond_to.send(Ok(()));
    }

    pub fn reject(self, reason: impl Into<String>) {
        let _ = self.respond_to.send(Err(reason.into()));
    }
}

/// `Broadcaster` whose network side is whatever drains the receiver.
#[derive(Clone)]
pub struct ChannelBroadcaster {
    sender: mpsc::Sender<RelayRequest>,
}

impl ChannelBroadcaster {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<RelayRequest>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl Broadcaster for ChannelBroadcaster {
    async fn broadcast(&self, txid: &TxId, raw_tx: &[u8]) -> Result<(), BroadcastError> {
        let (respond_to, verdict) = oneshot::channel();
        self.sender
            .send(RelayRequest {
                txid: *txid,
                raw_tx: raw_tx.to_vec(),
                respond_to,
            })
            .await
            .map_err(|_| BroadcastError::ChannelClosed)?;

        match verdict.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(BroadcastError::Rejected(reason)),
            Err(_) => Err(BroadcastError::ChannelClosed),
        }
    }
}
