//! Sensor producer thread.
//!
//! Image events are emitted from a separate thread through the tracker's
//! subscription, the same way a platform callback would deliver them. Each
//! batch is acknowledged before the next tick so the replay stays
//! deterministic.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use anyhow::{anyhow, Context};
use crossbeam_channel::{Receiver, Sender};
use trellis_anchor::fake::FakeImageTracking;
use trellis_anchor::AnchorEventKind;

pub type Batch = Vec<(AnchorEventKind, Instant)>;

pub struct Producer {
    tx: Option<Sender<Batch>>,
    ack: Receiver<usize>,
    handle: Option<JoinHandle<()>>,
}

impl Producer {
    pub fn spawn(images: Arc<FakeImageTracking>) -> anyhow::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded::<Batch>();
        let (ack_tx, ack) = crossbeam_channel::bounded(1);

        let handle = std::thread::Builder::new()
            .name("trellis-producer".to_string())
            .spawn(move || {
                for batch in rx {
                    let mut delivered = 0;
                    for (kind, at) in batch {
                        let label = kind.label();
                        if images.emit(kind, at) {
                            delivered += 1;
                        } else {
                            tracing::warn!(event = label, "Image tracker not subscribed, event dropped");
                        }
                    }
                    if ack_tx.send(delivered).is_err() {
                        break;
                    }
                }
            })
            .context("spawning producer thread")?;

        Ok(Self {
            tx: Some(tx),
            ack,
            handle: Some(handle),
        })
    }

    /// Emit a batch and wait until the tracker has delivered it.
    pub fn deliver(&self, batch: Batch) -> anyhow::Result<usize> {
        if batch.is_empty() {
            return Ok(0);
        }
        let tx = self.tx.as_ref().ok_or_else(|| anyhow!("producer stopped"))?;
        tx.send(batch).map_err(|_| anyhow!("producer thread exited"))?;
        self.ack.recv().context("producer thread exited")
    }
}

impl Drop for Producer {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Producer thread panicked");
            }
        }
    }
}
