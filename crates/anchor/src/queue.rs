//! Single-consumer anchor event queue.
//!
//! Sensor callbacks may fire on any thread. They push through cloned
//! [`AnchorEventSender`]s; the controller owns the one [`AnchorEventQueue`]
//! and drains a snapshot at the start of each tick.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};

use crate::event::{AnchorEvent, AnchorEventKind, ImageIdentity};
use crate::pose::Pose;

/// Create a connected sender/queue pair.
///
/// The channel is unbounded: dropping a removal would leave content
/// orphaned, so producers are never refused.
pub fn event_queue() -> (AnchorEventSender, AnchorEventQueue) {
    let (tx, rx) = crossbeam_channel::unbounded();
    let sender = AnchorEventSender {
        tx,
        seq_counter: Arc::new(AtomicU64::new(0)),
    };
    let queue = AnchorEventQueue {
        rx,
        live_images: HashSet::new(),
        coerced_adds: 0,
    };
    (sender, queue)
}

/// Producer half. Cheap to clone and `Send`.
#[derive(Clone)]
pub struct AnchorEventSender {
    tx: Sender<AnchorEvent>,
    seq_counter: Arc<AtomicU64>,
}

impl AnchorEventSender {
    /// Stamp and enqueue an event. Returns false if the queue is gone.
    pub fn send(&self, kind: AnchorEventKind, timestamp: Instant) -> bool {
        let seq = self.seq_counter.fetch_add(1, Ordering::Relaxed);
        match self.tx.send(AnchorEvent {
            seq,
            timestamp,
            kind,
        }) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(seq, "Anchor event queue closed");
                false
            }
        }
    }
}

/// Consumer half, owned by the controller.
pub struct AnchorEventQueue {
    rx: Receiver<AnchorEvent>,
    live_images: HashSet<ImageIdentity>,
    coerced_adds: u64,
}

impl AnchorEventQueue {
    /// Take every event queued so far, ordered by sequence number.
    ///
    /// Producers racing on different threads may enqueue out of stamp order;
    /// sorting restores it. A second `ImageAdded` for an identity that was
    /// never removed is rewritten to `ImageUpdated`.
    pub fn drain(&mut self) -> Vec<AnchorEvent> {
        let mut events: Vec<AnchorEvent> = self.rx.try_iter().collect();
        events.sort_by_key(|e| e.seq);

        for event in &mut events {
            let duplicate = match &event.kind {
                AnchorEventKind::ImageAdded(obs) => !self.live_images.insert(obs.identity.clone()),
                AnchorEventKind::ImageUpdated(obs) => {
                    self.live_images.insert(obs.identity.clone());
                    false
                }
                AnchorEventKind::ImageRemoved { identity } => {
                    self.live_images.remove(identity);
                    false
                }
                AnchorEventKind::PlaneTapped { .. } => false,
            };
            if duplicate {
                self.coerce_to_update(event);
            }
        }
        events
    }

    fn coerce_to_update(&mut self, event: &mut AnchorEvent) {
        let placeholder = AnchorEventKind::PlaneTapped {
            pose: Pose::IDENTITY,
        };
        event.kind = match std::mem::replace(&mut event.kind, placeholder) {
            AnchorEventKind::ImageAdded(obs) => {
                self.coerced_adds += 1;
                tracing::warn!(
                    identity = %obs.identity,
                    seq = event.seq,
                    "Duplicate image add without removal, treating as update"
                );
                AnchorEventKind::ImageUpdated(obs)
            }
            other => other,
        };
    }

    /// Number of duplicate adds rewritten to updates.
    pub fn coerced_adds(&self) -> u64 {
        self.coerced_adds
    }

    /// Forget which images are live, e.g. after the tracker was disabled.
    pub fn reset_live_images(&mut self) {
        self.live_images.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::ImageObservation;

    fn added(name: &str) -> AnchorEventKind {
        AnchorEventKind::ImageAdded(ImageObservation::tracking(name, Pose::IDENTITY))
    }

    #[test]
    fn test_drain_is_snapshot() {
        let (sender, mut queue) = event_queue();
        let now = Instant::now();

        sender.send(added("a"), now);
        sender.send(added("b"), now);
        assert_eq!(queue.drain().len(), 2);
        assert!(queue.drain().is_empty());

        sender.send(AnchorEventKind::ImageRemoved { identity: "a".into() }, now);
        let events = queue.drain();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].seq, 2);
    }

    #[test]
    fn test_drain_orders_across_producers() {
        let (sender, mut queue) = event_queue();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sender = sender.clone();
                std::thread::spawn(move || {
                    for j in 0..25 {
                        sender.send(added(&format!("img-{i}-{j}")), Instant::now());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let events = queue.drain();
        assert_eq!(events.len(), 100);
        assert!(events.windows(2).all(|w| w[0].seq < w[1].seq));
    }

    #[test]
    fn test_duplicate_add_becomes_update() {
        let (sender, mut queue) = event_queue();
        let now = Instant::now();

        sender.send(added("poster"), now);
        sender.send(added("poster"), now);
        let events = queue.drain();

        assert!(matches!(events[0].kind, AnchorEventKind::ImageAdded(_)));
        assert!(matches!(events[1].kind, AnchorEventKind::ImageUpdated(_)));
        assert_eq!(queue.coerced_adds(), 1);
    }

    #[test]
    fn test_add_after_remove_is_kept() {
        let (sender, mut queue) = event_queue();
        let now = Instant::now();

        sender.send(added("poster"), now);
        sender.send(
            AnchorEventKind::ImageRemoved {
                identity: "poster".into(),
            },
            now,
        );
        sender.send(added("poster"), now);
        let events = queue.drain();

        assert!(matches!(events[2].kind, AnchorEventKind::ImageAdded(_)));
        assert_eq!(queue.coerced_adds(), 0);
    }

    #[test]
    fn test_send_after_queue_dropped() {
        let (sender, queue) = event_queue();
        drop(queue);
        assert!(!sender.send(added("a"), Instant::now()));
    }
}
