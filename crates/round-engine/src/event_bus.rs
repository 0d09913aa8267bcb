//! C8: fan-out notifications for round transitions (spec §4.8).
//!
//! Built on `tokio::sync::broadcast` rather than the reference workspace's
//! usual `mpsc` plumbing (see `ippan-consensus`'s `tx_sender`), because
//! §4.8 explicitly allows more than one consumer ("consumed by transport/WS
//! layers") — broadcast is the multi-consumer primitive. Delivery is
//! best-effort: a lagging or absent subscriber never blocks or fails a
//! `send`, matching "non-blocking, must not interfere with transaction
//! commit".

use ippan_round_types::{BlockId, Height, RoundId};
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundEvent {
    FinishRound(RoundId),
    RoundBackwardTick { height: Height, block_id: BlockId },
}

#[derive(Debug)]
pub struct RoundEventBus {
    sender: broadcast::Sender<RoundEvent>,
}

impl RoundEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoundEvent> {
        self.sender.subscribe()
    }

    /// Best-effort: `send` only fails when there are no subscribers, which
    /// is a normal and harmless state for this bus (spec §4.8 "best-effort,
    /// non-blocking").
    pub fn publish(&self, event: RoundEvent) {
        if self.sender.send(event.clone()).is_err() {
            debug!(target: "round_engine", ?event, "no event-bus subscribers");
        }
    }
}

impl Default for RoundEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = RoundEventBus::default();
        let mut rx = bus.subscribe();
        bus.publish(RoundEvent::FinishRound(7));
        assert_eq!(rx.recv().await.unwrap(), RoundEvent::FinishRound(7));
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = RoundEventBus::default();
        bus.publish(RoundEvent::FinishRound(1));
    }
}
