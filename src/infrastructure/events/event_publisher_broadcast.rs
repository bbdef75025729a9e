use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::application::ports::group_event_publisher::{GroupChange, GroupEventPublisher};

/// Fans group changes out to every open view over a broadcast channel.
#[derive(Clone)]
pub struct BroadcastGroupEventPublisher {
    sender: broadcast::Sender<GroupChange>,
}

impl BroadcastGroupEventPublisher {
    pub fn new(sender: broadcast::Sender<GroupChange>) -> Self {
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GroupChange> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl GroupEventPublisher for BroadcastGroupEventPublisher {
    async fn publish(&self, change: &GroupChange) -> anyhow::Result<()> {
        // A send error only means no view is subscribed
        if let Ok(receivers) = self.sender.send(change.clone()) {
            tracing::trace!(receivers, ?change, "group_change_broadcast");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let (tx, rx) = broadcast::channel(4);
        drop(rx);
        let publisher = BroadcastGroupEventPublisher::new(tx);
        let change = GroupChange::Removed { name: "Work".into() };
        assert!(publisher.publish(&change).await.is_ok());
    }

    #[tokio::test]
    async fn subscribers_receive_changes_in_order() {
        let (tx, _) = broadcast::channel(4);
        let publisher = BroadcastGroupEventPublisher::new(tx);
        let mut rx = publisher.subscribe();
        publisher
            .publish(&GroupChange::Created { name: "A".into() })
            .await
            .unwrap();
        publisher
            .publish(&GroupChange::Renamed {
                from: "A".into(),
                to: "B".into(),
            })
            .await
            .unwrap();
        assert!(matches!(rx.recv().await.unwrap(), GroupChange::Created { .. }));
        assert!(matches!(rx.recv().await.unwrap(), GroupChange::Renamed { .. }));
    }
}
