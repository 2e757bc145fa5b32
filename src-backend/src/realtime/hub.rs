//! In-process change feed.
//!
//! Writers publish every committed row change to a broadcast channel;
//! each subscription runs a task that filters events through its
//! bindings and calls the matching handlers.

use noto::sync::{ChangeEvent, ChangeFeed, ChannelSpec, ChannelStatus, StatusHandler, Subscription};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// Default number of events buffered per subscriber
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct RealtimeHub {
    sender: broadcast::Sender<ChangeEvent>,
}

impl RealtimeHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Send an event to every live subscription; returns how many received it
    pub fn publish(&self, event: ChangeEvent) -> usize {
        log::trace!("Publishing {:?} on {}", event.kind, event.table.as_str());
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeFeed for RealtimeHub {
    /// Must be called from within a tokio runtime.
    fn subscribe(&self, spec: ChannelSpec, on_status: StatusHandler) -> Box<dyn Subscription> {
        let mut receiver = self.sender.subscribe();
        let status = on_status.clone();

        let task = tokio::spawn(async move {
            log::debug!("Channel {} subscribed", spec.topic);
            status(ChannelStatus::Subscribed);
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        spec.dispatch(&event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("Channel {} lagged, skipped {} events", spec.topic, skipped);
                    }
                    Err(RecvError::Closed) => {
                        log::debug!("Channel {} closed by hub", spec.topic);
                        status(ChannelStatus::Closed);
                        break;
                    }
                }
            }
        });

        Box::new(HubSubscription {
            task: Some(task),
            on_status,
        })
    }
}

struct HubSubscription {
    task: Option<JoinHandle<()>>,
    on_status: StatusHandler,
}

impl Subscription for HubSubscription {
    fn unsubscribe(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            (self.on_status)(ChannelStatus::Closed);
        }
    }
}

impl Drop for HubSubscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
