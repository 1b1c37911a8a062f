//! Configuration-change notifications
//!
//! The scheduler listens on a topic for configuration URLs. The transport is
//! abstracted behind [`Notifier`]; [`ChannelNotifier`] is the in-process
//! implementation used by the binary and the tests.

mod channel;

pub use channel::ChannelNotifier;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

/// Connection state of the notification transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// One message received on a topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierMessage {
    /// Monotonic per notifier
    pub sequence: u64,
    pub data: String,
}

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("Invalid topic: '{0}'")]
    InvalidTopic(String),

    #[error("Not connected")]
    NotConnected,
}

/// Message transport with connection-state events
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Current connection state followed by every change
    fn connection_changes(&self) -> BoxStream<'static, ConnectionState>;

    /// The topic's retained message, if any, then every later message
    async fn subscribe(&self, topic: &str)
        -> Result<BoxStream<'static, NotifierMessage>, NotifierError>;
}
