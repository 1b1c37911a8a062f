//! In-process notifier backed by tokio channels
//!
//! Each topic keeps its last message and replays it to new subscribers, so a
//! configuration announced before the scheduler subscribed is not lost.

use crate::notify::{ConnectionState, Notifier, NotifierError, NotifierMessage};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, WatchStream};

const TOPIC_CAPACITY: usize = 64;

struct Topic {
    sender: broadcast::Sender<NotifierMessage>,
    retained: Option<NotifierMessage>,
}

impl Topic {
    fn new() -> Self {
        let (sender, _) = broadcast::channel(TOPIC_CAPACITY);
        Self {
            sender,
            retained: None,
        }
    }
}

pub struct ChannelNotifier {
    connection: watch::Sender<ConnectionState>,
    topics: Mutex<HashMap<String, Topic>>,
    sequence: AtomicU64,
}

impl Default for ChannelNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelNotifier {
    /// Creates a disconnected notifier
    pub fn new() -> Self {
        let (connection, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connection,
            topics: Mutex::new(HashMap::new()),
            sequence: AtomicU64::new(0),
        }
    }

    fn topics(&self) -> MutexGuard<'_, HashMap<String, Topic>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_state(&self, state: ConnectionState) {
        let previous = self.connection.send_replace(state);
        if previous != state {
            tracing::debug!("Notifier connection: {:?} -> {:?}", previous, state);
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    /// Publishes `data` on `topic` and retains it for later subscribers
    ///
    /// Returns the number of live subscribers that received it.
    pub fn publish(&self, topic: &str, data: impl Into<String>) -> usize {
        let message = NotifierMessage {
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst) + 1,
            data: data.into(),
        };

        let mut topics = self.topics();
        let entry = topics.entry(topic.to_string()).or_insert_with(Topic::new);
        entry.retained = Some(message.clone());
        // Err only means nobody is listening right now
        entry.sender.send(message).unwrap_or(0)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    fn connection_changes(&self) -> BoxStream<'static, ConnectionState> {
        WatchStream::new(self.connection.subscribe()).boxed()
    }

    async fn subscribe(
        &self,
        topic: &str,
    ) -> Result<BoxStream<'static, NotifierMessage>, NotifierError> {
        if topic.trim().is_empty() {
            return Err(NotifierError::InvalidTopic(topic.to_string()));
        }
        if self.state() != ConnectionState::Connected {
            return Err(NotifierError::NotConnected);
        }

        let (retained, receiver) = {
            let mut topics = self.topics();
            let entry = topics.entry(topic.to_string()).or_insert_with(Topic::new);
            (entry.retained.clone(), entry.sender.subscribe())
        };
        tracing::debug!("Subscribed to topic '{}'", topic);

        let live = BroadcastStream::new(receiver).filter_map(|received| async move {
            match received {
                Ok(message) => Some(message),
                Err(BroadcastStreamRecvError::Lagged(missed)) => {
                    tracing::warn!("Notifier subscriber lagged, {} messages missed", missed);
                    None
                }
            }
        });

        Ok(stream::iter(retained).chain(live).boxed())
    }
}
