//! Row-level change feed
//!
//! Content services publish one [`ChangeEvent`] per write. Consumers
//! subscribe to a single table and receive only that table's events.

use futures::stream::{self, Stream};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

const FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Posts,
    Categories,
    Pages,
    Comments,
    FooterContent,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Posts => "posts",
            Table::Categories => "categories",
            Table::Pages => "pages",
            Table::Comments => "comments",
            Table::FooterContent => "footer_content",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "posts" => Ok(Table::Posts),
            "categories" => Ok(Table::Categories),
            "pages" => Ok(Table::Pages),
            "comments" => Ok(Table::Comments),
            "footer_content" => Ok(Table::FooterContent),
            _ => Err(anyhow::anyhow!("Unknown table: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

impl ChangeOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeOp::Insert => "insert",
            ChangeOp::Update => "update",
            ChangeOp::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub op: ChangeOp,
    /// Primary key of the affected row
    pub id: i64,
}

#[derive(Clone)]
pub struct ChangeFeed {
    sender: Arc<broadcast::Sender<ChangeEvent>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn publish(&self, table: Table, op: ChangeOp, id: i64) {
        match self.sender.send(ChangeEvent { table, op, id }) {
            Ok(count) => tracing::debug!("change feed: {:?} {}#{} to {} subscriber(s)", op, table, id, count),
            Err(_) => tracing::debug!("change feed: no subscribers for {}", table),
        }
    }

    /// Events for one table
    pub fn subscribe(&self, table: Table) -> TableSubscription {
        TableSubscription {
            table,
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver filtered to a single table
pub struct TableSubscription {
    table: Table,
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl TableSubscription {
    /// Next event for this table, or `None` once the feed is gone. Lagged
    /// receivers skip what they missed.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.table == self.table => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("change feed subscriber for {} lagged by {}", self.table, skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = ChangeEvent> + Send {
        stream::unfold(self, |mut sub| async move {
            sub.recv().await.map(|event| (event, sub))
        })
    }
}
