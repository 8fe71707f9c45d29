//! Per-table publish/subscribe relay for committed grid changes.
//!
//! # Responsibility
//! - Deliver change events to every live observer of one table.
//! - Keep topics isolated: observers of table A never see table B.
//!
//! # Invariants
//! - Publishing never fails; with no subscribers the event is dropped.
//! - Topics without receivers are pruned on publish.
//! - Delivery is best-effort; a lagging receiver gets `Lagged` and must
//!   refetch its ordered list.

use crate::model::grid::{ColumnId, RankedKind, RowId, TableId};
use crate::rank::Rank;
use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

pub use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// Default per-table buffer size.
pub const DEFAULT_EVENT_BUFFER: usize = 128;

/// Committed change to one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TableEvent {
    RowCreated {
        table_uuid: TableId,
        row_uuid: RowId,
        rank: Rank,
    },
    ColumnCreated {
        table_uuid: TableId,
        column_uuid: ColumnId,
        rank: Rank,
    },
    RankChanged {
        table_uuid: TableId,
        kind: RankedKind,
        item_uuid: Uuid,
        rank: Rank,
    },
    /// `value` is `None` when the cell was cleared.
    CellUpdated {
        table_uuid: TableId,
        row_uuid: RowId,
        column_uuid: ColumnId,
        value: Option<String>,
    },
    RowDeleted {
        table_uuid: TableId,
        row_uuid: RowId,
    },
    ColumnDeleted {
        table_uuid: TableId,
        column_uuid: ColumnId,
    },
}

impl TableEvent {
    /// Table whose observers receive this event.
    pub fn table_uuid(&self) -> TableId {
        match self {
            Self::RowCreated { table_uuid, .. }
            | Self::ColumnCreated { table_uuid, .. }
            | Self::RankChanged { table_uuid, .. }
            | Self::CellUpdated { table_uuid, .. }
            | Self::RowDeleted { table_uuid, .. }
            | Self::ColumnDeleted { table_uuid, .. } => *table_uuid,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::RowCreated { .. } => "row_created",
            Self::ColumnCreated { .. } => "column_created",
            Self::RankChanged { .. } => "rank_changed",
            Self::CellUpdated { .. } => "cell_updated",
            Self::RowDeleted { .. } => "row_deleted",
            Self::ColumnDeleted { .. } => "column_deleted",
        }
    }
}

/// Receiving end for one table's events.
#[derive(Debug)]
pub struct TableSubscription {
    table_uuid: TableId,
    receiver: broadcast::Receiver<TableEvent>,
}

impl TableSubscription {
    pub fn table_uuid(&self) -> TableId {
        self.table_uuid
    }

    /// Waits for the next event.
    pub async fn recv(&mut self) -> Result<TableEvent, RecvError> {
        self.receiver.recv().await
    }

    /// Returns the next buffered event without waiting.
    pub fn try_recv(&mut self) -> Result<TableEvent, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Drains every buffered event.
    ///
    /// Returns `Err` with the number of skipped events when this receiver
    /// lagged; the caller should refetch instead of patching.
    pub fn drain(&mut self) -> Result<Vec<TableEvent>, u64> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return Ok(events),
                Err(TryRecvError::Lagged(skipped)) => return Err(skipped),
            }
        }
    }
}

/// Cloneable handle to the per-table topics.
///
/// Inject one instance into every service that mutates tables; clones share
/// the same topics.
#[derive(Clone)]
pub struct TableEventBus {
    topics: Arc<RwLock<HashMap<TableId, broadcast::Sender<TableEvent>>>>,
    capacity: usize,
}

impl Default for TableEventBus {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EVENT_BUFFER)
    }
}

impl Debug for TableEventBus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableEventBus")
            .field("topic_count", &self.topics.read().len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl TableEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bus whose topics buffer up to `capacity` events (min 1).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Subscribes to one table's events from now on.
    pub fn subscribe(&self, table_uuid: TableId) -> TableSubscription {
        let mut topics = self.topics.write();
        let sender = topics
            .entry(table_uuid)
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        TableSubscription {
            table_uuid,
            receiver: sender.subscribe(),
        }
    }

    /// Publishes one event to its table's observers.
    ///
    /// Returns the number of receivers the event was delivered to.
    pub fn publish(&self, event: TableEvent) -> usize {
        let table_uuid = event.table_uuid();
        let name = event.name();
        let delivered = {
            let topics = self.topics.read();
            topics
                .get(&table_uuid)
                .map_or(0, |sender| sender.send(event).unwrap_or(0))
        };
        if delivered == 0 {
            self.prune(table_uuid);
        }
        debug!(
            "event=table_event_publish module=sync status=ok table={} kind={} receivers={}",
            table_uuid, name, delivered
        );
        delivered
    }

    /// Returns the number of live subscriptions for one table.
    pub fn subscriber_count(&self, table_uuid: TableId) -> usize {
        self.topics
            .read()
            .get(&table_uuid)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Returns the number of tables with an open topic.
    pub fn topic_count(&self) -> usize {
        self.topics.read().len()
    }

    fn prune(&self, table_uuid: TableId) {
        let mut topics = self.topics.write();
        if topics
            .get(&table_uuid)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            topics.remove(&table_uuid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{TableEvent, TableEventBus, TryRecvError};
    use crate::model::grid::RankedKind;
    use crate::rank::Rank;
    use uuid::Uuid;

    fn rank_changed(table_uuid: Uuid) -> TableEvent {
        TableEvent::RankChanged {
            table_uuid,
            kind: RankedKind::Row,
            item_uuid: Uuid::new_v4(),
            rank: Rank::parse("a1").unwrap(),
        }
    }

    #[test]
    fn delivers_only_to_subscribers_of_same_table() {
        let bus = TableEventBus::new();
        let table_a = Uuid::new_v4();
        let table_b = Uuid::new_v4();
        let mut sub_a = bus.subscribe(table_a);
        let mut sub_b = bus.subscribe(table_b);

        let event = rank_changed(table_a);
        assert_eq!(bus.publish(event.clone()), 1);

        assert_eq!(sub_a.try_recv().unwrap(), event);
        assert!(matches!(sub_b.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn publish_without_subscribers_is_dropped_and_pruned() {
        let bus = TableEventBus::new();
        let table = Uuid::new_v4();
        assert_eq!(bus.publish(rank_changed(table)), 0);

        let sub = bus.subscribe(table);
        assert_eq!(bus.topic_count(), 1);
        drop(sub);
        assert_eq!(bus.publish(rank_changed(table)), 0);
        assert_eq!(bus.topic_count(), 0);
    }

    #[test]
    fn clones_share_topics() {
        let bus = TableEventBus::new();
        let publisher = bus.clone();
        let table = Uuid::new_v4();
        let mut first = bus.subscribe(table);
        let mut second = bus.subscribe(table);
        assert_eq!(bus.subscriber_count(table), 2);

        assert_eq!(publisher.publish(rank_changed(table)), 2);
        assert_eq!(first.drain().unwrap().len(), 1);
        assert_eq!(second.drain().unwrap().len(), 1);
    }

    #[test]
    fn lagging_subscriber_reports_skipped_events() {
        let bus = TableEventBus::with_capacity(2);
        let table = Uuid::new_v4();
        let mut sub = bus.subscribe(table);
        for _ in 0..5 {
            bus.publish(rank_changed(table));
        }
        assert_eq!(sub.drain(), Err(3));
    }

    #[test]
    fn event_serializes_with_tag() {
        let table = Uuid::nil();
        let event = TableEvent::RowDeleted {
            table_uuid: table,
            row_uuid: table,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "row_deleted");
        assert_eq!(json["table_uuid"], table.to_string());
    }
}
