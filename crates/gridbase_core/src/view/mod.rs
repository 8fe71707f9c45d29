//! Client-side ordered list with one optimistic move.
//!
//! # Responsibility
//! - Hold the last authoritative `(id, rank)` list of one rank space.
//! - Project a pending drag on top of it until the server confirms.
//!
//! # Invariants
//! - The base list is only replaced by `confirm` or patched by remote events;
//!   a pending move never mutates it.
//! - At most one move is pending.
//! - `rendered()` is always sorted by rank.

use crate::model::grid::{RankedKind, TableId};
use crate::rank::{self, Rank, RankError};
use crate::repo::grid_repo::MoveRequest;
use crate::sync::event_bus::TableEvent;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewItem {
    pub id: Uuid,
    pub rank: Rank,
}

/// Move shown to the user but not yet acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMove {
    pub item_id: Uuid,
    pub from: usize,
    pub to: usize,
    pub rank: Rank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    Rank(RankError),
    /// Another move is still waiting for confirmation.
    MoveInFlight { item_id: Uuid },
}

impl Display for ViewError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rank(err) => write!(f, "{err}"),
            Self::MoveInFlight { item_id } => {
                write!(f, "move of {item_id} is still pending")
            }
        }
    }
}

impl Error for ViewError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Rank(err) => Some(err),
            Self::MoveInFlight { .. } => None,
        }
    }
}

impl From<RankError> for ViewError {
    fn from(value: RankError) -> Self {
        Self::Rank(value)
    }
}

/// Ordered rows or columns of one table as seen by one client.
#[derive(Debug, Clone)]
pub struct OrderedView {
    table_uuid: TableId,
    kind: RankedKind,
    base: Vec<ViewItem>,
    pending: Option<PendingMove>,
}

impl OrderedView {
    /// Creates a view from a fetched list; items are sorted by rank.
    pub fn new(table_uuid: TableId, kind: RankedKind, mut items: Vec<ViewItem>) -> Self {
        items.sort_by(|left, right| left.rank.cmp(&right.rank));
        Self {
            table_uuid,
            kind,
            base: items,
            pending: None,
        }
    }

    pub fn table_uuid(&self) -> TableId {
        self.table_uuid
    }

    pub fn kind(&self) -> RankedKind {
        self.kind
    }

    /// Last authoritative list.
    pub fn base(&self) -> &[ViewItem] {
        &self.base
    }

    pub fn pending(&self) -> Option<&PendingMove> {
        self.pending.as_ref()
    }

    /// Ranks of the base list, in order.
    pub fn ranks(&self) -> Vec<Rank> {
        self.base.iter().map(|item| item.rank.clone()).collect()
    }

    /// Starts an optimistic move and returns it.
    ///
    /// # Errors
    /// - `ViewError::MoveInFlight` while another move is pending.
    /// - `ViewError::Rank` when the indices or base list are invalid.
    pub fn begin_move(
        &mut self,
        source: usize,
        destination: usize,
    ) -> Result<&PendingMove, ViewError> {
        if let Some(pending) = &self.pending {
            return Err(ViewError::MoveInFlight {
                item_id: pending.item_id,
            });
        }
        let rank = rank::reorder(&self.ranks(), source, destination)?;
        let pending = self.pending.insert(PendingMove {
            item_id: self.base[source].id,
            from: source,
            to: destination,
            rank,
        });
        Ok(pending)
    }

    /// Builds the server request for the pending move.
    pub fn pending_request(&self) -> Option<MoveRequest> {
        self.pending.as_ref().map(|pending| MoveRequest {
            item_uuid: pending.item_id,
            source_index: pending.from,
            destination_index: pending.to,
            observed_ranks: Some(self.ranks()),
        })
    }

    /// List to display: base with the pending move applied.
    pub fn rendered(&self) -> Vec<ViewItem> {
        let mut items = self.base.clone();
        if let Some(pending) = &self.pending {
            if let Some(item) = items.iter_mut().find(|item| item.id == pending.item_id) {
                item.rank = pending.rank.clone();
            }
            items.sort_by(|left, right| left.rank.cmp(&right.rank));
        }
        items
    }

    /// Adopts the server's list and drops the pending move.
    pub fn confirm(&mut self, authoritative: Vec<ViewItem>) -> Option<PendingMove> {
        let mut items = authoritative;
        items.sort_by(|left, right| left.rank.cmp(&right.rank));
        self.base = items;
        self.pending.take()
    }

    /// Drops the pending move; the base order is shown again.
    pub fn rollback(&mut self) -> Option<PendingMove> {
        self.pending.take()
    }

    /// Patches the base list with another client's committed change.
    ///
    /// Events for other tables or the other rank space are ignored. A remote
    /// change to the item being moved discards the pending move; any other
    /// change recomputes it against the new base. Returns whether the base
    /// list changed.
    pub fn apply_remote(&mut self, event: &TableEvent) -> bool {
        if event.table_uuid() != self.table_uuid {
            return false;
        }
        let changed = match (self.kind, event) {
            (
                kind,
                TableEvent::RankChanged {
                    kind: event_kind,
                    item_uuid,
                    rank,
                    ..
                },
            ) if kind == *event_kind => self.upsert(*item_uuid, rank),
            (RankedKind::Row, TableEvent::RowCreated { row_uuid, rank, .. }) => {
                self.upsert(*row_uuid, rank)
            }
            (
                RankedKind::Column,
                TableEvent::ColumnCreated {
                    column_uuid, rank, ..
                },
            ) => self.upsert(*column_uuid, rank),
            (RankedKind::Row, TableEvent::RowDeleted { row_uuid, .. }) => self.remove(*row_uuid),
            (RankedKind::Column, TableEvent::ColumnDeleted { column_uuid, .. }) => {
                self.remove(*column_uuid)
            }
            _ => None,
        };

        match changed {
            Some(id) => {
                self.rebase_pending(id);
                true
            }
            None => false,
        }
    }

    /// Recomputes the pending move against the patched base list.
    ///
    /// The moved item keeps its intended destination, clamped to the new
    /// length. The move is dropped when the remote change touched the moved
    /// item itself or the rank can no longer be derived.
    fn rebase_pending(&mut self, changed_id: Uuid) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if pending.item_id == changed_id {
            return;
        }
        let Some(from) = self
            .base
            .iter()
            .position(|item| item.id == pending.item_id)
        else {
            return;
        };
        let to = pending.to.min(self.base.len() - 1);
        if let Ok(rank) = rank::reorder(&self.ranks(), from, to) {
            self.pending = Some(PendingMove {
                item_id: pending.item_id,
                from,
                to,
                rank,
            });
        }
    }

    fn upsert(&mut self, id: Uuid, rank: &Rank) -> Option<Uuid> {
        match self.base.iter_mut().find(|item| item.id == id) {
            Some(item) if item.rank == *rank => return None,
            Some(item) => item.rank = rank.clone(),
            None => self.base.push(ViewItem {
                id,
                rank: rank.clone(),
            }),
        }
        self.base.sort_by(|left, right| left.rank.cmp(&right.rank));
        Some(id)
    }

    fn remove(&mut self, id: Uuid) -> Option<Uuid> {
        let position = self.base.iter().position(|item| item.id == id)?;
        self.base.remove(position);
        Some(id)
    }
}
