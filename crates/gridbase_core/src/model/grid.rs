//! Grid domain model: workspaces, tables, rows and columns.
//!
//! # Invariants
//! - Every row and column belongs to exactly one table.
//! - Rows of a table form one rank space; columns of a table form another.
//! - A `RankChange` always describes exactly one record.

use crate::model::column::ColumnType;
use crate::rank::Rank;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type WorkspaceId = Uuid;
pub type TableId = Uuid;
pub type RowId = Uuid;
pub type ColumnId = Uuid;

/// Which rank space an item lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankedKind {
    Row,
    Column,
}

impl RankedKind {
    /// Stable lowercase label used in logs and API payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Row => "row",
            Self::Column => "column",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub workspace_uuid: WorkspaceId,
    pub name: String,
}

/// A user table. Named `GridTable` to keep it apart from SQL tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridTable {
    pub table_uuid: TableId,
    pub workspace_uuid: WorkspaceId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub column_uuid: ColumnId,
    pub table_uuid: TableId,
    pub name: String,
    pub column_type: ColumnType,
    pub rank: Rank,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    pub row_uuid: RowId,
    pub table_uuid: TableId,
    pub rank: Rank,
}

/// Id and rank of one ranked item, without the rest of the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedRef {
    pub id: Uuid,
    pub rank: Rank,
}

/// Outcome of a single-record rank write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankChange {
    pub table_uuid: TableId,
    pub kind: RankedKind,
    pub item_uuid: Uuid,
    pub previous: Rank,
    pub rank: Rank,
}

impl RankChange {
    /// Returns whether the write left the rank untouched.
    pub fn is_noop(&self) -> bool {
        self.previous == self.rank
    }
}
