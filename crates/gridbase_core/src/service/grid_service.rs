//! Grid use-case service.
//!
//! # Responsibility
//! - Validate names and cell input above the repository layer.
//! - Turn drag gestures into single-record rank writes.
//! - Publish one change event per committed mutation.
//!
//! # Invariants
//! - Nothing is published for a failed or no-op mutation.
//! - A cell is written only after its column type accepted the value.
//! - A row and a column can share a cell only when they belong to the same table.

use crate::model::column::{CellValue, ColumnType, ColumnValidationError};
use crate::model::grid::{
    Column, ColumnId, GridTable, RankChange, RankedKind, Row, RowId, TableId, Workspace,
    WorkspaceId,
};
use crate::rank::{Rank, RankError};
use crate::repo::grid_repo::{GridRepoError, GridRepository, MoveRequest};
use crate::sync::event_bus::{TableEvent, TableEventBus};
use log::{info, warn};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Errors from grid service operations.
#[derive(Debug)]
pub enum GridServiceError {
    /// Workspace, table or column name is blank after trim.
    InvalidName,
    /// Column definition rejected by its type rules.
    InvalidColumnType(ColumnValidationError),
    /// Cell input rejected by the column type.
    Cell {
        column_uuid: ColumnId,
        source: ColumnValidationError,
    },
    WorkspaceNotFound(WorkspaceId),
    TableNotFound(TableId),
    RowNotFound(RowId),
    ColumnNotFound(ColumnId),
    /// Row and column belong to different tables.
    TableMismatch { row_uuid: RowId, column_uuid: ColumnId },
    /// Rank computation failed; nothing was written.
    Rank(RankError),
    /// Sibling order changed since the caller read it.
    StaleNeighbor { table_uuid: TableId, item_uuid: Uuid },
    /// Record rank changed since the caller read it.
    StaleRank {
        item_uuid: Uuid,
        expected: Rank,
        actual: Rank,
    },
    /// Rank already taken in the same rank space.
    DuplicateRank { table_uuid: TableId, rank: Rank },
    /// Storage failure unrelated to caller input.
    Persistence(GridRepoError),
}

impl Display for GridServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "name must not be blank"),
            Self::InvalidColumnType(err) => write!(f, "{err}"),
            Self::Cell {
                column_uuid,
                source,
            } => write!(f, "invalid value for column {column_uuid}: {source}"),
            Self::WorkspaceNotFound(id) => write!(f, "workspace not found: {id}"),
            Self::TableNotFound(id) => write!(f, "table not found: {id}"),
            Self::RowNotFound(id) => write!(f, "row not found: {id}"),
            Self::ColumnNotFound(id) => write!(f, "column not found: {id}"),
            Self::TableMismatch {
                row_uuid,
                column_uuid,
            } => write!(
                f,
                "row {row_uuid} and column {column_uuid} belong to different tables"
            ),
            Self::Rank(err) => write!(f, "{err}"),
            Self::StaleNeighbor {
                table_uuid,
                item_uuid,
            } => write!(
                f,
                "sibling order of table {table_uuid} changed before moving {item_uuid}"
            ),
            Self::StaleRank {
                item_uuid,
                expected,
                actual,
            } => write!(
                f,
                "rank of {item_uuid} is `{actual}`, expected `{expected}`"
            ),
            Self::DuplicateRank { table_uuid, rank } => {
                write!(f, "rank `{rank}` already used in table {table_uuid}")
            }
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for GridServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidColumnType(err) => Some(err),
            Self::Cell { source, .. } => Some(source),
            Self::Rank(err) => Some(err),
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GridRepoError> for GridServiceError {
    fn from(value: GridRepoError) -> Self {
        match value {
            GridRepoError::Rank(err) => Self::Rank(err),
            GridRepoError::WorkspaceNotFound(id) => Self::WorkspaceNotFound(id),
            GridRepoError::TableNotFound(id) => Self::TableNotFound(id),
            GridRepoError::RowNotFound(id) => Self::RowNotFound(id),
            GridRepoError::ColumnNotFound(id) => Self::ColumnNotFound(id),
            GridRepoError::StaleNeighbor {
                table_uuid,
                item_uuid,
            } => Self::StaleNeighbor {
                table_uuid,
                item_uuid,
            },
            GridRepoError::StaleRank {
                item_uuid,
                expected,
                actual,
            } => Self::StaleRank {
                item_uuid,
                expected,
                actual,
            },
            GridRepoError::DuplicateRank { table_uuid, rank } => {
                Self::DuplicateRank { table_uuid, rank }
            }
            other => Self::Persistence(other),
        }
    }
}

impl From<RankError> for GridServiceError {
    fn from(value: RankError) -> Self {
        Self::Rank(value)
    }
}

/// Sort direction for [`RecordSort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// In-memory record sort by one column's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSort {
    pub column_uuid: ColumnId,
    pub direction: SortDirection,
}

/// One row with its typed cells, keyed by column id.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub row: Row,
    pub cells: HashMap<ColumnId, CellValue>,
}

/// Grid use-case facade.
pub struct GridService<R: GridRepository> {
    repo: R,
    bus: TableEventBus,
}

impl<R: GridRepository> GridService<R> {
    /// Creates service from repository and the shared event bus.
    pub fn new(repo: R, bus: TableEventBus) -> Self {
        Self { repo, bus }
    }

    /// Returns the bus this service publishes on.
    pub fn bus(&self) -> &TableEventBus {
        &self.bus
    }

    pub fn create_workspace(&self, name: impl Into<String>) -> Result<Workspace, GridServiceError> {
        let name = normalize_name(name.into())?;
        Ok(self.repo.create_workspace(&name)?)
    }

    pub fn create_table(
        &self,
        workspace_uuid: WorkspaceId,
        name: impl Into<String>,
    ) -> Result<GridTable, GridServiceError> {
        let name = normalize_name(name.into())?;
        Ok(self.repo.create_table(workspace_uuid, &name)?)
    }

    /// Adds a column after the current last column.
    pub fn add_column(
        &self,
        table_uuid: TableId,
        name: impl Into<String>,
        column_type: ColumnType,
    ) -> Result<Column, GridServiceError> {
        let name = normalize_name(name.into())?;
        column_type
            .validate()
            .map_err(GridServiceError::InvalidColumnType)?;
        let column = self.repo.create_column(table_uuid, &name, &column_type)?;
        self.bus.publish(TableEvent::ColumnCreated {
            table_uuid,
            column_uuid: column.column_uuid,
            rank: column.rank.clone(),
        });
        Ok(column)
    }

    /// Adds a row after the current last row.
    pub fn add_row(&self, table_uuid: TableId) -> Result<Row, GridServiceError> {
        let row = self.repo.create_row(table_uuid)?;
        self.bus.publish(TableEvent::RowCreated {
            table_uuid,
            row_uuid: row.row_uuid,
            rank: row.rank.clone(),
        });
        Ok(row)
    }

    /// Validates `raw` through the column type and stores its canonical form.
    pub fn set_cell(
        &self,
        row_uuid: RowId,
        column_uuid: ColumnId,
        raw: &str,
    ) -> Result<CellValue, GridServiceError> {
        let (row, column) = self.load_cell_target(row_uuid, column_uuid)?;
        let value = column
            .column_type
            .parse_value(raw)
            .map_err(|source| GridServiceError::Cell {
                column_uuid,
                source,
            })?;
        let stored = value.to_storage();
        self.repo.write_cell(row_uuid, column_uuid, &stored)?;
        self.bus.publish(TableEvent::CellUpdated {
            table_uuid: row.table_uuid,
            row_uuid,
            column_uuid,
            value: Some(stored),
        });
        Ok(value)
    }

    pub fn clear_cell(&self, row_uuid: RowId, column_uuid: ColumnId) -> Result<(), GridServiceError> {
        let (row, _) = self.load_cell_target(row_uuid, column_uuid)?;
        self.repo.clear_cell(row_uuid, column_uuid)?;
        self.bus.publish(TableEvent::CellUpdated {
            table_uuid: row.table_uuid,
            row_uuid,
            column_uuid,
            value: None,
        });
        Ok(())
    }

    pub fn list_columns(&self, table_uuid: TableId) -> Result<Vec<Column>, GridServiceError> {
        self.ensure_table(table_uuid)?;
        Ok(self.repo.list_columns(table_uuid)?)
    }

    pub fn list_rows(&self, table_uuid: TableId) -> Result<Vec<Row>, GridServiceError> {
        self.ensure_table(table_uuid)?;
        Ok(self.repo.list_rows(table_uuid)?)
    }

    /// Lists rows with typed cells.
    ///
    /// Without `sort`, records follow rank order. With `sort`, records are
    /// ordered by the column's comparison; empty cells go last and ties keep
    /// rank order.
    pub fn list_records(
        &self,
        table_uuid: TableId,
        sort: Option<RecordSort>,
    ) -> Result<Vec<Record>, GridServiceError> {
        let columns = self.list_columns(table_uuid)?;
        let rows = self.repo.list_rows(table_uuid)?;
        let column_types = columns
            .iter()
            .map(|column| (column.column_uuid, &column.column_type))
            .collect::<HashMap<_, _>>();

        let mut cells_by_row: HashMap<RowId, HashMap<ColumnId, CellValue>> = HashMap::new();
        for cell in self.repo.list_cells(table_uuid)? {
            let Some(column_type) = column_types.get(&cell.column_uuid) else {
                continue;
            };
            let value = column_type.parse_value(&cell.value).map_err(|err| {
                GridServiceError::Persistence(GridRepoError::InvalidData(format!(
                    "stored cell ({}, {}) no longer valid: {err}",
                    cell.row_uuid, cell.column_uuid
                )))
            })?;
            cells_by_row
                .entry(cell.row_uuid)
                .or_default()
                .insert(cell.column_uuid, value);
        }

        let mut records = rows
            .into_iter()
            .map(|row| Record {
                cells: cells_by_row.remove(&row.row_uuid).unwrap_or_default(),
                row,
            })
            .collect::<Vec<_>>();

        if let Some(sort) = sort {
            let column_type = column_types
                .get(&sort.column_uuid)
                .copied()
                .ok_or(GridServiceError::ColumnNotFound(sort.column_uuid))?;
            records.sort_by(|left, right| {
                compare_records(column_type, sort, left, right)
                    .then_with(|| left.row.rank.cmp(&right.row.rank))
            });
        }
        Ok(records)
    }

    /// Moves one row from `source_index` to `destination_index`.
    pub fn move_row(
        &self,
        table_uuid: TableId,
        request: &MoveRequest,
    ) -> Result<RankChange, GridServiceError> {
        self.move_item(RankedKind::Row, table_uuid, request)
    }

    /// Moves one column; indices count real columns only.
    pub fn move_column(
        &self,
        table_uuid: TableId,
        request: &MoveRequest,
    ) -> Result<RankChange, GridServiceError> {
        self.move_item(RankedKind::Column, table_uuid, request)
    }

    /// Persists a caller-computed rank for one record.
    ///
    /// `expected` is the rank the caller last saw; a mismatch fails with
    /// `StaleRank` and nothing is written.
    pub fn set_rank(
        &self,
        kind: RankedKind,
        item_uuid: Uuid,
        expected: Option<&Rank>,
        rank: &Rank,
    ) -> Result<RankChange, GridServiceError> {
        match self.repo.update_rank(kind, item_uuid, expected, rank) {
            Ok(change) => {
                info!(
                    "event=rank_update module=service status=ok kind={} item={} from={} to={}",
                    kind.as_str(),
                    item_uuid,
                    change.previous,
                    change.rank
                );
                self.publish_rank_change(&change);
                Ok(change)
            }
            Err(err) => {
                warn!(
                    "event=rank_update module=service status=error kind={} item={} error={}",
                    kind.as_str(),
                    item_uuid,
                    err
                );
                Err(err.into())
            }
        }
    }

    pub fn delete_row(&self, row_uuid: RowId) -> Result<(), GridServiceError> {
        let row = self
            .repo
            .get_row(row_uuid)?
            .ok_or(GridServiceError::RowNotFound(row_uuid))?;
        self.repo.delete_row(row_uuid)?;
        self.bus.publish(TableEvent::RowDeleted {
            table_uuid: row.table_uuid,
            row_uuid,
        });
        Ok(())
    }

    pub fn delete_column(&self, column_uuid: ColumnId) -> Result<(), GridServiceError> {
        let column = self
            .repo
            .get_column(column_uuid)?
            .ok_or(GridServiceError::ColumnNotFound(column_uuid))?;
        self.repo.delete_column(column_uuid)?;
        self.bus.publish(TableEvent::ColumnDeleted {
            table_uuid: column.table_uuid,
            column_uuid,
        });
        Ok(())
    }

    fn move_item(
        &self,
        kind: RankedKind,
        table_uuid: TableId,
        request: &MoveRequest,
    ) -> Result<RankChange, GridServiceError> {
        match self.repo.move_item(kind, table_uuid, request) {
            Ok(change) => {
                info!(
                    "event=rank_move module=service status=ok kind={} table={} item={} from_index={} to_index={} rank={}",
                    kind.as_str(),
                    table_uuid,
                    request.item_uuid,
                    request.source_index,
                    request.destination_index,
                    change.rank
                );
                self.publish_rank_change(&change);
                Ok(change)
            }
            Err(err) => {
                warn!(
                    "event=rank_move module=service status=error kind={} table={} item={} error={}",
                    kind.as_str(),
                    table_uuid,
                    request.item_uuid,
                    err
                );
                Err(err.into())
            }
        }
    }

    fn publish_rank_change(&self, change: &RankChange) {
        if change.is_noop() {
            return;
        }
        self.bus.publish(TableEvent::RankChanged {
            table_uuid: change.table_uuid,
            kind: change.kind,
            item_uuid: change.item_uuid,
            rank: change.rank.clone(),
        });
    }

    fn ensure_table(&self, table_uuid: TableId) -> Result<GridTable, GridServiceError> {
        self.repo
            .get_table(table_uuid)?
            .ok_or(GridServiceError::TableNotFound(table_uuid))
    }

    fn load_cell_target(
        &self,
        row_uuid: RowId,
        column_uuid: ColumnId,
    ) -> Result<(Row, Column), GridServiceError> {
        let row = self
            .repo
            .get_row(row_uuid)?
            .ok_or(GridServiceError::RowNotFound(row_uuid))?;
        let column = self
            .repo
            .get_column(column_uuid)?
            .ok_or(GridServiceError::ColumnNotFound(column_uuid))?;
        if row.table_uuid != column.table_uuid {
            return Err(GridServiceError::TableMismatch {
                row_uuid,
                column_uuid,
            });
        }
        Ok((row, column))
    }
}

fn compare_records(
    column_type: &ColumnType,
    sort: RecordSort,
    left: &Record,
    right: &Record,
) -> Ordering {
    match (
        left.cells.get(&sort.column_uuid),
        right.cells.get(&sort.column_uuid),
    ) {
        (Some(a), Some(b)) => {
            let ordering = column_type.compare(a, b);
            match sort.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn normalize_name(value: String) -> Result<String, GridServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(GridServiceError::InvalidName);
    }
    Ok(trimmed.to_string())
}
