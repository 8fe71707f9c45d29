//! Grid repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist workspaces, tables, rows, columns and cells.
//! - Own every rank write so ordering rules stay inside one boundary.
//!
//! # Invariants
//! - Listing is `rank ASC` under `BINARY` collation, equal to `Rank` ordering.
//! - Rank writes touch exactly one record; siblings are never renumbered.
//! - Ranks are unique per `(table, kind)`; the store rejects duplicates.
//! - Moves verify the caller's view of the siblings before writing.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::column::ColumnType;
use crate::model::grid::{
    Column, ColumnId, GridTable, RankChange, RankedKind, RankedRef, Row, RowId, TableId,
    Workspace, WorkspaceId,
};
use crate::rank::{self, Rank, RankError};
use rusqlite::{
    params, Connection, OptionalExtension, Row as SqlRow, Transaction, TransactionBehavior,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Result type used by grid repository operations.
pub type GridRepoResult<T> = Result<T, GridRepoError>;

/// Errors from grid repository operations.
#[derive(Debug)]
pub enum GridRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Rank computation rejected the sibling list or bounds.
    Rank(RankError),
    WorkspaceNotFound(WorkspaceId),
    TableNotFound(TableId),
    RowNotFound(RowId),
    ColumnNotFound(ColumnId),
    /// Caller's sibling snapshot no longer matches persisted order.
    StaleNeighbor { table_uuid: TableId, item_uuid: Uuid },
    /// Record's rank changed since the caller read it.
    StaleRank {
        item_uuid: Uuid,
        expected: Rank,
        actual: Rank,
    },
    /// Another item of the same rank space already holds this rank.
    DuplicateRank { table_uuid: TableId, rank: Rank },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for GridRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Rank(err) => write!(f, "{err}"),
            Self::WorkspaceNotFound(id) => write!(f, "workspace not found: {id}"),
            Self::TableNotFound(id) => write!(f, "table not found: {id}"),
            Self::RowNotFound(id) => write!(f, "row not found: {id}"),
            Self::ColumnNotFound(id) => write!(f, "column not found: {id}"),
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
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "grid repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "grid repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "grid repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid grid data: {message}"),
        }
    }
}

impl Error for GridRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Rank(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for GridRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for GridRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<RankError> for GridRepoError {
    fn from(value: RankError) -> Self {
        Self::Rank(value)
    }
}

/// One drag gesture as received from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    pub item_uuid: Uuid,
    /// Position of the item in the caller's ordered list.
    pub source_index: usize,
    /// Position the item should occupy after the move.
    pub destination_index: usize,
    /// Ranks the caller's list held; `None` skips the snapshot check.
    pub observed_ranks: Option<Vec<Rank>>,
}

/// Persisted cell text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCell {
    pub row_uuid: RowId,
    pub column_uuid: ColumnId,
    pub value: String,
}

/// Repository interface for grid operations.
pub trait GridRepository {
    fn create_workspace(&self, name: &str) -> GridRepoResult<Workspace>;
    fn create_table(&self, workspace_uuid: WorkspaceId, name: &str) -> GridRepoResult<GridTable>;
    fn get_table(&self, table_uuid: TableId) -> GridRepoResult<Option<GridTable>>;
    /// Creates a column ranked after the current last column.
    fn create_column(
        &self,
        table_uuid: TableId,
        name: &str,
        column_type: &ColumnType,
    ) -> GridRepoResult<Column>;
    /// Creates a row ranked after the current last row.
    fn create_row(&self, table_uuid: TableId) -> GridRepoResult<Row>;
    fn get_column(&self, column_uuid: ColumnId) -> GridRepoResult<Option<Column>>;
    fn get_row(&self, row_uuid: RowId) -> GridRepoResult<Option<Row>>;
    fn list_columns(&self, table_uuid: TableId) -> GridRepoResult<Vec<Column>>;
    fn list_rows(&self, table_uuid: TableId) -> GridRepoResult<Vec<Row>>;
    /// Lists ids and ranks of one rank space in ascending rank order.
    fn list_ranks(&self, kind: RankedKind, table_uuid: TableId) -> GridRepoResult<Vec<RankedRef>>;
    /// Writes a caller-computed rank to exactly one record.
    fn update_rank(
        &self,
        kind: RankedKind,
        item_uuid: Uuid,
        expected: Option<&Rank>,
        rank: &Rank,
    ) -> GridRepoResult<RankChange>;
    /// Computes and writes the new rank for one drag gesture.
    fn move_item(
        &self,
        kind: RankedKind,
        table_uuid: TableId,
        request: &MoveRequest,
    ) -> GridRepoResult<RankChange>;
    fn write_cell(&self, row_uuid: RowId, column_uuid: ColumnId, value: &str)
        -> GridRepoResult<()>;
    fn clear_cell(&self, row_uuid: RowId, column_uuid: ColumnId) -> GridRepoResult<()>;
    fn list_cells(&self, table_uuid: TableId) -> GridRepoResult<Vec<StoredCell>>;
    fn delete_row(&self, row_uuid: RowId) -> GridRepoResult<()>;
    fn delete_column(&self, column_uuid: ColumnId) -> GridRepoResult<()>;
}

/// SQLite-backed grid repository.
pub struct SqliteGridRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGridRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> GridRepoResult<Self> {
        ensure_grid_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl GridRepository for SqliteGridRepository<'_> {
    fn create_workspace(&self, name: &str) -> GridRepoResult<Workspace> {
        let workspace = Workspace {
            workspace_uuid: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.conn.execute(
            "INSERT INTO workspaces (workspace_uuid, name) VALUES (?1, ?2);",
            params![workspace.workspace_uuid.to_string(), workspace.name],
        )?;
        Ok(workspace)
    }

    fn create_table(&self, workspace_uuid: WorkspaceId, name: &str) -> GridRepoResult<GridTable> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM workspaces WHERE workspace_uuid = ?1);",
            [workspace_uuid.to_string()],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(GridRepoError::WorkspaceNotFound(workspace_uuid));
        }

        let table = GridTable {
            table_uuid: Uuid::new_v4(),
            workspace_uuid,
            name: name.to_string(),
        };
        self.conn.execute(
            "INSERT INTO grid_tables (table_uuid, workspace_uuid, name) VALUES (?1, ?2, ?3);",
            params![
                table.table_uuid.to_string(),
                workspace_uuid.to_string(),
                table.name
            ],
        )?;
        Ok(table)
    }

    fn get_table(&self, table_uuid: TableId) -> GridRepoResult<Option<GridTable>> {
        let mut stmt = self.conn.prepare(
            "SELECT table_uuid, workspace_uuid, name
             FROM grid_tables
             WHERE table_uuid = ?1;",
        )?;
        let mut rows = stmt.query([table_uuid.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(GridTable {
                table_uuid: parse_uuid(&row.get::<_, String>("table_uuid")?, "grid_tables.table_uuid")?,
                workspace_uuid: parse_uuid(
                    &row.get::<_, String>("workspace_uuid")?,
                    "grid_tables.workspace_uuid",
                )?,
                name: row.get("name")?,
            }));
        }
        Ok(None)
    }

    fn create_column(
        &self,
        table_uuid: TableId,
        name: &str,
        column_type: &ColumnType,
    ) -> GridRepoResult<Column> {
        let stored_type = column_type
            .to_storage()
            .map_err(|err| GridRepoError::InvalidData(err.to_string()))?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_table_exists(&tx, table_uuid)?;
        let rank = next_rank(&tx, RankedKind::Column, table_uuid)?;
        let column_uuid = Uuid::new_v4();
        tx.execute(
            "INSERT INTO grid_columns (column_uuid, table_uuid, name, column_type, rank)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                column_uuid.to_string(),
                table_uuid.to_string(),
                name,
                stored_type,
                rank.as_str(),
            ],
        )
        .map_err(|err| rank_write_error(err, table_uuid, &rank))?;
        tx.commit()?;

        Ok(Column {
            column_uuid,
            table_uuid,
            name: name.to_string(),
            column_type: column_type.clone(),
            rank,
        })
    }

    fn create_row(&self, table_uuid: TableId) -> GridRepoResult<Row> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_table_exists(&tx, table_uuid)?;
        let rank = next_rank(&tx, RankedKind::Row, table_uuid)?;
        let row_uuid = Uuid::new_v4();
        tx.execute(
            "INSERT INTO grid_rows (row_uuid, table_uuid, rank) VALUES (?1, ?2, ?3);",
            params![row_uuid.to_string(), table_uuid.to_string(), rank.as_str()],
        )
        .map_err(|err| rank_write_error(err, table_uuid, &rank))?;
        tx.commit()?;

        Ok(Row {
            row_uuid,
            table_uuid,
            rank,
        })
    }

    fn get_column(&self, column_uuid: ColumnId) -> GridRepoResult<Option<Column>> {
        let mut stmt = self.conn.prepare(
            "SELECT column_uuid, table_uuid, name, column_type, rank
             FROM grid_columns
             WHERE column_uuid = ?1;",
        )?;
        let mut rows = stmt.query([column_uuid.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_column_row(row)?));
        }
        Ok(None)
    }

    fn get_row(&self, row_uuid: RowId) -> GridRepoResult<Option<Row>> {
        let mut stmt = self.conn.prepare(
            "SELECT row_uuid, table_uuid, rank
             FROM grid_rows
             WHERE row_uuid = ?1;",
        )?;
        let mut rows = stmt.query([row_uuid.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_grid_row(row)?));
        }
        Ok(None)
    }

    fn list_columns(&self, table_uuid: TableId) -> GridRepoResult<Vec<Column>> {
        let mut stmt = self.conn.prepare(
            "SELECT column_uuid, table_uuid, name, column_type, rank
             FROM grid_columns
             WHERE table_uuid = ?1
             ORDER BY rank COLLATE BINARY ASC;",
        )?;
        let mut rows = stmt.query([table_uuid.to_string()])?;
        let mut columns = Vec::new();
        while let Some(row) = rows.next()? {
            columns.push(parse_column_row(row)?);
        }
        Ok(columns)
    }

    fn list_rows(&self, table_uuid: TableId) -> GridRepoResult<Vec<Row>> {
        let mut stmt = self.conn.prepare(
            "SELECT row_uuid, table_uuid, rank
             FROM grid_rows
             WHERE table_uuid = ?1
             ORDER BY rank COLLATE BINARY ASC;",
        )?;
        let mut rows = stmt.query([table_uuid.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_grid_row(row)?);
        }
        Ok(items)
    }

    fn list_ranks(&self, kind: RankedKind, table_uuid: TableId) -> GridRepoResult<Vec<RankedRef>> {
        list_ranked_refs(self.conn, kind, table_uuid)
    }

    fn update_rank(
        &self,
        kind: RankedKind,
        item_uuid: Uuid,
        expected: Option<&Rank>,
        rank: &Rank,
    ) -> GridRepoResult<RankChange> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let (table_uuid, previous) =
            load_ranked_item(&tx, kind, item_uuid)?.ok_or_else(|| not_found(kind, item_uuid))?;

        if let Some(expected) = expected {
            if *expected != previous {
                return Err(GridRepoError::StaleRank {
                    item_uuid,
                    expected: expected.clone(),
                    actual: previous,
                });
            }
        }

        let change = RankChange {
            table_uuid,
            kind,
            item_uuid,
            previous,
            rank: rank.clone(),
        };
        if !change.is_noop() {
            write_rank(&tx, &change)?;
        }
        tx.commit()?;
        Ok(change)
    }

    fn move_item(
        &self,
        kind: RankedKind,
        table_uuid: TableId,
        request: &MoveRequest,
    ) -> GridRepoResult<RankChange> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_table_exists(&tx, table_uuid)?;

        let siblings = list_ranked_refs(&tx, kind, table_uuid)?;
        let current_index = siblings
            .iter()
            .position(|sibling| sibling.id == request.item_uuid)
            .ok_or_else(|| not_found(kind, request.item_uuid))?;
        let ranks = siblings
            .iter()
            .map(|sibling| sibling.rank.clone())
            .collect::<Vec<_>>();

        let stale = current_index != request.source_index
            || request
                .observed_ranks
                .as_ref()
                .is_some_and(|observed| *observed != ranks);
        if stale {
            return Err(GridRepoError::StaleNeighbor {
                table_uuid,
                item_uuid: request.item_uuid,
            });
        }

        let rank = rank::reorder(&ranks, current_index, request.destination_index)?;
        let change = RankChange {
            table_uuid,
            kind,
            item_uuid: request.item_uuid,
            previous: ranks[current_index].clone(),
            rank,
        };
        if !change.is_noop() {
            write_rank(&tx, &change)?;
        }
        tx.commit()?;
        Ok(change)
    }

    fn write_cell(
        &self,
        row_uuid: RowId,
        column_uuid: ColumnId,
        value: &str,
    ) -> GridRepoResult<()> {
        self.conn.execute(
            "INSERT INTO grid_cells (row_uuid, column_uuid, value)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (row_uuid, column_uuid) DO UPDATE
             SET value = excluded.value,
                 updated_at = (strftime('%s', 'now') * 1000);",
            params![row_uuid.to_string(), column_uuid.to_string(), value],
        )?;
        Ok(())
    }

    fn clear_cell(&self, row_uuid: RowId, column_uuid: ColumnId) -> GridRepoResult<()> {
        self.conn.execute(
            "DELETE FROM grid_cells WHERE row_uuid = ?1 AND column_uuid = ?2;",
            params![row_uuid.to_string(), column_uuid.to_string()],
        )?;
        Ok(())
    }

    fn list_cells(&self, table_uuid: TableId) -> GridRepoResult<Vec<StoredCell>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.row_uuid AS row_uuid, c.column_uuid AS column_uuid, c.value AS value
             FROM grid_cells c
             INNER JOIN grid_rows r ON r.row_uuid = c.row_uuid
             WHERE r.table_uuid = ?1;",
        )?;
        let mut rows = stmt.query([table_uuid.to_string()])?;
        let mut cells = Vec::new();
        while let Some(row) = rows.next()? {
            cells.push(StoredCell {
                row_uuid: parse_uuid(&row.get::<_, String>("row_uuid")?, "grid_cells.row_uuid")?,
                column_uuid: parse_uuid(
                    &row.get::<_, String>("column_uuid")?,
                    "grid_cells.column_uuid",
                )?,
                value: row.get("value")?,
            });
        }
        Ok(cells)
    }

    fn delete_row(&self, row_uuid: RowId) -> GridRepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM grid_rows WHERE row_uuid = ?1;",
            [row_uuid.to_string()],
        )?;
        if changed == 0 {
            return Err(GridRepoError::RowNotFound(row_uuid));
        }
        Ok(())
    }

    fn delete_column(&self, column_uuid: ColumnId) -> GridRepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM grid_columns WHERE column_uuid = ?1;",
            [column_uuid.to_string()],
        )?;
        if changed == 0 {
            return Err(GridRepoError::ColumnNotFound(column_uuid));
        }
        Ok(())
    }
}

/// SQL table and id column holding one rank space kind.
fn ranked_table(kind: RankedKind) -> (&'static str, &'static str) {
    match kind {
        RankedKind::Row => ("grid_rows", "row_uuid"),
        RankedKind::Column => ("grid_columns", "column_uuid"),
    }
}

fn not_found(kind: RankedKind, item_uuid: Uuid) -> GridRepoError {
    match kind {
        RankedKind::Row => GridRepoError::RowNotFound(item_uuid),
        RankedKind::Column => GridRepoError::ColumnNotFound(item_uuid),
    }
}

fn ensure_table_exists(conn: &Connection, table_uuid: TableId) -> GridRepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM grid_tables WHERE table_uuid = ?1);",
        [table_uuid.to_string()],
        |row| row.get(0),
    )?;
    if exists != 1 {
        return Err(GridRepoError::TableNotFound(table_uuid));
    }
    Ok(())
}

fn next_rank(conn: &Connection, kind: RankedKind, table_uuid: TableId) -> GridRepoResult<Rank> {
    let (table, _) = ranked_table(kind);
    let last: Option<String> = conn
        .query_row(
            &format!(
                "SELECT rank FROM {table}
                 WHERE table_uuid = ?1
                 ORDER BY rank COLLATE BINARY DESC
                 LIMIT 1;"
            ),
            [table_uuid.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    match last {
        Some(value) => Ok(rank::append(&parse_rank(value, table)?)),
        None => Ok(rank::initial()),
    }
}

fn list_ranked_refs(
    conn: &Connection,
    kind: RankedKind,
    table_uuid: TableId,
) -> GridRepoResult<Vec<RankedRef>> {
    let (table, id_column) = ranked_table(kind);
    let mut stmt = conn.prepare(&format!(
        "SELECT {id_column}, rank
         FROM {table}
         WHERE table_uuid = ?1
         ORDER BY rank COLLATE BINARY ASC;"
    ))?;
    let mut rows = stmt.query([table_uuid.to_string()])?;
    let mut refs = Vec::new();
    while let Some(row) = rows.next()? {
        refs.push(RankedRef {
            id: parse_uuid(&row.get::<_, String>(0)?, id_column)?,
            rank: parse_rank(row.get(1)?, table)?,
        });
    }
    Ok(refs)
}

fn load_ranked_item(
    conn: &Connection,
    kind: RankedKind,
    item_uuid: Uuid,
) -> GridRepoResult<Option<(TableId, Rank)>> {
    let (table, id_column) = ranked_table(kind);
    let found: Option<(String, String)> = conn
        .query_row(
            &format!("SELECT table_uuid, rank FROM {table} WHERE {id_column} = ?1;"),
            [item_uuid.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    found
        .map(|(table_uuid, rank)| -> GridRepoResult<(TableId, Rank)> {
            Ok((parse_uuid(&table_uuid, table)?, parse_rank(rank, table)?))
        })
        .transpose()
}

/// Compare-and-set of one record's rank.
fn write_rank(conn: &Connection, change: &RankChange) -> GridRepoResult<()> {
    let (table, id_column) = ranked_table(change.kind);
    let changed = conn
        .execute(
            &format!(
                "UPDATE {table}
                 SET rank = ?2,
                     updated_at = (strftime('%s', 'now') * 1000)
                 WHERE {id_column} = ?1
                   AND rank = ?3;"
            ),
            params![
                change.item_uuid.to_string(),
                change.rank.as_str(),
                change.previous.as_str(),
            ],
        )
        .map_err(|err| rank_write_error(err, change.table_uuid, &change.rank))?;

    if changed != 1 {
        return Err(GridRepoError::StaleNeighbor {
            table_uuid: change.table_uuid,
            item_uuid: change.item_uuid,
        });
    }
    Ok(())
}

fn rank_write_error(err: rusqlite::Error, table_uuid: TableId, rank: &Rank) -> GridRepoError {
    let err = DbError::from(err);
    if err.is_unique_violation() {
        return GridRepoError::DuplicateRank {
            table_uuid,
            rank: rank.clone(),
        };
    }
    GridRepoError::Db(err)
}

fn parse_column_row(row: &SqlRow<'_>) -> GridRepoResult<Column> {
    let column_type_text: String = row.get("column_type")?;
    let column_type = ColumnType::from_storage(&column_type_text).map_err(|err| {
        GridRepoError::InvalidData(format!(
            "invalid column type `{column_type_text}` in grid_columns.column_type: {err}"
        ))
    })?;

    Ok(Column {
        column_uuid: parse_uuid(&row.get::<_, String>("column_uuid")?, "grid_columns.column_uuid")?,
        table_uuid: parse_uuid(&row.get::<_, String>("table_uuid")?, "grid_columns.table_uuid")?,
        name: row.get("name")?,
        column_type,
        rank: parse_rank(row.get("rank")?, "grid_columns.rank")?,
    })
}

fn parse_grid_row(row: &SqlRow<'_>) -> GridRepoResult<Row> {
    Ok(Row {
        row_uuid: parse_uuid(&row.get::<_, String>("row_uuid")?, "grid_rows.row_uuid")?,
        table_uuid: parse_uuid(&row.get::<_, String>("table_uuid")?, "grid_rows.table_uuid")?,
        rank: parse_rank(row.get("rank")?, "grid_rows.rank")?,
    })
}

fn parse_uuid(value: &str, column: &str) -> GridRepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| GridRepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn parse_rank(value: String, column: &str) -> GridRepoResult<Rank> {
    Rank::parse(value)
        .map_err(|err| GridRepoError::InvalidData(format!("{err} in {column}")))
}

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    ("workspaces", &["workspace_uuid", "name"]),
    ("grid_tables", &["table_uuid", "workspace_uuid", "name"]),
    (
        "grid_columns",
        &["column_uuid", "table_uuid", "name", "column_type", "rank", "updated_at"],
    ),
    ("grid_rows", &["row_uuid", "table_uuid", "rank", "updated_at"]),
    ("grid_cells", &["row_uuid", "column_uuid", "value", "updated_at"]),
];

fn ensure_grid_connection_ready(conn: &Connection) -> GridRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(GridRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for (table, columns) in REQUIRED_SCHEMA {
        if !table_exists(conn, table)? {
            return Err(GridRepoError::MissingRequiredTable(table));
        }
        for column in *columns {
            if !table_has_column(conn, table, column)? {
                return Err(GridRepoError::MissingRequiredColumn { table, column });
            }
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> GridRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> GridRepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
