//! Use-case API for embedding clients.
//!
//! # Responsibility
//! - Expose stable, synchronous grid operations with string ids.
//! - Carry the mutation endpoint contract: `{id, rank}` writes and
//!   `{source_index, destination_index}` moves.
//!
//! # Invariants
//! - Exported functions never panic; failures come back as `ok=false`.
//! - Every call opens its own connection; all calls share one event bus.
//! - Config is resolved once per process from `GRIDBASE_*` variables.

use gridbase_core::db::open_db;
use gridbase_core::{
    core_version as core_version_inner, init_logging as init_logging_inner,
    init_logging_from_config, ping as ping_inner, ColumnType, CoreConfig, GridService, GridServiceError, MoveRequest, Rank, RankChange,
    RankedKind, SqliteGridRepository, TableEventBus,
};
use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

static API_CONFIG: OnceLock<CoreConfig> = OnceLock::new();
static EVENT_BUS: OnceLock<TableEventBus> = OnceLock::new();

/// Health check.
pub fn ping() -> String {
    ping_inner().to_owned()
}

pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes core logging once per process.
///
/// Returns an empty string on success and the error message otherwise.
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Response envelope for mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub ok: bool,
    /// Id of the created or changed record.
    pub id: Option<String>,
    /// Rank of the record after the call, for ranked records.
    pub rank: Option<String>,
    pub message: String,
}

impl ApiResponse {
    fn created(message: impl Into<String>, id: Uuid, rank: Option<&Rank>) -> Self {
        Self {
            ok: true,
            id: Some(id.to_string()),
            rank: rank.map(|rank| rank.to_string()),
            message: message.into(),
        }
    }

    fn ranked(change: &RankChange) -> Self {
        let message = if change.is_noop() {
            "Rank unchanged."
        } else {
            "Rank updated."
        };
        Self::created(message, change.item_uuid, Some(&change.rank))
    }

    fn failure(op: &'static str, err: String) -> Self {
        warn!("event=api_call module=api status=error op={op}");
        Self {
            ok: false,
            id: None,
            rank: None,
            message: format!("{op} failed: {err}"),
        }
    }
}

/// One ranked record in list responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedItem {
    pub id: String,
    pub rank: String,
}

/// Ordered rows or columns of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedListResponse {
    pub ok: bool,
    pub items: Vec<RankedItem>,
    pub message: String,
}

/// Body of the rank mutation endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RankUpdate {
    pub id: Uuid,
    pub kind: RankedKind,
    /// Rank the client last saw; omitted means last write wins.
    #[serde(default)]
    pub expected_rank: Option<Rank>,
    pub rank: Rank,
}

pub fn create_workspace(name: String) -> ApiResponse {
    match with_grid_service(|service| service.create_workspace(name)) {
        Ok(workspace) => {
            ApiResponse::created("Workspace created.", workspace.workspace_uuid, None)
        }
        Err(err) => ApiResponse::failure("create_workspace", err),
    }
}

pub fn create_table(workspace_id: String, name: String) -> ApiResponse {
    let result = parse_id(&workspace_id, "workspace_id").and_then(|workspace_uuid| {
        with_grid_service(|service| service.create_table(workspace_uuid, name))
    });
    match result {
        Ok(table) => ApiResponse::created("Table created.", table.table_uuid, None),
        Err(err) => ApiResponse::failure("create_table", err),
    }
}

/// Appends a row; the response carries its rank.
pub fn add_row(table_id: String) -> ApiResponse {
    let result = parse_id(&table_id, "table_id")
        .and_then(|table_uuid| with_grid_service(|service| service.add_row(table_uuid)));
    match result {
        Ok(row) => ApiResponse::created("Row added.", row.row_uuid, Some(&row.rank)),
        Err(err) => ApiResponse::failure("add_row", err),
    }
}

/// Appends a column. `column_type_json` is a tagged type such as
/// `{"type":"dropdown","options":["Todo","Done"]}`.
pub fn add_column(table_id: String, name: String, column_type_json: String) -> ApiResponse {
    let result = parse_id(&table_id, "table_id").and_then(|table_uuid| {
        let column_type =
            ColumnType::from_storage(&column_type_json).map_err(|err| err.to_string())?;
        with_grid_service(|service| service.add_column(table_uuid, name, column_type))
    });
    match result {
        Ok(column) => {
            ApiResponse::created("Column added.", column.column_uuid, Some(&column.rank))
        }
        Err(err) => ApiResponse::failure("add_column", err),
    }
}

pub fn set_cell(row_id: String, column_id: String, value: String) -> ApiResponse {
    let result = parse_id(&row_id, "row_id").and_then(|row_uuid| {
        let column_uuid = parse_id(&column_id, "column_id")?;
        with_grid_service(|service| service.set_cell(row_uuid, column_uuid, &value))
            .map(|_| row_uuid)
    });
    match result {
        Ok(row_uuid) => ApiResponse::created("Cell updated.", row_uuid, None),
        Err(err) => ApiResponse::failure("set_cell", err),
    }
}

/// Mutation endpoint: persists one caller-computed rank.
///
/// `payload_json` is `{"id", "kind", "rank", "expected_rank"?}`.
pub fn update_rank(payload_json: String) -> ApiResponse {
    let result = serde_json::from_str::<RankUpdate>(&payload_json)
        .map_err(|err| format!("invalid payload: {err}"))
        .and_then(|update| {
            with_grid_service(|service| {
                service.set_rank(
                    update.kind,
                    update.id,
                    update.expected_rank.as_ref(),
                    &update.rank,
                )
            })
        });
    match result {
        Ok(change) => ApiResponse::ranked(&change),
        Err(err) => ApiResponse::failure("update_rank", err),
    }
}

/// Moves a row within its table.
///
/// `observed_ranks` is the client's row rank list; when given, the move is
/// rejected if the table changed since.
pub fn move_row(
    table_id: String,
    row_id: String,
    source_index: u32,
    destination_index: u32,
    observed_ranks: Option<Vec<String>>,
) -> ApiResponse {
    move_ranked(
        RankedKind::Row,
        "move_row",
        &table_id,
        &row_id,
        source_index,
        destination_index,
        observed_ranks,
    )
}

/// Moves a column; indices count real columns, not header sentinels.
pub fn move_column(
    table_id: String,
    column_id: String,
    source_index: u32,
    destination_index: u32,
    observed_ranks: Option<Vec<String>>,
) -> ApiResponse {
    move_ranked(
        RankedKind::Column,
        "move_column",
        &table_id,
        &column_id,
        source_index,
        destination_index,
        observed_ranks,
    )
}

pub fn list_rows(table_id: String) -> RankedListResponse {
    list_ranked(RankedKind::Row, &table_id)
}

pub fn list_columns(table_id: String) -> RankedListResponse {
    list_ranked(RankedKind::Column, &table_id)
}

/// Shared bus for in-process subscribers of API mutations.
pub fn event_bus() -> TableEventBus {
    EVENT_BUS
        .get_or_init(|| TableEventBus::with_capacity(resolve_config().event_buffer))
        .clone()
}

fn move_ranked(
    kind: RankedKind,
    op: &'static str,
    table_id: &str,
    item_id: &str,
    source_index: u32,
    destination_index: u32,
    observed_ranks: Option<Vec<String>>,
) -> ApiResponse {
    let result = build_move_request(item_id, source_index, destination_index, observed_ranks)
        .and_then(|request| {
            let table_uuid = parse_id(table_id, "table_id")?;
            with_grid_service(|service| match kind {
                RankedKind::Row => service.move_row(table_uuid, &request),
                RankedKind::Column => service.move_column(table_uuid, &request),
            })
        });
    match result {
        Ok(change) => ApiResponse::ranked(&change),
        Err(err) => ApiResponse::failure(op, err),
    }
}

fn build_move_request(
    item_id: &str,
    source_index: u32,
    destination_index: u32,
    observed_ranks: Option<Vec<String>>,
) -> Result<MoveRequest, String> {
    let observed_ranks = observed_ranks
        .map(|ranks| {
            ranks
                .into_iter()
                .map(Rank::parse)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| err.to_string())
        })
        .transpose()?;
    Ok(MoveRequest {
        item_uuid: parse_id(item_id, "item_id")?,
        source_index: source_index as usize,
        destination_index: destination_index as usize,
        observed_ranks,
    })
}

fn list_ranked(kind: RankedKind, table_id: &str) -> RankedListResponse {
    let result = parse_id(table_id, "table_id").and_then(|table_uuid| {
        with_grid_service(|service| {
            let items = match kind {
                RankedKind::Row => service
                    .list_rows(table_uuid)?
                    .into_iter()
                    .map(|row| (row.row_uuid, row.rank))
                    .collect::<Vec<_>>(),
                RankedKind::Column => service
                    .list_columns(table_uuid)?
                    .into_iter()
                    .map(|column| (column.column_uuid, column.rank))
                    .collect(),
            };
            Ok(items)
        })
    });
    match result {
        Ok(items) => RankedListResponse {
            ok: true,
            message: format!("Found {} {}(s).", items.len(), kind.as_str()),
            items: items
                .into_iter()
                .map(|(id, rank)| RankedItem {
                    id: id.to_string(),
                    rank: rank.into_string(),
                })
                .collect(),
        },
        Err(err) => {
            warn!("event=api_call module=api status=error op=list_{}s", kind.as_str());
            RankedListResponse {
                ok: false,
                items: Vec::new(),
                message: format!("list_{}s failed: {err}", kind.as_str()),
            }
        }
    }
}

fn resolve_config() -> &'static CoreConfig {
    API_CONFIG.get_or_init(|| {
        let config = CoreConfig::from_env().unwrap_or_else(|err| {
            warn!("event=config_load module=api status=fallback error={err}");
            CoreConfig::default()
        });
        start_configured_logging(&config);
        config
    })
}

/// Starts file logging when the config names a log directory.
///
/// Failures are logged and otherwise ignored; calls keep working without
/// file logs.
fn start_configured_logging(config: &CoreConfig) -> bool {
    match init_logging_from_config(config) {
        Ok(active) => active,
        Err(err) => {
            warn!("event=logging_init module=api status=error error={err}");
            false
        }
    }
}

fn parse_id(value: &str, field: &str) -> Result<Uuid, String> {
    Uuid::parse_str(value.trim()).map_err(|_| format!("{field} is not a valid id: `{value}`"))
}

fn with_grid_service<T>(
    f: impl FnOnce(&GridService<SqliteGridRepository<'_>>) -> Result<T, GridServiceError>,
) -> Result<T, String> {
    let config = resolve_config();
    let conn = open_db(&config.db_path).map_err(|err| format!("grid DB open failed: {err}"))?;
    let repo = SqliteGridRepository::try_new(&conn)
        .map_err(|err| format!("grid repo init failed: {err}"))?;
    let service = GridService::new(repo, event_bus());
    f(&service).map_err(|err| err.to_string())
}
