//! Core domain logic for gridbase.
//! Rank ordering, grid persistence and live table updates live here; API and
//! CLI crates only adapt these types.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod rank;
pub mod repo;
pub mod service;
pub mod sync;
pub mod view;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::column::{CellValue, ColumnType, ColumnValidationError};
pub use model::grid::{
    Column, ColumnId, GridTable, RankChange, RankedKind, RankedRef, Row, RowId, TableId,
    Workspace, WorkspaceId,
};
pub use rank::{HeaderSlot, Rank, RankError, RankResult};
pub use repo::grid_repo::{
    GridRepoError, GridRepoResult, GridRepository, MoveRequest, SqliteGridRepository, StoredCell,
};
pub use service::grid_service::{
    GridService, GridServiceError, Record, RecordSort, SortDirection,
};
pub use sync::event_bus::{TableEvent, TableEventBus, TableSubscription};
pub use view::{OrderedView, PendingMove, ViewError, ViewItem};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
