//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `gridbase_core` linkage without any embedding runtime.
//! - Run a deterministic in-memory reorder probe.

use gridbase_core::db::open_db_in_memory;
use gridbase_core::{GridService, MoveRequest, SqliteGridRepository, TableEventBus};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("gridbase_core ping={}", gridbase_core::ping());
    println!("gridbase_core version={}", gridbase_core::core_version());

    match reorder_probe() {
        Ok(ranks) => {
            println!("reorder_probe status=ok ranks={}", ranks.join(","));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("reorder_probe status=error error={err}");
            ExitCode::FAILURE
        }
    }
}

/// Appends three rows, drags the last one to the top and returns the ranks
/// in listing order.
fn reorder_probe() -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let conn = open_db_in_memory()?;
    let bus = TableEventBus::new();
    let service = GridService::new(SqliteGridRepository::try_new(&conn)?, bus.clone());

    let workspace = service.create_workspace("probe")?;
    let table = service.create_table(workspace.workspace_uuid, "probe")?;
    let mut subscription = bus.subscribe(table.table_uuid);
    let rows = (0..3)
        .map(|_| service.add_row(table.table_uuid))
        .collect::<Result<Vec<_>, _>>()?;

    service.move_row(
        table.table_uuid,
        &MoveRequest {
            item_uuid: rows[2].row_uuid,
            source_index: 2,
            destination_index: 0,
            observed_ranks: Some(rows.iter().map(|row| row.rank.clone()).collect()),
        },
    )?;

    let events = subscription
        .drain()
        .map_err(|skipped| format!("subscription lagged by {skipped} events"))?;
    println!("reorder_probe events={}", events.len());

    Ok(service
        .list_rows(table.table_uuid)?
        .into_iter()
        .map(|row| row.rank.into_string())
        .collect())
}
