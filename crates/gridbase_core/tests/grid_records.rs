use gridbase_core::db::open_db_in_memory;
use gridbase_core::{
    CellValue, ColumnType, ColumnValidationError, GridService, GridServiceError, RecordSort,
    SortDirection, SqliteGridRepository, TableEvent, TableEventBus,
};
use rusqlite::Connection;
use uuid::Uuid;

fn service(conn: &Connection) -> GridService<SqliteGridRepository<'_>> {
    GridService::new(
        SqliteGridRepository::try_new(conn).unwrap(),
        TableEventBus::new(),
    )
}

fn new_table(service: &GridService<SqliteGridRepository<'_>>) -> Uuid {
    let workspace = service.create_workspace("Team").unwrap();
    service
        .create_table(workspace.workspace_uuid, "  Backlog  ")
        .unwrap()
        .table_uuid
}

#[test]
fn blank_names_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    assert!(matches!(
        service.create_workspace("   "),
        Err(GridServiceError::InvalidName)
    ));

    let workspace = service.create_workspace("Team").unwrap();
    assert!(matches!(
        service.create_table(workspace.workspace_uuid, ""),
        Err(GridServiceError::InvalidName)
    ));
    assert!(matches!(
        service.create_table(Uuid::new_v4(), "Orphan"),
        Err(GridServiceError::WorkspaceNotFound(_))
    ));
}

#[test]
fn cells_are_validated_and_stored_canonically() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let table = new_table(&service);
    let status = service
        .add_column(
            table,
            "Status",
            ColumnType::Dropdown {
                options: vec!["Todo".to_string(), "Done".to_string()],
            },
        )
        .unwrap();
    let due = service.add_column(table, "Due", ColumnType::Date).unwrap();
    let row = service.add_row(table).unwrap();

    assert_eq!(
        service.set_cell(row.row_uuid, due.column_uuid, " 2024-03-01 ").unwrap(),
        CellValue::Date(chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
    );
    let err = service
        .set_cell(row.row_uuid, status.column_uuid, "Blocked")
        .unwrap_err();
    assert!(matches!(
        err,
        GridServiceError::Cell {
            source: ColumnValidationError::UnknownOption { .. },
            ..
        }
    ));

    let stored: String = conn
        .query_row(
            "SELECT value FROM grid_cells WHERE row_uuid = ?1 AND column_uuid = ?2;",
            [row.row_uuid.to_string(), due.column_uuid.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, "2024-03-01");
}

#[test]
fn invalid_dropdown_definition_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let table = new_table(&service);
    let err = service
        .add_column(table, "Stage", ColumnType::Dropdown { options: vec![] })
        .unwrap_err();
    assert!(matches!(err, GridServiceError::InvalidColumnType(_)));
    assert!(service.list_columns(table).unwrap().is_empty());
}

#[test]
fn cell_requires_row_and_column_of_same_table() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let first = new_table(&service);
    let second = new_table(&service);
    let row = service.add_row(first).unwrap();
    let column = service.add_column(second, "Name", ColumnType::Text).unwrap();

    let err = service
        .set_cell(row.row_uuid, column.column_uuid, "x")
        .unwrap_err();
    assert!(matches!(err, GridServiceError::TableMismatch { .. }));
}

#[test]
fn records_sort_by_column_with_empty_cells_last() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let table = new_table(&service);
    let points = service.add_column(table, "Points", ColumnType::Number).unwrap();
    let rows = (0..4)
        .map(|_| service.add_row(table).unwrap().row_uuid)
        .collect::<Vec<_>>();

    service.set_cell(rows[0], points.column_uuid, "10").unwrap();
    service.set_cell(rows[1], points.column_uuid, "9").unwrap();
    service.set_cell(rows[3], points.column_uuid, "10").unwrap();

    let order = |direction| {
        service
            .list_records(
                table,
                Some(RecordSort {
                    column_uuid: points.column_uuid,
                    direction,
                }),
            )
            .unwrap()
            .into_iter()
            .map(|record| record.row.row_uuid)
            .collect::<Vec<_>>()
    };

    assert_eq!(
        order(SortDirection::Ascending),
        vec![rows[1], rows[0], rows[3], rows[2]]
    );
    assert_eq!(
        order(SortDirection::Descending),
        vec![rows[0], rows[3], rows[1], rows[2]]
    );

    let unsorted = service.list_records(table, None).unwrap();
    assert_eq!(
        unsorted.iter().map(|record| record.row.row_uuid).collect::<Vec<_>>(),
        rows
    );
    assert_eq!(
        unsorted[1].cells.get(&points.column_uuid),
        Some(&CellValue::Number(9.0))
    );
}

#[test]
fn clear_and_delete_publish_events() {
    let conn = open_db_in_memory().unwrap();
    let bus = TableEventBus::new();
    let service = GridService::new(SqliteGridRepository::try_new(&conn).unwrap(), bus.clone());
    let table = new_table(&service);
    let mut observer = bus.subscribe(table);

    let column = service.add_column(table, "Done", ColumnType::Checkbox).unwrap();
    let row = service.add_row(table).unwrap();
    service.set_cell(row.row_uuid, column.column_uuid, "yes").unwrap();
    service.clear_cell(row.row_uuid, column.column_uuid).unwrap();
    service.delete_column(column.column_uuid).unwrap();
    service.delete_row(row.row_uuid).unwrap();

    let events = observer.drain().unwrap();
    assert_eq!(events.len(), 6);
    assert!(matches!(events[0], TableEvent::ColumnCreated { .. }));
    assert!(matches!(events[1], TableEvent::RowCreated { .. }));
    assert!(matches!(
        events[2],
        TableEvent::CellUpdated { value: Some(ref value), .. } if value == "true"
    ));
    assert!(matches!(
        events[3],
        TableEvent::CellUpdated { value: None, .. }
    ));
    assert!(matches!(events[4], TableEvent::ColumnDeleted { .. }));
    assert!(matches!(events[5], TableEvent::RowDeleted { .. }));

    assert!(matches!(
        service.delete_row(row.row_uuid),
        Err(GridServiceError::RowNotFound(_))
    ));
    assert!(observer.drain().unwrap().is_empty());
}

#[test]
fn deleting_column_drops_its_cells() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let table = new_table(&service);
    let name = service.add_column(table, "Name", ColumnType::Text).unwrap();
    let row = service.add_row(table).unwrap();
    service.set_cell(row.row_uuid, name.column_uuid, "Ada").unwrap();

    service.delete_column(name.column_uuid).unwrap();
    let records = service.list_records(table, None).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].cells.is_empty());
}
