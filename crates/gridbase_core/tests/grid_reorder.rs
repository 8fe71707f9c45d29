use gridbase_core::db::open_db_in_memory;
use gridbase_core::{
    GridRepoError, GridRepository, GridService, GridServiceError, MoveRequest, RankedKind, Rank,
    SqliteGridRepository, TableEvent, TableEventBus,
};
use rusqlite::Connection;
use std::collections::HashMap;
use uuid::Uuid;

fn seeded_table(conn: &Connection, rows: usize) -> (Uuid, Vec<Uuid>) {
    let repo = SqliteGridRepository::try_new(conn).unwrap();
    let workspace = repo.create_workspace("Ops").unwrap();
    let table = repo.create_table(workspace.workspace_uuid, "Tasks").unwrap();
    let row_ids = (0..rows)
        .map(|_| repo.create_row(table.table_uuid).unwrap().row_uuid)
        .collect();
    (table.table_uuid, row_ids)
}

fn row_order(repo: &SqliteGridRepository<'_>, table: Uuid) -> Vec<Uuid> {
    repo.list_rows(table)
        .unwrap()
        .into_iter()
        .map(|row| row.row_uuid)
        .collect()
}

fn rank_snapshot(conn: &Connection, table: Uuid) -> HashMap<Uuid, Rank> {
    SqliteGridRepository::try_new(conn)
        .unwrap()
        .list_ranks(RankedKind::Row, table)
        .unwrap()
        .into_iter()
        .map(|item| (item.id, item.rank))
        .collect()
}

fn changed_count(before: &HashMap<Uuid, Rank>, after: &HashMap<Uuid, Rank>) -> usize {
    before
        .iter()
        .filter(|(id, rank)| after.get(id) != Some(rank))
        .count()
}

#[test]
fn rows_are_created_with_increasing_ranks() {
    let conn = open_db_in_memory().unwrap();
    let (table, ids) = seeded_table(&conn, 3);
    let repo = SqliteGridRepository::try_new(&conn).unwrap();

    let rows = repo.list_rows(table).unwrap();
    let ranks = rows.iter().map(|row| row.rank.as_str()).collect::<Vec<_>>();
    assert_eq!(ranks, ["a0", "a1", "a2"]);
    assert_eq!(row_order(&repo, table), ids);
}

#[test]
fn move_row_writes_one_record_and_publishes_once() {
    let conn = open_db_in_memory().unwrap();
    let (table, ids) = seeded_table(&conn, 4);
    let bus = TableEventBus::new();
    let mut observer = bus.subscribe(table);
    let mut other_table = bus.subscribe(Uuid::new_v4());
    let service = GridService::new(SqliteGridRepository::try_new(&conn).unwrap(), bus.clone());

    let before = rank_snapshot(&conn, table);
    let change = service
        .move_row(
            table,
            &MoveRequest {
                item_uuid: ids[3],
                source_index: 3,
                destination_index: 1,
                observed_ranks: None,
            },
        )
        .unwrap();
    assert_eq!(changed_count(&before, &rank_snapshot(&conn, table)), 1);
    assert_eq!(change.previous.as_str(), "a3");
    assert_eq!(change.rank.as_str(), "a0V");

    let repo = SqliteGridRepository::try_new(&conn).unwrap();
    assert_eq!(row_order(&repo, table), vec![ids[0], ids[3], ids[1], ids[2]]);

    let events = observer.drain().unwrap();
    assert_eq!(
        events,
        vec![TableEvent::RankChanged {
            table_uuid: table,
            kind: RankedKind::Row,
            item_uuid: ids[3],
            rank: change.rank.clone(),
        }]
    );
    assert!(other_table.drain().unwrap().is_empty());
}

#[test]
fn noop_move_writes_and_publishes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let (table, ids) = seeded_table(&conn, 2);
    let bus = TableEventBus::new();
    let mut observer = bus.subscribe(table);
    let service = GridService::new(SqliteGridRepository::try_new(&conn).unwrap(), bus);

    let before = rank_snapshot(&conn, table);
    let change = service
        .move_row(
            table,
            &MoveRequest {
                item_uuid: ids[1],
                source_index: 1,
                destination_index: 1,
                observed_ranks: None,
            },
        )
        .unwrap();
    assert!(change.is_noop());
    assert_eq!(rank_snapshot(&conn, table), before);
    assert!(observer.drain().unwrap().is_empty());
}

#[test]
fn lone_row_dropped_in_place_keeps_its_rank() {
    let conn = open_db_in_memory().unwrap();
    let (table, ids) = seeded_table(&conn, 2);
    let bus = TableEventBus::new();
    let service = GridService::new(SqliteGridRepository::try_new(&conn).unwrap(), bus.clone());
    service.delete_row(ids[0]).unwrap();
    let mut observer = bus.subscribe(table);

    let before = rank_snapshot(&conn, table);
    assert_eq!(before[&ids[1]].as_str(), "a1");
    let change = service
        .move_row(
            table,
            &MoveRequest {
                item_uuid: ids[1],
                source_index: 0,
                destination_index: 0,
                observed_ranks: Some(vec![Rank::parse("a1").unwrap()]),
            },
        )
        .unwrap();
    assert!(change.is_noop());
    assert_eq!(change.rank.as_str(), "a1");
    assert_eq!(rank_snapshot(&conn, table), before);
    assert!(observer.drain().unwrap().is_empty());
}

#[test]
fn stale_snapshot_is_rejected_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let (table, ids) = seeded_table(&conn, 3);
    let bus = TableEventBus::new();
    let mut observer = bus.subscribe(table);
    let service = GridService::new(SqliteGridRepository::try_new(&conn).unwrap(), bus);

    let observed = vec![Rank::parse("a0").unwrap(), Rank::parse("a1").unwrap()];
    let before = rank_snapshot(&conn, table);
    let err = service
        .move_row(
            table,
            &MoveRequest {
                item_uuid: ids[0],
                source_index: 0,
                destination_index: 1,
                observed_ranks: Some(observed),
            },
        )
        .unwrap_err();
    assert!(matches!(err, GridServiceError::StaleNeighbor { item_uuid, .. } if item_uuid == ids[0]));

    let err = service
        .move_row(
            table,
            &MoveRequest {
                item_uuid: ids[0],
                source_index: 2,
                destination_index: 1,
                observed_ranks: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, GridServiceError::StaleNeighbor { .. }));

    assert_eq!(rank_snapshot(&conn, table), before);
    assert!(observer.drain().unwrap().is_empty());
}

#[test]
fn out_of_range_destination_is_a_rank_error() {
    let conn = open_db_in_memory().unwrap();
    let (table, ids) = seeded_table(&conn, 2);
    let repo = SqliteGridRepository::try_new(&conn).unwrap();

    let err = repo
        .move_item(
            RankedKind::Row,
            table,
            &MoveRequest {
                item_uuid: ids[0],
                source_index: 0,
                destination_index: 5,
                observed_ranks: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, GridRepoError::Rank(_)));
}

#[test]
fn update_rank_is_compare_and_set() {
    let conn = open_db_in_memory().unwrap();
    let (table, ids) = seeded_table(&conn, 3);
    let service = GridService::new(
        SqliteGridRepository::try_new(&conn).unwrap(),
        TableEventBus::new(),
    );

    let a0 = Rank::parse("a0").unwrap();
    let target = Rank::parse("a1V").unwrap();
    let err = service
        .set_rank(RankedKind::Row, ids[0], Some(&target), &target)
        .unwrap_err();
    assert!(matches!(
        err,
        GridServiceError::StaleRank { ref actual, .. } if *actual == a0
    ));

    let change = service
        .set_rank(RankedKind::Row, ids[0], Some(&a0), &target)
        .unwrap();
    assert_eq!(change.rank, target);

    let repo = SqliteGridRepository::try_new(&conn).unwrap();
    assert_eq!(row_order(&repo, table), vec![ids[1], ids[0], ids[2]]);
}

#[test]
fn duplicate_rank_is_rejected_by_store() {
    let conn = open_db_in_memory().unwrap();
    let (_, ids) = seeded_table(&conn, 2);
    let repo = SqliteGridRepository::try_new(&conn).unwrap();

    let taken = Rank::parse("a1").unwrap();
    let err = repo
        .update_rank(RankedKind::Row, ids[0], None, &taken)
        .unwrap_err();
    assert!(matches!(err, GridRepoError::DuplicateRank { ref rank, .. } if *rank == taken));
}

#[test]
fn listing_uses_byte_order_not_case_folding() {
    let conn = open_db_in_memory().unwrap();
    let (table, ids) = seeded_table(&conn, 3);
    let repo = SqliteGridRepository::try_new(&conn).unwrap();

    // Case-folded order would put `aa` before `aB`.
    let upper = Rank::parse("aB").unwrap();
    let lower = Rank::parse("aa").unwrap();
    repo.update_rank(RankedKind::Row, ids[2], None, &upper).unwrap();
    repo.update_rank(RankedKind::Row, ids[0], None, &lower).unwrap();

    let rows = repo.list_rows(table).unwrap();
    let mut sorted = rows.iter().map(|row| row.rank.clone()).collect::<Vec<_>>();
    sorted.sort();
    assert_eq!(
        rows.iter().map(|row| row.rank.clone()).collect::<Vec<_>>(),
        sorted
    );
    assert_eq!(row_order(&repo, table), vec![ids[1], ids[2], ids[0]]);
}

#[test]
fn columns_and_rows_use_separate_rank_spaces() {
    let conn = open_db_in_memory().unwrap();
    let (table, _) = seeded_table(&conn, 2);
    let service = GridService::new(
        SqliteGridRepository::try_new(&conn).unwrap(),
        TableEventBus::new(),
    );

    let first = service
        .add_column(table, "Name", gridbase_core::ColumnType::Text)
        .unwrap();
    let second = service
        .add_column(table, "Done", gridbase_core::ColumnType::Checkbox)
        .unwrap();
    assert_eq!(first.rank.as_str(), "a0");
    assert_eq!(second.rank.as_str(), "a1");

    let change = service
        .move_column(
            table,
            &MoveRequest {
                item_uuid: second.column_uuid,
                source_index: 1,
                destination_index: 0,
                observed_ranks: Some(vec![first.rank.clone(), second.rank.clone()]),
            },
        )
        .unwrap();
    assert_eq!(change.kind, RankedKind::Column);
    assert_eq!(change.rank.as_str(), "Zz");

    let names = service
        .list_columns(table)
        .unwrap()
        .into_iter()
        .map(|column| column.name)
        .collect::<Vec<_>>();
    assert_eq!(names, ["Done", "Name"]);
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = SqliteGridRepository::try_new(&conn).err().unwrap();
    assert!(matches!(
        err,
        GridRepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn moving_unknown_item_reports_not_found() {
    let conn = open_db_in_memory().unwrap();
    let (table, _) = seeded_table(&conn, 1);
    let repo = SqliteGridRepository::try_new(&conn).unwrap();
    let missing = Uuid::new_v4();

    let err = repo
        .move_item(
            RankedKind::Row,
            table,
            &MoveRequest {
                item_uuid: missing,
                source_index: 0,
                destination_index: 0,
                observed_ranks: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, GridRepoError::RowNotFound(id) if id == missing));

    let err = repo
        .move_item(
            RankedKind::Row,
            Uuid::new_v4(),
            &MoveRequest {
                item_uuid: missing,
                source_index: 0,
                destination_index: 0,
                observed_ranks: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, GridRepoError::TableNotFound(_)));
}
