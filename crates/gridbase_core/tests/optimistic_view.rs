use gridbase_core::db::open_db_in_memory;
use gridbase_core::{
    GridRepository, GridService, GridServiceError, OrderedView, Rank, RankedKind,
    SqliteGridRepository, TableEvent, TableEventBus, ViewItem,
};
use rusqlite::Connection;
use uuid::Uuid;

fn fetch_view(conn: &Connection, table: Uuid) -> OrderedView {
    let items = SqliteGridRepository::try_new(conn)
        .unwrap()
        .list_ranks(RankedKind::Row, table)
        .unwrap()
        .into_iter()
        .map(|item| ViewItem {
            id: item.id,
            rank: item.rank,
        })
        .collect();
    OrderedView::new(table, RankedKind::Row, items)
}

fn ids(items: &[ViewItem]) -> Vec<Uuid> {
    items.iter().map(|item| item.id).collect()
}

fn setup(conn: &Connection, bus: TableEventBus) -> (GridService<SqliteGridRepository<'_>>, Uuid) {
    let service = GridService::new(SqliteGridRepository::try_new(conn).unwrap(), bus);
    let workspace = service.create_workspace("Ops").unwrap();
    let table = service
        .create_table(workspace.workspace_uuid, "Board")
        .unwrap()
        .table_uuid;
    for _ in 0..3 {
        service.add_row(table).unwrap();
    }
    (service, table)
}

#[test]
fn confirmed_move_matches_server_order() {
    let conn = open_db_in_memory().unwrap();
    let (service, table) = setup(&conn, TableEventBus::new());
    let mut view = fetch_view(&conn, table);

    let optimistic_rank = view.begin_move(0, 2).unwrap().rank.clone();
    let optimistic = ids(&view.rendered());
    let request = view.pending_request().unwrap();

    let change = service.move_row(table, &request).unwrap();
    assert_eq!(change.rank, optimistic_rank);

    let authoritative = fetch_view(&conn, table).base().to_vec();
    let confirmed = view.confirm(authoritative).unwrap();
    assert_eq!(confirmed.item_id, request.item_uuid);
    assert_eq!(ids(view.base()), optimistic);
    assert!(view.pending().is_none());
}

#[test]
fn rejected_move_rolls_back_to_prior_order() {
    let conn = open_db_in_memory().unwrap();
    let (service, table) = setup(&conn, TableEventBus::new());
    let mut view = fetch_view(&conn, table);
    let original = ids(view.base());

    // Another client appends a row; this view's snapshot is now stale.
    service.add_row(table).unwrap();

    view.begin_move(2, 0).unwrap();
    assert_ne!(ids(&view.rendered()), original);
    let err = service
        .move_row(table, &view.pending_request().unwrap())
        .unwrap_err();
    assert!(matches!(err, GridServiceError::StaleNeighbor { .. }));

    view.rollback().unwrap();
    assert_eq!(ids(&view.rendered()), original);
}

#[test]
fn remote_events_keep_a_second_view_in_sync() {
    let conn = open_db_in_memory().unwrap();
    let bus = TableEventBus::new();
    let (service, table) = setup(&conn, bus.clone());
    let mut mover = fetch_view(&conn, table);
    let mut watcher = fetch_view(&conn, table);
    let mut subscription = bus.subscribe(table);

    mover.begin_move(2, 0).unwrap();
    service
        .move_row(table, &mover.pending_request().unwrap())
        .unwrap();
    let row = service.add_row(table).unwrap();

    for event in subscription.drain().unwrap() {
        assert!(watcher.apply_remote(&event));
    }
    let expected = ids(fetch_view(&conn, table).base());
    assert_eq!(ids(watcher.base()), expected);
    assert_eq!(expected.last(), Some(&row.row_uuid));
}

#[tokio::test]
async fn subscriber_receives_rank_change_asynchronously() {
    let bus = TableEventBus::new();
    let table = Uuid::new_v4();
    let mut subscription = bus.subscribe(table);

    let publisher = bus.clone();
    let handle = tokio::spawn(async move {
        publisher.publish(TableEvent::RankChanged {
            table_uuid: table,
            kind: RankedKind::Row,
            item_uuid: Uuid::nil(),
            rank: Rank::parse("a0V").unwrap(),
        })
    });

    let event = subscription.recv().await.unwrap();
    assert_eq!(handle.await.unwrap(), 1);
    assert_eq!(event.table_uuid(), table);
    assert!(matches!(event, TableEvent::RankChanged { .. }));
}
