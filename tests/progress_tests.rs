use optracker::core::progress::propagate;
use optracker::models::unit::UnitStatus;

mod common;
use common::{add_closed_session, add_operation, open_db, seed_shop};

fn status_of(conn: &rusqlite::Connection, id: i64) -> String {
    conn.query_row("SELECT status FROM operations WHERE id = ?1", [id], |r| r.get(0))
        .unwrap()
}

#[test]
fn recompute_twice_gives_the_same_answer() {
    let (pool, _cfg) = open_db("progress_idempotent");
    let conn = &pool.conn;
    seed_shop(conn);
    add_closed_session(conn, 1, Some(1), "2025-03-03T08:00:00", "2025-03-03T11:00:00", 3.0, 25.0);

    let a = propagate(conn, 1).unwrap().unwrap();
    let b = propagate(conn, 1).unwrap().unwrap();
    assert_eq!(a, b);
    assert_eq!(a.percent, 30.0);
    assert_eq!(a.status, Some(UnitStatus::InProgress));
    assert_eq!(status_of(conn, 1), "IN_PROGRESS");

    // only one status change is logged
    let logged: i64 = conn
        .query_row("SELECT COUNT(*) FROM log WHERE operation = 'progress'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(logged, 1);
}

#[test]
fn reaching_the_estimate_marks_done_and_caps_percent() {
    let (pool, _cfg) = open_db("progress_done");
    let conn = &pool.conn;
    seed_shop(conn);
    add_closed_session(conn, 1, Some(1), "2025-03-03T08:00:00", "2025-03-03T16:00:00", 8.0, 25.0);
    add_closed_session(conn, 2, Some(1), "2025-03-04T08:00:00", "2025-03-04T12:00:00", 4.0, 25.0);

    let p = propagate(conn, 1).unwrap().unwrap();
    assert_eq!(p.total_hours, 12.0);
    assert_eq!(p.percent, 100.0);
    assert_eq!(p.status, Some(UnitStatus::Done));
    assert_eq!(status_of(conn, 1), "DONE");
}

#[test]
fn open_sessions_do_not_count() {
    let (pool, _cfg) = open_db("progress_open_ignored");
    let conn = &pool.conn;
    seed_shop(conn);
    common::add_open_session(conn, 1, "2025-03-03T08:00:00");
    conn.execute("UPDATE time_entries SET operation_id = 1", []).unwrap();

    let p = propagate(conn, 1).unwrap().unwrap();
    assert_eq!(p.total_hours, 0.0);
    assert_eq!(p.status, None);
    assert_eq!(status_of(conn, 1), "TODO");
}

#[test]
fn no_estimate_or_missing_operation_is_a_no_op() {
    let (pool, _cfg) = open_db("progress_no_estimate");
    let conn = &pool.conn;
    seed_shop(conn);
    add_operation(conn, 2, Some(10), 2, "Inspect", None, "TODO");
    add_closed_session(conn, 1, Some(2), "2025-03-03T08:00:00", "2025-03-03T09:00:00", 1.0, 25.0);

    assert_eq!(propagate(conn, 2).unwrap(), None);
    assert_eq!(status_of(conn, 2), "TODO");
    assert_eq!(propagate(conn, 404).unwrap(), None);
}
