use optracker::config::NotesMerge;
use optracker::core::punch::{get_open_session, punch_in_at, punch_out_at};
use optracker::core::reports::unit_time_summary;
use optracker::db::pool::DbPool;
use optracker::db::sessions::{count_open_sessions, load_session};
use optracker::errors::AppError;
use optracker::models::session::{PunchKind, PunchTarget};
use optracker::models::unit::{UnitRef, UnitStatus};
use rusqlite::params;
use std::sync::{Arc, Barrier};
use std::thread;

mod common;
use common::{count_rows, open_db, seed_shop, ts};

const OP1: PunchTarget = PunchTarget::Unit(UnitRef {
    kind: optracker::models::unit::UnitKind::Operation,
    id: 1,
});

#[test]
fn punch_out_computes_hours_rate_cost_and_progress() {
    let (pool, cfg) = open_db("punch_scenario_one");
    let conn = &pool.conn;
    seed_shop(conn);

    let id = punch_in_at(conn, 1, OP1, "", ts("2025-03-03T08:00:00")).unwrap();
    let closed = punch_out_at(conn, &cfg, 1, None, ts("2025-03-03T10:00:00")).unwrap();

    assert_eq!(closed.session.id, id);
    assert_eq!(closed.session.total_hours, Some(2.0));
    assert_eq!(closed.session.hourly_rate, Some(25.0));
    assert_eq!(closed.session.total_cost, Some(50.0));

    let progress = closed.progress.expect("operation progress");
    assert_eq!(progress.total_hours, 2.0);
    assert_eq!(progress.percent, 20.0);
    assert_eq!(progress.status, Some(UnitStatus::InProgress));

    let status: String = conn
        .query_row("SELECT status FROM operations WHERE id = 1", [], |r| r.get(0))
        .unwrap();
    assert_eq!(status, "IN_PROGRESS");

    let summary = unit_time_summary(conn, UnitRef::operation(1)).unwrap();
    assert_eq!(summary.total_hours, 2.0);
    assert_eq!(summary.sessions_count, 1);
}

#[test]
fn second_punch_in_is_rejected_and_changes_nothing() {
    let (pool, _cfg) = open_db("punch_already_open");
    let conn = &pool.conn;
    seed_shop(conn);

    let first = punch_in_at(conn, 1, OP1, "first", ts("2025-03-03T08:00:00")).unwrap();
    let before = load_session(conn, first).unwrap().unwrap();

    let err = punch_in_at(
        conn,
        1,
        PunchTarget::Unit(UnitRef::task(1)),
        "second",
        ts("2025-03-03T09:00:00"),
    )
    .unwrap_err();

    match err {
        AppError::AlreadyOpen {
            employee_id,
            session_id,
        } => {
            assert_eq!(employee_id, 1);
            assert_eq!(session_id, first);
        }
        other => panic!("expected AlreadyOpen, got {other:?}"),
    }

    assert_eq!(count_rows(conn, "employee_id = 1"), 1);
    assert_eq!(load_session(conn, first).unwrap().unwrap(), before);
}

#[test]
fn punch_out_without_open_session_is_rejected() {
    let (pool, cfg) = open_db("punch_no_open");
    let conn = &pool.conn;
    seed_shop(conn);

    let err = punch_out_at(&pool.conn, &cfg, 2, None, ts("2025-03-03T10:00:00")).unwrap_err();
    assert!(matches!(err, AppError::NoOpenSession(2)));
    assert_eq!(count_rows(conn, "1 = 1"), 0);
}

#[test]
fn punch_out_before_punch_in_is_rejected() {
    let (pool, cfg) = open_db("punch_out_before_in");
    let conn = &pool.conn;
    seed_shop(conn);

    punch_in_at(conn, 1, OP1, "", ts("2025-03-03T10:00:00")).unwrap();
    let err = punch_out_at(conn, &cfg, 1, None, ts("2025-03-03T09:00:00")).unwrap_err();
    assert!(matches!(err, AppError::PunchOutBeforePunchIn { .. }));
    assert_eq!(count_rows(conn, "punch_out IS NULL"), 1);
}

#[test]
fn unknown_employee_and_unknown_unit_are_rejected() {
    let (pool, _cfg) = open_db("punch_unknown_refs");
    let conn = &pool.conn;
    seed_shop(conn);

    let err = punch_in_at(conn, 99, OP1, "", ts("2025-03-03T08:00:00")).unwrap_err();
    assert!(matches!(err, AppError::EmployeeNotFound(99)));

    let missing = UnitRef::operation(42);
    let err = punch_in_at(
        conn,
        1,
        PunchTarget::Unit(missing),
        "",
        ts("2025-03-03T08:00:00"),
    )
    .unwrap_err();
    assert!(matches!(err, AppError::UnitNotFound(u) if u == missing));

    // material lines are not units
    let err = punch_in_at(
        conn,
        1,
        PunchTarget::Unit(UnitRef::task(2)),
        "",
        ts("2025-03-03T08:00:00"),
    )
    .unwrap_err();
    assert!(matches!(err, AppError::UnitNotFound(_)));

    assert_eq!(count_rows(conn, "1 = 1"), 0);
}

#[test]
fn cost_is_hours_times_rate_and_stable_on_reread() {
    let (pool, cfg) = open_db("punch_cost_determinism");
    let conn = &pool.conn;
    seed_shop(conn);

    // Bob has no salary on file: fallback rate
    let id = punch_in_at(
        conn,
        2,
        PunchTarget::General { project_id: Some(10) },
        "",
        ts("2025-03-03T08:00:00"),
    )
    .unwrap();
    punch_out_at(conn, &cfg, 2, None, ts("2025-03-03T09:45:00")).unwrap();

    let a = load_session(conn, id).unwrap().unwrap();
    let b = load_session(conn, id).unwrap().unwrap();
    assert_eq!(a, b);
    assert_eq!(a.kind(), PunchKind::General);
    assert_eq!(a.project_id, Some(10));
    assert_eq!(a.total_hours, Some(1.75));
    assert_eq!(a.hourly_rate, Some(cfg.default_hourly_rate));
    let expected = 1.75 * cfg.default_hourly_rate;
    assert!((a.total_cost.unwrap() - expected).abs() < 1e-9);
}

#[test]
fn salary_change_does_not_touch_closed_sessions() {
    let (pool, cfg) = open_db("punch_rate_snapshot");
    let conn = &pool.conn;
    seed_shop(conn);

    let id = punch_in_at(conn, 1, OP1, "", ts("2025-03-03T08:00:00")).unwrap();
    punch_out_at(conn, &cfg, 1, None, ts("2025-03-03T10:00:00")).unwrap();

    conn.execute(
        "UPDATE employees SET annual_salary = ?1 WHERE id = 1",
        params![104_000.0],
    )
    .unwrap();

    let s = load_session(conn, id).unwrap().unwrap();
    assert_eq!(s.hourly_rate, Some(25.0));
    assert_eq!(s.total_cost, Some(50.0));

    // the next session picks up the new rate
    punch_in_at(conn, 1, OP1, "", ts("2025-03-04T08:00:00")).unwrap();
    let closed = punch_out_at(conn, &cfg, 1, None, ts("2025-03-04T09:00:00")).unwrap();
    assert_eq!(closed.session.hourly_rate, Some(50.0));
}

#[test]
fn task_punch_records_work_order_and_line() {
    let (pool, cfg) = open_db("punch_task_unit");
    let conn = &pool.conn;
    seed_shop(conn);

    let id = punch_in_at(
        conn,
        1,
        PunchTarget::Unit(UnitRef::task(1)),
        "",
        ts("2025-03-03T08:00:00"),
    )
    .unwrap();
    let s = load_session(conn, id).unwrap().unwrap();
    assert_eq!(s.operation_id, None);
    assert_eq!(s.work_order_id, Some(7));
    assert_eq!(s.work_order_line_id, Some(1));
    assert_eq!(s.project_id, Some(10));
    assert_eq!(s.kind(), PunchKind::EmbeddedTask);

    let closed = punch_out_at(conn, &cfg, 1, None, ts("2025-03-03T09:00:00")).unwrap();
    assert!(closed.progress.is_none());
}

#[test]
fn open_session_carries_resolved_description() {
    let (pool, _cfg) = open_db("punch_open_detail");
    let conn = &pool.conn;
    seed_shop(conn);

    assert!(get_open_session(conn, 1).unwrap().is_none());

    punch_in_at(
        conn,
        1,
        PunchTarget::Unit(UnitRef::task(1)),
        "",
        ts("2025-03-03T08:00:00"),
    )
    .unwrap();

    let d = get_open_session(conn, 1).unwrap().expect("open session");
    assert_eq!(d.kind, PunchKind::EmbeddedTask);
    assert_eq!(d.employee_name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(d.project_name.as_deref(), Some("Frame line"));
    assert_eq!(d.work_order_number.as_deref(), Some("WO-0007"));
    assert_eq!(d.sequence_number, Some(2));
    assert!(d.unit_description.unwrap().starts_with("Welding"));
}

#[test]
fn notes_follow_the_configured_merge_policy() {
    let (pool, mut cfg) = open_db("punch_notes_merge");
    let conn = &pool.conn;
    seed_shop(conn);

    punch_in_at(conn, 1, OP1, "jig set", ts("2025-03-03T08:00:00")).unwrap();
    let c = punch_out_at(conn, &cfg, 1, Some("frame done"), ts("2025-03-03T09:00:00")).unwrap();
    assert_eq!(c.session.notes, "jig set | frame done");

    cfg.notes_merge = NotesMerge::Replace;
    punch_in_at(conn, 1, OP1, "jig set", ts("2025-03-03T10:00:00")).unwrap();
    let c = punch_out_at(conn, &cfg, 1, Some("frame done"), ts("2025-03-03T11:00:00")).unwrap();
    assert_eq!(c.session.notes, "frame done");

    cfg.notes_merge = NotesMerge::Keep;
    punch_in_at(conn, 1, OP1, "jig set", ts("2025-03-03T12:00:00")).unwrap();
    let c = punch_out_at(conn, &cfg, 1, None, ts("2025-03-03T13:00:00")).unwrap();
    assert_eq!(c.session.notes, "jig set");
}

#[test]
fn storage_rejects_a_second_open_row() {
    let (pool, _cfg) = open_db("punch_unique_index");
    let conn = &pool.conn;
    seed_shop(conn);

    punch_in_at(conn, 1, OP1, "", ts("2025-03-03T08:00:00")).unwrap();

    let res = conn.execute(
        "INSERT INTO time_entries (employee_id, punch_in, notes, created_at)
         VALUES (1, '2025-03-03T09:00:00', '', '2025-03-03T09:00:00')",
        [],
    );
    assert!(res.is_err());
    assert_eq!(count_rows(conn, "employee_id = 1 AND punch_out IS NULL"), 1);
}

#[test]
fn concurrent_punch_ins_open_exactly_one_session() {
    const WRITERS: usize = 8;

    let (pool, cfg) = open_db("punch_concurrent_race");
    seed_shop(&pool.conn);
    let db_path = cfg.database.clone();

    for round in 0..3 {
        let barrier = Arc::new(Barrier::new(WRITERS));
        let handles: Vec<_> = (0..WRITERS)
            .map(|i| {
                let barrier = Arc::clone(&barrier);
                let path = db_path.clone();
                thread::spawn(move || {
                    let pool = DbPool::new(&path).expect("open connection");
                    let at = ts("2025-03-03T08:00:00")
                        + chrono::Duration::hours(round)
                        + chrono::Duration::seconds(i as i64);
                    barrier.wait();
                    punch_in_at(&pool.conn, 1, OP1, "", at)
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("writer thread"))
            .collect();

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let rejected = results
            .iter()
            .filter(|r| matches!(r, Err(AppError::AlreadyOpen { .. })))
            .count();
        assert_eq!(ok, 1, "round {round}: {results:?}");
        assert_eq!(rejected, WRITERS - 1);
        assert_eq!(count_open_sessions(&pool.conn, 1).unwrap(), 1);

        punch_out_at(&pool.conn, &cfg, 1, None, ts("2025-03-03T23:00:00")).unwrap();
    }

    assert_eq!(count_rows(&pool.conn, "employee_id = 1"), 3);
}
