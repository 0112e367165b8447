use optracker::core::punch::{punch_in_at, punch_out_at};
use optracker::core::reports::{
    active_sessions_at, daily_summary, employee_statistics, history_since,
    project_time_summary, tracker_statistics_on, unit_time_summary, work_center_statistics,
};
use optracker::models::report::PerformanceLabel;
use optracker::models::session::PunchTarget;
use optracker::models::unit::{UnitRef, UnitStatus};
use optracker::utils::date::parse_date;

mod common;
use common::{add_closed_session, add_open_session, open_db, seed_shop, ts};

/// Ada: 2 h on op 1 and 1 h on task 1 on March 3rd; Bob: 3 h general on
/// project 10 on March 4th and an open punch on op 1 since March 5th.
fn seed_history(conn: &rusqlite::Connection, cfg: &optracker::config::Config) {
    let op = PunchTarget::Unit(UnitRef::operation(1));
    let task = PunchTarget::Unit(UnitRef::task(1));

    punch_in_at(conn, 1, op, "", ts("2025-03-03T08:00:00")).unwrap();
    punch_out_at(conn, cfg, 1, None, ts("2025-03-03T10:00:00")).unwrap();
    punch_in_at(conn, 1, task, "", ts("2025-03-03T10:30:00")).unwrap();
    punch_out_at(conn, cfg, 1, None, ts("2025-03-03T11:30:00")).unwrap();

    let general = PunchTarget::General { project_id: Some(10) };
    punch_in_at(conn, 2, general, "", ts("2025-03-04T07:00:00")).unwrap();
    punch_out_at(conn, cfg, 2, None, ts("2025-03-04T10:00:00")).unwrap();
    punch_in_at(conn, 2, op, "", ts("2025-03-05T07:00:00")).unwrap();
}

#[test]
fn unit_summary_compares_booked_time_with_estimate() {
    let (pool, cfg) = open_db("reports_unit_summary");
    let conn = &pool.conn;
    seed_shop(conn);
    seed_history(conn, &cfg);

    let op = unit_time_summary(conn, UnitRef::operation(1)).unwrap();
    assert_eq!(op.sessions_count, 2);
    assert_eq!(op.unique_employees, 2);
    assert_eq!(op.total_hours, 2.0);
    assert_eq!(op.total_cost, 50.0);
    assert_eq!(op.estimated_hours, Some(10.0));
    assert_eq!(op.estimate_variance_percent, Some(-80.0));
    assert_eq!(op.performance, PerformanceLabel::Ahead);
    assert_eq!(op.status, UnitStatus::InProgress);

    let task = unit_time_summary(conn, UnitRef::task(1)).unwrap();
    assert_eq!(task.sessions_count, 1);
    assert_eq!(task.total_hours, 1.0);
    assert_eq!(task.estimate_variance_percent, Some(-75.0));
    assert_eq!(task.status_label(), "ahead of estimate");
}

#[test]
fn history_is_newest_first_and_filters_by_employee() {
    let (pool, cfg) = open_db("reports_history");
    let conn = &pool.conn;
    seed_shop(conn);
    seed_history(conn, &cfg);

    let since = parse_date("2025-03-01").unwrap();
    let all = history_since(conn, None, since).unwrap();
    assert_eq!(all.len(), 4);
    assert!(all.windows(2).all(|w| w[0].session.punch_in >= w[1].session.punch_in));
    assert!(all[0].session.is_open());

    let ada = history_since(conn, Some(1), since).unwrap();
    assert_eq!(ada.len(), 2);
    assert!(ada.iter().all(|d| d.session.employee_id == 1));

    let later = history_since(conn, None, parse_date("2025-03-04").unwrap()).unwrap();
    assert_eq!(later.len(), 2);
}

#[test]
fn daily_summary_counts_open_and_closed_punches() {
    let (pool, cfg) = open_db("reports_daily");
    let conn = &pool.conn;
    seed_shop(conn);
    seed_history(conn, &cfg);

    let d = daily_summary(conn, parse_date("2025-03-03").unwrap()).unwrap();
    assert_eq!(d.total_punches, 2);
    assert_eq!(d.completed_punches, 2);
    assert_eq!(d.active_punches, 0);
    assert_eq!(d.unique_employees, 1);
    assert_eq!(d.unique_operations, 1);
    assert_eq!(d.total_hours, 3.0);
    assert_eq!(d.total_cost, 75.0);

    let open_day = daily_summary(conn, parse_date("2025-03-05").unwrap()).unwrap();
    assert_eq!(open_day.active_punches, 1);
    assert_eq!(open_day.total_hours, 0.0);

    let empty = daily_summary(conn, parse_date("2024-01-01").unwrap()).unwrap();
    assert_eq!(empty.total_punches, 0);
}

#[test]
fn employee_statistics_only_count_closed_sessions() {
    let (pool, cfg) = open_db("reports_employee_stats");
    let conn = &pool.conn;
    seed_shop(conn);

    let now = optracker::utils::time::now();
    let start = now - chrono::Duration::hours(5);
    punch_in_at(conn, 1, PunchTarget::Unit(UnitRef::operation(1)), "", start).unwrap();
    punch_out_at(conn, &cfg, 1, None, start + chrono::Duration::hours(2)).unwrap();
    punch_in_at(conn, 1, PunchTarget::General { project_id: None }, "", start + chrono::Duration::hours(3)).unwrap();

    let s = employee_statistics(conn, 1, 7).unwrap();
    assert_eq!(s.employee_name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(s.employee_role.as_deref(), Some("Welder"));
    assert_eq!(s.total_sessions, 1);
    assert_eq!(s.total_hours, 2.0);
    assert_eq!(s.avg_session_hours, 2.0);
    assert_eq!(s.avg_hourly_rate, 25.0);

    let unknown = employee_statistics(conn, 404, 7).unwrap();
    assert_eq!(unknown.employee_name, None);
    assert_eq!(unknown.total_sessions, 0);
}

#[test]
fn project_and_tracker_totals() {
    let (pool, cfg) = open_db("reports_project_tracker");
    let conn = &pool.conn;
    seed_shop(conn);
    seed_history(conn, &cfg);

    let p = project_time_summary(conn, 10).unwrap();
    assert_eq!(p.project_name.as_deref(), Some("Frame line"));
    assert_eq!(p.total_sessions, 4);
    assert_eq!(p.unique_employees, 2);
    assert_eq!(p.total_hours, 6.0);
    assert_eq!(p.first_punch.as_deref(), Some("2025-03-03T08:00:00"));
    assert_eq!(p.last_punch.as_deref(), Some("2025-03-05T07:00:00"));

    let t = tracker_statistics_on(conn, parse_date("2025-03-03").unwrap()).unwrap();
    assert_eq!(t.total_employees, 2);
    assert_eq!(t.total_entries, 4);
    assert_eq!(t.open_entries, 1);
    assert_eq!(t.operation_entries, 2);
    assert_eq!(t.task_entries, 1);
    assert_eq!(t.general_entries, 1);
    assert_eq!(t.entries_today, 2);
    assert_eq!(t.hours_today, 3.0);
    assert_eq!(t.operation_cost_today, 50.0);
    assert_eq!(t.task_cost_today, 25.0);
}

#[test]
fn active_sessions_report_elapsed_time() {
    let (pool, cfg) = open_db("reports_active");
    let conn = &pool.conn;
    seed_shop(conn);
    seed_history(conn, &cfg);
    punch_in_at(conn, 1, PunchTarget::Unit(UnitRef::task(1)), "", ts("2025-03-05T08:00:00")).unwrap();

    let active = active_sessions_at(conn, ts("2025-03-05T09:30:00")).unwrap();
    assert_eq!(active.len(), 2);
    assert_eq!(active[0].employee_id, 2);
    assert_eq!(active[0].hours_so_far, 2.5);
    assert_eq!(active[1].employee_name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(active[1].work_order_number.as_deref(), Some("WO-0007"));
    assert_eq!(active[1].hours_so_far, 1.5);
}

#[test]
fn work_center_statistics_follow_operation_sessions() {
    let (pool, _cfg) = open_db("reports_work_centers");
    let conn = &pool.conn;
    seed_shop(conn);
    conn.execute_batch(
        "INSERT INTO work_centers (id, name, department) VALUES (6, 'Band saw', NULL);
         UPDATE operations SET work_center_id = 5 WHERE id = 1;",
    )
    .unwrap();

    add_closed_session(conn, 1, Some(1), "2025-03-03T08:00:00", "2025-03-03T10:00:00", 2.0, 25.0);
    add_closed_session(conn, 2, Some(1), "2025-03-04T08:00:00", "2025-03-04T09:30:00", 1.5, 20.0);
    // general work and running sessions are not booked on any station
    add_closed_session(conn, 1, None, "2025-03-05T08:00:00", "2025-03-05T12:00:00", 4.0, 25.0);
    let open = add_open_session(conn, 2, "2025-03-06T08:00:00");
    conn.execute("UPDATE time_entries SET operation_id = 1 WHERE id = ?1", [open])
        .unwrap();

    let s = work_center_statistics(conn).unwrap();
    assert_eq!(s.total_work_centers, 2);
    assert_eq!(s.by_department.get("Production"), Some(&1));
    assert_eq!(s.by_department.get("(none)"), Some(&1));
    assert_eq!(s.used_work_centers, 1);
    assert_eq!(s.operation_sessions, 2);
    assert!((s.operation_hours - 3.5).abs() < 1e-9);

    let robot = &s.per_work_center[0];
    assert_eq!(robot.name, "Robot cell");
    assert_eq!(robot.operations, 1);
    assert!((robot.cost - 80.0).abs() < 1e-9);
    let saw = &s.per_work_center[1];
    assert_eq!((saw.operations, saw.sessions), (0, 0));
}
