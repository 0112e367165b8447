//! Read-only lookups into tables owned by the surrounding ERP.

use crate::errors::AppResult;
use crate::models::directory::{Employee, Project};
use rusqlite::{Connection, OptionalExtension, Result, Row};

fn map_employee(row: &Row) -> Result<Employee> {
    Ok(Employee {
        id: row.get("id")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        role: row.get("role")?,
        department: row.get("department")?,
        status: row.get("status")?,
        annual_salary: row.get("annual_salary")?,
    })
}

pub fn load_employee(conn: &Connection, id: i64) -> AppResult<Option<Employee>> {
    let emp = conn
        .query_row(
            "SELECT id, first_name, last_name, role, department, status, annual_salary
             FROM employees WHERE id = ?1",
            [id],
            map_employee,
        )
        .optional()?;
    Ok(emp)
}

pub fn employee_name(conn: &Connection, id: i64) -> AppResult<Option<String>> {
    Ok(load_employee(conn, id)?.map(|e| e.display_name()))
}

pub fn list_active_employees(conn: &Connection) -> AppResult<Vec<Employee>> {
    let mut stmt = conn.prepare(
        "SELECT id, first_name, last_name, role, department, status, annual_salary
         FROM employees
         WHERE status = 'ACTIVE'
         ORDER BY first_name, last_name",
    )?;
    let rows = stmt.query_map([], map_employee)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn project_name(conn: &Connection, id: i64) -> AppResult<Option<String>> {
    let name = conn
        .query_row("SELECT name FROM projects WHERE id = ?1", [id], |row| {
            row.get::<_, String>(0)
        })
        .optional()?;
    Ok(name)
}

pub fn list_open_projects(conn: &Connection) -> AppResult<Vec<Project>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, status FROM projects
         WHERE status NOT IN ('DONE', 'CANCELLED')
         ORDER BY name",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Project {
            id: row.get(0)?,
            name: row.get(1)?,
            status: row.get(2)?,
        })
    })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn work_center_id_by_name(conn: &Connection, name: &str) -> AppResult<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM work_centers WHERE name = ?1 ORDER BY id LIMIT 1",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(id)
}
