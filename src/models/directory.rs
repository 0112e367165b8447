//! Rows owned by the surrounding ERP that the tracker only reads.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Employee {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<String>,
    pub department: Option<String>,
    pub status: String,
    pub annual_salary: Option<f64>,
}

impl Employee {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub status: String,
}
