use serde::{Deserialize, Serialize};

use db::models::course::Model as CourseModel;

#[derive(Debug, Serialize)]
pub struct CourseResponse {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub department: String,
    pub year: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CourseModel> for CourseResponse {
    fn from(m: CourseModel) -> Self {
        Self {
            id: m.id,
            code: m.code,
            name: m.name,
            department: m.department,
            year: m.year,
            created_at: m.created_at.to_rfc3339(),
            updated_at: m.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Deserialize)]
pub struct CreateCourseReq {
    pub code: String,
    pub name: String,
    pub department: String,
    pub year: i32,
}
