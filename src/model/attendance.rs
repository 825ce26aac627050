use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One attendance row: at most one per (user, date).
///
/// `check_out` and `total_hours` stay null until check-out; a row with a
/// check-out but no check-in cannot exist.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceRecord {
    pub id: i64,
    pub user_id: i64,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "2026-03-02T09:12:40", value_type = String, nullable = true)]
    pub check_in: Option<NaiveDateTime>,
    #[schema(example = "2026-03-02T17:31:02", value_type = String, nullable = true)]
    pub check_out: Option<NaiveDateTime>,
    #[schema(example = "present")]
    pub status: String,
    #[schema(example = 8.31, nullable = true)]
    pub total_hours: Option<f64>,
    #[schema(example = "2026-03-02T09:12:40Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}
