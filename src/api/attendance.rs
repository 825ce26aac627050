use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::attendance::AttendanceRecord;
use crate::model::status::{calculate_hours, determine_status};
use actix_web::{HttpResponse, web};
use chrono::{Datelike, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::{IntoParams, ToSchema};

const RECORD_COLUMNS: &str =
    "id, user_id, date, check_in, check_out, status, total_hours, created_at";

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct MonthQuery {
    /// Calendar month 1-12; both month and year or neither
    #[schema(example = 3)]
    pub month: Option<i32>,
    #[schema(example = 2026)]
    pub year: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct TodayStatus {
    pub checked_in: bool,
    pub checked_out: bool,
    #[schema(value_type = String, nullable = true)]
    pub check_in: Option<NaiveDateTime>,
    #[schema(value_type = String, nullable = true)]
    pub check_out: Option<NaiveDateTime>,
    #[schema(example = "present")]
    pub status: String,
    #[schema(example = 8.25, nullable = true)]
    pub total_hours: Option<f64>,
}

impl TodayStatus {
    pub fn from_record(record: Option<AttendanceRecord>) -> Self {
        match record {
            Some(record) => TodayStatus {
                checked_in: record.check_in.is_some(),
                checked_out: record.check_out.is_some(),
                check_in: record.check_in,
                check_out: record.check_out,
                status: record.status,
                total_hours: record.total_hours,
            },
            None => TodayStatus {
                checked_in: false,
                checked_out: false,
                check_in: None,
                check_out: None,
                status: "not_checked_in".to_string(),
                total_hours: None,
            },
        }
    }
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct MonthlySummary {
    #[schema(example = 18)]
    pub present: i64,
    #[schema(example = 0)]
    pub absent: i64,
    #[schema(example = 2)]
    pub late: i64,
    #[schema(example = 1)]
    pub half_day: i64,
    #[schema(example = 161.5)]
    pub total_hours: f64,
}

pub(crate) async fn fetch_today_record(
    pool: &PgPool,
    user_id: i64,
) -> Result<Option<AttendanceRecord>, sqlx::Error> {
    let today = Local::now().naive_local().date();

    sqlx::query_as::<_, AttendanceRecord>(&format!(
        "SELECT {RECORD_COLUMNS} FROM attendance WHERE user_id = $1 AND date = $2"
    ))
    .bind(user_id)
    .bind(today)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn fetch_monthly_summary(
    pool: &PgPool,
    user_id: i64,
    month: i32,
    year: i32,
) -> Result<MonthlySummary, sqlx::Error> {
    sqlx::query_as::<_, MonthlySummary>(
        r#"
        SELECT
            COUNT(*) FILTER (WHERE status = 'present') AS present,
            COUNT(*) FILTER (WHERE status = 'absent') AS absent,
            COUNT(*) FILTER (WHERE status = 'late') AS late,
            COUNT(*) FILTER (WHERE status = 'half-day') AS half_day,
            COALESCE(SUM(total_hours), 0) AS total_hours
        FROM attendance
        WHERE user_id = $1
          AND EXTRACT(MONTH FROM date) = $2
          AND EXTRACT(YEAR FROM date) = $3
        "#,
    )
    .bind(user_id)
    .bind(month)
    .bind(year)
    .fetch_one(pool)
    .await
}

pub(crate) fn month_or_current(query: &MonthQuery) -> (i32, i32) {
    let now = Local::now();
    (
        query.month.unwrap_or(now.month() as i32),
        query.year.unwrap_or(now.year()),
    )
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/checkin",
    responses(
        (status = 200, description = "Checked in successfully", body = Object, example = json!({
            "message": "Checked in successfully",
            "check_in": "2026-03-02T09:12:40",
            "status": "present"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Already checked in today", body = Object, example = json!({
            "error": "Already checked in today"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_employee()?;

    let now = Local::now().naive_local();
    let today = now.date();
    // provisional: recomputed in full at check-out
    let status = determine_status(Some(now), None);

    // ON CONFLICT DO NOTHING keeps one-row-per-day atomic; two concurrent
    // check-ins cannot both insert.
    let result = sqlx::query(
        r#"
        INSERT INTO attendance (user_id, date, check_in, status)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, date) DO NOTHING
        "#,
    )
    .bind(auth.user_id)
    .bind(today)
    .bind(now)
    .bind(status.as_str())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Check-in failed");
        ApiError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::Conflict("Already checked in today".into()));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Checked in successfully",
        "check_in": now,
        "status": status.as_str()
    })))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/checkout",
    responses(
        (status = 200, description = "Checked out successfully", body = Object, example = json!({
            "message": "Checked out successfully",
            "check_out": "2026-03-02T17:31:02",
            "status": "present",
            "total_hours": 8.31
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "No check-in yet, or already checked out", body = Object, example = json!({
            "error": "Already checked out today"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_employee()?;

    let now = Local::now().naive_local();
    let today = now.date();

    let row: Option<(i64, Option<NaiveDateTime>, Option<NaiveDateTime>)> = sqlx::query_as(
        "SELECT id, check_in, check_out FROM attendance WHERE user_id = $1 AND date = $2",
    )
    .bind(auth.user_id)
    .bind(today)
    .fetch_optional(pool.get_ref())
    .await?;

    let (record_id, check_in) = match row {
        None | Some((_, None, _)) => {
            return Err(ApiError::Conflict("Please check in first".into()));
        }
        Some((_, _, Some(_))) => {
            return Err(ApiError::Conflict("Already checked out today".into()));
        }
        Some((id, Some(check_in), None)) => (id, check_in),
    };

    let total_hours = calculate_hours(check_in, now);
    let status = determine_status(Some(check_in), Some(now));

    // Conditional update: the check_out IS NULL guard makes a second,
    // concurrent check-out lose with zero rows affected instead of
    // overwriting the first.
    let result = sqlx::query(
        r#"
        UPDATE attendance
        SET check_out = $1, total_hours = $2, status = $3
        WHERE id = $4
        AND check_out IS NULL
        "#,
    )
    .bind(now)
    .bind(total_hours)
    .bind(status.as_str())
    .bind(record_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        tracing::error!(error = %e, user_id = auth.user_id, "Check-out failed");
        ApiError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::Conflict("Already checked out today".into()));
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Checked out successfully",
        "check_out": now,
        "status": status.as_str(),
        "total_hours": total_hours
    })))
}

/// Today's own record, or a not_checked_in placeholder
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's status", body = TodayStatus),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today(auth: AuthUser, pool: web::Data<PgPool>) -> Result<HttpResponse, ApiError> {
    auth.require_employee()?;

    let record = fetch_today_record(pool.get_ref(), auth.user_id).await?;

    Ok(HttpResponse::Ok().json(TodayStatus::from_record(record)))
}

/// Own attendance history, newest first
#[utoipa::path(
    get,
    path = "/api/attendance/my-history",
    params(MonthQuery),
    responses(
        (status = 200, description = "Attendance rows, newest first, capped at 100", body = Object, example = json!({
            "attendance": []
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn my_history(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_employee()?;

    let records = match (query.month, query.year) {
        (Some(month), Some(year)) => {
            sqlx::query_as::<_, AttendanceRecord>(&format!(
                r#"
                SELECT {RECORD_COLUMNS}
                FROM attendance
                WHERE user_id = $1
                  AND EXTRACT(MONTH FROM date) = $2
                  AND EXTRACT(YEAR FROM date) = $3
                ORDER BY date DESC
                LIMIT 100
                "#
            ))
            .bind(auth.user_id)
            .bind(month)
            .bind(year)
            .fetch_all(pool.get_ref())
            .await?
        }
        _ => {
            sqlx::query_as::<_, AttendanceRecord>(&format!(
                "SELECT {RECORD_COLUMNS} FROM attendance WHERE user_id = $1 ORDER BY date DESC LIMIT 100"
            ))
            .bind(auth.user_id)
            .fetch_all(pool.get_ref())
            .await?
        }
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({ "attendance": records })))
}

/// Own per-status counts for a month (defaults to the current one)
#[utoipa::path(
    get,
    path = "/api/attendance/my-summary",
    params(MonthQuery),
    responses(
        (status = 200, description = "Monthly summary", body = MonthlySummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn my_summary(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<MonthQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_employee()?;

    let (month, year) = month_or_current(&query);
    let summary = fetch_monthly_summary(pool.get_ref(), auth.user_id, month, year).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "summary": summary })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_when_no_record_exists() {
        let status = TodayStatus::from_record(None);
        assert!(!status.checked_in);
        assert!(!status.checked_out);
        assert_eq!(status.status, "not_checked_in");
        assert_eq!(status.total_hours, None);
    }

    #[test]
    fn mirrors_an_open_record() {
        let record = AttendanceRecord {
            id: 1,
            user_id: 9,
            date: chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            check_in: chrono::NaiveDate::from_ymd_opt(2026, 3, 2)
                .unwrap()
                .and_hms_opt(9, 0, 0),
            check_out: None,
            status: "present".into(),
            total_hours: None,
            created_at: chrono::Utc::now(),
        };

        let status = TodayStatus::from_record(Some(record));
        assert!(status.checked_in);
        assert!(!status.checked_out);
        assert_eq!(status.status, "present");
    }
}
