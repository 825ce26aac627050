use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::attendance::AttendanceRecord;
use crate::model::status::AttendanceStatus;
use actix_web::{HttpResponse, web};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

/// Attendance row joined with the owning user, as managers see it
#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct TeamAttendanceRow {
    pub id: i64,
    pub user_id: i64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = String, nullable = true)]
    pub check_in: Option<NaiveDateTime>,
    #[schema(value_type = String, nullable = true)]
    pub check_out: Option<NaiveDateTime>,
    #[schema(example = "present")]
    pub status: String,
    #[schema(example = 8.25, nullable = true)]
    pub total_hours: Option<f64>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jane.doe@company.com")]
    pub email: String,
    #[schema(example = "EMP001")]
    pub employee_code: String,
    #[schema(example = "Engineering", nullable = true)]
    pub department: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct AllAttendanceQuery {
    /// Filter by display code (EMP001)
    pub employee_code: Option<String>,
    #[schema(value_type = String, format = "date")]
    pub date: Option<NaiveDate>,
    /// present | absent | late | half-day
    pub status: Option<String>,
    #[schema(value_type = String, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[schema(value_type = String, format = "date")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct DateRangeQuery {
    #[schema(value_type = String, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[schema(value_type = String, format = "date")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct ExportQuery {
    #[schema(value_type = String, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[schema(value_type = String, format = "date")]
    pub end_date: Option<NaiveDate>,
    pub employee_code: Option<String>,
}

// Helper enum for typed SQLx binding of dynamic filters
enum FilterValue<'a> {
    Str(&'a str),
    Date(NaiveDate),
}

const TEAM_ROW_COLUMNS: &str = r#"
    a.id, a.user_id, a.date, a.check_in, a.check_out, a.status, a.total_hours, a.created_at,
    u.name, u.email, u.employee_code, u.department
"#;

async fn fetch_team_rows(
    pool: &PgPool,
    manager_id: i64,
    query: &AllAttendanceQuery,
    limit: Option<u32>,
) -> Result<Vec<TeamAttendanceRow>, ApiError> {
    // Postgres placeholders are positional, so the WHERE clause and the bind
    // list are built in lockstep.
    let mut sql = format!(
        "SELECT {TEAM_ROW_COLUMNS} FROM attendance a JOIN users u ON a.user_id = u.id WHERE u.manager_id = $1"
    );
    let mut args: Vec<FilterValue> = Vec::new();
    let mut next_param = 2;

    if let Some(code) = query.employee_code.as_deref() {
        sql.push_str(&format!(" AND u.employee_code = ${next_param}"));
        args.push(FilterValue::Str(code));
        next_param += 1;
    }

    if let Some(date) = query.date {
        sql.push_str(&format!(" AND a.date = ${next_param}"));
        args.push(FilterValue::Date(date));
        next_param += 1;
    }

    if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
        sql.push_str(&format!(" AND a.date >= ${next_param}"));
        args.push(FilterValue::Date(start));
        next_param += 1;
        sql.push_str(&format!(" AND a.date <= ${next_param}"));
        args.push(FilterValue::Date(end));
        next_param += 1;
    }

    if let Some(status) = query.status.as_deref() {
        // reject unknown values instead of silently matching nothing
        let status = AttendanceStatus::from_str(status)
            .map_err(|_| ApiError::Validation("Invalid status filter".into()))?;
        sql.push_str(&format!(" AND a.status = ${next_param}"));
        args.push(FilterValue::Str(status.as_str()));
    }

    sql.push_str(" ORDER BY a.date DESC, u.name");
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    let mut data_q = sqlx::query_as::<_, TeamAttendanceRow>(&sql);
    data_q = data_q.bind(manager_id);
    for arg in &args {
        data_q = match arg {
            FilterValue::Str(s) => data_q.bind(*s),
            FilterValue::Date(d) => data_q.bind(*d),
        };
    }

    let rows = data_q.fetch_all(pool).await.map_err(|e| {
        tracing::error!(error = %e, manager_id, "Failed to fetch team attendance");
        ApiError::from(e)
    })?;

    Ok(rows)
}

/// Team attendance, filterable, newest first
#[utoipa::path(
    get,
    path = "/api/attendance/all",
    params(AllAttendanceQuery),
    responses(
        (status = 200, description = "Team attendance rows, capped at 500", body = Object, example = json!({
            "attendance": []
        })),
        (status = 400, description = "Invalid status filter"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Team"
)]
pub async fn all_attendance(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<AllAttendanceQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;

    let rows = fetch_team_rows(pool.get_ref(), auth.user_id, &query, Some(500)).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "attendance": rows })))
}

/// One report's attendance rows
#[utoipa::path(
    get,
    path = "/api/attendance/employee/{id}",
    params(
        ("id" = i64, Path, description = "User id of the report"),
        DateRangeQuery
    ),
    responses(
        (status = 200, description = "Attendance rows, newest first", body = Object, example = json!({
            "attendance": []
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Employee not found or not under your management"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Team"
)]
pub async fn employee_attendance(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    query: web::Query<DateRangeQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;

    let employee_id = path.into_inner();

    // Scope check first: a row outside this manager's team reads the same
    // as a row that does not exist.
    let in_scope = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND manager_id = $2)",
    )
    .bind(employee_id)
    .bind(auth.user_id)
    .fetch_one(pool.get_ref())
    .await?;

    if !in_scope {
        return Err(ApiError::Authorization(
            "Employee not found or not under your management".into(),
        ));
    }

    let records = match (query.start_date, query.end_date) {
        (Some(start), Some(end)) => {
            sqlx::query_as::<_, AttendanceRecord>(
                r#"
                SELECT id, user_id, date, check_in, check_out, status, total_hours, created_at
                FROM attendance
                WHERE user_id = $1 AND date >= $2 AND date <= $3
                ORDER BY date DESC
                "#,
            )
            .bind(employee_id)
            .bind(start)
            .bind(end)
            .fetch_all(pool.get_ref())
            .await?
        }
        _ => {
            sqlx::query_as::<_, AttendanceRecord>(
                r#"
                SELECT id, user_id, date, check_in, check_out, status, total_hours, created_at
                FROM attendance
                WHERE user_id = $1
                ORDER BY date DESC
                "#,
            )
            .bind(employee_id)
            .fetch_all(pool.get_ref())
            .await?
        }
    };

    Ok(HttpResponse::Ok().json(serde_json::json!({ "attendance": records })))
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct TeamSummary {
    #[schema(example = 12)]
    pub total_employees: i64,
    #[schema(example = 180)]
    pub total_present: i64,
    #[schema(example = 3)]
    pub total_absent: i64,
    #[schema(example = 14)]
    pub total_late: i64,
    #[schema(example = 5)]
    pub total_half_day: i64,
    #[schema(example = 1520.75)]
    pub total_hours: f64,
}

/// Team aggregate for a month (defaults to the current one)
#[utoipa::path(
    get,
    path = "/api/attendance/summary",
    params(crate::api::attendance::MonthQuery),
    responses(
        (status = 200, description = "Team summary", body = TeamSummary),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Team"
)]
pub async fn team_summary(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<crate::api::attendance::MonthQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;

    let (month, year) = crate::api::attendance::month_or_current(&query);

    let summary = sqlx::query_as::<_, TeamSummary>(
        r#"
        SELECT
            COUNT(DISTINCT a.user_id) AS total_employees,
            COUNT(*) FILTER (WHERE a.status = 'present') AS total_present,
            COUNT(*) FILTER (WHERE a.status = 'absent') AS total_absent,
            COUNT(*) FILTER (WHERE a.status = 'late') AS total_late,
            COUNT(*) FILTER (WHERE a.status = 'half-day') AS total_half_day,
            COALESCE(SUM(a.total_hours), 0) AS total_hours
        FROM attendance a
        JOIN users u ON a.user_id = u.id
        WHERE EXTRACT(MONTH FROM a.date) = $1
          AND EXTRACT(YEAR FROM a.date) = $2
          AND u.manager_id = $3
        "#,
    )
    .bind(month)
    .bind(year)
    .bind(auth.user_id)
    .fetch_one(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "summary": summary })))
}

const CSV_HEADER: &str =
    "Employee ID,Name,Email,Department,Date,Check In,Check Out,Status,Total Hours";

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn format_instant(instant: Option<NaiveDateTime>) -> String {
    instant
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn csv_row(row: &TeamAttendanceRow) -> String {
    [
        csv_field(&row.employee_code),
        csv_field(&row.name),
        csv_field(&row.email),
        csv_field(row.department.as_deref().unwrap_or("")),
        row.date.to_string(),
        format_instant(row.check_in),
        format_instant(row.check_out),
        csv_field(&row.status),
        row.total_hours
            .map(|h| format!("{h:.2}"))
            .unwrap_or_default(),
    ]
    .join(",")
}

fn render_csv(rows: &[TeamAttendanceRow]) -> String {
    let mut csv = String::from(CSV_HEADER);
    for row in rows {
        csv.push('\n');
        csv.push_str(&csv_row(row));
    }
    csv
}

/// CSV download of team attendance
#[utoipa::path(
    get,
    path = "/api/attendance/export",
    params(ExportQuery),
    responses(
        (status = 200, description = "CSV attachment", body = String, content_type = "text/csv"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Team"
)]
pub async fn export_csv(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<ExportQuery>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;

    let filters = AllAttendanceQuery {
        employee_code: query.employee_code.clone(),
        date: None,
        status: None,
        start_date: query.start_date,
        end_date: query.end_date,
    };

    let rows = fetch_team_rows(pool.get_ref(), auth.user_id, &filters, None).await?;
    let csv = render_csv(&rows);

    let filename = format!("attendance-{}.csv", Local::now().format("%Y%m%d%H%M%S"));

    Ok(HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header((
            "Content-Disposition",
            format!("attachment; filename={filename}"),
        ))
        .body(csv))
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct TodayRosterRow {
    pub id: i64,
    #[schema(example = "Jane Doe")]
    pub name: String,
    #[schema(example = "jane.doe@company.com")]
    pub email: String,
    #[schema(example = "EMP001")]
    pub employee_code: String,
    #[schema(example = "Engineering", nullable = true)]
    pub department: Option<String>,
    #[schema(value_type = String, nullable = true)]
    pub check_in: Option<NaiveDateTime>,
    #[schema(value_type = String, nullable = true)]
    pub check_out: Option<NaiveDateTime>,
    /// Null when the report has no record today
    #[schema(example = "present", nullable = true)]
    pub status: Option<String>,
}

/// Whole-team roll call for today
#[utoipa::path(
    get,
    path = "/api/attendance/today-status",
    responses(
        (status = 200, description = "Every report with today's record, if any", body = Object, example = json!({
            "employees": []
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Team"
)]
pub async fn today_status(
    auth: AuthUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;

    let today = Local::now().naive_local().date();

    let employees = sqlx::query_as::<_, TodayRosterRow>(
        r#"
        SELECT u.id, u.name, u.email, u.employee_code, u.department,
               a.check_in, a.check_out, a.status
        FROM users u
        LEFT JOIN attendance a ON u.id = a.user_id AND a.date = $1
        WHERE u.role = 'employee' AND u.manager_id = $2
        ORDER BY u.name
        "#,
    )
    .bind(today)
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "employees": employees })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_row() -> TeamAttendanceRow {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        TeamAttendanceRow {
            id: 1,
            user_id: 9,
            date,
            check_in: date.and_hms_opt(9, 12, 40),
            check_out: date.and_hms_opt(17, 31, 2),
            status: "present".into(),
            total_hours: Some(8.31),
            created_at: Utc::now(),
            name: "Jane Doe".into(),
            email: "jane.doe@company.com".into(),
            employee_code: "EMP001".into(),
            department: Some("Engineering".into()),
        }
    }

    #[test]
    fn renders_header_and_rows() {
        let csv = render_csv(&[sample_row()]);
        let mut lines = csv.lines();

        assert_eq!(lines.next(), Some(CSV_HEADER));
        assert_eq!(
            lines.next(),
            Some(
                "EMP001,Jane Doe,jane.doe@company.com,Engineering,2026-03-02,\
                 2026-03-02 09:12:40,2026-03-02 17:31:02,present,8.31"
            )
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn open_records_leave_checkout_fields_empty() {
        let mut row = sample_row();
        row.check_out = None;
        row.total_hours = None;
        row.status = "late".into();

        let line = csv_row(&row);
        assert!(line.ends_with(",late,"));
        assert!(line.contains(",2026-03-02 09:12:40,,"));
    }

    #[test]
    fn fields_with_delimiters_are_quoted() {
        assert_eq!(csv_field("Doe, Jane"), "\"Doe, Jane\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("plain"), "plain");
    }

    #[test]
    fn missing_department_is_an_empty_field() {
        let mut row = sample_row();
        row.department = None;
        let line = csv_row(&row);
        assert!(line.starts_with("EMP001,Jane Doe,jane.doe@company.com,,2026-03-02,"));
    }
}
