use crate::api::attendance::{TodayStatus, fetch_monthly_summary, fetch_today_record};
use crate::auth::auth::AuthUser;
use crate::error::ApiError;
use crate::model::attendance::AttendanceRecord;
use actix_web::{HttpResponse, web};
use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;

/// Everything the employee landing page needs in one round trip
#[utoipa::path(
    get,
    path = "/api/dashboard/employee",
    responses(
        (status = 200, description = "Today + monthly summary + last seven days", body = Object, example = json!({
            "today": { "checked_in": false, "checked_out": false, "status": "not_checked_in" },
            "monthly": { "present": 0, "absent": 0, "late": 0, "half_day": 0, "total_hours": 0.0 },
            "recent": []
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn employee_dashboard(
    auth: AuthUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_employee()?;

    let now = Local::now();
    let (month, year) = (now.month() as i32, now.year());

    let today = fetch_today_record(pool.get_ref(), auth.user_id).await?;
    let monthly = fetch_monthly_summary(pool.get_ref(), auth.user_id, month, year).await?;

    let recent = sqlx::query_as::<_, AttendanceRecord>(
        r#"
        SELECT id, user_id, date, check_in, check_out, status, total_hours, created_at
        FROM attendance
        WHERE user_id = $1
          AND date >= CURRENT_DATE - INTERVAL '7 days'
        ORDER BY date DESC
        "#,
    )
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "today": TodayStatus::from_record(today),
        "monthly": monthly,
        "recent": recent,
    })))
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct DailyTrendRow {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    /// present + late + half-day
    pub present: i64,
    pub absent: i64,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct DepartmentRow {
    #[schema(example = "Engineering", nullable = true)]
    pub department: Option<String>,
    pub employees: i64,
    pub present: i64,
    pub absent: i64,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct AbsentEmployeeRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub employee_code: String,
    #[schema(nullable = true)]
    pub department: Option<String>,
}

/// Manager landing page: team size, today's roll-up, weekly trend,
/// department roll-up for the month, and who is absent right now
#[utoipa::path(
    get,
    path = "/api/dashboard/manager",
    responses(
        (status = 200, description = "Aggregated team dashboard", body = Object, example = json!({
            "total_employees": 12,
            "today": { "present": 10, "absent": 2, "late": 1 },
            "weekly_trend": [],
            "department_wise": [],
            "absent_today": []
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn manager_dashboard(
    auth: AuthUser,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, ApiError> {
    auth.require_manager()?;

    let now = Local::now();
    let today = now.naive_local().date();
    let (month, year) = (now.month() as i32, now.year());

    let total_employees: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE role = 'employee' AND manager_id = $1",
    )
    .bind(auth.user_id)
    .fetch_one(pool.get_ref())
    .await?;

    // Anyone who showed up at all counts as present for the headline number
    let (present_today, absent_today_count): (i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COUNT(*) FILTER (WHERE a.status IN ('present', 'late', 'half-day')) AS present,
            COUNT(*) FILTER (WHERE a.status = 'absent' OR a.status IS NULL) AS absent
        FROM users u
        LEFT JOIN attendance a ON u.id = a.user_id AND a.date = $1
        WHERE u.role = 'employee' AND u.manager_id = $2
        "#,
    )
    .bind(today)
    .bind(auth.user_id)
    .fetch_one(pool.get_ref())
    .await?;

    let late_today: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM attendance a
        JOIN users u ON a.user_id = u.id
        WHERE a.date = $1 AND a.status = 'late' AND u.manager_id = $2
        "#,
    )
    .bind(today)
    .bind(auth.user_id)
    .fetch_one(pool.get_ref())
    .await?;

    let weekly_trend = sqlx::query_as::<_, DailyTrendRow>(
        r#"
        SELECT
            a.date,
            COUNT(*) FILTER (WHERE a.status IN ('present', 'late', 'half-day')) AS present,
            COUNT(*) FILTER (WHERE a.status = 'absent') AS absent
        FROM attendance a
        JOIN users u ON a.user_id = u.id
        WHERE a.date >= CURRENT_DATE - INTERVAL '7 days'
          AND a.date <= CURRENT_DATE
          AND u.manager_id = $1
        GROUP BY a.date
        ORDER BY a.date ASC
        "#,
    )
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await?;

    let department_wise = sqlx::query_as::<_, DepartmentRow>(
        r#"
        SELECT
            u.department,
            COUNT(DISTINCT a.user_id) AS employees,
            COUNT(*) FILTER (WHERE a.status IN ('present', 'late', 'half-day')) AS present,
            COUNT(*) FILTER (WHERE a.status = 'absent') AS absent
        FROM users u
        LEFT JOIN attendance a ON u.id = a.user_id
            AND EXTRACT(MONTH FROM a.date) = $1
            AND EXTRACT(YEAR FROM a.date) = $2
        WHERE u.role = 'employee' AND u.manager_id = $3
        GROUP BY u.department
        ORDER BY u.department
        "#,
    )
    .bind(month)
    .bind(year)
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await?;

    let absent_today = sqlx::query_as::<_, AbsentEmployeeRow>(
        r#"
        SELECT u.id, u.name, u.email, u.employee_code, u.department
        FROM users u
        LEFT JOIN attendance a ON u.id = a.user_id AND a.date = $1
        WHERE u.role = 'employee' AND u.manager_id = $2
          AND (a.status = 'absent' OR a.status IS NULL)
        ORDER BY u.name
        "#,
    )
    .bind(today)
    .bind(auth.user_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "total_employees": total_employees,
        "today": {
            "present": present_today,
            "absent": absent_today_count,
            "late": late_today,
        },
        "weekly_trend": weekly_trend,
        "department_wise": department_wise,
        "absent_today": absent_today,
    })))
}
