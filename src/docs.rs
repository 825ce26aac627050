use crate::api::attendance::{MonthQuery, MonthlySummary, TodayStatus};
use crate::api::dashboard::{AbsentEmployeeRow, DailyTrendRow, DepartmentRow};
use crate::api::manager::{
    AllAttendanceQuery, DateRangeQuery, ExportQuery, TeamAttendanceRow, TeamSummary,
    TodayRosterRow,
};
use crate::auth::handlers::ManagerRow;
use crate::model::attendance::AttendanceRecord;
use crate::model::user::UserProfile;
use crate::models::{LoginReqDto, RegisterReq};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance System API",
        version = "1.0.0",
        description = r#"
## Employee Attendance System

This API powers an **employee attendance tracker**: employees check in and out
once per day, managers see their team's attendance.

### 🔹 Key Features
- **Attendance**
  - Daily check-in / check-out with automatic status (present, late, half-day)
  - Personal history and monthly summaries
- **Team Views**
  - Filterable team attendance, per-employee drill-down, CSV export
  - Today's roll call and aggregated dashboards
- **Accounts**
  - Employee/manager registration with manager assignment
  - JWT access + refresh tokens

### 🔐 Security
All attendance and dashboard endpoints require **JWT Bearer authentication**.
Employees only ever see their own records; managers only their direct reports.

### 📦 Response Format
- JSON-based RESTful responses; CSV for exports

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::today,
        crate::api::attendance::my_history,
        crate::api::attendance::my_summary,

        crate::api::manager::all_attendance,
        crate::api::manager::employee_attendance,
        crate::api::manager::team_summary,
        crate::api::manager::export_csv,
        crate::api::manager::today_status,

        crate::api::dashboard::employee_dashboard,
        crate::api::dashboard::manager_dashboard,
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            UserProfile,
            ManagerRow,
            AttendanceRecord,
            TodayStatus,
            MonthQuery,
            MonthlySummary,
            TeamAttendanceRow,
            AllAttendanceQuery,
            DateRangeQuery,
            ExportQuery,
            TeamSummary,
            TodayRosterRow,
            DailyTrendRow,
            DepartmentRow,
            AbsentEmployeeRow
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Employee check-in/out and personal views"),
        (name = "Team", description = "Manager views over direct reports"),
        (name = "Dashboard", description = "Aggregated landing-page data"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
