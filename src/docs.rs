use crate::api::client::{CreateClient, UpdateClient};
use crate::api::dashboard::{
    DashboardSummary, DayHours, Notification, OrgStats, PendingApprovals, TeamDayHours,
    UpcomingTimeOff,
};
use crate::api::employee::{CreateEmployee, EmployeeListResponse, UpdateEmployee};
use crate::api::time_off::{CreateTimeOff, TimeOffFilter, TimeOffResponse, UpdateTimeOff};
use crate::api::timesheet::{
    CreateTimesheet, DecisionRequest, TimesheetFilter, TimesheetResponse, UpdateTimesheet,
};
use crate::model::client::Client;
use crate::model::employee::Employee;
use crate::model::role::Role;
use crate::model::time_off::TimeOffType;
use crate::models::{LoginRequest, RefreshRequest, SignupRequest, TokenResponse};
use crate::timekeeping::entry::{BreakPeriod, NewBreakPeriod, NewTimeEntry, TimeEntry};
use crate::timekeeping::lifecycle::{TimeOffStatus, TimesheetStatus};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Timetrack API",
        version = "1.0.0",
        description = r#"
## Weekly Timesheets & Time Off

Consultants record the hours they work each week and send the week to their
client manager for sign-off.

### Key Features
- **Timesheets**
  - One sheet per consultant per week, starting on Monday
  - Daily entries with breaks, split into regular and overtime hours
  - Draft, submitted, approved and rejected states
- **Time Off**
  - Vacation, sick, personal and other requests with manager decisions
- **Employees & Clients**
  - Dew admins manage clients; managers manage their own consultants
- **Dashboard**
  - Per-role summary of the current week

### Security
Every endpoint except login, signup, refresh and logout requires a
**JWT Bearer** access token.

### Errors
Failures carry a JSON body of the form `{"detail": "..."}`.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::signup,
        crate::auth::handlers::me,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,

        crate::api::timesheet::list_timesheets,
        crate::api::timesheet::create_timesheet,
        crate::api::timesheet::get_timesheet,
        crate::api::timesheet::update_timesheet,
        crate::api::timesheet::delete_timesheet,
        crate::api::timesheet::add_entry,
        crate::api::timesheet::delete_entry,
        crate::api::timesheet::submit_timesheet,
        crate::api::timesheet::approve_timesheet,
        crate::api::timesheet::reject_timesheet,

        crate::api::time_off::list_time_off,
        crate::api::time_off::create_time_off,
        crate::api::time_off::get_time_off,
        crate::api::time_off::update_time_off,
        crate::api::time_off::delete_time_off,
        crate::api::time_off::approve_time_off,
        crate::api::time_off::reject_time_off,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::client::list_clients,
        crate::api::client::get_client,
        crate::api::client::create_client,
        crate::api::client::update_client,
        crate::api::client::delete_client,

        crate::api::dashboard::dashboard_summary
    ),
    components(
        schemas(
            LoginRequest,
            SignupRequest,
            TokenResponse,
            RefreshRequest,
            Role,
            TimesheetStatus,
            TimeOffStatus,
            TimeOffType,
            TimeEntry,
            BreakPeriod,
            NewTimeEntry,
            NewBreakPeriod,
            CreateTimesheet,
            UpdateTimesheet,
            DecisionRequest,
            TimesheetFilter,
            TimesheetResponse,
            CreateTimeOff,
            UpdateTimeOff,
            TimeOffFilter,
            TimeOffResponse,
            Employee,
            CreateEmployee,
            UpdateEmployee,
            EmployeeListResponse,
            Client,
            CreateClient,
            UpdateClient,
            DashboardSummary,
            DayHours,
            TeamDayHours,
            UpcomingTimeOff,
            PendingApprovals,
            OrgStats,
            Notification
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, signup and token refresh"),
        (name = "Timesheets", description = "Weekly timesheets and their entries"),
        (name = "Time Off", description = "Time-off requests"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Client", description = "Client management APIs"),
        (name = "Dashboard", description = "Per-role weekly summary"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_resource() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        for path in [
            "/api/v1/auth/login",
            "/api/v1/timesheets",
            "/api/v1/timesheets/{id}/submit",
            "/api/v1/time_off",
            "/api/v1/employees",
            "/api/v1/clients",
            "/api/v1/dashboard/summary",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }

        let schemes = &doc.components.as_ref().unwrap().security_schemes;
        assert!(schemes.contains_key("bearer_auth"));
    }
}
