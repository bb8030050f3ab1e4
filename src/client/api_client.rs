use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;

use super::{ClientError, InFlight, Session};
use crate::api::client::{CreateClient, UpdateClient};
use crate::api::dashboard::DashboardSummary;
use crate::api::employee::{CreateEmployee, EmployeeListResponse, EmployeeQuery, UpdateEmployee};
use crate::api::time_off::{CreateTimeOff, TimeOffFilter, TimeOffResponse, UpdateTimeOff};
use crate::api::timesheet::{
    CreateTimesheet, DecisionRequest, TimesheetFilter, TimesheetResponse, UpdateTimesheet,
};
use crate::model::client::Client as ClientRecord;
use crate::model::employee::Employee;
use crate::model::role::Role;
use crate::models::{LoginRequest, RefreshRequest, SignupRequest, TokenResponse};
use crate::timekeeping::lifecycle::action_for_target;
use crate::timekeeping::validation::{
    require_text, validate_date_range, validate_entry_for_week, validate_role_client,
    validate_week_start,
};
use crate::timekeeping::{
    GateError, NewTimeEntry, Owner, TimeOffAction, TimeOffStatus, TimesheetAction, WeekSummary,
    authorize_time_off, authorize_timesheet,
};

/// Hours of a fetched timesheet, computed with the same engine the server uses.
pub fn week_view(timesheet: &TimesheetResponse) -> WeekSummary {
    WeekSummary::build(timesheet.week_start, &timesheet.time_entries)
}

fn timesheet_owner(ts: &TimesheetResponse) -> Owner {
    Owner {
        employee_id: ts.employee_id,
        client_id: ts.client_id,
    }
}

fn time_off_owner(req: &TimeOffResponse) -> Owner {
    Owner {
        employee_id: req.employee_id,
        client_id: req.client_id,
    }
}

fn forbidden(action: &str, subject: &'static str) -> ClientError {
    GateError::Forbidden {
        action: action.to_string(),
        subject,
    }
    .into()
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Option<Session>,
    in_flight: InFlight,
}

impl ApiClient {
    /// `base_url` includes the API prefix, e.g. `http://localhost:8080/api/v1`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            base_url,
            session: None,
            in_flight: InFlight::default(),
        }
    }

    pub fn with_session(base_url: impl Into<String>, session: Session) -> Self {
        let mut client = Self::new(base_url);
        client.session = Some(session);
        client
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn require_session(&self) -> Result<&Session, ClientError> {
        self.session.as_ref().ok_or(ClientError::NotAuthenticated)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{}", self.base_url, path))
    }

    fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let session = self.require_session()?;
        Ok(self.request(method, path).bearer_auth(&session.access_token))
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::from_response(resp).await);
        }
        Ok(resp.json::<T>().await?)
    }

    /// Sends a mutation and discards the body; callers refetch afterwards.
    async fn send_discarding(request: RequestBuilder) -> Result<(), ClientError> {
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(ClientError::from_response(resp).await);
        }
        Ok(())
    }

    /* =========================
    Session
    ========================= */

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<&Session, ClientError> {
        require_text(email, "email")?;
        require_text(password, "password")?;

        let body = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let tokens: TokenResponse =
            Self::send(self.request(Method::POST, "/auth/login").json(&body)).await?;

        log::info!("Signed in as {}", tokens.email);
        Ok(&*self.session.insert(Session::from_tokens(tokens)))
    }

    pub async fn sign_up(&mut self, payload: &SignupRequest) -> Result<&Session, ClientError> {
        require_text(&payload.email, "email")?;
        require_text(&payload.full_name, "full_name")?;
        validate_role_client(payload.role, payload.client_id)?;

        let tokens: TokenResponse =
            Self::send(self.request(Method::POST, "/auth/signup").json(payload)).await?;
        Ok(&*self.session.insert(Session::from_tokens(tokens)))
    }

    /// Restores a session from a stored access token.
    pub async fn resume(&mut self, access_token: &str) -> Result<&Session, ClientError> {
        let profile: Employee = Self::send(
            self.request(Method::GET, "/auth/me")
                .bearer_auth(access_token),
        )
        .await?;
        Ok(&*self
            .session
            .insert(Session::from_profile(access_token.to_string(), profile)))
    }

    /// Swaps the refresh token for a new token pair.
    pub async fn refresh(&mut self) -> Result<&Session, ClientError> {
        let refresh_token = self
            .require_session()?
            .refresh_token
            .clone()
            .ok_or(ClientError::NotAuthenticated)?;

        let tokens: TokenResponse = Self::send(
            self.request(Method::POST, "/auth/refresh")
                .json(&RefreshRequest { refresh_token }),
        )
        .await?;
        Ok(&*self.session.insert(Session::from_tokens(tokens)))
    }

    /// Drops the session. The server-side revoke is best effort.
    pub async fn sign_out(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if let Some(refresh_token) = session.refresh_token {
            let request = self
                .request(Method::POST, "/auth/logout")
                .json(&RefreshRequest { refresh_token });
            if let Err(e) = Self::send_discarding(request).await {
                log::warn!("Logout request failed: {}", e);
            }
        }
    }

    pub async fn me(&self) -> Result<Employee, ClientError> {
        Self::send(self.authed(Method::GET, "/auth/me")?).await
    }

    /* =========================
    Timesheets
    ========================= */

    pub async fn list_timesheets(
        &self,
        filter: &TimesheetFilter,
    ) -> Result<Vec<TimesheetResponse>, ClientError> {
        Self::send(self.authed(Method::GET, "/timesheets")?.query(filter)).await
    }

    pub async fn get_timesheet(&self, timesheet_id: u64) -> Result<TimesheetResponse, ClientError> {
        Self::send(self.authed(Method::GET, &format!("/timesheets/{}", timesheet_id))?).await
    }

    pub async fn create_timesheet(
        &self,
        payload: &CreateTimesheet,
    ) -> Result<TimesheetResponse, ClientError> {
        if self.require_session()?.role != Role::Consultant {
            return Err(forbidden("create", "timesheet"));
        }
        validate_week_start(payload.week_start)?;
        require_text(&payload.manager_email, "manager_email")?;

        let _ticket = self
            .in_flight
            .begin(format!("timesheet:create:{}", payload.week_start))?;
        let created: TimesheetResponse =
            Self::send(self.authed(Method::POST, "/timesheets")?.json(payload)).await?;
        self.get_timesheet(created.id).await
    }

    fn gate_timesheet(
        &self,
        ts: &TimesheetResponse,
        action: TimesheetAction,
    ) -> Result<(), ClientError> {
        let actor = self.require_session()?.actor();
        authorize_timesheet(action, ts.status, &actor, &timesheet_owner(ts))?;
        Ok(())
    }

    async fn mutate_timesheet(
        &self,
        ts: &TimesheetResponse,
        action: TimesheetAction,
        request: RequestBuilder,
    ) -> Result<TimesheetResponse, ClientError> {
        let _ticket = self
            .in_flight
            .begin(format!("timesheet:{}:{:?}", ts.id, action))?;
        Self::send_discarding(request).await?;
        self.get_timesheet(ts.id).await
    }

    pub async fn add_entry(
        &self,
        ts: &TimesheetResponse,
        entry: &NewTimeEntry,
    ) -> Result<TimesheetResponse, ClientError> {
        self.gate_timesheet(ts, TimesheetAction::AddEntry)?;
        validate_entry_for_week(entry, ts.week_start)?;

        let request = self
            .authed(Method::POST, &format!("/timesheets/{}/entries", ts.id))?
            .json(entry);
        self.mutate_timesheet(ts, TimesheetAction::AddEntry, request).await
    }

    pub async fn delete_entry(
        &self,
        ts: &TimesheetResponse,
        entry_id: u64,
    ) -> Result<TimesheetResponse, ClientError> {
        self.gate_timesheet(ts, TimesheetAction::DeleteEntry)?;

        let request =
            self.authed(Method::DELETE, &format!("/timesheets/{}/entries/{}", ts.id, entry_id))?;
        self.mutate_timesheet(ts, TimesheetAction::DeleteEntry, request).await
    }

    /// Metadata edit, or a status change when `payload.status` is set.
    pub async fn update_timesheet(
        &self,
        ts: &TimesheetResponse,
        payload: &UpdateTimesheet,
    ) -> Result<TimesheetResponse, ClientError> {
        let action = payload
            .status
            .and_then(action_for_target)
            .unwrap_or(TimesheetAction::Edit);
        self.gate_timesheet(ts, action)?;
        if let Some(email) = &payload.manager_email {
            require_text(email, "manager_email")?;
        }

        let request = self
            .authed(Method::PUT, &format!("/timesheets/{}", ts.id))?
            .json(payload);
        self.mutate_timesheet(ts, action, request).await
    }

    pub async fn delete_timesheet(&self, ts: &TimesheetResponse) -> Result<(), ClientError> {
        self.gate_timesheet(ts, TimesheetAction::Delete)?;

        let _ticket = self.in_flight.begin(format!("timesheet:{}:Delete", ts.id))?;
        Self::send_discarding(self.authed(Method::DELETE, &format!("/timesheets/{}", ts.id))?).await
    }

    pub async fn submit_timesheet(
        &self,
        ts: &TimesheetResponse,
    ) -> Result<TimesheetResponse, ClientError> {
        self.gate_timesheet(ts, TimesheetAction::Submit)?;

        let request = self.authed(Method::POST, &format!("/timesheets/{}/submit", ts.id))?;
        self.mutate_timesheet(ts, TimesheetAction::Submit, request).await
    }

    pub async fn approve_timesheet(
        &self,
        ts: &TimesheetResponse,
    ) -> Result<TimesheetResponse, ClientError> {
        self.gate_timesheet(ts, TimesheetAction::Approve)?;

        let request = self.authed(Method::POST, &format!("/timesheets/{}/approve", ts.id))?;
        self.mutate_timesheet(ts, TimesheetAction::Approve, request).await
    }

    pub async fn reject_timesheet(
        &self,
        ts: &TimesheetResponse,
        reason: Option<String>,
    ) -> Result<TimesheetResponse, ClientError> {
        self.gate_timesheet(ts, TimesheetAction::Reject)?;

        let request = self
            .authed(Method::POST, &format!("/timesheets/{}/reject", ts.id))?
            .json(&DecisionRequest { reason });
        self.mutate_timesheet(ts, TimesheetAction::Reject, request).await
    }

    /* =========================
    Time off
    ========================= */

    pub async fn list_time_off(
        &self,
        filter: &TimeOffFilter,
    ) -> Result<Vec<TimeOffResponse>, ClientError> {
        Self::send(self.authed(Method::GET, "/time_off")?.query(filter)).await
    }

    pub async fn get_time_off(&self, request_id: u64) -> Result<TimeOffResponse, ClientError> {
        Self::send(self.authed(Method::GET, &format!("/time_off/{}", request_id))?).await
    }

    pub async fn create_time_off(
        &self,
        payload: &CreateTimeOff,
    ) -> Result<TimeOffResponse, ClientError> {
        if self.require_session()?.role != Role::Consultant {
            return Err(forbidden("create", "time off request"));
        }
        validate_date_range(payload.start_date, payload.end_date)?;
        require_text(&payload.manager_email, "manager_email")?;

        let _ticket = self.in_flight.begin(format!(
            "time_off:create:{}:{}",
            payload.start_date, payload.end_date
        ))?;
        let created: TimeOffResponse =
            Self::send(self.authed(Method::POST, "/time_off")?.json(payload)).await?;
        self.get_time_off(created.id).await
    }

    fn gate_time_off(&self, req: &TimeOffResponse, action: TimeOffAction) -> Result<(), ClientError> {
        let actor = self.require_session()?.actor();
        authorize_time_off(action, req.status, &actor, &time_off_owner(req))?;
        Ok(())
    }

    async fn mutate_time_off(
        &self,
        req: &TimeOffResponse,
        action: TimeOffAction,
        request: RequestBuilder,
    ) -> Result<TimeOffResponse, ClientError> {
        let _ticket = self
            .in_flight
            .begin(format!("time_off:{}:{:?}", req.id, action))?;
        Self::send_discarding(request).await?;
        self.get_time_off(req.id).await
    }

    /// Owner edit while pending, or a decision when `payload.status` is set.
    pub async fn update_time_off(
        &self,
        req: &TimeOffResponse,
        payload: &UpdateTimeOff,
    ) -> Result<TimeOffResponse, ClientError> {
        let action = match payload.status {
            Some(TimeOffStatus::Approved) => TimeOffAction::Approve,
            Some(TimeOffStatus::Rejected) => TimeOffAction::Reject,
            _ => TimeOffAction::Update,
        };
        self.gate_time_off(req, action)?;
        if action == TimeOffAction::Update {
            validate_date_range(
                payload.start_date.unwrap_or(req.start_date),
                payload.end_date.unwrap_or(req.end_date),
            )?;
        }

        let request = self
            .authed(Method::PUT, &format!("/time_off/{}", req.id))?
            .json(payload);
        self.mutate_time_off(req, action, request).await
    }

    pub async fn delete_time_off(&self, req: &TimeOffResponse) -> Result<(), ClientError> {
        self.gate_time_off(req, TimeOffAction::Delete)?;

        let _ticket = self.in_flight.begin(format!("time_off:{}:Delete", req.id))?;
        Self::send_discarding(self.authed(Method::DELETE, &format!("/time_off/{}", req.id))?).await
    }

    pub async fn approve_time_off(
        &self,
        req: &TimeOffResponse,
        comment: Option<String>,
    ) -> Result<TimeOffResponse, ClientError> {
        self.gate_time_off(req, TimeOffAction::Approve)?;

        let request = self
            .authed(Method::POST, &format!("/time_off/{}/approve", req.id))?
            .json(&DecisionRequest { reason: comment });
        self.mutate_time_off(req, TimeOffAction::Approve, request).await
    }

    pub async fn reject_time_off(
        &self,
        req: &TimeOffResponse,
        comment: Option<String>,
    ) -> Result<TimeOffResponse, ClientError> {
        self.gate_time_off(req, TimeOffAction::Reject)?;

        let request = self
            .authed(Method::POST, &format!("/time_off/{}/reject", req.id))?
            .json(&DecisionRequest { reason: comment });
        self.mutate_time_off(req, TimeOffAction::Reject, request).await
    }

    /* =========================
    Employees
    ========================= */

    pub async fn list_employees(
        &self,
        query: &EmployeeQuery,
    ) -> Result<EmployeeListResponse, ClientError> {
        if !self.require_session()?.role.is_manager_or_admin() {
            return Err(forbidden("list", "employee"));
        }
        Self::send(self.authed(Method::GET, "/employees")?.query(query)).await
    }

    pub async fn get_employee(&self, employee_id: u64) -> Result<Employee, ClientError> {
        Self::send(self.authed(Method::GET, &format!("/employees/{}", employee_id))?).await
    }

    pub async fn create_employee(&self, payload: &CreateEmployee) -> Result<Employee, ClientError> {
        if !self.require_session()?.role.is_manager_or_admin() {
            return Err(forbidden("create", "employee"));
        }
        require_text(&payload.full_name, "full_name")?;
        require_text(&payload.email, "email")?;
        validate_role_client(payload.role, payload.client_id)?;

        let _ticket = self
            .in_flight
            .begin(format!("employee:create:{}", payload.email.trim().to_lowercase()))?;
        let created: Employee =
            Self::send(self.authed(Method::POST, "/employees")?.json(payload)).await?;
        self.get_employee(created.id).await
    }

    pub async fn update_employee(
        &self,
        employee_id: u64,
        payload: &UpdateEmployee,
    ) -> Result<Employee, ClientError> {
        if !self.require_session()?.role.is_manager_or_admin() {
            return Err(forbidden("update", "employee"));
        }
        if let Some(name) = &payload.full_name {
            require_text(name, "full_name")?;
        }

        let _ticket = self.in_flight.begin(format!("employee:{}:update", employee_id))?;
        Self::send_discarding(
            self.authed(Method::PUT, &format!("/employees/{}", employee_id))?
                .json(payload),
        )
        .await?;
        self.get_employee(employee_id).await
    }

    pub async fn delete_employee(&self, employee_id: u64) -> Result<(), ClientError> {
        if !self.require_session()?.role.is_manager_or_admin() {
            return Err(forbidden("delete", "employee"));
        }

        let _ticket = self.in_flight.begin(format!("employee:{}:delete", employee_id))?;
        Self::send_discarding(self.authed(Method::DELETE, &format!("/employees/{}", employee_id))?)
            .await
    }

    /* =========================
    Clients
    ========================= */

    pub async fn list_clients(&self) -> Result<Vec<ClientRecord>, ClientError> {
        Self::send(self.authed(Method::GET, "/clients")?).await
    }

    pub async fn get_client(&self, client_id: u64) -> Result<ClientRecord, ClientError> {
        Self::send(self.authed(Method::GET, &format!("/clients/{}", client_id))?).await
    }

    fn require_admin(&self, action: &str) -> Result<(), ClientError> {
        if self.require_session()?.role.is_admin() {
            Ok(())
        } else {
            Err(forbidden(action, "client"))
        }
    }

    pub async fn create_client(&self, payload: &CreateClient) -> Result<ClientRecord, ClientError> {
        self.require_admin("create")?;
        require_text(&payload.name, "name")?;
        require_text(&payload.code, "code")?;

        let _ticket = self
            .in_flight
            .begin(format!("client:create:{}", payload.code.trim()))?;
        let created: ClientRecord =
            Self::send(self.authed(Method::POST, "/clients")?.json(payload)).await?;
        self.get_client(created.id).await
    }

    pub async fn update_client(
        &self,
        client_id: u64,
        payload: &UpdateClient,
    ) -> Result<ClientRecord, ClientError> {
        self.require_admin("update")?;

        let _ticket = self.in_flight.begin(format!("client:{}:update", client_id))?;
        Self::send_discarding(
            self.authed(Method::PUT, &format!("/clients/{}", client_id))?
                .json(payload),
        )
        .await?;
        self.get_client(client_id).await
    }

    pub async fn delete_client(&self, client_id: u64) -> Result<(), ClientError> {
        self.require_admin("delete")?;

        let _ticket = self.in_flight.begin(format!("client:{}:delete", client_id))?;
        Self::send_discarding(self.authed(Method::DELETE, &format!("/clients/{}", client_id))?)
            .await
    }

    /* =========================
    Dashboard
    ========================= */

    pub async fn dashboard_summary(&self) -> Result<DashboardSummary, ClientError> {
        Self::send(self.authed(Method::GET, "/dashboard/summary")?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timekeeping::{NewBreakPeriod, TimeEntry, TimesheetStatus, ValidationError};
    use chrono::{NaiveDate, NaiveTime, Utc};

    // Nothing listens here; every test below must fail before sending.
    const UNREACHABLE: &str = "http://127.0.0.1:9/api/v1";

    fn session(employee_id: u64, role: Role, client_id: Option<u64>) -> Session {
        Session {
            access_token: "token".into(),
            refresh_token: None,
            employee_id,
            email: format!("user{}@dewsoftware.com", employee_id),
            full_name: "Test User".into(),
            role,
            client_id,
        }
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn timesheet(status: TimesheetStatus) -> TimesheetResponse {
        let now = Utc::now();
        TimesheetResponse {
            id: 11,
            employee_id: 7,
            employee_name: "Jane Doe".into(),
            client_id: Some(1),
            week_start: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            week_end: NaiveDate::from_ymd_opt(2026, 1, 11).unwrap(),
            status,
            manager_email: "boss@client.com".into(),
            project: None,
            comment: None,
            submitted_at: None,
            approved_by: None,
            approved_at: None,
            rejected_at: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
            time_entries: vec![
                TimeEntry {
                    id: Some(1),
                    date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
                    in_time: Some(t("08:00")),
                    out_time: Some(t("19:00")),
                    breaks: vec![crate::timekeeping::BreakPeriod {
                        start_time: t("12:00"),
                        end_time: t("13:00"),
                    }],
                    project: None,
                    note: None,
                },
                TimeEntry {
                    id: Some(2),
                    date: NaiveDate::from_ymd_opt(2026, 1, 6).unwrap(),
                    in_time: Some(t("09:00")),
                    out_time: Some(t("12:00")),
                    breaks: vec![],
                    project: None,
                    note: None,
                },
            ],
            regular_hours: 0.0,
            overtime_hours: 0.0,
            total_hours: 0.0,
        }
    }

    fn new_entry(date: NaiveDate, from: &str, to: &str) -> NewTimeEntry {
        NewTimeEntry {
            date,
            in_time: Some(t(from)),
            out_time: Some(t(to)),
            breaks: vec![],
            project: None,
            note: None,
        }
    }

    #[tokio::test]
    async fn signed_out_client_short_circuits() {
        let client = ApiClient::new(UNREACHABLE);

        let err = client.list_timesheets(&TimesheetFilter::default()).await.unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));

        let err = client.dashboard_summary().await.unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));
    }

    #[tokio::test]
    async fn add_entry_on_submitted_timesheet_is_gated_locally() {
        let client = ApiClient::with_session(UNREACHABLE, session(7, Role::Consultant, Some(1)));
        let ts = timesheet(TimesheetStatus::Submitted);
        let entry = new_entry(ts.week_start, "09:00", "17:00");

        let err = client.add_entry(&ts, &entry).await.unwrap_err();
        match err {
            ClientError::Gate(GateError::InvalidStatus { status, .. }) => {
                assert_eq!(status, "submitted")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_entries_never_leave_the_client() {
        let client = ApiClient::with_session(UNREACHABLE, session(7, Role::Consultant, Some(1)));
        let ts = timesheet(TimesheetStatus::Draft);

        let backwards = new_entry(ts.week_start, "17:00", "09:00");
        assert!(matches!(
            client.add_entry(&ts, &backwards).await,
            Err(ClientError::Validation(ValidationError::OutNotAfterIn))
        ));

        let next_week = new_entry(NaiveDate::from_ymd_opt(2026, 1, 12).unwrap(), "09:00", "17:00");
        assert!(matches!(
            client.add_entry(&ts, &next_week).await,
            Err(ClientError::Validation(ValidationError::DateOutsideWeek { .. }))
        ));

        let mut half_break = new_entry(ts.week_start, "09:00", "17:00");
        half_break.breaks.push(NewBreakPeriod {
            start_time: Some(t("12:00")),
            end_time: None,
        });
        assert!(matches!(
            client.add_entry(&ts, &half_break).await,
            Err(ClientError::Validation(ValidationError::IncompleteBreak))
        ));
    }

    #[tokio::test]
    async fn only_the_owner_submits_and_only_managers_decide() {
        let ts = timesheet(TimesheetStatus::Submitted);

        let other_consultant =
            ApiClient::with_session(UNREACHABLE, session(8, Role::Consultant, Some(1)));
        let err = other_consultant.approve_timesheet(&ts).await.unwrap_err();
        assert!(matches!(err, ClientError::Gate(ref g) if g.is_forbidden()));

        let foreign_manager =
            ApiClient::with_session(UNREACHABLE, session(20, Role::ClientManager, Some(2)));
        let err = foreign_manager.reject_timesheet(&ts, None).await.unwrap_err();
        assert!(matches!(err, ClientError::Gate(ref g) if g.is_forbidden()));

        let admin = ApiClient::with_session(UNREACHABLE, session(1, Role::DewAdmin, None));
        let draft = timesheet(TimesheetStatus::Draft);
        let err = admin.submit_timesheet(&draft).await.unwrap_err();
        assert!(matches!(err, ClientError::Gate(ref g) if g.is_forbidden()));
    }

    #[tokio::test]
    async fn admin_only_client_management() {
        let manager = ApiClient::with_session(UNREACHABLE, session(20, Role::ClientManager, Some(1)));
        let payload = CreateClient {
            name: "PayPal".into(),
            code: "paypal".into(),
        };
        assert!(matches!(
            manager.create_client(&payload).await,
            Err(ClientError::Gate(_))
        ));
    }

    #[tokio::test]
    async fn inverted_time_off_range_is_rejected_locally() {
        let client = ApiClient::with_session(UNREACHABLE, session(7, Role::Consultant, Some(1)));
        let payload = CreateTimeOff {
            start_date: NaiveDate::from_ymd_opt(2026, 8, 3).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 8, 1).unwrap(),
            kind: crate::model::time_off::TimeOffType::Vacation,
            manager_email: "boss@client.com".into(),
            comment: None,
        };
        assert!(matches!(
            client.create_time_off(&payload).await,
            Err(ClientError::Validation(ValidationError::InvertedDateRange))
        ));
    }

    #[test]
    fn week_view_matches_server_figures() {
        let view = week_view(&timesheet(TimesheetStatus::Draft));

        // Monday 08:00-19:00 with an hour's break, Tuesday 09:00-12:00.
        assert_eq!(view.total_hours, 13.0);
        assert_eq!(view.regular_hours, 11.0);
        assert_eq!(view.overtime_hours, 2.0);
    }
}
