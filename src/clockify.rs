use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::dates;
use crate::models::{
    BillingClient, DetailedReport, DetailedReportRequest, NamedUpdate, NewNamed, NewProject,
    NewTask, NewTimeEntry, Project, ProjectUpdate, StopTimer, SummaryReport, SummaryReportRequest,
    Tag, Task, TaskUpdate, TimeEntry, TimeEntryUpdate, User, Workspace,
};

pub const DEFAULT_API_URL: &str = "https://api.clockify.me/api/v1";
pub const DEFAULT_REPORTS_URL: &str = "https://reports.api.clockify.me/v1";

const API_KEY_HEADER: &str = "X-Api-Key";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ClockifyError {
    #[error("marshal request body: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("create request: {0}")]
    Request(String),
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("clockify rate limit exceeded, try again later")]
    RateLimited,
    #[error("clockify API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("unmarshal response: {0}")]
    Decode(#[source] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub api: String,
    pub reports: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api: DEFAULT_API_URL.to_string(),
            reports: DEFAULT_REPORTS_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Host {
    Api,
    Reports,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 50,
        }
    }
}

impl Page {
    fn push_query(&self, query: &mut Vec<(&'static str, String)>) {
        query.push(("page", self.page.to_string()));
        query.push(("page-size", self.page_size.to_string()));
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeEntryFilter {
    pub start: Option<String>,
    pub end: Option<String>,
    pub project_id: Option<String>,
    pub description: Option<String>,
    pub in_progress: bool,
    pub page: Option<Page>,
}

impl TimeEntryFilter {
    fn in_progress() -> Self {
        Self {
            in_progress: true,
            ..Self::default()
        }
    }

    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(start) = &self.start {
            query.push(("start", start.clone()));
        }
        if let Some(end) = &self.end {
            query.push(("end", end.clone()));
        }
        if let Some(project_id) = &self.project_id {
            query.push(("project", project_id.clone()));
        }
        if let Some(description) = &self.description {
            query.push(("description", description.clone()));
        }
        if self.in_progress {
            query.push(("in-progress", "true".to_string()));
        }
        if let Some(page) = &self.page {
            page.push_query(&mut query);
        }
        query
    }
}

/// Outcome of probing every workspace member for a running timer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunningScan {
    pub running: Vec<TimeEntry>,
    pub skipped_users: Vec<String>,
}

#[derive(Clone)]
pub struct ClockifyClient {
    client: Client,
    api_key: String,
    endpoints: Endpoints,
}

impl std::fmt::Debug for ClockifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockifyClient")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl ClockifyClient {
    pub fn new(api_key: String, endpoints: Endpoints) -> Result<Self, ClockifyError> {
        let client = Client::builder()
            .user_agent(concat!("clockify-mcp/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| ClockifyError::Request(err.to_string()))?;
        Ok(Self {
            client,
            api_key,
            endpoints,
        })
    }

    // Workspaces and users

    pub async fn workspaces(&self) -> Result<Vec<Workspace>, ClockifyError> {
        self.get(&["workspaces"], &[]).await
    }

    pub async fn current_user(&self) -> Result<User, ClockifyError> {
        self.get(&["user"], &[]).await
    }

    pub async fn workspace_users(
        &self,
        workspace_id: &str,
        page: Page,
    ) -> Result<Vec<User>, ClockifyError> {
        let mut query = Vec::new();
        page.push_query(&mut query);
        self.get(&["workspaces", workspace_id, "users"], &query).await
    }

    // Projects

    pub async fn projects(
        &self,
        workspace_id: &str,
        archived: Option<bool>,
        page: Page,
    ) -> Result<Vec<Project>, ClockifyError> {
        let mut query = Vec::new();
        if let Some(archived) = archived {
            query.push(("archived", archived.to_string()));
        }
        page.push_query(&mut query);
        self.get(&["workspaces", workspace_id, "projects"], &query).await
    }

    pub async fn create_project(
        &self,
        workspace_id: &str,
        project: &NewProject,
    ) -> Result<Project, ClockifyError> {
        self.send(Method::POST, &["workspaces", workspace_id, "projects"], project).await
    }

    pub async fn update_project(
        &self,
        workspace_id: &str,
        project_id: &str,
        update: &ProjectUpdate,
    ) -> Result<Project, ClockifyError> {
        self.send(
            Method::PUT,
            &["workspaces", workspace_id, "projects", project_id],
            update,
        )
        .await
    }

    pub async fn delete_project(
        &self,
        workspace_id: &str,
        project_id: &str,
    ) -> Result<(), ClockifyError> {
        self.delete(&["workspaces", workspace_id, "projects", project_id]).await
    }

    // Tasks

    pub async fn tasks(
        &self,
        workspace_id: &str,
        project_id: &str,
        page: Page,
    ) -> Result<Vec<Task>, ClockifyError> {
        let mut query = Vec::new();
        page.push_query(&mut query);
        self.get(
            &["workspaces", workspace_id, "projects", project_id, "tasks"],
            &query,
        )
        .await
    }

    pub async fn create_task(
        &self,
        workspace_id: &str,
        project_id: &str,
        task: &NewTask,
    ) -> Result<Task, ClockifyError> {
        self.send(
            Method::POST,
            &["workspaces", workspace_id, "projects", project_id, "tasks"],
            task,
        )
        .await
    }

    pub async fn update_task(
        &self,
        workspace_id: &str,
        project_id: &str,
        task_id: &str,
        update: &TaskUpdate,
    ) -> Result<Task, ClockifyError> {
        self.send(
            Method::PUT,
            &["workspaces", workspace_id, "projects", project_id, "tasks", task_id],
            update,
        )
        .await
    }

    pub async fn delete_task(
        &self,
        workspace_id: &str,
        project_id: &str,
        task_id: &str,
    ) -> Result<(), ClockifyError> {
        self.delete(&["workspaces", workspace_id, "projects", project_id, "tasks", task_id]).await
    }

    // Tags

    pub async fn tags(&self, workspace_id: &str) -> Result<Vec<Tag>, ClockifyError> {
        self.get(&["workspaces", workspace_id, "tags"], &[]).await
    }

    pub async fn create_tag(
        &self,
        workspace_id: &str,
        tag: &NewNamed,
    ) -> Result<Tag, ClockifyError> {
        self.send(Method::POST, &["workspaces", workspace_id, "tags"], tag).await
    }

    pub async fn update_tag(
        &self,
        workspace_id: &str,
        tag_id: &str,
        update: &NamedUpdate,
    ) -> Result<Tag, ClockifyError> {
        self.send(Method::PUT, &["workspaces", workspace_id, "tags", tag_id], update).await
    }

    pub async fn delete_tag(&self, workspace_id: &str, tag_id: &str) -> Result<(), ClockifyError> {
        self.delete(&["workspaces", workspace_id, "tags", tag_id]).await
    }

    // Billing clients

    pub async fn clients(
        &self,
        workspace_id: &str,
        page: Page,
    ) -> Result<Vec<BillingClient>, ClockifyError> {
        let mut query = Vec::new();
        page.push_query(&mut query);
        self.get(&["workspaces", workspace_id, "clients"], &query).await
    }

    pub async fn create_client(
        &self,
        workspace_id: &str,
        client: &NewNamed,
    ) -> Result<BillingClient, ClockifyError> {
        self.send(Method::POST, &["workspaces", workspace_id, "clients"], client).await
    }

    pub async fn update_client(
        &self,
        workspace_id: &str,
        client_id: &str,
        update: &NamedUpdate,
    ) -> Result<BillingClient, ClockifyError> {
        self.send(
            Method::PUT,
            &["workspaces", workspace_id, "clients", client_id],
            update,
        )
        .await
    }

    pub async fn delete_client(
        &self,
        workspace_id: &str,
        client_id: &str,
    ) -> Result<(), ClockifyError> {
        self.delete(&["workspaces", workspace_id, "clients", client_id]).await
    }

    // Time entries

    pub async fn time_entries(
        &self,
        workspace_id: &str,
        user_id: &str,
        filter: &TimeEntryFilter,
    ) -> Result<Vec<TimeEntry>, ClockifyError> {
        self.get(
            &["workspaces", workspace_id, "user", user_id, "time-entries"],
            &filter.to_query(),
        )
        .await
    }

    pub async fn create_time_entry(
        &self,
        workspace_id: &str,
        entry: &NewTimeEntry,
    ) -> Result<TimeEntry, ClockifyError> {
        self.send(Method::POST, &["workspaces", workspace_id, "time-entries"], entry).await
    }

    pub async fn update_time_entry(
        &self,
        workspace_id: &str,
        entry_id: &str,
        update: &TimeEntryUpdate,
    ) -> Result<TimeEntry, ClockifyError> {
        self.send(
            Method::PUT,
            &["workspaces", workspace_id, "time-entries", entry_id],
            update,
        )
        .await
    }

    pub async fn delete_time_entry(
        &self,
        workspace_id: &str,
        entry_id: &str,
    ) -> Result<(), ClockifyError> {
        self.delete(&["workspaces", workspace_id, "time-entries", entry_id]).await
    }

    // Timers

    /// A timer is a time entry created without an end.
    pub async fn start_timer(
        &self,
        workspace_id: &str,
        mut entry: NewTimeEntry,
    ) -> Result<TimeEntry, ClockifyError> {
        entry.end = None;
        self.create_time_entry(workspace_id, &entry).await
    }

    pub async fn stop_timer(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<TimeEntry, ClockifyError> {
        let body = StopTimer {
            end: dates::now_utc(),
        };
        self.send(
            Method::PATCH,
            &["workspaces", workspace_id, "user", user_id, "time-entries"],
            &body,
        )
        .await
    }

    pub async fn running_timer(
        &self,
        workspace_id: &str,
        user_id: &str,
    ) -> Result<Option<TimeEntry>, ClockifyError> {
        let entries = self
            .time_entries(workspace_id, user_id, &TimeEntryFilter::in_progress())
            .await?;
        Ok(entries.into_iter().find(TimeEntry::is_running))
    }

    /// Checks each listed member in turn. A failed lookup is recorded and
    /// skipped; hitting the rate limit aborts the scan.
    pub async fn all_running_timers(
        &self,
        workspace_id: &str,
        page: Page,
    ) -> Result<RunningScan, ClockifyError> {
        let users = self.workspace_users(workspace_id, page).await?;
        let mut scan = RunningScan::default();
        for user in users {
            match self.running_timer(workspace_id, &user.id).await {
                Ok(Some(entry)) => scan.running.push(entry),
                Ok(None) => {}
                Err(ClockifyError::RateLimited) => return Err(ClockifyError::RateLimited),
                Err(err) => {
                    warn!(user_id = %user.id, error = %err, "running timer lookup failed");
                    scan.skipped_users.push(user.id);
                }
            }
        }
        Ok(scan)
    }

    // Reports

    pub async fn summary_report(
        &self,
        workspace_id: &str,
        request: &SummaryReportRequest,
    ) -> Result<SummaryReport, ClockifyError> {
        self.call(
            Host::Reports,
            Method::POST,
            &["workspaces", workspace_id, "reports", "summary"],
            &[],
            Some(request),
        )
        .await
    }

    pub async fn detailed_report(
        &self,
        workspace_id: &str,
        request: &DetailedReportRequest,
    ) -> Result<DetailedReport, ClockifyError> {
        self.call(
            Host::Reports,
            Method::POST,
            &["workspaces", workspace_id, "reports", "detailed"],
            &[],
            Some(request),
        )
        .await
    }

    async fn get<T: DeserializeOwned + Default>(
        &self,
        path: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, ClockifyError> {
        self.call::<(), T>(Host::Api, Method::GET, path, query, None).await
    }

    async fn send<B: Serialize + ?Sized, T: DeserializeOwned + Default>(
        &self,
        method: Method,
        path: &[&str],
        body: &B,
    ) -> Result<T, ClockifyError> {
        self.call(Host::Api, method, path, &[], Some(body)).await
    }

    async fn delete(&self, path: &[&str]) -> Result<(), ClockifyError> {
        self.execute::<()>(Host::Api, Method::DELETE, path, &[], None).await
            .map(|_| ())
    }

    /// An empty success body decodes to `T::default()`.
    async fn call<B: Serialize + ?Sized, T: DeserializeOwned + Default>(
        &self,
        host: Host,
        method: Method,
        path: &[&str],
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T, ClockifyError> {
        let bytes = self.execute(host, method, path, query, body).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }
        serde_json::from_slice(&bytes).map_err(ClockifyError::Decode)
    }

    async fn execute<B: Serialize + ?Sized>(
        &self,
        host: Host,
        method: Method,
        path: &[&str],
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Vec<u8>, ClockifyError> {
        let payload = body
            .map(|value| serde_json::to_vec(value))
            .transpose()
            .map_err(ClockifyError::Serialize)?;
        let url = self.url(host, path, query)?;

        let mut builder = self
            .client
            .request(method.clone(), url.clone())
            .header(API_KEY_HEADER, &self.api_key)
            .header(CONTENT_TYPE, "application/json");
        if let Some(payload) = payload {
            builder = builder.body(payload);
        }
        let request = builder
            .build()
            .map_err(|err| ClockifyError::Request(err.to_string()))?;

        let response = self
            .client
            .execute(request)
            .await
            .map_err(ClockifyError::Transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(ClockifyError::Transport)?;
        debug!(%method, path = url.path(), status = status.as_u16(), "clockify response");

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(%method, path = url.path(), "clockify rate limit hit");
            return Err(ClockifyError::RateLimited);
        }

        if !status.is_success() {
            return Err(ClockifyError::Api {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        Ok(bytes.to_vec())
    }

    /// Each path segment is percent-encoded on its own, so an ID can never
    /// add, drop or climb path segments.
    fn url(
        &self,
        host: Host,
        path: &[&str],
        query: &[(&str, String)],
    ) -> Result<Url, ClockifyError> {
        if let Some(segment) = path.iter().find(|segment| matches!(**segment, "" | "." | "..")) {
            return Err(ClockifyError::Request(format!("invalid path segment {segment:?}")));
        }

        let base = match host {
            Host::Api => &self.endpoints.api,
            Host::Reports => &self.endpoints.reports,
        };
        let mut url = Url::parse(base).map_err(|err| ClockifyError::Request(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| ClockifyError::Request(format!("{base} cannot be a base URL")))?
            .pop_if_empty()
            .extend(path);
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(key, value)| (*key, value.as_str())));
        }
        Ok(url)
    }
}
