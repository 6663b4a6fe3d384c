use rmcp::model::CallToolResult;
use serde_json::json;
use tracing::info;

use super::{Arguments, FailedTo, Param, Registry, Tool, ToolError, WORKSPACE_PARAM, json_result};
use crate::clockify::Page;
use crate::dates::{self, Bound};
use crate::models::NewTimeEntry;

/// Page size used when enumerating members for the running-timer scan.
const SCAN_PAGE_SIZE: u32 = 500;

const USER_PARAM: Param = Param::string("user_id", "User ID (defaults to the authenticated user)");

pub(super) fn tools() -> Vec<Tool> {
    vec![
        Tool::new(
            "clockify_timer_start",
            "Start a new timer in Clockify",
            vec![
                Param::string("description", "Timer description"),
                Param::string("project_id", "Project ID"),
                Param::string("task_id", "Task ID"),
                Param::string_array("tag_ids", "Tag IDs"),
                Param::boolean("billable", "Whether the entry is billable"),
                Param::string("start", "Start time (ISO 8601, defaults to now)"),
                WORKSPACE_PARAM,
            ],
            handler!(start),
        ),
        Tool::new(
            "clockify_timer_stop",
            "Stop the currently running timer",
            vec![USER_PARAM, WORKSPACE_PARAM],
            handler!(stop),
        ),
        Tool::new(
            "clockify_timer_current",
            "Get the currently running timer for a user (defaults to the authenticated user)",
            vec![USER_PARAM, WORKSPACE_PARAM],
            handler!(current),
        ),
        Tool::new(
            "clockify_timer_all_running",
            "Get all currently running timers for every user in the workspace (requires admin API key)",
            vec![WORKSPACE_PARAM],
            handler!(all_running),
        ),
    ]
}

async fn start(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let start = match args.text("start")? {
        Some(start) => dates::normalize_timestamp(&start, Bound::Start).map_err(super::invalid)?,
        None => dates::now_utc(),
    };
    let entry = NewTimeEntry {
        start,
        end: None,
        description: args.free_text("description")?,
        project_id: args.text("project_id")?,
        task_id: args.text("task_id")?,
        tag_ids: args.text_list("tag_ids")?.unwrap_or_default(),
        billable: args.flag("billable")?.unwrap_or(false),
    };

    let started = registry
        .client()
        .start_timer(&workspace_id, entry)
        .await
        .failed_to("start timer")?;
    info!(%workspace_id, entry_id = %started.id, "timer started");
    json_result(&started)
}

async fn stop(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let user_id = registry.user_id(args.text("user_id")?).await?;
    let stopped = registry
        .client()
        .stop_timer(&workspace_id, &user_id)
        .await
        .failed_to("stop timer")?;
    json_result(&stopped)
}

async fn current(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let user_id = registry.user_id(args.text("user_id")?).await?;
    match registry
        .client()
        .running_timer(&workspace_id, &user_id)
        .await
        .failed_to("get running timer")?
    {
        Some(entry) => json_result(&entry),
        None => json_result(&json!({
            "running": false,
            "message": "No timer is currently running."
        })),
    }
}

async fn all_running(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let page = Page {
        page: 1,
        page_size: SCAN_PAGE_SIZE,
    };
    let scan = registry
        .client()
        .all_running_timers(&workspace_id, page)
        .await
        .failed_to("get running timers")?;

    let mut payload = json!({
        "running_timers": scan.running,
        "count": scan.running.len(),
    });
    if !scan.skipped_users.is_empty() {
        payload["skipped_users"] = json!(scan.skipped_users);
    }
    json_result(&payload)
}
