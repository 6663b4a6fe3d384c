use rmcp::model::CallToolResult;
use serde_json::json;

use super::{
    Arguments, FailedTo, PAGE_PARAM, Param, Registry, Tool, ToolError, WORKSPACE_PARAM, deleted,
    invalid, json_result,
};
use crate::clockify::TimeEntryFilter;
use crate::dates::{self, Bound, DateRange};
use crate::models::{NewTimeEntry, TimeEntryUpdate};

pub(super) fn tools() -> Vec<Tool> {
    vec![
        Tool::new(
            "clockify_time_entry_list",
            "List time entries for a user (paginated, default page 1, page_size 50)",
            vec![
                Param::string("user_id", "User ID (defaults to the authenticated user)"),
                Param::string("start", "Start date filter (ISO 8601, e.g. 2024-01-01T00:00:00Z)"),
                Param::string("end", "End date filter (ISO 8601)"),
                Param::string("project_id", "Filter by project ID"),
                Param::string("description", "Filter by description text"),
                PAGE_PARAM,
                Param::number("page_size", "Number of entries per page (default 50)"),
                WORKSPACE_PARAM,
            ],
            handler!(list),
        ),
        Tool::new(
            "clockify_time_entry_create",
            "Create a manual time entry",
            vec![
                Param::string("start", "Start time (ISO 8601)").required(),
                Param::string("end", "End time (ISO 8601)").required(),
                Param::string("description", "Entry description"),
                Param::string("project_id", "Project ID"),
                Param::string("task_id", "Task ID"),
                Param::string_array("tag_ids", "Tag IDs"),
                Param::boolean("billable", "Whether the entry is billable"),
                WORKSPACE_PARAM,
            ],
            handler!(create),
        ),
        Tool::new(
            "clockify_time_entry_update",
            "Update an existing time entry",
            vec![
                Param::string("entry_id", "Time entry ID to update").required(),
                Param::string("start", "Start time (ISO 8601)").required(),
                Param::string("end", "End time (ISO 8601)"),
                Param::string("description", "Entry description"),
                Param::string("project_id", "Project ID"),
                Param::string("task_id", "Task ID"),
                Param::string_array("tag_ids", "Tag IDs"),
                Param::boolean("billable", "Whether the entry is billable"),
                WORKSPACE_PARAM,
            ],
            handler!(update),
        ),
        Tool::new(
            "clockify_time_entry_delete",
            "Delete a time entry",
            vec![
                Param::string("entry_id", "Time entry ID to delete").required(),
                WORKSPACE_PARAM,
            ],
            handler!(delete),
        ),
    ]
}

fn timestamp(args: &Arguments, key: &str, bound: Bound) -> Result<Option<String>, ToolError> {
    args.text(key)?
        .map(|value| {
            dates::normalize_timestamp(&value, bound)
                .map_err(|err| invalid(format!("{key}: {err}")))
        })
        .transpose()
}

async fn list(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let filter = TimeEntryFilter {
        start: timestamp(args, "start", Bound::Start)?,
        end: timestamp(args, "end", Bound::End)?,
        project_id: args.text("project_id")?,
        description: args.free_text("description")?,
        in_progress: false,
        page: Some(args.page()?),
    };
    let user_id = registry.user_id(args.text("user_id")?).await?;

    let entries = registry
        .client()
        .time_entries(&workspace_id, &user_id, &filter)
        .await
        .failed_to("list time entries")?;
    json_result(&json!({ "entries": entries }))
}

async fn create(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let range = DateRange::from_inputs(&args.require_text("start")?, &args.require_text("end")?)
        .map_err(invalid)?;
    let entry = NewTimeEntry {
        start: range.start().to_string(),
        end: Some(range.end().to_string()),
        description: args.free_text("description")?,
        project_id: args.text("project_id")?,
        task_id: args.text("task_id")?,
        tag_ids: args.text_list("tag_ids")?.unwrap_or_default(),
        billable: args.flag("billable")?.unwrap_or(false),
    };

    let created = registry
        .client()
        .create_time_entry(&workspace_id, &entry)
        .await
        .failed_to("create time entry")?;
    json_result(&created)
}

async fn update(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let entry_id = args.require_text("entry_id")?;
    let start = args.require_text("start")?;
    let (start, end) = match args.text("end")? {
        Some(end) => {
            let range = DateRange::from_inputs(&start, &end).map_err(invalid)?;
            (range.start().to_string(), Some(range.end().to_string()))
        }
        None => (
            dates::normalize_timestamp(&start, Bound::Start)
                .map_err(|err| invalid(format!("start: {err}")))?,
            None,
        ),
    };
    let update = TimeEntryUpdate {
        start,
        end,
        description: args.free_text("description")?,
        project_id: args.text("project_id")?,
        task_id: args.text("task_id")?,
        tag_ids: args.text_list("tag_ids")?,
        billable: args.flag("billable")?,
    };

    let updated = registry
        .client()
        .update_time_entry(&workspace_id, &entry_id, &update)
        .await
        .failed_to("update time entry")?;
    json_result(&updated)
}

async fn delete(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let entry_id = args.require_text("entry_id")?;
    registry
        .client()
        .delete_time_entry(&workspace_id, &entry_id)
        .await
        .failed_to("delete time entry")?;
    deleted("Time entry", &entry_id)
}
