use rmcp::model::CallToolResult;
use serde_json::json;

use super::{
    Arguments, FailedTo, PAGE_PARAM, Param, Registry, Tool, ToolError, WORKSPACE_PARAM, deleted,
    json_result,
};
use crate::models::{NewProject, ProjectUpdate};

pub(super) fn tools() -> Vec<Tool> {
    vec![
        Tool::new(
            "clockify_project_list",
            "List projects in a workspace (paginated, default page 1, page_size 50)",
            vec![
                Param::boolean("archived", "Filter by archived state"),
                PAGE_PARAM,
                Param::number("page_size", "Number of projects per page (default 50)"),
                WORKSPACE_PARAM,
            ],
            handler!(list),
        ),
        Tool::new(
            "clockify_project_create",
            "Create a new project",
            vec![
                Param::string("name", "Project name").required(),
                Param::string("client_id", "Client ID"),
                Param::boolean("billable", "Whether the project is billable"),
                Param::string("color", "Project color (hex, e.g. #FF0000)"),
                Param::boolean("is_public", "Whether the project is public (default true)"),
                WORKSPACE_PARAM,
            ],
            handler!(create),
        ),
        Tool::new(
            "clockify_project_update",
            "Update an existing project",
            vec![
                Param::string("project_id", "Project ID to update").required(),
                Param::string("name", "New project name"),
                Param::string("client_id", "Client ID"),
                Param::boolean("billable", "Whether the project is billable"),
                Param::string("color", "Project color (hex)"),
                Param::boolean("archived", "Whether the project is archived"),
                WORKSPACE_PARAM,
            ],
            handler!(update),
        ),
        Tool::new(
            "clockify_project_delete",
            "Delete a project",
            vec![
                Param::string("project_id", "Project ID to delete").required(),
                WORKSPACE_PARAM,
            ],
            handler!(delete),
        ),
    ]
}

async fn list(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let archived = args.flag("archived")?;
    let page = args.page()?;
    let projects = registry
        .client()
        .projects(&workspace_id, archived, page)
        .await
        .failed_to("list projects")?;
    json_result(&json!({ "projects": projects }))
}

async fn create(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let project = NewProject {
        name: args.require_free_text("name")?,
        client_id: args.text("client_id")?,
        billable: args.flag("billable")?.unwrap_or(false),
        color: args.text("color")?,
        is_public: args.flag("is_public")?.unwrap_or(true),
    };
    let created = registry
        .client()
        .create_project(&workspace_id, &project)
        .await
        .failed_to("create project")?;
    json_result(&created)
}

async fn update(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let project_id = args.require_text("project_id")?;
    let update = ProjectUpdate {
        name: args.free_text("name")?,
        client_id: args.text("client_id")?,
        billable: args.flag("billable")?,
        color: args.text("color")?,
        archived: args.flag("archived")?,
    };
    let updated = registry
        .client()
        .update_project(&workspace_id, &project_id, &update)
        .await
        .failed_to("update project")?;
    json_result(&updated)
}

async fn delete(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let project_id = args.require_text("project_id")?;
    registry
        .client()
        .delete_project(&workspace_id, &project_id)
        .await
        .failed_to("delete project")?;
    deleted("Project", &project_id)
}
