use rmcp::model::CallToolResult;

use super::{Arguments, FailedTo, Registry, Tool, ToolError, json_result};

pub(super) fn tools() -> Vec<Tool> {
    vec![Tool::new(
        "clockify_workspace_list",
        "List all workspaces available to the current user",
        Vec::new(),
        handler!(list),
    )]
}

async fn list(registry: &Registry, _args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspaces = registry.client().workspaces().await.failed_to("list workspaces")?;
    json_result(&workspaces)
}
