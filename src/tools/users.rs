use rmcp::model::CallToolResult;
use serde_json::json;

use super::{
    Arguments, FailedTo, PAGE_PARAM, Param, Registry, Tool, ToolError, WORKSPACE_PARAM, json_result,
};

pub(super) fn tools() -> Vec<Tool> {
    vec![
        Tool::new(
            "clockify_user_current",
            "Get the current authenticated user",
            Vec::new(),
            handler!(current),
        ),
        Tool::new(
            "clockify_user_list",
            "List users in a workspace (paginated, default page 1, page_size 50)",
            vec![
                PAGE_PARAM,
                Param::number("page_size", "Number of users per page (default 50)"),
                WORKSPACE_PARAM,
            ],
            handler!(list),
        ),
    ]
}

async fn current(registry: &Registry, _args: &Arguments) -> Result<CallToolResult, ToolError> {
    let user = registry.client().current_user().await.failed_to("get current user")?;
    json_result(&user)
}

async fn list(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let page = args.page()?;
    let users = registry
        .client()
        .workspace_users(&workspace_id, page)
        .await
        .failed_to("list users")?;
    json_result(&json!({ "users": users }))
}
