use rmcp::model::CallToolResult;
use serde_json::json;

use super::{
    Arguments, FailedTo, PAGE_PARAM, Param, Registry, Tool, ToolError, WORKSPACE_PARAM, deleted,
    json_result,
};
use crate::models::{NamedUpdate, NewNamed};

pub(super) fn tools() -> Vec<Tool> {
    vec![
        Tool::new(
            "clockify_client_list",
            "List clients in a workspace (paginated, default page 1, page_size 50)",
            vec![
                PAGE_PARAM,
                Param::number("page_size", "Number of clients per page (default 50)"),
                WORKSPACE_PARAM,
            ],
            handler!(list),
        ),
        Tool::new(
            "clockify_client_create",
            "Create a new client",
            vec![Param::string("name", "Client name").required(), WORKSPACE_PARAM],
            handler!(create),
        ),
        Tool::new(
            "clockify_client_update",
            "Update a client",
            vec![
                Param::string("client_id", "Client ID to update").required(),
                Param::string("name", "New client name"),
                Param::boolean("archived", "Whether the client is archived"),
                WORKSPACE_PARAM,
            ],
            handler!(update),
        ),
        Tool::new(
            "clockify_client_delete",
            "Delete a client",
            vec![
                Param::string("client_id", "Client ID to delete").required(),
                WORKSPACE_PARAM,
            ],
            handler!(delete),
        ),
    ]
}

async fn list(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let page = args.page()?;
    let clients = registry
        .client()
        .clients(&workspace_id, page)
        .await
        .failed_to("list clients")?;
    json_result(&json!({ "clients": clients }))
}

async fn create(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let client = NewNamed {
        name: args.require_free_text("name")?,
    };
    let created = registry
        .client()
        .create_client(&workspace_id, &client)
        .await
        .failed_to("create client")?;
    json_result(&created)
}

async fn update(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let client_id = args.require_text("client_id")?;
    let update = NamedUpdate {
        name: args.free_text("name")?,
        archived: args.flag("archived")?,
    };
    let updated = registry
        .client()
        .update_client(&workspace_id, &client_id, &update)
        .await
        .failed_to("update client")?;
    json_result(&updated)
}

async fn delete(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let client_id = args.require_text("client_id")?;
    registry
        .client()
        .delete_client(&workspace_id, &client_id)
        .await
        .failed_to("delete client")?;
    deleted("Client", &client_id)
}
