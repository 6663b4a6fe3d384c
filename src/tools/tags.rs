use rmcp::model::CallToolResult;

use super::{
    Arguments, FailedTo, Param, Registry, Tool, ToolError, WORKSPACE_PARAM, deleted, json_result,
};
use crate::models::{NamedUpdate, NewNamed};

pub(super) fn tools() -> Vec<Tool> {
    vec![
        Tool::new(
            "clockify_tag_list",
            "List all tags in a workspace",
            vec![WORKSPACE_PARAM],
            handler!(list),
        ),
        Tool::new(
            "clockify_tag_create",
            "Create a new tag",
            vec![Param::string("name", "Tag name").required(), WORKSPACE_PARAM],
            handler!(create),
        ),
        Tool::new(
            "clockify_tag_update",
            "Update a tag",
            vec![
                Param::string("tag_id", "Tag ID to update").required(),
                Param::string("name", "New tag name"),
                Param::boolean("archived", "Whether the tag is archived"),
                WORKSPACE_PARAM,
            ],
            handler!(update),
        ),
        Tool::new(
            "clockify_tag_delete",
            "Delete a tag",
            vec![
                Param::string("tag_id", "Tag ID to delete").required(),
                WORKSPACE_PARAM,
            ],
            handler!(delete),
        ),
    ]
}

async fn list(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let tags = registry.client().tags(&workspace_id).await.failed_to("list tags")?;
    json_result(&tags)
}

async fn create(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let tag = NewNamed {
        name: args.require_free_text("name")?,
    };
    let created = registry
        .client()
        .create_tag(&workspace_id, &tag)
        .await
        .failed_to("create tag")?;
    json_result(&created)
}

async fn update(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let tag_id = args.require_text("tag_id")?;
    let update = NamedUpdate {
        name: args.free_text("name")?,
        archived: args.flag("archived")?,
    };
    let updated = registry
        .client()
        .update_tag(&workspace_id, &tag_id, &update)
        .await
        .failed_to("update tag")?;
    json_result(&updated)
}

async fn delete(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let tag_id = args.require_text("tag_id")?;
    registry
        .client()
        .delete_tag(&workspace_id, &tag_id)
        .await
        .failed_to("delete tag")?;
    deleted("Tag", &tag_id)
}
