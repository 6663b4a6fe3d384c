use rmcp::model::CallToolResult;
use serde_json::json;

use super::{
    Arguments, FailedTo, PAGE_PARAM, Param, Registry, Tool, ToolError, WORKSPACE_PARAM, deleted,
    invalid, json_result,
};
use crate::models::{NewTask, TaskStatus, TaskUpdate};

const PROJECT_PARAM: Param = Param::string("project_id", "Project ID").required();

pub(super) fn tools() -> Vec<Tool> {
    vec![
        Tool::new(
            "clockify_task_list",
            "List tasks for a project (paginated, default page 1, page_size 50)",
            vec![
                PROJECT_PARAM,
                PAGE_PARAM,
                Param::number("page_size", "Number of tasks per page (default 50)"),
                WORKSPACE_PARAM,
            ],
            handler!(list),
        ),
        Tool::new(
            "clockify_task_create",
            "Create a new task in a project",
            vec![
                PROJECT_PARAM,
                Param::string("name", "Task name").required(),
                Param::boolean("billable", "Whether the task is billable"),
                WORKSPACE_PARAM,
            ],
            handler!(create),
        ),
        Tool::new(
            "clockify_task_update",
            "Update a task",
            vec![
                PROJECT_PARAM,
                Param::string("task_id", "Task ID to update").required(),
                Param::string("name", "New task name"),
                Param::boolean("billable", "Whether the task is billable"),
                Param::string("status", "Task status (ACTIVE or DONE)"),
                WORKSPACE_PARAM,
            ],
            handler!(update),
        ),
        Tool::new(
            "clockify_task_delete",
            "Delete a task",
            vec![
                PROJECT_PARAM,
                Param::string("task_id", "Task ID to delete").required(),
                WORKSPACE_PARAM,
            ],
            handler!(delete),
        ),
    ]
}

async fn list(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let project_id = args.require_text("project_id")?;
    let page = args.page()?;
    let tasks = registry
        .client()
        .tasks(&workspace_id, &project_id, page)
        .await
        .failed_to("list tasks")?;
    json_result(&json!({ "tasks": tasks }))
}

async fn create(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let project_id = args.require_text("project_id")?;
    let task = NewTask {
        name: args.require_free_text("name")?,
        billable: args.flag("billable")?.unwrap_or(false),
    };
    let created = registry
        .client()
        .create_task(&workspace_id, &project_id, &task)
        .await
        .failed_to("create task")?;
    json_result(&created)
}

async fn update(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let project_id = args.require_text("project_id")?;
    let task_id = args.require_text("task_id")?;
    let status = args
        .text("status")?
        .map(|status| {
            TaskStatus::parse(&status).ok_or_else(|| invalid("status must be ACTIVE or DONE"))
        })
        .transpose()?;
    let update = TaskUpdate {
        name: args.free_text("name")?,
        billable: args.flag("billable")?,
        status,
    };
    let updated = registry
        .client()
        .update_task(&workspace_id, &project_id, &task_id, &update)
        .await
        .failed_to("update task")?;
    json_result(&updated)
}

async fn delete(registry: &Registry, args: &Arguments) -> Result<CallToolResult, ToolError> {
    let workspace_id = registry.workspace_id(args)?;
    let project_id = args.require_text("project_id")?;
    let task_id = args.require_text("task_id")?;
    registry
        .client()
        .delete_task(&workspace_id, &project_id, &task_id)
        .await
        .failed_to("delete task")?;
    deleted("Task", &task_id)
}

#[cfg(test)]
mod tests {
    use super::super::testing::{call, is_error, payload, registry, text};
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn list_is_scoped_to_the_project() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/workspaces/w1/projects/p1/tasks")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("page-size".into(), "50".into()),
            ]))
            .with_status(200)
            .with_body(r#"[{"id":"k1","name":"Design","projectId":"p1","status":"ACTIVE"}]"#)
            .create_async()
            .await;

        let result = call(
            &registry(&server, "w1"),
            "clockify_task_list",
            json!({ "project_id": "p1" }),
        )
        .await;
        mock.assert_async().await;
        assert_eq!(payload(&result)["tasks"][0]["status"], "ACTIVE");
    }

    #[tokio::test]
    async fn list_requires_project() {
        let server = Server::new_async().await;
        let result = call(&registry(&server, "w1"), "clockify_task_list", json!({})).await;
        assert!(is_error(&result));
        assert_eq!(text(&result), "project_id is required");
    }

    #[tokio::test]
    async fn update_normalizes_status() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", "/workspaces/w1/projects/p1/tasks/k1")
            .match_body(Matcher::Json(json!({ "status": "DONE" })))
            .with_status(200)
            .with_body(r#"{"id":"k1","status":"DONE"}"#)
            .create_async()
            .await;

        let result = call(
            &registry(&server, "w1"),
            "clockify_task_update",
            json!({ "project_id": "p1", "task_id": "k1", "status": "done" }),
        )
        .await;
        mock.assert_async().await;
        assert_eq!(payload(&result)["status"], "DONE");
    }

    #[tokio::test]
    async fn update_rejects_unknown_status() {
        let mut server = Server::new_async().await;
        let remote = server
            .mock("PUT", "/workspaces/w1/projects/p1/tasks/k1")
            .expect(0)
            .create_async()
            .await;

        let result = call(
            &registry(&server, "w1"),
            "clockify_task_update",
            json!({ "project_id": "p1", "task_id": "k1", "status": "paused" }),
        )
        .await;
        remote.assert_async().await;
        assert_eq!(text(&result), "status must be ACTIVE or DONE");
    }

    #[tokio::test]
    async fn create_sends_billable_default() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/workspaces/w1/projects/p1/tasks")
            .match_body(Matcher::Json(json!({ "name": "Design", "billable": false })))
            .with_status(201)
            .with_body(r#"{"id":"k1","name":"Design","projectId":"p1"}"#)
            .create_async()
            .await;

        let result = call(
            &registry(&server, "w1"),
            "clockify_task_create",
            json!({ "project_id": "p1", "name": "Design" }),
        )
        .await;
        mock.assert_async().await;
        assert_eq!(payload(&result)["projectId"], "p1");
    }

    #[tokio::test]
    async fn delete_confirms_task() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/workspaces/w1/projects/p1/tasks/k1")
            .with_status(200)
            .create_async()
            .await;

        let result = call(
            &registry(&server, "w1"),
            "clockify_task_delete",
            json!({ "project_id": "p1", "task_id": "k1" }),
        )
        .await;
        assert_eq!(payload(&result)["message"], "Task deleted successfully.");
    }
}
