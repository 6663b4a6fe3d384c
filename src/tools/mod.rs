//! Tool catalog: each tool names a Clockify operation, declares its
//! parameters, and adapts untyped call arguments into client requests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use rmcp::model::{CallToolResult, Content, JsonObject};
use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::{info, warn};

use crate::clockify::{ClockifyClient, ClockifyError, Page};

/// Wraps an `async fn(&Registry, &Arguments)` as a catalog handler.
macro_rules! handler {
    ($function:path) => {
        |registry, args| Box::pin($function(registry, args))
    };
}

mod clients;
mod projects;
mod reports;
mod tags;
mod tasks;
mod time_entries;
mod timer;
mod users;
mod workspaces;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0}")]
    Validation(String),
    #[error("Failed to {action}: {source}")]
    Api {
        action: &'static str,
        #[source]
        source: ClockifyError,
    },
    #[error("Failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

pub(crate) trait FailedTo<T> {
    fn failed_to(self, action: &'static str) -> Result<T, ToolError>;
}

impl<T> FailedTo<T> for Result<T, ClockifyError> {
    fn failed_to(self, action: &'static str) -> Result<T, ToolError> {
        self.map_err(|source| ToolError::Api { action, source })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    Boolean,
    StringArray,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub required: bool,
}

impl Param {
    pub const fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::String, description)
    }

    pub const fn number(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::Number, description)
    }

    pub const fn boolean(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::Boolean, description)
    }

    pub const fn string_array(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::StringArray, description)
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    const fn new(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
        }
    }

    fn schema(&self) -> Value {
        match self.kind {
            ParamKind::String => json!({ "type": "string", "description": self.description }),
            ParamKind::Number => json!({ "type": "number", "description": self.description }),
            ParamKind::Boolean => json!({ "type": "boolean", "description": self.description }),
            ParamKind::StringArray => json!({
                "type": "array",
                "items": { "type": "string" },
                "description": self.description
            }),
        }
    }
}

pub(crate) const WORKSPACE_PARAM: Param =
    Param::string("workspace_id", "Workspace ID (uses default if not provided)");
pub(crate) const PAGE_PARAM: Param = Param::number("page", "Page number (default 1)");

pub(crate) type ToolFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CallToolResult, ToolError>> + Send + 'a>>;

type Handler = for<'a> fn(&'a Registry, &'a Arguments) -> ToolFuture<'a>;

#[derive(Clone)]
pub struct Tool {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<Param>,
    handler: Handler,
}

impl Tool {
    pub(crate) fn new(
        name: &'static str,
        description: &'static str,
        params: Vec<Param>,
        handler: Handler,
    ) -> Self {
        Self {
            name,
            description,
            params,
            handler,
        }
    }

    pub fn input_schema(&self) -> JsonObject {
        let properties: Map<String, Value> = self
            .params
            .iter()
            .map(|param| (param.name.to_string(), param.schema()))
            .collect();
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|param| param.required)
            .map(|param| param.name)
            .collect();

        let mut schema = JsonObject::new();
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".to_string(), json!(required));
        }
        schema
    }

    /// The `tools/list` entry for this tool.
    pub fn descriptor(&self) -> rmcp::model::Tool {
        rmcp::model::Tool::new(self.name, self.description, Arc::new(self.input_schema()))
    }
}

/// Call arguments as received from the host. Accessors validate one field
/// at a time; presence, not truthiness, decides whether an optional value
/// was supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn new(values: Map<String, Value>) -> Self {
        Self(values)
    }

    fn present(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !value.is_null())
    }

    /// Blank strings count as absent. Anything else is passed through as given.
    pub fn free_text(&self, key: &str) -> Result<Option<String>, ToolError> {
        match self.present(key) {
            None => Ok(None),
            Some(Value::String(value)) if value.trim().is_empty() => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.clone())),
            Some(_) => Err(invalid(format!("{key} must be a string"))),
        }
    }

    pub fn require_free_text(&self, key: &str) -> Result<String, ToolError> {
        self.free_text(key)?.ok_or_else(|| invalid(format!("{key} is required")))
    }

    /// IDs, timestamps and keywords: surrounding whitespace is dropped and
    /// blank strings count as absent.
    pub fn text(&self, key: &str) -> Result<Option<String>, ToolError> {
        Ok(self.free_text(key)?.map(|value| value.trim().to_string()))
    }

    pub fn require_text(&self, key: &str) -> Result<String, ToolError> {
        self.text(key)?.ok_or_else(|| invalid(format!("{key} is required")))
    }

    pub fn flag(&self, key: &str) -> Result<Option<bool>, ToolError> {
        match self.present(key) {
            None => Ok(None),
            Some(Value::Bool(value)) => Ok(Some(*value)),
            Some(Value::String(value)) => match value.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(invalid(format!("{key} must be a boolean"))),
            },
            Some(_) => Err(invalid(format!("{key} must be a boolean"))),
        }
    }

    /// Positive whole numbers; integral floats and numeric strings are accepted.
    pub fn count(&self, key: &str) -> Result<Option<u32>, ToolError> {
        let number = match self.present(key) {
            None => return Ok(None),
            Some(Value::Number(number)) => number.as_f64(),
            Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
            Some(_) => None,
        };
        match number {
            Some(value) if value.fract() == 0.0 && value >= 1.0 && value <= f64::from(u32::MAX) => {
                Ok(Some(value as u32))
            }
            _ => Err(invalid(format!("{key} must be a positive integer"))),
        }
    }

    /// Blank items are dropped; a lone string is treated as a one-item list.
    pub fn text_list(&self, key: &str) -> Result<Option<Vec<String>>, ToolError> {
        match self.present(key) {
            None => Ok(None),
            Some(Value::String(value)) => Ok(Some(
                Some(value.trim())
                    .filter(|value| !value.is_empty())
                    .map(str::to_string)
                    .into_iter()
                    .collect(),
            )),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(value) => Ok(value.trim().to_string()),
                    _ => Err(invalid(format!("{key} must be an array of strings"))),
                })
                .filter(|item| !matches!(item, Ok(value) if value.is_empty()))
                .collect::<Result<Vec<_>, _>>()
                .map(Some),
            Some(_) => Err(invalid(format!("{key} must be an array of strings"))),
        }
    }

    pub fn page(&self) -> Result<Page, ToolError> {
        let defaults = Page::default();
        Ok(Page {
            page: self.count("page")?.unwrap_or(defaults.page),
            page_size: self.count("page_size")?.unwrap_or(defaults.page_size),
        })
    }
}

pub(crate) fn invalid(message: impl Into<String>) -> ToolError {
    ToolError::Validation(message.into())
}

/// An explicit, non-blank override wins over the configured default.
pub fn resolve_workspace(override_id: Option<&str>, default_id: &str) -> Result<String, ToolError> {
    override_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .or_else(|| Some(default_id.trim()).filter(|id| !id.is_empty()))
        .map(str::to_string)
        .ok_or_else(|| invalid("workspace_id is required"))
}

/// A single text block holding compact JSON.
pub(crate) fn json_result<T: Serialize + ?Sized>(data: &T) -> Result<CallToolResult, ToolError> {
    let text = serde_json::to_string(data)?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

pub(crate) fn deleted(noun: &str, id: &str) -> Result<CallToolResult, ToolError> {
    json_result(&json!({
        "deleted": true,
        "id": id,
        "message": format!("{noun} deleted successfully.")
    }))
}

pub struct Registry {
    client: ClockifyClient,
    default_workspace_id: String,
    tools: Vec<Tool>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("default_workspace_id", &self.default_workspace_id)
            .field("tool_count", &self.tools.len())
            .finish()
    }
}

impl Registry {
    pub fn new(client: ClockifyClient, default_workspace_id: String) -> Self {
        let tools = [
            timer::tools(),
            time_entries::tools(),
            projects::tools(),
            tasks::tools(),
            tags::tools(),
            clients::tools(),
            workspaces::tools(),
            users::tools(),
            reports::tools(),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self {
            client,
            default_workspace_id,
            tools,
        }
    }

    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Returns `None` for an unknown tool name. Handler failures come back
    /// as error results, never as `Err`.
    pub async fn call(&self, name: &str, args: &Arguments) -> Option<CallToolResult> {
        let tool = self.tools.iter().find(|tool| tool.name == name)?;
        info!(tool = name, "tool call");
        let result = (tool.handler)(self, args).await.unwrap_or_else(|err| {
            warn!(tool = name, error = %err, "tool call failed");
            CallToolResult::error(vec![Content::text(err.to_string())])
        });
        Some(result)
    }

    pub(crate) fn client(&self) -> &ClockifyClient {
        &self.client
    }

    pub(crate) fn workspace_id(&self, args: &Arguments) -> Result<String, ToolError> {
        let requested = args.text("workspace_id")?;
        resolve_workspace(requested.as_deref(), &self.default_workspace_id)
    }

    /// The `user_id` argument, or the authenticated user when absent.
    pub(crate) async fn user_id(&self, requested: Option<String>) -> Result<String, ToolError> {
        match requested {
            Some(user_id) => Ok(user_id),
            None => Ok(self
                .client
                .current_user()
                .await
                .failed_to("get current user")?
                .id),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use mockito::Server;
    use rmcp::model::CallToolResult;
    use serde_json::Value;

    use super::{Arguments, Registry};
    use crate::clockify::{ClockifyClient, Endpoints};

    pub fn registry(server: &Server, default_workspace_id: &str) -> Registry {
        let client = ClockifyClient::new(
            "secret".to_string(),
            Endpoints {
                api: server.url(),
                reports: format!("{}/reports", server.url()),
            },
        )
        .unwrap();
        Registry::new(client, default_workspace_id.to_string())
    }

    pub fn args(value: Value) -> Arguments {
        match value {
            Value::Object(map) => Arguments::new(map),
            _ => Arguments::default(),
        }
    }

    pub async fn call(registry: &Registry, name: &str, value: Value) -> CallToolResult {
        registry.call(name, &args(value)).await.expect("tool is registered")
    }

    pub fn is_error(result: &CallToolResult) -> bool {
        result.is_error.unwrap_or(false)
    }

    pub fn text(result: &CallToolResult) -> &str {
        result
            .content
            .first()
            .and_then(|content| content.as_text())
            .map(|content| content.text.as_str())
            .unwrap_or_default()
    }

    pub fn payload(result: &CallToolResult) -> Value {
        assert!(!is_error(result), "unexpected error: {}", text(result));
        serde_json::from_str(text(result)).expect("result text is JSON")
    }
}
