//! One remote MCP tool exposed through the [`Tool`] contract.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use agentlink_tools::{Tool, ToolContext};

use crate::{CallToolResult, McpToolCache};

/// Adapter for a single tool discovered on an MCP server. Schema and
/// description reads come from the shared cache snapshot and opportunistically
/// kick a background refresh once the snapshot ages past the freshness
/// window.
pub struct McpTool {
    name: String,
    cache: Arc<McpToolCache>,
    timeout: Duration,
}

impl McpTool {
    pub fn new(name: &str, cache: Arc<McpToolCache>) -> Self {
        Self {
            name: name.to_string(),
            cache,
            timeout: Duration::ZERO,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Tool for McpTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        self.cache.spawn_refresh();
        self.cache
            .get(&self.name)
            .map(|info| info.description)
            .unwrap_or_default()
    }

    fn parameters_schema(&self) -> Value {
        self.cache.spawn_refresh();
        let mut schema = self
            .cache
            .get(&self.name)
            .map(|info| info.input_schema)
            .filter(|s| s.is_object())
            .unwrap_or_else(|| json!({"type": "object", "properties": {}}));
        normalize_defaults(&mut schema);
        schema
    }

    async fn execute(&self, args: Map<String, Value>, _ctx: &ToolContext) -> anyhow::Result<Value> {
        self.cache.ensure_connected().await?;
        let result = self
            .cache
            .transport()
            .call_tool(&self.name, args)
            .await?;
        Ok(serde_json::to_value(result)?)
    }

    fn result_to_string(&self, value: &Value) -> String {
        let Ok(result) = serde_json::from_value::<CallToolResult>(value.clone()) else {
            return match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
        };
        let parts: Vec<String> = result
            .content
            .iter()
            .map(|part| {
                if part.kind == "text" {
                    part.text.clone().unwrap_or_default()
                } else {
                    serde_json::to_string(part).unwrap_or_default()
                }
            })
            .collect();
        match parts.len() {
            1 => parts.into_iter().next().unwrap_or_default(),
            _ => Value::from(parts).to_string(),
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

/// Rewrite every `default:` node into its JSON string form so the server
/// validates the schema literally.
fn normalize_defaults(schema: &mut Value) {
    let Some(map) = schema.as_object_mut() else {
        return;
    };
    for (key, value) in map.iter_mut() {
        if key == "default" {
            if !value.is_string() {
                *value = Value::String(value.to_string());
            }
        } else {
            normalize_defaults(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::cache::tests::{age_snapshot, lookup_tool, StubTransport};
    use crate::{ContentPart, ToolInfo};

    async fn cache_with(stub: Arc<StubTransport>) -> Arc<McpToolCache> {
        McpToolCache::connect(stub).await.unwrap()
    }

    #[tokio::test]
    async fn test_reads_come_from_cache_snapshot() {
        let stub = Arc::new(StubTransport::with_tools(vec![ToolInfo {
            name: "lookup".into(),
            description: "find things".into(),
            input_schema: json!({
                "type": "object",
                "properties": {"q": {"type": "string", "default": 5}}
            }),
        }]));
        let tool = McpTool::new("lookup", cache_with(stub).await);

        assert_eq!(tool.name(), "lookup");
        assert_eq!(tool.description(), "find things");
        let schema = tool.parameters_schema();
        // default nodes are re-serialized to their JSON string form
        assert_eq!(schema["properties"]["q"]["default"], json!("5"));
    }

    #[tokio::test]
    async fn test_execute_reconnects_after_failed_ping() {
        let stub = Arc::new(StubTransport::with_tools(vec![lookup_tool()]));
        let cache = cache_with(stub.clone()).await;
        let tool = McpTool::new("lookup", cache);

        // First ping of the execute fails, the recheck fails too, the
        // transport restarts once and the call goes through.
        stub.fail_next_pings.store(2, Ordering::SeqCst);
        let out = tool
            .execute(Map::new(), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(stub.restarts.load(Ordering::SeqCst), 1);
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
        assert_eq!(tool.result_to_string(&out), "ran lookup");
    }

    #[tokio::test]
    async fn test_schema_read_kicks_background_refresh_when_stale() {
        let stub = Arc::new(StubTransport::with_tools(vec![lookup_tool()]));
        let cache = cache_with(stub.clone()).await;
        let tool = McpTool::new("lookup", cache.clone());

        age_snapshot(&cache);
        let _ = tool.parameters_schema();
        // Give the spawned refresh a chance to run.
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(stub.lists.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn test_result_to_string_single_text_part_unwrapped() {
        let tool_result = CallToolResult {
            content: vec![ContentPart::text("only part")],
            is_error: None,
        };
        let value = serde_json::to_value(&tool_result).unwrap();
        let tool = McpTool::new("t", dummy_cache());
        assert_eq!(tool.result_to_string(&value), "only part");
    }

    #[test]
    fn test_result_to_string_mixed_parts() {
        let mut image = ContentPart {
            kind: "image".into(),
            text: None,
            extra: Map::new(),
        };
        image.extra.insert("data".into(), json!("zzz"));
        let tool_result = CallToolResult {
            content: vec![ContentPart::text("first"), image, ContentPart::text("last")],
            is_error: None,
        };
        let value = serde_json::to_value(&tool_result).unwrap();
        let tool = McpTool::new("t", dummy_cache());

        let rendered = tool.result_to_string(&value);
        let parts: Vec<String> = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parts.len(), 3);
        // Text parts are verbatim and keep their wire order.
        assert_eq!(parts[0], "first");
        assert_eq!(parts[2], "last");
        // Non-text parts are JSON-encoded.
        assert!(parts[1].contains("\"type\":\"image\""));
    }

    #[test]
    fn test_normalize_defaults_recurses() {
        let mut schema = json!({
            "type": "object",
            "properties": {
                "a": {"type": "integer", "default": 3},
                "b": {
                    "type": "object",
                    "properties": {"c": {"type": "array", "default": [1, 2]}}
                }
            }
        });
        normalize_defaults(&mut schema);
        assert_eq!(schema["properties"]["a"]["default"], json!("3"));
        assert_eq!(
            schema["properties"]["b"]["properties"]["c"]["default"],
            json!("[1,2]")
        );
    }

    fn dummy_cache() -> Arc<McpToolCache> {
        // A cache is only reachable through connect; build one against an
        // always-healthy stub inside a throwaway runtime.
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            McpToolCache::connect(Arc::new(StubTransport::with_tools(vec![])))
                .await
                .unwrap()
        })
    }
}
