//! JSON request body sent to the dialog endpoint.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One turn's request. Rebuilt between turns of the same user query: the
/// driver stamps a fresh `request_id`, attaches the previous interrupt's
/// tool outputs, and clears `content` on resumed turns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub content: String,
    pub session_id: String,
    pub bot_app_key: String,
    pub visitor_biz_id: String,
    #[serde(flatten)]
    pub options: RequestOptions,
}

/// Optional request knobs plus the client-SDK extension fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub request_id: String,
    /// Streaming frequency hint for the server, events per second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streaming_throttle: Option<i32>,
    /// Extra key/value pairs merged additively into every local tool input.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_variables: HashMap<String, String>,
    /// Role prompt override; empty means the application default.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub system_role: String,
    /// When true, reply and thought contents are incremental deltas.
    #[serde(default, skip_serializing_if = "is_false")]
    pub incremental: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub env_set: String,
    /// Previously uploaded documents this query refers to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_infos: Vec<FileInfo>,
    /// Outputs of the local tools requested by the preceding interrupt, in
    /// the interrupt's positional order.
    #[serde(default)]
    pub tool_outputs: Vec<ToolOutput>,
    #[serde(default)]
    pub agent_config: AgentConfig,
}

fn is_false(v: &bool) -> bool {
    !*v
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_size: String,
    #[serde(default)]
    pub file_url: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub doc_id: String,
}

/// Output of one local tool, echoed back to the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub tool_name: String,
    pub output: String,
}

/// Per-request agent topology: dynamically declared agents, permitted
/// handoffs between them, and the local tools each agent may call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Entry agent for the call; empty means the server default.
    #[serde(default)]
    pub start_agent_name: String,
    #[serde(default)]
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub disable_system_opt: bool,
    #[serde(default)]
    pub handoffs: Vec<Handoff>,
    #[serde(default)]
    pub agent_tools: Vec<AgentToolSet>,
}

/// A server-side reasoning unit. Names are unique within a client and act
/// as the key everywhere else in the protocol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub name: String,
    /// Detailed working logic handed to the reasoning model.
    pub instructions: String,
    /// One-line summary used by other agents to decide when to delegate.
    pub description: String,
    #[serde(default)]
    pub model: ModelSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

impl Agent {
    pub fn new(name: &str, instructions: &str, description: &str, model: ModelSpec) -> Self {
        Self {
            name: name.to_string(),
            instructions: instructions.to_string(),
            description: description.to_string(),
            model,
            input_schema: None,
            output_schema: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub model_name: String,
    pub temperature: f32,
    pub top_p: f32,
}

impl ModelSpec {
    /// A model with the stock sampling parameters.
    pub fn new(model_name: &str) -> Self {
        Self {
            model_name: model_name.to_string(),
            temperature: 0.5,
            top_p: 0.5,
        }
    }

    pub fn with_params(model_name: &str, temperature: f32, top_p: f32) -> Self {
        Self {
            model_name: model_name.to_string(),
            temperature,
            top_p,
        }
    }
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self::new("")
    }
}

/// Declared permission for one agent to hand the dialog to another.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Handoff {
    pub source_agent_name: String,
    pub target_agent_name: String,
}

/// The local tools one agent may call, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentToolSet {
    pub agent_name: String,
    pub tools: Vec<ToolSpec>,
}

/// OpenAI-style function-tool declaration sent to the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_request() -> ChatRequest {
        ChatRequest {
            content: "what is 2+3".into(),
            session_id: "s1".into(),
            bot_app_key: "key".into(),
            visitor_biz_id: "v1".into(),
            options: RequestOptions {
                request_id: "r1".into(),
                streaming_throttle: Some(20),
                custom_variables: HashMap::from([("env".to_string(), "prod".to_string())]),
                system_role: String::new(),
                incremental: false,
                env_set: "sandbox".into(),
                file_infos: vec![],
                tool_outputs: vec![ToolOutput {
                    tool_name: "add".into(),
                    output: "5".into(),
                }],
                agent_config: AgentConfig {
                    start_agent_name: "math".into(),
                    agents: vec![Agent::new("math", "do math", "math agent", ModelSpec::new("fn-call"))],
                    disable_system_opt: true,
                    handoffs: vec![Handoff {
                        source_agent_name: "math".into(),
                        target_agent_name: "writer".into(),
                    }],
                    agent_tools: vec![AgentToolSet {
                        agent_name: "math".into(),
                        tools: vec![ToolSpec {
                            kind: "function".into(),
                            function: FunctionSpec {
                                name: "add".into(),
                                description: "adds".into(),
                                parameters: json!({"type": "object", "properties": {}}),
                            },
                        }],
                    }],
                },
            },
        }
    }

    #[test]
    fn test_chat_request_round_trip() {
        let req = sample_request();
        let encoded = serde_json::to_string(&req).unwrap();
        let decoded: ChatRequest = serde_json::from_str(&encoded).unwrap();
        assert_eq!(req, decoded);
    }

    #[test]
    fn test_options_flattened_onto_request() {
        let req = sample_request();
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["request_id"], "r1");
        assert_eq!(value["tool_outputs"][0]["tool_name"], "add");
        assert_eq!(value["agent_config"]["start_agent_name"], "math");
        // Empty optional fields stay off the wire.
        assert!(value.get("system_role").is_none());
    }

    #[test]
    fn test_minimal_request_round_trip() {
        let req = ChatRequest {
            content: "hi".into(),
            session_id: "s".into(),
            bot_app_key: "k".into(),
            visitor_biz_id: "v".into(),
            options: RequestOptions::default(),
        };
        let decoded: ChatRequest =
            serde_json::from_str(&serde_json::to_string(&req).unwrap()).unwrap();
        assert_eq!(req, decoded);
    }
}
