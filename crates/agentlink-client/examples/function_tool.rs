//! Registering typed function tools and smoke-testing them in mock mode.
//!
//! Run with: `cargo run -p agentlink-client --example function_tool`

use agentlink_client::{AgentClient, FunctionTool};
use schemars::JsonSchema;
use serde::Deserialize;

#[derive(Deserialize, JsonSchema)]
struct Add {
    /// first addend
    a: i64,
    /// second addend
    b: i64,
}

#[derive(Deserialize, JsonSchema)]
struct Weather {
    /// city to look up
    city: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut client = AgentClient::new("your-bot-app-key", "visitor-1", None);
    // Mock mode fabricates a call per tool with schema-sampled arguments.
    client.set_mock(true);

    client.add_function_tools(
        "assistant",
        vec![
            FunctionTool::typed("add", "sum of two numbers", |args: Add| async move {
                Ok(args.a + args.b)
            }),
            FunctionTool::typed(
                "weather",
                "current weather for a city",
                |args: Weather| async move { Ok(format!("sunny in {}", args.city)) },
            ),
        ],
    );

    let reply = client.run("smoke test", "session-1", "", None).await?;
    println!("{}", reply.content);
    Ok(())
}
