//! Importing tools from an MCP server.
//!
//! Run with: `cargo run -p agentlink-client --example mcp_tool`

use std::sync::Arc;

use agentlink_client::{AgentClient, McpToolCache, McpTransport, Tool};
use agentlink_mcp::StdioTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A local MCP server spoken to over stdio; swap in HttpTransport (or
    // your own McpTransport) for remote servers.
    let transport: Arc<dyn McpTransport> =
        Arc::new(StdioTransport::new("python3", &["./mcp_server.py"]));
    transport.start().await?;

    let cache = McpToolCache::connect(transport).await?;
    let mut client = AgentClient::new("your-bot-app-key", "visitor-1", None);

    // Empty selection imports every discovered tool, in discovery order.
    let added = client.add_mcp_tools("assistant", &cache, &[]);
    for tool in &added {
        println!("imported mcp tool: {}", tool.name());
    }

    let reply = client
        .run("use one of your tools", "session-1", "", None)
        .await?;
    println!("{}", reply.content);
    Ok(())
}
