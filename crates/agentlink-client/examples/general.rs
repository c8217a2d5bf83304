//! Interactive dialog loop with a custom event sink.
//!
//! Run with: `cargo run -p agentlink-client --example general`

use std::io::{BufRead, Write};
use std::sync::Arc;

use agentlink_client::{AgentClient, EventSink};
use agentlink_core::event::{ReplyEvent, ThoughtEvent};

const BOT_APP_KEY: &str = "your-bot-app-key";

struct PrintingSink;

impl EventSink for PrintingSink {
    fn on_reply(&self, reply: &ReplyEvent) {
        if reply.is_from_self {
            // Skip the echo of our own input.
            return;
        }
        println!("reply: {}", reply.content);
    }

    fn on_thought(&self, thought: &ThoughtEvent) {
        for procedure in &thought.procedures {
            println!("thinking: {} ({:?})", procedure.title, procedure.status);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = AgentClient::new(BOT_APP_KEY, "visitor-1", Some(Arc::new(PrintingSink)));
    let session_id = uuid::Uuid::new_v4().to_string();

    let stdin = std::io::stdin();
    loop {
        print!("ask something: ");
        std::io::stdout().flush()?;
        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            return Ok(());
        }
        let query = input.trim();
        if query.is_empty() {
            continue;
        }

        let reply = client.run(query, &session_id, "", None).await?;
        println!("final reply: {}", reply.content);
    }
}
