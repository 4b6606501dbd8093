//! ReAct MCP Agent CLI
//!
//! Interactive chat loop against the agent on the default memory
//! thread. Remote tool availability is reported at startup; a down
//! tool server degrades to built-in tools only.

use std::io::{BufRead, Write};
use std::sync::Arc;

use agent_core::{invoke_agent, Role, ThreadId};
use agent_runtime::bootstrap::{build_agent, discover_remote_tools, RuntimeConfig};
use agent_runtime::{AzureOpenAiProvider, McpClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Keep tracing quiet by default so the chat output stays readable
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = RuntimeConfig::from_env()?;
    let mcp_url = config.mcp.url.clone();
    let deployment = config.azure.deployment.clone();

    println!("Welcome to the ReAct Agent with MCP Integration!");
    println!(
        "This agent can reason through problems and use tools from the MCP server at {}.",
        mcp_url
    );
    println!("Type 'quit', 'exit', or 'q' to exit.\n");

    let provider = Arc::new(AzureOpenAiProvider::from_config(config.azure)?);
    let mcp = Arc::new(McpClient::from_config(config.mcp)?);

    let remote_tools = discover_remote_tools(&mcp).await;
    if remote_tools.is_empty() {
        println!("⚠️  MCP server connection failed, but local tools are available");
    } else {
        println!(
            "✅ Connected to MCP server! Available tools: {}",
            remote_tools.len()
        );
        for tool in &remote_tools {
            let schema = tool.schema();
            println!("  - {}: {}", schema.name, schema.description);
        }
    }

    println!("\nInitializing agent...");
    let agent = build_agent(provider, remote_tools, &deployment)?;
    println!("✅ Agent initialized successfully!");
    println!();

    let thread = ThreadId::default();
    let stdin = std::io::stdin();

    loop {
        print!("User: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF on stdin
            println!("\nGoodbye!");
            break;
        }

        let user_input = line.trim();
        if user_input.is_empty() {
            continue;
        }
        if ["quit", "exit", "q"].contains(&user_input.to_lowercase().as_str()) {
            println!("Goodbye!");
            break;
        }

        run_turn(&agent, &thread, user_input).await;
        println!();
    }

    Ok(())
}

/// Run one turn and print the response with its reasoning steps
async fn run_turn(agent: &agent_core::Agent, thread: &ThreadId, user_input: &str) {
    println!("\n--- Agent Response ---");

    // History length before the turn, to isolate this turn's messages
    let before = agent
        .memory()
        .load(thread)
        .ok()
        .flatten()
        .map_or(0, |c| c.len());

    let outcome = invoke_agent(agent, user_input, thread).await;

    if let Some(error) = &outcome.error {
        println!("Error getting response: {}", error);
        return;
    }

    match outcome.messages.last() {
        Some(last) if !last.content.is_empty() => println!("Assistant: {}", last.content),
        Some(last) => println!(
            "Assistant: {}",
            serde_json::to_string(last).unwrap_or_else(|_| format!("{:?}", last))
        ),
        None => println!("No response generated."),
    }

    let steps: Vec<&str> = outcome
        .messages
        .iter()
        .skip(before)
        .filter(|m| m.role == Role::Tool)
        .map(|m| m.content.as_str())
        .collect();

    if !steps.is_empty() {
        println!("\nReasoning Steps:");
        for step in steps {
            println!("- {}", step.replace('\n', " "));
        }
    }
}
