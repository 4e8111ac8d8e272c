//! Jeeves tool dispatch - JSON-lines tool-call runner.
//!
//! Reads one tool call per line from stdin:
//! `{"id": "call_1", "name": "add", "arguments": "{\"a\": 2, \"b\": 3}"}`
//! and writes one tool-result message per line to stdout, including an error
//! message for lines that do not decode. Logs go to stderr.

use clap::Parser;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use jeeves_tool_dispatch::tools::{BoundTools, RegistryCache, ToolBox, ToolSet, ToolSetBuilder};
use jeeves_tool_dispatch::{observability, Config, ToolCallRequest};

#[derive(Parser, Debug)]
#[command(name = "jeeves-tool-dispatch", version, about = "Dispatch LLM tool calls read as JSON lines")]
struct Args {
    /// Print the tool prompt section and exit
    #[arg(long)]
    list: bool,

    /// Accept numbers and booleans encoded as strings
    #[arg(long, env = "JEEVES_DISPATCH_LENIENT")]
    lenient: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

/// Stateless helpers.
struct DemoTools;

impl DemoTools {
    fn current_time(&self) -> String {
        chrono::Utc::now().to_rfc3339()
    }

    fn add(&self, a: i64, b: i64) -> Result<i64, String> {
        a.checked_add(b)
            .ok_or_else(|| format!("{} + {} overflows", a, b))
    }

    fn echo(&self, text: String) -> String {
        text
    }

    fn word_count(&self, text: String) -> usize {
        text.split_whitespace().count()
    }
}

impl ToolSet for DemoTools {
    fn register_tools(tools: &mut ToolSetBuilder<Self>) {
        tools
            .add("current_time", "Current UTC time (RFC 3339)", &[], DemoTools::current_time)
            .add("add", "Add two integers", &["a", "b"], DemoTools::add)
            .add("echo", "Return the text unchanged", &["text"], DemoTools::echo)
            .add("word_count", "Count whitespace-separated words", &["text"], DemoTools::word_count);
    }
}

/// Session scratchpad; state survives across calls.
#[derive(Default)]
struct Notes {
    entries: Mutex<Vec<String>>,
}

impl Notes {
    fn add_note(&self, text: String) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.push(text);
        entries.len()
    }

    fn list_notes(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ToolSet for Notes {
    fn register_tools(tools: &mut ToolSetBuilder<Self>) {
        tools
            .add("add_note", "Remember a note; returns the note count", &["text"], Notes::add_note)
            .add("list_notes", "All notes so far", &[], Notes::list_notes);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration
    let mut config = Config::from_env()?;
    config.dispatch.lenient_coercion |= args.lenient;
    config.observability.json_logs |= args.json_logs;

    // Initialize observability
    observability::init_tracing_with(&config.observability);

    let cache = RegistryCache::new(config.dispatch.clone());
    let mut toolbox = ToolBox::new();
    toolbox.add(Arc::new(BoundTools::with_registry(
        Arc::new(DemoTools),
        cache.get_or_register::<DemoTools>()?,
    )))?;
    toolbox.add(Arc::new(BoundTools::with_registry(
        Arc::new(Notes::default()),
        cache.get_or_register::<Notes>()?,
    )))?;

    if args.list {
        println!("{}", toolbox.generate_prompt());
        return Ok(());
    }

    tracing::info!(
        "Tool dispatcher ready: {} tools, lenient={}",
        toolbox.len(),
        config.dispatch.lenient_coercion
    );

    let toolbox = Arc::new(toolbox);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let message = match ToolCallRequest::from_json_line(&line) {
            Ok(request) => Arc::clone(&toolbox).execute_blocking(request).await.to_message(),
            Err(reply) => {
                tracing::warn!("Malformed tool call line for id {}: {}", reply.call_id, reply.content);
                reply
            }
        };

        let mut out = serde_json::to_vec(&message)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }

    tracing::info!("Input closed, shutting down");
    Ok(())
}
