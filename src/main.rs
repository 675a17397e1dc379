//! Bee Gate - 无头 REPL
//!
//! 用法：`bee-gate [agents.json]`
//! - 每行一条消息；输入 feedback 后下一行作为纠正样本
//! - `/init <json>` 内联初始化，`/welcome` 打印问候，`/quit` 退出

use std::path::PathBuf;

use anyhow::Context;
use bee_gate::api::{InitializeRequest, MessageRequest, MessageResponse};
use bee_gate::config::load_config;
use bee_gate::{create_orchestrator, observability, SessionOrchestrator};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

const SESSION_ID: &str = "repl";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(None).context("Failed to load config")?;
    tracing::info!(app = cfg.app.name.as_deref().unwrap_or("bee-gate"), "starting repl");
    let orchestrator = create_orchestrator(&cfg);

    if let Some(path) = std::env::args().nth(1).map(PathBuf::from) {
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read agents file {}", path.display()))?;
        initialize(&orchestrator, &raw).await?;
    }

    let keyword = cfg.session.feedback_keyword.clone();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("{}", orchestrator.welcome(SESSION_ID).await.message);
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line == "/quit" {
            break;
        }
        if line == "/welcome" {
            println!("{}", orchestrator.welcome(SESSION_ID).await.message);
            continue;
        }
        if let Some(json) = line.strip_prefix("/init") {
            if let Err(e) = initialize(&orchestrator, json.trim()).await {
                eprintln!("error: {:#}", e);
            }
            continue;
        }

        let request = if line.eq_ignore_ascii_case(&keyword) {
            stdout.write_all(b"feedback> ").await?;
            stdout.flush().await?;
            let correction = lines.next_line().await.context("Failed to read stdin")?;
            MessageRequest {
                message: Some(line.to_string()),
                feedback: correction,
            }
        } else {
            MessageRequest::text(line)
        };

        match orchestrator.handle_message(SESSION_ID, request).await {
            Ok(MessageResponse::Reply { response }) => println!("{}", response),
            Ok(MessageResponse::Error { error }) => eprintln!("error: {}", error),
            Err(e) => eprintln!("error: {}", e),
        }
    }

    Ok(())
}

async fn initialize(orchestrator: &SessionOrchestrator, raw: &str) -> anyhow::Result<()> {
    let request: InitializeRequest =
        serde_json::from_str(raw).context("Invalid initialize payload, expected {\"agents\": [...]}")?;
    let response = orchestrator.initialize(SESSION_ID, request).await?;
    println!("{} ({} agents)", response.message, response.agents);
    Ok(())
}
